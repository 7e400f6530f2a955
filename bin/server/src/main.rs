use care_coordinator_conversation::{Collaborators, SessionRegistry};
use care_coordinator_server::{AppState, config::ServerConfig, router};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "server failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), BoxError> {
    // Optional path to a TOML config file.
    let config_file = std::env::args_os().nth(1).map(PathBuf::from);
    let config = ServerConfig::load(config_file.as_deref())?;
    tracing::info!(
        lookup = ?config.lookup.backend,
        model = %config.completion.model,
        "loaded configuration"
    );

    let lookup = config.lookup.build()?;
    let provider = Arc::new(config.completion.build()?);
    let deps = Collaborators::new(provider, lookup).with_config(config.orchestrator.clone());
    let state = Arc::new(AppState::new(SessionRegistry::new(deps)));

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    tracing::info!("listening on http://{}", config.bind_address);

    axum::serve(listener, router(state).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
