//! Completion provider primitives for the care coordinator.
//!
//! This crate provides:
//!
//! - **Messages**: transcript entries exchanged with the completion provider
//! - **Backend**: the [`CompletionProvider`] contract and its closed
//!   [`Completion`] result
//! - **OpenAI-compatible client**: a provider speaking the chat-completions
//!   protocol

pub mod backend;
pub mod config;
pub mod error;
pub mod message;
pub mod openai;

pub use backend::{Completion, CompletionProvider, CompletionRequest, ToolSpec};
pub use config::CompletionConfig;
pub use error::CompletionError;
pub use message::{Message, MessageRole, ToolCall, ToolOutput};
pub use openai::OpenAiCompatibleProvider;
