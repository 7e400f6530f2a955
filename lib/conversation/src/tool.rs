//! Tools the assistant may call, and the dispatcher that runs them.
//!
//! A tool pairs a name and description with an [`ArgumentSchema`] and a
//! [`ToolHandler`]. The dispatcher validates arguments, runs the handler and
//! turns every outcome, panics included, into a [`ToolResult`].

use crate::booking::Booking;
use crate::error::BookingError;
use async_trait::async_trait;
use care_coordinator_ai::{ToolCall, ToolSpec};
use care_coordinator_core::{Clock, Patient};
use care_coordinator_lookup::{LookupError, LookupService, StatementError};
use care_coordinator_rules::ValidationError;
use chrono::{NaiveDate, NaiveTime};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue, json};
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use tracing::{debug, error, instrument, warn};

/// Category of a failed tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    /// Arguments did not match the tool's schema.
    BadArguments,
    /// The ad hoc query tried to modify data.
    ForbiddenOperation,
    /// A record does not exist.
    NotFound,
    /// The booking is missing prerequisites.
    NotReady,
    /// The booking is already committed.
    ImmutableAfterCommit,
    /// A business rule rejected the request.
    Validation,
    /// A collaborator did not answer in time.
    Timeout,
    /// Anything else, including handler panics.
    Internal,
}

impl ToolErrorKind {
    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::BadArguments => "bad_arguments",
            Self::ForbiddenOperation => "forbidden_operation",
            Self::NotFound => "not_found",
            Self::NotReady => "not_ready",
            Self::ImmutableAfterCommit => "immutable_after_commit",
            Self::Validation => "validation",
            Self::Timeout => "timeout",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ToolErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one tool call, as fed back to the completion provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolResult {
    /// The call succeeded.
    Ok { data: JsonValue },
    /// The call failed.
    Err { kind: ToolErrorKind, message: String },
}

impl ToolResult {
    /// Creates a successful result.
    #[must_use]
    pub fn ok(data: JsonValue) -> Self {
        Self::Ok { data }
    }

    /// Creates a failed result.
    #[must_use]
    pub fn err(kind: ToolErrorKind, message: impl Into<String>) -> Self {
        Self::Err {
            kind,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }

    /// The failure kind, if any.
    #[must_use]
    pub fn error_kind(&self) -> Option<ToolErrorKind> {
        match self {
            Self::Ok { .. } => None,
            Self::Err { kind, .. } => Some(*kind),
        }
    }

    /// Short outcome label: `ok` or the error kind.
    #[must_use]
    pub fn outcome(&self) -> &'static str {
        self.error_kind().map_or("ok", |kind| kind.as_str())
    }

    /// Renders the result for the transcript.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or_else(|e| {
            json!({ "status": "err", "kind": "internal", "message": e.to_string() })
        })
    }
}

/// A handler failure, before it becomes a [`ToolResult`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolFailure {
    pub kind: ToolErrorKind,
    pub message: String,
}

impl ToolFailure {
    #[must_use]
    pub fn new(kind: ToolErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn bad_arguments(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::BadArguments, message)
    }
}

impl fmt::Display for ToolFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ToolFailure {}

impl From<ToolFailure> for ToolResult {
    fn from(failure: ToolFailure) -> Self {
        Self::Err {
            kind: failure.kind,
            message: failure.message,
        }
    }
}

impl From<LookupError> for ToolFailure {
    fn from(err: LookupError) -> Self {
        let kind = match &err {
            LookupError::Timeout { .. } => ToolErrorKind::Timeout,
            LookupError::NotFound { .. } => ToolErrorKind::NotFound,
            LookupError::Rejected { .. } => ToolErrorKind::Validation,
            LookupError::RequestFailed { .. }
            | LookupError::InvalidResponse { .. }
            | LookupError::Unsupported { .. } => ToolErrorKind::Internal,
        };
        Self::new(kind, err.to_string())
    }
}

impl From<ValidationError> for ToolFailure {
    fn from(err: ValidationError) -> Self {
        Self::new(
            ToolErrorKind::Validation,
            format!("{} ({})", err, err.reason()),
        )
    }
}

impl From<StatementError> for ToolFailure {
    fn from(err: StatementError) -> Self {
        Self::new(ToolErrorKind::ForbiddenOperation, err.to_string())
    }
}

impl From<BookingError> for ToolFailure {
    fn from(err: BookingError) -> Self {
        let kind = match &err {
            BookingError::ImmutableAfterCommit { .. } => ToolErrorKind::ImmutableAfterCommit,
            BookingError::MissingPrerequisite { .. } | BookingError::NotReady { .. } => {
                ToolErrorKind::NotReady
            }
            BookingError::ProviderNotAtDepartment { .. } | BookingError::Validation(_) => {
                ToolErrorKind::Validation
            }
        };
        Self::new(kind, err.to_string())
    }
}

/// Type of one argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentType {
    /// Any string.
    String,
    /// A JSON integer.
    Integer,
    /// A `YYYY-MM-DD` string.
    Date,
    /// A 24-hour `HH:MM` string.
    Time,
    /// A JSON array of any values.
    Array,
}

impl ArgumentType {
    fn json_schema(self) -> JsonValue {
        match self {
            Self::String => json!({ "type": "string" }),
            Self::Integer => json!({ "type": "integer" }),
            Self::Date => json!({ "type": "string", "format": "date" }),
            Self::Time => json!({ "type": "string", "pattern": "^[0-2][0-9]:[0-5][0-9]$" }),
            Self::Array => json!({ "type": "array", "items": {} }),
        }
    }

    fn accepts(self, value: &JsonValue) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64(),
            Self::Date => value.as_str().is_some_and(|s| parse_date(s).is_some()),
            Self::Time => value.as_str().is_some_and(|s| parse_clock(s).is_some()),
            Self::Array => value.is_array(),
        }
    }

    const fn expected(self) -> &'static str {
        match self {
            Self::String => "a string",
            Self::Integer => "an integer",
            Self::Date => "a date in YYYY-MM-DD format",
            Self::Time => "a 24-hour time in HH:MM format",
            Self::Array => "an array",
        }
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

fn parse_clock(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M").ok()
}

#[derive(Debug, Clone)]
struct Argument {
    name: &'static str,
    kind: ArgumentType,
    required: bool,
    description: &'static str,
}

/// The argument contract of a tool.
#[derive(Debug, Clone, Default)]
pub struct ArgumentSchema {
    arguments: Vec<Argument>,
}

impl ArgumentSchema {
    /// Creates a schema with no arguments.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a required argument.
    #[must_use]
    pub fn required(
        mut self,
        name: &'static str,
        kind: ArgumentType,
        description: &'static str,
    ) -> Self {
        self.arguments.push(Argument {
            name,
            kind,
            required: true,
            description,
        });
        self
    }

    /// Adds an optional argument.
    #[must_use]
    pub fn optional(
        mut self,
        name: &'static str,
        kind: ArgumentType,
        description: &'static str,
    ) -> Self {
        self.arguments.push(Argument {
            name,
            kind,
            required: false,
            description,
        });
        self
    }

    /// JSON schema advertised to the completion provider.
    #[must_use]
    pub fn to_json_schema(&self) -> JsonValue {
        let properties: Map<String, JsonValue> = self
            .arguments
            .iter()
            .map(|arg| {
                let mut schema = arg.kind.json_schema();
                schema["description"] = JsonValue::String(arg.description.to_string());
                (arg.name.to_string(), schema)
            })
            .collect();
        let required: Vec<&str> = self
            .arguments
            .iter()
            .filter(|arg| arg.required)
            .map(|arg| arg.name)
            .collect();
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }

    /// Checks `value` against the schema.
    ///
    /// Unknown keys, missing required keys and ill-typed values are all
    /// rejected. An optional argument given as `null` counts as absent.
    ///
    /// # Errors
    ///
    /// Returns a `bad_arguments` failure describing the first problem found.
    pub fn validate(&self, value: &JsonValue) -> Result<ToolArguments, ToolFailure> {
        let object = match value {
            JsonValue::Object(object) => object,
            JsonValue::String(raw) => {
                return Err(ToolFailure::bad_arguments(format!(
                    "arguments are not a JSON object: {raw}"
                )));
            }
            other => {
                return Err(ToolFailure::bad_arguments(format!(
                    "arguments must be a JSON object, got {other}"
                )));
            }
        };

        if let Some(unknown) = object
            .keys()
            .find(|key| !self.arguments.iter().any(|arg| arg.name == key.as_str()))
        {
            return Err(ToolFailure::bad_arguments(format!(
                "unexpected argument '{unknown}'"
            )));
        }

        let mut values = Map::new();
        for arg in &self.arguments {
            match object.get(arg.name) {
                None | Some(JsonValue::Null) if arg.required => {
                    return Err(ToolFailure::bad_arguments(format!(
                        "missing required argument '{}'",
                        arg.name
                    )));
                }
                None | Some(JsonValue::Null) => {}
                Some(value) if !arg.kind.accepts(value) => {
                    return Err(ToolFailure::bad_arguments(format!(
                        "argument '{}' must be {}, got {value}",
                        arg.name,
                        arg.kind.expected()
                    )));
                }
                Some(value) => {
                    values.insert(arg.name.to_string(), value.clone());
                }
            }
        }
        Ok(ToolArguments { values })
    }
}

/// Arguments that passed schema validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArguments {
    values: Map<String, JsonValue>,
}

impl ToolArguments {
    fn missing(name: &str) -> ToolFailure {
        ToolFailure::bad_arguments(format!("missing required argument '{name}'"))
    }

    /// A string argument.
    ///
    /// # Errors
    ///
    /// Returns `bad_arguments` if absent.
    pub fn string(&self, name: &str) -> Result<&str, ToolFailure> {
        self.opt_string(name).ok_or_else(|| Self::missing(name))
    }

    #[must_use]
    pub fn opt_string(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(JsonValue::as_str)
    }

    /// An integer argument.
    ///
    /// # Errors
    ///
    /// Returns `bad_arguments` if absent.
    pub fn integer(&self, name: &str) -> Result<i64, ToolFailure> {
        self.opt_integer(name).ok_or_else(|| Self::missing(name))
    }

    #[must_use]
    pub fn opt_integer(&self, name: &str) -> Option<i64> {
        self.values.get(name).and_then(JsonValue::as_i64)
    }

    /// A date argument.
    ///
    /// # Errors
    ///
    /// Returns `bad_arguments` if absent.
    pub fn date(&self, name: &str) -> Result<NaiveDate, ToolFailure> {
        self.opt_date(name).ok_or_else(|| Self::missing(name))
    }

    #[must_use]
    pub fn opt_date(&self, name: &str) -> Option<NaiveDate> {
        self.opt_string(name).and_then(parse_date)
    }

    /// A time argument.
    ///
    /// # Errors
    ///
    /// Returns `bad_arguments` if absent.
    pub fn time(&self, name: &str) -> Result<NaiveTime, ToolFailure> {
        self.opt_string(name)
            .and_then(parse_clock)
            .ok_or_else(|| Self::missing(name))
    }

    /// An array argument, empty if absent.
    #[must_use]
    pub fn array(&self, name: &str) -> Vec<JsonValue> {
        self.values
            .get(name)
            .and_then(JsonValue::as_array)
            .cloned()
            .unwrap_or_default()
    }
}

/// Read-only view handed to pure-lookup handlers.
pub struct LookupContext<'a> {
    pub lookup: &'a dyn LookupService,
    pub clock: &'a dyn Clock,
    pub patient: &'a Patient,
    pub booking: &'a Booking,
}

/// Mutable view handed to effecting handlers.
pub struct EffectContext<'a> {
    pub lookup: &'a dyn LookupService,
    pub clock: &'a dyn Clock,
    pub patient: &'a mut Patient,
    pub booking: &'a mut Booking,
}

impl EffectContext<'_> {
    /// Reborrows as a read-only view.
    #[must_use]
    pub fn view(&self) -> LookupContext<'_> {
        LookupContext {
            lookup: self.lookup,
            clock: self.clock,
            patient: &*self.patient,
            booking: &*self.booking,
        }
    }
}

/// A handler that only reads.
#[async_trait]
pub trait LookupHandler: Send + Sync {
    /// Runs the tool.
    async fn call(
        &self,
        args: &ToolArguments,
        ctx: &LookupContext<'_>,
    ) -> Result<JsonValue, ToolFailure>;
}

/// A handler that may change the booking, the patient snapshot, or stored
/// records.
#[async_trait]
pub trait EffectingHandler: Send + Sync {
    /// Runs the tool.
    async fn call(
        &self,
        args: &ToolArguments,
        ctx: &mut EffectContext<'_>,
    ) -> Result<JsonValue, ToolFailure>;
}

/// A tool's handler, tagged by whether it has side effects.
pub enum ToolHandler {
    PureLookup(Box<dyn LookupHandler>),
    Effecting(Box<dyn EffectingHandler>),
}

impl ToolHandler {
    #[must_use]
    pub fn is_effecting(&self) -> bool {
        matches!(self, Self::Effecting(_))
    }
}

/// Check run on validated arguments before the handler is invoked.
pub type ArgumentGuard = fn(&ToolArguments) -> Result<(), ToolFailure>;

/// A named operation the assistant may call.
pub struct Tool {
    name: &'static str,
    description: &'static str,
    schema: ArgumentSchema,
    guard: Option<ArgumentGuard>,
    handler: ToolHandler,
}

impl Tool {
    /// Creates a tool with no arguments.
    #[must_use]
    pub fn new(name: &'static str, description: &'static str, handler: ToolHandler) -> Self {
        Self {
            name,
            description,
            schema: ArgumentSchema::new(),
            guard: None,
            handler,
        }
    }

    /// Sets the argument schema.
    #[must_use]
    pub fn with_schema(mut self, schema: ArgumentSchema) -> Self {
        self.schema = schema;
        self
    }

    /// Adds a check that runs before dispatch.
    #[must_use]
    pub fn with_guard(mut self, guard: ArgumentGuard) -> Self {
        self.guard = Some(guard);
        self
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn is_effecting(&self) -> bool {
        self.handler.is_effecting()
    }

    /// The tool as advertised to the completion provider.
    #[must_use]
    pub fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name.to_string(),
            description: self.description.to_string(),
            parameters: self.schema.to_json_schema(),
        }
    }
}

impl fmt::Debug for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("effecting", &self.is_effecting())
            .finish_non_exhaustive()
    }
}

/// An ordered set of tools.
#[derive(Debug, Default)]
pub struct ToolCatalog {
    tools: Vec<Tool>,
}

impl ToolCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tool, replacing any tool with the same name.
    #[must_use]
    pub fn with_tool(mut self, tool: Tool) -> Self {
        self.tools.retain(|t| t.name != tool.name);
        self.tools.push(tool);
        self
    }

    /// Gets a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.iter().find(|t| t.name == name)
    }

    /// Returns the tool names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.tools.iter().map(|t| t.name)
    }

    /// The catalog as advertised to the completion provider.
    #[must_use]
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(Tool::spec).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Runs one tool call.
    ///
    /// Never fails: unknown tools, invalid arguments, handler errors and
    /// handler panics all come back as [`ToolResult::Err`].
    #[instrument(skip(self, call, ctx), fields(tool = %call.name, call_id = %call.id))]
    pub async fn dispatch(&self, call: &ToolCall, ctx: &mut EffectContext<'_>) -> ToolResult {
        let Some(tool) = self.get(&call.name) else {
            warn!("unknown tool requested");
            return ToolResult::err(
                ToolErrorKind::BadArguments,
                format!("unknown tool '{}'", call.name),
            );
        };

        let args = match tool.schema.validate(&call.arguments) {
            Ok(args) => args,
            Err(failure) => {
                debug!(reason = %failure.message, "tool arguments rejected");
                return failure.into();
            }
        };
        if let Some(guard) = tool.guard
            && let Err(failure) = guard(&args)
        {
            warn!(kind = %failure.kind, reason = %failure.message, "tool call refused before dispatch");
            return failure.into();
        }

        let outcome = match &tool.handler {
            ToolHandler::PureLookup(handler) => {
                let view = ctx.view();
                AssertUnwindSafe(handler.call(&args, &view))
                    .catch_unwind()
                    .await
            }
            ToolHandler::Effecting(handler) => {
                AssertUnwindSafe(handler.call(&args, ctx))
                    .catch_unwind()
                    .await
            }
        };

        match outcome {
            Ok(Ok(data)) => {
                debug!("tool call succeeded");
                ToolResult::ok(data)
            }
            Ok(Err(failure)) => {
                if failure.kind == ToolErrorKind::ImmutableAfterCommit {
                    error!(reason = %failure.message, "attempt to change a committed booking");
                } else {
                    warn!(kind = %failure.kind, reason = %failure.message, "tool call failed");
                }
                failure.into()
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(panic = %message, "tool handler panicked");
                ToolResult::err(
                    ToolErrorKind::Internal,
                    format!("tool '{}' failed unexpectedly: {message}", call.name),
                )
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use care_coordinator_core::FixedClock;
    use care_coordinator_lookup::InMemoryDirectory;

    struct Echo;

    #[async_trait]
    impl LookupHandler for Echo {
        async fn call(
            &self,
            args: &ToolArguments,
            ctx: &LookupContext<'_>,
        ) -> Result<JsonValue, ToolFailure> {
            Ok(json!({ "specialty": args.string("specialty")?, "patient": ctx.patient.name }))
        }
    }

    struct Panics;

    #[async_trait]
    impl EffectingHandler for Panics {
        async fn call(
            &self,
            _args: &ToolArguments,
            _ctx: &mut EffectContext<'_>,
        ) -> Result<JsonValue, ToolFailure> {
            panic!("handler exploded");
        }
    }

    struct Fails;

    #[async_trait]
    impl LookupHandler for Fails {
        async fn call(
            &self,
            _args: &ToolArguments,
            _ctx: &LookupContext<'_>,
        ) -> Result<JsonValue, ToolFailure> {
            Err(LookupError::Timeout {
                operation: "providers_by_specialty",
            }
            .into())
        }
    }

    fn catalog() -> ToolCatalog {
        ToolCatalog::new()
            .with_tool(
                Tool::new("echo", "Echo", ToolHandler::PureLookup(Box::new(Echo))).with_schema(
                    ArgumentSchema::new()
                        .required("specialty", ArgumentType::String, "Specialty")
                        .optional("provider_id", ArgumentType::Integer, "Provider"),
                ),
            )
            .with_tool(Tool::new(
                "explode",
                "Panics",
                ToolHandler::Effecting(Box::new(Panics)),
            ))
            .with_tool(Tool::new(
                "slow",
                "Times out",
                ToolHandler::PureLookup(Box::new(Fails)),
            ))
    }

    async fn run(call: ToolCall) -> ToolResult {
        let directory = InMemoryDirectory::sample();
        let mut patient = directory
            .patient(care_coordinator_core::PatientId::new(1))
            .await
            .expect("patient");
        let mut booking = Booking::new(&patient);
        let clock = FixedClock(NaiveDate::from_ymd_opt(2025, 6, 15).expect("date"));
        let mut ctx = EffectContext {
            lookup: &directory,
            clock: &clock,
            patient: &mut patient,
            booking: &mut booking,
        };
        catalog().dispatch(&call, &mut ctx).await
    }

    #[tokio::test]
    async fn dispatches_valid_call() {
        let result = run(ToolCall::new("1", "echo", json!({"specialty": "Orthopedics"}))).await;
        assert_eq!(
            result,
            ToolResult::ok(json!({"specialty": "Orthopedics", "patient": "John Doe"}))
        );
    }

    #[tokio::test]
    async fn rejects_ill_typed_arguments() {
        let cases = [
            json!({}),
            json!({"specialty": 7}),
            json!({"specialty": "Orthopedics", "provider_id": "two"}),
            json!({"specialty": "Orthopedics", "extra": true}),
            JsonValue::String("{not json".to_string()),
        ];
        for arguments in cases {
            let result = run(ToolCall::new("1", "echo", arguments.clone())).await;
            assert_eq!(
                result.error_kind(),
                Some(ToolErrorKind::BadArguments),
                "{arguments}"
            );
        }
    }

    #[tokio::test]
    async fn null_optional_argument_is_absent() {
        let result = run(ToolCall::new(
            "1",
            "echo",
            json!({"specialty": "Surgery", "provider_id": null}),
        ))
        .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn unknown_tool_is_bad_arguments() {
        let result = run(ToolCall::new("1", "cancel_everything", json!({}))).await;
        assert_eq!(result.error_kind(), Some(ToolErrorKind::BadArguments));
    }

    #[tokio::test]
    async fn panics_become_internal_errors() {
        let result = run(ToolCall::new("1", "explode", json!({}))).await;
        let ToolResult::Err { kind, message } = result else {
            panic!("expected error");
        };
        assert_eq!(kind, ToolErrorKind::Internal);
        assert!(message.contains("handler exploded"));
    }

    #[tokio::test]
    async fn lookup_timeout_maps_to_timeout() {
        let result = run(ToolCall::new("1", "slow", json!({}))).await;
        assert_eq!(result.error_kind(), Some(ToolErrorKind::Timeout));
    }

    #[test]
    fn schema_lists_required_arguments() {
        let schema = ArgumentSchema::new()
            .required("start_date", ArgumentType::Date, "First day")
            .optional("end_date", ArgumentType::Date, "Last day")
            .to_json_schema();
        assert_eq!(schema["required"], json!(["start_date"]));
        assert_eq!(schema["properties"]["end_date"]["format"], "date");
        assert_eq!(schema["additionalProperties"], false);
    }

    #[test]
    fn date_and_time_arguments_are_strict() {
        let schema = ArgumentSchema::new()
            .required("date", ArgumentType::Date, "Date")
            .required("time", ArgumentType::Time, "Time");
        assert!(
            schema
                .validate(&json!({"date": "2025-06-16", "time": "10:00"}))
                .is_ok()
        );
        assert!(
            schema
                .validate(&json!({"date": "06/16/2025", "time": "10:00"}))
                .is_err()
        );
        assert!(
            schema
                .validate(&json!({"date": "2025-06-16", "time": "10am"}))
                .is_err()
        );
    }

    #[test]
    fn tool_result_wire_shape() {
        let json = ToolResult::err(ToolErrorKind::ForbiddenOperation, "no").to_json();
        assert_eq!(json["status"], "err");
        assert_eq!(json["kind"], "forbidden_operation");
        assert_eq!(ToolResult::ok(json!(1)).outcome(), "ok");
    }
}
