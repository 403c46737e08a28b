pub mod config;
pub mod doctor;
pub mod migrate;
pub mod quote;
pub mod seed;
pub mod tables;

use std::sync::Arc;

use capquote_core::config::{AppConfig, LoadOptions};
use capquote_core::cpq::repository::{PriceTableRepository, RefreshPolicy};
use capquote_core::cpq::{EngineSettings, QuoteEngine};
use capquote_db::{open_table_source, DbPool};
use serde::Serialize;
use tokio::runtime::Runtime;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

/// `(error_class, message, exit_code)` carried out of a command's async block.
pub(crate) type Failure = (&'static str, String, u8);

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    /// Successful command whose output is a structured document rather than a status line.
    pub fn document(command: &str, document: &impl Serialize) -> Self {
        match serde_json::to_string_pretty(document) {
            Ok(output) => Self { exit_code: 0, output },
            Err(error) => Self::failure(command, "serialization", error.to_string(), 1),
        }
    }

    fn from_failure(command: &str, (error_class, message, exit_code): Failure) -> Self {
        Self::failure(command, error_class, message, exit_code)
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

pub(crate) fn load_config() -> Result<AppConfig, Failure> {
    AppConfig::load(LoadOptions::default())
        .map_err(|error| ("config_validation", format!("configuration issue: {error}"), 2))
}

pub(crate) fn runtime() -> Result<Runtime, Failure> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| {
            ("runtime_init", format!("failed to initialize async runtime: {error}"), 3)
        })
}

/// Config, then runtime, then the command body; any failure becomes the command's JSON error.
pub(crate) fn execute<F, Fut>(command: &str, body: F) -> CommandResult
where
    F: FnOnce(AppConfig) -> Fut,
    Fut: std::future::Future<Output = Result<CommandResult, Failure>>,
{
    let outcome = load_config()
        .and_then(|config| runtime().map(|runtime| (config, runtime)))
        .and_then(|(config, runtime)| runtime.block_on(body(config)));
    outcome.unwrap_or_else(|failure| CommandResult::from_failure(command, failure))
}

/// Opens the configured table source and loads the first snapshot.
pub(crate) async fn open_engine(
    config: &AppConfig,
) -> Result<(Arc<QuoteEngine>, Option<DbPool>), Failure> {
    let opened = open_table_source(config)
        .await
        .map_err(|error| ("table_source", error.to_string(), 4u8))?;
    let repository =
        Arc::new(PriceTableRepository::new(opened.source, RefreshPolicy::from(&config.pricing)));
    repository
        .refresh()
        .await
        .map_err(|error| (error.error_class(), error.to_string(), 4u8))?;
    let engine = Arc::new(QuoteEngine::new(repository, EngineSettings::from(&config.pricing)));
    Ok((engine, opened.pool))
}
