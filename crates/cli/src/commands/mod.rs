pub mod chat;
pub mod config;
pub mod match_query;
pub mod parse;
pub mod quote;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use serde::Serialize;
use serde_json::Value;

use ordercopilot_core::config::{
    AppConfig, ConfigError, ConfigOverrides, LlmProvider, LoadOptions, LogFormat,
};
use ordercopilot_core::{ApplicationError, CatalogIndex};

pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_CATALOG: u8 = 3;

/// Flags shared by every subcommand; they win over file and environment settings.
#[derive(Clone, Debug, Default, Args)]
pub struct GlobalArgs {
    #[arg(long, global = true, help = "Path to an ordercopilot.toml config file")]
    pub config: Option<PathBuf>,
    #[arg(long, global = true, help = "Path to the catalog JSON export")]
    pub catalog: Option<PathBuf>,
    #[arg(long, global = true, help = "Completion provider: disabled|openai|ollama")]
    pub llm_provider: Option<String>,
    #[arg(long, global = true, help = "Log level: trace|debug|info|warn|error")]
    pub log_level: Option<String>,
    #[arg(long, global = true, help = "Log format: compact|pretty|json")]
    pub log_format: Option<String>,
}

impl GlobalArgs {
    pub fn load_options(&self) -> Result<LoadOptions, ConfigError> {
        let overrides = ConfigOverrides {
            log_level: self.log_level.clone(),
            log_format: self.log_format.as_deref().map(str::parse::<LogFormat>).transpose()?,
            llm_provider: self.llm_provider.as_deref().map(str::parse::<LlmProvider>).transpose()?,
            llm_model: None,
            catalog_path: self.catalog.clone(),
            order_id_prefix: None,
        };

        Ok(LoadOptions {
            require_file: self.config.is_some(),
            config_path: self.config.clone(),
            overrides,
        })
    }
}

pub fn load_config(command: &str, global: &GlobalArgs) -> Result<AppConfig, CommandResult> {
    global
        .load_options()
        .and_then(AppConfig::load)
        .map_err(|error| CommandResult::from_error(command, &ApplicationError::from(error), EXIT_CONFIG))
}

pub fn load_catalog(command: &str, config: &AppConfig) -> Result<Arc<CatalogIndex>, CommandResult> {
    let Some(path) = config.catalog.path.as_deref() else {
        return Err(CommandResult::failure(
            command,
            "catalog_missing",
            "no catalog configured; set catalog.path or pass --catalog",
            EXIT_CATALOG,
        ));
    };

    CatalogIndex::load(path)
        .map(Arc::new)
        .map_err(|error| CommandResult::from_error(command, &error, EXIT_CATALOG))
}

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
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data: None,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn success_with_data<T: Serialize>(command: &str, message: impl Into<String>, data: &T) -> Self {
        let data = match serde_json::to_value(data) {
            Ok(data) => data,
            Err(error) => return Self::failure(command, "serialization", error.to_string(), EXIT_FAILURE),
        };
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data: Some(data),
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
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    pub fn from_error(command: &str, error: &ApplicationError, exit_code: u8) -> Self {
        Self::failure(command, error.error_class(), error.to_string(), exit_code)
    }

    /// A completion service that could not be built from config.
    pub fn integration_failure(command: &str, error: &anyhow::Error) -> Self {
        Self::from_error(command, &ApplicationError::Integration(format!("{error:#}")), EXIT_FAILURE)
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
