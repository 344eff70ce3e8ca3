use std::env;
use std::fs;
use std::path::Path;

use toml::Value;

use ordercopilot_core::config::{resolve_config_path, AppConfig};

use super::GlobalArgs;

struct Field {
    key_path: &'static str,
    value: String,
    env_keys: &'static [&'static str],
    cli_flag: Option<&'static str>,
}

/// Effective configuration, one line per key, with where each value came from.
pub fn run(config: &AppConfig, global: &GlobalArgs) -> String {
    let config_file_path = resolve_config_path(global.config.as_deref());
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines =
        vec!["effective config (source precedence: cli > env > file > default):".to_string()];
    for field in fields(config) {
        let cli_set = match field.cli_flag {
            Some("--catalog") => global.catalog.is_some(),
            Some("--llm-provider") => global.llm_provider.is_some(),
            Some("--log-level") => global.log_level.is_some(),
            Some("--log-format") => global.log_format.is_some(),
            _ => false,
        };
        let source = if cli_set {
            format!("cli ({})", field.cli_flag.unwrap_or_default())
        } else {
            field_source(field.key_path, field.env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
        };
        lines.push(render_line(field.key_path, &field.value, source));
    }

    lines.join("\n")
}

fn fields(config: &AppConfig) -> Vec<Field> {
    let llm_api_key = if config.llm.api_key.is_some() { "<redacted>" } else { "<unset>" };
    vec![
        Field {
            key_path: "llm.provider",
            value: format!("{:?}", config.llm.provider),
            env_keys: &["ORDERCOPILOT_LLM_PROVIDER"],
            cli_flag: Some("--llm-provider"),
        },
        Field {
            key_path: "llm.model",
            value: config.llm.model.clone(),
            env_keys: &["ORDERCOPILOT_LLM_MODEL"],
            cli_flag: None,
        },
        Field {
            key_path: "llm.base_url",
            value: config.llm.base_url.clone().unwrap_or_else(|| "<unset>".to_string()),
            env_keys: &["ORDERCOPILOT_LLM_BASE_URL"],
            cli_flag: None,
        },
        Field {
            key_path: "llm.api_key",
            value: llm_api_key.to_string(),
            env_keys: &["ORDERCOPILOT_LLM_API_KEY"],
            cli_flag: None,
        },
        Field {
            key_path: "llm.timeout_secs",
            value: config.llm.timeout_secs.to_string(),
            env_keys: &["ORDERCOPILOT_LLM_TIMEOUT_SECS"],
            cli_flag: None,
        },
        Field {
            key_path: "catalog.path",
            value: config
                .catalog
                .path
                .as_ref()
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "<unset>".to_string()),
            env_keys: &["ORDERCOPILOT_CATALOG_PATH"],
            cli_flag: Some("--catalog"),
        },
        Field {
            key_path: "pricing.tax_rate",
            value: config.pricing.tax_rate.to_string(),
            env_keys: &["ORDERCOPILOT_PRICING_TAX_RATE"],
            cli_flag: None,
        },
        Field {
            key_path: "pricing.free_shipping_threshold",
            value: config.pricing.free_shipping_threshold.to_string(),
            env_keys: &["ORDERCOPILOT_PRICING_FREE_SHIPPING_THRESHOLD"],
            cli_flag: None,
        },
        Field {
            key_path: "pricing.shipping_fee",
            value: config.pricing.shipping_fee.to_string(),
            env_keys: &["ORDERCOPILOT_PRICING_SHIPPING_FEE"],
            cli_flag: None,
        },
        Field {
            key_path: "pricing.currency",
            value: config.pricing.currency.clone(),
            env_keys: &["ORDERCOPILOT_PRICING_CURRENCY"],
            cli_flag: None,
        },
        Field {
            key_path: "matching.max_results",
            value: config.matching.max_results.to_string(),
            env_keys: &["ORDERCOPILOT_MATCHING_MAX_RESULTS"],
            cli_flag: None,
        },
        Field {
            key_path: "matching.min_score",
            value: config.matching.min_score.to_string(),
            env_keys: &["ORDERCOPILOT_MATCHING_MIN_SCORE"],
            cli_flag: None,
        },
        Field {
            key_path: "ordering.order_id_prefix",
            value: config.ordering.order_id_prefix.clone(),
            env_keys: &["ORDERCOPILOT_ORDERING_ORDER_ID_PREFIX"],
            cli_flag: None,
        },
        Field {
            key_path: "sessions.idle_ttl_secs",
            value: config
                .sessions
                .idle_ttl_secs
                .map(|secs| secs.to_string())
                .unwrap_or_else(|| "<unset>".to_string()),
            env_keys: &["ORDERCOPILOT_SESSIONS_IDLE_TTL_SECS"],
            cli_flag: None,
        },
        Field {
            key_path: "logging.level",
            value: config.logging.level.clone(),
            env_keys: &["ORDERCOPILOT_LOGGING_LEVEL", "ORDERCOPILOT_LOG_LEVEL"],
            cli_flag: Some("--log-level"),
        },
        Field {
            key_path: "logging.format",
            value: format!("{:?}", config.logging.format),
            env_keys: &["ORDERCOPILOT_LOGGING_FORMAT", "ORDERCOPILOT_LOG_FORMAT"],
            cli_flag: Some("--log-format"),
        },
    ]
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
