use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ordering::PricingPolicy;

/// Searched in order when no explicit path is given.
pub const CONFIG_FILE_CANDIDATES: [&str; 2] = ["ordercopilot.toml", "config/ordercopilot.toml"];

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub catalog: CatalogConfig,
    pub pricing: PricingConfig,
    pub matching: MatchingConfig,
    pub ordering: OrderingConfig,
    pub sessions: SessionConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug, Default)]
pub struct CatalogConfig {
    pub path: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct PricingConfig {
    pub tax_rate: Decimal,
    pub free_shipping_threshold: Decimal,
    pub shipping_fee: Decimal,
    pub currency: String,
}

#[derive(Clone, Debug)]
pub struct MatchingConfig {
    pub max_results: usize,
    pub min_score: f64,
}

#[derive(Clone, Debug)]
pub struct OrderingConfig {
    pub order_id_prefix: String,
}

#[derive(Clone, Debug, Default)]
pub struct SessionConfig {
    pub idle_ttl_secs: Option<u64>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    Disabled,
    #[serde(rename = "openai")]
    OpenAi,
    Ollama,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub catalog_path: Option<PathBuf>,
    pub order_id_prefix: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        let pricing = PricingPolicy::default();
        Self {
            llm: LlmConfig {
                provider: LlmProvider::Disabled,
                api_key: None,
                base_url: None,
                model: "gpt-4o-mini".to_string(),
                timeout_secs: 30,
            },
            catalog: CatalogConfig::default(),
            pricing: PricingConfig {
                tax_rate: pricing.tax_rate,
                free_shipping_threshold: pricing.free_shipping_threshold,
                shipping_fee: pricing.shipping_fee,
                currency: pricing.currency,
            },
            matching: MatchingConfig { max_results: 5, min_score: 0.3 },
            ordering: OrderingConfig { order_id_prefix: "UB".to_string() },
            sessions: SessionConfig::default(),
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "disabled" | "none" => Ok(Self::Disabled),
            "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected disabled|openai|ollama)"
            ))),
        }
    }
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(CONFIG_FILE_CANDIDATES[0]));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn pricing_policy(&self) -> PricingPolicy {
        PricingPolicy {
            tax_rate: self.pricing.tax_rate,
            free_shipping_threshold: self.pricing.free_shipping_threshold,
            shipping_fee: self.pricing.shipping_fee,
            currency: self.pricing.currency.clone(),
        }
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
        }

        if let Some(catalog) = patch.catalog {
            if let Some(path) = catalog.path {
                self.catalog.path = Some(path);
            }
        }

        if let Some(pricing) = patch.pricing {
            if let Some(tax_rate) = pricing.tax_rate {
                self.pricing.tax_rate = tax_rate;
            }
            if let Some(threshold) = pricing.free_shipping_threshold {
                self.pricing.free_shipping_threshold = threshold;
            }
            if let Some(shipping_fee) = pricing.shipping_fee {
                self.pricing.shipping_fee = shipping_fee;
            }
            if let Some(currency) = pricing.currency {
                self.pricing.currency = currency;
            }
        }

        if let Some(matching) = patch.matching {
            if let Some(max_results) = matching.max_results {
                self.matching.max_results = max_results;
            }
            if let Some(min_score) = matching.min_score {
                self.matching.min_score = min_score;
            }
        }

        if let Some(ordering) = patch.ordering {
            if let Some(prefix) = ordering.order_id_prefix {
                self.ordering.order_id_prefix = prefix;
            }
        }

        if let Some(sessions) = patch.sessions {
            if let Some(idle_ttl_secs) = sessions.idle_ttl_secs {
                self.sessions.idle_ttl_secs = Some(idle_ttl_secs);
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("ORDERCOPILOT_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = read_env("ORDERCOPILOT_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("ORDERCOPILOT_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("ORDERCOPILOT_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("ORDERCOPILOT_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_env("ORDERCOPILOT_LLM_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("ORDERCOPILOT_CATALOG_PATH") {
            self.catalog.path = Some(PathBuf::from(value));
        }

        if let Some(value) = read_env("ORDERCOPILOT_PRICING_TAX_RATE") {
            self.pricing.tax_rate = parse_env("ORDERCOPILOT_PRICING_TAX_RATE", &value)?;
        }
        if let Some(value) = read_env("ORDERCOPILOT_PRICING_FREE_SHIPPING_THRESHOLD") {
            self.pricing.free_shipping_threshold =
                parse_env("ORDERCOPILOT_PRICING_FREE_SHIPPING_THRESHOLD", &value)?;
        }
        if let Some(value) = read_env("ORDERCOPILOT_PRICING_SHIPPING_FEE") {
            self.pricing.shipping_fee = parse_env("ORDERCOPILOT_PRICING_SHIPPING_FEE", &value)?;
        }
        if let Some(value) = read_env("ORDERCOPILOT_PRICING_CURRENCY") {
            self.pricing.currency = value;
        }

        if let Some(value) = read_env("ORDERCOPILOT_MATCHING_MAX_RESULTS") {
            self.matching.max_results = parse_env("ORDERCOPILOT_MATCHING_MAX_RESULTS", &value)?;
        }
        if let Some(value) = read_env("ORDERCOPILOT_MATCHING_MIN_SCORE") {
            self.matching.min_score = parse_env("ORDERCOPILOT_MATCHING_MIN_SCORE", &value)?;
        }

        if let Some(value) = read_env("ORDERCOPILOT_ORDERING_ORDER_ID_PREFIX") {
            self.ordering.order_id_prefix = value;
        }

        if let Some(value) = read_env("ORDERCOPILOT_SESSIONS_IDLE_TTL_SECS") {
            self.sessions.idle_ttl_secs =
                Some(parse_env("ORDERCOPILOT_SESSIONS_IDLE_TTL_SECS", &value)?);
        }

        let log_level =
            read_env("ORDERCOPILOT_LOGGING_LEVEL").or_else(|| read_env("ORDERCOPILOT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("ORDERCOPILOT_LOGGING_FORMAT").or_else(|| read_env("ORDERCOPILOT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(catalog_path) = overrides.catalog_path {
            self.catalog.path = Some(catalog_path);
        }
        if let Some(order_id_prefix) = overrides.order_id_prefix {
            self.ordering.order_id_prefix = order_id_prefix;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_llm(&self.llm)?;
        validate_pricing(&self.pricing)?;
        validate_matching(&self.matching)?;
        validate_ordering(&self.ordering)?;
        validate_sessions(&self.sessions)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

/// First existing config file: the explicit path if given, else the default candidates.
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    CONFIG_FILE_CANDIDATES.into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.provider == LlmProvider::Disabled {
        return Ok(());
    }

    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }
    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
    }

    match llm.provider {
        LlmProvider::OpenAi => {
            let missing = llm
                .api_key
                .as_ref()
                .map(|value| value.expose_secret().trim().is_empty())
                .unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.api_key is required for the openai provider".to_string(),
                ));
            }
        }
        LlmProvider::Ollama => {
            let missing =
                llm.base_url.as_ref().map(|value| value.trim().is_empty()).unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.base_url is required for the ollama provider".to_string(),
                ));
            }
        }
        LlmProvider::Disabled => {}
    }

    if let Some(base_url) = &llm.base_url {
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "llm.base_url must start with http:// or https://".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_pricing(pricing: &PricingConfig) -> Result<(), ConfigError> {
    if pricing.tax_rate < Decimal::ZERO || pricing.tax_rate >= Decimal::ONE {
        return Err(ConfigError::Validation(
            "pricing.tax_rate must be a fraction in range 0..1 (e.g. 0.09)".to_string(),
        ));
    }
    if pricing.free_shipping_threshold < Decimal::ZERO || pricing.shipping_fee < Decimal::ZERO {
        return Err(ConfigError::Validation(
            "pricing.free_shipping_threshold and pricing.shipping_fee must not be negative"
                .to_string(),
        ));
    }
    let currency = pricing.currency.as_str();
    if currency.len() != 3 || !currency.chars().all(|ch| ch.is_ascii_uppercase()) {
        return Err(ConfigError::Validation(
            "pricing.currency must be a three-letter ISO code such as `SGD`".to_string(),
        ));
    }
    Ok(())
}

fn validate_matching(matching: &MatchingConfig) -> Result<(), ConfigError> {
    if matching.max_results == 0 {
        return Err(ConfigError::Validation(
            "matching.max_results must be greater than zero".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&matching.min_score) {
        return Err(ConfigError::Validation(
            "matching.min_score must be in range 0.0..=1.0".to_string(),
        ));
    }
    Ok(())
}

fn validate_ordering(ordering: &OrderingConfig) -> Result<(), ConfigError> {
    let prefix = ordering.order_id_prefix.as_str();
    if prefix.len() != 2 || !prefix.chars().all(|ch| ch.is_ascii_uppercase()) {
        return Err(ConfigError::Validation(format!(
            "ordering.order_id_prefix must be two upper-case letters, got `{prefix}`"
        )));
    }
    Ok(())
}

fn validate_sessions(sessions: &SessionConfig) -> Result<(), ConfigError> {
    if sessions.idle_ttl_secs == Some(0) {
        return Err(ConfigError::Validation(
            "sessions.idle_ttl_secs must be greater than zero when set".to_string(),
        ));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    llm: Option<LlmPatch>,
    catalog: Option<CatalogPatch>,
    pricing: Option<PricingPatch>,
    matching: Option<MatchingPatch>,
    ordering: Option<OrderingPatch>,
    sessions: Option<SessionPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct CatalogPatch {
    path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct PricingPatch {
    tax_rate: Option<Decimal>,
    free_shipping_threshold: Option<Decimal>,
    shipping_fee: Option<Decimal>,
    currency: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct MatchingPatch {
    max_results: Option<usize>,
    min_score: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct OrderingPatch {
    order_id_prefix: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SessionPatch {
    idle_ttl_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
