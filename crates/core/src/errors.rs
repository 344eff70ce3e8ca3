use thiserror::Error;

use crate::{config::ConfigError, domain::order::OrderStatus};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid order transition from {from:?} to {to:?}")]
    InvalidOrderTransition { from: OrderStatus, to: OrderStatus },
}

/// Failures surfaced to an operator rather than to the buyer.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error("catalog failure: {0}")]
    Catalog(String),
    #[error("completion service failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl ApplicationError {
    /// Short machine-readable class used in CLI output and log fields.
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Catalog(_) => "catalog",
            Self::Integration(_) => "integration",
            Self::Configuration(_) => "configuration",
        }
    }
}

impl From<ConfigError> for ApplicationError {
    fn from(error: ConfigError) -> Self {
        Self::Configuration(error.to_string())
    }
}
