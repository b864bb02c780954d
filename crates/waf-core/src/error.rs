//! Error types for the WAF filter

use thiserror::Error;

/// Configuration decode failure
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Payload did not match the schema (bad JSON, unknown field, wrong type)
    #[error("failed parsing config: {payload}: {source}")]
    Malformed {
        payload: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Failure reported by the rule engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Rule fragment at `index` was rejected
    #[error("rule {index} failed to load: {reason}")]
    RuleLoad { index: usize, reason: String },

    /// Transaction could not be created
    #[error("transaction error: {0}")]
    Transaction(String),

    /// Inspection failed to produce a verdict
    #[error("inspection error: {0}")]
    Inspection(String),
}

/// WAF filter error type
#[derive(Error, Debug)]
pub enum WafError {
    /// Configuration error
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Rule engine error
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// Configure was called before the engine was allocated
    #[error("controller not started")]
    NotStarted,
}

/// Result type for the WAF filter
pub type Result<T> = std::result::Result<T, WafError>;
