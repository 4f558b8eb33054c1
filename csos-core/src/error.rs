//! Error types for CSOS operations

use thiserror::Error;

/// Configuration errors.
///
/// Raised eagerly at startup, before any rule load is attempted.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Errors produced when interpreting a rule document.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RuleError {
    #[error("Unknown rule set: {name}")]
    UnknownRuleSet { name: String },

    #[error("Invalid {kind} document: {reason}")]
    InvalidRuleSet { kind: String, reason: String },
}
