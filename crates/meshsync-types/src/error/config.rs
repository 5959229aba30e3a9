//! Configuration-related errors.
//!
//! These are the only errors allowed to prevent startup: they describe a
//! misconfigured deployment rather than a runtime condition.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while validating configuration.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum ConfigError {
    /// Config document could not be parsed (JSON)
    #[error("Config parse error: {message}")]
    ParseError {
        /// Description of the parse failure
        message: String,
    },

    /// Config validation error (invalid values)
    #[error("Config validation error for {field}: {message}")]
    ValidationError {
        /// Name of the field that failed validation
        field: String,
        /// Description of the validation failure
        message: String,
    },

    /// A configured regular expression does not compile
    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidPattern {
        /// Pattern source as written in configuration
        pattern: String,
        /// Compiler error message
        message: String,
    },
}

impl ConfigError {
    /// Create a parse error from a serde_json error.
    pub fn from_json_error(e: &serde_json::Error) -> Self {
        Self::ParseError { message: e.to_string() }
    }

    /// Shorthand for a validation error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError { field: field.into(), message: message.into() }
    }
}
