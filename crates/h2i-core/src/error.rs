//! Unified error types for h2i plant models
//!
//! Every failure in a model run surfaces as an [`H2iError`]. The four
//! modeling categories are kept distinct so callers can tell a bad plant file
//! from a missing index year or a physically meaningless input:
//!
//! - [`H2iError::Configuration`]: missing/invalid config key, unknown
//!   technology or `conversion_tech`, duplicate variable declaration
//! - [`H2iError::Lookup`]: year absent from a price index, row absent from a
//!   coefficient table
//! - [`H2iError::Domain`]: zero annual production, negative capacity, etc.
//! - [`H2iError::NotImplemented`]: a template stage evaluated directly
//!
//! # Example
//!
//! ```ignore
//! use h2i_core::{H2iError, H2iResult};
//!
//! fn levelize(cost: f64, output: f64) -> H2iResult<f64> {
//!     if output <= 0.0 {
//!         return Err(H2iError::domain("annual output must be positive"));
//!     }
//!     Ok(cost / output)
//! }
//! ```

use thiserror::Error;

/// Unified error type for all h2i operations.
#[derive(Error, Debug)]
pub enum H2iError {
    /// Required configuration key absent, unknown technology selector,
    /// conflicting declarations or shape mismatches.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Requested year or table row does not exist.
    #[error("Lookup error: {0}")]
    Lookup(String),

    /// Physically or arithmetically invalid value.
    #[error("Domain error: {0}")]
    Domain(String),

    /// Template stage invoked without a concrete technology behind it.
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// I/O errors (config files, CSV tables)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing/deserialization errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

impl H2iError {
    pub fn config(message: impl Into<String>) -> Self {
        H2iError::Configuration(message.into())
    }

    pub fn lookup(message: impl Into<String>) -> Self {
        H2iError::Lookup(message.into())
    }

    pub fn domain(message: impl Into<String>) -> Self {
        H2iError::Domain(message.into())
    }

    pub fn not_implemented(message: impl Into<String>) -> Self {
        H2iError::NotImplemented(message.into())
    }

    /// Short category label recorded with failed batch jobs.
    pub fn category(&self) -> &'static str {
        match self {
            H2iError::Configuration(_) => "configuration",
            H2iError::Lookup(_) => "lookup",
            H2iError::Domain(_) => "domain",
            H2iError::NotImplemented(_) => "not_implemented",
            H2iError::Io(_) => "io",
            H2iError::Parse(_) => "parse",
            H2iError::Other(_) => "other",
        }
    }
}

/// Convenience type alias for Results using H2iError.
pub type H2iResult<T> = Result<T, H2iError>;

// Conversion from anyhow::Error
impl From<anyhow::Error> for H2iError {
    fn from(err: anyhow::Error) -> Self {
        H2iError::Other(format!("{err:#}"))
    }
}

// Conversion from string-like types for convenience
impl From<String> for H2iError {
    fn from(s: String) -> Self {
        H2iError::Other(s)
    }
}

impl From<&str> for H2iError {
    fn from(s: &str) -> Self {
        H2iError::Other(s.to_string())
    }
}

impl From<serde_json::Error> for H2iError {
    fn from(err: serde_json::Error) -> Self {
        H2iError::Parse(err.to_string())
    }
}

impl From<serde_yaml::Error> for H2iError {
    fn from(err: serde_yaml::Error) -> Self {
        H2iError::Parse(err.to_string())
    }
}

impl From<csv::Error> for H2iError {
    fn from(err: csv::Error) -> Self {
        H2iError::Parse(err.to_string())
    }
}
