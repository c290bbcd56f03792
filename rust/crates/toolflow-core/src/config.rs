//! Solver configuration.
//!
//! ```
//! use toolflow_core::SolverConfig;
//!
//! let config = SolverConfig::from_toml_str("penalty = 500\nverify = true").unwrap();
//! assert_eq!(config.penalty, 500);
//! assert!(config.verify);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct SolverConfig {
    /// Mandatory-arc penalty. Values `<= 0` let the builder derive one.
    pub penalty: i64,

    /// Run the flow invariant checks on every solved network.
    pub verify: bool,
}

impl SolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_file(path)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn with_penalty(mut self, penalty: i64) -> Self {
        self.penalty = penalty;
        self
    }

    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = SolverConfig::from_toml_str("").unwrap();
        assert_eq!(config, SolverConfig::default());
        assert_eq!(config.penalty, 0);
        assert!(!config.verify);
    }

    #[test]
    fn reads_partial_documents() {
        let config = SolverConfig::from_toml_str("verify = true").unwrap();
        assert_eq!(config, SolverConfig::new().with_verify(true));
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = SolverConfig::from_toml_str("penalty = \"many\"").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = SolverConfig::load("/nonexistent/toolflow.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
