//! Shared error types for the application

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for formsmap operations
#[derive(Debug, Error)]
pub enum Error {
    /// File system related errors
    #[error("File system error: {message}")]
    FileSystem {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    /// A source file yielded neither program units nor triggers
    #[error("No procedures or functions found in {}", .path.display())]
    NoUnitsFound { path: PathBuf },

    /// The upstream trigger list could not be decoded
    #[error("Invalid trigger list {}: {message}", .path.display())]
    TriggerList { path: PathBuf, message: String },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Generic errors with context
    #[error("{context}: {message}")]
    WithContext { context: String, message: String },
}

impl Error {
    /// Create a file system error with path context
    pub fn file_system(
        message: impl Into<String>,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::FileSystem {
            message: message.into(),
            path: Some(path.into()),
            source: Some(source),
        }
    }

    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            message: self.to_string(),
        }
    }
}

/// Result type alias using our error type
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_units_message_names_file() {
        let err = Error::NoUnitsFound {
            path: PathBuf::from("orders.pll"),
        };
        assert_eq!(
            err.to_string(),
            "No procedures or functions found in orders.pll"
        );
    }

    #[test]
    fn test_context_wraps_message() {
        let result: Result<()> = Err(Error::Configuration("bad page".into()));
        let err = result.context("loading .formsmap.toml").unwrap_err();
        assert_eq!(
            err.to_string(),
            "loading .formsmap.toml: Configuration error: bad page"
        );
    }
}
