//! Error handling for vispipe
//!
//! `PipelineError` covers the request protocol itself. `VisPipeError` is the
//! crate-level error for everything around it: configuration files, logging
//! setup and IO.

use crate::pipeline::PipelineError;
use thiserror::Error;

/// Main error type for vispipe operations
#[derive(Error, Debug)]
pub enum VisPipeError {
    /// Invalid or unreadable pipeline configuration, or a logging setup failure
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem failure while touching config or log files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON or TOML, or a snapshot that could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Errors raised by the pipeline engine
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Any of the above, wrapped with what the caller was doing
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<VisPipeError>,
    },
}

impl VisPipeError {
    /// Wrap this error with a description of the failed operation
    pub fn with_context(self, context: impl Into<String>) -> Self {
        VisPipeError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

impl From<serde_json::Error> for VisPipeError {
    fn from(err: serde_json::Error) -> Self {
        VisPipeError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for VisPipeError {
    fn from(err: toml::de::Error) -> Self {
        VisPipeError::Serialization(err.to_string())
    }
}

impl From<toml::ser::Error> for VisPipeError {
    fn from(err: toml::ser::Error) -> Self {
        VisPipeError::Serialization(err.to_string())
    }
}

/// Result type alias for vispipe operations
pub type Result<T> = std::result::Result<T, VisPipeError>;

/// Attaches context to any result whose error converts into `VisPipeError`
pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Like `context`, but only builds the message on failure
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E: Into<VisPipeError>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().with_context(f()))
    }
}
