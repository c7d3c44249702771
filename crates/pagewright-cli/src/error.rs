//! Error types for the CLI

use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Static server error
    #[error("Server error: {message}")]
    Server {
        /// Error message
        message: String,
    },

    /// A child process could not be started or supervised
    #[error("Process `{command}` failed: {message}")]
    Process {
        /// Command line of the process
        command: String,
        /// Error message
        message: String,
    },

    /// The automation server never reported readiness
    #[error("Automation server not ready after {timeout_secs}s (waiting for /{pattern}/)")]
    Readiness {
        /// Readiness pattern
        pattern: String,
        /// Timeout in seconds
        timeout_secs: u64,
    },

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl CliError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a server error
    #[must_use]
    pub fn server(message: impl Into<String>) -> Self {
        Self::Server {
            message: message.into(),
        }
    }

    /// Create a process error
    #[must_use]
    pub fn process(command: impl ToString, message: impl Into<String>) -> Self {
        Self::Process {
            command: command.to_string(),
            message: message.into(),
        }
    }
}
