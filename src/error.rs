//! Error types for command execution and signing staging.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BootstrapError>;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Command failed ({}): {command}\n{output}", exit_label(.code))]
    CommandFailed {
        command: String,
        code: Option<i32>,
        output: String,
    },

    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Signing staging failed: {0}")]
    Staging(String),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parsing error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl BootstrapError {
    /// Exit status of the failed subprocess, if this error carries one.
    #[must_use]
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::CommandFailed { code, .. } => *code,
            _ => None,
        }
    }
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit status {code}"),
        None => "terminated by signal".to_string(),
    }
}
