// CLI module for oggscope
//
// This module provides the command-line interface on top of the oggscope
// library. It is only compiled into the binary.

pub mod commands;
pub mod config;
pub mod output;

pub use commands::run;
pub use config::{Commands, Config};
pub use output::OutputFormatter;

use thiserror::Error;

// Error type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("No files specified")]
    NoFiles,

    #[error("Invalid pattern {pattern}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{path}: {source}")]
    Inspect {
        path: String,
        #[source]
        source: oggscope::Error,
    },

    #[error("Output error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0} of {1} file(s) failed")]
    Failed(usize, usize),
}
