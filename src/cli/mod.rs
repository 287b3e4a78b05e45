//! CLI support for ofilter
//!
//! Provides programmatic access to the `check` and `explain` commands so they can be
//! embedded in other tools.

mod check;

pub use check::{CheckOptions, CheckResult, execute_check, explain, load_schema};

use std::io;

use thiserror::Error;

/// Errors that can occur during CLI operations
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Compile(#[from] crate::FilterError),

    #[error("Evaluation error: {0}")]
    Eval(#[from] crate::EvalError),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("No input provided. Use --input or pipe JSON to stdin.")]
    NoInput,

    /// Input was valid JSON but not an object or an array of objects
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
