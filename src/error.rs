//! # Error Types Module
//!
//! Questo modulo definisce i tipi di errore della pipeline.
//!
//! ## Responsabilità:
//! - Definisce `PipelineError` per gli errori che terminano il processo
//! - Definisce `ToolError` per i fallimenti dei tool esterni (mai fatali)
//! - Associa ad ogni errore fatale il proprio exit code
//!
//! ## Categorie di errori:
//! - `Usage`: Argomenti mancanti o malformati (exit 1)
//! - `InputNotFound`: File di input inesistente (exit 2)
//! - `Io`: Errori di I/O non recuperabili, es. output non scrivibile (exit 3)
//!
//! I tool non disponibili e i tool che falliscono non sono errori fatali:
//! vengono assorbiti dalla scala di degradazione (lossy → lossless → copia)
//! e compaiono solo nel log dei passi come `SkippedUnavailable` o
//! `FailedFellBack`.
//!
//! ## Esempio:
//! ```rust,ignore
//! if !input.exists() {
//!     return Err(PipelineError::InputNotFound(input.to_path_buf()));
//! }
//! ```

use std::path::PathBuf;

/// Exit code for a successful run
pub const EXIT_OK: u8 = 0;
/// Exit code for bad or missing command line arguments
pub const EXIT_USAGE: u8 = 1;
/// Exit code when the input file does not exist
pub const EXIT_INPUT_NOT_FOUND: u8 = 2;
/// Exit code for unrecoverable I/O failures
pub const EXIT_IO: u8 = 3;
/// Exit code after Ctrl-C, following the shell convention (128 + SIGINT)
pub const EXIT_INTERRUPTED: u8 = 130;
/// Exit code after SIGTERM (128 + SIGTERM)
pub const EXIT_TERMINATED: u8 = 143;

/// Fatal pipeline errors. Everything else is recovered by falling back.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("Usage error: {0}")]
    Usage(String),

    #[error("Input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("IO error while {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    /// Wrap an I/O error with a short description of what was being attempted
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            PipelineError::Usage(_) => EXIT_USAGE,
            PipelineError::InputNotFound(_) => EXIT_INPUT_NOT_FOUND,
            PipelineError::Io { .. } => EXIT_IO,
        }
    }
}

/// Failure of a single external tool invocation
#[derive(thiserror::Error, Debug)]
pub enum ToolError {
    #[error("failed to launch {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with {}", exit_label(.code))]
    Failed { tool: String, code: Option<i32> },

    #[error("{tool} could not make the file smaller")]
    WouldEnlarge { tool: String },

    #[error("{tool} could not reach the requested quality")]
    QualityTooLow { tool: String },

    #[error("{tool} timed out after {secs}s")]
    Timeout { tool: String, secs: u64 },

    #[error("{tool} produced no usable output: {source}")]
    MissingOutput {
        tool: String,
        #[source]
        source: std::io::Error,
    },
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "no status (killed by signal)".to_string(),
    }
}
