use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// UpkeepError
// ---------------------------------------------------------------------------

/// Every failure the core reports to a caller. All variants are recoverable;
/// presentation layers turn them into a message and keep going.
#[derive(Debug, Error)]
pub enum UpkeepError {
    /// No command is registered under the given label.
    #[error("command not found: {0}")]
    NotFound(String),

    /// The command already has a run in progress.
    #[error("command already running: {0}")]
    AlreadyRunning(String),

    /// The runner could not start, stream, or hand off a process.
    #[error("runner error: {0}")]
    RunnerError(String),

    /// No file in the directory matched the artifact naming pattern.
    #[error("no file matching {prefix}*{suffix} in {}", directory.display())]
    NoneFound {
        directory: PathBuf,
        prefix: String,
        suffix: String,
    },

    /// Settings could not be read, parsed, or written.
    #[error("settings error: {0}")]
    Settings(String),

    /// Script library operation rejected or failed.
    #[error("script error: {0}")]
    Script(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, UpkeepError>;
