//! UpKeep core: command registry, process runner, output sink, and the
//! session controller that ties them together.

pub mod artifact;
pub mod data;
pub mod error;
pub mod execution;
pub mod library;
pub mod types;

pub use error::{Result, UpkeepError};
pub use execution::{OutputLine, OutputSink, OutputStream, SessionController};
pub use library::CommandRegistry;
pub use types::{Command, Interpreter, RunHandle, RunId, RunStatus, Settings};
