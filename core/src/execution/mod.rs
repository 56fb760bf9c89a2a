//! Execution: starting commands and collecting what they print.
//!
//! - [`runner`]: spawns one command per worker thread and streams its pipes
//! - [`output`]: the shared, ordered sink every run appends to
//! - [`controller`]: label-level entry point with the duplicate-run policy

pub mod controller;
pub mod output;
pub mod runner;

pub use controller::{ReportLocation, SessionController};
pub use output::{OutputLine, OutputSink, OutputStream, SinkCursor, SinkDelta};
pub use runner::{Launcher, MockRunner, ProcessRunner, ShellRunner};
