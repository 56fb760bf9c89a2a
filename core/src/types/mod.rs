//! Plain data types shared by every layer.

pub mod command;
pub mod config;
pub mod run;

pub use command::{Command, Interpreter};
pub use config::{ButtonConfig, DuplicatePolicy, Settings, ThemeName};
pub use run::{RunHandle, RunId, RunStatus};
