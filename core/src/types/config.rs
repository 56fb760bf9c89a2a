use serde::{Deserialize, Serialize};

use super::command::Interpreter;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ThemeName {
    #[default]
    Light,
    Dark,
}

/// What to do when a command is asked to run while a previous run of the
/// same command is still going.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    #[default]
    Reject,
    Allow,
}

/// A user-configured button appended after the built-in panel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ButtonConfig {
    pub label: String,
    /// Script path; relative paths resolve inside the scripts directory.
    pub script: String,
    #[serde(default)]
    pub interpreter: Interpreter,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub version: String,
    pub scripts_dir: String,
    pub reports_dir: String,
    pub report_prefix: String,
    pub report_suffix: String,
    pub theme: ThemeName,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewer: Option<String>,
    pub duplicate_policy: DuplicatePolicy,
    pub extra_buttons: Vec<ButtonConfig>,
}

impl Default for Settings {
    fn default() -> Self {
        crate::data::settings::default_settings()
    }
}
