//! Persistent state: the settings document and the directories it names.

pub mod settings;

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::types::config::{ButtonConfig, Settings};


/// Owns the config directory and the settings loaded from it.
///
/// Relative `scripts_dir` / `reports_dir` values resolve against the config
/// directory, so the same settings file works regardless of the caller's
/// working directory.
#[derive(Debug, Clone)]
pub struct Data {
    config_dir: PathBuf,
    settings: Settings,
}

impl Data {
    /// Load settings from `config_dir` (defaults if absent) and make sure the
    /// scripts and reports directories exist.
    pub fn load(config_dir: &Path) -> Result<Self> {
        let settings = settings::load_or_default(&config_dir.join(settings::SETTINGS_FILE))?;
        let data = Data {
            config_dir: config_dir.to_path_buf(),
            settings,
        };
        std::fs::create_dir_all(data.scripts_dir())?;
        std::fs::create_dir_all(data.reports_dir())?;
        Ok(data)
    }

    /// Wrap already-loaded settings without touching the filesystem.
    pub fn with_settings(config_dir: &Path, settings: Settings) -> Self {
        Data {
            config_dir: config_dir.to_path_buf(),
            settings,
        }
    }

    pub fn save(&self) -> Result<()> {
        settings::save(&self.settings_path(), &self.settings)
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn settings_path(&self) -> PathBuf {
        self.config_dir.join(settings::SETTINGS_FILE)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn scripts_dir(&self) -> PathBuf {
        self.resolve(&self.settings.scripts_dir)
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.resolve(&self.settings.reports_dir)
    }

    /// Add an extra button, replacing any existing one with the same label.
    pub fn upsert_button(&mut self, button: ButtonConfig) {
        let buttons = &mut self.settings.extra_buttons;
        match buttons.iter_mut().find(|b| b.label == button.label) {
            Some(existing) => *existing = button,
            None => buttons.push(button),
        }
    }

    /// Remove an extra button by label. Returns whether one was removed.
    pub fn remove_button(&mut self, label: &str) -> bool {
        let before = self.settings.extra_buttons.len();
        self.settings.extra_buttons.retain(|b| b.label != label);
        self.settings.extra_buttons.len() != before
    }

    fn resolve(&self, dir: &str) -> PathBuf {
        let path = Path::new(dir);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.config_dir.join(path)
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::command::Interpreter;
    use crate::types::config::ThemeName;

    fn button(label: &str, script: &str) -> ButtonConfig {
        ButtonConfig {
            label: label.into(),
            script: script.into(),
            interpreter: Interpreter::Shell,
        }
    }

    #[test]
    fn load_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let data = Data::load(dir.path()).unwrap();
        assert!(data.scripts_dir().is_dir());
        assert!(data.reports_dir().is_dir());
        assert_eq!(data.scripts_dir(), dir.path().join("scripts"));
    }

    #[test]
    fn absolute_dirs_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.reports_dir = "/var/reports".into();
        let data = Data::with_settings(dir.path(), settings);
        assert_eq!(data.reports_dir(), PathBuf::from("/var/reports"));
    }

    #[test]
    fn save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let mut data = Data::load(dir.path()).unwrap();
        data.settings_mut().theme = ThemeName::Dark;
        data.upsert_button(button("Backup", "backup.sh"));
        data.save().unwrap();

        let again = Data::load(dir.path()).unwrap();
        assert_eq!(again.settings().theme, ThemeName::Dark);
        assert_eq!(again.settings().extra_buttons.len(), 1);
    }

    #[test]
    fn upsert_replaces_same_label() {
        let dir = tempfile::tempdir().unwrap();
        let mut data = Data::with_settings(dir.path(), Settings::default());
        data.upsert_button(button("Backup", "backup.sh"));
        data.upsert_button(button("Backup", "backup2.sh"));
        assert_eq!(data.settings().extra_buttons.len(), 1);
        assert_eq!(data.settings().extra_buttons[0].script, "backup2.sh");
    }

    #[test]
    fn remove_button_reports_presence() {
        let dir = tempfile::tempdir().unwrap();
        let mut data = Data::with_settings(dir.path(), Settings::default());
        data.upsert_button(button("Backup", "backup.sh"));
        assert!(data.remove_button("Backup"));
        assert!(!data.remove_button("Backup"));
    }
}
