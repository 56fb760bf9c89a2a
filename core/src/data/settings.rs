use std::path::Path;

use crate::error::{Result, UpkeepError};
use crate::types::config::{DuplicatePolicy, Settings, ThemeName};

/// File name of the settings document inside the config directory.
pub const SETTINGS_FILE: &str = "settings.json";


/// Returns sensible defaults for all settings fields.
pub fn default_settings() -> Settings {
    Settings {
        version: "1.1".into(),
        scripts_dir: "scripts".into(),
        reports_dir: "reports".into(),
        report_prefix: "Diagnostic_Report_".into(),
        report_suffix: ".txt".into(),
        theme: ThemeName::Light,
        viewer: None,
        duplicate_policy: DuplicatePolicy::Reject,
        extra_buttons: Vec::new(),
    }
}


/// Load `Settings` from a JSON file. Keys missing from the file keep their
/// defaults; unknown keys are ignored.
pub fn load(path: &Path) -> Result<Settings> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        UpkeepError::Settings(format!("cannot read {}: {}", path.display(), e))
    })?;
    parse(&content)
}


/// Load settings, falling back to defaults when the file does not exist.
/// A file that exists but does not parse is still an error.
pub fn load_or_default(path: &Path) -> Result<Settings> {
    if path.exists() {
        load(path)
    } else {
        tracing::debug!(path = %path.display(), "no settings file, using defaults");
        Ok(default_settings())
    }
}


/// Save `Settings` as pretty-printed JSON, creating the parent directory.
pub fn save(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serialize(settings)?;
    std::fs::write(path, content).map_err(|e| {
        UpkeepError::Settings(format!("cannot write {}: {}", path.display(), e))
    })
}


pub fn parse(content: &str) -> Result<Settings> {
    serde_json::from_str(content).map_err(|e| UpkeepError::Settings(format!("invalid settings: {}", e)))
}


pub fn serialize(settings: &Settings) -> Result<String> {
    serde_json::to_string_pretty(settings)
        .map_err(|e| UpkeepError::Settings(format!("cannot serialize settings: {}", e)))
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::command::Interpreter;
    use crate::types::config::ButtonConfig;

    #[test]
    fn default_settings_are_valid() {
        let s = default_settings();
        assert_eq!(s.scripts_dir, "scripts");
        assert_eq!(s.reports_dir, "reports");
        assert_eq!(s.report_suffix, ".txt");
        assert_eq!(s.theme, ThemeName::Light);
    }

    #[test]
    fn parse_partial_document() {
        let s = parse(r#"{ "theme": "dark", "viewer": "less" }"#).unwrap();
        assert_eq!(s.theme, ThemeName::Dark);
        assert_eq!(s.viewer.as_deref(), Some("less"));
        assert_eq!(s.reports_dir, "reports");
    }

    #[test]
    fn parse_rejects_garbage() {
        let err = parse("theme = dark").unwrap_err();
        assert!(matches!(err, UpkeepError::Settings(_)));
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(SETTINGS_FILE);
        let mut s = default_settings();
        s.extra_buttons.push(ButtonConfig {
            label: "Backup".into(),
            script: "backup.sh".into(),
            interpreter: Interpreter::None,
        });
        save(&path, &s).unwrap();
        assert_eq!(load(&path).unwrap(), s);
    }

    #[test]
    fn load_or_default_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let s = load_or_default(&dir.path().join(SETTINGS_FILE)).unwrap();
        assert_eq!(s, default_settings());
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&dir.path().join("absent.json")).unwrap_err();
        assert!(err.to_string().contains("cannot read"));
    }
}
