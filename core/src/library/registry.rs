use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{Result, UpkeepError};
use crate::types::command::{Command, Interpreter};
use crate::types::config::{ButtonConfig, Settings};

// ---------------------------------------------------------------------------
// Built-in panel
// ---------------------------------------------------------------------------

/// Built-in buttons in panel order: (label, script stem).
pub const BUILTIN_COMMANDS: &[(&str, &str)] = &[
    ("Flush DNS", "flushdns"),
    ("Renew IP", "iprenew"),
    ("Network Info", "netinfo"),
    ("Check Disk", "checkdisk"),
    ("SFC Scan", "sfcscan"),
    ("Reset Winsock", "winsockreset"),
    ("Clean Temp", "cleantemp"),
    ("Reboot", "reboot"),
    ("Diagnostic Report", "diagnostic"),
    ("App Info", "appinfo"),
];

/// Script extension for the built-in table on this platform.
pub fn script_extension() -> &'static str {
    if cfg!(windows) {
        "bat"
    } else {
        "sh"
    }
}

// ---------------------------------------------------------------------------
// CommandRegistry: ordered label → command mapping
// ---------------------------------------------------------------------------

/// Ordered mapping from display label to command.
///
/// The registry does no I/O: script paths are resolved when it is built and
/// existence is checked by the runner at launch time.
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    /// Commands in registration order.
    commands: Vec<Command>,
    /// Label -> index into `commands`.
    index: HashMap<String, usize>,
}

impl CommandRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        CommandRegistry::default()
    }

    /// The built-in panel, with scripts resolved inside `scripts_dir`.
    pub fn builtin(scripts_dir: &Path) -> Self {
        let mut reg = CommandRegistry::new();
        for (label, stem) in BUILTIN_COMMANDS {
            let path = scripts_dir.join(format!("{}.{}", stem, script_extension()));
            reg.register(Command::new(label, path, Interpreter::Shell));
        }
        reg
    }

    /// Built-ins followed by the user's extra buttons.
    pub fn from_settings(settings: &Settings, scripts_dir: &Path) -> Self {
        let mut reg = CommandRegistry::builtin(scripts_dir);
        for button in &settings.extra_buttons {
            reg.register(button_command(button, scripts_dir));
        }
        reg
    }

    /// Add a command. The first registration of a label wins; later
    /// duplicates are skipped. Returns whether the command was added.
    pub fn register(&mut self, command: Command) -> bool {
        if self.index.contains_key(&command.label) {
            tracing::warn!(label = %command.label, "duplicate command label ignored");
            return false;
        }
        self.index.insert(command.label.clone(), self.commands.len());
        self.commands.push(command);
        true
    }

    /// All commands in registration order.
    pub fn list(&self) -> &[Command] {
        &self.commands
    }

    pub fn labels(&self) -> Vec<&str> {
        self.commands.iter().map(|c| c.label.as_str()).collect()
    }

    /// Look up a command by label.
    pub fn resolve(&self, label: &str) -> Result<&Command> {
        self.index
            .get(label)
            .map(|&i| &self.commands[i])
            .ok_or_else(|| UpkeepError::NotFound(label.to_string()))
    }

    pub fn contains(&self, label: &str) -> bool {
        self.index.contains_key(label)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}


fn button_command(button: &ButtonConfig, scripts_dir: &Path) -> Command {
    let script = PathBuf::from(&button.script);
    let path = if script.is_absolute() {
        script
    } else {
        scripts_dir.join(script)
    };
    Command::new(&button.label, path, button.interpreter)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn extra(label: &str, script: &str) -> ButtonConfig {
        ButtonConfig {
            label: label.into(),
            script: script.into(),
            interpreter: Interpreter::Shell,
        }
    }

    #[test]
    fn builtin_panel_order() {
        let reg = CommandRegistry::builtin(Path::new("/s"));
        assert_eq!(reg.len(), BUILTIN_COMMANDS.len());
        assert_eq!(reg.labels()[0], "Flush DNS");
        assert_eq!(reg.labels()[9], "App Info");
        let dns = reg.resolve("Flush DNS").unwrap();
        assert_eq!(
            dns.executable_path,
            Path::new("/s").join(format!("flushdns.{}", script_extension()))
        );
    }

    #[test]
    fn resolve_iff_listed() {
        let mut settings = Settings::default();
        settings.extra_buttons.push(extra("Backup", "backup.sh"));
        let reg = CommandRegistry::from_settings(&settings, Path::new("/s"));

        for cmd in reg.list() {
            assert_eq!(reg.resolve(&cmd.label).unwrap(), cmd);
        }
        let err = reg.resolve("Defragment").unwrap_err();
        assert!(matches!(err, UpkeepError::NotFound(ref l) if l == "Defragment"));
    }

    #[test]
    fn extra_buttons_follow_builtins() {
        let mut settings = Settings::default();
        settings.extra_buttons.push(extra("Backup", "backup.sh"));
        settings.extra_buttons.push(extra("Sync", "/opt/sync.sh"));
        let reg = CommandRegistry::from_settings(&settings, Path::new("/s"));

        let labels = reg.labels();
        assert_eq!(&labels[labels.len() - 2..], &["Backup", "Sync"]);
        assert_eq!(
            reg.resolve("Backup").unwrap().executable_path,
            PathBuf::from("/s/backup.sh")
        );
        assert_eq!(
            reg.resolve("Sync").unwrap().executable_path,
            PathBuf::from("/opt/sync.sh")
        );
    }

    #[test]
    fn duplicate_label_first_wins() {
        let mut reg = CommandRegistry::new();
        assert!(reg.register(Command::new("A", "/a1", Interpreter::Shell)));
        assert!(!reg.register(Command::new("A", "/a2", Interpreter::None)));
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.resolve("A").unwrap().executable_path, PathBuf::from("/a1"));
    }

    #[test]
    fn empty_registry() {
        let reg = CommandRegistry::new();
        assert!(reg.is_empty());
        assert!(!reg.contains("Reboot"));
        assert!(reg.resolve("Reboot").is_err());
    }
}
