use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// How a command's script is launched.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Interpreter {
    /// Run through the platform shell (`sh` on Unix, `cmd.exe /C` on Windows).
    #[default]
    Shell,
    /// Execute the path directly.
    None,
}

impl Interpreter {
    /// Program and leading arguments placed before the script path.
    pub fn prefix(&self) -> Option<(&'static str, &'static [&'static str])> {
        match self {
            Interpreter::Shell => {
                if cfg!(windows) {
                    Some(("cmd.exe", &["/C"]))
                } else {
                    Some(("sh", &[]))
                }
            }
            Interpreter::None => None,
        }
    }
}


/// A named, launchable script. Immutable once registered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Command {
    pub label: String,
    pub executable_path: PathBuf,
    #[serde(default)]
    pub interpreter: Interpreter,
}

impl Command {
    pub fn new(label: &str, executable_path: impl Into<PathBuf>, interpreter: Interpreter) -> Self {
        Command {
            label: label.to_string(),
            executable_path: executable_path.into(),
            interpreter,
        }
    }

    /// File name of the script, used in run banners.
    pub fn script_name(&self) -> String {
        self.executable_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.executable_path.display().to_string())
    }

    /// The argv this command spawns: interpreter prefix followed by the path.
    pub fn argv(&self) -> Vec<String> {
        let path = self.executable_path.to_string_lossy().into_owned();
        match self.interpreter.prefix() {
            Some((program, args)) => {
                let mut argv = vec![program.to_string()];
                argv.extend(args.iter().map(|a| a.to_string()));
                argv.push(path);
                argv
            }
            None => vec![path],
        }
    }

    pub fn path(&self) -> &Path {
        &self.executable_path
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_name_is_file_name() {
        let cmd = Command::new("Flush DNS", "/opt/upkeep/scripts/flushdns.sh", Interpreter::Shell);
        assert_eq!(cmd.script_name(), "flushdns.sh");
    }

    #[test]
    fn direct_argv_is_path_only() {
        let cmd = Command::new("Tool", "/usr/local/bin/tool", Interpreter::None);
        assert_eq!(cmd.argv(), vec!["/usr/local/bin/tool".to_string()]);
    }

    #[cfg(unix)]
    #[test]
    fn shell_argv_uses_sh() {
        let cmd = Command::new("Clean Temp", "scripts/cleantemp.sh", Interpreter::Shell);
        assert_eq!(cmd.argv(), vec!["sh".to_string(), "scripts/cleantemp.sh".to_string()]);
    }

    #[test]
    fn interpreter_defaults_to_shell_when_absent() {
        let cmd: Command =
            serde_json::from_str(r#"{"label":"x","executable_path":"x.sh"}"#).unwrap();
        assert_eq!(cmd.interpreter, Interpreter::Shell);
    }
}
