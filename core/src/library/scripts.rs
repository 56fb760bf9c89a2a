//! Script library: list, read, save, and create scripts in the scripts
//! directory. This is the storage side of the script editor.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, UpkeepError};
use crate::library::registry::script_extension;


/// Files in a single scripts directory, addressed by bare file name.
#[derive(Debug, Clone)]
pub struct ScriptLibrary {
    dir: PathBuf,
}

impl ScriptLibrary {
    pub fn new(dir: &Path) -> Self {
        ScriptLibrary {
            dir: dir.to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Sorted file names of every regular file in the directory. A missing
    /// directory lists as empty.
    pub fn list(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Full path for a script name, after validating the name.
    pub fn path_of(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.dir.join(name))
    }

    pub fn read(&self, name: &str) -> Result<String> {
        let path = self.path_of(name)?;
        fs::read_to_string(&path).map_err(|e| {
            UpkeepError::Script(format!("cannot read {}: {}", path.display(), e))
        })
    }

    /// Write `content`, replacing any existing script of that name.
    pub fn save(&self, name: &str, content: &str) -> Result<()> {
        let path = self.path_of(name)?;
        fs::create_dir_all(&self.dir)?;
        fs::write(&path, content)?;
        tracing::info!(script = %name, bytes = content.len(), "script saved");
        Ok(())
    }

    /// Create a new script from the platform template. Fails if it exists.
    /// A name without an extension gets the platform script extension.
    pub fn create(&self, name: &str) -> Result<String> {
        let name = if Path::new(name).extension().is_some() {
            name.to_string()
        } else {
            format!("{}.{}", name, script_extension())
        };
        let path = self.path_of(&name)?;
        if path.exists() {
            return Err(UpkeepError::Script(format!("script already exists: {}", name)));
        }
        self.save(&name, template())?;
        Ok(name)
    }
}


fn validate_name(name: &str) -> Result<()> {
    if name.is_empty()
        || name == "."
        || name.contains("..")
        || name.contains('/')
        || name.contains('\\')
    {
        return Err(UpkeepError::Script(format!("invalid script name: {:?}", name)));
    }
    Ok(())
}


fn template() -> &'static str {
    if cfg!(windows) {
        "@echo off\r\nREM New UpKeep script\r\necho Hello from UpKeep\r\n"
    } else {
        "#!/bin/sh\n# New UpKeep script\necho \"Hello from UpKeep\"\n"
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_is_sorted_and_skips_dirs() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.sh"), "").unwrap();
        fs::write(dir.path().join("a.sh"), "").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        let lib = ScriptLibrary::new(dir.path());
        assert_eq!(lib.list().unwrap(), vec!["a.sh", "b.sh"]);
    }

    #[test]
    fn missing_dir_lists_empty() {
        let dir = tempfile::tempdir().unwrap();
        let lib = ScriptLibrary::new(&dir.path().join("nope"));
        assert!(lib.list().unwrap().is_empty());
    }

    #[test]
    fn save_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let lib = ScriptLibrary::new(dir.path());
        lib.save("netinfo.sh", "echo net\n").unwrap();
        assert_eq!(lib.read("netinfo.sh").unwrap(), "echo net\n");
        lib.save("netinfo.sh", "echo changed\n").unwrap();
        assert_eq!(lib.read("netinfo.sh").unwrap(), "echo changed\n");
    }

    #[test]
    fn create_adds_extension_and_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let lib = ScriptLibrary::new(dir.path());
        let name = lib.create("cleanup").unwrap();
        assert_eq!(name, format!("cleanup.{}", script_extension()));
        assert!(lib.read(&name).unwrap().contains("UpKeep"));
        assert!(matches!(lib.create("cleanup"), Err(UpkeepError::Script(_))));
    }

    #[test]
    fn rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let lib = ScriptLibrary::new(dir.path());
        for bad in ["", "../etc/passwd", "sub/x.sh", "..", "a\\b.bat"] {
            assert!(lib.path_of(bad).is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn read_missing_script_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let lib = ScriptLibrary::new(dir.path());
        let err = lib.read("ghost.sh").unwrap_err();
        assert!(err.to_string().contains("cannot read"));
    }
}
