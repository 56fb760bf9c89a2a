//! Report artifacts: locate the newest generated report and hand it to a
//! viewer program.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::SystemTime;

use crate::error::{Result, UpkeepError};

/// Newest file in `directory` whose name starts with `prefix` and ends with
/// `suffix`.
///
/// Recency is the file's creation time, or its modification time where the
/// platform does not record creation. Equal times fall back to the file name,
/// larger name wins. A missing directory is the same as no match.
pub fn find_latest_artifact(directory: &Path, prefix: &str, suffix: &str) -> Result<PathBuf> {
    let none_found = || UpkeepError::NoneFound {
        directory: directory.to_path_buf(),
        prefix: prefix.to_string(),
        suffix: suffix.to_string(),
    };

    let entries = match fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(none_found()),
        Err(e) => return Err(e.into()),
    };

    let mut best: Option<(SystemTime, String, PathBuf)> = None;
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!(error = %e, "skipping unreadable directory entry");
                continue;
            }
        };
        let name = entry.file_name().to_string_lossy().into_owned();
        if !matches_pattern(&name, prefix, suffix) {
            continue;
        }
        let meta = match entry.metadata() {
            Ok(meta) if meta.is_file() => meta,
            _ => continue,
        };
        let stamp = meta
            .created()
            .or_else(|_| meta.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);

        let newer = match &best {
            None => true,
            Some((t, n, _)) => (stamp, &name) > (*t, n),
        };
        if newer {
            best = Some((stamp, name, entry.path()));
        }
    }

    best.map(|(_, _, path)| path).ok_or_else(none_found)
}

fn matches_pattern(name: &str, prefix: &str, suffix: &str) -> bool {
    name.len() >= prefix.len() + suffix.len() && name.starts_with(prefix) && name.ends_with(suffix)
}


/// Platform default program for opening a text report.
pub fn default_viewer() -> &'static str {
    if cfg!(windows) {
        "notepad.exe"
    } else if cfg!(target_os = "macos") {
        "open"
    } else {
        "xdg-open"
    }
}

/// Launch `viewer` on `path` and return without waiting for it.
pub fn open_in_viewer(viewer: &str, path: &Path) -> Result<()> {
    let mut child = std::process::Command::new(viewer)
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| UpkeepError::RunnerError(format!("cannot launch viewer {}: {}", viewer, e)))?;
    tracing::info!(viewer = %viewer, path = %path.display(), pid = child.id(), "viewer launched");

    // Reap in the background so the viewer never lingers as a zombie.
    let reaper = std::thread::Builder::new()
        .name("upkeep-viewer".into())
        .spawn(move || {
            let _ = child.wait();
        });
    if let Err(e) = reaper {
        tracing::debug!(error = %e, "viewer reaper not started");
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const PREFIX: &str = "Diagnostic_Report_";
    const SUFFIX: &str = ".txt";

    #[test]
    fn newer_of_two_reports_wins() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("Diagnostic_Report_20240101_0900.txt");
        let b = dir.path().join("Diagnostic_Report_20240101_1000.txt");
        fs::write(&a, "first").unwrap();
        std::thread::sleep(Duration::from_millis(50));
        fs::write(&b, "second").unwrap();

        let latest = find_latest_artifact(dir.path(), PREFIX, SUFFIX).unwrap();
        assert_eq!(latest, b);
    }

    #[test]
    fn time_outranks_name() {
        let dir = tempfile::tempdir().unwrap();
        let older = dir.path().join("Diagnostic_Report_Z.txt");
        let newer = dir.path().join("Diagnostic_Report_A.txt");
        fs::write(&older, "old").unwrap();
        std::thread::sleep(Duration::from_millis(50));
        fs::write(&newer, "new").unwrap();

        let latest = find_latest_artifact(dir.path(), PREFIX, SUFFIX).unwrap();
        assert_eq!(latest, newer);
    }

    #[test]
    fn ignores_non_matching_names_and_dirs() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::write(dir.path().join("Diagnostic_Report_x.log"), "").unwrap();
        fs::create_dir(dir.path().join("Diagnostic_Report_dir.txt")).unwrap();
        let report = dir.path().join("Diagnostic_Report_1.txt");
        fs::write(&report, "").unwrap();

        assert_eq!(find_latest_artifact(dir.path(), PREFIX, SUFFIX).unwrap(), report);
    }

    #[test]
    fn nothing_matching_is_none_found() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("other.txt"), "").unwrap();
        let err = find_latest_artifact(dir.path(), PREFIX, SUFFIX).unwrap_err();
        assert!(matches!(err, UpkeepError::NoneFound { ref prefix, .. } if prefix == PREFIX));
    }

    #[test]
    fn missing_directory_is_none_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = find_latest_artifact(&dir.path().join("reports"), PREFIX, SUFFIX).unwrap_err();
        assert!(matches!(err, UpkeepError::NoneFound { .. }));
    }

    #[test]
    fn pattern_needs_room_for_both_ends() {
        assert!(matches_pattern("ab", "a", "b"));
        assert!(!matches_pattern("ab", "ab", "b"));
        assert!(matches_pattern("Diagnostic_Report_.txt", PREFIX, SUFFIX));
    }

    #[test]
    fn unknown_viewer_is_runner_error() {
        let err = open_in_viewer("upkeep-no-such-viewer-binary", Path::new("/tmp/x.txt")).unwrap_err();
        assert!(matches!(err, UpkeepError::RunnerError(ref r) if r.contains("cannot launch viewer")));
    }

    #[test]
    fn default_viewer_is_known() {
        assert!(["notepad.exe", "open", "xdg-open"].contains(&default_viewer()));
    }
}
