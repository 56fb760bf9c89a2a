//! Session controller: the single entry point presentation code drives.
//!
//! Owns the registry, the shared output sink and the launcher, and keeps the
//! list of runs started this session. The duplicate-run policy is applied
//! here, under the same lock that records new runs.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::artifact;
use crate::data::Data;
use crate::error::{Result, UpkeepError};
use crate::execution::output::OutputSink;
use crate::execution::runner::{Launcher, ProcessRunner, ShellRunner};
use crate::library::registry::CommandRegistry;
use crate::types::config::DuplicatePolicy;
use crate::types::run::RunHandle;

/// Where generated reports are looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportLocation {
    pub directory: PathBuf,
    pub prefix: String,
    pub suffix: String,
}

pub struct SessionController {
    registry: CommandRegistry,
    launcher: Launcher,
    runs: Mutex<Vec<RunHandle>>,
    policy: DuplicatePolicy,
    reports: ReportLocation,
    viewer: String,
}

impl SessionController {
    /// Controller with a fresh sink, `Reject` policy, and reports in `./reports`.
    pub fn new(registry: CommandRegistry, runner: Arc<dyn ProcessRunner>) -> Self {
        let defaults = crate::data::settings::default_settings();
        SessionController {
            registry,
            launcher: Launcher::new(runner, OutputSink::new()),
            runs: Mutex::new(Vec::new()),
            policy: DuplicatePolicy::default(),
            reports: ReportLocation {
                directory: PathBuf::from(defaults.reports_dir),
                prefix: defaults.report_prefix,
                suffix: defaults.report_suffix,
            },
            viewer: artifact::default_viewer().to_string(),
        }
    }

    /// Controller configured from loaded settings, running real processes.
    pub fn from_data(data: &Data) -> Self {
        SessionController::from_data_with_runner(data, Arc::new(ShellRunner))
    }

    pub fn from_data_with_runner(data: &Data, runner: Arc<dyn ProcessRunner>) -> Self {
        let settings = data.settings();
        let registry = CommandRegistry::from_settings(settings, &data.scripts_dir());
        let mut controller = SessionController::new(registry, runner)
            .with_policy(settings.duplicate_policy)
            .with_reports(ReportLocation {
                directory: data.reports_dir(),
                prefix: settings.report_prefix.clone(),
                suffix: settings.report_suffix.clone(),
            });
        if let Some(viewer) = &settings.viewer {
            controller = controller.with_viewer(viewer);
        }
        controller
    }

    pub fn with_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_reports(mut self, reports: ReportLocation) -> Self {
        self.reports = reports;
        self
    }

    pub fn with_viewer(mut self, viewer: &str) -> Self {
        self.viewer = viewer.to_string();
        self
    }

    // -- Runs ----------------------------------------------------------------

    /// Start the command registered under `label`.
    ///
    /// Returns immediately with a handle in `Running` (or already terminal if
    /// the script is missing). Under `Reject`, fails with `AlreadyRunning`
    /// while an earlier run of the same label is still going.
    pub fn run(&self, label: &str) -> Result<RunHandle> {
        let command = self.registry.resolve(label)?;

        let mut runs = self.runs.lock();
        if self.policy == DuplicatePolicy::Reject
            && runs
                .iter()
                .any(|r| r.command_label() == label && r.is_running())
        {
            tracing::info!(label = %label, "run rejected, already running");
            return Err(UpkeepError::AlreadyRunning(label.to_string()));
        }
        let handle = self.launcher.start(command)?;
        // Finished runs of this label are superseded by the new one.
        runs.retain(|r| r.is_running() || r.command_label() != label);
        runs.push(handle.clone());
        Ok(handle)
    }

    /// Runs still tracked, in launch order: every run in progress plus the
    /// latest run of each label.
    pub fn runs(&self) -> Vec<RunHandle> {
        self.runs.lock().clone()
    }

    /// Runs that have not reached a terminal status.
    pub fn active(&self) -> Vec<RunHandle> {
        self.runs
            .lock()
            .iter()
            .filter(|r| r.is_running())
            .cloned()
            .collect()
    }

    /// Most recent run of `label`, if any.
    pub fn latest_run(&self, label: &str) -> Option<RunHandle> {
        self.runs
            .lock()
            .iter()
            .rev()
            .find(|r| r.command_label() == label)
            .cloned()
    }

    // -- Accessors -------------------------------------------------------------

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn sink(&self) -> &OutputSink {
        self.launcher.sink()
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    pub fn reports(&self) -> &ReportLocation {
        &self.reports
    }

    pub fn viewer(&self) -> &str {
        &self.viewer
    }

    // -- Reports ---------------------------------------------------------------

    pub fn find_latest_artifact(&self, directory: &Path, prefix: &str, suffix: &str) -> Result<PathBuf> {
        artifact::find_latest_artifact(directory, prefix, suffix)
    }

    /// Newest report in the configured reports directory.
    pub fn latest_report(&self) -> Result<PathBuf> {
        let r = &self.reports;
        self.find_latest_artifact(&r.directory, &r.prefix, &r.suffix)
    }

    /// Open the newest report in the configured viewer. Returns its path.
    pub fn view_latest_report(&self) -> Result<PathBuf> {
        let path = self.latest_report()?;
        artifact::open_in_viewer(&self.viewer, &path)?;
        Ok(path)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
