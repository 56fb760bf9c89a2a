//! Run lifecycle records.
//!
//! A [`RunHandle`] is the shared record of one invocation of a command. The
//! worker thread that owns the child process is the only writer; everyone
//! else holds a clone and can read the status or block until it is terminal.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};

/// Process-unique identifier of a run.
pub type RunId = u64;

// ---------------------------------------------------------------------------
// RunStatus
// ---------------------------------------------------------------------------

/// Lifecycle state of a run. Everything except `Running` is terminal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Succeeded,
    Failed { exit_code: i32 },
    RunnerError { reason: String },
}

impl RunStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, RunStatus::Running)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_running()
    }

    /// Exit code to report to a shell, if the child got far enough to have one.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            RunStatus::Succeeded => Some(0),
            RunStatus::Failed { exit_code } => Some(*exit_code),
            _ => None,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Running => write!(f, "running"),
            RunStatus::Succeeded => write!(f, "succeeded"),
            RunStatus::Failed { exit_code } => write!(f, "failed (exit {})", exit_code),
            RunStatus::RunnerError { reason } => write!(f, "error: {}", reason),
        }
    }
}

// ---------------------------------------------------------------------------
// RunHandle
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct RunState {
    status: Mutex<RunStatus>,
    finished: Condvar,
}

/// Shared, cheaply cloneable record of one run.
#[derive(Debug, Clone)]
pub struct RunHandle {
    id: RunId,
    command_label: String,
    start_time: DateTime<Utc>,
    state: Arc<RunState>,
}

impl RunHandle {
    pub(crate) fn new(id: RunId, command_label: &str) -> Self {
        RunHandle {
            id,
            command_label: command_label.to_string(),
            start_time: Utc::now(),
            state: Arc::new(RunState {
                status: Mutex::new(RunStatus::Running),
                finished: Condvar::new(),
            }),
        }
    }

    pub fn id(&self) -> RunId {
        self.id
    }

    pub fn command_label(&self) -> &str {
        &self.command_label
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn status(&self) -> RunStatus {
        self.state.status.lock().clone()
    }

    pub fn is_running(&self) -> bool {
        self.state.status.lock().is_running()
    }

    /// Move from `Running` to a terminal status. Returns false (and leaves
    /// the status untouched) if the run already finished.
    pub(crate) fn finish(&self, status: RunStatus) -> bool {
        debug_assert!(status.is_terminal());
        let mut current = self.state.status.lock();
        if current.is_terminal() {
            return false;
        }
        *current = status;
        self.state.finished.notify_all();
        true
    }

    /// Block until the run reaches a terminal status.
    pub fn wait(&self) -> RunStatus {
        let mut status = self.state.status.lock();
        while status.is_running() {
            self.state.finished.wait(&mut status);
        }
        status.clone()
    }

    /// Block for at most `timeout`; returns the terminal status or `None`
    /// if the run is still going.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<RunStatus> {
        let mut status = self.state.status.lock();
        if status.is_running() {
            self.state.finished.wait_for(&mut status, timeout);
        }
        if status.is_running() {
            None
        } else {
            Some(status.clone())
        }
    }
}
