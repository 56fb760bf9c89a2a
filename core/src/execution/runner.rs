//! Process runner: spawns a command and streams its output into the sink.
//!
//! `ProcessRunner` is the blocking seam: spawn, emit lines as they are read,
//! report the exit code. `ShellRunner` is the production implementation on
//! `std::process`. `MockRunner` is the test double that replays scripted
//! lines and can hold a run open. `Launcher` puts any runner on a dedicated
//! thread per run and drives the `RunHandle` to its terminal status.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;

use parking_lot::{Condvar, Mutex};

use crate::error::{Result, UpkeepError};
use crate::execution::output::{OutputLine, OutputSink, OutputStream};
use crate::types::command::Command;
use crate::types::run::{RunHandle, RunId, RunStatus};

/// Exit code recorded when the child ended without one (killed by a signal).
pub const NO_EXIT_CODE: i32 = -1;

// ---------------------------------------------------------------------------
// ProcessRunner
// ---------------------------------------------------------------------------

/// Blocking execution of one command.
///
/// Implementations call `emit` once per line, in read order, as soon as each
/// line is available, and return the child's exit code. Any failure to
/// spawn, read, or reap the child is returned as `Err(reason)`.
pub trait ProcessRunner: Send + Sync {
    fn execute(
        &self,
        command: &Command,
        emit: &mut dyn FnMut(OutputStream, String),
    ) -> std::result::Result<i32, String>;
}

// ---------------------------------------------------------------------------
// ShellRunner
// ---------------------------------------------------------------------------

/// Production runner: spawns the command's argv with piped stdout/stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellRunner;

type ReadEvent = std::result::Result<(OutputStream, String), String>;

impl ProcessRunner for ShellRunner {
    fn execute(
        &self,
        command: &Command,
        emit: &mut dyn FnMut(OutputStream, String),
    ) -> std::result::Result<i32, String> {
        let argv = command.argv();
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| "empty command line".to_string())?;

        let mut cmd = std::process::Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        hide_console(&mut cmd);

        let mut child = cmd
            .spawn()
            .map_err(|e| format!("failed to spawn {}: {}", program, e))?;
        tracing::debug!(pid = child.id(), program = %program, "child spawned");

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        // Both pipes are owned by scoped readers, so they are closed before
        // the scope returns on every path.
        let read_failure = thread::scope(|s| {
            let (tx, rx) = mpsc::channel::<ReadEvent>();
            if let Some(out) = stdout {
                let tx = tx.clone();
                s.spawn(move || read_lines(out, OutputStream::Stdout, tx));
            }
            if let Some(err) = stderr {
                let tx = tx.clone();
                s.spawn(move || read_lines(err, OutputStream::Stderr, tx));
            }
            drop(tx);

            let mut failure = None;
            for event in rx {
                match event {
                    Ok((stream, text)) => emit(stream, text),
                    Err(reason) => {
                        failure.get_or_insert(reason);
                    }
                }
            }
            failure
        });

        let status = child
            .wait()
            .map_err(|e| format!("failed to wait for {}: {}", program, e))?;
        if let Some(reason) = read_failure {
            return Err(reason);
        }
        Ok(status.code().unwrap_or(NO_EXIT_CODE))
    }
}


/// Read `source` line by line, sending each line (terminator stripped) as it
/// arrives. Stops at end of stream, on a read error, or when the receiver is
/// gone.
fn read_lines<R: Read>(source: R, stream: OutputStream, tx: mpsc::Sender<ReadEvent>) {
    let mut reader = BufReader::new(source);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                if buf.ends_with(b"\n") {
                    buf.pop();
                    if buf.ends_with(b"\r") {
                        buf.pop();
                    }
                }
                let text = String::from_utf8_lossy(&buf).into_owned();
                if tx.send(Ok((stream, text))).is_err() {
                    break;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                let _ = tx.send(Err(format!("failed to read {:?}: {}", stream, e)));
                break;
            }
        }
    }
}


#[cfg(windows)]
fn hide_console(cmd: &mut std::process::Command) {
    use std::os::windows::process::CommandExt;
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    cmd.creation_flags(CREATE_NO_WINDOW);
}

#[cfg(not(windows))]
fn hide_console(_cmd: &mut std::process::Command) {}


/// The script must exist, be a regular file, and be openable for reading.
fn check_executable(path: &Path) -> std::result::Result<(), String> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() => std::fs::File::open(path)
            .map(|_| ())
            .map_err(|e| format!("not readable: {}: {}", path.display(), e)),
        Ok(_) => Err(format!("not a file: {}", path.display())),
        Err(_) => Err(format!("not found: {}", path.display())),
    }
}

// ---------------------------------------------------------------------------
// Launcher
// ---------------------------------------------------------------------------

/// Starts runs on dedicated threads and wires their output into a sink.
pub struct Launcher {
    runner: Arc<dyn ProcessRunner>,
    sink: OutputSink,
    next_id: AtomicU64,
}

impl Launcher {
    pub fn new(runner: Arc<dyn ProcessRunner>, sink: OutputSink) -> Self {
        Launcher {
            runner,
            sink,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn sink(&self) -> &OutputSink {
        &self.sink
    }

    /// Start `command` without blocking.
    ///
    /// A missing or unreadable script yields a handle that is already in
    /// `RunnerError` and produces no output. `Err` is returned only if the
    /// worker thread could not be created.
    pub fn start(&self, command: &Command) -> Result<RunHandle> {
        let id: RunId = self.next_id.fetch_add(1, Ordering::Relaxed);
        let handle = RunHandle::new(id, &command.label);

        if let Err(reason) = check_executable(&command.executable_path) {
            tracing::warn!(run = id, label = %command.label, %reason, "run rejected");
            handle.finish(RunStatus::RunnerError { reason });
            return Ok(handle);
        }

        tracing::info!(run = id, label = %command.label, script = %command.script_name(), "run started");
        let runner = Arc::clone(&self.runner);
        let sink = self.sink.clone();
        let command = command.clone();
        let worker_handle = handle.clone();

        thread::Builder::new()
            .name(format!("upkeep-run-{}", id))
            .spawn(move || {
                let guard = FinishGuard(worker_handle);
                let status = execute_into_sink(runner.as_ref(), &command, id, &sink);
                match &status {
                    RunStatus::RunnerError { reason } => {
                        tracing::warn!(run = id, label = %command.label, %reason, "run failed to execute")
                    }
                    other => tracing::info!(run = id, label = %command.label, status = %other, "run finished"),
                }
                guard.0.finish(status);
            })
            .map_err(|e| {
                handle.finish(RunStatus::RunnerError {
                    reason: format!("cannot start worker thread: {}", e),
                });
                UpkeepError::RunnerError(format!("cannot start worker thread: {}", e))
            })?;

        Ok(handle)
    }
}


fn execute_into_sink(
    runner: &dyn ProcessRunner,
    command: &Command,
    run_id: RunId,
    sink: &OutputSink,
) -> RunStatus {
    let mut sequence_number = 0u64;
    let mut emit = |stream: OutputStream, text: String| {
        sequence_number += 1;
        tracing::trace!(run = run_id, seq = sequence_number, ?stream, "line");
        sink.append(OutputLine {
            run_id,
            command_label: command.label.clone(),
            stream,
            text,
            sequence_number,
        });
    };
    match runner.execute(command, &mut emit) {
        Ok(0) => RunStatus::Succeeded,
        Ok(exit_code) => RunStatus::Failed { exit_code },
        Err(reason) => RunStatus::RunnerError { reason },
    }
}


/// Ensures a run reaches a terminal status even if the worker unwinds.
struct FinishGuard(RunHandle);

impl Drop for FinishGuard {
    fn drop(&mut self) {
        if self.0.finish(RunStatus::RunnerError {
            reason: "runner panicked".into(),
        }) {
            tracing::error!(run = self.0.id(), "run worker panicked");
        }
    }
}

// ---------------------------------------------------------------------------
// MockRunner
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Script {
    lines: Vec<(OutputStream, String)>,
    outcome: std::result::Result<i32, String>,
}

#[derive(Debug, Default)]
struct Gate {
    closed: Mutex<bool>,
    opened: Condvar,
}

/// Test-double runner that replays scripted output per label.
///
/// Labels without a script emit nothing and exit 0. While the gate is held,
/// every execution blocks after emitting its lines, which keeps the run in
/// `Running` for as long as a test needs.
#[derive(Debug, Default)]
pub struct MockRunner {
    scripts: Mutex<HashMap<String, Script>>,
    executed: Mutex<Vec<String>>,
    gate: Gate,
}

impl MockRunner {
    pub fn new() -> Self {
        MockRunner::default()
    }

    /// Script the output and exit code for `label`.
    pub fn with_script(self, label: &str, lines: &[(OutputStream, &str)], exit_code: i32) -> Self {
        self.set_script(label, lines, Ok(exit_code));
        self
    }

    /// Make executions of `label` fail at the runner level.
    pub fn with_failure(self, label: &str, reason: &str) -> Self {
        self.set_script(label, &[], Err(reason.to_string()));
        self
    }

    fn set_script(&self, label: &str, lines: &[(OutputStream, &str)], outcome: std::result::Result<i32, String>) {
        let lines = lines.iter().map(|(s, t)| (*s, t.to_string())).collect();
        self.scripts
            .lock()
            .insert(label.to_string(), Script { lines, outcome });
    }

    /// Block executions after their output until `release` is called.
    pub fn hold(&self) {
        *self.gate.closed.lock() = true;
    }

    pub fn release(&self) {
        *self.gate.closed.lock() = false;
        self.gate.opened.notify_all();
    }

    /// Labels executed so far, in start order.
    pub fn executed_labels(&self) -> Vec<String> {
        self.executed.lock().clone()
    }
}

impl ProcessRunner for MockRunner {
    fn execute(
        &self,
        command: &Command,
        emit: &mut dyn FnMut(OutputStream, String),
    ) -> std::result::Result<i32, String> {
        self.executed.lock().push(command.label.clone());
        let script = self.scripts.lock().get(&command.label).cloned();
        let script = script.unwrap_or(Script {
            lines: Vec::new(),
            outcome: Ok(0),
        });
        for (stream, text) in script.lines {
            emit(stream, text);
        }
        let mut closed = self.gate.closed.lock();
        while *closed {
            self.gate.opened.wait(&mut closed);
        }
        script.outcome
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::command::Interpreter;
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(10);

    fn script_file(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    fn launcher(runner: Arc<dyn ProcessRunner>) -> Launcher {
        Launcher::new(runner, OutputSink::new())
    }

    #[test]
    fn missing_script_is_runner_error_without_output() {
        let l = launcher(Arc::new(ShellRunner));
        let cmd = Command::new("Ghost", "/definitely/not/here.sh", Interpreter::Shell);
        let handle = l.start(&cmd).unwrap();
        match handle.status() {
            RunStatus::RunnerError { reason } => assert!(reason.starts_with("not found")),
            other => panic!("unexpected status {:?}", other),
        }
        assert!(l.sink().is_empty());
        assert_eq!(l.sink().total_appended(), 0);
    }

    #[test]
    fn directory_is_not_executable() {
        let dir = tempfile::tempdir().unwrap();
        let l = launcher(Arc::new(MockRunner::new()));
        let handle = l.start(&Command::new("Dir", dir.path(), Interpreter::Shell)).unwrap();
        assert!(matches!(handle.status(), RunStatus::RunnerError { .. }));
    }

    #[test]
    fn mock_lines_get_sequence_numbers() {
        let dir = tempfile::tempdir().unwrap();
        let path = script_file(dir.path(), "x.sh", "");
        let runner = MockRunner::new().with_script(
            "X",
            &[
                (OutputStream::Stdout, "one"),
                (OutputStream::Stderr, "two"),
                (OutputStream::Stdout, "three"),
            ],
            0,
        );
        let l = launcher(Arc::new(runner));
        let handle = l.start(&Command::new("X", path, Interpreter::Shell)).unwrap();
        assert_eq!(handle.wait_timeout(WAIT), Some(RunStatus::Succeeded));

        let lines = l.sink().lines_for(handle.id());
        let seqs: Vec<u64> = lines.iter().map(|l| l.sequence_number).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
        assert_eq!(lines[1].stream, OutputStream::Stderr);
        assert!(lines.iter().all(|l| l.command_label == "X"));
    }

    #[test]
    fn runner_failure_maps_to_runner_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = script_file(dir.path(), "x.sh", "");
        let runner = MockRunner::new().with_failure("X", "interpreter missing");
        let l = launcher(Arc::new(runner));
        let handle = l.start(&Command::new("X", path, Interpreter::Shell)).unwrap();
        assert_eq!(
            handle.wait_timeout(WAIT),
            Some(RunStatus::RunnerError {
                reason: "interpreter missing".into()
            })
        );
    }

    #[test]
    fn run_ids_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let path = script_file(dir.path(), "x.sh", "");
        let l = launcher(Arc::new(MockRunner::new()));
        let cmd = Command::new("X", path, Interpreter::Shell);
        let a = l.start(&cmd).unwrap();
        let b = l.start(&cmd).unwrap();
        assert_ne!(a.id(), b.id());
    }

    struct PanickingRunner;

    impl ProcessRunner for PanickingRunner {
        fn execute(
            &self,
            _command: &Command,
            _emit: &mut dyn FnMut(OutputStream, String),
        ) -> std::result::Result<i32, String> {
            panic!("boom");
        }
    }

    #[test]
    fn panicking_runner_still_reaches_terminal_status() {
        let dir = tempfile::tempdir().unwrap();
        let path = script_file(dir.path(), "x.sh", "");
        let l = launcher(Arc::new(PanickingRunner));
        let handle = l.start(&Command::new("X", path, Interpreter::Shell)).unwrap();
        assert_eq!(
            handle.wait_timeout(WAIT),
            Some(RunStatus::RunnerError {
                reason: "runner panicked".into()
            })
        );
    }

    #[cfg(unix)]
    #[test]
    fn shell_exit_code_and_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = script_file(
            dir.path(),
            "exit3.sh",
            "echo first\necho second\necho third\nexit 3\n",
        );
        let l = launcher(Arc::new(ShellRunner));
        let handle = l.start(&Command::new("Exit", path, Interpreter::Shell)).unwrap();
        assert_eq!(handle.wait_timeout(WAIT), Some(RunStatus::Failed { exit_code: 3 }));

        let texts: Vec<String> = l.sink().snapshot().into_iter().map(|l| l.text).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }

    #[cfg(unix)]
    #[test]
    fn shell_captures_stderr_separately() {
        let dir = tempfile::tempdir().unwrap();
        let path = script_file(dir.path(), "err.sh", "echo out\necho bad 1>&2\n");
        let l = launcher(Arc::new(ShellRunner));
        let handle = l.start(&Command::new("Err", path, Interpreter::Shell)).unwrap();
        assert_eq!(handle.wait_timeout(WAIT), Some(RunStatus::Succeeded));

        let lines = l.sink().snapshot();
        assert_eq!(lines.len(), 2);
        let err: Vec<&OutputLine> = lines.iter().filter(|l| l.stream == OutputStream::Stderr).collect();
        assert_eq!(err.len(), 1);
        assert_eq!(err[0].text, "bad");
    }

    #[cfg(unix)]
    #[test]
    fn shell_streams_before_exit() {
        let dir = tempfile::tempdir().unwrap();
        let path = script_file(dir.path(), "slow.sh", "echo early\nsleep 2\necho late\n");
        let l = launcher(Arc::new(ShellRunner));
        let rx = l.sink().subscribe();
        let handle = l.start(&Command::new("Slow", path, Interpreter::Shell)).unwrap();

        let first = rx.recv_timeout(WAIT).unwrap();
        assert_eq!(first.text, "early");
        assert!(handle.is_running());
        assert_eq!(handle.wait_timeout(WAIT), Some(RunStatus::Succeeded));
    }

    #[cfg(unix)]
    #[test]
    fn clear_mid_run_keeps_later_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = script_file(dir.path(), "two.sh", "echo one\nsleep 1\necho two\nexit 3\n");
        let l = launcher(Arc::new(ShellRunner));
        let rx = l.sink().subscribe();
        let handle = l.start(&Command::new("Two", path, Interpreter::Shell)).unwrap();

        assert_eq!(rx.recv_timeout(WAIT).unwrap().text, "one");
        l.sink().clear();
        assert!(handle.is_running());
        assert_eq!(handle.wait_timeout(WAIT), Some(RunStatus::Failed { exit_code: 3 }));

        let kept: Vec<(String, u64)> = l
            .sink()
            .snapshot()
            .into_iter()
            .map(|l| (l.text, l.sequence_number))
            .collect();
        assert_eq!(kept, vec![("two".to_string(), 2)]);
    }

    #[cfg(unix)]
    #[test]
    fn shell_strips_crlf_and_keeps_unterminated_tail() {
        let dir = tempfile::tempdir().unwrap();
        let path = script_file(dir.path(), "crlf.sh", "printf 'a\\r\\nb'\n");
        let l = launcher(Arc::new(ShellRunner));
        let handle = l.start(&Command::new("Crlf", path, Interpreter::Shell)).unwrap();
        assert_eq!(handle.wait_timeout(WAIT), Some(RunStatus::Succeeded));
        let texts: Vec<String> = l.sink().snapshot().into_iter().map(|l| l.text).collect();
        assert_eq!(texts, vec!["a", "b"]);
    }

    #[cfg(unix)]
    #[test]
    fn direct_execution_without_exec_bit_is_runner_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = script_file(dir.path(), "noexec.sh", "echo hi\n");
        let l = launcher(Arc::new(ShellRunner));
        let handle = l.start(&Command::new("NoExec", path, Interpreter::None)).unwrap();
        match handle.wait_timeout(WAIT) {
            Some(RunStatus::RunnerError { reason }) => assert!(reason.contains("failed to spawn")),
            other => panic!("unexpected status {:?}", other),
        }
        assert!(l.sink().is_empty());
    }

    #[test]
    fn mock_hold_keeps_run_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = script_file(dir.path(), "x.sh", "");
        let runner = Arc::new(MockRunner::new());
        runner.hold();
        let l = launcher(runner.clone());
        let handle = l.start(&Command::new("X", path, Interpreter::Shell)).unwrap();
        assert_eq!(handle.wait_timeout(Duration::from_millis(50)), None);
        runner.release();
        assert_eq!(handle.wait_timeout(WAIT), Some(RunStatus::Succeeded));
        assert_eq!(runner.executed_labels(), vec!["X"]);
    }
}
