//! Output capture: the shared sink every run writes into.
//!
//! `OutputSink` is the single ordered store of captured lines across all
//! runs. It is a cheap `Clone` over one mutex; runners append from their
//! worker threads while presentation code snapshots, clears, or subscribes
//! for push delivery.

use std::sync::mpsc;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::types::run::RunId;

// ---------------------------------------------------------------------------
// OutputStream
// ---------------------------------------------------------------------------

/// Which output stream a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

// ---------------------------------------------------------------------------
// OutputLine
// ---------------------------------------------------------------------------

/// A single line of captured output, tagged with its originating run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputLine {
    pub run_id: RunId,
    pub command_label: String,
    pub stream: OutputStream,
    pub text: String,
    /// Strictly increasing within one run, starting at 1.
    pub sequence_number: u64,
}

// ---------------------------------------------------------------------------
// OutputSink
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct SinkState {
    lines: Vec<OutputLine>,
    total_appended: u64,
    /// Number of `clear` calls so far.
    clears: u64,
    /// `total_appended` at the last clear; `lines[0]` is the line appended next after it.
    cleared_at: u64,
    subscribers: Vec<mpsc::Sender<OutputLine>>,
}

/// Read position into an [`OutputSink`], handed back by [`OutputSink::read_since`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkCursor {
    clears: u64,
    appended: u64,
}

/// Lines appended after a cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkDelta {
    pub lines: Vec<OutputLine>,
    /// The sink was cleared since the cursor was taken; `lines` is then the
    /// whole current content and earlier copies are stale.
    pub reset: bool,
    pub cursor: SinkCursor,
}

/// Append-only, serialized store of output lines from every run.
#[derive(Debug, Clone, Default)]
pub struct OutputSink {
    state: Arc<Mutex<SinkState>>,
}

impl OutputSink {
    pub fn new() -> Self {
        OutputSink::default()
    }

    /// Append one line and forward it to live subscribers. Subscribers whose
    /// receiver was dropped are removed.
    pub fn append(&self, line: OutputLine) {
        let mut state = self.state.lock();
        state.total_appended += 1;
        state.subscribers.retain(|tx| tx.send(line.clone()).is_ok());
        state.lines.push(line);
    }

    /// Copy of every line currently held, in arrival order.
    pub fn snapshot(&self) -> Vec<OutputLine> {
        self.state.lock().lines.clone()
    }

    /// Lines held for one run, in the order that run produced them.
    pub fn lines_for(&self, run_id: RunId) -> Vec<OutputLine> {
        self.state
            .lock()
            .lines
            .iter()
            .filter(|l| l.run_id == run_id)
            .cloned()
            .collect()
    }

    /// Discard all held lines. Runs still in flight keep appending after
    /// this point; subscribers stay attached.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.lines.clear();
        state.clears += 1;
        state.cleared_at = state.total_appended;
    }

    /// Lines appended since `cursor` was taken, without copying the rest.
    /// Start from `SinkCursor::default()`.
    pub fn read_since(&self, cursor: SinkCursor) -> SinkDelta {
        let state = self.state.lock();
        let reset = cursor.clears != state.clears;
        let from = if reset {
            0
        } else {
            usize::try_from(cursor.appended.saturating_sub(state.cleared_at)).unwrap_or(usize::MAX)
        };
        SinkDelta {
            lines: state.lines.get(from..).map(<[OutputLine]>::to_vec).unwrap_or_default(),
            reset,
            cursor: SinkCursor {
                clears: state.clears,
                appended: state.total_appended,
            },
        }
    }

    /// Receive every line appended from now on.
    pub fn subscribe(&self) -> mpsc::Receiver<OutputLine> {
        let (tx, rx) = mpsc::channel();
        self.state.lock().subscribers.push(tx);
        rx
    }

    pub fn len(&self) -> usize {
        self.state.lock().lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().lines.is_empty()
    }

    /// Lines ever appended, including ones discarded by `clear`.
    pub fn total_appended(&self) -> u64 {
        self.state.lock().total_appended
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
