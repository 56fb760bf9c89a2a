//! Panel state machine.
//!
//! Tracks which button is selected, how the output pane is scrolled, and the
//! transient status line. `App` performs no I/O: key presses go in, and
//! `AppAction`s the runner must carry out come back.


/// Label of the trailing panel entry that opens the latest report.
pub const VIEW_REPORT: &str = "View Report";

/// How long a status message stays visible.
const STATUS_TTL_MS: u64 = 8000;

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    /// Buttons on the left, output on the right.
    Panel,
    /// Key reference overlay.
    Help,
}

// ---------------------------------------------------------------------------
// AppAction
// ---------------------------------------------------------------------------

/// Something the key handler wants done outside the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    Quit,
    /// Start the command with this label.
    Run(String),
    ViewReport,
    ClearOutput,
}

// ---------------------------------------------------------------------------
// Key
// ---------------------------------------------------------------------------

/// Terminal-independent key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Ctrl(char),
    Enter,
    Escape,
    Up,
    Down,
    Home,
    End,
    PageUp,
    PageDown,
    Other,
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

pub struct App {
    pub state: AppState,
    /// Command labels in panel order, followed by [`VIEW_REPORT`].
    entries: Vec<String>,
    pub selected_index: usize,
    /// First visible output line.
    pub scroll_offset: u16,
    /// Keep the newest output line in view as lines arrive.
    pub follow_tail: bool,
    /// Rows of output visible at once, used for paging.
    pub page_height: u16,
    status_message: Option<(String, u64)>,
}


impl App {
    pub fn new(labels: Vec<String>) -> Self {
        let mut entries = labels;
        entries.push(VIEW_REPORT.to_string());
        App {
            state: AppState::Panel,
            entries,
            selected_index: 0,
            scroll_offset: 0,
            follow_tail: true,
            page_height: 10,
            status_message: None,
        }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn selected_entry(&self) -> &str {
        self.entries
            .get(self.selected_index)
            .map(|s| s.as_str())
            .unwrap_or(VIEW_REPORT)
    }

    // -------------------------------------------------------------------
    // Selection
    // -------------------------------------------------------------------

    pub fn select_next(&mut self) {
        if self.selected_index + 1 < self.entries.len() {
            self.selected_index += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected_index = self.selected_index.saturating_sub(1);
    }

    // -------------------------------------------------------------------
    // Output scrolling
    // -------------------------------------------------------------------

    /// Reconcile the scroll position with the current content size.
    pub fn sync_scroll(&mut self, max_offset: u16) {
        if self.follow_tail || self.scroll_offset > max_offset {
            self.scroll_offset = max_offset;
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.follow_tail = false;
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
    }

    /// Scrolling down to the end resumes following the tail.
    pub fn scroll_down(&mut self, lines: u16, max_offset: u16) {
        self.scroll_offset = self.scroll_offset.saturating_add(lines).min(max_offset);
        self.follow_tail = self.scroll_offset >= max_offset;
    }

    pub fn scroll_top(&mut self) {
        self.follow_tail = false;
        self.scroll_offset = 0;
    }

    pub fn scroll_bottom(&mut self) {
        self.follow_tail = true;
    }

    pub fn reset_scroll(&mut self) {
        self.scroll_offset = 0;
        self.follow_tail = true;
    }

    // -------------------------------------------------------------------
    // Status line
    // -------------------------------------------------------------------

    pub fn set_status(&mut self, msg: &str, now_ms: u64) {
        self.status_message = Some((msg.to_string(), now_ms));
    }

    pub fn clear_expired_status(&mut self, now_ms: u64) {
        if let Some((_, created)) = &self.status_message {
            if now_ms.saturating_sub(*created) >= STATUS_TTL_MS {
                self.status_message = None;
            }
        }
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_ref().map(|(msg, _)| msg.as_str())
    }

    // -------------------------------------------------------------------
    // Input
    // -------------------------------------------------------------------

    /// Handle one key. `max_offset` is the current output scroll limit.
    pub fn handle_key(&mut self, key: Key, max_offset: u16) -> Option<AppAction> {
        match self.state {
            AppState::Help => {
                if matches!(key, Key::Char('q') | Key::Char('?') | Key::Escape | Key::Enter) {
                    self.state = AppState::Panel;
                }
                None
            }
            AppState::Panel => self.handle_panel_key(key, max_offset),
        }
    }

    fn handle_panel_key(&mut self, key: Key, max_offset: u16) -> Option<AppAction> {
        match key {
            Key::Char('q') | Key::Ctrl('c') => Some(AppAction::Quit),
            Key::Char('?') => {
                self.state = AppState::Help;
                None
            }
            Key::Char('j') | Key::Down => {
                self.select_next();
                None
            }
            Key::Char('k') | Key::Up => {
                self.select_prev();
                None
            }
            Key::Enter => {
                let entry = self.selected_entry();
                if entry == VIEW_REPORT {
                    Some(AppAction::ViewReport)
                } else {
                    Some(AppAction::Run(entry.to_string()))
                }
            }
            Key::Char('v') => Some(AppAction::ViewReport),
            Key::Char('c') => Some(AppAction::ClearOutput),
            Key::Char('g') | Key::Home => {
                self.scroll_top();
                None
            }
            Key::Char('G') | Key::End => {
                self.scroll_bottom();
                None
            }
            Key::PageUp => {
                self.scroll_up(self.page_height);
                None
            }
            Key::PageDown => {
                self.scroll_down(self.page_height, max_offset);
                None
            }
            Key::Ctrl('u') => {
                self.scroll_up(self.page_height / 2);
                None
            }
            Key::Ctrl('d') => {
                self.scroll_down(self.page_height / 2, max_offset);
                None
            }
            _ => None,
        }
    }
}


impl Default for App {
    fn default() -> Self {
        App::new(Vec::new())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
