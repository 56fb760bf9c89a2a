//! Panel runner: ratatui event loop with terminal setup and cleanup.
//!
//! [`Session`] holds everything except the terminal: the controller, the
//! key-handling [`App`], the cached output, and the runs whose completion
//! still has to be announced. [`Tui`] owns the terminal and drives a
//! `Session` from keyboard events and a periodic tick.

use std::io;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Terminal;

use upkeep_core::types::ThemeName;
use upkeep_core::execution::SinkCursor;
use upkeep_core::{OutputLine, RunHandle, RunStatus, SessionController, UpkeepError};

use crate::app::{App, AppAction, AppState, Key, VIEW_REPORT};
use crate::output_view;
use crate::panel;
use crate::theme::Theme;

/// Rows taken by the title bar and the status line.
const CHROME_ROWS: u16 = 2;

const HELP_TEXT: &str = concat!(
    "UpKeep panel\n",
    "\n",
    "  j / k     Select next / previous button\n",
    "  Enter     Run the selected button\n",
    "  v         Open the latest diagnostic report\n",
    "  c         Clear the output pane\n",
    "  g / G     Jump to top / follow newest output\n",
    "  PgUp/PgDn Scroll output\n",
    "  ?         Toggle this help\n",
    "  q         Quit\n",
);


fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Terminal-free panel state and the effects of user actions.
pub struct Session {
    controller: SessionController,
    pub app: App,
    theme: Theme,
    /// Newest sink lines, at most `output_view::MAX_LINES`.
    lines: Vec<OutputLine>,
    /// Sink position the cache is current up to.
    cursor: SinkCursor,
    /// Runs started from the panel whose end has not been announced yet.
    pending: Vec<RunHandle>,
}


impl Session {
    pub fn new(controller: SessionController, theme: ThemeName) -> Self {
        let labels = controller
            .registry()
            .labels()
            .into_iter()
            .map(String::from)
            .collect();
        Session {
            controller,
            app: App::new(labels),
            theme: Theme::for_name(theme),
            lines: Vec::new(),
            cursor: SinkCursor::default(),
            pending: Vec::new(),
        }
    }

    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    pub fn lines(&self) -> &[OutputLine] {
        &self.lines
    }

    /// Carry out an action. Returns `true` when the panel should close.
    pub fn handle_action(&mut self, action: AppAction, now_ms: u64) -> bool {
        match action {
            AppAction::Quit => return true,
            AppAction::Run(label) => self.start(&label, now_ms),
            AppAction::ViewReport => self.view_report(now_ms),
            AppAction::ClearOutput => {
                self.controller.sink().clear();
                self.lines.clear();
                self.app.reset_scroll();
            }
        }
        false
    }

    fn start(&mut self, label: &str, now_ms: u64) {
        let script = self.script_name(label);
        match self.controller.run(label) {
            Ok(handle) => match handle.status() {
                RunStatus::RunnerError { reason } => {
                    self.app.set_status(&format!("Error: {}", reason), now_ms);
                }
                _ => {
                    self.app.set_status(&format!("Running {}...", script), now_ms);
                    self.pending.push(handle);
                }
            },
            Err(UpkeepError::AlreadyRunning(_)) => {
                self.app.set_status(&format!("{} is already running", label), now_ms);
            }
            Err(e) => {
                tracing::warn!(label = %label, error = %e, "run not started");
                self.app.set_status(&format!("Error: {}", e), now_ms);
            }
        }
    }

    fn view_report(&mut self, now_ms: u64) {
        match self.controller.view_latest_report() {
            Ok(path) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let msg = format!("Opening {} in {}...", name, self.controller.viewer());
                self.app.set_status(&msg, now_ms);
            }
            Err(UpkeepError::NoneFound { .. }) => {
                self.app.set_status("No diagnostic reports found.", now_ms);
            }
            Err(e) => {
                self.app.set_status(&format!("Error opening report: {}", e), now_ms);
            }
        }
    }

    /// Pull new output and announce finished runs.
    pub fn refresh(&mut self, now_ms: u64) {
        let delta = self.controller.sink().read_since(self.cursor);
        if delta.reset {
            self.lines.clear();
        }
        self.lines.extend(delta.lines);
        self.cursor = delta.cursor;
        let excess = self.lines.len().saturating_sub(output_view::MAX_LINES);
        if excess > 0 {
            self.lines.drain(..excess);
        }

        let (done, still_running): (Vec<RunHandle>, Vec<RunHandle>) =
            self.pending.drain(..).partition(|h| !h.is_running());
        self.pending = still_running;
        for handle in done {
            let msg = match handle.status() {
                RunStatus::RunnerError { reason } => format!("Error: {}", reason),
                RunStatus::Failed { exit_code } => format!(
                    "Finished running {} (exit {})",
                    self.script_name(handle.command_label()),
                    exit_code
                ),
                _ => format!("Finished running {}", self.script_name(handle.command_label())),
            };
            self.app.set_status(&msg, now_ms);
        }
        self.app.clear_expired_status(now_ms);
    }

    /// Latest run status for every panel entry, in entry order.
    pub fn entry_statuses(&self) -> Vec<Option<RunStatus>> {
        self.app
            .entries()
            .iter()
            .map(|label| {
                if label == VIEW_REPORT {
                    None
                } else {
                    self.controller.latest_run(label).map(|r| r.status())
                }
            })
            .collect()
    }

    /// Resize bookkeeping for an output pane of `height` rows.
    pub fn fit_output(&mut self, height: u16) -> u16 {
        let max = output_view::max_scroll_offset(self.lines.len(), height);
        self.app.page_height = height.saturating_sub(2).max(1);
        self.app.sync_scroll(max);
        max
    }

    fn script_name(&self, label: &str) -> String {
        self.controller
            .registry()
            .resolve(label)
            .map(|c| c.script_name())
            .unwrap_or_else(|_| label.to_string())
    }
}

// ---------------------------------------------------------------------------
// Tui
// ---------------------------------------------------------------------------

/// Snapshot of what a single frame needs, borrowed from the session.
struct RenderState<'a> {
    session: &'a Session,
    statuses: Vec<Option<RunStatus>>,
}


pub struct Tui {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    session: Session,
    tick_rate: Duration,
    last_refresh: Instant,
}


impl Tui {
    /// Enter raw mode and the alternate screen.
    pub fn new(controller: SessionController, theme: ThemeName) -> Result<Self, io::Error> {
        let terminal = with_raw_mode(terminal::enable_raw_mode, enter_screen, restore_terminal)?;

        Ok(Tui {
            terminal,
            session: Session::new(controller, theme),
            tick_rate: Duration::from_millis(100),
            last_refresh: Instant::now(),
        })
    }

    /// Run the event loop until the user quits.
    pub fn run(&mut self) -> Result<(), io::Error> {
        self.session.refresh(now_ms());
        loop {
            let height = self.terminal.size()?.height.saturating_sub(CHROME_ROWS);
            let max_offset = self.session.fit_output(height);

            let state = RenderState {
                session: &self.session,
                statuses: self.session.entry_statuses(),
            };
            self.terminal.draw(|frame| render_frame(frame, &state))?;

            let timeout = self
                .tick_rate
                .checked_sub(self.last_refresh.elapsed())
                .unwrap_or(Duration::ZERO);

            if event::poll(timeout)? {
                if let Event::Key(key_event) = event::read()? {
                    if key_event.kind == KeyEventKind::Press {
                        let key = crossterm_to_key(key_event.code, key_event.modifiers);
                        if let Some(action) = self.session.app.handle_key(key, max_offset) {
                            if self.session.handle_action(action, now_ms()) {
                                break;
                            }
                        }
                    }
                }
            }

            if self.last_refresh.elapsed() >= self.tick_rate {
                self.session.refresh(now_ms());
                self.last_refresh = Instant::now();
            }
        }

        let active = self.session.controller().active().len();
        if active > 0 {
            tracing::info!(active, "panel closed with runs still in progress");
        }
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<(), io::Error> {
        terminal::disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}


/// Enable raw mode, then run `enter`. If `enter` fails there is no `Tui` to
/// drop yet, so `restore` runs here.
fn with_raw_mode<T>(
    enable: impl FnOnce() -> Result<(), io::Error>,
    enter: impl FnOnce() -> Result<T, io::Error>,
    restore: impl FnOnce(),
) -> Result<T, io::Error> {
    enable()?;
    enter().map_err(|e| {
        restore();
        e
    })
}


fn restore_terminal() {
    let _ = execute!(io::stdout(), LeaveAlternateScreen);
    let _ = terminal::disable_raw_mode();
}


fn enter_screen() -> Result<Terminal<CrosstermBackend<io::Stdout>>, io::Error> {
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    Terminal::new(CrosstermBackend::new(stdout))
}


impl Drop for Tui {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn render_frame(frame: &mut Frame, state: &RenderState) {
    let session = state.session;
    let theme = &session.theme;
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // title bar
            Constraint::Min(3),    // buttons + output
            Constraint::Length(1), // status line
        ])
        .split(frame.area());

    let title = Paragraph::new(" UpKeep").style(theme.title_style());
    frame.render_widget(title, rows[0]);

    let entries = session.app.entries();
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(panel::panel_width(entries)),
            Constraint::Fill(1),
        ])
        .split(rows[1]);

    panel::render_panel(
        frame,
        columns[0],
        entries,
        &state.statuses,
        session.app.selected_index,
        theme,
    );
    output_view::render_output_view(
        frame,
        columns[1],
        &session.lines,
        session.app.scroll_offset,
        session.app.follow_tail,
        theme,
    );

    let status = session
        .app
        .status_message()
        .map(|m| format!(" {}", m))
        .unwrap_or_else(|| " ? help  q quit".to_string());
    frame.render_widget(
        Paragraph::new(status).style(Style::default().fg(theme.status)),
        rows[2],
    );

    if session.app.state == AppState::Help {
        render_help(frame, rows[1], theme);
    }
}


fn render_help(frame: &mut Frame, area: Rect, theme: &Theme) {
    let width = 48.min(area.width);
    let height = 14.min(area.height);
    let popup = Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    };
    let help = Paragraph::new(HELP_TEXT).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(theme.border_style())
            .title(" Help "),
    );
    frame.render_widget(Clear, popup);
    frame.render_widget(help, popup);
}

// ---------------------------------------------------------------------------
// Key conversion
// ---------------------------------------------------------------------------

/// Convert a crossterm `KeyCode` + `KeyModifiers` into the panel's `Key`.
pub fn crossterm_to_key(code: KeyCode, modifiers: KeyModifiers) -> Key {
    if modifiers.contains(KeyModifiers::CONTROL) {
        if let KeyCode::Char(ch) = code {
            return Key::Ctrl(ch);
        }
    }
    match code {
        KeyCode::Char(ch) => Key::Char(ch),
        KeyCode::Enter => Key::Enter,
        KeyCode::Esc => Key::Escape,
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        KeyCode::Home => Key::Home,
        KeyCode::End => Key::End,
        KeyCode::PageUp => Key::PageUp,
        KeyCode::PageDown => Key::PageDown,
        _ => Key::Other,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
