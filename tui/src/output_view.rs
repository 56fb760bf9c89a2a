//! Output pane: the captured lines of every run, oldest first.
//!
//! Stderr lines are drawn in the theme's error color. The pane does not wrap,
//! so one captured line is one row and scroll offsets map directly to lines.

use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use upkeep_core::{OutputLine, OutputStream};

use crate::theme::Theme;

/// Most lines the pane holds; offsets past this would not fit a `u16` scroll.
pub const MAX_LINES: usize = u16::MAX as usize;


/// Render the output pane with the given vertical scroll offset.
pub fn render_output_view(
    frame: &mut Frame,
    area: Rect,
    lines: &[OutputLine],
    scroll_offset: u16,
    following: bool,
    theme: &Theme,
) {
    let lines = tail(lines);
    let title = if following || lines.is_empty() {
        " Output ".to_string()
    } else {
        format!(" Output [{}/{}] ", scroll_offset as usize + 1, lines.len())
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.border_style())
        .title(title);

    let text: Vec<Line> = lines.iter().map(|l| styled_line(l, theme)).collect();
    let paragraph = Paragraph::new(text).block(block).scroll((scroll_offset, 0));

    frame.render_widget(paragraph, area);
}


/// The newest `MAX_LINES` of `lines`.
pub fn tail(lines: &[OutputLine]) -> &[OutputLine] {
    &lines[lines.len().saturating_sub(MAX_LINES)..]
}


fn styled_line<'a>(line: &'a OutputLine, theme: &Theme) -> Line<'a> {
    let color = match line.stream {
        OutputStream::Stdout => theme.stdout,
        OutputStream::Stderr => theme.stderr,
    };
    Line::styled(line.text.as_str(), Style::default().fg(color))
}


/// Calculate the maximum scroll offset for a given content and viewport.
///
/// `viewport_height` includes the top and bottom borders. Returns 0 if the
/// content fits. Only the newest `MAX_LINES` count.
pub fn max_scroll_offset(line_count: usize, viewport_height: u16) -> u16 {
    let usable = viewport_height.saturating_sub(2) as usize;
    let excess = line_count.min(MAX_LINES).saturating_sub(usable);
    u16::try_from(excess).unwrap_or(u16::MAX)
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
