//! Button column: one row per panel entry with the state of its latest run.

use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState};

use upkeep_core::RunStatus;

use crate::app::VIEW_REPORT;
use crate::theme::Theme;


/// Render the button list. `statuses[i]` is the latest run of `entries[i]`.
/// The list scrolls so the selected button is always on screen.
pub fn render_panel(
    frame: &mut Frame,
    area: Rect,
    entries: &[String],
    statuses: &[Option<RunStatus>],
    selected: usize,
    theme: &Theme,
) {
    let items: Vec<ListItem> = entries
        .iter()
        .enumerate()
        .map(|(i, label)| {
            let status = statuses.get(i).and_then(|s| s.as_ref());
            let (symbol, color) = status_symbol(status, theme);
            let style = if i == selected {
                theme.selected_style()
            } else {
                Style::default().fg(theme.button)
            };
            let line = if label == VIEW_REPORT {
                Line::from(vec![Span::raw("  "), Span::raw(label.as_str())])
            } else {
                Line::from(vec![
                    Span::styled(format!("{} ", symbol), Style::default().fg(color)),
                    Span::raw(label.as_str()),
                ])
            };
            ListItem::new(line).style(style)
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(theme.border_style())
            .title(" Tasks "),
    );
    let mut state = ListState::default().with_selected(Some(selected));
    frame.render_stateful_widget(list, area, &mut state);
}


/// Marker shown before a button: blank until the command has run once.
pub fn status_symbol(status: Option<&RunStatus>, theme: &Theme) -> (&'static str, Color) {
    match status {
        None => (" ", theme.button),
        Some(RunStatus::Running) => ("\u{25c9}", theme.running), // ◉
        Some(RunStatus::Succeeded) => ("\u{2714}", theme.success), // ✔
        Some(RunStatus::Failed { .. }) => ("\u{2716}", theme.failure), // ✖
        Some(RunStatus::RunnerError { .. }) => ("!", theme.failure),
    }
}


/// Width of the button column for the given labels, borders included.
pub fn panel_width(entries: &[String]) -> u16 {
    let longest = entries.iter().map(|e| e.chars().count()).max().unwrap_or(0);
    // marker + space + label + two borders
    u16::try_from(longest + 4).unwrap_or(u16::MAX).max(16)
}
