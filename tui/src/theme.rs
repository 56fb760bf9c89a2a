//! Color themes for the panel.
//!
//! Two presets, selected by the `theme` setting. Colors are ratatui colors so
//! they can be applied to widget styles directly.

use ratatui::style::{Color, Modifier, Style};

use upkeep_core::types::ThemeName;


/// Colors used by every part of the panel.
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub name: ThemeName,
    pub title_fg: Color,
    pub title_bg: Color,
    pub border: Color,
    pub button: Color,
    pub selected_fg: Color,
    pub selected_bg: Color,
    pub running: Color,
    pub success: Color,
    pub failure: Color,
    pub stdout: Color,
    pub stderr: Color,
    pub status: Color,
}


impl Theme {
    pub fn for_name(name: ThemeName) -> Self {
        match name {
            ThemeName::Light => Theme::light(),
            ThemeName::Dark => Theme::dark(),
        }
    }

    /// Light panel with a charcoal title bar.
    pub fn light() -> Self {
        Theme {
            name: ThemeName::Light,
            title_fg: Color::White,
            title_bg: Color::Rgb(45, 45, 45),
            border: Color::Gray,
            button: Color::Black,
            selected_fg: Color::White,
            selected_bg: Color::Blue,
            running: Color::Blue,
            success: Color::Green,
            failure: Color::Red,
            stdout: Color::Reset,
            stderr: Color::Red,
            status: Color::DarkGray,
        }
    }

    pub fn dark() -> Self {
        Theme {
            name: ThemeName::Dark,
            title_fg: Color::Black,
            title_bg: Color::Cyan,
            border: Color::DarkGray,
            button: Color::White,
            selected_fg: Color::Black,
            selected_bg: Color::Cyan,
            running: Color::LightCyan,
            success: Color::LightGreen,
            failure: Color::LightRed,
            stdout: Color::Reset,
            stderr: Color::LightRed,
            status: Color::Gray,
        }
    }

    pub fn title_style(&self) -> Style {
        Style::default()
            .fg(self.title_fg)
            .bg(self.title_bg)
            .add_modifier(Modifier::BOLD)
    }

    pub fn selected_style(&self) -> Style {
        Style::default().fg(self.selected_fg).bg(self.selected_bg)
    }

    pub fn border_style(&self) -> Style {
        Style::default().fg(self.border)
    }
}


impl Default for Theme {
    fn default() -> Self {
        Theme::for_name(ThemeName::default())
    }
}
