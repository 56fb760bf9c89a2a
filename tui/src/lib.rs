//! UpKeep panel: the interactive terminal front end.
//!
//! # Modules
//!
//! - [`app`]: key handling, selection, scroll and status state
//! - [`panel`]: the button column
//! - [`output_view`]: the scrolling output pane
//! - [`theme`]: light and dark color presets
//! - [`tui`]: terminal setup and the event loop

pub mod app;
pub mod output_view;
pub mod panel;
pub mod theme;
pub mod tui;
