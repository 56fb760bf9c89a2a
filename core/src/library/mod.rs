//! Commands and the scripts behind them.
//!
//! - [`registry`]: the ordered label → command mapping the panel is built from
//! - [`scripts`]: file-level access to the scripts directory

pub mod registry;
pub mod scripts;

pub use registry::{CommandRegistry, BUILTIN_COMMANDS};
pub use scripts::ScriptLibrary;
