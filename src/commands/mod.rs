//! Command palette commands
//!
//! Parsing lives here; the controller decides what each command does.

pub mod parser;

pub use parser::{COMMAND_NAMES, PaletteCommand, completions, parse_command};
