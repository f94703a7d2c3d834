//! Terminal UI components
//!
//! Widgets hold only view state and report what a key meant through small
//! action enums; the controller in [`crate::app`] decides what happens.

pub mod command_palette;
pub mod connection_dialog;
pub mod data_panel;
pub mod editor;
pub mod favorites_dialog;
pub mod filter_dialog;
pub mod help;
pub mod json_viewer;
pub mod layout;
pub mod render;
pub mod search_dialog;
pub mod text_input;
pub mod theme;
pub mod tree;
