//! UI theme and styling
//!
//! Defines colors, styles, and visual appearance for all UI components.

use ratatui::style::{Color, Modifier, Style};

/// Application theme
#[derive(Debug, Clone)]
pub struct Theme {
    // Panel borders
    pub border_focused: Style,
    pub border_unfocused: Style,

    // Navigation tree
    pub tree_database: Style,
    pub tree_schema: Style,
    pub tree_group: Style,
    pub tree_table: Style,
    pub tree_object: Style,
    pub tree_column: Style,
    pub tree_marker: Style,
    pub tree_selected: Style,
    pub tree_loading: Style,

    // Query editor
    pub editor_text: Style,
    pub editor_gutter: Style,

    // Data panel
    pub tab_active: Style,
    pub tab_inactive: Style,
    pub results_header: Style,
    pub results_header_selected: Style,
    pub results_row_even: Style,
    pub results_row_odd: Style,
    pub results_selected: Style,
    pub results_null: Style,
    pub results_footer: Style,
    pub results_empty: Style,
    pub results_error_title: Style,
    pub results_error_text: Style,
    pub definition_text: Style,

    // Dialogs
    pub dialog_border: Style,
    pub dialog_label: Style,
    pub dialog_input: Style,
    pub dialog_input_focused: Style,
    pub dialog_selected: Style,
    pub dialog_hint: Style,
    pub dialog_warning: Style,

    // Command palette
    pub palette_prompt: Style,
    pub palette_input: Style,
    pub palette_suggestion: Style,

    // JSON viewer
    pub json_key: Style,
    pub json_string: Style,
    pub json_number: Style,
    pub json_literal: Style,

    // Error overlay
    pub overlay_error_border: Style,
    pub overlay_error_text: Style,

    // Help
    pub help_section: Style,
    pub help_key: Style,
    pub help_text: Style,

    // Status messages
    pub status_connection: Style,
    pub status_success: Style,
    pub status_error: Style,
    pub status_info: Style,
    pub status_warning: Style,
    pub status_hint: Style,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            // Borders
            border_focused: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            border_unfocused: Style::default().fg(Color::DarkGray),

            // Navigation tree
            tree_database: Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
            tree_schema: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            tree_group: Style::default().fg(Color::Yellow),
            tree_table: Style::default().fg(Color::Green),
            tree_object: Style::default().fg(Color::White),
            tree_column: Style::default().fg(Color::Gray),
            tree_marker: Style::default().fg(Color::DarkGray),
            tree_selected: Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            tree_loading: Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),

            // Query editor
            editor_text: Style::default().fg(Color::White),
            editor_gutter: Style::default().fg(Color::DarkGray),

            // Data panel
            tab_active: Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            tab_inactive: Style::default().fg(Color::Gray),
            results_header: Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
            results_header_selected: Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
            results_row_even: Style::default().fg(Color::White),
            results_row_odd: Style::default().fg(Color::Gray),
            results_selected: Style::default().fg(Color::Black).bg(Color::Yellow),
            results_null: Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
            results_footer: Style::default().fg(Color::DarkGray),
            results_empty: Style::default().fg(Color::DarkGray),
            results_error_title: Style::default()
                .fg(Color::Red)
                .add_modifier(Modifier::BOLD),
            results_error_text: Style::default().fg(Color::Red),
            definition_text: Style::default().fg(Color::White),

            // Dialogs
            dialog_border: Style::default().fg(Color::Cyan),
            dialog_label: Style::default().fg(Color::Cyan),
            dialog_input: Style::default().fg(Color::White),
            dialog_input_focused: Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
            dialog_selected: Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            dialog_hint: Style::default().fg(Color::DarkGray),
            dialog_warning: Style::default().fg(Color::Yellow),

            // Command palette
            palette_prompt: Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
            palette_input: Style::default().fg(Color::White),
            palette_suggestion: Style::default().fg(Color::DarkGray),

            // JSON viewer
            json_key: Style::default().fg(Color::Cyan),
            json_string: Style::default().fg(Color::Green),
            json_number: Style::default().fg(Color::Yellow),
            json_literal: Style::default().fg(Color::Magenta),

            // Error overlay
            overlay_error_border: Style::default()
                .fg(Color::Red)
                .add_modifier(Modifier::BOLD),
            overlay_error_text: Style::default().fg(Color::White),

            // Help
            help_section: Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
            help_key: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            help_text: Style::default().fg(Color::Gray),

            // Status messages
            status_connection: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            status_success: Style::default().fg(Color::Green),
            status_error: Style::default().fg(Color::Red),
            status_info: Style::default().fg(Color::Blue),
            status_warning: Style::default().fg(Color::Yellow),
            status_hint: Style::default().fg(Color::DarkGray),
        }
    }
}

impl Theme {
    /// Create a new theme with default colors
    pub fn new() -> Self {
        Self::default()
    }

    /// Get border style based on focus
    pub fn border_style(&self, focused: bool) -> Style {
        if focused {
            self.border_focused
        } else {
            self.border_unfocused
        }
    }
}
