//! Help view: keybinding reference
//!
//! The controller owns the scroll offset; this module only builds and draws
//! the lines.

use crate::ui::theme::Theme;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Section title, or (keys, description)
enum Entry {
    Section(&'static str),
    Binding(&'static str, &'static str),
    Blank,
}

const ENTRIES: &[Entry] = &[
    Entry::Section("Global"),
    Entry::Binding("Ctrl+Q", "Quit"),
    Entry::Binding("Tab / Shift+Tab", "Cycle panel focus"),
    Entry::Binding("Ctrl+P", "Command palette"),
    Entry::Binding("Ctrl+O", "Connection dialog"),
    Entry::Binding("Ctrl+B", "Favorites"),
    Entry::Binding("F1 / ?", "Help"),
    Entry::Binding("Ctrl+T", "New result tab"),
    Entry::Binding("Ctrl+W", "Close result tab"),
    Entry::Binding("Ctrl+N", "Next result tab"),
    Entry::Binding("Ctrl+C", "Cancel running query"),
    Entry::Blank,
    Entry::Section("Tree"),
    Entry::Binding("j/k  \u{2191}/\u{2193}", "Navigate"),
    Entry::Binding("g / G", "Top / Bottom"),
    Entry::Binding("Enter", "Open data or definition / Toggle"),
    Entry::Binding("Space", "Toggle expand"),
    Entry::Binding("l  \u{2192}", "Expand / First child"),
    Entry::Binding("h  \u{2190}", "Collapse / Parent"),
    Entry::Binding("R", "Reload children"),
    Entry::Blank,
    Entry::Section("Data panel"),
    Entry::Binding("j/k  \u{2191}/\u{2193}", "Navigate rows"),
    Entry::Binding("h/l  \u{2190}/\u{2192}", "Navigate columns"),
    Entry::Binding("PgUp / PgDn", "Page up / down"),
    Entry::Binding("g / G", "First / Last row"),
    Entry::Binding("s", "Cycle sort on column"),
    Entry::Binding("r", "Reverse sort"),
    Entry::Binding("S", "Toggle NULLS FIRST"),
    Entry::Binding("f / F", "Edit / Clear filter"),
    Entry::Binding("/", "Search table"),
    Entry::Binding("Enter", "View cell"),
    Entry::Binding("v", "Switch table / results"),
    Entry::Binding("Esc", "Back to table"),
    Entry::Blank,
    Entry::Section("Editor"),
    Entry::Binding("F5 / Ctrl+Enter", "Execute query"),
    Entry::Binding("Ctrl+L", "Clear editor"),
    Entry::Binding("Ctrl+\u{2191}/\u{2193}", "Query history"),
    Entry::Blank,
    Entry::Section("Palette commands"),
    Entry::Binding("connect [url]", "Connect or open the dialog"),
    Entry::Binding("disconnect", "Close the connection"),
    Entry::Binding("refresh", "Reload the tree"),
    Entry::Binding("filter [expr]", "Filter the browsed table"),
    Entry::Binding("clearfilter", "Remove the filter"),
    Entry::Binding("search [text]", "Search the browsed table"),
    Entry::Binding("save <name>", "Save editor as favorite"),
    Entry::Binding("favorites", "Open favorites"),
    Entry::Binding("history", "Recall the last query"),
    Entry::Binding("discover", "Scan for local servers"),
];

/// Number of help lines
pub fn line_count() -> usize {
    ENTRIES.len()
}

pub fn build_lines(theme: &Theme) -> Vec<Line<'static>> {
    ENTRIES
        .iter()
        .map(|entry| match entry {
            Entry::Section(title) => Line::from(Span::styled(*title, theme.help_section)),
            Entry::Binding(keys, desc) => Line::from(vec![
                Span::styled(format!("  {:<20}", keys), theme.help_key),
                Span::styled(*desc, theme.help_text),
            ]),
            Entry::Blank => Line::from(""),
        })
        .collect()
}

pub fn render(frame: &mut Frame, area: Rect, scroll: usize, theme: &Theme) {
    if area.height == 0 {
        return;
    }
    let lines: Vec<Line> = build_lines(theme)
        .into_iter()
        .skip(scroll)
        .take(area.height as usize)
        .collect();
    frame.render_widget(Paragraph::new(lines), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_count_matches_content() {
        assert_eq!(build_lines(&Theme::default()).len(), line_count());
    }

    #[test]
    fn test_bindings_are_aligned() {
        let lines = build_lines(&Theme::default());
        let binding = &lines[1];
        assert_eq!(binding.spans[0].content.chars().count(), 22);
        assert_eq!(binding.spans[1].content, "Quit");
    }
}
