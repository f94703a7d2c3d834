//! Cell viewer
//!
//! Modal showing the full content of the selected cell. JSON (and text that
//! parses as JSON) is pretty-printed and highlighted; anything else is shown
//! as plain text. Scrollable for large content.

use crate::db::types::{CellValue, ColumnDef};
use crate::ui::theme::Theme;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

#[derive(Debug, Default)]
pub struct JsonViewer {
    content: Option<String>,
    column_name: String,
    data_type: String,
    is_json: bool,
    scroll: usize,
    total_lines: usize,
}

impl JsonViewer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&mut self, column: &ColumnDef, cell: &CellValue) {
        let (content, is_json) = match cell.as_pretty_json() {
            Some(pretty) => (pretty, true),
            None => (cell.to_plain_string(), false),
        };
        self.total_lines = content.lines().count().max(1);
        self.content = Some(content);
        self.column_name = column.name.clone();
        self.data_type = column.data_type.display_name();
        self.is_json = is_json;
        self.scroll = 0;
    }

    pub fn hide(&mut self) {
        self.content = None;
        self.scroll = 0;
    }

    pub fn is_visible(&self) -> bool {
        self.content.is_some()
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    pub fn title(&self) -> String {
        format!(" {} ({}) ", self.column_name, self.data_type)
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }

    /// Scroll keys; returns false when the viewer should close
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        let last = self.total_lines.saturating_sub(1);
        match key.code {
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') => return false,
            KeyCode::Down | KeyCode::Char('j') => self.scroll = (self.scroll + 1).min(last),
            KeyCode::Up | KeyCode::Char('k') => self.scroll = self.scroll.saturating_sub(1),
            KeyCode::PageDown => self.scroll = (self.scroll + 20).min(last),
            KeyCode::PageUp => self.scroll = self.scroll.saturating_sub(20),
            KeyCode::Char('g') | KeyCode::Home => self.scroll = 0,
            KeyCode::Char('G') | KeyCode::End => self.scroll = last,
            _ => {}
        }
        true
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let Some(content) = &self.content else {
            return;
        };
        let lines: Vec<Line> = content
            .lines()
            .skip(self.scroll)
            .take(area.height as usize)
            .map(|line| {
                if self.is_json {
                    highlight_json_line(line, theme)
                } else {
                    Line::from(Span::styled(line.to_string(), theme.definition_text))
                }
            })
            .collect();
        frame.render_widget(Paragraph::new(lines), area);
    }
}

/// Color one line of pretty-printed JSON: keys, strings, numbers, literals
pub fn highlight_json_line<'a>(line: &str, theme: &Theme) -> Line<'a> {
    let mut spans = Vec::new();
    let chars: Vec<char> = line.chars().collect();
    let mut i = 0;
    let mut plain = String::new();
    while i < chars.len() {
        let c = chars[i];
        if c == '"' {
            let start = i;
            i += 1;
            while i < chars.len() && chars[i] != '"' {
                if chars[i] == '\\' {
                    i += 1;
                }
                i += 1;
            }
            i = (i + 1).min(chars.len());
            let text: String = chars[start..i].iter().collect();
            let is_key = chars[i..].iter().find(|c| !c.is_whitespace()) == Some(&':');
            flush(&mut plain, &mut spans, theme);
            let style = if is_key { theme.json_key } else { theme.json_string };
            spans.push(Span::styled(text, style));
            continue;
        }
        if c == '-' || c.is_ascii_digit() {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || "+-.".contains(chars[i])) {
                i += 1;
            }
            flush(&mut plain, &mut spans, theme);
            spans.push(Span::styled(
                chars[start..i].iter().collect::<String>(),
                theme.json_number,
            ));
            continue;
        }
        if c.is_ascii_alphabetic() {
            let start = i;
            while i < chars.len() && chars[i].is_ascii_alphabetic() {
                i += 1;
            }
            flush(&mut plain, &mut spans, theme);
            spans.push(Span::styled(
                chars[start..i].iter().collect::<String>(),
                theme.json_literal,
            ));
            continue;
        }
        plain.push(c);
        i += 1;
    }
    flush(&mut plain, &mut spans, theme);
    Line::from(spans)
}

fn flush(plain: &mut String, spans: &mut Vec<Span<'_>>, theme: &Theme) {
    if !plain.is_empty() {
        spans.push(Span::styled(std::mem::take(plain), theme.definition_text));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::types::DataType;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_json_cell_pretty_printed() {
        let mut viewer = JsonViewer::new();
        let cell = CellValue::Json(serde_json::json!({"a": 1, "b": [true, null]}));
        viewer.show(&ColumnDef::new("payload", DataType::Jsonb), &cell);
        assert!(viewer.is_visible());
        assert!(viewer.is_json);
        assert!(viewer.content().unwrap().contains("\n  \"a\": 1"));
        assert_eq!(viewer.title(), " payload (jsonb) ");
    }

    #[test]
    fn test_plain_text_cell() {
        let mut viewer = JsonViewer::new();
        viewer.show(
            &ColumnDef::new("note", DataType::Text),
            &CellValue::Text("not json".into()),
        );
        assert!(!viewer.is_json);
        assert_eq!(viewer.content(), Some("not json"));
    }

    #[test]
    fn test_scroll_clamped() {
        let mut viewer = JsonViewer::new();
        let cell = CellValue::Json(serde_json::json!([1, 2, 3]));
        viewer.show(&ColumnDef::new("xs", DataType::Json), &cell);
        // "[", three items, "]"
        viewer.handle_key(key(KeyCode::End));
        assert_eq!(viewer.scroll(), 4);
        viewer.handle_key(key(KeyCode::Down));
        assert_eq!(viewer.scroll(), 4);
        viewer.handle_key(key(KeyCode::Char('g')));
        assert_eq!(viewer.scroll(), 0);
    }

    #[test]
    fn test_close_keys() {
        let mut viewer = JsonViewer::new();
        assert!(!viewer.handle_key(key(KeyCode::Esc)));
        assert!(viewer.handle_key(key(KeyCode::Char('j'))));
    }

    #[test]
    fn test_highlight_splits_key_and_value() {
        let theme = Theme::default();
        let line = highlight_json_line("  \"id\": 42,", &theme);
        let texts: Vec<String> = line.spans.iter().map(|s| s.content.to_string()).collect();
        assert_eq!(texts, vec!["  ", "\"id\"", ": ", "42", ","]);
        assert_eq!(line.spans[1].style, theme.json_key);
        assert_eq!(line.spans[3].style, theme.json_number);
    }
}
