//! Query editor widget
//!
//! Multi-line SQL buffer. The cursor column is a byte offset on a char
//! boundary of the current line.

use crate::ui::theme::Theme;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

const INDENT: &str = "  ";

#[derive(Debug, Clone)]
pub struct QueryEditor {
    lines: Vec<String>,
    /// (line, byte column)
    cursor: (usize, usize),
}

impl QueryEditor {
    pub fn new() -> Self {
        Self {
            lines: vec![String::new()],
            cursor: (0, 0),
        }
    }

    /// Buffer text, lines joined with `\n`
    pub fn content(&self) -> String {
        self.lines.join("\n")
    }

    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|l| l.trim().is_empty())
    }

    /// Replace the buffer; the cursor moves to the end
    pub fn set_content(&mut self, content: impl AsRef<str>) {
        self.lines = content.as_ref().lines().map(str::to_string).collect();
        if self.lines.is_empty() {
            self.lines.push(String::new());
        }
        let last = self.lines.len() - 1;
        self.cursor = (last, self.lines[last].len());
    }

    pub fn clear(&mut self) {
        self.lines = vec![String::new()];
        self.cursor = (0, 0);
    }

    pub fn cursor(&self) -> (usize, usize) {
        self.cursor
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Insert text at the cursor, splitting on newlines
    pub fn insert_text(&mut self, text: &str) {
        let text = text.replace("\r\n", "\n").replace('\r', "\n");
        for (i, part) in text.split('\n').enumerate() {
            if i > 0 {
                self.newline();
            }
            let (row, col) = self.cursor;
            self.lines[row].insert_str(col, part);
            self.cursor.1 += part.len();
        }
    }

    fn newline(&mut self) {
        let (row, col) = self.cursor;
        let rest = self.lines[row].split_off(col);
        self.lines.insert(row + 1, rest);
        self.cursor = (row + 1, 0);
    }

    fn backspace(&mut self) {
        let (row, col) = self.cursor;
        if col > 0 {
            let line = &mut self.lines[row];
            let prev = line[..col]
                .char_indices()
                .next_back()
                .map(|(i, _)| i)
                .unwrap_or(0);
            line.drain(prev..col);
            self.cursor.1 = prev;
        } else if row > 0 {
            let current = self.lines.remove(row);
            let above = &mut self.lines[row - 1];
            let join_at = above.len();
            above.push_str(&current);
            self.cursor = (row - 1, join_at);
        }
    }

    fn delete(&mut self) {
        let (row, col) = self.cursor;
        if col < self.lines[row].len() {
            let line = &mut self.lines[row];
            let next = col + line[col..].chars().next().map(|c| c.len_utf8()).unwrap_or(0);
            line.drain(col..next);
        } else if row + 1 < self.lines.len() {
            let below = self.lines.remove(row + 1);
            self.lines[row].push_str(&below);
        }
    }

    fn move_left(&mut self) {
        let (row, col) = self.cursor;
        if col > 0 {
            self.cursor.1 = self.lines[row][..col]
                .char_indices()
                .next_back()
                .map(|(i, _)| i)
                .unwrap_or(0);
        } else if row > 0 {
            self.cursor = (row - 1, self.lines[row - 1].len());
        }
    }

    fn move_right(&mut self) {
        let (row, col) = self.cursor;
        let line = &self.lines[row];
        if col < line.len() {
            self.cursor.1 += line[col..].chars().next().map(|c| c.len_utf8()).unwrap_or(0);
        } else if row + 1 < self.lines.len() {
            self.cursor = (row + 1, 0);
        }
    }

    fn move_vertical(&mut self, down: bool) {
        let (row, col) = self.cursor;
        let target = if down {
            if row + 1 >= self.lines.len() {
                return;
            }
            row + 1
        } else {
            if row == 0 {
                return;
            }
            row - 1
        };
        let chars_before = self.lines[row][..col].chars().count();
        let line = &self.lines[target];
        let new_col = line
            .char_indices()
            .nth(chars_before)
            .map(|(i, _)| i)
            .unwrap_or(line.len());
        self.cursor = (target, new_col);
    }

    /// Apply an editing key. Returns false for keys the editor does not use.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL) || key.modifiers.contains(KeyModifiers::ALT)
        {
            return false;
        }
        match key.code {
            KeyCode::Char(c) => {
                let (row, col) = self.cursor;
                self.lines[row].insert(col, c);
                self.cursor.1 += c.len_utf8();
            }
            KeyCode::Enter => self.newline(),
            KeyCode::Tab => self.insert_text(INDENT),
            KeyCode::Backspace => self.backspace(),
            KeyCode::Delete => self.delete(),
            KeyCode::Left => self.move_left(),
            KeyCode::Right => self.move_right(),
            KeyCode::Up => self.move_vertical(false),
            KeyCode::Down => self.move_vertical(true),
            KeyCode::Home => self.cursor.1 = 0,
            KeyCode::End => self.cursor.1 = self.lines[self.cursor.0].len(),
            _ => return false,
        }
        true
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, focused: bool, theme: &Theme) {
        if area.height == 0 || area.width == 0 {
            return;
        }
        let height = area.height as usize;
        let scroll = self.cursor.0.saturating_sub(height.saturating_sub(1));
        let gutter = format!("{}", self.lines.len()).len().max(2);

        let lines: Vec<Line> = self
            .lines
            .iter()
            .enumerate()
            .skip(scroll)
            .take(height)
            .map(|(i, text)| {
                Line::from(vec![
                    Span::styled(format!("{:>gutter$} ", i + 1), theme.editor_gutter),
                    Span::styled(text.clone(), theme.editor_text),
                ])
            })
            .collect();
        frame.render_widget(Paragraph::new(lines), area);

        if focused {
            let (row, col) = self.cursor;
            let col_chars = self.lines[row][..col].chars().count() as u16;
            let x = area.x + gutter as u16 + 1 + col_chars;
            let y = area.y + (row - scroll) as u16;
            frame.set_cursor_position((x.min(area.x + area.width - 1), y));
        }
    }
}

impl Default for QueryEditor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_str(editor: &mut QueryEditor, s: &str) {
        for c in s.chars() {
            if c == '\n' {
                editor.handle_key(key(KeyCode::Enter));
            } else {
                editor.handle_key(key(KeyCode::Char(c)));
            }
        }
    }

    #[test]
    fn test_editor_new() {
        let editor = QueryEditor::new();
        assert_eq!(editor.content(), "");
        assert_eq!(editor.cursor(), (0, 0));
        assert!(editor.is_empty());
    }

    #[test]
    fn test_typing_multiline() {
        let mut editor = QueryEditor::new();
        type_str(&mut editor, "SELECT *\nFROM users");
        assert_eq!(editor.content(), "SELECT *\nFROM users");
        assert_eq!(editor.cursor(), (1, 10));
    }

    #[test]
    fn test_backspace_joins_lines() {
        let mut editor = QueryEditor::new();
        type_str(&mut editor, "ab\ncd");
        editor.handle_key(key(KeyCode::Home));
        editor.handle_key(key(KeyCode::Backspace));
        assert_eq!(editor.content(), "abcd");
        assert_eq!(editor.cursor(), (0, 2));
    }

    #[test]
    fn test_delete_at_end_joins_next_line() {
        let mut editor = QueryEditor::new();
        editor.set_content("ab\ncd");
        editor.handle_key(key(KeyCode::Up));
        editor.handle_key(key(KeyCode::End));
        editor.handle_key(key(KeyCode::Delete));
        assert_eq!(editor.content(), "abcd");
    }

    #[test]
    fn test_vertical_move_clamps_column() {
        let mut editor = QueryEditor::new();
        editor.set_content("a\nlonger line");
        editor.handle_key(key(KeyCode::Up));
        assert_eq!(editor.cursor(), (0, 1));
        editor.handle_key(key(KeyCode::Up));
        assert_eq!(editor.cursor(), (0, 1));
    }

    #[test]
    fn test_insert_text_splits_lines() {
        let mut editor = QueryEditor::new();
        editor.insert_text("SELECT 1;\r\nSELECT 2;");
        assert_eq!(editor.line_count(), 2);
        assert_eq!(editor.cursor(), (1, 9));
    }

    #[test]
    fn test_control_keys_ignored() {
        let mut editor = QueryEditor::new();
        assert!(!editor.handle_key(KeyEvent::new(KeyCode::Char('l'), KeyModifiers::CONTROL)));
        assert!(editor.is_empty());
    }

    #[test]
    fn test_multibyte_cursor_movement() {
        let mut editor = QueryEditor::new();
        type_str(&mut editor, "é1");
        editor.handle_key(key(KeyCode::Left));
        editor.handle_key(key(KeyCode::Left));
        assert_eq!(editor.cursor(), (0, 0));
        editor.handle_key(key(KeyCode::Right));
        assert_eq!(editor.cursor(), (0, 2));
    }
}
