//! Single-line text field shared by the dialogs and the command palette
//!
//! The cursor is a byte offset that always sits on a char boundary.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInput {
    value: String,
    cursor: usize,
}

impl TextInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            cursor: value.len(),
            value,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn set(&mut self, value: impl Into<String>) {
        self.value = value.into();
        self.cursor = self.value.len();
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    /// Insert pasted text; newlines become spaces
    pub fn insert_str(&mut self, text: &str) {
        let text: String = text
            .chars()
            .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
            .collect();
        self.value.insert_str(self.cursor, &text);
        self.cursor += text.len();
    }

    fn prev_boundary(&self) -> usize {
        self.value[..self.cursor]
            .char_indices()
            .next_back()
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    fn next_boundary(&self) -> usize {
        self.cursor
            + self.value[self.cursor..]
                .chars()
                .next()
                .map(|c| c.len_utf8())
                .unwrap_or(0)
    }

    /// Apply an editing key. Returns true when the key was an editing key.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.value.drain(..self.cursor);
                self.cursor = 0;
            }
            KeyCode::Char(_) if key.modifiers.contains(KeyModifiers::CONTROL) => return false,
            KeyCode::Char(c) => {
                self.value.insert(self.cursor, c);
                self.cursor += c.len_utf8();
            }
            KeyCode::Backspace => {
                if self.cursor > 0 {
                    let prev = self.prev_boundary();
                    self.value.drain(prev..self.cursor);
                    self.cursor = prev;
                }
            }
            KeyCode::Delete => {
                if self.cursor < self.value.len() {
                    let next = self.next_boundary();
                    self.value.drain(self.cursor..next);
                }
            }
            KeyCode::Left => {
                if self.cursor > 0 {
                    self.cursor = self.prev_boundary();
                }
            }
            KeyCode::Right => {
                if self.cursor < self.value.len() {
                    self.cursor = self.next_boundary();
                }
            }
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.value.len(),
            _ => return false,
        }
        true
    }

    /// The part of the value that fits in `width` columns with the cursor
    /// kept in view
    pub fn visible(&self, width: usize) -> VisibleSlice {
        visible_slice(&self.value, self.cursor, width)
    }
}

/// A window onto a longer string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibleSlice {
    pub text: String,
    /// Cursor position within `text`, in chars
    pub cursor_offset: usize,
}

pub fn visible_slice(input: &str, cursor: usize, width: usize) -> VisibleSlice {
    let chars: Vec<char> = input.chars().collect();
    let cursor_chars = input[..cursor.min(input.len())].chars().count();
    if chars.len() <= width {
        return VisibleSlice {
            text: input.to_string(),
            cursor_offset: cursor_chars,
        };
    }
    let start = if cursor_chars > width.saturating_sub(1) {
        cursor_chars + 1 - width
    } else {
        0
    };
    let end = (start + width).min(chars.len());
    VisibleSlice {
        text: chars[start..end].iter().collect(),
        cursor_offset: cursor_chars - start,
    }
}
