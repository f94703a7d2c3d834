//! Table search prompt
//!
//! Asks for the text to look for in the text-like columns of the browsed
//! relation.

use crate::ui::text_input::TextInput;
use crate::ui::theme::Theme;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

#[derive(Debug, PartialEq, Eq)]
pub enum SearchAction {
    Search(String),
    Dismissed,
    Consumed,
}

#[derive(Debug, Default)]
pub struct SearchDialog {
    visible: bool,
    /// `schema.table` being searched
    target: String,
    input: TextInput,
}

impl SearchDialog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open for `schema.table`, prefilled with the previous needle
    pub fn show(&mut self, schema: &str, table: &str, previous: Option<&str>) {
        self.visible = true;
        self.target = format!("{}.{}", schema, table);
        self.input = TextInput::with_value(previous.unwrap_or_default());
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn paste(&mut self, text: &str) {
        self.input.insert_str(text);
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> SearchAction {
        match key.code {
            KeyCode::Esc => SearchAction::Dismissed,
            KeyCode::Enter => {
                let needle = self.input.value().trim();
                if needle.is_empty() {
                    SearchAction::Consumed
                } else {
                    SearchAction::Search(needle.to_string())
                }
            }
            _ => {
                self.input.handle_key(key);
                SearchAction::Consumed
            }
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        if area.height < 2 || area.width < 12 {
            return;
        }
        let x = area.x + 1;
        let width = area.width.saturating_sub(2);
        frame.render_widget(
            Paragraph::new(Span::styled(format!("Search {}", self.target), theme.dialog_label)),
            Rect::new(x, area.y, width, 1),
        );

        let prompt = "/ ";
        let visible = self
            .input
            .visible((width as usize).saturating_sub(prompt.len()));
        let y = area.y + 1;
        frame.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled(prompt, theme.dialog_label),
                Span::styled(visible.text, theme.dialog_input_focused),
            ])),
            Rect::new(x, y, width, 1),
        );
        let cursor_x = x + prompt.len() as u16 + visible.cursor_offset as u16;
        frame.set_cursor_position((cursor_x.min(x + width - 1), y));

        if area.height >= 3 {
            frame.render_widget(
                Paragraph::new(Span::styled("Enter=search  Esc=cancel", theme.dialog_hint)),
                Rect::new(x, area.y + area.height - 1, width, 1),
            );
        }
    }
}
