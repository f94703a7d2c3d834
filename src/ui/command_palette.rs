//! Command palette
//!
//! Single-line input for palette commands (`Ctrl+P`). Tab completes the
//! command name from [`completions`].

use crate::commands::completions;
use crate::ui::text_input::TextInput;
use crate::ui::theme::Theme;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

#[derive(Debug, PartialEq, Eq)]
pub enum PaletteAction {
    Submit(String),
    Dismissed,
    Consumed,
}

#[derive(Debug, Default)]
pub struct CommandPalette {
    input: TextInput,
    active: bool,
    /// Last error, shown until the next edit
    error: Option<String>,
}

impl CommandPalette {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn activate(&mut self) {
        self.active = true;
        self.input.clear();
        self.error = None;
    }

    pub fn deactivate(&mut self) {
        self.active = false;
        self.input.clear();
        self.error = None;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn input(&self) -> &str {
        self.input.value()
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub fn paste(&mut self, text: &str) {
        self.input.insert_str(text);
    }

    /// Completion candidates for the command name being typed
    pub fn suggestions(&self) -> Vec<&'static str> {
        let value = self.input.value();
        if value.contains(char::is_whitespace) {
            return Vec::new();
        }
        completions(value)
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> PaletteAction {
        match key.code {
            KeyCode::Esc => PaletteAction::Dismissed,
            KeyCode::Enter => {
                let value = self.input.value().trim().to_string();
                if value.is_empty() {
                    PaletteAction::Dismissed
                } else {
                    PaletteAction::Submit(value)
                }
            }
            KeyCode::Tab => {
                if let [only] = self.suggestions().as_slice() {
                    self.input.set(format!("{} ", only));
                }
                PaletteAction::Consumed
            }
            _ => {
                if self.input.handle_key(key) {
                    self.error = None;
                }
                PaletteAction::Consumed
            }
        }
    }

    /// Prompt line plus one line of suggestions or error
    pub fn render(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        if area.height == 0 || area.width < 4 {
            return;
        }
        let prompt = "> ";
        let field_width = (area.width as usize).saturating_sub(prompt.len());
        let visible = self.input.visible(field_width);
        frame.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled(prompt, theme.palette_prompt),
                Span::styled(visible.text, theme.palette_input),
            ])),
            Rect::new(area.x, area.y, area.width, 1),
        );
        let cursor_x = area.x + prompt.len() as u16 + visible.cursor_offset as u16;
        frame.set_cursor_position((cursor_x.min(area.x + area.width - 1), area.y));

        if area.height < 2 {
            return;
        }
        let line = match &self.error {
            Some(err) => Span::styled(err.clone(), theme.dialog_warning),
            None => Span::styled(self.suggestions().join("  "), theme.palette_suggestion),
        };
        frame.render_widget(
            Paragraph::new(line),
            Rect::new(area.x, area.y + 1, area.width, 1),
        );
    }
}
