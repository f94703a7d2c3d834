//! Filter dialog
//!
//! Edits the filter of the browsed relation as text, e.g.
//! `age > 30 and (name ilike '%ann%' or email is null)`. The text is parsed
//! against the relation's columns and validated before the dialog returns a
//! filter; failures are shown inline and keep the dialog open.

use crate::db::types::ColumnDef;
use crate::filter::{Filter, Operator, parse_filter};
use crate::ui::text_input::TextInput;
use crate::ui::theme::Theme;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

#[derive(Debug, PartialEq)]
pub enum FilterAction {
    /// Apply a validated filter; `None` clears it
    Apply(Option<Filter>),
    Dismissed,
    Consumed,
}

#[derive(Debug, Default)]
pub struct FilterDialog {
    visible: bool,
    schema: String,
    table: String,
    columns: Vec<ColumnDef>,
    input: TextInput,
    error: Option<String>,
}

impl FilterDialog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open for `schema.table`, prefilled with the active filter
    pub fn show(&mut self, schema: &str, table: &str, columns: &[ColumnDef], current: Option<&Filter>) {
        self.visible = true;
        self.schema = schema.to_string();
        self.table = table.to_string();
        self.columns = columns.to_vec();
        self.input = TextInput::with_value(current.map(|f| f.root.to_string()).unwrap_or_default());
        self.error = None;
    }

    pub fn hide(&mut self) {
        self.visible = false;
        self.error = None;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn paste(&mut self, text: &str) {
        self.input.insert_str(text);
    }

    /// Parse and validate filter text for the dialog's relation
    pub fn build(&self, text: &str) -> Result<Option<Filter>, String> {
        build_filter(&self.schema, &self.table, &self.columns, text)
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> FilterAction {
        match key.code {
            KeyCode::Esc => FilterAction::Dismissed,
            KeyCode::Enter => match self.build(self.input.value()) {
                Ok(filter) => FilterAction::Apply(filter),
                Err(message) => {
                    self.error = Some(message);
                    FilterAction::Consumed
                }
            },
            _ => {
                if self.input.handle_key(key) {
                    self.error = None;
                }
                FilterAction::Consumed
            }
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        if area.height < 4 || area.width < 20 {
            return;
        }
        let x = area.x + 1;
        let width = area.width.saturating_sub(2);
        let mut y = area.y;

        frame.render_widget(
            Paragraph::new(Span::styled(
                format!("Filter {}.{}", self.schema, self.table),
                theme.dialog_label,
            )),
            Rect::new(x, y, width, 1),
        );
        y += 1;

        let prompt = "where ";
        let visible = self
            .input
            .visible((width as usize).saturating_sub(prompt.len()));
        frame.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled(prompt, theme.dialog_label),
                Span::styled(visible.text, theme.dialog_input_focused),
            ])),
            Rect::new(x, y, width, 1),
        );
        let cursor_x = x + prompt.len() as u16 + visible.cursor_offset as u16;
        frame.set_cursor_position((cursor_x.min(x + width - 1), y));
        y += 1;

        if let Some(err) = &self.error {
            frame.render_widget(
                Paragraph::new(Span::styled(err.clone(), theme.dialog_warning)),
                Rect::new(x, y, width, 1),
            );
        }
        y += 2;

        let bottom = area.y + area.height - 1;
        for column in &self.columns {
            if y >= bottom {
                break;
            }
            let ops: Vec<&str> = Operator::available_for(&column.data_type)
                .into_iter()
                .map(Operator::label)
                .collect();
            frame.render_widget(
                Paragraph::new(Line::from(vec![
                    Span::styled(format!("{} ", column.name), theme.dialog_input),
                    Span::styled(
                        format!("{}  {}", column.data_type.display_name(), ops.join(" ")),
                        theme.dialog_hint,
                    ),
                ])),
                Rect::new(x, y, width, 1),
            );
            y += 1;
        }

        frame.render_widget(
            Paragraph::new(Span::styled(
                "Enter=apply (empty clears)  Esc=cancel",
                theme.dialog_hint,
            )),
            Rect::new(x, bottom, width, 1),
        );
    }
}

/// Parse and validate filter text for `schema.table`; empty text means no filter
pub fn build_filter(
    schema: &str,
    table: &str,
    columns: &[ColumnDef],
    text: &str,
) -> Result<Option<Filter>, String> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    let root = parse_filter(text, columns).map_err(|e| e.to_string())?;
    let filter = Filter::new(schema, table, root);
    filter.validate().map_err(|e| e.to_string())?;
    Ok(Some(filter))
}
