//! Favorites dialog
//!
//! Lists saved queries. Enter loads the selected query into the editor,
//! `r` renames, `u` overwrites the query with the editor's content, `d` asks
//! for deletion and a second `d` confirms it.

use crate::store::Favorite;
use crate::ui::text_input::TextInput;
use crate::ui::theme::Theme;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

#[derive(Debug, PartialEq, Eq)]
pub enum FavoritesAction {
    /// Load this query into the editor
    Load(String),
    /// Delete the favorite with this id
    Delete(String),
    /// Store `query` under the new `name`
    Rename {
        id: String,
        name: String,
        query: String,
    },
    /// Replace the query with the editor's content, keeping the name
    Overwrite { id: String, name: String },
    Dismissed,
    Consumed,
}

#[derive(Debug, Default)]
pub struct FavoritesDialog {
    visible: bool,
    favorites: Vec<Favorite>,
    selected: usize,
    /// Id awaiting a confirming second `d`
    confirm_delete: Option<String>,
    /// New name being typed for the selected favorite
    rename: Option<TextInput>,
    loading: bool,
}

impl FavoritesDialog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open in the loading state; the list arrives with [`Self::set_favorites`]
    pub fn show(&mut self) {
        self.visible = true;
        self.loading = true;
        self.selected = 0;
        self.confirm_delete = None;
        self.rename = None;
    }

    pub fn hide(&mut self) {
        self.visible = false;
        self.confirm_delete = None;
        self.rename = None;
    }

    pub fn is_renaming(&self) -> bool {
        self.rename.is_some()
    }

    pub fn paste(&mut self, text: &str) {
        if let Some(input) = self.rename.as_mut() {
            input.insert_str(text);
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn favorites(&self) -> &[Favorite] {
        &self.favorites
    }

    pub fn set_favorites(&mut self, favorites: Vec<Favorite>) {
        self.favorites = favorites;
        self.loading = false;
        if self.selected >= self.favorites.len() {
            self.selected = self.favorites.len().saturating_sub(1);
        }
    }

    /// Drop a deleted favorite without reloading the list
    pub fn remove(&mut self, id: &str) {
        self.favorites.retain(|f| f.id != id);
        if self.selected >= self.favorites.len() {
            self.selected = self.favorites.len().saturating_sub(1);
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> FavoritesAction {
        if self.rename.is_some() {
            return self.handle_rename_key(key);
        }
        let pending_delete = self.confirm_delete.take();
        match key.code {
            KeyCode::Esc => FavoritesAction::Dismissed,
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < self.favorites.len() {
                    self.selected += 1;
                }
                FavoritesAction::Consumed
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
                FavoritesAction::Consumed
            }
            KeyCode::Enter => match self.favorites.get(self.selected) {
                Some(f) => FavoritesAction::Load(f.query.clone()),
                None => FavoritesAction::Consumed,
            },
            KeyCode::Char('d') => {
                let Some(f) = self.favorites.get(self.selected) else {
                    return FavoritesAction::Consumed;
                };
                if pending_delete.as_deref() == Some(f.id.as_str()) {
                    FavoritesAction::Delete(f.id.clone())
                } else {
                    self.confirm_delete = Some(f.id.clone());
                    FavoritesAction::Consumed
                }
            }
            KeyCode::Char('r') => {
                if let Some(f) = self.favorites.get(self.selected) {
                    self.rename = Some(TextInput::with_value(f.name.clone()));
                }
                FavoritesAction::Consumed
            }
            KeyCode::Char('u') => match self.favorites.get(self.selected) {
                Some(f) => FavoritesAction::Overwrite {
                    id: f.id.clone(),
                    name: f.name.clone(),
                },
                None => FavoritesAction::Consumed,
            },
            _ => FavoritesAction::Consumed,
        }
    }

    fn handle_rename_key(&mut self, key: KeyEvent) -> FavoritesAction {
        match key.code {
            KeyCode::Esc => {
                self.rename = None;
                FavoritesAction::Consumed
            }
            KeyCode::Enter => {
                let name = self
                    .rename
                    .as_ref()
                    .map(|input| input.value().trim().to_string())
                    .unwrap_or_default();
                let Some(f) = self.favorites.get(self.selected) else {
                    self.rename = None;
                    return FavoritesAction::Consumed;
                };
                if name.is_empty() {
                    return FavoritesAction::Consumed;
                }
                self.rename = None;
                FavoritesAction::Rename {
                    id: f.id.clone(),
                    name,
                    query: f.query.clone(),
                }
            }
            _ => {
                if let Some(input) = self.rename.as_mut() {
                    input.handle_key(key);
                }
                FavoritesAction::Consumed
            }
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        if area.height < 3 || area.width < 20 {
            return;
        }
        let x = area.x + 1;
        let width = area.width.saturating_sub(2);
        let bottom = area.y + area.height - 1;

        if self.loading {
            frame.render_widget(
                Paragraph::new(Span::styled("Loading...", theme.dialog_hint)),
                Rect::new(x, area.y, width, 1),
            );
        } else if self.favorites.is_empty() {
            frame.render_widget(
                Paragraph::new(Span::styled(
                    "No favorites yet. Use the palette: save <name>",
                    theme.dialog_hint,
                )),
                Rect::new(x, area.y, width, 1),
            );
        } else {
            // name list on top, preview of the selected query below
            let list_height = ((area.height as usize) / 2).max(1);
            let scroll = self.selected.saturating_sub(list_height.saturating_sub(1));
            for (row, (i, fav)) in self
                .favorites
                .iter()
                .enumerate()
                .skip(scroll)
                .take(list_height)
                .enumerate()
            {
                let style = if i == self.selected {
                    theme.dialog_selected
                } else {
                    theme.dialog_input
                };
                let db = fav
                    .database
                    .as_deref()
                    .map(|d| format!("  [{}]", d))
                    .unwrap_or_default();
                frame.render_widget(
                    Paragraph::new(Line::from(vec![
                        Span::styled(fav.name.clone(), style),
                        Span::styled(db, theme.dialog_hint),
                    ])),
                    Rect::new(x, area.y + row as u16, width, 1),
                );
            }
            if let Some(fav) = self.favorites.get(self.selected) {
                let preview_y = area.y + list_height as u16 + 1;
                if preview_y < bottom {
                    frame.render_widget(
                        Paragraph::new(fav.query.as_str()).style(theme.dialog_hint),
                        Rect::new(x, preview_y, width, bottom - preview_y),
                    );
                }
            }
        }

        if let Some(input) = &self.rename {
            let prompt = "Rename: ";
            let visible = input.visible((width as usize).saturating_sub(prompt.len()));
            frame.render_widget(
                Paragraph::new(Line::from(vec![
                    Span::styled(prompt, theme.dialog_label),
                    Span::styled(visible.text, theme.dialog_input_focused),
                ])),
                Rect::new(x, bottom, width, 1),
            );
            let cursor_x = x + prompt.len() as u16 + visible.cursor_offset as u16;
            frame.set_cursor_position((cursor_x.min(x + width - 1), bottom));
            return;
        }

        let hint = if self.confirm_delete.is_some() {
            Span::styled("Press d again to delete", theme.dialog_warning)
        } else {
            Span::styled(
                "Enter=load  r=rename  u=overwrite from editor  d=delete  Esc=close",
                theme.dialog_hint,
            )
        };
        frame.render_widget(Paragraph::new(hint), Rect::new(x, bottom, width, 1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn favorite(id: &str, name: &str, query: &str) -> Favorite {
        Favorite {
            id: id.to_string(),
            name: name.to_string(),
            query: query.to_string(),
            database: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn dialog() -> FavoritesDialog {
        let mut dialog = FavoritesDialog::new();
        dialog.show();
        dialog.set_favorites(vec![
            favorite("1", "active users", "SELECT * FROM users WHERE active"),
            favorite("2", "counts", "SELECT count(*) FROM orders"),
        ]);
        dialog
    }

    #[test]
    fn test_enter_loads_selected_query() {
        let mut dialog = dialog();
        dialog.handle_key(key(KeyCode::Char('j')));
        assert_eq!(
            dialog.handle_key(key(KeyCode::Enter)),
            FavoritesAction::Load("SELECT count(*) FROM orders".to_string())
        );
    }

    #[test]
    fn test_delete_needs_confirmation() {
        let mut dialog = dialog();
        assert_eq!(dialog.handle_key(key(KeyCode::Char('d'))), FavoritesAction::Consumed);
        assert_eq!(
            dialog.handle_key(key(KeyCode::Char('d'))),
            FavoritesAction::Delete("1".to_string())
        );
    }

    #[test]
    fn test_other_key_cancels_delete() {
        let mut dialog = dialog();
        dialog.handle_key(key(KeyCode::Char('d')));
        dialog.handle_key(key(KeyCode::Char('j')));
        dialog.handle_key(key(KeyCode::Char('k')));
        assert_eq!(dialog.handle_key(key(KeyCode::Char('d'))), FavoritesAction::Consumed);
    }

    #[test]
    fn test_remove_clamps_selection() {
        let mut dialog = dialog();
        dialog.handle_key(key(KeyCode::Down));
        dialog.remove("2");
        assert_eq!(dialog.favorites().len(), 1);
        assert_eq!(dialog.selected, 0);
    }

    #[test]
    fn test_rename_returns_new_name_with_query() {
        let mut dialog = dialog();
        dialog.handle_key(key(KeyCode::Char('r')));
        assert!(dialog.is_renaming());
        for _ in 0.."active users".len() {
            dialog.handle_key(key(KeyCode::Backspace));
        }
        dialog.paste("live users");
        assert_eq!(
            dialog.handle_key(key(KeyCode::Enter)),
            FavoritesAction::Rename {
                id: "1".to_string(),
                name: "live users".to_string(),
                query: "SELECT * FROM users WHERE active".to_string(),
            }
        );
        assert!(!dialog.is_renaming());
    }

    #[test]
    fn test_rename_escape_keeps_dialog_open() {
        let mut dialog = dialog();
        dialog.handle_key(key(KeyCode::Char('r')));
        assert_eq!(dialog.handle_key(key(KeyCode::Esc)), FavoritesAction::Consumed);
        assert!(!dialog.is_renaming());
        assert!(dialog.is_visible());
    }

    #[test]
    fn test_overwrite_targets_selection() {
        let mut dialog = dialog();
        dialog.handle_key(key(KeyCode::Down));
        assert_eq!(
            dialog.handle_key(key(KeyCode::Char('u'))),
            FavoritesAction::Overwrite {
                id: "2".to_string(),
                name: "counts".to_string(),
            }
        );
    }

    #[test]
    fn test_enter_on_empty_list() {
        let mut dialog = FavoritesDialog::new();
        dialog.show();
        dialog.set_favorites(Vec::new());
        assert_eq!(dialog.handle_key(key(KeyCode::Enter)), FavoritesAction::Consumed);
    }
}
