//! Connection dialog
//!
//! A modal for connecting to a server: URL and password fields, the list of
//! recently used connections and any servers found by discovery. Picking a
//! list entry fills the URL field for editing; Enter on a field connects.

use crate::config::ConnectionConfig;
use crate::executor::DiscoveredInstance;
use crate::store::RecentConnection;
use crate::ui::text_input::TextInput;
use crate::ui::theme::Theme;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Actions returned by the dialog to the parent
#[derive(Debug)]
pub enum DialogAction {
    /// User submitted a valid connection
    Connect(ConnectionConfig),
    /// User asked for a discovery scan
    Discover,
    /// User dismissed the dialog (Esc)
    Dismissed,
    /// Key was consumed by the dialog
    Consumed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DialogFocus {
    UrlInput,
    PasswordInput,
    RecentList,
    DiscoveredList,
}

pub struct ConnectionDialog {
    visible: bool,
    url: TextInput,
    password: TextInput,
    recent: Vec<RecentConnection>,
    discovered: Vec<DiscoveredInstance>,
    selected: usize,
    focus: DialogFocus,
    scanning: bool,
    error: Option<String>,
}

impl ConnectionDialog {
    pub fn new() -> Self {
        Self {
            visible: false,
            url: TextInput::new(),
            password: TextInput::new(),
            recent: Vec::new(),
            discovered: Vec::new(),
            selected: 0,
            focus: DialogFocus::UrlInput,
            scanning: false,
            error: None,
        }
    }

    pub fn show(&mut self) {
        self.visible = true;
        self.url.clear();
        self.password.clear();
        self.error = None;
        self.focus = DialogFocus::UrlInput;
        self.selected = 0;
    }

    pub fn hide(&mut self) {
        self.visible = false;
        self.url.clear();
        self.password.clear();
        self.error = None;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_recent(&mut self, recent: Vec<RecentConnection>) {
        self.recent = recent;
        if self.focus == DialogFocus::RecentList && self.recent.is_empty() {
            self.focus = DialogFocus::UrlInput;
        }
        self.selected = 0;
    }

    pub fn set_discovered(&mut self, discovered: Vec<DiscoveredInstance>) {
        self.scanning = false;
        self.discovered = discovered;
        if self.focus == DialogFocus::DiscoveredList && self.discovered.is_empty() {
            self.focus = DialogFocus::UrlInput;
        }
    }

    pub fn set_scanning(&mut self) {
        self.scanning = true;
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    /// Pasted text goes to the focused field
    pub fn paste(&mut self, text: &str) {
        match self.focus {
            DialogFocus::UrlInput => self.url.insert_str(text),
            DialogFocus::PasswordInput => self.password.insert_str(text),
            _ => {}
        }
    }

    fn focus_order(&self) -> Vec<DialogFocus> {
        let mut order = vec![DialogFocus::UrlInput, DialogFocus::PasswordInput];
        if !self.recent.is_empty() {
            order.push(DialogFocus::RecentList);
        }
        if !self.discovered.is_empty() {
            order.push(DialogFocus::DiscoveredList);
        }
        order
    }

    fn cycle_focus(&mut self, forward: bool) {
        let order = self.focus_order();
        let idx = order.iter().position(|f| *f == self.focus).unwrap_or(0);
        let next = if forward {
            (idx + 1) % order.len()
        } else {
            (idx + order.len() - 1) % order.len()
        };
        self.focus = order[next];
        self.selected = 0;
        self.error = None;
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> DialogAction {
        match key.code {
            KeyCode::Esc => return DialogAction::Dismissed,
            KeyCode::Tab if key.modifiers == KeyModifiers::NONE => {
                self.cycle_focus(true);
                return DialogAction::Consumed;
            }
            KeyCode::BackTab => {
                self.cycle_focus(false);
                return DialogAction::Consumed;
            }
            KeyCode::F(5) => {
                self.scanning = true;
                return DialogAction::Discover;
            }
            KeyCode::Enter => return self.handle_enter(),
            _ => {}
        }

        match self.focus {
            DialogFocus::UrlInput => {
                if self.url.handle_key(key) {
                    self.error = None;
                }
            }
            DialogFocus::PasswordInput => {
                if self.password.handle_key(key) {
                    self.error = None;
                }
            }
            DialogFocus::RecentList => self.move_selection(key, self.recent.len()),
            DialogFocus::DiscoveredList => self.move_selection(key, self.discovered.len()),
        }
        DialogAction::Consumed
    }

    fn move_selection(&mut self, key: KeyEvent, len: usize) {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < len {
                    self.selected += 1;
                }
            }
            _ => {}
        }
    }

    fn handle_enter(&mut self) -> DialogAction {
        match self.focus {
            DialogFocus::UrlInput | DialogFocus::PasswordInput => {
                if self.url.value().trim().is_empty() {
                    self.error = Some("URL is required".to_string());
                    return DialogAction::Consumed;
                }
                match ConnectionConfig::from_url(self.url.value()) {
                    Ok(mut config) => {
                        if !self.password.is_empty() {
                            config.password = Some(self.password.value().to_string());
                        }
                        DialogAction::Connect(config)
                    }
                    Err(e) => {
                        self.error = Some(e.to_string());
                        DialogAction::Consumed
                    }
                }
            }
            DialogFocus::RecentList => {
                if let Some(recent) = self.recent.get(self.selected) {
                    self.url.set(recent.to_config().to_url());
                    self.focus = DialogFocus::UrlInput;
                    self.error = None;
                }
                DialogAction::Consumed
            }
            DialogFocus::DiscoveredList => {
                if let Some(instance) = self.discovered.get(self.selected) {
                    self.url.set(format!(
                        "postgres://postgres@{}:{}/postgres",
                        instance.host, instance.port
                    ));
                    self.focus = DialogFocus::UrlInput;
                    self.error = None;
                }
                DialogAction::Consumed
            }
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        if area.height < 6 || area.width < 20 {
            return;
        }
        let x = area.x + 1;
        let width = area.width.saturating_sub(2);
        let bottom = area.y + area.height;
        let mut y = area.y;

        let masked = "*".repeat(self.password.value().chars().count());
        for (label, input, display, focus) in [
            ("  URL: ", &self.url, None, DialogFocus::UrlInput),
            (
                "  Password: ",
                &self.password,
                Some(masked.as_str()),
                DialogFocus::PasswordInput,
            ),
        ] {
            let focused = self.focus == focus;
            let field_width = (width as usize).saturating_sub(label.len());
            let visible = input.visible(field_width);
            let text = match display {
                Some(mask) => mask.chars().take(field_width).collect(),
                None => visible.text,
            };
            let style = if focused {
                theme.dialog_input_focused
            } else {
                theme.dialog_input
            };
            frame.render_widget(
                Paragraph::new(Line::from(vec![
                    Span::styled(label, theme.dialog_label),
                    Span::styled(text, style),
                ])),
                Rect::new(x, y, width, 1),
            );
            if focused {
                let cursor_x = x + label.len() as u16 + visible.cursor_offset as u16;
                frame.set_cursor_position((cursor_x.min(x + width - 1), y));
            }
            y += 1;
        }

        if let Some(err) = &self.error {
            let msg: String = err.chars().take(width.saturating_sub(2) as usize).collect();
            frame.render_widget(
                Paragraph::new(Span::styled(format!("  {}", msg), theme.dialog_warning)),
                Rect::new(x, y, width, 1),
            );
        }
        y += 2;

        let sections: [(&str, Vec<String>, DialogFocus); 2] = [
            (
                "Recent",
                self.recent
                    .iter()
                    .map(|r| format!("{}  ({} uses)", r.to_config().to_url(), r.usage_count))
                    .collect(),
                DialogFocus::RecentList,
            ),
            (
                if self.scanning {
                    "Discovered (scanning...)"
                } else {
                    "Discovered"
                },
                self.discovered.iter().map(|d| d.to_string()).collect(),
                DialogFocus::DiscoveredList,
            ),
        ];
        for (title, items, focus) in sections {
            if y + 2 >= bottom {
                break;
            }
            frame.render_widget(
                Paragraph::new(Span::styled(
                    format!("  \u{2500} {} {}", title, "\u{2500}".repeat(8)),
                    theme.dialog_label,
                )),
                Rect::new(x, y, width, 1),
            );
            y += 1;
            if items.is_empty() {
                frame.render_widget(
                    Paragraph::new(Span::styled("    (none)", theme.dialog_hint)),
                    Rect::new(x, y, width, 1),
                );
                y += 1;
                continue;
            }
            for (i, item) in items.iter().enumerate() {
                if y + 1 >= bottom {
                    break;
                }
                let selected = self.focus == focus && i == self.selected;
                let (prefix, style) = if selected {
                    ("  \u{25b8} ", theme.dialog_selected)
                } else {
                    ("    ", theme.dialog_input)
                };
                frame.render_widget(
                    Paragraph::new(Span::styled(format!("{}{}", prefix, item), style)),
                    Rect::new(x, y, width, 1),
                );
                y += 1;
            }
        }

        frame.render_widget(
            Paragraph::new(Span::styled(
                "  Enter=connect  Tab=next  F5=discover  Esc=cancel",
                theme.dialog_hint,
            )),
            Rect::new(x, bottom - 1, width, 1),
        );
    }
}

impl Default for ConnectionDialog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SslMode;
    use chrono::Utc;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_str(dialog: &mut ConnectionDialog, s: &str) {
        for c in s.chars() {
            dialog.handle_key(key(KeyCode::Char(c)));
        }
    }

    fn recent(host: &str) -> RecentConnection {
        RecentConnection {
            host: host.to_string(),
            port: 5432,
            database: "app".to_string(),
            user: "postgres".to_string(),
            ssl_mode: SslMode::Prefer,
            last_used: Utc::now(),
            usage_count: 3,
        }
    }

    #[test]
    fn test_dialog_show_hide() {
        let mut dialog = ConnectionDialog::new();
        assert!(!dialog.is_visible());
        dialog.show();
        assert!(dialog.is_visible());
        assert_eq!(dialog.focus, DialogFocus::UrlInput);
        dialog.hide();
        assert!(!dialog.is_visible());
    }

    #[test]
    fn test_tab_skips_empty_lists() {
        let mut dialog = ConnectionDialog::new();
        dialog.show();
        dialog.handle_key(key(KeyCode::Tab));
        assert_eq!(dialog.focus, DialogFocus::PasswordInput);
        dialog.handle_key(key(KeyCode::Tab));
        assert_eq!(dialog.focus, DialogFocus::UrlInput);
    }

    #[test]
    fn test_tab_includes_lists_when_populated() {
        let mut dialog = ConnectionDialog::new();
        dialog.show();
        dialog.set_recent(vec![recent("localhost")]);
        dialog.set_discovered(vec![DiscoveredInstance {
            host: "127.0.0.1".into(),
            port: 5433,
        }]);
        dialog.handle_key(key(KeyCode::Tab));
        dialog.handle_key(key(KeyCode::Tab));
        assert_eq!(dialog.focus, DialogFocus::RecentList);
        dialog.handle_key(key(KeyCode::Tab));
        assert_eq!(dialog.focus, DialogFocus::DiscoveredList);
        dialog.handle_key(KeyEvent::new(KeyCode::BackTab, KeyModifiers::SHIFT));
        assert_eq!(dialog.focus, DialogFocus::RecentList);
    }

    #[test]
    fn test_enter_parses_url_with_password_field() {
        let mut dialog = ConnectionDialog::new();
        dialog.show();
        type_str(&mut dialog, "postgres://user@localhost/mydb");
        dialog.handle_key(key(KeyCode::Tab));
        type_str(&mut dialog, "s3cret");
        match dialog.handle_key(key(KeyCode::Enter)) {
            DialogAction::Connect(config) => {
                assert_eq!(config.host, "localhost");
                assert_eq!(config.username, "user");
                assert_eq!(config.database, "mydb");
                assert_eq!(config.password.as_deref(), Some("s3cret"));
            }
            other => panic!("Expected Connect action, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_url_shows_error() {
        let mut dialog = ConnectionDialog::new();
        dialog.show();
        type_str(&mut dialog, "not-a-url");
        assert!(matches!(
            dialog.handle_key(key(KeyCode::Enter)),
            DialogAction::Consumed
        ));
        assert!(dialog.error.is_some());
    }

    #[test]
    fn test_empty_url_shows_error() {
        let mut dialog = ConnectionDialog::new();
        dialog.show();
        dialog.handle_key(key(KeyCode::Enter));
        assert_eq!(dialog.error.as_deref(), Some("URL is required"));
    }

    #[test]
    fn test_recent_entry_fills_url() {
        let mut dialog = ConnectionDialog::new();
        dialog.show();
        dialog.set_recent(vec![recent("db1"), recent("db2")]);
        dialog.focus = DialogFocus::RecentList;
        dialog.handle_key(key(KeyCode::Down));
        dialog.handle_key(key(KeyCode::Down));
        assert_eq!(dialog.selected, 1);
        dialog.handle_key(key(KeyCode::Enter));
        assert_eq!(dialog.url.value(), "postgres://postgres@db2:5432/app");
        assert_eq!(dialog.focus, DialogFocus::UrlInput);
    }

    #[test]
    fn test_f5_requests_discovery() {
        let mut dialog = ConnectionDialog::new();
        dialog.show();
        assert!(matches!(
            dialog.handle_key(key(KeyCode::F(5))),
            DialogAction::Discover
        ));
        assert!(dialog.scanning);
        dialog.set_discovered(Vec::new());
        assert!(!dialog.scanning);
    }

    #[test]
    fn test_esc_dismisses() {
        let mut dialog = ConnectionDialog::new();
        dialog.show();
        assert!(matches!(
            dialog.handle_key(key(KeyCode::Esc)),
            DialogAction::Dismissed
        ));
    }
}
