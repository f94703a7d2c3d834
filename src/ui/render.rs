//! Top-level render function
//!
//! Draws the three panels and the status line, then whichever modal layer
//! is open on top.

use crate::app::{App, FocusArea, StatusLevel, ViewMode};
use crate::ui::layout::{calculate_layout, centered_rect};
use crate::ui::theme::Theme;
use crate::ui::{data_panel, help};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

/// Render the entire application
pub fn render(frame: &mut Frame, app: &App) {
    let theme = Theme::new();
    let layout = calculate_layout(frame.area());

    // Tree
    let focused = app.focus == FocusArea::TreeView;
    let title = match app.tree.database_name() {
        Some(db) => format!(" {} ", db),
        None => " Schema ".to_string(),
    };
    let tree_block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(theme.border_style(focused));
    let tree_inner = tree_block.inner(layout.tree);
    frame.render_widget(tree_block, layout.tree);
    app.tree_view
        .render(frame, tree_inner, &app.tree, focused, &theme);

    // Data panel
    let focused = app.focus == FocusArea::DataPanel;
    let data_block = Block::default()
        .borders(Borders::ALL)
        .title(" Data ")
        .border_style(theme.border_style(focused));
    let data_inner = data_block.inner(layout.data);
    frame.render_widget(data_block, layout.data);
    data_panel::render(frame, data_inner, app, focused, &theme);

    // Editor
    let focused = app.focus == FocusArea::QueryEditor && !app.has_overlay();
    let editor_block = Block::default()
        .borders(Borders::ALL)
        .title(" Query ")
        .border_style(theme.border_style(app.focus == FocusArea::QueryEditor));
    let editor_inner = editor_block.inner(layout.editor);
    frame.render_widget(editor_block, layout.editor);
    app.editor.render(frame, editor_inner, focused, &theme);

    render_status_line(frame, layout.status, app, &theme);
    render_overlays(frame, app, &theme);
}

fn render_status_line(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let conn_info = match &app.connection {
        Some(active) => format!("[{}] ", active.config.name),
        None => "[disconnected] ".to_string(),
    };
    let mut spans = vec![Span::styled(conn_info, theme.status_connection)];
    match &app.status {
        Some(status) => {
            let style = match status.level {
                StatusLevel::Info => theme.status_info,
                StatusLevel::Success => theme.status_success,
                StatusLevel::Warning => theme.status_warning,
                StatusLevel::Error => theme.status_error,
            };
            spans.push(Span::styled(status.message.clone(), style));
        }
        None => spans.push(Span::styled(
            "Ctrl+P commands | F1 help | Ctrl+Q quit",
            theme.status_hint,
        )),
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Framed, cleared box for a modal layer; returns its inner area
fn modal(frame: &mut Frame, area: Rect, title: &str, border: Style) -> Rect {
    frame.render_widget(Clear, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title.to_string())
        .border_style(border);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    inner
}

fn render_overlays(frame: &mut Frame, app: &App, theme: &Theme) {
    let screen = frame.area();

    if app.view_mode == ViewMode::Help {
        let area = centered_rect(64, screen.height.saturating_sub(4), screen);
        let inner = modal(frame, area, " Help (Esc to close) ", theme.dialog_border);
        help::render(frame, inner, app.help_scroll, theme);
    }

    if app.json_viewer.is_visible() {
        let area = centered_rect(
            screen.width.saturating_sub(10),
            screen.height.saturating_sub(6),
            screen,
        );
        let inner = modal(frame, area, &app.json_viewer.title(), theme.dialog_border);
        app.json_viewer.render(frame, inner, theme);
    }

    if app.favorites_dialog.is_visible() {
        let area = centered_rect(70, 20, screen);
        let inner = modal(frame, area, " Favorites ", theme.dialog_border);
        app.favorites_dialog.render(frame, inner, theme);
    }

    if app.filter_dialog.is_visible() {
        let area = centered_rect(70, 8, screen);
        let inner = modal(frame, area, " Filter ", theme.dialog_border);
        app.filter_dialog.render(frame, inner, theme);
    }

    if app.search_dialog.is_visible() {
        let area = centered_rect(60, 5, screen);
        let inner = modal(frame, area, " Search ", theme.dialog_border);
        app.search_dialog.render(frame, inner, theme);
    }

    if app.connection_dialog.is_visible() {
        let area = centered_rect(72, 22, screen);
        let inner = modal(frame, area, " Connect ", theme.dialog_border);
        app.connection_dialog.render(frame, inner, theme);
    }

    if app.command_palette.is_active() {
        let width = screen.width.saturating_sub(4).min(80);
        let area = Rect::new(
            screen.x + (screen.width.saturating_sub(width)) / 2,
            screen.y + 2,
            width,
            4.min(screen.height),
        );
        let inner = modal(frame, area, " Command ", theme.dialog_border);
        app.command_palette.render(frame, inner, theme);
    }

    // errors stay on top of everything
    if let Some(error) = &app.error {
        let area = centered_rect(64, 10, screen);
        let title = format!(" {} ", error.title);
        let inner = modal(frame, area, &title, theme.overlay_error_border);
        let text = vec![
            Line::from(Span::styled(error.message.clone(), theme.overlay_error_text)),
            Line::from(""),
            Line::from(Span::styled("Esc/Enter to dismiss", theme.dialog_hint)),
        ];
        frame.render_widget(Paragraph::new(text).wrap(Wrap { trim: false }), inner);
    }
}
