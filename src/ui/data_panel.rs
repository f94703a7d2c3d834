//! Data panel
//!
//! Shows one of: the paged rows of the browsed relation, an object
//! definition, search matches, or the active result tab. A one-line tab bar
//! on top names the current view and lists the result tabs.

use crate::app::{App, DataView};
use crate::app::tabs::QueryOutcome;
use crate::db::provider::{SortDirection, SortSpec};
use crate::db::types::{CellValue, ColumnDef, Row};
use crate::ui::theme::Theme;
use crate::ui::tree::scroll_offset;
use ratatui::prelude::*;
use ratatui::widgets::{Paragraph, Wrap};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const MIN_COL_WIDTH: u16 = 4;
const MAX_COL_WIDTH: u16 = 40;
/// Rows sampled when sizing columns
const WIDTH_SAMPLE: usize = 100;

/// What a grid needs to draw itself
pub struct Grid<'a> {
    pub columns: &'a [ColumnDef],
    pub rows: &'a [Row],
    pub selected_row: usize,
    pub selected_col: usize,
    pub sort: Option<SortSpec>,
    pub footer: String,
}

/// Rows of grid body visible in a data panel of `area` (inner, without borders)
pub fn visible_rows(area: Rect) -> usize {
    // tab bar, header, footer
    (area.height as usize).saturating_sub(3)
}

/// Grid row under screen row `y`, given the current selection
pub fn row_at(area: Rect, selected_row: usize, y: u16) -> Option<usize> {
    let first = area.y + 2;
    if y < first {
        return None;
    }
    let offset = (y - first) as usize;
    let height = visible_rows(area);
    if offset >= height {
        return None;
    }
    Some(scroll_offset(selected_row, height) + offset)
}

pub fn render(frame: &mut Frame, area: Rect, app: &App, focused: bool, theme: &Theme) {
    if area.height < 2 || area.width < 5 {
        return;
    }
    let bar = Rect::new(area.x, area.y, area.width, 1);
    let body = Rect::new(area.x, area.y + 1, area.width, area.height - 1);
    render_tab_bar(frame, bar, app, theme);

    match app.data_view {
        DataView::Browse => render_browse(frame, body, app, focused, theme),
        DataView::Definition => render_definition(frame, body, app, theme),
        DataView::Search => render_search(frame, body, app, focused, theme),
        DataView::Results => render_results(frame, body, app, focused, theme),
    }
}

fn render_tab_bar(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let primary = match app.data_view {
        DataView::Definition => app
            .details
            .as_ref()
            .map(|d| format!(" {} {}.{} ", d.target.kind.key(), d.target.schema, d.target.name))
            .unwrap_or_else(|| " Definition ".to_string()),
        DataView::Search => " Search ".to_string(),
        _ => match app.pagination.current_table() {
            Some((schema, table)) => format!(" {}.{} ", schema, table),
            None => " Browse ".to_string(),
        },
    };
    let primary_style = if app.data_view == DataView::Results {
        theme.tab_inactive
    } else {
        theme.tab_active
    };

    let mut spans = vec![Span::styled(primary, primary_style), Span::raw(" ")];
    for (i, tab) in app.tabs.tabs().iter().enumerate() {
        let running = if tab.is_running() { "*" } else { "" };
        let style = if app.data_view == DataView::Results && i == app.tabs.active_index() {
            theme.tab_active
        } else {
            theme.tab_inactive
        };
        spans.push(Span::styled(format!(" {}{} ", i + 1, running), style));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_browse(frame: &mut Frame, area: Rect, app: &App, focused: bool, theme: &Theme) {
    let p = &app.pagination;
    if p.current_table().is_none() {
        empty(frame, area, "Select a table or view in the tree and press Enter.", theme);
        return;
    }
    if p.columns.is_empty() {
        let msg = if p.is_loading() { "Loading..." } else { "No columns" };
        empty(frame, area, msg, theme);
        return;
    }
    let mut footer = format!(
        "Row {}/{} | {} of {} loaded",
        p.selected_row + 1,
        p.total_rows,
        p.rows.len(),
        p.total_rows
    );
    if let Some(filter) = p.filter() {
        footer.push_str(&format!(" | filter: {}", filter.root));
    }
    if p.is_loading() {
        footer.push_str(" | loading...");
    }
    render_grid(
        frame,
        area,
        &Grid {
            columns: &p.columns,
            rows: &p.rows,
            selected_row: p.selected_row,
            selected_col: p.selected_col,
            sort: p.sort(),
            footer,
        },
        focused,
        theme,
    );
}

fn render_definition(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    match app.details.as_ref() {
        Some(details) => match &details.text {
            Some(text) => {
                let p = Paragraph::new(text.as_str())
                    .style(theme.definition_text)
                    .scroll((details.scroll as u16, 0));
                frame.render_widget(p, area);
            }
            None => empty(frame, area, "Loading definition...", theme),
        },
        None => empty(frame, area, "No object selected", theme),
    }
}

fn render_search(frame: &mut Frame, area: Rect, app: &App, focused: bool, theme: &Theme) {
    let Some(search) = app.search.as_ref() else {
        empty(frame, area, "Press / to search the current table.", theme);
        return;
    };
    match &search.page {
        None => empty(
            frame,
            area,
            &format!("Searching for '{}'...", search.request.needle),
            theme,
        ),
        Some(page) if page.rows.is_empty() => empty(
            frame,
            area,
            &format!("No rows match '{}'", search.request.needle),
            theme,
        ),
        Some(page) => render_grid(
            frame,
            area,
            &Grid {
                columns: &page.columns,
                rows: &page.rows,
                selected_row: search.selected_row,
                selected_col: search.selected_col,
                sort: None,
                footer: format!(
                    "{} matches for '{}' in {}.{} (limit {})",
                    page.rows.len(),
                    search.request.needle,
                    search.request.schema,
                    search.request.table,
                    search.request.limit
                ),
            },
            focused,
            theme,
        ),
    }
}

fn render_results(frame: &mut Frame, area: Rect, app: &App, focused: bool, theme: &Theme) {
    let tab = app.tabs.active();
    if let Some(pending) = &tab.pending {
        empty(
            frame,
            area,
            &format!(
                "Running for {:.1}s... (Ctrl+C to cancel)",
                pending.started.elapsed().as_secs_f64()
            ),
            theme,
        );
        return;
    }
    match &tab.outcome {
        QueryOutcome::None => {
            empty(frame, area, "No results yet. Write a query and press F5 to execute.", theme)
        }
        QueryOutcome::Cancelled => empty(frame, area, "Query cancelled", theme),
        QueryOutcome::Errored(message) => {
            let lines = vec![
                Line::from(Span::styled("Query Error", theme.results_error_title)),
                Line::from(""),
                Line::from(Span::styled(message.as_str(), theme.results_error_text)),
            ];
            frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), area);
        }
        QueryOutcome::Completed(results) if results.columns.is_empty() => empty(
            frame,
            area,
            &format!(
                "OK, {} rows affected ({:.1}ms)",
                results.rows_affected,
                results.execution_time.as_secs_f64() * 1000.0
            ),
            theme,
        ),
        QueryOutcome::Completed(results) => render_grid(
            frame,
            area,
            &Grid {
                columns: &results.columns,
                rows: &results.rows,
                selected_row: tab.selected_row,
                selected_col: tab.selected_col,
                sort: None,
                footer: format!(
                    "Row {}/{} | Col {}/{} | {:.1}ms",
                    tab.selected_row + 1,
                    results.rows.len(),
                    tab.selected_col + 1,
                    results.columns.len(),
                    results.execution_time.as_secs_f64() * 1000.0,
                ),
            },
            focused,
            theme,
        ),
    }
}

fn empty(frame: &mut Frame, area: Rect, message: &str, theme: &Theme) {
    frame.render_widget(
        Paragraph::new(message.to_string())
            .style(theme.results_empty)
            .wrap(Wrap { trim: false }),
        area,
    );
}

/// Header, rows around the selection, and a footer line
pub fn render_grid(frame: &mut Frame, area: Rect, grid: &Grid, focused: bool, theme: &Theme) {
    if area.height < 3 || area.width < 5 {
        return;
    }
    let widths = compute_column_widths(grid.columns, grid.rows);
    let visible_height = (area.height as usize).saturating_sub(2);
    let scroll = scroll_offset(grid.selected_row, visible_height);
    let h_scroll = horizontal_offset(&widths, grid.selected_col, area.width);
    let right = area.x + area.width;

    let mut x = area.x;
    for (col_idx, col) in grid.columns.iter().enumerate().skip(h_scroll) {
        if x >= right {
            break;
        }
        let w = widths[col_idx].min(right - x);
        let mut name = col.name.clone();
        if let Some(sort) = &grid.sort
            && sort.column == col.name
        {
            name.push(match sort.direction {
                SortDirection::Asc => '\u{2191}',
                SortDirection::Desc => '\u{2193}',
            });
        }
        let style = if focused && col_idx == grid.selected_col {
            theme.results_header_selected
        } else {
            theme.results_header
        };
        frame.render_widget(
            Paragraph::new(pad(&truncate_str(&name, w as usize), w as usize)).style(style),
            Rect::new(x, area.y, w, 1),
        );
        x += w + 1;
    }

    for (vis_row, row_idx) in (scroll..grid.rows.len()).take(visible_height).enumerate() {
        let y = area.y + 1 + vis_row as u16;
        let row = &grid.rows[row_idx];
        let base = if row_idx % 2 == 0 {
            theme.results_row_even
        } else {
            theme.results_row_odd
        };
        let mut x = area.x;
        for (col_idx, cell) in row.values.iter().enumerate().skip(h_scroll) {
            if x >= right || col_idx >= widths.len() {
                break;
            }
            let w = widths[col_idx].min(right - x);
            let style = if focused && row_idx == grid.selected_row && col_idx == grid.selected_col
            {
                theme.results_selected
            } else if cell.is_null() {
                theme.results_null
            } else {
                base
            };
            let text = truncate_str(&cell_text(cell), w as usize);
            frame.render_widget(
                Paragraph::new(pad(&text, w as usize)).style(style),
                Rect::new(x, y, w, 1),
            );
            x += w + 1;
        }
    }

    frame.render_widget(
        Paragraph::new(grid.footer.clone()).style(theme.results_footer),
        Rect::new(area.x, area.y + area.height - 1, area.width, 1),
    );
}

/// Single-line rendering of a cell
fn cell_text(cell: &CellValue) -> String {
    cell.display_string(MAX_COL_WIDTH as usize * 2)
        .replace(['\n', '\r', '\t'], " ")
}

/// First column to draw so that the selected column fits in `width`
fn horizontal_offset(widths: &[u16], selected: usize, width: u16) -> usize {
    if selected >= widths.len() {
        return 0;
    }
    let mut start = selected;
    let mut total = widths[selected];
    while start > 0 {
        let prev = widths[start - 1] + 1;
        if total + prev > width {
            break;
        }
        total += prev;
        start -= 1;
    }
    start
}

/// Column widths from header names and a sample of the data
pub fn compute_column_widths(columns: &[ColumnDef], rows: &[Row]) -> Vec<u16> {
    let mut widths: Vec<u16> = columns
        .iter()
        .map(|c| c.name.width() as u16 + 2)
        .collect();

    for row in rows.iter().take(WIDTH_SAMPLE) {
        for (i, cell) in row.values.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                let cell_width = cell_text(cell).width().min(u16::MAX as usize) as u16 + 1;
                *w = (*w).max(cell_width);
            }
        }
    }

    for w in &mut widths {
        *w = (*w).clamp(MIN_COL_WIDTH, MAX_COL_WIDTH);
    }
    widths
}

/// Cut `s` to at most `max` display columns, marking the cut with "..."
pub fn truncate_str(s: &str, max: usize) -> String {
    if s.width() <= max {
        return s.to_string();
    }
    let budget = if max > 3 { max - 3 } else { max };
    let mut out = String::new();
    let mut used = 0;
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(c);
    }
    if max > 3 {
        out.push_str("...");
    }
    out
}

fn pad(s: &str, width: usize) -> String {
    let fill = width.saturating_sub(s.width());
    format!("{}{}", s, " ".repeat(fill))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::types::DataType;

    fn columns() -> Vec<ColumnDef> {
        vec![
            ColumnDef::new("id", DataType::Integer),
            ColumnDef::new("name", DataType::Text),
        ]
    }

    fn rows() -> Vec<Row> {
        vec![
            Row {
                values: vec![CellValue::Integer(1), CellValue::Text("Alice".to_string())],
            },
            Row {
                values: vec![CellValue::Integer(2), CellValue::Null],
            },
        ]
    }

    #[test]
    fn test_column_widths_use_header_and_data() {
        let widths = compute_column_widths(&columns(), &rows());
        assert_eq!(widths, vec![4, 6]);
    }

    #[test]
    fn test_column_widths_capped() {
        let long = vec![Row {
            values: vec![CellValue::Integer(1), CellValue::Text("x".repeat(200))],
        }];
        let widths = compute_column_widths(&columns(), &long);
        assert_eq!(widths[1], MAX_COL_WIDTH);
    }

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("hello", 10), "hello");
        assert_eq!(truncate_str("hello world", 8), "hello...");
        assert_eq!(truncate_str("hello", 2), "he");
    }

    #[test]
    fn test_truncate_wide_chars() {
        // each CJK char is two columns
        assert_eq!(truncate_str("\u{65e5}\u{672c}\u{8a9e}\u{6587}", 7), "\u{65e5}\u{672c}...");
    }

    #[test]
    fn test_horizontal_offset_keeps_selection_visible() {
        let widths = vec![10, 10, 10, 10];
        assert_eq!(horizontal_offset(&widths, 0, 25), 0);
        assert_eq!(horizontal_offset(&widths, 1, 25), 0);
        assert_eq!(horizontal_offset(&widths, 3, 25), 2);
    }

    #[test]
    fn test_row_at_maps_screen_rows() {
        let area = Rect::new(0, 10, 40, 13);
        assert_eq!(visible_rows(area), 10);
        assert_eq!(row_at(area, 0, 11), None);
        assert_eq!(row_at(area, 0, 12), Some(0));
        assert_eq!(row_at(area, 0, 15), Some(3));
        assert_eq!(row_at(area, 25, 12), Some(16));
        assert_eq!(row_at(area, 0, 22), None);
    }
}
