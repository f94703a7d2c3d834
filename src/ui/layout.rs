//! Panel layout management
//!
//! Splits the terminal into the tree, data panel, editor and status line.
//! The same layout is used for mouse hit-testing.

use crate::app::FocusArea;
use ratatui::layout::{Constraint, Direction, Layout, Rect};

const TREE_MIN_WIDTH: u16 = 24;
const TREE_MAX_WIDTH: u16 = 48;

/// Screen regions of the main view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppLayout {
    pub tree: Rect,
    pub data: Rect,
    pub editor: Rect,
    pub status: Rect,
}

impl AppLayout {
    /// The panel containing the cell at (`column`, `row`)
    pub fn region_at(&self, column: u16, row: u16) -> Option<FocusArea> {
        [
            (self.tree, FocusArea::TreeView),
            (self.data, FocusArea::DataPanel),
            (self.editor, FocusArea::QueryEditor),
        ]
        .into_iter()
        .find(|(rect, _)| contains(*rect, column, row))
        .map(|(_, area)| area)
    }

    pub fn area_of(&self, focus: FocusArea) -> Rect {
        match focus {
            FocusArea::TreeView => self.tree,
            FocusArea::DataPanel => self.data,
            FocusArea::QueryEditor => self.editor,
        }
    }
}

fn contains(rect: Rect, column: u16, row: u16) -> bool {
    column >= rect.x && column < rect.x + rect.width && row >= rect.y && row < rect.y + rect.height
}

/// Tree on the left; data panel above the editor on the right; one status
/// line at the bottom
pub fn calculate_layout(area: Rect) -> AppLayout {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(area);

    let tree_width = (area.width / 4).clamp(TREE_MIN_WIDTH, TREE_MAX_WIDTH).min(area.width);
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(tree_width), Constraint::Min(10)])
        .split(rows[0]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(columns[1]);

    AppLayout {
        tree: columns[0],
        data: right[0],
        editor: right[1],
        status: rows[1],
    }
}

/// Area inside a panel's border
pub fn panel_inner(rect: Rect) -> Rect {
    Rect::new(
        rect.x.saturating_add(1),
        rect.y.saturating_add(1),
        rect.width.saturating_sub(2),
        rect.height.saturating_sub(2),
    )
}

/// A rectangle of `width` x `height` centered in `area`, clamped to it
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}
