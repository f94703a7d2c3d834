//! Navigation tree widget
//!
//! The cursor is kept as a [`NodeId`], not a row index, so it stays on the
//! same node when rows above it expand or collapse. Rows are recomputed from
//! [`NavigationTree::flatten`] on every use.

use crate::tree::{FlatNode, NavigationTree, NodeId, NodeKind};
use crate::ui::theme::Theme;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

const MARKER_EXPANDED: &str = "\u{25be} ";
const MARKER_COLLAPSED: &str = "\u{25b8} ";
const MARKER_LEAF: &str = "  ";

#[derive(Debug, Clone, Default)]
pub struct TreeView {
    selected: Option<NodeId>,
}

impl TreeView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<NodeId> {
        self.selected
    }

    pub fn select(&mut self, id: NodeId) {
        self.selected = Some(id);
    }

    /// Put the cursor on the first visible row (fresh tree)
    pub fn reset(&mut self, tree: &NavigationTree) {
        self.selected = tree.flatten().first().map(|f| f.id);
    }

    /// Row of the cursor among the visible rows
    pub fn selected_index(&self, rows: &[FlatNode]) -> Option<usize> {
        let selected = self.selected?;
        rows.iter().position(|f| f.id == selected)
    }

    /// Keep the cursor on a visible row: after a collapse hides it, move to
    /// its nearest visible ancestor
    pub fn ensure_visible(&mut self, tree: &NavigationTree) {
        let rows = tree.flatten();
        let Some(selected) = self.selected else {
            self.selected = rows.first().map(|f| f.id);
            return;
        };
        if rows.iter().any(|f| f.id == selected) {
            return;
        }
        self.selected = tree
            .ancestors(selected)
            .into_iter()
            .find(|a| rows.iter().any(|f| f.id == *a))
            .or_else(|| rows.first().map(|f| f.id));
    }

    /// Move the cursor by `delta` rows, clamped to the visible rows
    pub fn move_by(&mut self, tree: &NavigationTree, delta: isize) {
        let rows = tree.flatten();
        if rows.is_empty() {
            self.selected = None;
            return;
        }
        let current = self.selected_index(&rows).unwrap_or(0) as isize;
        let target = (current + delta).clamp(0, rows.len() as isize - 1) as usize;
        self.selected = Some(rows[target].id);
    }

    pub fn go_to_top(&mut self, tree: &NavigationTree) {
        self.selected = tree.flatten().first().map(|f| f.id);
    }

    pub fn go_to_bottom(&mut self, tree: &NavigationTree) {
        self.selected = tree.flatten().last().map(|f| f.id);
    }

    /// Select the visible row at `index`; false when there is none
    pub fn select_index(&mut self, tree: &NavigationTree, index: usize) -> bool {
        match tree.flatten().get(index) {
            Some(row) => {
                self.selected = Some(row.id);
                true
            }
            None => false,
        }
    }

    pub fn render(
        &self,
        frame: &mut Frame,
        area: Rect,
        tree: &NavigationTree,
        focused: bool,
        theme: &Theme,
    ) {
        if area.height == 0 || area.width == 0 {
            return;
        }
        let rows = tree.flatten();
        if rows.is_empty() {
            frame.render_widget(
                Paragraph::new("Not connected. Press Ctrl+O to connect.").style(theme.tree_loading),
                area,
            );
            return;
        }

        let height = area.height as usize;
        let selected_index = self.selected_index(&rows);
        let scroll = scroll_offset(selected_index.unwrap_or(0), height);

        let lines: Vec<Line> = rows
            .iter()
            .enumerate()
            .skip(scroll)
            .take(height)
            .filter_map(|(i, row)| {
                let node = tree.get(row.id)?;
                let marker = if node.expanded {
                    MARKER_EXPANDED
                } else if !node.children.is_empty() || !node.loaded {
                    MARKER_COLLAPSED
                } else {
                    MARKER_LEAF
                };
                let label_style = if focused && Some(i) == selected_index {
                    theme.tree_selected
                } else {
                    kind_style(node.kind, theme)
                };
                let mut spans = vec![
                    Span::raw("  ".repeat(row.depth)),
                    Span::styled(marker, theme.tree_marker),
                    Span::styled(node.label.clone(), label_style),
                ];
                if node.expanded && !node.loaded {
                    spans.push(Span::styled(" loading...", theme.tree_loading));
                }
                Some(Line::from(spans))
            })
            .collect();
        frame.render_widget(Paragraph::new(lines), area);
    }
}

/// First visible row when the cursor is at `selected` in a viewport of
/// `height` rows
pub fn scroll_offset(selected: usize, height: usize) -> usize {
    selected.saturating_sub(height.saturating_sub(1))
}

fn kind_style(kind: NodeKind, theme: &Theme) -> Style {
    match kind {
        NodeKind::Database => theme.tree_database,
        NodeKind::Schema => theme.tree_schema,
        NodeKind::ObjectGroup => theme.tree_group,
        NodeKind::Table | NodeKind::View | NodeKind::MaterializedView => theme.tree_table,
        NodeKind::Column => theme.tree_column,
        _ => theme.tree_object,
    }
}
