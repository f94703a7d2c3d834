//! Pagination controller
//!
//! Holds the materialized row window of the relation shown in the data
//! panel and decides, for every arriving page, whether it replaces the
//! window or extends it. Sorting is always done by the server: changing the
//! sort reloads from offset 0.

use crate::db::provider::{PageRequest, SortDirection, SortSpec};
use crate::db::types::{CellValue, ColumnDef, PageData, Row};
use crate::filter::Filter;
use tracing::debug;

/// Rows from the end of the window at which the next page is requested
pub const LOOKAHEAD: usize = 10;

/// How an arriving page relates to the held window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageClass {
    /// Replace everything
    Initial,
    /// Append rows
    Incremental,
}

/// What [`Pagination::apply`] did with a page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    Replaced,
    Appended,
    /// Page was for a relation no longer displayed
    Stale,
    /// Incremental page that does not continue the window
    Dropped,
}

#[derive(Debug, Clone)]
pub struct Pagination {
    /// (schema, table) currently displayed
    current: Option<(String, String)>,
    pub columns: Vec<ColumnDef>,
    pub rows: Vec<Row>,
    pub total_rows: usize,
    /// Offset of the last applied page
    pub offset: usize,
    page_size: usize,
    sort_column: Option<String>,
    sort_direction: SortDirection,
    nulls_first: bool,
    filter: Option<Filter>,
    /// A page request is outstanding
    loading: bool,
    pub selected_row: usize,
    pub selected_col: usize,
}

impl Pagination {
    pub fn new(page_size: usize) -> Self {
        Self {
            current: None,
            columns: Vec::new(),
            rows: Vec::new(),
            total_rows: 0,
            offset: 0,
            page_size: page_size.max(1),
            sort_column: None,
            sort_direction: SortDirection::Asc,
            nulls_first: false,
            filter: None,
            loading: false,
            selected_row: 0,
            selected_col: 0,
        }
    }

    pub fn current_table(&self) -> Option<(&str, &str)> {
        self.current
            .as_ref()
            .map(|(s, t)| (s.as_str(), t.as_str()))
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }

    pub fn sort(&self) -> Option<SortSpec> {
        self.sort_column.as_ref().map(|column| SortSpec {
            column: column.clone(),
            direction: self.sort_direction,
            nulls_first: self.nulls_first,
        })
    }

    pub fn nulls_first(&self) -> bool {
        self.nulls_first
    }

    /// Switch to another relation: drop the window, sort and filter, and
    /// request its first page.
    pub fn open(&mut self, schema: &str, table: &str) -> PageRequest {
        self.current = Some((schema.to_string(), table.to_string()));
        self.columns.clear();
        self.rows.clear();
        self.total_rows = 0;
        self.offset = 0;
        self.sort_column = None;
        self.sort_direction = SortDirection::Asc;
        self.filter = None;
        self.selected_row = 0;
        self.selected_col = 0;
        self.request(0)
    }

    /// Forget the displayed relation (disconnect, object details view)
    pub fn close(&mut self) {
        *self = Self::new(self.page_size);
    }

    /// Request for the current relation at `offset`, carrying sort and filter
    fn request(&mut self, offset: usize) -> PageRequest {
        let (schema, table) = self.current.clone().unwrap_or_default();
        let mut request = PageRequest::new(schema, table, offset, self.page_size);
        request.sort = self.sort();
        request.filter = self.filter.as_ref().map(|f| f.compile(1));
        self.loading = true;
        request
    }

    /// Full reload from offset 0 with the current sort and filter
    pub fn reload(&mut self) -> Option<PageRequest> {
        self.current.as_ref()?;
        Some(self.request(0))
    }

    /// Apply (or clear) the filter and reload. The filter must target the
    /// displayed relation.
    pub fn set_filter(&mut self, filter: Option<Filter>) -> Option<PageRequest> {
        self.filter = filter;
        self.reload()
    }

    /// Classify a page against the held window
    pub fn classify(&self, page: &PageData) -> PageClass {
        if self.rows.is_empty() || page.offset == 0 || page.columns != self.columns {
            PageClass::Initial
        } else {
            PageClass::Incremental
        }
    }

    /// Whether `request` was issued for what is displayed now: same
    /// relation, sort and filter. Answers to superseded requests are ignored.
    pub fn is_current(&self, request: &PageRequest) -> bool {
        self.current_table() == Some((request.schema.as_str(), request.table.as_str()))
            && request.sort == self.sort()
            && request.filter == self.filter.as_ref().map(|f| f.compile(1))
    }

    /// Fold an arriving page into the window
    pub fn apply(&mut self, page: PageData) -> PageOutcome {
        if self.current_table() != Some((page.schema.as_str(), page.table.as_str())) {
            debug!(schema = %page.schema, table = %page.table, "discarding stale page");
            return PageOutcome::Stale;
        }
        self.loading = false;
        match self.classify(&page) {
            PageClass::Initial => {
                self.columns = page.columns;
                self.rows = page.rows;
                self.total_rows = page.total_rows;
                self.offset = page.offset;
                self.selected_row = 0;
                if self.selected_col >= self.columns.len() {
                    self.selected_col = 0;
                }
                PageOutcome::Replaced
            }
            PageClass::Incremental => {
                if page.offset != self.rows.len() {
                    debug!(
                        offset = page.offset,
                        held = self.rows.len(),
                        "dropping out-of-sequence page"
                    );
                    return PageOutcome::Dropped;
                }
                self.rows.extend(page.rows);
                self.total_rows = page.total_rows;
                self.offset = page.offset;
                PageOutcome::Appended
            }
        }
    }

    /// A failed load for the displayed relation clears the in-flight flag
    pub fn load_failed(&mut self, schema: &str, table: &str) {
        if self.current_table() == Some((schema, table)) {
            self.loading = false;
        }
    }

    /// Next page when the selection is within [`LOOKAHEAD`] of the end of
    /// the window and more rows exist
    pub fn prefetch(&mut self) -> Option<PageRequest> {
        let held = self.rows.len();
        if self.loading
            || self.current.is_none()
            || held >= self.total_rows
            || self.selected_row + LOOKAHEAD < held
        {
            return None;
        }
        Some(self.request(held))
    }

    /// `s`: no sort → ascending → descending → no sort, on the selected column
    pub fn cycle_sort(&mut self) -> Option<PageRequest> {
        let column = self.columns.get(self.selected_col)?.name.clone();
        match (&self.sort_column, self.sort_direction) {
            (Some(current), SortDirection::Asc) if *current == column => {
                self.sort_direction = SortDirection::Desc;
            }
            (Some(current), SortDirection::Desc) if *current == column => {
                self.sort_column = None;
                self.sort_direction = SortDirection::Asc;
            }
            _ => {
                self.sort_column = Some(column);
                self.sort_direction = SortDirection::Asc;
            }
        }
        self.reload()
    }

    /// `S`: toggle NULLS FIRST / NULLS LAST
    pub fn toggle_nulls_first(&mut self) -> Option<PageRequest> {
        self.nulls_first = !self.nulls_first;
        if self.sort_column.is_some() {
            self.reload()
        } else {
            None
        }
    }

    /// `r`: reverse the direction of the active sort
    pub fn reverse_sort(&mut self) -> Option<PageRequest> {
        self.sort_column.as_ref()?;
        self.sort_direction = self.sort_direction.reversed();
        self.reload()
    }

    pub fn move_down(&mut self) {
        if self.selected_row + 1 < self.rows.len() {
            self.selected_row += 1;
        }
    }

    pub fn move_up(&mut self) {
        self.selected_row = self.selected_row.saturating_sub(1);
    }

    pub fn move_left(&mut self) {
        self.selected_col = self.selected_col.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        if self.selected_col + 1 < self.columns.len() {
            self.selected_col += 1;
        }
    }

    pub fn page_down(&mut self, rows: usize) {
        self.selected_row = (self.selected_row + rows).min(self.rows.len().saturating_sub(1));
    }

    pub fn page_up(&mut self, rows: usize) {
        self.selected_row = self.selected_row.saturating_sub(rows);
    }

    pub fn go_to_top(&mut self) {
        self.selected_row = 0;
    }

    pub fn go_to_bottom(&mut self) {
        self.selected_row = self.rows.len().saturating_sub(1);
    }

    pub fn select_row(&mut self, row: usize) {
        if row < self.rows.len() {
            self.selected_row = row;
        }
    }

    pub fn selected_cell(&self) -> Option<(&ColumnDef, &CellValue)> {
        let column = self.columns.get(self.selected_col)?;
        let cell = self.rows.get(self.selected_row)?.values.get(self.selected_col)?;
        Some((column, cell))
    }
}
