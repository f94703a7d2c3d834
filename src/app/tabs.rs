//! Result tabs and their cancellable queries

use crate::db::QueryResults;
use crate::error::{DbError, DbResult};
use crate::executor::QueryToken;
use std::time::{Duration, Instant};

/// The in-flight query of a tab
#[derive(Debug, Clone)]
pub struct PendingQuery {
    pub sql: String,
    pub started: Instant,
    pub token: QueryToken,
}

#[derive(Debug, Clone, Default)]
pub enum QueryOutcome {
    #[default]
    None,
    Completed(QueryResults),
    Cancelled,
    Errored(String),
}

#[derive(Debug, Clone)]
pub struct ResultTab {
    /// Stable identifier (monotonically increasing, never reused)
    pub id: usize,
    pub pending: Option<PendingQuery>,
    pub outcome: QueryOutcome,
    /// SQL of the last resolved query
    pub last_sql: Option<String>,
    pub selected_row: usize,
    pub selected_col: usize,
}

impl ResultTab {
    fn new(id: usize) -> Self {
        Self {
            id,
            pending: None,
            outcome: QueryOutcome::None,
            last_sql: None,
            selected_row: 0,
            selected_col: 0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.pending.is_some()
    }

    pub fn results(&self) -> Option<&QueryResults> {
        match &self.outcome {
            QueryOutcome::Completed(results) => Some(results),
            _ => None,
        }
    }

    pub fn move_down(&mut self) {
        if let Some(results) = self.results()
            && self.selected_row + 1 < results.rows.len()
        {
            self.selected_row += 1;
        }
    }

    pub fn move_up(&mut self) {
        self.selected_row = self.selected_row.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        if let Some(results) = self.results()
            && self.selected_col + 1 < results.columns.len()
        {
            self.selected_col += 1;
        }
    }

    pub fn move_left(&mut self) {
        self.selected_col = self.selected_col.saturating_sub(1);
    }

    pub fn go_to_top(&mut self) {
        self.selected_row = 0;
    }

    pub fn go_to_bottom(&mut self) {
        if let Some(results) = self.results() {
            self.selected_row = results.rows.len().saturating_sub(1);
        }
    }
}

/// A query that finished for the query the tab was waiting on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub sql: String,
    pub elapsed: Duration,
    pub rows_affected: u64,
    pub error: Option<String>,
}

/// Why a tab was not closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseRefused {
    QueryRunning,
    LastTab,
}

#[derive(Debug, Clone)]
pub struct TabSet {
    tabs: Vec<ResultTab>,
    active: usize,
    next_id: usize,
    max_tabs: usize,
}

impl TabSet {
    pub fn new(max_tabs: usize) -> Self {
        Self {
            tabs: vec![ResultTab::new(0)],
            active: 0,
            next_id: 1,
            max_tabs: max_tabs.max(1),
        }
    }

    pub fn tabs(&self) -> &[ResultTab] {
        &self.tabs
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn max_tabs(&self) -> usize {
        self.max_tabs
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active(&self) -> &ResultTab {
        &self.tabs[self.active]
    }

    pub fn active_mut(&mut self) -> &mut ResultTab {
        &mut self.tabs[self.active]
    }

    pub fn get(&self, id: usize) -> Option<&ResultTab> {
        self.tabs.iter().find(|t| t.id == id)
    }

    fn get_mut(&mut self, id: usize) -> Option<&mut ResultTab> {
        self.tabs.iter_mut().find(|t| t.id == id)
    }

    pub fn any_running(&self) -> bool {
        self.tabs.iter().any(ResultTab::is_running)
    }

    /// Open a new tab and switch to it. Returns false if at capacity.
    pub fn new_tab(&mut self) -> bool {
        if self.tabs.len() >= self.max_tabs {
            return false;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.tabs.push(ResultTab::new(id));
        self.active = self.tabs.len() - 1;
        true
    }

    /// Close the active tab unless it is running a query or is the last one
    pub fn close_active(&mut self) -> Result<(), CloseRefused> {
        if self.active().is_running() {
            return Err(CloseRefused::QueryRunning);
        }
        if self.tabs.len() <= 1 {
            return Err(CloseRefused::LastTab);
        }
        self.tabs.remove(self.active);
        if self.active >= self.tabs.len() {
            self.active = self.tabs.len() - 1;
        }
        Ok(())
    }

    pub fn next_tab(&mut self) {
        if self.tabs.len() > 1 {
            self.active = (self.active + 1) % self.tabs.len();
        }
    }

    pub fn prev_tab(&mut self) {
        if self.tabs.len() > 1 {
            self.active = (self.active + self.tabs.len() - 1) % self.tabs.len();
        }
    }

    /// Start `sql` on tab `id`. A query already running there is cancelled
    /// first; its token is returned.
    pub fn begin(&mut self, id: usize, sql: String, token: QueryToken) -> Option<QueryToken> {
        let tab = self.get_mut(id)?;
        let superseded = tab.pending.take().map(|p| {
            p.token.cancel.cancel();
            p.token
        });
        tab.pending = Some(PendingQuery {
            sql,
            started: Instant::now(),
            token,
        });
        superseded
    }

    /// Cancel the query running on tab `id`. The tab is marked cancelled and
    /// forgets the token, so the late result is discarded.
    pub fn cancel(&mut self, id: usize) -> bool {
        let Some(tab) = self.get_mut(id) else {
            return false;
        };
        match tab.pending.take() {
            Some(pending) => {
                pending.token.cancel.cancel();
                tab.last_sql = Some(pending.sql);
                tab.outcome = QueryOutcome::Cancelled;
                true
            }
            None => false,
        }
    }

    /// Cancel every running query (disconnect, shutdown)
    pub fn cancel_all(&mut self) {
        let ids: Vec<usize> = self.tabs.iter().map(|t| t.id).collect();
        for id in ids {
            self.cancel(id);
        }
    }

    /// Apply a query result. Returns `None` when the result belongs to a
    /// token the tab no longer waits on (cancelled or superseded), or when
    /// it is a cancellation.
    pub fn resolve(
        &mut self,
        id: usize,
        token_id: u64,
        result: DbResult<QueryResults>,
    ) -> Option<Resolved> {
        let tab = self.get_mut(id)?;
        if tab.pending.as_ref().map(|p| p.token.id) != Some(token_id) {
            return None;
        }
        let pending = tab.pending.take()?;
        tab.last_sql = Some(pending.sql.clone());
        tab.selected_row = 0;
        tab.selected_col = 0;
        let elapsed = pending.started.elapsed();
        match result {
            Ok(results) => {
                let rows_affected = results.rows_affected;
                tab.outcome = QueryOutcome::Completed(results);
                Some(Resolved {
                    sql: pending.sql,
                    elapsed,
                    rows_affected,
                    error: None,
                })
            }
            Err(DbError::Cancelled) => {
                tab.outcome = QueryOutcome::Cancelled;
                None
            }
            Err(e) => {
                let message = e.to_string();
                tab.outcome = QueryOutcome::Errored(message.clone());
                Some(Resolved {
                    sql: pending.sql,
                    elapsed,
                    rows_affected: 0,
                    error: Some(message),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results(rows: u64) -> QueryResults {
        QueryResults::new(vec![], vec![], Duration::from_millis(3), rows)
    }

    #[test]
    fn test_new_tab_respects_capacity() {
        let mut tabs = TabSet::new(2);
        assert!(tabs.new_tab());
        assert!(!tabs.new_tab());
        assert_eq!(tabs.len(), 2);
        assert_eq!(tabs.active().id, 1);
    }

    #[test]
    fn test_close_last_tab_refused() {
        let mut tabs = TabSet::new(5);
        assert_eq!(tabs.close_active(), Err(CloseRefused::LastTab));
    }

    #[test]
    fn test_close_running_tab_refused() {
        let mut tabs = TabSet::new(5);
        tabs.new_tab();
        tabs.begin(1, "SELECT 1".into(), QueryToken::new(1));
        assert_eq!(tabs.close_active(), Err(CloseRefused::QueryRunning));
        tabs.resolve(1, 1, Ok(results(1)));
        assert_eq!(tabs.close_active(), Ok(()));
        assert_eq!(tabs.active().id, 0);
    }

    #[test]
    fn test_new_query_supersedes_running_one() {
        let mut tabs = TabSet::new(5);
        let first = QueryToken::new(1);
        assert!(tabs.begin(0, "SELECT 1".into(), first.clone()).is_none());
        let superseded = tabs.begin(0, "SELECT 2".into(), QueryToken::new(2));
        assert_eq!(superseded.map(|t| t.id), Some(1));
        assert!(first.cancel.is_cancelled());

        // Late result of the first query is discarded
        assert!(tabs.resolve(0, 1, Ok(results(1))).is_none());
        assert!(tabs.active().is_running());

        let resolved = tabs.resolve(0, 2, Ok(results(4))).unwrap();
        assert_eq!(resolved.sql, "SELECT 2");
        assert_eq!(resolved.rows_affected, 4);
        assert!(!tabs.active().is_running());
    }

    #[test]
    fn test_cancel_discards_late_result() {
        let mut tabs = TabSet::new(5);
        let token = QueryToken::new(9);
        tabs.begin(0, "SELECT pg_sleep(60)".into(), token.clone());
        assert!(tabs.cancel(0));
        assert!(token.cancel.is_cancelled());
        assert!(matches!(tabs.active().outcome, QueryOutcome::Cancelled));

        assert!(tabs.resolve(0, 9, Err(DbError::Cancelled)).is_none());
        assert!(tabs.resolve(0, 9, Ok(results(1))).is_none());
        assert!(matches!(tabs.active().outcome, QueryOutcome::Cancelled));
    }

    #[test]
    fn test_error_result_recorded() {
        let mut tabs = TabSet::new(5);
        tabs.begin(0, "SELEC 1".into(), QueryToken::new(1));
        let resolved = tabs
            .resolve(
                0,
                1,
                Err(DbError::QueryFailed("syntax error at or near \"SELEC\"".into())),
            )
            .unwrap();
        assert_eq!(
            resolved.error.as_deref(),
            Some("syntax error at or near \"SELEC\"")
        );
        assert!(matches!(tabs.active().outcome, QueryOutcome::Errored(_)));
    }

    #[test]
    fn test_next_and_prev_wrap() {
        let mut tabs = TabSet::new(3);
        tabs.new_tab();
        tabs.new_tab();
        assert_eq!(tabs.active_index(), 2);
        tabs.next_tab();
        assert_eq!(tabs.active_index(), 0);
        tabs.prev_tab();
        assert_eq!(tabs.active_index(), 2);
    }
}
