//! Controller flows driven through the real executor
//!
//! Every test runs the full loop: key event → commands → executor task →
//! result event → controller, against an in-memory database.

mod common;

use common::{FakeDatabase, Harness, USERS};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use pgnav::app::tabs::QueryOutcome;
use pgnav::app::{AppEvent, DataView, FocusArea};
use pgnav::filter::FilterValue;
use std::time::Duration;

fn key(code: KeyCode) -> AppEvent {
    AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
}

fn ctrl(c: char) -> AppEvent {
    AppEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL))
}

async fn type_str(h: &mut Harness, s: &str) {
    for c in s.chars() {
        h.send(key(KeyCode::Char(c))).await;
    }
}

async fn palette(h: &mut Harness, command: &str) {
    h.send(ctrl('p')).await;
    type_str(h, command).await;
    h.send(key(KeyCode::Enter)).await;
}

/// Expand `public` and open `users` in the data panel
async fn browse_users(h: &mut Harness) {
    let schema = h.app.tree.find_by_id("schema:app.public").unwrap();
    h.app.tree_view.select(schema);
    h.send(key(KeyCode::Enter)).await;

    let users = h.app.tree.reveal("table:app.public.users").unwrap();
    h.app.tree_view.select(users);
    h.send(key(KeyCode::Enter)).await;
    h.app.focus = FocusArea::DataPanel;
}

#[tokio::test]
async fn test_startup_connects_and_loads_tree() {
    let h = Harness::connected().await;
    assert!(h.app.connection.is_some());
    assert_eq!(h.app.tree.database_name(), Some("app"));
    assert!(h.app.tree.find_by_id("schema:app.public").is_some());
    assert!(!h.app.connection_dialog.is_visible());
}

#[tokio::test]
async fn test_connect_failure_opens_dialog() {
    let mut h = Harness::new(FakeDatabase::default());
    let commands = h.app.startup(Some("postgres://app@down:5432/app"));
    h.run(commands).await;
    assert!(h.app.connection.is_none());
    assert!(h.app.connection_dialog.is_visible());
}

#[tokio::test]
async fn test_schema_expansion_loads_groups() {
    let mut h = Harness::connected().await;
    let schema = h.app.tree.find_by_id("schema:app.public").unwrap();
    h.app.tree_view.select(schema);
    h.send(key(KeyCode::Enter)).await;

    let node = h.app.tree.get(schema).unwrap();
    assert!(node.expanded && node.loaded);
    assert_eq!(node.children.len(), 3);
    assert!(h.app.tree.find_by_id("table:app.public.users").is_some());
    assert!(h.app.tree.find_by_id("view:app.public.active_users").is_some());
}

#[tokio::test]
async fn test_relation_expansion_lists_columns() {
    let mut h = Harness::connected().await;
    browse_users(&mut h).await;
    h.app.focus = FocusArea::TreeView;
    h.send(key(KeyCode::Char('l'))).await;

    let users = h.app.tree.find_by_id("table:app.public.users").unwrap();
    let labels: Vec<String> = h
        .app
        .tree
        .get(users)
        .unwrap()
        .children
        .iter()
        .map(|&c| h.app.tree.get(c).unwrap().label.clone())
        .collect();
    assert_eq!(labels[0], "id integer PK NOT NULL");
    assert_eq!(labels[1], "name text");
    assert!(labels[2].starts_with("Indexes"));
}

#[tokio::test]
async fn test_scrolling_fetches_next_pages() {
    let mut h = Harness::connected().await;
    browse_users(&mut h).await;
    assert_eq!(h.app.data_view, DataView::Browse);
    assert_eq!(h.app.pagination.rows.len(), 100);
    assert_eq!(h.app.pagination.total_rows, USERS);

    for _ in 0..90 {
        h.send(key(KeyCode::Char('j'))).await;
    }
    assert_eq!(h.app.pagination.rows.len(), 200);
    assert_eq!(h.app.pagination.selected_row, 90);

    h.send(key(KeyCode::Char('G'))).await;
    assert_eq!(h.app.pagination.rows.len(), USERS);
    assert_eq!(h.app.pagination.selected_row, 199);
}

#[tokio::test]
async fn test_sort_reloads_from_first_page() {
    let db = FakeDatabase::default();
    let mut h = Harness::new(db);
    let commands = h.app.startup(Some("postgres://app@localhost:5432/app"));
    h.run(commands).await;
    browse_users(&mut h).await;
    for _ in 0..95 {
        h.send(key(KeyCode::Char('j'))).await;
    }
    h.send(key(KeyCode::Char('s'))).await;

    let requests = h.connector.db.requests.lock().unwrap().clone();
    let last = requests.last().unwrap();
    assert_eq!(last.offset, 0);
    assert_eq!(last.sort.as_ref().unwrap().column, "id");
    assert_eq!(h.app.pagination.rows.len(), 100);
    assert_eq!(h.app.pagination.selected_row, 0);
}

#[tokio::test]
async fn test_palette_filter_sends_parameterized_clause() {
    let mut h = Harness::connected().await;
    browse_users(&mut h).await;
    palette(&mut h, "filter name LIKE 'user1%' AND id > 5").await;

    let requests = h.connector.db.requests.lock().unwrap().clone();
    let filter = requests.last().unwrap().filter.clone().unwrap();
    assert_eq!(filter.clause, "WHERE \"name\" LIKE $1 AND \"id\" > $2");
    assert_eq!(
        filter.args,
        vec![FilterValue::Text("user1%".into()), FilterValue::Int(5)]
    );
    assert!(h.app.active_filter().is_some());

    palette(&mut h, "clearfilter").await;
    let requests = h.connector.db.requests.lock().unwrap().clone();
    assert!(requests.last().unwrap().filter.is_none());
}

#[tokio::test]
async fn test_search_shows_matching_rows() {
    let mut h = Harness::connected().await;
    browse_users(&mut h).await;
    h.send(key(KeyCode::Char('/'))).await;
    type_str(&mut h, "user24").await;
    h.send(key(KeyCode::Enter)).await;

    assert_eq!(h.app.data_view, DataView::Search);
    let page = h.app.search.as_ref().unwrap().page.as_ref().unwrap();
    // user24 and user240..=user249
    assert_eq!(page.rows.len(), 11);
}

#[tokio::test]
async fn test_function_definition_shown() {
    let mut h = Harness::connected().await;
    let schema = h.app.tree.find_by_id("schema:app.public").unwrap();
    h.app.tree_view.select(schema);
    h.send(key(KeyCode::Enter)).await;

    let func = h.app.tree.reveal("function:app.public.touch(integer)").unwrap();
    h.app.tree_view.select(func);
    h.send(key(KeyCode::Enter)).await;

    assert_eq!(h.app.data_view, DataView::Definition);
    let details = h.app.details.as_ref().unwrap();
    assert_eq!(
        details.text.as_deref(),
        Some("CREATE FUNCTION public.touch(integer) RETURNS void")
    );
}

#[tokio::test]
async fn test_query_runs_and_lands_in_history() {
    let mut h = Harness::connected().await;
    h.app.focus = FocusArea::QueryEditor;
    h.app.editor.set_content("SELECT 1");
    h.send(key(KeyCode::F(5))).await;

    assert_eq!(h.app.data_view, DataView::Results);
    let results = h.app.tabs.active().results().unwrap();
    assert_eq!(results.rows.len(), 1);
    assert_eq!(h.app.history()[0].query, "SELECT 1");
    assert!(h.app.history()[0].success);
}

#[tokio::test]
async fn test_failed_query_shows_server_message() {
    let mut h = Harness::connected().await;
    h.app.focus = FocusArea::QueryEditor;
    h.app.editor.set_content("selec 1");
    h.send(key(KeyCode::F(5))).await;

    let error = h.app.error.as_ref().unwrap();
    assert_eq!(error.message, "syntax error at or near \"selec\"");
    assert!(!h.app.history()[0].success);
}

#[tokio::test]
async fn test_cancelled_query_ignores_late_result() {
    let mut h = Harness::new(FakeDatabase {
        query_delay: Some(Duration::from_millis(300)),
        ..Default::default()
    });
    let commands = h.app.startup(Some("postgres://app@localhost:5432/app"));
    h.run(commands).await;

    h.app.focus = FocusArea::QueryEditor;
    h.app.editor.set_content("SELECT pg_sleep(10)");
    let commands = h.app.handle(key(KeyCode::F(5)));
    h.executor.execute_all(commands);
    assert!(h.app.tabs.active().is_running());

    h.send(ctrl('c')).await;
    h.receive_one().await;

    assert!(matches!(h.app.tabs.active().outcome, QueryOutcome::Cancelled));
    assert!(h.app.error.is_none());
    assert!(h.app.history().is_empty());
}

#[tokio::test]
async fn test_saved_favorite_loads_into_editor() {
    let mut h = Harness::connected().await;
    h.app.editor.set_content("SELECT * FROM users");
    palette(&mut h, "save all users").await;

    h.app.editor.clear();
    h.send(ctrl('b')).await;
    assert_eq!(h.app.favorites_dialog.favorites().len(), 1);
    h.send(key(KeyCode::Enter)).await;

    assert_eq!(h.app.editor.content(), "SELECT * FROM users");
    assert_eq!(h.app.focus, FocusArea::QueryEditor);
}

#[tokio::test]
async fn test_lost_connection_resets_session() {
    let mut h = Harness::connected().await;
    browse_users(&mut h).await;
    h.connector.drop_connection("terminating connection due to administrator command");
    h.receive_one().await;

    assert!(h.app.connection.is_none());
    assert!(h.app.pagination.current_table().is_none());
    assert_eq!(h.app.tree.database_name(), None);
    let error = h.app.error.as_ref().unwrap();
    assert!(error.message.contains("administrator command"));
}

#[tokio::test]
async fn test_cancelling_one_tab_leaves_the_other_running() {
    let mut h = Harness::new(FakeDatabase {
        query_delay: Some(Duration::from_millis(300)),
        ..Default::default()
    });
    let commands = h.app.startup(Some("postgres://app@localhost:5432/app"));
    h.run(commands).await;

    h.app.focus = FocusArea::QueryEditor;
    h.app.editor.set_content("SELECT 1");
    let commands = h.app.handle(key(KeyCode::F(5)));
    h.executor.execute_all(commands);

    h.send(ctrl('t')).await;
    h.app.editor.set_content("SELECT 2");
    let commands = h.app.handle(key(KeyCode::F(5)));
    h.executor.execute_all(commands);
    assert_eq!(h.app.tabs.len(), 2);

    h.send(ctrl('c')).await;
    h.receive_one().await;
    h.receive_one().await;

    let tabs = h.app.tabs.tabs();
    assert!(matches!(tabs[0].outcome, QueryOutcome::Completed(_)));
    assert!(matches!(tabs[1].outcome, QueryOutcome::Cancelled));
    assert!(h.app.error.is_none());
    assert_eq!(h.app.history().len(), 1);
    assert_eq!(h.app.history()[0].query, "SELECT 1");
}

#[tokio::test]
async fn test_favorite_overwrite_and_rename_are_stored() {
    let mut h = Harness::connected().await;
    h.app.editor.set_content("SELECT * FROM users");
    palette(&mut h, "save users").await;

    h.app.editor.set_content("SELECT * FROM users WHERE active");
    h.send(ctrl('b')).await;
    h.send(key(KeyCode::Char('u'))).await;
    let favorites = h.app.favorites_dialog.favorites();
    assert_eq!(favorites.len(), 1);
    assert_eq!(favorites[0].query, "SELECT * FROM users WHERE active");

    h.send(key(KeyCode::Char('r'))).await;
    h.send(key(KeyCode::End)).await;
    type_str(&mut h, " active").await;
    h.send(key(KeyCode::Enter)).await;
    let favorites = h.app.favorites_dialog.favorites();
    assert_eq!(favorites.len(), 1);
    assert_eq!(favorites[0].name, "users active");
    assert_eq!(favorites[0].query, "SELECT * FROM users WHERE active");
    assert!(h.app.error.is_none());
}
