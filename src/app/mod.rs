//! Application state and event handling
//!
//! Central state machine: one event comes in, state updates, commands go
//! out. `App::handle` never performs IO; every database or store operation
//! is described by a [`Command`] and answered later by exactly one
//! [`AppEvent`]. Answers are checked against current state before they are
//! applied, since the user may have moved on in the meantime.

pub mod event;
pub mod tabs;

pub use event::AppEvent;

use crate::commands::{PaletteCommand, parse_command};
use crate::config::{ConnectionConfig, Settings};
use crate::db::{CellValue, ColumnDef, ObjectRef, PageData, PageRequest, Row, SearchRequest, TypeCategory};
use crate::error::{FilterError, FilterResult};
use crate::executor::{ChildTarget, Command, ConnectionId, FavoriteChange, QueryToken};
use crate::filter::Filter;
use crate::keymap::{KeyAction, KeyMap};
use crate::pagination::Pagination;
use crate::store::HistoryEntry;
use crate::tree::{NavigationTree, NodeId, NodeKind, NodeMetadata};
use crate::ui::command_palette::{CommandPalette, PaletteAction};
use crate::ui::connection_dialog::{ConnectionDialog, DialogAction};
use crate::ui::data_panel;
use crate::ui::editor::QueryEditor;
use crate::ui::favorites_dialog::{FavoritesAction, FavoritesDialog};
use crate::ui::filter_dialog::{FilterAction, FilterDialog, build_filter};
use crate::ui::help;
use crate::ui::json_viewer::JsonViewer;
use crate::ui::layout::{AppLayout, calculate_layout, panel_inner};
use crate::ui::search_dialog::{SearchAction, SearchDialog};
use crate::ui::tree::{TreeView, scroll_offset};
use chrono::Utc;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use std::collections::HashMap;
use tabs::{CloseRefused, TabSet};
use tracing::{debug, info, warn};

/// History entries kept for recall in the editor
const HISTORY_RECALL: usize = 100;

/// Rows moved per mouse wheel tick
const WHEEL_STEP: isize = 3;

/// Rows moved by PageUp/PageDown in the help view
const HELP_PAGE: usize = 20;

/// The three panels that can hold keyboard focus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FocusArea {
    TreeView,
    DataPanel,
    QueryEditor,
}

impl FocusArea {
    /// TreeView → DataPanel → QueryEditor → TreeView
    pub fn next(self) -> Self {
        match self {
            FocusArea::TreeView => FocusArea::DataPanel,
            FocusArea::DataPanel => FocusArea::QueryEditor,
            FocusArea::QueryEditor => FocusArea::TreeView,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            FocusArea::TreeView => FocusArea::QueryEditor,
            FocusArea::DataPanel => FocusArea::TreeView,
            FocusArea::QueryEditor => FocusArea::DataPanel,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Normal,
    Help,
}

/// What the data panel shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataView {
    /// Paged rows of the browsed relation
    Browse,
    /// Definition of a non-tabular object
    Definition,
    /// The active result tab
    Results,
    /// Matches of a table search
    Search,
}

/// Definition of the object selected in the tree; `text` is `None` while loading
#[derive(Debug, Clone)]
pub struct ObjectDetails {
    pub target: ObjectRef,
    pub text: Option<String>,
    pub scroll: usize,
}

#[derive(Debug, Clone)]
pub struct SearchState {
    pub request: SearchRequest,
    /// `None` while the search runs
    pub page: Option<PageData>,
    pub selected_row: usize,
    pub selected_col: usize,
}

/// Modal error shown for failed asynchronous commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorOverlay {
    pub title: String,
    pub message: String,
}

/// Status message with severity level
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub message: String,
    pub level: StatusLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct ActiveConnection {
    pub id: ConnectionId,
    pub config: ConnectionConfig,
}

/// How arriving children are folded into the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadMode {
    /// First expansion
    Append,
    /// Explicit refresh
    Replace,
}

/// Main application state
pub struct App {
    pub running: bool,
    pub focus: FocusArea,
    pub view_mode: ViewMode,
    /// Terminal size (columns, rows)
    pub viewport: (u16, u16),
    pub settings: Settings,
    pub connection: Option<ActiveConnection>,

    pub tree: NavigationTree,
    /// Bumped whenever `tree` is replaced; child loads for older trees are dropped
    pub tree_generation: u64,
    pub tree_view: TreeView,

    pub data_view: DataView,
    pub pagination: Pagination,
    pub details: Option<ObjectDetails>,
    pub search: Option<SearchState>,
    pub tabs: TabSet,
    pub editor: QueryEditor,

    pub connection_dialog: ConnectionDialog,
    pub command_palette: CommandPalette,
    pub filter_dialog: FilterDialog,
    pub json_viewer: JsonViewer,
    pub favorites_dialog: FavoritesDialog,
    pub search_dialog: SearchDialog,
    pub error: Option<ErrorOverlay>,
    pub status: Option<StatusMessage>,
    pub help_scroll: usize,

    keymap: KeyMap,
    /// Child loads in flight, by node key
    pending_loads: HashMap<String, LoadMode>,
    /// Recent queries, newest first
    history: Vec<HistoryEntry>,
    /// Position in `history` while recalling with Ctrl+Up/Down
    history_cursor: Option<usize>,
    next_token_id: u64,
}

impl App {
    pub fn new(settings: Settings) -> Self {
        let tree = NavigationTree::new();
        Self {
            running: true,
            focus: FocusArea::TreeView,
            view_mode: ViewMode::Normal,
            viewport: (80, 24),
            connection: None,
            tree,
            tree_generation: 0,
            tree_view: TreeView::new(),
            data_view: DataView::Browse,
            pagination: Pagination::new(settings.page_size),
            details: None,
            search: None,
            tabs: TabSet::new(settings.max_tabs),
            editor: QueryEditor::new(),
            connection_dialog: ConnectionDialog::new(),
            command_palette: CommandPalette::new(),
            filter_dialog: FilterDialog::new(),
            json_viewer: JsonViewer::new(),
            favorites_dialog: FavoritesDialog::new(),
            search_dialog: SearchDialog::new(),
            error: None,
            status: None,
            help_scroll: 0,
            settings,
            keymap: KeyMap::default(),
            pending_loads: HashMap::new(),
            history: Vec::new(),
            history_cursor: None,
            next_token_id: 1,
        }
    }

    /// Commands issued once at startup. With a URL the session connects
    /// right away; otherwise the connection dialog opens.
    pub fn startup(&mut self, url: Option<&str>) -> Vec<Command> {
        let mut commands = vec![
            Command::LoadRecentConnections,
            Command::LoadHistory {
                limit: HISTORY_RECALL,
            },
        ];
        match url.map(ConnectionConfig::from_url) {
            Some(Ok(config)) => {
                self.set_status(format!("Connecting to {}...", config.name), StatusLevel::Info);
                commands.push(Command::Connect(config));
            }
            Some(Err(e)) => {
                self.connection_dialog.show();
                self.connection_dialog.set_error(e.to_string());
            }
            None => self.connection_dialog.show(),
        }
        commands
    }

    pub fn connection_id(&self) -> Option<ConnectionId> {
        self.connection.as_ref().map(|c| c.id)
    }

    /// Recent queries, newest first
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// The filter applied to the browsed relation
    pub fn active_filter(&self) -> Option<&Filter> {
        self.pagination.filter()
    }

    pub fn selected_node(&self) -> Option<NodeId> {
        self.tree_view.selected()
    }

    /// Screen layout for the current viewport
    pub fn layout(&self) -> AppLayout {
        calculate_layout(Rect::new(0, 0, self.viewport.0, self.viewport.1))
    }

    pub fn set_status(&mut self, message: impl Into<String>, level: StatusLevel) {
        self.status = Some(StatusMessage {
            message: message.into(),
            level,
        });
    }

    fn show_error(&mut self, title: impl Into<String>, message: impl Into<String>) {
        let (title, message) = (title.into(), message.into());
        warn!(%title, %message, "error overlay");
        self.error = Some(ErrorOverlay { title, message });
    }

    /// Any modal layer above the panels
    pub fn has_overlay(&self) -> bool {
        self.error.is_some()
            || self.connection_dialog.is_visible()
            || self.command_palette.is_active()
            || self.filter_dialog.is_visible()
            || self.json_viewer.is_visible()
            || self.favorites_dialog.is_visible()
            || self.search_dialog.is_visible()
            || self.view_mode == ViewMode::Help
    }

    /// Handle one event and return the commands it requires
    pub fn handle(&mut self, event: AppEvent) -> Vec<Command> {
        match event {
            AppEvent::Key(key) => self.handle_key(key),
            AppEvent::Mouse(mouse) => self.handle_mouse(mouse),
            AppEvent::Resize(width, height) => {
                self.viewport = (width, height);
                Vec::new()
            }
            AppEvent::Paste(text) => {
                self.handle_paste(&text);
                Vec::new()
            }
            AppEvent::DiscoveryComplete(found) => {
                self.set_status(format!("Found {} server(s)", found.len()), StatusLevel::Info);
                self.connection_dialog.set_discovered(found);
                Vec::new()
            }
            AppEvent::ConnectResult { config, result } => match result {
                Ok(id) => self.on_connected(id, config),
                Err(e) => {
                    warn!(host = %config.host, error = %e, "connect failed");
                    if !self.connection_dialog.is_visible() {
                        self.connection_dialog.show();
                    }
                    self.connection_dialog.set_error(e.to_string());
                    Vec::new()
                }
            },
            AppEvent::TreeLoaded { connection, result } => {
                if self.connection_id() != Some(connection) {
                    debug!(connection, "discarding tree for inactive connection");
                    return Vec::new();
                }
                match result {
                    Ok(tree) => {
                        self.tree = tree;
                        self.tree_generation += 1;
                        self.pending_loads.clear();
                        self.tree_view.reset(&self.tree);
                    }
                    Err(e) => self.show_error("Could not load schema", e.to_string()),
                }
                Vec::new()
            }
            AppEvent::ChildrenLoaded {
                generation,
                node_key,
                result,
            } => {
                self.on_children_loaded(generation, node_key, result);
                Vec::new()
            }
            AppEvent::PageLoaded { request, result } => self.on_page_loaded(request, result),
            AppEvent::QueryResult {
                tab_id,
                token_id,
                result,
            } => {
                let Some(resolved) = self.tabs.resolve(tab_id, token_id, result) else {
                    debug!(tab_id, token_id, "discarding query result");
                    return Vec::new();
                };
                let (connection_name, database_name) = self
                    .connection
                    .as_ref()
                    .map(|c| (c.config.name.clone(), c.config.database.clone()))
                    .unwrap_or_default();
                let entry = HistoryEntry {
                    connection_name,
                    database_name,
                    query: resolved.sql,
                    duration_ms: resolved.elapsed.as_millis() as u64,
                    rows_affected: resolved.rows_affected,
                    success: resolved.error.is_none(),
                    error_message: resolved.error.clone(),
                    executed_at: Utc::now(),
                };
                match resolved.error {
                    None => self.set_status(
                        format!(
                            "{} rows in {:.1}ms",
                            resolved.rows_affected,
                            resolved.elapsed.as_secs_f64() * 1000.0
                        ),
                        StatusLevel::Success,
                    ),
                    Some(message) => self.show_error("Query failed", message),
                }
                self.history.insert(0, entry.clone());
                self.history.truncate(HISTORY_RECALL);
                vec![Command::RecordHistory(entry)]
            }
            AppEvent::SearchResult { request, result } => {
                let Some(search) = self.search.as_mut() else {
                    return Vec::new();
                };
                if search.request != request {
                    debug!(needle = %request.needle, "discarding stale search result");
                    return Vec::new();
                }
                match result {
                    Ok(page) => search.page = Some(page),
                    Err(e) => {
                        self.search = None;
                        if self.data_view == DataView::Search {
                            self.data_view = DataView::Browse;
                        }
                        self.show_error("Search failed", e.to_string());
                    }
                }
                Vec::new()
            }
            AppEvent::ObjectDetailsLoaded { target, result } => {
                let Some(details) = self.details.as_mut() else {
                    return Vec::new();
                };
                if details.target != target {
                    debug!(name = %target.name, "discarding stale object details");
                    return Vec::new();
                }
                match result {
                    Ok(text) => details.text = Some(text),
                    Err(e) => {
                        self.details = None;
                        if self.data_view == DataView::Definition {
                            self.data_view = DataView::Browse;
                        }
                        self.show_error("Could not load definition", e.to_string());
                    }
                }
                Vec::new()
            }
            AppEvent::FavoriteMutated(result) => match result {
                Ok(FavoriteChange::Saved(favorite)) => {
                    self.set_status(format!("Saved favorite '{}'", favorite.name), StatusLevel::Success);
                    if self.favorites_dialog.is_visible() {
                        vec![Command::ListFavorites]
                    } else {
                        Vec::new()
                    }
                }
                Ok(FavoriteChange::Updated(favorite)) => {
                    self.set_status(format!("Updated favorite '{}'", favorite.name), StatusLevel::Success);
                    if self.favorites_dialog.is_visible() {
                        vec![Command::ListFavorites]
                    } else {
                        Vec::new()
                    }
                }
                Ok(FavoriteChange::Deleted(id)) => {
                    self.favorites_dialog.remove(&id);
                    self.set_status("Favorite deleted", StatusLevel::Info);
                    Vec::new()
                }
                Err(e) => {
                    self.show_error("Favorites", e.to_string());
                    Vec::new()
                }
            },
            AppEvent::FavoritesLoaded(result) => {
                match result {
                    Ok(favorites) => self.favorites_dialog.set_favorites(favorites),
                    Err(e) => {
                        self.favorites_dialog.set_favorites(Vec::new());
                        self.show_error("Could not load favorites", e.to_string());
                    }
                }
                Vec::new()
            }
            AppEvent::RecentConnectionsLoaded(result) => {
                match result {
                    Ok(recent) => self.connection_dialog.set_recent(recent),
                    Err(e) => warn!(error = %e, "could not load recent connections"),
                }
                Vec::new()
            }
            AppEvent::HistoryRecorded(result) => {
                if let Err(e) = result {
                    warn!(error = %e, "could not record history");
                }
                Vec::new()
            }
            AppEvent::HistoryLoaded(result) => {
                match result {
                    Ok(entries) => {
                        self.history = entries;
                        self.history_cursor = None;
                    }
                    Err(e) => warn!(error = %e, "could not load history"),
                }
                Vec::new()
            }
            AppEvent::Disconnected(connection) => {
                if self.connection_id() == Some(connection) {
                    self.connection = None;
                    self.reset_session();
                }
                debug!(connection, "disconnect finished");
                Vec::new()
            }
            AppEvent::ConnectionLost {
                connection,
                message,
            } => {
                if self.connection_id() == Some(connection) {
                    self.connection = None;
                    self.reset_session();
                    self.show_error("Connection lost", message);
                }
                vec![Command::Disconnect(connection)]
            }
        }
    }

    fn on_connected(&mut self, id: ConnectionId, config: ConnectionConfig) -> Vec<Command> {
        info!(connection = id, database = %config.database, "session connected");
        let previous = self.connection.take();
        self.reset_session();
        self.connection = Some(ActiveConnection {
            id,
            config: config.clone(),
        });
        self.connection_dialog.hide();
        self.set_status(format!("Connected to {}", config.name), StatusLevel::Success);
        let mut commands = vec![Command::LoadTree(id), Command::RecordConnection(config)];
        if let Some(previous) = previous {
            commands.push(Command::Disconnect(previous.id));
        }
        commands
    }

    /// Forget everything tied to the connection
    fn reset_session(&mut self) {
        self.tabs.cancel_all();
        self.pagination.close();
        self.details = None;
        self.search = None;
        self.data_view = DataView::Browse;
        self.tree = NavigationTree::new();
        self.tree_generation += 1;
        self.tree_view.reset(&self.tree);
        self.pending_loads.clear();
        self.filter_dialog.hide();
        self.search_dialog.hide();
        self.json_viewer.hide();
    }

    fn on_children_loaded(
        &mut self,
        generation: u64,
        node_key: String,
        result: crate::error::DbResult<Vec<crate::tree::NodeSpec>>,
    ) {
        let mode = self.pending_loads.remove(&node_key);
        if generation != self.tree_generation {
            debug!(%node_key, generation, "discarding children for a replaced tree");
            return;
        }
        let Some(id) = self.tree.find_by_id(&node_key) else {
            debug!(%node_key, "children arrived for a missing node");
            return;
        };
        match result {
            Ok(specs) => {
                if mode == Some(LoadMode::Replace) {
                    self.tree.replace_children(id, specs);
                } else {
                    self.tree.append_children(id, specs);
                }
                self.tree_view.ensure_visible(&self.tree);
            }
            Err(e) => {
                self.tree.set_expanded(id, false);
                self.tree_view.ensure_visible(&self.tree);
                self.show_error("Could not load children", e.to_string());
            }
        }
    }

    fn on_page_loaded(
        &mut self,
        request: PageRequest,
        result: crate::error::DbResult<PageData>,
    ) -> Vec<Command> {
        if !self.pagination.is_current(&request) {
            debug!(
                schema = %request.schema,
                table = %request.table,
                offset = request.offset,
                "discarding page for a superseded request"
            );
            return Vec::new();
        }
        match result {
            Ok(page) => {
                let outcome = self.pagination.apply(page);
                debug!(?outcome, rows = self.pagination.rows.len(), "page applied");
                // the selection may already sit inside the lookahead window
                match self.pagination.prefetch() {
                    Some(next) => self.page_command(next),
                    None => Vec::new(),
                }
            }
            Err(e) => {
                self.pagination.load_failed(&request.schema, &request.table);
                self.show_error("Could not load rows", e.to_string());
                Vec::new()
            }
        }
    }

    /// Page request as a command, filtered when it carries a clause
    fn page_command(&self, request: PageRequest) -> Vec<Command> {
        let Some(connection) = self.connection_id() else {
            return Vec::new();
        };
        if request.filter.is_some() {
            vec![Command::LoadPageFiltered {
                connection,
                request,
            }]
        } else {
            vec![Command::LoadPage {
                connection,
                request,
            }]
        }
    }

    // ── Input ────────────────────────────────────────────────

    fn handle_key(&mut self, key: KeyEvent) -> Vec<Command> {
        if key.kind != KeyEventKind::Press {
            return Vec::new();
        }
        self.status = None;

        if self.keymap.resolve(self.focus, key) == Some(KeyAction::Quit) {
            return self.quit();
        }

        if self.error.is_some() {
            if matches!(key.code, KeyCode::Esc | KeyCode::Enter) {
                self.error = None;
            }
            return Vec::new();
        }

        if self.connection_dialog.is_visible() {
            return match self.connection_dialog.handle_key(key) {
                DialogAction::Connect(config) => {
                    self.set_status(format!("Connecting to {}...", config.name), StatusLevel::Info);
                    vec![Command::Connect(config)]
                }
                DialogAction::Discover => {
                    self.connection_dialog.set_scanning();
                    vec![Command::Discover]
                }
                DialogAction::Dismissed => {
                    self.connection_dialog.hide();
                    Vec::new()
                }
                DialogAction::Consumed => Vec::new(),
            };
        }

        if self.command_palette.is_active() {
            return match self.command_palette.handle_key(key) {
                PaletteAction::Submit(input) => match parse_command(&input) {
                    Ok(command) => {
                        self.command_palette.deactivate();
                        self.run_palette_command(command)
                    }
                    Err(e) => {
                        self.command_palette.set_error(e.to_string());
                        Vec::new()
                    }
                },
                PaletteAction::Dismissed => {
                    self.command_palette.deactivate();
                    Vec::new()
                }
                PaletteAction::Consumed => Vec::new(),
            };
        }

        if self.filter_dialog.is_visible() {
            return match self.filter_dialog.handle_key(key) {
                FilterAction::Apply(filter) => {
                    self.filter_dialog.hide();
                    self.apply_filter(filter)
                }
                FilterAction::Dismissed => {
                    self.filter_dialog.hide();
                    Vec::new()
                }
                FilterAction::Consumed => Vec::new(),
            };
        }

        if self.json_viewer.is_visible() {
            if !self.json_viewer.handle_key(key) {
                self.json_viewer.hide();
            }
            return Vec::new();
        }

        if self.favorites_dialog.is_visible() {
            return match self.favorites_dialog.handle_key(key) {
                FavoritesAction::Load(query) => {
                    self.favorites_dialog.hide();
                    self.editor.set_content(query);
                    self.focus = FocusArea::QueryEditor;
                    self.set_status("Favorite loaded into the editor", StatusLevel::Info);
                    Vec::new()
                }
                FavoritesAction::Delete(id) => vec![Command::DeleteFavorite { id }],
                FavoritesAction::Rename { id, name, query } => {
                    vec![Command::UpdateFavorite { id, name, query }]
                }
                FavoritesAction::Overwrite { id, name } => {
                    let query = self.editor.content().trim().to_string();
                    if query.is_empty() {
                        self.set_status("The editor is empty", StatusLevel::Warning);
                        return Vec::new();
                    }
                    vec![Command::UpdateFavorite { id, name, query }]
                }
                FavoritesAction::Dismissed => {
                    self.favorites_dialog.hide();
                    Vec::new()
                }
                FavoritesAction::Consumed => Vec::new(),
            };
        }

        if self.search_dialog.is_visible() {
            return match self.search_dialog.handle_key(key) {
                SearchAction::Search(needle) => {
                    self.search_dialog.hide();
                    self.start_search(needle)
                }
                SearchAction::Dismissed => {
                    self.search_dialog.hide();
                    Vec::new()
                }
                SearchAction::Consumed => Vec::new(),
            };
        }

        if self.view_mode == ViewMode::Help {
            self.handle_help_key(key);
            return Vec::new();
        }

        match self.keymap.resolve(self.focus, key) {
            Some(action) => self.apply_key_action(action),
            None => {
                if self.focus == FocusArea::QueryEditor && self.editor.handle_key(key) {
                    self.history_cursor = None;
                }
                Vec::new()
            }
        }
    }

    fn handle_help_key(&mut self, key: KeyEvent) {
        let last = help::line_count().saturating_sub(1);
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?') | KeyCode::F(1) => {
                self.view_mode = ViewMode::Normal;
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.help_scroll = (self.help_scroll + 1).min(last);
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.help_scroll = self.help_scroll.saturating_sub(1);
            }
            KeyCode::PageDown => self.help_scroll = (self.help_scroll + HELP_PAGE).min(last),
            KeyCode::PageUp => self.help_scroll = self.help_scroll.saturating_sub(HELP_PAGE),
            KeyCode::Char('g') | KeyCode::Home => self.help_scroll = 0,
            KeyCode::Char('G') | KeyCode::End => self.help_scroll = last,
            _ => {}
        }
    }

    fn handle_paste(&mut self, text: &str) {
        if self.error.is_some() {
            return;
        }
        if self.connection_dialog.is_visible() {
            self.connection_dialog.paste(text);
        } else if self.command_palette.is_active() {
            self.command_palette.paste(text);
        } else if self.filter_dialog.is_visible() {
            self.filter_dialog.paste(text);
        } else if self.search_dialog.is_visible() {
            self.search_dialog.paste(text);
        } else if self.favorites_dialog.is_visible() {
            self.favorites_dialog.paste(text);
        } else if !self.has_overlay() && self.focus == FocusArea::QueryEditor {
            self.editor.insert_text(text);
            self.history_cursor = None;
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) -> Vec<Command> {
        if self.has_overlay() {
            return Vec::new();
        }
        let layout = self.layout();
        let Some(region) = layout.region_at(mouse.column, mouse.row) else {
            return Vec::new();
        };
        let inner = panel_inner(layout.area_of(region));
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                self.focus = region;
                match region {
                    FocusArea::TreeView => self.click_tree(inner, mouse.row),
                    FocusArea::DataPanel => self.click_data(inner, mouse.row),
                    FocusArea::QueryEditor => Vec::new(),
                }
            }
            MouseEventKind::ScrollDown => self.scroll_region(region, WHEEL_STEP),
            MouseEventKind::ScrollUp => self.scroll_region(region, -WHEEL_STEP),
            _ => Vec::new(),
        }
    }

    /// Select the clicked row; clicking the selected row activates it
    fn click_tree(&mut self, inner: Rect, y: u16) -> Vec<Command> {
        if y < inner.y {
            return Vec::new();
        }
        let rows = self.tree.flatten();
        let selected = self.tree_view.selected_index(&rows).unwrap_or(0);
        let index = scroll_offset(selected, inner.height as usize) + (y - inner.y) as usize;
        let before = self.tree_view.selected();
        if !self.tree_view.select_index(&self.tree, index) {
            return Vec::new();
        }
        if before.is_some() && before == self.tree_view.selected() {
            self.activate_selected()
        } else {
            Vec::new()
        }
    }

    fn click_data(&mut self, inner: Rect, y: u16) -> Vec<Command> {
        match self.data_view {
            DataView::Browse => {
                if let Some(row) = data_panel::row_at(inner, self.pagination.selected_row, y) {
                    self.pagination.select_row(row);
                }
                match self.pagination.prefetch() {
                    Some(request) => self.page_command(request),
                    None => Vec::new(),
                }
            }
            DataView::Results => {
                let tab = self.tabs.active_mut();
                let held = tab.results().map_or(0, |r| r.rows.len());
                if let Some(row) = data_panel::row_at(inner, tab.selected_row, y)
                    && row < held
                {
                    tab.selected_row = row;
                }
                Vec::new()
            }
            DataView::Search => {
                if let Some(search) = self.search.as_mut() {
                    let held = search.page.as_ref().map_or(0, |p| p.rows.len());
                    if let Some(row) = data_panel::row_at(inner, search.selected_row, y)
                        && row < held
                    {
                        search.selected_row = row;
                    }
                }
                Vec::new()
            }
            DataView::Definition => Vec::new(),
        }
    }

    fn scroll_region(&mut self, region: FocusArea, delta: isize) -> Vec<Command> {
        match region {
            FocusArea::TreeView => {
                self.tree_view.move_by(&self.tree, delta);
                Vec::new()
            }
            FocusArea::DataPanel => {
                let action = if delta > 0 {
                    KeyAction::MoveDown
                } else {
                    KeyAction::MoveUp
                };
                let mut commands = Vec::new();
                for _ in 0..delta.unsigned_abs() {
                    commands.extend(self.data_action(action));
                }
                commands
            }
            FocusArea::QueryEditor => Vec::new(),
        }
    }

    fn apply_key_action(&mut self, action: KeyAction) -> Vec<Command> {
        match action {
            // ── Global ───────────────────────────────────────
            KeyAction::Quit => return self.quit(),
            KeyAction::OpenPalette => self.command_palette.activate(),
            KeyAction::OpenConnectionDialog => return self.open_connection_dialog(),
            KeyAction::OpenFavorites => return self.open_favorites(),
            KeyAction::Help => {
                self.view_mode = ViewMode::Help;
                self.help_scroll = 0;
            }
            KeyAction::CycleFocus => self.focus = self.focus.next(),
            KeyAction::CycleFocusReverse => self.focus = self.focus.prev(),
            KeyAction::NewTab => self.new_tab(),
            KeyAction::CloseTab => self.close_tab(),
            KeyAction::NextTab => {
                self.tabs.next_tab();
                self.data_view = DataView::Results;
            }
            KeyAction::CancelQuery => self.cancel_query(),

            // ── Editor ───────────────────────────────────────
            KeyAction::ExecuteQuery => return self.execute_query(),
            KeyAction::ClearEditor => {
                self.editor.clear();
                self.history_cursor = None;
            }
            KeyAction::HistoryPrev => self.recall_history(true),
            KeyAction::HistoryNext => self.recall_history(false),

            other => {
                return match self.focus {
                    FocusArea::TreeView => self.tree_action(other),
                    FocusArea::DataPanel => self.data_action(other),
                    FocusArea::QueryEditor => Vec::new(),
                };
            }
        }
        Vec::new()
    }

    fn quit(&mut self) -> Vec<Command> {
        info!("quit requested");
        self.tabs.cancel_all();
        self.running = false;
        self.connection
            .take()
            .map(|c| vec![Command::Disconnect(c.id)])
            .unwrap_or_default()
    }

    fn open_connection_dialog(&mut self) -> Vec<Command> {
        self.connection_dialog.show();
        vec![Command::LoadRecentConnections]
    }

    fn open_favorites(&mut self) -> Vec<Command> {
        self.favorites_dialog.show();
        vec![Command::ListFavorites]
    }

    // ── Tree ─────────────────────────────────────────────────

    fn tree_page_rows(&self) -> isize {
        (panel_inner(self.layout().tree).height as isize).max(1)
    }

    fn tree_action(&mut self, action: KeyAction) -> Vec<Command> {
        let page = self.tree_page_rows();
        match action {
            KeyAction::MoveDown => self.tree_view.move_by(&self.tree, 1),
            KeyAction::MoveUp => self.tree_view.move_by(&self.tree, -1),
            KeyAction::PageDown => self.tree_view.move_by(&self.tree, page),
            KeyAction::PageUp => self.tree_view.move_by(&self.tree, -page),
            KeyAction::GoToTop => self.tree_view.go_to_top(&self.tree),
            KeyAction::GoToBottom => self.tree_view.go_to_bottom(&self.tree),
            KeyAction::Activate => return self.activate_selected(),
            KeyAction::ToggleExpand => {
                if let Some(id) = self.tree_view.selected() {
                    return self.toggle_node(id);
                }
            }
            KeyAction::Expand => return self.expand_selected(),
            KeyAction::Collapse => self.collapse_selected(),
            KeyAction::RefreshNode => return self.refresh_selected(),
            _ => {}
        }
        Vec::new()
    }

    /// Enter on a tree node: relations open their rows, other objects their
    /// definition, containers toggle
    pub fn activate_selected(&mut self) -> Vec<Command> {
        let Some(id) = self.tree_view.selected() else {
            return Vec::new();
        };
        let Some(node) = self.tree.get(id) else {
            return Vec::new();
        };
        let kind = node.kind;
        let target = match &node.metadata {
            NodeMetadata::Object(object) => Some(object.clone()),
            _ => None,
        };
        match (kind, target) {
            (kind, Some(object)) if kind.is_relation() => {
                self.open_relation(&object.schema, &object.name)
            }
            (kind, Some(object)) if kind.shows_definition() => self.open_details(object),
            (NodeKind::Column | NodeKind::Root, _) => Vec::new(),
            _ => self.toggle_node(id),
        }
    }

    /// Browse `schema.table` from offset 0 with no filter
    pub fn open_relation(&mut self, schema: &str, table: &str) -> Vec<Command> {
        if self.connection.is_none() {
            self.set_status("Not connected", StatusLevel::Warning);
            return Vec::new();
        }
        self.details = None;
        self.search = None;
        self.data_view = DataView::Browse;
        let request = self.pagination.open(schema, table);
        debug!(%schema, %table, "browsing relation");
        self.page_command(request)
    }

    fn open_details(&mut self, target: ObjectRef) -> Vec<Command> {
        let Some(connection) = self.connection_id() else {
            self.set_status("Not connected", StatusLevel::Warning);
            return Vec::new();
        };
        self.search = None;
        self.details = Some(ObjectDetails {
            target: target.clone(),
            text: None,
            scroll: 0,
        });
        self.data_view = DataView::Definition;
        vec![Command::LoadObjectDetails { connection, target }]
    }

    fn toggle_node(&mut self, id: NodeId) -> Vec<Command> {
        self.tree.toggle(id);
        self.tree_view.ensure_visible(&self.tree);
        self.load_if_needed(id)
    }

    /// Child load for an expanded node that has never been fetched
    fn load_if_needed(&mut self, id: NodeId) -> Vec<Command> {
        let pending = self
            .tree
            .get(id)
            .is_some_and(|n| self.pending_loads.contains_key(&n.key));
        if !self.tree.needs_load(id) || pending {
            return Vec::new();
        }
        self.children_command(id, LoadMode::Append)
    }

    fn children_command(&mut self, id: NodeId, mode: LoadMode) -> Vec<Command> {
        let Some(connection) = self.connection_id() else {
            return Vec::new();
        };
        let Some(node) = self.tree.get(id) else {
            return Vec::new();
        };
        let target = match &node.metadata {
            NodeMetadata::Schema { name } => ChildTarget::Schema {
                schema: name.clone(),
            },
            NodeMetadata::Object(object) if node.kind.is_relation() => ChildTarget::Relation {
                schema: object.schema.clone(),
                relation: object.name.clone(),
                kind: node.kind,
            },
            _ => return Vec::new(),
        };
        let node_key = node.key.clone();
        self.pending_loads.insert(node_key.clone(), mode);
        vec![Command::LoadChildren {
            connection,
            generation: self.tree_generation,
            node_key,
            target,
        }]
    }

    /// `l`: expand, or step into the first child of an expanded node
    fn expand_selected(&mut self) -> Vec<Command> {
        let Some(id) = self.tree_view.selected() else {
            return Vec::new();
        };
        let Some(node) = self.tree.get(id) else {
            return Vec::new();
        };
        if node.kind == NodeKind::Column {
            return Vec::new();
        }
        if node.expanded {
            if let Some(&first) = node.children.first() {
                self.tree_view.select(first);
            }
            return Vec::new();
        }
        if node.children.is_empty() && node.loaded {
            return Vec::new();
        }
        self.tree.set_expanded(id, true);
        self.load_if_needed(id)
    }

    /// `h`: collapse, or step out to the parent of a collapsed node
    fn collapse_selected(&mut self) {
        let Some(id) = self.tree_view.selected() else {
            return;
        };
        let Some(node) = self.tree.get(id) else {
            return;
        };
        let (expanded, parent) = (node.expanded, node.parent);
        if expanded {
            self.tree.set_expanded(id, false);
        } else if let Some(parent) = parent
            && parent != self.tree.root()
        {
            self.tree_view.select(parent);
        }
    }

    /// `R`: reload the children of the node under the cursor
    fn refresh_selected(&mut self) -> Vec<Command> {
        let Some(id) = self.tree_view.selected() else {
            return Vec::new();
        };
        let Some(kind) = self.tree.get(id).map(|n| n.kind) else {
            return Vec::new();
        };
        match kind {
            NodeKind::Database => self.refresh_tree(),
            kind if kind == NodeKind::Schema || kind.is_relation() => {
                self.tree.set_expanded(id, true);
                self.children_command(id, LoadMode::Replace)
            }
            _ => {
                self.set_status("Nothing to reload here", StatusLevel::Info);
                Vec::new()
            }
        }
    }

    fn refresh_tree(&mut self) -> Vec<Command> {
        let Some(connection) = self.connection_id() else {
            self.set_status("Not connected", StatusLevel::Warning);
            return Vec::new();
        };
        self.set_status("Reloading schema...", StatusLevel::Info);
        vec![Command::LoadTree(connection)]
    }

    // ── Data panel ───────────────────────────────────────────

    fn data_page_rows(&self) -> usize {
        data_panel::visible_rows(panel_inner(self.layout().data)).max(1)
    }

    fn data_action(&mut self, action: KeyAction) -> Vec<Command> {
        match action {
            KeyAction::Dismiss => {
                self.search = None;
                self.details = None;
                self.data_view = DataView::Browse;
                return Vec::new();
            }
            KeyAction::SwitchDataView => {
                self.data_view = match self.data_view {
                    DataView::Results => DataView::Browse,
                    _ => DataView::Results,
                };
                return Vec::new();
            }
            KeyAction::OpenFilter => return self.open_filter_dialog(),
            KeyAction::ClearFilter => return self.clear_filter(),
            KeyAction::OpenSearch => {
                self.open_search_dialog();
                return Vec::new();
            }
            KeyAction::OpenCellViewer => {
                self.open_cell_viewer();
                return Vec::new();
            }
            _ => {}
        }

        let page = self.data_page_rows();
        match self.data_view {
            DataView::Browse => return self.browse_action(action, page),
            DataView::Results => {
                let tab = self.tabs.active_mut();
                let (rows, cols) = tab
                    .results()
                    .map_or((0, 0), |r| (r.rows.len(), r.columns.len()));
                step_grid(action, page, rows, cols, &mut tab.selected_row, &mut tab.selected_col);
            }
            DataView::Search => {
                if let Some(search) = self.search.as_mut() {
                    let (rows, cols) = search
                        .page
                        .as_ref()
                        .map_or((0, 0), |p| (p.rows.len(), p.columns.len()));
                    step_grid(
                        action,
                        page,
                        rows,
                        cols,
                        &mut search.selected_row,
                        &mut search.selected_col,
                    );
                }
            }
            DataView::Definition => {
                if let Some(details) = self.details.as_mut() {
                    let lines = details.text.as_deref().map_or(0, |t| t.lines().count());
                    let mut unused = 0;
                    step_grid(action, page, lines, 0, &mut details.scroll, &mut unused);
                }
            }
        }
        Vec::new()
    }

    fn browse_action(&mut self, action: KeyAction, page: usize) -> Vec<Command> {
        let p = &mut self.pagination;
        let reload = match action {
            KeyAction::MoveDown => {
                p.move_down();
                None
            }
            KeyAction::MoveUp => {
                p.move_up();
                None
            }
            KeyAction::MoveLeft => {
                p.move_left();
                None
            }
            KeyAction::MoveRight => {
                p.move_right();
                None
            }
            KeyAction::PageDown => {
                p.page_down(page);
                None
            }
            KeyAction::PageUp => {
                p.page_up(page);
                None
            }
            KeyAction::GoToTop => {
                p.go_to_top();
                None
            }
            KeyAction::GoToBottom => {
                p.go_to_bottom();
                None
            }
            KeyAction::Home => {
                p.selected_col = 0;
                None
            }
            KeyAction::End => {
                p.selected_col = p.columns.len().saturating_sub(1);
                None
            }
            KeyAction::CycleSort => p.cycle_sort(),
            KeyAction::ToggleNullsFirst => p.toggle_nulls_first(),
            KeyAction::ReverseSort => p.reverse_sort(),
            _ => None,
        };
        match reload.or_else(|| self.pagination.prefetch()) {
            Some(request) => self.page_command(request),
            None => Vec::new(),
        }
    }

    fn open_cell_viewer(&mut self) {
        let cell = match self.data_view {
            DataView::Browse => self
                .pagination
                .selected_cell()
                .map(|(column, value)| (column.clone(), value.clone())),
            DataView::Results => {
                let tab = self.tabs.active();
                tab.results().and_then(|r| {
                    cell_at(&r.columns, &r.rows, tab.selected_row, tab.selected_col)
                })
            }
            DataView::Search => self.search.as_ref().and_then(|s| {
                let page = s.page.as_ref()?;
                cell_at(&page.columns, &page.rows, s.selected_row, s.selected_col)
            }),
            DataView::Definition => None,
        };
        if let Some((column, value)) = cell {
            self.json_viewer.show(&column, &value);
        }
    }

    fn browsed_table(&mut self) -> Option<(String, String)> {
        match self.pagination.current_table() {
            Some((schema, table)) => Some((schema.to_string(), table.to_string())),
            None => {
                self.set_status("Open a table or view first", StatusLevel::Warning);
                None
            }
        }
    }

    fn open_filter_dialog(&mut self) -> Vec<Command> {
        let Some((schema, table)) = self.browsed_table() else {
            return Vec::new();
        };
        self.filter_dialog.show(
            &schema,
            &table,
            &self.pagination.columns,
            self.pagination.filter(),
        );
        Vec::new()
    }

    /// Validate `filter` against the browsed relation and reload with it
    pub fn set_filter(&mut self, filter: Filter) -> FilterResult<Vec<Command>> {
        filter.validate()?;
        let matches = self
            .pagination
            .current_table()
            .is_some_and(|(schema, table)| schema == filter.schema && table == filter.table);
        if !matches {
            return Err(FilterError::WrongTable(format!(
                "{}.{}",
                filter.schema, filter.table
            )));
        }
        Ok(self.apply_filter(Some(filter)))
    }

    fn apply_filter(&mut self, filter: Option<Filter>) -> Vec<Command> {
        let cleared = filter.is_none();
        self.search = None;
        self.details = None;
        self.data_view = DataView::Browse;
        let Some(request) = self.pagination.set_filter(filter) else {
            return Vec::new();
        };
        self.set_status(
            if cleared { "Filter cleared" } else { "Filter applied" },
            StatusLevel::Info,
        );
        self.page_command(request)
    }

    fn clear_filter(&mut self) -> Vec<Command> {
        if self.pagination.filter().is_none() {
            return Vec::new();
        }
        self.apply_filter(None)
    }

    fn filter_from_text(&mut self, text: &str) -> Vec<Command> {
        let Some((schema, table)) = self.browsed_table() else {
            return Vec::new();
        };
        match build_filter(&schema, &table, &self.pagination.columns, text) {
            Ok(filter) => self.apply_filter(filter),
            Err(message) => {
                self.set_status(message, StatusLevel::Error);
                Vec::new()
            }
        }
    }

    fn open_search_dialog(&mut self) {
        let Some((schema, table)) = self.browsed_table() else {
            return;
        };
        let previous = self.search.as_ref().map(|s| s.request.needle.as_str());
        self.search_dialog.show(&schema, &table, previous);
    }

    /// Search the text columns of the browsed relation (whole rows when it
    /// has none)
    fn start_search(&mut self, needle: String) -> Vec<Command> {
        let Some(connection) = self.connection_id() else {
            self.set_status("Not connected", StatusLevel::Warning);
            return Vec::new();
        };
        let Some((schema, table)) = self.browsed_table() else {
            return Vec::new();
        };
        let columns = self
            .pagination
            .columns
            .iter()
            .filter(|c| c.data_type.category() == TypeCategory::Text)
            .map(|c| c.name.clone())
            .collect();
        let request = SearchRequest {
            schema,
            table,
            columns,
            needle,
            limit: self.settings.search_limit,
        };
        self.search = Some(SearchState {
            request: request.clone(),
            page: None,
            selected_row: 0,
            selected_col: 0,
        });
        self.details = None;
        self.data_view = DataView::Search;
        vec![Command::SearchTable {
            connection,
            request,
        }]
    }

    // ── Queries and tabs ─────────────────────────────────────

    fn execute_query(&mut self) -> Vec<Command> {
        let sql = self.editor.content().trim().to_string();
        if sql.is_empty() {
            self.set_status("Nothing to execute", StatusLevel::Warning);
            return Vec::new();
        }
        let Some(connection) = self.connection_id() else {
            self.set_status("Not connected", StatusLevel::Warning);
            return Vec::new();
        };
        let token = QueryToken::new(self.next_token_id);
        self.next_token_id += 1;
        let tab_id = self.tabs.active().id;
        if let Some(superseded) = self.tabs.begin(tab_id, sql.clone(), token.clone()) {
            debug!(tab_id, token = superseded.id, "superseded running query");
        }
        self.data_view = DataView::Results;
        self.history_cursor = None;
        vec![Command::ExecuteQuery {
            connection,
            tab_id,
            sql,
            token,
        }]
    }

    fn cancel_query(&mut self) {
        let tab_id = self.tabs.active().id;
        if self.tabs.cancel(tab_id) {
            self.set_status("Query cancelled", StatusLevel::Warning);
        } else {
            self.set_status("No query running", StatusLevel::Info);
        }
    }

    fn new_tab(&mut self) {
        if self.tabs.new_tab() {
            self.data_view = DataView::Results;
        } else {
            self.set_status(
                format!("Maximum of {} tabs reached", self.tabs.max_tabs()),
                StatusLevel::Warning,
            );
        }
    }

    fn close_tab(&mut self) {
        match self.tabs.close_active() {
            Ok(()) => {}
            Err(CloseRefused::QueryRunning) => self.set_status(
                "Cancel the running query before closing its tab",
                StatusLevel::Warning,
            ),
            Err(CloseRefused::LastTab) => {
                self.set_status("Cannot close the last tab", StatusLevel::Warning)
            }
        }
    }

    /// Ctrl+Up walks to older queries, Ctrl+Down back towards an empty editor
    fn recall_history(&mut self, older: bool) {
        if self.history.is_empty() {
            self.set_status("No query history", StatusLevel::Info);
            return;
        }
        let last = self.history.len() - 1;
        let next = match (self.history_cursor, older) {
            (None, true) => Some(0),
            (Some(i), true) => Some((i + 1).min(last)),
            (None, false) | (Some(0), false) => None,
            (Some(i), false) => Some(i - 1),
        };
        self.history_cursor = next;
        match next {
            Some(i) => self.editor.set_content(&self.history[i].query),
            None => self.editor.clear(),
        }
    }

    fn save_favorite(&mut self, name: String) -> Vec<Command> {
        let query = self.editor.content().trim().to_string();
        if query.is_empty() {
            self.set_status("The editor is empty", StatusLevel::Warning);
            return Vec::new();
        }
        let database = self.connection.as_ref().map(|c| c.config.database.clone());
        vec![Command::SaveFavorite {
            name,
            query,
            database,
        }]
    }

    fn disconnect(&mut self) -> Vec<Command> {
        let Some(active) = self.connection.take() else {
            self.set_status("Not connected", StatusLevel::Info);
            return Vec::new();
        };
        self.reset_session();
        self.set_status(format!("Disconnected from {}", active.config.name), StatusLevel::Info);
        vec![Command::Disconnect(active.id)]
    }

    fn run_palette_command(&mut self, command: PaletteCommand) -> Vec<Command> {
        debug!(?command, "palette command");
        match command {
            PaletteCommand::Connect(None) => self.open_connection_dialog(),
            PaletteCommand::Connect(Some(url)) => match ConnectionConfig::from_url(&url) {
                Ok(config) => {
                    self.set_status(format!("Connecting to {}...", config.name), StatusLevel::Info);
                    vec![Command::Connect(config)]
                }
                Err(e) => {
                    self.set_status(e.to_string(), StatusLevel::Error);
                    Vec::new()
                }
            },
            PaletteCommand::Disconnect => self.disconnect(),
            PaletteCommand::Refresh => match self.tree_view.selected() {
                Some(_) => self.refresh_selected(),
                None => self.refresh_tree(),
            },
            PaletteCommand::Filter(None) => self.open_filter_dialog(),
            PaletteCommand::Filter(Some(text)) => self.filter_from_text(&text),
            PaletteCommand::ClearFilter => self.clear_filter(),
            PaletteCommand::Search(None) => {
                self.open_search_dialog();
                Vec::new()
            }
            PaletteCommand::Search(Some(needle)) => self.start_search(needle),
            PaletteCommand::Favorites => self.open_favorites(),
            PaletteCommand::Save(name) => self.save_favorite(name),
            PaletteCommand::History => {
                self.history_cursor = None;
                self.recall_history(true);
                Vec::new()
            }
            PaletteCommand::NewTab => {
                self.new_tab();
                Vec::new()
            }
            PaletteCommand::CloseTab => {
                self.close_tab();
                Vec::new()
            }
            PaletteCommand::Discover => {
                let mut commands = self.open_connection_dialog();
                self.connection_dialog.set_scanning();
                commands.push(Command::Discover);
                commands
            }
            PaletteCommand::Clear => {
                self.editor.clear();
                self.history_cursor = None;
                Vec::new()
            }
            PaletteCommand::Help => {
                self.view_mode = ViewMode::Help;
                self.help_scroll = 0;
                Vec::new()
            }
            PaletteCommand::Quit => self.quit(),
        }
    }
}

/// Move a grid cursor over `rows` x `cols`
fn step_grid(
    action: KeyAction,
    page: usize,
    rows: usize,
    cols: usize,
    row: &mut usize,
    col: &mut usize,
) {
    let last_row = rows.saturating_sub(1);
    let last_col = cols.saturating_sub(1);
    match action {
        KeyAction::MoveDown => *row = (*row + 1).min(last_row),
        KeyAction::MoveUp => *row = row.saturating_sub(1),
        KeyAction::MoveRight => *col = (*col + 1).min(last_col),
        KeyAction::MoveLeft => *col = col.saturating_sub(1),
        KeyAction::PageDown => *row = (*row + page).min(last_row),
        KeyAction::PageUp => *row = row.saturating_sub(page),
        KeyAction::GoToTop => *row = 0,
        KeyAction::GoToBottom => *row = last_row,
        KeyAction::Home => *col = 0,
        KeyAction::End => *col = last_col,
        _ => {}
    }
}

fn cell_at(
    columns: &[ColumnDef],
    rows: &[Row],
    row: usize,
    col: usize,
) -> Option<(ColumnDef, CellValue)> {
    let column = columns.get(col)?;
    let value = rows.get(row)?.values.get(col)?;
    Some((column.clone(), value.clone()))
}
