//! Events consumed by the controller
//!
//! Input events come from the terminal reader task; every other variant is
//! the single result of one executor [`Command`](crate::executor::Command).

use crate::config::ConnectionConfig;
use crate::db::{ObjectRef, PageData, PageRequest, QueryResults, SearchRequest};
use crate::error::{DbResult, StoreResult};
use crate::executor::{ConnectionId, DiscoveredInstance, FavoriteChange};
use crate::store::{Favorite, HistoryEntry, RecentConnection};
use crate::tree::{NavigationTree, NodeSpec};
use crossterm::event::{KeyEvent, MouseEvent};

#[derive(Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Resize(u16, u16),
    /// Bracketed paste
    Paste(String),

    DiscoveryComplete(Vec<DiscoveredInstance>),
    ConnectResult {
        config: ConnectionConfig,
        result: DbResult<ConnectionId>,
    },
    TreeLoaded {
        connection: ConnectionId,
        result: DbResult<NavigationTree>,
    },
    ChildrenLoaded {
        /// Tree generation the load was issued against
        generation: u64,
        node_key: String,
        result: DbResult<Vec<NodeSpec>>,
    },
    PageLoaded {
        request: PageRequest,
        result: DbResult<PageData>,
    },
    QueryResult {
        tab_id: usize,
        token_id: u64,
        result: DbResult<QueryResults>,
    },
    SearchResult {
        request: SearchRequest,
        result: DbResult<PageData>,
    },
    ObjectDetailsLoaded {
        target: ObjectRef,
        result: DbResult<String>,
    },
    FavoriteMutated(StoreResult<FavoriteChange>),
    FavoritesLoaded(StoreResult<Vec<Favorite>>),
    RecentConnectionsLoaded(StoreResult<Vec<RecentConnection>>),
    HistoryRecorded(StoreResult<()>),
    HistoryLoaded(StoreResult<Vec<HistoryEntry>>),
    Disconnected(ConnectionId),
    ConnectionLost {
        connection: ConnectionId,
        message: String,
    },
}
