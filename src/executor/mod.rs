//! Async command executor
//!
//! The controller never performs IO. It returns [`Command`] values; the
//! executor runs each one on its own tokio task and reports back with
//! exactly one [`AppEvent`] on the controller's channel. Store commands run
//! on the blocking pool.

pub mod discovery;

pub use discovery::{DiscoveredInstance, Discoverer, TcpDiscoverer};

use crate::app::AppEvent;
use crate::config::{ConnectionConfig, Settings};
use crate::db::{
    CatalogObject, Connector, Database, ObjectKind, ObjectRef, PageRequest, SearchRequest,
};
use crate::error::{DbError, DbResult, StoreError, StoreResult};
use crate::store::{Favorite, HistoryEntry, Stores};
use crate::tree::{NodeKind, NodeSpec, catalog};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub type ConnectionId = u64;

/// Identity plus cancel handle of one running query
#[derive(Debug, Clone)]
pub struct QueryToken {
    pub id: u64,
    pub cancel: CancellationToken,
}

impl QueryToken {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            cancel: CancellationToken::new(),
        }
    }
}

/// What a lazy child load should list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildTarget {
    /// Object groups of a schema
    Schema { schema: String },
    /// Columns (plus indexes and triggers) of a relation
    Relation {
        schema: String,
        relation: String,
        kind: NodeKind,
    },
}

/// Outcome of a favorites write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FavoriteChange {
    Saved(Favorite),
    Updated(Favorite),
    Deleted(String),
}

/// One deferred operation and the data needed to perform it
#[derive(Debug, Clone)]
pub enum Command {
    Discover,
    Connect(ConnectionConfig),
    Disconnect(ConnectionId),
    LoadTree(ConnectionId),
    LoadChildren {
        connection: ConnectionId,
        generation: u64,
        node_key: String,
        target: ChildTarget,
    },
    LoadPage {
        connection: ConnectionId,
        request: PageRequest,
    },
    LoadPageFiltered {
        connection: ConnectionId,
        request: PageRequest,
    },
    ExecuteQuery {
        connection: ConnectionId,
        tab_id: usize,
        sql: String,
        token: QueryToken,
    },
    SearchTable {
        connection: ConnectionId,
        request: SearchRequest,
    },
    LoadObjectDetails {
        connection: ConnectionId,
        target: ObjectRef,
    },
    RecordHistory(HistoryEntry),
    LoadHistory {
        limit: usize,
    },
    SaveFavorite {
        name: String,
        query: String,
        database: Option<String>,
    },
    /// Rename a favorite and/or replace its query
    UpdateFavorite {
        id: String,
        name: String,
        query: String,
    },
    DeleteFavorite {
        id: String,
    },
    ListFavorites,
    /// Remember a successful connection target (and its password)
    RecordConnection(ConnectionConfig),
    LoadRecentConnections,
}

impl Command {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Command::Discover => "discover",
            Command::Connect(_) => "connect",
            Command::Disconnect(_) => "disconnect",
            Command::LoadTree(_) => "load_tree",
            Command::LoadChildren { .. } => "load_children",
            Command::LoadPage { .. } => "load_page",
            Command::LoadPageFiltered { .. } => "load_page_filtered",
            Command::ExecuteQuery { .. } => "execute_query",
            Command::SearchTable { .. } => "search_table",
            Command::LoadObjectDetails { .. } => "load_object_details",
            Command::RecordHistory(_) => "record_history",
            Command::LoadHistory { .. } => "load_history",
            Command::SaveFavorite { .. } => "save_favorite",
            Command::UpdateFavorite { .. } => "update_favorite",
            Command::DeleteFavorite { .. } => "delete_favorite",
            Command::ListFavorites => "list_favorites",
            Command::RecordConnection(_) => "record_connection",
            Command::LoadRecentConnections => "load_recent_connections",
        }
    }
}

/// Live connections, shared read-only by command tasks
#[derive(Default)]
pub struct ConnectionPool {
    connections: RwLock<HashMap<ConnectionId, Arc<dyn Database>>>,
    next_id: AtomicU64,
}

impl ConnectionPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, db: Arc<dyn Database>) -> ConnectionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let mut connections = self.connections.write().unwrap_or_else(|e| e.into_inner());
        connections.insert(id, db);
        id
    }

    pub fn get(&self, id: ConnectionId) -> DbResult<Arc<dyn Database>> {
        let connections = self.connections.read().unwrap_or_else(|e| e.into_inner());
        connections.get(&id).cloned().ok_or(DbError::NotConnected)
    }

    pub fn remove(&self, id: ConnectionId) -> bool {
        let mut connections = self.connections.write().unwrap_or_else(|e| e.into_inner());
        connections.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        let connections = self.connections.read().unwrap_or_else(|e| e.into_inner());
        connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone)]
pub struct Executor {
    tx: mpsc::UnboundedSender<AppEvent>,
    pool: Arc<ConnectionPool>,
    connector: Arc<dyn Connector>,
    discoverer: Arc<dyn Discoverer>,
    stores: Arc<Stores>,
    discovery_timeout: Duration,
    connect_timeout: Duration,
}

impl Executor {
    pub fn new(
        tx: mpsc::UnboundedSender<AppEvent>,
        connector: Arc<dyn Connector>,
        discoverer: Arc<dyn Discoverer>,
        stores: Arc<Stores>,
        settings: &Settings,
    ) -> Self {
        Self {
            tx,
            pool: Arc::new(ConnectionPool::new()),
            connector,
            discoverer,
            stores,
            discovery_timeout: settings.discovery_timeout(),
            connect_timeout: settings.connect_timeout(),
        }
    }

    pub fn pool(&self) -> &Arc<ConnectionPool> {
        &self.pool
    }

    /// Run `command` on its own task; its result event lands on the channel
    pub fn execute(&self, command: Command) -> JoinHandle<()> {
        debug!(command = command.name(), "dispatching");
        let this = self.clone();
        tokio::spawn(async move {
            let event = this.run(command).await;
            if this.tx.send(event).is_err() {
                debug!("event channel closed; dropping result");
            }
        })
    }

    pub fn execute_all(&self, commands: Vec<Command>) {
        for command in commands {
            self.execute(command);
        }
    }

    async fn run(&self, command: Command) -> AppEvent {
        match command {
            Command::Discover => AppEvent::DiscoveryComplete(self.discover().await),
            Command::Connect(config) => {
                let result = self.connect(&config).await;
                AppEvent::ConnectResult { config, result }
            }
            Command::Disconnect(connection) => {
                if self.pool.remove(connection) {
                    info!(connection, "disconnected");
                }
                AppEvent::Disconnected(connection)
            }
            Command::LoadTree(connection) => AppEvent::TreeLoaded {
                connection,
                result: self.load_tree(connection).await,
            },
            Command::LoadChildren {
                connection,
                generation,
                node_key,
                target,
            } => AppEvent::ChildrenLoaded {
                generation,
                result: self.load_children(connection, &target).await,
                node_key,
            },
            Command::LoadPage {
                connection,
                request,
            }
            | Command::LoadPageFiltered {
                connection,
                request,
            } => {
                let result = match self.pool.get(connection) {
                    Ok(db) => db.load_page(&request).await,
                    Err(e) => Err(e),
                };
                AppEvent::PageLoaded { request, result }
            }
            Command::ExecuteQuery {
                connection,
                tab_id,
                sql,
                token,
            } => {
                let result = self.execute_query(connection, &sql, &token).await;
                AppEvent::QueryResult {
                    tab_id,
                    token_id: token.id,
                    result,
                }
            }
            Command::SearchTable {
                connection,
                request,
            } => {
                let result = match self.pool.get(connection) {
                    Ok(db) => db.search_table(&request).await,
                    Err(e) => Err(e),
                };
                AppEvent::SearchResult { request, result }
            }
            Command::LoadObjectDetails { connection, target } => {
                let result = match self.pool.get(connection) {
                    Ok(db) => db.object_definition(&target).await,
                    Err(e) => Err(e),
                };
                AppEvent::ObjectDetailsLoaded { target, result }
            }
            Command::RecordHistory(entry) => {
                let stores = self.stores.clone();
                AppEvent::HistoryRecorded(
                    blocking(move || stores.history.record(&entry)).await,
                )
            }
            Command::LoadHistory { limit } => {
                let stores = self.stores.clone();
                AppEvent::HistoryLoaded(blocking(move || stores.history.recent(limit)).await)
            }
            Command::SaveFavorite {
                name,
                query,
                database,
            } => {
                let stores = self.stores.clone();
                let result = blocking(move || {
                    stores
                        .favorites
                        .add(&name, &query, database.as_deref())
                        .map(FavoriteChange::Saved)
                })
                .await;
                AppEvent::FavoriteMutated(result)
            }
            Command::UpdateFavorite { id, name, query } => {
                let stores = self.stores.clone();
                let result = blocking(move || {
                    stores
                        .favorites
                        .update(&id, &name, &query)
                        .map(FavoriteChange::Updated)
                })
                .await;
                AppEvent::FavoriteMutated(result)
            }
            Command::DeleteFavorite { id } => {
                let stores = self.stores.clone();
                let result = blocking(move || {
                    stores
                        .favorites
                        .delete(&id)
                        .map(|()| FavoriteChange::Deleted(id))
                })
                .await;
                AppEvent::FavoriteMutated(result)
            }
            Command::ListFavorites => {
                let stores = self.stores.clone();
                AppEvent::FavoritesLoaded(blocking(move || stores.favorites.list()).await)
            }
            Command::RecordConnection(config) => {
                let stores = self.stores.clone();
                let result = blocking(move || {
                    if let Some(password) = &config.password
                        && let Err(e) = stores.secrets.set(&config.secret_key(), password)
                    {
                        warn!(error = %e, "could not store password");
                    }
                    stores.connections.record(&config).map(|_| ())
                })
                .await;
                if let Err(e) = &result {
                    warn!(error = %e, "could not record connection");
                }
                let stores = self.stores.clone();
                AppEvent::RecentConnectionsLoaded(
                    blocking(move || stores.connections.list()).await,
                )
            }
            Command::LoadRecentConnections => {
                let stores = self.stores.clone();
                AppEvent::RecentConnectionsLoaded(
                    blocking(move || stores.connections.list()).await,
                )
            }
        }
    }

    async fn discover(&self) -> Vec<DiscoveredInstance> {
        match tokio::time::timeout(self.discovery_timeout, self.discoverer.discover()).await {
            Ok(found) => {
                info!(count = found.len(), "discovery finished");
                found
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.discovery_timeout.as_millis() as u64,
                    "discovery timed out"
                );
                Vec::new()
            }
        }
    }

    async fn connect(&self, config: &ConnectionConfig) -> DbResult<ConnectionId> {
        let mut config = config.clone();
        if config.password.is_none() {
            config.password = self.stored_password(&config).await;
        }

        let attempt = tokio::time::timeout(self.connect_timeout, self.connector.connect(&config));
        let (db, mut lost) = match attempt.await {
            Ok(result) => result?,
            Err(_) => {
                let ms = self.connect_timeout.as_millis() as u64;
                warn!(host = %config.host, port = config.port, timeout_ms = ms, "connect timed out");
                return Err(DbError::Timeout(ms));
            }
        };

        let id = self.pool.insert(db);
        info!(
            connection = id,
            host = %config.host,
            database = %config.database,
            "connected"
        );

        let tx = self.tx.clone();
        tokio::spawn(async move {
            if let Some(message) = lost.recv().await {
                warn!(connection = id, %message, "connection lost");
                let _ = tx.send(AppEvent::ConnectionLost {
                    connection: id,
                    message,
                });
            }
        });
        Ok(id)
    }

    async fn stored_password(&self, config: &ConnectionConfig) -> Option<String> {
        let stores = self.stores.clone();
        let key = config.secret_key();
        match blocking(move || stores.secrets.get(&key)).await {
            Ok(password) => password,
            Err(e) => {
                warn!(error = %e, "secret store lookup failed");
                None
            }
        }
    }

    async fn load_tree(&self, connection: ConnectionId) -> DbResult<crate::tree::NavigationTree> {
        let db = self.pool.get(connection)?;
        let schemas = db.list_schemas().await?;
        Ok(catalog::build_tree(db.database_name(), &schemas))
    }

    async fn load_children(
        &self,
        connection: ConnectionId,
        target: &ChildTarget,
    ) -> DbResult<Vec<NodeSpec>> {
        let db = self.pool.get(connection)?;
        let database = db.database_name().to_string();
        match target {
            ChildTarget::Schema { schema } => {
                let listings = ObjectKind::SCHEMA_GROUPS.iter().map(|&kind| {
                    let db = db.clone();
                    async move { (kind, db.list_objects(schema, kind).await) }
                });
                let groups = futures::future::join_all(listings)
                    .await
                    .into_iter()
                    .filter_map(|(kind, result)| listed(schema, kind, result).map(|o| (kind, o)))
                    .collect();
                Ok(catalog::schema_children(&database, schema, groups))
            }
            ChildTarget::Relation {
                schema,
                relation,
                kind,
            } => {
                let columns = db.list_columns(schema, relation).await?;
                let indexes = if matches!(kind, NodeKind::Table | NodeKind::MaterializedView) {
                    listed(schema, ObjectKind::Index, db.list_indexes(schema, relation).await)
                        .unwrap_or_default()
                } else {
                    Vec::new()
                };
                let triggers = if *kind == NodeKind::Table {
                    listed(schema, ObjectKind::Trigger, db.list_triggers(schema, relation).await)
                        .unwrap_or_default()
                } else {
                    Vec::new()
                };
                Ok(catalog::relation_children(
                    &database, schema, relation, columns, indexes, triggers,
                ))
            }
        }
    }

    /// Run `sql` on a session of its own so a cancel reaches only this query
    async fn execute_query(
        &self,
        connection: ConnectionId,
        sql: &str,
        token: &QueryToken,
    ) -> DbResult<crate::db::QueryResults> {
        let db = self.pool.get(connection)?;
        let session = tokio::select! {
            biased;
            _ = token.cancel.cancelled() => {
                debug!(token = token.id, "query cancelled before it started");
                return Err(DbError::Cancelled);
            }
            session = db.open_session() => session?,
        };
        tokio::select! {
            biased;
            _ = token.cancel.cancelled() => {
                debug!(token = token.id, "query cancelled");
                if let Err(e) = session.cancel().await {
                    warn!(error = %e, "server-side cancel failed");
                }
                Err(DbError::Cancelled)
            }
            result = session.execute_query(sql) => result,
        }
    }
}

/// A failed sub-listing is logged and its group left out
fn listed(
    schema: &str,
    kind: ObjectKind,
    result: DbResult<Vec<CatalogObject>>,
) -> Option<Vec<CatalogObject>> {
    match result {
        Ok(objects) => Some(objects),
        Err(e) => {
            warn!(schema, group = kind.group_label(), error = %e, "listing failed; group omitted");
            None
        }
    }
}

async fn blocking<T, F>(f: F) -> StoreResult<T>
where
    F: FnOnce() -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result,
        Err(e) => Err(StoreError::Io(std::io::Error::other(e.to_string()))),
    }
}
