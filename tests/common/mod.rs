//! Common test utilities and helpers
//!
//! An in-memory database and connector so the controller and the executor
//! can be driven end to end without a server, plus the configuration for
//! the optional live PostgreSQL tests.

#![allow(dead_code)]

use async_trait::async_trait;
use pgnav::app::{App, AppEvent};
use pgnav::config::{ConnectionConfig, Settings, SslMode};
use pgnav::db::{
    CatalogObject, CellValue, ColumnDef, ColumnInfo, Connected, Connector, DataType, Database,
    ObjectKind, ObjectRef, PageData, PageRequest, QueryResults, QuerySession, Row, SearchRequest,
};
use pgnav::error::{DbError, DbResult};
use pgnav::executor::{Command, DiscoveredInstance, Discoverer, Executor};
use pgnav::store::{MemorySecrets, Stores};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;

/// Rows in the fake `public.users` table
pub const USERS: usize = 250;

/// `public.users(id integer, name text)` with [`USERS`] rows, a view and a
/// function. Every page request is recorded.
#[derive(Default)]
pub struct FakeDatabase {
    pub requests: Mutex<Vec<PageRequest>>,
    pub query_delay: Option<Duration>,
}

fn users_columns() -> Vec<ColumnDef> {
    vec![
        ColumnDef::new("id", DataType::Integer),
        ColumnDef::new("name", DataType::Text),
    ]
}

fn user_row(i: usize) -> Row {
    Row {
        values: vec![CellValue::Integer(i as i64), CellValue::Text(format!("user{}", i))],
    }
}

#[async_trait]
impl Database for FakeDatabase {
    fn database_name(&self) -> &str {
        "app"
    }

    async fn list_schemas(&self) -> DbResult<Vec<String>> {
        Ok(vec!["public".to_string()])
    }

    async fn list_objects(&self, _schema: &str, kind: ObjectKind) -> DbResult<Vec<CatalogObject>> {
        Ok(match kind {
            ObjectKind::Table => vec![CatalogObject::new("users", kind)],
            ObjectKind::View => vec![CatalogObject::new("active_users", kind)],
            ObjectKind::Function => vec![CatalogObject::new("touch", kind).with_detail("integer")],
            _ => Vec::new(),
        })
    }

    async fn list_columns(&self, _schema: &str, _relation: &str) -> DbResult<Vec<ColumnInfo>> {
        let mut id = ColumnInfo::new("id", "integer");
        id.is_primary_key = true;
        id.nullable = false;
        Ok(vec![id, ColumnInfo::new("name", "text")])
    }

    async fn list_indexes(&self, _schema: &str, _table: &str) -> DbResult<Vec<CatalogObject>> {
        Ok(vec![CatalogObject::new("users_pkey", ObjectKind::Index)])
    }

    async fn list_triggers(&self, _schema: &str, _table: &str) -> DbResult<Vec<CatalogObject>> {
        Ok(Vec::new())
    }

    async fn load_page(&self, request: &PageRequest) -> DbResult<PageData> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        if request.table != "users" {
            return Err(DbError::QueryFailed(format!(
                "relation \"{}\" does not exist",
                request.table
            )));
        }
        let end = (request.offset + request.limit).min(USERS);
        Ok(PageData {
            schema: request.schema.clone(),
            table: request.table.clone(),
            columns: users_columns(),
            rows: (request.offset..end).map(user_row).collect(),
            total_rows: USERS,
            offset: request.offset,
        })
    }

    async fn execute_query(&self, sql: &str) -> DbResult<QueryResults> {
        run_fake_query(sql, self.query_delay).await
    }

    async fn open_session(&self) -> DbResult<Box<dyn QuerySession>> {
        Ok(Box::new(FakeSession {
            query_delay: self.query_delay,
        }))
    }

    async fn search_table(&self, request: &SearchRequest) -> DbResult<PageData> {
        let rows: Vec<Row> = (0..USERS)
            .map(user_row)
            .filter(|row| {
                row.values
                    .iter()
                    .any(|v| v.to_plain_string().contains(&request.needle))
            })
            .take(request.limit)
            .collect();
        Ok(PageData {
            schema: request.schema.clone(),
            table: request.table.clone(),
            columns: users_columns(),
            total_rows: rows.len(),
            rows,
            offset: 0,
        })
    }

    async fn object_definition(&self, target: &ObjectRef) -> DbResult<String> {
        Ok(format!(
            "CREATE FUNCTION {}.{}({}) RETURNS void",
            target.schema,
            target.name,
            target.arguments.as_deref().unwrap_or_default()
        ))
    }
}

/// `SELECT 1` for anything except statements starting with `selec `
async fn run_fake_query(sql: &str, delay: Option<Duration>) -> DbResult<QueryResults> {
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    if sql.to_lowercase().starts_with("selec ") {
        return Err(DbError::QueryFailed("syntax error at or near \"selec\"".into()));
    }
    Ok(QueryResults::new(
        vec![ColumnDef::new("?column?", DataType::Integer)],
        vec![Row {
            values: vec![CellValue::Integer(1)],
        }],
        Duration::from_millis(1),
        1,
    ))
}

struct FakeSession {
    query_delay: Option<Duration>,
}

#[async_trait]
impl QuerySession for FakeSession {
    async fn execute_query(&self, sql: &str) -> DbResult<QueryResults> {
        run_fake_query(sql, self.query_delay).await
    }

    async fn cancel(&self) -> DbResult<()> {
        Ok(())
    }
}

/// Hands out one shared [`FakeDatabase`]; refuses hosts named `down`
pub struct FakeConnector {
    pub db: Arc<FakeDatabase>,
    /// Senders of the connection-lost channels, kept so they stay open
    lost: Mutex<Vec<mpsc::UnboundedSender<String>>>,
}

impl FakeConnector {
    pub fn new(db: FakeDatabase) -> Self {
        Self {
            db: Arc::new(db),
            lost: Mutex::new(Vec::new()),
        }
    }

    /// Report the most recent connection as lost
    pub fn drop_connection(&self, message: &str) {
        if let Ok(lost) = self.lost.lock()
            && let Some(tx) = lost.last()
        {
            let _ = tx.send(message.to_string());
        }
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, config: &ConnectionConfig) -> DbResult<Connected> {
        if config.host == "down" {
            return Err(DbError::ConnectionFailed("connection refused".into()));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        if let Ok(mut lost) = self.lost.lock() {
            lost.push(tx);
        }
        let db: Arc<dyn Database> = self.db.clone();
        Ok((db, rx))
    }
}

pub struct NoDiscovery;

#[async_trait]
impl Discoverer for NoDiscovery {
    async fn discover(&self) -> Vec<DiscoveredInstance> {
        Vec::new()
    }
}

/// Controller wired to a real executor over the fake database
pub struct Harness {
    pub app: App,
    pub executor: Executor,
    pub rx: mpsc::UnboundedReceiver<AppEvent>,
    pub connector: Arc<FakeConnector>,
    pub dir: TempDir,
}

impl Harness {
    pub fn new(db: FakeDatabase) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::default();
        let (tx, rx) = mpsc::unbounded_channel();
        let stores = Arc::new(Stores::open(
            dir.path(),
            settings.history_size,
            Arc::new(MemorySecrets::new()),
        ));
        let connector = Arc::new(FakeConnector::new(db));
        let executor = Executor::new(tx, connector.clone(), Arc::new(NoDiscovery), stores, &settings);
        Self {
            app: App::new(settings),
            executor,
            rx,
            connector,
            dir,
        }
    }

    /// Connected to the fake database with its tree loaded
    pub async fn connected() -> Self {
        let mut harness = Self::new(FakeDatabase::default());
        let commands = harness.app.startup(Some("postgres://app@localhost:5432/app"));
        harness.run(commands).await;
        harness
    }

    /// Dispatch `commands` and feed every resulting event back into the
    /// controller until nothing is outstanding
    pub async fn run(&mut self, commands: Vec<Command>) {
        let mut outstanding = commands.len();
        self.executor.execute_all(commands);
        while outstanding > 0 {
            let event = tokio::time::timeout(Duration::from_secs(5), self.rx.recv())
                .await
                .expect("executor did not answer in time")
                .expect("event channel closed");
            outstanding -= 1;
            let follow_up = self.app.handle(event);
            outstanding += follow_up.len();
            self.executor.execute_all(follow_up);
        }
    }

    /// Handle one event and run whatever it triggers
    pub async fn send(&mut self, event: AppEvent) {
        let commands = self.app.handle(event);
        self.run(commands).await;
    }

    /// Wait for one unsolicited event (e.g. a lost connection) and handle it
    pub async fn receive_one(&mut self) {
        let event = tokio::time::timeout(Duration::from_secs(5), self.rx.recv())
            .await
            .expect("no event arrived")
            .expect("event channel closed");
        let commands = self.app.handle(event);
        self.run(commands).await;
    }
}

/// Live database settings for the PostgreSQL tests
pub fn live_config() -> ConnectionConfig {
    ConnectionConfig {
        name: "integration-test".to_string(),
        host: std::env::var("TEST_DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
        port: std::env::var("TEST_DB_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(5432),
        database: std::env::var("TEST_DB_NAME").unwrap_or_else(|_| "postgres".to_string()),
        username: std::env::var("TEST_DB_USER").unwrap_or_else(|_| "postgres".to_string()),
        password: std::env::var("TEST_DB_PASSWORD").ok(),
        ssl_mode: SslMode::Disable,
    }
}
