//! Database provider traits
//!
//! Defines the interface the executor drives. This abstraction allows for:
//! - A PostgreSQL backend ([`crate::db::postgres`])
//! - Easy testing with mock implementations
//! - Consistent error handling

use crate::config::ConnectionConfig;
use crate::db::types::{DataType, PageData, QueryResults};
use crate::error::DbResult;
use crate::filter::{CompiledFilter, quote_ident};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Kinds of catalog objects listed under a schema or a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Table,
    View,
    MaterializedView,
    Function,
    Procedure,
    Sequence,
    Index,
    Trigger,
    CompositeType,
    EnumType,
    DomainType,
    RangeType,
}

impl ObjectKind {
    /// Object groups shown under every schema, in display order
    pub const SCHEMA_GROUPS: [ObjectKind; 10] = [
        ObjectKind::Table,
        ObjectKind::View,
        ObjectKind::MaterializedView,
        ObjectKind::Function,
        ObjectKind::Procedure,
        ObjectKind::Sequence,
        ObjectKind::CompositeType,
        ObjectKind::EnumType,
        ObjectKind::DomainType,
        ObjectKind::RangeType,
    ];

    /// Heading of the group node holding objects of this kind
    pub fn group_label(self) -> &'static str {
        match self {
            ObjectKind::Table => "Tables",
            ObjectKind::View => "Views",
            ObjectKind::MaterializedView => "Materialized Views",
            ObjectKind::Function => "Functions",
            ObjectKind::Procedure => "Procedures",
            ObjectKind::Sequence => "Sequences",
            ObjectKind::Index => "Indexes",
            ObjectKind::Trigger => "Triggers",
            ObjectKind::CompositeType => "Composite Types",
            ObjectKind::EnumType => "Enum Types",
            ObjectKind::DomainType => "Domains",
            ObjectKind::RangeType => "Range Types",
        }
    }

    /// Short key used in node ids
    pub fn key(self) -> &'static str {
        match self {
            ObjectKind::Table => "table",
            ObjectKind::View => "view",
            ObjectKind::MaterializedView => "matview",
            ObjectKind::Function => "function",
            ObjectKind::Procedure => "procedure",
            ObjectKind::Sequence => "sequence",
            ObjectKind::Index => "index",
            ObjectKind::Trigger => "trigger",
            ObjectKind::CompositeType => "composite",
            ObjectKind::EnumType => "enum",
            ObjectKind::DomainType => "domain",
            ObjectKind::RangeType => "range",
        }
    }

    /// Relations whose rows can be paged
    pub fn is_relation(self) -> bool {
        matches!(
            self,
            ObjectKind::Table | ObjectKind::View | ObjectKind::MaterializedView
        )
    }
}

/// One entry of a catalog listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogObject {
    pub name: String,
    pub kind: ObjectKind,
    /// Short annotation (function signature, index columns, ...)
    pub detail: Option<String>,
}

impl CatalogObject {
    pub fn new(name: impl Into<String>, kind: ObjectKind) -> Self {
        Self {
            name: name.into(),
            kind,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Identifies a non-tabular object whose definition is shown in the data panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    pub kind: ObjectKind,
    pub schema: String,
    pub name: String,
    /// Owning table, for indexes and triggers
    pub table: Option<String>,
    /// Identity arguments, for functions and procedures
    pub arguments: Option<String>,
}

impl ObjectRef {
    pub fn new(kind: ObjectKind, schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            schema: schema.into(),
            name: name.into(),
            table: None,
            arguments: None,
        }
    }
}

/// Column as reported by catalog introspection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: DataType,
    /// `format_type()` text, e.g. "character varying(64)"
    pub type_name: String,
    pub nullable: bool,
    pub is_primary_key: bool,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        let type_name = type_name.into();
        Self {
            name: name.into(),
            data_type: DataType::from_type_name(&type_name),
            type_name,
            nullable: true,
            is_primary_key: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }

    pub fn reversed(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

/// Server-side ordering for a page load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub column: String,
    pub direction: SortDirection,
    pub nulls_first: bool,
}

impl SortSpec {
    /// `"col" DIR NULLS ...`, one ORDER BY term
    pub fn to_sql(&self) -> String {
        format!(
            "{} {} {}",
            quote_ident(&self.column),
            self.direction.as_sql(),
            if self.nulls_first {
                "NULLS FIRST"
            } else {
                "NULLS LAST"
            }
        )
    }
}

/// What keeps a relation's row order stable between page loads
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowKey {
    /// Primary-key columns
    Columns(Vec<String>),
    /// Physical row address, for tables without a primary key
    Ctid,
    /// The whole row as text, for views
    WholeRow,
}

impl RowKey {
    /// ORDER BY terms, leaving out the column already sorted on
    fn order_terms(&self, sorted: Option<&str>) -> Vec<String> {
        match self {
            RowKey::Columns(columns) => columns
                .iter()
                .filter(|c| Some(c.as_str()) != sorted)
                .map(|c| quote_ident(c))
                .collect(),
            RowKey::Ctid => vec!["ctid".to_string()],
            RowKey::WholeRow => vec!["_r::text".to_string()],
        }
    }
}

/// A window of a relation, optionally filtered and sorted
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub schema: String,
    pub table: String,
    pub offset: usize,
    pub limit: usize,
    pub sort: Option<SortSpec>,
    pub filter: Option<CompiledFilter>,
}

impl PageRequest {
    pub fn new(schema: impl Into<String>, table: impl Into<String>, offset: usize, limit: usize) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            offset,
            limit,
            sort: None,
            filter: None,
        }
    }

    fn relation(&self) -> String {
        format!("{}.{}", quote_ident(&self.schema), quote_ident(&self.table))
    }

    fn where_clause(&self) -> &str {
        self.filter.as_ref().map_or("", |f| f.clause.as_str())
    }

    /// SELECT for the requested window.
    ///
    /// `key` always ends the ORDER BY so OFFSET windows line up with each
    /// other, sorted or not.
    pub fn select_sql(&self, key: &RowKey) -> String {
        let mut order = Vec::new();
        if let Some(sort) = &self.sort {
            order.push(sort.to_sql());
        }
        order.extend(key.order_terms(self.sort.as_ref().map(|s| s.column.as_str())));

        let mut sql = format!("SELECT * FROM {} AS _r", self.relation());
        let clause = self.where_clause();
        if !clause.is_empty() {
            sql.push(' ');
            sql.push_str(clause);
        }
        if !order.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&order.join(", "));
        }
        sql.push_str(&format!(" LIMIT {} OFFSET {}", self.limit, self.offset));
        sql
    }

    /// Row count of the whole (filtered) relation
    pub fn count_sql(&self) -> String {
        let clause = self.where_clause();
        if clause.is_empty() {
            format!("SELECT count(*) FROM {}", self.relation())
        } else {
            format!("SELECT count(*) FROM {} {}", self.relation(), clause)
        }
    }
}

/// Case-insensitive substring search over a relation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub schema: String,
    pub table: String,
    /// Columns to match; empty means the whole row as text
    pub columns: Vec<String>,
    pub needle: String,
    pub limit: usize,
}

impl SearchRequest {
    /// ILIKE pattern with wildcard characters in the needle escaped
    pub fn pattern(&self) -> String {
        let escaped = self
            .needle
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        format!("%{}%", escaped)
    }

    /// Query text; `$1` binds [`SearchRequest::pattern`]
    pub fn sql(&self) -> String {
        let relation = format!("{}.{}", quote_ident(&self.schema), quote_ident(&self.table));
        let predicate = if self.columns.is_empty() {
            "_r::text ILIKE $1".to_string()
        } else {
            self.columns
                .iter()
                .map(|c| format!("{}::text ILIKE $1", quote_ident(c)))
                .collect::<Vec<_>>()
                .join(" OR ")
        };
        format!(
            "SELECT * FROM {} AS _r WHERE {} LIMIT {}",
            relation, predicate, self.limit
        )
    }
}

/// Operations the executor needs from a live connection.
///
/// Implementations must be cheap to share behind an `Arc`; every command
/// task holds a clone.
#[async_trait]
pub trait Database: Send + Sync {
    /// Name of the connected database
    fn database_name(&self) -> &str;

    /// User schemas, excluding `pg_*` and `information_schema`
    async fn list_schemas(&self) -> DbResult<Vec<String>>;

    /// Objects of one kind in a schema
    async fn list_objects(&self, schema: &str, kind: ObjectKind) -> DbResult<Vec<CatalogObject>>;

    /// Columns of a table, view or materialized view
    async fn list_columns(&self, schema: &str, relation: &str) -> DbResult<Vec<ColumnInfo>>;

    async fn list_indexes(&self, schema: &str, table: &str) -> DbResult<Vec<CatalogObject>>;

    async fn list_triggers(&self, schema: &str, table: &str) -> DbResult<Vec<CatalogObject>>;

    /// One page of rows plus the total row count
    async fn load_page(&self, request: &PageRequest) -> DbResult<PageData>;

    /// Execute arbitrary SQL on the shared connection
    ///
    /// # Errors
    /// Returns `DbError::QueryFailed` carrying the server message verbatim
    async fn execute_query(&self, sql: &str) -> DbResult<QueryResults>;

    /// A separate session for one cancellable query
    async fn open_session(&self) -> DbResult<Box<dyn QuerySession>>;

    async fn search_table(&self, request: &SearchRequest) -> DbResult<PageData>;

    /// Formatted definition text of a non-tabular object
    async fn object_definition(&self, target: &ObjectRef) -> DbResult<String>;
}

/// One ad-hoc query's own session; cancelling it touches nothing else
#[async_trait]
pub trait QuerySession: Send + Sync {
    async fn execute_query(&self, sql: &str) -> DbResult<QueryResults>;

    /// Ask the server to cancel what this session is running
    async fn cancel(&self) -> DbResult<()>;
}

/// A live database handle plus a receiver that fires when the connection drops
pub type Connected = (Arc<dyn Database>, mpsc::UnboundedReceiver<String>);

/// Opens connections; swapped for a mock in tests
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, config: &ConnectionConfig) -> DbResult<Connected>;
}
