//! Database abstraction layer
//!
//! This module provides a trait-based abstraction over database operations,
//! allowing the executor to run against PostgreSQL or against mocks in tests.

pub mod params;
pub mod postgres;
pub mod provider;
pub mod types;

// Re-export main types
pub use postgres::{PgConnector, PostgresDatabase};
pub use provider::{
    CatalogObject, ColumnInfo, Connected, Connector, Database, ObjectKind, ObjectRef, PageRequest,
    QuerySession, RowKey, SearchRequest, SortDirection, SortSpec,
};
pub use types::{CellValue, ColumnDef, DataType, PageData, QueryResults, Row, TypeCategory};
