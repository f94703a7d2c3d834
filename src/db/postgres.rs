//! PostgreSQL database provider
//!
//! Concrete implementation using tokio-postgres.

use crate::config::ConnectionConfig;
use crate::config::connections::SslMode;
use crate::db::params;
use crate::db::provider::{
    CatalogObject, ColumnInfo, Connected, Connector, Database, ObjectKind, ObjectRef, PageRequest,
    QuerySession, RowKey, SearchRequest,
};
use crate::db::types::{CellValue, ColumnDef, DataType, PageData, QueryResults, Row};
use crate::error::{DbError, DbResult};
use crate::filter::quote_ident;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_postgres::Client;
use tokio_postgres::types::Type;
use tracing::{debug, warn};

/// Schemas hidden from the navigation tree
const SYSTEM_SCHEMA_FILTER: &str =
    "nspname NOT LIKE 'pg\\_%' AND nspname <> 'information_schema'";

/// PostgreSQL database provider
pub struct PostgresDatabase {
    /// The tokio-postgres client shared by catalog, page and search commands
    client: Client,
    /// Kept to open a dedicated connection per ad-hoc query
    config: ConnectionConfig,
}

impl PostgresDatabase {
    /// Connect to a PostgreSQL database.
    ///
    /// Returns the provider and a receiver that fires if the background
    /// connection is lost (e.g. server restart, idle timeout).
    pub async fn connect(
        config: &ConnectionConfig,
    ) -> DbResult<(Self, mpsc::UnboundedReceiver<String>)> {
        let (client, lost) = open_client(config).await?;
        Ok((
            Self {
                client,
                config: config.clone(),
            },
            lost,
        ))
    }

    /// Stable ordering for paging: the primary key, else `ctid` for plain
    /// tables and materialized views, else the whole row as text
    async fn row_key(&self, schema: &str, relation: &str) -> DbResult<RowKey> {
        let row = self
            .client
            .query_opt(
                "SELECT c.relkind::text, \
                        ARRAY(SELECT a.attname::text FROM pg_index i \
                              JOIN pg_attribute a ON a.attrelid = i.indrelid \
                               AND a.attnum = ANY(i.indkey) \
                              WHERE i.indrelid = c.oid AND i.indisprimary \
                              ORDER BY array_position(i.indkey::int2[], a.attnum)) \
                 FROM pg_class c \
                 JOIN pg_namespace n ON n.oid = c.relnamespace \
                 WHERE n.nspname = $1 AND c.relname = $2",
                &[&schema, &relation],
            )
            .await
            .map_err(query_err)?;
        let Some(row) = row else {
            return Ok(RowKey::WholeRow);
        };
        let relkind: String = row.get(0);
        let primary_key: Vec<String> = row.get(1);
        Ok(if !primary_key.is_empty() {
            RowKey::Columns(primary_key)
        } else if matches!(relkind.as_str(), "r" | "m") {
            RowKey::Ctid
        } else {
            RowKey::WholeRow
        })
    }

    /// Run a catalog query returning (name, detail) pairs
    async fn catalog(
        &self,
        sql: &str,
        args: &[&(dyn tokio_postgres::types::ToSql + Sync)],
        kind: ObjectKind,
    ) -> DbResult<Vec<CatalogObject>> {
        let rows = self.client.query(sql, args).await.map_err(schema_err)?;
        Ok(rows
            .iter()
            .map(|row| {
                let name: String = row.get(0);
                let detail: Option<String> = row.get(1);
                CatalogObject {
                    name,
                    kind,
                    detail,
                }
            })
            .collect())
    }

    /// Run a query expected to produce one text value
    async fn single_text(
        &self,
        sql: &str,
        args: &[&(dyn tokio_postgres::types::ToSql + Sync)],
        what: &str,
    ) -> DbResult<String> {
        let rows = self.client.query(sql, args).await.map_err(query_err)?;
        rows.first()
            .and_then(|row| row.get::<_, Option<String>>(0))
            .ok_or_else(|| DbError::QueryFailed(format!("{} not found", what)))
    }

    async fn table_ddl(&self, schema: &str, table: &str) -> DbResult<String> {
        let columns = self.list_columns(schema, table).await?;
        if columns.is_empty() {
            return Err(DbError::QueryFailed(format!("{}.{} not found", schema, table)));
        }
        let body: Vec<String> = columns
            .iter()
            .map(|c| {
                let mut line = format!("  {} {}", quote_ident(&c.name), c.type_name);
                if !c.nullable {
                    line.push_str(" NOT NULL");
                }
                line
            })
            .collect();
        let pk: Vec<String> = columns
            .iter()
            .filter(|c| c.is_primary_key)
            .map(|c| quote_ident(&c.name))
            .collect();
        let mut lines = body;
        if !pk.is_empty() {
            lines.push(format!("  PRIMARY KEY ({})", pk.join(", ")));
        }
        Ok(format!(
            "CREATE TABLE {}.{} (\n{}\n);",
            quote_ident(schema),
            quote_ident(table),
            lines.join(",\n")
        ))
    }
}

#[async_trait]
impl Database for PostgresDatabase {
    fn database_name(&self) -> &str {
        &self.config.database
    }

    async fn list_schemas(&self) -> DbResult<Vec<String>> {
        let sql = format!(
            "SELECT nspname FROM pg_namespace WHERE {} ORDER BY nspname",
            SYSTEM_SCHEMA_FILTER
        );
        let rows = self.client.query(&sql, &[]).await.map_err(schema_err)?;
        Ok(rows.iter().map(|r| r.get(0)).collect())
    }

    async fn list_objects(&self, schema: &str, kind: ObjectKind) -> DbResult<Vec<CatalogObject>> {
        let relation = |relkinds: &str| {
            format!(
                "SELECT c.relname, NULL::text FROM pg_class c \
                 JOIN pg_namespace n ON n.oid = c.relnamespace \
                 WHERE n.nspname = $1 AND c.relkind IN ({}) ORDER BY c.relname",
                relkinds
            )
        };
        let routine = |prokind: &str| {
            format!(
                "SELECT p.proname, pg_get_function_identity_arguments(p.oid) FROM pg_proc p \
                 JOIN pg_namespace n ON n.oid = p.pronamespace \
                 WHERE n.nspname = $1 AND p.prokind = '{}' ORDER BY p.proname, 2",
                prokind
            )
        };
        let user_type = |typtype: &str| {
            format!(
                "SELECT t.typname, NULL::text FROM pg_type t \
                 JOIN pg_namespace n ON n.oid = t.typnamespace \
                 WHERE n.nspname = $1 AND t.typtype = '{}' \
                   AND (t.typrelid = 0 OR (SELECT c.relkind FROM pg_class c WHERE c.oid = t.typrelid) = 'c') \
                 ORDER BY t.typname",
                typtype
            )
        };
        let sql = match kind {
            ObjectKind::Table => relation("'r', 'p'"),
            ObjectKind::View => relation("'v'"),
            ObjectKind::MaterializedView => relation("'m'"),
            ObjectKind::Sequence => relation("'S'"),
            ObjectKind::Function => routine("f"),
            ObjectKind::Procedure => routine("p"),
            ObjectKind::CompositeType => user_type("c"),
            ObjectKind::EnumType => user_type("e"),
            ObjectKind::DomainType => user_type("d"),
            ObjectKind::RangeType => user_type("r"),
            ObjectKind::Index | ObjectKind::Trigger => {
                return Err(DbError::SchemaLoadFailed(format!(
                    "{} are listed per table",
                    kind.group_label()
                )));
            }
        };
        debug!(schema, ?kind, "listing catalog objects");
        self.catalog(&sql, &[&schema], kind).await
    }

    async fn list_columns(&self, schema: &str, relation: &str) -> DbResult<Vec<ColumnInfo>> {
        let rows = self
            .client
            .query(
                "SELECT a.attname, format_type(a.atttypid, a.atttypmod), NOT a.attnotnull, \
                        EXISTS (SELECT 1 FROM pg_index i \
                                WHERE i.indrelid = c.oid AND i.indisprimary \
                                  AND a.attnum = ANY(i.indkey)) \
                 FROM pg_attribute a \
                 JOIN pg_class c ON c.oid = a.attrelid \
                 JOIN pg_namespace n ON n.oid = c.relnamespace \
                 WHERE n.nspname = $1 AND c.relname = $2 \
                   AND a.attnum > 0 AND NOT a.attisdropped \
                 ORDER BY a.attnum",
                &[&schema, &relation],
            )
            .await
            .map_err(schema_err)?;

        Ok(rows
            .iter()
            .map(|row| {
                let mut info = ColumnInfo::new(row.get::<_, String>(0), row.get::<_, String>(1));
                info.nullable = row.get(2);
                info.is_primary_key = row.get(3);
                info
            })
            .collect())
    }

    async fn list_indexes(&self, schema: &str, table: &str) -> DbResult<Vec<CatalogObject>> {
        self.catalog(
            "SELECT ci.relname, \
                    CASE WHEN ix.indisprimary THEN 'primary' \
                         WHEN ix.indisunique THEN 'unique' END \
             FROM pg_index ix \
             JOIN pg_class ci ON ci.oid = ix.indexrelid \
             JOIN pg_class ct ON ct.oid = ix.indrelid \
             JOIN pg_namespace n ON n.oid = ct.relnamespace \
             WHERE n.nspname = $1 AND ct.relname = $2 \
             ORDER BY ci.relname",
            &[&schema, &table],
            ObjectKind::Index,
        )
        .await
    }

    async fn list_triggers(&self, schema: &str, table: &str) -> DbResult<Vec<CatalogObject>> {
        self.catalog(
            "SELECT t.tgname, NULL::text FROM pg_trigger t \
             JOIN pg_class c ON c.oid = t.tgrelid \
             JOIN pg_namespace n ON n.oid = c.relnamespace \
             WHERE n.nspname = $1 AND c.relname = $2 AND NOT t.tgisinternal \
             ORDER BY t.tgname",
            &[&schema, &table],
            ObjectKind::Trigger,
        )
        .await
    }

    async fn load_page(&self, request: &PageRequest) -> DbResult<PageData> {
        let args = request
            .filter
            .as_ref()
            .map_or(&[][..], |f| f.args.as_slice());

        let key = self.row_key(&request.schema, &request.table).await?;
        let select = self
            .client
            .prepare(&request.select_sql(&key))
            .await
            .map_err(query_err)?;
        let bound = params::bind(args, select.params())?;
        let pg_rows = self
            .client
            .query(&select, &params::as_refs(&bound))
            .await
            .map_err(query_err)?;

        let count = self
            .client
            .prepare(&request.count_sql())
            .await
            .map_err(query_err)?;
        let bound = params::bind(args, count.params())?;
        let total: i64 = self
            .client
            .query_one(&count, &params::as_refs(&bound))
            .await
            .map_err(query_err)?
            .get(0);

        let columns = column_defs(&select);
        let rows = convert_rows(&columns, &pg_rows);
        Ok(PageData {
            schema: request.schema.clone(),
            table: request.table.clone(),
            columns,
            rows,
            total_rows: usize::try_from(total).unwrap_or(0),
            offset: request.offset,
        })
    }

    async fn execute_query(&self, sql: &str) -> DbResult<QueryResults> {
        run_query(&self.client, sql).await
    }

    async fn open_session(&self) -> DbResult<Box<dyn QuerySession>> {
        let (client, _lost) = open_client(&self.config).await?;
        debug!(database = %self.config.database, "opened query session");
        Ok(Box::new(PgSession {
            cancel_token: client.cancel_token(),
            client,
            ssl_mode: self.config.ssl_mode,
        }))
    }

    async fn search_table(&self, request: &SearchRequest) -> DbResult<PageData> {
        let stmt = self.client.prepare(&request.sql()).await.map_err(query_err)?;
        let pattern = request.pattern();
        let pg_rows = self
            .client
            .query(&stmt, &[&pattern])
            .await
            .map_err(query_err)?;
        let columns = column_defs(&stmt);
        let rows = convert_rows(&columns, &pg_rows);
        Ok(PageData {
            schema: request.schema.clone(),
            table: request.table.clone(),
            total_rows: rows.len(),
            columns,
            rows,
            offset: 0,
        })
    }

    async fn object_definition(&self, target: &ObjectRef) -> DbResult<String> {
        let schema = target.schema.as_str();
        let name = target.name.as_str();
        let qualified = format!("{}.{}", quote_ident(schema), quote_ident(name));
        match target.kind {
            ObjectKind::Table => self.table_ddl(schema, name).await,
            ObjectKind::View | ObjectKind::MaterializedView => {
                let body = self
                    .single_text(
                        "SELECT pg_get_viewdef(to_regclass($1), true)",
                        &[&qualified],
                        "view",
                    )
                    .await?;
                let keyword = if target.kind == ObjectKind::View {
                    "VIEW"
                } else {
                    "MATERIALIZED VIEW"
                };
                Ok(format!("CREATE {} {} AS\n{}", keyword, qualified, body))
            }
            ObjectKind::Function | ObjectKind::Procedure => {
                let signature = format!(
                    "{}({})",
                    qualified,
                    target.arguments.as_deref().unwrap_or_default()
                );
                self.single_text(
                    "SELECT pg_get_functiondef(to_regprocedure($1))",
                    &[&signature],
                    "routine",
                )
                .await
            }
            ObjectKind::Sequence => {
                self.single_text(
                    "SELECT format(E'CREATE SEQUENCE %I.%I\\n  AS %s\\n  INCREMENT BY %s\\n  \
                     MINVALUE %s\\n  MAXVALUE %s\\n  START WITH %s\\n  CACHE %s%s;', \
                     schemaname, sequencename, data_type, increment_by, min_value, \
                     max_value, start_value, cache_size, \
                     CASE WHEN cycle THEN E'\\n  CYCLE' ELSE '' END) \
                     FROM pg_sequences WHERE schemaname = $1 AND sequencename = $2",
                    &[&schema, &name],
                    "sequence",
                )
                .await
            }
            ObjectKind::Index => {
                self.single_text(
                    "SELECT pg_get_indexdef(to_regclass($1))",
                    &[&qualified],
                    "index",
                )
                .await
            }
            ObjectKind::Trigger => {
                let table = target.table.as_deref().unwrap_or_default();
                self.single_text(
                    "SELECT pg_get_triggerdef(t.oid, true) FROM pg_trigger t \
                     JOIN pg_class c ON c.oid = t.tgrelid \
                     JOIN pg_namespace n ON n.oid = c.relnamespace \
                     WHERE n.nspname = $1 AND c.relname = $2 AND t.tgname = $3",
                    &[&schema, &table, &name],
                    "trigger",
                )
                .await
            }
            ObjectKind::EnumType => {
                self.single_text(
                    "SELECT format('CREATE TYPE %I.%I AS ENUM (%s);', n.nspname, t.typname, \
                            string_agg(quote_literal(e.enumlabel), ', ' ORDER BY e.enumsortorder)) \
                     FROM pg_type t \
                     JOIN pg_namespace n ON n.oid = t.typnamespace \
                     JOIN pg_enum e ON e.enumtypid = t.oid \
                     WHERE n.nspname = $1 AND t.typname = $2 \
                     GROUP BY n.nspname, t.typname",
                    &[&schema, &name],
                    "enum type",
                )
                .await
            }
            ObjectKind::CompositeType => {
                self.single_text(
                    "SELECT format(E'CREATE TYPE %I.%I AS (\\n%s\\n);', n.nspname, t.typname, \
                            string_agg(format('  %I %s', a.attname, \
                                              format_type(a.atttypid, a.atttypmod)), \
                                       E',\\n' ORDER BY a.attnum)) \
                     FROM pg_type t \
                     JOIN pg_namespace n ON n.oid = t.typnamespace \
                     JOIN pg_attribute a ON a.attrelid = t.typrelid \
                      AND a.attnum > 0 AND NOT a.attisdropped \
                     WHERE n.nspname = $1 AND t.typname = $2 \
                     GROUP BY n.nspname, t.typname",
                    &[&schema, &name],
                    "composite type",
                )
                .await
            }
            ObjectKind::DomainType => {
                self.single_text(
                    "SELECT format('CREATE DOMAIN %I.%I AS %s%s%s;', n.nspname, t.typname, \
                            format_type(t.typbasetype, t.typtypmod), \
                            CASE WHEN t.typnotnull THEN ' NOT NULL' ELSE '' END, \
                            COALESCE((SELECT string_agg(E'\\n  ' || pg_get_constraintdef(c.oid), '') \
                                      FROM pg_constraint c WHERE c.contypid = t.oid), '')) \
                     FROM pg_type t \
                     JOIN pg_namespace n ON n.oid = t.typnamespace \
                     WHERE n.nspname = $1 AND t.typname = $2",
                    &[&schema, &name],
                    "domain",
                )
                .await
            }
            ObjectKind::RangeType => {
                self.single_text(
                    "SELECT format('CREATE TYPE %I.%I AS RANGE (SUBTYPE = %s);', \
                            n.nspname, t.typname, format_type(r.rngsubtype, NULL)) \
                     FROM pg_type t \
                     JOIN pg_namespace n ON n.oid = t.typnamespace \
                     JOIN pg_range r ON r.rngtypid = t.oid \
                     WHERE n.nspname = $1 AND t.typname = $2",
                    &[&schema, &name],
                    "range type",
                )
                .await
            }
        }
    }
}

/// A connection of its own for one ad-hoc query.
///
/// Its cancel token reaches only the backend serving this session, so a
/// cancel never interrupts page loads or other tabs. The connection closes
/// when the session is dropped.
struct PgSession {
    client: Client,
    cancel_token: tokio_postgres::CancelToken,
    /// SSL mode (needed to cancel over the right transport)
    ssl_mode: SslMode,
}

#[async_trait]
impl QuerySession for PgSession {
    async fn execute_query(&self, sql: &str) -> DbResult<QueryResults> {
        run_query(&self.client, sql).await
    }

    async fn cancel(&self) -> DbResult<()> {
        match self.ssl_mode {
            SslMode::Disable => self.cancel_token.cancel_query(tokio_postgres::NoTls).await,
            SslMode::Prefer | SslMode::Require => {
                let tls = tokio_postgres_rustls::MakeRustlsConnect::new(make_tls_config());
                self.cancel_token.cancel_query(tls).await
            }
        }
        .map_err(|e| {
            warn!(error = %e, "cancel request failed");
            DbError::QueryFailed(format!("Cancel failed: {}", e))
        })
    }
}

/// Open a client and spawn its connection task.
///
/// The receiver fires if the connection ends with an error.
async fn open_client(
    config: &ConnectionConfig,
) -> DbResult<(Client, mpsc::UnboundedReceiver<String>)> {
    let conn_string = config.connection_string_with_password();
    let (conn_err_tx, conn_err_rx) = mpsc::unbounded_channel();

    let client = match config.ssl_mode {
        SslMode::Disable => {
            let (client, connection) =
                tokio_postgres::connect(&conn_string, tokio_postgres::NoTls)
                    .await
                    .map_err(|e| DbError::ConnectionFailed(server_message(&e)))?;
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    let _ = conn_err_tx.send(format!("Connection lost: {}", e));
                }
            });
            client
        }
        SslMode::Prefer | SslMode::Require => {
            let tls = tokio_postgres_rustls::MakeRustlsConnect::new(make_tls_config());
            let (client, connection) = tokio_postgres::connect(&conn_string, tls)
                .await
                .map_err(|e| DbError::ConnectionFailed(server_message(&e)))?;
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    let _ = conn_err_tx.send(format!("Connection lost: {}", e));
                }
            });
            client
        }
    };
    Ok((client, conn_err_rx))
}

/// Prepare and run one statement
async fn run_query(client: &Client, sql: &str) -> DbResult<QueryResults> {
    let start = std::time::Instant::now();

    let stmt = client.prepare(sql).await.map_err(query_err)?;
    let columns = column_defs(&stmt);

    // Statements without a result set report affected rows instead
    if columns.is_empty() {
        let affected = client.execute(&stmt, &[]).await.map_err(query_err)?;
        return Ok(QueryResults::new(columns, Vec::new(), start.elapsed(), affected));
    }

    let pg_rows = client.query(&stmt, &[]).await.map_err(query_err)?;
    let rows = convert_rows(&columns, &pg_rows);
    let count = rows.len() as u64;
    Ok(QueryResults::new(columns, rows, start.elapsed(), count))
}

/// Opens [`PostgresDatabase`] connections
#[derive(Debug, Default, Clone, Copy)]
pub struct PgConnector;

#[async_trait]
impl Connector for PgConnector {
    async fn connect(&self, config: &ConnectionConfig) -> DbResult<Connected> {
        let (db, lost) = PostgresDatabase::connect(config).await?;
        Ok((Arc::new(db), lost))
    }
}

/// The server's own message when there is one, otherwise the client error
fn server_message(e: &tokio_postgres::Error) -> String {
    match e.as_db_error() {
        Some(db) => db.message().to_string(),
        None => e.to_string(),
    }
}

fn query_err(e: tokio_postgres::Error) -> DbError {
    DbError::QueryFailed(server_message(&e))
}

fn schema_err(e: tokio_postgres::Error) -> DbError {
    DbError::SchemaLoadFailed(server_message(&e))
}

fn column_defs(stmt: &tokio_postgres::Statement) -> Vec<ColumnDef> {
    stmt.columns()
        .iter()
        .map(|col| ColumnDef::new(col.name(), pg_type_to_datatype(col.type_())))
        .collect()
}

fn convert_rows(columns: &[ColumnDef], pg_rows: &[tokio_postgres::Row]) -> Vec<Row> {
    pg_rows
        .iter()
        .map(|pg_row| Row {
            values: columns
                .iter()
                .enumerate()
                .map(|(i, col)| extract_cell_value(pg_row, i, &col.data_type))
                .collect(),
        })
        .collect()
}

/// Map tokio_postgres Type to our DataType enum
fn pg_type_to_datatype(pg_type: &Type) -> DataType {
    match *pg_type {
        Type::INT2 => DataType::SmallInt,
        Type::INT4 => DataType::Integer,
        Type::INT8 => DataType::BigInt,
        Type::FLOAT4 => DataType::Real,
        Type::FLOAT8 => DataType::Double,
        Type::NUMERIC => DataType::Numeric,
        Type::TEXT | Type::NAME => DataType::Text,
        Type::VARCHAR => DataType::Varchar(None),
        Type::CHAR | Type::BPCHAR => DataType::Char(None),
        Type::BOOL => DataType::Boolean,
        Type::DATE => DataType::Date,
        Type::TIME => DataType::Time,
        Type::TIMESTAMP => DataType::Timestamp,
        Type::TIMESTAMPTZ => DataType::TimestampTz,
        Type::INTERVAL => DataType::Interval,
        Type::JSON => DataType::Json,
        Type::JSONB => DataType::Jsonb,
        Type::BYTEA => DataType::Bytea,
        Type::UUID => DataType::Uuid,
        Type::BOOL_ARRAY => DataType::Array(Box::new(DataType::Boolean)),
        Type::INT2_ARRAY => DataType::Array(Box::new(DataType::SmallInt)),
        Type::INT4_ARRAY => DataType::Array(Box::new(DataType::Integer)),
        Type::INT8_ARRAY => DataType::Array(Box::new(DataType::BigInt)),
        Type::FLOAT4_ARRAY => DataType::Array(Box::new(DataType::Real)),
        Type::FLOAT8_ARRAY => DataType::Array(Box::new(DataType::Double)),
        Type::TEXT_ARRAY | Type::VARCHAR_ARRAY | Type::NAME_ARRAY => {
            DataType::Array(Box::new(DataType::Text))
        }
        Type::UUID_ARRAY => DataType::Array(Box::new(DataType::Uuid)),
        Type::JSONB_ARRAY => DataType::Array(Box::new(DataType::Jsonb)),
        Type::JSON_ARRAY => DataType::Array(Box::new(DataType::Json)),
        Type::NUMERIC_ARRAY => DataType::Array(Box::new(DataType::Numeric)),
        _ => DataType::Unknown(pg_type.name().to_string()),
    }
}

/// Build a rustls ClientConfig that trusts OS certificates (with Mozilla roots as fallback)
fn make_tls_config() -> rustls::ClientConfig {
    let mut root_store = rustls::RootCertStore::empty();

    let native_certs = rustls_native_certs::load_native_certs();
    let mut loaded = 0;
    for cert in native_certs.certs {
        if root_store.add(cert).is_ok() {
            loaded += 1;
        }
    }
    if loaded == 0 {
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    }

    rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth()
}

/// Typed extraction with a NULL check, falling back to text on mismatch
macro_rules! typed_cell {
    ($row:expr, $idx:expr, $ty:ty, $map:expr) => {
        match $row.try_get::<_, Option<$ty>>($idx) {
            Ok(Some(v)) => $map(v),
            Ok(None) => CellValue::Null,
            Err(_) => try_as_string($row, $idx),
        }
    };
}

/// Extract a cell value from a tokio_postgres Row based on the column's DataType.
fn extract_cell_value(row: &tokio_postgres::Row, idx: usize, data_type: &DataType) -> CellValue {
    match data_type {
        DataType::SmallInt => typed_cell!(row, idx, i16, |v: i16| CellValue::Integer(v.into())),
        DataType::Integer => typed_cell!(row, idx, i32, |v: i32| CellValue::Integer(v.into())),
        DataType::BigInt => typed_cell!(row, idx, i64, CellValue::Integer),
        DataType::Real => typed_cell!(row, idx, f32, |v: f32| CellValue::Float(v.into())),
        DataType::Double => typed_cell!(row, idx, f64, CellValue::Float),
        DataType::Numeric => {
            typed_cell!(row, idx, Decimal, |v: Decimal| CellValue::Text(v.to_string()))
        }
        DataType::Boolean => typed_cell!(row, idx, bool, CellValue::Boolean),
        DataType::Json | DataType::Jsonb => typed_cell!(row, idx, serde_json::Value, CellValue::Json),
        DataType::Bytea => typed_cell!(row, idx, Vec<u8>, CellValue::Binary),
        DataType::Uuid => {
            typed_cell!(row, idx, uuid::Uuid, |v: uuid::Uuid| CellValue::Uuid(v.to_string()))
        }
        DataType::Array(inner) => extract_array_value(row, idx, inner),
        DataType::Timestamp => typed_cell!(row, idx, chrono::NaiveDateTime, |v: chrono::NaiveDateTime| {
            CellValue::DateTime(v.to_string())
        }),
        DataType::TimestampTz => typed_cell!(
            row,
            idx,
            chrono::DateTime<chrono::Utc>,
            |v: chrono::DateTime<chrono::Utc>| CellValue::DateTime(v.to_rfc3339())
        ),
        DataType::Date => typed_cell!(row, idx, chrono::NaiveDate, |v: chrono::NaiveDate| {
            CellValue::DateTime(v.to_string())
        }),
        DataType::Time => typed_cell!(row, idx, chrono::NaiveTime, |v: chrono::NaiveTime| {
            CellValue::DateTime(v.to_string())
        }),
        // Text types, intervals and fallback for unknown types
        _ => try_as_string(row, idx),
    }
}

/// Extract an array value from a tokio_postgres Row.
///
/// Tries typed extraction based on inner element type, falling back to
/// text for types without a direct Rust mapping.
fn extract_array_value(row: &tokio_postgres::Row, idx: usize, inner: &DataType) -> CellValue {
    fn array<T>(values: Vec<T>, f: impl Fn(T) -> CellValue) -> CellValue {
        CellValue::Array(values.into_iter().map(f).collect())
    }
    match inner {
        DataType::Text | DataType::Varchar(_) | DataType::Char(_) => {
            typed_cell!(row, idx, Vec<String>, |v| array(v, CellValue::Text))
        }
        DataType::SmallInt => {
            typed_cell!(row, idx, Vec<i16>, |v| array(v, |n: i16| CellValue::Integer(n.into())))
        }
        DataType::Integer => {
            typed_cell!(row, idx, Vec<i32>, |v| array(v, |n: i32| CellValue::Integer(n.into())))
        }
        DataType::BigInt => typed_cell!(row, idx, Vec<i64>, |v| array(v, CellValue::Integer)),
        DataType::Real => {
            typed_cell!(row, idx, Vec<f32>, |v| array(v, |n: f32| CellValue::Float(n.into())))
        }
        DataType::Double => typed_cell!(row, idx, Vec<f64>, |v| array(v, CellValue::Float)),
        DataType::Boolean => typed_cell!(row, idx, Vec<bool>, |v| array(v, CellValue::Boolean)),
        DataType::Uuid => typed_cell!(row, idx, Vec<uuid::Uuid>, |v| array(v, |u: uuid::Uuid| {
            CellValue::Uuid(u.to_string())
        })),
        DataType::Json | DataType::Jsonb => {
            typed_cell!(row, idx, Vec<serde_json::Value>, |v| array(v, CellValue::Json))
        }
        DataType::Numeric => typed_cell!(row, idx, Vec<Decimal>, |v| array(v, |d: Decimal| {
            CellValue::Text(d.to_string())
        })),
        _ => try_as_string(row, idx),
    }
}

/// Try to extract a value as a string (fallback for type mismatches).
///
/// When even the string fallback fails, includes the postgres type name
/// in the message so the user knows what type couldn't be displayed.
fn try_as_string(row: &tokio_postgres::Row, idx: usize) -> CellValue {
    match row.try_get::<_, Option<String>>(idx) {
        Ok(Some(v)) => CellValue::Text(v),
        Ok(None) => CellValue::Null,
        Err(_) => {
            let type_name = row
                .columns()
                .get(idx)
                .map_or("unknown", |c| c.type_().name());
            CellValue::Text(format!("<unable to display: {}>", type_name))
        }
    }
}
