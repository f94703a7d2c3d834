//! Database type definitions
//!
//! Core data structures for representing query results, pages of table
//! data, data types and values.

use std::fmt;
use std::time::Duration;

/// Ad-hoc query execution results
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResults {
    /// Column definitions
    pub columns: Vec<ColumnDef>,
    /// Result rows
    pub rows: Vec<Row>,
    /// Query execution time
    pub execution_time: Duration,
    /// Rows returned or affected
    pub rows_affected: u64,
}

impl QueryResults {
    pub fn new(
        columns: Vec<ColumnDef>,
        rows: Vec<Row>,
        execution_time: Duration,
        rows_affected: u64,
    ) -> Self {
        Self {
            columns,
            rows,
            execution_time,
            rows_affected,
        }
    }
}

/// One window of rows from a relation, with the context it was requested for
#[derive(Debug, Clone, PartialEq)]
pub struct PageData {
    pub schema: String,
    pub table: String,
    pub columns: Vec<ColumnDef>,
    pub rows: Vec<Row>,
    /// Row count of the whole (filtered) relation
    pub total_rows: usize,
    /// Offset the page was requested at
    pub offset: usize,
}

/// Column definition in query results
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    /// Column name
    pub name: String,
    /// Data type
    pub data_type: DataType,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Database data types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataType {
    // Integer types
    SmallInt,
    Integer,
    BigInt,

    // Floating point
    Real,
    Double,
    Numeric,

    // Text types
    Text,
    Varchar(Option<usize>),
    Char(Option<usize>),

    // Boolean
    Boolean,

    // Date/time types
    Date,
    Time,
    Timestamp,
    TimestampTz,
    Interval,

    // JSON types
    Json,
    Jsonb,

    // Binary data
    Bytea,

    // UUID
    Uuid,

    // Array type
    Array(Box<DataType>),

    // Other/unknown types
    Unknown(String),
}

/// Coarse grouping of data types that decides which filter operators apply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Numeric,
    Text,
    Jsonb,
    Array,
    Temporal,
    /// Equality and null checks only (uuid, boolean, bytea)
    Other,
}

impl fmt::Display for TypeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeCategory::Numeric => "numeric",
            TypeCategory::Text => "text",
            TypeCategory::Jsonb => "jsonb",
            TypeCategory::Array => "array",
            TypeCategory::Temporal => "temporal",
            TypeCategory::Other => "other",
        };
        f.write_str(name)
    }
}

/// A single row of query results
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Cell values in column order
    pub values: Vec<CellValue>,
}

/// A cell value (single column value in a row)
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// NULL value
    Null,

    /// Integer value
    Integer(i64),

    /// Floating point value
    Float(f64),

    /// Text/string value
    Text(String),

    /// Boolean value
    Boolean(bool),

    /// JSON value (parsed)
    Json(serde_json::Value),

    /// Binary data
    Binary(Vec<u8>),

    /// Date/time value rendered as text
    DateTime(String),

    /// UUID value
    Uuid(String),

    /// Array value
    Array(Vec<CellValue>),
}

impl DataType {
    /// Get a human-readable display name for this type
    pub fn display_name(&self) -> String {
        match self {
            DataType::SmallInt => "smallint".to_string(),
            DataType::Integer => "integer".to_string(),
            DataType::BigInt => "bigint".to_string(),
            DataType::Real => "real".to_string(),
            DataType::Double => "double precision".to_string(),
            DataType::Numeric => "numeric".to_string(),
            DataType::Text => "text".to_string(),
            DataType::Varchar(Some(n)) => format!("varchar({})", n),
            DataType::Varchar(None) => "varchar".to_string(),
            DataType::Char(Some(n)) => format!("char({})", n),
            DataType::Char(None) => "char".to_string(),
            DataType::Boolean => "boolean".to_string(),
            DataType::Date => "date".to_string(),
            DataType::Time => "time".to_string(),
            DataType::Timestamp => "timestamp".to_string(),
            DataType::TimestampTz => "timestamptz".to_string(),
            DataType::Interval => "interval".to_string(),
            DataType::Json => "json".to_string(),
            DataType::Jsonb => "jsonb".to_string(),
            DataType::Bytea => "bytea".to_string(),
            DataType::Uuid => "uuid".to_string(),
            DataType::Array(inner) => format!("{}[]", inner.display_name()),
            DataType::Unknown(s) => s.clone(),
        }
    }

    /// Operator-legality category. Unrecognized types behave as text.
    pub fn category(&self) -> TypeCategory {
        match self {
            DataType::SmallInt
            | DataType::Integer
            | DataType::BigInt
            | DataType::Real
            | DataType::Double
            | DataType::Numeric => TypeCategory::Numeric,
            DataType::Text | DataType::Varchar(_) | DataType::Char(_) | DataType::Unknown(_) => {
                TypeCategory::Text
            }
            DataType::Json | DataType::Jsonb => TypeCategory::Jsonb,
            DataType::Array(_) => TypeCategory::Array,
            DataType::Date
            | DataType::Time
            | DataType::Timestamp
            | DataType::TimestampTz
            | DataType::Interval => TypeCategory::Temporal,
            DataType::Boolean | DataType::Bytea | DataType::Uuid => TypeCategory::Other,
        }
    }

    /// Map `format_type()` output (e.g. "character varying(255)",
    /// "timestamp with time zone", "text[]") to a DataType.
    pub fn from_type_name(type_name: &str) -> DataType {
        let type_name = type_name.trim();
        if let Some(inner) = type_name.strip_suffix("[]") {
            return DataType::Array(Box::new(DataType::from_type_name(inner)));
        }

        let (base, params) = match type_name.split_once('(') {
            Some((base, rest)) => (base.trim(), rest.strip_suffix(')')),
            None => (type_name, None),
        };
        let len = params.and_then(|p| p.trim().parse::<usize>().ok());

        match base {
            "smallint" | "int2" => DataType::SmallInt,
            "integer" | "int" | "int4" => DataType::Integer,
            "bigint" | "int8" => DataType::BigInt,
            "real" | "float4" => DataType::Real,
            "double precision" | "float8" => DataType::Double,
            "numeric" | "decimal" => DataType::Numeric,
            "text" | "name" => DataType::Text,
            "character varying" | "varchar" => DataType::Varchar(len),
            "character" | "char" | "bpchar" => DataType::Char(len),
            "boolean" | "bool" => DataType::Boolean,
            "date" => DataType::Date,
            "time without time zone" | "time with time zone" | "time" | "timetz" => {
                DataType::Time
            }
            "timestamp without time zone" | "timestamp" => DataType::Timestamp,
            "timestamp with time zone" | "timestamptz" => DataType::TimestampTz,
            "interval" => DataType::Interval,
            "json" => DataType::Json,
            "jsonb" => DataType::Jsonb,
            "bytea" => DataType::Bytea,
            "uuid" => DataType::Uuid,
            other => DataType::Unknown(other.to_string()),
        }
    }
}

impl CellValue {
    /// Get a display string for this cell value (truncated if needed)
    pub fn display_string(&self, max_len: usize) -> String {
        let full = self.to_plain_string();
        if full.chars().count() > max_len {
            let kept: String = full.chars().take(max_len.saturating_sub(3)).collect();
            format!("{}...", kept)
        } else {
            full
        }
    }

    /// Full, untruncated text of the value
    pub fn to_plain_string(&self) -> String {
        match self {
            CellValue::Null => "NULL".to_string(),
            CellValue::Integer(i) => i.to_string(),
            CellValue::Float(f) => f.to_string(),
            CellValue::Text(s) => s.clone(),
            CellValue::Boolean(b) => b.to_string(),
            CellValue::Json(v) => v.to_string(),
            CellValue::Binary(b) => format!("<binary {} bytes>", b.len()),
            CellValue::DateTime(s) => s.clone(),
            CellValue::Uuid(s) => s.clone(),
            CellValue::Array(arr) => {
                let items: Vec<String> = arr.iter().map(|v| v.to_plain_string()).collect();
                format!("{{{}}}", items.join(","))
            }
        }
    }

    /// Pretty-printed JSON for the JSON viewer, if the cell holds JSON
    /// (or text that parses as JSON).
    pub fn as_pretty_json(&self) -> Option<String> {
        let value = match self {
            CellValue::Json(v) => v.clone(),
            CellValue::Text(s) => serde_json::from_str(s).ok()?,
            _ => return None,
        };
        serde_json::to_string_pretty(&value).ok()
    }

    /// Check if this is a NULL value
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datatype_display_name() {
        assert_eq!(DataType::Integer.display_name(), "integer");
        assert_eq!(DataType::Varchar(Some(255)).display_name(), "varchar(255)");
        assert_eq!(
            DataType::Array(Box::new(DataType::Integer)).display_name(),
            "integer[]"
        );
    }

    #[test]
    fn test_from_type_name() {
        assert_eq!(
            DataType::from_type_name("character varying(64)"),
            DataType::Varchar(Some(64))
        );
        assert_eq!(DataType::from_type_name("numeric(10,2)"), DataType::Numeric);
        assert_eq!(
            DataType::from_type_name("timestamp with time zone"),
            DataType::TimestampTz
        );
        assert_eq!(
            DataType::from_type_name("text[]"),
            DataType::Array(Box::new(DataType::Text))
        );
        assert_eq!(
            DataType::from_type_name("tsvector"),
            DataType::Unknown("tsvector".to_string())
        );
    }

    #[test]
    fn test_categories() {
        assert_eq!(DataType::BigInt.category(), TypeCategory::Numeric);
        assert_eq!(DataType::Varchar(None).category(), TypeCategory::Text);
        assert_eq!(DataType::Jsonb.category(), TypeCategory::Jsonb);
        assert_eq!(
            DataType::Array(Box::new(DataType::Integer)).category(),
            TypeCategory::Array
        );
        assert_eq!(DataType::TimestampTz.category(), TypeCategory::Temporal);
        assert_eq!(DataType::Uuid.category(), TypeCategory::Other);
        assert_eq!(
            DataType::Unknown("citext".into()).category(),
            TypeCategory::Text
        );
    }

    #[test]
    fn test_cell_value_display_string() {
        let val = CellValue::Text("Hello, world!".to_string());
        assert_eq!(val.display_string(5), "He...");
        assert_eq!(val.display_string(100), "Hello, world!");
    }

    #[test]
    fn test_display_string_multibyte_safe() {
        let val = CellValue::Text("日本語のテキスト".to_string());
        assert_eq!(val.display_string(5), "日本...");
    }

    #[test]
    fn test_cell_value_is_null() {
        assert!(CellValue::Null.is_null());
        assert!(!CellValue::Integer(42).is_null());
    }

    #[test]
    fn test_array_display_string() {
        let arr = CellValue::Array(vec![
            CellValue::Text("a".to_string()),
            CellValue::Text("b".to_string()),
        ]);
        assert_eq!(arr.display_string(100), "{a,b}");
    }

    #[test]
    fn test_pretty_json() {
        let cell = CellValue::Json(serde_json::json!({"a": 1}));
        assert_eq!(cell.as_pretty_json().unwrap(), "{\n  \"a\": 1\n}");
        assert!(CellValue::Text("nope".into()).as_pretty_json().is_none());
        assert!(CellValue::Integer(1).as_pretty_json().is_none());
    }
}
