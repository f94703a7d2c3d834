//! Error types for pgnav
//!
//! This module defines the error hierarchy used throughout the application.
//! We use `thiserror` for library-style errors with clear error chains.

use std::io;

/// Main error type for the pgnav application
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Terminal/UI errors
    #[error("Terminal error: {0}")]
    Terminal(String),

    /// Command parsing errors
    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    /// Filter validation errors
    #[error("Filter error: {0}")]
    Filter(#[from] FilterError),

    /// Persisted-state errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Tracing subscriber could not be installed
    #[error("Logging setup failed: {0}")]
    Logging(String),
}

/// Database operation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DbError {
    /// Failed to establish connection (unreachable host, bad credentials)
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Query execution failed; carries the server message verbatim
    #[error("{0}")]
    QueryFailed(String),

    /// Schema introspection failed
    #[error("Schema loading failed: {0}")]
    SchemaLoadFailed(String),

    /// Not connected to a database
    #[error("Not connected to database")]
    NotConnected,

    /// Operation timed out
    #[error("Operation timed out after {0}ms")]
    Timeout(u64),

    /// Operator-initiated cancellation
    #[error("Query cancelled")]
    Cancelled,

    /// Type conversion error
    #[error("Type conversion error: {0}")]
    TypeConversion(String),
}

/// Configuration loading/parsing errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Home directory not found
    #[error("Could not determine home directory")]
    NoHomeDir,

    /// Config directory could not be created or read
    #[error("Configuration directory unavailable: {0}")]
    Io(#[from] io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Command palette parsing errors
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Unknown command
    #[error("Unknown command: {0}")]
    Unknown(String),

    /// Missing required argument
    #[error("Missing required argument for command '{0}'")]
    MissingArgument(String),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Structural and type errors in a filter, raised before any query is issued
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    /// Filter does not name a target table
    #[error("Filter has no target table")]
    MissingTable,

    /// A condition has an empty column name
    #[error("Condition {0} has no column")]
    EmptyColumn(usize),

    /// A value-bearing operator has no value
    #[error("Operator {operator} on \"{column}\" requires a value")]
    MissingValue { column: String, operator: String },

    /// IN / NOT IN with an empty list
    #[error("Operator {operator} on \"{column}\" requires at least one value")]
    EmptyList { column: String, operator: String },

    /// Operator not permitted for the column's type
    #[error("Operator {operator} is not allowed on \"{column}\" ({data_type})")]
    OperatorNotAllowed {
        column: String,
        operator: String,
        data_type: String,
    },

    /// Filter names a relation other than the one being browsed
    #[error("Filter targets {0}, which is not the browsed table")]
    WrongTable(String),

    /// Unknown column referenced in filter input
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    /// Filter input could not be parsed
    #[error("Cannot parse condition: {0}")]
    Parse(String),
}

/// History, favorites, connection-history and secret store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// File IO failure
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON (de)serialization failure
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// A favorite with this name (case-insensitive) already exists
    #[error("A favorite named '{0}' already exists")]
    DuplicateName(String),

    /// Favorite name is empty
    #[error("Favorite name cannot be empty")]
    EmptyName,

    /// No record with the given id
    #[error("No favorite with id {0}")]
    NotFound(String),

    /// OS keyring failure
    #[error("Secret store error: {0}")]
    Secret(String),
}

/// Specialized Result type for pgnav operations
pub type Result<T> = std::result::Result<T, AppError>;

/// Specialized Result type for database operations
pub type DbResult<T> = std::result::Result<T, DbError>;

/// Specialized Result type for config operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Specialized Result type for command operations
pub type CommandResult<T> = std::result::Result<T, CommandError>;

/// Specialized Result type for filter validation and compilation
pub type FilterResult<T> = std::result::Result<T, FilterError>;

/// Specialized Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;
