use std::{fmt, io};

use crate::error::mongo::format_mongodb_error;

/// Crate-wide `Result` type using [`DbUtilsError`] as the error.
///
/// This alias is re-exported by the parent `error` module and is intended
/// to be used throughout the crate for fallible operations.
pub type Result<T> = std::result::Result<T, DbUtilsError>;

/// Top-level error type for dbutils operations.
///
/// Per-record failures ([`RecordError`]) are normally recovered by the
/// reconciliation engine and only counted; everything else aborts the run.
#[derive(Debug)]
pub enum DbUtilsError {
    /// Connection-related errors.
    Connection(ConnectionError),

    /// Configuration and argument resolution errors.
    Config(ConfigError),

    /// Per-record reconciliation errors.
    Record(RecordError),

    /// Query/export pipeline errors.
    Export(ExportError),

    /// I/O errors.
    Io(io::Error),

    /// MongoDB driver errors.
    MongoDb(mongodb::error::Error),

    /// Generic error with a free-form message.
    Generic(String),
}

/// Connection-specific errors.
#[derive(Debug)]
pub enum ConnectionError {
    /// Failed to establish a connection.
    ConnectionFailed(String),

    /// Invalid connection URI.
    InvalidUri(String),

    /// Not currently connected to MongoDB.
    NotConnected,

    /// Ping command failed.
    PingFailed(String),
}

/// Configuration-specific errors.
#[derive(Debug)]
pub enum ConfigError {
    /// Config file not found.
    FileNotFound(String),

    /// Invalid config format.
    InvalidFormat(String),

    /// A required option is absent for the requested mode.
    MissingRequiredConfig(String),

    /// Invalid field value.
    InvalidValue { field: String, value: String },

    /// Two options that cannot be combined were both supplied.
    ConflictingOptions { first: String, second: String },
}

/// Errors attached to a single input record.
///
/// None of these abort a reconciliation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// The record does not carry the configured key field.
    MissingKeyField { field: String, record: String },

    /// The key value matched more than one stored document.
    AmbiguousKeyMatch {
        field: String,
        value: String,
        matches: usize,
    },

    /// The store rejected a lookup or write for this record.
    StoreWriteFailure { record: String, cause: String },

    /// The input line could not be decoded into a document.
    MalformedInput { line: usize, message: String },
}

/// Query/export pipeline errors. All of them are fatal to the run.
#[derive(Debug)]
pub enum ExportError {
    /// A filter pattern is not a valid regular expression.
    InvalidFilterPattern { field: String, message: String },

    /// Fetching a page from the store failed.
    BatchFetchFailure(String),

    /// Writing serialized output failed.
    WriteFailed(String),
}

/* ========================= Display & Error impls ========================= */

impl fmt::Display for DbUtilsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbUtilsError::Connection(e) => write!(f, "Connection error: {e}"),
            DbUtilsError::Config(e) => write!(f, "Configuration error: {e}"),
            DbUtilsError::Record(e) => write!(f, "Record error: {e}"),
            DbUtilsError::Export(e) => write!(f, "Export error: {e}"),
            DbUtilsError::Io(e) => write!(f, "I/O error: {e}"),
            DbUtilsError::MongoDb(e) => format_mongodb_error(f, e),
            DbUtilsError::Generic(msg) => write!(f, "{msg}"),
        }
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionError::ConnectionFailed(msg) => write!(f, "Failed to connect: {msg}"),
            ConnectionError::InvalidUri(uri) => write!(f, "Invalid connection URI: {uri}"),
            ConnectionError::NotConnected => write!(f, "Not connected to MongoDB"),
            ConnectionError::PingFailed(msg) => write!(f, "Ping failed: {msg}"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {path}"),
            ConfigError::InvalidFormat(msg) => write!(f, "Invalid config format: {msg}"),
            ConfigError::MissingRequiredConfig(msg) => {
                write!(f, "Missing required option: {msg}")
            }
            ConfigError::InvalidValue { field, value } => {
                write!(f, "Invalid value '{value}' for '{field}'")
            }
            ConfigError::ConflictingOptions { first, second } => {
                write!(f, "'{first}' and '{second}' cannot be used together")
            }
        }
    }
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::MissingKeyField { field, record } => {
                write!(f, "key field '{field}' missing from record {record}")
            }
            RecordError::AmbiguousKeyMatch { field, value, .. } => write!(
                f,
                "more than one document matches {field} = {value}, refusing to pick one"
            ),
            RecordError::StoreWriteFailure { record, cause } => {
                write!(f, "store write failed for record {record}: {cause}")
            }
            RecordError::MalformedInput { line, message } => {
                write!(f, "malformed input on line {line}: {message}")
            }
        }
    }
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::InvalidFilterPattern { field, message } => {
                write!(f, "invalid regex for field '{field}': {message}")
            }
            ExportError::BatchFetchFailure(msg) => write!(f, "batch fetch failed: {msg}"),
            ExportError::WriteFailed(msg) => write!(f, "write failed: {msg}"),
        }
    }
}

impl std::error::Error for DbUtilsError {}
impl std::error::Error for ConnectionError {}
impl std::error::Error for ConfigError {}
impl std::error::Error for RecordError {}
impl std::error::Error for ExportError {}

/* ========================= Conversions to DbUtilsError ========================= */

impl From<io::Error> for DbUtilsError {
    fn from(err: io::Error) -> Self {
        DbUtilsError::Io(err)
    }
}

impl From<mongodb::error::Error> for DbUtilsError {
    fn from(err: mongodb::error::Error) -> Self {
        DbUtilsError::MongoDb(err)
    }
}

impl From<ConnectionError> for DbUtilsError {
    fn from(err: ConnectionError) -> Self {
        DbUtilsError::Connection(err)
    }
}

impl From<ConfigError> for DbUtilsError {
    fn from(err: ConfigError) -> Self {
        DbUtilsError::Config(err)
    }
}

impl From<RecordError> for DbUtilsError {
    fn from(err: RecordError) -> Self {
        DbUtilsError::Record(err)
    }
}

impl From<ExportError> for DbUtilsError {
    fn from(err: ExportError) -> Self {
        DbUtilsError::Export(err)
    }
}

impl From<String> for DbUtilsError {
    fn from(msg: String) -> Self {
        DbUtilsError::Generic(msg)
    }
}

impl From<&str> for DbUtilsError {
    fn from(msg: &str) -> Self {
        DbUtilsError::Generic(msg.to_owned())
    }
}
