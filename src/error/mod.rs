//! Error handling for reconciliation and export runs.
//!
//! Errors fall into two groups:
//! - Per-record errors ([`RecordError`]) that the reconciliation engine
//!   counts and logs before moving on to the next record
//! - Run-fatal errors (configuration, filter, fetch, I/O) that abort a run
//!
//! MongoDB driver errors are rendered as compact structured JSON so that a
//! failed write can be diagnosed from the log line alone.

pub mod kinds;
pub mod mongo;

pub use kinds::{
    ConfigError, ConnectionError, DbUtilsError, ExportError, RecordError, Result,
};
pub use mongo::ErrorInfo;
