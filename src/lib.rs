//! dbutils library
//!
//! Reconciles newline-delimited JSON records against a MongoDB collection
//! and exports filtered collections as JSON lines or CSV.
//!
//! # Modules
//!
//! - `cli`: Command-line interface and argument parsing
//! - `config`: Configuration management
//! - `connection`: MongoDB connection management
//! - `error`: Error types and handling
//! - `export`: Cursor-driven, filtered export to stdout, files or chunk files
//! - `formatter`: BSON to JSON/CSV line rendering
//! - `reconcile`: Insert/update/skip decision engine
//! - `store`: Storage seam over MongoDB or memory
//! - `utils`: Utility functions and helpers
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use dbutils::export::{run_query, ExportOptions};
//! use dbutils::store::MongoStore;
//! use dbutils::{config::Config, connection::ConnectionManager};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let mut manager = ConnectionManager::new(
//!         "mongodb://localhost:27017".to_string(),
//!         config.connection,
//!     );
//!     manager.connect().await?;
//!
//!     let store = Arc::new(MongoStore::new(manager.collection("app", "items")?));
//!     let result = run_query(store, &ExportOptions::default()).await?;
//!     eprintln!("exported {}", result.documents_exported);
//!
//!     manager.disconnect().await?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod connection;
pub mod error;
pub mod export;
pub mod formatter;
pub mod reconcile;
pub mod store;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use connection::ConnectionManager;
pub use error::{DbUtilsError, Result};
pub use export::run_query;
pub use reconcile::Reconciler;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library version string
pub fn version() -> &'static str {
    VERSION
}
