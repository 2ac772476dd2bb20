//! BSON value conversion utilities
//!
//! A strategy pattern over a common [`BsonConverter`] trait:
//! - Plain text conversion for CSV cells
//! - Tagged JSON conversion for JSON lines

mod converter;
mod helpers;
mod strategies;

pub use converter::{BsonConverter, BsonJsonConverter, BsonStringConverter};
pub use helpers::lookup_path;
pub use strategies::{CanonicalJsonConverter, PlainTextConverter};
