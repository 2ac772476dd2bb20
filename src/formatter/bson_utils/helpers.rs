//! Helper functions for BSON value conversion

use mongodb::bson::{Binary, Bson, DateTime, Document};

/// Convert DateTime to an RFC 3339 string, falling back to epoch millis
/// for instants outside the representable range.
pub fn datetime_to_iso_string(dt: &DateTime) -> String {
    dt.try_to_rfc3339_string()
        .unwrap_or_else(|_| format!("{}", dt.timestamp_millis()))
}

/// Convert Binary data to hexadecimal string
pub fn binary_to_hex(bin: &Binary) -> String {
    hex::encode(&bin.bytes)
}

/// Convert Binary data to Base64 string
pub fn binary_to_base64(bin: &Binary) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(&bin.bytes)
}

/// Binary subtype as the two hex digits used by extended JSON
pub fn binary_subtype_hex(bin: &Binary) -> String {
    hex::encode([u8::from(bin.subtype)])
}

/// Resolve a dotted field path (`address.city`) inside a document.
///
/// A path without dots is a plain top-level lookup. Only embedded documents
/// are traversed; array positions are not addressable.
pub fn lookup_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
    if let Some(value) = doc.get(path) {
        return Some(value);
    }

    let mut segments = path.split('.');
    let mut current = doc.get(segments.next()?)?;
    for segment in segments {
        match current {
            Bson::Document(inner) => current = inner.get(segment)?,
            _ => return None,
        }
    }
    Some(current)
}
