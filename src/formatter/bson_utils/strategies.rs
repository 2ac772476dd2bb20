//! Strategy implementations for BSON conversion
//!
//! - PlainTextConverter: CSV cell text
//! - CanonicalJsonConverter: tagged JSON that survives re-ingestion

use mongodb::bson::{
    Binary, Bson, DateTime, Decimal128, Document, Regex, Timestamp, oid::ObjectId,
};
use serde_json::{Value as JsonValue, json};

use super::converter::{BsonConverter, BsonJsonConverter, BsonStringConverter};
use super::helpers::*;

/// Plain text converter for CSV cells.
///
/// Scalars render as their bare text, null as an empty cell, and nested
/// documents or arrays as canonical JSON so a cell never loses structure.
#[derive(Default)]
pub struct PlainTextConverter {
    json: CanonicalJsonConverter,
}

impl PlainTextConverter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BsonConverter for PlainTextConverter {
    type Output = String;

    fn convert(&self, value: &Bson) -> String {
        self.convert_to_string(value)
    }
}

impl BsonStringConverter for PlainTextConverter {
    fn format_string(&self, s: &str) -> String {
        s.to_string()
    }

    fn format_int32(&self, n: i32) -> String {
        n.to_string()
    }

    fn format_int64(&self, n: i64) -> String {
        n.to_string()
    }

    fn format_double(&self, f: f64) -> String {
        f.to_string()
    }

    fn format_boolean(&self, b: bool) -> String {
        b.to_string()
    }

    fn format_null(&self) -> String {
        String::new()
    }

    fn format_object_id(&self, oid: &ObjectId) -> String {
        oid.to_hex()
    }

    fn format_datetime(&self, dt: &DateTime) -> String {
        datetime_to_iso_string(dt)
    }

    fn format_decimal128(&self, d: &Decimal128) -> String {
        d.to_string()
    }

    fn format_array(&self, arr: &[Bson]) -> String {
        self.json.convert_array(arr).to_string()
    }

    fn format_document(&self, doc: &Document) -> String {
        self.json.convert_document_to_json(doc).to_string()
    }

    fn format_binary(&self, bin: &Binary) -> String {
        binary_to_hex(bin)
    }

    fn format_regex(&self, regex: &Regex) -> String {
        format!("/{}/{}", regex.pattern, regex.options)
    }

    fn format_timestamp(&self, ts: &Timestamp) -> String {
        format!("Timestamp({}, {})", ts.time, ts.increment)
    }

    fn format_unknown(&self, value: &Bson) -> String {
        self.json.convert_to_json(value).to_string()
    }
}

/// JSON converter that tags store-native types.
///
/// ObjectIds become `{"$oid": "<hex>"}` and datetimes `{"$date": <millis>}`.
/// 64-bit integers, decimals and binary data use their extended JSON
/// wrappers (`$numberLong`, `$numberDecimal`, `$binary`), so an exported
/// line fed back to `insert` yields the same BSON types it was read from.
#[derive(Default)]
pub struct CanonicalJsonConverter;

impl CanonicalJsonConverter {
    pub fn new() -> Self {
        Self
    }
}

impl BsonConverter for CanonicalJsonConverter {
    type Output = JsonValue;

    fn convert(&self, value: &Bson) -> JsonValue {
        self.convert_to_json(value)
    }
}

impl BsonJsonConverter for CanonicalJsonConverter {
    fn convert_int64(&self, n: i64) -> JsonValue {
        json!({ "$numberLong": n.to_string() })
    }

    fn convert_object_id(&self, oid: &ObjectId) -> JsonValue {
        json!({ "$oid": oid.to_hex() })
    }

    fn convert_datetime(&self, dt: &DateTime) -> JsonValue {
        json!({ "$date": dt.timestamp_millis() })
    }

    fn convert_decimal128(&self, d: &Decimal128) -> JsonValue {
        json!({ "$numberDecimal": d.to_string() })
    }

    fn convert_binary(&self, bin: &Binary) -> JsonValue {
        json!({
            "$binary": { "base64": binary_to_base64(bin), "subType": binary_subtype_hex(bin) }
        })
    }

    fn convert_regex(&self, regex: &Regex) -> JsonValue {
        json!({
            "$regularExpression": { "pattern": regex.pattern, "options": regex.options }
        })
    }

    fn convert_timestamp(&self, ts: &Timestamp) -> JsonValue {
        json!({ "$timestamp": { "t": ts.time, "i": ts.increment } })
    }

    fn convert_min_key(&self) -> JsonValue {
        json!({ "$minKey": 1 })
    }

    fn convert_max_key(&self) -> JsonValue {
        json!({ "$maxKey": 1 })
    }
}
