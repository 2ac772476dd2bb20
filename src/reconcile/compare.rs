//! Field comparison between a stored document and an input record

use mongodb::bson::Document;

use crate::error::{ConfigError, Result};

/// Which fields decide whether a record differs from the stored document.
///
/// The mode is chosen once per run. For [`AllFields`](Self::AllFields) and
/// [`Except`](Self::Except) the concrete field list is derived from each
/// record's own fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ComparisonFieldSet {
    /// Every field of the record except the key, `_id` and timestamp fields
    #[default]
    AllFields,
    /// Exactly these fields
    Only(Vec<String>),
    /// Every field of the record except these (and the key, `_id` and
    /// timestamp fields)
    Except(Vec<String>),
}

impl ComparisonFieldSet {
    /// Pick the mode from the two comma-separated option lists.
    ///
    /// Supplying both lists is rejected rather than guessing a precedence.
    pub fn from_lists(compare_fields: Vec<String>, ignore_fields: Vec<String>) -> Result<Self> {
        match (compare_fields.is_empty(), ignore_fields.is_empty()) {
            (true, true) => Ok(Self::AllFields),
            (false, true) => Ok(Self::Only(compare_fields)),
            (true, false) => Ok(Self::Except(ignore_fields)),
            (false, false) => Err(ConfigError::ConflictingOptions {
                first: "compare-fields".to_string(),
                second: "compare-ignore-fields".to_string(),
            }
            .into()),
        }
    }

    /// Concrete field list for one record.
    ///
    /// # Arguments
    /// * `candidate` - The input record
    /// * `excluded` - Fields never compared implicitly (key, `_id`, timestamps)
    pub fn resolve(&self, candidate: &Document, excluded: &[&str]) -> Vec<String> {
        let ignored: &[String] = match self {
            Self::Only(fields) => return fields.clone(),
            Self::AllFields => &[],
            Self::Except(ignored) => ignored,
        };

        candidate
            .keys()
            .filter(|key| !excluded.contains(&key.as_str()) && !ignored.contains(*key))
            .cloned()
            .collect()
    }
}

/// Whether two documents agree on every field in `fields`.
///
/// A field missing on both sides agrees; missing on one side does not.
/// Values compare structurally and by type, so `1` and `"1"` differ, as do
/// an int32 and an int64 holding the same number.
pub fn documents_equal(existing: &Document, candidate: &Document, fields: &[String]) -> bool {
    fields
        .iter()
        .all(|field| match (existing.get(field), candidate.get(field)) {
            (None, None) => true,
            (Some(a), Some(b)) => a == b,
            _ => false,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    fn names(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|f| f.to_string()).collect()
    }

    #[test]
    fn test_from_lists_modes() {
        assert_eq!(
            ComparisonFieldSet::from_lists(vec![], vec![]).unwrap(),
            ComparisonFieldSet::AllFields
        );
        assert_eq!(
            ComparisonFieldSet::from_lists(names(&["a"]), vec![]).unwrap(),
            ComparisonFieldSet::Only(names(&["a"]))
        );
        assert_eq!(
            ComparisonFieldSet::from_lists(vec![], names(&["b"])).unwrap(),
            ComparisonFieldSet::Except(names(&["b"]))
        );
        assert!(ComparisonFieldSet::from_lists(names(&["a"]), names(&["b"])).is_err());
    }

    #[test]
    fn test_resolve_all_fields_skips_excluded() {
        let record = doc! { "_id": 1, "name": "a", "value": "A", "created_at": 0 };
        let fields = ComparisonFieldSet::AllFields.resolve(
            &record,
            &["name", "_id", "created_at", "updated_at"],
        );
        assert_eq!(fields, names(&["value"]));
    }

    #[test]
    fn test_resolve_except_removes_ignored() {
        let record = doc! { "name": "a", "value": "A", "note": "x" };
        let fields = ComparisonFieldSet::Except(names(&["note"])).resolve(&record, &["name"]);
        assert_eq!(fields, names(&["value"]));
    }

    #[test]
    fn test_resolve_only_is_verbatim() {
        let record = doc! { "name": "a" };
        let fields = ComparisonFieldSet::Only(names(&["value", "name"])).resolve(&record, &["name"]);
        assert_eq!(fields, names(&["value", "name"]));
    }

    #[test]
    fn test_equal_on_selected_fields_only() {
        let existing = doc! { "name": "a", "value": "A", "other": 1 };
        let candidate = doc! { "name": "a", "value": "A", "other": 2 };
        assert!(documents_equal(&existing, &candidate, &names(&["value"])));
        assert!(!documents_equal(&existing, &candidate, &names(&["other"])));
    }

    #[test]
    fn test_presence_mismatch_is_unequal() {
        let existing = doc! { "name": "a" };
        let candidate = doc! { "name": "a", "value": "A" };
        assert!(!documents_equal(&existing, &candidate, &names(&["value"])));
        assert!(!documents_equal(&candidate, &existing, &names(&["value"])));
        assert!(documents_equal(&existing, &existing, &names(&["absent"])));
    }

    #[test]
    fn test_type_sensitive() {
        let existing = doc! { "v": 1 };
        assert!(!documents_equal(&existing, &doc! { "v": "1" }, &names(&["v"])));
        assert!(!documents_equal(&existing, &doc! { "v": 1_i64 }, &names(&["v"])));
        assert!(!documents_equal(&existing, &doc! { "v": 1.0 }, &names(&["v"])));
    }

    #[test]
    fn test_nested_values_compare_deeply() {
        let existing = doc! { "a": { "b": [1, { "c": "x" }] } };
        let same = doc! { "a": { "b": [1, { "c": "x" }] } };
        let different = doc! { "a": { "b": [1, { "c": "y" }] } };
        assert!(documents_equal(&existing, &same, &names(&["a"])));
        assert!(!documents_equal(&existing, &different, &names(&["a"])));
    }
}
