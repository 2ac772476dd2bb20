//! Regex query filters
//!
//! Turns `(field, pattern)` pairs into a filter that can be sent to MongoDB
//! as `{field: {$regex: pattern}}` or evaluated locally against a document.
//! Patterns are used exactly as given: nothing is anchored implicitly.
//!
//! Patterns are validated with the `regex` crate before anything is sent to
//! the server, so PCRE-only constructs (lookaround, backreferences) are
//! rejected as invalid even though MongoDB would accept them.

use mongodb::bson::{Bson, Document, doc};
use regex::Regex;

use crate::error::{ExportError, Result};
use crate::formatter::bson_utils::lookup_path;

/// A single regex constraint on one field
#[derive(Debug, Clone)]
pub struct RegexClause {
    field: String,
    pattern: String,
    regex: Regex,
}

impl RegexClause {
    /// Local evaluation. Like the server, a string value matches if the
    /// regex finds a match anywhere in it, and an array matches if any of
    /// its string elements does.
    fn matches_value(&self, value: &Bson) -> bool {
        match value {
            Bson::String(s) => self.regex.is_match(s),
            Bson::Array(items) => items.iter().any(|item| self.matches_value(item)),
            _ => false,
        }
    }
}

/// Conjunction of regex clauses. Empty means "match everything".
#[derive(Debug, Clone, Default)]
pub struct QueryFilter {
    clauses: Vec<RegexClause>,
}

impl QueryFilter {
    /// Filter that matches every document
    pub fn match_all() -> Self {
        Self::default()
    }

    /// Compile ordered `KEY=REGEX` pairs.
    ///
    /// Fails on the first pattern that does not compile, naming its field.
    pub fn build(pairs: &[(String, String)]) -> Result<Self> {
        let clauses = pairs
            .iter()
            .map(|(field, pattern)| -> Result<RegexClause> {
                let regex = Regex::new(pattern).map_err(|e| ExportError::InvalidFilterPattern {
                    field: field.clone(),
                    message: e.to_string(),
                })?;
                Ok(RegexClause {
                    field: field.clone(),
                    pattern: pattern.clone(),
                    regex,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { clauses })
    }

    /// Whether this filter has no constraints
    pub fn is_match_all(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Render as a MongoDB filter document.
    ///
    /// Uses a flat document when every field appears once, and `$and`
    /// otherwise since a document cannot hold the same key twice.
    pub fn to_document(&self) -> Document {
        let has_duplicates = self
            .clauses
            .iter()
            .enumerate()
            .any(|(i, c)| self.clauses[..i].iter().any(|p| p.field == c.field));

        if has_duplicates {
            let parts: Vec<Bson> = self
                .clauses
                .iter()
                .map(|c| Bson::Document(doc! { c.field.clone(): { "$regex": c.pattern.clone() } }))
                .collect();
            return doc! { "$and": parts };
        }

        let mut filter = Document::new();
        for clause in &self.clauses {
            filter.insert(clause.field.clone(), doc! { "$regex": clause.pattern.clone() });
        }
        filter
    }

    /// Evaluate the filter against a document
    pub fn matches(&self, doc: &Document) -> bool {
        self.clauses.iter().all(|clause| {
            lookup_path(doc, &clause.field).is_some_and(|value| clause.matches_value(value))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(list: &[(&str, &str)]) -> Vec<(String, String)> {
        list
            .iter()
            .map(|(f, p)| (f.to_string(), p.to_string()))
            .collect()
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = QueryFilter::build(&[]).unwrap();
        assert!(filter.is_match_all());
        assert!(filter.to_document().is_empty());
        assert!(filter.matches(&doc! { "anything": 1 }));
    }

    #[test]
    fn test_anchors_are_taken_literally() {
        let anchored = QueryFilter::build(&pairs(&[("name", "^(a|c)$")])).unwrap();
        assert!(anchored.matches(&doc! { "name": "a" }));
        assert!(anchored.matches(&doc! { "name": "c" }));
        assert!(!anchored.matches(&doc! { "name": "b" }));
        assert!(!anchored.matches(&doc! { "name": "abc" }));

        let unanchored = QueryFilter::build(&pairs(&[("name", "a|c")])).unwrap();
        assert!(unanchored.matches(&doc! { "name": "abc" }));
    }

    #[test]
    fn test_clauses_are_anded() {
        let filter = QueryFilter::build(&pairs(&[("name", "^a"), ("value", "^A$")])).unwrap();
        assert!(filter.matches(&doc! { "name": "ab", "value": "A" }));
        assert!(!filter.matches(&doc! { "name": "ab", "value": "B" }));
        assert!(!filter.matches(&doc! { "name": "ab" }));
    }

    #[test]
    fn test_non_string_values_do_not_match() {
        let filter = QueryFilter::build(&pairs(&[("n", "1")])).unwrap();
        assert!(!filter.matches(&doc! { "n": 1 }));
        assert!(filter.matches(&doc! { "n": ["0", "1"] }));
    }

    #[test]
    fn test_dotted_field_matches_nested_value() {
        let filter = QueryFilter::build(&pairs(&[("address.city", "^Par")])).unwrap();
        assert!(filter.matches(&doc! { "address": { "city": "Paris" } }));
        assert!(!filter.matches(&doc! { "address": { "city": "Lyon" } }));
    }

    #[test]
    fn test_lookaround_is_rejected() {
        let err = QueryFilter::build(&pairs(&[("name", "^a(?=b)")])).unwrap_err();
        assert!(matches!(
            err,
            crate::error::DbUtilsError::Export(ExportError::InvalidFilterPattern { .. })
        ));
    }

    #[test]
    fn test_invalid_pattern_names_field() {
        let err = QueryFilter::build(&pairs(&[("name", "ok"), ("value", "(unclosed")])).unwrap_err();
        match err {
            crate::error::DbUtilsError::Export(ExportError::InvalidFilterPattern { field, .. }) => {
                assert_eq!(field, "value")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_to_document_flat() {
        let filter = QueryFilter::build(&pairs(&[("name", "^a"), ("value", "x")])).unwrap();
        assert_eq!(
            filter.to_document(),
            doc! { "name": { "$regex": "^a" }, "value": { "$regex": "x" } }
        );
    }

    #[test]
    fn test_to_document_repeated_field_uses_and() {
        let filter = QueryFilter::build(&pairs(&[("name", "^a"), ("name", "z$")])).unwrap();
        assert_eq!(
            filter.to_document(),
            doc! { "$and": [ { "name": { "$regex": "^a" } }, { "name": { "$regex": "z$" } } ] }
        );
    }
}
