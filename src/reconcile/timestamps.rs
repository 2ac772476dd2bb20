//! Creation/update timestamp bookkeeping

use mongodb::bson::{DateTime, Document};

use crate::config::TimestampConfig;

/// Decides which timestamp fields the engine writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampPolicy {
    enabled: bool,
    created_field: String,
    updated_field: String,
}

impl TimestampPolicy {
    /// Managed timestamps with the given field names
    pub fn enabled(created_field: impl Into<String>, updated_field: impl Into<String>) -> Self {
        Self {
            enabled: true,
            created_field: created_field.into(),
            updated_field: updated_field.into(),
        }
    }

    /// Records pass through untouched
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Build from configuration and the run's on/off switch
    pub fn from_config(config: &TimestampConfig, enabled: bool) -> Self {
        Self {
            enabled,
            created_field: config.created_field.clone(),
            updated_field: config.updated_field.clone(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn created_field(&self) -> &str {
        &self.created_field
    }

    pub fn updated_field(&self) -> &str {
        &self.updated_field
    }

    /// Drop timestamp values supplied by the input; managed timestamps are
    /// always computed here.
    pub fn strip_input(&self, record: &mut Document) {
        if self.enabled {
            record.remove(&self.created_field);
            record.remove(&self.updated_field);
        }
    }

    /// Stamp a document about to be inserted
    pub fn stamp_insert(&self, doc: &mut Document, now: DateTime) {
        if self.enabled {
            doc.insert(self.created_field.clone(), now);
        }
    }

    /// Stamp a document about to be updated. `created` is left alone.
    pub fn stamp_update(&self, doc: &mut Document, now: DateTime) {
        if self.enabled {
            doc.insert(self.updated_field.clone(), now);
        }
    }
}

impl Default for TimestampPolicy {
    fn default() -> Self {
        let config = TimestampConfig::default();
        Self::from_config(&config, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    #[test]
    fn test_insert_sets_created_only() {
        let policy = TimestampPolicy::default();
        let now = DateTime::from_millis(42);
        let mut doc = doc! { "name": "a" };

        policy.stamp_insert(&mut doc, now);

        assert_eq!(doc.get_datetime("created_at").unwrap(), &now);
        assert!(!doc.contains_key("updated_at"));
    }

    #[test]
    fn test_update_leaves_created_untouched() {
        let policy = TimestampPolicy::default();
        let created = DateTime::from_millis(1);
        let now = DateTime::from_millis(2);
        let mut doc = doc! { "name": "a", "created_at": created };

        policy.stamp_update(&mut doc, now);

        assert_eq!(doc.get_datetime("created_at").unwrap(), &created);
        assert_eq!(doc.get_datetime("updated_at").unwrap(), &now);
    }

    #[test]
    fn test_strip_input_removes_supplied_timestamps() {
        let policy = TimestampPolicy::default();
        let mut doc = doc! { "name": "a", "created_at": "yesterday", "updated_at": 5 };
        policy.strip_input(&mut doc);
        assert_eq!(doc, doc! { "name": "a" });
    }

    #[test]
    fn test_disabled_is_passthrough() {
        let policy = TimestampPolicy::disabled();
        let mut doc = doc! { "name": "a", "created_at": "yesterday" };
        let original = doc.clone();

        policy.strip_input(&mut doc);
        policy.stamp_insert(&mut doc, DateTime::now());
        policy.stamp_update(&mut doc, DateTime::now());

        assert_eq!(doc, original);
    }

    #[test]
    fn test_custom_field_names() {
        let policy = TimestampPolicy::enabled("createdAt", "updatedAt");
        let mut doc = doc! {};
        policy.stamp_insert(&mut doc, DateTime::from_millis(7));
        assert!(doc.contains_key("createdAt"));
        assert!(!doc.contains_key("created_at"));
    }
}
