//! Reconciliation of input records against a collection
//!
//! Each input record ends in exactly one outcome:
//!
//! - **Inserted**: written as a new document
//! - **Updated**: merged into the single document sharing its key value
//! - **Skipped**: that document already agrees on every compared field
//! - **Errored**: could not be processed; the run continues
//!
//! Records are handled strictly one after another in input order.

pub mod compare;
pub mod input;
pub mod timestamps;

use std::fmt;
use std::sync::Arc;

use mongodb::bson::{Bson, DateTime, Document};
use tokio::io::AsyncBufRead;
use tracing::{debug, info, warn};

use crate::error::{ConfigError, DbUtilsError, RecordError, Result};
use crate::export::progress::ProgressTracker;
use crate::formatter::bson_utils::{BsonConverter, CanonicalJsonConverter};
use crate::store::DocumentStore;

pub use compare::{ComparisonFieldSet, documents_equal};
pub use input::{InputRecord, JsonLinesReader};
pub use timestamps::TimestampPolicy;

/// Per-run reconciliation settings
#[derive(Debug, Clone, Default)]
pub struct ReconcileOptions {
    /// Field correlating input records with stored documents
    pub key_field: Option<String>,
    /// Look up existing documents instead of inserting blindly
    pub create_or_update: bool,
    /// Fields deciding whether a matched document differs
    pub compare: ComparisonFieldSet,
    /// Creation/update timestamp handling
    pub timestamps: TimestampPolicy,
}

impl ReconcileOptions {
    /// Reject option combinations that cannot run
    pub fn validate(&self) -> Result<()> {
        if self.create_or_update && self.key_field.as_deref().is_none_or(str::is_empty) {
            return Err(ConfigError::MissingRequiredConfig(
                "--id-field is required with --create-or-update".to_string(),
            )
            .into());
        }
        Ok(())
    }
}

/// Terminal state of one input record
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    /// Stored as a new document (with its identity)
    Inserted(Document),
    /// Merged document as written
    Updated(Document),
    /// Input record left unwritten
    Skipped(Document),
    Errored(RecordError),
}

impl RecordOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            RecordOutcome::Inserted(_) => "inserted",
            RecordOutcome::Updated(_) => "updated",
            RecordOutcome::Skipped(_) => "skipped",
            RecordOutcome::Errored(_) => "errored",
        }
    }
}

/// Outcome counts for a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errored: usize,
}

impl ReconcileSummary {
    /// Count one outcome
    pub fn record(&mut self, outcome: &RecordOutcome) {
        match outcome {
            RecordOutcome::Inserted(_) => self.inserted += 1,
            RecordOutcome::Updated(_) => self.updated += 1,
            RecordOutcome::Skipped(_) => self.skipped += 1,
            RecordOutcome::Errored(_) => self.errored += 1,
        }
    }

    /// Records seen
    pub fn total(&self) -> usize {
        self.inserted + self.updated + self.skipped + self.errored
    }

    pub fn has_errors(&self) -> bool {
        self.errored > 0
    }
}

impl fmt::Display for ReconcileSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "inserted={} updated={} skipped={} errored={}",
            self.inserted, self.updated, self.skipped, self.errored
        )
    }
}

/// Maps input records to store writes
pub struct Reconciler {
    store: Arc<dyn DocumentStore>,
    options: ReconcileOptions,
    clock: fn() -> DateTime,
    json: CanonicalJsonConverter,
}

impl Reconciler {
    /// Create an engine; fails on unusable options
    pub fn new(store: Arc<dyn DocumentStore>, options: ReconcileOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            store,
            options,
            clock: DateTime::now,
            json: CanonicalJsonConverter::new(),
        })
    }

    /// Replace the source of "now" used for timestamps
    pub fn with_clock(mut self, clock: fn() -> DateTime) -> Self {
        self.clock = clock;
        self
    }

    pub fn options(&self) -> &ReconcileOptions {
        &self.options
    }

    /// Drain `input`, reconciling every record in order.
    ///
    /// Per-record failures are counted in the summary. Only a failure to
    /// read the input itself ends the run early.
    pub async fn run<R>(
        &self,
        input: &mut JsonLinesReader<R>,
        progress: &ProgressTracker,
    ) -> Result<ReconcileSummary>
    where
        R: AsyncBufRead + Unpin,
    {
        info!(
            create_or_update = self.options.create_or_update,
            key_field = self.options.key_field.as_deref().unwrap_or(""),
            timestamps = self.options.timestamps.is_enabled(),
            "Starting reconciliation"
        );

        let mut summary = ReconcileSummary::default();
        while let Some(record) = input.next_record().await? {
            self.process(record, &mut summary).await;
            progress.advance(1);
        }
        progress.finish();

        info!(%summary, "Reconciliation finished");
        Ok(summary)
    }

    /// Reconcile one input line, parsed or not
    pub async fn process(
        &self,
        record: InputRecord,
        summary: &mut ReconcileSummary,
    ) -> RecordOutcome {
        match record {
            Ok(doc) => self.reconcile(doc, summary).await,
            Err(err) => Self::tally(RecordOutcome::Errored(err), summary),
        }
    }

    /// Reconcile one record and count its outcome
    pub async fn reconcile(
        &self,
        record: Document,
        summary: &mut ReconcileSummary,
    ) -> RecordOutcome {
        let outcome = self.decide(record).await;
        Self::tally(outcome, summary)
    }

    fn tally(outcome: RecordOutcome, summary: &mut ReconcileSummary) -> RecordOutcome {
        match &outcome {
            RecordOutcome::Errored(err) => warn!("{err}"),
            other => debug!(outcome = other.label(), "Record reconciled"),
        }
        summary.record(&outcome);
        outcome
    }

    async fn decide(&self, mut record: Document) -> RecordOutcome {
        self.options.timestamps.strip_input(&mut record);

        let key_field = match (&self.options.key_field, self.options.create_or_update) {
            (Some(field), true) => field.as_str(),
            _ => return self.insert(record).await,
        };

        let Some(key_value) = record
            .get(key_field)
            .filter(|value| !matches!(value, Bson::Null))
            .cloned()
        else {
            return RecordOutcome::Errored(RecordError::MissingKeyField {
                field: key_field.to_string(),
                record: self.compact(&record),
            });
        };

        let mut matches = match self.store.find_by_field(key_field, &key_value).await {
            Ok(matches) => matches,
            Err(err) => return RecordOutcome::Errored(self.store_failure(&record, err)),
        };

        match matches.len() {
            0 => self.insert(record).await,
            1 => {
                let existing = matches.remove(0);
                self.update_if_changed(existing, record, key_field).await
            }
            n => RecordOutcome::Errored(RecordError::AmbiguousKeyMatch {
                field: key_field.to_string(),
                value: self.json.convert(&key_value).to_string(),
                matches: n,
            }),
        }
    }

    async fn insert(&self, mut record: Document) -> RecordOutcome {
        self.options
            .timestamps
            .stamp_insert(&mut record, (self.clock)());

        match self.store.insert(record.clone()).await {
            Ok(id) => {
                if !record.contains_key("_id") {
                    record.insert("_id", id);
                }
                RecordOutcome::Inserted(record)
            }
            Err(err) => RecordOutcome::Errored(self.store_failure(&record, err)),
        }
    }

    async fn update_if_changed(
        &self,
        existing: Document,
        record: Document,
        key_field: &str,
    ) -> RecordOutcome {
        let timestamps = &self.options.timestamps;
        let excluded = [
            key_field,
            "_id",
            timestamps.created_field(),
            timestamps.updated_field(),
        ];
        let fields = self.options.compare.resolve(&record, &excluded);

        if documents_equal(&existing, &record, &fields) {
            return RecordOutcome::Skipped(record);
        }

        let Some(id) = existing.get("_id").cloned() else {
            return RecordOutcome::Errored(RecordError::StoreWriteFailure {
                record: self.compact(&record),
                cause: "stored document has no _id".to_string(),
            });
        };

        let mut merged = merge(existing, record);
        timestamps.stamp_update(&mut merged, (self.clock)());

        match self.store.replace_by_id(&id, merged.clone()).await {
            Ok(()) => RecordOutcome::Updated(merged),
            Err(err) => RecordOutcome::Errored(self.store_failure(&merged, err)),
        }
    }

    fn store_failure(&self, record: &Document, err: DbUtilsError) -> RecordError {
        RecordError::StoreWriteFailure {
            record: self.compact(record),
            cause: err.to_string(),
        }
    }

    fn compact(&self, record: &Document) -> String {
        self.json.convert_document(record).to_string()
    }
}

/// Overlay `record` onto `existing`. Fields absent from the record keep
/// their stored value and the stored `_id` always wins.
fn merge(mut existing: Document, record: Document) -> Document {
    for (key, value) in record {
        if key != "_id" {
            existing.insert(key, value);
        }
    }
    existing
}
