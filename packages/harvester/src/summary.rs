//! Per-run bookkeeping of written and skipped documents.

use std::fmt;

use crate::error::{ErrorKind, HarvesterError};
use crate::writer::WriteOutcome;

/// A document that was not written, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedDocument {
    /// The ID as given or listed; may be unparseable.
    pub id: String,
    pub reason: String,
    pub kind: ErrorKind,
}

/// Counts and skip list for one batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// Written documents that were only partly understood.
    pub partial: usize,
    pub skipped: Vec<SkippedDocument>,
}

impl RunSummary {
    /// Record a successfully written document.
    pub fn record_written(&mut self, outcome: WriteOutcome, partial: bool) {
        match outcome {
            WriteOutcome::Created => self.created += 1,
            WriteOutcome::Updated => self.updated += 1,
            WriteOutcome::Unchanged => self.unchanged += 1,
        }
        if partial {
            self.partial += 1;
        }
    }

    /// Record a document that was skipped because of `error`.
    pub fn record_skip(&mut self, id: impl Into<String>, error: &HarvesterError) {
        self.skipped.push(SkippedDocument {
            id: id.into(),
            reason: error.to_string(),
            kind: error.kind(),
        });
    }

    /// Number of documents written, whatever the outcome.
    #[must_use]
    pub fn written(&self) -> usize {
        self.created + self.updated + self.unchanged
    }

    /// Documents that were requested from a source (invalid IDs are not).
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.written()
            + self
                .skipped
                .iter()
                .filter(|s| s.kind != ErrorKind::InvalidInput)
                .count()
    }

    #[must_use]
    pub fn transient_failures(&self) -> usize {
        self.skipped
            .iter()
            .filter(|s| s.kind == ErrorKind::Transient)
            .count()
    }

    /// Whether every attempted document failed transiently.
    ///
    /// That points at the source being down rather than at individual
    /// documents, so the run is treated as failed.
    #[must_use]
    pub fn is_total_transient_failure(&self) -> bool {
        let attempted = self.attempted();
        attempted > 0 && self.transient_failures() == attempted
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "created: {}, updated: {}, unchanged: {}, partial: {}, skipped: {}",
            self.created,
            self.updated,
            self.unchanged,
            self.partial,
            self.skipped.len()
        )
    }
}
