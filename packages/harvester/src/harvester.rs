//! Batch runs that tie fetching, normalizing, rendering and writing together.

use std::thread;
use std::time::Duration;

use chrono::NaiveDateTime;

use crate::config::HarvesterConfig;
use crate::error::{HarvesterError, Result};
use crate::markdown::render;
use crate::normalize::normalize;
use crate::source::{RawDocument, RkrattsbaserClient, SourceAdapter};
use crate::summary::RunSummary;
use crate::types::EnactmentId;
use crate::writer::{MarkdownWriter, WriteOutcome};

/// Per-run settings that are not part of the source configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunOptions {
    /// Pause between consecutive per-document requests.
    pub request_delay: Duration,
}

impl From<&HarvesterConfig> for RunOptions {
    fn from(config: &HarvesterConfig) -> Self {
        Self {
            request_delay: config.request_delay,
        }
    }
}

/// Receives progress while a batch runs.
pub trait Progress {
    /// Called once the number of documents is known.
    fn start(&self, _total: usize) {}
    /// Called before each document is handled.
    fn advance(&self, _id: &str) {}
    /// Called when the batch is over, whether it succeeded or not.
    fn finish(&self) {}
}

/// No progress reporting.
impl Progress for () {}

/// Normalize, render and write one raw document.
///
/// Returns the write outcome and whether the document was partial.
pub fn process_document(raw: RawDocument, writer: &MarkdownWriter) -> Result<(WriteOutcome, bool)> {
    let doc = normalize(raw);
    let content = render(&doc)?;
    let outcome = writer.write(&doc.id, &content)?;
    Ok((outcome, doc.partial))
}

/// Download the enactments in `ids` through `adapter` and write them.
///
/// IDs are taken as given by the user or the listing: unparseable ones are
/// skipped with an invalid-input entry. Per-document failures become skips;
/// only a fatal error aborts the run. If every attempted document failed
/// transiently the run fails with [`HarvesterError::SourceUnreachable`].
pub fn download_documents(
    adapter: &dyn SourceAdapter,
    ids: &[String],
    writer: &MarkdownWriter,
    options: RunOptions,
    progress: &dyn Progress,
) -> Result<RunSummary> {
    writer.ensure_output_dir()?;
    progress.start(ids.len());

    let result = download_all(adapter, ids, writer, options, progress);
    progress.finish();

    let summary = result?;
    tracing::info!(source = %adapter.source(), %summary, "Download finished");
    check_reachable(summary, &adapter.source().to_string())
}

fn download_all(
    adapter: &dyn SourceAdapter,
    ids: &[String],
    writer: &MarkdownWriter,
    options: RunOptions,
    progress: &dyn Progress,
) -> Result<RunSummary> {
    let mut summary = RunSummary::default();
    let mut requested = false;

    for raw_id in ids {
        progress.advance(raw_id);

        let id = match EnactmentId::parse(raw_id) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(id = %raw_id, "Skipping invalid SFS ID");
                summary.record_skip(raw_id.as_str(), &e);
                continue;
            }
        };

        if requested && !options.request_delay.is_zero() {
            thread::sleep(options.request_delay);
        }
        requested = true;

        match adapter
            .fetch_document(&id)
            .and_then(|raw| process_document(raw, writer))
        {
            Ok((outcome, partial)) => {
                tracing::debug!(%id, ?outcome, partial, "Processed document");
                summary.record_written(outcome, partial);
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::warn!(%id, error = %e, "Skipping document");
                summary.record_skip(id.to_string(), &e);
            }
        }
    }

    Ok(summary)
}

/// Fetch every enactment updated after `since` and write it.
///
/// Overlapping windows are safe: a document seen again is rewritten with
/// identical content and counted as unchanged.
pub fn fetch_updated(
    adapter: &RkrattsbaserClient,
    since: NaiveDateTime,
    writer: &MarkdownWriter,
    progress: &dyn Progress,
) -> Result<RunSummary> {
    writer.ensure_output_dir()?;

    let results = adapter.fetch_updated_since(since)?;
    if results.is_empty() {
        tracing::info!(%since, "No updated enactments");
    }

    progress.start(results.len());
    let mut summary = RunSummary::default();

    for result in results {
        let raw = match result {
            Ok(raw) => raw,
            Err(e) => {
                let label = match &e {
                    HarvesterError::MalformedResponse { context, .. } => context.clone(),
                    _ => "unknown".to_string(),
                };
                tracing::warn!(hit = %label, error = %e, "Skipping search hit");
                summary.record_skip(label, &e);
                continue;
            }
        };

        let id = raw.id().to_string();
        progress.advance(&id);

        match process_document(raw, writer) {
            Ok((outcome, partial)) => summary.record_written(outcome, partial),
            Err(e) if e.is_fatal() => {
                progress.finish();
                return Err(e);
            }
            Err(e) => {
                tracing::warn!(%id, error = %e, "Skipping document");
                summary.record_skip(id, &e);
            }
        }
    }

    progress.finish();
    tracing::info!(%summary, "Incremental fetch finished");
    Ok(summary)
}

fn check_reachable(summary: RunSummary, service: &str) -> Result<RunSummary> {
    if summary.is_total_transient_failure() {
        return Err(HarvesterError::SourceUnreachable {
            service: service.to_string(),
            message: format!(
                "all {} requested documents failed; last error: {}",
                summary.transient_failures(),
                summary
                    .skipped
                    .last()
                    .map_or("unknown", |s| s.reason.as_str())
            ),
        });
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::source::Source;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::tempdir;

    /// In-memory source keyed by colon-form ID.
    struct FakeSource {
        pages: HashMap<String, String>,
        failing: Vec<String>,
        requests: RefCell<Vec<String>>,
    }

    impl FakeSource {
        fn new(pages: &[(&str, &str)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(id, html)| ((*id).to_string(), (*html).to_string()))
                    .collect(),
                failing: Vec::new(),
                requests: RefCell::new(Vec::new()),
            }
        }

        fn failing(mut self, id: &str) -> Self {
            self.failing.push(id.to_string());
            self
        }
    }

    impl SourceAdapter for FakeSource {
        fn source(&self) -> Source {
            Source::Riksdagen
        }

        fn fetch_document(&self, id: &EnactmentId) -> Result<RawDocument> {
            let key = id.to_beteckning();
            self.requests.borrow_mut().push(key.clone());

            if self.failing.contains(&key) {
                return Err(HarvesterError::RetriesExhausted {
                    attempts: 3,
                    message: "Server error: 503".to_string(),
                });
            }
            match self.pages.get(&key) {
                Some(html) => Ok(RawDocument::HtmlDocument {
                    id: id.clone(),
                    html: html.clone(),
                }),
                None => Err(HarvesterError::NotFound { id: key }),
            }
        }
    }

    fn ids(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| (*s).to_string()).collect()
    }

    const PAGE_764: &str = "<h2>Förordning (2025:764) om stöd</h2><hr><p>1 § Text.</p>";
    const PAGE_765: &str = "<h2>Lag (2025:765) om test</h2><hr><p>1 § Annan text.</p>";

    #[test]
    fn test_download_writes_one_file_per_id() {
        let dir = tempdir().unwrap();
        let writer = MarkdownWriter::new(dir.path());
        let source = FakeSource::new(&[("2025:764", PAGE_764), ("2025:765", PAGE_765)]);

        let summary = download_documents(
            &source,
            &ids(&["2025:764", "sfs-2025-765"]),
            &writer,
            RunOptions::default(),
            &(),
        )
        .unwrap();

        assert_eq!(summary.created, 2);
        assert!(summary.skipped.is_empty());
        let content = fs::read_to_string(dir.path().join("sfs-2025-764.md")).unwrap();
        assert!(content.contains("# Förordning om stöd\n"));
        assert!(dir.path().join("sfs-2025-765.md").is_file());
    }

    #[test]
    fn test_failures_are_skipped_and_the_batch_continues() {
        let dir = tempdir().unwrap();
        let writer = MarkdownWriter::new(dir.path());
        let source = FakeSource::new(&[("2025:764", PAGE_764)]).failing("2025:766");

        let summary = download_documents(
            &source,
            &ids(&["2025:999", "2025-764", "2025:766", "2025:764"]),
            &writer,
            RunOptions::default(),
            &(),
        )
        .unwrap();

        assert_eq!(summary.created, 1);
        let kinds: Vec<(String, ErrorKind)> = summary
            .skipped
            .iter()
            .map(|s| (s.id.clone(), s.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("2025:999".to_string(), ErrorKind::NotFound),
                ("2025-764".to_string(), ErrorKind::InvalidInput),
                ("2025:766".to_string(), ErrorKind::Transient),
            ]
        );
        // The invalid ID never reached the source
        assert_eq!(source.requests.borrow().len(), 3);
    }

    #[test]
    fn test_all_transient_failures_escalate() {
        let dir = tempdir().unwrap();
        let writer = MarkdownWriter::new(dir.path());
        let source = FakeSource::new(&[])
            .failing("2025:764")
            .failing("2025:765");

        let err = download_documents(
            &source,
            &ids(&["2025:764", "2025:765"]),
            &writer,
            RunOptions::default(),
            &(),
        )
        .unwrap_err();

        assert!(matches!(err, HarvesterError::SourceUnreachable { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_rerun_is_idempotent() {
        let dir = tempdir().unwrap();
        let writer = MarkdownWriter::new(dir.path());
        let source = FakeSource::new(&[("2025:764", PAGE_764)]);
        let ids = ids(&["2025:764"]);

        download_documents(&source, &ids, &writer, RunOptions::default(), &()).unwrap();
        let first = fs::read(dir.path().join("sfs-2025-764.md")).unwrap();

        let summary =
            download_documents(&source, &ids, &writer, RunOptions::default(), &()).unwrap();
        let second = fs::read(dir.path().join("sfs-2025-764.md")).unwrap();

        assert_eq!(summary.unchanged, 1);
        assert_eq!(first, second);
    }

    #[test]
    fn test_partial_documents_are_written_and_counted() {
        let dir = tempdir().unwrap();
        let writer = MarkdownWriter::new(dir.path());
        let source = FakeSource::new(&[("2025:764", "<p>text utan rubrik</p>")]);

        let summary = download_documents(
            &source,
            &ids(&["2025:764"]),
            &writer,
            RunOptions::default(),
            &(),
        )
        .unwrap();

        assert_eq!(summary.created, 1);
        assert_eq!(summary.partial, 1);
        let content = fs::read_to_string(dir.path().join("sfs-2025-764.md")).unwrap();
        assert!(content.contains("# SFS 2025:764\n"));
    }

    #[test]
    fn test_unwritable_output_aborts() {
        let dir = tempdir().unwrap();
        let occupied = dir.path().join("occupied");
        fs::write(&occupied, "").unwrap();
        let writer = MarkdownWriter::new(&occupied);
        let source = FakeSource::new(&[("2025:764", PAGE_764)]);

        let err = download_documents(
            &source,
            &ids(&["2025:764"]),
            &writer,
            RunOptions::default(),
            &(),
        )
        .unwrap_err();

        assert!(matches!(err, HarvesterError::OutputUnwritable { .. }));
        assert!(source.requests.borrow().is_empty());
    }
}
