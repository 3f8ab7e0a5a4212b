//! SFS Harvester - Download Swedish statutes (SFS) and convert them to Markdown.
//!
//! Enactments are fetched from Riksdagen's open data API (HTML) or from
//! rkrattsbaser (JSON), normalized into one source-independent document
//! model, rendered as Markdown with YAML front matter and written atomically
//! to one file per enactment.
//!
//! # Example
//!
//! ```
//! use sfs_harvester::types::EnactmentId;
//!
//! let id = EnactmentId::parse("2009:907").unwrap();
//! assert_eq!(id.to_riksdagen_id(), "sfs-2009-907");
//! assert_eq!(id.file_stem(), "sfs-2009-907");
//! ```
//!
//! # Architecture
//!
//! - [`source`]: Source adapters for Riksdagen and rkrattsbaser
//! - [`normalize`]: Raw payload to [`NormalizedDocument`]
//! - [`markdown`]: Front matter, escaping and rendering
//! - [`writer`]: Atomic file output
//! - [`harvester`]: Batch runs and the incremental fetch
//! - [`summary`]: Per-run counts and skip list
//! - [`types`]: Core data types ([`EnactmentId`], [`NormalizedDocument`])
//! - [`config`]: Constants, runtime configuration and date parsing
//! - [`http`]: HTTP client and retry policy
//! - [`error`]: Error types and Result alias
//! - [`cli`]: Command-line interface

pub mod cli;
pub mod config;
pub mod error;
pub mod harvester;
pub mod http;
pub mod markdown;
pub mod normalize;
pub mod source;
pub mod summary;
pub mod types;
pub mod writer;

// Re-export main functions
pub use harvester::{download_documents, fetch_updated, process_document, RunOptions};

// Re-export commonly used items
pub use config::HarvesterConfig;
pub use error::{ErrorKind, HarvesterError, Result};
pub use source::{RawDocument, Source, SourceAdapter};
pub use summary::RunSummary;
pub use types::{EnactmentId, NormalizedDocument, Section};
pub use writer::{MarkdownWriter, WriteOutcome};
