//! Source adapters: fetch raw enactment payloads from the upstream services.
//!
//! Two services publish SFS:
//!
//! - [`riksdagen`]: Riksdagen's open data API, one HTML page per enactment
//!   plus an ID listing of the whole collection.
//! - [`rkrattsbaser`]: the Government Offices' legal database, a search
//!   proxy that returns structured JSON records.

pub mod riksdagen;
pub mod rkrattsbaser;

use std::fmt;

use clap::ValueEnum;
use serde_json::Value;

use crate::config::HarvesterConfig;
use crate::error::Result;
use crate::types::EnactmentId;

pub use riksdagen::RiksdagenClient;
pub use rkrattsbaser::RkrattsbaserClient;

/// Payload of one enactment as the source delivered it.
#[derive(Debug, Clone, PartialEq)]
pub enum RawDocument {
    /// A structured JSON record from rkrattsbaser.
    JsonRecord { id: EnactmentId, record: Value },
    /// An HTML page from Riksdagen.
    HtmlDocument { id: EnactmentId, html: String },
}

impl RawDocument {
    /// ID the document was requested or listed under.
    #[must_use]
    pub fn id(&self) -> &EnactmentId {
        match self {
            Self::JsonRecord { id, .. } | Self::HtmlDocument { id, .. } => id,
        }
    }
}

/// Fetches single enactments from one upstream service.
pub trait SourceAdapter {
    /// Which service this adapter talks to.
    fn source(&self) -> Source;

    /// Fetch one enactment.
    ///
    /// Returns [`HarvesterError::NotFound`](crate::error::HarvesterError::NotFound)
    /// when the service does not know the ID.
    fn fetch_document(&self, id: &EnactmentId) -> Result<RawDocument>;
}

/// Which service the `download` command reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Source {
    /// HTML pages from data.riksdagen.se
    #[default]
    Riksdagen,
    /// JSON records from beta.rkrattsbaser.gov.se
    Rkrattsbaser,
}

impl Source {
    /// Build the adapter for this source.
    pub fn connect(self, config: &HarvesterConfig) -> Result<Box<dyn SourceAdapter>> {
        Ok(match self {
            Self::Riksdagen => Box::new(RiksdagenClient::new(config)?),
            Self::Rkrattsbaser => Box::new(RkrattsbaserClient::new(config)?),
        })
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Riksdagen => "riksdagen",
            Self::Rkrattsbaser => "rkrattsbaser",
        })
    }
}
