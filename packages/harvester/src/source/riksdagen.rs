//! Riksdagen open data adapter (`data.riksdagen.se`).
//!
//! Serves one HTML page per enactment under `/dokument/<sfs-id>.html` and a
//! comma-separated listing of every SFS document ID.

use std::collections::HashSet;

use reqwest::blocking::Client;

use super::{RawDocument, Source, SourceAdapter};
use crate::config::HarvesterConfig;
use crate::error::{ErrorKind, HarvesterError, Result};
use crate::http::{create_client, response_text, send_with_retry, RetryPolicy};
use crate::types::EnactmentId;

/// Client for Riksdagen's document API.
#[derive(Debug, Clone)]
pub struct RiksdagenClient {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl RiksdagenClient {
    pub fn new(config: &HarvesterConfig) -> Result<Self> {
        Ok(Self {
            client: create_client(config.timeout)?,
            base_url: config.riksdagen_url.clone(),
            retry: config.retry,
        })
    }

    /// URL of the HTML page for `id`.
    #[must_use]
    pub fn document_url(&self, id: &EnactmentId) -> String {
        format!("{}/dokument/{}.html", self.base_url, id.to_riksdagen_id())
    }

    /// List every SFS document ID, optionally only those from `year`.
    ///
    /// IDs come back as Riksdagen writes them (`sfs-2009-907`), in listing
    /// order with duplicates removed. Failing to list is fatal: without the
    /// listing there is nothing to harvest.
    pub fn list_document_ids(&self, year: Option<u16>) -> Result<Vec<String>> {
        let url = format!(
            "{}/dokumentlista/?sok=&doktyp=SFS&utformat=iddump&a=s",
            self.base_url
        );
        tracing::info!(%url, ?year, "Listing SFS documents");

        let response =
            send_with_retry(&self.retry, "SFS document listing", || self.client.get(&url))
                .map_err(|e| match e.kind() {
                    ErrorKind::Transient | ErrorKind::NotFound => {
                        HarvesterError::SourceUnreachable {
                            service: "riksdagen".to_string(),
                            message: e.to_string(),
                        }
                    }
                    _ => e,
                })?;

        let body = response_text(response, "SFS document listing")?;
        let ids = parse_id_dump(&body, year);
        tracing::info!(count = ids.len(), "Listed SFS documents");
        Ok(ids)
    }
}

impl SourceAdapter for RiksdagenClient {
    fn source(&self) -> Source {
        Source::Riksdagen
    }

    fn fetch_document(&self, id: &EnactmentId) -> Result<RawDocument> {
        let url = self.document_url(id);
        tracing::debug!(%id, %url, "Fetching HTML document");

        let response = send_with_retry(&self.retry, &id.to_string(), || self.client.get(&url))?;
        let html = response_text(response, &url)?;

        if html.trim().is_empty() {
            return Err(HarvesterError::NotFound { id: id.to_string() });
        }

        Ok(RawDocument::HtmlDocument {
            id: id.clone(),
            html,
        })
    }
}

/// Split an `iddump` body into IDs.
fn parse_id_dump(body: &str, year: Option<u16>) -> Vec<String> {
    let prefix = year.map(|y| format!("sfs-{y}-"));
    let mut seen = HashSet::new();

    body.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .filter(|id| {
            prefix
                .as_deref()
                .is_none_or(|p| id.to_lowercase().starts_with(p))
        })
        .filter(|id| seen.insert(id.to_string()))
        .map(str::to_string)
        .collect()
}
