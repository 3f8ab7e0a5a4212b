//! rkrattsbaser adapter (`beta.rkrattsbaser.gov.se`).
//!
//! The service exposes an Elasticsearch proxy that takes a raw query wrapped
//! in `{"searchIndexes": ["Sfs"], "api": "search", "json": ...}`. Every
//! search hit's `_source` is a complete enactment record, so the incremental
//! fetch needs no per-document request.

use chrono::NaiveDateTime;
use reqwest::blocking::Client;
use reqwest::header::REFERER;
use serde_json::{json, Value};

use super::{RawDocument, Source, SourceAdapter};
use crate::config::{HarvesterConfig, SEARCH_MAX_WINDOW, SEARCH_PAGE_SIZE};
use crate::error::{ErrorKind, HarvesterError, Result};
use crate::http::{create_client, response_text, send_with_retry, RetryPolicy};
use crate::types::EnactmentId;

/// Client for the rkrattsbaser search proxy.
#[derive(Debug, Clone)]
pub struct RkrattsbaserClient {
    client: Client,
    base_url: String,
    search_url: String,
    retry: RetryPolicy,
    page_size: usize,
}

impl RkrattsbaserClient {
    pub fn new(config: &HarvesterConfig) -> Result<Self> {
        Ok(Self {
            client: create_client(config.timeout)?,
            base_url: config.rkrattsbaser_url.clone(),
            search_url: config.search_url(),
            retry: config.retry,
            page_size: SEARCH_PAGE_SIZE,
        })
    }

    /// Set how many hits each search page asks for (at least 1).
    #[must_use]
    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = size.max(1);
        self
    }

    /// Fetch every published enactment updated after `since`.
    ///
    /// Hits are returned in `beteckning` order. A hit without a usable
    /// `beteckning` becomes an `Err` entry so the caller can report it and
    /// carry on; failing to run the search at all is an `Err` for the whole
    /// call.
    pub fn fetch_updated_since(&self, since: NaiveDateTime) -> Result<Vec<Result<RawDocument>>> {
        let since = since.format("%Y-%m-%dT%H:%M:%S").to_string();
        tracing::info!(%since, "Searching for updated enactments");

        let mut documents = Vec::new();
        let mut window = next_window(0, self.page_size);

        while let Some((from, size)) = window {
            let query = json!({
                "query": {
                    "bool": {
                        "must": [
                            { "range": { "uppdateradDateTime": { "gt": since } } },
                            { "term": { "publicerad": true } }
                        ]
                    }
                },
                "sort": [{ "beteckningSortable.sort": { "order": "asc" } }],
                "from": from,
                "size": size
            });

            let body = self
                .search("updated enactments", &query, None)
                .map_err(as_unreachable)?;
            let hits = search_hits(&body, "updated enactments")?;
            let page_len = hits.len();

            if from == 0 {
                let total = body.pointer("/hits/total/value").and_then(Value::as_u64);
                tracing::info!(?total, "Updated enactments found");
                if total.is_some_and(|t| t > SEARCH_MAX_WINDOW as u64) {
                    tracing::warn!(
                        ?total,
                        window = SEARCH_MAX_WINDOW,
                        "More updates than one search can return; use a shorter window"
                    );
                }
            }

            documents.extend(
                hits.iter()
                    .enumerate()
                    .map(|(i, hit)| document_from_hit(hit, from + i)),
            );

            if page_len < size {
                break;
            }
            window = next_window(from + size, self.page_size);
        }

        Ok(documents)
    }

    /// Referer the web client sends for an enactment page.
    fn referer(&self, id: &EnactmentId) -> String {
        format!(
            "{}/sfs/item?bet={}&tab=forfattningstext",
            self.base_url,
            id.to_beteckning().replace(':', "%3A")
        )
    }

    /// Run one raw search and return the decoded response body.
    fn search(&self, subject: &str, query: &Value, referer: Option<&str>) -> Result<Value> {
        let payload = json!({
            "searchIndexes": ["Sfs"],
            "api": "search",
            "json": query
        });

        let response = send_with_retry(&self.retry, subject, || {
            let request = self.client.post(&self.search_url).json(&payload);
            match referer {
                Some(referer) => request.header(REFERER, referer),
                None => request,
            }
        })?;

        let text = response_text(response, subject)?;
        Ok(serde_json::from_str(&text)?)
    }
}

impl SourceAdapter for RkrattsbaserClient {
    fn source(&self) -> Source {
        Source::Rkrattsbaser
    }

    fn fetch_document(&self, id: &EnactmentId) -> Result<RawDocument> {
        let beteckning = id.to_beteckning();
        tracing::debug!(%id, "Searching for enactment record");

        let query = json!({
            "query": {
                "bool": {
                    "must": [
                        { "term": { "beteckning.keyword": beteckning } },
                        { "term": { "publicerad": true } }
                    ]
                }
            },
            "size": 1
        });

        let body = self.search(&beteckning, &query, Some(&self.referer(id)))?;
        let Some(hit) = search_hits(&body, &beteckning)?.first() else {
            return Err(HarvesterError::NotFound { id: beteckning });
        };

        let record = hit
            .get("_source")
            .filter(|s| s.is_object())
            .cloned()
            .ok_or_else(|| HarvesterError::MalformedResponse {
                context: beteckning.clone(),
                message: "search hit has no _source record".to_string(),
            })?;

        Ok(RawDocument::JsonRecord {
            id: id.clone(),
            record,
        })
    }
}

/// The `(from, size)` of the search page starting at `from`, or `None` once
/// the result window is used up. The last page shrinks to fit the window.
fn next_window(from: usize, page_size: usize) -> Option<(usize, usize)> {
    (from < SEARCH_MAX_WINDOW).then(|| (from, page_size.min(SEARCH_MAX_WINDOW - from)))
}

/// The `hits.hits` array of a search response.
fn search_hits<'a>(body: &'a Value, context: &str) -> Result<&'a Vec<Value>> {
    body.pointer("/hits/hits")
        .and_then(Value::as_array)
        .ok_or_else(|| HarvesterError::MalformedResponse {
            context: context.to_string(),
            message: "search response has no hits.hits array".to_string(),
        })
}

/// Turn one search hit into a raw document keyed by its own `beteckning`.
fn document_from_hit(hit: &Value, position: usize) -> Result<RawDocument> {
    let Some(record) = hit.get("_source").filter(|s| s.is_object()) else {
        return Err(HarvesterError::MalformedResponse {
            context: format!("search hit {position}"),
            message: "no _source record".to_string(),
        });
    };

    let beteckning = record
        .get("beteckning")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let id = EnactmentId::parse(beteckning).map_err(|_| HarvesterError::MalformedResponse {
        context: format!("search hit {position}"),
        message: format!("unusable beteckning '{beteckning}'"),
    })?;

    Ok(RawDocument::JsonRecord {
        id,
        record: record.clone(),
    })
}

/// A search that cannot run at all means the source is unreachable.
fn as_unreachable(error: HarvesterError) -> HarvesterError {
    match error.kind() {
        ErrorKind::Transient | ErrorKind::NotFound => HarvesterError::SourceUnreachable {
            service: "rkrattsbaser".to_string(),
            message: error.to_string(),
        },
        _ => error,
    }
}
