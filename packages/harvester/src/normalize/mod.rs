//! Conversion of raw source payloads into [`NormalizedDocument`]s.
//!
//! Normalization is pure and total: it never performs I/O and never fails.
//! Whatever cannot be understood is recorded on the document as a warning
//! and the document is flagged `partial`.

pub mod html;
pub mod json;
pub mod text;

use crate::source::RawDocument;
use crate::types::NormalizedDocument;

/// Normalize a raw document from any source.
///
/// # Examples
/// ```
/// use sfs_harvester::normalize::normalize;
/// use sfs_harvester::source::RawDocument;
/// use sfs_harvester::types::EnactmentId;
///
/// let raw = RawDocument::HtmlDocument {
///     id: EnactmentId::parse("2009:907").unwrap(),
///     html: "<h2>Lag (2009:907) om test</h2><hr><p>1 § Text.</p>".to_string(),
/// };
/// let doc = normalize(raw);
/// assert_eq!(doc.title, "Lag om test");
/// assert!(!doc.partial);
/// ```
#[must_use]
pub fn normalize(raw: RawDocument) -> NormalizedDocument {
    let doc = match raw {
        RawDocument::JsonRecord { id, record } => json::normalize_record(id, &record),
        RawDocument::HtmlDocument { id, html } => html::normalize_html(id, &html),
    };

    if doc.partial {
        tracing::warn!(
            id = %doc.id,
            warnings = ?doc.warnings,
            "Document only partly understood"
        );
    } else {
        tracing::debug!(
            id = %doc.id,
            sections = doc.sections.len(),
            paragraphs = doc.paragraph_count(),
            "Normalized document"
        );
    }

    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EnactmentId;
    use serde_json::json;

    #[test]
    fn test_dispatch_json_record() {
        let raw = RawDocument::JsonRecord {
            id: EnactmentId::parse("2025:764").unwrap(),
            record: json!({
                "rubrik": "Förordning om stöd",
                "fulltext": { "forfattningstext": "1 § Text." }
            }),
        };
        let doc = normalize(raw);
        assert_eq!(doc.title, "Förordning om stöd");
        assert!(!doc.partial);
    }

    #[test]
    fn test_id_survives_unusable_payloads() {
        let id = EnactmentId::parse("2025:765").unwrap();
        let from_json = normalize(RawDocument::JsonRecord {
            id: id.clone(),
            record: json!(null),
        });
        let from_html = normalize(RawDocument::HtmlDocument {
            id: id.clone(),
            html: "<<<>>>".to_string(),
        });

        assert_eq!(from_json.id, id);
        assert_eq!(from_html.id, id);
        assert!(from_json.partial);
        assert!(from_html.partial);
    }
}
