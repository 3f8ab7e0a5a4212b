//! Normalization of rkrattsbaser JSON records.

use serde_json::Value;

use super::text::{
    build_sections, clean_inline, clean_title, normalize_date, parse_timestamp, split_paragraphs,
};
use crate::types::{Amendment, EnactmentId, NormalizedDocument};

/// Normalize one search hit `_source` record.
///
/// Missing or wrongly typed keys leave the corresponding field empty.
pub fn normalize_record(id: EnactmentId, record: &Value) -> NormalizedDocument {
    let mut doc = NormalizedDocument::new(id);

    if !record.is_object() {
        doc.mark_partial("record is not a JSON object");
        return doc;
    }

    if let Some(beteckning) = str_at(record, "/beteckning") {
        if EnactmentId::parse(beteckning).ok().as_ref() != Some(&doc.id) {
            doc.warnings
                .push(format!("record beteckning '{beteckning}' differs from requested id"));
        }
    }

    doc.title = str_at(record, "/rubrik").map(clean_title).unwrap_or_default();
    doc.authority = str_at(record, "/organisation/namn")
        .map(clean_inline)
        .unwrap_or_default();
    doc.last_changed = str_at(record, "/uppdateradDateTime").and_then(parse_timestamp);

    let meta = &mut doc.metadata;
    meta.published = str_at(record, "/publiceradDateTime").and_then(normalize_date);
    meta.in_force = str_at(record, "/ikraftDateTime").and_then(normalize_date);
    meta.issued = str_at(record, "/fulltext/utfardadDateTime").and_then(normalize_date);
    meta.repealed = str_at(record, "/upphavdDateTime").and_then(normalize_date);
    meta.preparatory_works = non_empty(str_at(record, "/forarbeten"));
    meta.celex = non_empty(str_at(record, "/celexnummer"));
    meta.eu_directive = record
        .pointer("/eUdirektiv")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    meta.amendments = record
        .pointer("/andringsforfattningar")
        .and_then(Value::as_array)
        .map(|entries| entries.iter().filter_map(amendment).collect())
        .unwrap_or_default();

    if doc.title.is_empty() {
        doc.mark_partial("record has no rubrik");
    }

    match str_at(record, "/fulltext/forfattningstext") {
        Some(body) if !body.trim().is_empty() => {
            doc.sections = build_sections(split_paragraphs(body));
        }
        _ => doc.mark_partial("record has no fulltext.forfattningstext"),
    }

    doc
}

fn amendment(entry: &Value) -> Option<Amendment> {
    let id = non_empty(str_at(entry, "/beteckning"))?;
    Some(Amendment {
        id,
        title: str_at(entry, "/rubrik").map(clean_inline).unwrap_or_default(),
        in_force: str_at(entry, "/ikraftDateTime").and_then(normalize_date),
        notes: str_at(entry, "/anteckningar")
            .map(clean_inline)
            .unwrap_or_default(),
    })
}

fn str_at<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
    value.pointer(pointer).and_then(Value::as_str)
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(clean_inline).filter(|v| !v.is_empty())
}
