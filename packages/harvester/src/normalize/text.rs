//! Text cleanup and body structuring shared by both normalizer variants.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::types::Section;

/// Paragraphs this long or longer are never headings.
pub const HEADING_MAX_CHARS: usize = 300;

/// SFS number in parentheses inside a title, e.g. "(2009:907)".
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static TITLE_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\(\d{4}:\d+[^)]*\)\s*").expect("valid regex"));

/// Entry-into-force marker: "/Träder i kraft I:2025-07-01/".
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static IN_FORCE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/Träder i kraft[^/]*/\s*").expect("valid regex"));

/// Numbered list item: "1. ", "12. ".
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static NUMBERED_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.").expect("valid regex"));

/// Dash or bullet list item.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static BULLET_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-–•*]\s").expect("valid regex"));

/// Paragraph marker opening a paragraph: "1 §", "3 a §", "12§".
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
pub(crate) static PARAGRAPH_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+ ?(?:[a-z] )?§").expect("valid regex"));

/// Collapse whitespace, apply NFC and trim.
///
/// Non-breaking spaces count as whitespace; soft hyphens and control
/// characters other than whitespace are removed.
pub fn clean_inline(text: &str) -> String {
    let normalized: String = text
        .nfc()
        .filter(|c| *c != '\u{ad}' && !(c.is_control() && !c.is_whitespace()))
        .map(|c| if c == '\u{a0}' { ' ' } else { c })
        .collect();
    normalized.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Clean a title: drop the enactment's own SFS number and collapse whitespace.
///
/// Only the first number in parentheses is the enactment's own; later ones
/// name other enactments and stay. "Lag (2009:907) om test" becomes
/// "Lag om test".
pub fn clean_title(title: &str) -> String {
    // First match only; later numbers refer to other enactments
    clean_inline(&TITLE_ID_PATTERN.replacen(title, 1, " "))
}

/// Remove entry-into-force markers from body text.
pub fn strip_in_force_markers(text: &str) -> String {
    IN_FORCE_MARKER.replace_all(text, "").into_owned()
}

/// Normalize a date or timestamp to `YYYY-MM-DD`.
///
/// Values that do not start with a date are returned trimmed as-is;
/// blank values become `None`.
pub fn normalize_date(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    let date_part = value.split(['T', ' ']).next().unwrap_or(value);
    match NaiveDate::parse_from_str(date_part, "%Y-%m-%d") {
        Ok(date) => Some(date.format("%Y-%m-%d").to_string()),
        Err(_) => Some(value.to_string()),
    }
}

/// Parse a source timestamp.
///
/// Accepts RFC 3339 (the offset is dropped), naive ISO timestamps with or
/// without fractional seconds, and bare dates.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.naive_local());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Some(parsed);
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Split plain body text into paragraphs.
///
/// Paragraphs are separated by blank lines; the lines inside one paragraph
/// are joined with single spaces.
pub fn split_paragraphs(text: &str) -> Vec<String> {
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let text = strip_in_force_markers(&text);

    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            push_paragraph(&mut paragraphs, &current);
            current.clear();
        } else {
            current.push(line.trim());
        }
    }
    push_paragraph(&mut paragraphs, &current);

    paragraphs
}

fn push_paragraph(paragraphs: &mut Vec<String>, lines: &[&str]) {
    if lines.is_empty() {
        return;
    }
    let joined = clean_inline(&lines.join(" "));
    if !joined.is_empty() {
        paragraphs.push(joined);
    }
}

/// Whether `paragraph` reads as a heading.
///
/// Headings are short, have no closing punctuation, are not list items or
/// paragraph markers, and are not the lead-in of a numbered list.
pub fn is_heading(paragraph: &str, next: Option<&str>) -> bool {
    paragraph.chars().count() < HEADING_MAX_CHARS
        && !paragraph.ends_with(['.', ':', ',', ';'])
        && !NUMBERED_ITEM.is_match(paragraph)
        && !BULLET_ITEM.is_match(paragraph)
        && !PARAGRAPH_MARKER.is_match(paragraph)
        && !next.is_some_and(|n| n.starts_with("1."))
}

/// Group paragraphs into sections, opening a new section at every heading.
///
/// Paragraphs before the first heading form a section without heading.
pub fn build_sections(paragraphs: Vec<String>) -> Vec<Section> {
    let mut sections: Vec<Section> = Vec::new();

    let mut iter = paragraphs.into_iter().peekable();
    while let Some(paragraph) = iter.next() {
        if is_heading(&paragraph, iter.peek().map(String::as_str)) {
            sections.push(Section::new(Some(paragraph)));
            continue;
        }
        match sections.last_mut() {
            Some(section) => section.paragraphs.push(paragraph),
            None => sections.push(Section {
                heading: None,
                paragraphs: vec![paragraph],
            }),
        }
    }

    sections
}

/// Append `incoming` to `sections`, folding a leading heading-less section
/// into the current last section.
pub fn append_sections(sections: &mut Vec<Section>, incoming: Vec<Section>) {
    for section in incoming {
        if section.heading.is_none() {
            if let Some(last) = sections.last_mut() {
                last.paragraphs.extend(section.paragraphs);
                continue;
            }
        }
        sections.push(section);
    }
}
