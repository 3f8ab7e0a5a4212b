//! Core data types for the harvester.
//!
//! [`EnactmentId`] is the key every component agrees on; the
//! [`NormalizedDocument`] is the source-independent representation that the
//! normalizer produces and the Markdown renderer consumes.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use regex::Regex;

use crate::config::{PDF_ARCHIVE_NEW, PDF_ARCHIVE_OLD};
use crate::error::{HarvesterError, Result};

/// Colon form used by rkrattsbaser ("beteckning"): `2009:907`.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static COLON_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4}):(\d[\w .-]*)$").expect("valid regex"));

/// Hyphen form used by Riksdagen document ids: `sfs-2009-907`.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static HYPHEN_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^sfs-(\d{4})-(\d[\w.-]*)$").expect("valid regex"));

/// Characters not allowed in a file stem.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static FILE_STEM_UNSAFE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w-]").expect("valid regex"));

/// Which of the two accepted textual formats an ID was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdFormat {
    /// `YYYY:NNN`
    Colon,
    /// `sfs-YYYY-NNN`
    Hyphen,
}

/// Identifier of one SFS enactment.
///
/// Equality ignores the format the ID was written in, so `2009:907` and
/// `sfs-2009-907` name the same enactment and the same output file.
#[derive(Debug, Clone)]
pub struct EnactmentId {
    year: u16,
    number: String,
    format: IdFormat,
}

impl EnactmentId {
    /// Parse an ID in either accepted format.
    ///
    /// Anything that is not exactly one of the two formats is rejected;
    /// there is no guessing for inputs like `2009-907` or `907`.
    ///
    /// # Examples
    /// ```
    /// use sfs_harvester::types::EnactmentId;
    ///
    /// let id = EnactmentId::parse("sfs-2009-907").unwrap();
    /// assert_eq!(id.to_beteckning(), "2009:907");
    /// assert_eq!(id.to_riksdagen_id(), "sfs-2009-907");
    /// assert!(EnactmentId::parse("2009-907").is_err());
    /// ```
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();

        let (caps, format) = if let Some(caps) = COLON_ID_PATTERN.captures(trimmed) {
            (caps, IdFormat::Colon)
        } else if let Some(caps) = HYPHEN_ID_PATTERN.captures(trimmed) {
            (caps, IdFormat::Hyphen)
        } else {
            return Err(HarvesterError::InvalidEnactmentId(raw.to_string()));
        };

        let (Some(year), Some(number)) = (caps.get(1), caps.get(2)) else {
            return Err(HarvesterError::InvalidEnactmentId(raw.to_string()));
        };
        let year: u16 = year
            .as_str()
            .parse()
            .map_err(|_| HarvesterError::InvalidEnactmentId(raw.to_string()))?;
        let number = number.as_str().trim().to_string();

        Ok(Self {
            year,
            number,
            format,
        })
    }

    /// Year of publication in the SFS series.
    #[must_use]
    pub fn year(&self) -> u16 {
        self.year
    }

    /// Sequence part after the year, as written.
    #[must_use]
    pub fn number(&self) -> &str {
        &self.number
    }

    /// Format the ID was originally written in.
    #[must_use]
    pub fn format(&self) -> IdFormat {
        self.format
    }

    /// Leading numeric part of the sequence, if any.
    #[must_use]
    pub fn sequence(&self) -> Option<u32> {
        let digits: String = self.number.chars().take_while(char::is_ascii_digit).collect();
        digits.parse().ok()
    }

    /// Colon form used by rkrattsbaser, e.g. `2009:907`.
    #[must_use]
    pub fn to_beteckning(&self) -> String {
        format!("{}:{}", self.year, self.number)
    }

    /// Hyphen form used by Riksdagen, e.g. `sfs-2009-907`.
    #[must_use]
    pub fn to_riksdagen_id(&self) -> String {
        format!("sfs-{}-{}", self.year, self.number.replace(' ', "-"))
    }

    /// Deterministic file stem for the Markdown output, e.g. `sfs-2009-907`.
    ///
    /// # Examples
    /// ```
    /// use sfs_harvester::types::EnactmentId;
    ///
    /// let a = EnactmentId::parse("2025:764").unwrap();
    /// let b = EnactmentId::parse("sfs-2025-764").unwrap();
    /// assert_eq!(a.file_stem(), "sfs-2025-764");
    /// assert_eq!(a.file_stem(), b.file_stem());
    /// ```
    #[must_use]
    pub fn file_stem(&self) -> String {
        let beteckning = self.to_beteckning();
        format!("sfs-{}", FILE_STEM_UNSAFE.replace_all(&beteckning, "-"))
    }

    /// Link to the printed PDF of the enactment, when it can be derived.
    ///
    /// Enactments 1998:306 through 2018:159 live in the old archive and need
    /// only the ID. Later ones are filed by publication month, so they need
    /// `published` (`YYYY-MM-DD`). Older enactments have no PDF.
    #[must_use]
    pub fn pdf_url(&self, published: Option<&str>) -> Option<String> {
        let sequence = self.sequence()?;

        let in_old_archive = match self.year {
            1998 => sequence >= 306,
            1999..=2017 => true,
            2018 => sequence <= 159,
            _ => false,
        };

        if in_old_archive {
            let yy = self.year % 100;
            return Some(format!(
                "{PDF_ARCHIVE_OLD}/SFSdoc/{yy:02}/{yy:02}{sequence:04}.pdf"
            ));
        }

        if self.year < 2018 {
            return None;
        }

        let published = NaiveDate::parse_from_str(published?, "%Y-%m-%d").ok()?;
        Some(format!(
            "{PDF_ARCHIVE_NEW}/sites/default/files/sfs/{}-{:02}/SFS{}-{}.pdf",
            published.year(),
            published.month(),
            self.year,
            self.number
        ))
    }
}

impl PartialEq for EnactmentId {
    fn eq(&self, other: &Self) -> bool {
        self.year == other.year && self.number == other.number
    }
}

impl Eq for EnactmentId {}

impl std::hash::Hash for EnactmentId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.year.hash(state);
        self.number.hash(state);
    }
}

impl FromStr for EnactmentId {
    type Err = HarvesterError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for EnactmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.year, self.number)
    }
}

/// One amendment listed on an enactment.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Amendment {
    /// Colon-form ID of the amending enactment, as given by the source.
    pub id: String,
    pub title: String,
    /// Entry into force (`YYYY-MM-DD`).
    pub in_force: Option<String>,
    pub notes: String,
}

/// Metadata that ends up in the front matter.
///
/// Dates are kept as `YYYY-MM-DD` strings when the source value parses,
/// otherwise as the source wrote them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DocumentMetadata {
    pub published: Option<String>,
    pub issued: Option<String>,
    pub in_force: Option<String>,
    pub repealed: Option<String>,
    pub repealed_by: Option<String>,
    /// Förarbeten: the preparatory works the enactment is based on.
    pub preparatory_works: Option<String>,
    pub celex: Option<String>,
    pub eu_directive: bool,
    /// Källa: where the source says the text comes from.
    pub source_reference: Option<String>,
    pub amendments: Vec<Amendment>,
}

/// A block of body text, optionally introduced by a heading.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Section {
    pub heading: Option<String>,
    pub paragraphs: Vec<String>,
}

impl Section {
    #[must_use]
    pub fn new(heading: Option<String>) -> Self {
        Self {
            heading,
            paragraphs: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heading.is_none() && self.paragraphs.is_empty()
    }
}

/// Source-independent representation of one enactment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedDocument {
    pub id: EnactmentId,
    pub title: String,
    /// Issuing ministry or authority.
    pub authority: String,
    pub sections: Vec<Section>,
    pub last_changed: Option<NaiveDateTime>,
    pub metadata: DocumentMetadata,
    /// Set when the source payload could only be partly understood.
    pub partial: bool,
    /// Human-readable notes on what could not be understood.
    pub warnings: Vec<String>,
}

impl NormalizedDocument {
    /// Create an empty document for `id`.
    #[must_use]
    pub fn new(id: EnactmentId) -> Self {
        Self {
            id,
            title: String::new(),
            authority: String::new(),
            sections: Vec::new(),
            last_changed: None,
            metadata: DocumentMetadata::default(),
            partial: false,
            warnings: Vec::new(),
        }
    }

    /// Flag the document as partial and record why.
    pub fn mark_partial(&mut self, warning: impl Into<String>) {
        self.partial = true;
        self.warnings.push(warning.into());
    }

    /// Whether any section carries body text.
    #[must_use]
    pub fn has_body(&self) -> bool {
        self.sections.iter().any(|s| !s.paragraphs.is_empty())
    }

    /// Number of paragraphs across all sections.
    #[must_use]
    pub fn paragraph_count(&self) -> usize {
        self.sections.iter().map(|s| s.paragraphs.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: &str) -> EnactmentId {
        EnactmentId::parse(raw).unwrap()
    }

    #[test]
    fn test_parse_colon_form() {
        let parsed = id("2009:907");
        assert_eq!(parsed.year(), 2009);
        assert_eq!(parsed.number(), "907");
        assert_eq!(parsed.format(), IdFormat::Colon);
    }

    #[test]
    fn test_parse_hyphen_form() {
        let parsed = id("sfs-2009-907");
        assert_eq!(parsed.year(), 2009);
        assert_eq!(parsed.number(), "907");
        assert_eq!(parsed.format(), IdFormat::Hyphen);
        assert_eq!(parsed.to_beteckning(), "2009:907");
    }

    #[test]
    fn test_parse_trims_whitespace() {
        assert_eq!(id("  2025:764 ").to_beteckning(), "2025:764");
    }

    #[test]
    fn test_parse_old_enactment_with_suffix() {
        let parsed = id("1736:0123 2");
        assert_eq!(parsed.number(), "0123 2");
        assert_eq!(parsed.to_riksdagen_id(), "sfs-1736-0123-2");
        assert_eq!(parsed.file_stem(), "sfs-1736-0123-2");
    }

    #[test]
    fn test_parse_rejects_ambiguous_or_unknown_forms() {
        assert!(EnactmentId::parse("").is_err());
        assert!(EnactmentId::parse("907").is_err());
        assert!(EnactmentId::parse("2009-907").is_err());
        assert!(EnactmentId::parse("sfs-2009:907").is_err());
        assert!(EnactmentId::parse("sfs2009-907").is_err());
        assert!(EnactmentId::parse("09:907").is_err());
        assert!(EnactmentId::parse("2009:").is_err());
        assert!(EnactmentId::parse("../2009:907").is_err());
    }

    #[test]
    fn test_formats_are_equal() {
        assert_eq!(id("2025:764"), id("sfs-2025-764"));
        assert_ne!(id("2025:764"), id("2025:765"));
    }

    #[test]
    fn test_display_uses_colon_form() {
        assert_eq!(id("sfs-2025-764").to_string(), "2025:764");
    }

    #[test]
    fn test_file_stem_is_path_safe() {
        assert_eq!(id("2025:764").file_stem(), "sfs-2025-764");
        assert_eq!(id("1998:1000.5").file_stem(), "sfs-1998-1000-5");
    }

    #[test]
    fn test_pdf_url_old_archive() {
        assert_eq!(
            id("1998:306").pdf_url(None).as_deref(),
            Some("https://rkrattsdb.gov.se/SFSdoc/98/980306.pdf")
        );
        assert_eq!(
            id("2009:907").pdf_url(None).as_deref(),
            Some("https://rkrattsdb.gov.se/SFSdoc/09/090907.pdf")
        );
        assert_eq!(
            id("2018:159").pdf_url(Some("2018-03-01")).as_deref(),
            Some("https://rkrattsdb.gov.se/SFSdoc/18/180159.pdf")
        );
    }

    #[test]
    fn test_pdf_url_new_archive_needs_publication_date() {
        assert_eq!(
            id("2025:764").pdf_url(Some("2025-06-24")).as_deref(),
            Some("https://svenskforfattningssamling.se/sites/default/files/sfs/2025-06/SFS2025-764.pdf")
        );
        assert_eq!(id("2025:764").pdf_url(None), None);
        assert_eq!(id("2025:764").pdf_url(Some("not a date")), None);
    }

    #[test]
    fn test_pdf_url_before_archives() {
        assert_eq!(id("1998:305").pdf_url(None), None);
        assert_eq!(id("1962:700").pdf_url(Some("1962-12-21")), None);
    }

    #[test]
    fn test_mark_partial() {
        let mut doc = NormalizedDocument::new(id("2025:764"));
        assert!(!doc.partial);
        doc.mark_partial("no body");
        assert!(doc.partial);
        assert_eq!(doc.warnings, vec!["no body".to_string()]);
    }

    #[test]
    fn test_paragraph_count() {
        let mut doc = NormalizedDocument::new(id("2025:764"));
        assert!(!doc.has_body());
        doc.sections.push(Section {
            heading: Some("Inledande bestämmelser".to_string()),
            paragraphs: vec!["1 § Text.".to_string(), "2 § Mer text.".to_string()],
        });
        doc.sections.push(Section::new(Some("Tom".to_string())));
        assert!(doc.has_body());
        assert_eq!(doc.paragraph_count(), 2);
    }
}
