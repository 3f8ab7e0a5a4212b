//! Normalization of Riksdagen HTML pages.
//!
//! A Riksdagen SFS page looks roughly like this:
//!
//! ```text
//! <h2>Lag (2009:907) om ...</h2>
//! <b>SFS nr</b>: 2009:907<br>
//! <b>Departement/myndighet</b>: Finansdepartementet<br>
//! <b>Utfärdad</b>: 2009-07-02<br>
//! <hr>
//! <h3>Inledande bestämmelser</h3>
//! <p>1 § ...</p>
//! ```
//!
//! or carries the whole body in one `<pre>` block. Everything before the
//! first `<hr>` is header; label/value pairs there become metadata.

use std::mem;

use ego_tree::iter::Edge;
use ego_tree::{NodeId, NodeRef};
use scraper::{Html, Node};

use super::text::{
    append_sections, build_sections, clean_inline, clean_title, normalize_date,
    split_paragraphs, strip_in_force_markers,
};
use crate::types::{EnactmentId, NormalizedDocument, Section};

/// Class of the table-of-contents container, which is skipped.
const TOC_CLASS: &str = "sfstoc";

/// Elements whose content is not text and is dropped entirely.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "template", "noscript"];

/// Elements that end the current paragraph when they open or close.
const BLOCK_ELEMENTS: &[&str] = &[
    "p", "div", "li", "ul", "ol", "table", "tr", "td", "th", "dd", "dt", "dl", "blockquote",
    "section", "article", "body",
];

/// Normalize one Riksdagen HTML page. Never fails.
///
/// The page is parsed with html5ever, which recovers from broken markup and
/// decodes every character reference; the walker then reads the tree in
/// document order.
pub fn normalize_html(id: EnactmentId, html: &str) -> NormalizedDocument {
    let page = Html::parse_document(html);
    let mut walker = PageWalker::new(NormalizedDocument::new(id));
    for edge in page.tree.root().traverse() {
        match edge {
            Edge::Open(node) => walker.open(node),
            Edge::Close(node) => walker.close(node),
        }
    }
    walker.finish()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Header,
    Body,
}

/// Progress through one `<b>Label</b>: value` pair in the header.
#[derive(Debug, Default)]
enum MetaPair {
    #[default]
    Idle,
    Label(String),
    Value {
        label: String,
        text: String,
        href: Option<String>,
    },
}

struct PageWalker {
    doc: NormalizedDocument,
    phase: Phase,
    title: Option<String>,
    title_buf: Option<String>,
    title_element: Option<String>,
    in_title_element: bool,
    heading_buf: Option<String>,
    paragraph: String,
    pre: Option<String>,
    pair: MetaPair,
    /// Element whose whole subtree is being skipped.
    skip: Option<NodeId>,
}

impl PageWalker {
    fn new(doc: NormalizedDocument) -> Self {
        Self {
            doc,
            phase: Phase::Header,
            title: None,
            title_buf: None,
            title_element: None,
            in_title_element: false,
            heading_buf: None,
            paragraph: String::new(),
            pre: None,
            pair: MetaPair::Idle,
            skip: None,
        }
    }

    fn open(&mut self, node: NodeRef<'_, Node>) {
        if self.skip.is_some() {
            return;
        }

        match node.value() {
            Node::Text(text) => self.text(text),
            Node::Element(element) => {
                let name = element.name();
                if RAW_TEXT_ELEMENTS.contains(&name) || element.classes().any(|c| c == TOC_CLASS)
                {
                    self.skip = Some(node.id());
                    return;
                }
                if let Some(buf) = &mut self.pre {
                    if name == "br" {
                        buf.push('\n');
                    }
                    return;
                }
                self.start_tag(name, element.attr("href").map(str::to_string));
            }
            _ => {}
        }
    }

    fn close(&mut self, node: NodeRef<'_, Node>) {
        if let Some(skipped) = self.skip {
            if skipped == node.id() {
                self.skip = None;
            }
            return;
        }

        let Node::Element(element) = node.value() else {
            return;
        };
        let name = element.name();
        if self.pre.is_some() {
            if name == "pre" {
                self.finish_pre();
            }
            return;
        }
        self.end_tag(name);
    }

    fn start_tag(&mut self, name: &str, href: Option<String>) {
        match name {
            "h1" | "h2"
                if self.phase == Phase::Header
                    && self.title.is_none()
                    && self.title_buf.is_none() =>
            {
                self.title_buf = Some(String::new());
            }
            "title" => self.in_title_element = true,
            // Once the title is known, every heading level opens a section
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                self.enter_body();
                self.heading_buf = Some(String::new());
            }
            "hr" => self.enter_body(),
            "pre" => {
                self.enter_body();
                self.pre = Some(String::new());
            }
            "br" => match self.phase {
                Phase::Header => self.finish_pair(),
                Phase::Body => self.flush_paragraph(),
            },
            "b" | "strong" if self.phase == Phase::Header && self.title_buf.is_none() => {
                self.finish_pair();
                self.pair = MetaPair::Label(String::new());
            }
            "a" => {
                if let MetaPair::Value { href: slot, .. } = &mut self.pair {
                    if slot.is_none() {
                        *slot = href;
                    }
                }
            }
            _ if BLOCK_ELEMENTS.contains(&name) => self.block_boundary(),
            _ => {}
        }
    }

    fn end_tag(&mut self, name: &str) {
        match name {
            "h1" | "h2" if self.title_buf.is_some() => {
                if let Some(buf) = self.title_buf.take() {
                    let title = clean_title(&buf);
                    if !title.is_empty() {
                        self.title = Some(title);
                    }
                }
            }
            "title" => self.in_title_element = false,
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => self.finish_heading(),
            "b" | "strong" => {
                if let MetaPair::Label(label) = &mut self.pair {
                    let label = mem::take(label);
                    self.pair = MetaPair::Value {
                        label,
                        text: String::new(),
                        href: None,
                    };
                }
            }
            _ if BLOCK_ELEMENTS.contains(&name) => self.block_boundary(),
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if let Some(buf) = &mut self.pre {
            buf.push_str(text);
            return;
        }
        if self.in_title_element {
            self.title_element
                .get_or_insert_with(String::new)
                .push_str(text);
            return;
        }
        if let Some(buf) = &mut self.title_buf {
            buf.push_str(text);
            return;
        }
        if let Some(buf) = &mut self.heading_buf {
            buf.push_str(text);
            return;
        }

        match (&mut self.pair, self.phase) {
            (MetaPair::Label(label), _) => label.push_str(text),
            (MetaPair::Value { text: value, .. }, _) => value.push_str(text),
            (MetaPair::Idle, Phase::Header) => {
                // Loose header text without a label means the body has begun
                if !text.trim().is_empty() {
                    self.phase = Phase::Body;
                    self.paragraph.push_str(text);
                }
            }
            (MetaPair::Idle, Phase::Body) => self.paragraph.push_str(text),
        }
    }

    fn block_boundary(&mut self) {
        match self.phase {
            Phase::Header => self.finish_pair(),
            Phase::Body => self.flush_paragraph(),
        }
    }

    fn enter_body(&mut self) {
        self.finish_pair();
        self.flush_paragraph();
        self.phase = Phase::Body;
    }

    fn finish_pair(&mut self) {
        let MetaPair::Value { label, text, href } = mem::take(&mut self.pair) else {
            return;
        };
        let label = clean_inline(&label);
        let label = label.trim_end_matches(':').trim().to_lowercase();
        let value = clean_inline(text.trim_start().trim_start_matches(':'));

        let meta = &mut self.doc.metadata;
        match label.as_str() {
            "sfs nr" | "sfs-nummer" => {
                if EnactmentId::parse(&value).ok().as_ref() != Some(&self.doc.id) {
                    self.doc
                        .warnings
                        .push(format!("page SFS nr '{value}' differs from requested id"));
                }
            }
            "departement/myndighet" | "departement" | "myndighet" => {
                if !value.is_empty() {
                    self.doc.authority = value;
                }
            }
            "utfärdad" => meta.issued = normalize_date(&value),
            "ikraft" => meta.in_force = normalize_date(&value),
            "upphävd" => meta.repealed = normalize_date(&value),
            "författningen har upphävts genom" => {
                meta.repealed_by = Some(value).filter(|v| !v.is_empty());
            }
            "källa" => {
                meta.source_reference = href.or(Some(value)).filter(|v| !v.is_empty());
            }
            "förarbeten" => meta.preparatory_works = Some(value).filter(|v| !v.is_empty()),
            "celex-nr" | "celex" => meta.celex = Some(value).filter(|v| !v.is_empty()),
            other => tracing::debug!(label = other, "Ignoring header field"),
        }
    }

    fn flush_paragraph(&mut self) {
        let paragraph = clean_inline(&strip_in_force_markers(&mem::take(&mut self.paragraph)));
        if paragraph.is_empty() {
            return;
        }
        match self.doc.sections.last_mut() {
            Some(section) => section.paragraphs.push(paragraph),
            None => self.doc.sections.push(Section {
                heading: None,
                paragraphs: vec![paragraph],
            }),
        }
    }

    fn finish_heading(&mut self) {
        if let Some(buf) = self.heading_buf.take() {
            let heading = clean_inline(&buf);
            if !heading.is_empty() {
                self.doc.sections.push(Section::new(Some(heading)));
            }
        }
    }

    fn finish_pre(&mut self) {
        if let Some(text) = self.pre.take() {
            let sections = build_sections(split_paragraphs(&text));
            append_sections(&mut self.doc.sections, sections);
        }
    }

    fn finish(mut self) -> NormalizedDocument {
        self.finish_pair();
        self.finish_pre();
        self.finish_heading();
        self.flush_paragraph();

        if let Some(buf) = self.title_buf.take() {
            self.title = Some(clean_title(&buf)).filter(|t| !t.is_empty());
        }
        let title = self
            .title
            .or_else(|| self.title_element.as_deref().map(clean_title))
            .unwrap_or_default();

        let mut doc = self.doc;
        doc.sections.retain(|s| !s.is_empty());
        doc.title = title;

        if doc.title.is_empty() {
            doc.mark_partial("page has no title");
        }
        if !doc.has_body() {
            doc.mark_partial("page has no body text");
        }
        doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn id() -> EnactmentId {
        EnactmentId::parse("sfs-2009-907").unwrap()
    }

    const PAGE: &str = r##"<html><head><title>Lag (2009:907) om test - Riksdagen</title>
<style>h2 { color: red }</style></head><body>
<div class="sfstoc"><ul><li><a href="#K1">1 kap.</a></li></ul></div>
<h2>Lag (2009:907) om test</h2>
<b>SFS nr</b>: 2009:907<br>
<b>Departement/myndighet</b>: Finansdepartementet S3<br>
<b>Utfärdad</b>: 2009-07-02<br>
<b>Ikraft</b>: 2010-01-01<br>
<b>Ändringsregister</b>: <a href="http://rkrattsbaser.gov.se/sfsr?bet=2009:907">SFSR</a><br>
<b>Källa</b>: <a href="http://rkrattsbaser.gov.se/sfst?bet=2009:907">Fulltext</a><br>
<hr>
<h3>Inledande bestämmelser</h3>
<p><a name="P1"></a><b>1 §</b> Denna lag
gäller&nbsp;test.</p>
<p>/Träder i kraft I:2025-07-01/ 2 § Ny lydelse.</p>
<h3>Ikraftträdande</h3>
Denna lag träder i kraft den 1 januari 2010.<br>
</body></html>"##;

    #[test]
    fn test_normalize_page() {
        let doc = normalize_html(id(), PAGE);

        assert!(!doc.partial, "warnings: {:?}", doc.warnings);
        assert_eq!(doc.title, "Lag om test");
        assert_eq!(doc.authority, "Finansdepartementet S3");
        assert_eq!(doc.metadata.issued.as_deref(), Some("2009-07-02"));
        assert_eq!(doc.metadata.in_force.as_deref(), Some("2010-01-01"));
        assert_eq!(
            doc.metadata.source_reference.as_deref(),
            Some("http://rkrattsbaser.gov.se/sfst?bet=2009:907")
        );

        assert_eq!(doc.sections.len(), 2);
        assert_eq!(doc.sections[0].heading.as_deref(), Some("Inledande bestämmelser"));
        assert_eq!(
            doc.sections[0].paragraphs,
            vec!["1 § Denna lag gäller test.", "2 § Ny lydelse."]
        );
        assert_eq!(doc.sections[1].heading.as_deref(), Some("Ikraftträdande"));
        assert_eq!(
            doc.sections[1].paragraphs,
            vec!["Denna lag träder i kraft den 1 januari 2010."]
        );
    }

    #[test]
    fn test_table_of_contents_and_styles_are_skipped() {
        let doc = normalize_html(id(), PAGE);
        let all_text: Vec<&str> = doc
            .sections
            .iter()
            .flat_map(|s| s.paragraphs.iter().map(String::as_str))
            .collect();
        assert!(all_text.iter().all(|p| !p.contains("1 kap.")));
        assert!(all_text.iter().all(|p| !p.contains("color")));
    }

    #[test]
    fn test_pre_block_uses_text_rules() {
        let html = "<h2>Förordning (2025:764) om stöd</h2><hr><pre>\
Allmänt\n\n1 § Denna förordning\ngäller stöd.\n\n2 § Stöd ges &amp; betalas.\n</pre>";
        let doc = normalize_html(EnactmentId::parse("2025:764").unwrap(), html);

        assert!(!doc.partial);
        assert_eq!(doc.title, "Förordning om stöd");
        assert_eq!(doc.sections.len(), 1);
        assert_eq!(doc.sections[0].heading.as_deref(), Some("Allmänt"));
        assert_eq!(
            doc.sections[0].paragraphs,
            vec!["1 § Denna förordning gäller stöd.", "2 § Stöd ges & betalas."]
        );
    }

    #[test]
    fn test_title_falls_back_to_title_element() {
        let html = "<html><head><title>Lag (2009:907) om test</title></head>\
<body><p>1 § Text.</p></body></html>";
        let doc = normalize_html(id(), html);
        assert_eq!(doc.title, "Lag om test");
        assert!(!doc.partial);
    }

    #[test]
    fn test_missing_title_and_body_is_partial() {
        let doc = normalize_html(id(), "<html><body><hr></body></html>");
        assert!(doc.partial);
        assert_eq!(doc.warnings.len(), 2);
        assert_eq!(doc.id, id());
    }

    #[test]
    fn test_truncated_markup_never_fails() {
        let html = "<h2>Lag om test</h2><hr><p>1 § Text som <b>slutar";
        let doc = normalize_html(id(), html);
        assert_eq!(doc.title, "Lag om test");
        assert_eq!(doc.sections[0].paragraphs, vec!["1 § Text som slutar"]);
    }

    #[test]
    fn test_body_without_hr() {
        let html = "<h2>Lag om test</h2>\n<p>1 § Text.</p>";
        let doc = normalize_html(id(), html);
        assert!(!doc.partial);
        assert_eq!(doc.paragraph_count(), 1);
    }

    #[test]
    fn test_repealed_metadata() {
        let html = "<h2>Lag om gammalt</h2>\
<b>Upphävd</b>: 2020-01-01<br>\
<b>Författningen har upphävts genom</b>: SFS 2019:1000<br><hr><p>Text.</p>";
        let doc = normalize_html(id(), html);
        assert_eq!(doc.metadata.repealed.as_deref(), Some("2020-01-01"));
        assert_eq!(doc.metadata.repealed_by.as_deref(), Some("SFS 2019:1000"));
    }

    #[test]
    fn test_named_character_references_are_decoded() {
        let html = "<h2>Lag om fran&ccedil;ais</h2><hr>\
<p>1 &sect; Halva &frac12; och &ntilde; samt &szlig;.</p>";
        let doc = normalize_html(id(), html);

        assert_eq!(doc.title, "Lag om français");
        assert_eq!(doc.sections[0].paragraphs, vec!["1 § Halva ½ och ñ samt ß."]);
    }

    #[test]
    fn test_null_reference_does_not_reach_text() {
        let html = "<h2>Lag om test</h2><hr><p>1 § Noll&#0;tecken.</p>";
        let doc = normalize_html(id(), html);

        assert!(doc.sections[0].paragraphs[0].starts_with("1 § Noll"));
        assert!(!doc.sections[0].paragraphs[0].contains('\0'));
    }

    #[test]
    fn test_body_h2_opens_a_section() {
        let html = "<h2>Lag om test</h2><hr>1 &sect; Text.\
<h2>Övergångsbestämmelser</h2>Denna lag träder i kraft.";
        let doc = normalize_html(id(), html);

        assert_eq!(doc.title, "Lag om test");
        assert_eq!(doc.sections.len(), 2);
        assert_eq!(doc.sections[0].paragraphs, vec!["1 § Text."]);
        assert_eq!(doc.sections[1].heading.as_deref(), Some("Övergångsbestämmelser"));
        assert_eq!(doc.sections[1].paragraphs, vec!["Denna lag träder i kraft."]);
    }

    #[test]
    fn test_body_h1_and_h2_inside_paragraphs_are_headings() {
        let html = "<h1>Lag om test</h1><hr><p>1 § Text.</p>\
<h1>1 kap. Allmänt</h1><p>2 § Mer.</p><h2>Övergångsbestämmelser</h2><p>Slut.</p>";
        let doc = normalize_html(id(), html);

        assert_eq!(doc.title, "Lag om test");
        let headings: Vec<Option<&str>> =
            doc.sections.iter().map(|s| s.heading.as_deref()).collect();
        assert_eq!(
            headings,
            vec![None, Some("1 kap. Allmänt"), Some("Övergångsbestämmelser")]
        );
        assert_eq!(doc.sections[2].paragraphs, vec!["Slut."]);
    }
}
