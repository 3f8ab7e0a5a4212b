//! Deterministic Markdown rendering of a normalized enactment.

use super::escape::{escape_inline, escape_text};
use super::frontmatter::front_matter;
use crate::error::Result;
use crate::normalize::text::PARAGRAPH_MARKER;
use crate::types::NormalizedDocument;

/// Render a document to Markdown.
///
/// Layout: front matter, `# title`, a metadata line, then one `## heading`
/// per section followed by its paragraphs. Blocks are separated by one
/// blank line and the output ends in exactly one newline.
///
/// # Examples
/// ```
/// use sfs_harvester::markdown::render;
/// use sfs_harvester::types::{EnactmentId, NormalizedDocument, Section};
///
/// let mut doc = NormalizedDocument::new(EnactmentId::parse("2025:764").unwrap());
/// doc.title = "Förordning om stöd".to_string();
/// doc.sections.push(Section {
///     heading: None,
///     paragraphs: vec!["1 § Text.".to_string()],
/// });
///
/// let md = render(&doc).unwrap();
/// assert!(md.contains("# Förordning om stöd\n"));
/// assert!(md.contains("**1 §** Text."));
/// ```
pub fn render(doc: &NormalizedDocument) -> Result<String> {
    let mut blocks: Vec<String> = Vec::new();

    let title = if doc.title.is_empty() {
        format!("SFS {}", doc.id)
    } else {
        doc.title.clone()
    };
    blocks.push(format!("# {}", escape_inline(&title)));
    blocks.push(metadata_line(doc));

    for section in &doc.sections {
        if let Some(heading) = &section.heading {
            blocks.push(format!("## {}", escape_inline(heading)));
        }
        blocks.extend(section.paragraphs.iter().map(|p| render_paragraph(p)));
    }

    let mut out = front_matter(doc)?;
    out.push('\n');
    out.push_str(&blocks.join("\n\n"));
    out.push('\n');
    Ok(out)
}

fn metadata_line(doc: &NormalizedDocument) -> String {
    let mut line = format!("**SFS nr:** {}", escape_inline(&doc.id.to_beteckning()));
    if !doc.authority.is_empty() {
        line.push_str(" · **Departement:** ");
        line.push_str(&escape_inline(&doc.authority));
    }
    line
}

/// Render one paragraph, setting a leading paragraph marker in bold.
fn render_paragraph(paragraph: &str) -> String {
    let Some(marker) = PARAGRAPH_MARKER.find(paragraph) else {
        return escape_text(paragraph);
    };
    let rest = paragraph[marker.end()..].trim_start();
    if rest.is_empty() {
        format!("**{}**", marker.as_str())
    } else {
        format!("**{}** {}", marker.as_str(), escape_inline(rest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EnactmentId, Section};
    use pretty_assertions::assert_eq;

    fn document() -> NormalizedDocument {
        let mut doc = NormalizedDocument::new(EnactmentId::parse("sfs-2025-764").unwrap());
        doc.title = "Förordning om stöd".to_string();
        doc.authority = "Finansdepartementet".to_string();
        doc.sections = vec![
            Section {
                heading: None,
                paragraphs: vec!["Ingress.".to_string()],
            },
            Section {
                heading: Some("Inledande bestämmelser".to_string()),
                paragraphs: vec![
                    "1 § Denna förordning gäller *stöd*.".to_string(),
                    "2 a § Mer.".to_string(),
                    "1. första punkten".to_string(),
                ],
            },
        ];
        doc
    }

    fn body(md: &str) -> &str {
        let after_open = md.strip_prefix("---\n").unwrap();
        let close = after_open.find("\n---\n").unwrap();
        &after_open[close + 5..]
    }

    #[test]
    fn test_render_layout() {
        let md = render(&document()).unwrap();
        assert_eq!(
            body(&md),
            "\n# Förordning om stöd\n\
             \n\
             **SFS nr:** 2025:764 · **Departement:** Finansdepartementet\n\
             \n\
             Ingress.\n\
             \n\
             ## Inledande bestämmelser\n\
             \n\
             **1 §** Denna förordning gäller \\*stöd\\*.\n\
             \n\
             **2 a §** Mer.\n\
             \n\
             1\\. första punkten\n"
        );
    }

    #[test]
    fn test_render_title_fallback_and_no_authority() {
        let doc = NormalizedDocument::new(EnactmentId::parse("2025:765").unwrap());
        let md = render(&doc).unwrap();
        assert!(md.contains("\n# SFS 2025:765\n"));
        assert!(md.contains("**SFS nr:** 2025:765\n"));
        assert!(!md.contains("Departement:**"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let doc = document();
        assert_eq!(render(&doc).unwrap(), render(&doc).unwrap());
    }

    #[test]
    fn test_render_single_trailing_newline_and_no_trailing_whitespace() {
        let md = render(&document()).unwrap();
        assert!(md.ends_with('\n'));
        assert!(!md.ends_with("\n\n"));
        assert!(md.lines().all(|l| l == l.trim_end()));
    }

    #[test]
    fn test_render_escapes_raw_html() {
        let mut doc = document();
        doc.sections[0].paragraphs = vec!["<script>x</script>".to_string()];
        let md = render(&doc).unwrap();
        assert!(md.contains(r"\<script\>x\</script\>"));
        assert!(!md.contains("<script>"));
    }

    #[test]
    fn test_render_paragraph_marker_only() {
        assert_eq!(render_paragraph("3 §"), "**3 §**");
        assert_eq!(render_paragraph("- punkt"), r"\- punkt");
    }
}
