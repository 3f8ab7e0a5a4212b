//! YAML front matter for rendered enactments.

use serde::Serialize;

use crate::error::Result;
use crate::types::{Amendment, NormalizedDocument};

/// Amendment entry in the front matter.
#[derive(Debug, Serialize)]
struct FrontMatterAmendment {
    beteckning: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    rubrik: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    ikraft_datum: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    anteckningar: String,
}

impl From<&Amendment> for FrontMatterAmendment {
    fn from(a: &Amendment) -> Self {
        Self {
            beteckning: a.id.clone(),
            rubrik: a.title.clone(),
            ikraft_datum: a.in_force.clone(),
            anteckningar: a.notes.clone(),
        }
    }
}

/// Front matter fields; declaration order is the key order in the output.
#[derive(Debug, Serialize)]
struct FrontMatter {
    beteckning: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    rubrik: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    departement: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    utfardad_datum: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ikraft_datum: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    publicerad_datum: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    uppdaterad: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    upphavd_datum: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    upphavd_genom: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    forarbeten: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    celex: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    eu_direktiv: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pdf_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    kalla: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    andringsforfattningar: Vec<FrontMatterAmendment>,
}

impl From<&NormalizedDocument> for FrontMatter {
    fn from(doc: &NormalizedDocument) -> Self {
        let meta = &doc.metadata;
        let non_empty = |s: &str| Some(s.to_string()).filter(|s| !s.is_empty());

        Self {
            beteckning: doc.id.to_beteckning(),
            rubrik: non_empty(&doc.title),
            departement: non_empty(&doc.authority),
            utfardad_datum: meta.issued.clone(),
            ikraft_datum: meta.in_force.clone(),
            publicerad_datum: meta.published.clone(),
            uppdaterad: doc
                .last_changed
                .map(|t| t.format("%Y-%m-%dT%H:%M:%S").to_string()),
            upphavd_datum: meta.repealed.clone(),
            upphavd_genom: meta.repealed_by.clone(),
            forarbeten: meta.preparatory_works.clone(),
            celex: meta.celex.clone(),
            eu_direktiv: meta.eu_directive,
            pdf_url: doc.id.pdf_url(meta.published.as_deref()),
            kalla: meta.source_reference.clone(),
            andringsforfattningar: meta
                .amendments
                .iter()
                .map(FrontMatterAmendment::from)
                .collect(),
        }
    }
}

/// Render the front matter block, including both `---` delimiter lines.
pub fn front_matter(doc: &NormalizedDocument) -> Result<String> {
    let yaml = serde_yaml_ng::to_string(&FrontMatter::from(doc))?;
    let yaml = indent_sequences(&yaml);
    Ok(format!("---\n{}\n---\n", yaml.trim_end()))
}

/// Indent sequence items under their parent key.
///
/// serde_yaml_ng writes `- ` items at the indent of the parent key; this
/// shifts every line inside a sequence right by two spaces per level.
fn indent_sequences(yaml: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut seq_indents: Vec<usize> = Vec::new();

    for line in yaml.lines() {
        let trimmed = line.trim_start();
        if trimmed.is_empty() {
            lines.push(String::new());
            continue;
        }
        let indent = line.len() - trimmed.len();

        while let Some(&seq_indent) = seq_indents.last() {
            if indent < seq_indent || (indent == seq_indent && !trimmed.starts_with("- ")) {
                seq_indents.pop();
            } else {
                break;
            }
        }
        if trimmed.starts_with("- ") && seq_indents.last() != Some(&indent) {
            seq_indents.push(indent);
        }

        let extra = seq_indents.len() * 2;
        lines.push(format!("{}{line}", " ".repeat(extra)));
    }

    lines.join("\n")
}
