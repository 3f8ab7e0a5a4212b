//! Escaping of source text so it renders literally in Markdown.

use std::sync::LazyLock;

use regex::Regex;

/// Ordered list marker at line start: `1.` or `1)` followed by space or end.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static ORDERED_LIST_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)([.)])(\s|$)").expect("valid regex"));

/// Character reference a renderer would decode: `&sect;`, `&#167;`, `&#xA7;`.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static CHARACTER_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^&(?:[A-Za-z][A-Za-z0-9]*|#[0-9]+|#[xX][0-9A-Fa-f]+);").expect("valid regex")
});

/// Characters with inline meaning in Markdown.
const INLINE_SPECIAL: &[char] = &['\\', '*', '_', '`', '[', ']', '<', '>', '~'];

/// Characters that open a block when they start a line.
const LINE_START_SPECIAL: &[char] = &['#', '>', '+', '-', '='];

/// Backslash-escape characters with inline meaning.
///
/// `<` and `>` are escaped too, so no raw HTML survives. An `&` is escaped
/// only where it would start a character reference.
///
/// # Examples
/// ```
/// use sfs_harvester::markdown::escape::escape_inline;
///
/// assert_eq!(escape_inline("a*b_c"), r"a\*b\_c");
/// assert_eq!(escape_inline("<b>"), r"\<b\>");
/// assert_eq!(escape_inline("2 & 3 &sect;"), r"2 & 3 \&sect;");
/// ```
#[must_use]
pub fn escape_inline(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for (i, c) in text.char_indices() {
        if INLINE_SPECIAL.contains(&c)
            || (c == '&' && CHARACTER_REFERENCE.is_match(&text[i..]))
        {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Escape a block marker at the start of a line.
///
/// Expects text that already went through [`escape_inline`].
#[must_use]
pub fn escape_line_start(line: &str) -> String {
    if line.starts_with(LINE_START_SPECIAL) {
        return format!("\\{line}");
    }
    ORDERED_LIST_MARKER.replace(line, r"$1\$2$3").into_owned()
}

/// Escape a full paragraph or heading.
#[must_use]
pub fn escape_text(text: &str) -> String {
    escape_line_start(&escape_inline(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_escape_inline() {
        assert_eq!(escape_inline("plain text § 1"), "plain text § 1");
        assert_eq!(escape_inline(r"a\b"), r"a\\b");
        assert_eq!(escape_inline("[länk](x)"), r"\[länk\](x)");
        assert_eq!(escape_inline("`kod`"), r"\`kod\`");
        assert_eq!(
            escape_inline("<script>alert(1)</script>"),
            r"\<script\>alert(1)\</script\>"
        );
    }

    #[test]
    fn test_escape_inline_strikethrough_and_fences() {
        assert_eq!(escape_inline("~~struken~~"), r"\~\~struken\~\~");
        assert_eq!(escape_text("~~~"), r"\~\~\~");
    }

    #[test]
    fn test_escape_inline_character_references() {
        assert_eq!(escape_inline("&sect; 1"), r"\&sect; 1");
        assert_eq!(escape_inline("&#167; och &#xA7;"), r"\&#167; och \&#xA7;");
        assert_eq!(escape_inline("2 & 3"), "2 & 3");
        assert_eq!(escape_inline("A&B AB"), "A&B AB");
        assert_eq!(escape_inline("&;"), "&;");
    }

    #[test]
    fn test_escape_line_start() {
        assert_eq!(escape_line_start("# rubrik"), r"\# rubrik");
        assert_eq!(escape_line_start("- punkt"), r"\- punkt");
        assert_eq!(escape_line_start("+ punkt"), r"\+ punkt");
        assert_eq!(escape_line_start("=== x"), r"\=== x");
        assert_eq!(escape_line_start("1. första"), r"1\. första");
        assert_eq!(escape_line_start("12) tolfte"), r"12\) tolfte");
        assert_eq!(escape_line_start("1."), r"1\.");
    }

    #[test]
    fn test_escape_line_start_leaves_ordinary_text() {
        assert_eq!(escape_line_start("1 § Text"), "1 § Text");
        assert_eq!(escape_line_start("1 kap. Inledande"), "1 kap. Inledande");
        assert_eq!(escape_line_start("2025.07 x"), "2025.07 x");
        assert_eq!(escape_line_start("Text - med streck"), "Text - med streck");
    }

    #[test]
    fn test_escape_text_quote_marker() {
        assert_eq!(escape_text("> citat"), r"\> citat");
    }
}
