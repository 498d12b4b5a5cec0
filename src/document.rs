//! Document identifiers and output naming

use crate::{Error, Result};
use std::fmt;
use url::Url;

/// Path segments that precede the numeric ID in viewer URLs.
const ID_PREFIXES: &[&str] = &["document", "doc", "embeds", "read", "presentation", "book"];

/// Canonical numeric document identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_numeric(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Resolve a raw ID or a document URL into a [`DocumentId`].
pub fn resolve_document_id(input: &str) -> Result<DocumentId> {
    let input = input.trim();
    if is_numeric(input) {
        return Ok(DocumentId(input.to_string()));
    }

    let url = Url::parse(input).map_err(|_| Error::InvalidDocument(input.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::InvalidDocument(input.to_string()));
    }

    let segments: Vec<&str> = url.path_segments().map(|s| s.collect()).unwrap_or_default();
    let after_prefix = segments
        .windows(2)
        .find(|pair| ID_PREFIXES.contains(&pair[0]) && is_numeric(pair[1]))
        .map(|pair| pair[1]);

    after_prefix
        .or_else(|| segments.iter().copied().find(|s| is_numeric(s)))
        .map(|id| DocumentId(id.to_string()))
        .ok_or_else(|| Error::InvalidDocument(input.to_string()))
}

/// Expand `{id}` in a URL template.
pub fn embed_url(template: &str, id: &DocumentId) -> String {
    template.replace("{id}", id.as_str())
}

/// Turn a document title into a safe file stem.
///
/// Drops characters that are invalid on common filesystems, joins words with
/// underscores and never returns an empty string.
pub fn sanitize_filename(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*') && !c.is_control())
        .collect();
    let joined = cleaned.split_whitespace().collect::<Vec<_>>().join("_");
    let trimmed = joined.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        "document".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_id() {
        assert_eq!(resolve_document_id("123456789").unwrap().as_str(), "123456789");
        assert_eq!(resolve_document_id("  42 ").unwrap().as_str(), "42");
    }

    #[test]
    fn document_urls() {
        let cases = [
            "https://www.scribd.com/document/123456789/Sample-Report",
            "https://www.scribd.com/doc/123456789",
            "https://www.scribd.com/embeds/123456789/content",
            "https://www.scribd.com/presentation/123456789/Slides?x=1",
            "http://scribd.com/read/123456789",
        ];
        for case in cases {
            assert_eq!(resolve_document_id(case).unwrap().as_str(), "123456789", "{}", case);
        }
    }

    #[test]
    fn prefix_beats_other_numbers() {
        let id = resolve_document_id("https://example.com/2024/document/777/title").unwrap();
        assert_eq!(id.as_str(), "777");
    }

    #[test]
    fn invalid_inputs() {
        for case in ["", "abc", "https://www.scribd.com/about", "ftp://host/document/1", "12a"] {
            assert!(matches!(resolve_document_id(case), Err(Error::InvalidDocument(_))), "{}", case);
        }
    }

    #[test]
    fn embed_url_substitutes_id() {
        let id = resolve_document_id("123456789").unwrap();
        assert_eq!(
            embed_url("https://www.scribd.com/embeds/{id}/content", &id),
            "https://www.scribd.com/embeds/123456789/content"
        );
    }

    #[test]
    fn filenames() {
        assert_eq!(sanitize_filename("Sample Report"), "Sample_Report");
        assert_eq!(sanitize_filename("a/b: c?"), "ab_c");
        assert_eq!(sanitize_filename("  spaced \t out  "), "spaced_out");
        assert_eq!(sanitize_filename("..."), "document");
        assert_eq!(sanitize_filename(""), "document");
    }
}
