//! Bibliography reference types

use serde::{Deserialize, Serialize};

use super::CitationStyle;

/// Kind of cited work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Book,
    Journal,
    Website,
    Report,
    Conference,
}

/// Per-book bibliography settings persisted alongside the references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BibliographyConfig {
    pub enabled: bool,
    pub citation_style: CitationStyle,
}

/// A single structured reference proposed by the text provider.
///
/// References are generated in bulk but persisted individually, so
/// one bad entry never takes its siblings down.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BibliographyReference {
    #[serde(rename = "type")]
    pub kind: ReferenceKind,
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub doi: Option<String>,
    #[serde(default)]
    pub journal: Option<String>,
    #[serde(default)]
    pub volume: Option<String>,
    #[serde(default)]
    pub issue: Option<String>,
    #[serde(default)]
    pub pages: Option<String>,
}

impl BibliographyReference {
    /// Check the fields every persisted reference must carry.
    ///
    /// Incomplete entries are dropped from persistence rather than
    /// aborting the list.
    pub fn is_complete(&self) -> bool {
        if self.title.trim().is_empty() {
            return false;
        }
        if self.authors.iter().all(|a| a.trim().is_empty()) {
            return false;
        }
        match self.kind {
            ReferenceKind::Journal => self.journal.is_some(),
            ReferenceKind::Website => self.url.is_some(),
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book_reference() -> BibliographyReference {
        BibliographyReference {
            kind: ReferenceKind::Book,
            title: "Tides and Towns".to_string(),
            authors: vec!["M. Halloran".to_string()],
            year: Some(1998),
            publisher: Some("Seaboard Press".to_string()),
            url: None,
            doi: None,
            journal: None,
            volume: None,
            issue: None,
            pages: None,
        }
    }

    #[test]
    fn test_complete_book_reference() {
        assert!(book_reference().is_complete());
    }

    #[test]
    fn test_missing_title_is_incomplete() {
        let mut reference = book_reference();
        reference.title = "  ".to_string();
        assert!(!reference.is_complete());
    }

    #[test]
    fn test_missing_authors_is_incomplete() {
        let mut reference = book_reference();
        reference.authors.clear();
        assert!(!reference.is_complete());
    }

    #[test]
    fn test_journal_requires_journal_name() {
        let mut reference = book_reference();
        reference.kind = ReferenceKind::Journal;
        assert!(!reference.is_complete());
        reference.journal = Some("Coastal Studies".to_string());
        assert!(reference.is_complete());
    }

    #[test]
    fn test_kind_deserializes_from_type_field() {
        let json = r#"{"type":"website","title":"Harbor records","authors":["Town clerk"],"url":"https://example.org"}"#;
        let reference: BibliographyReference = serde_json::from_str(json).unwrap();
        assert_eq!(reference.kind, ReferenceKind::Website);
        assert!(reference.is_complete());
    }
}
