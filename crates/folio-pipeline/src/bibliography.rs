//! Bibliography generation.
//!
//! The provider returns one JSON array of reference objects in a
//! single call; entries are parsed individually so a malformed or
//! incomplete entry is dropped without taking its siblings down.

use std::sync::Arc;

use tracing::{debug, warn};

use folio_core::provider::{ModelRegistry, ProviderError, TextRequest};
use folio_core::types::{BibliographyReference, GeneratedChapter, GenerationConfig, Outline};

/// Generates structured bibliography references for a finished book.
pub struct BibliographyGenerator {
    registry: Arc<ModelRegistry>,
}

impl BibliographyGenerator {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self { registry }
    }

    /// Propose references for the book, keeping only complete entries.
    pub async fn generate(
        &self,
        outline: &Outline,
        config: &GenerationConfig,
        chapters: &[GeneratedChapter],
    ) -> Result<Vec<BibliographyReference>, ProviderError> {
        let generator = self.registry.resolve(&config.model)?;
        let request = build_bibliography_request(outline, config, chapters);
        let raw = generator.generate(request).await?;
        parse_references(&raw)
    }
}

/// Render the provider request for the bibliography call.
pub fn build_bibliography_request(
    outline: &Outline,
    config: &GenerationConfig,
    chapters: &[GeneratedChapter],
) -> TextRequest {
    let system = format!(
        "You are a research librarian compiling a bibliography in {} style. \
         Return ONLY a valid JSON array, no prose.",
        config.citation_style.label()
    );

    let chapter_titles: Vec<String> = chapters
        .iter()
        .map(|c| format!("{}. {}", c.number, c.title))
        .collect();

    let mut user = format!(
        "Compile 8-12 plausible references for the {} book \"{}\" by {}.\n\
         Book description: {}\n\nChapters:\n{}\n\n",
        outline.genre,
        outline.title,
        outline.author,
        outline.description,
        chapter_titles.join("\n")
    );
    user.push_str(
        "Return a JSON array where each element has the shape:\n\
         {\"type\":\"book|journal|website|report|conference\",\"title\":\"...\",\
         \"authors\":[\"...\"],\"year\":2000,\"publisher\":null,\"url\":null,\
         \"doi\":null,\"journal\":null,\"volume\":null,\"issue\":null,\"pages\":null}\n\
         Journal entries must include \"journal\"; website entries must include \"url\". \
         Return the JSON array only.",
    );

    TextRequest {
        system,
        user,
        model: config.model.clone(),
        temperature: config.temperature,
    }
}

/// Parse the provider output into complete references.
///
/// A response with no JSON array at all is a provider error so the
/// step retry can take another attempt; individual bad entries are
/// only logged.
pub fn parse_references(raw: &str) -> Result<Vec<BibliographyReference>, ProviderError> {
    let json = extract_json_array(raw)
        .ok_or_else(|| ProviderError::Response("no JSON array in response".to_string()))?;
    let values: Vec<serde_json::Value> = serde_json::from_str(&json)
        .map_err(|e| ProviderError::Serialization(e.to_string()))?;

    let mut references = Vec::with_capacity(values.len());
    for value in values {
        match serde_json::from_value::<BibliographyReference>(value) {
            Ok(reference) if reference.is_complete() => references.push(reference),
            Ok(reference) => {
                debug!(title = %reference.title, "dropping incomplete reference");
            }
            Err(e) => {
                warn!(error = %e, "skipping malformed reference entry");
            }
        }
    }
    Ok(references)
}

fn extract_json_array(text: &str) -> Option<String> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    if end <= start {
        return None;
    }
    Some(text[start..=end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::types::{ChapterSpec, CitationStyle, ExecutionMode};

    fn outline() -> Outline {
        Outline {
            title: "The Silent Harbor".to_string(),
            author: "R. Calloway".to_string(),
            genre: "mystery".to_string(),
            description: "A harbor town keeps its secrets.".to_string(),
            chapters: vec![ChapterSpec::new(1, "Arrival", "The detective arrives.")],
            themes: Vec::new(),
            characters: Vec::new(),
        }
    }

    #[test]
    fn test_request_names_citation_style() {
        let config = GenerationConfig::new("mock-model", ExecutionMode::Sequential)
            .with_bibliography(CitationStyle::Chicago);
        let request = build_bibliography_request(&outline(), &config, &[]);
        assert!(request.system.contains("Chicago"));
        assert!(request.user.contains("The Silent Harbor"));
    }

    #[test]
    fn test_parse_drops_incomplete_entry_keeps_siblings() {
        let raw = r#"Here you go:
[
  {"type":"book","title":"Tides and Towns","authors":["M. Halloran"],"year":1998},
  {"type":"book","title":"","authors":["Nobody"]},
  {"type":"website","title":"Harbor records","authors":["Town clerk"],"url":"https://example.org"}
]"#;
        let references = parse_references(raw).unwrap();
        assert_eq!(references.len(), 2);
        assert_eq!(references[0].title, "Tides and Towns");
        assert_eq!(references[1].title, "Harbor records");
    }

    #[test]
    fn test_parse_skips_malformed_entry() {
        let raw = r#"[
  {"type":"book","title":"Tides and Towns","authors":["M. Halloran"]},
  {"type":"unknown-kind","title":"Bad","authors":["X"]}
]"#;
        let references = parse_references(raw).unwrap();
        assert_eq!(references.len(), 1);
    }

    #[test]
    fn test_parse_without_array_is_an_error() {
        assert!(matches!(
            parse_references("I could not produce references."),
            Err(ProviderError::Response(_))
        ));
    }
}
