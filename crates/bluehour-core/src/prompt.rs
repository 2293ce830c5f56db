//! Story Prompt
//!
//! Validated genre/personality/concept input and the instruction text
//! built from it.

use serde::{Deserialize, Serialize};

use crate::i18n::{Language, MessageKey, t};
use crate::message::Message;

/// Fields a story prompt is built from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PromptField {
    Genre,
    Personality,
    Concept,
}

impl PromptField {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Genre => "genre",
            Self::Personality => "personality",
            Self::Concept => "concept",
        }
    }
}

impl std::fmt::Display for PromptField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated story request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryPrompt {
    pub genre: String,
    pub personality: String,
    pub concept: String,
    #[serde(default)]
    pub language: Language,
}

impl StoryPrompt {
    /// Build a prompt from raw input.
    ///
    /// Values are trimmed; absent or whitespace-only values are reported
    /// together in the error.
    pub fn new(
        genre: Option<&str>,
        personality: Option<&str>,
        concept: Option<&str>,
        language: Language,
    ) -> Result<Self, Vec<PromptField>> {
        let mut missing = Vec::new();
        let mut take = |value: Option<&str>, field: PromptField| {
            let value = value.map(str::trim).unwrap_or_default();
            if value.is_empty() {
                missing.push(field);
            }
            value.to_string()
        };

        let genre = take(genre, PromptField::Genre);
        let personality = take(personality, PromptField::Personality);
        let concept = take(concept, PromptField::Concept);

        if !missing.is_empty() {
            return Err(missing);
        }

        Ok(Self {
            genre,
            personality,
            concept,
            language,
        })
    }

    /// Instruction text for the model.
    ///
    /// Slots are filled in a single pass, so braces inside the values are
    /// copied verbatim.
    pub fn render(&self) -> String {
        let template = t(self.language, MessageKey::StoryPrompt);
        let mut out = String::with_capacity(template.len() + self.concept.len());
        let mut rest = template;

        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let tail = &rest[start..];
            match tail.find('}').and_then(|end| self.slot(&tail[1..end]).map(|value| (end, value))) {
                Some((end, value)) => {
                    out.push_str(value);
                    rest = &tail[end + 1..];
                }
                None => {
                    out.push('{');
                    rest = &tail[1..];
                }
            }
        }
        out.push_str(rest);
        out
    }

    fn slot(&self, name: &str) -> Option<&str> {
        match name {
            "genre" => Some(&self.genre),
            "personality" => Some(&self.personality),
            "concept" => Some(&self.concept),
            _ => None,
        }
    }

    /// Messages handed to the provider
    pub fn to_messages(&self) -> Vec<Message> {
        vec![Message::user(self.render())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_renders_all_fields() {
        let prompt = StoryPrompt::new(
            Some("캠퍼스물"),
            Some("다정한 집착공"),
            Some("first snow"),
            Language::Ko,
        )
        .unwrap();

        let text = prompt.render();
        assert!(text.contains("- Genre: 캠퍼스물"));
        assert!(text.contains("- Protagonist Personality: 다정한 집착공"));
        assert!(text.contains("- Concept: first snow"));
        assert!(text.contains("written in Korean"));
    }

    #[test]
    fn test_language_selects_template() {
        let prompt = StoryPrompt::new(Some("office"), Some("cold"), Some("rivals"), Language::Es).unwrap();
        assert!(prompt.render().contains("written in Spanish"));
    }

    #[test]
    fn test_braces_in_values_left_alone() {
        let prompt = StoryPrompt::new(Some("{concept} noir"), Some("{genre}"), Some("rivals"), Language::En).unwrap();

        let text = prompt.render();
        assert!(text.contains("- Genre: {concept} noir"));
        assert!(text.contains("- Protagonist Personality: {genre}"));
        assert!(text.contains("- Concept: rivals"));
        assert!(!text.contains("rivals noir"));
    }

    #[test]
    fn test_missing_fields_reported_together() {
        let err = StoryPrompt::new(Some("  "), None, Some("concept"), Language::En).unwrap_err();
        assert_eq!(err, vec![PromptField::Genre, PromptField::Personality]);
    }

    #[test]
    fn test_values_trimmed() {
        let prompt = StoryPrompt::new(Some(" fantasy "), Some("brave\n"), Some(" x"), Language::En).unwrap();
        assert_eq!(prompt.genre, "fantasy");
        assert_eq!(prompt.personality, "brave");
        assert_eq!(prompt.to_messages().len(), 1);
    }
}
