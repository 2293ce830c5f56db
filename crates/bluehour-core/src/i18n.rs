//! Translation table
//!
//! User-facing strings and the story instruction template, indexed by
//! language and message key. Built once on first use.

use std::collections::HashMap;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

/// Supported languages
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Ko,
    En,
    Es,
}

impl Language {
    pub const ALL: [Self; 3] = [Self::Ko, Self::En, Self::Es];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ko => "ko",
            Self::En => "en",
            Self::Es => "es",
        }
    }

    /// Parse a language tag such as `en`, `EN`, or `es-MX`.
    ///
    /// Unknown tags fall back to Korean.
    pub fn parse(tag: &str) -> Self {
        let primary = tag.split(['-', '_']).next().unwrap_or_default();
        match primary.trim().to_ascii_lowercase().as_str() {
            "en" => Self::En,
            "es" => Self::Es,
            "ko" | "" => Self::Ko,
            other => {
                tracing::debug!(tag = %other, "Unknown language tag, using ko");
                Self::Ko
            }
        }
    }
}

/// Keys into the translation table
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageKey {
    /// Instruction template with `{genre}`, `{personality}`, `{concept}` slots
    StoryPrompt,
    MissingFields,
    MissingUser,
    IpAbuse,
    NoCredits,
    FreeLimitExceeded,
}

/// Immutable `(language, key) -> text` table
pub struct Translations {
    entries: HashMap<(Language, MessageKey), &'static str>,
}

static TRANSLATIONS: LazyLock<Translations> = LazyLock::new(Translations::build);

const KO_PROMPT: &str = "You are a professional BL (Boys Love) web novel writer.
Generate a high-quality BL short story based on the following details:
- Genre: {genre}
- Protagonist Personality: {personality}
- Concept: {concept}

The story should be written in Korean, it should be engaging, emotional, and fit the BL genre well.
Include a title and the full story text.
Structure the output beautifully with proper spacing and paragraphs.";

const EN_PROMPT: &str = "You are a professional BL (Boys Love) web novel writer.
Generate a high-quality BL short story based on the following details:
- Genre: {genre}
- Protagonist Personality: {personality}
- Concept: {concept}

The story should be written in English, it should be engaging, emotional, and fit the BL genre well.
Include a title and the full story text.
Structure the output beautifully with proper spacing and paragraphs.";

const ES_PROMPT: &str = "You are a professional BL (Boys Love) web novel writer.
Generate a high-quality BL short story based on the following details:
- Genre: {genre}
- Protagonist Personality: {personality}
- Concept: {concept}

The story should be written in Spanish, it should be engaging, emotional, and fit the BL genre well.
Include a title and the full story text.
Structure the output beautifully with proper spacing and paragraphs.";

impl Translations {
    fn build() -> Self {
        use Language::{En, Es, Ko};
        use MessageKey::{FreeLimitExceeded, IpAbuse, MissingFields, MissingUser, NoCredits, StoryPrompt};

        let entries = HashMap::from([
            ((Ko, StoryPrompt), KO_PROMPT),
            ((En, StoryPrompt), EN_PROMPT),
            ((Es, StoryPrompt), ES_PROMPT),
            ((Ko, MissingFields), "장르, 주인공 성격, 소설 컨셉을 모두 입력해주세요."),
            ((En, MissingFields), "Genre, personality, and concept are all required"),
            ((Es, MissingFields), "El género, la personalidad y el concepto son obligatorios"),
            ((Ko, MissingUser), "로그인이 필요합니다."),
            ((En, MissingUser), "You need to sign in first."),
            ((Es, MissingUser), "Necesitas iniciar sesión."),
            ((Ko, IpAbuse), "이 네트워크에서는 이미 무료 이야기가 생성되었습니다. 크레딧을 충전해 주세요."),
            ((En, IpAbuse), "A free story has already been claimed from this network. Please purchase credits."),
            ((Es, IpAbuse), "Ya se reclamó una historia gratuita desde esta red. Compra créditos para continuar."),
            ((Ko, NoCredits), "크레딧이 부족합니다. 스토어에서 크레딧을 충전해 주세요."),
            ((En, NoCredits), "You don't have enough credits. Visit the store to top up."),
            ((Es, NoCredits), "No tienes suficientes créditos. Visita la tienda para recargar."),
            ((Ko, FreeLimitExceeded), "무료 생성 횟수를 모두 사용했습니다."),
            ((En, FreeLimitExceeded), "You have used all of your free stories."),
            ((Es, FreeLimitExceeded), "Has usado todas tus historias gratuitas."),
        ]);

        Self { entries }
    }

    /// The process-wide table
    pub fn global() -> &'static Self {
        &TRANSLATIONS
    }

    /// Look up a string, falling back to English when a language lacks the key
    pub fn get(&self, language: Language, key: MessageKey) -> &'static str {
        self.entries
            .get(&(language, key))
            .or_else(|| self.entries.get(&(Language::En, key)))
            .copied()
            .unwrap_or_default()
    }
}

/// Shorthand for `Translations::global().get(language, key)`
pub fn t(language: Language, key: MessageKey) -> &'static str {
    Translations::global().get(language, key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_parse() {
        assert_eq!(Language::parse("en"), Language::En);
        assert_eq!(Language::parse("ES-mx"), Language::Es);
        assert_eq!(Language::parse("ko_KR"), Language::Ko);
        assert_eq!(Language::parse("fr"), Language::Ko);
        assert_eq!(Language::parse(""), Language::Ko);
    }

    #[test]
    fn test_every_key_translated() {
        let keys = [
            MessageKey::StoryPrompt,
            MessageKey::MissingFields,
            MessageKey::MissingUser,
            MessageKey::IpAbuse,
            MessageKey::NoCredits,
            MessageKey::FreeLimitExceeded,
        ];
        for language in Language::ALL {
            for key in keys {
                assert!(!t(language, key).is_empty(), "{language:?}/{key:?} missing");
            }
        }
    }

    #[test]
    fn test_prompt_templates_have_slots() {
        for language in Language::ALL {
            let template = t(language, MessageKey::StoryPrompt);
            assert!(template.contains("{genre}"));
            assert!(template.contains("{personality}"));
            assert!(template.contains("{concept}"));
        }
    }
}
