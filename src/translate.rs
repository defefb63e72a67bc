//! Translator: language catalogue, prompt, and a bounded history.

use serde::Serialize;

use crate::error::{AppError, Result};
use crate::extract::{extract_json_record, ExtractionResult, TranslationRecord};
use crate::providers::ChatMessage;
use crate::CompletionClient;

#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct Language {
    pub name: &'static str,
    pub code: &'static str,
}

pub const LANGUAGES: &[Language] = &[
    Language { name: "English", code: "en" },
    Language { name: "Spanish", code: "es" },
    Language { name: "French", code: "fr" },
    Language { name: "German", code: "de" },
    Language { name: "Italian", code: "it" },
    Language { name: "Portuguese", code: "pt" },
    Language { name: "Dutch", code: "nl" },
    Language { name: "Russian", code: "ru" },
    Language { name: "Japanese", code: "ja" },
    Language { name: "Chinese (Simplified)", code: "zh" },
    Language { name: "Korean", code: "ko" },
    Language { name: "Arabic", code: "ar" },
    Language { name: "Hindi", code: "hi" },
    Language { name: "Turkish", code: "tr" },
    Language { name: "Polish", code: "pl" },
    Language { name: "Vietnamese", code: "vi" },
    Language { name: "Thai", code: "th" },
    Language { name: "Indonesian", code: "id" },
    Language { name: "Swedish", code: "sv" },
    Language { name: "Greek", code: "el" },
];

pub fn default_language() -> &'static Language {
    &LANGUAGES[0]
}

/// Find a target language by name or ISO code, ignoring case.
pub fn find_language(query: &str) -> Option<&'static Language> {
    let q = query.trim();
    LANGUAGES
        .iter()
        .find(|l| l.name.eq_ignore_ascii_case(q) || l.code.eq_ignore_ascii_case(q))
}

pub const EMPTY_TEXT_MESSAGE: &str = "Please enter text to translate.";

pub const TRANSLATION_SYSTEM_PROMPT: &str = r#"You are an expert multilingual translator with deep knowledge of cultural nuances and idiomatic expressions.

Your task is to:
1. DETECT the input language automatically
2. TRANSLATE the text to the target language specified by the user
3. Provide CULTURAL CONTEXT when relevant (idioms, formal/informal usage, regional variations)
4. Offer ALTERNATIVE TRANSLATIONS when there are multiple valid options
5. Rate your CONFIDENCE in the translation (High/Medium/Low)

IMPORTANT: Always respond in this exact JSON format:
{
    "detected_language": "Name of detected language",
    "confidence_detection": "High/Medium/Low",
    "original_text": "The original input text",
    "translated_text": "The main translation",
    "confidence_translation": "High/Medium/Low",
    "alternatives": ["Alternative translation 1", "Alternative translation 2"],
    "cultural_notes": "Any cultural context, idioms explained, regional variations, or usage notes. Leave empty string if not applicable.",
    "is_same_language": true/false
}

Rules:
- If the input language is the SAME as the target language, set "is_same_language" to true and provide the same text
- Always detect the language even if translation isn't needed
- For idioms and expressions, explain their meaning in the cultural notes
- Provide alternatives only when there are meaningfully different ways to express the same idea
- Be accurate and natural in translations - avoid literal word-for-word translation
- Consider formal vs informal register in your translations"#;

/// Ready-made inputs for trying the translator.
pub const QUICK_EXAMPLES: &[(&str, &str)] = &[
    ("Bonjour, comment allez-vous?", "French greeting"),
    ("I love this weather", "English casual"),
    ("Gracias por tu ayuda", "Spanish thanks"),
    ("Das Leben ist schön", "German phrase"),
    ("今日は天気がいいですね", "Japanese weather"),
    ("Ciao, come stai?", "Italian greeting"),
];

pub fn translation_messages(text: &str, target: &Language) -> Result<Vec<ChatMessage>> {
    if text.trim().is_empty() {
        return Err(AppError::InvalidInput(EMPTY_TEXT_MESSAGE.to_string()));
    }
    Ok(vec![
        ChatMessage::system(TRANSLATION_SYSTEM_PROMPT),
        ChatMessage::user(format!("Translate the following text to {}:\n\n{}", target.name, text)),
    ])
}

// ---------------------------------------------------------------------------
// Outcome + history
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranslationOutcome {
    pub input: String,
    pub target: &'static str,
    pub result: ExtractionResult<TranslationRecord>,
}

impl TranslationOutcome {
    pub fn from_response(input: &str, target: &'static Language, response: &str) -> Self {
        Self {
            input: input.to_string(),
            target: target.name,
            result: extract_json_record(response),
        }
    }

    /// History row for a decoded result; raw fallbacks are not recorded.
    pub fn history_entry(&self) -> Option<HistoryEntry> {
        let record = self.result.found()?;
        let detected = if record.detected_language.is_empty() {
            "Unknown".to_string()
        } else {
            record.detected_language.clone()
        };
        Some(HistoryEntry {
            original: self.input.clone(),
            detected_lang: detected,
            target_lang: self.target.to_string(),
            translation: record.translated_text.clone(),
            alternatives: record.alternatives.clone(),
            cultural_notes: record.cultural_notes.clone(),
        })
    }
}

/// Translate `text` into `target` with a single non-streaming call.
pub async fn translate(
    client: &CompletionClient,
    model: &str,
    text: &str,
    target: &'static Language,
) -> Result<TranslationOutcome> {
    let messages = translation_messages(text, target)?;
    let response = client.complete(model, &messages).await?;
    Ok(TranslationOutcome::from_response(text, target, &response))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub original: String,
    pub detected_lang: String,
    pub target_lang: String,
    pub translation: String,
    pub alternatives: Vec<String>,
    pub cultural_notes: String,
}

pub const HISTORY_LIMIT: usize = 10;

pub const PREVIEW_CHARS: usize = 100;

/// Newest-first list of past translations, capped at [`HISTORY_LIMIT`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct TranslationHistory {
    entries: Vec<HistoryEntry>,
}

impl TranslationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, entry: HistoryEntry) {
        self.entries.insert(0, entry);
        self.entries.truncate(HISTORY_LIMIT);
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// First `limit` characters of `text`, with `...` when something was cut.
pub fn preview(text: &str, limit: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(limit).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(n: usize) -> HistoryEntry {
        HistoryEntry {
            original: format!("text {n}"),
            detected_lang: "French".into(),
            target_lang: "English".into(),
            translation: format!("translation {n}"),
            alternatives: vec![],
            cultural_notes: String::new(),
        }
    }

    #[test]
    fn test_twenty_languages_english_first() {
        assert_eq!(LANGUAGES.len(), 20);
        assert_eq!(default_language().name, "English");
    }

    #[test]
    fn test_find_language_by_name_or_code() {
        assert_eq!(find_language("ja").map(|l| l.name), Some("Japanese"));
        assert_eq!(find_language("chinese (simplified)").map(|l| l.code), Some("zh"));
        assert!(find_language("Klingon").is_none());
    }

    #[test]
    fn test_user_message_format() {
        let fr = find_language("French").expect("fr");
        let msgs = translation_messages("Hello", fr).expect("ok");
        assert_eq!(msgs[0].content, TRANSLATION_SYSTEM_PROMPT);
        assert_eq!(msgs[1].content, "Translate the following text to French:\n\nHello");
    }

    #[test]
    fn test_empty_text_rejected() {
        let err = translation_messages(" \n", default_language()).unwrap_err();
        assert_eq!(err.to_string(), EMPTY_TEXT_MESSAGE);
    }

    #[test]
    fn test_history_newest_first_and_capped() {
        let mut h = TranslationHistory::new();
        for i in 0..12 {
            h.record(entry(i));
        }
        assert_eq!(h.len(), HISTORY_LIMIT);
        assert_eq!(h.entries()[0].original, "text 11");
        assert_eq!(h.entries()[9].original, "text 2");
    }

    #[test]
    fn test_history_clear() {
        let mut h = TranslationHistory::new();
        h.record(entry(0));
        h.clear();
        assert!(h.is_empty());
    }

    #[test]
    fn test_preview_truncates_by_chars() {
        assert_eq!(preview("short", PREVIEW_CHARS), "short");
        let long = "é".repeat(101);
        let p = preview(&long, PREVIEW_CHARS);
        assert!(p.ends_with("..."));
        assert_eq!(p.chars().count(), 103);
        assert_eq!(preview(&"a".repeat(100), 100), "a".repeat(100));
    }

    #[test]
    fn test_translate_rejects_blank_before_request() {
        let settings = crate::config::Settings::default().with_api_key(Some("sk-test".into()));
        let client = CompletionClient::new(&settings).expect("client");
        let result = tokio_test::block_on(translate(&client, "m", "   ", default_language()));
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_outcome_history_entry_found() {
        let out = TranslationOutcome::from_response(
            "Bonjour",
            default_language(),
            r#"{"detected_language":"French","translated_text":"Hello","alternatives":["Hi"]}"#,
        );
        let e = out.history_entry().expect("entry");
        assert_eq!(e.detected_lang, "French");
        assert_eq!(e.target_lang, "English");
        assert_eq!(e.translation, "Hello");
        assert_eq!(e.alternatives, vec!["Hi"]);
    }

    #[test]
    fn test_outcome_unknown_language_label() {
        let out = TranslationOutcome::from_response("x", default_language(), r#"{"translated_text":"x"}"#);
        assert_eq!(out.history_entry().expect("entry").detected_lang, "Unknown");
    }

    #[test]
    fn test_outcome_malformed_has_no_history() {
        let out = TranslationOutcome::from_response("x", default_language(), "Hello there");
        assert_eq!(out.result, ExtractionResult::MalformedPayload("Hello there".into()));
        assert!(out.history_entry().is_none());
    }
}
