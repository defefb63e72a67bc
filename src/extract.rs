//! Best-effort extraction of structured content from a free-form reply.
//!
//! Nothing here fails: every input maps to exactly one [`ExtractionResult`]
//! variant so a page can always show *something*.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

const FENCE: &str = "```";
const JSON_FENCE: &str = "```json";

// ---------------------------------------------------------------------------
// ExtractionResult
// ---------------------------------------------------------------------------

/// Outcome of looking for an embedded payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum ExtractionResult<T> {
    /// Payload located and decoded.
    Found(T),
    /// No embedded block of the expected kind.
    NotFound,
    /// A block was located but its content did not decode. Carries the raw
    /// located text so it can be shown verbatim.
    MalformedPayload(String),
}

impl<T> ExtractionResult<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, ExtractionResult::Found(_))
    }

    pub fn found(&self) -> Option<&T> {
        match self {
            ExtractionResult::Found(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_found(self) -> Option<T> {
        match self {
            ExtractionResult::Found(v) => Some(v),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Fenced blocks
// ---------------------------------------------------------------------------

/// Return the body of the first ```` ```{language_tag} ```` block in `text`.
///
/// The tag match is case-sensitive and the body runs to the nearest closing
/// fence. An opening fence that is never closed counts as absent.
pub fn extract_fenced_block(text: &str, language_tag: &str) -> ExtractionResult<String> {
    let opener = format!("{FENCE}{language_tag}");
    let Some(start) = text.find(&opener) else {
        return ExtractionResult::NotFound;
    };
    let rest = &text[start + opener.len()..];
    match rest.find(FENCE) {
        Some(end) => ExtractionResult::Found(rest[..end].trim().to_string()),
        None => ExtractionResult::NotFound,
    }
}

/// Pick the substring of a reply that should hold a JSON document.
///
/// In order: the body of the first ```` ```json ```` fence (to the end of
/// the text when unclosed), else the body of the first plain fence, else
/// the whole reply. Always trimmed.
pub fn json_candidate(text: &str) -> &str {
    let text = text.trim();
    let after = if let Some(idx) = text.find(JSON_FENCE) {
        &text[idx + JSON_FENCE.len()..]
    } else if let Some(idx) = text.find(FENCE) {
        &text[idx + FENCE.len()..]
    } else {
        return text;
    };
    after.split(FENCE).next().unwrap_or(after).trim()
}

/// Decode the JSON object embedded in `text` into `T`.
///
/// Only JSON objects are accepted; arrays and scalars are malformed even if
/// `T` could be built from them positionally. A reply with nothing in it is
/// `MalformedPayload("")`; this never returns `NotFound`.
pub fn extract_json<T: DeserializeOwned>(text: &str) -> ExtractionResult<T> {
    let candidate = json_candidate(text);
    let decoded = serde_json::from_str::<serde_json::Value>(candidate).and_then(|value| {
        if value.is_object() {
            serde_json::from_value::<T>(value)
        } else {
            Err(serde::de::Error::custom("expected a JSON object"))
        }
    });
    match decoded {
        Ok(v) => ExtractionResult::Found(v),
        Err(e) => {
            tracing::warn!(error = %e, len = candidate.len(), "structured payload did not decode");
            ExtractionResult::MalformedPayload(candidate.to_string())
        }
    }
}

/// [`extract_json`] specialised to the translator's record.
pub fn extract_json_record(text: &str) -> ExtractionResult<TranslationRecord> {
    extract_json(text)
}

// ---------------------------------------------------------------------------
// TranslationRecord
// ---------------------------------------------------------------------------

/// The JSON document the translator asks the model for.
///
/// Absent keys and explicit `null`s both fall back to the empty value;
/// unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationRecord {
    #[serde(deserialize_with = "null_as_default")]
    pub detected_language: String,
    #[serde(deserialize_with = "null_as_default")]
    pub confidence_detection: String,
    #[serde(deserialize_with = "null_as_default")]
    pub original_text: String,
    #[serde(deserialize_with = "null_as_default")]
    pub translated_text: String,
    #[serde(deserialize_with = "null_as_default")]
    pub confidence_translation: String,
    #[serde(deserialize_with = "lenient_list")]
    pub alternatives: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub cultural_notes: String,
    #[serde(deserialize_with = "null_as_default")]
    pub is_same_language: bool,
}

impl TranslationRecord {
    pub fn detection_confidence(&self) -> Option<Confidence> {
        Confidence::parse(&self.confidence_detection)
    }

    pub fn translation_confidence(&self) -> Option<Confidence> {
        Confidence::parse(&self.confidence_translation)
    }

    /// Alternatives with blank entries dropped.
    pub fn visible_alternatives(&self) -> impl Iterator<Item = &str> {
        self.alternatives
            .iter()
            .map(|s| s.as_str())
            .filter(|s| !s.trim().is_empty())
    }

    /// Cultural notes, or `None` when they are blank.
    pub fn notes(&self) -> Option<&str> {
        let notes = self.cultural_notes.trim();
        (!notes.is_empty()).then_some(notes)
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let items: Option<Vec<Option<String>>> = Option::deserialize(deserializer)?;
    Ok(items.unwrap_or_default().into_iter().flatten().collect())
}

/// High / Medium / Low rating the model attaches to detection and translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    /// Case-insensitive; anything else is `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Some(Confidence::High),
            "medium" => Some(Confidence::Medium),
            "low" => Some(Confidence::Low),
            _ => None,
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Confidence::High => write!(f, "High"),
            Confidence::Medium => write!(f, "Medium"),
            Confidence::Low => write!(f, "Low"),
        }
    }
}
