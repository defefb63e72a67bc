//! Terminal rendering for the CLI pages.
//!
//! Renderers return `String`s so the binary decides where they go and tests
//! can inspect them.

use colored::*;

use crate::diagram::{self, DiagramOutput, NOT_FOUND_MESSAGE, REFUSAL_MESSAGE};
use crate::extract::ExtractionResult;
use crate::personas::{Personality, PERSONALITIES};
use crate::providers::ModelChoice;
use crate::translate::{self, TranslationOutcome, LANGUAGES};

/// Prints only what a new snapshot adds to the previous one.
///
/// Relies on snapshots being append-only.
#[derive(Debug, Default)]
pub struct StreamPrinter {
    printed: usize,
}

impl StreamPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The part of `snapshot` not yet printed.
    pub fn delta<'a>(&mut self, snapshot: &'a str) -> &'a str {
        let start = self.printed.min(snapshot.len());
        self.printed = snapshot.len();
        snapshot.get(start..).unwrap_or("")
    }
}

/// Page title plus the model in use; catalogue models show their label.
pub fn banner(title: &str, model: &str) -> String {
    let label = match ModelChoice::from_model_id(model) {
        Some(choice) => format!("{} ({})", choice.display_name(), model),
        None => model.to_string(),
    };
    format!(
        "{}\n{}: {}\n{}",
        title.bright_cyan().bold(),
        "Model".bright_yellow(),
        label,
        "=".repeat(50).bright_blue()
    )
}

pub fn error_lines(err: &dyn std::error::Error) -> String {
    format!(
        "{} {}\n{}",
        "Error:".bright_red().bold(),
        err,
        "Please check your API key and try again.".bright_blue()
    )
}

pub fn render_models() -> String {
    ModelChoice::ALL
        .iter()
        .map(|m| format!("  {:<26} {}", m.display_name(), m.model_id()))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_personality(p: &Personality) -> String {
    let mut out = format!("{} - {}\n", p.title().bold(), p.description);
    out.push_str(&format!("  Style: {}\n", p.style));
    out.push_str(&format!("  Expertise: {}\n", p.expertise.join(", ")));
    out.push_str(&format!("  \"{}\"\n", p.example));
    out.push_str(&format!("  Try: {}", p.starters.join(" | ")));
    out
}

pub fn render_personas() -> String {
    PERSONALITIES
        .iter()
        .map(|p| format!("[{}] {}", p.key.bright_yellow(), render_personality(p)))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn render_languages() -> String {
    LANGUAGES
        .iter()
        .map(|l| format!("  {:<4}{}", l.code, l.name))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Full explanation, diagram source only, or a notice when there is no
/// diagram (the refusal sentence when the model declined).
pub fn render_diagram(output: &DiagramOutput, code_only: bool) -> String {
    if output.is_refusal() {
        return REFUSAL_MESSAGE.yellow().to_string();
    }
    match (&output.diagram, code_only) {
        (ExtractionResult::Found(code), true) => code.clone(),
        (ExtractionResult::Found(code), false) => format!(
            "{}\n{}\n{}",
            "--- Mermaid source ---".bright_green(),
            code,
            "----------------------".bright_green()
        ),
        _ => NOT_FOUND_MESSAGE.yellow().to_string(),
    }
}

pub fn render_translation(outcome: &TranslationOutcome) -> String {
    match &outcome.result {
        ExtractionResult::Found(record) => {
            let detected = if record.detected_language.is_empty() { "Unknown" } else { record.detected_language.as_str() };
            let det_conf = if record.confidence_detection.is_empty() { "N/A" } else { record.confidence_detection.as_str() };
            let mut out = format!("{} {} ({} confidence)\n", "Detected Language:".bright_yellow(), detected, det_conf);
            out.push_str(&format!("{}\n", "-".repeat(50).bright_blue()));

            if record.is_same_language {
                out.push_str(&format!("{}\n", "The input text is already in the target language.".bright_blue()));
                let text = if record.original_text.is_empty() { &outcome.input } else { &record.original_text };
                out.push_str(&format!("{} {}\n", "Text:".bold(), text));
            } else {
                let translated = if record.translated_text.is_empty() {
                    "Translation not available"
                } else {
                    record.translated_text.as_str()
                };
                let tr_conf = if record.confidence_translation.is_empty() { "N/A" } else { record.confidence_translation.as_str() };
                out.push_str(&format!("{} ({})\n", "Translation".bright_green().bold(), outcome.target));
                out.push_str(&format!("{}\n", translated.bright_green()));
                out.push_str(&format!("Confidence: {}\n", tr_conf));
            }

            let alts: Vec<&str> = record.visible_alternatives().collect();
            if !alts.is_empty() {
                out.push_str(&format!("{}\n", "Alternatives:".bright_yellow()));
                for alt in alts {
                    out.push_str(&format!("  • {}\n", alt));
                }
            }
            if let Some(notes) = record.notes() {
                out.push_str(&format!("{}\n{}\n", "Cultural Notes:".bright_yellow(), notes));
            }
            out.trim_end().to_string()
        }
        ExtractionResult::MalformedPayload(raw) => {
            format!("{}\n{}", "Translation Result".bold(), raw)
        }
        ExtractionResult::NotFound => "Translation Result".bold().to_string(),
    }
}

fn render_examples(examples: &[(&str, &str)]) -> String {
    examples
        .iter()
        .map(|(label, text)| format!("  {:<20} {}", label.bright_yellow(), text))
        .collect::<Vec<_>>()
        .join("
")
}

pub fn render_diagram_examples() -> String {
    format!("{}
{}", "Example Prompts".bold(), render_examples(diagram::EXAMPLE_PROMPTS))
}

/// Quick-translate samples, shown as `label  text`.
pub fn render_translate_examples() -> String {
    let swapped: Vec<(&str, &str)> = translate::QUICK_EXAMPLES.iter().map(|(text, label)| (*label, *text)).collect();
    format!("{}
{}", "Quick Translate Examples".bold(), render_examples(&swapped))
}
