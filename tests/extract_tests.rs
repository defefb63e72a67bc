//! External tests for payload extraction: Mermaid blocks and the
//! translator's JSON record.

use ai_world::diagram::{extract_mermaid, DiagramOutput};
use ai_world::extract::*;
use rstest::rstest;

// -- fenced blocks ---------------------------------------------------------

#[test]
fn test_scenario_mermaid_block() {
    let text = "Here you go:\n```mermaid\ngraph TD; A-->B\n```\nDone.";
    assert_eq!(extract_mermaid(text), ExtractionResult::Found("graph TD; A-->B".to_string()));
}

#[test]
fn test_first_mermaid_block_wins() {
    let text = "```mermaid\nfirst\n```\n```mermaid\nsecond\n```";
    assert_eq!(extract_mermaid(text).into_found().as_deref(), Some("first"));
}

#[rstest]
#[case("no fences at all")]
#[case("```python\nprint(1)\n```")]
#[case("```mermaid\ngraph TD; A-->B")]
fn test_mermaid_not_found(#[case] text: &str) {
    assert_eq!(extract_mermaid(text), ExtractionResult::NotFound);
}

#[test]
fn test_diagram_output_keeps_full_response() {
    let text = "```mermaid\nsequenceDiagram\n  A->>B: hi\n```\nA greets B.";
    let out = DiagramOutput::from_response(text.to_string());
    assert_eq!(out.response, text);
    assert!(out.diagram.is_found());
}

// -- JSON record -----------------------------------------------------------

#[test]
fn test_scenario_json_record_defaults() {
    let text = "```json\n{\"detected_language\":\"French\"}\n```";
    let rec = extract_json_record(text).into_found().expect("found");
    assert_eq!(rec.detected_language, "French");
    assert_eq!(rec.confidence_detection, "");
    assert!(rec.alternatives.is_empty());
    assert!(!rec.is_same_language);
}

#[rstest]
#[case::json_fence("```json\n{\"translated_text\":\"Hola\"}\n```")]
#[case::plain_fence("Sure!\n```\n{\"translated_text\":\"Hola\"}\n```")]
#[case::bare("  {\"translated_text\":\"Hola\"}  ")]
#[case::unclosed("```json\n{\"translated_text\":\"Hola\"}")]
fn test_json_candidate_strategies(#[case] text: &str) {
    let rec = extract_json_record(text).into_found().expect("found");
    assert_eq!(rec.translated_text, "Hola");
}

#[test]
fn test_nulls_and_unknown_keys() {
    let text = r#"{"detected_language":null,"alternatives":["A",null,"B"],"is_same_language":null,"extra":42}"#;
    let rec = extract_json_record(text).into_found().expect("found");
    assert_eq!(rec.detected_language, "");
    assert_eq!(rec.alternatives, vec!["A", "B"]);
    assert!(!rec.is_same_language);
}

#[test]
fn test_malformed_carries_located_text() {
    let text = "```json\n{\"detected_language\": \"French\",}\n```";
    assert_eq!(
        extract_json_record(text),
        ExtractionResult::MalformedPayload("{\"detected_language\": \"French\",}".to_string())
    );
}

#[rstest]
#[case("Hello, I could not produce JSON.")]
#[case("[\"not\", \"an\", \"object\"]")]
#[case("{\"is_same_language\":\"yes\"}")]
fn test_malformed_payloads(#[case] text: &str) {
    assert!(matches!(extract_json_record(text), ExtractionResult::MalformedPayload(_)));
}

#[rstest]
#[case::blank("   ")]
#[case::empty_json_fence("```json\n```")]
#[case::empty_plain_fence("```\n```")]
fn test_empty_reply_is_malformed_not_missing(#[case] text: &str) {
    assert_eq!(extract_json_record(text), ExtractionResult::MalformedPayload(String::new()));
}

#[test]
fn test_confidence_accessors() {
    let rec = extract_json_record(r#"{"confidence_detection":"high","confidence_translation":"Maybe"}"#)
        .into_found()
        .expect("found");
    assert_eq!(rec.detection_confidence(), Some(Confidence::High));
    assert_eq!(rec.translation_confidence(), None);
}

#[test]
fn test_extraction_result_serializes_tagged() {
    let found = serde_json::to_value(ExtractionResult::Found("graph TD".to_string())).expect("ser");
    assert_eq!(found, serde_json::json!({"status": "found", "value": "graph TD"}));
    let missing = serde_json::to_value(ExtractionResult::<String>::NotFound).expect("ser");
    assert_eq!(missing, serde_json::json!({"status": "not_found"}));
}
