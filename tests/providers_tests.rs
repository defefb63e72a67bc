//! External tests for providers module: model catalogue and wire types.

use ai_world::providers::*;

// -- Model catalogue -----------------------------------------------------

#[test]
fn test_model_display_is_wire_id() {
    assert_eq!(ModelChoice::Deepseek.to_string(), "deepseek/deepseek-v3.2");
    assert_eq!(ModelChoice::Gemini.to_string(), "google/gemini-2.5-flash");
}

#[test]
fn test_model_display_names_unique() {
    let names: std::collections::HashSet<_> = ModelChoice::ALL.iter().map(|m| m.display_name()).collect();
    assert_eq!(names.len(), ModelChoice::ALL.len());
}

#[test]
fn test_model_ids_are_vendor_qualified() {
    for m in ModelChoice::ALL {
        assert!(m.model_id().contains('/'), "{}", m.model_id());
    }
}

// -- Request serialization -----------------------------------------------

#[test]
fn test_chat_request_serializes() {
    let req = ChatRequest {
        model: "deepseek/deepseek-v3.2".to_string(),
        messages: vec![ChatMessage::system("be brief"), ChatMessage::user("hi")],
        stream: true,
        temperature: None,
        provider: Some(ProviderPreferences { data_collection: "deny".to_string() }),
    };
    let v = serde_json::to_value(&req).expect("ser");
    assert_eq!(v["model"], "deepseek/deepseek-v3.2");
    assert_eq!(v["messages"][0]["role"], "system");
    assert_eq!(v["messages"][1]["content"], "hi");
    assert_eq!(v["stream"], true);
    assert_eq!(v["provider"]["data_collection"], "deny");
    assert!(v.get("temperature").is_none());
}

#[test]
fn test_chat_request_omits_provider_when_none() {
    let req = ChatRequest {
        model: "m".to_string(),
        messages: vec![],
        stream: false,
        temperature: Some(0.7),
        provider: None,
    };
    let v = serde_json::to_value(&req).expect("ser");
    assert!(v.get("provider").is_none());
    assert!(v["temperature"].as_f64().is_some());
}

// -- Response deserialization --------------------------------------------

#[test]
fn test_chunk_content() {
    let chunk: ChatChunk = serde_json::from_str(r#"{"id":"x","choices":[{"index":0,"delta":{"role":"assistant","content":"Hi"}}]}"#)
        .expect("de");
    assert_eq!(chunk.content(), Some("Hi"));
}

#[test]
fn test_chunk_without_content() {
    let chunk: ChatChunk = serde_json::from_str(r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#).expect("de");
    assert_eq!(chunk.content(), None);
}

#[test]
fn test_completion_content() {
    let body: ChatCompletion =
        serde_json::from_str(r#"{"choices":[{"message":{"role":"assistant","content":" {\"a\":1} "}}]}"#).expect("de");
    assert_eq!(body.content(), Some(" {\"a\":1} "));
}

#[test]
fn test_api_error_message_envelope_and_raw() {
    assert_eq!(api_error_message(r#"{"error":{"message":"No auth credentials found","code":401}}"#), "No auth credentials found");
    assert_eq!(api_error_message("  upstream timeout \n"), "upstream timeout");
}
