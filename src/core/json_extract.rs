//! Recover structured JSON from free-form model text.
//!
//! Attempts, in order:
//! 1. a fenced code block (```` ```json ```` or a bare ```` ``` ````),
//! 2. the loose span from the first `{` to the last `}`,
//! 3. the whole text.
//!
//! An attempt that does not parse falls through to the next one; when all
//! of them fail the result is `None`.

use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::OnceLock;

fn fenced_block() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)```(?:json|JSON)?[ \t]*\r?\n?(.*?)```").expect("valid fenced block regex")
    })
}

fn parse_candidate(candidate: &str) -> Option<Value> {
    let trimmed = candidate.trim();
    if trimmed.is_empty() {
        return None;
    }
    serde_json::from_str(trimmed).ok()
}

fn loose_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

pub fn extract_json_from_text(text: &str) -> Option<Value> {
    for caps in fenced_block().captures_iter(text) {
        if let Some(value) = caps.get(1).and_then(|m| parse_candidate(m.as_str())) {
            return Some(value);
        }
    }

    if let Some(value) = loose_object(text).and_then(parse_candidate) {
        return Some(value);
    }

    match parse_candidate(text) {
        Some(value) => Some(value),
        None => {
            tracing::debug!("No JSON found in {} chars of model text", text.len());
            None
        }
    }
}

/// 解析並轉成指定型別；格式不符也回傳 `None`
pub fn extract_as<T: DeserializeOwned>(text: &str) -> Option<T> {
    let value = extract_json_from_text(text)?;
    match serde_json::from_value(value) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            tracing::warn!("JSON found but did not match the expected shape: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fenced_block() {
        let text = "Here is your plan:\n```json\n{\"trip_overview\": \"3 days\", \"itinerary\": []}\n```\n## Day 1\n...";
        assert_eq!(
            extract_json_from_text(text),
            Some(json!({"trip_overview": "3 days", "itinerary": []}))
        );
    }

    #[test]
    fn test_bare_fence() {
        let text = "```\n{\"places\": \"A\\nB\"}\n```";
        assert_eq!(extract_json_from_text(text), Some(json!({"places": "A\nB"})));
    }

    #[test]
    fn test_loose_object_without_fence() {
        let text = "Sure! {\"summary\": \"food trip\", \"locations\": [{\"name\": \"Time Out Market\"}]} Enjoy.";
        let value = extract_json_from_text(text).unwrap();
        assert_eq!(value["locations"][0]["name"], "Time Out Market");
    }

    #[test]
    fn test_broken_fence_falls_through_to_loose_match() {
        let text = "```json\n{\"a\": 1,,}\n```\nactually: {\"a\": 2}";
        // 圍欄內容壞掉，寬鬆比對涵蓋兩段也失敗，最後整段也失敗
        assert_eq!(extract_json_from_text(text), None);

        let text = "```json\nnot json\n```\n{\"a\": 2}";
        assert_eq!(extract_json_from_text(text), Some(json!({"a": 2})));
    }

    #[test]
    fn test_whole_text_array() {
        assert_eq!(
            extract_json_from_text("[\"Louvre\", \"Orsay\"]"),
            Some(json!(["Louvre", "Orsay"]))
        );
    }

    #[test]
    fn test_malformed_input_returns_none() {
        assert_eq!(extract_json_from_text(""), None);
        assert_eq!(extract_json_from_text("no json here"), None);
        assert_eq!(extract_json_from_text("{ unterminated"), None);
        assert_eq!(extract_json_from_text("```json\n{\"a\":\n```"), None);
    }

    #[test]
    fn test_extract_as_shape_mismatch() {
        #[derive(serde::Deserialize)]
        struct Places {
            #[allow(dead_code)]
            places: String,
        }
        assert!(extract_as::<Places>("{\"places\": 3}").is_none());
        assert!(extract_as::<Places>("{\"places\": \"A\"}").is_some());
    }
}
