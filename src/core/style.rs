//! Style agent: style-matched place recommendations for a city.

use crate::domain::model::StyleRecommendations;
use crate::domain::ports::{ChatMessage, ChatModel, ChatRequest};
use crate::utils::error::{Result, TripError};
use crate::utils::validation::validate_non_empty_string;
use serde_json::Value;

pub const DEFAULT_STYLE_MODEL: &str = "gpt-5";

const STYLE_SYSTEM_PROMPT: &str =
    "You are a helpful API that returns structured JSON data according to the user's schema.";

pub struct StyleAgent<'a, C: ChatModel> {
    chat: &'a C,
    model: String,
}

impl<'a, C: ChatModel> StyleAgent<'a, C> {
    pub fn new(chat: &'a C, model: impl Into<String>) -> Self {
        Self {
            chat,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn create_prompt(city: &str, style: &str) -> String {
        format!(
            r#"You are a helpful travel expert who provides structured data.
A user wants a list of 10-15 {style} places to visit in {city}.

Your response must be a single, valid JSON object and nothing else.
The JSON must strictly follow this schema:
{{
  "places": "string",
  "locations": ["string", ...]
}}

Instructions:
1.  In the "places" field, provide a single string containing the names of the recommended places, separated by a newline character (\n).
2.  In the "locations" field, provide a JSON array of strings, where each string is the address or area for the corresponding place.
3.  Ensure the number of locations in the array matches the number of places in the "places" string.
4.  Do not include any text, explanations, or markdown formatting before or after the JSON object.

Generate the JSON for {style} places in {city} now."#
        )
    }

    fn build_request(&self, city: &str, style: &str) -> ChatRequest {
        let request = ChatRequest::new(&self.model)
            .message(ChatMessage::system(STYLE_SYSTEM_PROMPT))
            .message(ChatMessage::user(Self::create_prompt(city, style)));

        // gpt-5 只接受預設 temperature
        if self.model == DEFAULT_STYLE_MODEL {
            request
        } else {
            request.temperature(0.5)
        }
    }

    /// Ask for recommendations and return the validated result.
    pub async fn recommend(&self, city: &str, style: &str) -> Result<StyleRecommendations> {
        validate_non_empty_string("city", city).map_err(|_| {
            TripError::validation("City must be a non-empty string.")
        })?;
        validate_non_empty_string("style", style).map_err(|_| {
            TripError::validation("Style must be a non-empty string.")
        })?;

        let city = city.trim();
        let style = style.trim().to_lowercase();

        tracing::info!("🎨 Requesting {} places in {} ({})", style, city, self.model);

        let response = self.chat.complete(self.build_request(city, &style)).await?;

        if response.finish_reason.as_deref() == Some("content_filter") {
            return Err(TripError::llm(
                "The request was blocked by the provider's content filter.",
            ));
        }

        let text = response
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| {
                TripError::llm(format!(
                    "Model returned an empty response. Finish reason: '{}'.",
                    response.finish_reason.as_deref().unwrap_or("unknown")
                ))
            })?;

        parse_and_validate(&text)
    }

    /// Same as [`recommend`](Self::recommend) but re-serialized as pretty JSON.
    pub async fn get_recommendations(&self, city: &str, style: &str) -> Result<String> {
        let recommendations = self.recommend(city, style).await?;
        Ok(serde_json::to_string_pretty(&recommendations)?)
    }
}

fn strip_fence(text: &str) -> &str {
    let mut s = text.trim();
    if let Some(rest) = s.strip_prefix("```json") {
        s = rest.trim();
    } else if let Some(rest) = s.strip_prefix("```") {
        s = rest.trim();
    }
    if let Some(rest) = s.strip_suffix("```") {
        s = rest.trim();
    }
    s
}

/// 檢查模型回傳的 JSON 是否符合 places/locations 結構
pub fn parse_and_validate(text: &str) -> Result<StyleRecommendations> {
    let data: Value = serde_json::from_str(strip_fence(text)).map_err(|e| {
        TripError::schema(format!(
            "Failed to decode JSON from the model's response. Error: {}",
            e
        ))
    })?;

    let object = data.as_object().ok_or_else(|| {
        TripError::schema("Invalid response: The root of the response is not a JSON object.")
    })?;

    let places = object
        .get("places")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            TripError::schema("Invalid schema: The 'places' key is missing or is not a string.")
        })?;

    let raw_locations = object
        .get("locations")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            TripError::schema("Invalid schema: The 'locations' key is missing or is not a list.")
        })?;

    let locations = raw_locations
        .iter()
        .map(|loc| loc.as_str().map(str::to_string))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| {
            TripError::schema("Invalid schema: Not all items in the 'locations' list are strings.")
        })?;

    let place_count = places.trim().split('\n').count();
    if place_count != locations.len() {
        return Err(TripError::schema(format!(
            "Data mismatch: {} places but {} locations.",
            place_count,
            locations.len()
        )));
    }

    Ok(StyleRecommendations {
        places: places.to_string(),
        locations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::ChatResponse;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct ScriptedChat {
        response: ChatResponse,
        seen: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedChat {
        fn replying(content: &str, finish_reason: &str) -> Self {
            Self {
                response: ChatResponse {
                    content: Some(content.to_string()),
                    finish_reason: Some(finish_reason.to_string()),
                },
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedChat {
        async fn complete(&self, request: ChatRequest) -> Result<ChatResponse> {
            self.seen.lock().unwrap().push(request);
            Ok(self.response.clone())
        }
    }

    const GOOD: &str = r#"{"places": "Ichiran Shibuya\nTsukiji Outer Market", "locations": ["Shibuya", "Chuo"]}"#;

    #[tokio::test]
    async fn test_recommend_normalizes_inputs() {
        let chat = ScriptedChat::replying(GOOD, "stop");
        let agent = StyleAgent::new(&chat, "gpt-4.1");

        let recs = agent.recommend("  Tokyo ", " FOODIE ").await.unwrap();
        assert_eq!(recs.place_names().len(), 2);

        let seen = chat.seen.lock().unwrap();
        let prompt = seen[0].last_user_text();
        assert!(prompt.contains("10-15 foodie places to visit in Tokyo."));
        assert_eq!(seen[0].temperature, Some(0.5));
    }

    #[tokio::test]
    async fn test_default_model_omits_temperature() {
        let chat = ScriptedChat::replying(GOOD, "stop");
        let agent = StyleAgent::new(&chat, DEFAULT_STYLE_MODEL);
        agent.recommend("Tokyo", "foodie").await.unwrap();
        assert_eq!(chat.seen.lock().unwrap()[0].temperature, None);
    }

    #[test]
    fn test_rejects_blank_inputs() {
        let chat = ScriptedChat::replying(GOOD, "stop");
        let agent = StyleAgent::new(&chat, DEFAULT_STYLE_MODEL);
        let err = tokio_test::block_on(agent.recommend("   ", "foodie")).unwrap_err();
        assert!(err.to_string().contains("City must be"));
        let err = tokio_test::block_on(agent.recommend("Tokyo", "")).unwrap_err();
        assert!(err.to_string().contains("Style must be"));
        assert!(chat.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_content_filter_and_empty_response() {
        let chat = ScriptedChat::replying(GOOD, "content_filter");
        let agent = StyleAgent::new(&chat, DEFAULT_STYLE_MODEL);
        let err = agent.recommend("Tokyo", "foodie").await.unwrap_err();
        assert!(err.to_string().contains("content filter"));

        let chat = ScriptedChat::replying("  ", "length");
        let agent = StyleAgent::new(&chat, DEFAULT_STYLE_MODEL);
        let err = agent.recommend("Tokyo", "foodie").await.unwrap_err();
        assert!(err.to_string().contains("'length'"));
    }

    #[test]
    fn test_parse_and_validate_schema_errors() {
        assert!(parse_and_validate(&format!("```json\n{}\n```", GOOD)).is_ok());
        assert!(parse_and_validate("not json").is_err());
        assert!(parse_and_validate("[1, 2]").is_err());
        assert!(parse_and_validate(r#"{"places": ["a"], "locations": []}"#).is_err());
        assert!(parse_and_validate(r#"{"places": "a", "locations": "x"}"#).is_err());
        assert!(parse_and_validate(r#"{"places": "a", "locations": [1]}"#).is_err());

        let err = parse_and_validate(r#"{"places": "a\nb\nc", "locations": ["x", "y"]}"#)
            .unwrap_err();
        assert!(matches!(err, TripError::SchemaError { .. }));
        assert!(err.to_string().contains("3 places but 2 locations"));
    }

    #[tokio::test]
    async fn test_get_recommendations_is_pretty_json() {
        let chat = ScriptedChat::replying(GOOD, "stop");
        let agent = StyleAgent::new(&chat, DEFAULT_STYLE_MODEL);
        let json = agent.get_recommendations("Tokyo", "foodie").await.unwrap();
        assert!(json.contains("\n  \"places\""));
    }
}
