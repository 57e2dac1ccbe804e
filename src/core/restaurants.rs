use crate::core::json_extract::extract_json_from_text;
use crate::domain::ports::{ChatMessage, ChatModel, ChatRequest};
use crate::utils::error::{Result, TripError};
use serde_json::Value;

pub const DEFAULT_RESTAURANT_MODEL: &str = "gpt-4.1";

pub fn build_prompt(dietary_restrictions: &str, location: &str) -> String {
    format!(
        "You are a helpful restaurant recommendation assistant.
Please provide a list of at least 5 restaurants in {location}
that are suitable for someone with the following dietary restrictions:
{dietary_restrictions}.

Requirements:
- Return only the restaurant names (no links, no descriptions).
- Each restaurant should be on its own line.
- Do not include anything else besides the list.
- Return the JSON in a single ```json``` fenced code block."
    )
}

/// Restaurant names from whatever shape the model picked: a JSON string
/// array, an object holding one, or plain lines.
pub fn parse_restaurant_names(text: &str) -> Vec<String> {
    let from_json = match extract_json_from_text(text) {
        Some(Value::Array(items)) => string_items(&items),
        Some(Value::Object(map)) => map
            .values()
            .find_map(|v| v.as_array().map(|items| string_items(items)))
            .unwrap_or_default(),
        _ => Vec::new(),
    };

    if !from_json.is_empty() {
        return from_json;
    }

    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("```"))
        .map(|line| {
            line.trim_start_matches(|c: char| {
                c == '-' || c == '*' || c == '.' || c.is_ascii_digit() || c.is_whitespace()
            })
            .trim_matches(|c| c == '"' || c == ',')
            .trim()
            .to_string()
        })
        .filter(|line| !line.is_empty() && line != "[" && line != "]")
        .collect()
}

fn string_items(items: &[Value]) -> Vec<String> {
    items
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub struct RestaurantAgent<'a, C: ChatModel> {
    chat: &'a C,
    model: String,
}

impl<'a, C: ChatModel> RestaurantAgent<'a, C> {
    pub fn new(chat: &'a C, model: impl Into<String>) -> Self {
        Self {
            chat,
            model: model.into(),
        }
    }

    pub async fn get_restaurant_suggestions(
        &self,
        dietary_restrictions: &str,
        location: &str,
    ) -> Result<String> {
        let request = ChatRequest::new(&self.model)
            .message(ChatMessage::user(build_prompt(dietary_restrictions, location)))
            .temperature(0.7);

        self.chat
            .complete(request)
            .await?
            .content
            .ok_or_else(|| TripError::llm("Restaurant suggestions came back empty"))
    }

    pub async fn suggest(&self, dietary_restrictions: &str, location: &str) -> Result<Vec<String>> {
        tracing::info!(
            "🍽 Finding '{}' restaurants in {}",
            dietary_restrictions,
            location
        );
        let text = self
            .get_restaurant_suggestions(dietary_restrictions, location)
            .await?;
        Ok(parse_restaurant_names(&text))
    }
}
