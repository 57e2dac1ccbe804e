use crate::core::json_extract::extract_json_from_text;
use crate::domain::model::{BudgetReport, TripLeg, TripPlan};
use crate::domain::ports::{ChatMessage, ChatModel, ChatRequest};
use crate::utils::error::{Result, TripError};
use serde_json::Value;

pub const DEFAULT_ITINERARY_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TEMPERATURE: f32 = 0.2;
pub const DEFAULT_MAX_TOKENS: u32 = 2000;

const PLANNER_SYSTEM_PROMPT: &str = "You are a helpful travel planning assistant.";

const PLANNER_INSTRUCTIONS: &str = "You are an expert travel planner. Given the trip specification below, produce two outputs separated clearly:
1) A JSON block wrapped in triple backticks labeled as ```json``` that contains a machine-readable itinerary for the traveler. 2) A human-readable markdown itinerary summary suitable for sending to the traveler.

REQUIREMENTS for the JSON:
- Top-level keys: `trip_overview` (brief), `itinerary` (array).
- Each itinerary item must include: `day_index`, `date` (ISO YYYY-MM-DD if possible), `start_time` (ISO time if available), `end_time`, `activity_title`, `location_name`, `transport_mode` (one of walk, bus, metro, train, taxi, rideshare, bike, ferry, flight, none), `transport_details` (how to book, duration), `duration_minutes`, `cost_estimate` (string), `cultural_tips` (array of short tips), `notes`.
- After the JSON section, include a readable markdown itinerary with times, travel instructions, and cultural tips for each stop.

Be concise but specific: include recommended transport lines (e.g., train names or typical journey times), suggested time blocks for visits, and 2-3 cultural tips per city (short). If the input lacks dates, create a day-by-day plan in logical order. Prioritize public transport when allowed. Assume moderate budget unless user says otherwise.
";

/// Everything the planner prompt needs about the trip.
#[derive(Debug, Clone)]
pub struct ItineraryRequest<'a> {
    pub legs: &'a [TripLeg],
    pub locations: &'a [String],
    pub preferences: &'a str,
    pub transport: &'a [String],
    pub travelers: u32,
    pub budget: Option<&'a BudgetReport>,
}

#[derive(Debug, Clone)]
pub struct GeneratedItinerary {
    pub plan: Option<TripPlan>,
    /// Extracted JSON, kept even when it does not fit [`TripPlan`].
    pub json: Option<Value>,
    pub raw_text: String,
}

pub fn build_prompt(request: &ItineraryRequest<'_>) -> String {
    let cities = request
        .legs
        .iter()
        .map(|leg| {
            format!(
                "- {} ({} to {}, {} nights)",
                leg.city,
                leg.start,
                leg.end,
                leg.nights()
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let mut user_section = format!(
        "Trip cities:\n{}\n\nLocations to visit:\n{}\n\nTraveler preferences: {}\nAllowed transport modes: {}\nNumber of travelers: {}\n",
        cities,
        request.locations.join(", "),
        request.preferences,
        request.transport.join(", "),
        request.travelers
    );

    if let Some(budget) = request.budget {
        user_section.push_str(&format!(
            "Total budget: ${:.2} (estimated cost of selected places: ${:.2})\n",
            budget.total_budget, budget.total_estimated_cost
        ));
    }

    user_section.push_str(
        "\nReturn the JSON in a single ```json``` fenced code block and then the markdown itinerary.",
    );

    format!("{}\n{}", PLANNER_INSTRUCTIONS, user_section)
}

pub struct ItineraryGenerator<'a, C: ChatModel> {
    chat: &'a C,
    model: String,
}

impl<'a, C: ChatModel> ItineraryGenerator<'a, C> {
    pub fn new(chat: &'a C, model: impl Into<String>) -> Self {
        Self {
            chat,
            model: model.into(),
        }
    }

    pub async fn generate(&self, request: &ItineraryRequest<'_>) -> Result<GeneratedItinerary> {
        tracing::info!(
            "🗺 Generating itinerary for {} cities and {} places",
            request.legs.len(),
            request.locations.len()
        );

        let chat_request = ChatRequest::new(&self.model)
            .message(ChatMessage::system(PLANNER_SYSTEM_PROMPT))
            .message(ChatMessage::user(build_prompt(request)))
            .temperature(DEFAULT_TEMPERATURE)
            .max_tokens(DEFAULT_MAX_TOKENS);

        let raw_text = self
            .chat
            .complete(chat_request)
            .await?
            .content
            .ok_or_else(|| TripError::llm("Itinerary response came back empty"))?;

        let preview: String = raw_text.chars().take(100).collect();
        tracing::debug!("Raw model output: {}", preview);

        let json = extract_json_from_text(&raw_text);
        let plan = match &json {
            Some(value) => match serde_json::from_value::<TripPlan>(value.clone()) {
                Ok(plan) => {
                    tracing::info!("Parsed itinerary with {} items", plan.itinerary.len());
                    Some(plan)
                }
                Err(e) => {
                    tracing::warn!("Itinerary JSON did not match the expected shape: {}", e);
                    None
                }
            },
            None => {
                tracing::warn!(
                    "Could not extract machine-readable JSON from the response; keeping the raw output"
                );
                None
            }
        };

        Ok(GeneratedItinerary {
            plan,
            json,
            raw_text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{PlaceDetails, TransportMode};
    use crate::domain::ports::ChatResponse;
    use async_trait::async_trait;
    use chrono::NaiveDate;

    fn legs() -> Vec<TripLeg> {
        vec![
            TripLeg {
                city: "Lisbon".to_string(),
                start: NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
                end: NaiveDate::from_ymd_opt(2026, 5, 3).unwrap(),
            },
            TripLeg {
                city: "Porto".to_string(),
                start: NaiveDate::from_ymd_opt(2026, 5, 3).unwrap(),
                end: NaiveDate::from_ymd_opt(2026, 5, 5).unwrap(),
            },
        ]
    }

    #[test]
    fn test_prompt_lists_trip_parameters() {
        let legs = legs();
        let locations = vec!["Belem Tower".to_string(), "Livraria Lello".to_string()];
        let transport = vec!["train".to_string(), "walk".to_string()];
        let budget = BudgetReport {
            final_places: vec![PlaceDetails::new("Belem Tower", 10.0, 8.0)],
            total_estimated_cost: 10.0,
            total_budget: 500.0,
        };

        let prompt = build_prompt(&ItineraryRequest {
            legs: &legs,
            locations: &locations,
            preferences: "slow, food",
            transport: &transport,
            travelers: 2,
            budget: Some(&budget),
        });

        assert!(prompt.contains("- Lisbon (2026-05-01 to 2026-05-03, 2 nights)"));
        assert!(prompt.contains("- Porto (2026-05-03 to 2026-05-05, 2 nights)"));
        assert!(prompt.contains("Belem Tower, Livraria Lello"));
        assert!(prompt.contains("Allowed transport modes: train, walk"));
        assert!(prompt.contains("Number of travelers: 2"));
        assert!(prompt.contains("Total budget: $500.00"));
    }

    struct FixedChat(&'static str);

    #[async_trait]
    impl ChatModel for FixedChat {
        async fn complete(&self, request: ChatRequest) -> Result<ChatResponse> {
            assert_eq!(request.temperature, Some(DEFAULT_TEMPERATURE));
            assert_eq!(request.max_tokens, Some(DEFAULT_MAX_TOKENS));
            Ok(ChatResponse {
                content: Some(self.0.to_string()),
                finish_reason: Some("stop".to_string()),
            })
        }
    }

    #[tokio::test]
    async fn test_generate_parses_fenced_plan() {
        let chat = FixedChat(
            "```json\n{\"trip_overview\": \"Two cities by train\", \"itinerary\": [{\"day_index\": 1, \"activity_title\": \"Tram 28\", \"location_name\": \"Alfama\", \"transport_mode\": \"walk\", \"duration_minutes\": 120, \"cost_estimate\": \"$3\", \"cultural_tips\": [\"Validate your ticket\"], \"notes\": \"\"}]}\n```\n\n## Day 1\nRide tram 28...",
        );
        let generator = ItineraryGenerator::new(&chat, DEFAULT_ITINERARY_MODEL);
        let legs = legs();

        let result = generator
            .generate(&ItineraryRequest {
                legs: &legs,
                locations: &[],
                preferences: "",
                transport: &[],
                travelers: 1,
                budget: None,
            })
            .await
            .unwrap();

        let plan = result.plan.unwrap();
        assert_eq!(plan.trip_overview, "Two cities by train");
        assert_eq!(plan.itinerary[0].transport_mode, TransportMode::Walk);
        assert!(result.raw_text.contains("## Day 1"));
    }

    #[tokio::test]
    async fn test_generate_keeps_raw_text_without_json() {
        let chat = FixedChat("Day 1: wander around.");
        let generator = ItineraryGenerator::new(&chat, DEFAULT_ITINERARY_MODEL);
        let legs = legs();

        let result = generator
            .generate(&ItineraryRequest {
                legs: &legs,
                locations: &[],
                preferences: "",
                transport: &[],
                travelers: 1,
                budget: None,
            })
            .await
            .unwrap();

        assert!(result.plan.is_none());
        assert!(result.json.is_none());
        assert_eq!(result.raw_text, "Day 1: wander around.");
    }

    #[tokio::test]
    async fn test_generate_keeps_json_that_does_not_fit_plan() {
        let chat = FixedChat(
            "```json\n{\"trip_overview\": \"Porto weekend\", \"itinerary\": \"see the markdown below\"}\n```\n## Day 1",
        );
        let generator = ItineraryGenerator::new(&chat, DEFAULT_ITINERARY_MODEL);
        let legs = legs();

        let result = generator
            .generate(&ItineraryRequest {
                legs: &legs,
                locations: &[],
                preferences: "",
                transport: &[],
                travelers: 1,
                budget: None,
            })
            .await
            .unwrap();

        assert!(result.plan.is_none());
        let json = result.json.unwrap();
        assert_eq!(json["trip_overview"], "Porto weekend");
    }
}
