//! Budget selection.
//!
//! Mandatory places (the ones pulled out of the user's reels) are always
//! kept. Optional places are ranked by `review_score / cost` and added
//! first-fit while the running total stays within the budget.

use crate::domain::model::{BudgetReport, PlaceDetails};
use crate::domain::ports::{ChatMessage, ChatModel, ChatRequest, Storage};
use crate::utils::error::{Result, TripError};
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::OnceLock;

pub const DEFAULT_BUDGET_MODEL: &str = "gpt-5";
pub const BUDGET_OUTPUT_FILE: &str = "budget_output.json";

const DETAILS_SYSTEM_PROMPT: &str =
    "You are a helpful assistant that provides travel information.";

fn first_number() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+\.?\d*)").expect("valid number regex"))
}

/// `"$1,500.50"` -> `1500.5`
pub fn parse_budget(budget: &str) -> Result<f64> {
    let digits: String = budget
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    digits.parse::<f64>().map_err(|_| {
        TripError::validation(format!("Could not read a budget amount from '{}'", budget))
    })
}

/// 取字串或數字中的第一個數值，例如 "about $25 per person" -> 25
pub fn coerce_number(value: &Value) -> Option<f64> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    first_number()
        .captures(&text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

pub fn details_prompt(place: &str) -> String {
    format!(
        "Provide an estimated cost (in USD) and a review score (1-10) for visiting '{}'. \
Return the output in JSON format with keys 'cost' and 'review_score'.",
        place
    )
}

/// Parse the details JSON returned for one place.
pub fn parse_place_details(place: &str, raw: &str) -> Option<PlaceDetails> {
    let details: Value = match serde_json::from_str(raw.trim()) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Details for '{}' were not valid JSON: {}", place, e);
            return None;
        }
    };

    let (Some(cost), Some(review)) = (details.get("cost"), details.get("review_score")) else {
        tracing::warn!("Details for '{}' lack cost or review_score. Skipping.", place);
        return None;
    };

    match (coerce_number(cost), coerce_number(review)) {
        (Some(cost), Some(review_score)) => Some(PlaceDetails::new(place, cost, review_score)),
        _ => {
            tracing::warn!(
                "Could not extract a valid number for cost or review_score for '{}'. Skipping.",
                place
            );
            None
        }
    }
}

/// Optional candidates with duplicates and mandatory places removed,
/// keeping first-occurrence order.
pub fn dedupe_optional(mandatory: &[String], optional: &[String]) -> Vec<String> {
    let mandatory: HashSet<&str> = mandatory.iter().map(String::as_str).collect();
    let mut seen = HashSet::new();

    optional
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .filter(|p| !mandatory.contains(p))
        .filter(|p| seen.insert(*p))
        .map(str::to_string)
        .collect()
}

/// 貪婪選擇：必去地點全收；可選地點依 評分/花費 由高到低，放得下就加入
pub fn select_within_budget(
    mandatory: Vec<PlaceDetails>,
    optional: Vec<PlaceDetails>,
    total_budget: f64,
) -> BudgetReport {
    let mut current_cost: f64 = mandatory.iter().map(|p| p.cost).sum();
    let mut final_places = mandatory;

    let mut ranked: Vec<PlaceDetails> = optional
        .into_iter()
        .filter(|p| p.cost > 0.0)
        .map(|mut p| {
            p.score = Some(p.review_score / p.cost);
            p
        })
        .collect();

    // 穩定排序，同分時保留原順序
    ranked.sort_by(|a, b| {
        b.score
            .unwrap_or(0.0)
            .partial_cmp(&a.score.unwrap_or(0.0))
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    for place in ranked {
        if current_cost + place.cost <= total_budget {
            current_cost += place.cost;
            final_places.push(place);
        } else {
            tracing::debug!(
                "Skipping '{}' (${:.2}): would exceed budget ${:.2}",
                place.place,
                place.cost,
                total_budget
            );
        }
    }

    BudgetReport {
        final_places,
        total_estimated_cost: current_cost,
        total_budget,
    }
}

pub struct BudgetAgent<'a, C: ChatModel, S: Storage> {
    chat: &'a C,
    storage: &'a S,
    model: String,
}

impl<'a, C: ChatModel, S: Storage> BudgetAgent<'a, C, S> {
    pub fn new(chat: &'a C, storage: &'a S, model: impl Into<String>) -> Self {
        Self {
            chat,
            storage,
            model: model.into(),
        }
    }

    /// Estimated cost and review score for a place; `None` when the call
    /// or the answer is unusable.
    pub async fn fetch_place_details(&self, place: &str) -> Option<PlaceDetails> {
        let request = ChatRequest::new(&self.model)
            .message(ChatMessage::system(DETAILS_SYSTEM_PROMPT))
            .message(ChatMessage::user(details_prompt(place)))
            .json_mode();

        match self.chat.complete(request).await {
            Ok(response) => match response.content {
                Some(raw) => parse_place_details(place, &raw),
                None => {
                    tracing::warn!("Empty details response for '{}'. Skipping.", place);
                    None
                }
            },
            Err(e) => {
                tracing::warn!("An error occurred while fetching details for '{}': {}", place, e);
                None
            }
        }
    }

    async fn fetch_all(&self, places: &[String]) -> Vec<PlaceDetails> {
        let mut details = Vec::with_capacity(places.len());
        for place in places {
            if let Some(d) = self.fetch_place_details(place).await {
                tracing::debug!("{}: ${:.2}, review {:.1}", d.place, d.cost, d.review_score);
                details.push(d);
            }
        }
        details
    }

    pub async fn run(
        &self,
        mandatory: &[String],
        optional: &[String],
        total_budget: &str,
    ) -> Result<BudgetReport> {
        let (report, _) = self.run_and_save(mandatory, optional, total_budget).await?;
        Ok(report)
    }

    /// Like [`run`](Self::run), also returning where the report was written.
    pub async fn run_and_save(
        &self,
        mandatory: &[String],
        optional: &[String],
        total_budget: &str,
    ) -> Result<(BudgetReport, String)> {
        let total_budget = parse_budget(total_budget)?;
        let optional = dedupe_optional(mandatory, optional);

        tracing::info!(
            "💰 Budget ${:.2}: {} mandatory, {} optional candidates",
            total_budget,
            mandatory.len(),
            optional.len()
        );

        let mandatory_details = self.fetch_all(mandatory).await;
        let optional_details = self.fetch_all(&optional).await;

        let report = select_within_budget(mandatory_details, optional_details, total_budget);

        let json = serde_json::to_string_pretty(&report)?;
        let path = self
            .storage
            .write_file(BUDGET_OUTPUT_FILE, json.as_bytes())
            .await?;

        tracing::info!(
            "Budget analysis complete: {} places, ${:.2} of ${:.2}. Output saved to {}",
            report.final_places.len(),
            report.total_estimated_cost,
            report.total_budget,
            path
        );

        Ok((report, path))
    }
}
