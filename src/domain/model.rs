use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

/// 一個城市的停留區間
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripLeg {
    pub city: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl TripLeg {
    pub fn nights(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

/// 預算代理查到的地點資訊；`score` 只有可選地點才會有
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceDetails {
    pub place: String,
    pub cost: f64,
    pub review_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl PlaceDetails {
    pub fn new(place: impl Into<String>, cost: f64, review_score: f64) -> Self {
        Self {
            place: place.into(),
            cost,
            review_score,
            score: None,
        }
    }
}

/// Written to `budget_output.json` at the end of budget selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetReport {
    pub final_places: Vec<PlaceDetails>,
    pub total_estimated_cost: f64,
    pub total_budget: f64,
}

impl BudgetReport {
    pub fn place_names(&self) -> Vec<String> {
        self.final_places.iter().map(|p| p.place.clone()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationMention {
    pub name: String,
    #[serde(default, deserialize_with = "lenient_rating")]
    pub rating: Option<String>,
}

/// 模型有時把評分寫成數字，統一轉成字串
fn lenient_rating<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReelSummary {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub locations: Vec<LocationMention>,
}

impl ReelSummary {
    pub fn location_names(&self) -> Vec<String> {
        self.locations.iter().map(|l| l.name.clone()).collect()
    }
}

/// Intermediate result of a single reel before batching.
#[derive(Debug, Clone)]
pub struct ProcessedReel {
    pub video: PathBuf,
    pub montage: PathBuf,
    pub transcript: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleRecommendations {
    pub places: String,
    pub locations: Vec<String>,
}

impl StyleRecommendations {
    pub fn place_names(&self) -> Vec<String> {
        self.places
            .split('\n')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    Walk,
    Bus,
    Metro,
    Train,
    Taxi,
    Rideshare,
    Bike,
    Ferry,
    Flight,
    #[default]
    #[serde(other)]
    None,
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Walk => "walk",
            Self::Bus => "bus",
            Self::Metro => "metro",
            Self::Train => "train",
            Self::Taxi => "taxi",
            Self::Rideshare => "rideshare",
            Self::Bike => "bike",
            Self::Ferry => "ferry",
            Self::Flight => "flight",
            Self::None => "none",
        };
        f.write_str(name)
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// 模型輸出常缺欄位或給 null，全部給預設值讓畫面仍可呈現
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItineraryItem {
    #[serde(deserialize_with = "lenient_count")]
    pub day_index: u32,
    pub date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub activity_title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub location_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub transport_mode: TransportMode,
    #[serde(deserialize_with = "null_as_default")]
    pub transport_details: String,
    #[serde(deserialize_with = "lenient_count")]
    pub duration_minutes: u32,
    #[serde(deserialize_with = "lenient_cost")]
    pub cost_estimate: String,
    #[serde(deserialize_with = "lenient_tips")]
    pub cultural_tips: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub notes: String,
}

/// 整數欄位：接受 null、小數 (`90.0`) 與數字字串 (`"90"`)，其餘給 0
fn lenient_count<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let number = match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(number
        .filter(|n| n.is_finite() && *n >= 0.0)
        .map(|n| n.round().min(u32::MAX as f64) as u32)
        .unwrap_or_default())
}

/// 單一字串視為一則提示
fn lenient_tips<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => vec![s],
        Some(serde_json::Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                serde_json::Value::String(s) => Some(s),
                serde_json::Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
        _ => Vec::new(),
    })
}

fn lenient_cost<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) => s,
        Some(other) => other.to_string(),
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TripPlan {
    #[serde(default)]
    pub trip_overview: String,
    #[serde(default)]
    pub itinerary: Vec<ItineraryItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_itinerary_item_tolerates_sparse_model_output() {
        let item: ItineraryItem = serde_json::from_value(serde_json::json!({
            "day_index": 2,
            "activity_title": "Alfama walk",
            "transport_mode": "tram",
            "cost_estimate": 12,
            "notes": null
        }))
        .unwrap();

        assert_eq!(item.day_index, 2);
        assert_eq!(item.transport_mode, TransportMode::None);
        assert_eq!(item.cost_estimate, "12");
        assert!(item.notes.is_empty());
        assert!(item.cultural_tips.is_empty());
    }

    #[test]
    fn test_itinerary_item_numbers_from_floats_strings_and_null() {
        let item: ItineraryItem = serde_json::from_value(serde_json::json!({
            "day_index": null,
            "duration_minutes": 90.0
        }))
        .unwrap();
        assert_eq!(item.day_index, 0);
        assert_eq!(item.duration_minutes, 90);

        let item: ItineraryItem = serde_json::from_value(serde_json::json!({
            "day_index": "3",
            "duration_minutes": "90",
        }))
        .unwrap();
        assert_eq!(item.day_index, 3);
        assert_eq!(item.duration_minutes, 90);

        let item: ItineraryItem =
            serde_json::from_value(serde_json::json!({"duration_minutes": "about an hour"}))
                .unwrap();
        assert_eq!(item.duration_minutes, 0);
    }

    #[test]
    fn test_single_string_tip_becomes_list() {
        let item: ItineraryItem = serde_json::from_value(serde_json::json!({
            "cultural_tips": "Bow when greeting"
        }))
        .unwrap();
        assert_eq!(item.cultural_tips, vec!["Bow when greeting".to_string()]);
    }

    #[test]
    fn test_trip_plan_survives_mixed_item_types() {
        let plan: TripPlan = serde_json::from_str(
            r#"{
                "trip_overview": "Kyoto in spring",
                "itinerary": [
                    {"day_index": 1, "activity_title": "Kiyomizu-dera", "duration_minutes": 90.0},
                    {"day_index": null, "activity_title": "Gion walk", "duration_minutes": "90"},
                    {"day_index": "2", "activity_title": "Tea ceremony", "cultural_tips": "Bow when greeting"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(plan.itinerary.len(), 3);
        assert_eq!(plan.itinerary[0].duration_minutes, 90);
        assert_eq!(plan.itinerary[1].day_index, 0);
        assert_eq!(plan.itinerary[1].duration_minutes, 90);
        assert_eq!(plan.itinerary[2].day_index, 2);
        assert_eq!(plan.itinerary[2].cultural_tips.len(), 1);
    }

    #[test]
    fn test_style_place_names_drop_blank_lines() {
        let recs = StyleRecommendations {
            places: "Tsukiji Outer Market\n\n  Omoide Yokocho \n".to_string(),
            locations: vec!["Chuo".to_string(), "Shinjuku".to_string()],
        };
        assert_eq!(
            recs.place_names(),
            vec!["Tsukiji Outer Market".to_string(), "Omoide Yokocho".to_string()]
        );
    }

    #[test]
    fn test_budget_output_keys() {
        let report = BudgetReport {
            final_places: vec![PlaceDetails::new("Louvre", 22.0, 9.0)],
            total_estimated_cost: 22.0,
            total_budget: 300.0,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("final_places").is_some());
        assert!(json.get("total_estimated_cost").is_some());
        assert!(json.get("total_budget").is_some());
        assert!(json["final_places"][0].get("score").is_none());
    }

    #[test]
    fn test_numeric_rating_becomes_string() {
        let mention: LocationMention =
            serde_json::from_value(serde_json::json!({"name": "Pena Palace", "rating": 4.5}))
                .unwrap();
        assert_eq!(mention.rating.as_deref(), Some("4.5"));
    }
}
