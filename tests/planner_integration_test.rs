use anyhow::Result;
use httpmock::prelude::*;
use reel_trip::config::trip::TripConfig;
use reel_trip::core::budget::BudgetAgent;
use reel_trip::core::style::StyleAgent;
use reel_trip::domain::model::{LocationMention, ReelSummary, TransportMode};
use reel_trip::utils::validation::Validate;
use reel_trip::{FfmpegMedia, LocalStorage, OpenAiClient, SummarySource, TripError, TripPlanner};
use serde_json::{json, Value};
use tempfile::TempDir;

/// 包成 chat/completions 的回應格式
fn completion(content: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
}

fn mock_chat<'a>(server: &'a MockServer, needle: &str, content: &str) -> httpmock::Mock<'a> {
    let body = completion(content);
    server.mock(|when, then| {
        when.method(POST)
            .path("/chat/completions")
            .header("Authorization", "Bearer sk-test")
            .body_contains(needle);
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(body);
    })
}

fn trip_toml(output_dir: &str) -> String {
    format!(
        r#"
[trip]
budget = "$100"
travelers = 2
preferences = "foodie"
transport = ["train", "walk"]

[[legs]]
city = "Kyoto"
start = "2026-04-01"
end = "2026-04-03"

[output]
dir = "{}"

[models]
style = "gpt-4.1"
"#,
        output_dir.replace('\\', "/")
    )
}

#[tokio::test]
async fn test_plan_with_preloaded_summary() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let output_dir = temp_dir.path().join("out");
    let output_str = output_dir.to_string_lossy().into_owned();

    let server = MockServer::start();

    let style_mock = mock_chat(
        &server,
        "places to visit in Kyoto",
        r#"{"places": "Nishiki Market\nPontocho", "locations": ["Nakagyo", "Nakagyo"]}"#,
    );
    let mandatory_mock = mock_chat(
        &server,
        "visiting 'Fushimi Inari'",
        r#"{"cost": 0, "review_score": 9.5}"#,
    );
    let nishiki_mock = mock_chat(
        &server,
        "visiting 'Nishiki Market'",
        r#"{"cost": "about $30 per person", "review_score": 9}"#,
    );
    let pontocho_mock = mock_chat(
        &server,
        "visiting 'Pontocho'",
        r#"{"cost": 80, "review_score": 8}"#,
    );
    let itinerary_json = json!({
        "trip_overview": "Two easy days in Kyoto",
        "itinerary": [{
            "day_index": 1,
            "date": "2026-04-01",
            "start_time": "08:00",
            "activity_title": "Shrine gates at dawn",
            "location_name": "Fushimi Inari",
            "transport_mode": "train",
            "duration_minutes": 120,
            "cost_estimate": 0,
            "cultural_tips": ["Walk on the side of the path"]
        }]
    });
    let itinerary_mock = mock_chat(
        &server,
        "Trip cities:",
        &format!(
            "```json\n{}\n```\n\n# Kyoto\nDay 1: Fushimi Inari",
            serde_json::to_string_pretty(&itinerary_json)?
        ),
    );

    let trip = TripConfig::from_toml_str(&trip_toml(&output_str))?;
    trip.validate()?;

    let client = OpenAiClient::new(server.base_url(), "sk-test")?;
    let media = FfmpegMedia::new()?;
    let storage = LocalStorage::new(trip.output_dir());

    let summary = ReelSummary {
        summary: "Shrines and street food".to_string(),
        keywords: vec!["shrine".to_string()],
        locations: vec![LocationMention {
            name: "Fushimi Inari".to_string(),
            rating: Some("5/5".to_string()),
        }],
    };

    let planner = TripPlanner::new(&client, &client, &media, &storage, &trip, "gpt-4.1");
    let outcome = planner.run(SummarySource::Preloaded(summary)).await?;

    style_mock.assert();
    mandatory_mock.assert();
    nishiki_mock.assert();
    pontocho_mock.assert();
    itinerary_mock.assert();

    // 必去景點保留，Pontocho 超出預算
    assert_eq!(
        outcome.budget.place_names(),
        vec!["Fushimi Inari".to_string(), "Nishiki Market".to_string()]
    );
    assert_eq!(outcome.budget.total_estimated_cost, 30.0);
    assert_eq!(outcome.budget.total_budget, 100.0);

    let plan = outcome.itinerary.plan.expect("itinerary JSON should be extracted");
    assert_eq!(plan.itinerary.len(), 1);
    assert_eq!(plan.itinerary[0].transport_mode, TransportMode::Train);
    assert!(outcome.itinerary.raw_text.contains("Day 1"));

    // 輸出檔案
    let budget_file: Value =
        serde_json::from_str(&std::fs::read_to_string(output_dir.join("budget_output.json"))?)?;
    assert!(budget_file.get("final_places").is_some());
    assert!(budget_file.get("total_estimated_cost").is_some());
    assert!(budget_file.get("total_budget").is_some());

    let style_file: Value =
        serde_json::from_str(&std::fs::read_to_string(output_dir.join("style_output.json"))?)?;
    assert_eq!(style_file["neg_places"], json!(["Nishiki Market", "Pontocho"]));

    assert!(output_dir.join("itinerary.json").exists());
    assert!(output_dir.join("itinerary.md").exists());
    assert!(!output_dir.join("reel_summary.json").exists());
    assert_eq!(outcome.written_files.len(), 4);

    Ok(())
}

#[tokio::test]
async fn test_budget_skips_places_whose_details_fail() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let server = MockServer::start();

    let ok_mock = mock_chat(
        &server,
        "visiting 'Louvre'",
        r#"{"cost": 22, "review_score": 9}"#,
    );
    let failing_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/chat/completions")
            .body_contains("visiting 'Catacombs'");
        then.status(500).body("upstream exploded");
    });
    let garbled_mock = mock_chat(&server, "visiting 'Seine Cruise'", "not json at all");

    let client = OpenAiClient::new(server.base_url(), "sk-test")?;
    let storage = LocalStorage::new(temp_dir.path());
    let agent = BudgetAgent::new(&client, &storage, "gpt-4.1");

    let optional = vec!["Catacombs".to_string(), "Seine Cruise".to_string()];
    let (report, path) = agent
        .run_and_save(&["Louvre".to_string()], &optional, "$50")
        .await?;

    ok_mock.assert();
    failing_mock.assert();
    garbled_mock.assert();

    assert_eq!(report.place_names(), vec!["Louvre".to_string()]);
    assert_eq!(report.total_estimated_cost, 22.0);
    assert_eq!(report.total_budget, 50.0);
    assert!(path.ends_with("budget_output.json"));
    assert!(temp_dir.path().join("budget_output.json").exists());

    Ok(())
}

#[tokio::test]
async fn test_style_agent_reports_filtered_and_http_errors() -> Result<()> {
    let server = MockServer::start();

    let filtered = server.mock(|when, then| {
        when.method(POST)
            .path("/chat/completions")
            .body_contains("places to visit in Berlin");
        then.status(200).json_body(json!({
            "choices": [{
                "message": { "role": "assistant", "content": null },
                "finish_reason": "content_filter"
            }]
        }));
    });
    let unauthorized = server.mock(|when, then| {
        when.method(POST)
            .path("/chat/completions")
            .body_contains("places to visit in Vienna");
        then.status(401).body(r#"{"error": "invalid api key"}"#);
    });

    let client = OpenAiClient::new(server.base_url(), "sk-test")?;
    let agent = StyleAgent::new(&client, "gpt-4.1");

    let err = agent.recommend("Berlin", "techno").await.unwrap_err();
    assert!(err.to_string().to_lowercase().contains("filter"));
    filtered.assert();

    let err = agent.recommend("Vienna", "coffee").await.unwrap_err();
    assert!(matches!(err, TripError::ApiResponseError { status: 401, .. }));
    unauthorized.assert();

    Ok(())
}

#[test]
fn test_trip_file_resolves_reels_relative_to_itself() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let trip_path = temp_dir.path().join("trip.toml");
    let content = format!(
        "{}\n[reels]\nfiles = [\"clips/market.mp4\", \"clips/shrine.MOV\"]\nbatch_size = 2\n",
        trip_toml("./output")
    );
    std::fs::write(&trip_path, content)?;

    let trip = TripConfig::from_file(&trip_path)?;
    trip.validate()?;

    let reels = trip.reel_paths();
    assert_eq!(reels.len(), 2);
    assert!(reels[0].starts_with(temp_dir.path()));
    assert!(reels[1].ends_with("clips/shrine.MOV"));
    assert_eq!(trip.reel_settings().batch_size, 2);

    // 不支援的影片格式
    let bad = format!(
        "{}\n[reels]\nfiles = [\"clips/notes.txt\"]\n",
        trip_toml("./output")
    );
    let trip = TripConfig::from_toml_str(&bad)?;
    assert!(trip.validate().is_err());

    Ok(())
}
