use clap::Parser;
use reel_trip::config::secrets::Secrets;
use reel_trip::config::trip::{TripConfig, TRIP_TEMPLATE};
use reel_trip::config::Command;
use reel_trip::core::budget::BudgetAgent;
use reel_trip::core::json_extract::extract_as;
use reel_trip::core::planner::{ReelsOutput, SummarySource, TripPlanner};
use reel_trip::core::render::{render_budget, render_itinerary};
use reel_trip::core::restaurants::{parse_restaurant_names, RestaurantAgent};
use reel_trip::core::style::{StyleAgent, DEFAULT_STYLE_MODEL};
use reel_trip::domain::model::TripPlan;
use reel_trip::utils::error::ErrorSeverity;
use reel_trip::utils::{logger, validation::Validate};
use reel_trip::{CliConfig, FfmpegMedia, LocalStorage, OpenAiClient, Result, TripError};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;

#[tokio::main]
async fn main() {
    let config = CliConfig::parse();

    // 初始化日誌
    if config.log_json {
        logger::init_json_logger(config.verbose);
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting reel-trip CLI");
    if config.verbose {
        tracing::debug!("CLI command: {:?}", config.command);
    }

    if let Err(e) = run(config).await {
        // 記錄詳細錯誤信息
        tracing::error!(
            "❌ reel-trip failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 建議: {}", e.recovery_suggestion());

        // 根據錯誤嚴重程度決定退出碼
        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };

        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }
}

fn build_client(
    config: &CliConfig,
    secrets: &Secrets,
    base_url: Option<&str>,
    timeout_secs: Option<u64>,
) -> Result<OpenAiClient> {
    let base_url = config
        .base_url
        .as_deref()
        .or(base_url)
        .unwrap_or(reel_trip::adapters::openai::DEFAULT_BASE_URL);
    let client = OpenAiClient::with_timeout(
        base_url,
        secrets.api_key.clone(),
        Duration::from_secs(timeout_secs.unwrap_or(120)),
    )?;
    tracing::debug!("Using LLM endpoint {}", client.base_url());
    Ok(client)
}

fn load_trip(path: &Path) -> Result<TripConfig> {
    tracing::info!("📁 Loading trip from: {}", path.display());
    let trip = TripConfig::from_file(path)?;

    // 驗證配置
    trip.validate()?;
    tracing::info!(
        "✅ Trip loaded: {} cities, budget {}, {} reels",
        trip.legs.len(),
        trip.trip.budget,
        trip.reels.files.len()
    );
    Ok(trip)
}

fn read_json(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn string_list(value: &Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// 不需要 API 金鑰的指令
fn run_offline(command: &Command) -> Result<()> {
    match command {
        Command::Init { path, force } => {
            if path.exists() && !force {
                return Err(TripError::config(format!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                )));
            }
            std::fs::write(path, TRIP_TEMPLATE)?;
            println!("✅ Wrote trip template to {}", path.display());
        }

        Command::Render { itinerary } => {
            let content = std::fs::read_to_string(itinerary)?;
            let plan = extract_as::<TripPlan>(&content).ok_or_else(|| {
                TripError::schema(format!("No itinerary JSON found in {}", itinerary.display()))
            })?;
            print!("{}", render_itinerary(&plan));
        }

        other => {
            return Err(TripError::config(format!(
                "{:?} needs an API key and cannot run offline",
                other
            )));
        }
    }
    Ok(())
}

async fn run(config: CliConfig) -> Result<()> {
    if !config.needs_api_key() {
        return run_offline(&config.command);
    }

    let secrets = Secrets::resolve(config.api_key.as_deref(), &config.secret_dir)?;

    match &config.command {
        Command::Init { .. } | Command::Render { .. } => run_offline(&config.command)?,

        Command::Plan {
            trip,
            skip_reels,
            summary,
        } => {
            let trip = load_trip(trip)?;
            let client = build_client(
                &config,
                &secrets,
                trip.llm.base_url.as_deref(),
                trip.llm.timeout_secs,
            )?;
            let media = FfmpegMedia::new()?;
            let storage = LocalStorage::new(trip.output_dir());
            let style_model =
                trip.style_model(secrets.model.as_deref().unwrap_or(DEFAULT_STYLE_MODEL));

            let source = match summary {
                Some(path) => {
                    let output: ReelsOutput = serde_json::from_value(read_json(path)?)?;
                    SummarySource::Preloaded(output.summary)
                }
                None if *skip_reels => SummarySource::Skip,
                None => SummarySource::Reels,
            };

            if config.monitor {
                tracing::info!("🔍 Stage monitoring enabled");
            }

            let planner = TripPlanner::new(&client, &client, &media, &storage, &trip, style_model)
                .with_monitoring(config.monitor);
            let outcome = planner.run(source).await?;

            println!("{}", render_budget(&outcome.budget));
            match (&outcome.itinerary.plan, &outcome.itinerary.json) {
                (Some(plan), _) => print!("{}", render_itinerary(plan)),
                (None, Some(_)) => println!(
                    "⚠️ Itinerary JSON did not match the expected shape; saved as-is to itinerary.json"
                ),
                (None, None) => println!(
                    "⚠️ Could not extract machine-readable JSON from the response; see itinerary.md"
                ),
            }

            tracing::info!("✅ Trip planning completed successfully!");
            println!("✅ Trip planning completed successfully!");
            for file in &outcome.written_files {
                println!("📁 {}", file);
            }
        }

        Command::Reels { trip } => {
            let trip = load_trip(trip)?;
            let client = build_client(
                &config,
                &secrets,
                trip.llm.base_url.as_deref(),
                trip.llm.timeout_secs,
            )?;
            let media = FfmpegMedia::new()?;
            let storage = LocalStorage::new(trip.output_dir());
            let planner =
                TripPlanner::new(&client, &client, &media, &storage, &trip, DEFAULT_STYLE_MODEL);

            let (summary, path) = planner.summarize_reels().await?;
            println!("{}", summary.summary);
            for location in &summary.locations {
                match &location.rating {
                    Some(rating) => println!("- {} ({})", location.name, rating),
                    None => println!("- {}", location.name),
                }
            }
            println!("📁 Output saved to: {}", path);
        }

        Command::Style { city, style, model } => {
            let client = build_client(&config, &secrets, None, None)?;
            let model = model
                .clone()
                .or_else(|| secrets.model.clone())
                .unwrap_or_else(|| DEFAULT_STYLE_MODEL.to_string());
            let agent = StyleAgent::new(&client, model);

            let json = agent.get_recommendations(city, style).await?;
            println!("{}", json);
        }

        Command::Restaurants { city, diet } => {
            let client = build_client(&config, &secrets, None, None)?;
            let agent = RestaurantAgent::new(
                &client,
                reel_trip::core::restaurants::DEFAULT_RESTAURANT_MODEL,
            );

            let text = agent.get_restaurant_suggestions(diet, city).await?;
            for name in parse_restaurant_names(&text) {
                println!("- {}", name);
            }
        }

        Command::Budget {
            reels_output,
            style_output,
            total_budget,
        } => {
            let reels_data = read_json(reels_output)?;
            let style_data = read_json(style_output)?;

            let non_neg_places = string_list(&reels_data, "non_neg_places");
            let neg_places = string_list(&style_data, "neg_places");

            let client = build_client(&config, &secrets, None, None)?;
            let storage = LocalStorage::new(&config.output);
            let agent = BudgetAgent::new(
                &client,
                &storage,
                reel_trip::core::budget::DEFAULT_BUDGET_MODEL,
            );

            let (report, path) = agent
                .run_and_save(&non_neg_places, &neg_places, total_budget)
                .await?;
            print!("{}", render_budget(&report));
            println!("📁 Output saved to: {}", path);
        }
    }

    Ok(())
}
