use crate::config::trip::TripConfig;
use crate::core::budget::BudgetAgent;
use crate::core::itinerary::{GeneratedItinerary, ItineraryGenerator, ItineraryRequest};
use crate::core::reels::{merge_summaries, ReelProcessor};
use crate::core::restaurants::RestaurantAgent;
use crate::core::style::StyleAgent;
use crate::domain::model::{BudgetReport, ReelSummary, StyleRecommendations};
use crate::domain::ports::{ChatModel, MediaProcessor, Storage, Transcriber};
use crate::utils::error::{Result, TripError};
use crate::utils::monitor::StageMonitor;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const REEL_SUMMARY_FILE: &str = "reel_summary.json";
pub const STYLE_OUTPUT_FILE: &str = "style_output.json";
pub const ITINERARY_JSON_FILE: &str = "itinerary.json";
pub const ITINERARY_MARKDOWN_FILE: &str = "itinerary.md";

/// `reel_summary.json`; `non_neg_places` is what the budget command reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReelsOutput {
    #[serde(flatten)]
    pub summary: ReelSummary,
    #[serde(default)]
    pub non_neg_places: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub raw_batches: Vec<String>,
}

/// `style_output.json`; `neg_places` is what the budget command reads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StyleOutput {
    pub neg_places: Vec<String>,
    #[serde(default)]
    pub by_city: BTreeMap<String, StyleRecommendations>,
    #[serde(default)]
    pub restaurants: BTreeMap<String, Vec<String>>,
}

/// Where the mandatory places come from.
#[derive(Debug, Clone)]
pub enum SummarySource {
    Reels,
    Preloaded(ReelSummary),
    Skip,
}

#[derive(Debug, Clone)]
pub struct PlanOutcome {
    pub summary: ReelSummary,
    pub style: StyleOutput,
    pub budget: BudgetReport,
    pub itinerary: GeneratedItinerary,
    pub written_files: Vec<String>,
}

pub struct TripPlanner<'a, C, T, M, S>
where
    C: ChatModel,
    T: Transcriber,
    M: MediaProcessor,
    S: Storage,
{
    chat: &'a C,
    transcriber: &'a T,
    media: &'a M,
    storage: &'a S,
    config: &'a TripConfig,
    style_model: String,
    monitor: StageMonitor,
}

impl<'a, C, T, M, S> TripPlanner<'a, C, T, M, S>
where
    C: ChatModel,
    T: Transcriber,
    M: MediaProcessor,
    S: Storage,
{
    pub fn new(
        chat: &'a C,
        transcriber: &'a T,
        media: &'a M,
        storage: &'a S,
        config: &'a TripConfig,
        style_model: impl Into<String>,
    ) -> Self {
        Self {
            chat,
            transcriber,
            media,
            storage,
            config,
            style_model: style_model.into(),
            monitor: StageMonitor::new(false),
        }
    }

    pub fn with_monitoring(mut self, enabled: bool) -> Self {
        self.monitor = StageMonitor::new(enabled);
        self
    }

    async fn write_json<V: Serialize>(&self, name: &str, value: &V) -> Result<String> {
        let json = serde_json::to_string_pretty(value)?;
        self.storage.write_file(name, json.as_bytes()).await
    }

    /// 處理影片並寫出 reel_summary.json
    pub async fn summarize_reels(&self) -> Result<(ReelSummary, String)> {
        let videos = self.config.reel_paths();
        let mut raw_batches = Vec::new();

        if videos.is_empty() {
            tracing::warn!("No reels listed in the trip file; continuing without mandatory places");
        } else {
            let processor = ReelProcessor::new(
                self.chat,
                self.transcriber,
                self.media,
                self.config.reel_settings(),
            );
            raw_batches = processor.process_all(&videos).await?;
        }

        let summary = merge_summaries(&raw_batches);
        tracing::info!(
            "Found {} locations in {} reels",
            summary.locations.len(),
            videos.len()
        );

        let output = ReelsOutput {
            non_neg_places: summary.location_names(),
            summary: summary.clone(),
            raw_batches,
        };
        let path = self.write_json(REEL_SUMMARY_FILE, &output).await?;
        Ok((summary, path))
    }

    /// Style places for every city, then diet-friendly restaurants when
    /// the trip asks for them. A city whose call fails is skipped.
    pub async fn collect_candidates(&self) -> StyleOutput {
        let mut output = StyleOutput::default();
        let style_agent = StyleAgent::new(self.chat, &self.style_model);

        for city in self.config.cities() {
            match style_agent.recommend(&city, &self.config.trip.preferences).await {
                Ok(recs) => {
                    let names = recs.place_names();
                    tracing::info!("{} style places for {}", names.len(), city);
                    output.neg_places.extend(names);
                    output.by_city.insert(city, recs);
                }
                Err(e) => {
                    tracing::warn!("Failed to get recommendations for {}: {}", city, e);
                }
            }
        }

        if let Some(diet) = self
            .config
            .trip
            .dietary_restrictions
            .as_deref()
            .filter(|d| !d.trim().is_empty())
        {
            let restaurant_agent = RestaurantAgent::new(self.chat, self.config.restaurant_model());
            for city in self.config.cities() {
                match restaurant_agent.suggest(diet, &city).await {
                    Ok(names) => {
                        output.neg_places.extend(names.iter().cloned());
                        output.restaurants.insert(city, names);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to get restaurants for {}: {}", city, e);
                    }
                }
            }
        }

        output
    }

    /// 結束階段監控；失敗時也記錄耗時
    fn finish_stage<V>(&self, stage: &str, result: Result<V>) -> Result<V> {
        match &result {
            Ok(_) => self.monitor.end_stage(stage),
            Err(e) => self.monitor.fail_stage(stage, e),
        }
        result
    }

    /// `itinerary.json` holds the typed plan, or the extracted JSON as-is
    /// when it does not fit the plan shape.
    async fn write_itinerary(&self, itinerary: &GeneratedItinerary) -> Result<Vec<String>> {
        let mut written = vec![
            self.storage
                .write_file(ITINERARY_MARKDOWN_FILE, itinerary.raw_text.as_bytes())
                .await?,
        ];
        match (&itinerary.plan, &itinerary.json) {
            (Some(plan), _) => written.push(self.write_json(ITINERARY_JSON_FILE, plan).await?),
            (None, Some(json)) => written.push(self.write_json(ITINERARY_JSON_FILE, json).await?),
            (None, None) => {}
        }
        Ok(written)
    }

    pub async fn run(&self, source: SummarySource) -> Result<PlanOutcome> {
        tracing::info!("🚀 Planning trip to {}", self.config.cities().join(" → "));
        let mut written_files = Vec::new();

        // Reels
        self.monitor.begin_stage("reels");
        let reels = match source {
            SummarySource::Reels => self.summarize_reels().await.map(|(summary, path)| {
                written_files.push(path);
                summary
            }),
            SummarySource::Preloaded(summary) => Ok(summary),
            SummarySource::Skip => Ok(ReelSummary::default()),
        };
        let summary = self.finish_stage("reels", reels)?;

        // Style + restaurants
        self.monitor.begin_stage("style");
        let style = self.collect_candidates().await;
        let style_path = self.write_json(STYLE_OUTPUT_FILE, &style).await;
        written_files.push(self.finish_stage("style", style_path)?);

        // Budget
        self.monitor.begin_stage("budget");
        let budget_agent = BudgetAgent::new(self.chat, self.storage, self.config.budget_model());
        let selection = budget_agent
            .run_and_save(
                &summary.location_names(),
                &style.neg_places,
                &self.config.trip.budget,
            )
            .await;
        let (budget, budget_path) = self.finish_stage("budget", selection)?;
        written_files.push(budget_path);

        // Itinerary
        self.monitor.begin_stage("itinerary");
        let locations = budget.place_names();
        let generator = ItineraryGenerator::new(self.chat, self.config.itinerary_model());
        let generated = async {
            let itinerary = generator
                .generate(&ItineraryRequest {
                    legs: &self.config.legs,
                    locations: &locations,
                    preferences: &self.config.trip.preferences,
                    transport: &self.config.trip.transport,
                    travelers: self.config.trip.travelers,
                    budget: Some(&budget),
                })
                .await?;
            let paths = self.write_itinerary(&itinerary).await?;
            Ok::<_, TripError>((itinerary, paths))
        }
        .await;
        let (itinerary, paths) = self.finish_stage("itinerary", generated)?;
        written_files.extend(paths);
        self.monitor.log_final_stats();

        Ok(PlanOutcome {
            summary,
            style,
            budget,
            itinerary,
            written_files,
        })
    }
}
