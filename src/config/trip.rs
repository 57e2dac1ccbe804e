use crate::core::budget::parse_budget;
use crate::core::budget::DEFAULT_BUDGET_MODEL;
use crate::core::itinerary::DEFAULT_ITINERARY_MODEL;
use crate::core::reels::{
    ReelSettings, DEFAULT_BATCH_SIZE, DEFAULT_SUMMARY_MODEL, DEFAULT_TRANSCRIPTION_MODEL,
};
use crate::core::restaurants::DEFAULT_RESTAURANT_MODEL;
use crate::domain::model::TripLeg;
use crate::utils::error::{Result, TripError};
use crate::utils::validation::{
    validate_file_extensions, validate_non_empty_string, validate_one_of, validate_path,
    validate_positive_number, validate_range, validate_url, Validate,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub const TRANSPORT_OPTIONS: [&str; 7] = ["train", "bus", "flight", "car", "bike", "walk", "ferry"];
pub const REEL_EXTENSIONS: [&str; 3] = ["mp4", "mov", "avi"];
pub const MAX_LEGS: usize = 20;
pub const MAX_TRAVELERS: u32 = 20;

const DEFAULT_PREFERENCES: &str =
    "Slow-paced, food + museums, sustainable travel, public transport preferred";

fn default_preferences() -> String {
    DEFAULT_PREFERENCES.to_string()
}

fn default_transport() -> Vec<String> {
    vec!["train".to_string(), "walk".to_string(), "bus".to_string()]
}

fn default_travelers() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripConfig {
    pub trip: TripSection,
    pub legs: Vec<TripLeg>,
    #[serde(default)]
    pub reels: ReelsSection,
    #[serde(default)]
    pub output: OutputSection,
    #[serde(default)]
    pub models: ModelsSection,
    #[serde(default)]
    pub llm: LlmSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripSection {
    pub budget: String,
    #[serde(default = "default_travelers")]
    pub travelers: u32,
    #[serde(default = "default_preferences")]
    pub preferences: String,
    #[serde(default = "default_transport")]
    pub transport: Vec<String>,
    pub dietary_restrictions: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReelsSection {
    #[serde(default)]
    pub files: Vec<String>,
    pub batch_size: Option<usize>,
    pub frame_interval_secs: Option<u32>,
    pub grid_width: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSection {
    pub dir: String,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            dir: "./output".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelsSection {
    pub summary: Option<String>,
    pub transcription: Option<String>,
    pub style: Option<String>,
    pub budget: Option<String>,
    pub itinerary: Option<String>,
    pub restaurants: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmSection {
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl TripConfig {
    /// 從 TOML 檔案載入行程
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        let mut config = Self::from_toml_str(&content)?;

        // 影片路徑相對於行程檔所在目錄
        if let Some(base) = path.as_ref().parent() {
            config.reels.files = config
                .reels
                .files
                .iter()
                .map(|f| {
                    let p = Path::new(f);
                    if p.is_absolute() || base.as_os_str().is_empty() {
                        f.clone()
                    } else {
                        base.join(p).to_string_lossy().into_owned()
                    }
                })
                .collect();
        }

        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| TripError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    pub fn cities(&self) -> Vec<String> {
        self.legs.iter().map(|leg| leg.city.clone()).collect()
    }

    pub fn reel_paths(&self) -> Vec<PathBuf> {
        self.reels.files.iter().map(PathBuf::from).collect()
    }

    pub fn output_dir(&self) -> &str {
        &self.output.dir
    }

    pub fn total_budget(&self) -> Result<f64> {
        parse_budget(&self.trip.budget)
    }

    pub fn reel_settings(&self) -> ReelSettings {
        let defaults = ReelSettings::default();
        ReelSettings {
            batch_size: self.reels.batch_size.unwrap_or(DEFAULT_BATCH_SIZE),
            frame_interval_secs: self
                .reels
                .frame_interval_secs
                .unwrap_or(defaults.frame_interval_secs),
            grid_width: self.reels.grid_width.unwrap_or(defaults.grid_width),
            summary_model: self
                .models
                .summary
                .clone()
                .unwrap_or_else(|| DEFAULT_SUMMARY_MODEL.to_string()),
            transcription_model: self
                .models
                .transcription
                .clone()
                .unwrap_or_else(|| DEFAULT_TRANSCRIPTION_MODEL.to_string()),
        }
    }

    /// 風格模型：行程檔優先，其次 secrets 設定
    pub fn style_model(&self, fallback: &str) -> String {
        self.models
            .style
            .clone()
            .unwrap_or_else(|| fallback.to_string())
    }

    pub fn budget_model(&self) -> String {
        self.models
            .budget
            .clone()
            .unwrap_or_else(|| DEFAULT_BUDGET_MODEL.to_string())
    }

    pub fn itinerary_model(&self) -> String {
        self.models
            .itinerary
            .clone()
            .unwrap_or_else(|| DEFAULT_ITINERARY_MODEL.to_string())
    }

    pub fn restaurant_model(&self) -> String {
        self.models
            .restaurants
            .clone()
            .unwrap_or_else(|| DEFAULT_RESTAURANT_MODEL.to_string())
    }

    fn validate_legs(&self) -> Result<()> {
        if self.legs.is_empty() {
            return Err(TripError::MissingConfigError {
                field: "legs (please enter at least one city)".to_string(),
            });
        }
        if self.legs.len() > MAX_LEGS {
            return Err(TripError::InvalidConfigValueError {
                field: "legs".to_string(),
                value: self.legs.len().to_string(),
                reason: format!("At most {} cities are supported", MAX_LEGS),
            });
        }

        let mut seen = HashSet::new();
        for leg in &self.legs {
            validate_non_empty_string("legs.city", &leg.city)?;
            if !seen.insert(leg.city.trim().to_lowercase()) {
                return Err(TripError::InvalidConfigValueError {
                    field: "legs.city".to_string(),
                    value: leg.city.clone(),
                    reason: "City listed more than once".to_string(),
                });
            }
            if leg.end < leg.start {
                return Err(TripError::InvalidConfigValueError {
                    field: "legs.end".to_string(),
                    value: leg.end.to_string(),
                    reason: format!("End date is before start date {} for {}", leg.start, leg.city),
                });
            }
        }
        Ok(())
    }
}

impl Validate for TripConfig {
    fn validate(&self) -> Result<()> {
        self.validate_legs()?;

        let budget = self.total_budget().map_err(|_| TripError::InvalidConfigValueError {
            field: "trip.budget".to_string(),
            value: self.trip.budget.clone(),
            reason: "Budget must contain a number, e.g. \"$1500\"".to_string(),
        })?;
        if budget < 0.0 {
            return Err(TripError::InvalidConfigValueError {
                field: "trip.budget".to_string(),
                value: self.trip.budget.clone(),
                reason: "Budget cannot be negative".to_string(),
            });
        }

        validate_range("trip.travelers", self.trip.travelers, 1, MAX_TRAVELERS)?;
        validate_one_of("trip.transport", &self.trip.transport, &TRANSPORT_OPTIONS)?;

        validate_file_extensions("reels.files", &self.reels.files, &REEL_EXTENSIONS)?;
        if let Some(batch_size) = self.reels.batch_size {
            validate_positive_number("reels.batch_size", batch_size, 1)?;
        }
        if let Some(interval) = self.reels.frame_interval_secs {
            validate_positive_number("reels.frame_interval_secs", interval as usize, 1)?;
        }
        if let Some(grid_width) = self.reels.grid_width {
            validate_positive_number("reels.grid_width", grid_width as usize, 1)?;
        }

        validate_path("output.dir", &self.output.dir)?;

        if let Some(base_url) = &self.llm.base_url {
            validate_url("llm.base_url", base_url)?;
        }

        Ok(())
    }
}

/// 替換環境變數 (例如 ${TRIP_BUDGET})，找不到的保持原樣
pub fn substitute_env_vars(content: &str) -> String {
    use regex::Regex;
    use std::sync::OnceLock;

    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("valid env var regex"));

    re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
    })
    .into_owned()
}

pub const TRIP_TEMPLATE: &str = r#"# reel-trip trip file

[trip]
budget = "$1500"
travelers = 1
preferences = "Slow-paced, food + museums, sustainable travel, public transport preferred"
# train, bus, flight, car, bike, walk, ferry
transport = ["train", "walk", "bus"]
# dietary_restrictions = "vegan, gluten-free"

[[legs]]
city = "Lisbon"
start = "2026-05-01"
end = "2026-05-04"

[[legs]]
city = "Porto"
start = "2026-05-04"
end = "2026-05-07"

[reels]
# mp4, mov or avi; relative to this file
files = []
batch_size = 3
frame_interval_secs = 2
grid_width = 3

[output]
dir = "./output"

# [models]
# summary = "gpt-4o-mini"
# transcription = "gpt-4o-mini-transcribe"
# style = "gpt-5"
# budget = "gpt-5"
# itinerary = "gpt-4o-mini"
# restaurants = "gpt-4.1"

# [llm]
# base_url = "https://api.openai.com/v1"
# timeout_secs = 120
"#;
