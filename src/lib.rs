pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{FfmpegMedia, LocalStorage, OpenAiClient};
pub use config::trip::TripConfig;
pub use core::planner::{PlanOutcome, SummarySource, TripPlanner};
pub use utils::error::{Result, TripError};
