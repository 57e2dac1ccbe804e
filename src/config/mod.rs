pub mod secrets;
pub mod trip;

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "reel-trip")]
#[command(about = "Plan a trip from your saved travel reels")]
pub struct CliConfig {
    #[command(subcommand)]
    pub command: Command,

    /// Directory holding keys.local.toml / keys.toml / keys.example.toml
    #[arg(long, global = true, default_value = "secret")]
    pub secret_dir: PathBuf,

    /// API key (overrides OPENAI_API_KEY and secret files)
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Output directory for single-stage commands
    #[arg(long, global = true, default_value = "./output")]
    pub output: String,

    /// OpenAI-compatible base URL for single-stage commands
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log stage timings and memory usage")]
    pub monitor: bool,

    #[arg(long, global = true, help = "Emit logs as JSON")]
    pub log_json: bool,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run the whole pipeline: reels, style, budget, itinerary
    Plan {
        #[arg(short, long, default_value = "trip.toml")]
        trip: PathBuf,
        /// Skip reel processing (no mandatory places unless --summary is given)
        #[arg(long)]
        skip_reels: bool,
        /// Reuse a previously written reel_summary.json
        #[arg(long)]
        summary: Option<PathBuf>,
    },
    /// Process reels only and write reel_summary.json
    Reels {
        #[arg(short, long, default_value = "trip.toml")]
        trip: PathBuf,
    },
    /// Style-matched place recommendations for one city
    Style {
        #[arg(long)]
        city: String,
        #[arg(long)]
        style: String,
        #[arg(long)]
        model: Option<String>,
    },
    /// Restaurant suggestions for a dietary restriction
    Restaurants {
        #[arg(long)]
        city: String,
        #[arg(long)]
        diet: String,
    },
    /// Budget selection from two JSON files (non_neg_places / neg_places)
    Budget {
        reels_output: PathBuf,
        style_output: PathBuf,
        /// Total budget for the trip (e.g. '$500')
        total_budget: String,
    },
    /// Print an itinerary JSON file as cards
    Render { itinerary: PathBuf },
    /// Write a template trip file
    Init {
        #[arg(long, default_value = "trip.toml")]
        path: PathBuf,
        #[arg(long)]
        force: bool,
    },
}

#[cfg(feature = "cli")]
impl CliConfig {
    pub fn needs_api_key(&self) -> bool {
        !matches!(self.command, Command::Render { .. } | Command::Init { .. })
    }
}
