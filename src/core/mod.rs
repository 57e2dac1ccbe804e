pub mod budget;
pub mod itinerary;
pub mod json_extract;
pub mod planner;
pub mod reels;
pub mod render;
pub mod restaurants;
pub mod style;

pub use crate::domain::model::{BudgetReport, PlaceDetails, TripLeg, TripPlan};
pub use crate::domain::ports::{ChatModel, MediaProcessor, Storage, Transcriber};
pub use crate::utils::error::Result;
