use crate::domain::model::{BudgetReport, ItineraryItem, TripPlan};
use std::fmt::Write;

const RULE: &str = "────────────────────────────────────────";

fn opt(value: &Option<String>) -> &str {
    value.as_deref().filter(|v| !v.is_empty()).unwrap_or("?")
}

fn render_item(out: &mut String, item: &ItineraryItem) {
    let _ = writeln!(out, "### Day {}: {}", item.day_index, item.activity_title);
    if let Some(date) = item.date.as_deref().filter(|d| !d.is_empty()) {
        let _ = writeln!(out, "📅 Date: {}", date);
    }
    let _ = writeln!(out, "📍 Location: {}", item.location_name);
    let _ = writeln!(
        out,
        "🕒 Time: {} → {}",
        opt(&item.start_time),
        opt(&item.end_time)
    );
    let _ = writeln!(out, "⏱ Duration: {} min", item.duration_minutes);
    let _ = writeln!(out, "🚍 Transport: {}", item.transport_mode);
    if !item.transport_details.is_empty() {
        let _ = writeln!(out, "ℹ️ {}", item.transport_details);
    }
    let _ = writeln!(out, "💰 Cost: {}", item.cost_estimate);

    if !item.cultural_tips.is_empty() {
        let _ = writeln!(out, "💡 Cultural Tips:");
        for tip in &item.cultural_tips {
            let _ = writeln!(out, "- {}", tip);
        }
    }
    if !item.notes.is_empty() {
        let _ = writeln!(out, "📝 Notes: {}", item.notes);
    }
    let _ = writeln!(out, "{}", RULE);
}

/// Overview followed by one card per itinerary item.
pub fn render_itinerary(plan: &TripPlan) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "🌍 Trip Overview");
    let _ = writeln!(out, "{}\n", plan.trip_overview);
    let _ = writeln!(out, "🗓 Itinerary");
    let _ = writeln!(out, "{}", RULE);

    if plan.itinerary.is_empty() {
        let _ = writeln!(out, "(no itinerary items)");
    }
    for item in &plan.itinerary {
        render_item(&mut out, item);
    }
    out
}

pub fn render_budget(report: &BudgetReport) -> String {
    let mut out = String::new();
    let width = report
        .final_places
        .iter()
        .map(|p| p.place.chars().count())
        .max()
        .unwrap_or(5)
        .max(5);

    let _ = writeln!(
        out,
        "{:<width$}  {:>9}  {:>6}  {:>6}",
        "Place",
        "Cost",
        "Review",
        "Score",
        width = width
    );
    for place in &report.final_places {
        let score = place
            .score
            .map(|s| format!("{:.3}", s))
            .unwrap_or_else(|| "must".to_string());
        let _ = writeln!(
            out,
            "{:<width$}  {:>9.2}  {:>6.1}  {:>6}",
            place.place,
            place.cost,
            place.review_score,
            score,
            width = width
        );
    }
    let _ = writeln!(
        out,
        "Total: ${:.2} of ${:.2}",
        report.total_estimated_cost, report.total_budget
    );
    out
}
