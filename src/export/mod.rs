//! One-shot data export for external AI tooling.
//!
//! Serializes profile (no secrets), preferences, upcoming trip summaries,
//! document metadata (never raw file bytes), and the checklist into a single
//! JSON document the user copies elsewhere manually.

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::model::{AppData, TripStatus, UserProfile};

pub fn ai_studio_export(
    profile: &UserProfile,
    data: &AppData,
    generated_at: DateTime<Utc>,
) -> String {
    let travelers: Vec<_> = data
        .travelers
        .iter()
        .map(|t| json!({ "name": t.name, "nationality": t.nationality }))
        .collect();

    let upcoming: Vec<_> = data
        .trips
        .iter()
        .filter(|t| t.status == TripStatus::Upcoming)
        .map(|t| {
            json!({
                "destination": t.destination,
                "dates": format!("{} to {}", t.start_date, t.end_date),
                "itinerarySummary": t
                    .itinerary
                    .iter()
                    .map(|d| format!("{}: {} ({} items)", d.date, d.location, d.items.len()))
                    .collect::<Vec<_>>(),
                "currency": t.currency,
            })
        })
        .collect();

    let documents: Vec<_> = data
        .documents
        .iter()
        .map(|d| {
            json!({
                "type": d.doc_type,
                "name": d.name,
                "status": d.status,
                "expiry": d.expiry,
                "scope": if d.trip_id.is_some() { "trip" } else { "global" },
            })
        })
        .collect();

    let export = json!({
        "meta": {
            "generatedAt": generated_at.to_rfc3339(),
            "app": "GAIDE AI Travel OS",
            "description": "User Context for AI Studio",
        },
        "userProfile": {
            "name": profile.name,
            "tier": profile.subscription_tier,
            "travelers": travelers,
        },
        "preferences": data.preferences,
        "activeContext": { "upcomingTrips": upcoming },
        "documents": documents,
        "checklist": data.checklist,
    });

    serde_json::to_string_pretty(&export).unwrap_or_else(|_| "{}".to_string())
}
