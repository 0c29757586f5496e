//! Trip and itinerary mutation rules.

pub mod wizard;

pub use wizard::{TripForm, TripWizard, WizardStep};

use chrono::NaiveDate;
use uuid::Uuid;

use crate::derive::iso_date;
use crate::error::AppError;
use crate::gateway::TripProposal;
use crate::model::{
    AppData, DayPlan, ItemCategory, ItineraryItem, Trip, TripStatus, WeatherInfo,
    DEFAULT_COVER_IMAGE,
};

/// Input for the add-activity form. Presence checks only.
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub time: String,
    pub activity: String,
    pub location: String,
    pub category: ItemCategory,
    pub notes: Option<String>,
}

/// Add an activity to the trip.
///
/// The item always lands in the *first* day plan (not the day in view) and
/// that day is re-sorted ascending by time string. No dedup, no overlap
/// detection.
pub fn add_activity(trip: &mut Trip, activity: NewActivity) -> Result<(), AppError> {
    if activity.activity.trim().is_empty()
        || activity.time.trim().is_empty()
        || activity.location.trim().is_empty()
    {
        return Err(AppError::ValidationError(
            "activity name, time, and location are required".into(),
        ));
    }

    let Some(first_day) = trip.itinerary.first_mut() else {
        return Ok(());
    };
    first_day.items.push(ItineraryItem {
        id: Uuid::new_v4().to_string(),
        time: activity.time,
        activity: activity.activity,
        location: activity.location,
        category: activity.category,
        notes: activity.notes,
        lat: None,
        lng: None,
    });
    first_day.items.sort_by(|a, b| a.time.cmp(&b.time));
    Ok(())
}

fn placeholder_weather() -> WeatherInfo {
    WeatherInfo {
        temp_max: "20°C".into(),
        temp_min: "15°C".into(),
        condition: "Sunny".into(),
        precip_chance: "0%".into(),
        uv_index: "High".into(),
    }
}

/// Build a blank itinerary: day indices 1-based and contiguous, dates
/// strictly one calendar day apart.
pub fn empty_itinerary(destination: &str, start: NaiveDate, duration: u32) -> Vec<DayPlan> {
    (0..duration.max(1))
        .map(|i| DayPlan {
            day: i + 1,
            date: iso_date(start + chrono::Duration::days(i as i64)),
            location: destination.to_string(),
            language: "English".to_string(),
            items: Vec::new(),
            outfit: Some("Casual".to_string()),
            weather: Some(placeholder_weather()),
            active_alerts: Some(Vec::new()),
        })
        .collect()
}

/// Assemble a Trip from a generated proposal. Start and end dates come from
/// the first and last day; the itinerary is never empty once a trip exists.
pub fn build_trip(proposal: TripProposal) -> Result<Trip, AppError> {
    let first = proposal
        .itinerary
        .first()
        .ok_or_else(|| AppError::ValidationError("proposal has no days".into()))?;
    let last = proposal
        .itinerary
        .last()
        .ok_or_else(|| AppError::ValidationError("proposal has no days".into()))?;

    Ok(Trip {
        id: format!("trip_{}", Uuid::new_v4()),
        name: format!("New Trip to {}", first.location),
        destination: first.location.clone(),
        start_date: first.date.clone(),
        end_date: last.date.clone(),
        status: TripStatus::Upcoming,
        image: DEFAULT_COVER_IMAGE.to_string(),
        currency: Some(proposal.currency),
        itinerary: proposal.itinerary,
    })
}

/// Install a freshly created trip: prepend it and reset the chat context.
/// Returns the new trip's id, which becomes the active trip.
pub fn install_trip(data: &mut AppData, trip: Trip) -> String {
    let id = trip.id.clone();
    data.trips.insert(0, trip);
    data.chat_history.clear();
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trip_with_days(times: &[&str]) -> Trip {
        let mut itinerary = empty_itinerary("Amsterdam", NaiveDate::from_ymd_opt(2025, 4, 10).unwrap(), 2);
        itinerary[0].items = times
            .iter()
            .enumerate()
            .map(|(i, t)| ItineraryItem {
                id: format!("i{i}"),
                time: (*t).to_string(),
                activity: format!("activity {i}"),
                location: "somewhere".into(),
                category: ItemCategory::Activity,
                notes: None,
                lat: None,
                lng: None,
            })
            .collect();
        Trip {
            id: "trip-1".into(),
            name: "Test".into(),
            destination: "Amsterdam".into(),
            start_date: "2025-04-10".into(),
            end_date: "2025-04-11".into(),
            status: TripStatus::Upcoming,
            image: String::new(),
            currency: None,
            itinerary,
        }
    }

    fn activity(time: &str) -> NewActivity {
        NewActivity {
            time: time.into(),
            activity: "Museum".into(),
            location: "Museumplein".into(),
            category: ItemCategory::Activity,
            notes: None,
        }
    }

    #[test]
    fn test_add_activity_targets_first_day_and_sorts() {
        let mut trip = trip_with_days(&["09:00", "19:00"]);
        add_activity(&mut trip, activity("13:00")).unwrap();

        let times: Vec<&str> = trip.itinerary[0]
            .items
            .iter()
            .map(|i| i.time.as_str())
            .collect();
        assert_eq!(times, vec!["09:00", "13:00", "19:00"]);
        // Day two untouched.
        assert!(trip.itinerary[1].items.is_empty());
    }

    #[test]
    fn test_add_activity_sort_is_non_decreasing_after_any_insert() {
        let mut trip = trip_with_days(&["12:00"]);
        for t in ["23:59", "00:10", "12:00", "07:45"] {
            add_activity(&mut trip, activity(t)).unwrap();
            let items = &trip.itinerary[0].items;
            assert!(items.windows(2).all(|w| w[0].time <= w[1].time));
        }
    }

    #[test]
    fn test_add_activity_requires_fields() {
        let mut trip = trip_with_days(&[]);
        let mut missing = activity("10:00");
        missing.activity = "  ".into();
        assert!(matches!(
            add_activity(&mut trip, missing),
            Err(AppError::ValidationError(_))
        ));

        let mut missing = activity("10:00");
        missing.location = String::new();
        assert!(add_activity(&mut trip, missing).is_err());
    }

    #[test]
    fn test_empty_itinerary_shape() {
        let start = NaiveDate::from_ymd_opt(2025, 4, 10).unwrap();
        let days = empty_itinerary("Kyoto, Japan", start, 3);
        assert_eq!(days.len(), 3);
        let indices: Vec<u32> = days.iter().map(|d| d.day).collect();
        assert_eq!(indices, vec![1, 2, 3]);
        let dates: Vec<&str> = days.iter().map(|d| d.date.as_str()).collect();
        assert_eq!(dates, vec!["2025-04-10", "2025-04-11", "2025-04-12"]);
    }

    #[test]
    fn test_build_trip_from_proposal() {
        let start = NaiveDate::from_ymd_opt(2025, 4, 10).unwrap();
        let proposal = TripProposal {
            currency: "JPY".into(),
            itinerary: empty_itinerary("Kyoto, Japan", start, 3),
        };
        let trip = build_trip(proposal).unwrap();
        assert_eq!(trip.name, "New Trip to Kyoto, Japan");
        assert_eq!(trip.start_date, "2025-04-10");
        assert_eq!(trip.end_date, "2025-04-12");
        assert_eq!(trip.status, TripStatus::Upcoming);
        assert_eq!(trip.currency.as_deref(), Some("JPY"));
        assert!(!trip.itinerary.is_empty());
    }

    #[test]
    fn test_build_trip_rejects_empty_proposal() {
        let proposal = TripProposal {
            currency: "USD".into(),
            itinerary: vec![],
        };
        assert!(build_trip(proposal).is_err());
    }

    #[test]
    fn test_install_trip_prepends_and_resets_chat() {
        let mut data = AppData::default();
        data.chat_history
            .push(crate::model::ChatMessage::model("old context"));
        data.trips.push(trip_with_days(&[]));

        let start = NaiveDate::from_ymd_opt(2025, 4, 10).unwrap();
        let new_trip = build_trip(TripProposal {
            currency: "EUR".into(),
            itinerary: empty_itinerary("Paris", start, 1),
        })
        .unwrap();

        let id = install_trip(&mut data, new_trip);
        assert_eq!(data.trips[0].id, id);
        assert_eq!(data.trips.len(), 2);
        assert!(data.chat_history.is_empty());
    }
}
