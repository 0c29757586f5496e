//! Pure derivation functions.
//!
//! Everything here is a function of its arguments and is recomputed on every
//! call. Derived values (document status, counts, display strings) are never
//! cached or persisted authoritatively.

use chrono::{Months, NaiveDate};

use crate::model::{DayPlan, DocumentStatus};

/// Classify a document expiry date (`DD-MM-YYYY`) against `today`.
///
/// Empty or non-10-character input is treated as valid: a document without an
/// expiry never nags. Unparsable day/month/year, month > 12, day > 31, or a
/// calendar date that does not exist classify as missing. Otherwise: past
/// dates are expired, dates within three calendar months are expiring.
pub fn classify_expiry(expiry: &str, today: NaiveDate) -> DocumentStatus {
    if expiry.len() != 10 {
        return DocumentStatus::Valid;
    }
    let parts: Vec<&str> = expiry.split('-').collect();
    if parts.len() != 3 {
        return DocumentStatus::Missing;
    }
    let day: u32 = parts[0].parse().unwrap_or(0);
    let month: u32 = parts[1].parse().unwrap_or(0);
    let year: i32 = parts[2].parse().unwrap_or(0);
    if day == 0 || month == 0 || year == 0 || month > 12 || day > 31 {
        return DocumentStatus::Missing;
    }
    let Some(date) = NaiveDate::from_ymd_opt(year, month, day) else {
        return DocumentStatus::Missing;
    };

    if date < today {
        return DocumentStatus::Expired;
    }
    let horizon = today
        .checked_add_months(Months::new(3))
        .unwrap_or(NaiveDate::MAX);
    if date < horizon {
        return DocumentStatus::Expiring;
    }
    DocumentStatus::Valid
}

/// Flip a stored `YYYY-MM-DD` date into `DD-MM-YYYY` for display. Anything
/// else passes through unchanged.
pub fn display_date(date: &str) -> String {
    let parts: Vec<&str> = date.split('-').collect();
    if parts.len() == 3 && parts[0].len() == 4 {
        return format!("{}-{}-{}", parts[2], parts[1], parts[0]);
    }
    date.to_string()
}

pub fn iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Format a `NaiveDate` in the document-expiry `DD-MM-YYYY` convention.
pub fn expiry_date(date: NaiveDate) -> String {
    date.format("%d-%m-%Y").to_string()
}

// Demo rates relative to USD. A production build would fetch these.
const RATES: &[(&str, f64)] = &[
    ("USD", 1.0),
    ("EUR", 0.92),
    ("JPY", 150.0),
    ("IDR", 15500.0),
    ("GBP", 0.79),
];

fn rate_for(code: &str) -> f64 {
    RATES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, r)| *r)
        .unwrap_or(1.0)
}

/// Human-readable conversion line between the trip's local currency and the
/// user's home currency. High-denomination currencies quote 1000 units so the
/// number stays readable; everything else quotes 10.
pub fn exchange_rate_display(local: &str, home: &str) -> Option<String> {
    if local.is_empty() || home.is_empty() || local == home {
        return None;
    }

    let rate_to_home = rate_for(home) / rate_for(local);
    let base: f64 = if local == "JPY" || local == "IDR" {
        1000.0
    } else {
        10.0
    };
    Some(format!(
        "{} {} -> {:.2} {}",
        base as u32,
        local,
        base * rate_to_home,
        home
    ))
}

/// The language in effect today: the day plan dated today, else the first
/// day, else English.
pub fn language_for_today<'a>(itinerary: &'a [DayPlan], today: NaiveDate) -> &'a str {
    if itinerary.is_empty() {
        return "English";
    }
    let today_str = iso_date(today);
    itinerary
        .iter()
        .find(|d| d.date == today_str)
        .map(|d| d.language.as_str())
        .unwrap_or(itinerary[0].language.as_str())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
}

pub fn time_of_day(hour: u32) -> TimeOfDay {
    if hour < 12 {
        TimeOfDay::Morning
    } else if hour >= 18 {
        TimeOfDay::Evening
    } else {
        TimeOfDay::Afternoon
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Greeting {
    pub text: &'static str,
    /// BCP-47 voice code for speech synthesis.
    pub voice: &'static str,
}

/// Local greeting for a language and hour of day. Unknown languages fall back
/// to English.
pub fn greeting_for(language: &str, hour: u32) -> Greeting {
    const ENGLISH: (&str, &str, &str, &str, &str) =
        ("English", "Good Morning", "Good Afternoon", "Good Evening", "en-US");
    // (language, morning, afternoon, evening, voice)
    const TABLE: &[(&str, &str, &str, &str, &str)] = &[
        ("Dutch", "Goedemorgen", "Goedemiddag", "Goedenavond", "nl-NL"),
        ("German", "Guten Morgen", "Guten Tag", "Guten Abend", "de-DE"),
        ("Indonesian", "Selamat Pagi", "Selamat Siang", "Selamat Malam", "id-ID"),
        ("French", "Bonjour", "Bonjour", "Bonsoir", "fr-FR"),
        ("Spanish", "Buenos días", "Buenas tardes", "Buenas noches", "es-ES"),
        ("Arabic", "Sabah al-khair", "Masa al-khair", "Masa al-khair", "ar-AE"),
        ("Japanese", "Ohayou", "Konnichiwa", "Konbanwa", "ja-JP"),
        ("Italian", "Buongiorno", "Buon pomeriggio", "Buonasera", "it-IT"),
        ENGLISH,
    ];

    let row = TABLE
        .iter()
        .find(|(lang, ..)| *lang == language)
        .copied()
        .unwrap_or(ENGLISH);

    let text = match time_of_day(hour) {
        TimeOfDay::Morning => row.1,
        TimeOfDay::Afternoon => row.2,
        TimeOfDay::Evening => row.3,
    };
    Greeting { text, voice: row.4 }
}
