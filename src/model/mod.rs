//! Domain records for the GAIDE travel companion.
//!
//! Pure data: every type here is serde-serializable and carries no behavior
//! beyond constructors and small read helpers. The `AppData` aggregate is the
//! exact unit of durable persistence, keyed by user email.

mod seed;

pub use seed::{default_checklist, DEFAULT_COVER_IMAGE, DEFAULT_NATIONALITY, SELF_TRAVELER_ID};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubscriptionTier {
    Free,
    Standard,
    Premium,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub is_authenticated: bool,
    pub subscription_tier: SubscriptionTier,
    pub biometric_enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TripStatus {
    Active,
    Upcoming,
    Past,
}

/// Category of an itinerary entry. Providers occasionally invent labels
/// ("sightseeing"); those land on `Other` instead of failing the parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ItemCategory {
    Dining,
    Activity,
    Transport,
    Leisure,
    Other,
}

impl From<String> for ItemCategory {
    fn from(s: String) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "dining" => ItemCategory::Dining,
            "activity" => ItemCategory::Activity,
            "transport" => ItemCategory::Transport,
            "leisure" => ItemCategory::Leisure,
            _ => ItemCategory::Other,
        }
    }
}

impl From<ItemCategory> for String {
    fn from(c: ItemCategory) -> Self {
        match c {
            ItemCategory::Dining => "dining",
            ItemCategory::Activity => "activity",
            ItemCategory::Transport => "transport",
            ItemCategory::Leisure => "leisure",
            ItemCategory::Other => "other",
        }
        .to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryItem {
    pub id: String,
    /// `HH:MM`, 24-hour. Plain string ordering is the sort key.
    pub time: String,
    pub activity: String,
    pub location: String,
    #[serde(rename = "type")]
    pub category: ItemCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
}

impl ItineraryItem {
    /// Content convention: notes carrying the literal "Ambiguity" marker get
    /// the "filter active" treatment downstream. Not a separate field.
    pub fn has_ambiguity_marker(&self) -> bool {
        self.notes.as_deref().is_some_and(|n| n.contains("Ambiguity"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherInfo {
    pub temp_max: String,
    pub temp_min: String,
    pub condition: String,
    pub precip_chance: String,
    pub uv_index: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Weather,
    Event,
    Crowd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Critical,
    Warning,
    Info,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripAlert {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayPlan {
    /// 1-based, contiguous across the trip.
    pub day: u32,
    /// `YYYY-MM-DD`.
    pub date: String,
    pub location: String,
    pub language: String,
    pub items: Vec<ItineraryItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outfit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather: Option<WeatherInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_alerts: Option<Vec<TripAlert>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: String,
    pub name: String,
    pub destination: String,
    pub start_date: String,
    pub end_date: String,
    /// A label, not recomputed from dates.
    pub status: TripStatus,
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    pub itinerary: Vec<DayPlan>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Traveler {
    pub id: String,
    pub name: String,
    pub nationality: String,
    #[serde(default)]
    pub passport_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    pub home_currency: String,
    pub dietary: Vec<String>,
    pub nightlife: String,
    pub family_friendly: bool,
    pub avoid_tourist_traps: bool,
    pub custom_avoidances: Vec<String>,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            home_currency: "USD".to_string(),
            dietary: Vec::new(),
            nightlife: String::new(),
            family_friendly: false,
            avoid_tourist_traps: true,
            custom_avoidances: Vec::new(),
        }
    }
}

/// Document category. The intake paths historically disagreed on the set, so
/// this is a closed enum with a string escape hatch: unknown labels round-trip
/// as `Other` instead of being rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DocumentType {
    Passport,
    Visa,
    Insurance,
    Booking,
    Ticket,
    Other(String),
}

impl From<String> for DocumentType {
    fn from(s: String) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "passport" => DocumentType::Passport,
            "visa" => DocumentType::Visa,
            "insurance" => DocumentType::Insurance,
            "booking" => DocumentType::Booking,
            "ticket" => DocumentType::Ticket,
            _ => DocumentType::Other(s),
        }
    }
}

impl From<DocumentType> for String {
    fn from(t: DocumentType) -> Self {
        match t {
            DocumentType::Passport => "passport".to_string(),
            DocumentType::Visa => "visa".to_string(),
            DocumentType::Insurance => "insurance".to_string(),
            DocumentType::Booking => "booking".to_string(),
            DocumentType::Ticket => "ticket".to_string(),
            DocumentType::Other(s) => s,
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&String::from(self.clone()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Valid,
    Expiring,
    Expired,
    Missing,
    Required,
}

/// Self-describing document image: inline bytes or a remote reference.
/// A bare string deserializes as a remote URL, matching legacy records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileContent {
    Inline { mime: String, data: String },
    Remote(String),
}

impl FileContent {
    pub fn inline(mime: impl Into<String>, base64_data: impl Into<String>) -> Self {
        FileContent::Inline {
            mime: mime.into(),
            data: base64_data.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentFile {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<String>,
    /// Booking reference, PNR, visa number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traveler_id: Option<String>,
    /// Absent means global: visible under every trip.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trip_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_content: Option<FileContent>,
    /// Derived from `expiry`; recomputed on edit, never trusted from intake.
    pub status: DocumentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub airline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flight_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub departure_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seat: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_in_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passenger_name: Option<String>,
}

impl DocumentFile {
    pub fn is_global(&self) -> bool {
        self.trip_id.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub role: ChatRole,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_system_alert: bool,
    /// The sole dispatch trigger; cleared exactly once, by the response
    /// handler, never by the sender.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub pending_response: bool,
}

impl ChatMessage {
    /// A user-authored message, marked awaiting a response.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: ChatRole::User,
            text: text.into(),
            timestamp: Utc::now(),
            is_system_alert: false,
            pending_response: true,
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: ChatRole::Model,
            text: text.into(),
            timestamp: Utc::now(),
            is_system_alert: false,
            pending_response: false,
        }
    }

    /// A model-authored alert, used for surfaced failures.
    pub fn alert(text: impl Into<String>) -> Self {
        Self {
            is_system_alert: true,
            ..Self::model(text)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChecklistTier {
    #[serde(rename = "Tier 1")]
    Tier1,
    #[serde(rename = "Tier 2")]
    Tier2,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistItem {
    pub id: String,
    pub item: String,
    pub category: ChecklistTier,
    pub is_confirmed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// The exact and only unit of durable persistence, keyed by user email.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppData {
    #[serde(default)]
    pub trips: Vec<Trip>,
    #[serde(default)]
    pub documents: Vec<DocumentFile>,
    #[serde(default)]
    pub preferences: UserPreferences,
    #[serde(default)]
    pub travelers: Vec<Traveler>,
    #[serde(default)]
    pub chat_history: Vec<ChatMessage>,
    #[serde(default)]
    pub checklist: Vec<ChecklistItem>,
}

impl AppData {
    /// First-login defaults: empty trips and documents, default preferences,
    /// a single self-traveler derived from the profile, default checklist.
    pub fn seeded_for(profile: &UserProfile) -> Self {
        Self {
            trips: Vec::new(),
            documents: Vec::new(),
            preferences: UserPreferences::default(),
            travelers: vec![Traveler {
                id: SELF_TRAVELER_ID.to_string(),
                name: profile.name.clone(),
                nationality: DEFAULT_NATIONALITY.to_string(),
                passport_number: String::new(),
            }],
            chat_history: Vec::new(),
            checklist: default_checklist(),
        }
    }

    pub fn trip(&self, trip_id: &str) -> Option<&Trip> {
        self.trips.iter().find(|t| t.id == trip_id)
    }

    pub fn trip_mut(&mut self, trip_id: &str) -> Option<&mut Trip> {
        self.trips.iter_mut().find(|t| t.id == trip_id)
    }
}
