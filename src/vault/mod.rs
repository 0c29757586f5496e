//! Document vault lifecycle: scoping, intake, finalization, advisories.
//!
//! The vault never owns documents; the AppData aggregate does. Functions
//! here are pure over (documents, active trip) except for the intake
//! pipeline, which talks to the blob store and the AI gateway.

pub mod gate;

pub use gate::{AccessGate, GateOutcome, GateState, SimulatedBiometric, VaultGate};

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::NaiveDate;
use tracing::{info, warn};
use uuid::Uuid;

use crate::cloud::CloudStore;
use crate::derive::classify_expiry;
use crate::error::{AppError, VaultError};
use crate::gateway::{AiGateway, DocumentExtraction};
use crate::model::{
    DayPlan, DocumentFile, DocumentType, FileContent, SubscriptionTier, Traveler, Trip,
};

/// The visible set: global documents plus those linked to the active trip.
/// Pure; changing the active trip has no persistence side effect.
pub fn visible_documents<'a>(
    documents: &'a [DocumentFile],
    active_trip_id: Option<&str>,
) -> Vec<&'a DocumentFile> {
    documents
        .iter()
        .filter(|d| {
            d.is_global()
                || active_trip_id.is_some_and(|active| d.trip_id.as_deref() == Some(active))
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CategoryCounts {
    pub passport: usize,
    pub visa: usize,
    pub insurance: usize,
    pub booking: usize,
}

/// Counts over the visible set for the fixed categories. Recomputed per call.
pub fn category_counts(visible: &[&DocumentFile]) -> CategoryCounts {
    let mut counts = CategoryCounts::default();
    for doc in visible {
        match doc.doc_type {
            DocumentType::Passport => counts.passport += 1,
            DocumentType::Visa => counts.visa += 1,
            DocumentType::Insurance => counts.insurance += 1,
            DocumentType::Booking => counts.booking += 1,
            _ => {}
        }
    }
    counts
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentScope {
    Global,
    Trip,
}

/// An in-progress document record, before finalization assigns id and status.
#[derive(Debug, Clone)]
pub struct DocumentDraft {
    pub name: String,
    pub doc_type: DocumentType,
    /// `DD-MM-YYYY`, empty when unknown.
    pub expiry: String,
    pub doc_id: String,
    pub scope: DocumentScope,
    pub traveler_id: Option<String>,
    pub file: Option<FileContent>,
    pub airline: Option<String>,
    pub flight_number: Option<String>,
    pub route: Option<String>,
    pub departure_time: Option<String>,
    pub gate: Option<String>,
    pub terminal: Option<String>,
    pub seat: Option<String>,
    pub check_in_url: Option<String>,
    pub passenger_name: Option<String>,
}

impl DocumentDraft {
    pub fn manual() -> Self {
        Self {
            name: String::new(),
            doc_type: DocumentType::Booking,
            expiry: String::new(),
            doc_id: String::new(),
            scope: DocumentScope::Trip,
            traveler_id: None,
            file: None,
            airline: None,
            flight_number: None,
            route: None,
            departure_time: None,
            gate: None,
            terminal: None,
            seat: None,
            check_in_url: None,
            passenger_name: None,
        }
    }

    fn apply_extraction(&mut self, extraction: DocumentExtraction, fallback_name: &str) {
        self.name = if extraction.name.is_empty() {
            fallback_name.to_string()
        } else {
            extraction.name
        };
        self.doc_type = extraction.doc_type;
        self.expiry = extraction.expiry;
        self.doc_id = extraction.doc_id;
        self.airline = extraction.airline;
        self.flight_number = extraction.flight_number;
        self.route = extraction.route;
        self.departure_time = extraction.departure_time;
        self.gate = extraction.gate;
        self.terminal = extraction.terminal;
        self.seat = extraction.seat;
        self.check_in_url = extraction.check_in_url;
        self.passenger_name = extraction.passenger_name;
    }
}

#[derive(Debug)]
pub struct IntakeOutcome {
    pub draft: DocumentDraft,
    /// Non-fatal: extraction failed but the upload is kept.
    pub warning: Option<String>,
}

/// AI-assisted intake: compress, store, extract.
pub struct DocumentIntake {
    gateway: Arc<dyn AiGateway>,
    cloud: Arc<dyn CloudStore>,
    cloud_objects: bool,
    max_dimension: u32,
    max_bytes: u64,
    /// Re-submission is disabled while an analysis is in flight.
    analyzing: AtomicBool,
}

impl DocumentIntake {
    pub fn new(
        gateway: Arc<dyn AiGateway>,
        cloud: Arc<dyn CloudStore>,
        cloud_objects: bool,
        vault: &crate::config::VaultConfig,
    ) -> Self {
        Self {
            gateway,
            cloud,
            cloud_objects,
            max_dimension: vault.max_image_dimension,
            max_bytes: vault.max_image_bytes,
            analyzing: AtomicBool::new(false),
        }
    }

    pub fn is_analyzing(&self) -> bool {
        self.analyzing.load(Ordering::SeqCst)
    }

    /// Run the intake pipeline over an uploaded image.
    ///
    /// A file that cannot be decoded aborts the upload. A gateway failure
    /// does not: the stored file and a filename-derived name are kept, the
    /// AI-derived fields stay blank, and a warning is surfaced.
    pub async fn analyze_upload(
        &self,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<IntakeOutcome, AppError> {
        if self.analyzing.swap(true, Ordering::SeqCst) {
            return Err(AppError::ValidationError(
                "document analysis already in progress".into(),
            ));
        }
        let result = self.run_analysis(file_name, bytes).await;
        self.analyzing.store(false, Ordering::SeqCst);
        result
    }

    async fn run_analysis(&self, file_name: &str, bytes: &[u8]) -> Result<IntakeOutcome, AppError> {
        let compressed = compress_image(bytes, self.max_dimension, self.max_bytes)?;
        info!(
            original = bytes.len(),
            compressed = compressed.len(),
            "document image compressed"
        );

        let content = self.store_blob(file_name, &compressed).await;
        let fallback_name = file_name.split('.').next().unwrap_or(file_name).to_string();

        let mut draft = DocumentDraft {
            name: fallback_name.clone(),
            file: Some(content),
            ..DocumentDraft::manual()
        };

        match self.gateway.extract_document("image/jpeg", &compressed).await {
            Ok(extraction) => {
                draft.apply_extraction(extraction, &fallback_name);
                Ok(IntakeOutcome {
                    draft,
                    warning: None,
                })
            }
            Err(e) => {
                warn!(error = %e, "document extraction failed; keeping upload");
                Ok(IntakeOutcome {
                    draft,
                    warning: Some(
                        "AI could not read document. Please fill details manually.".to_string(),
                    ),
                })
            }
        }
    }

    async fn store_blob(&self, file_name: &str, compressed: &[u8]) -> FileContent {
        if self.cloud_objects {
            let path = format!("docs/{}_{}", Uuid::new_v4(), file_name);
            match self
                .cloud
                .upload_object(&path, "image/jpeg", compressed.to_vec())
                .await
            {
                Ok(reference) => return FileContent::Remote(reference),
                Err(e) => {
                    warn!(error = %e, "object upload failed; falling back to inline storage");
                }
            }
        }
        FileContent::inline("image/jpeg", BASE64.encode(compressed))
    }
}

/// Downscale oversized images and re-encode as JPEG, stepping the quality
/// down until the result fits the byte budget. An undecodable file is a hard
/// intake error.
fn compress_image(bytes: &[u8], max_dimension: u32, max_bytes: u64) -> Result<Vec<u8>, VaultError> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| VaultError::UnsupportedFile(e.to_string()))?;

    let img = if img.width() > max_dimension || img.height() > max_dimension {
        img.thumbnail(max_dimension, max_dimension)
    } else {
        img
    };

    let mut quality = 80u8;
    loop {
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageOutputFormat::Jpeg(quality))
            .map_err(|e| VaultError::UnsupportedFile(e.to_string()))?;
        let encoded = out.into_inner();
        if encoded.len() as u64 <= max_bytes || quality <= 40 {
            return Ok(encoded);
        }
        quality -= 20;
    }
}

/// Finalize a draft: derive the status from the expiry, assign a fresh id,
/// and attach trip linkage only when scope is Trip and a trip is active.
pub fn finalize(
    draft: DocumentDraft,
    active_trip: Option<&Trip>,
    today: NaiveDate,
) -> Result<DocumentFile, AppError> {
    if draft.name.trim().is_empty() {
        return Err(AppError::ValidationError("document name is required".into()));
    }

    let status = classify_expiry(&draft.expiry, today);
    Ok(DocumentFile {
        id: Uuid::new_v4().to_string(),
        name: draft.name,
        doc_type: draft.doc_type,
        expiry: if draft.expiry.is_empty() {
            None
        } else {
            Some(draft.expiry)
        },
        document_id: if draft.doc_id.is_empty() {
            None
        } else {
            Some(draft.doc_id)
        },
        traveler_id: draft.traveler_id,
        trip_id: match draft.scope {
            DocumentScope::Trip => active_trip.map(|t| t.id.clone()),
            DocumentScope::Global => None,
        },
        file_content: draft.file,
        status,
        airline: draft.airline,
        flight_number: draft.flight_number,
        route: draft.route,
        departure_time: draft.departure_time,
        gate: draft.gate,
        terminal: draft.terminal,
        seat: draft.seat,
        check_in_url: draft.check_in_url,
        passenger_name: draft.passenger_name,
    })
}

/// Prepend: newest first, stable within a session.
pub fn add_document(documents: &mut Vec<DocumentFile>, doc: DocumentFile) {
    documents.insert(0, doc);
}

/// Remove by id. No cascades.
pub fn delete_document(documents: &mut Vec<DocumentFile>, id: &str) {
    documents.retain(|d| d.id != id);
}

const SCHENGEN_MARKERS: &[&str] = &["Netherlands", "Germany", "France", "Italy"];
const VISA_REQUIRED_NATIONALITIES: &[&str] = &["Indonesia"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisaAdvisory {
    pub text: String,
    /// Free tier sees a teaser instead of the per-traveler detail.
    pub locked: bool,
}

/// Visa-requirement advisory for the active trip: Schengen-like destinations
/// cross-referenced against visa-required nationalities, with the detail
/// swapped for a locked teaser on the lowest tier.
pub fn visa_advisories(
    itinerary: &[DayPlan],
    travelers: &[Traveler],
    tier: SubscriptionTier,
) -> Vec<VisaAdvisory> {
    let going_to_schengen = itinerary.iter().any(|d| {
        SCHENGEN_MARKERS
            .iter()
            .any(|marker| d.location.contains(marker))
    });
    if !going_to_schengen {
        return Vec::new();
    }

    let needing_visa: Vec<&Traveler> = travelers
        .iter()
        .filter(|t| VISA_REQUIRED_NATIONALITIES.contains(&t.nationality.as_str()))
        .collect();
    if needing_visa.is_empty() {
        return Vec::new();
    }

    if tier == SubscriptionTier::Free {
        return vec![VisaAdvisory {
            text: format!(
                "Multi-Party Visa Intelligence detected {} visa requirements. Upgrade to view details.",
                needing_visa.len()
            ),
            locked: true,
        }];
    }

    needing_visa
        .iter()
        .map(|t| VisaAdvisory {
            text: format!(
                "MANDATORY VISA ALERT: Schengen Visa check required for {} ({}).",
                t.name, t.nationality
            ),
            locked: false,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::MockCloudStore;
    use crate::error::GatewayError;
    use crate::gateway::MockAiGateway;
    use crate::model::DocumentStatus;

    fn doc(id: &str, doc_type: DocumentType, trip_id: Option<&str>) -> DocumentFile {
        DocumentFile {
            id: id.into(),
            name: format!("doc {id}"),
            doc_type,
            expiry: None,
            document_id: None,
            traveler_id: None,
            trip_id: trip_id.map(str::to_string),
            file_content: None,
            status: DocumentStatus::Valid,
            airline: None,
            flight_number: None,
            route: None,
            departure_time: None,
            gate: None,
            terminal: None,
            seat: None,
            check_in_url: None,
            passenger_name: None,
        }
    }

    fn trip(id: &str) -> Trip {
        Trip {
            id: id.into(),
            name: "Trip".into(),
            destination: "Amsterdam, Netherlands".into(),
            start_date: "2025-04-10".into(),
            end_date: "2025-04-12".into(),
            status: crate::model::TripStatus::Upcoming,
            image: String::new(),
            currency: Some("EUR".into()),
            itinerary: vec![],
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    fn vault_config() -> crate::config::VaultConfig {
        crate::config::VaultConfig {
            unlock_delay_ms: 10,
            max_image_bytes: 512 * 1024,
            max_image_dimension: 1920,
        }
    }

    fn png_bytes() -> Vec<u8> {
        let img = image::DynamicImage::ImageRgb8(image::RgbImage::new(8, 8));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageOutputFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_scoping_global_union_active_trip() {
        let docs = vec![
            doc("g1", DocumentType::Passport, None),
            doc("a1", DocumentType::Booking, Some("trip-a")),
            doc("b1", DocumentType::Booking, Some("trip-b")),
        ];

        let visible = visible_documents(&docs, Some("trip-a"));
        let ids: Vec<&str> = visible.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["g1", "a1"]);

        // A trip-linked document never leaks into another trip's view.
        let visible = visible_documents(&docs, Some("trip-b"));
        let ids: Vec<&str> = visible.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["g1", "b1"]);

        // Global documents are visible even with no active trip.
        let visible = visible_documents(&docs, None);
        let ids: Vec<&str> = visible.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["g1"]);
    }

    #[test]
    fn test_category_counts() {
        let docs = vec![
            doc("1", DocumentType::Passport, None),
            doc("2", DocumentType::Visa, None),
            doc("3", DocumentType::Visa, None),
            doc("4", DocumentType::Other("loyalty".into()), None),
        ];
        let visible = visible_documents(&docs, None);
        let counts = category_counts(&visible);
        assert_eq!(counts.passport, 1);
        assert_eq!(counts.visa, 2);
        assert_eq!(counts.insurance, 0);
        assert_eq!(counts.booking, 0);
    }

    #[test]
    fn test_finalize_assigns_id_and_status() {
        let mut draft = DocumentDraft::manual();
        draft.name = "Hotel The Toren".into();
        draft.expiry = "01-01-2020".into();

        let doc = finalize(draft, None, today()).unwrap();
        assert!(!doc.id.is_empty());
        assert_eq!(doc.status, DocumentStatus::Expired);
        assert_eq!(doc.expiry.as_deref(), Some("01-01-2020"));
    }

    #[test]
    fn test_finalize_empty_expiry_is_valid() {
        let mut draft = DocumentDraft::manual();
        draft.name = "Passport".into();
        let doc = finalize(draft, None, today()).unwrap();
        assert_eq!(doc.status, DocumentStatus::Valid);
        assert!(doc.expiry.is_none());
    }

    #[test]
    fn test_finalize_trip_scope_requires_active_trip() {
        let active = trip("trip-1");

        let mut draft = DocumentDraft::manual();
        draft.name = "Booking".into();
        draft.scope = DocumentScope::Trip;
        let doc = finalize(draft.clone(), Some(&active), today()).unwrap();
        assert_eq!(doc.trip_id.as_deref(), Some("trip-1"));

        // Trip scope with no active trip degrades to global.
        let doc = finalize(draft.clone(), None, today()).unwrap();
        assert!(doc.trip_id.is_none());

        draft.scope = DocumentScope::Global;
        let doc = finalize(draft, Some(&active), today()).unwrap();
        assert!(doc.trip_id.is_none());
    }

    #[test]
    fn test_finalize_requires_name() {
        let draft = DocumentDraft::manual();
        assert!(matches!(
            finalize(draft, None, today()),
            Err(AppError::ValidationError(_))
        ));
    }

    #[test]
    fn test_add_prepends_and_delete_removes() {
        let mut docs = vec![doc("old", DocumentType::Booking, None)];
        add_document(&mut docs, doc("new", DocumentType::Visa, None));
        assert_eq!(docs[0].id, "new");
        assert_eq!(docs[1].id, "old");

        delete_document(&mut docs, "old");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "new");
    }

    #[test]
    fn test_visa_advisory_tier_gating() {
        let itinerary = vec![DayPlan {
            day: 1,
            date: "2025-04-10".into(),
            location: "Amsterdam, Netherlands".into(),
            language: "Dutch".into(),
            items: vec![],
            outfit: None,
            weather: None,
            active_alerts: None,
        }];
        let travelers = vec![
            Traveler {
                id: "t-me".into(),
                name: "Ada".into(),
                nationality: "Indonesia".into(),
                passport_number: String::new(),
            },
            Traveler {
                id: "t-2".into(),
                name: "Bob".into(),
                nationality: "United States".into(),
                passport_number: String::new(),
            },
        ];

        let alerts = visa_advisories(&itinerary, &travelers, SubscriptionTier::Free);
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].locked);
        assert!(alerts[0].text.contains("Upgrade"));

        let alerts = visa_advisories(&itinerary, &travelers, SubscriptionTier::Standard);
        assert_eq!(alerts.len(), 1);
        assert!(!alerts[0].locked);
        assert!(alerts[0].text.contains("Ada"));

        // No Schengen-like destination, no advisory.
        let elsewhere = vec![DayPlan {
            location: "Ubud, Bali".into(),
            ..itinerary[0].clone()
        }];
        assert!(visa_advisories(&elsewhere, &travelers, SubscriptionTier::Premium).is_empty());
    }

    #[tokio::test]
    async fn test_intake_success_populates_draft() {
        let mut gateway = MockAiGateway::new();
        gateway.expect_extract_document().returning(|_, _| {
            Ok(crate::gateway::DocumentExtraction {
                doc_type: DocumentType::Ticket,
                name: "KLM - Ada - AMS -> JFK".into(),
                doc_id: "PNR123".into(),
                expiry: "20-12-2025".into(),
                airline: Some("KLM".into()),
                flight_number: Some("KL641".into()),
                route: Some("AMS -> JFK".into()),
                departure_time: Some("10:05".into()),
                gate: None,
                terminal: None,
                seat: Some("23A".into()),
                check_in_url: None,
                passenger_name: Some("Ada Lovelace".into()),
            })
        });

        let intake = DocumentIntake::new(
            Arc::new(gateway),
            Arc::new(MockCloudStore::new()),
            false,
            &vault_config(),
        );
        let outcome = intake
            .analyze_upload("boarding-pass.png", &png_bytes())
            .await
            .unwrap();

        assert!(outcome.warning.is_none());
        assert_eq!(outcome.draft.name, "KLM - Ada - AMS -> JFK");
        assert_eq!(outcome.draft.doc_type, DocumentType::Ticket);
        assert_eq!(outcome.draft.expiry, "20-12-2025");
        assert_eq!(outcome.draft.seat.as_deref(), Some("23A"));
        assert!(matches!(
            outcome.draft.file,
            Some(FileContent::Inline { .. })
        ));
        assert!(!intake.is_analyzing());
    }

    #[tokio::test]
    async fn test_intake_keeps_upload_on_extraction_failure() {
        let mut gateway = MockAiGateway::new();
        gateway
            .expect_extract_document()
            .returning(|_, _| Err(GatewayError::MalformedResponse("not json".into())));

        let intake = DocumentIntake::new(
            Arc::new(gateway),
            Arc::new(MockCloudStore::new()),
            false,
            &vault_config(),
        );
        let outcome = intake
            .analyze_upload("boarding-pass.png", &png_bytes())
            .await
            .unwrap();

        // The stored file and filename-derived name survive; AI fields stay blank.
        assert!(outcome.warning.is_some());
        assert_eq!(outcome.draft.name, "boarding-pass");
        assert!(outcome.draft.expiry.is_empty());
        assert!(outcome.draft.doc_id.is_empty());
        assert!(outcome.draft.file.is_some());
    }

    #[tokio::test]
    async fn test_intake_rejects_undecodable_file() {
        let intake = DocumentIntake::new(
            Arc::new(MockAiGateway::new()),
            Arc::new(MockCloudStore::new()),
            false,
            &vault_config(),
        );
        let err = intake
            .analyze_upload("notes.txt", b"definitely not an image")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::VaultError(VaultError::UnsupportedFile(_))
        ));
        // The guard is released even on failure.
        assert!(!intake.is_analyzing());
    }

    #[tokio::test]
    async fn test_intake_uploads_to_cloud_when_configured() {
        let mut gateway = MockAiGateway::new();
        gateway
            .expect_extract_document()
            .returning(|_, _| Err(GatewayError::Timeout));

        let mut cloud = MockCloudStore::new();
        cloud
            .expect_upload_object()
            .times(1)
            .returning(|_, _, _| Ok("https://cdn.example/docs/x.jpg".into()));

        let intake = DocumentIntake::new(Arc::new(gateway), Arc::new(cloud), true, &vault_config());
        let outcome = intake
            .analyze_upload("visa.png", &png_bytes())
            .await
            .unwrap();
        assert_eq!(
            outcome.draft.file,
            Some(FileContent::Remote("https://cdn.example/docs/x.jpg".into()))
        );
    }

    #[test]
    fn test_compress_downscales_oversized_images() {
        let img = image::DynamicImage::ImageRgb8(image::RgbImage::new(64, 32));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageOutputFormat::Png).unwrap();

        let jpeg = compress_image(&out.into_inner(), 16, 512 * 1024).unwrap();
        let reloaded = image::load_from_memory(&jpeg).unwrap();
        assert!(reloaded.width() <= 16 && reloaded.height() <= 16);
    }
}
