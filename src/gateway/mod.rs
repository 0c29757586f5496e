//! Generative-AI gateway contract.
//!
//! Three request shapes: free-text chat over the live context, structured
//! itinerary generation, and structured document-field extraction. Providers
//! habitually wrap JSON in code fences; responses are stripped before parsing.
//! Every failure surfaces as a typed [`GatewayError`]; callers decide how to
//! degrade (alert message, blanked fields, wizard retry).

mod gemini;
pub mod prompts;

pub use gemini::GeminiClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::model::{
    ChatMessage, ChecklistItem, DayPlan, DocumentType, Traveler, UserPreferences,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// The live application state handed to the provider as system context.
#[derive(Debug, Clone, Default)]
pub struct ContextSnapshot {
    pub itinerary: Vec<DayPlan>,
    pub preferences: UserPreferences,
    pub travelers: Vec<Traveler>,
    pub checklist: Vec<ChecklistItem>,
    /// Optional, toggled on demand; never required for dispatch.
    pub location: Option<GeoPoint>,
}

#[derive(Debug, Clone)]
pub struct TripProposalRequest {
    pub destination: String,
    pub duration_days: u32,
    /// e.g. "2 Adults, 1 Children"
    pub party: String,
    pub preferences: UserPreferences,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TripProposal {
    #[serde(default = "default_currency")]
    pub currency: String,
    pub itinerary: Vec<DayPlan>,
}

fn default_currency() -> String {
    "USD".to_string()
}

/// Structured fields read off a document image.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentExtraction {
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub doc_id: String,
    #[serde(default)]
    pub expiry: String,
    #[serde(default)]
    pub airline: Option<String>,
    #[serde(default)]
    pub flight_number: Option<String>,
    #[serde(default)]
    pub route: Option<String>,
    #[serde(default)]
    pub departure_time: Option<String>,
    #[serde(default)]
    pub gate: Option<String>,
    #[serde(default)]
    pub terminal: Option<String>,
    #[serde(default)]
    pub seat: Option<String>,
    #[serde(default)]
    pub check_in_url: Option<String>,
    #[serde(default)]
    pub passenger_name: Option<String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AiGateway: Send + Sync {
    /// Free-text completion over the full prior history plus one new message.
    async fn chat(
        &self,
        context: &ContextSnapshot,
        history: &[ChatMessage],
        message: &str,
    ) -> Result<String, GatewayError>;

    async fn generate_itinerary(
        &self,
        request: &TripProposalRequest,
    ) -> Result<TripProposal, GatewayError>;

    async fn extract_document(
        &self,
        mime: &str,
        image: &[u8],
    ) -> Result<DocumentExtraction, GatewayError>;
}

/// Strip provider formatting artifacts (code-fence markers) from a JSON
/// payload before parsing.
pub fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

pub const SUPPORTED_LANGUAGES: &[&str] = &[
    "English",
    "Dutch",
    "German",
    "French",
    "Spanish",
    "Italian",
    "Indonesian",
    "Japanese",
    "Chinese",
    "Arabic",
    "Korean",
    "Thai",
    "Vietnamese",
];

pub const COMMON_PHRASES: &[&str] = &[
    "Where is the bathroom?",
    "I have a food allergy (No Pork).",
    "How much does this cost?",
    "Can you help me?",
    "Thank you very much.",
];

/// Single-shot translation over the chat shape: empty history, one task
/// prompt, only the translated text back.
pub async fn translate(
    gateway: &dyn AiGateway,
    source: &str,
    target: &str,
    text: &str,
    context: &ContextSnapshot,
) -> Result<String, GatewayError> {
    let prompt = format!(
        "[TASK: TRANSLATION]\n\
         Source Language: {source}\n\
         Target Language: {target}\n\
         User Context: Tourist / Traveler.\n\
         Text to translate: \"{text}\"\n\n\
         Output ONLY the translated text, no explanations."
    );
    gateway.chat(context, &[], &prompt).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(
            strip_code_fences("```json\n{\"a\":1}\n```"),
            "{\"a\":1}"
        );
        assert_eq!(strip_code_fences("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  plain text  "), "plain text");
    }

    #[test]
    fn test_extraction_parses_partial_payload() {
        // Extraction responses omit whatever the model could not read.
        let raw = r#"{"type":"visa","name":"Schengen Visa","docId":"V-99","expiry":"01-09-2027"}"#;
        let parsed: DocumentExtraction = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.doc_type, DocumentType::Visa);
        assert_eq!(parsed.expiry, "01-09-2027");
        assert!(parsed.airline.is_none());
    }

    #[test]
    fn test_proposal_defaults_currency() {
        let raw = r#"{"itinerary":[]}"#;
        let parsed: TripProposal = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.currency, "USD");
    }

    #[tokio::test]
    async fn test_translate_builds_task_prompt() {
        let mut gateway = MockAiGateway::new();
        gateway
            .expect_chat()
            .withf(|_, history, message| {
                history.is_empty()
                    && message.contains("[TASK: TRANSLATION]")
                    && message.contains("Target Language: Dutch")
                    && message.contains("\"Thank you very much.\"")
            })
            .returning(|_, _, _| Ok("Dank u wel.".to_string()));

        let out = translate(
            &gateway,
            "English",
            "Dutch",
            "Thank you very much.",
            &ContextSnapshot::default(),
        )
        .await
        .unwrap();
        assert_eq!(out, "Dank u wel.");
    }
}
