use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::gateway::{
    prompts, strip_code_fences, AiGateway, ContextSnapshot, DocumentExtraction, TripProposal,
    TripProposalRequest,
};
use crate::model::{ChatMessage, ChatRole};

/// Days between "now" and the proposed trip start.
const PROPOSAL_LEAD_DAYS: i64 = 7;

const EMPTY_REPLY: &str = "I processed the request but received no output.";

/// REST client for a Gemini-style `generateContent` endpoint.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl GeminiClient {
    pub fn from_config(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(GatewayError::from)?;

        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        })
    }

    fn ensure_key(&self) -> Result<(), GatewayError> {
        if self.api_key.is_empty() {
            warn!("gateway api key missing; refusing request");
            return Err(GatewayError::MissingCredentials);
        }
        Ok(())
    }

    async fn generate(&self, body: Value) -> Result<String, GatewayError> {
        self.ensure_key()?;

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint, self.model
        );
        let resp = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(GatewayError::ProviderError(format!(
                "provider returned {}",
                resp.status()
            )));
        }

        let value: Value = resp
            .json()
            .await
            .map_err(|e| GatewayError::MalformedResponse(e.to_string()))?;

        value
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| GatewayError::MalformedResponse("no candidate text".into()))
    }

    fn history_contents(history: &[ChatMessage], message: &str) -> Vec<Value> {
        let mut contents: Vec<Value> = history
            .iter()
            .map(|msg| {
                json!({
                    "role": match msg.role {
                        ChatRole::User => "user",
                        ChatRole::Model => "model",
                    },
                    "parts": [{ "text": msg.text }],
                })
            })
            .collect();
        contents.push(json!({ "role": "user", "parts": [{ "text": message }] }));
        contents
    }
}

#[async_trait]
impl AiGateway for GeminiClient {
    async fn chat(
        &self,
        context: &ContextSnapshot,
        history: &[ChatMessage],
        message: &str,
    ) -> Result<String, GatewayError> {
        let body = json!({
            "contents": Self::history_contents(history, message),
            "systemInstruction": { "parts": [{ "text": prompts::context_block(context) }] },
            "generationConfig": { "temperature": 0.7 },
        });

        let text = self.generate(body).await?;
        if text.is_empty() {
            return Ok(EMPTY_REPLY.to_string());
        }
        Ok(text)
    }

    async fn generate_itinerary(
        &self,
        request: &TripProposalRequest,
    ) -> Result<TripProposal, GatewayError> {
        let start = Utc::now().date_naive() + chrono::Duration::days(PROPOSAL_LEAD_DAYS);
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompts::itinerary_prompt(request, start) }] }],
            "generationConfig": { "temperature": 0.7, "responseMimeType": "application/json" },
        });

        let text = self.generate(body).await?;
        let cleaned = strip_code_fences(&text);
        debug!(bytes = cleaned.len(), "itinerary payload received");

        let parsed: Value = serde_json::from_str(&cleaned)
            .map_err(|e| GatewayError::MalformedResponse(format!("itinerary not JSON: {e}")))?;

        // Some responses drop the wrapper and return the day array directly.
        if parsed.is_array() {
            let itinerary = serde_json::from_value(parsed)
                .map_err(|e| GatewayError::MalformedResponse(format!("bad day plans: {e}")))?;
            return Ok(TripProposal {
                currency: "USD".to_string(),
                itinerary,
            });
        }

        serde_json::from_value(parsed)
            .map_err(|e| GatewayError::MalformedResponse(format!("bad proposal: {e}")))
    }

    async fn extract_document(
        &self,
        mime: &str,
        image: &[u8],
    ) -> Result<DocumentExtraction, GatewayError> {
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "text": prompts::EXTRACTION_PROMPT },
                    { "inlineData": { "mimeType": mime, "data": BASE64.encode(image) } },
                ],
            }],
            "generationConfig": { "responseMimeType": "application/json" },
        });

        let text = self.generate(body).await?;
        let cleaned = strip_code_fences(&text);
        serde_json::from_str(&cleaned)
            .map_err(|e| GatewayError::MalformedResponse(format!("bad extraction: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DocumentType;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(uri: &str) -> GeminiClient {
        GeminiClient::from_config(&GatewayConfig {
            api_key: "test-key".into(),
            model: "gemini-2.0-flash".into(),
            endpoint: uri.into(),
            timeout_seconds: 5,
        })
        .unwrap()
    }

    fn candidate_response(text: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [{ "text": text }] } }]
        }))
    }

    #[tokio::test]
    async fn test_chat_returns_candidate_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
            .respond_with(candidate_response("Hello traveler"))
            .mount(&server)
            .await;

        let client = client_for(&server.uri());
        let reply = client
            .chat(&ContextSnapshot::default(), &[], "hi")
            .await
            .unwrap();
        assert_eq!(reply, "Hello traveler");
    }

    #[tokio::test]
    async fn test_missing_key_is_eager_and_in_band() {
        let client = GeminiClient::from_config(&GatewayConfig {
            api_key: String::new(),
            model: "gemini-2.0-flash".into(),
            endpoint: "http://127.0.0.1:1".into(),
            timeout_seconds: 1,
        })
        .unwrap();

        // No request is attempted against the unroutable endpoint.
        let err = client
            .chat(&ContextSnapshot::default(), &[], "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::MissingCredentials));
    }

    #[tokio::test]
    async fn test_provider_error_surfaces() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = client_for(&server.uri());
        let err = client
            .chat(&ContextSnapshot::default(), &[], "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::ProviderError(_)));
    }

    #[tokio::test]
    async fn test_empty_candidates_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
            .mount(&server)
            .await;

        let client = client_for(&server.uri());
        let err = client
            .chat(&ContextSnapshot::default(), &[], "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_itinerary_strips_code_fences() {
        let server = MockServer::start().await;
        let payload = "```json\n{\"currency\":\"EUR\",\"itinerary\":[{\"day\":1,\"date\":\"2025-04-01\",\"location\":\"Paris\",\"language\":\"French\",\"items\":[]}]}\n```";
        Mock::given(method("POST"))
            .respond_with(candidate_response(payload))
            .mount(&server)
            .await;

        let client = client_for(&server.uri());
        let proposal = client
            .generate_itinerary(&TripProposalRequest {
                destination: "Paris".into(),
                duration_days: 1,
                party: "1 Adults, 0 Children".into(),
                preferences: Default::default(),
            })
            .await
            .unwrap();
        assert_eq!(proposal.currency, "EUR");
        assert_eq!(proposal.itinerary.len(), 1);
        assert_eq!(proposal.itinerary[0].language, "French");
    }

    #[tokio::test]
    async fn test_itinerary_accepts_bare_array() {
        let server = MockServer::start().await;
        let payload = "[{\"day\":1,\"date\":\"2025-04-01\",\"location\":\"Paris\",\"language\":\"French\",\"items\":[]}]";
        Mock::given(method("POST"))
            .respond_with(candidate_response(payload))
            .mount(&server)
            .await;

        let client = client_for(&server.uri());
        let proposal = client
            .generate_itinerary(&TripProposalRequest {
                destination: "Paris".into(),
                duration_days: 1,
                party: "1 Adults, 0 Children".into(),
                preferences: Default::default(),
            })
            .await
            .unwrap();
        // The wrapper-less fallback assumes USD.
        assert_eq!(proposal.currency, "USD");
        assert_eq!(proposal.itinerary.len(), 1);
    }

    #[tokio::test]
    async fn test_extraction_round_trip() {
        let server = MockServer::start().await;
        let payload = "```json\n{\"type\":\"visa\",\"name\":\"Schengen Visa - Ada\",\"docId\":\"V-1234\",\"expiry\":\"01-09-2027\"}\n```";
        Mock::given(method("POST"))
            .respond_with(candidate_response(payload))
            .mount(&server)
            .await;

        let client = client_for(&server.uri());
        let extraction = client
            .extract_document("image/jpeg", &[0xff, 0xd8, 0xff])
            .await
            .unwrap();
        assert_eq!(extraction.doc_type, DocumentType::Visa);
        assert_eq!(extraction.doc_id, "V-1234");
        assert_eq!(extraction.expiry, "01-09-2027");
    }

    #[tokio::test]
    async fn test_extraction_garbage_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(candidate_response("I could not read this document, sorry!"))
            .mount(&server)
            .await;

        let client = client_for(&server.uri());
        let err = client
            .extract_document("image/jpeg", &[0u8; 4])
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::MalformedResponse(_)));
    }
}
