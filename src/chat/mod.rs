//! Chat response dispatch.
//!
//! Per message the state machine is `idle -> awaiting_response -> idle`; a
//! process-wide atomic `processing` flag prevents two dispatches from
//! overlapping. A dispatch fires when the last history entry is user-authored
//! and still marked awaiting. Marker-clearing and reply-append happen in one
//! store mutation, so no reader ever sees a cleared marker without its reply.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::error::AppError;
use crate::gateway::{AiGateway, ContextSnapshot, GeoPoint};
use crate::model::{AppData, ChatMessage, ChatRole, ItineraryItem};
use crate::store::UserDataStore;

pub struct ChatDispatcher {
    gateway: Arc<dyn AiGateway>,
    processing: AtomicBool,
}

impl ChatDispatcher {
    pub fn new(gateway: Arc<dyn AiGateway>) -> Self {
        Self {
            gateway,
            processing: AtomicBool::new(false),
        }
    }

    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::SeqCst)
    }

    /// Append a user message carrying the awaiting-response marker. Empty
    /// input and sends during an in-flight dispatch are ignored, mirroring a
    /// disabled send button. Returns whether a message was appended.
    pub async fn send_user_message(
        &self,
        store: &UserDataStore,
        text: &str,
    ) -> Result<bool, AppError> {
        if text.trim().is_empty() || self.is_processing() {
            return Ok(false);
        }
        store
            .mutate(|data| data.chat_history.push(ChatMessage::user(text)))
            .await?;
        Ok(true)
    }

    /// The reschedule flow: enqueue a pre-written user message that triggers
    /// dispatch like any other.
    pub fn swap_request(item: &ItineraryItem, destination: &str) -> ChatMessage {
        ChatMessage::user(format!(
            "GAIDE, I want to reschedule \"{}\" in {}. What are my options?",
            item.activity, destination
        ))
    }

    /// Dispatch the pending message, if any. Exactly one reply is appended
    /// (a model answer on success, an alert-flagged summary on failure) and
    /// the awaiting marker is cleared in the same transition. Returns whether
    /// a dispatch ran.
    pub async fn dispatch_pending(
        &self,
        store: &UserDataStore,
        context: &ContextSnapshot,
    ) -> Result<bool, AppError> {
        let Some(snapshot) = store.snapshot().await else {
            return Ok(false);
        };
        let Some(last) = snapshot.chat_history.last() else {
            return Ok(false);
        };
        if last.role != ChatRole::User || !last.pending_response {
            return Ok(false);
        }
        if self.processing.swap(true, Ordering::SeqCst) {
            debug!("dispatch already in flight; skipping");
            return Ok(false);
        }

        let message = last.text.clone();
        let history = &snapshot.chat_history[..snapshot.chat_history.len() - 1];
        info!(chars = message.len(), "dispatching chat message");

        let reply = match self.gateway.chat(context, history, &message).await {
            Ok(text) => ChatMessage::model(text),
            Err(e) => {
                error!(error = %e, "chat dispatch failed");
                ChatMessage::alert(format!("I encountered an issue: {e}. Please try again."))
            }
        };

        let applied = store
            .mutate(move |data| {
                if let Some(last) = data.chat_history.last_mut() {
                    last.pending_response = false;
                }
                data.chat_history.push(reply);
            })
            .await;
        self.processing.store(false, Ordering::SeqCst);

        match applied {
            Ok(()) => Ok(true),
            // Stale completion: the user signed out mid-flight and the target
            // state is gone. Best effort, drop the reply.
            Err(_) => {
                debug!("target state gone; dropping stale chat reply");
                Ok(false)
            }
        }
    }
}

/// Assemble the live context snapshot the gateway receives: the active
/// trip's itinerary plus preferences, party, checklist, and the optional
/// on-demand location.
pub async fn context_for(
    store: &UserDataStore,
    active_trip_id: Option<&str>,
    location: Option<GeoPoint>,
) -> ContextSnapshot {
    let Some(data) = store.snapshot().await else {
        return ContextSnapshot {
            location,
            ..Default::default()
        };
    };
    context_from(&data, active_trip_id, location)
}

pub fn context_from(
    data: &AppData,
    active_trip_id: Option<&str>,
    location: Option<GeoPoint>,
) -> ContextSnapshot {
    ContextSnapshot {
        itinerary: active_trip_id
            .and_then(|id| data.trip(id))
            .map(|t| t.itinerary.clone())
            .unwrap_or_default(),
        preferences: data.preferences.clone(),
        travelers: data.travelers.clone(),
        checklist: data.checklist.clone(),
        location,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::MockCloudStore;
    use crate::error::GatewayError;
    use crate::gateway::MockAiGateway;
    use crate::model::{SubscriptionTier, UserProfile};
    use crate::store::LocalCache;
    use async_trait::async_trait;
    use std::time::Duration;

    fn profile() -> UserProfile {
        UserProfile {
            id: "u1".into(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            avatar_url: None,
            is_authenticated: true,
            subscription_tier: SubscriptionTier::Free,
            biometric_enabled: false,
        }
    }

    async fn signed_in_store() -> Arc<UserDataStore> {
        let cache = Arc::new(LocalCache::open_in_memory().await.unwrap());
        let store = Arc::new(UserDataStore::new(
            cache,
            Arc::new(MockCloudStore::new()),
            false,
            Duration::from_millis(20),
        ));
        store.sign_in(profile()).await;
        store
    }

    #[tokio::test]
    async fn test_dispatch_success_clears_marker_and_replies_once() {
        let mut gateway = MockAiGateway::new();
        gateway
            .expect_chat()
            .times(1)
            .returning(|_, _, _| Ok("Canal cruise at 13:00 looks great.".to_string()));
        let dispatcher = ChatDispatcher::new(Arc::new(gateway));
        let store = signed_in_store().await;

        assert!(dispatcher
            .send_user_message(&store, "What should I do today?")
            .await
            .unwrap());
        let ran = dispatcher
            .dispatch_pending(&store, &ContextSnapshot::default())
            .await
            .unwrap();
        assert!(ran);

        let history = store.snapshot().await.unwrap().chat_history;
        assert_eq!(history.len(), 2);
        assert!(!history[0].pending_response);
        assert_eq!(history[1].role, ChatRole::Model);
        assert!(!history[1].is_system_alert);

        // Nothing left to dispatch.
        assert!(!dispatcher
            .dispatch_pending(&store, &ContextSnapshot::default())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_dispatch_failure_still_clears_marker_with_alert() {
        let mut gateway = MockAiGateway::new();
        gateway
            .expect_chat()
            .returning(|_, _, _| Err(GatewayError::Timeout));
        let dispatcher = ChatDispatcher::new(Arc::new(gateway));
        let store = signed_in_store().await;

        dispatcher
            .send_user_message(&store, "hello?")
            .await
            .unwrap();
        dispatcher
            .dispatch_pending(&store, &ContextSnapshot::default())
            .await
            .unwrap();

        let history = store.snapshot().await.unwrap().chat_history;
        assert_eq!(history.len(), 2);
        // Never left permanently awaiting, and exactly one alert reply.
        assert!(!history[0].pending_response);
        assert!(history[1].is_system_alert);
        assert!(history[1].text.contains("try again"));
    }

    #[tokio::test]
    async fn test_liveness_over_message_sequence() {
        let mut gateway = MockAiGateway::new();
        gateway
            .expect_chat()
            .times(3)
            .returning(|_, history, _| Ok(format!("reply #{}", history.len() / 2 + 1)));
        let dispatcher = ChatDispatcher::new(Arc::new(gateway));
        let store = signed_in_store().await;

        for text in ["one", "two", "three"] {
            dispatcher.send_user_message(&store, text).await.unwrap();
            dispatcher
                .dispatch_pending(&store, &ContextSnapshot::default())
                .await
                .unwrap();
        }

        let history = store.snapshot().await.unwrap().chat_history;
        assert_eq!(history.len(), 6);
        // Every user message has its marker cleared and is immediately
        // followed by exactly one model reply.
        for pair in history.chunks(2) {
            assert_eq!(pair[0].role, ChatRole::User);
            assert!(!pair[0].pending_response);
            assert_eq!(pair[1].role, ChatRole::Model);
        }
    }

    #[tokio::test]
    async fn test_empty_input_is_ignored() {
        let dispatcher = ChatDispatcher::new(Arc::new(MockAiGateway::new()));
        let store = signed_in_store().await;
        assert!(!dispatcher.send_user_message(&store, "   ").await.unwrap());
        assert!(store.snapshot().await.unwrap().chat_history.is_empty());
    }

    /// Gateway that parks until released, to exercise the overlap guard.
    struct BlockingGateway {
        started: tokio::sync::Notify,
        release: tokio::sync::Notify,
    }

    #[async_trait]
    impl AiGateway for BlockingGateway {
        async fn chat(
            &self,
            _context: &ContextSnapshot,
            _history: &[ChatMessage],
            _message: &str,
        ) -> Result<String, GatewayError> {
            self.started.notify_one();
            self.release.notified().await;
            Ok("slow reply".to_string())
        }

        async fn generate_itinerary(
            &self,
            _request: &crate::gateway::TripProposalRequest,
        ) -> Result<crate::gateway::TripProposal, GatewayError> {
            unreachable!("not used in this test")
        }

        async fn extract_document(
            &self,
            _mime: &str,
            _image: &[u8],
        ) -> Result<crate::gateway::DocumentExtraction, GatewayError> {
            unreachable!("not used in this test")
        }
    }

    #[tokio::test]
    async fn test_processing_flag_prevents_overlapping_dispatch() {
        let gateway = Arc::new(BlockingGateway {
            started: tokio::sync::Notify::new(),
            release: tokio::sync::Notify::new(),
        });
        let dispatcher = Arc::new(ChatDispatcher::new(gateway.clone()));
        let store = signed_in_store().await;

        dispatcher.send_user_message(&store, "slow one").await.unwrap();

        let task = {
            let dispatcher = Arc::clone(&dispatcher);
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                dispatcher
                    .dispatch_pending(&store, &ContextSnapshot::default())
                    .await
                    .unwrap()
            })
        };
        gateway.started.notified().await;

        // Second observation while the first is in flight: no second dispatch.
        assert!(dispatcher.is_processing());
        assert!(!dispatcher
            .dispatch_pending(&store, &ContextSnapshot::default())
            .await
            .unwrap());

        gateway.release.notify_one();
        assert!(task.await.unwrap());

        let history = store.snapshot().await.unwrap().chat_history;
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].text, "slow reply");
    }

    #[tokio::test]
    async fn test_stale_reply_dropped_after_sign_out() {
        let gateway = Arc::new(BlockingGateway {
            started: tokio::sync::Notify::new(),
            release: tokio::sync::Notify::new(),
        });
        let dispatcher = Arc::new(ChatDispatcher::new(gateway.clone()));
        let store = signed_in_store().await;

        dispatcher.send_user_message(&store, "going away").await.unwrap();
        let task = {
            let dispatcher = Arc::clone(&dispatcher);
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                dispatcher
                    .dispatch_pending(&store, &ContextSnapshot::default())
                    .await
                    .unwrap()
            })
        };
        gateway.started.notified().await;

        store.sign_out().await;
        gateway.release.notify_one();

        // The completion arrives after sign-out and is dropped, not applied.
        assert!(!task.await.unwrap());
        assert!(store.snapshot().await.is_none());
        assert!(!dispatcher.is_processing());
    }

    #[test]
    fn test_swap_request_is_pending_user_message() {
        let item = ItineraryItem {
            id: "i1".into(),
            time: "13:00".into(),
            activity: "Canal Cruise".into(),
            location: "Prinsengracht".into(),
            category: crate::model::ItemCategory::Activity,
            notes: None,
            lat: None,
            lng: None,
        };
        let msg = ChatDispatcher::swap_request(&item, "Amsterdam, Netherlands");
        assert_eq!(msg.role, ChatRole::User);
        assert!(msg.pending_response);
        assert!(msg.text.contains("Canal Cruise"));
        assert!(msg.text.contains("Amsterdam"));
    }
}
