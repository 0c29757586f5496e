pub mod auth;
pub mod chat;
pub mod cloud;
pub mod config;
pub mod derive;
pub mod error;
pub mod export;
pub mod gateway;
pub mod itinerary;
pub mod model;
pub mod store;
pub mod vault;

use std::sync::Arc;
use std::time::Duration;

pub use config::Settings;
pub use error::AppError;
pub type Result<T> = std::result::Result<T, AppError>;

pub use chat::ChatDispatcher;
pub use cloud::{CloudStore, DisabledCloud, SupabaseClient};
pub use gateway::{AiGateway, GeminiClient};
pub use model::{AppData, UserProfile};
pub use store::{LocalCache, UserDataStore};
pub use vault::DocumentIntake;

/// Install the default tracing subscriber for binaries embedding the core.
/// `RUST_LOG`-style filtering, "info" when unset. Safe to call twice.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

/// Application state shared across all components
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub store: Arc<UserDataStore>,
    pub gateway: Arc<dyn AiGateway>,
    pub dispatcher: Arc<ChatDispatcher>,
    pub intake: Arc<DocumentIntake>,
}

impl AppState {
    pub async fn new(config: Settings) -> Result<Self> {
        let cache = Arc::new(LocalCache::open(&config.cache.path).await?);

        let cloud_enabled = config.cloud_configured();
        let cloud: Arc<dyn CloudStore> = if cloud_enabled {
            Arc::new(SupabaseClient::from_config(&config.cloud)?)
        } else {
            Arc::new(DisabledCloud)
        };

        let gateway: Arc<dyn AiGateway> = Arc::new(GeminiClient::from_config(&config.gateway)?);

        let store = Arc::new(UserDataStore::new(
            cache,
            Arc::clone(&cloud),
            cloud_enabled,
            Duration::from_millis(config.sync.debounce_ms),
        ));
        let dispatcher = Arc::new(ChatDispatcher::new(Arc::clone(&gateway)));
        let intake = Arc::new(DocumentIntake::new(
            Arc::clone(&gateway),
            cloud,
            cloud_enabled,
            &config.vault,
        ));

        Ok(Self {
            config: Arc::new(config),
            store,
            gateway,
            dispatcher,
            intake,
        })
    }

    pub async fn shutdown(&self) -> Result<()> {
        // Flush any pending debounced save before the process exits.
        self.store.flush().await;
        Ok(())
    }
}
