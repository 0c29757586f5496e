//! Durable session record: exactly one signed-in user, independent of the
//! AppData aggregate. Written on login, deleted on logout, read once at
//! startup for silent restore.

use std::sync::Arc;

use tracing::info;

use crate::error::CacheError;
use crate::model::UserProfile;
use crate::store::LocalCache;

pub struct SessionStore {
    cache: Arc<LocalCache>,
}

impl SessionStore {
    pub fn new(cache: Arc<LocalCache>) -> Self {
        Self { cache }
    }

    pub async fn save(&self, profile: &UserProfile) -> Result<(), CacheError> {
        self.cache.save_session(profile).await
    }

    /// One-shot read at startup. Logout clears durable state, so a restored
    /// profile is always a previously authenticated one.
    pub async fn restore(&self) -> Result<Option<UserProfile>, CacheError> {
        let profile = self.cache.load_session().await?;
        if let Some(p) = &profile {
            info!(email = %p.email, "restoring session");
        }
        Ok(profile)
    }

    pub async fn clear(&self) -> Result<(), CacheError> {
        self.cache.clear_session().await
    }
}
