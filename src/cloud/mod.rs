//! Cloud store collaborator contract.
//!
//! Row-per-user persistence of the AppData aggregate keyed by email, a binary
//! object store for document images, and the auth sub-interface that exposes
//! the current remote session identity. The concrete client lives in
//! [`supabase`]; [`CloudSync::Disabled`] stands in when credentials are
//! absent so the save/load pipeline never special-cases configuration.

mod supabase;

pub use supabase::SupabaseClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CloudError;
use crate::model::AppData;

/// Identity of the authenticated remote session, if any.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudSession {
    pub email: String,
    pub user_id: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CloudStore: Send + Sync {
    /// Current remote session identity. `Ok(None)` when signed out.
    async fn session(&self) -> Result<Option<CloudSession>, CloudError>;

    /// Fetch the aggregate row for `email`. `Ok(None)` when no row exists.
    async fn fetch_user_data(&self, email: &str) -> Result<Option<AppData>, CloudError>;

    /// Upsert the full aggregate row for `email`.
    async fn upsert_user_data(&self, email: &str, data: &AppData) -> Result<(), CloudError>;

    /// Store a binary object and return a retrievable reference.
    async fn upload_object(
        &self,
        path: &str,
        mime: &str,
        bytes: Vec<u8>,
    ) -> Result<String, CloudError>;

    /// OAuth sign-in entry point: the URL the caller should open.
    fn sign_in_url(&self, redirect_to: &str) -> Result<String, CloudError>;
}

/// Cloud sync switch: a configured client, or a null implementation whose
/// every call reports `NotConfigured`/absence.
pub struct DisabledCloud;

#[async_trait]
impl CloudStore for DisabledCloud {
    async fn session(&self) -> Result<Option<CloudSession>, CloudError> {
        Ok(None)
    }

    async fn fetch_user_data(&self, _email: &str) -> Result<Option<AppData>, CloudError> {
        Err(CloudError::NotConfigured)
    }

    async fn upsert_user_data(&self, _email: &str, _data: &AppData) -> Result<(), CloudError> {
        Err(CloudError::NotConfigured)
    }

    async fn upload_object(
        &self,
        _path: &str,
        _mime: &str,
        _bytes: Vec<u8>,
    ) -> Result<String, CloudError> {
        Err(CloudError::NotConfigured)
    }

    fn sign_in_url(&self, _redirect_to: &str) -> Result<String, CloudError> {
        Err(CloudError::NotConfigured)
    }
}
