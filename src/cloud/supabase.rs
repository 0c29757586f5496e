use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};
use url::Url;

use crate::cloud::{CloudSession, CloudStore};
use crate::config::CloudConfig;
use crate::error::CloudError;
use crate::model::AppData;

/// Supabase-style REST client: `rest/v1` rows, `storage/v1` objects,
/// `auth/v1` session identity.
pub struct SupabaseClient {
    http: reqwest::Client,
    base: Url,
    anon_key: String,
    bucket: String,
    /// Access token of the signed-in remote user, when OAuth has completed.
    access_token: RwLock<Option<String>>,
}

const USER_DATA_TABLE: &str = "user_data";

impl SupabaseClient {
    pub fn from_config(config: &CloudConfig) -> Result<Self, CloudError> {
        if config.url.is_empty() || config.anon_key.is_empty() {
            return Err(CloudError::NotConfigured);
        }
        let base = Url::parse(&config.url)
            .map_err(|e| CloudError::ResponseError(format!("invalid cloud url: {e}")))?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(CloudError::from)?;

        Ok(Self {
            http,
            base,
            anon_key: config.anon_key.clone(),
            bucket: config.bucket.clone(),
            access_token: RwLock::new(None),
        })
    }

    /// Install the access token obtained from the OAuth redirect.
    pub fn set_access_token(&self, token: Option<String>) {
        *self.access_token.write().expect("token lock") = token;
    }

    fn bearer(&self) -> String {
        self.access_token
            .read()
            .expect("token lock")
            .clone()
            .unwrap_or_else(|| self.anon_key.clone())
    }

    fn endpoint(&self, path: &str) -> Result<Url, CloudError> {
        self.base
            .join(path)
            .map_err(|e| CloudError::ResponseError(format!("bad endpoint {path}: {e}")))
    }
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserDataRow {
    payload: AppData,
}

#[async_trait]
impl CloudStore for SupabaseClient {
    async fn session(&self) -> Result<Option<CloudSession>, CloudError> {
        let token = self.access_token.read().expect("token lock").clone();
        let Some(token) = token else {
            return Ok(None);
        };

        let resp = self
            .http
            .get(self.endpoint("/auth/v1/user")?)
            .header("apikey", &self.anon_key)
            .bearer_auth(&token)
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::UNAUTHORIZED {
            debug!("remote session token rejected");
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(CloudError::ResponseError(format!(
                "auth/v1/user returned {}",
                resp.status()
            )));
        }

        let user: AuthUser = resp.json().await?;
        match user.email {
            Some(email) => Ok(Some(CloudSession {
                email,
                user_id: user.id,
            })),
            None => Ok(None),
        }
    }

    async fn fetch_user_data(&self, email: &str) -> Result<Option<AppData>, CloudError> {
        let filter = format!("eq.{email}");
        let resp = self
            .http
            .get(self.endpoint(&format!("/rest/v1/{USER_DATA_TABLE}"))?)
            .query(&[("select", "payload"), ("email", filter.as_str())])
            .header("apikey", &self.anon_key)
            .bearer_auth(self.bearer())
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(CloudError::ResponseError(format!(
                "select returned {}",
                resp.status()
            )));
        }

        let mut rows: Vec<UserDataRow> = resp.json().await.map_err(|e| {
            CloudError::ResponseError(format!("undecodable user_data row: {e}"))
        })?;
        Ok(rows.pop().map(|r| r.payload))
    }

    async fn upsert_user_data(&self, email: &str, data: &AppData) -> Result<(), CloudError> {
        let body = json!([{ "email": email, "payload": data }]);
        let resp = self
            .http
            .post(self.endpoint(&format!("/rest/v1/{USER_DATA_TABLE}"))?)
            .header("apikey", &self.anon_key)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .bearer_auth(self.bearer())
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            warn!(status = %resp.status(), "user_data upsert rejected");
            return Err(CloudError::ResponseError(format!(
                "upsert returned {}",
                resp.status()
            )));
        }
        Ok(())
    }

    async fn upload_object(
        &self,
        path: &str,
        mime: &str,
        bytes: Vec<u8>,
    ) -> Result<String, CloudError> {
        let bucket = &self.bucket;
        let resp = self
            .http
            .post(self.endpoint(&format!("/storage/v1/object/{bucket}/{path}"))?)
            .header("apikey", &self.anon_key)
            .header("x-upsert", "true")
            .header(reqwest::header::CONTENT_TYPE, mime)
            .bearer_auth(self.bearer())
            .body(bytes)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(CloudError::ResponseError(format!(
                "object upload returned {}",
                resp.status()
            )));
        }

        Ok(self
            .endpoint(&format!("/storage/v1/object/public/{bucket}/{path}"))?
            .to_string())
    }

    fn sign_in_url(&self, redirect_to: &str) -> Result<String, CloudError> {
        let mut url = self.endpoint("/auth/v1/authorize")?;
        url.query_pairs_mut()
            .append_pair("provider", "google")
            .append_pair("redirect_to", redirect_to);
        Ok(url.to_string())
    }
}
