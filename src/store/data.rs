//! The user-data store: canonical owner of the in-memory AppData aggregate.
//!
//! Every mutation flows through [`UserDataStore::mutate`], which applies the
//! change under the lock and (re)schedules a debounced save. The save always
//! writes the local cache and additionally upserts to the cloud store when
//! sync is enabled and the remote session identity matches the signing email.
//! Load runs once per login: cloud first when a matching session exists,
//! local cache otherwise, seeded defaults when neither has data.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::cloud::CloudStore;
use crate::error::AppError;
use crate::model::{AppData, UserProfile};
use crate::store::{LocalCache, SessionStore};

#[derive(Clone)]
struct UserState {
    profile: UserProfile,
    data: AppData,
}

type SharedState = Arc<RwLock<Option<UserState>>>;

pub struct UserDataStore {
    cache: Arc<LocalCache>,
    sessions: SessionStore,
    cloud: Arc<dyn CloudStore>,
    cloud_enabled: bool,
    debounce: Duration,
    state: SharedState,
    /// The pending debounce timer. Cancelled and restarted on every change:
    /// last-write-wins scheduling, never a queue.
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl UserDataStore {
    pub fn new(
        cache: Arc<LocalCache>,
        cloud: Arc<dyn CloudStore>,
        cloud_enabled: bool,
        debounce: Duration,
    ) -> Self {
        Self {
            sessions: SessionStore::new(Arc::clone(&cache)),
            cache,
            cloud,
            cloud_enabled,
            debounce,
            state: Arc::new(RwLock::new(None)),
            pending: Mutex::new(None),
        }
    }

    /// Sign a user in: persist the session record, run the one-shot load, and
    /// seed the in-memory aggregate. Returns the loaded (or seeded) data.
    pub async fn sign_in(&self, profile: UserProfile) -> AppData {
        if let Err(e) = self.sessions.save(&profile).await {
            warn!(error = %e, "failed to persist session record");
        }
        let data = self.load_for(&profile).await;
        *self.state.write().await = Some(UserState {
            profile,
            data: data.clone(),
        });
        data
    }

    /// Silent session restore: if a session record survives from a previous
    /// run, sign that user back in without re-authentication.
    pub async fn restore_session(&self) -> Option<UserProfile> {
        let profile = match self.sessions.restore().await {
            Ok(p) => p?,
            Err(e) => {
                warn!(error = %e, "session restore failed");
                return None;
            }
        };
        self.sign_in(profile.clone()).await;
        Some(profile)
    }

    /// Sign out: cancel any pending save (it must not fire afterwards),
    /// delete the session record, drop in-memory state. Durable user data
    /// stays untouched.
    pub async fn sign_out(&self) {
        self.cancel_pending();
        if let Err(e) = self.sessions.clear().await {
            warn!(error = %e, "failed to clear session record");
        }
        *self.state.write().await = None;
    }

    /// Apply a mutation to the canonical aggregate and schedule the debounced
    /// save. The closure runs under the write lock, so marker-clearing plus
    /// reply-append style updates are a single atomic transition for readers.
    pub async fn mutate<F, R>(&self, f: F) -> Result<R, AppError>
    where
        F: FnOnce(&mut AppData) -> R,
    {
        let result = {
            let mut guard = self.state.write().await;
            let state = guard
                .as_mut()
                .ok_or_else(|| AppError::ValidationError("no signed-in user".into()))?;
            f(&mut state.data)
        };
        self.schedule_save();
        Ok(result)
    }

    /// Read access for UI-facing components: a clone, never ownership.
    pub async fn snapshot(&self) -> Option<AppData> {
        self.state.read().await.as_ref().map(|s| s.data.clone())
    }

    pub async fn current_profile(&self) -> Option<UserProfile> {
        self.state.read().await.as_ref().map(|s| s.profile.clone())
    }

    /// Force any pending save to run now.
    pub async fn flush(&self) {
        self.cancel_pending();
        Self::persist(
            &self.cache,
            self.cloud.as_ref(),
            self.cloud_enabled,
            &self.state,
        )
        .await;
    }

    fn cancel_pending(&self) {
        let mut pending = self.pending.lock().expect("pending-save lock");
        if let Some(handle) = pending.take() {
            handle.abort();
        }
    }

    fn schedule_save(&self) {
        let mut pending = self.pending.lock().expect("pending-save lock");
        if let Some(handle) = pending.take() {
            handle.abort();
        }
        let cache = Arc::clone(&self.cache);
        let cloud = Arc::clone(&self.cloud);
        let cloud_enabled = self.cloud_enabled;
        let state = Arc::clone(&self.state);
        let debounce = self.debounce;
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            Self::persist(&cache, cloud.as_ref(), cloud_enabled, &state).await;
        }));
    }

    /// Serialize the latest in-memory aggregate, read at fire time, not a
    /// snapshot captured when the timer was scheduled.
    async fn persist(
        cache: &LocalCache,
        cloud: &dyn CloudStore,
        cloud_enabled: bool,
        state: &RwLock<Option<UserState>>,
    ) {
        let snapshot = state.read().await.clone();
        let Some(state) = snapshot else {
            return;
        };
        let email = state.profile.email.as_str();

        if let Err(e) = cache.save_user_data(email, &state.data).await {
            // Never let a cache failure crash the save pipeline.
            error!(error = %e, email, "local cache write failed");
        }

        if !cloud_enabled {
            return;
        }
        match cloud.session().await {
            Ok(Some(session)) if session.email == email => {
                if let Err(e) = cloud.upsert_user_data(email, &state.data).await {
                    warn!(error = %e, email, "remote sync failed; local cache remains authoritative");
                }
            }
            Ok(Some(session)) => {
                debug!(remote = %session.email, email, "remote identity mismatch; skipping remote write");
            }
            Ok(None) => debug!(email, "no remote session; skipping remote write"),
            Err(e) => warn!(error = %e, "remote session check failed; skipping remote write"),
        }
    }

    async fn load_for(&self, profile: &UserProfile) -> AppData {
        let email = profile.email.as_str();

        if self.cloud_enabled {
            match self.cloud.session().await {
                Ok(Some(session)) if session.email == email => {
                    match self.cloud.fetch_user_data(email).await {
                        Ok(Some(remote)) => {
                            if let Err(e) = self.cache.save_user_data(email, &remote).await {
                                warn!(error = %e, "failed to mirror remote data into local cache");
                            }
                            info!(email, "loaded user data from cloud");
                            return remote;
                        }
                        Ok(None) => debug!(email, "no remote row; falling back to local cache"),
                        Err(e) => warn!(error = %e, "remote load failed; falling back to local cache"),
                    }
                }
                Ok(Some(_)) => debug!(email, "remote identity mismatch; using local cache"),
                Ok(None) => debug!(email, "no remote session; using local cache"),
                Err(e) => warn!(error = %e, "remote session check failed; using local cache"),
            }
        }

        match self.cache.load_user_data(email).await {
            Ok(Some(data)) => {
                info!(email, "loaded user data from local cache");
                data
            }
            Ok(None) => {
                info!(email, "no saved data; seeding defaults");
                AppData::seeded_for(profile)
            }
            Err(e) => {
                error!(error = %e, email, "local cache read failed; seeding defaults");
                AppData::seeded_for(profile)
            }
        }
    }
}
