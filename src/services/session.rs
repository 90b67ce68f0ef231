// SPDX-License-Identifier: MIT

//! Session store: the single source of truth for "who is logged in".
//!
//! An explicit, injectable object (never a process-global) with an
//! `init()`/`dispose()` lifecycle. Every operation records failures into
//! the session state instead of leaving it in a half-written shape, and the
//! external auth-state subscription can drive transitions independently of
//! any local call (token refresh, cross-tab logout).

use std::sync::{Arc, Mutex, RwLock};

use chrono::Utc;
use serde_json::{Map, Value};
use tokio::task::JoinHandle;

use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::models::{PersistedSession, ProfilePatch, SessionPhase, SessionState, UserProfile};
use crate::services::connectivity::Connectivity;
use crate::services::with_timeout;
use crate::store::{keys, DocumentStore, Identity, IdentityProvider, LocalStore};

/// Registration form data.
#[derive(Debug, Clone)]
pub struct RegisterData {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// Process-wide authentication state holder. Cheap to clone; all clones
/// share one state.
#[derive(Clone)]
pub struct SessionStore {
    identity: Arc<dyn IdentityProvider>,
    remote: Option<Arc<dyn DocumentStore>>,
    local: LocalStore,
    connectivity: Connectivity,
    config: Arc<SyncConfig>,
    state: Arc<RwLock<SessionState>>,
    watcher: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl SessionStore {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        remote: Option<Arc<dyn DocumentStore>>,
        local: LocalStore,
        connectivity: Connectivity,
        config: Arc<SyncConfig>,
    ) -> Self {
        Self {
            identity,
            remote,
            local,
            connectivity,
            config,
            state: Arc::new(RwLock::new(SessionState::default())),
            watcher: Arc::new(Mutex::new(None)),
        }
    }

    /// Restore the persisted snapshot and subscribe to provider auth-state
    /// changes. Safe to call more than once; only the first call spawns the
    /// subscription task.
    pub fn init(&self) {
        {
            let mut state = self.write_state();
            if state.phase == SessionPhase::Uninitialized {
                state.phase = SessionPhase::Initializing;
                match self.local.get::<PersistedSession>(keys::SESSION) {
                    Ok(Some(snapshot)) => state.user = snapshot.user,
                    Ok(None) => {}
                    Err(e) => tracing::warn!(error = %e, "Failed to restore session snapshot"),
                }
            }
        }

        let mut watcher = self.watcher.lock().expect("watcher lock poisoned");
        if watcher.is_none() {
            let store = self.clone();
            let mut rx = self.identity.auth_state();
            *watcher = Some(tokio::spawn(async move {
                while rx.changed().await.is_ok() {
                    let identity = rx.borrow_and_update().clone();
                    store.handle_auth_change(identity).await;
                }
            }));
        }
    }

    /// Tear down the subscription and persist the final snapshot.
    pub fn dispose(&self) {
        if let Some(handle) = self.watcher.lock().expect("watcher lock poisoned").take() {
            handle.abort();
        }
        self.persist_snapshot();
    }

    /// Auth-state callback from the identity provider. Always marks the
    /// session initialized; never fails.
    pub async fn handle_auth_change(&self, identity: Option<Identity>) {
        match identity {
            Some(identity) => {
                let profile = match self.fetch_profile(&identity.uid).await {
                    Ok(profile) => Some(profile),
                    Err(e) => {
                        tracing::debug!(uid = %identity.uid, error = %e,
                            "Auth change without reachable profile; keeping prior snapshot");
                        None
                    }
                };

                let mut state = self.write_state();
                if let Some(profile) = profile {
                    state.user = Some(profile);
                } else if state.uid() != Some(identity.uid.as_str()) {
                    // Different account than the snapshot we were holding.
                    state.user = None;
                }
                state.phase = SessionPhase::Authenticated;
                state.is_initialized = true;
            }
            None => {
                let mut state = self.write_state();
                state.user = None;
                state.phase = SessionPhase::Anonymous;
                state.is_initialized = true;
            }
        }
        self.persist_snapshot();
    }

    /// Create an account and transition to `Authenticated` with a seed
    /// profile built from the form data. The profile document itself is
    /// persisted separately via `ProfileSyncService::create_profile`.
    pub async fn register(&self, data: RegisterData) -> Result<Identity> {
        self.begin_attempt();

        let created = with_timeout(
            self.config.remote_timeout,
            self.identity.create_account(&data.email, &data.password),
        )
        .await;

        let identity = match created {
            Ok(identity) => identity,
            Err(e) => return Err(self.fail_attempt(e)),
        };

        let seed = UserProfile::new(
            &identity.uid,
            &data.email,
            &data.first_name,
            &data.last_name,
            Utc::now(),
        );

        {
            let mut state = self.write_state();
            state.user = Some(seed);
            state.phase = SessionPhase::Authenticated;
            state.is_initialized = true;
            state.is_loading = false;
        }
        self.persist_snapshot();

        tracing::info!(uid = %identity.uid, "Registered new account");
        Ok(identity)
    }

    /// Sign in and load the full profile document. A missing or unreachable
    /// profile does not fail the login; the session falls back to the
    /// cached snapshot or a minimal profile built from the identity.
    pub async fn login(&self, email: &str, password: &str) -> Result<Identity> {
        self.begin_attempt();

        let signed_in = with_timeout(
            self.config.remote_timeout,
            self.identity.sign_in(email, password),
        )
        .await;

        let identity = match signed_in {
            Ok(identity) => identity,
            Err(e) => return Err(self.fail_attempt(e)),
        };

        let profile = match self.fetch_profile(&identity.uid).await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!(uid = %identity.uid, error = %e,
                    "Login without reachable profile document");
                UserProfile::new(&identity.uid, &identity.email, "", "", Utc::now())
            }
        };

        {
            let mut state = self.write_state();
            state.user = Some(profile);
            state.phase = SessionPhase::Authenticated;
            state.is_initialized = true;
            state.is_loading = false;
        }
        self.persist_snapshot();
        self.touch_last_active(&identity.uid).await;

        tracing::info!(uid = %identity.uid, "Logged in");
        Ok(identity)
    }

    /// Sign out. The local session is cleared even if the provider call
    /// fails; a stale provider session must not keep the UI logged in.
    pub async fn logout(&self) -> Result<()> {
        self.begin_attempt();

        let result = with_timeout(self.config.remote_timeout, self.identity.sign_out()).await;

        {
            let mut state = self.write_state();
            state.user = None;
            state.phase = SessionPhase::Anonymous;
            state.is_loading = false;
            if let Err(e) = &result {
                state.error = Some(e.to_string());
            }
        }
        self.persist_snapshot();

        tracing::info!("Logged out");
        result
    }

    /// Shallow-merge `patch` into the current user. No-op when anonymous.
    pub fn update_user_data(&self, patch: &ProfilePatch) {
        {
            let mut state = self.write_state();
            if !state.is_authenticated() {
                return;
            }
            if let Some(user) = state.user.as_mut() {
                patch.apply_to(user, Utc::now());
            }
        }
        self.persist_snapshot();
    }

    /// Replace the session's profile snapshot (called by the sync service
    /// after successful reads/writes for the current user).
    pub(crate) fn set_user(&self, profile: UserProfile) {
        {
            let mut state = self.write_state();
            state.user = Some(profile);
            state.phase = SessionPhase::Authenticated;
        }
        self.persist_snapshot();
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.read().expect("session state lock poisoned").clone()
    }

    pub fn current_uid(&self) -> Option<String> {
        self.state
            .read()
            .expect("session state lock poisoned")
            .uid()
            .map(str::to_string)
    }

    /// Explicit error dismissal.
    pub fn clear_error(&self) {
        self.write_state().error = None;
    }

    // ─── Internals ───────────────────────────────────────────────

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, SessionState> {
        self.state.write().expect("session state lock poisoned")
    }

    /// Start of a register/login/logout attempt: loading on, stale error
    /// cleared.
    fn begin_attempt(&self) {
        let mut state = self.write_state();
        state.is_loading = true;
        state.error = None;
    }

    /// Failed attempt: record the message, drop back to `Anonymous` if the
    /// session was ever initialized, otherwise stay where we were.
    fn fail_attempt(&self, e: SyncError) -> SyncError {
        let mut state = self.write_state();
        state.is_loading = false;
        state.error = Some(e.to_string());
        if state.is_initialized {
            state.phase = SessionPhase::Anonymous;
        }
        e
    }

    /// Load the profile document: remote when online, cache otherwise.
    async fn fetch_profile(&self, uid: &str) -> Result<UserProfile> {
        if !self.connectivity.is_online() {
            return self
                .local
                .get::<UserProfile>(&keys::profile_cache(uid))?
                .ok_or(SyncError::Offline);
        }

        let remote = self.remote.as_ref().ok_or(SyncError::NotInitialized)?;
        let doc = with_timeout(
            self.config.remote_timeout,
            remote.get_document(&self.config.users_collection, uid),
        )
        .await?
        .ok_or_else(|| SyncError::NotFound(uid.to_string()))?;

        let profile: UserProfile = serde_json::from_value(doc)
            .map_err(|e| SyncError::Invalid(format!("stored profile for {uid}: {e}")))?;

        if let Err(e) = self.local.put(&keys::profile_cache(uid), &profile) {
            tracing::warn!(uid, error = %e, "Failed to cache profile");
        }
        Ok(profile)
    }

    /// Refresh `lastActive` after login. Non-critical: failures are logged
    /// and swallowed, never failing the login itself.
    async fn touch_last_active(&self, uid: &str) {
        let Some(remote) = self.remote.as_ref() else {
            return;
        };
        if !self.connectivity.is_online() {
            return;
        }

        let mut patch = Map::new();
        patch.insert(
            "lastActive".to_string(),
            Value::from(Utc::now().to_rfc3339()),
        );

        let result = with_timeout(
            self.config.remote_timeout,
            remote.update_document(&self.config.users_collection, uid, patch),
        )
        .await;
        if let Err(e) = result {
            tracing::warn!(uid, error = %e, "Failed to refresh lastActive");
        }
    }

    /// Persist the `auth-storage` snapshot. Non-critical.
    fn persist_snapshot(&self) {
        let snapshot = PersistedSession {
            user: self.state.read().expect("session state lock poisoned").user.clone(),
        };
        if let Err(e) = self.local.put(keys::SESSION, &snapshot) {
            tracing::warn!(error = %e, "Failed to persist session snapshot");
        }
    }
}
