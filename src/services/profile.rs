// SPDX-License-Identifier: MIT

//! Profile sync service.
//!
//! Translates profile create/read/update intents into either an immediate
//! remote write or a queued pending mutation, transparently to the caller.
//! Callers distinguish three outcomes: applied, deferred (queued while
//! offline), or a structured error. Deferral is never reported as a plain
//! success and never as an error.

use std::sync::Arc;

use chrono::Utc;
use validator::Validate;

use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::models::{MutationKind, PendingMutation, ProfilePatch, UserProfile};
use crate::services::connectivity::Connectivity;
use crate::services::queue::OfflineQueue;
use crate::services::session::SessionStore;
use crate::services::with_timeout;
use crate::store::{keys, DocumentStore, IdentityProvider, IdentityUpdate, LocalStore};

/// How a write settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Persisted remotely and confirmed.
    Applied,
    /// Accepted while offline and queued for replay on reconnect. The UI
    /// must show a "will sync later" affordance, not a confirmed state.
    Deferred,
}

/// Result of a profile read.
#[derive(Debug, Clone)]
pub struct ProfileFetch {
    pub profile: UserProfile,
    /// True when served from the local cache (offline path).
    pub from_cache: bool,
}

/// Result of a drain pass over the offline queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Mutations replayed and cleared.
    pub replayed: usize,
    /// Mutations left queued for the next reconnect.
    pub remaining: usize,
}

/// Create/read/update operations for profile documents, aware of
/// connectivity state, with local-cache and pending-write fallbacks.
/// Cheap to clone.
#[derive(Clone)]
pub struct ProfileSyncService {
    identity: Arc<dyn IdentityProvider>,
    remote: Option<Arc<dyn DocumentStore>>,
    local: LocalStore,
    queue: OfflineQueue,
    connectivity: Connectivity,
    session: SessionStore,
    config: Arc<SyncConfig>,
}

impl ProfileSyncService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        remote: Option<Arc<dyn DocumentStore>>,
        local: LocalStore,
        queue: OfflineQueue,
        connectivity: Connectivity,
        session: SessionStore,
        config: Arc<SyncConfig>,
    ) -> Self {
        Self {
            identity,
            remote,
            local,
            queue,
            connectivity,
            session,
            config,
        }
    }

    pub fn queue(&self) -> &OfflineQueue {
        &self.queue
    }

    /// Create the current user's profile document.
    ///
    /// Offline: the patch is queued under the create slot and the call
    /// settles as [`WriteOutcome::Deferred`]. Online: if a document already
    /// exists for the uid this degrades to an update (idempotent create),
    /// otherwise a full document is built with the documented defaults.
    pub async fn create_profile(&self, patch: ProfilePatch) -> Result<WriteOutcome> {
        let uid = self.require_uid()?;
        self.require_remote()?;

        if !self.connectivity.is_online() {
            self.queue.enqueue(MutationKind::Create, &uid, patch)?;
            return Ok(WriteOutcome::Deferred);
        }

        self.write_online(&uid, &patch).await?;
        Ok(WriteOutcome::Applied)
    }

    /// Merge a partial update into the current user's profile document.
    ///
    /// Shallow merge: nested records such as `preferences` are replaced
    /// wholesale by whatever the patch supplies. A missing remote document
    /// degrades to a create (idempotent cross-call).
    pub async fn update_profile(&self, patch: ProfilePatch) -> Result<WriteOutcome> {
        let uid = self.require_uid()?;
        self.require_remote()?;

        if !self.connectivity.is_online() {
            self.queue.enqueue(MutationKind::Update, &uid, patch)?;
            return Ok(WriteOutcome::Deferred);
        }

        self.write_online(&uid, &patch).await?;
        Ok(WriteOutcome::Applied)
    }

    /// Fetch a profile document, `uid` defaulting to the current session.
    ///
    /// Offline the local cache is the only source; online the remote
    /// document is authoritative and unconditionally refreshes the cache.
    pub async fn get_profile(&self, uid: Option<&str>) -> Result<ProfileFetch> {
        let uid = match uid {
            Some(uid) => uid.to_string(),
            None => self.require_uid()?,
        };

        if !self.connectivity.is_online() {
            let cached = self
                .local
                .get::<UserProfile>(&keys::profile_cache(&uid))?
                .ok_or(SyncError::Offline)?;
            tracing::debug!(uid, "Profile served from local cache");
            return Ok(ProfileFetch {
                profile: cached,
                from_cache: true,
            });
        }

        let remote = self.require_remote()?;
        let doc = with_timeout(
            self.config.remote_timeout,
            remote.get_document(&self.config.users_collection, &uid),
        )
        .await?
        .ok_or_else(|| SyncError::NotFound(uid.clone()))?;

        let profile: UserProfile = serde_json::from_value(doc)
            .map_err(|e| SyncError::Invalid(format!("stored profile for {uid}: {e}")))?;

        // Unconditional overwrite: remote is authoritative over any stale
        // cache entry.
        self.local.put(&keys::profile_cache(&uid), &profile)?;
        if self.session.current_uid().as_deref() == Some(uid.as_str()) {
            self.session.set_user(profile.clone());
        }

        Ok(ProfileFetch {
            profile,
            from_cache: false,
        })
    }

    /// Replay pending mutations for `uid`, create slot before update slot.
    ///
    /// At-least-once: a successful replay clears its slot; a failed one
    /// leaves the slot untouched for the next reconnect. Transient remote
    /// failures get bounded backoff retries within this pass. Not atomic
    /// across kinds, which is safe because the pass is idempotent and
    /// re-entrant.
    pub async fn drain(&self, uid: &str) -> Result<DrainReport> {
        let mut report = DrainReport::default();

        for kind in MutationKind::ALL {
            let Some(pending) = self.queue.pending(kind, uid)? else {
                continue;
            };

            if !self.connectivity.is_online() {
                report.remaining += 1;
                continue;
            }

            match self.replay(&pending).await {
                Ok(()) => {
                    self.queue.remove(kind, uid)?;
                    report.replayed += 1;
                    tracing::info!(uid, ?kind, queued_at = %pending.queued_at,
                        "Replayed pending mutation");
                }
                Err(e) => {
                    report.remaining += 1;
                    tracing::warn!(uid, ?kind, error = %e,
                        "Replay failed; mutation stays queued");
                }
            }
        }

        Ok(report)
    }

    // ─── Internals ───────────────────────────────────────────────

    fn require_uid(&self) -> Result<String> {
        self.session.current_uid().ok_or(SyncError::NotAuthenticated)
    }

    fn require_remote(&self) -> Result<&Arc<dyn DocumentStore>> {
        self.remote.as_ref().ok_or(SyncError::NotInitialized)
    }

    /// The single online write path, serving create, update, and replay.
    ///
    /// Loads the existing document (or seeds a fresh one with creation
    /// defaults), applies the shallow merge, stores the full document, and
    /// maintains the downstream mirrors: identity record, local cache,
    /// session snapshot.
    async fn write_online(&self, uid: &str, patch: &ProfilePatch) -> Result<()> {
        patch
            .validate()
            .map_err(|e| SyncError::Invalid(e.to_string()))?;

        let remote = self.require_remote()?;
        let now = Utc::now();

        let existing = with_timeout(
            self.config.remote_timeout,
            remote.get_document(&self.config.users_collection, uid),
        )
        .await?;

        let (mut profile, creating) = match existing {
            Some(doc) => {
                let profile: UserProfile = serde_json::from_value(doc)
                    .map_err(|e| SyncError::Invalid(format!("stored profile for {uid}: {e}")))?;
                (profile, false)
            }
            None => (self.seed_profile(uid, patch, now), true),
        };

        let prev_display = profile.display_name.clone();
        let prev_photo = profile.photo_url.clone();
        patch.apply_to(&mut profile, now);

        let doc = serde_json::to_value(&profile)
            .map_err(|e| SyncError::Invalid(format!("encode profile for {uid}: {e}")))?;
        with_timeout(
            self.config.remote_timeout,
            remote.set_document(&self.config.users_collection, uid, doc),
        )
        .await?;

        if creating || profile.display_name != prev_display || profile.photo_url != prev_photo {
            self.mirror_identity(&profile).await;
        }

        self.local.put(&keys::profile_cache(uid), &profile)?;
        if self.session.current_uid().as_deref() == Some(uid) {
            self.session.set_user(profile.clone());
        }

        tracing::info!(uid, creating, "Profile write applied");
        Ok(())
    }

    /// Full document for a first-time create: session seed when it belongs
    /// to the same uid (it carries the registration names), otherwise the
    /// documented defaults.
    fn seed_profile(
        &self,
        uid: &str,
        patch: &ProfilePatch,
        now: chrono::DateTime<Utc>,
    ) -> UserProfile {
        match self.session.snapshot().user {
            Some(user) if user.uid == uid => user,
            _ => UserProfile::new(
                uid,
                patch.email.clone().unwrap_or_default(),
                "",
                "",
                now,
            ),
        }
    }

    /// Mirror `displayName`/`photoURL` onto the identity record.
    /// Non-critical: failures are logged and swallowed.
    async fn mirror_identity(&self, profile: &UserProfile) {
        let update = IdentityUpdate {
            display_name: Some(profile.display_name.clone()),
            photo_url: profile.photo_url.clone(),
        };
        let result = with_timeout(
            self.config.remote_timeout,
            self.identity.update_identity_profile(update),
        )
        .await;
        if let Err(e) = result {
            tracing::warn!(uid = %profile.uid, error = %e,
                "Failed to mirror display fields onto identity record");
        }
    }

    /// Replay one queued mutation with bounded backoff on transient
    /// failures. Terminal failures and offline transitions abort the pass;
    /// the caller leaves the slot queued either way.
    async fn replay(&self, pending: &PendingMutation) -> Result<()> {
        let attempts = self.config.drain_retry_attempts.max(1);
        let mut backoff = self.config.drain_retry_backoff;

        for attempt in 1..=attempts {
            match self.write_online(&pending.uid, &pending.patch).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_transient() && attempt < attempts && self.connectivity.is_online() =>
                {
                    tracing::debug!(uid = %pending.uid, attempt, error = %e,
                        "Transient replay failure; backing off");
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
                Err(e) => return Err(e),
            }
        }
        unreachable!("replay loop always returns");
    }
}
