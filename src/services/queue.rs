// SPDX-License-Identifier: MIT

//! Offline queue: durable `(kind, uid)` slots for deferred writes.
//!
//! Pure storage. The queue never replays anything itself; replay goes
//! through the profile sync service (`ProfileSyncService::drain`), which is
//! the only component allowed to interpret a queued patch.

use chrono::Utc;

use crate::error::Result;
use crate::models::{MutationKind, PendingMutation, ProfilePatch};
use crate::store::LocalStore;

/// Per-user, per-operation-kind staging of mutations that could not be
/// applied synchronously. Cheap to clone.
#[derive(Clone)]
pub struct OfflineQueue {
    local: LocalStore,
}

impl OfflineQueue {
    pub fn new(local: LocalStore) -> Self {
        Self { local }
    }

    /// Stage a patch under the `(kind, uid)` slot, overwriting any prior
    /// pending entry of the same kind (latest attempt wins, no history).
    ///
    /// The patch is stored as-is; validation happens at replay time.
    pub fn enqueue(&self, kind: MutationKind, uid: &str, patch: ProfilePatch) -> Result<()> {
        let mutation = PendingMutation {
            kind,
            uid: uid.to_string(),
            patch,
            queued_at: Utc::now(),
        };
        self.local.put(&kind.storage_key(uid), &mutation)?;

        tracing::info!(uid, ?kind, "Queued pending mutation for later sync");
        Ok(())
    }

    /// Pending entry for the `(kind, uid)` slot, if any.
    pub fn pending(&self, kind: MutationKind, uid: &str) -> Result<Option<PendingMutation>> {
        self.local.get(&kind.storage_key(uid))
    }

    /// Clear the `(kind, uid)` slot after a successful replay.
    pub fn remove(&self, kind: MutationKind, uid: &str) -> Result<()> {
        self.local.remove(&kind.storage_key(uid))
    }

    /// Whether any kind has a pending entry for `uid`. Drives the
    /// "pending sync" affordance in the UI.
    pub fn has_pending(&self, uid: &str) -> bool {
        MutationKind::ALL.iter().any(|kind| {
            self.pending(*kind, uid)
                .map(|entry| entry.is_some())
                .unwrap_or(false)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue() -> OfflineQueue {
        OfflineQueue::new(LocalStore::in_memory())
    }

    #[test]
    fn test_latest_attempt_wins() {
        let queue = queue();

        let first = ProfilePatch {
            bio: Some("one".to_string()),
            ..Default::default()
        };
        let second = ProfilePatch {
            bio: Some("two".to_string()),
            ..Default::default()
        };

        queue.enqueue(MutationKind::Update, "u1", first).unwrap();
        queue.enqueue(MutationKind::Update, "u1", second).unwrap();

        let pending = queue.pending(MutationKind::Update, "u1").unwrap().unwrap();
        assert_eq!(pending.patch.bio.as_deref(), Some("two"));
    }

    #[test]
    fn test_kinds_and_users_are_independent_slots() {
        let queue = queue();
        let patch = ProfilePatch::default();

        queue.enqueue(MutationKind::Create, "u1", patch.clone()).unwrap();
        queue.enqueue(MutationKind::Update, "u2", patch).unwrap();

        assert!(queue.pending(MutationKind::Create, "u1").unwrap().is_some());
        assert!(queue.pending(MutationKind::Update, "u1").unwrap().is_none());
        assert!(queue.pending(MutationKind::Update, "u2").unwrap().is_some());
        assert!(queue.has_pending("u1"));
        assert!(!queue.has_pending("u3"));
    }

    #[test]
    fn test_remove_clears_slot() {
        let queue = queue();
        queue
            .enqueue(MutationKind::Update, "u1", ProfilePatch::default())
            .unwrap();

        queue.remove(MutationKind::Update, "u1").unwrap();
        assert!(!queue.has_pending("u1"));
        // Re-entrant removal is harmless.
        queue.remove(MutationKind::Update, "u1").unwrap();
    }
}
