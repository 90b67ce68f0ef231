//! Deferred-write model for the offline queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::ProfilePatch;

/// Which profile operation a pending mutation replays through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationKind {
    Create,
    Update,
}

impl MutationKind {
    /// Replay order matters: a queued create must land before a queued
    /// update for the same uid.
    pub const ALL: [MutationKind; 2] = [MutationKind::Create, MutationKind::Update];

    fn as_str(&self) -> &'static str {
        match self {
            MutationKind::Create => "create",
            MutationKind::Update => "update",
        }
    }

    /// Deterministic local-store key for the `(kind, uid)` slot.
    pub fn storage_key(&self, uid: &str) -> String {
        format!("pending_profile_{}_{}", self.as_str(), uid)
    }
}

/// One deferred write: a patch that could not be applied because the device
/// was offline. At most one is retained per `(kind, uid)`; a newer attempt
/// overwrites the stored payload (latest wins, no history).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingMutation {
    pub kind: MutationKind,
    pub uid: String,
    pub patch: ProfilePatch,
    /// Creation time; used for last-writer-wins ordering when replayed.
    pub queued_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_keys_match_layout() {
        assert_eq!(
            MutationKind::Create.storage_key("u42"),
            "pending_profile_create_u42"
        );
        assert_eq!(
            MutationKind::Update.storage_key("u42"),
            "pending_profile_update_u42"
        );
    }

    #[test]
    fn test_replay_order_is_create_then_update() {
        assert_eq!(
            MutationKind::ALL,
            [MutationKind::Create, MutationKind::Update]
        );
    }
}
