//! Session state model.

use serde::{Deserialize, Serialize};

use crate::models::UserProfile;

/// Coarse-grained lifecycle of the session.
///
/// `Uninitialized → Initializing → {Authenticated, Anonymous}`, with
/// `Authenticated ⇄ Anonymous` via login/logout or the external auth-state
/// subscription.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    #[default]
    Uninitialized,
    Initializing,
    Authenticated,
    Anonymous,
}

/// Snapshot of "who is logged in" plus async operation status.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub phase: SessionPhase,
    pub user: Option<UserProfile>,
    pub is_loading: bool,
    /// Last failure message; cleared on the next attempt or explicitly.
    pub error: Option<String>,
    /// True once the first auth-state callback has fired.
    pub is_initialized: bool,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        self.phase == SessionPhase::Authenticated
    }

    pub fn uid(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.uid.as_str())
    }
}

/// On-disk session snapshot, stored under the `auth-storage` key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistedSession {
    pub user: Option<UserProfile>,
}
