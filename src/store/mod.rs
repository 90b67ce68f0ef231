// SPDX-License-Identifier: MIT

//! Storage layer: external collaborator traits plus the persisted local
//! key-value store.
//!
//! The remote document store and the identity provider are platform
//! services; the core only ever talks to them through the traits below so
//! that everything is injectable and testable in isolation.

pub mod firestore;
pub mod local;
pub mod memory;

pub use firestore::FirestoreStore;
pub use local::LocalStore;
pub use memory::{MemoryIdentity, MemoryStore};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::watch;

use crate::error::Result;

/// Local-store key layout.
pub mod keys {
    /// Persisted session snapshot.
    pub const SESSION: &str = "auth-storage";

    /// Last-known-good profile snapshot (read cache).
    pub fn profile_cache(uid: &str) -> String {
        format!("user_profile_{uid}")
    }
}

/// Remote document store collaborator (Firestore in production).
///
/// Documents are opaque JSON objects at this boundary; typed mapping lives
/// in the sync service.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document, `None` if absent.
    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Value>>;

    /// Full overwrite (creates the document if absent).
    async fn set_document(&self, collection: &str, id: &str, data: Value) -> Result<()>;

    /// Shallow merge of the given top-level fields into the document.
    async fn update_document(&self, collection: &str, id: &str, patch: Map<String, Value>)
        -> Result<()>;
}

/// Authenticated identity as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    pub email: String,
}

/// Mirror of profile display fields kept on the identity record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityUpdate {
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

/// Identity provider collaborator (Firebase Auth in production).
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn create_account(&self, email: &str, password: &str) -> Result<Identity>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity>;

    async fn sign_out(&self) -> Result<()>;

    /// Mirror `display_name`/`photo_url` onto the provider's own record for
    /// the currently signed-in identity.
    async fn update_identity_profile(&self, update: IdentityUpdate) -> Result<()>;

    /// Auth-state subscription. Fires on every provider-side session change
    /// (sign-in, sign-out, token refresh, cross-tab logout). Dropping the
    /// receiver unsubscribes.
    fn auth_state(&self) -> watch::Receiver<Option<Identity>>;
}
