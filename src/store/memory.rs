// SPDX-License-Identifier: MIT

//! In-memory collaborator implementations.
//!
//! Used by the integration tests and by embedders that want a fully wired
//! core without a real backend. `MemoryStore` supports write-failure
//! injection so drain-retry behavior can be exercised deterministically.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{Map, Value};
use tokio::sync::watch;

use crate::error::{Result, SyncError};
use crate::store::{DocumentStore, Identity, IdentityProvider, IdentityUpdate};

/// In-memory document store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    docs: Arc<DashMap<(String, String), Value>>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with a transient remote error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(SyncError::remote("unavailable", "injected write failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        let key = (collection.to_string(), id.to_string());
        Ok(self.docs.get(&key).map(|doc| doc.value().clone()))
    }

    async fn set_document(&self, collection: &str, id: &str, data: Value) -> Result<()> {
        self.check_writable()?;
        self.docs
            .insert((collection.to_string(), id.to_string()), data);
        Ok(())
    }

    async fn update_document(
        &self,
        collection: &str,
        id: &str,
        patch: Map<String, Value>,
    ) -> Result<()> {
        self.check_writable()?;
        let key = (collection.to_string(), id.to_string());
        let mut entry = self
            .docs
            .get_mut(&key)
            .ok_or_else(|| SyncError::NotFound(id.to_string()))?;

        if let Value::Object(fields) = entry.value_mut() {
            fields.extend(patch);
        }
        Ok(())
    }
}

/// In-memory identity provider with a watch-based auth-state subscription.
pub struct MemoryIdentity {
    /// email -> (password, uid)
    accounts: DashMap<String, (String, String)>,
    /// uid -> last mirrored display fields
    mirrored: DashMap<String, IdentityUpdate>,
    next_id: AtomicU64,
    auth_tx: watch::Sender<Option<Identity>>,
}

impl Default for MemoryIdentity {
    fn default() -> Self {
        let (auth_tx, _) = watch::channel(None);
        Self {
            accounts: DashMap::new(),
            mirrored: DashMap::new(),
            next_id: AtomicU64::new(1),
            auth_tx,
        }
    }
}

impl MemoryIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last display fields mirrored for `uid`, if any.
    pub fn mirrored_for(&self, uid: &str) -> Option<IdentityUpdate> {
        self.mirrored.get(uid).map(|entry| entry.value().clone())
    }

    /// Simulate a provider-side session change (token refresh, cross-tab
    /// login/logout) without going through `sign_in`/`sign_out`.
    pub fn emit_auth_state(&self, identity: Option<Identity>) {
        let _ = self.auth_tx.send(identity);
    }

    fn current(&self) -> Option<Identity> {
        self.auth_tx.borrow().clone()
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentity {
    async fn create_account(&self, email: &str, password: &str) -> Result<Identity> {
        if self.accounts.contains_key(email) {
            return Err(SyncError::remote(
                "auth/email-already-in-use",
                format!("account exists for {email}"),
            ));
        }

        let uid = format!("uid-{:04}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.accounts
            .insert(email.to_string(), (password.to_string(), uid.clone()));

        let identity = Identity {
            uid,
            email: email.to_string(),
        };
        let _ = self.auth_tx.send(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity> {
        let entry = self.accounts.get(email).ok_or_else(|| {
            SyncError::remote("auth/invalid-credential", "unknown email or bad password")
        })?;
        let (stored_password, uid) = entry.value();
        if stored_password != password {
            return Err(SyncError::remote(
                "auth/invalid-credential",
                "unknown email or bad password",
            ));
        }

        let identity = Identity {
            uid: uid.clone(),
            email: email.to_string(),
        };
        let _ = self.auth_tx.send(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<()> {
        let _ = self.auth_tx.send(None);
        Ok(())
    }

    async fn update_identity_profile(&self, update: IdentityUpdate) -> Result<()> {
        let identity = self.current().ok_or(SyncError::NotAuthenticated)?;
        self.mirrored.insert(identity.uid, update);
        Ok(())
    }

    fn auth_state(&self) -> watch::Receiver<Option<Identity>> {
        self.auth_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_document_shallow_merge() {
        let store = MemoryStore::new();
        store
            .set_document("users", "u1", serde_json::json!({"bio": "old", "city": "SF"}))
            .await
            .unwrap();

        let mut patch = Map::new();
        patch.insert("bio".to_string(), Value::from("new"));
        store.update_document("users", "u1", patch).await.unwrap();

        let doc = store.get_document("users", "u1").await.unwrap().unwrap();
        assert_eq!(doc["bio"], "new");
        assert_eq!(doc["city"], "SF");
    }

    #[tokio::test]
    async fn test_update_missing_document_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .update_document("users", "ghost", Map::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_write_failure_injection() {
        let store = MemoryStore::new();
        store.fail_writes(true);

        let err = store
            .set_document("users", "u1", Value::Null)
            .await
            .unwrap_err();
        assert!(err.is_transient());

        store.fail_writes(false);
        store
            .set_document("users", "u1", Value::Null)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_registration_rejected() {
        let identity = MemoryIdentity::new();
        identity.create_account("a@b.com", "pw").await.unwrap();

        let err = identity.create_account("a@b.com", "pw2").await.unwrap_err();
        assert!(matches!(err, SyncError::Remote { code, .. } if code == "auth/email-already-in-use"));
    }

    #[tokio::test]
    async fn test_auth_state_follows_sign_in_and_out() {
        let identity = MemoryIdentity::new();
        let rx = identity.auth_state();
        assert!(rx.borrow().is_none());

        let id = identity.create_account("a@b.com", "pw").await.unwrap();
        assert_eq!(rx.borrow().as_ref(), Some(&id));

        identity.sign_out().await.unwrap();
        assert!(rx.borrow().is_none());
    }
}
