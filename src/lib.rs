// SPDX-License-Identifier: MIT

//! Ember-Sync: offline-aware profile synchronization for the Ember dating
//! app.
//!
//! This crate is the client-side core between the UI and the backend
//! platform: session state, profile create/read/update with an offline
//! queue, connectivity-driven replay, and the optimistic-mutation contract
//! UI controllers follow. Remote persistence and identity are external
//! collaborators injected as trait objects; a Firestore-backed document
//! store is provided for production.

pub mod config;
pub mod error;
pub mod models;
pub mod optimistic;
pub mod services;
pub mod store;

use std::sync::Arc;

use config::SyncConfig;
use error::Result;
use services::{
    Connectivity, ConnectivityObserver, OfflineQueue, ProfileSyncService, SessionStore,
};
use store::{DocumentStore, IdentityProvider, LocalStore};

/// Fully wired synchronization context.
///
/// The explicit dependency-injection root: one instance per process (or per
/// test), passed to whatever needs it. Nothing in this crate is a
/// module-level singleton. `init()` restores persisted state and starts the
/// auth subscription and connectivity handling; `dispose()` tears both
/// down.
pub struct SyncContext {
    pub config: Arc<SyncConfig>,
    pub local: LocalStore,
    pub connectivity: Connectivity,
    pub session: SessionStore,
    pub profiles: ProfileSyncService,
    pub observer: Arc<ConnectivityObserver>,
}

impl SyncContext {
    /// Wire a context against a remote document store and identity
    /// provider.
    pub fn new(
        config: SyncConfig,
        remote: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Result<Self> {
        Self::build(config, Some(remote), identity)
    }

    /// Context without a remote document store: every network operation
    /// fails immediately with `NotInitialized`. Useful for harnesses and
    /// for UIs that must render before the backend is configured.
    pub fn detached(config: SyncConfig, identity: Arc<dyn IdentityProvider>) -> Result<Self> {
        Self::build(config, None, identity)
    }

    fn build(
        config: SyncConfig,
        remote: Option<Arc<dyn DocumentStore>>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Result<Self> {
        let config = Arc::new(config);
        let local = match &config.storage_dir {
            Some(dir) => LocalStore::new(dir)?,
            None => LocalStore::in_memory(),
        };
        let connectivity = Connectivity::new();

        let session = SessionStore::new(
            identity.clone(),
            remote.clone(),
            local.clone(),
            connectivity.clone(),
            config.clone(),
        );
        let queue = OfflineQueue::new(local.clone());
        let profiles = ProfileSyncService::new(
            identity,
            remote,
            local.clone(),
            queue,
            connectivity.clone(),
            session.clone(),
            config.clone(),
        );
        let observer = Arc::new(ConnectivityObserver::new(
            connectivity.clone(),
            profiles.clone(),
            session.clone(),
        ));

        Ok(Self {
            config,
            local,
            connectivity,
            session,
            profiles,
            observer,
        })
    }

    /// Restore persisted session state, subscribe to auth changes, and
    /// start handling connectivity transitions. Idempotent.
    pub fn init(&self) {
        self.session.init();
        self.observer.bind();
    }

    /// Stop handling external events and persist final state.
    pub fn dispose(&self) {
        self.observer.unbind();
        self.session.dispose();
    }
}
