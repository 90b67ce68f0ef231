// SPDX-License-Identifier: MIT

//! Connectivity state and the reconnect-driven replay trigger.
//!
//! The platform shell (browser bridge, mobile host) reports online/offline
//! transitions to a [`ConnectivityObserver`]; the shared [`Connectivity`]
//! flag is consulted by the sync service before every remote operation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::services::profile::ProfileSyncService;
use crate::services::session::SessionStore;

/// Shared online/offline flag. Cheap to clone; starts online.
#[derive(Clone)]
pub struct Connectivity {
    online: Arc<AtomicBool>,
}

impl Default for Connectivity {
    fn default() -> Self {
        Self {
            online: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl Connectivity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    pub(crate) fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

/// Hook fired after a reconnect so dependent views re-fetch their data.
pub type ReloadHook = Box<dyn Fn() + Send + Sync>;

/// Bridges platform online/offline signals into queue replay and view
/// reload triggers.
///
/// Binding is idempotent; an unbound observer ignores transitions so a
/// stale handle kept past logout cannot act on the wrong session.
pub struct ConnectivityObserver {
    connectivity: Connectivity,
    profiles: ProfileSyncService,
    session: SessionStore,
    bound: AtomicBool,
    reload_hooks: Mutex<Vec<ReloadHook>>,
}

impl ConnectivityObserver {
    pub fn new(
        connectivity: Connectivity,
        profiles: ProfileSyncService,
        session: SessionStore,
    ) -> Self {
        Self {
            connectivity,
            profiles,
            session,
            bound: AtomicBool::new(false),
            reload_hooks: Mutex::new(Vec::new()),
        }
    }

    /// Start handling transitions. Returns `false` if already bound.
    pub fn bind(&self) -> bool {
        !self.bound.swap(true, Ordering::SeqCst)
    }

    /// Stop handling transitions (logout, unmount).
    pub fn unbind(&self) {
        self.bound.store(false, Ordering::SeqCst);
    }

    pub fn is_bound(&self) -> bool {
        self.bound.load(Ordering::SeqCst)
    }

    /// Register a view-reload hook fired after every reconnect.
    pub fn on_reload(&self, hook: impl Fn() + Send + Sync + 'static) {
        self.reload_hooks
            .lock()
            .expect("reload hooks lock poisoned")
            .push(Box::new(hook));
    }

    /// Platform reported loss of connectivity.
    pub fn went_offline(&self) {
        if !self.is_bound() {
            return;
        }
        self.connectivity.set_online(false);
        tracing::info!("Connectivity lost; deferring writes to the offline queue");
    }

    /// Platform reported restored connectivity: drain the current user's
    /// pending mutations, refresh their profile, and tell views to reload.
    ///
    /// Failures are logged and left for the next reconnect event; this has
    /// no caller to surface errors to.
    pub async fn went_online(&self) {
        if !self.is_bound() {
            return;
        }
        self.connectivity.set_online(true);
        tracing::info!("Connectivity restored");

        if let Some(uid) = self.session.current_uid() {
            match self.profiles.drain(&uid).await {
                Ok(report) if report.remaining > 0 => {
                    tracing::warn!(
                        uid,
                        replayed = report.replayed,
                        remaining = report.remaining,
                        "Drain left pending mutations for the next reconnect"
                    );
                }
                Ok(report) => {
                    tracing::debug!(uid, replayed = report.replayed, "Drain complete");
                }
                Err(e) => {
                    tracing::warn!(uid, error = %e, "Drain failed");
                }
            }

            if let Err(e) = self.profiles.get_profile(Some(uid.as_str())).await {
                tracing::warn!(uid, error = %e, "Profile refresh after reconnect failed");
            }
        }

        let hooks = self
            .reload_hooks
            .lock()
            .expect("reload hooks lock poisoned");
        for hook in hooks.iter() {
            hook();
        }
    }
}
