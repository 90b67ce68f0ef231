// SPDX-License-Identifier: MIT

use std::sync::Arc;
use std::time::Duration;

use ember_sync::config::SyncConfig;
use ember_sync::store::{MemoryIdentity, MemoryStore};
use ember_sync::SyncContext;

/// Check if the Firestore emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Fully wired in-memory context plus handles to its collaborators.
pub struct TestHarness {
    pub ctx: SyncContext,
    pub remote: MemoryStore,
    pub identity: Arc<MemoryIdentity>,
}

/// Config tuned for fast tests: short timeouts, two replay attempts with
/// millisecond backoff.
#[allow(dead_code)]
pub fn test_config() -> SyncConfig {
    SyncConfig {
        remote_timeout: Duration::from_secs(2),
        drain_retry_attempts: 2,
        drain_retry_backoff: Duration::from_millis(1),
        ..Default::default()
    }
}

/// Initialized context over fresh in-memory collaborators.
#[allow(dead_code)]
pub fn harness() -> TestHarness {
    harness_with(test_config(), MemoryStore::new(), Arc::new(MemoryIdentity::new()))
}

/// Initialized context over the given collaborators (share them across
/// harnesses to simulate multiple devices on one account).
#[allow(dead_code)]
pub fn harness_with(
    config: SyncConfig,
    remote: MemoryStore,
    identity: Arc<MemoryIdentity>,
) -> TestHarness {
    init_tracing();

    let ctx = SyncContext::new(config, Arc::new(remote.clone()), identity.clone())
        .expect("context should build");
    ctx.init();

    TestHarness {
        ctx,
        remote,
        identity,
    }
}

#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ember_sync=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

/// Poll until `check` passes or the deadline expires; async session updates
/// (the auth-state watcher) land on a background task.
#[allow(dead_code)]
pub async fn wait_for(mut check: impl FnMut() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached within deadline");
}
