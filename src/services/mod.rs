// SPDX-License-Identifier: MIT

//! Services module - the synchronization logic layer.

pub mod connectivity;
pub mod profile;
pub mod queue;
pub mod session;

pub use connectivity::{Connectivity, ConnectivityObserver};
pub use profile::{DrainReport, ProfileFetch, ProfileSyncService, WriteOutcome};
pub use queue::OfflineQueue;
pub use session::{RegisterData, SessionStore};

use std::future::Future;
use std::time::Duration;

use crate::error::{Result, SyncError};

/// Bound a remote call by the configured timeout. A hung call becomes a
/// failure result instead of suspending the caller indefinitely.
pub(crate) async fn with_timeout<T>(
    limit: Duration,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| SyncError::Timeout(limit))?
}
