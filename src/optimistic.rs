// SPDX-License-Identifier: MIT

//! Optimistic mutation helper for UI controllers.
//!
//! The contract every mutating screen follows: apply the change to local
//! view state synchronously, attempt to persist, revert on failure, and
//! surface offline deferral as a distinct "pending sync" state rather than
//! a confirmed one.

use std::future::Future;

use crate::error::Result;
use crate::services::profile::WriteOutcome;

/// User-visible status of an optimistic mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationStatus {
    /// Persisted remotely; the view state is confirmed.
    Confirmed,
    /// Queued while offline; the view should show a "will sync later"
    /// affordance until the queue drains.
    PendingSync,
}

/// Apply `mutate` to `view` immediately, then run `persist`.
///
/// On failure the view is reverted to its pre-mutation snapshot and the
/// error is returned for the controller to surface.
pub async fn mutate<T, F>(
    view: &mut T,
    mutate: impl FnOnce(&mut T),
    persist: F,
) -> Result<MutationStatus>
where
    T: Clone,
    F: Future<Output = Result<WriteOutcome>>,
{
    let snapshot = view.clone();
    mutate(view);

    match persist.await {
        Ok(WriteOutcome::Applied) => Ok(MutationStatus::Confirmed),
        Ok(WriteOutcome::Deferred) => Ok(MutationStatus::PendingSync),
        Err(e) => {
            *view = snapshot;
            Err(e)
        }
    }
}
