// SPDX-License-Identifier: MIT

//! Data models for the synchronization core.

pub mod mutation;
pub mod profile;
pub mod session;

pub use mutation::{MutationKind, PendingMutation};
pub use profile::{
    AccountStatus, AccountType, AgeRange, InterestedIn, Preferences, ProfilePatch, UserProfile,
};
pub use session::{PersistedSession, SessionPhase, SessionState};
