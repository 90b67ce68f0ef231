// SPDX-License-Identifier: MIT

mod common;

use std::sync::Arc;

use ember_sync::models::{PersistedSession, ProfilePatch, SessionPhase};
use ember_sync::services::RegisterData;
use ember_sync::store::{Identity, MemoryIdentity, MemoryStore};
use ember_sync::SyncContext;

fn noa() -> RegisterData {
    RegisterData {
        email: "noa@x.com".to_string(),
        password: "s3cret!".to_string(),
        first_name: "Noa".to_string(),
        last_name: "Berg".to_string(),
    }
}

#[tokio::test]
async fn test_register_transitions_to_authenticated() {
    common::init_tracing();
    let remote = MemoryStore::new();
    let identity = Arc::new(MemoryIdentity::new());
    let ctx = SyncContext::new(common::test_config(), Arc::new(remote), identity).unwrap();

    assert_eq!(ctx.session.snapshot().phase, SessionPhase::Uninitialized);
    ctx.init();
    assert_eq!(ctx.session.snapshot().phase, SessionPhase::Initializing);

    ctx.session.register(noa()).await.unwrap();

    let state = ctx.session.snapshot();
    assert_eq!(state.phase, SessionPhase::Authenticated);
    assert!(state.is_initialized);
    assert!(!state.is_loading);
    assert!(state.error.is_none());
    assert_eq!(state.user.as_ref().unwrap().display_name, "Noa Berg");
}

#[tokio::test]
async fn test_login_loads_profile_document() {
    let harness = common::harness();
    let identity = harness.ctx.session.register(noa()).await.unwrap();
    harness
        .ctx
        .profiles
        .create_profile(ProfilePatch {
            bio: Some("late nights, long hikes".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    harness.ctx.session.logout().await.unwrap();

    let logged_in = harness
        .ctx
        .session
        .login("noa@x.com", "s3cret!")
        .await
        .unwrap();
    assert_eq!(logged_in.uid, identity.uid);

    // The auth-state watcher may still be applying the logout/login events;
    // poll until the session settles on the logged-in profile.
    let session = harness.ctx.session.clone();
    common::wait_for(move || {
        let state = session.snapshot();
        state.phase == SessionPhase::Authenticated
            && state.user.as_ref().and_then(|u| u.bio.as_deref())
                == Some("late nights, long hikes")
    })
    .await;
}

#[tokio::test]
async fn test_failed_login_records_error_and_stays_anonymous() {
    let harness = common::harness();
    harness.ctx.session.register(noa()).await.unwrap();
    harness.ctx.session.logout().await.unwrap();

    let result = harness.ctx.session.login("noa@x.com", "wrong").await;
    assert!(result.is_err());

    let state = harness.ctx.session.snapshot();
    assert_eq!(state.phase, SessionPhase::Anonymous);
    assert!(!state.is_loading);
    assert!(state.error.is_some());
    assert!(state.user.is_none());

    // The error clears implicitly on the next attempt.
    harness.ctx.session.login("noa@x.com", "s3cret!").await.unwrap();
    assert!(harness.ctx.session.snapshot().error.is_none());
}

#[tokio::test]
async fn test_logout_clears_session_and_snapshot() {
    let harness = common::harness();
    harness.ctx.session.register(noa()).await.unwrap();

    harness.ctx.session.logout().await.unwrap();

    let state = harness.ctx.session.snapshot();
    assert_eq!(state.phase, SessionPhase::Anonymous);
    assert!(state.user.is_none());

    let persisted: PersistedSession = harness
        .ctx
        .local
        .get("auth-storage")
        .unwrap()
        .expect("snapshot should exist");
    assert!(persisted.user.is_none());
}

#[tokio::test]
async fn test_external_auth_change_drives_transitions() {
    let harness = common::harness();
    harness.ctx.session.register(noa()).await.unwrap();
    harness
        .ctx
        .profiles
        .create_profile(ProfilePatch::default())
        .await
        .unwrap();
    let uid = harness.ctx.session.current_uid().unwrap();

    // Cross-tab logout arrives through the provider subscription, not
    // through any local call.
    harness.identity.emit_auth_state(None);
    let session = harness.ctx.session.clone();
    common::wait_for(move || session.snapshot().phase == SessionPhase::Anonymous).await;
    assert!(harness.ctx.session.snapshot().user.is_none());

    // And a provider-side re-auth restores the profile.
    harness.identity.emit_auth_state(Some(Identity {
        uid: uid.clone(),
        email: "noa@x.com".to_string(),
    }));
    let session = harness.ctx.session.clone();
    common::wait_for(move || session.snapshot().phase == SessionPhase::Authenticated).await;
    assert_eq!(harness.ctx.session.current_uid().as_deref(), Some(uid.as_str()));
}

#[tokio::test]
async fn test_update_user_data_merges_when_authenticated() {
    let harness = common::harness();
    harness.ctx.session.register(noa()).await.unwrap();

    harness.ctx.session.update_user_data(&ProfilePatch {
        bio: Some("new bio".to_string()),
        ..Default::default()
    });

    let state = harness.ctx.session.snapshot();
    assert_eq!(state.user.as_ref().unwrap().bio.as_deref(), Some("new bio"));
    // Shallow merge: the name fields survive.
    assert_eq!(state.user.as_ref().unwrap().display_name, "Noa Berg");
}

#[tokio::test]
async fn test_update_user_data_is_a_no_op_when_anonymous() {
    let harness = common::harness();
    harness.ctx.session.register(noa()).await.unwrap();
    harness.ctx.session.logout().await.unwrap();

    harness.ctx.session.update_user_data(&ProfilePatch {
        bio: Some("ghost write".to_string()),
        ..Default::default()
    });

    assert!(harness.ctx.session.snapshot().user.is_none());
}

#[tokio::test]
async fn test_clear_error_dismisses_explicitly() {
    let harness = common::harness();
    let _ = harness.ctx.session.login("nobody@x.com", "pw").await;
    assert!(harness.ctx.session.snapshot().error.is_some());

    harness.ctx.session.clear_error();
    assert!(harness.ctx.session.snapshot().error.is_none());
}

#[tokio::test]
async fn test_persisted_session_restored_across_contexts() {
    common::init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let mut config = common::test_config();
    config.storage_dir = Some(dir.path().to_path_buf());

    let remote = MemoryStore::new();
    let identity = Arc::new(MemoryIdentity::new());

    let ctx = SyncContext::new(config.clone(), Arc::new(remote.clone()), identity.clone()).unwrap();
    ctx.init();
    ctx.session.register(noa()).await.unwrap();
    ctx.dispose();

    // A fresh process over the same storage primes the session from the
    // snapshot before any auth callback fires.
    let identity2 = Arc::new(MemoryIdentity::new());
    let ctx2 = SyncContext::new(config, Arc::new(remote), identity2).unwrap();
    ctx2.init();

    let state = ctx2.session.snapshot();
    assert_eq!(state.phase, SessionPhase::Initializing);
    assert!(!state.is_initialized);
    assert_eq!(state.user.as_ref().unwrap().display_name, "Noa Berg");
}
