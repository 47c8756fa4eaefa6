//! Integration tests for the onboarding workflows.
//!
//! Drives a [`SessionContext`] through the quick and detailed onboarding
//! paths against in-memory collaborators, and checks what is persisted
//! locally and remotely at each step.

use std::sync::Arc;

use desire_core::onboarding::{LEGACY_FLAG_KEY, STEP_KEY};
use desire_core::store::{FileKeyValueStore, KeyValueStore, MemoryDocumentStore, MemoryKeyValueStore};
use desire_core::{Flow, OnboardingEntry, OnboardingStep, SessionContext, SessionError};

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

struct Harness {
    ctx: SessionContext,
    kv: Arc<MemoryKeyValueStore>,
    docs: Arc<MemoryDocumentStore>,
}

async fn signed_in(user_id: &str) -> Harness {
    let kv = Arc::new(MemoryKeyValueStore::new());
    let docs = Arc::new(MemoryDocumentStore::new());
    let ctx = SessionContext::new(kv.clone(), docs.clone());
    ctx.sign_in(user_id).await.expect("hydration should succeed");
    Harness { ctx, kv, docs }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn quick_path_reaches_main() {
    let h = signed_in("u1").await;
    assert_eq!(
        h.ctx.current_flow(),
        Flow::Onboarding(OnboardingEntry::Welcome)
    );

    let baker = h.ctx.choose_archetype("baker").await.unwrap();
    assert_eq!(
        h.ctx.current_flow(),
        Flow::Onboarding(OnboardingEntry::Checklist)
    );

    // The user unticks milk on the checklist.
    let selection: Vec<&str> = baker
        .ingredients
        .iter()
        .map(String::as_str)
        .filter(|i| *i != "milk")
        .collect();
    let saved = h.ctx.confirm_checklist(selection.as_slice()).await.unwrap();
    assert_eq!(saved.len(), 5);
    assert_eq!(
        h.ctx.current_flow(),
        Flow::Onboarding(OnboardingEntry::AdvancedSetup)
    );
    assert_eq!(h.kv.value(STEP_KEY).as_deref(), Some("pantry_complete"));

    let profile = h.docs.profile("u1").unwrap();
    assert_eq!(profile.onboarding_archetype.as_deref(), Some("The Baker"));
    assert!(profile.pantry_last_updated.is_some());

    h.ctx.finish_onboarding::<&str>(None).await.unwrap();
    assert_eq!(h.ctx.current_flow(), Flow::Main);
    assert_eq!(h.kv.value(STEP_KEY).as_deref(), Some("finished"));
    assert_eq!(h.docs.profile("u1").unwrap().onboarding_completed, Some(true));

    let snap = h.ctx.snapshot();
    assert!(snap.pantry.contains("yeast"));
    assert!(!snap.pantry.contains("milk"));
    assert_eq!(snap.session.consecutive_inactive_opens, 0);
}

#[tokio::test]
async fn detailed_setup_replaces_checklist_pantry() {
    let h = signed_in("u1").await;
    h.ctx.choose_archetype("ascetic").await.unwrap();
    h.ctx
        .confirm_checklist(&["rice", "beans", "salt"])
        .await
        .unwrap();

    h.ctx
        .finish_onboarding(Some(&["Rice", "Cumin", "Paprika"][..]))
        .await
        .unwrap();

    let items: Vec<String> = h.ctx.snapshot().pantry.iter().map(String::from).collect();
    assert_eq!(items, vec!["cumin", "paprika", "rice"]);
}

#[tokio::test]
async fn out_of_order_workflow_is_rejected_without_side_effects() {
    let h = signed_in("u1").await;
    let err = h
        .ctx
        .finish_onboarding(Some(&["salt"][..]))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SessionError::InvalidTransition {
            from: OnboardingStep::Unstarted,
            to: OnboardingStep::Finished
        }
    ));
    assert_eq!(h.docs.write_count(), 0);
    assert!(h.ctx.snapshot().pantry.is_empty());
}

#[tokio::test]
async fn partial_checklist_failure_keeps_step() {
    let h = signed_in("u1").await;
    h.ctx.choose_archetype("foundation").await.unwrap();
    h.docs.fail_item("garlic");

    let err = h
        .ctx
        .confirm_checklist(&["flour", "garlic", "eggs"])
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "Failed to save pantry");
    assert_eq!(h.ctx.onboarding.current(), OnboardingStep::ArchetypeSelected);
    assert!(h.ctx.snapshot().pantry.is_empty());

    // Upserts that succeeded are not rolled back.
    let remote = h.docs.pantry("u1");
    assert!(remote.contains("flour") && remote.contains("eggs"));
    assert!(!remote.contains("garlic"));
}

#[tokio::test]
async fn failed_profile_update_keeps_step() {
    let h = signed_in("u1").await;
    h.ctx.choose_archetype("health").await.unwrap();
    h.docs.fail_profile_writes(true);

    let err = h.ctx.confirm_checklist(&["quinoa"]).await.unwrap_err();
    assert!(matches!(err, SessionError::Remote { .. }));
    assert_eq!(h.ctx.onboarding.current(), OnboardingStep::ArchetypeSelected);
}

#[tokio::test]
async fn local_write_failure_keeps_step() {
    let h = signed_in("u1").await;
    h.kv.set_fail_writes(true);
    let err = h.ctx.choose_archetype("baker").await.unwrap_err();
    assert!(matches!(err, SessionError::Persist(_)));
    assert_eq!(h.ctx.onboarding.current(), OnboardingStep::Unstarted);
    assert_eq!(h.ctx.snapshot().session.onboarding_archetype, None);
}

#[tokio::test]
async fn workflows_require_identity() {
    let ctx = SessionContext::new(
        Arc::new(MemoryKeyValueStore::new()),
        Arc::new(MemoryDocumentStore::new()),
    );
    ctx.choose_archetype("baker").await.unwrap();
    let err = ctx.confirm_checklist(&["flour"]).await.unwrap_err();
    assert!(matches!(err, SessionError::NoIdentity));
}

#[tokio::test]
async fn progress_survives_restart_with_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let docs = Arc::new(MemoryDocumentStore::new());

    {
        let ctx = SessionContext::new(Arc::new(FileKeyValueStore::new(&path)), docs.clone());
        ctx.choose_archetype("baker").await.unwrap();
    }

    let ctx = SessionContext::new(Arc::new(FileKeyValueStore::new(&path)), docs);
    assert_eq!(
        ctx.onboarding.hydrate().await.unwrap(),
        OnboardingStep::ArchetypeSelected
    );
}

#[tokio::test]
async fn legacy_flag_is_read_but_not_written() {
    let kv = Arc::new(MemoryKeyValueStore::new());
    kv.set(LEGACY_FLAG_KEY, "true").await.unwrap();
    let ctx = SessionContext::new(kv.clone(), Arc::new(MemoryDocumentStore::new()));

    assert_eq!(ctx.onboarding.hydrate().await.unwrap(), OnboardingStep::Finished);
    assert_eq!(kv.value(STEP_KEY), None);

    ctx.sign_out().await;
    assert_eq!(kv.value(LEGACY_FLAG_KEY).as_deref(), Some("true"));
    assert_eq!(kv.value(STEP_KEY).as_deref(), Some("unstarted"));
}
