//! End-to-end tests for the `desire` binary.
//!
//! Each test runs the built binary with `XDG_CONFIG_HOME` pointed at a temp
//! dir. Tests that touch the database use their own migrated database from
//! `desire-test-utils`.

use std::path::Path;
use std::process::Output;

use tokio::process::Command;

use desire_db::models::ProfileDocument;
use desire_db::queries::{pantry, profiles};
use desire_test_utils::TestDb;

async fn desire(config_home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_desire"))
        .args(args)
        .env("XDG_CONFIG_HOME", config_home)
        .env("RUST_LOG", "warn")
        .env_remove("DESIRE_DATABASE_URL")
        .env_remove("DESIRE_USER_ID")
        .output()
        .await
        .expect("failed to run desire binary")
}

/// Run `desire` against `url` as `user`.
async fn desire_as(config_home: &Path, url: &str, user: &str, args: &[&str]) -> Output {
    let mut full = vec!["--database-url", url, "--user", user];
    full.extend_from_slice(args);
    desire(config_home, &full).await
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[tokio::test]
async fn init_writes_config_once() {
    let home = tempfile::tempdir().unwrap();

    let out = desire(home.path(), &["init", "--db-url", "postgresql://h:5432/pantry"]).await;
    assert!(out.status.success(), "init failed: {}", stderr(&out));
    assert!(stdout(&out).contains("identity.user_id = "));

    let written = std::fs::read_to_string(home.path().join("desire/config.toml")).unwrap();
    assert!(written.contains("url = \"postgresql://h:5432/pantry\""));
    assert!(written.contains("[identity]"));

    let again = desire(home.path(), &["init"]).await;
    assert!(!again.status.success());
    assert!(stderr(&again).contains("already exists"));

    let forced = desire(home.path(), &["init", "--force"]).await;
    assert!(forced.status.success(), "forced init failed: {}", stderr(&forced));
}

#[tokio::test]
async fn archetypes_needs_no_database() {
    let home = tempfile::tempdir().unwrap();

    let out = desire(home.path(), &["archetypes"]).await;
    assert!(out.status.success());
    let text = stdout(&out);
    assert!(text.contains("The Baker"));
    assert!(text.contains("Categories:"));

    let out = desire(home.path(), &["archetypes", "--search", "yog"]).await;
    assert!(stdout(&out).contains("yogurt"));
}

#[tokio::test]
async fn session_commands_require_a_user() {
    let home = tempfile::tempdir().unwrap();
    let db = TestDb::create().await;
    let url = db.database_url().await;

    let out = desire(home.path(), &["--database-url", &url, "status"]).await;
    assert!(!out.status.success());
    assert!(stderr(&out).contains("no user id"), "stderr: {}", stderr(&out));

    db.teardown().await;
}

#[tokio::test]
async fn pantry_commands_write_through_to_database() {
    let home = tempfile::tempdir().unwrap();
    let db = TestDb::create().await;
    let url = db.database_url().await;

    let add = desire_as(home.path(), &url, "u1", &["pantry", "add", " Salt ", "Olive Oil"]).await;
    assert!(add.status.success(), "add failed: {}", stderr(&add));
    assert!(stdout(&add).contains("Added salt"));

    let names = pantry::list_item_names(db.pool(), "u1").await.unwrap();
    assert_eq!(names, vec!["olive oil", "salt"]);
    let profile = profiles::get_profile(db.pool(), "u1").await.unwrap().unwrap();
    assert!(profile.pantry_last_updated.is_some());

    let remove = desire_as(home.path(), &url, "u1", &["pantry", "remove", "salt"]).await;
    assert!(remove.status.success(), "remove failed: {}", stderr(&remove));

    let list = desire_as(home.path(), &url, "u1", &["pantry", "list"]).await;
    assert_eq!(stdout(&list), "  olive oil\n1 items\n");

    let compare =
        desire_as(home.path(), &url, "u1", &["pantry", "compare", "olive oil", "basil"]).await;
    assert!(stdout(&compare).contains("[ ] basil"));

    db.teardown().await;
}

#[tokio::test]
async fn onboard_then_status_shows_home() {
    let home = tempfile::tempdir().unwrap();
    let db = TestDb::create().await;
    let url = db.database_url().await;

    let status = desire_as(home.path(), &url, "u2", &["status"]).await;
    assert!(stdout(&status).contains("Screen:     Welcome"));

    let onboard =
        desire_as(home.path(), &url, "u2", &["onboard", "baker", "--exclude", "milk"]).await;
    assert!(onboard.status.success(), "onboard failed: {}", stderr(&onboard));
    assert!(stdout(&onboard).contains("Onboarding finished."));

    let profile: ProfileDocument = profiles::get_profile(db.pool(), "u2")
        .await
        .unwrap()
        .unwrap()
        .into();
    assert_eq!(profile.onboarding_completed, Some(true));
    assert_eq!(profile.onboarding_archetype.as_deref(), Some("The Baker"));

    let status = desire_as(home.path(), &url, "u2", &["status"]).await;
    let text = stdout(&status);
    assert!(text.contains("Screen:     Home"), "status: {text}");
    assert!(text.contains("Pantry:     5 items"), "status: {text}");
    assert!(text.contains("What do you desire?"), "status: {text}");

    let again = desire_as(home.path(), &url, "u2", &["onboard", "ascetic"]).await;
    assert!(stdout(&again).contains("already finished"));

    db.teardown().await;
}
