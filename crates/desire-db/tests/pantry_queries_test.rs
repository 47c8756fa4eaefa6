//! Integration tests for the `pantry_items` queries.

use desire_db::queries::pantry;
use desire_test_utils::TestDb;

#[tokio::test]
async fn upsert_is_idempotent() {
    let db = TestDb::create().await;

    pantry::upsert_item(db.pool(), "user-a", "flour").await.unwrap();
    pantry::upsert_item(db.pool(), "user-a", "flour").await.unwrap();

    let names = pantry::list_item_names(db.pool(), "user-a").await.unwrap();
    assert_eq!(names, vec!["flour"]);

    db.teardown().await;
}

#[tokio::test]
async fn list_is_sorted_and_scoped_to_user() {
    let db = TestDb::create().await;

    db.seed_pantry("user-a", &["salt", "eggs", "butter"]).await;
    db.seed_pantry("user-b", &["yeast"]).await;

    let names = pantry::list_item_names(db.pool(), "user-a").await.unwrap();
    assert_eq!(names, vec!["butter", "eggs", "salt"]);

    let names = pantry::list_item_names(db.pool(), "user-b").await.unwrap();
    assert_eq!(names, vec!["yeast"]);

    db.teardown().await;
}

#[tokio::test]
async fn delete_of_missing_item_succeeds() {
    let db = TestDb::create().await;

    db.seed_pantry("user-a", &["rice"]).await;

    assert!(pantry::delete_item(db.pool(), "user-a", "rice").await.unwrap());
    assert!(!pantry::delete_item(db.pool(), "user-a", "rice").await.unwrap());
    assert!(!pantry::delete_item(db.pool(), "user-a", "quinoa").await.unwrap());
    assert!(pantry::list_item_names(db.pool(), "user-a").await.unwrap().is_empty());

    db.teardown().await;
}

#[tokio::test]
async fn empty_name_is_rejected_by_schema() {
    let db = TestDb::create().await;

    let result = pantry::upsert_item(db.pool(), "user-a", "").await;
    assert!(result.is_err());

    db.teardown().await;
}
