//! [`DocumentStore`] backed by the PostgreSQL tables in `desire-db`.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;

use desire_db::models::ProfileDocument;
use desire_db::queries::{pantry, profiles};

use super::DocumentStore;

#[derive(Debug, Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn get_profile(&self, user_id: &str) -> Result<Option<ProfileDocument>> {
        let row = profiles::get_profile(&self.pool, user_id).await?;
        Ok(row.map(ProfileDocument::from))
    }

    async fn merge_profile(&self, user_id: &str, patch: &ProfileDocument) -> Result<()> {
        profiles::merge_profile(&self.pool, user_id, patch).await?;
        Ok(())
    }

    async fn list_pantry(&self, user_id: &str) -> Result<Vec<String>> {
        pantry::list_item_names(&self.pool, user_id).await
    }

    async fn upsert_pantry_item(&self, user_id: &str, name: &str) -> Result<()> {
        pantry::upsert_item(&self.pool, user_id, name).await
    }

    async fn delete_pantry_item(&self, user_id: &str, name: &str) -> Result<()> {
        pantry::delete_item(&self.pool, user_id, name).await?;
        Ok(())
    }
}
