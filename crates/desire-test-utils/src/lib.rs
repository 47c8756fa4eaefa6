//! Shared test utilities for desire integration tests.
//!
//! One PostgreSQL server is shared by every test in a binary; each test
//! gets a freshly migrated database of its own through [`TestDb`].
//!
//! - With **`DESIRE_TEST_PG_URL`** set, that server is used as-is.
//! - Otherwise a container is started via testcontainers on first use.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use testcontainers::ContainerAsync;
use testcontainers::ImageExt;
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use uuid::Uuid;

use desire_db::models::ProfileDocument;
use desire_db::pool;
use desire_db::queries::{pantry, profiles};

struct SharedServer {
    base_url: String,
    /// Keeps the container alive for the life of the test binary.
    _container: Option<ContainerAsync<Postgres>>,
}

static SHARED_SERVER: OnceCell<SharedServer> = OnceCell::const_new();

async fn start_server() -> SharedServer {
    if let Ok(url) = std::env::var("DESIRE_TEST_PG_URL") {
        return SharedServer {
            base_url: url.trim_end_matches('/').to_owned(),
            _container: None,
        };
    }

    let container = Postgres::default()
        .with_tag("16")
        .start()
        .await
        .expect("failed to start PostgreSQL container");
    let host = container.get_host().await.expect("failed to get host");
    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("failed to get mapped port");

    SharedServer {
        base_url: format!("postgresql://postgres:postgres@{host}:{port}"),
        _container: Some(container),
    }
}

/// Server root URL (no database name).
pub async fn server_url() -> &'static str {
    &SHARED_SERVER.get_or_init(start_server).await.base_url
}

async fn maintenance_pool() -> PgPool {
    let url = format!("{}/postgres", server_url().await);
    PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&url)
        .await
        .expect("failed to connect to maintenance database")
}

/// A uniquely named, migrated database. Call [`TestDb::teardown`] at the
/// end of the test to drop it.
pub struct TestDb {
    pool: PgPool,
    name: String,
}

impl TestDb {
    /// Create the database and apply all migrations.
    pub async fn create() -> Self {
        let name = format!("desire_test_{}", Uuid::new_v4().simple());

        let maint = maintenance_pool().await;
        maint
            .execute(format!("CREATE DATABASE {name}").as_str())
            .await
            .unwrap_or_else(|e| panic!("failed to create test database {name}: {e}"));
        maint.close().await;

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&format!("{}/{name}", server_url().await))
            .await
            .unwrap_or_else(|e| panic!("failed to connect to test database {name}: {e}"));
        pool::run_migrations(&pool)
            .await
            .expect("migrations should succeed");

        Self { pool, name }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Connection URL of this database, for handing to a child process.
    pub async fn database_url(&self) -> String {
        format!("{}/{}", server_url().await, self.name)
    }

    /// Store a profile document for `user_id`.
    pub async fn seed_profile(&self, user_id: &str, doc: &ProfileDocument) {
        profiles::merge_profile(&self.pool, user_id, doc)
            .await
            .expect("failed to seed profile");
    }

    /// Store pantry items (already normalized) for `user_id`.
    pub async fn seed_pantry(&self, user_id: &str, names: &[&str]) {
        for name in names {
            pantry::upsert_item(&self.pool, user_id, name)
                .await
                .expect("failed to seed pantry item");
        }
    }

    /// Close the pool and drop the database, terminating stray connections.
    pub async fn teardown(self) {
        self.pool.close().await;

        let maint = maintenance_pool().await;
        let terminate = format!(
            "SELECT pg_terminate_backend(pid) FROM pg_stat_activity \
             WHERE datname = '{}' AND pid <> pg_backend_pid()",
            self.name
        );
        let _ = maint.execute(terminate.as_str()).await;
        let _ = maint
            .execute(format!("DROP DATABASE IF EXISTS {}", self.name).as_str())
            .await;
        maint.close().await;
    }
}
