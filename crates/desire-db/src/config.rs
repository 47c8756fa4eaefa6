//! Where the profile and pantry documents live.

/// Connection settings for the remote document store.
///
/// The URL names a PostgreSQL database holding the `profiles` and
/// `pantry_items` tables. The pool size bounds how many document reads and
/// writes a session can have in flight at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub database_url: String,
    pub max_connections: u32,
}

/// The pieces of a connection URL that bootstrap needs.
struct UrlParts<'a> {
    server: &'a str,
    name: &'a str,
    query: &'a str,
}

impl DbConfig {
    pub const DEFAULT_URL: &str = "postgresql://localhost:5432/desire";
    pub const URL_ENV: &str = "DESIRE_DATABASE_URL";
    pub const MAX_CONNECTIONS_ENV: &str = "DESIRE_DB_MAX_CONNECTIONS";

    /// A hydration fetches the profile and the pantry together; a pantry edit
    /// writes both documents. Five leaves room for a lifecycle mirror.
    pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: Self::DEFAULT_MAX_CONNECTIONS,
        }
    }

    /// Override the pool size. Zero is raised to one.
    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections.max(1);
        self
    }

    /// Apply `DESIRE_DB_MAX_CONNECTIONS` when it holds a positive integer.
    /// Any other value is reported and ignored.
    pub fn with_env_overrides(self) -> Self {
        let Ok(raw) = std::env::var(Self::MAX_CONNECTIONS_ENV) else {
            return self;
        };
        match parse_pool_size(&raw) {
            Some(n) => self.with_max_connections(n),
            None => {
                tracing::warn!(
                    value = %raw,
                    "ignoring {}; expected a positive integer",
                    Self::MAX_CONNECTIONS_ENV
                );
                self
            }
        }
    }

    /// The database the documents live in, without any query string.
    pub fn database_name(&self) -> Option<&str> {
        self.parts().map(|p| p.name)
    }

    /// The same server's `postgres` database, keeping any connection
    /// parameters. `None` when the URL names no database.
    pub fn maintenance_url(&self) -> Option<String> {
        self.parts()
            .map(|p| format!("{}/postgres{}", p.server, p.query))
    }

    fn parts(&self) -> Option<UrlParts<'_>> {
        let url = self.database_url.as_str();
        let (base, query) = url.split_at(url.find('?').unwrap_or(url.len()));
        let authority = base.find("://").map_or(0, |i| i + 3);
        let slash = authority + base[authority..].find('/')?;
        let name = &base[slash + 1..];
        if name.is_empty() {
            return None;
        }
        Some(UrlParts {
            server: &base[..slash],
            name,
            query,
        })
    }
}

fn parse_pool_size(raw: &str) -> Option<u32> {
    raw.trim().parse::<u32>().ok().filter(|n| *n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_uses_default_pool_size() {
        let cfg = DbConfig::new(DbConfig::DEFAULT_URL);
        assert_eq!(cfg.max_connections, DbConfig::DEFAULT_MAX_CONNECTIONS);
        assert_eq!(cfg.database_name(), Some("desire"));
    }

    #[test]
    fn pool_size_override_never_drops_to_zero() {
        let cfg = DbConfig::new(DbConfig::DEFAULT_URL).with_max_connections(0);
        assert_eq!(cfg.max_connections, 1);
        let cfg = cfg.with_max_connections(12);
        assert_eq!(cfg.max_connections, 12);
    }

    #[test]
    fn pool_size_parsing() {
        assert_eq!(parse_pool_size(" 8 "), Some(8));
        assert_eq!(parse_pool_size("0"), None);
        assert_eq!(parse_pool_size("-3"), None);
        assert_eq!(parse_pool_size("lots"), None);
    }

    #[test]
    fn database_name_ignores_query_string() {
        let cfg = DbConfig::new("postgresql://u:pw@db.local:5432/pantry_prod?sslmode=require");
        assert_eq!(cfg.database_name(), Some("pantry_prod"));
        assert_eq!(
            cfg.maintenance_url().as_deref(),
            Some("postgresql://u:pw@db.local:5432/postgres?sslmode=require")
        );
    }

    #[test]
    fn url_without_database_has_no_name() {
        for url in ["postgresql://localhost:5432/", "postgresql://localhost:5432"] {
            let cfg = DbConfig::new(url);
            assert_eq!(cfg.database_name(), None, "{url}");
            assert_eq!(cfg.maintenance_url(), None, "{url}");
        }
    }
}
