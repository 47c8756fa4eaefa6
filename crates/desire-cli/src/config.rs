//! Configuration file management for the `desire` binary.
//!
//! The config file lives at `~/.config/desire/config.toml`. Every setting
//! resolves as: CLI flag > env var > config file > default.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use desire_db::config::DbConfig;

/// Env var naming the signed-in user for one-shot commands.
pub const USER_ENV: &str = "DESIRE_USER_ID";

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    pub database: DatabaseSection,
    pub identity: IdentitySection,
    #[serde(default)]
    pub local: LocalSection,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IdentitySection {
    /// Anonymous user id generated by `desire init`.
    pub user_id: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct LocalSection {
    /// Device-local key-value file. Defaults to `state.json` next to the
    /// config file.
    pub state_path: Option<PathBuf>,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// `$XDG_CONFIG_HOME/desire`, or `~/.config/desire` on every platform.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("desire");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("desire")
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

pub fn default_state_path() -> PathBuf {
    config_dir().join("state.json")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Errors if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    toml::from_str(&contents).context("failed to parse config file")
}

/// Write the config file, creating its directory. Mode 0600 on Unix.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

/// A fresh anonymous user id (32 hex chars).
pub fn generate_user_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

#[derive(Debug)]
pub struct DesireConfig {
    pub db_config: DbConfig,
    pub user_id: Option<String>,
    pub state_path: PathBuf,
}

impl DesireConfig {
    /// Resolve every setting through the chain
    /// CLI flag > env var > config file > default.
    ///
    /// - DB URL: `cli_db_url` > `DESIRE_DATABASE_URL` > `database.url` > `DbConfig::DEFAULT_URL`
    /// - User: `cli_user` > `DESIRE_USER_ID` > `identity.user_id` > none
    /// - State file: `local.state_path` > `default_state_path()`
    /// - Pool size: `DESIRE_DB_MAX_CONNECTIONS` > `DbConfig::DEFAULT_MAX_CONNECTIONS`
    pub fn resolve(cli_db_url: Option<&str>, cli_user: Option<&str>) -> Self {
        let file_config = load_config().ok();

        let db_url = if let Some(url) = cli_db_url {
            url.to_owned()
        } else if let Ok(url) = std::env::var(DbConfig::URL_ENV) {
            url
        } else if let Some(cfg) = &file_config {
            cfg.database.url.clone()
        } else {
            DbConfig::DEFAULT_URL.to_owned()
        };

        let user_id = cli_user
            .map(str::to_owned)
            .or_else(|| std::env::var(USER_ENV).ok())
            .or_else(|| file_config.as_ref().map(|c| c.identity.user_id.clone()))
            .filter(|id| !id.trim().is_empty());

        let state_path = file_config
            .and_then(|c| c.local.state_path)
            .unwrap_or_else(default_state_path);

        Self {
            db_config: DbConfig::new(db_url).with_env_overrides(),
            user_id,
            state_path,
        }
    }

    /// The resolved user id, for commands that act as a signed-in user.
    pub fn require_user(&self) -> Result<&str> {
        match self.user_id.as_deref() {
            Some(id) => Ok(id),
            None => bail!(
                "no user id; pass --user, set {USER_ENV}, or run `desire init` to create one"
            ),
        }
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
