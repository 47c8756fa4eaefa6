mod archetypes_cmd;
mod config;
mod onboard_cmd;
mod pantry_cmds;
mod session;
mod shell_cmd;
mod status_cmd;
#[cfg(test)]
mod test_util;

use clap::{Parser, Subcommand};

use desire_db::pool;

use config::DesireConfig;

#[derive(Parser)]
#[command(name = "desire", about = "Session state engine for the Desire pantry assistant")]
struct Cli {
    /// Database URL (overrides DESIRE_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// User to act as (overrides DESIRE_USER_ID env var)
    #[arg(long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a config file with a fresh anonymous user id (no database required)
    Init {
        /// PostgreSQL connection URL
        #[arg(long, default_value = desire_db::config::DbConfig::DEFAULT_URL)]
        db_url: String,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Create and migrate the database
    DbInit,
    /// Show the current session: screen, onboarding progress, pantry, prompt
    Status,
    /// Pantry management
    Pantry {
        #[command(subcommand)]
        command: PantryCommands,
    },
    /// List archetype presets and ingredient categories (no database required)
    Archetypes {
        /// Only show category ingredients containing this text
        #[arg(long)]
        search: Option<String>,
    },
    /// Onboard with an archetype's starting pantry
    Onboard {
        /// Archetype key or title (see `desire archetypes`)
        archetype: String,
        /// Suggested item to leave out (repeatable)
        #[arg(long)]
        exclude: Vec<String>,
        /// Replace the pantry with these items after the checklist (repeatable)
        #[arg(long)]
        refine: Vec<String>,
    },
    /// Interactive session with live sign-in, lifecycle and pantry commands
    Shell,
}

#[derive(Subcommand)]
pub enum PantryCommands {
    /// List pantry items
    List,
    /// Add one or more items
    Add {
        #[arg(required = true)]
        items: Vec<String>,
    },
    /// Remove one or more items
    Remove {
        #[arg(required = true)]
        items: Vec<String>,
    },
    /// Check a recipe's ingredients against the pantry
    Compare {
        #[arg(required = true)]
        ingredients: Vec<String>,
    },
}

/// Execute `desire init`: write the config file.
fn cmd_init(db_url: &str, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let user_id = config::generate_user_id();
    let cfg = config::ConfigFile {
        database: config::DatabaseSection {
            url: db_url.to_owned(),
        },
        identity: config::IdentitySection {
            user_id: user_id.clone(),
        },
        local: config::LocalSection::default(),
    };
    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  database.url = {db_url}");
    println!("  identity.user_id = {user_id}");
    println!();
    println!("Next: run `desire db-init` to create and migrate the database.");

    Ok(())
}

/// Execute `desire db-init`: create the database and run migrations.
async fn cmd_db_init(resolved: &DesireConfig) -> anyhow::Result<()> {
    println!("Initializing desire database...");

    if pool::create_database_if_missing(&resolved.db_config).await? {
        println!("Created database.");
    }
    let db_pool = pool::create_pool(&resolved.db_config).await?;
    let result = async {
        pool::run_migrations(&db_pool).await?;
        pool::table_counts(&db_pool).await
    }
    .await;
    db_pool.close().await;

    println!("Database ready. Tables:");
    for (table, count) in &result? {
        println!("  {table}: {count} rows");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let resolve = || DesireConfig::resolve(cli.database_url.as_deref(), cli.user.as_deref());

    match cli.command {
        Commands::Init { ref db_url, force } => {
            cmd_init(db_url, force)?;
        }
        Commands::DbInit => {
            cmd_db_init(&resolve()).await?;
        }
        Commands::Archetypes { ref search } => {
            archetypes_cmd::run_archetypes(search.as_deref());
        }
        Commands::Status => {
            let resolved = resolve();
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = status_cmd::run_status(&db_pool, &resolved).await;
            db_pool.close().await;
            result?;
        }
        Commands::Pantry { command } => {
            let resolved = resolve();
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = pantry_cmds::run_pantry_command(command, &db_pool, &resolved).await;
            db_pool.close().await;
            result?;
        }
        Commands::Onboard {
            ref archetype,
            ref exclude,
            ref refine,
        } => {
            let resolved = resolve();
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result =
                onboard_cmd::run_onboard(&db_pool, &resolved, archetype, exclude, refine).await;
            db_pool.close().await;
            result?;
        }
        Commands::Shell => {
            let resolved = resolve();
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = shell_cmd::run_shell(&db_pool, &resolved).await;
            db_pool.close().await;
            result?;
        }
    }

    Ok(())
}
