use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use quizforge_api::Server;
use quizforge_core::{CatalogService, ConfigManager, Database, UserService};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{
    layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry,
};

#[derive(Parser)]
#[command(
    name = "quizforge",
    version,
    about = "QuizForge - curriculum catalog and AI-assisted question bank"
)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[arg(long, global = true, help = "Configuration file path")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Run the HTTP API (default)")]
    Serve,

    #[command(about = "Create an admin account, or promote an existing user")]
    CreateAdmin {
        #[arg(long)]
        email: String,

        #[arg(long, env = "QUIZFORGE_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,

        #[arg(long, default_value = "Administrator")]
        name: String,
    },

    #[command(about = "Give every catalog entry without a slug a unique one")]
    BackfillSlugs,
}

fn level_filter(level: &str) -> EnvFilter {
    EnvFilter::new(format!(
        "quizforge_api={level},quizforge_ai={level},quizforge_core={level},tower_http={level}"
    ))
}

/// Installs the subscriber before the config is read. Without `RUST_LOG` the
/// filter starts at info and is swapped for the configured level afterwards.
fn init_tracing() -> Option<reload::Handle<EnvFilter, Registry>> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
            None
        }
        Err(_) => {
            let (filter, handle) = reload::Layer::new(level_filter("info"));
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
            Some(handle)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let filter_handle = init_tracing();

    let config = match &cli.config {
        Some(path) => ConfigManager::from_path(path),
        None => ConfigManager::load(),
    }
    .context("Failed to load configuration")?;
    if let Some(handle) = filter_handle {
        let level = &config.config().logging.level;
        if let Err(e) = handle.reload(level_filter(level)) {
            warn!(error = %e, level = %level, "Could not apply configured log level");
        }
    }
    let config = Arc::new(config);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => Server::new(config).await?.run().await,
        Commands::CreateAdmin {
            email,
            password,
            name,
        } => {
            let db = Database::open(&config.config().storage).await?;
            let (user, created) = UserService::new(db)
                .ensure_admin(&email, &password, &name)
                .await?;
            if created {
                info!(user_id = %user.id, email = %user.email, "Admin account created");
            } else {
                info!(user_id = %user.id, email = %user.email, "Existing account is now an admin");
            }
            Ok(())
        }
        Commands::BackfillSlugs => {
            let db = Database::open(&config.config().storage).await?;
            let counts = CatalogService::new(db).backfill_slugs().await?;
            for (level, updated) in counts {
                info!(level = %level, updated, "Slugs backfilled");
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_level_replaces_startup_filter() {
        let (_layer, handle) = reload::Layer::<EnvFilter, Registry>::new(level_filter("info"));
        handle.reload(level_filter("debug")).unwrap();
        let current = handle.with_current(|f| f.to_string()).unwrap();
        assert!(current.contains("quizforge_core=debug"));
        assert!(!current.contains("=info"));
    }

    #[test]
    fn cli_defaults_to_serve() {
        let cli = Cli::parse_from(["quizforge", "--config", "quizforge.toml"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("quizforge.toml")));
    }
}
