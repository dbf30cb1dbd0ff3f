use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use recipe_core::seed::{builtin_recipes, load_seed_file, seed_recipes};
use recipe_core::{SqliteStorage, Storage};
use recipe_web::accounts::{register, RegisterError};
use recipe_web::forms::SignupForm;
use recipe_web::{app_router, logging, AppState, Config};
use tokio::net::TcpListener;
use tracing::{error, info};

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Parser)]
#[command(name = "recipe-web")]
#[command(about = "Recipe catalog web application")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to the TOML config file (defaults to ./recipes.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Address to listen on, overrides the config file
        #[arg(long)]
        bind: Option<String>,
    },
    /// Create or upgrade the database schema
    Migrate,
    /// Load recipes into the database
    Seed {
        /// JSON file of the form {"recipes": [...]}; built-in samples when omitted
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Register a user account
    CreateUser { username: String, password: String },
}

async fn serve(config: Config, storage: Arc<dyn Storage>) -> anyhow::Result<()> {
    let bind = config.bind.clone();
    let state = AppState::new(storage, config);

    let sessions = state.sessions.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let purged = sessions.purge_expired().await;
            if purged > 0 {
                info!(purged, "Expired sessions removed");
            }
        }
    });

    let app = app_router(state);
    let listener = TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;

    info!("Recipe catalog listening on http://{bind}");
    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;
    let _guard = logging::init_logging(&config);

    let storage = SqliteStorage::open(&config.database)
        .with_context(|| format!("failed to open database {}", config.database.display()))?;

    match cli.command {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.bind = bind;
            }
            serve(config, Arc::new(storage)).await?;
        }
        Commands::Migrate => {
            info!("Database schema is up to date at {}", config.database.display());
        }
        Commands::Seed { file } => {
            let recipes = match file {
                Some(path) => load_seed_file(&path)
                    .with_context(|| format!("failed to load seed file {}", path.display()))?,
                None => builtin_recipes(),
            };
            let count = seed_recipes(&storage, &recipes).await?;
            println!("Seeded {count} recipes");
        }
        Commands::CreateUser { username, password } => {
            let form = SignupForm {
                username,
                password1: password.clone(),
                password2: password,
            };
            match register(&storage, &form).await {
                Ok(user) => println!("Created user {} (id {})", user.username, user.id),
                Err(RegisterError::Invalid(errors)) => {
                    for (field, messages) in errors.iter() {
                        for message in messages {
                            eprintln!("{field}: {message}");
                        }
                    }
                    anyhow::bail!("invalid username or password");
                }
                Err(e) => {
                    error!("Failed to create user {}: {}", form.username, e);
                    return Err(e.into());
                }
            }
        }
    }

    Ok(())
}
