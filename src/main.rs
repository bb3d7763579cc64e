use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

use foodgram::{
    config::{Cli, Command, Config},
    db::{self, NewIngredient},
    routes, AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("foodgram=info,tower_http=info")),
        )
        .init();

    let Cli { config, command } = Cli::parse();

    let pool = db::connect(&config.database_url)
        .await
        .with_context(|| format!("failed to open database {}", config.database_url))?;
    db::prepare_db(&pool).await.context("failed to apply schema")?;

    match command.unwrap_or(Command::Serve) {
        Command::Serve => serve(pool, config).await,
        Command::LoadIngredients { path } => {
            let raw = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            let ingredients: Vec<NewIngredient> =
                serde_json::from_str(&raw).context("ingredient file is not a JSON array")?;

            let inserted = db::load_ingredients(&pool, &ingredients).await?;
            println!("Loaded {inserted} new ingredients ({} in file)", ingredients.len());
            Ok(())
        }
    }
}

async fn serve(pool: sqlx::SqlitePool, config: Config) -> Result<()> {
    tokio::fs::create_dir_all(&config.media_root)
        .await
        .with_context(|| format!("failed to create {}", config.media_root.display()))?;

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, public_url = config.public_url(), "listening");

    let app = routes::generate_routes(AppState::new(pool, config));
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
