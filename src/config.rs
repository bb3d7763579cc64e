use std::{net::SocketAddr, path::PathBuf};

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "foodgram", version, about = "Recipe sharing backend")]
pub struct Cli {
    #[command(flatten)]
    pub config: Config,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Import the ingredient catalog from a JSON file
    LoadIngredients {
        /// JSON array of `{"name": ..., "measurement_unit": ...}` objects
        path: PathBuf,
    },
}

/// Runtime settings. Every option can also come from the environment (or a `.env` file).
#[derive(Debug, Clone, Args)]
pub struct Config {
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://foodgram.db")]
    pub database_url: String,

    #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1:8000")]
    pub bind_addr: SocketAddr,

    /// Public origin used for pagination links, short links and media URLs
    #[arg(long, env = "PUBLIC_URL", default_value = "http://localhost:8000")]
    pub public_url: String,

    /// HMAC secret for signing auth tokens
    #[arg(long, env = "SECRET_KEY", hide_env_values = true)]
    pub secret_key: String,

    #[arg(long, env = "MEDIA_ROOT", default_value = "media")]
    pub media_root: PathBuf,

    /// Requests per second accepted by the whole service
    #[arg(long, env = "RATE_LIMIT", default_value_t = 50)]
    pub rate_limit: u64,

    #[arg(long, env = "TOKEN_TTL_DAYS", default_value_t = 30)]
    pub token_ttl_days: i64,
}

impl Config {
    pub fn public_url(&self) -> &str {
        self.public_url.trim_end_matches('/')
    }

    pub fn media_url(&self, relative: &str) -> String {
        format!("{}/media/{}", self.public_url(), relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_defaults_and_subcommand() {
        let cli = Cli::try_parse_from([
            "foodgram",
            "--secret-key",
            "s3cret",
            "--public-url",
            "https://food.example/",
            "load-ingredients",
            "data/ingredients.json",
        ])
        .unwrap();

        assert_eq!(cli.config.secret_key, "s3cret");
        assert_eq!(cli.config.public_url(), "https://food.example");
        assert_eq!(
            cli.config.media_url("recipes/a.png"),
            "https://food.example/media/recipes/a.png"
        );
        assert!(matches!(
            cli.command,
            Some(Command::LoadIngredients { ref path }) if path.ends_with("ingredients.json")
        ));
    }
}
