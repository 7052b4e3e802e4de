use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use tracing::info;

use crate::tmdb::TMDB_BASE;

const DEFAULT_PORT: u16 = 3146;

#[derive(Debug, Clone)]
pub struct Config {
    pub tmdb_api_key: String,
    pub tmdb_api_base: String,
    pub data_dir: PathBuf,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let tmdb_api_key = env::var("TMDB_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .context("TMDB_API_KEY not set")?;
        let tmdb_api_base = env::var("TMDB_API_BASE")
            .ok()
            .filter(|b| !b.trim().is_empty())
            .unwrap_or_else(|| TMDB_BASE.to_string());
        let data_dir = env::var("CINESCOPE_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"));
        let port = match env::var("CINESCOPE_PORT") {
            Ok(p) => p
                .trim()
                .parse()
                .with_context(|| format!("CINESCOPE_PORT is not a valid port: '{}'", p))?,
            Err(_) => DEFAULT_PORT,
        };
        Ok(Self {
            tmdb_api_key,
            tmdb_api_base,
            data_dir,
            port,
        })
    }
}

pub fn check_env() -> Result<()> {
    let required = ["TMDB_API_KEY"];
    for key in required {
        if env::var(key).is_err() {
            anyhow::bail!("Missing required environment variable: {}", key);
        }
    }
    info!("All required environment variables are set");
    Ok(())
}
