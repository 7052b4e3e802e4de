//! Run one catalog refresh (or one search) and print the normalized movies.
//! Usage:
//!   cargo run --bin catalog_props -- categories
//!   cargo run --bin catalog_props -- search <query...>
//!   cargo run --bin catalog_props -- movie <tmdb_id>
//! Requires TMDB_API_KEY in the environment (.env supported).

use anyhow::{Context, Result};
use cinescope::catalog::Catalog;
use cinescope::config::Config;
use cinescope::models::Category;
use cinescope::prefs::MemoryStore;
use cinescope::tmdb::TmdbClient;
use dotenvy::dotenv;
use serde_json::{json, Map, Value};
use std::env;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: cargo run --bin catalog_props -- categories");
        eprintln!("       cargo run --bin catalog_props -- search <query...>");
        eprintln!("       cargo run --bin catalog_props -- movie <tmdb_id>");
        std::process::exit(1);
    }

    let config = Config::from_env()?;
    let client = TmdbClient::from_config(&config)?;
    let catalog = Catalog::new(Arc::new(client), Arc::new(MemoryStore::default()));

    let output = match args[1].as_str() {
        "categories" => {
            let report = catalog.refresh().await;
            let mut slots = Map::new();
            for category in Category::ALL {
                let movies = catalog.category(category).await;
                slots.insert(category.key().to_string(), serde_json::to_value(movies.as_slice())?);
            }
            json!({
                "report": report,
                "categories": Value::Object(slots),
                "recommendations": serde_json::to_value(catalog.recommendations().await.as_slice())?,
            })
        }
        "search" => {
            let query = args[2..].join(" ");
            match catalog.try_search(&query).await {
                Ok(results) => serde_json::to_value(results)?,
                Err(e) => json!({ "error": e.to_string() }),
            }
        }
        "movie" => {
            let id: i64 = args
                .get(2)
                .context("missing tmdb id")?
                .parse()
                .context("tmdb_id must be an integer")?;
            serde_json::to_value(catalog.details_by_id(id).await)?
        }
        other => anyhow::bail!("unknown command '{}'", other),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
