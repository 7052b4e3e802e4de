use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

pub const TMDB_BASE: &str = "https://api.themoviedb.org/3";

/// Why a catalog request produced no data.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request to {endpoint} failed: {source}")]
    Request {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} -> HTTP {status}: {body}")]
    Status {
        endpoint: String,
        status: StatusCode,
        body: String,
    },
    #[error("{endpoint} returned malformed JSON: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Single round trip against the upstream catalog.
///
/// An `Err` is the "no data" sentinel: implementations report the failure
/// themselves and never panic, so callers only decide how to degrade.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn get_json(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> std::result::Result<Value, TransportError>;
}

#[derive(Debug, Clone)]
pub struct TmdbClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl TmdbClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let user_agent = format!("cinescope/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .user_agent(user_agent)
            .build()
            .context("Failed to build TMDB HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    pub fn from_config(config: &crate::config::Config) -> Result<Self> {
        Self::new(&config.tmdb_api_base, &config.tmdb_api_key)
    }

    async fn round_trip(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> std::result::Result<Value, TransportError> {
        // The key travels in the query string; errors are stripped of the URL.
        let url = format!("{}{}", self.base_url, endpoint);
        let res = self
            .client
            .get(&url)
            .query(params)
            .query(&[("api_key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|source| TransportError::Request {
                endpoint: endpoint.to_string(),
                source: source.without_url(),
            })?;
        let status = res.status();
        let text = res.text().await.map_err(|source| TransportError::Request {
            endpoint: endpoint.to_string(),
            source: source.without_url(),
        })?;
        if !status.is_success() {
            return Err(TransportError::Status {
                endpoint: endpoint.to_string(),
                status,
                body: text,
            });
        }
        serde_json::from_str(&text).map_err(|source| TransportError::Decode {
            endpoint: endpoint.to_string(),
            source,
        })
    }
}

#[async_trait]
impl CatalogApi for TmdbClient {
    async fn get_json(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> std::result::Result<Value, TransportError> {
        debug!(endpoint = %endpoint, "Fetching from TMDB");
        let result = self.round_trip(endpoint, params).await;
        if let Err(e) = &result {
            warn!("Error fetching from TMDB: {}", e);
        }
        result
    }
}

/// List entry as delivered by the list, discover and search endpoints.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawCatalogEntry {
    pub id: i64,
    pub title: Option<String>,
    pub genre_ids: Option<Vec<Option<i64>>>,
    pub vote_average: Option<f64>,
    pub release_date: Option<String>,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub popularity: Option<f64>,
    pub vote_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ResultsPage {
    results: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub struct RawGenre {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct RawCompany {
    pub id: i64,
    pub name: String,
    pub logo_path: Option<String>,
    pub origin_country: Option<String>,
}

/// `/movie/{id}` payload, reduced to the fields the detail view shows.
#[derive(Debug, Deserialize)]
pub struct RawMovieDetail {
    pub id: i64,
    pub runtime: Option<u32>,
    pub budget: Option<u64>,
    pub revenue: Option<u64>,
    #[serde(default)]
    pub genres: Vec<RawGenre>,
    #[serde(default)]
    pub production_companies: Vec<RawCompany>,
    pub tagline: Option<String>,
    pub homepage: Option<String>,
}

/// Reads the `results` array of a list response.
///
/// Only a missing or non-array `results` is an error; entries that do not
/// parse are skipped so the rest of the page survives.
pub fn parse_results(body: Value) -> std::result::Result<Vec<RawCatalogEntry>, serde_json::Error> {
    let page: ResultsPage = serde_json::from_value(body)?;
    let total = page.results.len();
    let entries: Vec<RawCatalogEntry> = page
        .results
        .into_iter()
        .filter_map(|entry| match serde_json::from_value(entry) {
            Ok(e) => Some(e),
            Err(e) => {
                warn!("Skipping malformed catalog entry: {}", e);
                None
            }
        })
        .collect();
    if entries.len() < total {
        debug!(kept = entries.len(), total, "Dropped malformed catalog entries");
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn entry_tolerates_missing_optional_fields() {
        let entries = parse_results(json!({ "results": [{ "id": 7 }] })).unwrap();
        assert_eq!(entries.len(), 1);
        let e = &entries[0];
        assert_eq!(e.id, 7);
        assert!(e.title.is_none());
        assert!(e.genre_ids.is_none());
        assert!(e.poster_path.is_none());
        assert!(e.vote_count.is_none());
    }

    #[test]
    fn bad_entries_are_skipped_and_null_genres_kept() {
        let entries = parse_results(json!({
            "results": [
                { "id": 1, "genre_ids": [28, null] },
                { "title": "No id" },
                { "id": "two" },
                { "id": 3, "vote_average": 6.1 }
            ]
        }))
        .unwrap();
        let ids: Vec<i64> = entries.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(entries[0].genre_ids, Some(vec![Some(28), None]));
    }

    #[test]
    fn missing_results_array_is_malformed() {
        assert!(parse_results(json!({ "status_message": "nope" })).is_err());
        assert!(parse_results(json!({ "results": null })).is_err());
    }

    #[test]
    fn detail_tolerates_nulls() {
        let d: RawMovieDetail = serde_json::from_value(json!({
            "id": 1,
            "runtime": null,
            "tagline": null,
            "production_companies": [{ "id": 2, "name": "Studio", "logo_path": null, "origin_country": "US" }]
        }))
        .unwrap();
        assert_eq!(d.runtime, None);
        assert!(d.genres.is_empty());
        assert_eq!(d.production_companies[0].name, "Studio");
    }

    #[test]
    fn trailing_slash_on_base_is_dropped() {
        let client = TmdbClient::new("http://localhost:1/", "k").unwrap();
        assert_eq!(client.base_url, "http://localhost:1");
    }
}
