use anyhow::Result;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::models::{Category, DetailView, NormalizedMovie};
use crate::prefs::{KeyValueStore, UserPreferences, WatchlistOutcome};
use crate::tmdb::{self, CatalogApi, RawCatalogEntry, RawMovieDetail, TransportError};
use crate::transform;

pub const RECOMMENDATION_LIMIT: usize = 6;
pub const LOAD_FAILED_NOTICE: &str =
    "Failed to load movies. Please check your internet connection.";

type Slot = RwLock<Arc<Vec<NormalizedMovie>>>;

/// Outcome of one refresh cycle.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RefreshReport {
    pub loaded: Vec<Category>,
    pub failed: Vec<Category>,
    /// Set only when every category failed.
    pub notice: Option<String>,
}

/// In-memory catalog state: one guarded slot per category plus the derived
/// recommendations and the user's preferences.
///
/// `refresh` is the only path that replaces slots.
pub struct Catalog {
    api: Arc<dyn CatalogApi>,
    store: Arc<dyn KeyValueStore>,
    slots: [Slot; 5],
    recommendations: Slot,
    prefs: Mutex<UserPreferences>,
}

impl Catalog {
    pub fn new(api: Arc<dyn CatalogApi>, store: Arc<dyn KeyValueStore>) -> Self {
        let prefs = UserPreferences::load(store.as_ref());
        info!(
            "Loaded preferences ({} watched movies)",
            prefs.watched_movies.len()
        );
        Self {
            api,
            store,
            slots: std::array::from_fn(|_| RwLock::new(Arc::new(Vec::new()))),
            recommendations: RwLock::new(Arc::new(Vec::new())),
            prefs: Mutex::new(prefs),
        }
    }

    pub async fn refresh(&self) -> RefreshReport {
        info!("Refreshing all categories");
        let (popular, top_rated, action, comedy, drama) = tokio::join!(
            self.fetch_category(Category::Popular),
            self.fetch_category(Category::TopRated),
            self.fetch_category(Category::Action),
            self.fetch_category(Category::Comedy),
            self.fetch_category(Category::Drama),
        );

        let mut loaded = Vec::new();
        let mut failed = Vec::new();
        for (category, fetched) in Category::ALL
            .into_iter()
            .zip([popular, top_rated, action, comedy, drama])
        {
            match fetched {
                Some(movies) => {
                    debug!(category = %category, count = movies.len(), "Replacing cache slot");
                    *self.slots[category.index()].write().await = Arc::new(movies);
                    loaded.push(category);
                }
                None => failed.push(category),
            }
        }

        {
            // Built under the write guard so an overlapping refresh cannot
            // publish a list derived from older slots after this one.
            let mut recommendations = self.recommendations.write().await;
            let popular = self.category(Category::Popular).await;
            let top_rated = self.category(Category::TopRated).await;
            let prefs = self.prefs.lock().await;
            *recommendations = Arc::new(recommend(&popular, &top_rated, &prefs.watched_movies));
        }

        let notice = if loaded.is_empty() {
            error!("{}", LOAD_FAILED_NOTICE);
            Some(LOAD_FAILED_NOTICE.to_string())
        } else {
            if !failed.is_empty() {
                warn!("Some categories kept their previous contents: {:?}", failed);
            }
            info!(
                "Refresh complete: {} loaded, {} failed",
                loaded.len(),
                failed.len()
            );
            None
        };

        RefreshReport {
            loaded,
            failed,
            notice,
        }
    }

    async fn fetch_category(&self, category: Category) -> Option<Vec<NormalizedMovie>> {
        let (endpoint, params) = category.endpoint();
        let body = self.api.get_json(endpoint, &params).await.ok()?;
        match tmdb::parse_results(body) {
            Ok(raw) => Some(transform::normalize_all(&raw)),
            Err(e) => {
                warn!("Malformed {} listing from TMDB: {}", category, e);
                None
            }
        }
    }

    pub async fn category(&self, category: Category) -> Arc<Vec<NormalizedMovie>> {
        self.slots[category.index()].read().await.clone()
    }

    pub async fn recommendations(&self) -> Arc<Vec<NormalizedMovie>> {
        self.recommendations.read().await.clone()
    }

    /// Highlighted title: the first popular movie.
    pub async fn featured(&self) -> Option<NormalizedMovie> {
        self.category(Category::Popular).await.first().cloned()
    }

    /// Blank queries return nothing without touching the network; failures
    /// and "no matches" both come back empty.
    pub async fn search(&self, query: &str) -> Vec<NormalizedMovie> {
        self.try_search(query).await.unwrap_or_default()
    }

    pub async fn try_search(&self, query: &str) -> Result<Vec<NormalizedMovie>, TransportError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let params = [
            ("query", query.to_string()),
            ("language", "en-US".to_string()),
            ("page", "1".to_string()),
        ];
        let body = self.api.get_json("/search/movie", &params).await?;
        let raw = tmdb::parse_results(body).map_err(|source| TransportError::Decode {
            endpoint: "/search/movie".to_string(),
            source,
        })?;
        debug!(query = %query, hits = raw.len(), "Search finished");
        Ok(transform::normalize_all(&raw))
    }

    /// Detail view for a movie already on screen; falls back to the summary.
    pub async fn details(&self, summary: NormalizedMovie) -> DetailView {
        let detail = match self.fetch_detail(summary.id).await {
            Ok(body) => serde_json::from_value::<RawMovieDetail>(body).map_err(|e| {
                warn!("Malformed details for movie {}: {}", summary.id, e);
            }),
            Err(_) => Err(()),
        };
        match detail {
            Ok(detail) => DetailView::Detailed(transform::enrich(summary, detail)),
            Err(()) => DetailView::Summary(summary),
        }
    }

    /// Looks the summary up in the cache first; unknown ids are built from
    /// the detail payload alone, and `None` means there is nothing to show.
    pub async fn details_by_id(&self, id: i64) -> Option<DetailView> {
        if let Some(summary) = self.find_cached(id).await {
            return Some(self.details(summary).await);
        }
        let body = self.fetch_detail(id).await.ok()?;
        let entry = serde_json::from_value::<RawCatalogEntry>(body.clone());
        let detail = serde_json::from_value::<RawMovieDetail>(body);
        match (entry, detail) {
            (Ok(entry), Ok(detail)) => {
                let mut summary = transform::normalize(&entry);
                summary.genres = detail.genres.iter().map(|g| g.name.clone()).collect();
                Some(DetailView::Detailed(transform::enrich(summary, detail)))
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!("Malformed details for movie {}: {}", id, e);
                None
            }
        }
    }

    async fn fetch_detail(&self, id: i64) -> Result<Value, TransportError> {
        let endpoint = format!("/movie/{id}");
        self.api
            .get_json(&endpoint, &[("language", "en-US".to_string())])
            .await
    }

    async fn find_cached(&self, id: i64) -> Option<NormalizedMovie> {
        for category in Category::ALL {
            if let Some(m) = self.category(category).await.iter().find(|m| m.id == id) {
                return Some(m.clone());
            }
        }
        self.recommendations()
            .await
            .iter()
            .find(|m| m.id == id)
            .cloned()
    }

    pub async fn watchlist(&self) -> Vec<i64> {
        self.prefs.lock().await.watched_movies.clone()
    }

    pub async fn add_to_watchlist(&self, id: i64) -> Result<WatchlistOutcome> {
        let mut prefs = self.prefs.lock().await;
        let outcome = prefs.add_to_watchlist(self.store.clone(), id).await?;
        info!(movie_id = id, "{}", outcome.message());
        Ok(outcome)
    }
}

/// `popular ++ top_rated`, first occurrence of each id kept, watched ids
/// dropped, highest numeric rating first (stable), at most six.
pub fn recommend(
    popular: &[NormalizedMovie],
    top_rated: &[NormalizedMovie],
    watched: &[i64],
) -> Vec<NormalizedMovie> {
    let mut seen = HashSet::new();
    let mut picks: Vec<NormalizedMovie> = popular
        .iter()
        .chain(top_rated)
        .filter(|m| seen.insert(m.id))
        .filter(|m| !watched.contains(&m.id))
        .cloned()
        .collect();
    picks.sort_by(|a, b| b.rating_value().total_cmp(&a.rating_value()));
    picks.truncate(RECOMMENDATION_LIMIT);
    picks
}
