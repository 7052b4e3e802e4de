use crate::catalog::Catalog;
use crate::config::Config;
use crate::models::Category;
use crate::prefs::{FileStore, KeyValueStore};
use crate::tmdb::{CatalogApi, TmdbClient};
use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::{net::SocketAddr, sync::Arc};
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{error, info};

const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
}

pub async fn run_server(config: Config) -> Result<()> {
    let api: Arc<dyn CatalogApi> = Arc::new(TmdbClient::from_config(&config)?);
    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(&config.data_dir)?);
    info!("Persisting preferences under {}", config.data_dir.display());

    let catalog = Arc::new(Catalog::new(api, store));
    let report = catalog.refresh().await;
    if let Some(notice) = &report.notice {
        error!("Starting with an empty catalog: {}", notice);
    }

    let app = build_router(AppState { catalog });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/categories/:category", get(category))
        .route("/recommendations", get(recommendations))
        .route("/featured", get(featured))
        .route("/search", get(search))
        .route("/movies/:id", get(movie))
        .route("/watchlist", get(watchlist))
        .route("/watchlist/:id", post(add_to_watchlist))
        .route("/refresh", post(refresh))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

fn not_found(message: String) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"status": "error", "message": message})),
    )
        .into_response()
}

async fn category(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    let category: Category = match name.parse() {
        Ok(c) => c,
        Err(e) => return not_found(e.to_string()),
    };
    let movies = state.catalog.category(category).await;
    Json(movies.as_slice()).into_response()
}

async fn recommendations(State(state): State<AppState>) -> Response {
    let movies = state.catalog.recommendations().await;
    Json(movies.as_slice()).into_response()
}

async fn featured(State(state): State<AppState>) -> Response {
    match state.catalog.featured().await {
        Some(movie) => Json(movie).into_response(),
        None => not_found("No featured movie loaded".to_string()),
    }
}

#[derive(Deserialize)]
struct SearchQuery {
    #[serde(default, alias = "q")]
    query: String,
}

async fn search(State(state): State<AppState>, Query(params): Query<SearchQuery>) -> Response {
    let results = state.catalog.search(&params.query).await;
    info!("Search '{}' returned {} movies", params.query.trim(), results.len());
    Json(results).into_response()
}

async fn movie(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    match state.catalog.details_by_id(id).await {
        Some(view) => Json(view).into_response(),
        None => not_found(format!("Movie {} not found", id)),
    }
}

async fn watchlist(State(state): State<AppState>) -> Response {
    Json(state.catalog.watchlist().await).into_response()
}

async fn add_to_watchlist(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    match state.catalog.add_to_watchlist(id).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(json!({
                "status": outcome.as_str(),
                "message": outcome.message(),
                "id": id
            })),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to update watchlist: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"status": "error", "message": "Failed to save watchlist"})),
            )
                .into_response()
        }
    }
}

async fn refresh(State(state): State<AppState>) -> Response {
    let report = state.catalog.refresh().await;
    Json(report).into_response()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        term.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        }
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        }
    }
}
