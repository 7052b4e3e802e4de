#![allow(dead_code)]

use cinescope::catalog::Catalog;
use cinescope::prefs::{KeyValueStore, MemoryStore};
use cinescope::tmdb::{CatalogApi, TransportError};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Canned upstream keyed by endpoint, plus `?with_genres=<id>` for discover calls.
#[derive(Default)]
pub struct FakeTmdb {
    pub responses: Mutex<HashMap<String, Result<Value, u16>>>,
    pub requests: Mutex<Vec<(String, Vec<(String, String)>)>>,
}

impl FakeTmdb {
    pub fn with(self, key: &str, response: Result<Value, u16>) -> Self {
        self.set(key, response);
        self
    }

    pub fn set(&self, key: &str, response: Result<Value, u16>) {
        self.responses
            .lock()
            .unwrap()
            .insert(key.to_string(), response);
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Every category endpoint answering with the given movies.
    pub fn all_categories(self) -> Self {
        self.with("/movie/popular", Ok(page(&[(1, 7.0), (2, 9.0), (3, 5.0)])))
            .with("/movie/top_rated", Ok(page(&[(2, 9.0), (4, 8.0), (5, 8.1)])))
            .with("/discover/movie?with_genres=28", Ok(page(&[(10, 6.0)])))
            .with("/discover/movie?with_genres=35", Ok(page(&[(20, 6.5), (21, 6.1)])))
            .with("/discover/movie?with_genres=18", Ok(page(&[(30, 7.5)])))
    }
}

#[async_trait::async_trait]
impl CatalogApi for FakeTmdb {
    async fn get_json(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<Value, TransportError> {
        self.requests.lock().unwrap().push((
            endpoint.to_string(),
            params
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        ));
        let key = match params.iter().find(|(k, _)| *k == "with_genres") {
            Some((_, genre)) => format!("{endpoint}?with_genres={genre}"),
            None => endpoint.to_string(),
        };
        let response = self.responses.lock().unwrap().get(&key).cloned();
        match response {
            Some(Ok(body)) => Ok(body),
            Some(Err(code)) => Err(TransportError::Status {
                endpoint: endpoint.to_string(),
                status: StatusCode::from_u16(code).unwrap(),
                body: "upstream error".to_string(),
            }),
            None => Err(TransportError::Status {
                endpoint: endpoint.to_string(),
                status: StatusCode::NOT_FOUND,
                body: "no canned response".to_string(),
            }),
        }
    }
}

pub fn entry(id: i64, vote_average: f64) -> Value {
    json!({
        "id": id,
        "title": format!("Movie {id}"),
        "genre_ids": [28, 99999],
        "vote_average": vote_average,
        "release_date": "2020-05-01",
        "overview": format!("Overview {id}"),
        "poster_path": format!("/p{id}.jpg"),
        "backdrop_path": null,
        "popularity": 12.5,
        "vote_count": 100
    })
}

pub fn page(movies: &[(i64, f64)]) -> Value {
    json!({
        "page": 1,
        "results": movies.iter().map(|(id, v)| entry(*id, *v)).collect::<Vec<_>>()
    })
}

pub fn catalog_with(api: Arc<FakeTmdb>) -> (Arc<Catalog>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::default());
    let catalog = Catalog::new(api, store.clone() as Arc<dyn KeyValueStore>);
    (Arc::new(catalog), store)
}
