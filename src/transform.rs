//! Mapping from upstream catalog records to [`NormalizedMovie`].

use chrono::{Datelike, NaiveDate};

use crate::models::{GenreRef, MovieDetails, NormalizedMovie, ProductionCompany};
use crate::tmdb::{RawCatalogEntry, RawMovieDetail};

pub const POSTER_BASE: &str = "https://image.tmdb.org/t/p/w500";
pub const BACKDROP_BASE: &str = "https://image.tmdb.org/t/p/w1280";
pub const NO_DESCRIPTION: &str = "No description available.";
pub const UNKNOWN_GENRE: &str = "Unknown";

/// TMDB movie genre ids known to the catalog.
pub const GENRES: [(i64, &str); 18] = [
    (28, "Action"),
    (35, "Comedy"),
    (18, "Drama"),
    (12, "Adventure"),
    (16, "Animation"),
    (80, "Crime"),
    (99, "Documentary"),
    (14, "Fantasy"),
    (36, "History"),
    (27, "Horror"),
    (10402, "Music"),
    (9648, "Mystery"),
    (10749, "Romance"),
    (878, "Science Fiction"),
    (10770, "TV Movie"),
    (53, "Thriller"),
    (10752, "War"),
    (37, "Western"),
];

pub fn genre_name(id: i64) -> &'static str {
    GENRES
        .iter()
        .find(|(known, _)| *known == id)
        .map(|(_, name)| *name)
        .unwrap_or(UNKNOWN_GENRE)
}

pub fn normalize(raw: &RawCatalogEntry) -> NormalizedMovie {
    let genres = raw
        .genre_ids
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(|id| id.map_or(UNKNOWN_GENRE, genre_name).to_string())
        .collect();
    let description = raw
        .overview
        .as_deref()
        .filter(|o| !o.is_empty())
        .unwrap_or(NO_DESCRIPTION)
        .to_string();

    NormalizedMovie {
        id: raw.id,
        title: raw.title.clone().unwrap_or_default(),
        genres,
        rating: format_rating(raw.vote_average.unwrap_or(0.0)),
        year: raw.release_date.as_deref().and_then(release_year),
        description,
        poster: image_url(POSTER_BASE, raw.poster_path.as_deref()),
        backdrop: image_url(BACKDROP_BASE, raw.backdrop_path.as_deref()),
        release_date: raw.release_date.clone(),
        popularity: raw.popularity.unwrap_or(0.0),
        vote_count: raw.vote_count.unwrap_or(0),
    }
}

pub fn normalize_all(raw: &[RawCatalogEntry]) -> Vec<NormalizedMovie> {
    raw.iter().map(normalize).collect()
}

/// Merges the detail payload over a summary already held for the same movie.
pub fn enrich(summary: NormalizedMovie, detail: RawMovieDetail) -> MovieDetails {
    MovieDetails {
        movie: summary,
        runtime: detail.runtime.filter(|r| *r > 0),
        budget: detail.budget,
        revenue: detail.revenue,
        genre_details: detail
            .genres
            .into_iter()
            .map(|g| GenreRef {
                id: g.id,
                name: g.name,
            })
            .collect(),
        production_companies: detail
            .production_companies
            .into_iter()
            .map(|c| ProductionCompany {
                id: c.id,
                name: c.name,
                logo_path: c.logo_path,
                origin_country: c.origin_country.filter(|o| !o.is_empty()),
            })
            .collect(),
        tagline: detail.tagline.unwrap_or_default(),
        homepage: detail.homepage.filter(|h| !h.is_empty()),
    }
}

fn format_rating(vote_average: f64) -> String {
    let scaled = if vote_average.is_finite() {
        vote_average / 10.0
    } else {
        0.0
    };
    // `{:.1}` rounds the exact binary value but sends exact ties (x.x5 is only
    // representable as odd quarters) to the even digit; those round upward.
    let quarters = scaled * 4.0;
    if quarters.fract() == 0.0 && quarters % 2.0 != 0.0 {
        return format!("{:.1}", (scaled * 10.0).round() / 10.0);
    }
    format!("{:.1}", scaled)
}

fn release_year(date: &str) -> Option<i32> {
    let date = date.trim();
    if let Ok(d) = NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        return Some(d.year());
    }
    if date.len() == 4 && date.chars().all(|c| c.is_ascii_digit()) {
        return date.parse().ok();
    }
    None
}

fn image_url(base: &str, path: Option<&str>) -> Option<String> {
    path.filter(|p| !p.is_empty())
        .map(|p| format!("{base}{p}"))
}
