use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Normalized catalog record handed to the rendering side.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedMovie {
    pub id: i64,
    pub title: String,
    pub genres: Vec<String>,
    /// `vote_average / 10` with exactly one fractional digit.
    pub rating: String,
    /// `None` when the release date is missing or unparseable.
    pub year: Option<i32>,
    pub description: String,
    pub poster: Option<String>,
    pub backdrop: Option<String>,
    pub release_date: Option<String>,
    pub popularity: f64,
    pub vote_count: u64,
}

impl NormalizedMovie {
    /// Numeric view of `rating`; a malformed value sorts last.
    pub fn rating_value(&self) -> f64 {
        self.rating.parse().unwrap_or(f64::NEG_INFINITY)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GenreRef {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductionCompany {
    pub id: i64,
    pub name: String,
    pub logo_path: Option<String>,
    pub origin_country: Option<String>,
}

/// Summary record enriched with the single-movie detail payload.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MovieDetails {
    #[serde(flatten)]
    pub movie: NormalizedMovie,
    pub runtime: Option<u32>,
    pub budget: Option<u64>,
    pub revenue: Option<u64>,
    #[serde(rename = "genreDetails")]
    pub genre_details: Vec<GenreRef>,
    pub production_companies: Vec<ProductionCompany>,
    pub tagline: String,
    pub homepage: Option<String>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(tag = "kind", content = "movie", rename_all = "snake_case")]
pub enum DetailView {
    Detailed(MovieDetails),
    /// Detail fetch failed; the summary already held is shown instead.
    Summary(NormalizedMovie),
}

impl DetailView {
    pub fn id(&self) -> i64 {
        match self {
            DetailView::Detailed(d) => d.movie.id,
            DetailView::Summary(m) => m.id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    Popular,
    TopRated,
    Action,
    Comedy,
    Drama,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Popular,
        Category::TopRated,
        Category::Action,
        Category::Comedy,
        Category::Drama,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Category::Popular => "popular",
            Category::TopRated => "topRated",
            Category::Action => "action",
            Category::Comedy => "comedy",
            Category::Drama => "drama",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }

    /// Upstream endpoint path and query parameters for this category's page 1.
    pub fn endpoint(self) -> (&'static str, Vec<(&'static str, String)>) {
        match self {
            Category::Popular => (
                "/movie/popular",
                vec![("language", "en-US".into()), ("page", "1".into())],
            ),
            Category::TopRated => (
                "/movie/top_rated",
                vec![("language", "en-US".into()), ("page", "1".into())],
            ),
            Category::Action => ("/discover/movie", discover_params(28)),
            Category::Comedy => ("/discover/movie", discover_params(35)),
            Category::Drama => ("/discover/movie", discover_params(18)),
        }
    }
}

fn discover_params(genre_id: i64) -> Vec<(&'static str, String)> {
    vec![
        ("with_genres", genre_id.to_string()),
        ("sort_by", "popularity.desc".into()),
        ("page", "1".into()),
    ]
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> anyhow::Result<Self> {
        Category::ALL
            .into_iter()
            .find(|c| c.key().eq_ignore_ascii_case(s))
            .or(match s {
                "top_rated" | "top-rated" => Some(Category::TopRated),
                _ => None,
            })
            .ok_or_else(|| anyhow::anyhow!("unknown category '{}'", s))
    }
}
