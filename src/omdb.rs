use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::config::{Config, RetryPolicy};
use crate::error::{MovieError, MovieResult};
use crate::models::{MediaType, MovieDetail, MovieSummary, Rating, SearchResult};
use crate::omdb_fallback::placeholder_detail;

const SEARCH_FAILED: &str = "Failed to fetch movies. Please try again.";
const NO_RESULTS: &str = "No results found";
const DETAIL_NOT_FOUND: &str = "Movie not found";
const NOT_AVAILABLE: &str = "N/A";

#[async_trait]
pub trait MovieApi: Send + Sync {
    /// Never fails: provider and network problems come back as a `SearchResult`
    /// with `ok == false` and a message.
    async fn search(&self, term: &str, media_type: Option<MediaType>, year: Option<i32>)
        -> SearchResult;
    async fn get_detail(&self, id: &str) -> MovieResult<MovieDetail>;
}

/// Fetch a detail record, substituting placeholder data on any failure.
pub async fn get_detail_with_fallback(api: &dyn MovieApi, id: &str) -> MovieDetail {
    match api.get_detail(id).await {
        Ok(detail) => detail,
        Err(e) => {
            warn!("Using fallback detail for '{}': {}", id, e);
            placeholder_detail(id)
        }
    }
}

#[derive(Debug, Clone)]
pub struct OmdbClient {
    client: Client,
    api_key: String,
    base_url: String,
    retry: RetryPolicy,
}

impl OmdbClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>, retry: RetryPolicy) -> anyhow::Result<Self> {
        let user_agent = format!("cinescope/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .user_agent(user_agent)
            .build()
            .context("Failed to build OMDb HTTP client")?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into(),
            retry: RetryPolicy {
                attempts: retry.attempts.max(1),
                delay: retry.delay,
            },
        })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Self::new(config.api_key.clone(), config.base_url.clone(), config.retry)
    }

    fn url_for(&self, query: &str) -> String {
        format!(
            "{}?apikey={}&{}",
            self.base_url,
            urlencoding::encode(&self.api_key),
            query
        )
    }

    /// GET with a fixed number of attempts. Non-2xx statuses and transport errors
    /// both count as failed attempts; the last one is surfaced.
    async fn get_with_retry(&self, query: &str) -> MovieResult<String> {
        let url = self.url_for(query);
        debug!("OMDb request ?{}", query);

        let mut last_error = String::from("Failed to fetch after multiple attempts");
        for attempt in 1..=self.retry.attempts {
            match self.get_once(&url).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    warn!("Fetch attempt {} failed: {}", attempt, e);
                    last_error = e;
                }
            }
            if attempt < self.retry.attempts {
                tokio::time::sleep(self.retry.delay).await;
            }
        }
        error!(
            "OMDb request ?{} failed after {} attempts",
            query, self.retry.attempts
        );
        Err(MovieError::Network(last_error))
    }

    async fn get_once(&self, url: &str) -> Result<String, String> {
        let res = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| format!("request failed: {}", e.without_url()))?;
        let status = res.status();
        if !status.is_success() {
            return Err(format!("HTTP error! Status: {}", status.as_u16()));
        }
        res.text()
            .await
            .map_err(|e| format!("reading body failed: {}", e.without_url()))
    }
}

#[async_trait]
impl MovieApi for OmdbClient {
    async fn search(
        &self,
        term: &str,
        media_type: Option<MediaType>,
        year: Option<i32>,
    ) -> SearchResult {
        let mut query = format!("s={}", urlencoding::encode(term));
        if let Some(t) = media_type {
            query.push_str(&format!("&type={}", t.as_param()));
        }
        if let Some(y) = year {
            if !(1000..=9999).contains(&y) {
                return SearchResult::failed(format!("Year must have four digits (got {})", y));
            }
            query.push_str(&format!("&y={}", y));
        }

        let body = match self.get_with_retry(&query).await {
            Ok(b) => b,
            Err(e) => {
                error!("Error searching movies for '{}': {}", term, e);
                return SearchResult::failed(SEARCH_FAILED);
            }
        };
        let data: SearchResponse = match serde_json::from_str(&body) {
            Ok(d) => d,
            Err(e) => {
                error!("Unreadable OMDb search response for '{}': {}", term, e);
                return SearchResult::failed(SEARCH_FAILED);
            }
        };
        map_search(data)
    }

    async fn get_detail(&self, id: &str) -> MovieResult<MovieDetail> {
        let id = id.trim();
        if id.is_empty() {
            return Err(MovieError::Validation("Movie ID is required".to_string()));
        }
        let query = format!("i={}&plot=full", urlencoding::encode(id));
        let body = self.get_with_retry(&query).await?;
        let data: DetailResponse = serde_json::from_str(&body)
            .map_err(|e| MovieError::Network(format!("JSON parse failed: {}", e)))?;
        map_detail(data)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "Response")]
    response: String,
    #[serde(rename = "Search", default)]
    search: Vec<SearchItem>,
    #[serde(rename = "totalResults")]
    total_results: Option<String>,
    #[serde(rename = "Error")]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(rename = "imdbID")]
    imdb_id: String,
    #[serde(rename = "Title")]
    title: String,
    #[serde(rename = "Year", default)]
    year: String,
    #[serde(rename = "Poster")]
    poster: Option<String>,
    #[serde(rename = "Type", default)]
    media_type: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DetailResponse {
    #[serde(rename = "Response")]
    response: String,
    #[serde(rename = "Error")]
    error: Option<String>,
    #[serde(rename = "imdbID")]
    imdb_id: Option<String>,
    #[serde(rename = "Title")]
    title: Option<String>,
    #[serde(rename = "Year")]
    year: Option<String>,
    #[serde(rename = "Rated")]
    rated: Option<String>,
    #[serde(rename = "Released")]
    released: Option<String>,
    #[serde(rename = "Runtime")]
    runtime: Option<String>,
    #[serde(rename = "Genre")]
    genre: Option<String>,
    #[serde(rename = "Director")]
    director: Option<String>,
    #[serde(rename = "Writer")]
    writer: Option<String>,
    #[serde(rename = "Actors")]
    actors: Option<String>,
    #[serde(rename = "Plot")]
    plot: Option<String>,
    #[serde(rename = "Language")]
    language: Option<String>,
    #[serde(rename = "Country")]
    country: Option<String>,
    #[serde(rename = "Awards")]
    awards: Option<String>,
    #[serde(rename = "Poster")]
    poster: Option<String>,
    #[serde(rename = "Ratings")]
    ratings: Vec<WireRating>,
    #[serde(rename = "Metascore")]
    metascore: Option<String>,
    #[serde(rename = "imdbRating")]
    imdb_rating: Option<String>,
    #[serde(rename = "imdbVotes")]
    imdb_votes: Option<String>,
    #[serde(rename = "Type")]
    media_type: Option<String>,
    #[serde(rename = "BoxOffice")]
    box_office: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireRating {
    #[serde(rename = "Source")]
    source: String,
    #[serde(rename = "Value")]
    value: String,
}

fn map_search(data: SearchResponse) -> SearchResult {
    if data.response != "True" {
        return SearchResult::failed(
            data.error
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| NO_RESULTS.to_string()),
        );
    }
    let items: Vec<MovieSummary> = data
        .search
        .into_iter()
        .filter_map(|item| {
            let media_type = match item.media_type.parse::<MediaType>() {
                Ok(t) => t,
                Err(_) => {
                    debug!(
                        "Skipping '{}' with unsupported type '{}'",
                        item.title, item.media_type
                    );
                    return None;
                }
            };
            Some(MovieSummary {
                id: item.imdb_id,
                title: item.title,
                year: item.year,
                poster_url: available(item.poster),
                media_type,
            })
        })
        .collect();
    let total_count = data
        .total_results
        .as_deref()
        .and_then(|t| t.trim().parse::<u64>().ok())
        .unwrap_or(items.len() as u64);
    SearchResult {
        items,
        total_count,
        ok: true,
        error: None,
    }
}

fn map_detail(data: DetailResponse) -> MovieResult<MovieDetail> {
    if data.response != "True" {
        return Err(MovieError::NotFound(
            data.error
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| DETAIL_NOT_FOUND.to_string()),
        ));
    }
    let id = available(data.imdb_id)
        .ok_or_else(|| MovieError::Network("detail response has no imdbID".to_string()))?;
    let media_type = data
        .media_type
        .as_deref()
        .and_then(|t| t.parse::<MediaType>().ok())
        .unwrap_or(MediaType::Movie);
    let genres = available(data.genre)
        .map(|g| split_list(&g))
        .unwrap_or_default();
    let imdb_rating = available(data.imdb_rating).and_then(|r| r.trim().parse::<f32>().ok());

    Ok(MovieDetail {
        summary: MovieSummary {
            id,
            title: data.title.unwrap_or_default(),
            year: data.year.unwrap_or_default(),
            poster_url: available(data.poster),
            media_type,
        },
        rated: available(data.rated),
        released: available(data.released),
        runtime: available(data.runtime),
        genres,
        director: available(data.director),
        writer: available(data.writer),
        actors: available(data.actors),
        plot: available(data.plot),
        language: available(data.language),
        country: available(data.country),
        awards: available(data.awards),
        ratings: data
            .ratings
            .into_iter()
            .map(|r| Rating {
                source: r.source,
                value: r.value,
            })
            .collect(),
        metascore: available(data.metascore),
        imdb_rating,
        imdb_votes: available(data.imdb_votes),
        box_office: available(data.box_office),
        fallback: false,
    })
}

/// The provider spells "absent" as the literal `N/A`.
fn available(value: Option<String>) -> Option<String> {
    value.filter(|v| {
        let v = v.trim();
        !v.is_empty() && v != NOT_AVAILABLE
    })
}

pub(crate) fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}
