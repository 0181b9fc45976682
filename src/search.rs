use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::debug;

use crate::error::{MovieError, MovieResult};
use crate::models::{MediaType, MovieSummary};
use crate::omdb::MovieApi;

const NO_MOVIES: &str = "No movies found";

/// Inclusive year bounds, validated so that `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct YearRange {
    start: i32,
    end: i32,
}

impl YearRange {
    pub fn new(start: i32, end: i32) -> MovieResult<Self> {
        for y in [start, end] {
            if !(1000..=9999).contains(&y) {
                return Err(MovieError::Validation(format!(
                    "Year must have four digits (got {})",
                    y
                )));
            }
        }
        if start > end {
            return Err(MovieError::Validation(format!(
                "Start year {} is after end year {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> i32 {
        self.start
    }

    pub fn end(&self) -> i32 {
        self.end
    }

    pub fn contains(&self, year: i32) -> bool {
        (self.start..=self.end).contains(&year)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchFilters {
    pub term: String,
    /// `None` means any type.
    pub media_type: Option<MediaType>,
    pub year_range: Option<YearRange>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchState {
    pub filters: SearchFilters,
    pub items: Vec<MovieSummary>,
    pub total_count: u64,
    pub loading: bool,
    pub error: Option<String>,
}

/// Holds the current filters and the results derived from them. Every filter
/// change re-runs the search; only the most recently issued search may publish.
///
/// The provider accepts a single year, so a range is sent as its start year and
/// the response is narrowed to the range locally. Titles from later years in the
/// range are only found when the provider happens to return them.
pub struct SearchFilterHolder {
    api: Arc<dyn MovieApi>,
    filters: Mutex<SearchFilters>,
    latest: AtomicU64,
    state: watch::Sender<SearchState>,
}

impl SearchFilterHolder {
    pub fn new(api: Arc<dyn MovieApi>) -> Self {
        let (state, _) = watch::channel(SearchState::default());
        Self {
            api,
            filters: Mutex::new(SearchFilters::default()),
            latest: AtomicU64::new(0),
            state,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> SearchState {
        self.state.borrow().clone()
    }

    pub async fn set_search_term(&self, term: &str) -> SearchState {
        self.filters.lock().await.term = term.trim().to_string();
        self.refresh().await
    }

    pub async fn set_media_type(&self, media_type: Option<MediaType>) -> SearchState {
        self.filters.lock().await.media_type = media_type;
        self.refresh().await
    }

    pub async fn set_year_range(&self, range: Option<YearRange>) -> SearchState {
        self.filters.lock().await.year_range = range;
        self.refresh().await
    }

    /// Replace every filter at once and search once.
    pub async fn apply(&self, filters: SearchFilters) -> SearchState {
        {
            let mut current = self.filters.lock().await;
            *current = SearchFilters {
                term: filters.term.trim().to_string(),
                ..filters
            };
        }
        self.refresh().await
    }

    pub async fn refresh(&self) -> SearchState {
        // Ticket order must follow filter-write order.
        let (filters, ticket) = {
            let current = self.filters.lock().await;
            (current.clone(), self.latest.fetch_add(1, Ordering::SeqCst) + 1)
        };

        if filters.term.is_empty() {
            self.publish(
                ticket,
                SearchState {
                    filters,
                    ..SearchState::default()
                },
            );
            return self.snapshot();
        }

        self.publish(
            ticket,
            SearchState {
                filters: filters.clone(),
                loading: true,
                ..SearchState::default()
            },
        );

        let year_param = filters.year_range.map(|r| r.start());
        let result = self
            .api
            .search(&filters.term, filters.media_type, year_param)
            .await;

        let next = if result.ok {
            let items = match filters.year_range {
                Some(range) => within_range(result.items, range),
                None => result.items,
            };
            SearchState {
                filters,
                items,
                total_count: result.total_count,
                loading: false,
                error: None,
            }
        } else {
            SearchState {
                filters,
                error: Some(result.error.unwrap_or_else(|| NO_MOVIES.to_string())),
                ..SearchState::default()
            }
        };

        if !self.publish(ticket, next) {
            debug!("Discarding results of superseded search #{}", ticket);
        }
        self.snapshot()
    }

    fn publish(&self, ticket: u64, next: SearchState) -> bool {
        self.state.send_if_modified(|current| {
            if self.latest.load(Ordering::SeqCst) != ticket {
                return false;
            }
            *current = next;
            true
        })
    }
}

/// Items with no parseable year are dropped as well.
fn within_range(items: Vec<MovieSummary>, range: YearRange) -> Vec<MovieSummary> {
    items
        .into_iter()
        .filter(|m| m.parsed_year().is_some_and(|y| range.contains(y)))
        .collect()
}
