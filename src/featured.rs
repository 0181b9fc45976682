use futures::future::join_all;
use serde::Serialize;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::models::{MediaType, MovieSummary};
use crate::omdb::MovieApi;

pub const FEATURED_TITLES: [&str; 5] = [
    "Avengers",
    "Star Wars",
    "Jurassic Park",
    "Harry Potter",
    "Lord of the Rings",
];
pub const FEATURED_LIMIT: usize = 5;

/// Searches every featured title at once. A failed search contributes nothing.
pub async fn fetch_featured(api: &dyn MovieApi) -> Vec<MovieSummary> {
    let results = join_all(
        FEATURED_TITLES
            .iter()
            .map(|title| api.search(title, Some(MediaType::Movie), None)),
    )
    .await;

    let featured: Vec<MovieSummary> = FEATURED_TITLES
        .iter()
        .zip(results)
        .flat_map(|(title, res)| {
            if !res.ok {
                warn!(
                    "Featured search for '{}' failed: {}",
                    title,
                    res.error.as_deref().unwrap_or("unknown error")
                );
            }
            res.items
        })
        .filter(|m| m.poster_url.is_some())
        .take(FEATURED_LIMIT)
        .collect();
    info!("Loaded {} featured titles", featured.len());
    featured
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CarouselSnapshot {
    pub items: Vec<MovieSummary>,
    pub current: usize,
}

impl CarouselSnapshot {
    pub fn current_item(&self) -> Option<&MovieSummary> {
        self.items.get(self.current)
    }
}

/// Rotating view over the featured titles.
pub struct Carousel {
    state: watch::Sender<CarouselSnapshot>,
}

impl Carousel {
    pub fn new(items: Vec<MovieSummary>) -> Self {
        let (state, _) = watch::channel(CarouselSnapshot { items, current: 0 });
        Self { state }
    }

    pub fn subscribe(&self) -> watch::Receiver<CarouselSnapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> CarouselSnapshot {
        self.state.borrow().clone()
    }

    pub fn set_items(&self, items: Vec<MovieSummary>) {
        self.state.send_replace(CarouselSnapshot { items, current: 0 });
    }

    pub fn next(&self) {
        self.state.send_if_modified(|s| {
            if s.items.is_empty() {
                return false;
            }
            s.current = (s.current + 1) % s.items.len();
            true
        });
    }

    pub fn previous(&self) {
        self.state.send_if_modified(|s| {
            if s.items.is_empty() {
                return false;
            }
            s.current = if s.current == 0 {
                s.items.len() - 1
            } else {
                s.current - 1
            };
            true
        });
    }

    /// Advance every `period` until the carousel is dropped or the handle aborted.
    pub fn spawn_auto_advance(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(carousel) = weak.upgrade() else {
                    debug!("Carousel dropped, stopping auto-advance");
                    break;
                };
                carousel.next();
            }
        })
    }
}
