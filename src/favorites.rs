use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{info, warn};

use crate::error::MovieResult;
use crate::models::MovieSummary;
use crate::storage::{save_json, LocalStore, FAVORITES_KEY};

/// Saved titles, unique by id, in the order they were first added.
/// Persisted whole on every change.
pub struct FavoritesStore {
    store: Arc<dyn LocalStore>,
    write_lock: Mutex<()>,
    state: watch::Sender<Vec<MovieSummary>>,
}

impl FavoritesStore {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        let (state, _) = watch::channel(Vec::new());
        Self {
            store,
            write_lock: Mutex::new(()),
            state,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<MovieSummary>> {
        self.state.subscribe()
    }

    pub async fn list(&self) -> MovieResult<Vec<MovieSummary>> {
        let items = self.read_items().await?;
        self.state.send_replace(items.clone());
        Ok(items)
    }

    pub async fn contains(&self, id: &str) -> MovieResult<bool> {
        Ok(self.list().await?.iter().any(|m| m.id == id))
    }

    /// Removes the title when present, appends it otherwise. Returns whether it
    /// is a favorite afterwards.
    pub async fn toggle(&self, item: MovieSummary) -> MovieResult<bool> {
        let _guard = self.write_lock.lock().await;
        let mut items = self.read_items().await?;

        let before = items.len();
        items.retain(|m| m.id != item.id);
        let added = items.len() == before;
        if added {
            info!("Adding '{}' to favorites", item.title);
            items.push(item);
        } else {
            info!("Removing '{}' from favorites", item.title);
        }

        save_json(self.store.as_ref(), FAVORITES_KEY, &items).await?;
        self.state.send_replace(items);
        Ok(added)
    }

    /// An unreadable blob counts as an empty set; the next toggle overwrites it.
    async fn read_items(&self) -> MovieResult<Vec<MovieSummary>> {
        let Some(raw) = self.store.get(FAVORITES_KEY).await? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&raw) {
            Ok(items) => Ok(items),
            Err(e) => {
                warn!("Ignoring unreadable favorites: {}", e);
                Ok(Vec::new())
            }
        }
    }
}
