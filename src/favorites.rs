//! Favorites service.
//!
//! Owns the set of favorite ids for one app session. Mutations change the
//! in-memory set first and then write the whole set to the key-value store
//! as a JSON array. The in-memory set stays authoritative when a write
//! fails; the failure is kept as a user-facing message until the next
//! successful operation. Observers subscribe to snapshots through a
//! `tokio::sync::watch` channel.

use crate::error::StorageError;
use crate::storage::KeyValueStore;
use std::collections::BTreeSet;
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub const FAVORITES_STORAGE_KEY: &str = "@pokemon_favorites";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FavoritesSnapshot {
    pub ids: BTreeSet<u32>,
    pub is_loading: bool,
    pub error: Option<String>,
}

pub struct FavoritesStore<S> {
    storage: S,
    state: FavoritesSnapshot,
    notify: watch::Sender<FavoritesSnapshot>,
}

impl<S: KeyValueStore> FavoritesStore<S> {
    pub fn new(storage: S) -> Self {
        let (notify, _) = watch::channel(FavoritesSnapshot::default());
        Self {
            storage,
            state: FavoritesSnapshot::default(),
            notify,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<FavoritesSnapshot> {
        self.notify.subscribe()
    }

    pub fn snapshot(&self) -> &FavoritesSnapshot {
        &self.state
    }

    pub fn favorites(&self) -> &BTreeSet<u32> {
        &self.state.ids
    }

    pub fn is_favorite(&self, id: u32) -> bool {
        self.state.ids.contains(&id)
    }

    /// All ids in ascending order.
    pub fn ids(&self) -> Vec<u32> {
        self.state.ids.iter().copied().collect()
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading
    }

    pub fn error(&self) -> Option<&str> {
        self.state.error.as_deref()
    }

    fn publish(&self) {
        self.notify.send_replace(self.state.clone());
    }

    /// Replace the in-memory set with what is persisted. Missing or
    /// corrupted data yields an empty set.
    pub fn load(&mut self) {
        self.state.is_loading = true;
        self.state.error = None;
        self.publish();

        let ids = match self.storage.get_item(FAVORITES_STORAGE_KEY) {
            Ok(Some(raw)) => parse_ids(&raw),
            Ok(None) => BTreeSet::new(),
            Err(e) => {
                warn!(error = %e, "could not read favorites, starting empty");
                BTreeSet::new()
            }
        };
        info!(count = ids.len(), "favorites loaded");

        self.state.ids = ids;
        self.state.is_loading = false;
        self.publish();
    }

    pub fn add(&mut self, id: u32, name: &str) -> Result<(), StorageError> {
        self.state.error = None;
        self.state.ids.insert(id);
        let res = self.persist();
        match &res {
            Ok(()) => debug!(id, %name, "added to favorites"),
            Err(e) => {
                warn!(id, %name, error = %e, "failed to persist favorite");
                self.state.error = Some(format!("Could not add {} to favorites", name));
            }
        }
        self.publish();
        res
    }

    pub fn remove(&mut self, id: u32) -> Result<(), StorageError> {
        self.state.error = None;
        self.state.ids.remove(&id);
        let res = self.persist();
        match &res {
            Ok(()) => debug!(id, "removed from favorites"),
            Err(e) => {
                warn!(id, error = %e, "failed to persist favorite removal");
                self.state.error = Some("Could not remove from favorites".to_string());
            }
        }
        self.publish();
        res
    }

    /// Returns the new membership state.
    pub fn toggle(&mut self, id: u32, name: &str) -> Result<bool, StorageError> {
        if self.is_favorite(id) {
            self.remove(id).map(|_| false)
        } else {
            self.add(id, name).map(|_| true)
        }
    }

    pub fn clear(&mut self) -> Result<(), StorageError> {
        self.state.error = None;
        self.state.ids.clear();
        let res = self.storage.remove_item(FAVORITES_STORAGE_KEY);
        if let Err(e) = &res {
            warn!(error = %e, "failed to clear persisted favorites");
            self.state.error = Some("Could not clear favorites".to_string());
        } else {
            info!("favorites cleared");
        }
        self.publish();
        res
    }

    fn persist(&self) -> Result<(), StorageError> {
        let ids: Vec<u32> = self.ids();
        let json = serde_json::to_string(&ids)?;
        self.storage.set_item(FAVORITES_STORAGE_KEY, &json)
    }
}

fn parse_ids(raw: &str) -> BTreeSet<u32> {
    match serde_json::from_str::<Vec<u32>>(raw) {
        Ok(ids) => ids.into_iter().collect(),
        Err(e) => {
            warn!(error = %e, "corrupted favorites data, starting empty");
            BTreeSet::new()
        }
    }
}
