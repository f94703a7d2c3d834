//! Session artifacts persisted under the config directory
//!
//! All stores do blocking file IO; the executor calls them from
//! `spawn_blocking`.

pub mod connections;
pub mod favorites;
pub mod history;
pub mod secrets;

pub use connections::{ConnectionHistory, RecentConnection};
pub use favorites::{Favorite, FavoritesStore};
pub use history::{HistoryEntry, HistoryStore};
pub use secrets::{KeyringSecrets, MemorySecrets, SecretStore};

use std::path::Path;
use std::sync::Arc;

/// The stores the executor works with
pub struct Stores {
    pub history: HistoryStore,
    pub favorites: FavoritesStore,
    pub connections: ConnectionHistory,
    pub secrets: Arc<dyn SecretStore>,
}

impl Stores {
    pub fn open(dir: &Path, history_size: usize, secrets: Arc<dyn SecretStore>) -> Self {
        Self {
            history: HistoryStore::new(dir, history_size),
            favorites: FavoritesStore::new(dir),
            connections: ConnectionHistory::new(dir),
            secrets,
        }
    }
}
