//! Saved queries
//!
//! A JSON list in `<config dir>/favorites.json`. Ids are generated UUIDs;
//! names are unique ignoring case.

use crate::error::{StoreError, StoreResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const FAVORITES_FILE: &str = "favorites.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Favorite {
    pub id: String,
    pub name: String,
    pub query: String,
    /// Database the query was saved from
    #[serde(default)]
    pub database: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct FavoritesStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FavoritesStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(FAVORITES_FILE),
            lock: Mutex::new(()),
        }
    }

    pub fn add(&self, name: &str, query: &str, database: Option<&str>) -> StoreResult<Favorite> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let name = checked_name(name)?;
        let mut favorites = self.read()?;
        ensure_unique(&favorites, &name, None)?;
        let now = Utc::now();
        let favorite = Favorite {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            query: query.to_string(),
            database: database.map(str::to_string),
            created_at: now,
            updated_at: now,
        };
        favorites.push(favorite.clone());
        self.write(&favorites)?;
        Ok(favorite)
    }

    pub fn update(&self, id: &str, name: &str, query: &str) -> StoreResult<Favorite> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let name = checked_name(name)?;
        let mut favorites = self.read()?;
        ensure_unique(&favorites, &name, Some(id))?;
        let favorite = favorites
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        favorite.name = name;
        favorite.query = query.to_string();
        favorite.updated_at = Utc::now();
        let updated = favorite.clone();
        self.write(&favorites)?;
        Ok(updated)
    }

    pub fn delete(&self, id: &str) -> StoreResult<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut favorites = self.read()?;
        let before = favorites.len();
        favorites.retain(|f| f.id != id);
        if favorites.len() == before {
            return Err(StoreError::NotFound(id.to_string()));
        }
        self.write(&favorites)
    }

    /// All favorites ordered by name
    pub fn list(&self) -> StoreResult<Vec<Favorite>> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut favorites = self.read()?;
        favorites.sort_by_key(|f| f.name.to_lowercase());
        Ok(favorites)
    }

    fn read(&self) -> StoreResult<Vec<Favorite>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(Vec::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, favorites: &[Favorite]) -> StoreResult<()> {
        let content = serde_json::to_string_pretty(favorites)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn checked_name(name: &str) -> StoreResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(StoreError::EmptyName);
    }
    Ok(name.to_string())
}

fn ensure_unique(favorites: &[Favorite], name: &str, except_id: Option<&str>) -> StoreResult<()> {
    let lower = name.to_lowercase();
    let clash = favorites
        .iter()
        .any(|f| f.name.to_lowercase() == lower && Some(f.id.as_str()) != except_id);
    if clash {
        Err(StoreError::DuplicateName(name.to_string()))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, FavoritesStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FavoritesStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn test_add_and_list_sorted() {
        let (_dir, store) = store();
        store.add("zeta", "SELECT 2", None).unwrap();
        store.add("Alpha", "SELECT 1", Some("app")).unwrap();
        let names: Vec<String> = store.list().unwrap().into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["Alpha", "zeta"]);
    }

    #[test]
    fn test_names_unique_ignoring_case() {
        let (_dir, store) = store();
        store.add("Active users", "SELECT 1", None).unwrap();
        let err = store.add("ACTIVE USERS", "SELECT 2", None).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateName(_)));
    }

    #[test]
    fn test_empty_name_rejected() {
        let (_dir, store) = store();
        assert!(matches!(
            store.add("   ", "SELECT 1", None),
            Err(StoreError::EmptyName)
        ));
    }

    #[test]
    fn test_update_keeps_own_name() {
        let (_dir, store) = store();
        let fav = store.add("report", "SELECT 1", None).unwrap();
        let updated = store.update(&fav.id, "Report", "SELECT 2").unwrap();
        assert_eq!(updated.id, fav.id);
        assert_eq!(updated.query, "SELECT 2");
        assert_eq!(updated.created_at, fav.created_at);
    }

    #[test]
    fn test_update_rejects_other_name() {
        let (_dir, store) = store();
        store.add("a", "SELECT 1", None).unwrap();
        let b = store.add("b", "SELECT 2", None).unwrap();
        assert!(matches!(
            store.update(&b.id, "A", "SELECT 2"),
            Err(StoreError::DuplicateName(_))
        ));
    }

    #[test]
    fn test_delete() {
        let (_dir, store) = store();
        let fav = store.add("x", "SELECT 1", None).unwrap();
        store.delete(&fav.id).unwrap();
        assert!(store.list().unwrap().is_empty());
        assert!(matches!(store.delete(&fav.id), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_ids_are_unique() {
        let (_dir, store) = store();
        let a = store.add("a", "SELECT 1", None).unwrap();
        let b = store.add("b", "SELECT 1", None).unwrap();
        assert_ne!(a.id, b.id);
    }
}
