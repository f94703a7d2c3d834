//! Password storage
//!
//! Passwords never touch the JSON stores; they are kept in the OS keyring
//! under `host:port/database@user`.

use crate::error::{StoreError, StoreResult};
use std::collections::HashMap;
use std::sync::Mutex;

const SERVICE_NAME: &str = "pgnav";

pub trait SecretStore: Send + Sync {
    fn get(&self, key: &str) -> StoreResult<Option<String>>;
    fn set(&self, key: &str, secret: &str) -> StoreResult<()>;
    fn delete(&self, key: &str) -> StoreResult<()>;
}

/// OS keyring (Keychain, Secret Service, Credential Manager)
#[derive(Debug, Clone)]
pub struct KeyringSecrets {
    service: String,
}

impl KeyringSecrets {
    pub fn new() -> Self {
        Self {
            service: SERVICE_NAME.to_string(),
        }
    }

    fn entry(&self, key: &str) -> StoreResult<keyring::Entry> {
        keyring::Entry::new(&self.service, key)
            .map_err(|e| StoreError::Secret(format!("Failed to create keyring entry: {}", e)))
    }
}

impl Default for KeyringSecrets {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretStore for KeyringSecrets {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(StoreError::Secret(e.to_string())),
        }
    }

    fn set(&self, key: &str, secret: &str) -> StoreResult<()> {
        self.entry(key)?
            .set_password(secret)
            .map_err(|e| StoreError::Secret(e.to_string()))
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(StoreError::Secret(e.to_string())),
        }
    }
}

/// Process-local store, for tests and when no keyring is available
#[derive(Debug, Default)]
pub struct MemorySecrets {
    secrets: Mutex<HashMap<String, String>>,
}

impl MemorySecrets {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecretStore for MemorySecrets {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let secrets = self.secrets.lock().unwrap_or_else(|e| e.into_inner());
        Ok(secrets.get(key).cloned())
    }

    fn set(&self, key: &str, secret: &str) -> StoreResult<()> {
        let mut secrets = self.secrets.lock().unwrap_or_else(|e| e.into_inner());
        secrets.insert(key.to_string(), secret.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        let mut secrets = self.secrets.lock().unwrap_or_else(|e| e.into_inner());
        secrets.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_secrets_roundtrip() {
        let store = MemorySecrets::new();
        assert_eq!(store.get("h:5432/db@u").unwrap(), None);
        store.set("h:5432/db@u", "pw").unwrap();
        assert_eq!(store.get("h:5432/db@u").unwrap().as_deref(), Some("pw"));
        store.delete("h:5432/db@u").unwrap();
        assert_eq!(store.get("h:5432/db@u").unwrap(), None);
    }

    #[test]
    fn test_delete_missing_is_ok() {
        let store = MemorySecrets::new();
        assert!(store.delete("absent").is_ok());
    }
}
