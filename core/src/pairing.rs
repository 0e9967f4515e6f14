// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Pairing storage, keyed by card instance UID (hex)

use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};

use keycard_card::PairingInfo;

/// Pairing store error
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("pairing store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pairing store encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

/// [PairingStore] persists pairings between sessions
///
/// Stores may be shared between engine instances and must synchronise
/// access internally.
pub trait PairingStore: Send + Sync {
    /// Fetch the pairing for a card instance
    fn get(&self, instance_uid: &str) -> Option<PairingInfo>;

    /// Store (or replace) the pairing for a card instance
    fn store(&self, instance_uid: &str, pairing: PairingInfo) -> Result<(), StoreError>;

    /// Remove the pairing for a card instance
    fn delete(&self, instance_uid: &str) -> Result<(), StoreError>;
}

/// In-memory [PairingStore], contents are lost on drop
#[derive(Debug, Default)]
pub struct MemoryPairingStore {
    values: Mutex<HashMap<String, PairingInfo>>,
}

impl MemoryPairingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored pairings
    pub fn len(&self) -> usize {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PairingStore for MemoryPairingStore {
    fn get(&self, instance_uid: &str) -> Option<PairingInfo> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.get(instance_uid).cloned()
    }

    fn store(&self, instance_uid: &str, pairing: PairingInfo) -> Result<(), StoreError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert(instance_uid.to_string(), pairing);
        Ok(())
    }

    fn delete(&self, instance_uid: &str) -> Result<(), StoreError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.remove(instance_uid);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_get_delete() {
        let s = MemoryPairingStore::new();
        let p = PairingInfo {
            key: vec![0x11; 32],
            index: 3,
        };

        assert_eq!(s.get("abcd"), None);

        s.store("abcd", p.clone()).unwrap();
        assert_eq!(s.get("abcd"), Some(p));
        assert_eq!(s.len(), 1);

        s.delete("abcd").unwrap();
        assert_eq!(s.get("abcd"), None);
        assert!(s.is_empty());
    }

    #[test]
    fn store_replaces() {
        let s = MemoryPairingStore::new();

        s.store("abcd", PairingInfo { key: vec![1], index: 0 }).unwrap();
        s.store("abcd", PairingInfo { key: vec![2], index: 1 }).unwrap();

        assert_eq!(s.len(), 1);
        assert_eq!(s.get("abcd").map(|p| p.index), Some(1));
    }
}
