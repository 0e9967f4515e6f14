// Copyright (c) 2022-2023 The MobileCoin Foundation

//! JSON file backed pairing store
//!
//! Pairings are stored as an object keyed by card instance UID:
//!
//! ```json
//! { "a1b2...": { "key": "5f0e...", "index": 0 } }
//! ```

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard, PoisonError},
};

use log::{debug, warn};

use keycard_card::PairingInfo;
use keycard_flow_core::{PairingStore, StoreError};

type Pairings = BTreeMap<String, PairingInfo>;

/// [PairingStore] persisting pairings to a JSON file,
/// rewritten on every change
#[derive(Debug)]
pub struct FilePairingStore {
    path: PathBuf,
    values: Mutex<Pairings>,
}

impl FilePairingStore {
    /// Open a pairing store, a missing file is treated as empty
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        let values = match std::fs::read_to_string(&path) {
            Ok(s) if s.trim().is_empty() => Pairings::new(),
            Ok(s) => serde_json::from_str(&s)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No pairing file at {}", path.display());
                Pairings::new()
            }
            Err(e) => return Err(e.into()),
        };

        debug!("Loaded {} pairings from {}", values.len(), path.display());

        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    /// Pairing file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, Pairings> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write pairings via a temporary file, replacing the existing file
    fn save(&self, values: &Pairings) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }

        let tmp = self.path.with_extension("tmp");

        std::fs::write(&tmp, serde_json::to_vec_pretty(values)?)?;
        std::fs::rename(&tmp, &self.path)?;

        Ok(())
    }
}

impl PairingStore for FilePairingStore {
    fn get(&self, instance_uid: &str) -> Option<PairingInfo> {
        self.lock().get(instance_uid).cloned()
    }

    fn store(&self, instance_uid: &str, pairing: PairingInfo) -> Result<(), StoreError> {
        let mut values = self.lock();

        // Changes are only applied once written
        let mut updated = values.clone();
        updated.insert(instance_uid.to_string(), pairing);

        self.save(&updated)?;
        *values = updated;

        Ok(())
    }

    fn delete(&self, instance_uid: &str) -> Result<(), StoreError> {
        let mut values = self.lock();

        if !values.contains_key(instance_uid) {
            warn!("No pairing to remove for {instance_uid}");
            return Ok(());
        }

        let mut updated = values.clone();
        updated.remove(instance_uid);

        self.save(&updated)?;
        *values = updated;

        Ok(())
    }
}
