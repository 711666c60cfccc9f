//! Preference table
//!
//! Typed entries grouped into namespaces, as kept by the storage owner.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::codec::ValueType;
use crate::error::Result;

use super::snapshot;

/// Partition used when `begin()` names none
pub const DEFAULT_PARTITION: &str = "nvs";

/// A stored entry: tag plus raw bytes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub value_type: ValueType,
    pub bytes: Vec<u8>,
}

/// Namespace address: partition label plus store name
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NamespaceId {
    pub partition: String,
    pub name: String,
}

impl NamespaceId {
    pub fn new(partition: Option<&str>, name: impl Into<String>) -> Self {
        Self {
            partition: partition.unwrap_or(DEFAULT_PARTITION).to_string(),
            name: name.into(),
        }
    }
}

pub(super) type Namespaces = BTreeMap<NamespaceId, BTreeMap<String, Entry>>;

/// All namespaces of one storage owner
///
/// With a snapshot path every mutation is persisted before it is acknowledged.
#[derive(Debug, Default)]
pub struct PreferenceTable {
    namespaces: Namespaces,
    snapshot_path: Option<PathBuf>,
}

impl PreferenceTable {
    /// Create an empty, volatile table
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a persistent table, loading the snapshot if one exists
    pub fn open(path: &Path) -> Result<Self> {
        let namespaces = if path.exists() {
            snapshot::load(path)?
        } else {
            Namespaces::new()
        };

        tracing::debug!(
            "Loaded {} namespace(s) from {}",
            namespaces.len(),
            path.display()
        );

        Ok(Self {
            namespaces,
            snapshot_path: Some(path.to_path_buf()),
        })
    }

    pub fn contains_namespace(&self, id: &NamespaceId) -> bool {
        self.namespaces.contains_key(id)
    }

    /// Create a namespace if it does not exist yet
    pub fn ensure_namespace(&mut self, id: &NamespaceId) -> Result<()> {
        if self.namespaces.contains_key(id) {
            return Ok(());
        }
        self.commit(|namespaces| {
            namespaces.insert(id.clone(), BTreeMap::new());
        })
    }

    pub fn get(&self, id: &NamespaceId, key: &str) -> Option<&Entry> {
        self.namespaces.get(id)?.get(key)
    }

    /// Store an entry, replacing any previous one (its type may change)
    pub fn put(&mut self, id: &NamespaceId, key: &str, entry: Entry) -> Result<()> {
        self.commit(|namespaces| {
            namespaces
                .entry(id.clone())
                .or_default()
                .insert(key.to_string(), entry);
        })
    }

    pub fn remove(&mut self, id: &NamespaceId, key: &str) -> Result<bool> {
        let present = self
            .namespaces
            .get(id)
            .map_or(false, |entries| entries.contains_key(key));
        if !present {
            return Ok(false);
        }
        self.commit(|namespaces| {
            if let Some(entries) = namespaces.get_mut(id) {
                entries.remove(key);
            }
        })?;
        Ok(true)
    }

    /// Remove every entry of one namespace
    pub fn clear(&mut self, id: &NamespaceId) -> Result<()> {
        self.commit(|namespaces| {
            if let Some(entries) = namespaces.get_mut(id) {
                entries.clear();
            }
        })
    }

    /// Number of entries in a namespace
    pub fn entry_count(&self, id: &NamespaceId) -> usize {
        self.namespaces.get(id).map_or(0, BTreeMap::len)
    }

    pub fn namespace_count(&self) -> usize {
        self.namespaces.len()
    }

    /// Apply a mutation; with a snapshot path the change only takes effect
    /// once the snapshot holding it has been written
    fn commit(&mut self, mutate: impl FnOnce(&mut Namespaces)) -> Result<()> {
        match &self.snapshot_path {
            None => {
                mutate(&mut self.namespaces);
                Ok(())
            }
            Some(path) => {
                let mut staged = self.namespaces.clone();
                mutate(&mut staged);
                snapshot::save(path, &staged)?;
                self.namespaces = staged;
                Ok(())
            }
        }
    }
}
