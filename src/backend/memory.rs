//! In-memory backend
//!
//! Untyped byte store implementing only the primitives. Useful as a host-side
//! stand-in for on-board storage and as the reference behavior in tests.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use crate::codec::validate_key;
use crate::error::Result;
use crate::store::KvStore;

/// Byte store kept in a `BTreeMap`
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RefCell<BTreeMap<String, Vec<u8>>>,
    open: Cell<bool>,
}

impl MemoryBackend {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn is_open(&self) -> bool {
        self.open.get()
    }
}

impl KvStore for MemoryBackend {
    fn begin(&self) -> Result<()> {
        self.open.set(true);
        Ok(())
    }

    fn end(&self) -> Result<()> {
        self.open.set(false);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.entries.borrow_mut().clear();
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        validate_key(key)?;
        Ok(self.entries.borrow_mut().remove(key).is_some())
    }

    fn put_bytes(&self, key: &str, value: &[u8]) -> Result<usize> {
        validate_key(key)?;
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_vec());
        Ok(value.len())
    }

    fn get_bytes(&self, key: &str, buf: &mut [u8]) -> Result<usize> {
        validate_key(key)?;
        let entries = self.entries.borrow();
        let Some(stored) = entries.get(key) else {
            return Ok(0);
        };

        let copied = stored.len().min(buf.len());
        buf[..copied].copy_from_slice(&stored[..copied]);
        Ok(copied)
    }

    fn get_bytes_length(&self, key: &str) -> Result<usize> {
        validate_key(key)?;
        Ok(self.entries.borrow().get(key).map_or(0, Vec::len))
    }
}
