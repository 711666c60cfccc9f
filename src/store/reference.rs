//! Value references
//!
//! A `ValueRef` is bound to one key of one store. It caches the last value it
//! saw but never owns the stored data, and it never performs I/O implicitly:
//! every access that touches the store is a named method.
//!
//! Two references to the same key are independent caches. Nothing keeps them
//! in sync; concurrent writers race and the last write wins.

use crate::codec::Scalar;
use crate::error::Result;

use super::{KvStore, KvStoreExt};

/// Handle bound to `(key, store)`
pub struct ValueRef<'a, T: Scalar, S: KvStore + ?Sized> {
    store: &'a S,
    key: String,
    value: T,
    default: T,
}

impl<'a, T: Scalar, S: KvStore + ?Sized> ValueRef<'a, T, S> {
    /// Create an unloaded handle; the cache starts at `default`
    pub fn new(store: &'a S, key: impl Into<String>, default: T) -> Self {
        Self {
            store,
            key: key.into(),
            value: default,
            default,
        }
    }

    /// Re-read the value from the store
    pub fn load(&mut self) -> Result<T> {
        self.value = self.store.get(&self.key, self.default)?;
        Ok(self.value)
    }

    /// Write the cached value through to the store
    pub fn save(&self) -> Result<usize> {
        self.store.put(&self.key, self.value)
    }

    /// Read access: always reloads
    pub fn read(&mut self) -> Result<T> {
        self.load()
    }

    /// Write access: updates the cache and writes through immediately
    pub fn assign(&mut self, value: T) -> Result<usize> {
        self.value = value;
        self.save()
    }

    /// Last loaded or assigned value, no I/O
    pub fn cached(&self) -> T {
        self.value
    }

    /// Check whether the key is present in the store
    pub fn exists(&self) -> Result<bool> {
        self.store.exists(&self.key)
    }

    /// Remove the key from the store; the cache is reset to the default
    pub fn remove(&mut self) -> Result<bool> {
        self.value = self.default;
        self.store.remove(&self.key)
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl<T: Scalar + std::fmt::Debug, S: KvStore + ?Sized> std::fmt::Debug for ValueRef<'_, T, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueRef")
            .field("key", &self.key)
            .field("cached", &self.value)
            .finish()
    }
}
