//! Store Module
//!
//! The generic key-value contract every backend implements.
//!
//! ## Responsibilities
//! - Define the five primitives (lifecycle, remove, exists, bytes in/out, length)
//! - Derive every typed put/get from the primitives plus the codec
//! - Hand out explicit `ValueRef` handles
//!
//! ## Layering
//! ```text
//!   put_u32 / get_string / ValueRef ...      (KvStoreExt, never overridden)
//!                    │
//!                    ▼
//!   put_value / get_value / get_typed_bytes  (tag-aware hooks, default impls)
//!                    │
//!                    ▼
//!   put_bytes / get_bytes / get_bytes_length (primitives, backend specific)
//! ```
//!
//! A backend with an untyped medium implements only the primitives. A backend
//! with a typed wire (the remote co-processor) overrides the hooks so every
//! request carries its tag.

mod reference;

pub use reference::ValueRef;

use crate::codec::{Scalar, Value, ValueType};
use crate::error::{KvError, Result};

/// Key-value storage contract
///
/// Methods take `&self`; backends keep their connection state behind interior
/// mutability and are therefore not `Sync`. One logical owner per instance.
pub trait KvStore {
    // -------------------------------------------------------------------------
    // Primitives
    // -------------------------------------------------------------------------

    /// Open the store
    fn begin(&self) -> Result<()>;

    /// Close the store
    fn end(&self) -> Result<()>;

    /// Remove every entry
    fn clear(&self) -> Result<()>;

    /// Remove one entry; `Ok(false)` when nothing was removed
    fn remove(&self, key: &str) -> Result<bool>;

    /// Store raw bytes, returns the number of bytes stored
    fn put_bytes(&self, key: &str, value: &[u8]) -> Result<usize>;

    /// Copy up to `buf.len()` bytes of the stored value, returns bytes copied
    fn get_bytes(&self, key: &str, buf: &mut [u8]) -> Result<usize>;

    /// Stored length, 0 when the key is absent
    fn get_bytes_length(&self, key: &str) -> Result<usize>;

    /// True when the key holds a non-empty value
    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get_bytes_length(key)? > 0)
    }

    // -------------------------------------------------------------------------
    // Tag-aware hooks
    // -------------------------------------------------------------------------

    /// Store a tagged value
    fn put_value(&self, key: &str, value: &Value) -> Result<usize> {
        self.put_bytes(key, &value.encode())
    }

    /// Copy raw bytes of a value stored under `value_type`
    fn get_typed_bytes(&self, key: &str, _value_type: ValueType, buf: &mut [u8]) -> Result<usize> {
        self.get_bytes(key, buf)
    }

    /// Read a whole value back as `value_type`
    fn get_value(&self, key: &str, value_type: ValueType) -> Result<Value> {
        let len = self.get_bytes_length(key)?;
        let mut buf = vec![0u8; len];
        let copied = self.get_typed_bytes(key, value_type, &mut buf)?;
        buf.truncate(copied);
        Value::decode(value_type, &buf)
    }
}

impl<S: KvStore + ?Sized> KvStore for Box<S> {
    fn begin(&self) -> Result<()> {
        (**self).begin()
    }

    fn end(&self) -> Result<()> {
        (**self).end()
    }

    fn clear(&self) -> Result<()> {
        (**self).clear()
    }

    fn remove(&self, key: &str) -> Result<bool> {
        (**self).remove(key)
    }

    fn put_bytes(&self, key: &str, value: &[u8]) -> Result<usize> {
        (**self).put_bytes(key, value)
    }

    fn get_bytes(&self, key: &str, buf: &mut [u8]) -> Result<usize> {
        (**self).get_bytes(key, buf)
    }

    fn get_bytes_length(&self, key: &str) -> Result<usize> {
        (**self).get_bytes_length(key)
    }

    fn exists(&self, key: &str) -> Result<bool> {
        (**self).exists(key)
    }

    fn put_value(&self, key: &str, value: &Value) -> Result<usize> {
        (**self).put_value(key, value)
    }

    fn get_typed_bytes(&self, key: &str, value_type: ValueType, buf: &mut [u8]) -> Result<usize> {
        (**self).get_typed_bytes(key, value_type, buf)
    }

    fn get_value(&self, key: &str, value_type: ValueType) -> Result<Value> {
        (**self).get_value(key, value_type)
    }
}

/// Typed convenience operations, derived for every `KvStore`
pub trait KvStoreExt: KvStore {
    /// Store a scalar
    fn put<T: Scalar>(&self, key: &str, value: T) -> Result<usize> {
        self.put_value(key, &value.into_value())
    }

    /// Read a scalar, or `default` when the key is absent
    ///
    /// The default is never written back.
    fn get<T: Scalar>(&self, key: &str, default: T) -> Result<T> {
        if !self.exists(key)? {
            return Ok(default);
        }
        T::from_value(self.get_value(key, T::VALUE_TYPE)?)
    }

    /// Bind a handle to `key`, loaded once
    fn bind<T: Scalar>(&self, key: &str, default: T) -> Result<ValueRef<'_, T, Self>> {
        let mut reference = ValueRef::new(self, key, default);
        reference.load()?;
        Ok(reference)
    }

    fn put_i8(&self, key: &str, value: i8) -> Result<usize> {
        self.put(key, value)
    }

    fn put_u8(&self, key: &str, value: u8) -> Result<usize> {
        self.put(key, value)
    }

    fn put_i16(&self, key: &str, value: i16) -> Result<usize> {
        self.put(key, value)
    }

    fn put_u16(&self, key: &str, value: u16) -> Result<usize> {
        self.put(key, value)
    }

    fn put_i32(&self, key: &str, value: i32) -> Result<usize> {
        self.put(key, value)
    }

    fn put_u32(&self, key: &str, value: u32) -> Result<usize> {
        self.put(key, value)
    }

    fn put_i64(&self, key: &str, value: i64) -> Result<usize> {
        self.put(key, value)
    }

    fn put_u64(&self, key: &str, value: u64) -> Result<usize> {
        self.put(key, value)
    }

    fn put_f32(&self, key: &str, value: f32) -> Result<usize> {
        self.put(key, value)
    }

    fn put_f64(&self, key: &str, value: f64) -> Result<usize> {
        self.put(key, value)
    }

    fn put_bool(&self, key: &str, value: bool) -> Result<usize> {
        self.put(key, value)
    }

    /// Store a string without terminator
    fn put_string(&self, key: &str, value: &str) -> Result<usize> {
        self.put_value(key, &Value::Str(value.to_string()))
    }

    fn get_i8(&self, key: &str, default: i8) -> Result<i8> {
        self.get(key, default)
    }

    fn get_u8(&self, key: &str, default: u8) -> Result<u8> {
        self.get(key, default)
    }

    fn get_i16(&self, key: &str, default: i16) -> Result<i16> {
        self.get(key, default)
    }

    fn get_u16(&self, key: &str, default: u16) -> Result<u16> {
        self.get(key, default)
    }

    fn get_i32(&self, key: &str, default: i32) -> Result<i32> {
        self.get(key, default)
    }

    fn get_u32(&self, key: &str, default: u32) -> Result<u32> {
        self.get(key, default)
    }

    fn get_i64(&self, key: &str, default: i64) -> Result<i64> {
        self.get(key, default)
    }

    fn get_u64(&self, key: &str, default: u64) -> Result<u64> {
        self.get(key, default)
    }

    fn get_f32(&self, key: &str, default: f32) -> Result<f32> {
        self.get(key, default)
    }

    fn get_f64(&self, key: &str, default: f64) -> Result<f64> {
        self.get(key, default)
    }

    fn get_bool(&self, key: &str, default: bool) -> Result<bool> {
        self.get(key, default)
    }

    /// Copy a stored string into `buf`, returns bytes copied
    ///
    /// No terminator is appended; a short buffer truncates.
    fn get_string(&self, key: &str, buf: &mut [u8]) -> Result<usize> {
        if !self.exists(key)? {
            return Ok(0);
        }
        self.get_typed_bytes(key, ValueType::Str, buf)
    }

    /// Read a whole string, `None` when the key is absent
    fn read_string(&self, key: &str) -> Result<Option<String>> {
        if !self.exists(key)? {
            return Ok(None);
        }
        match self.get_value(key, ValueType::Str)? {
            Value::Str(s) => Ok(Some(s)),
            other => Err(KvError::TypeMismatch {
                expected: ValueType::Str,
                actual: other.value_type(),
            }),
        }
    }
}

impl<S: KvStore + ?Sized> KvStoreExt for S {}
