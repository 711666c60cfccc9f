//! Scalar marshaling
//!
//! Maps Rust primitives onto tagged `Value`s.

use crate::error::{KvError, Result};

use super::{Value, ValueType};

/// A fixed-width type that can be stored under a key
pub trait Scalar: Copy {
    /// Tag used on the wire (BLOB for types without a tag of their own)
    const VALUE_TYPE: ValueType;

    /// Wrap into a tagged value
    fn into_value(self) -> Value;

    /// Unwrap a tagged value read back from a store
    fn from_value(value: Value) -> Result<Self>;
}

macro_rules! integer_scalar {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl Scalar for $ty {
                const VALUE_TYPE: ValueType = ValueType::$variant;

                fn into_value(self) -> Value {
                    Value::$variant(self)
                }

                fn from_value(value: Value) -> Result<Self> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        other => Err(KvError::TypeMismatch {
                            expected: ValueType::$variant,
                            actual: other.value_type(),
                        }),
                    }
                }
            }
        )*
    };
}

integer_scalar! {
    i8 => I8,
    u8 => U8,
    i16 => I16,
    u16 => U16,
    i32 => I32,
    u32 => U32,
    i64 => I64,
    u64 => U64,
}

impl Scalar for f32 {
    const VALUE_TYPE: ValueType = ValueType::Blob;

    fn into_value(self) -> Value {
        Value::Blob(self.to_ne_bytes().to_vec())
    }

    fn from_value(value: Value) -> Result<Self> {
        Ok(f32::from_ne_bytes(blob_bytes(value)?))
    }
}

impl Scalar for f64 {
    const VALUE_TYPE: ValueType = ValueType::Blob;

    fn into_value(self) -> Value {
        Value::Blob(self.to_ne_bytes().to_vec())
    }

    fn from_value(value: Value) -> Result<Self> {
        Ok(f64::from_ne_bytes(blob_bytes(value)?))
    }
}

impl Scalar for bool {
    const VALUE_TYPE: ValueType = ValueType::Blob;

    fn into_value(self) -> Value {
        Value::Blob(vec![self as u8])
    }

    fn from_value(value: Value) -> Result<Self> {
        let [byte] = blob_bytes::<1>(value)?;
        Ok(byte != 0)
    }
}

/// Untagged scalars must come back as a blob of exactly their width
fn blob_bytes<const N: usize>(value: Value) -> Result<[u8; N]> {
    match value {
        Value::Blob(bytes) => {
            let actual = bytes.len();
            bytes.try_into().map_err(|_| KvError::LengthMismatch {
                value_type: ValueType::Blob,
                expected: N,
                actual,
            })
        }
        other => Err(KvError::TypeMismatch {
            expected: ValueType::Blob,
            actual: other.value_type(),
        }),
    }
}
