//! Value definitions
//!
//! `ValueType` is the wire tag; `Value` is a tagged value ready to be encoded.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{KvError, Result};

/// Wire-level type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ValueType {
    I8 = 0,
    U8 = 1,
    I16 = 2,
    U16 = 3,
    I32 = 4,
    U32 = 5,
    I64 = 6,
    U64 = 7,
    Str = 8,
    Blob = 9,
    /// Sentinel for "no such entry"
    Invalid = 10,
}

impl ValueType {
    /// Numeric tag sent on the wire
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Map a wire tag back to a type
    pub fn from_tag(tag: u8) -> Option<Self> {
        let value_type = match tag {
            0 => ValueType::I8,
            1 => ValueType::U8,
            2 => ValueType::I16,
            3 => ValueType::U16,
            4 => ValueType::I32,
            5 => ValueType::U32,
            6 => ValueType::I64,
            7 => ValueType::U64,
            8 => ValueType::Str,
            9 => ValueType::Blob,
            10 => ValueType::Invalid,
            _ => return None,
        };
        Some(value_type)
    }

    /// Encoded width of a scalar type, `None` for variable-length types
    pub fn width(self) -> Option<usize> {
        match self {
            ValueType::I8 | ValueType::U8 => Some(1),
            ValueType::I16 | ValueType::U16 => Some(2),
            ValueType::I32 | ValueType::U32 => Some(4),
            ValueType::I64 | ValueType::U64 => Some(8),
            ValueType::Str | ValueType::Blob | ValueType::Invalid => None,
        }
    }

    pub fn is_scalar(self) -> bool {
        self.width().is_some()
    }

    pub fn name(self) -> &'static str {
        match self {
            ValueType::I8 => "i8",
            ValueType::U8 => "u8",
            ValueType::I16 => "i16",
            ValueType::U16 => "u16",
            ValueType::I32 => "i32",
            ValueType::U32 => "u32",
            ValueType::I64 => "i64",
            ValueType::U64 => "u64",
            ValueType::Str => "str",
            ValueType::Blob => "blob",
            ValueType::Invalid => "invalid",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ValueType {
    type Err = KvError;

    fn from_str(s: &str) -> Result<Self> {
        let value_type = match s.to_ascii_lowercase().as_str() {
            "i8" => ValueType::I8,
            "u8" => ValueType::U8,
            "i16" => ValueType::I16,
            "u16" => ValueType::U16,
            "i32" => ValueType::I32,
            "u32" => ValueType::U32,
            "i64" => ValueType::I64,
            "u64" => ValueType::U64,
            "str" | "string" => ValueType::Str,
            "blob" => ValueType::Blob,
            _ => return Err(KvError::InvalidValue(format!("unknown value type {:?}", s))),
        };
        Ok(value_type)
    }
}

/// A tagged value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    Str(String),
    Blob(Vec<u8>),
}

impl Value {
    /// The tag this value travels with
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::I8(_) => ValueType::I8,
            Value::U8(_) => ValueType::U8,
            Value::I16(_) => ValueType::I16,
            Value::U16(_) => ValueType::U16,
            Value::I32(_) => ValueType::I32,
            Value::U32(_) => ValueType::U32,
            Value::I64(_) => ValueType::I64,
            Value::U64(_) => ValueType::U64,
            Value::Str(_) => ValueType::Str,
            Value::Blob(_) => ValueType::Blob,
        }
    }

    /// Length of the encoded form
    pub fn encoded_len(&self) -> usize {
        match self {
            Value::Str(s) => s.len(),
            Value::Blob(b) => b.len(),
            scalar => scalar.value_type().width().unwrap_or(0),
        }
    }

    /// Encode to raw bytes (native byte order for scalars)
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Value::I8(v) => v.to_ne_bytes().to_vec(),
            Value::U8(v) => v.to_ne_bytes().to_vec(),
            Value::I16(v) => v.to_ne_bytes().to_vec(),
            Value::U16(v) => v.to_ne_bytes().to_vec(),
            Value::I32(v) => v.to_ne_bytes().to_vec(),
            Value::U32(v) => v.to_ne_bytes().to_vec(),
            Value::I64(v) => v.to_ne_bytes().to_vec(),
            Value::U64(v) => v.to_ne_bytes().to_vec(),
            Value::Str(s) => s.as_bytes().to_vec(),
            Value::Blob(b) => b.clone(),
        }
    }

    /// Decode raw bytes as `value_type`
    ///
    /// A scalar decode requires exactly `width` bytes; shorter or longer input
    /// is rejected with `LengthMismatch`.
    pub fn decode(value_type: ValueType, bytes: &[u8]) -> Result<Value> {
        let value = match value_type {
            ValueType::I8 => Value::I8(i8::from_ne_bytes(fixed(value_type, bytes)?)),
            ValueType::U8 => Value::U8(u8::from_ne_bytes(fixed(value_type, bytes)?)),
            ValueType::I16 => Value::I16(i16::from_ne_bytes(fixed(value_type, bytes)?)),
            ValueType::U16 => Value::U16(u16::from_ne_bytes(fixed(value_type, bytes)?)),
            ValueType::I32 => Value::I32(i32::from_ne_bytes(fixed(value_type, bytes)?)),
            ValueType::U32 => Value::U32(u32::from_ne_bytes(fixed(value_type, bytes)?)),
            ValueType::I64 => Value::I64(i64::from_ne_bytes(fixed(value_type, bytes)?)),
            ValueType::U64 => Value::U64(u64::from_ne_bytes(fixed(value_type, bytes)?)),
            ValueType::Str => Value::Str(String::from_utf8(bytes.to_vec()).map_err(|e| {
                KvError::InvalidValue(format!("string is not valid UTF-8: {}", e))
            })?),
            ValueType::Blob => Value::Blob(bytes.to_vec()),
            ValueType::Invalid => {
                return Err(KvError::InvalidValue(
                    "cannot decode the INVALID type".to_string(),
                ))
            }
        };
        Ok(value)
    }

    /// Build a scalar from a wide integer, `None` when out of range
    pub fn from_i128(value_type: ValueType, n: i128) -> Option<Value> {
        let value = match value_type {
            ValueType::I8 => Value::I8(i8::try_from(n).ok()?),
            ValueType::U8 => Value::U8(u8::try_from(n).ok()?),
            ValueType::I16 => Value::I16(i16::try_from(n).ok()?),
            ValueType::U16 => Value::U16(u16::try_from(n).ok()?),
            ValueType::I32 => Value::I32(i32::try_from(n).ok()?),
            ValueType::U32 => Value::U32(u32::try_from(n).ok()?),
            ValueType::I64 => Value::I64(i64::try_from(n).ok()?),
            ValueType::U64 => Value::U64(u64::try_from(n).ok()?),
            ValueType::Str | ValueType::Blob | ValueType::Invalid => return None,
        };
        Some(value)
    }

    /// Widen a scalar, `None` for strings and blobs
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Value::I8(v) => Some(i128::from(*v)),
            Value::U8(v) => Some(i128::from(*v)),
            Value::I16(v) => Some(i128::from(*v)),
            Value::U16(v) => Some(i128::from(*v)),
            Value::I32(v) => Some(i128::from(*v)),
            Value::U32(v) => Some(i128::from(*v)),
            Value::I64(v) => Some(i128::from(*v)),
            Value::U64(v) => Some(i128::from(*v)),
            Value::Str(_) | Value::Blob(_) => None,
        }
    }

    /// Parse the textual form used in command lines and by the CLI
    ///
    /// Scalars are decimal; strings and blobs take the text verbatim.
    pub fn parse(value_type: ValueType, text: &str) -> Result<Value> {
        match value_type {
            ValueType::Str => Ok(Value::Str(text.to_string())),
            ValueType::Blob => Ok(Value::Blob(text.as_bytes().to_vec())),
            ValueType::Invalid => Err(KvError::InvalidValue(
                "cannot parse the INVALID type".to_string(),
            )),
            scalar => {
                let n: i128 = text.trim().parse().map_err(|_| {
                    KvError::InvalidValue(format!("{:?} is not a decimal {}", text, scalar))
                })?;
                Value::from_i128(scalar, n).ok_or_else(|| {
                    KvError::InvalidValue(format!("{} is out of range for {}", n, scalar))
                })
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => f.write_str(s),
            Value::Blob(b) => {
                for byte in b {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
            scalar => match scalar.as_i128() {
                Some(n) => write!(f, "{}", n),
                None => Ok(()),
            },
        }
    }
}

fn fixed<const N: usize>(value_type: ValueType, bytes: &[u8]) -> Result<[u8; N]> {
    bytes.try_into().map_err(|_| KvError::LengthMismatch {
        value_type,
        expected: N,
        actual: bytes.len(),
    })
}
