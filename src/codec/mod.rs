//! Codec Module
//!
//! Typed value marshaling shared by every backend.
//!
//! ## Responsibilities
//! - Tag every value with a `ValueType` (the wire discriminator)
//! - Encode scalars as `size_of::<T>()` bytes in native byte order
//! - Encode strings and blobs as raw bytes, no terminator
//! - Reject scalar decodes whose input length differs from the width
//! - Validate keys before they reach a backend
//!
//! ## Type Tags
//! ```text
//! ┌─────┬─────┬─────┬─────┬─────┬─────┬─────┬─────┬─────┬──────┬─────────┐
//! │ I8  │ U8  │ I16 │ U16 │ I32 │ U32 │ I64 │ U64 │ STR │ BLOB │ INVALID │
//! │  0  │  1  │  2  │  3  │  4  │  5  │  6  │  7  │  8  │  9   │   10    │
//! └─────┴─────┴─────┴─────┴─────┴─────┴─────┴─────┴─────┴──────┴─────────┘
//! ```
//! `f32`, `f64` and `bool` have no tag of their own and travel as BLOB values
//! of their native width.

mod key;
mod scalar;
mod value;

pub use key::{validate_key, validate_key_len};
pub use scalar::Scalar;
pub use value::{Value, ValueType};
