//! # embedkv
//!
//! Typed key-value storage for embedded controllers:
//! - One storage contract (`KvStore`) with typed helpers for every scalar
//! - Interchangeable backends chosen at construction time
//! - A line-oriented command protocol for stores owned by a co-processor
//! - Cached single-key references (`ValueRef`)
//! - An emulated storage owner for tests and desktop use
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Application / KvStoreExt                     │
//! │          (typed put/get, strings, ValueRef<T>)               │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ KvStore
//!          ┌────────────┼─────────────────────┐
//!          │            │                     │
//!          ▼            ▼                     ▼
//!   ┌─────────────┐ ┌─────────────┐   ┌───────────────┐
//!   │   Memory    │ │  Delegate   │   │    Remote     │
//!   │  (BTreeMap) │ │(FlashEngine)│   │  (Session<T>) │
//!   └─────────────┘ └─────────────┘   └───────┬───────┘
//!                                             │ PREF_* lines + payloads
//!                                             ▼
//!                                     ┌───────────────┐
//!                                     │   Emulator    │
//!                                     │ (Responder +  │
//!                                     │  snapshot)    │
//!                                     └───────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;

pub mod backend;
pub mod codec;
pub mod emulator;
pub mod network;
pub mod protocol;
pub mod store;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use backend::{DelegateBackend, MemoryBackend, RemoteBackend};
pub use codec::{Scalar, Value, ValueType};
pub use config::{Config, ReplyParsing};
pub use error::{KvError, Result};
pub use store::{KvStore, KvStoreExt, ValueRef};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of embedkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
