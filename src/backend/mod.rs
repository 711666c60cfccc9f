//! Backend Module
//!
//! Concrete providers of the `KvStore` contract. The backend is a strategy
//! object picked at runtime; callers that do not care hold a
//! `Box<dyn KvStore>`.
//!
//! - `MemoryBackend`: untyped in-memory bytes
//! - `DelegateBackend`: forwards to an on-board flash engine
//! - `RemoteBackend`: drives a co-processor owned store over a byte stream

pub mod delegate;
pub mod memory;
pub mod remote;

pub use delegate::{DelegateBackend, EngineError, EngineResult, FlashEngine};
pub use memory::MemoryBackend;
pub use remote::{RemoteBackend, SessionState};
