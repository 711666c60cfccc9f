//! Emulator Module
//!
//! The storage-owner side of the command protocol: what the companion
//! processor runs. Used to test the remote backend without hardware and served
//! over TCP by the `embedkv-emulator` binary.
//!
//! ## Responsibilities
//! - Keep typed entries in namespaces addressed by (partition, name)
//! - Execute commands with per-channel session state (open namespace, read-only)
//! - Refuse tag mismatches instead of coercing
//! - Optionally persist the table to a checksummed snapshot

mod loopback;
mod responder;
mod snapshot;
mod table;

pub use loopback::Loopback;
pub use responder::Responder;
pub use table::{Entry, NamespaceId, PreferenceTable, DEFAULT_PARTITION};
