//! Error types for embedkv
//!
//! Provides a unified error type for all operations. Nothing panics across a
//! backend boundary; every failure ends up in one of these variants.

use thiserror::Error;

use crate::codec::ValueType;

/// Result type alias using KvError
pub type Result<T> = std::result::Result<T, KvError>;

/// Unified error type for embedkv operations
#[derive(Debug, Error)]
pub enum KvError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Key / Codec Errors
    // -------------------------------------------------------------------------
    #[error("Invalid key {key:?}: {reason}")]
    InvalidKey { key: String, reason: &'static str },

    #[error("Length mismatch for {value_type}: expected {expected} bytes, got {actual}")]
    LengthMismatch {
        value_type: ValueType,
        expected: usize,
        actual: usize,
    },

    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: ValueType,
        actual: ValueType,
    },

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Malformed reply: {0:?}")]
    MalformedReply(String),

    #[error("Remote error: {0}")]
    Remote(String),

    #[error("Protocol desync: declared {declared} bytes, transferred {transferred}")]
    ProtocolDesync { declared: usize, transferred: usize },

    // -------------------------------------------------------------------------
    // Session Errors
    // -------------------------------------------------------------------------
    #[error("Session desynchronized, reset required")]
    SessionDesynced,

    #[error("Store not open")]
    NotOpen,

    #[error("Store already open")]
    AlreadyOpen,

    #[error("Operation rejected by store: {0}")]
    Rejected(&'static str),

    // -------------------------------------------------------------------------
    // Backend Errors
    // -------------------------------------------------------------------------
    #[error("Engine error code {0}")]
    Engine(i32),

    // -------------------------------------------------------------------------
    // Snapshot Errors
    // -------------------------------------------------------------------------
    #[error("Snapshot corruption detected: {0}")]
    SnapshotCorruption(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl KvError {
    /// True when the transport must be replaced before the backend is usable again
    pub fn requires_reset(&self) -> bool {
        matches!(
            self,
            KvError::ProtocolDesync { .. } | KvError::SessionDesynced
        )
    }
}
