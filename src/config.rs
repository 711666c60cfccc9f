//! Configuration for embedkv
//!
//! Centralized configuration with sensible defaults. Every backend instance
//! receives its own `Config`; there is no process-wide default store.

use std::path::PathBuf;

use crate::codec::validate_key;
use crate::error::{KvError, Result};

/// Main configuration for a store instance and the co-processor emulator
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Store Configuration
    // -------------------------------------------------------------------------
    /// Namespace opened by `begin()`
    pub store_name: String,

    /// Open the namespace read-only
    pub read_only: bool,

    /// Partition holding the namespace (remote default when `None`)
    pub partition_label: Option<String>,

    /// Longest key accepted by the remote backend
    pub max_key_len: usize,

    /// How the remote backend treats malformed or error replies
    pub reply_parsing: ReplyParsing,

    // -------------------------------------------------------------------------
    // Emulator / Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address of the emulator
    pub listen_addr: String,

    /// Worker threads serving emulator connections
    pub max_connections: usize,

    /// Transport read timeout (milliseconds, 0 = blocking)
    pub read_timeout_ms: u64,

    /// Transport write timeout (milliseconds, 0 = blocking)
    pub write_timeout_ms: u64,

    /// File the emulator persists its table to
    pub snapshot_path: Option<PathBuf>,
}

/// Reply parsing policy for the remote backend
///
/// The legacy driver read every malformed, empty or error reply as zero, which
/// makes a failed round trip look like a stored `0`/`false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplyParsing {
    /// Malformed, empty and `ERR` replies are reported as errors
    #[default]
    Strict,

    /// Malformed, empty and `ERR` replies read as zero
    Lenient,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_name: "arduino".to_string(),
            read_only: false,
            partition_label: None,
            max_key_len: 15,
            reply_parsing: ReplyParsing::Strict,
            listen_addr: "127.0.0.1:7878".to_string(),
            max_connections: 4,
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
            snapshot_path: None,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check the store fields that end up on the wire
    pub fn validate(&self) -> Result<()> {
        validate_key(&self.store_name)
            .map_err(|e| KvError::Config(format!("store name: {}", e)))?;

        if let Some(label) = &self.partition_label {
            if label.contains([',', '\r', '\n']) {
                return Err(KvError::Config(format!(
                    "partition label {:?} contains a protocol delimiter",
                    label
                )));
            }
        }

        if self.max_key_len == 0 {
            return Err(KvError::Config("max_key_len must be positive".to_string()));
        }

        if self.max_connections == 0 {
            return Err(KvError::Config(
                "max_connections must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the namespace opened by `begin()`
    pub fn store_name(mut self, name: impl Into<String>) -> Self {
        self.config.store_name = name.into();
        self
    }

    /// Open the namespace read-only
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.config.read_only = read_only;
        self
    }

    /// Set the partition label sent with `begin()`
    pub fn partition_label(mut self, label: impl Into<String>) -> Self {
        self.config.partition_label = Some(label.into());
        self
    }

    /// Set the longest key accepted by the remote backend
    pub fn max_key_len(mut self, len: usize) -> Self {
        self.config.max_key_len = len;
        self
    }

    /// Set the reply parsing policy
    pub fn reply_parsing(mut self, parsing: ReplyParsing) -> Self {
        self.config.reply_parsing = parsing;
        self
    }

    /// Set the emulator listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the number of emulator worker threads
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Persist the emulator table to this file
    pub fn snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.snapshot_path = Some(path.into());
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
