//! Key validation
//!
//! Keys travel inside comma-separated, CR-LF terminated command lines, so the
//! delimiters can never appear in one.

use crate::error::{KvError, Result};

/// Check that a key is non-empty printable ASCII without protocol delimiters
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(invalid(key, "key is empty"));
    }

    if key.contains([',', '\r', '\n']) {
        return Err(invalid(key, "key contains a protocol delimiter"));
    }

    if !key.bytes().all(|b| (0x20..=0x7e).contains(&b)) {
        return Err(invalid(key, "key contains a non-printable character"));
    }

    Ok(())
}

/// Check a key and enforce a maximum length
pub fn validate_key_len(key: &str, max_len: usize) -> Result<()> {
    validate_key(key)?;

    if key.len() > max_len {
        return Err(invalid(key, "key exceeds the maximum length"));
    }

    Ok(())
}

fn invalid(key: &str, reason: &'static str) -> KvError {
    KvError::InvalidKey {
        key: key.to_string(),
        reason,
    }
}
