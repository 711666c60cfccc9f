//! Reply definitions
//!
//! Represents replies from the storage owner.

/// A reply to a single command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Decimal status, length, tag or scalar value
    Number(i128),

    /// Size-prefixed binary payload
    Data(Vec<u8>),

    /// Owner-side failure, never followed by a payload
    Error(String),
}

impl Reply {
    /// Create a decimal boolean reply
    pub fn flag(value: bool) -> Self {
        Reply::Number(i128::from(value))
    }

    /// Create a decimal length reply
    pub fn length(len: usize) -> Self {
        Reply::Number(len as i128)
    }

    /// Create an ERR reply
    pub fn error(message: impl Into<String>) -> Self {
        Reply::Error(message.into())
    }
}

/// Classification of a textual reply line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyLine<'a> {
    /// Leading decimal run of the line
    Number(i128),

    /// `ERR,<reason>` line
    Error(&'a str),

    /// No leading decimal run (empty lines included)
    Malformed(&'a str),
}
