//! Command definitions
//!
//! Represents requests sent to the storage owner.

use crate::codec::{Value, ValueType};

use super::codec::LINE_TERMINATOR;

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandType {
    Begin,
    End,
    Clear,
    Remove,
    Put,
    Get,
    Len,
    Type,
}

impl CommandType {
    /// Opcode as it appears on the wire
    pub fn opcode(self) -> &'static str {
        match self {
            CommandType::Begin => "PREF_BEGIN",
            CommandType::End => "PREF_END",
            CommandType::Clear => "PREF_CLEAR",
            CommandType::Remove => "PREF_REMOVE",
            CommandType::Put => "PREF_PUT",
            CommandType::Get => "PREF_GET",
            CommandType::Len => "PREF_LEN",
            CommandType::Type => "PREF_TYPE",
        }
    }

    pub fn from_opcode(opcode: &str) -> Option<Self> {
        let command_type = match opcode {
            "PREF_BEGIN" => CommandType::Begin,
            "PREF_END" => CommandType::End,
            "PREF_CLEAR" => CommandType::Clear,
            "PREF_REMOVE" => CommandType::Remove,
            "PREF_PUT" => CommandType::Put,
            "PREF_GET" => CommandType::Get,
            "PREF_LEN" => CommandType::Len,
            "PREF_TYPE" => CommandType::Type,
            _ => return None,
        };
        Some(command_type)
    }
}

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Open a namespace
    Begin {
        name: String,
        read_only: bool,
        partition: Option<String>,
    },

    /// Close the open namespace
    End,

    /// Remove every entry of the open namespace
    Clear,

    /// Remove one entry
    Remove { key: String },

    /// Store a tagged value (strings and blobs carry a binary payload)
    Put { key: String, value: Value },

    /// Read a value; the default is returned by the owner when the key is absent
    Get {
        key: String,
        value_type: ValueType,
        default: Option<String>,
    },

    /// Stored length
    Len { key: String },

    /// Stored type tag
    Type { key: String },
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Begin { .. } => CommandType::Begin,
            Command::End => CommandType::End,
            Command::Clear => CommandType::Clear,
            Command::Remove { .. } => CommandType::Remove,
            Command::Put { .. } => CommandType::Put,
            Command::Get { .. } => CommandType::Get,
            Command::Len { .. } => CommandType::Len,
            Command::Type { .. } => CommandType::Type,
        }
    }

    /// The CR-LF terminated command line
    pub fn header_line(&self) -> String {
        let opcode = self.command_type().opcode();
        let line = match self {
            Command::Begin {
                name,
                read_only,
                partition,
            } => format!(
                "{},{},{},{}",
                opcode,
                name,
                u8::from(*read_only),
                partition.as_deref().unwrap_or("")
            ),
            Command::End | Command::Clear => opcode.to_string(),
            Command::Remove { key } | Command::Len { key } | Command::Type { key } => {
                format!("{},{}", opcode, key)
            }
            Command::Put { key, value } => {
                let value_type = value.value_type();
                if value_type.is_scalar() {
                    format!("{},{},{},{}", opcode, key, value_type.tag(), value)
                } else {
                    format!("{},{},{},{}", opcode, key, value_type.tag(), value.encoded_len())
                }
            }
            Command::Get {
                key,
                value_type,
                default,
            } => match default {
                Some(default) => format!("{},{},{},{}", opcode, key, value_type.tag(), default),
                None => format!("{},{},{}", opcode, key, value_type.tag()),
            },
        };
        line + LINE_TERMINATOR
    }

    /// Raw bytes streamed after the command line, if any
    pub fn payload(&self) -> Option<&[u8]> {
        match self {
            Command::Put {
                value: Value::Str(s),
                ..
            } => Some(s.as_bytes()),
            Command::Put {
                value: Value::Blob(b),
                ..
            } => Some(b),
            _ => None,
        }
    }

    /// True when the reply is a size-prefixed binary payload
    pub fn expects_data(&self) -> bool {
        matches!(
            self,
            Command::Get {
                value_type: ValueType::Str | ValueType::Blob,
                ..
            }
        )
    }
}
