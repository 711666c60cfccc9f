//! Protocol Module
//!
//! Defines the command/reply protocol spoken with a co-processor that owns the
//! store. The channel is a half-duplex byte stream: exactly one request is
//! outstanding at a time and there are no request identifiers.
//!
//! ## Commands
//! ```text
//! PREF_BEGIN,<name>,<readOnly:0|1>,<partitionLabel>      -> decimal boolean
//! PREF_END                                                -> decimal boolean
//! PREF_CLEAR                                              -> decimal boolean
//! PREF_REMOVE,<key>                                       -> decimal boolean
//! PREF_PUT,<key>,<typeTag>,<len|value> [+ N raw bytes]    -> decimal length
//! PREF_GET,<key>,<typeTag>[,<default>]                    -> decimal scalar | len + bytes
//! PREF_LEN,<key>                                          -> decimal length (0 = absent)
//! PREF_TYPE,<key>                                         -> decimal tag (10 = absent)
//! ```
//!
//! Scalars travel as decimal text. Strings and blobs travel as a passthrough:
//! the command line declares the length and exactly that many raw bytes follow.

mod codec;
mod command;
mod response;

pub use codec::{
    decode_command, encode_command, encode_reply, line_str, parse_leading_decimal,
    parse_reply_line, read_command, read_line, read_payload, write_command, write_reply,
    ERROR_PREFIX, LINE_TERMINATOR, MAX_LINE_LEN, MAX_PAYLOAD_SIZE,
};
pub use command::{Command, CommandType};
pub use response::{Reply, ReplyLine};
