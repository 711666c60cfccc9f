//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ### Request
//! ```text
//! ┌──────────────────────────────────────┬──────────────────────────┐
//! │ OPCODE,field,field...\r\n  (ASCII)   │ N raw bytes (PUT str/blob)│
//! └──────────────────────────────────────┴──────────────────────────┘
//! ```
//!
//! ### Reply
//! ```text
//! Number:  <decimal>\r\n
//! Data:    <decimal len>\r\n  + len raw bytes
//! Error:   ERR,<reason>\r\n
//! ```

use std::io::{self, BufRead, Read, Write};

use bytes::BytesMut;

use super::{Command, CommandType, Reply, ReplyLine};
use crate::codec::{validate_key, Value, ValueType};
use crate::error::{KvError, Result};

/// Terminator of every command and reply line
pub const LINE_TERMINATOR: &str = "\r\n";

/// Longest accepted command or reply line, terminator excluded
pub const MAX_LINE_LEN: usize = 256;

/// Maximum passthrough payload size (1 MB)
pub const MAX_PAYLOAD_SIZE: usize = 1024 * 1024;

/// Prefix of owner-side error replies
pub const ERROR_PREFIX: &str = "ERR";

// =============================================================================
// Command Encoding/Decoding
// =============================================================================

/// Encode a command to bytes: command line followed by its payload
pub fn encode_command(command: &Command) -> Vec<u8> {
    let header = command.header_line();
    let payload = command.payload().unwrap_or(&[]);

    let mut message = Vec::with_capacity(header.len() + payload.len());
    message.extend_from_slice(header.as_bytes());
    message.extend_from_slice(payload);
    message
}

/// Decode one command from the front of a buffer
///
/// Returns `None` while the buffer holds an incomplete frame. Otherwise returns
/// the decode result and the number of bytes consumed; a bad line is consumed
/// so the caller can carry on with the next one. A rejected PUT line that
/// announces a payload is a `ProtocolDesync` instead, since the payload bytes
/// that follow cannot be told apart from command lines.
pub fn decode_command(bytes: &[u8]) -> Option<(Result<Command>, usize)> {
    let newline = bytes.iter().position(|&b| b == b'\n')?;
    let line_end = newline + 1;

    if newline > MAX_LINE_LEN + 1 {
        return Some((Err(line_too_long()), line_end));
    }
    let line = match line_str(&bytes[..newline]) {
        Ok(line) => line,
        Err(e) => return Some((Err(e), line_end)),
    };

    match parse_command_line(line) {
        Ok(Header::Complete(command)) => Some((Ok(command), line_end)),
        Ok(Header::Payload {
            key,
            value_type,
            len,
        }) => {
            let frame_end = line_end + len;
            if bytes.len() < frame_end {
                return None;
            }
            let value = Value::decode(value_type, &bytes[line_end..frame_end]);
            Some((value.map(|value| Command::Put { key, value }), frame_end))
        }
        Err(e) => Some((Err(e), line_end)),
    }
}

/// Read a complete command from a stream
///
/// Returns `Ok(None)` when the stream ends cleanly between commands. A payload
/// cut short, or a rejected PUT line announcing one, is a `ProtocolDesync`.
pub fn read_command<R: BufRead>(reader: &mut R, line: &mut BytesMut) -> Result<Option<Command>> {
    if !read_line(reader, line)? {
        return Ok(None);
    }

    let header = parse_command_line(line_str(line)?)?;
    match header {
        Header::Complete(command) => Ok(Some(command)),
        Header::Payload {
            key,
            value_type,
            len,
        } => {
            let payload = read_payload(reader, len)?;
            let value = Value::decode(value_type, &payload)?;
            Ok(Some(Command::Put { key, value }))
        }
    }
}

/// Write a command to a stream
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    writer.write_all(&encode_command(command))?;
    writer.flush()?;
    Ok(())
}

/// Command line parsed, payload possibly still on the wire
enum Header {
    Complete(Command),
    Payload {
        key: String,
        value_type: ValueType,
        len: usize,
    },
}

fn parse_command_line(line: &str) -> Result<Header> {
    let (opcode, rest) = match line.split_once(',') {
        Some((opcode, rest)) => (opcode, Some(rest)),
        None => (line, None),
    };

    let command_type = CommandType::from_opcode(opcode)
        .ok_or_else(|| KvError::Protocol(format!("Unknown opcode: {:?}", opcode)))?;

    let header = match command_type {
        CommandType::Begin => {
            let fields = split_fields(opcode, rest, 2, 3)?;
            let name = fields[0].to_string();
            validate_key(&name).map_err(|e| KvError::Protocol(e.to_string()))?;
            let read_only = match fields[1] {
                "0" => false,
                "1" => true,
                other => {
                    return Err(KvError::Protocol(format!(
                        "PREF_BEGIN: bad read-only flag {:?}",
                        other
                    )))
                }
            };
            let partition = fields
                .get(2)
                .filter(|label| !label.is_empty())
                .map(|label| label.to_string());
            Header::Complete(Command::Begin {
                name,
                read_only,
                partition,
            })
        }
        CommandType::End | CommandType::Clear => {
            if rest.is_some() {
                return Err(KvError::Protocol(format!(
                    "{}: unexpected fields",
                    opcode
                )));
            }
            if command_type == CommandType::End {
                Header::Complete(Command::End)
            } else {
                Header::Complete(Command::Clear)
            }
        }
        CommandType::Remove | CommandType::Len | CommandType::Type => {
            let fields = split_fields(opcode, rest, 1, 1)?;
            let key = parse_key(fields[0])?;
            Header::Complete(match command_type {
                CommandType::Remove => Command::Remove { key },
                CommandType::Len => Command::Len { key },
                _ => Command::Type { key },
            })
        }
        CommandType::Put => {
            let fields = split_fields(opcode, rest, 3, 3)?;
            match announced_payload(fields[1], fields[2]) {
                // The payload follows the line whether or not the header is usable
                Some(len) => passthrough_header(fields[0], fields[1], len).map_err(|e| {
                    tracing::warn!(
                        "PREF_PUT header rejected with {} byte payload pending: {}",
                        len,
                        e
                    );
                    KvError::ProtocolDesync {
                        declared: len,
                        transferred: 0,
                    }
                })?,
                None => {
                    let key = parse_key(fields[0])?;
                    let value_type = parse_tag(fields[1])?;
                    if !value_type.is_scalar() {
                        return Err(KvError::Protocol(format!(
                            "PREF_PUT: bad length {:?}",
                            fields[2]
                        )));
                    }
                    let value = Value::parse(value_type, fields[2])
                        .map_err(|e| KvError::Protocol(format!("PREF_PUT: {}", e)))?;
                    Header::Complete(Command::Put { key, value })
                }
            }
        }
        CommandType::Get => {
            // The default is the remainder of the line and may itself contain commas
            let rest = rest.ok_or_else(|| KvError::Protocol("PREF_GET: missing key".to_string()))?;
            let mut fields = rest.splitn(3, ',');
            let key = parse_key(fields.next().unwrap_or(""))?;
            let value_type = parse_tag(fields.next().ok_or_else(|| {
                KvError::Protocol("PREF_GET: missing type tag".to_string())
            })?)?;
            let default = fields.next().map(|d| d.to_string());
            Header::Complete(Command::Get {
                key,
                value_type,
                default,
            })
        }
    };

    Ok(header)
}

/// Length of the raw payload a PUT line announces
///
/// Any tag other than a scalar one, including an unknown tag, is read as
/// announcing a payload when the last field is a length.
fn announced_payload(tag: &str, len: &str) -> Option<usize> {
    if matches!(parse_tag(tag), Ok(value_type) if value_type.is_scalar()) {
        return None;
    }
    len.parse().ok()
}

fn passthrough_header(key: &str, tag: &str, len: usize) -> Result<Header> {
    let key = parse_key(key)?;
    let value_type = parse_tag(tag)?;
    if len > MAX_PAYLOAD_SIZE {
        return Err(KvError::Protocol(format!(
            "PREF_PUT: payload too large: {} bytes (max {})",
            len, MAX_PAYLOAD_SIZE
        )));
    }
    Ok(Header::Payload {
        key,
        value_type,
        len,
    })
}

fn split_fields<'a>(opcode: &str, rest: Option<&'a str>, min: usize, max: usize) -> Result<Vec<&'a str>> {
    let fields: Vec<&str> = rest.map(|r| r.split(',').collect()).unwrap_or_default();
    if fields.len() < min || fields.len() > max {
        return Err(KvError::Protocol(format!(
            "{}: expected {} to {} fields, got {}",
            opcode,
            min,
            max,
            fields.len()
        )));
    }
    Ok(fields)
}

fn parse_key(field: &str) -> Result<String> {
    validate_key(field).map_err(|e| KvError::Protocol(e.to_string()))?;
    Ok(field.to_string())
}

fn parse_tag(field: &str) -> Result<ValueType> {
    field
        .parse::<u8>()
        .ok()
        .and_then(ValueType::from_tag)
        .filter(|t| *t != ValueType::Invalid)
        .ok_or_else(|| KvError::Protocol(format!("Unknown type tag: {:?}", field)))
}

// =============================================================================
// Reply Encoding/Decoding
// =============================================================================

/// Encode a reply to bytes
pub fn encode_reply(reply: &Reply) -> Vec<u8> {
    match reply {
        Reply::Number(n) => format!("{}{}", n, LINE_TERMINATOR).into_bytes(),
        Reply::Data(payload) => {
            let header = format!("{}{}", payload.len(), LINE_TERMINATOR);
            let mut message = Vec::with_capacity(header.len() + payload.len());
            message.extend_from_slice(header.as_bytes());
            message.extend_from_slice(payload);
            message
        }
        Reply::Error(reason) => {
            let reason = reason.replace(['\r', '\n'], " ");
            format!("{},{}{}", ERROR_PREFIX, reason, LINE_TERMINATOR).into_bytes()
        }
    }
}

/// Write a reply to a stream
pub fn write_reply<W: Write>(writer: &mut W, reply: &Reply) -> Result<()> {
    writer.write_all(&encode_reply(reply))?;
    writer.flush()?;
    Ok(())
}

/// Classify a reply line (terminator already stripped)
pub fn parse_reply_line(line: &str) -> ReplyLine<'_> {
    if let Some(reason) = line.strip_prefix(ERROR_PREFIX) {
        if reason.is_empty() || reason.starts_with(',') {
            return ReplyLine::Error(reason.trim_start_matches(','));
        }
    }
    match parse_leading_decimal(line) {
        Some(n) => ReplyLine::Number(n),
        None => ReplyLine::Malformed(line),
    }
}

/// Parse the leading decimal run of `text` (optional `-` sign)
///
/// `"12abc"` parses as 12; `""`, `"-"` and `"abc"` have no leading run.
pub fn parse_leading_decimal(text: &str) -> Option<i128> {
    let bytes = text.as_bytes();
    let sign_len = usize::from(bytes.first() == Some(&b'-'));
    let digits = bytes[sign_len..]
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .count();
    if digits == 0 {
        return None;
    }
    text[..sign_len + digits].parse().ok()
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read one line into `line`, stripping the terminator
///
/// Returns `Ok(false)` on a clean end of stream before any byte of the line.
/// An over-long line is consumed up to its terminator and then rejected, so
/// the stream stays on a line boundary.
pub fn read_line<R: BufRead>(reader: &mut R, line: &mut BytesMut) -> Result<bool> {
    line.clear();
    let mut overflow = false;

    loop {
        let available = match reader.fill_buf() {
            Ok(available) => available,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };

        if available.is_empty() {
            if line.is_empty() && !overflow {
                return Ok(false);
            }
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "stream closed in the middle of a line",
            )
            .into());
        }

        let (chunk_len, consumed, done) = match available.iter().position(|&b| b == b'\n') {
            Some(pos) => (pos, pos + 1, true),
            None => (available.len(), available.len(), false),
        };
        if !overflow {
            line.extend_from_slice(&available[..chunk_len]);
        }
        reader.consume(consumed);

        if line.len() > MAX_LINE_LEN + 1 {
            overflow = true;
            line.clear();
        }
        if done {
            break;
        }
    }

    if overflow {
        return Err(line_too_long());
    }
    if line.last() == Some(&b'\r') {
        line.truncate(line.len() - 1);
    }
    if line.len() > MAX_LINE_LEN {
        return Err(line_too_long());
    }

    Ok(true)
}

/// Read exactly `declared` payload bytes
///
/// Anything short of `declared`, whether the stream ended or failed, is a
/// `ProtocolDesync`: the bytes already consumed cannot be given back.
pub fn read_payload<R: Read>(reader: &mut R, declared: usize) -> Result<Vec<u8>> {
    let mut payload = vec![0u8; declared];
    let mut transferred = 0;

    while transferred < declared {
        match reader.read(&mut payload[transferred..]) {
            Ok(0) => break,
            Ok(n) => transferred += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::warn!("Payload read failed after {} of {} bytes: {}", transferred, declared, e);
                break;
            }
        }
    }

    if transferred != declared {
        return Err(KvError::ProtocolDesync {
            declared,
            transferred,
        });
    }

    Ok(payload)
}

/// View a line as text; the protocol is ASCII
pub fn line_str(line: &[u8]) -> Result<&str> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    std::str::from_utf8(line).map_err(|_| KvError::Protocol("Line is not valid ASCII".to_string()))
}

fn line_too_long() -> KvError {
    KvError::Protocol(format!("Line exceeds {} bytes", MAX_LINE_LEN))
}
