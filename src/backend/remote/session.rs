//! Remote session
//!
//! Owns the transport and the framing state of one half-duplex channel.

use std::io::{self, BufReader, Read, Write};

use bytes::BytesMut;

use crate::config::ReplyParsing;
use crate::error::{KvError, Result};
use crate::protocol::{
    line_str, parse_reply_line, read_line, read_payload, Command, ReplyLine, MAX_PAYLOAD_SIZE,
};

/// Connection state of a remote backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No namespace open
    Closed,

    /// `begin()` succeeded
    Open { name: String, read_only: bool },

    /// Framing lost; only a reset with a fresh transport recovers
    Desynced,
}

pub(super) struct Session<T> {
    /// Transport, buffered for line reads; writes go to the inner stream
    io: BufReader<T>,

    /// Reused reply line buffer
    line: BytesMut,

    state: SessionState,
}

impl<T: Read + Write> Session<T> {
    pub(super) fn new(transport: T) -> Self {
        Self {
            io: BufReader::new(transport),
            line: BytesMut::with_capacity(64),
            state: SessionState::Closed,
        }
    }

    pub(super) fn state(&self) -> &SessionState {
        &self.state
    }

    pub(super) fn set_state(&mut self, state: SessionState) {
        self.state = state;
    }

    pub(super) fn into_inner(self) -> T {
        self.io.into_inner()
    }

    /// Fail unless the channel is still framed
    pub(super) fn ensure_synced(&self) -> Result<()> {
        match self.state {
            SessionState::Desynced => Err(KvError::SessionDesynced),
            _ => Ok(()),
        }
    }

    /// Fail unless a namespace is open on a framed channel
    pub(super) fn ensure_open(&self) -> Result<()> {
        match self.state {
            SessionState::Open { .. } => Ok(()),
            SessionState::Desynced => Err(KvError::SessionDesynced),
            SessionState::Closed => Err(KvError::NotOpen),
        }
    }

    /// Mark the channel unusable and build the error to report
    pub(super) fn desync(&mut self, declared: usize, transferred: usize) -> KvError {
        tracing::warn!(
            "Protocol desync: declared {} bytes, transferred {}; reset required",
            declared,
            transferred
        );
        self.state = SessionState::Desynced;
        KvError::ProtocolDesync {
            declared,
            transferred,
        }
    }

    /// Send a command line and, for passthrough writes, its payload
    ///
    /// The payload follows the line immediately; no reply is awaited in between.
    pub(super) fn send(&mut self, command: &Command) -> Result<()> {
        let header = command.header_line();
        tracing::trace!("-> {}", header.trim_end());

        self.io.get_mut().write_all(header.as_bytes())?;

        if let Some(payload) = command.payload() {
            self.stream_payload(payload)?;
        }

        self.io.get_mut().flush()?;
        Ok(())
    }

    fn stream_payload(&mut self, payload: &[u8]) -> Result<()> {
        let declared = payload.len();
        let mut transferred = 0;

        while transferred < declared {
            match self.io.get_mut().write(&payload[transferred..]) {
                Ok(0) => break,
                Ok(n) => transferred += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::debug!("Payload write failed: {}", e);
                    break;
                }
            }
        }

        if transferred != declared {
            return Err(self.desync(declared, transferred));
        }

        Ok(())
    }

    /// Read a reply line into the line buffer
    fn next_line(&mut self) -> Result<()> {
        match read_line(&mut self.io, &mut self.line) {
            Ok(true) => Ok(()),
            Ok(false) => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "transport closed before the reply",
            )
            .into()),
            Err(e) => Err(e),
        }
    }

    /// Read a decimal reply
    pub(super) fn read_number(&mut self, parsing: ReplyParsing) -> Result<i128> {
        self.next_line()?;

        let line = match line_str(&self.line) {
            Ok(line) => line,
            Err(_) => {
                return match parsing {
                    ReplyParsing::Strict => Err(KvError::MalformedReply(
                        String::from_utf8_lossy(&self.line).into_owned(),
                    )),
                    ReplyParsing::Lenient => Ok(0),
                }
            }
        };
        tracing::trace!("<- {}", line);

        match (parse_reply_line(line), parsing) {
            (ReplyLine::Number(n), _) => Ok(n),
            (ReplyLine::Error(reason), ReplyParsing::Strict) => Err(KvError::Remote(reason.to_string())),
            (ReplyLine::Malformed(text), ReplyParsing::Strict) => Err(KvError::MalformedReply(text.to_string())),
            (_, ReplyParsing::Lenient) => Ok(0),
        }
    }

    /// Read a size-prefixed binary reply
    ///
    /// The payload is consumed in full even when the caller wants less of it,
    /// so the next command starts on a frame boundary.
    pub(super) fn read_data(&mut self, parsing: ReplyParsing) -> Result<Vec<u8>> {
        self.next_line()?;

        let line = line_str(&self.line).unwrap_or("");
        tracing::trace!("<- {}", line);

        let declared = match parse_reply_line(line) {
            ReplyLine::Number(n) if (0..=MAX_PAYLOAD_SIZE as i128).contains(&n) => n as usize,
            ReplyLine::Error(reason) => {
                return match parsing {
                    ReplyParsing::Strict => Err(KvError::Remote(reason.to_string())),
                    ReplyParsing::Lenient => Ok(Vec::new()),
                }
            }
            _ => {
                // Without a usable length the payload boundary is unknown
                let text = line.to_string();
                self.state = SessionState::Desynced;
                return Err(KvError::MalformedReply(text));
            }
        };

        match read_payload(&mut self.io, declared) {
            Ok(payload) => Ok(payload),
            Err(KvError::ProtocolDesync {
                declared,
                transferred,
            }) => Err(self.desync(declared, transferred)),
            Err(e) => Err(e),
        }
    }
}
