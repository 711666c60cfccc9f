//! Loopback transport
//!
//! An in-process byte stream with a `Responder` on the far end. Bytes written
//! are decoded into commands as soon as a frame is complete; replies queue up
//! for reading. Reading with nothing queued fails with `TimedOut`, the way a
//! serial read with a timeout would.
//!
//! Once a frame desynchronizes the stream the far end stops executing and
//! discards everything it receives, like a connection the server dropped.

use std::io::{self, Read, Write};
use std::sync::Arc;

use bytes::{Buf, BytesMut};
use parking_lot::Mutex;

use crate::error::KvError;
use crate::protocol::{decode_command, encode_reply, Reply};

use super::responder::Responder;
use super::table::PreferenceTable;

/// In-process transport wired to an emulated storage owner
pub struct Loopback {
    responder: Responder,

    /// Host → owner bytes not yet forming a complete frame
    inbound: BytesMut,

    /// Owner → host bytes not yet read
    outbound: BytesMut,

    /// Set once a frame boundary was lost
    desynced: bool,
}

impl Loopback {
    /// Loopback over a fresh, volatile table
    pub fn new() -> Self {
        Self::with_table(Arc::new(Mutex::new(PreferenceTable::new())))
    }

    /// Loopback over a shared table
    pub fn with_table(table: Arc<Mutex<PreferenceTable>>) -> Self {
        Self {
            responder: Responder::new(table),
            inbound: BytesMut::new(),
            outbound: BytesMut::new(),
            desynced: false,
        }
    }

    pub fn table(&self) -> Arc<Mutex<PreferenceTable>> {
        Arc::clone(self.responder.table())
    }

    /// Bytes received but not yet part of a complete frame
    pub fn pending_input(&self) -> usize {
        self.inbound.len()
    }

    /// Bytes of replies not yet read
    pub fn pending_output(&self) -> usize {
        self.outbound.len()
    }

    /// Whether the far end has stopped executing after a lost frame boundary
    pub fn is_desynced(&self) -> bool {
        self.desynced
    }

    /// Execute every complete frame in the inbound buffer
    fn pump(&mut self) {
        while let Some((decoded, consumed)) = decode_command(&self.inbound) {
            self.inbound.advance(consumed);

            let reply = match decoded {
                Ok(command) => self.responder.execute(command),
                Err(e @ KvError::ProtocolDesync { .. }) => {
                    tracing::warn!("Dropping stream: {}", e);
                    self.desynced = true;
                    self.inbound.clear();
                    break;
                }
                Err(e) => {
                    tracing::warn!("Rejected frame: {}", e);
                    Reply::error(e.to_string())
                }
            };
            self.outbound.extend_from_slice(&encode_reply(&reply));
        }
    }
}

impl Default for Loopback {
    fn default() -> Self {
        Self::new()
    }
}

impl Write for Loopback {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.desynced {
            return Ok(buf.len());
        }
        self.inbound.extend_from_slice(buf);
        self.pump();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Read for Loopback {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.outbound.is_empty() {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "no reply pending"));
        }

        let n = buf.len().min(self.outbound.len());
        let chunk = self.outbound.split_to(n);
        buf[..n].copy_from_slice(&chunk);
        Ok(n)
    }
}
