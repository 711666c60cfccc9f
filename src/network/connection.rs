//! Connection Handler
//!
//! Serves one host over TCP with its own `Responder` session.

use std::io::{self, BufReader, BufWriter};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use parking_lot::Mutex;

use crate::emulator::{PreferenceTable, Responder};
use crate::error::{KvError, Result};
use crate::protocol::{read_command, write_reply, Reply};

/// Handles a single host connection
pub struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Session state: the namespace this host has open
    responder: Responder,

    /// Reusable command line buffer
    line: BytesMut,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Create a new connection handler
    pub fn new(stream: TcpStream, table: Arc<Mutex<PreferenceTable>>) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(write_stream),
            responder: Responder::new(table),
            line: BytesMut::with_capacity(64),
            peer_addr,
        })
    }

    /// Configure connection timeouts (0 disables a timeout)
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        if read_ms > 0 {
            self.reader
                .get_ref()
                .set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        if write_ms > 0 {
            self.writer
                .get_ref()
                .set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }
        Ok(())
    }

    /// Handle the connection (blocking until closed)
    ///
    /// A malformed command gets an `ERR` reply and the loop carries on. A
    /// payload cut short leaves the stream unframed, so the connection is
    /// dropped.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        loop {
            let command = match read_command(&mut self.reader, &mut self.line) {
                Ok(Some(command)) => command,
                Ok(None) => {
                    tracing::debug!("Client {} disconnected", self.peer_addr);
                    return Ok(());
                }
                Err(KvError::Io(ref e)) if is_disconnect(e.kind()) => {
                    tracing::debug!("Client {} went away: {}", self.peer_addr, e);
                    return Ok(());
                }
                Err(e @ KvError::ProtocolDesync { .. }) => {
                    tracing::warn!("Dropping {}: {}", self.peer_addr, e);
                    return Err(e);
                }
                Err(e) => {
                    tracing::debug!("Bad command from {}: {}", self.peer_addr, e);
                    self.send_reply(&Reply::error(e.to_string()))?;
                    continue;
                }
            };

            tracing::trace!("Received command from {}: {:?}", self.peer_addr, command);

            let reply = self.responder.execute(command);
            self.send_reply(&reply)?;
        }
    }

    /// Send a reply; a host that already left is not an error
    fn send_reply(&mut self, reply: &Reply) -> Result<()> {
        match write_reply(&mut self.writer, reply) {
            Ok(()) => Ok(()),
            Err(KvError::Io(ref e)) if is_disconnect(e.kind()) || e.kind() == io::ErrorKind::BrokenPipe => {
                tracing::debug!(
                    "Client {} disconnected before the reply could be sent: {}",
                    self.peer_addr,
                    e
                );
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Error writing to {}: {}", self.peer_addr, e);
                Err(e)
            }
        }
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

/// I/O failures that mean the host is gone or idle past the read timeout
fn is_disconnect(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::TimedOut
    )
}
