//! Network Module
//!
//! Serves the emulated storage owner over TCP, so a host can talk to it
//! through `RemoteBackend<TcpStream>` the way it would over a serial line.
//!
//! ## Architecture
//! - Single non-blocking acceptor loop
//! - Fixed worker pool fed by a bounded channel
//! - One `Responder` session per connection, one shared table

mod connection;
mod server;

pub use connection::Connection;
pub use server::{Server, ShutdownHandle};
