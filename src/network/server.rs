//! TCP Server
//!
//! Accepts connections and dispatches them to a fixed pool of worker threads
//! over a bounded channel. Each worker serves one connection at a time, so
//! `max_connections` bounds the number of hosts served concurrently.

use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::channel::{self, Receiver};
use parking_lot::Mutex;

use super::Connection;
use crate::config::Config;
use crate::emulator::PreferenceTable;
use crate::error::{KvError, Result};

/// Interval between accept polls while idle
const ACCEPT_POLL: Duration = Duration::from_millis(10);

/// TCP server exposing an emulated storage owner
pub struct Server {
    config: Config,
    table: Arc<Mutex<PreferenceTable>>,
    listener: TcpListener,
    shutdown: Arc<AtomicBool>,
}

/// Handle that stops a running server from another thread
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }
}

impl Server {
    /// Bind the listener from `config.listen_addr`
    pub fn bind(config: Config, table: Arc<Mutex<PreferenceTable>>) -> Result<Self> {
        config.validate()?;

        let listener = TcpListener::bind(&config.listen_addr)?;
        listener.set_nonblocking(true)?;

        Ok(Self {
            config,
            table,
            listener,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            flag: Arc::clone(&self.shutdown),
        }
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Serve until shutdown (blocking)
    ///
    /// Returns after the accept loop stops and every worker has finished its
    /// current connection.
    pub fn run(&self) -> Result<()> {
        let workers = self.config.max_connections;
        let (tx, rx) = channel::bounded::<TcpStream>(workers);

        tracing::info!(
            "Serving on {} with {} worker(s)",
            self.local_addr()?,
            workers
        );

        let outcome = crossbeam::thread::scope(|scope| {
            for id in 0..workers {
                let rx = rx.clone();
                scope.spawn(move |_| self.worker(id, rx));
            }
            drop(rx);

            let accepted = self.accept_loop(|stream| tx.send(stream).is_ok());
            drop(tx);
            accepted
        });

        match outcome {
            Ok(accepted) => {
                tracing::info!("Server stopped");
                accepted
            }
            Err(_) => Err(io::Error::new(io::ErrorKind::Other, "worker thread panicked").into()),
        }
    }

    fn accept_loop(&self, mut dispatch: impl FnMut(TcpStream) -> bool) -> Result<()> {
        while !self.shutdown.load(Ordering::SeqCst) {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    tracing::debug!("Accepted {}", addr);
                    if !dispatch(stream) {
                        break;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::error!("Accept failed: {}", e);
                    return Err(KvError::Io(e));
                }
            }
        }
        Ok(())
    }

    fn worker(&self, id: usize, rx: Receiver<TcpStream>) {
        tracing::trace!("Worker {} started", id);

        for stream in rx.iter() {
            if let Err(e) = self.serve(stream) {
                tracing::warn!("Worker {}: connection ended with error: {}", id, e);
            }
        }

        tracing::trace!("Worker {} stopped", id);
    }

    fn serve(&self, stream: TcpStream) -> Result<()> {
        // Accepted sockets may inherit the listener's non-blocking mode
        stream.set_nonblocking(false)?;

        let mut connection = Connection::new(stream, Arc::clone(&self.table))?;
        connection.set_timeouts(self.config.read_timeout_ms, self.config.write_timeout_ms)?;
        connection.handle()
    }
}
