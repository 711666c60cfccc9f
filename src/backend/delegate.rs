//! Delegate backend
//!
//! Forwards the primitives to a pre-existing flash KV engine. The engine is an
//! external collaborator; this module only fixes the narrow contract it must
//! offer and maps its status codes onto `KvError`.

use std::cell::{Cell, RefCell};

use crate::codec::validate_key;
use crate::error::{KvError, Result};
use crate::store::KvStore;

/// Status reported by a flash engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineError {
    /// The key has no record
    NotFound,

    /// Any other native error code
    Code(i32),
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Operations a flash-resident engine exposes
pub trait FlashEngine {
    fn init(&mut self) -> EngineResult<()>;

    fn deinit(&mut self) -> EngineResult<()>;

    /// Erase every record
    fn reset(&mut self) -> EngineResult<()>;

    fn set(&mut self, key: &str, value: &[u8]) -> EngineResult<()>;

    /// Copy up to `buf.len()` bytes, returns bytes copied
    fn get(&mut self, key: &str, buf: &mut [u8]) -> EngineResult<usize>;

    /// Stored size of a record
    fn size_of(&mut self, key: &str) -> EngineResult<usize>;

    fn remove(&mut self, key: &str) -> EngineResult<()>;
}

impl From<EngineError> for KvError {
    fn from(error: EngineError) -> Self {
        match error {
            EngineError::NotFound => KvError::Engine(-1),
            EngineError::Code(code) => KvError::Engine(code),
        }
    }
}

/// Backend forwarding to a `FlashEngine`
pub struct DelegateBackend<E: FlashEngine> {
    engine: RefCell<E>,
    open: Cell<bool>,
}

impl<E: FlashEngine> DelegateBackend<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine: RefCell::new(engine),
            open: Cell::new(false),
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.get()
    }

    pub fn into_inner(self) -> E {
        self.engine.into_inner()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.open.get() {
            Ok(())
        } else {
            Err(KvError::NotOpen)
        }
    }
}

impl<E: FlashEngine> KvStore for DelegateBackend<E> {
    fn begin(&self) -> Result<()> {
        if self.open.get() {
            return Err(KvError::AlreadyOpen);
        }
        self.engine.borrow_mut().init()?;
        self.open.set(true);
        tracing::debug!("Flash engine initialized");
        Ok(())
    }

    fn end(&self) -> Result<()> {
        self.ensure_open()?;
        // Still open when the engine refuses, so `end()` can be retried
        self.engine.borrow_mut().deinit()?;
        self.open.set(false);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.ensure_open()?;
        self.engine.borrow_mut().reset()?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        validate_key(key)?;
        self.ensure_open()?;
        match self.engine.borrow_mut().remove(key) {
            Ok(()) => Ok(true),
            Err(EngineError::NotFound) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn put_bytes(&self, key: &str, value: &[u8]) -> Result<usize> {
        validate_key(key)?;
        self.ensure_open()?;
        self.engine.borrow_mut().set(key, value)?;
        Ok(value.len())
    }

    fn get_bytes(&self, key: &str, buf: &mut [u8]) -> Result<usize> {
        validate_key(key)?;
        self.ensure_open()?;
        match self.engine.borrow_mut().get(key, buf) {
            Ok(copied) => Ok(copied.min(buf.len())),
            Err(EngineError::NotFound) => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn get_bytes_length(&self, key: &str) -> Result<usize> {
        validate_key(key)?;
        self.ensure_open()?;
        match self.engine.borrow_mut().size_of(key) {
            Ok(size) => Ok(size),
            Err(EngineError::NotFound) => Ok(0),
            Err(e) => Err(e.into()),
        }
    }
}
