//! Remote backend
//!
//! Operates a store owned by a companion processor through the command
//! protocol. Every primitive is one blocking round trip: the command line (and
//! passthrough payload) goes out, then the full reply is consumed before the
//! call returns. Nothing is retried here; retry policy belongs to the caller.
//!
//! ## Failure Handling
//! - Transport failure: `KvError::Io`, session stays usable
//! - Malformed / `ERR` reply: error in `Strict` mode, zero in `Lenient` mode
//! - Passthrough length mismatch: `KvError::ProtocolDesync`, after which every
//!   call fails with `KvError::SessionDesynced` until `reset()`

mod session;

pub use session::SessionState;

use std::cell::RefCell;
use std::io::{Read, Write};

use crate::codec::{validate_key_len, Value, ValueType};
use crate::config::{Config, ReplyParsing};
use crate::error::{KvError, Result};
use crate::protocol::{Command, MAX_PAYLOAD_SIZE};
use crate::store::KvStore;

use session::Session;

/// Backend driving a co-processor owned store over a byte stream
pub struct RemoteBackend<T: Read + Write> {
    config: Config,
    session: RefCell<Session<T>>,
}

impl<T: Read + Write> RemoteBackend<T> {
    /// Wrap a transport; no bytes are exchanged until `begin()`
    pub fn new(transport: T, config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            session: RefCell::new(Session::new(transport)),
        })
    }

    /// Current connection state
    pub fn state(&self) -> SessionState {
        self.session.borrow().state().clone()
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state(), SessionState::Open { .. })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Stored type tag, `None` when the key is absent
    pub fn type_of(&self, key: &str) -> Result<Option<ValueType>> {
        self.check_key(key)?;
        let n = self.exchange_number(&Command::Type {
            key: key.to_string(),
        })?;

        match u8::try_from(n).ok().and_then(ValueType::from_tag) {
            Some(ValueType::Invalid) => Ok(None),
            Some(value_type) => Ok(Some(value_type)),
            None => match self.config.reply_parsing {
                ReplyParsing::Strict => Err(KvError::MalformedReply(format!("type tag {}", n))),
                ReplyParsing::Lenient => Ok(None),
            },
        }
    }

    /// Swap in a fresh transport, dropping all session state
    ///
    /// This is the only way out of `SessionState::Desynced`. The namespace must
    /// be opened again with `begin()`. Returns the old transport.
    pub fn reset(&self, transport: T) -> T {
        tracing::debug!("Resetting remote session");
        let old = self.session.replace(Session::new(transport));
        old.into_inner()
    }

    /// Give the transport back
    pub fn into_inner(self) -> T {
        self.session.into_inner().into_inner()
    }

    fn check_key(&self, key: &str) -> Result<()> {
        validate_key_len(key, self.config.max_key_len)
    }

    /// Round trip with a decimal reply; requires an open namespace
    fn exchange_number(&self, command: &Command) -> Result<i128> {
        let mut session = self.session.borrow_mut();
        session.ensure_open()?;
        session.send(command)?;
        session.read_number(self.config.reply_parsing)
    }

    /// Round trip with a binary reply; requires an open namespace
    fn exchange_data(&self, command: &Command) -> Result<Vec<u8>> {
        let mut session = self.session.borrow_mut();
        session.ensure_open()?;
        session.send(command)?;
        session.read_data(self.config.reply_parsing)
    }

    fn non_negative(&self, n: i128, what: &str) -> Result<usize> {
        match usize::try_from(n) {
            Ok(n) => Ok(n),
            Err(_) => match self.config.reply_parsing {
                ReplyParsing::Strict => Err(KvError::MalformedReply(format!("{} {}", what, n))),
                ReplyParsing::Lenient => Ok(0),
            },
        }
    }
}

impl<T: Read + Write> KvStore for RemoteBackend<T> {
    fn begin(&self) -> Result<()> {
        let mut session = self.session.borrow_mut();
        session.ensure_synced()?;
        if let SessionState::Open { .. } = session.state() {
            return Err(KvError::AlreadyOpen);
        }

        let command = Command::Begin {
            name: self.config.store_name.clone(),
            read_only: self.config.read_only,
            partition: self.config.partition_label.clone(),
        };
        session.send(&command)?;

        if session.read_number(self.config.reply_parsing)? == 0 {
            return Err(KvError::Rejected("begin"));
        }

        tracing::debug!("Opened remote store {:?}", self.config.store_name);
        session.set_state(SessionState::Open {
            name: self.config.store_name.clone(),
            read_only: self.config.read_only,
        });
        Ok(())
    }

    fn end(&self) -> Result<()> {
        let mut session = self.session.borrow_mut();
        session.ensure_open()?;
        session.send(&Command::End)?;
        // The owner acknowledges END but its content carries nothing
        session.read_number(ReplyParsing::Lenient)?;
        session.set_state(SessionState::Closed);
        tracing::debug!("Closed remote store {:?}", self.config.store_name);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        if self.exchange_number(&Command::Clear)? == 0 {
            return Err(KvError::Rejected("clear"));
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        self.check_key(key)?;
        let n = self.exchange_number(&Command::Remove {
            key: key.to_string(),
        })?;
        Ok(n != 0)
    }

    fn put_bytes(&self, key: &str, value: &[u8]) -> Result<usize> {
        self.put_value(key, &Value::Blob(value.to_vec()))
    }

    fn get_bytes(&self, key: &str, buf: &mut [u8]) -> Result<usize> {
        self.get_typed_bytes(key, ValueType::Blob, buf)
    }

    fn get_bytes_length(&self, key: &str) -> Result<usize> {
        self.check_key(key)?;
        let n = self.exchange_number(&Command::Len {
            key: key.to_string(),
        })?;
        self.non_negative(n, "length")
    }

    fn put_value(&self, key: &str, value: &Value) -> Result<usize> {
        self.check_key(key)?;

        let declared = value.encoded_len();
        if declared > MAX_PAYLOAD_SIZE {
            return Err(KvError::InvalidValue(format!(
                "value of {} bytes exceeds the {} byte limit",
                declared, MAX_PAYLOAD_SIZE
            )));
        }

        let command = Command::Put {
            key: key.to_string(),
            value: value.clone(),
        };

        let mut session = self.session.borrow_mut();
        session.ensure_open()?;
        session.send(&command)?;
        let n = session.read_number(self.config.reply_parsing)?;

        // An empty value stores 0 bytes, which reads the same as a refusal
        if n == 0 && (declared > 0 || self.config.read_only) {
            return Err(KvError::Rejected("put"));
        }
        if n == declared as i128 {
            return Ok(declared);
        }
        if value.value_type().is_scalar() {
            return Err(KvError::MalformedReply(format!(
                "stored {} bytes of a {}-byte scalar",
                n, declared
            )));
        }

        // The owner took a different number of payload bytes than declared
        let transferred = usize::try_from(n).unwrap_or(0);
        Err(session.desync(declared, transferred))
    }

    fn get_typed_bytes(&self, key: &str, value_type: ValueType, buf: &mut [u8]) -> Result<usize> {
        let bytes = if value_type.is_scalar() {
            self.get_value(key, value_type)?.encode()
        } else {
            self.check_key(key)?;
            self.exchange_data(&Command::Get {
                key: key.to_string(),
                value_type,
                default: None,
            })?
        };

        let copied = bytes.len().min(buf.len());
        buf[..copied].copy_from_slice(&bytes[..copied]);
        Ok(copied)
    }

    fn get_value(&self, key: &str, value_type: ValueType) -> Result<Value> {
        self.check_key(key)?;

        match value_type {
            ValueType::Invalid => Err(KvError::InvalidValue(
                "cannot read the INVALID type".to_string(),
            )),
            ValueType::Str | ValueType::Blob => {
                let data = self.exchange_data(&Command::Get {
                    key: key.to_string(),
                    value_type,
                    default: None,
                })?;
                Value::decode(value_type, &data)
            }
            scalar => {
                let n = self.exchange_number(&Command::Get {
                    key: key.to_string(),
                    value_type: scalar,
                    default: Some("0".to_string()),
                })?;
                match (Value::from_i128(scalar, n), self.config.reply_parsing) {
                    (Some(value), _) => Ok(value),
                    (None, ReplyParsing::Strict) => Err(KvError::MalformedReply(format!(
                        "{} is out of range for {}",
                        n, scalar
                    ))),
                    (None, ReplyParsing::Lenient) => Value::from_i128(scalar, 0)
                        .ok_or_else(|| KvError::InvalidValue(format!("{} is not a scalar", scalar))),
                }
            }
        }
    }
}
