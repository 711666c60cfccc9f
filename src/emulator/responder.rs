//! Responder
//!
//! Executes decoded commands against a `PreferenceTable`, the way the
//! co-processor firmware does. One responder per channel: the open namespace
//! is session state, the table is shared.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::codec::{Value, ValueType};
use crate::protocol::{Command, Reply};

use super::table::{Entry, NamespaceId, PreferenceTable};

/// Namespace opened by `PREF_BEGIN`
#[derive(Debug, Clone)]
struct OpenNamespace {
    id: NamespaceId,
    read_only: bool,
}

/// Storage-owner side of one channel
pub struct Responder {
    table: Arc<Mutex<PreferenceTable>>,
    open: Option<OpenNamespace>,
}

impl Responder {
    pub fn new(table: Arc<Mutex<PreferenceTable>>) -> Self {
        Self { table, open: None }
    }

    pub fn table(&self) -> &Arc<Mutex<PreferenceTable>> {
        &self.table
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    /// Execute a command and return a reply
    pub fn execute(&mut self, command: Command) -> Reply {
        tracing::trace!("Executing {:?}", command.command_type());

        let open = match (&command, &self.open) {
            (Command::Begin { .. }, _) | (Command::End, _) => None,
            (_, Some(open)) => Some(open.clone()),
            (_, None) => return Reply::error("namespace not open"),
        };

        match (command, open) {
            (
                Command::Begin {
                    name,
                    read_only,
                    partition,
                },
                _,
            ) => self.begin(NamespaceId::new(partition.as_deref(), name), read_only),
            (Command::End, _) => {
                self.open = None;
                Reply::flag(true)
            }
            (Command::Clear, Some(open)) => {
                if open.read_only {
                    return Reply::flag(false);
                }
                Reply::flag(self.table.lock().clear(&open.id).is_ok())
            }
            (Command::Remove { key }, Some(open)) => {
                if open.read_only {
                    return Reply::flag(false);
                }
                let removed = self.table.lock().remove(&open.id, &key).unwrap_or(false);
                Reply::flag(removed)
            }
            (Command::Put { key, value }, Some(open)) => {
                // The payload was consumed while decoding; refusing here keeps framing
                if open.read_only {
                    return Reply::length(0);
                }
                let entry = Entry {
                    value_type: value.value_type(),
                    bytes: value.encode(),
                };
                let len = entry.bytes.len();
                match self.table.lock().put(&open.id, &key, entry) {
                    Ok(()) => Reply::length(len),
                    Err(e) => {
                        tracing::warn!("Failed to store {:?}: {}", key, e);
                        Reply::length(0)
                    }
                }
            }
            (
                Command::Get {
                    key,
                    value_type,
                    default,
                },
                Some(open),
            ) => self.get(&open.id, &key, value_type, default),
            (Command::Len { key }, Some(open)) => {
                let table = self.table.lock();
                Reply::length(table.get(&open.id, &key).map_or(0, |e| e.bytes.len()))
            }
            (Command::Type { key }, Some(open)) => {
                let table = self.table.lock();
                let value_type = table
                    .get(&open.id, &key)
                    .map_or(ValueType::Invalid, |e| e.value_type);
                Reply::Number(i128::from(value_type.tag()))
            }
            (_, None) => Reply::error("namespace not open"),
        }
    }

    fn begin(&mut self, id: NamespaceId, read_only: bool) -> Reply {
        let mut table = self.table.lock();

        if read_only {
            // A read-only session cannot create its namespace
            if !table.contains_namespace(&id) {
                return Reply::flag(false);
            }
        } else if let Err(e) = table.ensure_namespace(&id) {
            tracing::warn!("Failed to create namespace {:?}: {}", id, e);
            return Reply::flag(false);
        }

        tracing::debug!("Opened namespace {}/{} (read_only={})", id.partition, id.name, read_only);
        self.open = Some(OpenNamespace { id, read_only });
        Reply::flag(true)
    }

    fn get(&self, id: &NamespaceId, key: &str, value_type: ValueType, default: Option<String>) -> Reply {
        let table = self.table.lock();

        let Some(entry) = table.get(id, key) else {
            return default_reply(value_type, default);
        };

        if entry.value_type != value_type {
            return Reply::error(format!(
                "type mismatch: stored {}, requested {}",
                entry.value_type, value_type
            ));
        }

        if value_type.is_scalar() {
            match Value::decode(value_type, &entry.bytes).map(|v| v.as_i128()) {
                Ok(Some(n)) => Reply::Number(n),
                _ => Reply::error("corrupt scalar entry"),
            }
        } else {
            Reply::Data(entry.bytes.clone())
        }
    }
}

/// Reply for an absent key: the caller-supplied default, or zero / empty
fn default_reply(value_type: ValueType, default: Option<String>) -> Reply {
    if value_type.is_scalar() {
        let text = default.unwrap_or_else(|| "0".to_string());
        match Value::parse(value_type, &text).map(|v| v.as_i128()) {
            Ok(Some(n)) => Reply::Number(n),
            _ => Reply::error(format!("bad default {:?}", text)),
        }
    } else {
        Reply::Data(default.map(String::into_bytes).unwrap_or_default())
    }
}
