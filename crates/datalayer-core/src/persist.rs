//! TTL-based persistence: mirrors chosen paths into a host key-value
//! store and restores them at startup.
//!
//! For a path `P`, the store holds a value entry under `dl:v:P` (JSON
//! text) and an expiry entry under `dl:x:P` (absolute epoch milliseconds
//! as a decimal string).

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value;

use datalayer_path::{parse_path, Pattern};

use crate::engine::DataLayer;
use crate::error::{Error, ErrorReport};
use crate::registry::{Handler, ListenerRecord};
use crate::tree;

/// Synchronous host key-value store. Entries outlive the engine.
pub trait Storage {
    fn read(&self, key: &str) -> Option<String>;
    fn write(&mut self, key: &str, value: &str);
    fn remove(&mut self, key: &str);
    fn keys(&self) -> Vec<String>;
}

/// Plain in-memory store, insertion-ordered.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: IndexMap<String, String>,
}

impl Storage for MemoryStorage {
    fn read(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn write(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    fn remove(&mut self, key: &str) {
        self.entries.shift_remove(key);
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

/// A `MemoryStorage` behind `Rc<RefCell>`, so tests and hosts can keep a
/// handle on the store across engine instances.
#[derive(Debug, Clone, Default)]
pub struct SharedStorage(Rc<RefCell<MemoryStorage>>);

impl Storage for SharedStorage {
    fn read(&self, key: &str) -> Option<String> {
        self.0.borrow().read(key)
    }

    fn write(&mut self, key: &str, value: &str) {
        self.0.borrow_mut().write(key, value);
    }

    fn remove(&mut self, key: &str) {
        self.0.borrow_mut().remove(key);
    }

    fn keys(&self) -> Vec<String> {
        self.0.borrow().keys()
    }
}

/// TTL applied to restored paths that were not explicitly configured.
pub const DEFAULT_TTL_MINUTES: u64 = 30;

pub(crate) const VALUE_PREFIX: &str = "dl:v:";
pub(crate) const EXPIRY_PREFIX: &str = "dl:x:";

/// Legacy serialization of an undefined value; purged on restore.
const UNDEFINED_PLACEHOLDER: &str = "undefined";

fn value_key(path: &str) -> String {
    format!("{VALUE_PREFIX}{path}")
}

fn expiry_key(path: &str) -> String {
    format!("{EXPIRY_PREFIX}{path}")
}

impl DataLayer {
    /// Mirror `path` into storage with the given TTL in minutes.
    /// Registers a persistence listener pair (the exact path and its
    /// subtree) bound to a writer for that path; a value already present
    /// is written out immediately. An already-tracked path keeps its
    /// configuration.
    pub fn persist(&mut self, path: &str, ttl_minutes: u64) -> Result<(), Error> {
        let segments = parse_path(path)?;
        if segments.is_empty() {
            return Err(Error::RootPath("persist"));
        }
        if self.persisted.contains_key(path) {
            return Ok(());
        }
        self.persisted.insert(path.to_string(), ttl_minutes);

        let writer = {
            let path = path.to_string();
            Handler::new(move |layer, _payload| {
                layer.write_persisted(&path);
                Ok(false)
            })
        };
        self.persist_listeners.subscribe(
            Pattern::exact(segments.clone()),
            ListenerRecord::new(writer.clone(), None, Vec::new()),
        );
        self.persist_listeners.subscribe(
            Pattern::subtree(segments),
            ListenerRecord::new(writer.clone(), None, Vec::new()),
        );
        self.persist_writers.insert(path.to_string(), writer);

        if self.has(path)? {
            self.write_persisted(path);
        }
        Ok(())
    }

    /// Stop mirroring `path`: remove both listener registrations and
    /// delete both store entries.
    pub fn unpersist(&mut self, path: &str) -> Result<(), Error> {
        let segments = parse_path(path)?;
        self.persisted.shift_remove(path);
        if let Some(writer) = self.persist_writers.remove(path) {
            self.persist_listeners
                .unsubscribe(&Pattern::exact(segments.clone()), &writer);
            self.persist_listeners
                .unsubscribe(&Pattern::subtree(segments), &writer);
        }
        self.storage.remove(&value_key(path));
        self.storage.remove(&expiry_key(path));
        Ok(())
    }

    /// Serialize the current value at `path` into the store with a fresh
    /// expiry. An expiry not strictly in the future (a zero TTL) deletes
    /// both entries instead.
    pub(crate) fn write_persisted(&mut self, path: &str) {
        let ttl = self.persisted.get(path).copied().unwrap_or(DEFAULT_TTL_MINUTES);
        let now = self.now_ms();
        let expiry = now + ttl as i64 * 60_000;
        if now < expiry {
            let value = match self.get(path) {
                Ok(value) => value.unwrap_or(Value::Null),
                Err(_) => Value::Null,
            };
            match serde_json::to_string(&value) {
                Ok(serialized) => {
                    self.storage.write(&value_key(path), &serialized);
                    self.storage.write(&expiry_key(path), &expiry.to_string());
                }
                Err(err) => self.report_persist_error(path, &err.to_string()),
            }
        } else {
            self.storage.remove(&value_key(path));
            self.storage.remove(&expiry_key(path));
        }
    }

    /// Startup restore: copy every unexpired stored value back into the
    /// tree — directly, without a dispatch round — and keep the path live
    /// via [`persist`](Self::persist) unless it is already configured.
    /// Expired pairs and legacy `"undefined"` placeholders are purged.
    pub fn restore_persisted(&mut self) {
        let now = self.now_ms();
        for key in self.storage.keys() {
            if let Some(path) = key.strip_prefix(EXPIRY_PREFIX) {
                let path = path.to_string();
                let expiry = self.storage.read(&key).and_then(|raw| raw.parse::<i64>().ok());
                let serialized = self.storage.read(&value_key(&path));
                let restored = match (expiry, serialized) {
                    (Some(expiry), Some(serialized)) if now < expiry => {
                        self.restore_one(&path, &serialized)
                    }
                    _ => false,
                };
                if !restored {
                    self.storage.remove(&value_key(&path));
                    self.storage.remove(&expiry_key(&path));
                }
            } else if let Some(path) = key.strip_prefix(VALUE_PREFIX) {
                let path = path.to_string();
                if self.storage.read(&key).as_deref() == Some(UNDEFINED_PLACEHOLDER) {
                    self.storage.remove(&value_key(&path));
                    self.storage.remove(&expiry_key(&path));
                }
            }
        }
    }

    fn restore_one(&mut self, path: &str, serialized: &str) -> bool {
        if serialized == UNDEFINED_PLACEHOLDER {
            return false;
        }
        let Ok(segments) = parse_path(path) else {
            return false;
        };
        if segments.is_empty() {
            return false;
        }
        let Ok(value) = serde_json::from_str::<Value>(serialized) else {
            return false;
        };
        if tree::set_at(&mut self.tree, &segments, value).is_err() {
            return false;
        }
        if !self.persisted.contains_key(path) {
            // path was just validated, so this cannot fail
            let _ = self.persist(path, DEFAULT_TTL_MINUTES);
        }
        true
    }

    fn report_persist_error(&self, path: &str, message: &str) {
        let Some(hook) = &self.error_hook else {
            return;
        };
        hook(&ErrorReport {
            operation: "persist".to_string(),
            pattern: Some(path.to_string()),
            listener_id: None,
            message: message.to_string(),
            context: None,
        });
    }
}
