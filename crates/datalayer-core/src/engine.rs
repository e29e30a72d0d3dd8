//! The engine aggregate and the public tree operations.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use indexmap::IndexMap;
use serde_json::{Map, Value};

use datalayer_path::{join_path, parse_path, Pattern};
use datalayer_util::is_empty_value;

use crate::error::{Error, ErrorHook};
use crate::events::Event;
use crate::persist::{MemoryStorage, Storage};
use crate::registry::{FirePayload, Handler, ListenerRecord, ListenerRegistry};
use crate::tree;

/// Options for [`DataLayer::change`].
#[derive(Debug, Clone, Default)]
pub struct ChangeOptions {
    /// Suppress the immediate invocation with a value already present at
    /// the pattern's base when registering.
    pub change_only: bool,
    /// Debug label forwarded to error reports.
    pub id: Option<String>,
}

/// The reactive data layer: one shared hierarchical tree plus an event
/// bus, decoupling data producers from consumers regardless of load
/// order.
///
/// One instance per page load. All operations are synchronous and run to
/// completion, including every listener they invoke; listeners receive
/// the engine mutably and may re-enter it.
pub struct DataLayer {
    /// The single mutable root map. Mutated only through the path
    /// operations; replaced wholesale only during restore-from-storage.
    pub(crate) tree: Value,
    /// Deep copy of the tree taken immediately before each mutation and
    /// used for exactly one diff. Not a history.
    pub(crate) snapshot: Value,
    pub(crate) change_listeners: ListenerRegistry,
    pub(crate) persist_listeners: ListenerRegistry,
    pub(crate) event_listeners: ListenerRegistry,
    /// Append-only, process-lifetime event log. Never pruned.
    pub(crate) event_log: Vec<Event>,
    /// path -> TTL minutes for externally mirrored paths.
    pub(crate) persisted: IndexMap<String, u64>,
    pub(crate) persist_writers: HashMap<String, Handler>,
    pub(crate) storage: Box<dyn Storage>,
    pub(crate) clock: Rc<dyn Fn() -> i64>,
    pub(crate) error_hook: Option<ErrorHook>,
}

impl Default for DataLayer {
    fn default() -> Self {
        Self::new()
    }
}

fn system_now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

impl DataLayer {
    pub fn new() -> Self {
        Self::with_storage(Box::new(MemoryStorage::default()))
    }

    pub fn with_storage(storage: Box<dyn Storage>) -> Self {
        DataLayer {
            tree: Value::Object(Map::new()),
            snapshot: Value::Object(Map::new()),
            change_listeners: ListenerRegistry::default(),
            persist_listeners: ListenerRegistry::default(),
            event_listeners: ListenerRegistry::default(),
            event_log: Vec::new(),
            persisted: IndexMap::new(),
            persist_writers: HashMap::new(),
            storage,
            clock: Rc::new(system_now_ms),
            error_hook: None,
        }
    }

    /// Replace the wall clock (epoch milliseconds). Timestamps and TTL
    /// expiry both read it, which keeps persistence tests deterministic.
    pub fn set_clock<F>(&mut self, clock: F)
    where
        F: Fn() -> i64 + 'static,
    {
        self.clock = Rc::new(clock);
    }

    pub fn set_error_hook(&mut self, hook: ErrorHook) {
        self.error_hook = Some(hook);
    }

    pub(crate) fn now_ms(&self) -> i64 {
        (self.clock)()
    }

    // ── Reads ─────────────────────────────────────────────────────────

    /// The value at `path`, as a deep, independent copy. The empty path
    /// reads the whole tree.
    pub fn get(&self, path: &str) -> Result<Option<Value>, Error> {
        let segments = parse_path(path)?;
        Ok(tree::get_at(&self.tree, &segments).cloned())
    }

    /// The value at `path`, or `default` when absent. Never writes.
    pub fn get_or(&self, path: &str, default: Value) -> Result<Value, Error> {
        Ok(self.get(path)?.unwrap_or(default))
    }

    /// The value at `path`; when absent, `default` is stored there first
    /// (a full mutation round) and returned.
    pub fn get_or_insert(&mut self, path: &str, default: Value) -> Result<Value, Error> {
        match self.get(path)? {
            Some(value) => Ok(value),
            None => self.set(path, default),
        }
    }

    pub fn has(&self, path: &str) -> Result<bool, Error> {
        let segments = parse_path(path)?;
        Ok(tree::get_at(&self.tree, &segments).is_some())
    }

    /// True when the value at `path` is absent, null, an empty map or
    /// list, or a whitespace-only string. Numbers, zero included, are
    /// never empty.
    pub fn empty(&self, path: &str) -> Result<bool, Error> {
        Ok(self.get(path)?.map_or(true, |v| is_empty_value(&v)))
    }

    pub(crate) fn read_at(&self, segments: &[String]) -> Option<Value> {
        tree::get_at(&self.tree, segments).cloned()
    }

    // ── Mutations ─────────────────────────────────────────────────────

    /// Store `value` at `path` and return the value as stored. A map
    /// written over a map deep-merges (new keys win on conflict, other
    /// existing keys are preserved); anything else overwrites. Runs a
    /// full dispatch round.
    pub fn set(&mut self, path: &str, value: Value) -> Result<Value, Error> {
        let segments = parse_path(path)?;
        self.mutate(|root| tree::set_at(root, &segments, value))
            .map(|(stored, _)| stored)
    }

    /// Delete the node at `path`; no-op when absent. Runs a full dispatch
    /// round.
    pub fn erase(&mut self, path: &str) -> Result<(), Error> {
        let segments = parse_path(path)?;
        if segments.is_empty() {
            return Err(Error::RootPath("erase"));
        }
        self.mutate(|root| {
            tree::erase_at(root, &segments);
            Ok(())
        })
        .map(|_| ())
    }

    /// Append `value` to the list at `path` (concatenating when `value`
    /// is itself a list); a non-list node is replaced by a fresh list.
    /// Returns the list as it existed before the push. Runs a full
    /// dispatch round.
    pub fn push(&mut self, path: &str, value: Value) -> Result<Value, Error> {
        let segments = parse_path(path)?;
        if segments.is_empty() {
            return Err(Error::RootPath("push"));
        }
        self.mutate(|root| Ok(tree::push_at(root, &segments, value)))
            .map(|(previous, _)| previous)
    }

    /// Snapshot, apply, dispatch. A failed write rolls the tree back to
    /// the snapshot so the engine stays in its last successfully-applied
    /// state. Returns the apply result and the identities of every
    /// handler the round invoked.
    pub(crate) fn mutate<R>(
        &mut self,
        apply: impl FnOnce(&mut Value) -> Result<R, Error>,
    ) -> Result<(R, HashSet<usize>), Error> {
        self.snapshot = self.tree.clone();
        match apply(&mut self.tree) {
            Ok(out) => {
                let invoked = self.run_change_round();
                Ok((out, invoked))
            }
            Err(err) => {
                self.tree = self.snapshot.clone();
                Err(err)
            }
        }
    }

    // ── Change listeners ──────────────────────────────────────────────

    /// Register a change listener on `pattern`. A value already present
    /// at the pattern's base is delivered immediately unless
    /// `change_only` is set. Registering the same handler twice on the
    /// same pattern is a no-op.
    pub fn change(&mut self, pattern: &str, handler: Handler, options: ChangeOptions) -> Result<(), Error> {
        let pattern = Pattern::parse(pattern)?;
        let record = ListenerRecord::new(handler.clone(), options.id.clone(), Vec::new());
        if !self.change_listeners.subscribe(pattern.clone(), record) {
            return Ok(());
        }
        if options.change_only {
            return Ok(());
        }
        let existing = tree::get_at(&self.tree, pattern.base()).cloned();
        if let Some(value) = existing {
            let payload = FirePayload::Change {
                path: join_path(pattern.base()),
                value,
            };
            match handler.call(self, &payload) {
                Ok(true) => self.change_listeners.mark_fired(&pattern, handler.key()),
                Ok(false) => {}
                Err(err) => self.report_listener_error(
                    "change",
                    Some(&pattern),
                    options.id.as_deref(),
                    &payload,
                    err,
                ),
            }
        }
        Ok(())
    }
}
