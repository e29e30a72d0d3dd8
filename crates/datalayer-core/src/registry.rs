//! Listener storage shared by the change, persistence, and event
//! registries: same matching and storage contract, different triggers.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value;

use datalayer_path::Pattern;

use crate::engine::DataLayer;
use crate::events::Event;

pub type HandlerError = Box<dyn std::error::Error>;

/// `Ok(true)` signals completion: the record is retired permanently
/// (fire-once). `Err` is caught at the dispatch call site, reported to the
/// error hook, and treated as a normal return for sequencing.
pub type HandlerResult = Result<bool, HandlerError>;

/// What a listener is invoked with.
#[derive(Debug, Clone)]
pub enum FirePayload {
    /// A change or persistence notification: the matched pattern's base
    /// path (wildcard suffix stripped) and the current value stored there.
    Change { path: String, value: Value },
    /// An event notification.
    Event(Event),
}

type HandlerFn = dyn Fn(&mut DataLayer, &FirePayload) -> HandlerResult;

/// A listener callback with stable identity.
///
/// Clones share identity: a clone compares equal to its source for
/// registration deduplication and for `unlisten`. Handlers receive the
/// engine mutably, so they may freely call mutating or triggering
/// operations; the nested round runs to completion before control returns.
#[derive(Clone)]
pub struct Handler(Rc<HandlerFn>);

impl Handler {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut DataLayer, &FirePayload) -> HandlerResult + 'static,
    {
        Handler(Rc::new(f))
    }

    /// Identity key: the allocation address. Stable for the lifetime of
    /// the handler and shared by all clones.
    pub(crate) fn key(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    pub(crate) fn call(&self, layer: &mut DataLayer, payload: &FirePayload) -> HandlerResult {
        (self.0)(layer, payload)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handler({:#x})", self.key())
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ListenerRecord {
    pub(crate) handler: Handler,
    /// Debug label forwarded to error reports.
    pub(crate) id: Option<String>,
    /// Event names that must all have occurred before the record fires.
    pub(crate) depends_on: Vec<String>,
    pub(crate) fired_once: bool,
}

impl ListenerRecord {
    pub(crate) fn new(handler: Handler, id: Option<String>, depends_on: Vec<String>) -> Self {
        ListenerRecord {
            handler,
            id,
            depends_on,
            fired_once: false,
        }
    }
}

/// Ordered lists of listener records, keyed by pattern.
#[derive(Debug, Default)]
pub(crate) struct ListenerRegistry {
    entries: IndexMap<Pattern, Vec<ListenerRecord>>,
}

impl ListenerRegistry {
    /// Append a record under `pattern`. Registering a handler already
    /// present under the same pattern is a no-op; returns whether the
    /// record was added.
    pub(crate) fn subscribe(&mut self, pattern: Pattern, record: ListenerRecord) -> bool {
        let records = self.entries.entry(pattern).or_default();
        if records.iter().any(|r| r.handler.key() == record.handler.key()) {
            return false;
        }
        records.push(record);
        true
    }

    /// Remove the record matching both `pattern` and handler identity.
    pub(crate) fn unsubscribe(&mut self, pattern: &Pattern, handler: &Handler) -> bool {
        let Some(records) = self.entries.get_mut(pattern) else {
            return false;
        };
        let before = records.len();
        records.retain(|r| r.handler.key() != handler.key());
        let removed = records.len() < before;
        if records.is_empty() {
            self.entries.shift_remove(pattern);
        }
        removed
    }

    /// Clones of the records under `pattern` not retired by fire-once, in
    /// registration order. Cloned so dispatch survives re-entrant
    /// registration changes.
    pub(crate) fn live_records(&self, pattern: &Pattern) -> Vec<ListenerRecord> {
        self.entries
            .get(pattern)
            .map(|records| records.iter().filter(|r| !r.fired_once).cloned().collect())
            .unwrap_or_default()
    }

    /// Current state of one record, if still registered.
    pub(crate) fn find(&self, pattern: &Pattern, key: usize) -> Option<ListenerRecord> {
        self.entries
            .get(pattern)?
            .iter()
            .find(|r| r.handler.key() == key)
            .cloned()
    }

    pub(crate) fn mark_fired(&mut self, pattern: &Pattern, key: usize) {
        if let Some(record) = self
            .entries
            .get_mut(pattern)
            .and_then(|records| records.iter_mut().find(|r| r.handler.key() == key))
        {
            record.fired_once = true;
        }
    }
}
