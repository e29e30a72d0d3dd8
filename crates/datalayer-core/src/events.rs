//! Event trigger, dependency gating, the append-only log, and historical
//! replay for late-registering listeners.

use std::collections::HashSet;

use serde_json::{Map, Value};

use datalayer_path::{candidate_patterns, parse_path, Pattern};

use crate::dispatch::RegistryKind;
use crate::engine::DataLayer;
use crate::error::Error;
use crate::registry::{FirePayload, Handler, ListenerRecord};
use crate::tree;

/// Reserved payload key carrying an embedded tree patch. The patch is
/// merged into the tree (a full change round) before event listeners run.
pub const TREE_PATCH_KEY: &str = "dd";

/// An event as appended to the process-lifetime log. Immutable once
/// appended.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub name: String,
    /// Epoch milliseconds at trigger time.
    pub timestamp: i64,
    /// Caller payload fields, the reserved patch key included.
    pub payload: Map<String, Value>,
}

impl Event {
    pub fn patch(&self) -> Option<&Value> {
        self.payload.get(TREE_PATCH_KEY)
    }
}

/// Options for [`DataLayer::listen`].
#[derive(Debug, Clone)]
pub struct ListenOptions {
    /// Replay the event log for this registration (default true).
    pub historical: bool,
    /// Event names that must all have occurred (earlier in the log or as
    /// the current event) before the handler fires. When unset and
    /// several names are registered, defaults to those names, so the
    /// handler fires once all of them have been triggered.
    pub depends_on: Option<Vec<String>>,
    /// Debug label forwarded to error reports.
    pub id: Option<String>,
}

impl Default for ListenOptions {
    fn default() -> Self {
        ListenOptions {
            historical: true,
            depends_on: None,
            id: None,
        }
    }
}

/// Replay position over the event log: the names seen so far, including
/// the replay's current event. Gating `dependsOn` against this growing
/// set instead of the full log reproduces the temporal order in which
/// dependencies would actually have been satisfied.
#[derive(Debug, Default)]
struct ReplayCursor {
    seen: HashSet<String>,
}

impl ReplayCursor {
    fn advance(&mut self, name: &str) {
        self.seen.insert(name.to_string());
    }

    fn satisfied(&self, depends_on: &[String]) -> bool {
        depends_on.iter().all(|name| self.seen.contains(name))
    }
}

impl DataLayer {
    /// Fire `name` with an optional map payload. An embedded tree patch
    /// is merged first and its change round remembered, so a handler
    /// registered both as change listener and event listener fires once.
    /// The event is appended to the log only after dispatch; it is
    /// invisible to its own dependency checks and to `is_triggered`
    /// calls made by its handlers.
    pub fn trigger(&mut self, name: &str, payload: Option<Value>) -> Result<(), Error> {
        if name.is_empty() {
            return Err(Error::EmptyEventName);
        }
        let segments = parse_path(name)?;
        let payload = match payload {
            None => Map::new(),
            Some(Value::Object(map)) => map,
            Some(_) => return Err(Error::PayloadNotMap),
        };
        let event = Event {
            name: name.to_string(),
            timestamp: self.now_ms(),
            payload,
        };

        let mut guarded = HashSet::new();
        if let Some(patch) = event.patch().cloned() {
            if !patch.is_object() {
                return Err(Error::PatchNotMap);
            }
            let (_, invoked) = self.mutate(|root| tree::set_at(root, &[], patch))?;
            guarded = invoked;
        }

        let fire = FirePayload::Event(event.clone());
        let mut fired_patterns: HashSet<Pattern> = HashSet::new();
        let mut invoked = HashSet::new();
        for pattern in candidate_patterns(&segments) {
            if fired_patterns.contains(&pattern) {
                continue;
            }
            let records = self.event_listeners.live_records(&pattern);
            if records.is_empty() {
                continue;
            }
            fired_patterns.insert(pattern.clone());
            for record in records {
                if guarded.contains(&record.handler.key()) {
                    continue;
                }
                if !record.depends_on.is_empty() && !self.deps_satisfied(&record.depends_on, name) {
                    continue;
                }
                self.invoke(RegistryKind::Event, &pattern, record, &fire, &mut invoked);
            }
        }

        self.event_log.push(event);
        Ok(())
    }

    fn deps_satisfied(&self, depends_on: &[String], current: &str) -> bool {
        depends_on.iter().all(|name| name == current || self.is_triggered(name))
    }

    /// Whether an event with this name has ever been triggered, scanning
    /// the log most-recent-first.
    pub fn is_triggered(&self, name: &str) -> bool {
        self.event_log.iter().rev().any(|event| event.name == name)
    }

    /// Register `handler` for each name (every name is an independent
    /// pattern; all records share the same `dependsOn`). With historical
    /// replay enabled, the whole event log is replayed in original order
    /// for the new records. Registering the same handler twice for the
    /// same name is a no-op.
    pub fn listen(&mut self, names: &[&str], handler: Handler, options: ListenOptions) -> Result<(), Error> {
        let mut patterns = Vec::with_capacity(names.len());
        for name in names {
            if name.is_empty() {
                return Err(Error::EmptyEventName);
            }
            patterns.push(Pattern::parse(name)?);
        }
        let depends_on = match &options.depends_on {
            Some(deps) => deps.clone(),
            None if names.len() > 1 => names.iter().map(|n| n.to_string()).collect(),
            None => Vec::new(),
        };
        let mut registered = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            let record = ListenerRecord::new(handler.clone(), options.id.clone(), depends_on.clone());
            if self.event_listeners.subscribe(pattern.clone(), record) {
                registered.push(pattern);
            }
        }
        if options.historical {
            self.replay_log(&registered, &handler);
        }
        Ok(())
    }

    /// Remove the record registered for exactly this name and handler.
    /// Wildcard or sibling registrations of the same handler are left
    /// untouched.
    pub fn unlisten(&mut self, name: &str, handler: &Handler) -> Result<bool, Error> {
        let pattern = Pattern::parse(name)?;
        Ok(self.event_listeners.unsubscribe(&pattern, handler))
    }

    /// Replay the event log for freshly registered records. Replay is
    /// per-registration: it emits no live events, and a record's state is
    /// re-read per logged event so a completion signal during replay
    /// retires it for the rest of the replay too.
    fn replay_log(&mut self, patterns: &[Pattern], handler: &Handler) {
        let log = self.event_log.clone();
        let mut cursor = ReplayCursor::default();
        let mut scratch = HashSet::new();
        for event in log {
            cursor.advance(&event.name);
            let Ok(segments) = parse_path(&event.name) else {
                continue;
            };
            let fire = FirePayload::Event(event.clone());
            for pattern in patterns {
                if !pattern.matches(&segments) {
                    continue;
                }
                let Some(record) = self.event_listeners.find(pattern, handler.key()) else {
                    continue;
                };
                if record.fired_once {
                    continue;
                }
                if !record.depends_on.is_empty() && !cursor.satisfied(&record.depends_on) {
                    continue;
                }
                self.invoke(RegistryKind::Event, pattern, record, &fire, &mut scratch);
            }
        }
    }
}
