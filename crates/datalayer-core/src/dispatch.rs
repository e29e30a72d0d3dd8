//! One dispatch round: diff the snapshot against the live tree, resolve
//! matching patterns per changed path, and invoke listeners under the
//! round's ordering and deduplication rules.

use std::collections::HashSet;

use serde_json::Value;

use datalayer_path::{candidate_patterns, join_path, parse_path, Pattern};

use crate::diff::diff_paths;
use crate::engine::DataLayer;
use crate::error::ErrorReport;
use crate::registry::{FirePayload, HandlerError, ListenerRecord, ListenerRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RegistryKind {
    Persist,
    Change,
    Event,
}

impl RegistryKind {
    fn operation(self) -> &'static str {
        match self {
            RegistryKind::Persist => "persist",
            RegistryKind::Change => "change",
            RegistryKind::Event => "event",
        }
    }
}

impl DataLayer {
    pub(crate) fn registry(&self, kind: RegistryKind) -> &ListenerRegistry {
        match kind {
            RegistryKind::Persist => &self.persist_listeners,
            RegistryKind::Change => &self.change_listeners,
            RegistryKind::Event => &self.event_listeners,
        }
    }

    pub(crate) fn registry_mut(&mut self, kind: RegistryKind) -> &mut ListenerRegistry {
        match kind {
            RegistryKind::Persist => &mut self.persist_listeners,
            RegistryKind::Change => &mut self.change_listeners,
            RegistryKind::Event => &mut self.event_listeners,
        }
    }

    /// Dispatch the mutation that just happened: persistence listeners
    /// first, then change listeners, deepest changed path first. Returns
    /// the identities of every handler invoked, so a trigger carrying a
    /// tree patch can avoid double-invoking shared handlers.
    ///
    /// The changed-path list is computed up front; a re-entrant mutation
    /// from inside a handler overwrites the snapshot, but this round's
    /// list stays valid for the rest of its own iteration.
    pub(crate) fn run_change_round(&mut self) -> HashSet<usize> {
        let mut changed = diff_paths(&self.snapshot, &self.tree);
        changed.reverse();
        let mut invoked = HashSet::new();
        self.dispatch_changed(RegistryKind::Persist, &changed, &mut invoked);
        self.dispatch_changed(RegistryKind::Change, &changed, &mut invoked);
        invoked
    }

    fn dispatch_changed(&mut self, kind: RegistryKind, changed: &[String], invoked: &mut HashSet<usize>) {
        // A pattern matched by several changed paths fires once per
        // round, against the deepest matching change (they are processed
        // first).
        let mut fired_patterns: HashSet<Pattern> = HashSet::new();
        for path in changed {
            let Ok(segments) = parse_path(path) else {
                continue; // diff emits well-formed paths
            };
            for pattern in candidate_patterns(&segments) {
                if fired_patterns.contains(&pattern) {
                    continue;
                }
                let records = self.registry(kind).live_records(&pattern);
                if records.is_empty() {
                    continue;
                }
                fired_patterns.insert(pattern.clone());
                let value = self.read_at(pattern.base()).unwrap_or(Value::Null);
                let payload = FirePayload::Change {
                    path: join_path(pattern.base()),
                    value,
                };
                for record in records {
                    self.invoke(kind, &pattern, record, &payload, invoked);
                }
            }
        }
    }

    /// Invoke one record, record its identity, retire it on a completion
    /// signal, and report (never propagate) a handler failure.
    pub(crate) fn invoke(
        &mut self,
        kind: RegistryKind,
        pattern: &Pattern,
        record: ListenerRecord,
        payload: &FirePayload,
        invoked: &mut HashSet<usize>,
    ) {
        invoked.insert(record.handler.key());
        match record.handler.call(self, payload) {
            Ok(true) => self.registry_mut(kind).mark_fired(pattern, record.handler.key()),
            Ok(false) => {}
            Err(err) => self.report_listener_error(
                kind.operation(),
                Some(pattern),
                record.id.as_deref(),
                payload,
                err,
            ),
        }
    }

    pub(crate) fn report_listener_error(
        &self,
        operation: &str,
        pattern: Option<&Pattern>,
        listener_id: Option<&str>,
        payload: &FirePayload,
        err: HandlerError,
    ) {
        let Some(hook) = &self.error_hook else {
            return;
        };
        let context = match payload {
            FirePayload::Change { value, .. } => serde_json::to_string(value),
            FirePayload::Event(event) => serde_json::to_string(&Value::Object(event.payload.clone())),
        }
        .unwrap_or_else(|_| "<unserializable>".to_string());
        hook(&ErrorReport {
            operation: operation.to_string(),
            pattern: pattern.map(Pattern::to_string),
            listener_id: listener_id.map(str::to_string),
            message: err.to_string(),
            context: Some(context),
        });
    }
}
