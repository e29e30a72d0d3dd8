use std::rc::Rc;

use datalayer_path::PathError;
use thiserror::Error;

/// Recursion limit for deep merge. Tree values cannot be cyclic, so this
/// only rejects pathologically nested input, and it does so loudly instead
/// of overflowing the stack.
pub const MAX_MERGE_DEPTH: usize = 128;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Path(#[from] PathError),
    #[error("value nesting exceeds the merge depth limit")]
    DepthExceeded,
    #[error("the tree root must be a map")]
    RootNotMap,
    #[error("{0} requires a non-empty path")]
    RootPath(&'static str),
    #[error("event name must be non-empty")]
    EmptyEventName,
    #[error("event payload must be a map")]
    PayloadNotMap,
    #[error("embedded tree patch must be a map")]
    PatchNotMap,
}

/// Diagnostic forwarded to the global error hook when a listener fails or
/// a persistence write cannot be serialized. `context` is a best-effort
/// serialization of the payload involved; a placeholder stands in when
/// even that fails.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub operation: String,
    pub pattern: Option<String>,
    pub listener_id: Option<String>,
    pub message: String,
    pub context: Option<String>,
}

/// Injectable global error hook. Without one, caught listener errors are
/// swallowed and the engine continues in its last successfully-applied
/// state; no internal error is fatal.
pub type ErrorHook = Rc<dyn Fn(&ErrorReport)>;
