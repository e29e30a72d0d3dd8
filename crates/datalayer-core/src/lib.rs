//! datalayer-core - client-side reactive data layer
//!
//! A single shared hierarchical data tree plus an event bus, decoupling
//! data producers (page code) from consumers (analytics handlers) without
//! either side knowing the other's load order:
//!
//! - path-addressed tree store with deep-merge writes
//!   ([`DataLayer::set`], [`DataLayer::push`], [`DataLayer::erase`]),
//! - snapshot diffing and wildcard listener dispatch
//!   ([`DataLayer::change`], patterns like `user.*` and `user.**`),
//! - dependency-gated events with historical replay
//!   ([`DataLayer::trigger`], [`DataLayer::listen`]),
//! - TTL-based mirroring into host storage ([`DataLayer::persist`],
//!   [`DataLayer::restore_persisted`]).
//!
//! Everything is synchronous and single-threaded; listeners receive the
//! engine mutably and may re-enter it. A listener failure is reported to
//! the injectable error hook and never aborts dispatch.
//!
//! ```
//! use datalayer_core::{ChangeOptions, DataLayer, FirePayload, Handler};
//! use serde_json::json;
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let mut layer = DataLayer::new();
//! let hits = Rc::new(Cell::new(0));
//! let handler = Handler::new({
//!     let hits = hits.clone();
//!     move |_, payload| {
//!         if let FirePayload::Change { value, .. } = payload {
//!             assert_eq!(value["name"], json!("Ada"));
//!         }
//!         hits.set(hits.get() + 1);
//!         Ok(false)
//!     }
//! });
//! layer.change("user.*", handler, ChangeOptions::default()).unwrap();
//! layer.set("user.name", json!("Ada")).unwrap();
//! assert_eq!(hits.get(), 1);
//! ```

mod bootstrap;
mod diff;
mod dispatch;
mod engine;
mod error;
mod events;
mod persist;
mod registry;
mod tree;

pub use bootstrap::StartupBuffer;
pub use engine::{ChangeOptions, DataLayer};
pub use error::{Error, ErrorHook, ErrorReport, MAX_MERGE_DEPTH};
pub use events::{Event, ListenOptions, TREE_PATCH_KEY};
pub use persist::{MemoryStorage, SharedStorage, Storage, DEFAULT_TTL_MINUTES};
pub use registry::{FirePayload, Handler, HandlerError, HandlerResult};

pub use datalayer_path::{candidate_patterns, join_path, parse_path, PathError, Pattern, PatternKind};
pub use datalayer_util::{deep_clone, deep_equal, is_empty_value, is_scalar};

pub use serde_json::{Map, Value};
