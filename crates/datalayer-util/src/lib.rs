//! datalayer-util - Value-model utilities for datalayer
//!
//! Small helpers over `serde_json::Value` shared by the engine and exposed
//! for caller convenience: deep cloning, structural equality, and the
//! emptiness predicate used by `DataLayer::empty`.

pub mod is_empty;
pub mod json_clone;
pub mod json_equal;

// Re-exports for convenience
pub use is_empty::{is_empty_value, is_scalar};
pub use json_clone::deep_clone;
pub use json_equal::deep_equal;
