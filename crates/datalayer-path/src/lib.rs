//! datalayer-path - Dot-path and wildcard-pattern utilities
//!
//! A path is a dot-separated sequence of map keys (`"page.info.name"`);
//! the empty string addresses the root. A pattern is a path with an
//! optional trailing wildcard: `*` matches direct children of its base,
//! `**` matches the base itself and every descendant.

mod path;
mod pattern;

pub use path::{join_path, parse_path, PathError};
pub use pattern::{candidate_patterns, Pattern, PatternKind};
