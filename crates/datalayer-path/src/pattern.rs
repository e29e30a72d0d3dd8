use std::fmt;

use crate::path::{join_path, parse_path, PathError};

/// How a pattern's base relates to the paths it matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternKind {
    /// Matches exactly the base path.
    Exact,
    /// `base.*` - matches only direct children of the base.
    Children,
    /// `base.**` - matches the base itself and any descendant.
    Subtree,
}

/// A listener pattern: a base path plus a wildcard kind.
///
/// Patterns are a dedicated representation rather than raw strings, so a
/// literal map key named `*` never collides with the wildcard operator.
/// The bare patterns `*` and `**` have an empty base (the root).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pattern {
    base: Vec<String>,
    kind: PatternKind,
}

impl Pattern {
    pub fn exact(base: Vec<String>) -> Self {
        Pattern { base, kind: PatternKind::Exact }
    }

    pub fn children(base: Vec<String>) -> Self {
        Pattern { base, kind: PatternKind::Children }
    }

    pub fn subtree(base: Vec<String>) -> Self {
        Pattern { base, kind: PatternKind::Subtree }
    }

    /// Parse a pattern string. Only a trailing `*` or `**` segment is a
    /// wildcard; anything else is an exact path.
    ///
    /// # Examples
    ///
    /// ```
    /// use datalayer_path::Pattern;
    ///
    /// let p = Pattern::parse("user.*").unwrap();
    /// assert!(p.matches(&["user".into(), "name".into()]));
    /// assert!(!p.matches(&["user".into(), "address".into(), "zip".into()]));
    /// ```
    pub fn parse(pattern: &str) -> Result<Self, PathError> {
        if pattern == "**" {
            return Ok(Pattern::subtree(Vec::new()));
        }
        if pattern == "*" {
            return Ok(Pattern::children(Vec::new()));
        }
        if let Some(base) = pattern.strip_suffix(".**") {
            return Ok(Pattern::subtree(parse_path(base)?));
        }
        if let Some(base) = pattern.strip_suffix(".*") {
            return Ok(Pattern::children(parse_path(base)?));
        }
        Ok(Pattern::exact(parse_path(pattern)?))
    }

    /// The path segments the wildcard (if any) hangs off. This is the path
    /// whose value a matched listener is invoked with.
    pub fn base(&self) -> &[String] {
        &self.base
    }

    pub fn kind(&self) -> PatternKind {
        self.kind
    }

    /// Whether this pattern matches the given path.
    pub fn matches(&self, path: &[String]) -> bool {
        match self.kind {
            PatternKind::Exact => self.base == path,
            PatternKind::Children => {
                path.len() == self.base.len() + 1 && path.starts_with(&self.base)
            }
            PatternKind::Subtree => {
                path.len() >= self.base.len() && path.starts_with(&self.base)
            }
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base = join_path(&self.base);
        match self.kind {
            PatternKind::Exact => f.write_str(&base),
            PatternKind::Children if base.is_empty() => f.write_str("*"),
            PatternKind::Children => write!(f, "{base}.*"),
            PatternKind::Subtree if base.is_empty() => f.write_str("**"),
            PatternKind::Subtree => write!(f, "{base}.**"),
        }
    }
}

/// Enumerate every registered pattern that can match the given path,
/// most specific first: the exact path, the parent's `.*`, then `.**`
/// patterns from the path's own subtree form down to the bare `**`.
pub fn candidate_patterns(path: &[String]) -> Vec<Pattern> {
    let mut out = Vec::with_capacity(path.len() + 3);
    out.push(Pattern::exact(path.to_vec()));
    if !path.is_empty() {
        out.push(Pattern::children(path[..path.len() - 1].to_vec()));
    }
    for cut in (0..=path.len()).rev() {
        out.push(Pattern::subtree(path[..cut].to_vec()));
    }
    out
}
