use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("path contains an empty segment: {0:?}")]
    EmptySegment(String),
}

/// Split a dot-separated path into its key segments.
///
/// The empty string denotes the root and yields no segments. Literal dots
/// inside keys are not escapable; every dot is a separator, so a leading,
/// trailing, or doubled dot is a malformed path.
///
/// # Examples
///
/// ```
/// use datalayer_path::parse_path;
///
/// assert_eq!(parse_path("").unwrap(), Vec::<String>::new());
/// assert_eq!(parse_path("a.b").unwrap(), vec!["a", "b"]);
/// assert!(parse_path("a..b").is_err());
/// ```
pub fn parse_path(path: &str) -> Result<Vec<String>, PathError> {
    if path.is_empty() {
        return Ok(Vec::new());
    }
    let segments: Vec<String> = path.split('.').map(str::to_string).collect();
    if segments.iter().any(String::is_empty) {
        return Err(PathError::EmptySegment(path.to_string()));
    }
    Ok(segments)
}

/// Join key segments back into a dot-separated path.
pub fn join_path(segments: &[String]) -> String {
    segments.join(".")
}
