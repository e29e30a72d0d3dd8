use serde_json::Value;

/// Check whether a value is "empty" in the data-layer sense.
///
/// Empty: `null`, an empty object, an empty array, or a string that is
/// blank after trimming whitespace. Numbers (including zero) and booleans
/// are never empty.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use datalayer_util::is_empty::is_empty_value;
///
/// assert!(is_empty_value(&json!(null)));
/// assert!(is_empty_value(&json!("   ")));
/// assert!(is_empty_value(&json!({})));
/// assert!(is_empty_value(&json!([])));
///
/// assert!(!is_empty_value(&json!(0)));
/// assert!(!is_empty_value(&json!(false)));
/// assert!(!is_empty_value(&json!("x")));
/// ```
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(_) | Value::Number(_) => false,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(arr) => arr.is_empty(),
        Value::Object(obj) => obj.is_empty(),
    }
}

/// Check whether a value is a scalar (not a list or a map).
pub fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}
