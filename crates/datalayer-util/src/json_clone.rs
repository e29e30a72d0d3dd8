use serde_json::{Map, Value};

/// Creates a deep clone of any JSON value.
///
/// This is a recursive clone that creates new instances of all nested
/// objects and arrays, so the result never aliases into the input.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use datalayer_util::json_clone::deep_clone;
///
/// let original = json!({"foo": [1, 2, 3]});
/// let cloned = deep_clone(&original);
///
/// assert_eq!(original, cloned);
/// ```
pub fn deep_clone(value: &Value) -> Value {
    match value {
        Value::Null => Value::Null,
        Value::Bool(b) => Value::Bool(*b),
        Value::Number(n) => Value::Number(n.clone()),
        Value::String(s) => Value::String(s.clone()),
        Value::Array(arr) => Value::Array(arr.iter().map(deep_clone).collect()),
        Value::Object(obj) => {
            let mut out = Map::new();
            for (key, val) in obj {
                out.insert(key.clone(), deep_clone(val));
            }
            Value::Object(out)
        }
    }
}
