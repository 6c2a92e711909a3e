use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// Event payload: a mapping of field name to JSON value, possibly nested.
pub type Data = Map<String, Value>;

/// One or more dot-path field names, e.g. "in" or ["in", "out.avg"].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldSpec {
    Single(String),
    List(Vec<String>),
}

impl FieldSpec {
    pub fn paths(&self) -> &[String] {
        match self {
            FieldSpec::Single(path) => std::slice::from_ref(path),
            FieldSpec::List(paths) => paths,
        }
    }
}

impl Default for FieldSpec {
    fn default() -> Self {
        FieldSpec::Single("value".to_string())
    }
}

impl From<&str> for FieldSpec {
    fn from(path: &str) -> Self {
        FieldSpec::Single(path.to_string())
    }
}

impl From<String> for FieldSpec {
    fn from(path: String) -> Self {
        FieldSpec::Single(path)
    }
}

impl From<Vec<&str>> for FieldSpec {
    fn from(paths: Vec<&str>) -> Self {
        FieldSpec::List(paths.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<String>> for FieldSpec {
    fn from(paths: Vec<String>) -> Self {
        FieldSpec::List(paths)
    }
}

impl<const N: usize> From<[&str; N]> for FieldSpec {
    fn from(paths: [&str; N]) -> Self {
        FieldSpec::List(paths.iter().map(|p| p.to_string()).collect())
    }
}

/// Turn any JSON value into event data. A bare scalar becomes {"value": scalar}.
pub fn into_data(value: Value) -> Data {
    match value {
        Value::Object(map) => map,
        other => {
            let mut data = Map::new();
            data.insert("value".to_string(), other);
            data
        }
    }
}

/// Walk a dot-path into nested mappings.
pub fn get_path<'a>(data: &'a Data, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = data.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Write a value at a dot-path, creating intermediate mappings.
pub fn set_path(data: &mut Data, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            data.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let child = data
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            if let Value::Object(map) = child {
                set_path(map, rest, value);
            }
        }
    }
}

/// Last segment of a dot-path ("a.b.c" -> "c").
pub fn terminal_segment(path: &str) -> &str {
    path.rsplit('.').next().unwrap_or(path)
}

/// Merge `other` into `target`; nested mappings merge, anything else is overwritten.
pub fn deep_merge(target: &mut Data, other: &Data) {
    for (key, value) in other {
        match (target.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                deep_merge(existing, incoming);
            }
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

pub fn as_number(value: &Value) -> Option<f64> {
    value.as_f64()
}

/// A value that is present, not null and not NaN.
pub fn is_valid(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| !f.is_nan()),
        Some(_) => true,
    }
}

/// JSON representation of a computed number: integral results are written as
/// integers, NaN and infinities as null.
pub fn number_value(value: f64) -> Value {
    if !value.is_finite() {
        return Value::Null;
    }
    if value.fract() == 0.0 && value >= i64::MIN as f64 && value <= i64::MAX as f64 {
        return Value::Number(Number::from(value as i64));
    }
    Number::from_f64(value).map_or(Value::Null, Value::Number)
}

/// Like `number_value`, but a result derived from a float input stays a
/// float, so `2.0 + 1` is written as `3.0`.
pub fn number_value_like(value: f64, input: &Value) -> Value {
    match input {
        Value::Number(n) if n.is_f64() => {
            Number::from_f64(value).map_or(Value::Null, Value::Number)
        }
        _ => number_value(value),
    }
}

/// Same as `number_value` but maps a missing result to null.
pub fn optional_number_value(value: Option<f64>) -> Value {
    value.map_or(Value::Null, number_value)
}
