//! Stock predicates for watcher validators and `when` clauses.

use serde_json::Value;

pub fn is_string(value: &Value) -> bool {
    value.is_string()
}

pub fn is_number(value: &Value) -> bool {
    value.is_number()
}

pub fn is_bool(value: &Value) -> bool {
    value.is_boolean()
}

pub fn is_object(value: &Value) -> bool {
    value.is_object()
}

pub fn is_array(value: &Value) -> bool {
    value.is_array()
}

pub fn is_null(value: &Value) -> bool {
    value.is_null()
}

/// `null`, `""`, `[]` and `{}` are empty. Numbers and booleans are not
/// collections and count as empty as well.
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => true,
    }
}

pub fn is_not_empty(value: &Value) -> bool {
    !is_empty(value)
}

pub fn is_true(value: &Value) -> bool {
    value.as_bool() == Some(true)
}

/// Negate a predicate.
pub fn not<F>(predicate: F) -> impl Fn(&Value) -> bool + Send + Sync + 'static
where
    F: Fn(&Value) -> bool + Send + Sync + 'static,
{
    move |value| !predicate(value)
}
