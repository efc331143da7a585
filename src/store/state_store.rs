use serde_json::Map;
use serde_json::Value;
use tracing::trace;

use super::path::key_as_index;
use super::PathSegment;
use super::StorePath;
use super::MAX_INDEX;
use crate::constants::TEMPLATE_MARKER;
use crate::StoreError;

/// Hierarchical state tree.
///
/// Holds a single JSON object root. Reads hand out copies, writes store
/// copies, and writing a value deep-equal to the current one is a no-op.
/// Change notification is layered on top by [`crate::Atom::set`]; this type
/// only reports whether a write changed anything.
#[derive(Debug, Clone)]
pub struct StateStore {
    data: Value,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore {
    pub fn new() -> Self {
        Self {
            data: Value::Object(Map::new()),
        }
    }

    /// Copy of the value at `path`, `None` if the path is missing or malformed.
    pub fn get(
        &self,
        path: &str,
    ) -> Option<Value> {
        self.lookup(path).cloned()
    }

    /// Copy of the value at `path`, or `default` when missing.
    pub fn get_or(
        &self,
        path: &str,
        default: Value,
    ) -> Value {
        self.get(path).unwrap_or(default)
    }

    /// Borrow the value at `path` without copying. Used by validators which
    /// only inspect the current value.
    pub fn lookup(
        &self,
        path: &str,
    ) -> Option<&Value> {
        let parsed = StorePath::parse(path).ok()?;
        let mut current = &self.data;
        for segment in parsed.segments() {
            current = match (segment, current) {
                (PathSegment::Key(key), Value::Object(map)) => map.get(key)?,
                (PathSegment::Key(key), Value::Array(items)) => items.get(key_as_index(key)?)?,
                (PathSegment::Index(index), Value::Array(items)) => items.get(*index)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Write `value` at `path`, creating intermediate containers.
    ///
    /// Returns `Ok(false)` without touching the tree when the current value is
    /// deep-equal to `value`.
    pub fn set(
        &mut self,
        path: &str,
        value: Value,
    ) -> std::result::Result<bool, StoreError> {
        let parsed = StorePath::parse(path)?;

        if self.lookup(path) == Some(&value) {
            trace!(path, "[StateStore::set] unchanged value, skip");
            return Ok(false);
        }

        let slot = slot_mut(&mut self.data, &parsed)?;
        *slot = value;
        Ok(true)
    }

    /// Copies of the values at each of `paths`, `null` for missing ones.
    pub fn get_values<S: AsRef<str>>(
        &self,
        paths: &[S],
    ) -> Vec<Value> {
        paths
            .iter()
            .map(|p| self.get(p.as_ref()).unwrap_or(Value::Null))
            .collect()
    }

    /// Resolve a template: every string starting with `#` is replaced by the
    /// value at the path that follows the marker (`null` when missing).
    /// Everything else is copied through unchanged, recursively.
    pub fn populate(
        &self,
        template: &Value,
    ) -> Value {
        match template {
            Value::String(s) => match s.strip_prefix(TEMPLATE_MARKER) {
                Some(path) => self.get(path).unwrap_or(Value::Null),
                None => template.clone(),
            },
            Value::Array(items) => Value::Array(items.iter().map(|v| self.populate(v)).collect()),
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), self.populate(v)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    /// The whole tree. Mostly for diagnostics.
    pub fn snapshot(&self) -> Value {
        self.data.clone()
    }
}

/// Walk to the slot addressed by `path`, replacing anything in the way
/// that is not a container of the right kind. An all-digit key steps into an
/// existing array instead of replacing it.
fn slot_mut<'a>(
    root: &'a mut Value,
    path: &StorePath,
) -> std::result::Result<&'a mut Value, StoreError> {
    let mut current = root;
    for segment in path.segments() {
        current = match segment {
            PathSegment::Key(key) => match key_as_index(key) {
                Some(index) if current.is_array() => array_slot(current, index, path)?,
                _ => object_slot(current, key),
            },
            PathSegment::Index(index) => array_slot(current, *index, path)?,
        };
    }
    Ok(current)
}

fn object_slot<'a>(
    current: &'a mut Value,
    key: &str,
) -> &'a mut Value {
    if !current.is_object() {
        *current = Value::Object(Map::new());
    }
    match current {
        Value::Object(map) => map.entry(key.to_string()).or_insert(Value::Null),
        _ => unreachable!("slot was just replaced by an object"),
    }
}

fn array_slot<'a>(
    current: &'a mut Value,
    index: usize,
    path: &StorePath,
) -> std::result::Result<&'a mut Value, StoreError> {
    if index > MAX_INDEX {
        return Err(StoreError::InvalidPath {
            path: path.to_string(),
            reason: "index exceeds MAX_INDEX".to_string(),
        });
    }
    if !current.is_array() {
        *current = Value::Array(Vec::new());
    }
    match current {
        Value::Array(items) => {
            if items.len() <= index {
                items.resize(index + 1, Value::Null);
            }
            Ok(&mut items[index])
        }
        _ => unreachable!("slot was just replaced by an array"),
    }
}
