//! Dotted-path traversal over session data.
//!
//! Paths like `"a.b.0.c"` address nested values. A segment that parses as an
//! integer indexes a sequence; any other segment keys a map. Setting a path
//! creates intermediate containers as needed and pads sequences with nulls.

use serde_json::{Map, Value};

pub(crate) fn get_path<'a>(root: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    match path.split_once('.') {
        None => root.get(path),
        Some((first, rest)) => get_in_value(root.get(first)?, rest),
    }
}

fn get_in_value<'a>(node: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = node;
    for segment in path.split('.') {
        current = match current {
            Value::Object(entries) => entries.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

pub(crate) fn set_path(root: &mut Map<String, Value>, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            root.insert(path.to_owned(), value);
        }
        Some((first, rest)) => {
            set_in_value(root.entry(first.to_owned()).or_insert(Value::Null), rest, value);
        }
    }
}

fn set_in_value(node: &mut Value, path: &str, value: Value) {
    let (first, rest) = match path.split_once('.') {
        None => (path, None),
        Some((first, rest)) => (first, Some(rest)),
    };

    match first.parse::<usize>() {
        Ok(index) => {
            if !node.is_array() {
                *node = Value::Array(Vec::new());
            }
            if let Value::Array(items) = node {
                if items.len() <= index {
                    items.resize(index + 1, Value::Null);
                }
                match rest {
                    None => items[index] = value,
                    Some(rest) => set_in_value(&mut items[index], rest, value),
                }
            }
        }
        Err(_) => {
            if !node.is_object() {
                *node = Value::Object(Map::new());
            }
            if let Value::Object(entries) = node {
                match rest {
                    None => {
                        entries.insert(first.to_owned(), value);
                    }
                    Some(rest) => set_in_value(
                        entries.entry(first.to_owned()).or_insert(Value::Null),
                        rest,
                        value,
                    ),
                }
            }
        }
    }
}

/// Removes the value at `path`. Removing a missing path is a no-op and
/// returns `None`.
pub(crate) fn unset_path(root: &mut Map<String, Value>, path: &str) -> Option<Value> {
    match path.split_once('.') {
        None => root.remove(path),
        Some((first, rest)) => unset_in_value(root.get_mut(first)?, rest),
    }
}

fn unset_in_value(node: &mut Value, path: &str) -> Option<Value> {
    match path.split_once('.') {
        None => match node {
            Value::Object(entries) => entries.remove(path),
            Value::Array(items) => {
                let index = path.parse::<usize>().ok()?;
                if index < items.len() {
                    Some(items.remove(index))
                } else {
                    None
                }
            }
            _ => None,
        },
        Some((first, rest)) => {
            let child = match node {
                Value::Object(entries) => entries.get_mut(first)?,
                Value::Array(items) => items.get_mut(first.parse::<usize>().ok()?)?,
                _ => return None,
            };
            unset_in_value(child, rest)
        }
    }
}
