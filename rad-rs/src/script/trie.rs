//! JSON field capture.
//!
//! Declared fields (`name = json.items[].name`) are compiled into a trie of
//! path segments.  Walking the trie over a JSON document produces a
//! [`Capture`]: one column of values per field, every column the same
//! length.  Sibling captures are merged on the way back up: matching column
//! sets stack rows, disjoint column sets sit side by side, and a single-row
//! side is repeated to match the other.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use log::debug;
use serde_json::Value as Json;
use thiserror::Error;

use crate::error::RadError;

use super::ast::{path_to_string, PathSegment};
use super::env::Env;
use super::value::{resolve_index, Value};

/// Captured rows, column by column, in field order.
pub type Capture = IndexMap<String, Vec<Json>>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MergeError {
    #[error("cannot merge: incompatible row counts ({left} vs {right})")]
    IncompatibleRows { left: usize, right: usize },
    #[error("cannot merge: conflicting capture")]
    Conflict,
}

#[derive(Debug, Default)]
struct Node {
    /// Fields whose path ends here.
    fields: Vec<String>,
    children: BTreeMap<PathSegment, Node>,
}

#[derive(Debug, Default)]
pub struct Trie {
    root: Node,
}

impl Trie {
    pub fn new<'a>(fields: impl IntoIterator<Item = (&'a str, &'a [PathSegment])>) -> Self {
        let mut trie = Trie::default();
        for (name, path) in fields {
            trie.insert(name, path);
        }
        trie
    }

    pub fn insert(&mut self, name: &str, path: &[PathSegment]) {
        let mut node = &mut self.root;
        for seg in path {
            node = node.children.entry(seg.clone()).or_default();
        }
        node.fields.push(name.to_owned());
    }

    pub fn capture(&self, json: &Json) -> Result<Capture, RadError> {
        let mut path = Vec::new();
        traverse(&self.root, &mut path, None, json)
    }
}

fn traversal_error(path: &[PathSegment], reason: impl Into<String>) -> RadError {
    RadError::TrieTraversal { path: path_to_string(path), reason: reason.into() }
}

fn json_type(v: &Json) -> &'static str {
    match v {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "list",
        Json::Object(_) => "map",
    }
}

/// Capture everything under `node`.  `wild_key` is the map key that led
/// here when this node is a wildcard.
fn traverse(
    node: &Node,
    path: &mut Vec<PathSegment>,
    wild_key: Option<&str>,
    data: &Json,
) -> Result<Capture, RadError> {
    let mut capture = Capture::new();

    for (seg, child) in &node.children {
        path.push(seg.clone());
        let child_capture = match seg {
            PathSegment::Key(key) => {
                let obj = data
                    .as_object()
                    .ok_or_else(|| traversal_error(path, format!("expected a map, got {}", json_type(data))))?;
                let value = obj
                    .get(key)
                    .ok_or_else(|| traversal_error(path, format!("key '{key}' not found")))?;
                traverse(child, path, None, value)?
            }
            PathSegment::Wildcard => {
                let obj = data
                    .as_object()
                    .ok_or_else(|| traversal_error(path, format!("expected a map, got {}", json_type(data))))?;
                let mut keys: Vec<&String> = obj.keys().collect();
                keys.sort();
                let mut acc = Capture::new();
                for key in keys {
                    let c = traverse(child, path, Some(key), &obj[key.as_str()])?;
                    acc = merge(acc, c).map_err(|e| traversal_error(path, e.to_string()))?;
                }
                acc
            }
            PathSegment::AllElements => {
                let items = data
                    .as_array()
                    .ok_or_else(|| traversal_error(path, format!("expected a list, got {}", json_type(data))))?;
                let mut acc = Capture::new();
                for item in items {
                    let c = traverse(child, path, None, item)?;
                    acc = merge(acc, c).map_err(|e| traversal_error(path, e.to_string()))?;
                }
                acc
            }
            PathSegment::Index(idx) => {
                let items = data
                    .as_array()
                    .ok_or_else(|| traversal_error(path, format!("expected a list, got {}", json_type(data))))?;
                let i = resolve_index(*idx, items.len()).map_err(|e| traversal_error(path, e.to_string()))?;
                traverse(child, path, None, &items[i])?
            }
        };
        capture = merge(capture, child_capture).map_err(|e| traversal_error(path, e.to_string()))?;
        path.pop();
    }

    if !node.fields.is_empty() {
        let local: Capture = node
            .fields
            .iter()
            .map(|field| {
                let cell = match wild_key {
                    Some(key) => Json::String(key.to_owned()),
                    None => data.clone(),
                };
                (field.clone(), vec![cell])
            })
            .collect();
        capture = merge(capture, local).map_err(|e| traversal_error(path, e.to_string()))?;
    }

    Ok(capture)
}

fn row_count(c: &Capture) -> usize {
    c.values().next().map_or(0, Vec::len)
}

/// Combine two captures.
pub fn merge(mut a: Capture, mut b: Capture) -> Result<Capture, MergeError> {
    if a.is_empty() {
        return Ok(b);
    }
    if b.is_empty() {
        return Ok(a);
    }

    let shared = a.keys().filter(|k| b.contains_key(*k)).count();
    if shared == a.len() && shared == b.len() {
        for (col, rows) in a.iter_mut() {
            if let Some(more) = b.swap_remove(col) {
                rows.extend(more);
            }
        }
        return Ok(a);
    }
    if shared > 0 {
        return Err(MergeError::Conflict);
    }

    let (na, nb) = (row_count(&a), row_count(&b));
    if na == nb {
        a.extend(b);
        Ok(a)
    } else if na == 1 {
        broadcast(&mut a, nb);
        a.extend(b);
        Ok(a)
    } else if nb == 1 {
        broadcast(&mut b, na);
        a.extend(b);
        Ok(a)
    } else {
        Err(MergeError::IncompatibleRows { left: na, right: nb })
    }
}

fn broadcast(c: &mut Capture, rows: usize) {
    for col in c.values_mut() {
        let cell = col.first().cloned().unwrap_or(Json::Null);
        *col = vec![cell; rows];
    }
}

/// Capture the declared `fields` from `json` and write each one back to
/// `env` as a list (fields that captured nothing become empty lists).
pub fn bind_fields(fields: &[String], json: &Json, env: &Env) -> Result<(), RadError> {
    let mut paths = Vec::with_capacity(fields.len());
    for name in fields {
        let path = env.lookup_field(name).ok_or_else(|| RadError::UnknownIdentifier {
            name: name.clone(),
            suggestions: env.similar_names(name),
        })?;
        paths.push((name.as_str(), path));
    }
    let trie = Trie::new(paths.iter().map(|(n, p)| (*n, p.as_slice())));
    let mut capture = trie.capture(json)?;
    debug!("captured {} row(s) for {} field(s)", row_count(&capture), fields.len());

    for name in fields {
        let cells = capture.swap_remove(name).unwrap_or_default();
        let list = Value::list(cells.iter().map(Value::from_json).collect());
        env.assign(name, list, true);
    }
    Ok(())
}
