//! JSON paths and the residual tree they address.
//!
//! A decode keeps a [`JsonPath`] stack that is pushed on the way into an
//! object key or array element and popped on the way out. Whenever input has
//! to be set aside, the current path says where it goes in the residual tree.

use serde_json::{Map, Value};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct JsonPath {
    segments: Vec<PathSegment>,
}

impl JsonPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_field(&mut self, name: &str) {
        self.segments.push(PathSegment::Field(name.to_string()));
    }

    pub fn push_index(&mut self, index: usize) {
        self.segments.push(PathSegment::Index(index));
    }

    pub fn pop(&mut self) -> Option<PathSegment> {
        self.segments.pop()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// RFC 6901 rendering, e.g. `/assets/0/title/len`.
    pub fn to_pointer(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            out.push('/');
            match segment {
                PathSegment::Field(name) => {
                    out.push_str(&name.replace('~', "~0").replace('/', "~1"))
                }
                PathSegment::Index(index) => out.push_str(&index.to_string()),
            }
        }
        out
    }
}

impl From<Vec<PathSegment>> for JsonPath {
    fn from(segments: Vec<PathSegment>) -> Self {
        JsonPath { segments }
    }
}

impl fmt::Display for JsonPath {
    /// Dotted form used in logs: `assets[0].title.len`, `$` for the root.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("$");
        }
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Field(name) if i == 0 => f.write_str(name)?,
                PathSegment::Field(name) => write!(f, ".{}", name)?,
                PathSegment::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}

/// Writes `value` at `path`, creating intermediate containers on demand.
///
/// Arrays indexed past their end are padded with `null`. A node of the wrong
/// kind on the way down is replaced by the container the path needs.
pub fn insert_at(tree: &mut Value, path: &[PathSegment], value: Value) {
    let mut node = tree;
    for segment in path {
        node = match segment {
            PathSegment::Field(name) => object_slot(node, name),
            PathSegment::Index(index) => array_slot(node, *index),
        };
    }
    *node = value;
}

fn object_slot<'a>(node: &'a mut Value, name: &str) -> &'a mut Value {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map.entry(name.to_string()).or_insert(Value::Null),
        _ => unreachable!("node was replaced by an object above"),
    }
}

fn array_slot(node: &mut Value, index: usize) -> &mut Value {
    if !node.is_array() {
        *node = Value::Array(Vec::new());
    }
    match node {
        Value::Array(items) => {
            if items.len() <= index {
                items.resize(index + 1, Value::Null);
            }
            &mut items[index]
        }
        _ => unreachable!("node was replaced by an array above"),
    }
}

/// Reads the node at `path`, if every segment resolves.
pub fn lookup<'a>(tree: &'a Value, path: &[PathSegment]) -> Option<&'a Value> {
    path.iter().try_fold(tree, |node, segment| match segment {
        PathSegment::Field(name) => node.get(name.as_str()),
        PathSegment::Index(index) => node.get(*index),
    })
}

/// Deep-merges one residual tree into another, position for position.
///
/// Object keys merge recursively; `null` array entries are padding left by
/// [`insert_at`] and are skipped.
pub fn merge_into(target: &mut Value, residual: &Value) {
    match (target, residual) {
        (Value::Object(dst), Value::Object(src)) => {
            for (key, value) in src {
                match dst.get_mut(key) {
                    Some(slot) => merge_into(slot, value),
                    None => {
                        dst.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (Value::Array(dst), Value::Array(src)) => {
            for (index, value) in src.iter().enumerate() {
                if value.is_null() {
                    continue;
                }
                if index < dst.len() {
                    merge_into(&mut dst[index], value);
                } else {
                    dst.resize(index, Value::Null);
                    dst.push(value.clone());
                }
            }
        }
        (slot, value) => *slot = value.clone(),
    }
}

/// Puts residual content back into an encoded document at its input positions.
///
/// Unlike [`merge_into`], arrays are rebuilt rather than overlaid: list
/// elements that failed to decode are absent from the encoded array, so every
/// later element sits one slot lower than in the input. Each residual entry
/// is either a fragment of the typed element at that input position (an
/// object next to an object) or a whole element that was dropped; dropped
/// elements are re-inserted and the typed elements fill the remaining slots
/// in order. `null` entries are padding and stand for the next typed element.
pub fn restore_into(target: &mut Value, residual: &Value) {
    match (target, residual) {
        (Value::Object(dst), Value::Object(src)) => {
            for (key, value) in src {
                match dst.get_mut(key) {
                    Some(slot) => restore_into(slot, value),
                    None => {
                        dst.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (Value::Array(dst), Value::Array(src)) => {
            let mut typed = std::mem::take(dst).into_iter().peekable();
            for value in src {
                if value.is_null() {
                    dst.extend(typed.next());
                    continue;
                }
                let fragment = value.is_object() && typed.peek().is_some_and(Value::is_object);
                if fragment {
                    if let Some(mut item) = typed.next() {
                        restore_into(&mut item, value);
                        dst.push(item);
                    }
                } else {
                    dst.push(value.clone());
                }
            }
            dst.extend(typed);
        }
        (slot, value) => *slot = value.clone(),
    }
}
