//! Merge tree
//!
//! The accumulator the merge engine folds releases into. Every JSON value
//! falls into one of three shapes, and the tree keeps them apart:
//!
//! - `Node::Object`: a JSON object, merged key by key.
//! - `Node::Items`: an array of objects that all carry an `id`, merged item by
//!   item on that `id`.
//! - `Node::Leaf`: anything else (scalars, `null`, empty arrays and arrays
//!   without a uniform `id`). Replaced wholesale; optionally keeps a history.
//!
//! When a release brings a value whose shape differs from the node's shape,
//! the node is rebuilt from the new value. With history enabled, the whole
//! values the path held before the rebuild are carried into the new node, so
//! a leaf's history spans every shape its path went through.

use std::collections::{BTreeMap, HashMap};

use serde_json::{json, Map, Value};

/// Provenance of the release currently being merged.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Source<'a> {
    /// Position of the release in merge order
    pub seq: usize,
    pub id: &'a Value,
    pub date: &'a Value,
    pub tag: &'a Value,
    /// Record history entries on leaves
    pub history: bool,
}

/// The release a history entry came from.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Stamp {
    seq: usize,
    pub release_id: Value,
    pub release_date: Value,
    pub release_tag: Value,
}

impl Stamp {
    fn new(source: &Source<'_>) -> Self {
        Self {
            seq: source.seq,
            release_id: source.id.clone(),
            release_date: source.date.clone(),
            release_tag: source.tag.clone(),
        }
    }
}

/// One entry of a path's history.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Version {
    pub stamp: Stamp,
    pub value: Value,
}

impl Version {
    fn new(value: Value, source: &Source<'_>) -> Self {
        Self {
            stamp: Stamp::new(source),
            value,
        }
    }

    fn to_value(&self) -> Value {
        json!({
            "releaseID": self.stamp.release_id,
            "releaseDate": self.stamp.release_date,
            "releaseTag": self.stamp.release_tag,
            "value": self.value,
        })
    }
}

/// Append `version` to `history`. A release that touches a path more than
/// once (duplicate item ids) keeps one entry with its final value, and a value
/// equal to the previous entry is not repeated.
fn record(history: &mut Vec<Version>, version: Version) {
    if history
        .last()
        .is_some_and(|last| last.stamp.seq == version.stamp.seq)
    {
        history.pop();
    }
    if history.last().map_or(true, |last| last.value != version.value) {
        history.push(version);
    }
}

/// Insertion-ordered map with hashed lookup.
#[derive(Debug, Clone)]
pub(crate) struct OrderedMap<V> {
    entries: Vec<(String, V)>,
    index: HashMap<String, usize>,
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<V> OrderedMap<V> {
    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        let position = *self.index.get(key)?;
        Some(&mut self.entries[position].1)
    }

    /// Append `key`. The caller guarantees `key` is not present.
    pub fn push(&mut self, key: String, value: V) {
        self.index.insert(key.clone(), self.entries.len());
        self.entries.push((key, value));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, value)| value)
    }
}

/// A leaf value and the history of values its path took.
#[derive(Debug, Clone)]
pub(crate) struct Leaf {
    value: Value,
    history: Vec<Version>,
}

impl Leaf {
    /// `history` holds the values the path took before it became a leaf.
    fn new(value: &Value, source: &Source<'_>, mut history: Vec<Version>) -> Self {
        if source.history {
            record(&mut history, Version::new(value.clone(), source));
        }
        Self {
            value: value.clone(),
            history,
        }
    }

    fn update(&mut self, value: &Value, source: &Source<'_>) {
        if self.value == *value {
            return;
        }
        self.value = value.clone();
        if source.history {
            record(&mut self.history, Version::new(value.clone(), source));
        }
    }

    fn value_at(&self, seq: usize) -> Option<Value> {
        self.history
            .iter()
            .rev()
            .find(|version| version.stamp.seq <= seq)
            .map(|version| version.value.clone())
    }
}

/// An object or an identified array.
#[derive(Debug, Clone)]
pub(crate) struct Branch {
    children: OrderedMap<Node>,
    /// Release that created the branch. Only kept with history.
    origin: Option<Stamp>,
    /// Values the path took before it became this branch
    past: Vec<Version>,
}

impl Branch {
    fn new(source: &Source<'_>, past: Vec<Version>) -> Self {
        Self {
            children: OrderedMap::default(),
            origin: source.history.then(|| Stamp::new(source)),
            past,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Node {
    Object(Branch),
    Items(Branch),
    Leaf(Leaf),
}

/// Returns the array if it is non-empty and every item is an object with an
/// `id` field.
fn identified(value: &Value) -> Option<&Vec<Value>> {
    match value {
        Value::Array(items)
            if !items.is_empty()
                && items
                    .iter()
                    .all(|item| item.as_object().is_some_and(|o| o.contains_key("id"))) =>
        {
            Some(items)
        }
        _ => None,
    }
}

/// Key an identified item by the JSON text of its `id`, so `"1"` and `1`
/// stay distinct.
fn item_key(item: &Value) -> String {
    item.get("id").map(Value::to_string).unwrap_or_default()
}

impl Node {
    pub fn from_value(value: &Value, source: &Source<'_>) -> Node {
        Node::build(value, source, Vec::new())
    }

    fn build(value: &Value, source: &Source<'_>, past: Vec<Version>) -> Node {
        let mut node = match value {
            Value::Object(_) => Node::Object(Branch::new(source, past)),
            _ if identified(value).is_some() => Node::Items(Branch::new(source, past)),
            _ => return Node::Leaf(Leaf::new(value, source, past)),
        };
        node.merge(value, source);
        node
    }

    pub fn merge(&mut self, value: &Value, source: &Source<'_>) {
        match (self, value) {
            (Node::Object(branch), Value::Object(map)) => {
                merge_fields(&mut branch.children, map, source, &[])
            }
            (Node::Items(branch), _) if identified(value).is_some() => {
                for item in identified(value).into_iter().flatten() {
                    let key = item_key(item);
                    match branch.children.get_mut(&key) {
                        Some(node) => node.merge(item, source),
                        None => branch.children.push(key, Node::from_value(item, source)),
                    }
                }
            }
            (Node::Leaf(leaf), _) if !value.is_object() && identified(value).is_none() => {
                leaf.update(value, source)
            }
            (node, _) => {
                let past = if source.history {
                    node.path_history()
                } else {
                    Vec::new()
                };
                *node = Node::build(value, source, past);
            }
        }
    }

    pub fn to_compiled(&self) -> Value {
        match self {
            Node::Object(branch) => Value::Object(compiled_fields(&branch.children)),
            Node::Items(branch) => {
                Value::Array(branch.children.values().map(Node::to_compiled).collect())
            }
            Node::Leaf(leaf) => leaf.value.clone(),
        }
    }

    /// Render the versioned value. A branch renders its children only; the
    /// values its path held before it became a branch reappear if the path
    /// turns back into a leaf.
    pub fn to_versioned(&self) -> Value {
        match self {
            Node::Object(branch) => Value::Object(versioned_fields(&branch.children, false)),
            Node::Items(branch) => Value::Array(
                branch
                    .children
                    .values()
                    .map(|item| match item {
                        Node::Object(fields) => {
                            Value::Object(versioned_fields(&fields.children, true))
                        }
                        other => other.to_versioned(),
                    })
                    .collect(),
            ),
            Node::Leaf(leaf) => Value::Array(leaf.history.iter().map(Version::to_value).collect()),
        }
    }

    /// Every whole value this path took, in merge order.
    fn path_history(&self) -> Vec<Version> {
        let branch = match self {
            Node::Leaf(leaf) => return leaf.history.clone(),
            Node::Object(branch) | Node::Items(branch) => branch,
        };
        let mut history = branch.past.clone();
        let Some(origin) = &branch.origin else {
            return history;
        };

        let mut stamps = BTreeMap::new();
        self.collect_stamps(&mut stamps);
        for stamp in stamps.into_values().filter(|stamp| stamp.seq >= origin.seq) {
            let Some(value) = self.value_at(stamp.seq) else {
                continue;
            };
            record(&mut history, Version { stamp, value });
        }
        history
    }

    fn collect_stamps(&self, stamps: &mut BTreeMap<usize, Stamp>) {
        let mut add = |stamp: &Stamp| {
            stamps.entry(stamp.seq).or_insert_with(|| stamp.clone());
        };
        match self {
            Node::Leaf(leaf) => leaf.history.iter().for_each(|version| add(&version.stamp)),
            Node::Object(branch) | Node::Items(branch) => {
                branch.past.iter().for_each(|version| add(&version.stamp));
                if let Some(origin) = &branch.origin {
                    add(origin);
                }
                for child in branch.children.values() {
                    child.collect_stamps(stamps);
                }
            }
        }
    }

    /// The whole value of this path right after release `seq` was merged,
    /// or `None` if the path did not exist yet.
    fn value_at(&self, seq: usize) -> Option<Value> {
        let branch = match self {
            Node::Leaf(leaf) => return leaf.value_at(seq),
            Node::Object(branch) | Node::Items(branch) => branch,
        };
        if !branch.origin.as_ref().is_some_and(|origin| origin.seq <= seq) {
            return branch
                .past
                .iter()
                .rev()
                .find(|version| version.stamp.seq <= seq)
                .map(|version| version.value.clone());
        }
        let children = branch
            .children
            .iter()
            .filter_map(|(key, child)| child.value_at(seq).map(|value| (key, value)));
        Some(match self {
            Node::Items(_) => Value::Array(children.map(|(_, value)| value).collect()),
            _ => Value::Object(
                children
                    .map(|(key, value)| (key.to_string(), value))
                    .collect(),
            ),
        })
    }

    #[cfg(test)]
    pub fn history(&self) -> Option<&[Version]> {
        match self {
            Node::Leaf(leaf) => Some(&leaf.history),
            _ => None,
        }
    }
}

/// Merge `map` into `fields`, skipping any key listed in `skip`.
pub(crate) fn merge_fields(
    fields: &mut OrderedMap<Node>,
    map: &Map<String, Value>,
    source: &Source<'_>,
    skip: &[&str],
) {
    for (key, value) in map {
        if skip.contains(&key.as_str()) {
            continue;
        }
        match fields.get_mut(key) {
            Some(node) => node.merge(value, source),
            None => fields.push(key.clone(), Node::from_value(value, source)),
        }
    }
}

pub(crate) fn compiled_fields(fields: &OrderedMap<Node>) -> Map<String, Value> {
    fields
        .iter()
        .map(|(key, node)| (key.to_string(), node.to_compiled()))
        .collect()
}

/// Render fields as versioned values. Inside an identified item, the `id`
/// names the item and is rendered as a plain value.
pub(crate) fn versioned_fields(fields: &OrderedMap<Node>, item: bool) -> Map<String, Value> {
    fields
        .iter()
        .map(|(key, node)| {
            let value = match node {
                Node::Leaf(leaf) if item && key == "id" => leaf.value.clone(),
                _ => node.to_versioned(),
            };
            (key.to_string(), value)
        })
        .collect()
}
