//! The polymorphic configuration tree: the intermediate representation
//! produced by format scanners and consumed by the pipeline.
//!
//! Implemented as an arena of [`Node`]s (per spec.md §9's Design Notes
//! recommendation: "arena + indices, never owning cyclic pointers"),
//! mirroring `grill-core::schema::Schemas`'s `SlotMap`-backed `Store`. A
//! [`Tree`] owns the arena and its root; individual nodes are addressed by
//! [`NodeId`] and read through the borrowing [`NodeRef`] facade.

use indexmap::IndexMap;
use slotmap::{new_key_type, SlotMap};
use snafu::Snafu;

use crate::path::{Item, Path};

new_key_type! {
    /// Arena key for a node within a [`Tree`].
    pub struct NodeId;
}

/// A scalar primitive carried by a leaf node.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

/// The tag of a node's value, independent of its content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Type {
    Undefined,
    Boolean,
    Integer,
    Float,
    String,
    Array,
    Object,
}

#[derive(Debug, Clone)]
enum Data {
    Undefined,
    Scalar(Scalar),
    Array(Vec<NodeId>),
    Object(IndexMap<String, NodeId>),
}

#[derive(Debug, Clone)]
struct Node {
    name: String,
    parent: Option<NodeId>,
    data: Data,
}

/// A polymorphic value tree.
///
/// Invariants (spec.md §3.1): an `Array`'s children are named by their
/// string-form index and renumbered on erase; an `Object`'s children names
/// are unique; `parent(root) == None`; for any non-root node,
/// `parent(v).get(name(v)) == v`.
#[derive(Debug, Clone)]
pub struct Tree {
    arena: SlotMap<NodeId, Node>,
    root: NodeId,
}

/// Errors from tree mutation.
#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum TreeError {
    /// `put`/`erase` addressed a path item that is not `Named`, or
    /// addressed a non-`Object` container.
    #[snafu(display("unsupported path item for mutation: {path}"))]
    UnsupportedPathItem { path: String },
    /// The write path was empty (no key to assign).
    #[snafu(display("empty write path"))]
    EmptyPath,
}

impl Tree {
    /// A new tree whose root is an empty `Object`.
    #[must_use]
    pub fn new_object() -> Self {
        let mut arena = SlotMap::with_key();
        let root = arena.insert(Node {
            name: String::new(),
            parent: None,
            data: Data::Object(IndexMap::new()),
        });
        Self { arena, root }
    }

    /// A new tree whose root is an empty `Array`.
    #[must_use]
    pub fn new_array() -> Self {
        let mut arena = SlotMap::with_key();
        let root = arena.insert(Node {
            name: String::new(),
            parent: None,
            data: Data::Array(Vec::new()),
        });
        Self { arena, root }
    }

    /// A new tree whose root is a scalar value.
    #[must_use]
    pub fn scalar(value: Scalar) -> Self {
        let mut arena = SlotMap::with_key();
        let root = arena.insert(Node {
            name: String::new(),
            parent: None,
            data: Data::Scalar(value),
        });
        Self { arena, root }
    }

    /// The key of the root node.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Builds a [`Tree`] from a `serde_json::Value`. Stands in for a format
    /// scanner (spec.md §6's external collaborator) in tests and examples;
    /// production callers are expected to supply a real `Scanner` instead.
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Self {
        let mut arena = SlotMap::with_key();
        let root = Self::insert_json(&mut arena, None, String::new(), value);
        Self { arena, root }
    }

    fn insert_json(
        arena: &mut SlotMap<NodeId, Node>,
        parent: Option<NodeId>,
        name: String,
        value: &serde_json::Value,
    ) -> NodeId {
        let data = match value {
            serde_json::Value::Null => Data::Undefined,
            serde_json::Value::Bool(b) => Data::Scalar(Scalar::Boolean(*b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Data::Scalar(Scalar::Integer(i))
                } else {
                    Data::Scalar(Scalar::Float(n.as_f64().unwrap_or_default()))
                }
            }
            serde_json::Value::String(s) => Data::Scalar(Scalar::String(s.clone())),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => Data::Undefined,
        };
        let id = arena.insert(Node {
            name,
            parent,
            data,
        });
        match value {
            serde_json::Value::Array(items) => {
                let mut ids = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    ids.push(Self::insert_json(arena, Some(id), i.to_string(), item));
                }
                arena[id].data = Data::Array(ids);
            }
            serde_json::Value::Object(map) => {
                let mut entries = IndexMap::with_capacity(map.len());
                for (k, v) in map {
                    let child = Self::insert_json(arena, Some(id), k.clone(), v);
                    entries.insert(k.clone(), child);
                }
                arena[id].data = Data::Object(entries);
            }
            _ => {}
        }
        id
    }

    /// Renders the tree at `id` back to a `serde_json::Value`, for tests
    /// and debugging.
    #[must_use]
    pub fn to_json(&self, id: NodeId) -> serde_json::Value {
        match &self.arena[id].data {
            Data::Undefined => serde_json::Value::Null,
            Data::Scalar(Scalar::Boolean(b)) => serde_json::Value::Bool(*b),
            Data::Scalar(Scalar::Integer(i)) => serde_json::Value::Number((*i).into()),
            Data::Scalar(Scalar::Float(v)) => serde_json::Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Data::Scalar(Scalar::String(s)) => serde_json::Value::String(s.clone()),
            Data::Array(items) => {
                serde_json::Value::Array(items.iter().map(|&id| self.to_json(id)).collect())
            }
            Data::Object(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, &id)| (k.clone(), self.to_json(id)))
                    .collect(),
            ),
        }
    }

    /// The key under which `id` lives in its parent (`""` for the root).
    #[must_use]
    pub fn name(&self, id: NodeId) -> &str {
        &self.arena[id].name
    }

    /// `id`'s container, or `None` for the root.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].parent
    }

    /// The tag of `id`'s value.
    #[must_use]
    pub fn kind(&self, id: NodeId) -> Type {
        match &self.arena[id].data {
            Data::Undefined => Type::Undefined,
            Data::Scalar(Scalar::Boolean(_)) => Type::Boolean,
            Data::Scalar(Scalar::Integer(_)) => Type::Integer,
            Data::Scalar(Scalar::Float(_)) => Type::Float,
            Data::Scalar(Scalar::String(_)) => Type::String,
            Data::Array(_) => Type::Array,
            Data::Object(_) => Type::Object,
        }
    }

    #[must_use]
    pub fn as_bool(&self, id: NodeId) -> Option<bool> {
        match &self.arena[id].data {
            Data::Scalar(Scalar::Boolean(b)) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self, id: NodeId) -> Option<i64> {
        match &self.arena[id].data {
            Data::Scalar(Scalar::Integer(i)) => Some(*i),
            _ => None,
        }
    }

    /// Reads `id` as a float. Per SPEC_FULL.md §3.1.1, reading a `Float`
    /// accessor against a stored `Integer` is an explicit, fallible
    /// widening rather than the original's silent upcast: `None` is
    /// returned (rather than a lossy truncation) when the stored `i64`
    /// cannot be represented exactly as an `f64`.
    #[must_use]
    pub fn as_f64(&self, id: NodeId) -> Option<f64> {
        match &self.arena[id].data {
            Data::Scalar(Scalar::Float(f)) => Some(*f),
            Data::Scalar(Scalar::Integer(i)) => {
                let widened = *i as f64;
                (widened as i64 == *i).then_some(widened)
            }
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self, id: NodeId) -> Option<&str> {
        match &self.arena[id].data {
            Data::Scalar(Scalar::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Number of immediate children (0 for scalars/undefined).
    #[must_use]
    pub fn len(&self, id: NodeId) -> usize {
        match &self.arena[id].data {
            Data::Array(items) => items.len(),
            Data::Object(map) => map.len(),
            _ => 0,
        }
    }

    #[must_use]
    pub fn is_empty(&self, id: NodeId) -> bool {
        self.len(id) == 0
    }

    /// Iterates immediate children; a scalar or undefined value invokes the
    /// callback once, with itself (spec.md §4.2).
    pub fn each(&self, id: NodeId, mut f: impl FnMut(NodeId)) {
        match &self.arena[id].data {
            Data::Array(items) => items.iter().for_each(|&c| f(c)),
            Data::Object(map) => map.values().for_each(|&c| f(c)),
            Data::Undefined | Data::Scalar(_) => f(id),
        }
    }

    fn each_ids(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.each(id, |c| out.push(c));
        out
    }

    /// Path-based lookup relative to `from`. A non-generative path returns
    /// at most one result; a generative path may return any number. A
    /// `Global`-rooted path forwards to the tree's root regardless of
    /// `from`.
    #[must_use]
    pub fn get(&self, from: NodeId, path: &Path) -> Vec<NodeId> {
        let mut frontier = vec![from];
        for seg in path.segments() {
            let mut next = Vec::new();
            for &cur in &frontier {
                match &seg.item {
                    Item::Global => next.push(self.root),
                    Item::Local => next.push(cur),
                    Item::Named(names) => {
                        if seg.recursive {
                            self.collect_recursive(cur, &mut next, &|data, out| {
                                if let Data::Object(map) = data {
                                    for n in names {
                                        if let Some(&id) = map.get(n) {
                                            out.push(id);
                                        }
                                    }
                                }
                            });
                        } else if let Data::Object(map) = &self.arena[cur].data {
                            for n in names {
                                if let Some(&id) = map.get(n) {
                                    next.push(id);
                                }
                            }
                        }
                    }
                    Item::Indexed(idxs) => {
                        if seg.recursive {
                            self.collect_recursive(cur, &mut next, &|data, out| {
                                if let Data::Array(items) = data {
                                    for &i in idxs {
                                        if let Some(&id) = items.get(i) {
                                            out.push(id);
                                        }
                                    }
                                }
                            });
                        } else if let Data::Array(items) = &self.arena[cur].data {
                            for &i in idxs {
                                if let Some(&id) = items.get(i) {
                                    next.push(id);
                                }
                            }
                        }
                    }
                    Item::Ranged { lo, hi, step } => {
                        if let Data::Array(items) = &self.arena[cur].data {
                            let lo = lo.unwrap_or(0);
                            let hi = hi.unwrap_or(items.len()).min(items.len());
                            let step = step.unwrap_or(1).max(1);
                            let mut i = lo;
                            while i < hi {
                                next.push(items[i]);
                                i += step;
                            }
                        }
                    }
                    Item::Any => {
                        if seg.recursive {
                            self.collect_recursive_any(cur, &mut next);
                        } else {
                            next.extend(self.each_ids(cur));
                        }
                    }
                }
            }
            frontier = next;
            if frontier.is_empty() {
                break;
            }
        }
        frontier
    }

    fn collect_recursive(
        &self,
        id: NodeId,
        out: &mut Vec<NodeId>,
        matcher: &dyn Fn(&Data, &mut Vec<NodeId>),
    ) {
        matcher(&self.arena[id].data, out);
        for child in self.each_ids(id) {
            if child != id {
                self.collect_recursive(child, out, matcher);
            }
        }
    }

    fn collect_recursive_any(&self, id: NodeId, out: &mut Vec<NodeId>) {
        for child in self.each_ids(id) {
            if child == id {
                continue;
            }
            out.push(child);
            self.collect_recursive_any(child, out);
        }
    }

    /// `true` iff `get(from, path)` is non-empty.
    #[must_use]
    pub fn has(&self, from: NodeId, path: &Path) -> bool {
        !self.get(from, path).is_empty()
    }

    /// Assigns `value` at `path`, relative to `from`. Only `Named` items are
    /// supported on the write path (fails with [`TreeError::UnsupportedPathItem`]
    /// otherwise); intermediate `Object`s are created as needed. If the
    /// target key already holds a scalar, it is promoted to an `Array`
    /// holding both the old and new values.
    pub fn put(&mut self, from: NodeId, path: &Path, value: Scalar) -> Result<(), TreeError> {
        let segs = path.segments();
        let mut i = 0;
        let mut cur = from;
        if let Some(seg) = segs.first() {
            match seg.item {
                Item::Global => {
                    cur = self.root;
                    i = 1;
                }
                Item::Local => {
                    i = 1;
                }
                _ => {}
            }
        }
        if i >= segs.len() {
            return Err(TreeError::EmptyPath);
        }
        for seg in &segs[i..segs.len() - 1] {
            let name = single_name(seg, path)?;
            cur = self.ensure_child_object(cur, name)?;
        }
        let last = single_name(&segs[segs.len() - 1], path)?;
        self.assign(cur, last, value, path)
    }

    fn ensure_child_object(&mut self, parent: NodeId, name: &str) -> Result<NodeId, TreeError> {
        let existing = match &self.arena[parent].data {
            Data::Object(map) => map.get(name).copied(),
            _ => {
                return Err(TreeError::UnsupportedPathItem {
                    path: name.to_string(),
                })
            }
        };
        if let Some(id) = existing {
            if matches!(self.arena[id].data, Data::Object(_)) {
                return Ok(id);
            }
            return Err(TreeError::UnsupportedPathItem {
                path: name.to_string(),
            });
        }
        let child = self.arena.insert(Node {
            name: name.to_string(),
            parent: Some(parent),
            data: Data::Object(IndexMap::new()),
        });
        if let Data::Object(map) = &mut self.arena[parent].data {
            map.insert(name.to_string(), child);
        }
        Ok(child)
    }

    fn assign(
        &mut self,
        parent: NodeId,
        key: &str,
        value: Scalar,
        path: &Path,
    ) -> Result<(), TreeError> {
        if !matches!(self.arena[parent].data, Data::Object(_)) {
            return Err(TreeError::UnsupportedPathItem {
                path: path.to_string(),
            });
        }
        let existing = match &self.arena[parent].data {
            Data::Object(map) => map.get(key).copied(),
            _ => unreachable!(),
        };
        match existing {
            None => {
                let id = self.arena.insert(Node {
                    name: key.to_string(),
                    parent: Some(parent),
                    data: Data::Scalar(value),
                });
                if let Data::Object(map) = &mut self.arena[parent].data {
                    map.insert(key.to_string(), id);
                }
                Ok(())
            }
            Some(id) if matches!(self.arena[id].data, Data::Array(_)) => {
                let new_node = self.arena.insert(Node {
                    name: String::new(),
                    parent: Some(id),
                    data: Data::Scalar(value),
                });
                if let Data::Array(items) = &mut self.arena[id].data {
                    items.push(new_node);
                    let idx = items.len() - 1;
                    self.arena[new_node].name = idx.to_string();
                }
                Ok(())
            }
            Some(id) => {
                // scalar or undefined: promote the key to an Array holding
                // both the old and new values.
                let old_data = self.arena[id].data.clone_scalarish();
                let array_id = self.arena.insert(Node {
                    name: key.to_string(),
                    parent: Some(parent),
                    data: Data::Array(Vec::new()),
                });
                let old_child = self.arena.insert(Node {
                    name: "0".to_string(),
                    parent: Some(array_id),
                    data: old_data,
                });
                let new_child = self.arena.insert(Node {
                    name: "1".to_string(),
                    parent: Some(array_id),
                    data: Data::Scalar(value),
                });
                self.arena.remove(id);
                if let Data::Array(items) = &mut self.arena[array_id].data {
                    *items = vec![old_child, new_child];
                }
                if let Data::Object(map) = &mut self.arena[parent].data {
                    map.insert(key.to_string(), array_id);
                }
                Ok(())
            }
        }
    }

    /// Removes every target matched by `path`; reindexes any `Array` left
    /// with gaps.
    pub fn erase(&mut self, from: NodeId, path: &Path) -> usize {
        let targets = self.get(from, path);
        let mut touched_arrays = Vec::new();
        let mut removed = 0;
        for id in targets {
            let Some(parent) = self.arena[id].parent else {
                continue;
            };
            match &mut self.arena[parent].data {
                Data::Object(map) => {
                    let name = self.arena[id].name.clone();
                    map.shift_remove(&name);
                    self.arena.remove(id);
                    removed += 1;
                }
                Data::Array(items) => {
                    items.retain(|&c| c != id);
                    self.arena.remove(id);
                    touched_arrays.push(parent);
                    removed += 1;
                }
                _ => {}
            }
        }
        for arr in touched_arrays {
            self.renumber(arr);
        }
        removed
    }

    fn renumber(&mut self, array_id: NodeId) {
        let items = match &self.arena[array_id].data {
            Data::Array(items) => items.clone(),
            _ => return,
        };
        for (i, &child) in items.iter().enumerate() {
            self.arena[child].name = i.to_string();
        }
    }

    /// Structurally merges `other` into `self`'s root (spec.md §3.1):
    /// objects merge key-wise, arrays concatenate, primitives (and any
    /// type mismatch) are overwritten by `other`'s value.
    pub fn merge(&mut self, other: &Tree) {
        self.merge_at(self.root, other, other.root);
    }

    fn merge_at(&mut self, dst: NodeId, src_tree: &Tree, src: NodeId) {
        match (&self.arena[dst].data, &src_tree.arena[src].data) {
            (Data::Object(_), Data::Object(src_map)) => {
                for (key, &src_child) in src_map {
                    let existing = if let Data::Object(map) = &self.arena[dst].data {
                        map.get(key).copied()
                    } else {
                        None
                    };
                    match existing {
                        Some(dst_child) => self.merge_at(dst_child, src_tree, src_child),
                        None => {
                            let copied = self.copy_subtree(src_tree, src_child, Some(dst));
                            self.arena[copied].name = key.clone();
                            if let Data::Object(map) = &mut self.arena[dst].data {
                                map.insert(key.clone(), copied);
                            }
                        }
                    }
                }
            }
            (Data::Array(_), Data::Array(src_items)) => {
                for &src_child in src_items {
                    let copied = self.copy_subtree(src_tree, src_child, Some(dst));
                    if let Data::Array(items) = &mut self.arena[dst].data {
                        items.push(copied);
                    }
                }
                self.renumber(dst);
            }
            _ => {
                // primitives overwrite, as does any kind mismatch.
                let parent = self.arena[dst].parent;
                let name = self.arena[dst].name.clone();
                let copied = self.copy_subtree(src_tree, src, parent);
                self.arena[copied].name = name.clone();
                if let Some(p) = parent {
                    match &mut self.arena[p].data {
                        Data::Object(map) => {
                            map.insert(name, copied);
                        }
                        Data::Array(items) => {
                            if let Some(slot) = items.iter_mut().find(|i| **i == dst) {
                                *slot = copied;
                            }
                        }
                        _ => {}
                    }
                } else {
                    self.root = copied;
                }
                self.arena.remove(dst);
            }
        }
    }

    fn copy_subtree(&mut self, src_tree: &Tree, src: NodeId, parent: Option<NodeId>) -> NodeId {
        let node = &src_tree.arena[src];
        match &node.data {
            Data::Object(map) => {
                let id = self.arena.insert(Node {
                    name: node.name.clone(),
                    parent,
                    data: Data::Object(IndexMap::new()),
                });
                let mut entries = IndexMap::with_capacity(map.len());
                for (k, &child) in map {
                    let copied = self.copy_subtree(src_tree, child, Some(id));
                    entries.insert(k.clone(), copied);
                }
                self.arena[id].data = Data::Object(entries);
                id
            }
            Data::Array(items) => {
                let id = self.arena.insert(Node {
                    name: node.name.clone(),
                    parent,
                    data: Data::Array(Vec::new()),
                });
                let copied: Vec<NodeId> = items
                    .iter()
                    .map(|&child| self.copy_subtree(src_tree, child, Some(id)))
                    .collect();
                self.arena[id].data = Data::Array(copied);
                id
            }
            leaf => self.arena.insert(Node {
                name: node.name.clone(),
                parent,
                data: leaf.clone_scalarish(),
            }),
        }
    }

    /// Applies `"path=value"` alteration statements before validation
    /// (SPEC_FULL.md §3.1.2), in order. The right-hand side is parsed as
    /// the first of bool, integer, float, or else kept as a string.
    pub fn apply_statements(&mut self, stmts: &[String]) -> Result<(), crate::path::InvalidPathFormat> {
        for stmt in stmts {
            let Some((path_str, value_str)) = stmt.split_once('=') else {
                continue;
            };
            let path = Path::parse(path_str)?;
            let scalar = parse_scalar(value_str);
            let root = self.root;
            let _ = self.put(root, &path, scalar);
        }
        Ok(())
    }
}

fn parse_scalar(s: &str) -> Scalar {
    if let Ok(b) = s.parse::<bool>() {
        return Scalar::Boolean(b);
    }
    if let Ok(i) = s.parse::<i64>() {
        return Scalar::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return Scalar::Float(f);
    }
    Scalar::String(s.to_string())
}

impl Data {
    fn clone_scalarish(&self) -> Data {
        match self {
            Data::Undefined => Data::Undefined,
            Data::Scalar(s) => Data::Scalar(s.clone()),
            Data::Array(_) | Data::Object(_) => Data::Undefined,
        }
    }
}

fn single_name<'p>(seg: &'p crate::path::Segment, path: &Path) -> Result<&'p str, TreeError> {
    match &seg.item {
        Item::Named(names) if names.len() == 1 && !seg.recursive => Ok(names[0].as_str()),
        _ => Err(TreeError::UnsupportedPathItem {
            path: path.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obj() -> Tree {
        Tree::new_object()
    }

    #[test]
    fn put_creates_intermediate_objects() {
        let mut t = obj();
        let root = t.root();
        let path = Path::parse("$.a.b").unwrap();
        t.put(root, &path, Scalar::Integer(7)).unwrap();
        assert_eq!(t.as_i64(t.get(root, &path)[0]), Some(7));
    }

    #[test]
    fn put_promotes_scalar_to_array_on_second_assignment() {
        let mut t = obj();
        let root = t.root();
        let path = Path::parse("$.a").unwrap();
        t.put(root, &path, Scalar::Integer(1)).unwrap();
        t.put(root, &path, Scalar::Integer(2)).unwrap();
        let matches = t.get(root, &path);
        assert_eq!(matches.len(), 1);
        assert_eq!(t.kind(matches[0]), Type::Array);
        assert_eq!(t.len(matches[0]), 2);
    }

    #[test]
    fn put_rejects_non_named_path_items() {
        let mut t = obj();
        let root = t.root();
        let path = Path::parse("$.*").unwrap();
        assert_eq!(
            t.put(root, &path, Scalar::Integer(1)),
            Err(TreeError::UnsupportedPathItem {
                path: "$.*".to_string()
            })
        );
    }

    #[test]
    fn erase_renumbers_array() {
        let json = serde_json::json!({"a": [1,2,3]});
        let mut t = Tree::from_json(&json);
        let root = t.root();
        let path = Path::parse("$.a[0]").unwrap();
        assert_eq!(t.erase(root, &path), 1);
        let remaining = Path::parse("$.a").unwrap();
        let arr = t.get(root, &remaining)[0];
        assert_eq!(t.len(arr), 2);
        assert_eq!(t.name(t.each_ids(arr)[0]), "0");
        assert_eq!(t.name(t.each_ids(arr)[1]), "1");
    }

    #[test]
    fn merge_neutrality() {
        let json = serde_json::json!({"a": 1, "b": {"c": 2}});
        let mut a = Tree::from_json(&json);
        let empty = Tree::new_object();
        a.merge(&empty);
        assert_eq!(a.to_json(a.root()), json);
    }

    #[test]
    fn merge_object_keywise() {
        let mut a = Tree::from_json(&serde_json::json!({"a": 1, "b": {"x": 1}}));
        let b = Tree::from_json(&serde_json::json!({"b": {"y": 2}, "c": 3}));
        a.merge(&b);
        assert_eq!(
            a.to_json(a.root()),
            serde_json::json!({"a": 1, "b": {"x": 1, "y": 2}, "c": 3})
        );
    }

    #[test]
    fn merge_arrays_concatenate() {
        let mut a = Tree::from_json(&serde_json::json!({"a": [1,2]}));
        let b = Tree::from_json(&serde_json::json!({"a": [3]}));
        a.merge(&b);
        assert_eq!(a.to_json(a.root()), serde_json::json!({"a": [1,2,3]}));
    }

    #[test]
    fn merge_primitives_overwrite() {
        let mut a = Tree::from_json(&serde_json::json!({"a": 1}));
        let b = Tree::from_json(&serde_json::json!({"a": 2}));
        a.merge(&b);
        assert_eq!(a.to_json(a.root()), serde_json::json!({"a": 2}));
    }

    #[test]
    fn get_wildcard_and_recursive() {
        let json = serde_json::json!({"a": {"x": 1}, "b": {"x": 2}});
        let t = Tree::from_json(&json);
        let root = t.root();
        let path = Path::parse("$..x").unwrap();
        let matches = t.get(root, &path);
        let mut values: Vec<i64> = matches.iter().map(|&id| t.as_i64(id).unwrap()).collect();
        values.sort_unstable();
        assert_eq!(values, vec![1, 2]);
    }

    #[test]
    fn as_f64_rejects_lossy_widening() {
        let t = Tree::scalar(Scalar::Integer(i64::MAX));
        assert_eq!(t.as_f64(t.root()), None);
        let t = Tree::scalar(Scalar::Integer(42));
        assert_eq!(t.as_f64(t.root()), Some(42.0));
    }
}
