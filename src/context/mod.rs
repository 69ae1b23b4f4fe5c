//! Named definition scopes.
//!
//! Contexts form a tree through parent edges, but identity is the name alone:
//! the [`ContextTree`] registry maps each name to the first context created
//! under it. Opening a known name again reuses that context and keeps its
//! original parent, wherever the marker appears in the source.

use std::collections::HashMap;

/// Name the root context is registered under.
pub const ROOT_NAME: &str = "";

/// Handle to a context inside a [`ContextTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(usize);

impl ContextId {
    /// The unnamed root context present in every tree.
    pub const ROOT: Self = Self(0);

    pub const fn is_root(self) -> bool {
        self.0 == 0
    }
}

#[derive(Debug, Clone)]
struct ContextNode {
    name: String,
    parent: Option<ContextId>,
}

/// Context arena plus the name-keyed registry.
#[derive(Debug, Clone)]
pub struct ContextTree {
    nodes: Vec<ContextNode>,
    by_name: HashMap<String, ContextId>,
}

impl ContextTree {
    /// Create a tree holding only the root.
    pub fn new() -> Self {
        let mut by_name = HashMap::new();
        by_name.insert(ROOT_NAME.to_string(), ContextId::ROOT);
        Self {
            nodes: vec![ContextNode {
                name: ROOT_NAME.to_string(),
                parent: None,
            }],
            by_name,
        }
    }

    /// Return the context registered as `name`, creating it under `parent`
    /// when the name has not been seen yet.
    ///
    /// An existing context is returned unchanged; `parent` is ignored.
    pub fn open(&mut self, name: &str, parent: ContextId) -> ContextId {
        if let Some(&id) = self.by_name.get(name) {
            return id;
        }
        let id = ContextId(self.nodes.len());
        self.nodes.push(ContextNode {
            name: name.to_string(),
            parent: Some(parent),
        });
        self.by_name.insert(name.to_string(), id);
        id
    }

    pub fn lookup(&self, name: &str) -> Option<ContextId> {
        self.by_name.get(name).copied()
    }

    pub fn name(&self, id: ContextId) -> &str {
        self.nodes.get(id.0).map_or(ROOT_NAME, |node| node.name.as_str())
    }

    pub fn parent(&self, id: ContextId) -> Option<ContextId> {
        self.nodes.get(id.0).and_then(|node| node.parent)
    }

    /// Number of contexts, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate from `id` up to the root, nearest first.
    pub fn ancestry(&self, id: ContextId) -> Ancestry<'_> {
        Ancestry {
            tree: self,
            next: Some(id),
        }
    }
}

impl Default for ContextTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator returned by [`ContextTree::ancestry`].
pub struct Ancestry<'a> {
    tree: &'a ContextTree,
    next: Option<ContextId>,
}

impl Iterator for Ancestry<'_> {
    type Item = ContextId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}
