//! Arena-backed tree with parent links, used for query plans.
//!
//! Nodes live in a vector and refer to each other by `NodeId`. Surgery
//! operations relink ids and never move values, so a `NodeId` stays valid
//! for the lifetime of the tree. Nodes cut out of the tree stay in the
//! arena, detached and unreachable from the root.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use core::ops::{Index, IndexMut};

/// Handle of a node in a `Tree`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

#[derive(Clone, Debug)]
struct Node<T> {
    value: T,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A rooted tree stored in an arena.
#[derive(Clone, Debug)]
pub struct Tree<T> {
    nodes: Vec<Node<T>>,
    root: NodeId,
}

impl<T> Tree<T> {
    /// Creates a tree holding a single root node.
    pub fn new(root: T) -> Self {
        Self {
            nodes: alloc::vec![Node {
                value: root,
                parent: None,
                children: Vec::new(),
            }],
            root: NodeId(0),
        }
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Adds a detached node and returns its id.
    pub fn add_node(&mut self, value: T) -> NodeId {
        self.nodes.push(Node {
            value,
            parent: None,
            children: Vec::new(),
        });
        NodeId(self.nodes.len() - 1)
    }

    /// Appends `child` to the children of `parent`.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Adds `value` as the last child of `parent`.
    pub fn push_child(&mut self, parent: NodeId, value: T) -> NodeId {
        let child = self.add_node(value);
        self.add_child(parent, child);
        child
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> &T {
        &self.nodes[id.0].value
    }

    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> &mut T {
        &mut self.nodes[id.0].value
    }

    /// Replaces the value of `id`, returning the old one.
    pub fn replace_value(&mut self, id: NodeId, value: T) -> T {
        core::mem::replace(&mut self.nodes[id.0].value, value)
    }

    #[inline]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    #[inline]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    #[inline]
    pub fn child_at(&self, id: NodeId, position: usize) -> Option<NodeId> {
        self.nodes[id.0].children.get(position).copied()
    }

    #[inline]
    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.nodes[id.0].children.is_empty()
    }

    /// Position of `id` among its parent's children.
    pub fn position_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|c| *c == id)
    }

    /// Number of edges between `id` and the root.
    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            depth += 1;
            current = parent;
        }
        depth
    }

    /// All nodes reachable from `start`, in pre-order.
    pub fn descendants(&self, start: NodeId) -> Vec<NodeId> {
        self.find(start, |_| true, |_| false)
    }

    /// All reachable nodes, in pre-order.
    pub fn nodes(&self) -> Vec<NodeId> {
        self.descendants(self.root)
    }

    /// Pre-order search from `start`. Nodes for which `stop` holds are
    /// still tested against `filter` but their subtrees are not visited.
    pub fn find(
        &self,
        start: NodeId,
        filter: impl Fn(&T) -> bool,
        stop: impl Fn(&T) -> bool,
    ) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut stack = alloc::vec![start];
        while let Some(id) = stack.pop() {
            let value = self.get(id);
            if filter(value) {
                found.push(id);
            }
            if id != start && stop(value) {
                continue;
            }
            stack.extend(self.children(id).iter().rev().copied());
        }
        found
    }

    /// Leaves of the subtree rooted at `start`, left to right.
    pub fn leaves(&self, start: NodeId) -> Vec<NodeId> {
        self.descendants(start)
            .into_iter()
            .filter(|id| self.is_leaf(*id))
            .collect()
    }

    fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|c| *c != id);
        }
    }

    /// Puts `new` where `old` is: same parent and position, or the root.
    /// `old` ends up without a parent.
    fn take_place(&mut self, old: NodeId, new: NodeId) {
        if old == new {
            return;
        }
        self.detach(new);
        match self.nodes[old.0].parent.take() {
            Some(parent) => {
                for slot in self.nodes[parent.0].children.iter_mut() {
                    if *slot == old {
                        *slot = new;
                    }
                }
                self.nodes[new.0].parent = Some(parent);
            }
            None => {
                if self.root == old {
                    self.root = new;
                }
                self.nodes[new.0].parent = None;
            }
        }
    }

    /// Removes `id`, splicing its children into its place. Removing the
    /// root is only possible when it has exactly one child, which becomes
    /// the new root. Returns false if the tree was left unchanged.
    pub fn remove_node(&mut self, id: NodeId) -> bool {
        let children = core::mem::take(&mut self.nodes[id.0].children);
        match self.nodes[id.0].parent {
            Some(parent) => {
                let position = self.position_in_parent(id).unwrap_or(0);
                for child in &children {
                    self.nodes[child.0].parent = Some(parent);
                }
                let siblings = &mut self.nodes[parent.0].children;
                siblings.splice(position..position + 1, children);
                self.nodes[id.0].parent = None;
                true
            }
            None if children.len() == 1 && self.root == id => {
                let child = children[0];
                self.nodes[child.0].parent = None;
                self.root = child;
                true
            }
            None => {
                self.nodes[id.0].children = children;
                false
            }
        }
    }

    /// Inserts the detached node `new` between `existing` and its parent.
    pub fn insert_node_at(&mut self, existing: NodeId, new: NodeId) {
        self.take_place(existing, new);
        self.add_child(new, existing);
    }

    /// Swaps `id` with its only child, which takes `id`'s place. The
    /// child's former children move under `id`. Returns the node now in
    /// `id`'s former position, or `None` if `id` does not have exactly one
    /// child.
    pub fn swap_node_with_child(&mut self, id: NodeId) -> Option<NodeId> {
        if self.children(id).len() != 1 {
            return None;
        }
        let child = self.children(id)[0];
        self.take_place(id, child);
        self.nodes[id.0].children.clear();
        let grandchildren = core::mem::take(&mut self.nodes[child.0].children);
        for grandchild in &grandchildren {
            self.nodes[grandchild.0].parent = Some(id);
        }
        self.nodes[id.0].children = grandchildren;
        self.nodes[id.0].parent = Some(child);
        self.nodes[child.0].children.push(id);
        Some(child)
    }

    /// Moves `id`, which must have exactly one child, below that child:
    /// the child takes `id`'s place and `id` is inserted between the child
    /// and the child's child at `position`. Returns false if the shape
    /// does not allow it.
    pub fn push_node_below_child(&mut self, id: NodeId, position: usize) -> bool {
        let [child] = self.children(id) else {
            return false;
        };
        let child = *child;
        let Some(target) = self.child_at(child, position) else {
            return false;
        };
        self.nodes[id.0].children.clear();
        self.nodes[child.0].parent = None;
        self.take_place(id, child);
        self.insert_node_at(target, id);
        true
    }

    /// Replaces the chain `old_head ..= old_tail` with the already linked
    /// chain `new_head ..= new_tail`. The children of `old_tail` become
    /// children of `new_tail`.
    pub fn replace_chain_with_chain(
        &mut self,
        old_head: NodeId,
        old_tail: NodeId,
        new_head: NodeId,
        new_tail: NodeId,
    ) {
        let tail_children = core::mem::take(&mut self.nodes[old_tail.0].children);
        self.take_place(old_head, new_head);
        for child in tail_children {
            self.nodes[child.0].parent = None;
            self.add_child(new_tail, child);
        }
    }

    /// Replaces the chain `old_head ..= old_tail` with the single node `new`.
    pub fn replace_chain_with_node(&mut self, old_head: NodeId, old_tail: NodeId, new: NodeId) {
        self.replace_chain_with_chain(old_head, old_tail, new, new);
    }

    /// Replaces the node `old` with the chain `new_head ..= new_tail`.
    pub fn replace_node_with_chain(&mut self, old: NodeId, new_head: NodeId, new_tail: NodeId) {
        self.replace_chain_with_chain(old, old, new_head, new_tail);
    }

    /// Copies the reachable part of the tree, mapping every value.
    pub fn map<U>(&self, f: impl Fn(&T) -> U) -> Tree<U> {
        let mut mapped = Tree::new(f(self.get(self.root)));
        let mut stack = alloc::vec![(self.root, mapped.root())];
        while let Some((source, target)) = stack.pop() {
            for child in self.children(source) {
                let copy = mapped.push_child(target, f(self.get(*child)));
                stack.push((*child, copy));
            }
        }
        mapped
    }

    /// One line per reachable node in pre-order, each prefixed with one
    /// `-` per level of depth.
    pub fn to_string_with(&self, label: impl Fn(&T) -> String) -> String {
        let mut out = String::new();
        let mut stack = alloc::vec![(self.root, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            for _ in 0..depth {
                out.push('-');
            }
            out.push_str(&label(self.get(id)));
            out.push('\n');
            for child in self.children(id).iter().rev() {
                stack.push((*child, depth + 1));
            }
        }
        out
    }
}

impl<T> Index<NodeId> for Tree<T> {
    type Output = T;

    fn index(&self, id: NodeId) -> &T {
        self.get(id)
    }
}

impl<T> IndexMut<NodeId> for Tree<T> {
    fn index_mut(&mut self, id: NodeId) -> &mut T {
        self.get_mut(id)
    }
}

impl<T: fmt::Display> fmt::Display for Tree<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_with(|v| alloc::format!("{}", v)))
    }
}
