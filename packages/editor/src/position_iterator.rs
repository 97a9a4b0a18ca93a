//! Raw position walking.
//!
//! For an element `E` with children `c0..ck-1` the walk visits, for every
//! child, either `(t, 0)..=(t, len)` when the child is a visible text node
//! or `(E, i)` followed by the child's subtree when it is a visible
//! element; rejected children only contribute `(E, i)`. The walk ends with
//! `(E, k)`. It never leaves the root it was created for.

use crate::errors::StepsError;
use crate::filter::{FilterResult, NodeFilter};
use odfkit_dom::{DomPoint, NodeId, Tree};

#[derive(Clone, Copy)]
pub struct PositionIterator<'a> {
    tree: &'a Tree,
    root: NodeId,
    container: NodeId,
    offset: usize,
    node_filter: &'a dyn NodeFilter,
}

impl<'a> PositionIterator<'a> {
    /// Iterator placed on the first position of `root`.
    pub fn new(tree: &'a Tree, root: NodeId, node_filter: &'a dyn NodeFilter) -> Self {
        let mut iterator = Self {
            tree,
            root,
            container: root,
            offset: 0,
            node_filter,
        };
        iterator.normalize();
        iterator
    }

    pub fn tree(&self) -> &'a Tree {
        self.tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    pub fn unfiltered_dom_offset(&self) -> usize {
        self.offset
    }

    pub fn point(&self) -> DomPoint {
        DomPoint::new(self.container, self.offset)
    }

    fn is_visible(&self, node: NodeId) -> bool {
        self.node_filter.accept_node(self.tree, node) != FilterResult::Reject
    }

    fn is_visible_text(&self, node: NodeId) -> bool {
        self.tree.is_text(node) && self.is_visible(node)
    }

    fn is_visible_element(&self, node: NodeId) -> bool {
        self.tree.is_element(node) && self.is_visible(node)
    }

    /// Rewrites `(E, i)` to `(t, 0)` when child `i` is a visible text node.
    fn normalize(&mut self) {
        if let Some(child) = self.tree.child(self.container, self.offset) {
            if self.tree.is_element(self.container) && self.is_visible_text(child) {
                self.container = child;
                self.offset = 0;
            }
        }
    }

    fn set(&mut self, container: NodeId, offset: usize) {
        self.container = container;
        self.offset = offset;
        self.normalize();
    }

    /// Moves to `(parent, index + 1)` of the current container.
    fn step_out(&mut self) -> bool {
        if self.container == self.root {
            return false;
        }
        match (self.tree.parent(self.container), self.tree.index_in_parent(self.container)) {
            (Some(parent), Some(index)) => {
                self.set(parent, index + 1);
                true
            }
            _ => false,
        }
    }

    pub fn next_position(&mut self) -> bool {
        let length = self.tree.node_length(self.container);
        if self.tree.is_text(self.container) {
            if self.offset < length {
                self.offset += 1;
                return true;
            }
            return self.step_out();
        }
        if self.offset >= length {
            return self.step_out();
        }
        match self.tree.child(self.container, self.offset) {
            Some(child) if self.is_visible_element(child) => self.set(child, 0),
            _ => self.set(self.container, self.offset + 1),
        }
        true
    }

    /// Last position contributed by child `index` of `parent`.
    fn move_to_end_of_child(&mut self, parent: NodeId, index: usize) {
        let Some(child) = self.tree.child(parent, index) else {
            self.set(parent, index);
            return;
        };
        if self.is_visible_text(child) {
            self.container = child;
            self.offset = self.tree.node_length(child);
        } else if self.is_visible_element(child) {
            self.container = child;
            self.offset = self.tree.node_length(child);
        } else {
            self.container = parent;
            self.offset = index;
        }
    }

    pub fn previous_position(&mut self) -> bool {
        if self.tree.is_text(self.container) {
            if self.offset > 0 {
                self.offset -= 1;
                return true;
            }
            let (Some(parent), Some(index)) =
                (self.tree.parent(self.container), self.tree.index_in_parent(self.container))
            else {
                return false;
            };
            if index == 0 {
                return self.step_up_before(parent);
            }
            self.move_to_end_of_child(parent, index - 1);
            return true;
        }
        if self.offset > 0 {
            let container = self.container;
            self.move_to_end_of_child(container, self.offset - 1);
            return true;
        }
        self.step_up_before(self.container)
    }

    /// Moves to `(parent(node), index(node))`, the position before `node`.
    fn step_up_before(&mut self, node: NodeId) -> bool {
        if node == self.root {
            return false;
        }
        match (self.tree.parent(node), self.tree.index_in_parent(node)) {
            (Some(parent), Some(index)) => {
                self.container = parent;
                self.offset = index;
                true
            }
            _ => false,
        }
    }

    /// Places the iterator at `(container, offset)`, lifting it out of
    /// rejected subtrees and clamping the offset.
    pub fn set_unfiltered_position(&mut self, container: NodeId, offset: usize) -> Result<(), StepsError> {
        if !self.tree.contains(self.root, container) {
            return Err(StepsError::PointOutsideRoot(DomPoint::new(container, offset)));
        }
        let mut target = (container, offset);
        let mut node = container;
        while node != self.root {
            let Some(parent) = self.tree.parent(node) else {
                break;
            };
            if !self.is_visible(node) {
                target = (parent, self.tree.index_in_parent(node).unwrap_or_default());
            }
            node = parent;
        }
        let (container, offset) = target;
        self.set(container, offset.min(self.tree.node_length(container)));
        Ok(())
    }

    /// Jumps to a position previously read from an iterator over the same
    /// tree state.
    pub(crate) fn jump_to(&mut self, container: NodeId, offset: usize) {
        self.container = container;
        self.offset = offset;
    }

    /// Moves to the last position of the root.
    pub fn move_to_end(&mut self) {
        self.container = self.root;
        self.offset = self.tree.node_length(self.root);
    }

    /// Node directly before the position, if any.
    pub fn left_node(&self) -> Option<NodeId> {
        if self.tree.is_text(self.container) {
            if self.offset > 0 {
                return Some(self.container);
            }
            return self.tree.previous_sibling(self.container);
        }
        self.offset
            .checked_sub(1)
            .and_then(|index| self.tree.child(self.container, index))
    }

    /// Node directly after the position, if any.
    pub fn right_node(&self) -> Option<NodeId> {
        if self.tree.is_text(self.container) {
            if self.offset < self.tree.node_length(self.container) {
                return Some(self.container);
            }
            return self.tree.next_sibling(self.container);
        }
        self.tree.child(self.container, self.offset)
    }
}

impl std::fmt::Debug for PositionIterator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PositionIterator")
            .field("root", &self.root)
            .field("container", &self.container)
            .field("offset", &self.offset)
            .finish()
    }
}
