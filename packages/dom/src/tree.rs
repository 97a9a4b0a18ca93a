//! Arena-backed document tree.
//!
//! Nodes are allocated once and addressed by [`NodeId`]. Removing a node
//! only detaches it, so ids held elsewhere stay valid (they simply stop
//! being reachable from the root). Detached nodes therefore accumulate
//! until [`Tree::compact`] drops them and renumbers the survivors.

use crate::{DomError, DomResult, QName};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(usize);

const MIN_COMPACTION_LEN: usize = 64;

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: QName,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: QName,
    pub attributes: Vec<Attribute>,
}

impl Element {
    pub fn new(name: QName) -> Self {
        Self {
            name,
            attributes: Vec::new(),
        }
    }

    pub fn attribute(&self, ns: &str, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.is(ns, local))
            .map(|a| a.value.as_str())
    }

    pub fn set_attribute(&mut self, name: QName, value: String) {
        match self.attributes.iter_mut().find(|a| a.name == name) {
            Some(existing) => existing.value = value,
            None => self.attributes.push(Attribute { name, value }),
        }
    }

    pub fn remove_attribute(&mut self, ns: &str, local: &str) -> Option<String> {
        let index = self.attributes.iter().position(|a| a.name.is(ns, local))?;
        Some(self.attributes.remove(index).value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
struct NodeEntry {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Mutable element/text tree with DOM-like operations.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<NodeEntry>,
    root: NodeId,
    /// Allocation count right after the last compaction
    compacted_len: usize,
}

/// Old-to-new id translation produced by [`Tree::compact`].
#[derive(Debug, Clone, Default)]
pub struct NodeRemap {
    ids: Vec<Option<NodeId>>,
}

impl NodeRemap {
    /// New id of `old`, or `None` when it was dropped.
    pub fn get(&self, old: NodeId) -> Option<NodeId> {
        self.ids.get(old.0).copied().flatten()
    }
}

impl Tree {
    pub fn new(root_name: QName) -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            compacted_len: 0,
        };
        tree.root = tree.create_element(root_name);
        tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    fn entry(&self, id: NodeId) -> &NodeEntry {
        &self.nodes[id.0]
    }

    fn entry_mut(&mut self, id: NodeId) -> &mut NodeEntry {
        &mut self.nodes[id.0]
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeEntry {
            data,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Number of allocated nodes, attached or not.
    pub fn allocated(&self) -> usize {
        self.nodes.len()
    }

    /// Whether allocations doubled since the last compaction. Small trees
    /// are never worth compacting.
    pub fn needs_compaction(&self) -> bool {
        self.nodes.len() > 2 * self.compacted_len.max(MIN_COMPACTION_LEN)
    }

    /// Drops every node not reachable from the root and renumbers the rest
    /// in document order. Ids from before the call are only meaningful
    /// through the returned map.
    pub fn compact(&mut self) -> NodeRemap {
        let mut order = vec![self.root];
        order.extend(self.descendants(self.root));

        let mut ids = vec![None; self.nodes.len()];
        for (index, &old) in order.iter().enumerate() {
            ids[old.0] = Some(NodeId(index));
        }
        let mut entries: Vec<Option<NodeEntry>> = std::mem::take(&mut self.nodes).into_iter().map(Some).collect();
        self.nodes = order
            .iter()
            .filter_map(|&old| entries[old.0].take())
            .map(|mut entry| {
                entry.parent = entry.parent.and_then(|parent| ids[parent.0]);
                entry.children = entry.children.iter().filter_map(|child| ids[child.0]).collect();
                entry
            })
            .collect();
        self.root = NodeId(0);
        self.compacted_len = self.nodes.len();
        NodeRemap { ids }
    }

    /// Allocates a detached element.
    pub fn create_element(&mut self, name: QName) -> NodeId {
        self.push(NodeData::Element(Element::new(name)))
    }

    /// Allocates a detached text node.
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeData::Text(text.into()))
    }

    /// Allocates a detached element in `ns` and appends it to `parent`.
    pub fn append_element(&mut self, parent: NodeId, ns: &str, local: &str) -> DomResult<NodeId> {
        let element = self.create_element(QName::new(ns, local));
        self.append_child(parent, element)?;
        Ok(element)
    }

    /// Allocates a detached copy of element `id` without its children.
    pub fn clone_shallow(&mut self, id: NodeId) -> DomResult<NodeId> {
        let element = self.element(id).ok_or(DomError::NotElement(id))?.clone();
        Ok(self.push(NodeData::Element(element)))
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.entry(id).data
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.entry(id).data {
            NodeData::Element(element) => Some(element),
            NodeData::Text(_) => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.entry_mut(id).data {
            NodeData::Element(element) => Some(element),
            NodeData::Text(_) => None,
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.entry(id).data {
            NodeData::Text(text) => Some(text),
            NodeData::Element(_) => None,
        }
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.entry(id).data, NodeData::Text(_))
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.entry(id).data, NodeData::Element(_))
    }

    pub fn name(&self, id: NodeId) -> Option<&QName> {
        self.element(id).map(|e| &e.name)
    }

    pub fn is_named(&self, id: NodeId, ns: &str, local: &str) -> bool {
        self.name(id).map_or(false, |name| name.is(ns, local))
    }

    pub fn attribute(&self, id: NodeId, ns: &str, local: &str) -> Option<&str> {
        self.element(id)?.attribute(ns, local)
    }

    pub fn set_attribute(&mut self, id: NodeId, name: QName, value: impl Into<String>) -> DomResult<()> {
        self.element_mut(id)
            .ok_or(DomError::NotElement(id))?
            .set_attribute(name, value.into());
        Ok(())
    }

    pub fn remove_attribute(&mut self, id: NodeId, ns: &str, local: &str) -> Option<String> {
        self.element_mut(id)?.remove_attribute(ns, local)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.entry(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.entry(id).children
    }

    pub fn child(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.entry(id).children.get(index).copied()
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.entry(id).children.first().copied()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.entry(id).children.last().copied()
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&child| child == id)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        self.child(parent, index + 1)
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        self.child(parent, index.checked_sub(1)?)
    }

    /// DOM length: characters for text nodes, child count for elements.
    pub fn node_length(&self, id: NodeId) -> usize {
        let entry = self.entry(id);
        match &entry.data {
            NodeData::Text(text) => text.chars().count(),
            NodeData::Element(_) => entry.children.len(),
        }
    }

    /// Ancestors of `id`, nearest first, excluding `id` itself.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            current: self.parent(id),
        }
    }

    /// Descendants of `id` in document order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            tree: self,
            stack: self.children(id).iter().rev().copied().collect(),
        }
    }

    /// Inclusive containment test.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        node == ancestor || self.ancestors(node).any(|a| a == ancestor)
    }

    pub fn is_attached(&self, id: NodeId) -> bool {
        self.contains(self.root, id)
    }

    pub fn text_content(&self, id: NodeId) -> String {
        match self.text(id) {
            Some(text) => text.to_string(),
            None => self
                .descendants(id)
                .filter_map(|node| self.text(node))
                .collect(),
        }
    }

    /// First descendant element with the given name.
    pub fn find_element(&self, id: NodeId, ns: &str, local: &str) -> Option<NodeId> {
        self.descendants(id).find(|&node| self.is_named(node, ns, local))
    }

    /// First direct child element with the given name.
    pub fn child_element(&self, id: NodeId, ns: &str, local: &str) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|&child| self.is_named(child, ns, local))
    }

    // ------------------------------------------------------------------
    // Structure mutation
    // ------------------------------------------------------------------

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        self.insert_before(parent, child, None)
    }

    /// Inserts `child` into `parent` before `reference` (or last when
    /// `reference` is `None`), detaching it from its previous parent first.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) -> DomResult<()> {
        if !self.is_element(parent) {
            return Err(DomError::NotElement(parent));
        }
        if self.contains(child, parent) {
            return Err(DomError::HierarchyRequest { parent, child });
        }
        if let Some(reference) = reference {
            if self.parent(reference) != Some(parent) {
                return Err(DomError::NotAChild {
                    parent,
                    child: reference,
                });
            }
            if reference == child {
                return Ok(());
            }
        }

        self.detach(child);
        let index = match reference {
            Some(reference) => self
                .index_in_parent(reference)
                .ok_or(DomError::NotAChild { parent, child: reference })?,
            None => self.entry(parent).children.len(),
        };
        self.entry_mut(parent).children.insert(index, child);
        self.entry_mut(child).parent = Some(parent);
        Ok(())
    }

    /// Detaches `id` from its parent.
    pub fn remove(&mut self, id: NodeId) -> DomResult<()> {
        if self.parent(id).is_none() {
            return Err(DomError::Detached(id));
        }
        self.detach(id);
        Ok(())
    }

    fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.entry(id).parent {
            self.entry_mut(parent).children.retain(|&child| child != id);
            self.entry_mut(id).parent = None;
        }
    }

    /// Moves the children of `id` in front of it and removes `id`.
    /// Returns the former parent.
    pub fn merge_into_parent(&mut self, id: NodeId) -> DomResult<NodeId> {
        let parent = self.parent(id).ok_or(DomError::Detached(id))?;
        let children = self.entry(id).children.clone();
        for child in children {
            self.insert_before(parent, child, Some(id))?;
        }
        self.detach(id);
        Ok(parent)
    }

    /// Replaces the children of `id` with a single text node.
    pub fn set_text_content(&mut self, id: NodeId, text: &str) -> DomResult<()> {
        if !self.is_element(id) {
            return self.set_text(id, text);
        }
        let children = self.entry(id).children.clone();
        for child in children {
            self.detach(child);
        }
        if !text.is_empty() {
            let node = self.create_text(text);
            self.append_child(id, node)?;
        }
        Ok(())
    }

    /// Merges adjacent text children and drops empty ones, recursively.
    pub fn normalize(&mut self, id: NodeId) {
        let children = self.entry(id).children.clone();
        let mut previous_text: Option<NodeId> = None;
        for child in children {
            let data = match self.text(child) {
                Some(text) => text.to_string(),
                None => {
                    self.normalize(child);
                    previous_text = None;
                    continue;
                }
            };
            if data.is_empty() {
                self.detach(child);
                continue;
            }
            match previous_text {
                Some(previous) => {
                    if let NodeData::Text(text) = &mut self.entry_mut(previous).data {
                        text.push_str(&data);
                    }
                    self.detach(child);
                }
                None => previous_text = Some(child),
            }
        }
    }

    /// Merges the text siblings adjacent to text node `id` into one node.
    ///
    /// Returns the surviving node and the character offset at which the
    /// content of `id` now starts inside it.
    pub fn merge_adjacent_text(&mut self, id: NodeId) -> DomResult<(NodeId, usize)> {
        if !self.is_text(id) {
            return Err(DomError::NotText(id));
        }
        let mut node = id;
        let mut shift = 0;
        while let Some(previous) = self.previous_sibling(node).filter(|&p| self.is_text(p)) {
            let data = self.text(node).unwrap_or_default().to_string();
            shift += self.node_length(previous);
            self.append_data(previous, &data)?;
            self.detach(node);
            node = previous;
        }
        while let Some(next) = self.next_sibling(node).filter(|&n| self.is_text(n)) {
            let data = self.text(next).unwrap_or_default().to_string();
            self.append_data(node, &data)?;
            self.detach(next);
        }
        Ok((node, shift))
    }

    // ------------------------------------------------------------------
    // Character data
    // ------------------------------------------------------------------

    fn text_mut(&mut self, id: NodeId) -> DomResult<&mut String> {
        match &mut self.entry_mut(id).data {
            NodeData::Text(text) => Ok(text),
            NodeData::Element(_) => Err(DomError::NotText(id)),
        }
    }

    pub fn set_text(&mut self, id: NodeId, value: &str) -> DomResult<()> {
        let text = self.text_mut(id)?;
        text.clear();
        text.push_str(value);
        Ok(())
    }

    pub fn insert_data(&mut self, id: NodeId, offset: usize, data: &str) -> DomResult<()> {
        let text = self.text_mut(id)?;
        let byte = char_to_byte(text, offset)
            .ok_or_else(|| DomError::out_of_bounds(id, offset, text.chars().count()))?;
        text.insert_str(byte, data);
        Ok(())
    }

    pub fn append_data(&mut self, id: NodeId, data: &str) -> DomResult<()> {
        self.text_mut(id)?.push_str(data);
        Ok(())
    }

    /// Deletes `count` characters from `offset`, clamped to the end.
    pub fn delete_data(&mut self, id: NodeId, offset: usize, count: usize) -> DomResult<()> {
        let text = self.text_mut(id)?;
        let start = char_to_byte(text, offset)
            .ok_or_else(|| DomError::out_of_bounds(id, offset, text.chars().count()))?;
        let end = char_to_byte(text, offset + count).unwrap_or(text.len());
        text.replace_range(start..end, "");
        Ok(())
    }

    /// Splits text node `id` at `offset`; the tail becomes a new node placed
    /// right after `id` and is returned.
    pub fn split_text(&mut self, id: NodeId, offset: usize) -> DomResult<NodeId> {
        let tail = {
            let text = self.text_mut(id)?;
            let byte = char_to_byte(text, offset)
                .ok_or_else(|| DomError::out_of_bounds(id, offset, text.chars().count()))?;
            text.split_off(byte)
        };
        let node = self.create_text(tail);
        if let Some(parent) = self.parent(id) {
            let next = self.next_sibling(id);
            self.insert_before(parent, node, next)?;
        }
        Ok(node)
    }
}

fn char_to_byte(text: &str, offset: usize) -> Option<usize> {
    text.char_indices()
        .map(|(byte, _)| byte)
        .chain(std::iter::once(text.len()))
        .nth(offset)
}

pub struct Ancestors<'a> {
    tree: &'a Tree,
    current: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let node = self.current?;
        self.current = self.tree.parent(node);
        Some(node)
    }
}

pub struct Descendants<'a> {
    tree: &'a Tree,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let node = self.stack.pop()?;
        self.stack
            .extend(self.tree.children(node).iter().rev().copied());
        Some(node)
    }
}
