//! Node and position filters.
//!
//! Node filters decide which nodes the position iterator walks into.
//! Position filters decide which of the walked positions are steps.

use crate::odf_utils::{
    inline_root, is_anchored_as_character, is_grouping_element, is_visible_character, paragraph_element,
    Character,
};
use crate::position_iterator::PositionIterator;
use odfkit_dom::{ns, NodeId, Tree};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterResult {
    Accept,
    Reject,
    Skip,
}

pub trait NodeFilter {
    fn accept_node(&self, tree: &Tree, node: NodeId) -> FilterResult;
}

pub trait PositionFilter {
    fn accept_position(&self, iterator: &PositionIterator<'_>) -> FilterResult;
}

impl<F: PositionFilter + ?Sized> PositionFilter for &F {
    fn accept_position(&self, iterator: &PositionIterator<'_>) -> FilterResult {
        (**self).accept_position(iterator)
    }
}

impl<F: PositionFilter + ?Sized> PositionFilter for Box<F> {
    fn accept_position(&self, iterator: &PositionIterator<'_>) -> FilterResult {
        (**self).accept_position(iterator)
    }
}

/// Rejects every node living in one of the configured namespaces.
#[derive(Debug, Clone)]
pub struct BlacklistNamespaceNodeFilter {
    namespaces: Vec<String>,
}

impl BlacklistNamespaceNodeFilter {
    pub fn new(namespaces: Vec<String>) -> Self {
        Self { namespaces }
    }
}

impl NodeFilter for BlacklistNamespaceNodeFilter {
    fn accept_node(&self, tree: &Tree, node: NodeId) -> FilterResult {
        match tree.name(node) {
            Some(name) if self.namespaces.iter().any(|uri| *uri == name.ns) => FilterResult::Reject,
            _ => FilterResult::Accept,
        }
    }
}

/// Hides formatting whitespace between block elements and tracked changes.
#[derive(Debug, Clone, Copy, Default)]
pub struct OdfTextBodyNodeFilter;

impl NodeFilter for OdfTextBodyNodeFilter {
    fn accept_node(&self, tree: &Tree, node: NodeId) -> FilterResult {
        if tree.is_text(node) {
            let grouped = tree
                .parent(node)
                .map_or(false, |parent| is_grouping_element(tree, parent));
            if !grouped {
                return FilterResult::Reject;
            }
        } else if tree.is_named(node, ns::TEXT, "tracked-changes") {
            return FilterResult::Reject;
        }
        FilterResult::Accept
    }
}

/// Node filters combined; the first rejection wins.
pub struct NodeFilterChain {
    filters: Vec<Box<dyn NodeFilter>>,
}

impl NodeFilterChain {
    pub fn new(filters: Vec<Box<dyn NodeFilter>>) -> Self {
        Self { filters }
    }

    /// The chain every document walks with.
    pub fn for_text_body(blacklisted_namespaces: Vec<String>) -> Self {
        Self::new(vec![
            Box::new(BlacklistNamespaceNodeFilter::new(blacklisted_namespaces)),
            Box::new(OdfTextBodyNodeFilter),
        ])
    }
}

impl NodeFilter for NodeFilterChain {
    fn accept_node(&self, tree: &Tree, node: NodeId) -> FilterResult {
        if self
            .filters
            .iter()
            .any(|filter| filter.accept_node(tree, node) == FilterResult::Reject)
        {
            FilterResult::Reject
        } else {
            FilterResult::Accept
        }
    }
}

impl std::fmt::Debug for NodeFilterChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeFilterChain")
            .field("filters", &self.filters.len())
            .finish()
    }
}

/// Position filters combined; a position is a step only if no member
/// rejects it.
#[derive(Default)]
pub struct PositionFilterChain<'a> {
    filters: Vec<Box<dyn PositionFilter + 'a>>,
}

impl<'a> PositionFilterChain<'a> {
    pub fn new() -> Self {
        Self { filters: Vec::new() }
    }

    pub fn add_filter(&mut self, filter: impl PositionFilter + 'a) {
        self.filters.push(Box::new(filter));
    }

    pub fn with_filter(mut self, filter: impl PositionFilter + 'a) -> Self {
        self.add_filter(filter);
        self
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl<'a> From<Vec<Box<dyn PositionFilter + 'a>>> for PositionFilterChain<'a> {
    fn from(filters: Vec<Box<dyn PositionFilter + 'a>>) -> Self {
        Self { filters }
    }
}

impl PositionFilter for PositionFilterChain<'_> {
    fn accept_position(&self, iterator: &PositionIterator<'_>) -> FilterResult {
        for filter in &self.filters {
            if filter.accept_position(iterator) == FilterResult::Reject {
                return FilterResult::Reject;
            }
        }
        FilterResult::Accept
    }
}

/// Accepts one position at the start of each paragraph plus one position
/// after every visible character.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextPositionFilter;

impl TextPositionFilter {
    fn is_paragraph_start(tree: &Tree, container: NodeId, offset: usize, paragraph: NodeId) -> bool {
        match tree.first_child(paragraph) {
            Some(first) if tree.is_text(first) => container == first && offset == 0,
            _ => container == paragraph && offset == 0,
        }
    }
}

impl PositionFilter for TextPositionFilter {
    fn accept_position(&self, iterator: &PositionIterator<'_>) -> FilterResult {
        let tree = iterator.tree();
        let container = iterator.container();
        let offset = iterator.unfiltered_dom_offset();
        let Some(paragraph) = paragraph_element(tree, container) else {
            return FilterResult::Reject;
        };
        if Self::is_paragraph_start(tree, container, offset, paragraph) {
            return FilterResult::Accept;
        }

        if let Some(text) = tree.text(container) {
            if offset > 0 {
                let grouped = tree
                    .parent(container)
                    .map_or(false, |parent| is_grouping_element(tree, parent));
                let visible = grouped
                    && text.chars().nth(offset - 1).map_or(false, |ch| {
                        let character = Character::Text {
                            node: container,
                            offset: offset - 1,
                            ch,
                        };
                        is_visible_character(tree, character, paragraph)
                    });
                return if visible {
                    FilterResult::Accept
                } else {
                    FilterResult::Reject
                };
            }
        }

        match iterator.left_node() {
            Some(left) if is_anchored_as_character(tree, left) => FilterResult::Accept,
            _ => FilterResult::Reject,
        }
    }
}

/// Accepts positions whose inline root is `anchor_root`. Positions outside
/// any annotation belong to `body`.
#[derive(Debug, Clone, Copy)]
pub struct RootFilter {
    anchor_root: NodeId,
    body: NodeId,
}

impl RootFilter {
    pub fn new(anchor_root: NodeId, body: NodeId) -> Self {
        Self { anchor_root, body }
    }
}

impl PositionFilter for RootFilter {
    fn accept_position(&self, iterator: &PositionIterator<'_>) -> FilterResult {
        let root = inline_root(iterator.tree(), iterator.container()).unwrap_or(self.body);
        if root == self.anchor_root {
            FilterResult::Accept
        } else {
            FilterResult::Reject
        }
    }
}
