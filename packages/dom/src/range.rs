//! Boundary points, ranges and document-order comparison.

use crate::{DomError, DomResult, NodeId, Tree};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A `(container, offset)` boundary point. For text containers the offset
/// counts characters, for elements it counts children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DomPoint {
    pub node: NodeId,
    pub offset: usize,
}

impl DomPoint {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomRange {
    pub start: DomPoint,
    pub end: DomPoint,
}

impl DomRange {
    pub fn new(start: DomPoint, end: DomPoint) -> Self {
        Self { start, end }
    }

    pub fn collapsed(point: DomPoint) -> Self {
        Self {
            start: point,
            end: point,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

/// Boundary anchored to a node that later splits leave in place.
enum Boundary {
    Before(NodeId),
    End(NodeId),
}

impl Tree {
    /// Orders two boundary points in document order, following DOM
    /// boundary-point comparison.
    pub fn compare_points(&self, a: DomPoint, b: DomPoint) -> Ordering {
        self.point_key(a).cmp(&self.point_key(b))
    }

    fn point_key(&self, point: DomPoint) -> Vec<usize> {
        let mut key = vec![point.offset];
        let mut node = point.node;
        while let Some(parent) = self.parent(node) {
            let index = self
                .children(parent)
                .iter()
                .position(|&child| child == node)
                .unwrap_or_default();
            key.push(index);
            node = parent;
        }
        key.reverse();
        key
    }

    /// Nearest node containing both `a` and `b`.
    pub fn common_ancestor(&self, a: NodeId, b: NodeId) -> NodeId {
        std::iter::once(a)
            .chain(self.ancestors(a))
            .find(|&candidate| self.contains(candidate, b))
            .unwrap_or(self.root())
    }

    /// Splits text nodes at the range edges so both boundaries sit between
    /// children of an element. Returns the equivalent element-based range.
    pub fn split_boundaries(&mut self, range: DomRange) -> DomResult<DomRange> {
        let end = self.split_at(range.end)?;
        let start = self.split_at(range.start)?;
        Ok(DomRange {
            start: self.resolve(start)?,
            end: self.resolve(end)?,
        })
    }

    fn split_at(&mut self, point: DomPoint) -> DomResult<Boundary> {
        if self.is_text(point.node) {
            if point.offset == 0 {
                return Ok(Boundary::Before(point.node));
            }
            if point.offset >= self.node_length(point.node) {
                // anchoring after the node itself would move once an earlier
                // split in the same node shortens it
                let parent = self.parent(point.node).ok_or(DomError::Detached(point.node))?;
                return Ok(match self.next_sibling(point.node) {
                    Some(next) => Boundary::Before(next),
                    None => Boundary::End(parent),
                });
            }
            let tail = self.split_text(point.node, point.offset)?;
            return Ok(Boundary::Before(tail));
        }
        Ok(match self.child(point.node, point.offset) {
            Some(child) => Boundary::Before(child),
            None => Boundary::End(point.node),
        })
    }

    fn resolve(&self, boundary: Boundary) -> DomResult<DomPoint> {
        match boundary {
            Boundary::Before(node) => {
                let parent = self.parent(node).ok_or(DomError::Detached(node))?;
                let index = self.index_in_parent(node).ok_or(DomError::Detached(node))?;
                Ok(DomPoint::new(parent, index))
            }
            Boundary::End(node) => Ok(DomPoint::new(node, self.node_length(node))),
        }
    }

    /// Nodes lying entirely inside `range`, in document order.
    pub fn contained_nodes(&self, range: DomRange) -> Vec<NodeId> {
        let scope = self.common_ancestor(range.start.node, range.end.node);
        self.descendants(scope)
            .filter(|&node| self.is_contained(node, range))
            .collect()
    }

    fn is_contained(&self, node: NodeId, range: DomRange) -> bool {
        let (Some(parent), Some(index)) = (self.parent(node), self.index_in_parent(node)) else {
            return false;
        };
        self.compare_points(DomPoint::new(parent, index), range.start) != Ordering::Less
            && self.compare_points(DomPoint::new(parent, index + 1), range.end) != Ordering::Greater
    }

    /// Text nodes with at least one character inside `range`, plus empty
    /// text nodes lying inside it.
    pub fn intersecting_text_nodes(&self, range: DomRange) -> Vec<NodeId> {
        let scope = self.common_ancestor(range.start.node, range.end.node);
        std::iter::once(scope)
            .chain(self.descendants(scope))
            .filter(|&node| self.is_text(node))
            .filter(|&node| {
                let start = DomPoint::new(node, 0);
                let end = DomPoint::new(node, self.node_length(node));
                if start == end {
                    return self.compare_points(start, range.start) != Ordering::Less
                        && self.compare_points(end, range.end) != Ordering::Greater;
                }
                self.compare_points(start, range.end) == Ordering::Less
                    && self.compare_points(end, range.start) == Ordering::Greater
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ns, QName};

    // <office:text><text:p>ab<text:span>cd</text:span></text:p></office:text>
    fn fixture() -> (Tree, NodeId, NodeId, NodeId, NodeId) {
        let mut tree = Tree::new(QName::new(ns::OFFICE, "text"));
        let root = tree.root();
        let p = tree.append_element(root, ns::TEXT, "p").unwrap();
        let ab = tree.create_text("ab");
        tree.append_child(p, ab).unwrap();
        let span = tree.append_element(p, ns::TEXT, "span").unwrap();
        let cd = tree.create_text("cd");
        tree.append_child(span, cd).unwrap();
        (tree, p, ab, span, cd)
    }

    #[test]
    fn test_compare_points_follows_dom_order() {
        let (tree, p, ab, span, cd) = fixture();

        assert_eq!(
            tree.compare_points(DomPoint::new(ab, 2), DomPoint::new(p, 1)),
            Ordering::Less
        );
        assert_eq!(
            tree.compare_points(DomPoint::new(p, 1), DomPoint::new(span, 0)),
            Ordering::Less
        );
        assert_eq!(
            tree.compare_points(DomPoint::new(cd, 2), DomPoint::new(p, 2)),
            Ordering::Less
        );
        assert_eq!(
            tree.compare_points(DomPoint::new(cd, 1), DomPoint::new(cd, 1)),
            Ordering::Equal
        );
    }

    #[test]
    fn test_split_boundaries_inside_single_text_node() {
        let (mut tree, p, ab, _, _) = fixture();
        let range = DomRange::new(DomPoint::new(ab, 1), DomPoint::new(ab, 1));
        let split = tree.split_boundaries(range).unwrap();

        assert_eq!(split.start, DomPoint::new(p, 1));
        assert_eq!(split.end, DomPoint::new(p, 1));
        assert_eq!(tree.text(ab), Some("a"));
    }

    #[test]
    fn test_split_boundaries_across_nodes() {
        let (mut tree, p, ab, span, cd) = fixture();
        let range = DomRange::new(DomPoint::new(ab, 1), DomPoint::new(cd, 1));
        let split = tree.split_boundaries(range).unwrap();

        assert_eq!(split.start, DomPoint::new(p, 1));
        assert_eq!(split.end, DomPoint::new(span, 1));
        assert_eq!(tree.text(cd), Some("c"));

        let contained = tree.contained_nodes(split);
        let texts: Vec<_> = contained.iter().filter_map(|&n| tree.text(n)).collect();
        assert_eq!(texts, vec!["b", "c"]);
    }

    #[test]
    fn test_split_boundaries_ending_at_node_end() {
        let (mut tree, p, ab, _, _) = fixture();
        let range = DomRange::new(DomPoint::new(ab, 1), DomPoint::new(ab, 2));
        let split = tree.split_boundaries(range).unwrap();

        assert_eq!(split.start, DomPoint::new(p, 1));
        assert_eq!(split.end, DomPoint::new(p, 2));
        let texts: Vec<_> = tree.contained_nodes(split).iter().filter_map(|&n| tree.text(n)).collect();
        assert_eq!(texts, vec!["b"]);
    }

    #[test]
    fn test_split_boundaries_ending_at_last_child() {
        let (mut tree, _, _, span, cd) = fixture();
        let range = DomRange::new(DomPoint::new(cd, 1), DomPoint::new(cd, 2));
        let split = tree.split_boundaries(range).unwrap();

        assert_eq!(split.start, DomPoint::new(span, 1));
        assert_eq!(split.end, DomPoint::new(span, 2));
        assert_eq!(tree.text(cd), Some("c"));
    }

    #[test]
    fn test_intersecting_text_nodes_includes_partial() {
        let (tree, _, ab, _, cd) = fixture();
        let range = DomRange::new(DomPoint::new(ab, 1), DomPoint::new(cd, 1));
        assert_eq!(tree.intersecting_text_nodes(range), vec![ab, cd]);

        let collapsed = DomRange::collapsed(DomPoint::new(ab, 2));
        assert!(tree.intersecting_text_nodes(collapsed).is_empty());
    }
}
