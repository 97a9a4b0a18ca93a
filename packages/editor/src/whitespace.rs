//! Significant whitespace normalization around an edit point.
//!
//! Literal spaces collapse depending on their neighbours, so before an
//! edit the visible spaces left of the two steps at the edit point are
//! turned into `text:s` elements, and after the edit any `text:s` there
//! that can safely be a literal space again is turned back.

use crate::document::OdtDocument;
use crate::errors::OperationError;
use crate::odf_utils::{is_downgradable_space_element, is_odf_whitespace, is_walkable_text};
use odfkit_dom::{ns, DomError, DomPoint, NodeId, QName};

impl OdtDocument {
    /// Point of the step following `point`, if any.
    fn next_step_point(&self, point: DomPoint) -> Result<Option<DomPoint>, OperationError> {
        let mut iterator = self.root_step_iterator();
        iterator.set_position(point.node, point.offset)?;
        Ok(iterator.next_step().then(|| iterator.point()))
    }

    /// Replaces the whitespace character at `offset` with a `text:s`
    /// holding a single space and returns the new element.
    fn upgrade_whitespace_to_element(&mut self, text_node: NodeId, offset: usize) -> Result<NodeId, OperationError> {
        let tree = self.tree_mut();
        let parent = tree.parent(text_node).ok_or(DomError::Detached(text_node))?;
        let space = tree.create_element(QName::new(ns::TEXT, "s"));
        let content = tree.create_text(" ");
        tree.append_child(space, content)?;

        tree.delete_data(text_node, offset, 1)?;
        let reference = if offset == 0 {
            Some(text_node)
        } else if offset < tree.node_length(text_node) {
            Some(tree.split_text(text_node, offset)?)
        } else {
            tree.next_sibling(text_node)
        };
        tree.insert_before(parent, space, reference)?;
        if tree.node_length(text_node) == 0 {
            tree.remove(text_node)?;
        }
        Ok(space)
    }

    /// Turns visible literal whitespace left of `step` and left of the
    /// following step into `text:s` elements.
    pub fn upgrade_whitespaces_at_position(&mut self, step: usize) -> Result<(), OperationError> {
        let mut point = self.convert_steps_to_dom_point(step)?;
        for remaining in (0..2).rev() {
            let left_whitespace = point.offset > 0
                && is_walkable_text(self.tree(), point.node)
                && self
                    .tree()
                    .text(point.node)
                    .and_then(|text| text.chars().nth(point.offset - 1))
                    .map_or(false, is_odf_whitespace);
            if left_whitespace {
                let space = self.upgrade_whitespace_to_element(point.node, point.offset - 1)?;
                self.invalidate_steps_from(step);
                let tree = self.tree();
                let parent = tree.parent(space).ok_or(DomError::Detached(space))?;
                let index = tree.index_in_parent(space).ok_or(DomError::Detached(space))?;
                point = DomPoint::new(parent, index + 1);
            }
            if remaining == 0 {
                break;
            }
            match self.next_step_point(point)? {
                Some(next) => point = next,
                None => break,
            }
        }
        Ok(())
    }

    /// Turns `text:s` elements left of `step` and left of the following
    /// step back into literal spaces where that does not change rendering.
    pub fn downgrade_whitespaces_at_position(&mut self, step: usize) -> Result<(), OperationError> {
        let mut point = self.convert_steps_to_dom_point(step)?;
        for remaining in (0..2).rev() {
            let tree = self.tree();
            let left = if tree.is_text(point.node) {
                if point.offset == 0 {
                    tree.previous_sibling(point.node)
                } else {
                    None
                }
            } else {
                point
                    .offset
                    .checked_sub(1)
                    .and_then(|index| tree.child(point.node, index))
            };
            if let Some(space) = left.filter(|&node| is_downgradable_space_element(tree, node)) {
                let tree = self.tree_mut();
                let parent = tree.parent(space).ok_or(DomError::Detached(space))?;
                let literal = tree.create_text(" ");
                tree.insert_before(parent, literal, Some(space))?;
                tree.remove(space)?;
                let (merged, shift) = tree.merge_adjacent_text(literal)?;
                self.invalidate_steps_from(step);
                point = DomPoint::new(merged, shift + 1);
            }
            if remaining == 0 {
                break;
            }
            match self.next_step_point(point)? {
                Some(next) => point = next,
                None => break,
            }
        }
        Ok(())
    }
}
