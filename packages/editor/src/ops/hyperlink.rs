use super::{contract, lenient, spec_value, OpBase, Operation};
use crate::document::OdtDocument;
use crate::errors::OperationError;
use crate::odf_utils::{hyperlink_ancestor, is_hyperlink, is_walkable_text, paragraph_element, text_nodes};
use crate::signals::Signal;
use odfkit_dom::{ns, DomError, DomRange, NodeId, QName, Tree};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Links wrapping text touched by `range` plus links lying inside it.
fn hyperlinks_in(tree: &Tree, range: DomRange) -> Vec<NodeId> {
    let mut links = Vec::new();
    let wrapping = tree.intersecting_text_nodes(range).into_iter().filter_map(|node| {
        let paragraph = paragraph_element(tree, node)?;
        hyperlink_ancestor(tree, node, paragraph)
    });
    let contained = tree
        .contained_nodes(range)
        .into_iter()
        .filter(|&node| is_hyperlink(tree, node));
    for link in wrapping.chain(contained) {
        if !links.contains(&link) {
            links.push(link);
        }
    }
    links
}

fn first_step(position: usize, length: i64) -> usize {
    (position as i64 + length.min(0)).max(0) as usize
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplyHyperlink {
    #[serde(flatten)]
    pub base: OpBase,
    #[serde(deserialize_with = "lenient::int")]
    pub position: usize,
    #[serde(deserialize_with = "lenient::int")]
    pub length: i64,
    pub hyperlink: String,
}

impl ApplyHyperlink {
    fn create_link(&self, tree: &mut Tree) -> Result<NodeId, DomError> {
        let link = tree.create_element(QName::new(ns::TEXT, "a"));
        tree.set_attribute(link, QName::new(ns::XLINK, "type"), "simple")?;
        tree.set_attribute(link, QName::new(ns::XLINK, "href"), self.hyperlink.as_str())?;
        Ok(link)
    }
}

impl Operation for ApplyHyperlink {
    fn optype(&self) -> &'static str {
        "ApplyHyperlink"
    }

    fn base(&self) -> &OpBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut OpBase {
        &mut self.base
    }

    fn is_edit(&self) -> bool {
        true
    }

    fn execute(&self, document: &mut OdtDocument) -> Result<bool, OperationError> {
        let range = document.convert_cursor_to_dom_range(self.position, self.length)?;
        if range.is_collapsed() {
            return Ok(false);
        }
        let touched: Vec<NodeId> = {
            let tree = document.tree();
            tree.intersecting_text_nodes(range)
                .into_iter()
                .filter(|&node| is_walkable_text(tree, node) && tree.node_length(node) > 0)
                .filter(|&node| paragraph_element(tree, node).is_some())
                .collect()
        };
        if touched.is_empty() {
            return Ok(false);
        }
        let tree = document.tree();
        let linked = touched.iter().any(|&node| {
            paragraph_element(tree, node).map_or(false, |paragraph| hyperlink_ancestor(tree, node, paragraph).is_some())
        });
        if linked {
            return Err(contract(self.optype(), "The given range should not contain any link."));
        }

        let range = document.tree_mut().split_boundaries(range)?;
        let nodes = text_nodes(document.tree(), range);
        let mut paragraphs = Vec::new();
        for node in nodes {
            let tree = document.tree_mut();
            let parent = tree.parent(node).ok_or(DomError::Detached(node))?;
            let link = self.create_link(tree)?;
            tree.insert_before(parent, link, Some(node))?;
            tree.append_child(link, node)?;
            if let Some(paragraph) = paragraph_element(tree, node) {
                if !paragraphs.contains(&paragraph) {
                    paragraphs.push(paragraph);
                }
            }
        }
        document.invalidate_steps_from(first_step(self.position, self.length));

        document.fix_cursor_positions()?;
        for paragraph in paragraphs {
            document.emit(Signal::ParagraphChanged {
                paragraph,
                member_id: self.base.memberid.clone(),
                timestamp: self.base.timestamp,
            });
        }
        Ok(true)
    }

    fn spec(&self) -> Value {
        spec_value(self.optype(), self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoveHyperlink {
    #[serde(flatten)]
    pub base: OpBase,
    #[serde(deserialize_with = "lenient::int")]
    pub position: usize,
    #[serde(deserialize_with = "lenient::int")]
    pub length: i64,
}

impl Operation for RemoveHyperlink {
    fn optype(&self) -> &'static str {
        "RemoveHyperlink"
    }

    fn base(&self) -> &OpBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut OpBase {
        &mut self.base
    }

    fn is_edit(&self) -> bool {
        true
    }

    fn execute(&self, document: &mut OdtDocument) -> Result<bool, OperationError> {
        let range = document.convert_cursor_to_dom_range(self.position, self.length)?;
        let links = hyperlinks_in(document.tree(), range);
        let &[link] = links.as_slice() else {
            return Err(contract(
                self.optype(),
                format!("The given range should only contain a single link, found {}.", links.len()),
            ));
        };

        let parent = document.tree_mut().merge_into_parent(link)?;
        document.invalidate_steps_from(first_step(self.position, self.length));
        document.fix_cursor_positions()?;
        if let Some(paragraph) = paragraph_element(document.tree(), parent) {
            document.emit(Signal::ParagraphChanged {
                paragraph,
                member_id: self.base.memberid.clone(),
                timestamp: self.base.timestamp,
            });
        }
        Ok(true)
    }

    fn spec(&self) -> Value {
        spec_value(self.optype(), self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::tests::document;
    use pretty_assertions::assert_eq;

    fn apply(position: usize, length: i64) -> ApplyHyperlink {
        ApplyHyperlink {
            base: OpBase::new("alice"),
            position,
            length,
            hyperlink: "http://x".to_string(),
        }
    }

    fn remove(position: usize, length: i64) -> RemoveHyperlink {
        RemoveHyperlink {
            base: OpBase::new("alice"),
            position,
            length,
        }
    }

    #[test]
    fn test_apply_then_remove_link() {
        let mut document = document("<text:p>AB</text:p>");

        assert!(apply(0, 2).execute(&mut document).unwrap());
        let link = document.tree().find_element(document.body(), ns::TEXT, "a").unwrap();
        assert_eq!(document.tree().attribute(link, ns::XLINK, "href"), Some("http://x"));
        assert_eq!(document.step_count(), 2);

        assert!(remove(0, 2).execute(&mut document).unwrap());
        assert_eq!(document.tree().find_element(document.body(), ns::TEXT, "a"), None);
        assert_eq!(document.tree().text_content(document.body()), "AB");
    }

    #[test]
    fn test_apply_to_tail_of_text_node() {
        let mut document = document("<text:p>abcd</text:p>");

        assert!(apply(2, 2).execute(&mut document).unwrap());

        let tree = document.tree();
        let link = tree.find_element(document.body(), ns::TEXT, "a").unwrap();
        assert_eq!(tree.text_content(link), "cd");
        assert_eq!(tree.text_content(document.body()), "abcd");
        assert_eq!(document.step_count(), 4);
    }

    #[test]
    fn test_apply_over_existing_link_is_rejected() {
        let mut document = document("<text:p>abcd</text:p>");
        apply(1, 2).execute(&mut document).unwrap();

        let result = apply(0, 3).execute(&mut document);
        assert!(matches!(result, Err(OperationError::ContractViolation { .. })));
    }

    #[test]
    fn test_apply_without_text_is_soft_failure() {
        let mut document = document("<text:p>ab</text:p>");
        assert!(!apply(1, 0).execute(&mut document).unwrap());
        assert_eq!(document.tree().find_element(document.body(), ns::TEXT, "a"), None);
    }

    #[test]
    fn test_remove_needs_exactly_one_link() {
        let mut document = document("<text:p>abcd</text:p>");
        assert!(remove(0, 4).execute(&mut document).is_err());

        apply(0, 1).execute(&mut document).unwrap();
        apply(3, 1).execute(&mut document).unwrap();
        assert!(remove(0, 4).execute(&mut document).is_err());
        assert!(remove(1, -1).execute(&mut document).unwrap());
    }
}
