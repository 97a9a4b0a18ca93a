use super::{contract, lenient, spec_value, OpBase, Operation};
use crate::cursor::SelectionType;
use crate::document::{OdtDocument, TextNodePosition};
use crate::errors::OperationError;
use crate::odf_utils::{
    is_odf_whitespace, next_character, paragraph_element, previous_character, remove_collapsing, Character,
};
use crate::signals::Signal;
use odfkit_dom::{ns, DomError, DomPoint, DomResult, NodeId, QName, Tree};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sets `text:style-name` on a paragraph, or removes it for an empty name.
fn set_paragraph_style(tree: &mut Tree, paragraph: NodeId, style_name: &str) -> DomResult<()> {
    if style_name.is_empty() {
        tree.remove_attribute(paragraph, ns::TEXT, "style-name");
        Ok(())
    } else {
        tree.set_attribute(paragraph, QName::new(ns::TEXT, "style-name"), style_name)
    }
}

/// Splits every element from `parent` up to `paragraph` in front of
/// `reference` (`None` = after the last child). Returns the new paragraph
/// that receives the tail.
fn split_up_to_paragraph(
    tree: &mut Tree,
    paragraph: NodeId,
    mut parent: NodeId,
    mut reference: Option<NodeId>,
) -> DomResult<NodeId> {
    loop {
        let grandparent = tree.parent(parent).ok_or(DomError::Detached(parent))?;
        if parent != paragraph {
            // no copy is needed when the cut falls on an edge of `parent`
            match reference {
                None => {
                    reference = tree.next_sibling(parent);
                    parent = grandparent;
                    continue;
                }
                Some(node) if tree.first_child(parent) == Some(node) => {
                    reference = Some(parent);
                    parent = grandparent;
                    continue;
                }
                Some(_) => {}
            }
        }

        let copy = tree.clone_shallow(parent)?;
        let moved = match reference {
            Some(node) => {
                let index = tree.index_in_parent(node).ok_or(DomError::Detached(node))?;
                tree.children(parent)[index..].to_vec()
            }
            None => Vec::new(),
        };
        for node in moved {
            tree.append_child(copy, node)?;
        }
        let after = tree.next_sibling(parent);
        tree.insert_before(grandparent, copy, after)?;
        if parent == paragraph {
            return Ok(copy);
        }
        reference = Some(copy);
        parent = grandparent;
    }
}

/// Deletes literal whitespace at the end (or start) of `paragraph`. It
/// renders nothing there, but would become visible after a merge.
fn trim_collapsed_whitespace(tree: &mut Tree, paragraph: NodeId, at_end: bool) -> DomResult<()> {
    loop {
        let character = if at_end {
            previous_character(tree, DomPoint::new(paragraph, tree.node_length(paragraph)), paragraph)
        } else {
            next_character(tree, DomPoint::new(paragraph, 0), paragraph)
        };
        let Some(Character::Text { node, offset, ch }) = character else {
            return Ok(());
        };
        if !is_odf_whitespace(ch) {
            return Ok(());
        }
        tree.delete_data(node, offset, 1)?;
        if tree.node_length(node) == 0 {
            remove_collapsing(tree, node)?;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitParagraph {
    #[serde(flatten)]
    pub base: OpBase,
    #[serde(deserialize_with = "lenient::int")]
    pub position: usize,
    #[serde(deserialize_with = "lenient::int")]
    pub source_paragraph_position: usize,
    #[serde(default)]
    pub paragraph_style_name: String,
    #[serde(default, deserialize_with = "lenient::boolean")]
    pub move_cursor: bool,
}

impl Operation for SplitParagraph {
    fn optype(&self) -> &'static str {
        "SplitParagraph"
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
        let member_id = self.base.memberid.as_str();
        let Some(paragraph) = document.paragraph_at_step(self.position)? else {
            return Ok(false);
        };
        if document.paragraph_start_step(paragraph)? != self.source_paragraph_position {
            return Err(contract(
                self.optype(),
                format!(
                    "paragraph containing step {} does not start at {}",
                    self.position, self.source_paragraph_position
                ),
            ));
        }

        document.upgrade_whitespaces_at_position(self.position)?;
        let before = document.paragraph_step_count(paragraph);
        let TextNodePosition { text_node, offset } = document.get_text_node_at_step(self.position)?;

        let tree = document.tree_mut();
        let parent = tree.parent(text_node).ok_or(DomError::Detached(text_node))?;
        let reference = if offset == 0 {
            Some(text_node)
        } else if offset < tree.node_length(text_node) {
            Some(tree.split_text(text_node, offset)?)
        } else {
            tree.next_sibling(text_node)
        };
        let new_paragraph = split_up_to_paragraph(tree, paragraph, parent, reference)?;
        if tree.node_length(text_node) == 0 && tree.parent(text_node).is_some() {
            tree.remove(text_node)?;
        }
        set_paragraph_style(tree, new_paragraph, &self.paragraph_style_name)?;

        let after = document.paragraph_step_count(paragraph) + document.paragraph_step_count(new_paragraph);
        document.steps_inserted(self.position, after.saturating_sub(before), None);

        if self.move_cursor && document.move_cursor(member_id, self.position + 1, 0, SelectionType::Range)? {
            if let Some(signal) = document.cursor_moved_signal(member_id) {
                document.emit(signal);
            }
        }
        document.fix_cursor_positions()?;
        for changed in [paragraph, new_paragraph] {
            document.emit(Signal::ParagraphChanged {
                paragraph: changed,
                member_id: member_id.to_string(),
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
#[serde(rename_all = "camelCase")]
pub struct MergeParagraph {
    #[serde(flatten)]
    pub base: OpBase,
    #[serde(deserialize_with = "lenient::int")]
    pub destination_start_position: usize,
    #[serde(deserialize_with = "lenient::int")]
    pub source_start_position: usize,
    #[serde(default)]
    pub paragraph_style_name: String,
    #[serde(default, deserialize_with = "lenient::boolean")]
    pub move_cursor: bool,
}

impl MergeParagraph {
    /// Paragraph whose first step is `step`.
    fn paragraph_starting_at(&self, document: &OdtDocument, step: usize) -> Result<NodeId, OperationError> {
        let paragraph = document
            .paragraph_at_step(step)?
            .ok_or_else(|| contract(self.optype(), format!("step {} is not inside a paragraph", step)))?;
        if document.paragraph_start_step(paragraph)? != step {
            return Err(contract(
                self.optype(),
                format!("step {} is not the first step of its paragraph", step),
            ));
        }
        Ok(paragraph)
    }
}

impl Operation for MergeParagraph {
    fn optype(&self) -> &'static str {
        "MergeParagraph"
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
        let member_id = self.base.memberid.as_str();
        let destination = self.paragraph_starting_at(document, self.destination_start_position)?;
        let source = self.paragraph_starting_at(document, self.source_start_position)?;
        let joint = self
            .source_start_position
            .checked_sub(1)
            .ok_or_else(|| contract(self.optype(), "source paragraph is the first paragraph"))?;
        if source == destination || document.paragraph_at_step(joint)? != Some(destination) {
            return Err(contract(
                self.optype(),
                "source paragraph does not directly follow the destination",
            ));
        }

        let before = document.paragraph_step_count(destination) + document.paragraph_step_count(source);
        let body = document.body();
        let tree = document.tree_mut();
        trim_collapsed_whitespace(tree, destination, true)?;
        trim_collapsed_whitespace(tree, source, false)?;

        for child in tree.children(source).to_vec() {
            tree.append_child(destination, child)?;
        }
        let mut container = tree.parent(source);
        tree.remove(source)?;
        while let Some(current) = container.filter(|&node| node != body && tree.children(node).is_empty()) {
            container = tree.parent(current);
            tree.remove(current)?;
        }
        set_paragraph_style(tree, destination, &self.paragraph_style_name)?;

        let removed = before.saturating_sub(document.paragraph_step_count(destination));
        document.steps_removed(joint, removed);

        if self.move_cursor && document.move_cursor(member_id, joint, 0, SelectionType::Range)? {
            if let Some(signal) = document.cursor_moved_signal(member_id) {
                document.emit(signal);
            }
        }
        document.fix_cursor_positions()?;
        document.emit(Signal::ParagraphChanged {
            paragraph: destination,
            member_id: member_id.to_string(),
            timestamp: self.base.timestamp,
        });
        Ok(true)
    }

    fn spec(&self) -> Value {
        spec_value(self.optype(), self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetParagraphStyle {
    #[serde(flatten)]
    pub base: OpBase,
    #[serde(deserialize_with = "lenient::int")]
    pub position: usize,
    #[serde(default)]
    pub style_name: String,
}

impl Operation for SetParagraphStyle {
    fn optype(&self) -> &'static str {
        "SetParagraphStyle"
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
        let point = document.convert_steps_to_dom_point(self.position)?;
        let Some(paragraph) = paragraph_element(document.tree(), point.node) else {
            return Ok(false);
        };
        if document.paragraph_start_step(paragraph)? != self.position {
            return Err(contract(
                self.optype(),
                "SetParagraphStyle position should be the first position in the paragraph",
            ));
        }

        set_paragraph_style(document.tree_mut(), paragraph, &self.style_name)?;
        document.emit(Signal::ParagraphChanged {
            paragraph,
            member_id: self.base.memberid.clone(),
            timestamp: self.base.timestamp,
        });
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

    fn paragraph_texts(document: &OdtDocument) -> Vec<String> {
        let tree = document.tree();
        tree.descendants(document.body())
            .filter(|&node| tree.is_named(node, ns::TEXT, "p"))
            .map(|node| tree.text_content(node))
            .collect()
    }

    fn split(position: usize, source: usize) -> SplitParagraph {
        SplitParagraph {
            base: OpBase::new("alice"),
            position,
            source_paragraph_position: source,
            paragraph_style_name: String::new(),
            move_cursor: true,
        }
    }

    fn merge(destination: usize, source: usize) -> MergeParagraph {
        MergeParagraph {
            base: OpBase::new("alice"),
            destination_start_position: destination,
            source_start_position: source,
            paragraph_style_name: String::new(),
            move_cursor: false,
        }
    }

    #[test]
    fn test_split_adds_one_step() {
        let mut document = document("<text:p>abcd</text:p>");
        document.add_cursor("alice").unwrap();
        document.move_cursor("alice", 2, 0, SelectionType::Range).unwrap();

        assert!(split(2, 0).execute(&mut document).unwrap());

        assert_eq!(paragraph_texts(&document), vec!["ab", "cd"]);
        assert_eq!(document.step_count(), 5);
        assert_eq!(document.get_cursor_position("alice"), 3);
    }

    #[test]
    fn test_split_copies_spans_and_drops_paragraph_style() {
        let mut document = document(
            r#"<text:p text:style-name="P1">a<text:span text:style-name="T1">bc</text:span></text:p>"#,
        );

        split(2, 0).execute(&mut document).unwrap();

        let tree = document.tree();
        let paragraphs: Vec<NodeId> = tree
            .children(document.body())
            .iter()
            .copied()
            .filter(|&node| tree.is_named(node, ns::TEXT, "p"))
            .collect();
        assert_eq!(tree.attribute(paragraphs[0], ns::TEXT, "style-name"), Some("P1"));
        assert_eq!(tree.attribute(paragraphs[1], ns::TEXT, "style-name"), None);
        let span = tree.first_child(paragraphs[1]).unwrap();
        assert_eq!(tree.attribute(span, ns::TEXT, "style-name"), Some("T1"));
        assert_eq!(paragraph_texts(&document), vec!["ab", "c"]);
    }

    #[test]
    fn test_split_at_paragraph_end_creates_empty_paragraph() {
        let mut document = document("<text:p>ab</text:p>");
        split(2, 0).execute(&mut document).unwrap();
        assert_eq!(paragraph_texts(&document), vec!["ab", ""]);
        assert_eq!(document.step_count(), 3);
    }

    #[test]
    fn test_split_with_wrong_source_is_rejected() {
        let mut document = document("<text:p>ab</text:p><text:p>cd</text:p>");
        let result = split(4, 0).execute(&mut document);
        assert!(matches!(result, Err(OperationError::ContractViolation { .. })));
    }

    #[test]
    fn test_merge_removes_one_step() {
        let mut document = document("<text:p>ab</text:p><text:p>cd</text:p>");
        document.add_cursor("bob").unwrap();
        document.move_cursor("bob", 4, 0, SelectionType::Range).unwrap();

        assert!(merge(0, 3).execute(&mut document).unwrap());

        assert_eq!(paragraph_texts(&document), vec!["abcd"]);
        assert_eq!(document.step_count(), 4);
        assert_eq!(document.get_cursor_position("bob"), 3);
    }

    #[test]
    fn test_merge_trims_collapsed_whitespace() {
        let mut document = document("<text:p>ab </text:p><text:p> cd</text:p>");
        merge(0, 3).execute(&mut document).unwrap();
        assert_eq!(paragraph_texts(&document), vec!["abcd"]);
        assert_eq!(document.step_count(), 4);
    }

    #[test]
    fn test_merge_collapses_emptied_list_item() {
        let mut document = document(
            "<text:list><text:list-item><text:p>ab</text:p></text:list-item><text:list-item><text:p>cd</text:p></text:list-item></text:list>",
        );
        merge(0, 3).execute(&mut document).unwrap();
        assert_eq!(document.to_xml().matches("<text:list-item>").count(), 1);
    }

    #[test]
    fn test_merge_requires_adjacent_paragraphs() {
        let mut document = document("<text:p>ab</text:p><text:p>cd</text:p><text:p>ef</text:p>");
        let result = merge(0, 6).execute(&mut document);
        assert!(matches!(result, Err(OperationError::ContractViolation { .. })));
    }

    #[test]
    fn test_set_paragraph_style_requires_first_step() {
        let mut document = document("<text:p>ab</text:p>");
        let mut op = SetParagraphStyle {
            base: OpBase::new("alice"),
            position: 1,
            style_name: "Heading".to_string(),
        };
        assert!(op.execute(&mut document).is_err());

        op.position = 0;
        assert!(op.execute(&mut document).unwrap());
        let p = document.tree().find_element(document.body(), ns::TEXT, "p").unwrap();
        assert_eq!(document.tree().attribute(p, ns::TEXT, "style-name"), Some("Heading"));
    }
}
