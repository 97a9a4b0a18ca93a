use super::{contract, lenient, spec_value, OpBase, Operation};
use crate::cursor::SelectionType;
use crate::document::{OdtDocument, TextNodePosition};
use crate::errors::OperationError;
use crate::odf_utils::{paragraph_element, remove_collapsing, text_elements};
use crate::signals::Signal;
use odfkit_dom::{ns, DomError, NodeId, QName};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertText {
    #[serde(flatten)]
    pub base: OpBase,
    #[serde(deserialize_with = "lenient::int")]
    pub position: usize,
    pub text: String,
    #[serde(default, deserialize_with = "lenient::boolean")]
    pub move_cursor: bool,
}

impl InsertText {
    /// Element standing in for a char that would otherwise collapse.
    fn special_element(document: &mut OdtDocument, ch: char) -> Result<NodeId, DomError> {
        let tree = document.tree_mut();
        if ch == '\t' {
            return Ok(tree.create_element(QName::new(ns::TEXT, "tab")));
        }
        let space = tree.create_element(QName::new(ns::TEXT, "s"));
        let content = tree.create_text(" ");
        tree.append_child(space, content)?;
        Ok(space)
    }

    /// Writes the text at `text_node`/`offset`. Tabs and spaces that a
    /// literal char could not represent (leading, trailing or repeated)
    /// become `text:tab` and `text:s` elements.
    fn insert_pieces(&self, document: &mut OdtDocument, at: TextNodePosition) -> Result<(), DomError> {
        let TextNodePosition { text_node, offset } = at;
        let chars: Vec<char> = self.text.chars().collect();
        let parent = document.tree().parent(text_node).ok_or(DomError::Detached(text_node))?;
        let mut next = document.tree().next_sibling(text_node);
        let mut pending = 0;

        for (i, &ch) in chars.iter().enumerate() {
            let collapsing_space =
                ch == ' ' && (i == 0 || i == chars.len() - 1 || chars[i - 1] == ' ');
            if ch != '\t' && !collapsing_space {
                continue;
            }
            if pending == 0 {
                let tree = document.tree_mut();
                if offset != tree.node_length(text_node) {
                    next = Some(tree.split_text(text_node, offset)?);
                }
                if i > 0 {
                    let head: String = chars[..i].iter().collect();
                    tree.append_data(text_node, &head)?;
                }
            } else if pending < i {
                let piece: String = chars[pending..i].iter().collect();
                let tree = document.tree_mut();
                let node = tree.create_text(piece);
                tree.insert_before(parent, node, next)?;
            }
            pending = i + 1;
            let element = Self::special_element(document, ch)?;
            document.tree_mut().insert_before(parent, element, next)?;
        }

        let tree = document.tree_mut();
        if pending == 0 {
            tree.insert_data(text_node, offset, &self.text)?;
        } else if pending < chars.len() {
            let tail: String = chars[pending..].iter().collect();
            let node = tree.create_text(tail);
            tree.insert_before(parent, node, next)?;
        }
        if tree.node_length(text_node) == 0 {
            tree.remove(text_node)?;
        }
        Ok(())
    }
}

impl Operation for InsertText {
    fn optype(&self) -> &'static str {
        "InsertText"
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
        let paragraph = document
            .paragraph_at_step(self.position)?
            .ok_or_else(|| contract(self.optype(), format!("step {} is not inside a paragraph", self.position)))?;

        document.upgrade_whitespaces_at_position(self.position)?;
        let at = document.get_text_node_at_step(self.position)?;
        let before = document.paragraph_step_count(paragraph);
        self.insert_pieces(document, at)?;
        let inserted = document.paragraph_step_count(paragraph).saturating_sub(before);
        document.steps_inserted(self.position, inserted, Some(member_id));

        if self.move_cursor {
            let end = self.position + inserted;
            if document.move_cursor(member_id, end, 0, SelectionType::Range)? {
                if let Some(signal) = document.cursor_moved_signal(member_id) {
                    document.emit(signal);
                }
            }
        }

        document.downgrade_whitespaces_at_position(self.position)?;
        document.downgrade_whitespaces_at_position(self.position + inserted)?;
        document.fix_cursor_positions()?;
        document.emit(Signal::ParagraphChanged {
            paragraph,
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
pub struct RemoveText {
    #[serde(flatten)]
    pub base: OpBase,
    #[serde(deserialize_with = "lenient::int")]
    pub position: usize,
    /// Negative lengths are rejected on deserialization.
    #[serde(deserialize_with = "lenient::int")]
    pub length: usize,
}

impl RemoveText {
    /// Paragraph holding the whole range, checked before anything changes.
    fn target_paragraph(&self, document: &OdtDocument) -> Result<NodeId, OperationError> {
        let range = document.convert_cursor_to_dom_range(self.position, self.length as i64)?;
        let tree = document.tree();
        let paragraph = paragraph_element(tree, range.start.node)
            .ok_or_else(|| contract(self.optype(), "Attempting to remove text outside a paragraph element"))?;
        if paragraph_element(tree, range.end.node) != Some(paragraph) {
            return Err(contract(
                self.optype(),
                "RemoveText only supports removing elements within the same paragraph",
            ));
        }
        Ok(paragraph)
    }
}

impl Operation for RemoveText {
    fn optype(&self) -> &'static str {
        "RemoveText"
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
        let paragraph = self.target_paragraph(document)?;

        document.upgrade_whitespaces_at_position(self.position)?;
        document.upgrade_whitespaces_at_position(self.position + self.length)?;

        let before = document.paragraph_step_count(paragraph);
        let range = document.convert_cursor_to_dom_range(self.position, self.length as i64)?;
        let range = document.tree_mut().split_boundaries(range)?;
        document.invalidate_steps_from(self.position);

        let elements = text_elements(document.tree(), range, paragraph);
        if self.length > 0 && elements.is_empty() {
            return Err(contract(self.optype(), "No text found in the range to remove"));
        }
        for element in elements {
            if document.tree().parent(element).is_none() {
                warn!(node = %element, "Text element was already removed from its container");
                continue;
            }
            remove_collapsing(document.tree_mut(), element)?;
        }

        let removed = before.saturating_sub(document.paragraph_step_count(paragraph));
        document.steps_removed(self.position, removed);
        document.downgrade_whitespaces_at_position(self.position)?;
        document.fix_cursor_positions()?;
        document.emit(Signal::ParagraphChanged {
            paragraph,
            member_id: member_id.to_string(),
            timestamp: self.base.timestamp,
        });

        if let Some(cursor) = document.get_cursor_mut(member_id) {
            cursor.selection_type = SelectionType::Range;
            if let Some(signal) = document.cursor_moved_signal(member_id) {
                document.emit(signal);
            }
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
    use crate::errors::OperationError;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn insert(position: usize, text: &str) -> InsertText {
        InsertText {
            base: OpBase::new("alice"),
            position,
            text: text.to_string(),
            move_cursor: false,
        }
    }

    fn remove(position: usize, length: usize) -> RemoveText {
        RemoveText {
            base: OpBase::new("alice"),
            position,
            length,
        }
    }

    fn body_text(document: &OdtDocument) -> String {
        document.tree().text_content(document.body())
    }

    fn paragraph_layout(document: &OdtDocument) -> String {
        let tree = document.tree();
        let paragraph = tree.find_element(document.body(), ns::TEXT, "p").unwrap();
        tree.children(paragraph)
            .iter()
            .map(|&child| match tree.text(child) {
                Some(text) => text.to_string(),
                None => format!("[{}]", tree.name(child).unwrap().local),
            })
            .collect()
    }

    #[test]
    fn test_insert_into_empty_paragraph() {
        let mut document = document("<text:p/>");
        assert_eq!(document.step_count(), 0);

        assert!(insert(0, "AB").execute(&mut document).unwrap());

        assert_eq!(document.step_count(), 2);
        assert_eq!(body_text(&document), "AB");
        let first = document.convert_steps_to_dom_point(1).unwrap();
        let second = document.convert_steps_to_dom_point(2).unwrap();
        assert_eq!(first.node, second.node);
        assert_eq!((first.offset, second.offset), (1, 2));
    }

    #[test]
    fn test_insert_then_remove_first_char() {
        let mut document = document("<text:p/>");
        insert(0, "AB").execute(&mut document).unwrap();

        assert!(remove(0, 1).execute(&mut document).unwrap());

        assert_eq!(document.step_count(), 1);
        assert_eq!(body_text(&document), "B");
    }

    #[test]
    fn test_insert_preserves_collapsing_spaces() {
        let mut document = document("<text:p>ab</text:p>");
        insert(1, "  x\t").execute(&mut document).unwrap();

        // the first space has solid neighbours again and turns literal
        assert_eq!(paragraph_layout(&document), "a [s]x[tab]b");
        assert_eq!(document.step_count(), 6);
    }

    #[test]
    fn test_insert_moves_authors_cursor_only() {
        let mut document = document("<text:p>abc</text:p>");
        document.add_cursor("alice").unwrap();
        document.add_cursor("bob").unwrap();
        document.move_cursor("alice", 1, 0, SelectionType::Range).unwrap();
        document.move_cursor("bob", 2, 0, SelectionType::Range).unwrap();

        insert(1, "xy").execute(&mut document).unwrap();

        assert_eq!(document.get_cursor_position("alice"), 3);
        assert_eq!(document.get_cursor_position("bob"), 4);
        assert_eq!(body_text(&document), "axybc");
    }

    #[test]
    fn test_move_cursor_flag_collapses_after_insert() {
        let mut document = document("<text:p>abc</text:p>");
        document.add_cursor("alice").unwrap();
        document.move_cursor("alice", 0, 3, SelectionType::Range).unwrap();
        let op: InsertText = serde_json::from_value(json!({
            "memberid": "alice",
            "timestamp": 3,
            "position": "3",
            "text": "d",
            "moveCursor": "true"
        }))
        .unwrap();

        op.execute(&mut document).unwrap();

        let cursor = document.get_cursor("alice").unwrap();
        assert_eq!((cursor.anchor, cursor.focus), (4, 4));
    }

    #[test]
    fn test_remove_across_paragraphs_is_rejected_untouched() {
        let mut document = document("<text:p>ab</text:p><text:p>cd</text:p>");
        let before = document.to_xml();

        let result = remove(1, 3).execute(&mut document);

        assert!(matches!(result, Err(OperationError::ContractViolation { .. })));
        assert_eq!(document.to_xml(), before);
    }

    #[test]
    fn test_remove_drops_emptied_span_and_shifts_cursors() {
        let mut document = document("<text:p>a<text:span>bc</text:span>d</text:p>");
        document.add_cursor("bob").unwrap();
        document.move_cursor("bob", 4, 0, SelectionType::Range).unwrap();

        remove(1, 2).execute(&mut document).unwrap();

        assert_eq!(body_text(&document), "ad");
        assert!(!document.to_xml().contains("text:span"));
        assert_eq!(document.get_cursor_position("bob"), 2);
    }

    #[test]
    fn test_remove_tail_of_text_node() {
        let mut document = document("<text:p>abcd</text:p>");

        assert!(remove(2, 2).execute(&mut document).unwrap());

        assert_eq!(body_text(&document), "ab");
        assert_eq!(document.step_count(), 2);
    }

    #[test]
    fn test_backspace_at_paragraph_end() {
        let mut document = document("<text:p>abcd</text:p>");
        document.add_cursor("bob").unwrap();
        document.move_cursor("bob", 4, 0, SelectionType::Range).unwrap();

        remove(3, 1).execute(&mut document).unwrap();

        assert_eq!(body_text(&document), "abc");
        assert_eq!(document.step_count(), 3);
        assert_eq!(document.get_cursor_position("bob"), 3);
    }

    #[test]
    fn test_negative_remove_length_fails_to_parse() {
        let result: Result<RemoveText, _> = serde_json::from_value(json!({
            "memberid": "alice",
            "timestamp": 0,
            "position": 2,
            "length": -1
        }));
        assert!(result.is_err());
    }
}
