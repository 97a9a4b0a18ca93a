use super::{contract, lenient, spec_value, OpBase, Operation};
use crate::cursor::SelectionType;
use crate::document::OdtDocument;
use crate::errors::OperationError;
use crate::metadata::format_timestamp;
use crate::odf_utils::{inline_root, paragraph_element};
use crate::signals::Signal;
use crate::steps_translator::Rounding;
use odfkit_dom::{ns, DomError, DomPoint, NodeId, QName, Tree};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddAnnotation {
    #[serde(flatten)]
    pub base: OpBase,
    #[serde(deserialize_with = "lenient::int")]
    pub position: usize,
    #[serde(default, deserialize_with = "lenient::int")]
    pub length: usize,
    pub name: String,
}

impl AddAnnotation {
    /// `office:annotation` carrying creator, date and one empty paragraph.
    fn create_annotation(&self, tree: &mut Tree, creator: &str) -> Result<NodeId, DomError> {
        let annotation = tree.create_element(QName::new(ns::OFFICE, "annotation"));
        tree.set_attribute(annotation, QName::new(ns::OFFICE, "name"), self.name.as_str())?;

        let dc_creator = tree.append_element(annotation, ns::DC, "creator")?;
        tree.set_attribute(dc_creator, QName::new(ns::EDITINFO, "memberid"), self.base.memberid.as_str())?;
        tree.set_text_content(dc_creator, creator)?;
        let dc_date = tree.append_element(annotation, ns::DC, "date")?;
        tree.set_text_content(dc_date, &format_timestamp(self.base.timestamp))?;

        let list = tree.append_element(annotation, ns::TEXT, "list")?;
        let item = tree.append_element(list, ns::TEXT, "list-item")?;
        tree.append_element(item, ns::TEXT, "p")?;
        Ok(annotation)
    }

    fn create_annotation_end(&self, tree: &mut Tree) -> Result<NodeId, DomError> {
        let end = tree.create_element(QName::new(ns::OFFICE, "annotation-end"));
        tree.set_attribute(end, QName::new(ns::OFFICE, "name"), self.name.as_str())?;
        Ok(end)
    }
}

impl Operation for AddAnnotation {
    fn optype(&self) -> &'static str {
        "AddAnnotation"
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
        let Some(host) = document.paragraph_at_step(self.position)? else {
            return Err(contract(self.optype(), format!("No paragraph at step {}.", self.position)));
        };
        let creator = document
            .get_member(member_id)
            .map(|member| member.properties.full_name.clone())
            .unwrap_or_default();
        let before = document.paragraph_step_count(host);

        if self.length > 0 {
            let end = self.create_annotation_end(document.tree_mut())?;
            document.insert_node_at_step(self.position + self.length, end)?;
        }
        let annotation = self.create_annotation(document.tree_mut(), &creator)?;
        document.insert_node_at_step(self.position, annotation)?;

        let inserted = document.paragraph_step_count(host).saturating_sub(before);
        document.steps_inserted(self.position, inserted, None);
        debug!(name = %self.name, position = self.position, inserted, "Added annotation");

        if document.move_cursor(member_id, self.position + 1, 0, SelectionType::Range)? {
            if let Some(signal) = document.cursor_moved_signal(member_id) {
                document.emit(signal);
            }
        }
        document.fix_cursor_positions()?;
        document.emit(Signal::AnnotationAdded {
            member_id: member_id.to_string(),
            annotation,
        });
        Ok(true)
    }

    fn spec(&self) -> Value {
        spec_value(self.optype(), self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoveAnnotation {
    #[serde(flatten)]
    pub base: OpBase,
    #[serde(deserialize_with = "lenient::int")]
    pub position: usize,
    #[serde(default, deserialize_with = "lenient::int")]
    pub length: usize,
}

impl Operation for RemoveAnnotation {
    fn optype(&self) -> &'static str {
        "RemoveAnnotation"
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
        let Some(annotation) = inline_root(document.tree(), point.node) else {
            return Ok(false);
        };
        let tree = document.tree();
        let parent = tree.parent(annotation).ok_or(DomError::Detached(annotation))?;
        let index = tree.index_in_parent(annotation).ok_or(DomError::Detached(annotation))?;
        let host = paragraph_element(tree, parent);
        let name = tree.attribute(annotation, ns::OFFICE, "name").map(str::to_string);
        let end = name.as_deref().and_then(|name| {
            tree.descendants(document.body()).find(|&node| {
                tree.is_named(node, ns::OFFICE, "annotation-end")
                    && tree.attribute(node, ns::OFFICE, "name") == Some(name)
            })
        });

        let first = document.convert_dom_point_to_steps(DomPoint::new(parent, index), Rounding::Previous)?;
        let last = document.convert_dom_point_to_steps(DomPoint::new(parent, index + 1), Rounding::Previous)?;

        document.tree_mut().remove(annotation)?;
        if let Some(end) = end {
            document.tree_mut().remove(end)?;
        }
        let removed = last.saturating_sub(first);
        document.steps_removed(first, removed);
        debug!(name = ?name, removed, "Removed annotation");

        document.fix_cursor_positions()?;
        if let Some(paragraph) = host {
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
