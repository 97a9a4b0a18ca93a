use super::{lenient, spec_value, OpBase, Operation};
use crate::document::OdtDocument;
use crate::errors::OperationError;
use crate::signals::Signal;
use odfkit_dom::{ns, DomError, NodeId, QName, Tree};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Inserts an image frame anchored as a character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertImage {
    #[serde(flatten)]
    pub base: OpBase,
    #[serde(deserialize_with = "lenient::int")]
    pub position: usize,
    pub filename: String,
    /// Length with unit, e.g. `2cm`.
    pub frame_width: String,
    pub frame_height: String,
    pub frame_style_name: String,
    pub frame_name: String,
}

impl InsertImage {
    fn create_frame(&self, tree: &mut Tree) -> Result<NodeId, DomError> {
        let frame = tree.create_element(QName::new(ns::DRAW, "frame"));
        tree.set_attribute(frame, QName::new(ns::DRAW, "style-name"), self.frame_style_name.as_str())?;
        tree.set_attribute(frame, QName::new(ns::DRAW, "name"), self.frame_name.as_str())?;
        tree.set_attribute(frame, QName::new(ns::TEXT, "anchor-type"), "as-char")?;
        tree.set_attribute(frame, QName::new(ns::SVG, "width"), self.frame_width.as_str())?;
        tree.set_attribute(frame, QName::new(ns::SVG, "height"), self.frame_height.as_str())?;

        let image = tree.append_element(frame, ns::DRAW, "image")?;
        tree.set_attribute(image, QName::new(ns::XLINK, "href"), self.filename.as_str())?;
        tree.set_attribute(image, QName::new(ns::XLINK, "type"), "simple")?;
        tree.set_attribute(image, QName::new(ns::XLINK, "show"), "embed")?;
        tree.set_attribute(image, QName::new(ns::XLINK, "actuate"), "onLoad")?;
        Ok(frame)
    }
}

impl Operation for InsertImage {
    fn optype(&self) -> &'static str {
        "InsertImage"
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
        let Some(paragraph) = document.paragraph_at_step(self.position)? else {
            return Ok(false);
        };
        let before = document.paragraph_step_count(paragraph);
        let frame = self.create_frame(document.tree_mut())?;
        document.insert_node_at_step(self.position, frame)?;
        let inserted = document.paragraph_step_count(paragraph).saturating_sub(before);
        document.steps_inserted(self.position, inserted, None);

        document.fix_cursor_positions()?;
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
