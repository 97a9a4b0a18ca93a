use super::{lenient, spec_value, OpBase, Operation};
use crate::document::OdtDocument;
use crate::errors::OperationError;
use crate::odf_utils::{is_span, paragraph_elements, text_nodes};
use crate::signals::Signal;
use crate::style::{
    apply_style, merge, only_group, read_style, remove_style_properties, RemovedStyleProperties, StyleData,
    StyleValue, TEXT_PROPERTIES,
};
use odfkit_dom::{ns, DomError, NodeId, QName};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddStyle {
    #[serde(flatten)]
    pub base: OpBase,
    pub style_name: String,
    pub style_family: String,
    #[serde(default, deserialize_with = "lenient::boolean")]
    pub is_automatic_style: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_properties: Option<StyleData>,
}

impl Operation for AddStyle {
    fn optype(&self) -> &'static str {
        "AddStyle"
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
        let container = if self.is_automatic_style {
            document.automatic_styles()
        } else {
            document.styles()
        };
        let tree = document.tree_mut();
        let style = tree.create_element(QName::new(ns::STYLE, "style"));
        if let Some(properties) = &self.set_properties {
            apply_style(tree, style, properties)?;
        }
        tree.set_attribute(style, QName::new(ns::STYLE, "family"), self.style_family.as_str())?;
        tree.set_attribute(style, QName::new(ns::STYLE, "name"), self.style_name.as_str())?;
        tree.append_child(container, style)?;

        if !self.is_automatic_style {
            document.emit(Signal::CommonStyleCreated {
                name: self.style_name.clone(),
                family: self.style_family.clone(),
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
pub struct RemoveStyle {
    #[serde(flatten)]
    pub base: OpBase,
    pub style_name: String,
    pub style_family: String,
}

impl Operation for RemoveStyle {
    fn optype(&self) -> &'static str {
        "RemoveStyle"
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
        let Some(style) = document.find_style(&self.style_name, &self.style_family) else {
            return Ok(false);
        };
        let automatic = document.is_automatic_style(style);
        document.tree_mut().remove(style)?;
        if !automatic {
            document.emit(Signal::CommonStyleDeleted {
                name: self.style_name.clone(),
                family: self.style_family.clone(),
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
pub struct UpdateParagraphStyle {
    #[serde(flatten)]
    pub base: OpBase,
    pub style_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_properties: Option<StyleData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removed_properties: Option<RemovedStyleProperties>,
}

impl Operation for UpdateParagraphStyle {
    fn optype(&self) -> &'static str {
        "UpdateParagraphStyle"
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
        let Some(style) = document.find_style(&self.style_name, "paragraph") else {
            return Ok(false);
        };
        let tree = document.tree_mut();
        if let Some(properties) = &self.set_properties {
            apply_style(tree, style, properties)?;
        }
        if let Some(removed) = &self.removed_properties {
            remove_style_properties(tree, style, removed)?;
        }
        document.emit(Signal::ParagraphStyleModified {
            name: self.style_name.clone(),
        });
        Ok(true)
    }

    fn spec(&self) -> Value {
        spec_value(self.optype(), self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyDirectStyling {
    #[serde(flatten)]
    pub base: OpBase,
    #[serde(deserialize_with = "lenient::int")]
    pub position: usize,
    #[serde(deserialize_with = "lenient::int")]
    pub length: i64,
    pub set_properties: StyleData,
}

impl ApplyDirectStyling {
    /// Creates the automatic text style replacing `original` on a span:
    /// a copy of `original` when it is automatic, a child of it otherwise.
    fn derive_style(
        document: &mut OdtDocument,
        original: Option<&str>,
        properties: &StyleData,
    ) -> Result<String, OperationError> {
        let mut data = StyleData::new();
        if let Some(original) = original {
            match document.find_style(original, "text") {
                Some(style) if document.is_automatic_style(style) => data = read_style(document.tree(), style),
                _ => {
                    data.insert(
                        "style:parent-style-name".to_string(),
                        StyleValue::Text(original.to_string()),
                    );
                }
            }
        }
        let data = merge(&data, properties);

        let name = document.generate_style_name();
        let container = document.automatic_styles();
        let tree = document.tree_mut();
        let style = tree.create_element(QName::new(ns::STYLE, "style"));
        tree.set_attribute(style, QName::new(ns::STYLE, "name"), name.as_str())?;
        tree.set_attribute(style, QName::new(ns::STYLE, "family"), "text")?;
        apply_style(tree, style, &data)?;
        tree.append_child(container, style)?;
        debug!(style = %name, original = ?original, "Created automatic text style");
        Ok(name)
    }

    /// Span to restyle for `text_node`: its parent when the text is the
    /// span's only child, a new wrapping span otherwise.
    fn styling_span(document: &mut OdtDocument, text_node: NodeId) -> Result<NodeId, DomError> {
        let tree = document.tree_mut();
        let parent = tree.parent(text_node).ok_or(DomError::Detached(text_node))?;
        if is_span(tree, parent) && tree.children(parent).len() == 1 {
            return Ok(parent);
        }
        let span = tree.create_element(QName::new(ns::TEXT, "span"));
        tree.insert_before(parent, span, Some(text_node))?;
        tree.append_child(span, text_node)?;
        Ok(span)
    }
}

impl Operation for ApplyDirectStyling {
    fn optype(&self) -> &'static str {
        "ApplyDirectStyling"
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
        let first_step = (self.position as i64 + self.length.min(0)) as usize;
        let paragraphs = paragraph_elements(document.tree(), range);
        let range = document.tree_mut().split_boundaries(range)?;
        let nodes = text_nodes(document.tree(), range);
        let properties = only_group(&self.set_properties, TEXT_PROPERTIES);

        // spans sharing an original style share the derived one
        let mut derived: BTreeMap<Option<String>, String> = BTreeMap::new();
        for node in nodes {
            if document.tree().node_length(node) == 0 {
                continue;
            }
            let span = Self::styling_span(document, node)?;
            let original = document
                .tree()
                .attribute(span, ns::TEXT, "style-name")
                .map(str::to_string);
            let name = match derived.get(&original) {
                Some(name) => name.clone(),
                None => {
                    let name = Self::derive_style(document, original.as_deref(), &properties)?;
                    derived.insert(original, name.clone());
                    name
                }
            };
            document
                .tree_mut()
                .set_attribute(span, QName::new(ns::TEXT, "style-name"), name)?;
        }
        document.invalidate_steps_from(first_step);

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
