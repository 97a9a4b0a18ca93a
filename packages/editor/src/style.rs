//! Style property maps and their application to `style:style` elements.
//!
//! A [`StyleData`] maps prefixed names to either a plain attribute value
//! of the style element itself or to a property group such as
//! `style:text-properties`, whose entries become attributes of the child
//! element with that name.

use odfkit_dom::{DomResult, NodeId, QName, Tree};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StyleValue {
    Text(String),
    Group(BTreeMap<String, String>),
}

pub type StyleData = BTreeMap<String, StyleValue>;

pub const TEXT_PROPERTIES: &str = "style:text-properties";

/// Comma separated attribute names to drop from one property group.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RemovedAttributes {
    #[serde(default)]
    pub attributes: String,
}

impl RemovedAttributes {
    pub fn names(&self) -> Vec<String> {
        split_names(&self.attributes)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovedStyleProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_level_names_string: Option<String>,
    #[serde(flatten)]
    pub groups: BTreeMap<String, RemovedAttributes>,
}

pub fn split_names(names: &str) -> Vec<String> {
    names
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Merges `patch` over `base`; groups are merged key by key.
pub fn merge(base: &StyleData, patch: &StyleData) -> StyleData {
    let mut merged = base.clone();
    for (key, value) in patch {
        match (merged.get_mut(key), value) {
            (Some(StyleValue::Group(existing)), StyleValue::Group(update)) => {
                existing.extend(update.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            _ => {
                merged.insert(key.clone(), value.clone());
            }
        }
    }
    merged
}

/// Keeps only the given property group.
pub fn only_group(data: &StyleData, group: &str) -> StyleData {
    data.iter()
        .filter(|(key, value)| key.as_str() == group && matches!(value, StyleValue::Group(_)))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Reads a style element back into a [`StyleData`], leaving out its
/// identity attributes.
pub fn read_style(tree: &Tree, style: NodeId) -> StyleData {
    let mut data = StyleData::new();
    let Some(element) = tree.element(style) else {
        return data;
    };
    for attribute in &element.attributes {
        let name = attribute.name.prefixed();
        if name == "style:name" || name == "style:family" {
            continue;
        }
        data.insert(name, StyleValue::Text(attribute.value.clone()));
    }
    for &child in tree.children(style) {
        let Some(child_element) = tree.element(child) else {
            continue;
        };
        let group = child_element
            .attributes
            .iter()
            .map(|attribute| (attribute.name.prefixed(), attribute.value.clone()))
            .collect();
        data.insert(child_element.name.prefixed(), StyleValue::Group(group));
    }
    data
}

fn parse_name(name: &str) -> Option<QName> {
    match QName::parse_prefixed(name) {
        Ok(qname) => Some(qname),
        Err(error) => {
            warn!(name, %error, "Skipping style property with unknown prefix");
            None
        }
    }
}

/// Writes `data` onto `style`, creating property group elements as needed.
pub fn apply_style(tree: &mut Tree, style: NodeId, data: &StyleData) -> DomResult<()> {
    for (key, value) in data {
        let Some(name) = parse_name(key) else {
            continue;
        };
        match value {
            StyleValue::Text(text) => tree.set_attribute(style, name, text.as_str())?,
            StyleValue::Group(properties) => {
                let group = match tree.child_element(style, &name.ns, &name.local) {
                    Some(existing) => existing,
                    None => tree.append_element(style, &name.ns, &name.local)?,
                };
                for (property, property_value) in properties {
                    if let Some(property_name) = parse_name(property) {
                        tree.set_attribute(group, property_name, property_value.as_str())?;
                    }
                }
            }
        }
    }
    Ok(())
}

/// Drops the listed attributes; property groups left empty are removed.
pub fn remove_style_properties(
    tree: &mut Tree,
    style: NodeId,
    removed: &RemovedStyleProperties,
) -> DomResult<()> {
    if let Some(names) = &removed.top_level_names_string {
        for name in split_names(names).iter().filter_map(|name| parse_name(name)) {
            tree.remove_attribute(style, &name.ns, &name.local);
        }
    }
    for (group_name, attributes) in &removed.groups {
        let Some(group_name) = parse_name(group_name) else {
            continue;
        };
        let Some(group) = tree.child_element(style, &group_name.ns, &group_name.local) else {
            continue;
        };
        for name in attributes.names().iter().filter_map(|name| parse_name(name)) {
            tree.remove_attribute(group, &name.ns, &name.local);
        }
        let empty = tree
            .element(group)
            .map_or(false, |element| element.attributes.is_empty())
            && tree.children(group).is_empty();
        if empty {
            tree.remove(group)?;
        }
    }
    Ok(())
}
