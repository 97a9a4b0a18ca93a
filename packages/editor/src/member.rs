use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Properties every member carries, plus free-form extras.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberProperties {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

const REQUIRED_PROPERTIES: [&str; 3] = ["fullName", "color", "imageUrl"];

impl MemberProperties {
    /// Applies a partial update. Keys not present are left untouched.
    pub fn set_properties(&mut self, properties: &Map<String, Value>) {
        for (key, value) in properties {
            match key.as_str() {
                "fullName" => self.full_name = value_to_string(value),
                "color" => self.color = value_to_string(value),
                "imageUrl" => self.image_url = value_to_string(value),
                _ => {
                    self.extra.insert(key.clone(), value.clone());
                }
            }
        }
    }

    /// Removes extra properties. The required ones cannot be removed.
    pub fn remove_properties(&mut self, properties: &Map<String, Value>) {
        for key in properties.keys() {
            if !REQUIRED_PROPERTIES.contains(&key.as_str()) {
                self.extra.remove(key);
            }
        }
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub member_id: String,
    pub properties: MemberProperties,
}

impl Member {
    pub fn new(member_id: impl Into<String>, properties: MemberProperties) -> Self {
        Self {
            member_id: member_id.into(),
            properties,
        }
    }
}
