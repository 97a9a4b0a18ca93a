use super::{spec_value, OpBase, Operation};
use crate::document::OdtDocument;
use crate::errors::OperationError;
use crate::member::{Member, MemberProperties};
use crate::signals::Signal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMember {
    #[serde(flatten)]
    pub base: OpBase,
    #[serde(default)]
    pub set_properties: MemberProperties,
}

impl Operation for AddMember {
    fn optype(&self) -> &'static str {
        "AddMember"
    }

    fn base(&self) -> &OpBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut OpBase {
        &mut self.base
    }

    fn execute(&self, document: &mut OdtDocument) -> Result<bool, OperationError> {
        let member_id = self.base.memberid.clone();
        if document.has_member(&member_id) {
            return Ok(false);
        }
        document.add_member(Member::new(member_id.clone(), self.set_properties.clone()))?;
        document.emit(Signal::MemberAdded { member_id });
        Ok(true)
    }

    fn spec(&self) -> Value {
        spec_value(self.optype(), self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMember {
    #[serde(flatten)]
    pub base: OpBase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_properties: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removed_properties: Option<Map<String, Value>>,
}

impl Operation for UpdateMember {
    fn optype(&self) -> &'static str {
        "UpdateMember"
    }

    fn base(&self) -> &OpBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut OpBase {
        &mut self.base
    }

    fn execute(&self, document: &mut OdtDocument) -> Result<bool, OperationError> {
        let member_id = self.base.memberid.as_str();
        let Some(member) = document.get_member_mut(member_id) else {
            return Ok(false);
        };
        if let Some(removed) = &self.removed_properties {
            member.properties.remove_properties(removed);
        }
        let mut renamed = None;
        if let Some(set) = &self.set_properties {
            member.properties.set_properties(set);
            if set.contains_key("fullName") {
                renamed = Some(member.properties.full_name.clone());
            }
        }
        if let Some(full_name) = renamed {
            document.update_creators(member_id, &full_name)?;
        }
        document.emit(Signal::MemberUpdated {
            member_id: member_id.to_string(),
        });
        Ok(true)
    }

    fn spec(&self) -> Value {
        spec_value(self.optype(), self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoveMember {
    #[serde(flatten)]
    pub base: OpBase,
}

impl Operation for RemoveMember {
    fn optype(&self) -> &'static str {
        "RemoveMember"
    }

    fn base(&self) -> &OpBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut OpBase {
        &mut self.base
    }

    fn execute(&self, document: &mut OdtDocument) -> Result<bool, OperationError> {
        if document.remove_member(&self.base.memberid).is_none() {
            return Ok(false);
        }
        document.emit(Signal::MemberRemoved {
            member_id: self.base.memberid.clone(),
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
    use odfkit_dom::ns;
    use serde_json::json;

    #[test]
    fn test_add_member_twice() {
        let mut document = document("<text:p/>");
        let op: AddMember = serde_json::from_value(json!({
            "memberid": "alice",
            "timestamp": 1,
            "setProperties": { "fullName": "Alice", "color": "red", "imageUrl": "" }
        }))
        .unwrap();

        assert!(op.execute(&mut document).unwrap());
        assert!(!op.execute(&mut document).unwrap());
        assert_eq!(document.get_member("alice").unwrap().properties.full_name, "Alice");
    }

    #[test]
    fn test_rename_rewrites_creators() {
        let mut document = document(
            r#"<text:p>a<office:annotation><dc:creator editinfo:memberid="alice">Alice</dc:creator><text:p/></office:annotation></text:p>"#,
        );
        AddMember {
            base: OpBase::new("alice"),
            set_properties: MemberProperties {
                full_name: "Alice".to_string(),
                ..MemberProperties::default()
            },
        }
        .execute(&mut document)
        .unwrap();

        let rename = UpdateMember {
            base: OpBase::new("alice"),
            set_properties: json!({ "fullName": "Alice Liddell" }).as_object().cloned(),
            removed_properties: None,
        };
        assert!(rename.execute(&mut document).unwrap());

        let creator = document.tree().find_element(document.body(), ns::DC, "creator").unwrap();
        assert_eq!(document.tree().text_content(creator), "Alice Liddell");
    }

    #[test]
    fn test_update_or_remove_unknown_member() {
        let mut document = document("<text:p/>");
        let update = UpdateMember {
            base: OpBase::new("ghost"),
            set_properties: None,
            removed_properties: None,
        };
        assert!(!update.execute(&mut document).unwrap());
        assert!(!RemoveMember { base: OpBase::new("ghost") }.execute(&mut document).unwrap());
    }
}
