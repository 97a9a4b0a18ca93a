use super::{spec_value, OpBase, Operation};
use crate::document::OdtDocument;
use crate::errors::OperationError;
use crate::signals::Signal;
use crate::style::RemovedAttributes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMetadata {
    #[serde(flatten)]
    pub base: OpBase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_properties: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removed_properties: Option<RemovedAttributes>,
}

impl Operation for UpdateMetadata {
    fn optype(&self) -> &'static str {
        "UpdateMetadata"
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
        let set = self.set_properties.clone().unwrap_or_default();
        let removed = self
            .removed_properties
            .as_ref()
            .map(RemovedAttributes::names)
            .unwrap_or_default();
        document.set_metadata(&set, &removed)?;
        document.emit(Signal::MetadataUpdated {
            set_properties: set,
            removed_properties: removed,
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
    use crate::signals::SignalKind;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_update_metadata() {
        let mut document = document("<text:p/>");
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        document.subscribe(SignalKind::MetadataUpdated, move |signal| sink.borrow_mut().push(signal.clone()));

        let op: UpdateMetadata = serde_json::from_value(json!({
            "memberid": "alice",
            "timestamp": 0,
            "setProperties": { "dc:title": "Minutes", "dc:subject": "Weekly" },
            "removedProperties": { "attributes": "dc:description" }
        }))
        .unwrap();
        assert!(op.execute(&mut document).unwrap());

        assert_eq!(document.metadata("dc:title").as_deref(), Some("Minutes"));
        let signals = seen.borrow();
        let Signal::MetadataUpdated { removed_properties, .. } = &signals[0] else {
            panic!("expected a metadata signal");
        };
        assert_eq!(removed_properties, &vec!["dc:description".to_string()]);
    }
}
