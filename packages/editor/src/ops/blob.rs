use super::{spec_value, OpBase, Operation};
use crate::document::{Blob, OdtDocument};
use crate::errors::OperationError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetBlob {
    #[serde(flatten)]
    pub base: OpBase,
    pub filename: String,
    pub mimetype: String,
    /// Base64 encoded payload, stored as given.
    pub content: String,
}

impl Operation for SetBlob {
    fn optype(&self) -> &'static str {
        "SetBlob"
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
        document.set_blob(
            &self.filename,
            Blob {
                mimetype: self.mimetype.clone(),
                content: self.content.clone(),
            },
        );
        Ok(true)
    }

    fn spec(&self) -> Value {
        spec_value(self.optype(), self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoveBlob {
    #[serde(flatten)]
    pub base: OpBase,
    pub filename: String,
}

impl Operation for RemoveBlob {
    fn optype(&self) -> &'static str {
        "RemoveBlob"
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
        document.remove_blob(&self.filename);
        Ok(true)
    }

    fn spec(&self) -> Value {
        spec_value(self.optype(), self)
    }
}
