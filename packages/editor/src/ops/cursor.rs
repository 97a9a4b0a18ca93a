use super::{lenient, spec_value, OpBase, Operation};
use crate::cursor::SelectionType;
use crate::document::OdtDocument;
use crate::errors::OperationError;
use crate::signals::Signal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddCursor {
    #[serde(flatten)]
    pub base: OpBase,
}

impl Operation for AddCursor {
    fn optype(&self) -> &'static str {
        "AddCursor"
    }

    fn base(&self) -> &OpBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut OpBase {
        &mut self.base
    }

    fn execute(&self, document: &mut OdtDocument) -> Result<bool, OperationError> {
        let member_id = self.base.memberid.clone();
        if document.has_cursor(&member_id) {
            return Ok(false);
        }
        document.add_cursor(&member_id)?;
        document.emit(Signal::CursorAdded { member_id });
        Ok(true)
    }

    fn spec(&self) -> Value {
        spec_value(self.optype(), self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoveCursor {
    #[serde(flatten)]
    pub base: OpBase,
}

impl Operation for RemoveCursor {
    fn optype(&self) -> &'static str {
        "RemoveCursor"
    }

    fn base(&self) -> &OpBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut OpBase {
        &mut self.base
    }

    fn execute(&self, document: &mut OdtDocument) -> Result<bool, OperationError> {
        if !document.remove_cursor(&self.base.memberid) {
            return Ok(false);
        }
        document.emit(Signal::CursorRemoved {
            member_id: self.base.memberid.clone(),
        });
        Ok(true)
    }

    fn spec(&self) -> Value {
        spec_value(self.optype(), self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveCursor {
    #[serde(flatten)]
    pub base: OpBase,
    #[serde(deserialize_with = "lenient::int")]
    pub position: usize,
    #[serde(default, deserialize_with = "lenient::int")]
    pub length: i64,
    #[serde(default)]
    pub selection_type: SelectionType,
}

impl Operation for MoveCursor {
    fn optype(&self) -> &'static str {
        "MoveCursor"
    }

    fn base(&self) -> &OpBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut OpBase {
        &mut self.base
    }

    fn execute(&self, document: &mut OdtDocument) -> Result<bool, OperationError> {
        let member_id = self.base.memberid.as_str();
        if !document.move_cursor(member_id, self.position, self.length, self.selection_type)? {
            return Ok(false);
        }
        if let Some(signal) = document.cursor_moved_signal(member_id) {
            document.emit(signal);
        }
        Ok(true)
    }

    fn spec(&self) -> Value {
        spec_value(self.optype(), self)
    }
}
