//! # Operations
//!
//! Every change to a document is an operation: a small serializable
//! command that can be replayed on any replica to reach the same state.
//!
//! Positions and lengths are always given in steps. An operation either
//! applies completely and returns `Ok(true)`, finds nothing to do and
//! returns `Ok(false)` without touching the document, or detects that it
//! was constructed against a different document state and fails with
//! [`OperationError::ContractViolation`].

mod annotation;
mod blob;
mod cursor;
mod hyperlink;
mod image;
pub mod lenient;
mod member;
mod metadata;
mod paragraph;
mod style;
mod text;

pub use annotation::{AddAnnotation, RemoveAnnotation};
pub use blob::{RemoveBlob, SetBlob};
pub use cursor::{AddCursor, MoveCursor, RemoveCursor};
pub use hyperlink::{ApplyHyperlink, RemoveHyperlink};
pub use image::InsertImage;
pub use member::{AddMember, RemoveMember, UpdateMember};
pub use metadata::UpdateMetadata;
pub use paragraph::{MergeParagraph, SetParagraphStyle, SplitParagraph};
pub use style::{AddStyle, ApplyDirectStyling, RemoveStyle, UpdateParagraphStyle};
pub use text::{InsertText, RemoveText};

use crate::document::OdtDocument;
use crate::errors::OperationError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Fields shared by every operation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OpBase {
    pub memberid: String,
    #[serde(default, deserialize_with = "lenient::int")]
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl OpBase {
    pub fn new(memberid: impl Into<String>) -> Self {
        Self {
            memberid: memberid.into(),
            ..Self::default()
        }
    }
}

/// Trait for document operations
///
/// Each operation type implements this trait to provide:
/// - Its wire name and common fields
/// - Execution against a document
/// - Serialization back to its wire form
pub trait Operation: fmt::Debug {
    /// Stable wire name, the `optype` field
    fn optype(&self) -> &'static str;

    fn base(&self) -> &OpBase;

    fn base_mut(&mut self) -> &mut OpBase;

    /// Whether the operation changes persisted content
    fn is_edit(&self) -> bool {
        false
    }

    /// Apply this operation to the document
    fn execute(&self, document: &mut OdtDocument) -> Result<bool, OperationError>;

    /// Serialize to the flat wire form accepted by the factory
    fn spec(&self) -> Value;

    fn memberid(&self) -> &str {
        &self.base().memberid
    }

    fn timestamp(&self) -> i64 {
        self.base().timestamp
    }

    fn group(&self) -> Option<&str> {
        self.base().group.as_deref()
    }
}

/// Serializes `op` and tags it with its `optype`.
pub(crate) fn spec_value<T: Serialize>(optype: &str, op: &T) -> Value {
    let mut value = serde_json::to_value(op).unwrap_or_default();
    if let Value::Object(fields) = &mut value {
        fields.insert("optype".to_string(), Value::String(optype.to_string()));
    }
    value
}

/// Contract violation raised by `optype`.
pub(crate) fn contract(optype: &str, message: impl Into<String>) -> OperationError {
    OperationError::contract(optype, message)
}
