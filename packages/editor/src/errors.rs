//! Error types for the editor

use odfkit_dom::{DomError, DomPoint};
use thiserror::Error;

/// Failures of the step/position translation layer.
#[derive(Error, Debug)]
pub enum StepsError {
    #[error("Requested step {step} is out of bounds (last step is {last})")]
    OutOfRange { step: usize, last: usize },

    #[error("Cursor range starting at {position} with length {length} is out of bounds")]
    InvalidRange { position: usize, length: i64 },

    #[error("Document has no walkable positions")]
    NoWalkablePositions,

    #[error("Point {0:?} is outside the document body")]
    PointOutsideRoot(DomPoint),

    #[error("Step walk never reached {0:?}")]
    Unreachable(DomPoint),
}

/// Hard failures raised while executing an operation.
///
/// A soft failure (nothing to do, target missing) is `Ok(false)` instead.
#[derive(Error, Debug)]
pub enum OperationError {
    #[error("{optype}: {message}")]
    ContractViolation { optype: String, message: String },

    #[error("Step translation failed: {0}")]
    Steps(#[from] StepsError),

    #[error("Tree error: {0}")]
    Dom(#[from] DomError),
}

impl OperationError {
    pub fn contract(optype: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ContractViolation {
            optype: optype.into(),
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum FactoryError {
    #[error("Operation spec has no optype")]
    MissingOptype,

    #[error("Unknown operation type: {0}")]
    UnknownOperation(String),

    #[error("Invalid {optype} spec: {source}")]
    InvalidSpec {
        optype: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Error, Debug)]
pub enum RouterError {
    #[error("Operation router is closed")]
    Closed,

    #[error("Could not re-create operation: {0}")]
    Factory(#[from] FactoryError),

    #[error("Operation {optype} failed: {source}")]
    Operation {
        optype: String,
        #[source]
        source: OperationError,
    },
}

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Document error: {0}")]
    Dom(#[from] DomError),

    #[error("Document has no office:text body")]
    MissingBody,

    #[error("Operation error: {0}")]
    Operation(#[from] OperationError),

    #[error("Factory error: {0}")]
    Factory(#[from] FactoryError),

    #[error("Router error: {0}")]
    Router(#[from] RouterError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
