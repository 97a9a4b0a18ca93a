use crate::NodeId;
use thiserror::Error;

pub type DomResult<T> = Result<T, DomError>;

#[derive(Error, Debug)]
pub enum DomError {
    #[error("XML error: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("Node {0} is not a text node")]
    NotText(NodeId),

    #[error("Node {0} is not an element")]
    NotElement(NodeId),

    #[error("Offset {offset} is out of bounds for node {node} (length {length})")]
    OffsetOutOfBounds {
        node: NodeId,
        offset: usize,
        length: usize,
    },

    #[error("Node {child} is not a child of {parent}")]
    NotAChild { parent: NodeId, child: NodeId },

    #[error("Node {0} is not attached to a parent")]
    Detached(NodeId),

    #[error("Cannot insert {child} below {parent}: it would contain itself")]
    HierarchyRequest { parent: NodeId, child: NodeId },

    #[error("Unknown namespace prefix in {0:?}")]
    UnknownPrefix(String),
}

impl DomError {
    pub fn out_of_bounds(node: NodeId, offset: usize, length: usize) -> Self {
        Self::OffsetOutOfBounds {
            node,
            offset,
            length,
        }
    }
}
