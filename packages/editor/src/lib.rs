//! # Odfkit Editor
//!
//! Operation based editing engine for ODF text documents.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ dom: XML ⇄ arena tree of the document       │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ steps: cursor positions as integers         │
//! │  - Position filters decide what is a step   │
//! │  - Position/step iterators walk the tree    │
//! │  - Checkpointed step ⇄ point translation    │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ operations: serializable document edits     │
//! │  - Factory rebuilds them from JSON specs    │
//! │  - Router plays them back in order          │
//! │  - Session applies them and emits signals   │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Steps are the only addresses**: operations never carry tree paths
//! 2. **Deterministic replay**: the same operations yield the same document
//! 3. **Cursors follow the text**: step inserts and removals shift them
//! 4. **Soft vs hard failure**: `Ok(false)` skips, `Err` stops the batch
//!
//! ## Usage
//!
//! ```rust,ignore
//! use odfkit_editor::{EditorConfig, OdtDocument, Session};
//! use serde_json::json;
//!
//! let document = OdtDocument::new(EditorConfig::default())?;
//! let mut session = Session::new(document);
//!
//! session.enqueue_specs(&[
//!     json!({ "optype": "AddCursor", "memberid": "alice" }),
//!     json!({ "optype": "InsertText", "memberid": "alice", "position": 0, "text": "Hello" }),
//! ])?;
//!
//! assert_eq!(session.document().step_count(), 5);
//! ```

mod config;
mod cursor;
mod document;
mod errors;
mod factory;
mod filter;
mod member;
mod metadata;
pub mod odf_utils;
pub mod ops;
mod position_iterator;
mod router;
mod session;
mod signals;
mod step_iterator;
mod steps_translator;
mod style;
mod whitespace;

pub use config::EditorConfig;
pub use cursor::{CursorSelection, OdtCursor, SelectionType};
pub use document::{Blob, DomSelection, OdtDocument, TextNodePosition};
pub use errors::{EditorError, FactoryError, OperationError, RouterError, StepsError};
pub use factory::{OperationConstructor, OperationFactory};
pub use filter::{
    BlacklistNamespaceNodeFilter, FilterResult, NodeFilter, NodeFilterChain, OdfTextBodyNodeFilter, PositionFilter,
    PositionFilterChain, RootFilter, TextPositionFilter,
};
pub use member::{Member, MemberProperties};
pub use metadata::format_timestamp;
pub use ops::{OpBase, Operation};
pub use position_iterator::PositionIterator;
pub use router::{Clock, OperationRouter, PlaybackTarget, TrivialOperationRouter};
pub use session::Session;
pub use signals::{EventNotifier, Signal, SignalKind, SubscriptionId};
pub use step_iterator::{StepDirection, StepIterator};
pub use steps_translator::{Rounding, StepsTranslator};
pub use style::{RemovedAttributes, RemovedStyleProperties, StyleData, StyleValue};

pub use odfkit_dom::{DomPoint, DomRange, NodeId, Tree};
