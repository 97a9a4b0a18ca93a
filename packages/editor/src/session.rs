//! # Edit Session
//!
//! A session owns one document and the router that feeds it. Operations
//! enqueued here are routed, played back on the document and followed by
//! the metadata bookkeeping of every executed edit.

use crate::document::OdtDocument;
use crate::errors::{EditorError, OperationError};
use crate::factory::OperationFactory;
use crate::ops::Operation;
use crate::router::{OperationRouter, PlaybackTarget, TrivialOperationRouter};
use crate::signals::Signal;
use serde_json::Value;
use tracing::{debug, warn};

/// Editing session over one document
pub struct Session {
    /// Document the routed operations are played on
    document: OdtDocument,

    /// Decides when operations reach `document`
    router: Box<dyn OperationRouter>,

    /// Rebuilds operations from wire specs
    factory: OperationFactory,
}

/// Playback of routed operations onto the session document.
struct DocumentPlayback<'a> {
    document: &'a mut OdtDocument,
}

impl PlaybackTarget for DocumentPlayback<'_> {
    fn batch_start(&mut self) {
        self.document.emit(Signal::ProcessingBatchStart);
    }

    fn batch_end(&mut self) {
        self.document.emit(Signal::ProcessingBatchEnd);
    }

    fn play(&mut self, op: &dyn Operation) -> Result<bool, OperationError> {
        self.document.emit(Signal::OperationStart {
            optype: op.optype().to_string(),
            member_id: op.memberid().to_string(),
            timestamp: op.timestamp(),
        });
        let executed = op.execute(self.document)?;
        if executed {
            debug!(optype = op.optype(), member_id = op.memberid(), "Executed operation");
            if let Err(err) = self.document.handle_operation_executed(op) {
                warn!(optype = op.optype(), error = %err, "Could not update document metadata");
            }
            self.document.emit(Signal::OperationEnd {
                optype: op.optype().to_string(),
                member_id: op.memberid().to_string(),
                timestamp: op.timestamp(),
            });
        }
        Ok(executed)
    }
}

impl Session {
    /// Session playing operations back locally through a trivial router.
    pub fn new(document: OdtDocument) -> Self {
        Self::with_router(document, Box::new(TrivialOperationRouter::new()))
    }

    pub fn with_router(document: OdtDocument, router: Box<dyn OperationRouter>) -> Self {
        Self {
            document,
            router,
            factory: OperationFactory::default(),
        }
    }

    pub fn document(&self) -> &OdtDocument {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut OdtDocument {
        &mut self.document
    }

    pub fn into_document(self) -> OdtDocument {
        self.document
    }

    pub fn factory(&self) -> &OperationFactory {
        &self.factory
    }

    pub fn factory_mut(&mut self) -> &mut OperationFactory {
        &mut self.factory
    }

    /// Routes `operations` to the document. The first hard failure stops
    /// the batch and is returned.
    pub fn enqueue(&mut self, operations: Vec<Box<dyn Operation>>) -> Result<(), EditorError> {
        let mut playback = DocumentPlayback {
            document: &mut self.document,
        };
        let result = self.router.push(operations, &mut playback);
        self.document.collect_garbage();
        result?;
        Ok(())
    }

    /// Builds operations from wire specs and enqueues them. Nothing is
    /// played back when any spec is invalid.
    pub fn enqueue_specs(&mut self, specs: &[Value]) -> Result<(), EditorError> {
        let operations = specs
            .iter()
            .map(|spec| self.factory.create(spec))
            .collect::<Result<Vec<_>, _>>()?;
        self.enqueue(operations)
    }

    pub fn has_local_unsynced_ops(&self) -> bool {
        self.router.has_local_unsynced_ops()
    }

    pub fn close(&mut self) -> Result<(), EditorError> {
        self.router.close()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;
    use crate::errors::RouterError;
    use crate::signals::SignalKind;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn session() -> Session {
        let document = OdtDocument::new(EditorConfig::default()).unwrap();
        Session::with_router(document, Box::new(TrivialOperationRouter::with_clock(Box::new(|| 1_000))))
    }

    fn record(session: &Session) -> Rc<RefCell<Vec<SignalKind>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        for kind in [
            SignalKind::ProcessingBatchStart,
            SignalKind::OperationStart,
            SignalKind::OperationEnd,
            SignalKind::ProcessingBatchEnd,
        ] {
            let sink = Rc::clone(&seen);
            session.document().subscribe(kind, move |signal| sink.borrow_mut().push(signal.kind()));
        }
        seen
    }

    #[test]
    fn test_enqueue_specs_runs_operations() {
        let mut session = session();
        session
            .enqueue_specs(&[
                json!({ "optype": "AddMember", "memberid": "alice", "setProperties": { "fullName": "Alice" } }),
                json!({ "optype": "AddCursor", "memberid": "alice" }),
                json!({ "optype": "InsertText", "memberid": "alice", "position": 0, "text": "hello", "moveCursor": true }),
            ])
            .unwrap();

        let document = session.document();
        assert_eq!(document.tree().text_content(document.body()), "hello");
        assert_eq!(document.get_cursor_position("alice"), 5);
        assert_eq!(document.metadata("dc:creator").as_deref(), Some("Alice"));
        assert_eq!(document.metadata("dc:date").as_deref(), Some("1970-01-01T00:00:01.000Z"));
    }

    #[test]
    fn test_signals_bracket_each_operation() {
        let mut session = session();
        let seen = record(&session);

        session
            .enqueue_specs(&[
                json!({ "optype": "AddCursor", "memberid": "alice" }),
                json!({ "optype": "AddCursor", "memberid": "alice" }),
            ])
            .unwrap();

        // the repeated AddCursor does nothing and gets no end signal
        assert_eq!(
            *seen.borrow(),
            vec![
                SignalKind::ProcessingBatchStart,
                SignalKind::OperationStart,
                SignalKind::OperationEnd,
                SignalKind::OperationStart,
                SignalKind::ProcessingBatchEnd,
            ]
        );
    }

    #[test]
    fn test_hard_failure_is_returned() {
        let mut session = session();
        let seen = record(&session);
        let result = session.enqueue_specs(&[json!({
            "optype": "RemoveText",
            "memberid": "alice",
            "position": 0,
            "length": 3
        })]);

        assert!(matches!(result, Err(EditorError::Router(RouterError::Operation { .. }))));
        assert_eq!(seen.borrow().last(), Some(&SignalKind::ProcessingBatchEnd));
    }

    #[test]
    fn test_invalid_spec_plays_nothing() {
        let mut session = session();
        let seen = record(&session);
        let result = session.enqueue_specs(&[
            json!({ "optype": "AddCursor", "memberid": "alice" }),
            json!({ "optype": "Unknown", "memberid": "alice" }),
        ]);

        assert!(matches!(result, Err(EditorError::Factory(_))));
        assert!(seen.borrow().is_empty());
        assert!(!session.document().has_cursor("alice"));
    }

    #[test]
    fn test_closed_session_rejects_operations() {
        let mut session = session();
        session.close().unwrap();
        let result = session.enqueue_specs(&[json!({ "optype": "AddCursor", "memberid": "alice" })]);
        assert!(matches!(result, Err(EditorError::Router(RouterError::Closed))));
    }
}
