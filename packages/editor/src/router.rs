//! # Operation Routing
//!
//! A router decides when and in which order operations reach the local
//! document. The trivial router plays everything back immediately, in the
//! order it was pushed, which is what a single-user session needs.

use crate::errors::{OperationError, RouterError};
use crate::factory::OperationFactory;
use crate::ops::Operation;
use chrono::Utc;
use tracing::{debug, error, warn};

/// Trait for receivers of routed operations
///
/// A session implements this trait to provide:
/// - Batch boundaries around every push
/// - Execution of single operations against its document
pub trait PlaybackTarget {
    fn batch_start(&mut self);

    fn batch_end(&mut self);

    /// Execute one operation; `Ok(false)` is a soft failure.
    fn play(&mut self, op: &dyn Operation) -> Result<bool, OperationError>;
}

/// Trait for operation routers
pub trait OperationRouter {
    /// Route `operations` and play them back on `playback`.
    fn push(&mut self, operations: Vec<Box<dyn Operation>>, playback: &mut dyn PlaybackTarget) -> Result<(), RouterError>;

    /// Stop accepting operations.
    fn close(&mut self) -> Result<(), RouterError>;

    fn has_local_unsynced_ops(&self) -> bool;

    fn has_session_host_connection(&self) -> bool;
}

pub type Clock = Box<dyn Fn() -> i64>;

/// Plays operations back locally as soon as they are pushed.
pub struct TrivialOperationRouter {
    factory: OperationFactory,
    clock: Clock,
    closed: bool,
}

impl TrivialOperationRouter {
    pub fn new() -> Self {
        Self::with_clock(Box::new(|| Utc::now().timestamp_millis()))
    }

    /// Router stamping operations with the time reported by `clock`.
    pub fn with_clock(clock: Clock) -> Self {
        Self {
            factory: OperationFactory::default(),
            clock,
            closed: false,
        }
    }

    /// Fresh copy of `op` stamped with the current time.
    fn restamp(&self, op: &dyn Operation) -> Result<Box<dyn Operation>, RouterError> {
        let mut copy = self.factory.create(&op.spec())?;
        copy.base_mut().timestamp = (self.clock)();
        Ok(copy)
    }
}

impl Default for TrivialOperationRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl OperationRouter for TrivialOperationRouter {
    fn push(&mut self, operations: Vec<Box<dyn Operation>>, playback: &mut dyn PlaybackTarget) -> Result<(), RouterError> {
        if self.closed {
            return Err(RouterError::Closed);
        }
        debug!(count = operations.len(), "Playing back operations");

        playback.batch_start();
        for op in operations {
            let op = match self.restamp(op.as_ref()) {
                Ok(op) => op,
                Err(err) => {
                    playback.batch_end();
                    return Err(err);
                }
            };
            match playback.play(op.as_ref()) {
                Ok(true) => {}
                Ok(false) => {
                    warn!(optype = op.optype(), member_id = op.memberid(), "Operation had no effect");
                }
                Err(source) => {
                    error!(optype = op.optype(), member_id = op.memberid(), error = %source, "Operation failed");
                    playback.batch_end();
                    return Err(RouterError::Operation {
                        optype: op.optype().to_string(),
                        source,
                    });
                }
            }
        }
        playback.batch_end();
        Ok(())
    }

    fn close(&mut self) -> Result<(), RouterError> {
        self.closed = true;
        Ok(())
    }

    fn has_local_unsynced_ops(&self) -> bool {
        false
    }

    fn has_session_host_connection(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{AddCursor, InsertText, OpBase};

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl PlaybackTarget for Recorder {
        fn batch_start(&mut self) {
            self.events.push("start".to_string());
        }

        fn batch_end(&mut self) {
            self.events.push("end".to_string());
        }

        fn play(&mut self, op: &dyn Operation) -> Result<bool, OperationError> {
            self.events.push(format!("{}@{}", op.optype(), op.timestamp()));
            match op.optype() {
                "InsertText" => Err(OperationError::contract("InsertText", "rejected")),
                _ => Ok(false),
            }
        }
    }

    fn router() -> TrivialOperationRouter {
        TrivialOperationRouter::with_clock(Box::new(|| 42))
    }

    #[test]
    fn test_push_restamps_and_brackets_batch() {
        let mut router = router();
        let mut recorder = Recorder::default();
        let ops: Vec<Box<dyn Operation>> = vec![
            Box::new(AddCursor { base: OpBase::new("alice") }),
            Box::new(AddCursor { base: OpBase::new("bob") }),
        ];

        router.push(ops, &mut recorder).unwrap();

        assert_eq!(recorder.events, vec!["start", "AddCursor@42", "AddCursor@42", "end"]);
    }

    #[test]
    fn test_hard_failure_stops_batch() {
        let mut router = router();
        let mut recorder = Recorder::default();
        let ops: Vec<Box<dyn Operation>> = vec![
            Box::new(InsertText {
                base: OpBase::new("alice"),
                position: 0,
                text: "x".to_string(),
                move_cursor: false,
            }),
            Box::new(AddCursor { base: OpBase::new("alice") }),
        ];

        let result = router.push(ops, &mut recorder);

        assert!(matches!(result, Err(RouterError::Operation { optype, .. }) if optype == "InsertText"));
        assert_eq!(recorder.events, vec!["start", "InsertText@42", "end"]);
    }

    #[test]
    fn test_closed_router_rejects_push() {
        let mut router = router();
        router.close().unwrap();
        let mut recorder = Recorder::default();
        assert!(matches!(router.push(Vec::new(), &mut recorder), Err(RouterError::Closed)));
        assert!(recorder.events.is_empty());
        assert!(router.has_session_host_connection());
        assert!(!router.has_local_unsynced_ops());
    }
}
