//! Document signals and their synchronous dispatcher.

use odfkit_dom::NodeId;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    MemberAdded {
        member_id: String,
    },
    MemberUpdated {
        member_id: String,
    },
    MemberRemoved {
        member_id: String,
    },
    CursorAdded {
        member_id: String,
    },
    CursorRemoved {
        member_id: String,
    },
    CursorMoved {
        member_id: String,
        position: usize,
        length: i64,
    },
    ParagraphChanged {
        paragraph: NodeId,
        member_id: String,
        timestamp: i64,
    },
    CommonStyleCreated {
        name: String,
        family: String,
    },
    CommonStyleDeleted {
        name: String,
        family: String,
    },
    ParagraphStyleModified {
        name: String,
    },
    StepsInserted {
        position: usize,
        length: usize,
    },
    StepsRemoved {
        position: usize,
        length: usize,
    },
    AnnotationAdded {
        member_id: String,
        annotation: NodeId,
    },
    MetadataUpdated {
        set_properties: BTreeMap<String, String>,
        removed_properties: Vec<String>,
    },
    OperationStart {
        optype: String,
        member_id: String,
        timestamp: i64,
    },
    OperationEnd {
        optype: String,
        member_id: String,
        timestamp: i64,
    },
    ProcessingBatchStart,
    ProcessingBatchEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    MemberAdded,
    MemberUpdated,
    MemberRemoved,
    CursorAdded,
    CursorRemoved,
    CursorMoved,
    ParagraphChanged,
    CommonStyleCreated,
    CommonStyleDeleted,
    ParagraphStyleModified,
    StepsInserted,
    StepsRemoved,
    AnnotationAdded,
    MetadataUpdated,
    OperationStart,
    OperationEnd,
    ProcessingBatchStart,
    ProcessingBatchEnd,
}

impl Signal {
    pub fn kind(&self) -> SignalKind {
        match self {
            Signal::MemberAdded { .. } => SignalKind::MemberAdded,
            Signal::MemberUpdated { .. } => SignalKind::MemberUpdated,
            Signal::MemberRemoved { .. } => SignalKind::MemberRemoved,
            Signal::CursorAdded { .. } => SignalKind::CursorAdded,
            Signal::CursorRemoved { .. } => SignalKind::CursorRemoved,
            Signal::CursorMoved { .. } => SignalKind::CursorMoved,
            Signal::ParagraphChanged { .. } => SignalKind::ParagraphChanged,
            Signal::CommonStyleCreated { .. } => SignalKind::CommonStyleCreated,
            Signal::CommonStyleDeleted { .. } => SignalKind::CommonStyleDeleted,
            Signal::ParagraphStyleModified { .. } => SignalKind::ParagraphStyleModified,
            Signal::StepsInserted { .. } => SignalKind::StepsInserted,
            Signal::StepsRemoved { .. } => SignalKind::StepsRemoved,
            Signal::AnnotationAdded { .. } => SignalKind::AnnotationAdded,
            Signal::MetadataUpdated { .. } => SignalKind::MetadataUpdated,
            Signal::OperationStart { .. } => SignalKind::OperationStart,
            Signal::OperationEnd { .. } => SignalKind::OperationEnd,
            Signal::ProcessingBatchStart => SignalKind::ProcessingBatchStart,
            Signal::ProcessingBatchEnd => SignalKind::ProcessingBatchEnd,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Handler = Rc<dyn Fn(&Signal)>;

/// Delivers signals synchronously, in subscription order.
///
/// Handlers may subscribe, unsubscribe or emit while being called; the
/// handler list is snapshotted before each delivery.
#[derive(Default)]
pub struct EventNotifier {
    next_id: Cell<u64>,
    handlers: RefCell<Vec<(SubscriptionId, SignalKind, Handler)>>,
}

impl EventNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, kind: SignalKind, handler: impl Fn(&Signal) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(self.next_id.get() + 1);
        self.handlers.borrow_mut().push((id, kind, Rc::new(handler)));
        id
    }

    /// Returns false when `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.borrow_mut();
        let before = handlers.len();
        handlers.retain(|(existing, _, _)| *existing != id);
        handlers.len() != before
    }

    pub fn emit(&self, signal: &Signal) {
        let kind = signal.kind();
        let matching: Vec<Handler> = self
            .handlers
            .borrow()
            .iter()
            .filter(|(_, subscribed, _)| *subscribed == kind)
            .map(|(_, _, handler)| Rc::clone(handler))
            .collect();
        for handler in matching {
            handler(signal);
        }
    }
}

impl fmt::Debug for EventNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventNotifier")
            .field("subscriptions", &self.handlers.borrow().len())
            .finish()
    }
}
