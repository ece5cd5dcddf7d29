//! Observability boundary.
//!
//! Graph and link logic MUST NOT log directly.
//! All instrumentation flows through `Event` and `EventSink`; the default
//! sink forwards events to `tracing`.
use crate::value::ObjectId;
use std::{cell::RefCell, rc::Rc};

///
/// Event
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Event {
    Constructed {
        schema: String,
        object: ObjectId,
    },
    FieldAssigned {
        object: ObjectId,
        field: String,
    },
    FieldModified {
        object: ObjectId,
        field: String,
        snapshot: bool,
    },
    LinkAttached {
        object: ObjectId,
        field: String,
        peer: ObjectId,
    },
    LinkDetached {
        object: ObjectId,
        field: String,
        peer: ObjectId,
    },
    ValidationFailed {
        object: ObjectId,
        issues: usize,
    },
    Saved {
        schema: String,
        object: ObjectId,
        created: bool,
    },
    Deleted {
        schema: String,
        object: ObjectId,
        soft: bool,
    },
    Restored {
        object: ObjectId,
    },
    Reset {
        object: ObjectId,
        fields: usize,
    },
}

///
/// EventSink
///

pub trait EventSink {
    fn record(&self, event: Event);
}

///
/// TracingSink
/// Default sink; emits one structured `tracing` event per engine event.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: Event) {
        match event {
            Event::Constructed { schema, object } => {
                tracing::debug!(%schema, %object, "object constructed");
            }
            Event::FieldAssigned { object, field } => {
                tracing::trace!(%object, %field, "field assigned");
            }
            Event::FieldModified {
                object,
                field,
                snapshot,
            } => {
                tracing::trace!(%object, %field, snapshot, "field modified");
            }
            Event::LinkAttached {
                object,
                field,
                peer,
            } => {
                tracing::debug!(%object, %field, %peer, "link attached");
            }
            Event::LinkDetached {
                object,
                field,
                peer,
            } => {
                tracing::debug!(%object, %field, %peer, "link detached");
            }
            Event::ValidationFailed { object, issues } => {
                tracing::debug!(%object, issues, "validation failed");
            }
            Event::Saved {
                schema,
                object,
                created,
            } => {
                tracing::debug!(%schema, %object, created, "object saved");
            }
            Event::Deleted {
                schema,
                object,
                soft,
            } => {
                tracing::debug!(%schema, %object, soft, "object deleted");
            }
            Event::Restored { object } => {
                tracing::debug!(%object, "object restored");
            }
            Event::Reset { object, fields } => {
                tracing::debug!(%object, fields, "object reset");
            }
        }
    }
}

///
/// MemorySink
/// Captures events in order; clones share the same buffer.
///

#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    events: Rc<RefCell<Vec<Event>>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl EventSink for MemorySink {
    fn record(&self, event: Event) {
        self.events.borrow_mut().push(event);
    }
}
