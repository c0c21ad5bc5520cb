//! # Document Handle
//!
//! A `TeiDocument` pairs the materialized state with the complete event log
//! that derives it. Documents are values: every operation takes `&self` and
//! returns a new document, so older versions stay valid for as long as a
//! caller holds them.
//!
//! ## Lifecycle
//!
//! ```text
//! load → r0 ─op→ r1 ─op→ r2 ─undo_to(1)→ (state r1, log r0..r2) ─op→ r2'
//! ```
//!
//! The log is never edited while it is replayed. The one exception to pure
//! appending is the first edit made from a state behind the head of the
//! log: the undone tail is dropped before the new event is appended, which
//! keeps revisions unique and strictly increasing (linear undo).

use crate::apply::apply;
use crate::error::{DocumentError, Result};
use crate::event::{DocumentEvent, EventKind};
use crate::history::rebuild_state;
use crate::models::DocumentState;
use std::sync::Arc;
use teidoc_types::Revision;

/// Document state plus the event log that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct TeiDocument {
    state: DocumentState,
    events: Vec<Arc<DocumentEvent>>,
}

impl TeiDocument {
    /// Load a document from markup (revision 0, one `loaded` event)
    pub fn load(xml: &str) -> Result<Self> {
        crate::builder::load_document(xml)
    }

    /// Wrap a freshly built state with its `loaded` event
    pub(crate) fn from_loaded(state: DocumentState) -> Self {
        let event = DocumentEvent::new(
            state.revision,
            EventKind::Loaded {
                xml: Arc::clone(&state.xml),
            },
        );
        Self {
            state,
            events: vec![Arc::new(event)],
        }
    }

    /// Rebuild a document at the head of a previously recorded log
    pub fn from_events(events: Vec<DocumentEvent>) -> Result<Self> {
        let events: Vec<Arc<DocumentEvent>> = events.into_iter().map(Arc::new).collect();
        let state = rebuild_state(&events)?;
        Ok(Self { state, events })
    }

    pub(crate) fn with_state(&self, state: DocumentState) -> Self {
        Self {
            state,
            events: self.events.clone(),
        }
    }

    pub fn state(&self) -> &DocumentState {
        &self.state
    }

    pub fn events(&self) -> &[Arc<DocumentEvent>] {
        &self.events
    }

    /// Revision of the materialized state
    pub fn revision(&self) -> Revision {
        self.state.revision
    }

    /// Revision of the newest event in the log
    pub fn head_revision(&self) -> Revision {
        self.events
            .last()
            .map(|event| event.revision)
            .unwrap_or(self.state.revision)
    }

    /// True when the state reflects the whole log
    pub fn is_at_head(&self) -> bool {
        self.state.revision == self.head_revision()
    }

    /// Revision the next committed event will carry
    pub(crate) fn next_revision(&self) -> Result<Revision> {
        self.state.revision.checked_next().ok_or_else(|| {
            DocumentError::MalformedLog(format!(
                "revision space exhausted after {}",
                self.state.revision
            ))
        })
    }

    /// Record `kind` as the next revision and return the resulting document
    ///
    /// Fails without side effects if the event cannot be applied.
    pub(crate) fn commit(&self, kind: EventKind) -> Result<Self> {
        let revision = self.next_revision()?;
        let event = DocumentEvent::new(revision, kind);
        let state = apply(&self.state, &event)?;

        let current = self.state.revision;
        let mut events: Vec<Arc<DocumentEvent>> = self
            .events
            .iter()
            .take_while(|e| e.revision <= current)
            .cloned()
            .collect();
        if events.len() < self.events.len() {
            tracing::info!(
                "Discarding {} undone events after {}",
                self.events.len() - events.len(),
                current
            );
        }

        tracing::debug!("Committed {} at {}", event.kind.name(), revision);
        events.push(Arc::new(event));

        Ok(Self { state, events })
    }
}
