//! # History
//!
//! State reconstruction from an event log. Undo, redo and time travel are
//! all the same move: pick a prefix of the log and fold [`apply`] over it,
//! starting from the state the `loaded` event describes.
//!
//! None of these functions touch the log; the returned document carries
//! the same events as its input, only the materialized state changes.

use crate::apply::apply;
use crate::builder::build_state;
use crate::document::TeiDocument;
use crate::error::{DocumentError, Result};
use crate::event::{DocumentEvent, EventKind};
use crate::models::DocumentState;
use std::borrow::Borrow;
use teidoc_types::Revision;

/// Replay a whole log into a state
///
/// The first event must be `loaded`; every following revision must be
/// strictly greater than the one before it.
pub fn rebuild_state<E: Borrow<DocumentEvent>>(events: &[E]) -> Result<DocumentState> {
    let (first, rest) = events
        .split_first()
        .ok_or_else(|| DocumentError::MalformedLog("event log is empty".to_string()))?;
    let first = first.borrow();

    let EventKind::Loaded { xml } = &first.kind else {
        return Err(DocumentError::MalformedLog(format!(
            "log starts with {} instead of loaded",
            first.kind.name()
        )));
    };

    let mut state = build_state(xml)?;
    state.revision = first.revision;

    for event in rest {
        let event = event.borrow();
        if event.revision <= state.revision {
            return Err(DocumentError::MalformedLog(format!(
                "revision {} follows {}",
                event.revision, state.revision
            )));
        }
        state = apply(&state, event)?;
    }

    tracing::debug!("Rebuilt state at {} from {} events", state.revision, events.len());
    Ok(state)
}

/// Rewind to `target`, which must be older than the current state
pub fn undo_to(doc: &TeiDocument, target: Revision) -> Result<TeiDocument> {
    let current = doc.revision();
    if target >= current {
        return Err(DocumentError::InvalidHistoryTarget {
            target,
            reason: format!("undo target must be before {}", current),
        });
    }

    let state = replay_through(doc, target)?;
    tracing::debug!("Undo {} -> {}", current, state.revision);
    Ok(doc.with_state(state))
}

/// Step back one revision; a document at its first revision is returned as is
pub fn undo(doc: &TeiDocument) -> Result<TeiDocument> {
    let current = doc.revision();
    let previous = doc
        .events()
        .iter()
        .map(|e| e.revision)
        .filter(|&r| r < current)
        .last();

    match previous {
        Some(target) => undo_to(doc, target),
        None => Ok(doc.clone()),
    }
}

/// Move forward to the first logged revision after `from`
///
/// Returns the document unchanged when nothing was logged after `from`.
pub fn redo_from(doc: &TeiDocument, from: Revision) -> Result<TeiDocument> {
    let Some(target) = doc
        .events()
        .iter()
        .map(|e| e.revision)
        .find(|&r| r > from)
    else {
        return Ok(doc.clone());
    };

    let state = replay_through(doc, target)?;
    tracing::debug!("Redo {} -> {}", from, state.revision);
    Ok(doc.with_state(state))
}

/// Redo the step after the current state
pub fn redo(doc: &TeiDocument) -> Result<TeiDocument> {
    redo_from(doc, doc.revision())
}

/// Materialize the state after the first `target + 1` events of the log
pub fn time_travel(doc: &TeiDocument, target: usize) -> Result<TeiDocument> {
    let events = doc.events();
    if target >= events.len() {
        return Err(DocumentError::InvalidHistoryTarget {
            target: Revision(target as u64),
            reason: format!("log holds {} events", events.len()),
        });
    }

    let state = rebuild_state(&events[..=target])?;
    Ok(doc.with_state(state))
}

pub fn can_undo(doc: &TeiDocument) -> bool {
    doc.events()
        .first()
        .is_some_and(|first| first.revision < doc.revision())
}

pub fn can_redo(doc: &TeiDocument) -> bool {
    doc.revision() < doc.head_revision()
}

fn replay_through(doc: &TeiDocument, target: Revision) -> Result<DocumentState> {
    let prefix: Vec<_> = doc
        .events()
        .iter()
        .take_while(|e| e.revision <= target)
        .cloned()
        .collect();
    rebuild_state(&prefix)
}
