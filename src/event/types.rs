//! Event types
//!
//! The event model shared by the tokenizer and the path matcher.

use crate::error::Result;
use crate::types::Scalar;
use std::collections::VecDeque;

/// Kind of a parse event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// `{`
    StartMap,
    /// `}`
    EndMap,
    /// `[`
    StartArray,
    /// `]`
    EndArray,
    /// A scalar value
    Scalar,
}

/// One structural event
///
/// `path` names the position with every array index replaced by `item`, so
/// the location of the second file of the third reporting structure is
/// `reporting_structure.item.in_network_files.item.location`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEvent {
    /// Structural path of the event
    pub path: String,
    /// Event kind
    pub kind: EventKind,
    /// Value, present only for `EventKind::Scalar`
    pub value: Option<Scalar>,
}

impl ParseEvent {
    /// Create a container event
    pub fn container(path: impl Into<String>, kind: EventKind) -> Self {
        Self {
            path: path.into(),
            kind,
            value: None,
        }
    }

    /// Create a scalar event
    pub fn scalar(path: impl Into<String>, value: Scalar) -> Self {
        Self {
            path: path.into(),
            kind: EventKind::Scalar,
            value: Some(value),
        }
    }

    /// Shorthand for a string scalar event
    pub fn string(path: impl Into<String>, value: impl Into<String>) -> Self {
        Self::scalar(path, Scalar::String(value.into()))
    }
}

/// Forward-only cursor over parse events
///
/// `Ok(None)` marks the end of the stream. `Err(Error::MalformedEvent)` is a
/// single unusable event; the source stays positioned after it and can be
/// polled again. Any other error means the source cannot continue.
pub trait EventSource {
    /// Pull the next event
    fn next_event(&mut self) -> Result<Option<ParseEvent>>;
}

impl<S: EventSource + ?Sized> EventSource for Box<S> {
    fn next_event(&mut self) -> Result<Option<ParseEvent>> {
        (**self).next_event()
    }
}

/// Event source replaying a prepared sequence
///
/// Useful when events come from another tokenizer or from tests.
#[derive(Debug, Default)]
pub struct ReplaySource {
    events: VecDeque<Result<ParseEvent>>,
}

impl ReplaySource {
    /// Replay well-formed events
    pub fn new(events: impl IntoIterator<Item = ParseEvent>) -> Self {
        Self {
            events: events.into_iter().map(Ok).collect(),
        }
    }

    /// Replay events that may include failures
    pub fn with_results(events: impl IntoIterator<Item = Result<ParseEvent>>) -> Self {
        Self {
            events: events.into_iter().collect(),
        }
    }
}

impl EventSource for ReplaySource {
    fn next_event(&mut self) -> Result<Option<ParseEvent>> {
        self.events.pop_front().transpose()
    }
}
