//! The tagged event union emitted by the executor, modeled as a `#[serde(tag
//! = "type")]` enum in the style of `ag-ui-core::event::Event` but scoped to
//! run-lifecycle and message-assembly observations rather than chat deltas.

use serde::{Deserialize, Serialize};

use crate::error::AcpError;
use crate::message::{Message, MessagePart};
use crate::run::Run;

/// One totally-ordered observation about a run.
///
/// The six `run.*` variants carry the current [`Run`] snapshot; the
/// `message.*` and `generic`/`error` variants carry only the incremental
/// payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    #[serde(rename = "run.created")]
    RunCreated { run: Run },
    #[serde(rename = "run.in-progress")]
    RunInProgress { run: Run },
    #[serde(rename = "run.awaiting")]
    RunAwaiting { run: Run },
    #[serde(rename = "run.cancelled")]
    RunCancelled { run: Run },
    #[serde(rename = "run.failed")]
    RunFailed { run: Run },
    #[serde(rename = "run.completed")]
    RunCompleted { run: Run },
    #[serde(rename = "message.created")]
    MessageCreated { role: Option<String> },
    #[serde(rename = "message.part")]
    MessagePart { part: MessagePart },
    #[serde(rename = "message.completed")]
    MessageCompleted { message: Message },
    Generic { value: serde_json::Value },
    Error { error: AcpError },
}

impl Event {
    /// Whether this event type is the last event any subscriber will see
    /// for its run: no terminal event is ever followed by a further one.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Event::RunCancelled { .. } | Event::RunFailed { .. } | Event::RunCompleted { .. }
        )
    }

    /// The `type` discriminant as it appears on the wire, useful for log
    /// fields and assertions without re-serializing the whole event.
    #[must_use]
    pub fn type_tag(&self) -> &'static str {
        match self {
            Event::RunCreated { .. } => "run.created",
            Event::RunInProgress { .. } => "run.in-progress",
            Event::RunAwaiting { .. } => "run.awaiting",
            Event::RunCancelled { .. } => "run.cancelled",
            Event::RunFailed { .. } => "run.failed",
            Event::RunCompleted { .. } => "run.completed",
            Event::MessageCreated { .. } => "message.created",
            Event::MessagePart { .. } => "message.part",
            Event::MessageCompleted { .. } => "message.completed",
            Event::Generic { .. } => "generic",
            Event::Error { .. } => "error",
        }
    }
}
