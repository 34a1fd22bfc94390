//! The run lifecycle: [`Run`], [`RunData`], [`RunStatus`], and the
//! await/resume pair.

use serde::{Deserialize, Serialize};

use crate::error::AcpError;
use crate::event::Event;
use crate::ids::{RunId, SessionId};
use crate::message::Message;

/// The run state machine:
///
/// ```text
/// CREATED -> IN_PROGRESS -> { AWAITING <-> IN_PROGRESS }* -> COMPLETED
///                       \-> CANCELLING -> CANCELLED
///                       \-> FAILED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Created,
    InProgress,
    Awaiting,
    Cancelling,
    Cancelled,
    Completed,
    Failed,
}

impl RunStatus {
    /// Terminal statuses never transition further; a snapshot persisted
    /// with one of these is the final snapshot for the run.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Cancelled | RunStatus::Failed
        )
    }
}

/// Tagged await request variants: a message-shaped clarifying question,
/// or a yes/no confirmation prompt. The tag is kept explicit (rather
/// than a bare `Message`) so resume-type matching has something to
/// compare against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AwaitRequest {
    Message { message: Message },
    Confirmation { prompt: String },
}

/// The client-supplied counterpart to an [`AwaitRequest`]. Must match the
/// pending request's variant tag on resume, or the resume is rejected with
/// `invalid_input`, surfaced by the HTTP layer as a literal 403.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AwaitResume {
    Message { message: Message },
    Confirmation { approved: bool },
}

impl AwaitRequest {
    /// Whether `resume`'s tag matches this request's tag.
    #[must_use]
    pub fn matches(&self, resume: &AwaitResume) -> bool {
        matches!(
            (self, resume),
            (AwaitRequest::Message { .. }, AwaitResume::Message { .. })
                | (AwaitRequest::Confirmation { .. }, AwaitResume::Confirmation { .. })
        )
    }
}

/// One invocation of an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: RunId,
    pub agent_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub await_request: Option<AwaitRequest>,
    /// The run's input, preserved for session history composition.
    pub input: Vec<Message>,
    /// Ordered messages the agent has produced so far (or in full, once
    /// terminal).
    pub output: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<AcpError>,
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<i64>,
}

impl Run {
    #[must_use]
    pub fn new(agent_name: impl Into<String>, input: Vec<Message>, created_at: i64) -> Self {
        Self {
            id: RunId::random(),
            agent_name: agent_name.into(),
            session_id: None,
            status: RunStatus::Created,
            await_request: None,
            input,
            output: Vec::new(),
            error: None,
            created_at,
            finished_at: None,
        }
    }

    #[must_use]
    pub fn with_session(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }
}

/// The persisted record: the [`Run`] plus the full ordered event history
/// the executor has emitted for it, so late subscribers can be replayed
/// from any point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunData {
    pub run: Run,
    pub events: Vec<Event>,
}

impl RunData {
    #[must_use]
    pub fn new(run: Run) -> Self {
        Self {
            run,
            events: Vec::new(),
        }
    }

    /// Appends an event, keeping `events` as the single source of truth
    /// the stream endpoint and `GET /runs/{id}/events` both read from.
    pub fn push_event(&mut self, event: Event) {
        self.events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(RunStatus::Completed.is_terminal());
        assert!(RunStatus::Cancelled.is_terminal());
        assert!(RunStatus::Failed.is_terminal());
        assert!(!RunStatus::InProgress.is_terminal());
        assert!(!RunStatus::Awaiting.is_terminal());
        assert!(!RunStatus::Cancelling.is_terminal());
        assert!(!RunStatus::Created.is_terminal());
    }

    #[test]
    fn await_resume_type_matching() {
        let req = AwaitRequest::Message {
            message: Message::default(),
        };
        let resume = AwaitResume::Message {
            message: Message::default(),
        };
        assert!(req.matches(&resume));
    }

    #[test]
    fn await_resume_type_mismatch_is_rejected() {
        let req = AwaitRequest::Message {
            message: Message::default(),
        };
        let resume = AwaitResume::Confirmation { approved: true };
        assert!(!req.matches(&resume));
    }

    #[test]
    fn new_run_starts_created_with_no_output() {
        let run = Run::new("echo", vec![Message::default()], 0);
        assert_eq!(run.status, RunStatus::Created);
        assert!(run.output.is_empty());
        assert!(run.await_request.is_none());
        assert!(run.error.is_none());
    }

    #[test]
    fn run_data_accumulates_events_in_order() {
        let run = Run::new("echo", vec![], 0);
        let mut data = RunData::new(run.clone());
        data.push_event(Event::RunCreated { run: run.clone() });
        data.push_event(Event::RunInProgress { run });
        assert_eq!(data.events.len(), 2);
    }
}
