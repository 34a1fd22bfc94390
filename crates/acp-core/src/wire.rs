//! Request/response shapes for the HTTP surface, shared by the server and
//! client crates so they agree on one JSON contract without the client
//! depending on the server's internals.

use serde::{Deserialize, Serialize};

use crate::ids::SessionId;
use crate::message::Message;
use crate::run::AwaitResume;
use crate::session::Session;

/// The three invocation modes: block for the result, fire-and-forget, or
/// stream events as they happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Sync,
    Async,
    Stream,
}

/// Body of `POST /runs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRunRequest {
    pub agent_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<Session>,
    pub input: Vec<Message>,
    pub mode: Mode,
}

/// Body of `POST /runs/{id}` (resume).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeRunRequest {
    pub await_resume: AwaitResume,
    pub mode: Mode,
}

/// Describes a registered agent for `GET /agents` / `GET /agents/{name}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentInfo {
    pub name: String,
    pub description: String,
}
