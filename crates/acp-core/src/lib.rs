//! Shared wire types for the Agent Communication Protocol: messages, runs,
//! events, sessions, and the error taxonomy, used by both the server and
//! client crates so they agree on a single JSON shape.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod event;
pub mod ids;
pub mod message;
pub mod run;
pub mod session;
pub mod wire;

pub mod prelude {
    //! Re-exports of the types most call sites need.
    pub use crate::error::{AcpError, AcpErrorCode};
    pub use crate::event::Event;
    pub use crate::ids::{MessageId, RunId, SessionId};
    pub use crate::message::{ContentEncoding, Message, MessagePart};
    pub use crate::run::{AwaitRequest, AwaitResume, Run, RunData, RunStatus};
    pub use crate::session::Session;
    pub use crate::wire::{AgentInfo, CreateRunRequest, Mode, ResumeRunRequest};
}
