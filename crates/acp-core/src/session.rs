//! A [`Session`] is an ordered list of run ids sharing replayed history.

use serde::{Deserialize, Serialize};

use crate::ids::{RunId, SessionId};

/// Ordered sequence of run ids belonging to one conversation.
///
/// Appending a run id is the session's only mutation;
/// composing the replay history itself requires reading each run's
/// current status from the store, so that logic lives alongside the
/// store-aware code in `acp-server` rather than here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub run_ids: Vec<RunId>,
}

impl Session {
    #[must_use]
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            run_ids: Vec::new(),
        }
    }

    pub fn append_run(&mut self, run_id: RunId) {
        self.run_ids.push(run_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_preserves_order() {
        let mut session = Session::new(SessionId::random());
        let a = RunId::random();
        let b = RunId::random();
        session.append_run(a.clone());
        session.append_run(b.clone());
        assert_eq!(session.run_ids, vec![a, b]);
    }
}
