//! Session management: appending run ids and composing replay history
//! from the store.

use acp_core::ids::{RunId, SessionId};
use acp_core::message::Message;
use acp_core::run::{RunData, RunStatus};
use acp_core::session::Session;

use crate::error::{EngineError, EngineResult};
use crate::store::StoreView;

/// Store-backed session operations. Appending a run id is the only
/// mutation; `history` is a read composed from the run store at call
/// time, never cached, so it always reflects each contributing run's
/// current status.
#[derive(Clone)]
pub struct SessionManager {
    session_store: StoreView<Session>,
    run_store: StoreView<RunData>,
}

impl SessionManager {
    #[must_use]
    pub fn new(session_store: StoreView<Session>, run_store: StoreView<RunData>) -> Self {
        Self {
            session_store,
            run_store,
        }
    }

    pub async fn get(&self, id: &SessionId) -> EngineResult<Session> {
        self.session_store
            .get(id.as_str())
            .await?
            .ok_or_else(|| EngineError::SessionNotFound(id.as_str().to_string()))
    }

    pub async fn get_or_create(&self, id: &SessionId) -> EngineResult<Session> {
        match self.session_store.get(id.as_str()).await? {
            Some(session) => Ok(session),
            None => {
                let session = Session::new(id.clone());
                self.session_store.set(id.as_str(), &session).await?;
                Ok(session)
            }
        }
    }

    /// Adopts a session value forwarded by a client (distributed-session
    /// support requires the client to forward the whole Session to a new
    /// server, which then adopts and persists it), overwriting whatever
    /// this server previously had for that id.
    pub async fn adopt(&self, session: Session) -> EngineResult<()> {
        self.session_store.set(session.id.as_str(), &session).await
    }

    pub async fn append_run(&self, id: &SessionId, run_id: RunId) -> EngineResult<()> {
        let mut session = self.get_or_create(id).await?;
        session.append_run(run_id);
        self.session_store.set(id.as_str(), &session).await
    }

    /// Concatenates, in order, every contributing run's `input` followed
    /// by its `output`, for each run that is `COMPLETED` at read time.
    /// Non-completed runs are skipped entirely: history is a projection
    /// over finished conversation turns only.
    pub async fn history(&self, id: &SessionId) -> EngineResult<Vec<Message>> {
        let session = self.get(id).await?;
        let mut history = Vec::new();
        for run_id in &session.run_ids {
            let Some(run_data) = self.run_store.get(run_id.as_str()).await? else {
                continue;
            };
            if run_data.run.status != RunStatus::Completed {
                continue;
            }
            history.extend(run_data.run.input);
            history.extend(run_data.run.output);
        }
        Ok(history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use acp_core::message::MessagePart;
    use acp_core::run::Run;
    use std::sync::Arc;

    fn managers() -> SessionManager {
        let backing: Arc<dyn crate::store::Store> = Arc::new(MemoryStore::new(None, None));
        SessionManager::new(
            StoreView::new(Arc::clone(&backing), "session"),
            StoreView::new(backing, "run"),
        )
    }

    #[tokio::test]
    async fn history_skips_non_completed_runs() {
        let manager = managers();
        let session_id = SessionId::random();

        let mut completed = Run::new("echo", vec![Message::new(vec![MessagePart::text("a")])], 0);
        completed.status = RunStatus::Completed;
        completed.output = vec![Message::new(vec![MessagePart::text("a")])];
        let completed_id = completed.id.clone();
        manager
            .run_store
            .set(completed_id.as_str(), &RunData::new(completed))
            .await
            .unwrap();

        let mut in_progress = Run::new("echo", vec![Message::new(vec![MessagePart::text("b")])], 0);
        in_progress.status = RunStatus::InProgress;
        let in_progress_id = in_progress.id.clone();
        manager
            .run_store
            .set(in_progress_id.as_str(), &RunData::new(in_progress))
            .await
            .unwrap();

        manager.append_run(&session_id, completed_id).await.unwrap();
        manager.append_run(&session_id, in_progress_id).await.unwrap();

        let history = manager.history(&session_id).await.unwrap();
        // completed run contributes input + output (2 messages); the
        // in-progress run contributes nothing.
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn append_run_preserves_order() {
        let manager = managers();
        let session_id = SessionId::random();
        let a = RunId::random();
        let b = RunId::random();
        manager.append_run(&session_id, a.clone()).await.unwrap();
        manager.append_run(&session_id, b.clone()).await.unwrap();
        let session = manager.get(&session_id).await.unwrap();
        assert_eq!(session.run_ids, vec![a, b]);
    }
}
