//! The executor: drives exactly one run from `CREATED` to a terminal
//! state, bridging the agent adapter's yields into the run's event
//! stream and persisting every state mutation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use acp_core::event::Event;
use acp_core::message::{Message, MessagePart};
use acp_core::run::{RunData, RunStatus};
use futures::StreamExt;
use tokio::sync::{mpsc, oneshot};

use crate::agent::{adapt, Agent, RunYield};
use crate::error::EngineResult;
use crate::store::StoreView;

/// The three store views the executor touches: run data, cancel tokens,
/// and resume values, each keyed by run id.
#[derive(Clone)]
pub struct ExecutorStores {
    pub run_store: StoreView<RunData>,
    pub cancel_store: StoreView<serde_json::Value>,
    pub resume_store: StoreView<acp_core::run::AwaitResume>,
}

/// Drives one run to completion.
pub struct Executor {
    stores: ExecutorStores,
}

/// Tracks whether the currently-open implicit message has any parts
/// yet, separate from whether the Message struct has been created, so
/// `message.created` fires exactly once per open span.
struct ImplicitMessage {
    parts: Vec<MessagePart>,
}

impl Executor {
    #[must_use]
    pub fn new(stores: ExecutorStores) -> Self {
        Self { stores }
    }

    async fn persist(&self, run_data: &RunData) -> EngineResult<()> {
        self.stores
            .run_store
            .set(run_data.run.id.as_str(), run_data)
            .await
    }

    /// Drives `run_data` (expected to already be persisted with status
    /// `CREATED`) through the full lifecycle, using `effective_input`
    /// (session history prepended, if applicable) as the agent's input.
    /// `ready` is awaited first so the HTTP layer can enroll a stream
    /// subscriber before `run.created` is emitted.
    pub async fn execute(
        &self,
        agent: Arc<dyn Agent>,
        mut run_data: RunData,
        effective_input: Vec<Message>,
        ready: oneshot::Receiver<()>,
    ) -> EngineResult<()> {
        let _ = ready.await;
        let run_id = run_data.run.id.clone();

        run_data.push_event(Event::RunCreated {
            run: run_data.run.clone(),
        });
        self.persist(&run_data).await?;

        let cancel_requested = Arc::new(AtomicBool::new(false));
        let (cancel_notify_tx, mut cancel_notify_rx) = mpsc::unbounded_channel::<()>();
        self.spawn_cancel_watcher(run_id.as_str().to_string(), cancel_notify_tx);

        run_data.run.status = RunStatus::InProgress;
        run_data.push_event(Event::RunInProgress {
            run: run_data.run.clone(),
        });
        self.persist(&run_data).await?;

        let agent_name = agent.name().to_string();
        let mut adapter = adapt(agent, effective_input);
        let mut open: Option<ImplicitMessage> = None;

        loop {
            tokio::select! {
                biased;
                _ = cancel_notify_rx.recv() => {
                    cancel_requested.store(true, Ordering::SeqCst);
                    adapter.cancellation.cancel();
                }
                maybe_yield = adapter.yields.next() => {
                    match maybe_yield {
                        Some(value) => {
                            self.apply_yield(
                                &mut run_data,
                                &mut open,
                                &mut adapter,
                                value,
                                &cancel_requested,
                                &agent_name,
                            )
                            .await?;
                            if run_data.run.status.is_terminal() {
                                break;
                            }
                        }
                        None => {
                            self.finalize_exhausted(
                                &mut run_data,
                                &mut open,
                                &cancel_requested,
                                &agent_name,
                            )
                            .await?;
                            break;
                        }
                    }
                }
            }
        }

        Ok(())
    }

    async fn apply_yield(
        &self,
        run_data: &mut RunData,
        open: &mut Option<ImplicitMessage>,
        adapter: &mut crate::agent::AgentAdapter,
        value: RunYield,
        cancel_requested: &Arc<AtomicBool>,
        agent_name: &str,
    ) -> EngineResult<()> {
        match value {
            RunYield::Part(part) => {
                if open.is_none() {
                    run_data.push_event(Event::MessageCreated {
                        role: Some(default_role(agent_name)),
                    });
                    *open = Some(ImplicitMessage { parts: Vec::new() });
                }
                run_data.push_event(Event::MessagePart { part: part.clone() });
                if let Some(msg) = open {
                    msg.parts.push(part);
                }
                self.persist(run_data).await?;
            }
            RunYield::Message(mut message) => {
                self.close_open_message(run_data, open, agent_name).await?;
                if message.role.is_none() {
                    message.role = Some(default_role(agent_name));
                }
                run_data.push_event(Event::MessageCreated {
                    role: message.role.clone(),
                });
                run_data.run.output.push(message.clone());
                run_data.push_event(Event::MessageCompleted { message });
                self.persist(run_data).await?;
            }
            RunYield::Close => {
                self.close_open_message(run_data, open, agent_name).await?;
            }
            RunYield::Generic(v) => {
                self.close_open_message(run_data, open, agent_name).await?;
                run_data.push_event(Event::Generic { value: v });
                self.persist(run_data).await?;
            }
            RunYield::Await(request) => {
                self.close_open_message(run_data, open, agent_name).await?;
                run_data.run.await_request = Some(request);
                run_data.run.status = RunStatus::Awaiting;
                run_data.push_event(Event::RunAwaiting {
                    run: run_data.run.clone(),
                });
                self.persist(run_data).await?;
                self.wait_for_resume(run_data, adapter, cancel_requested)
                    .await?;
            }
            RunYield::Error(message) => {
                self.close_open_message(run_data, open, agent_name).await?;
                let error = acp_core::error::AcpError::server_error(message);
                run_data.run.error = Some(error.clone());
                run_data.run.status = RunStatus::Failed;
                run_data.run.finished_at = Some(now());
                run_data.push_event(Event::Error {
                    error: error.clone(),
                });
                run_data.push_event(Event::RunFailed {
                    run: run_data.run.clone(),
                });
                self.persist(run_data).await?;
            }
        }
        Ok(())
    }

    async fn close_open_message(
        &self,
        run_data: &mut RunData,
        open: &mut Option<ImplicitMessage>,
        agent_name: &str,
    ) -> EngineResult<()> {
        if let Some(msg) = open.take() {
            let message = Message::new(msg.parts).with_role(default_role(agent_name));
            run_data.run.output.push(message.clone());
            run_data.push_event(Event::MessageCompleted { message });
            self.persist(run_data).await?;
        }
        Ok(())
    }

    /// Blocks (cooperatively, cancellable) until a resume value is
    /// written to `resume_store` for this run, then injects it back into
    /// the agent and transitions back to `IN_PROGRESS`.
    async fn wait_for_resume(
        &self,
        run_data: &mut RunData,
        adapter: &mut crate::agent::AgentAdapter,
        cancel_requested: &Arc<AtomicBool>,
    ) -> EngineResult<()> {
        let run_id = run_data.run.id.as_str().to_string();
        let mut resume_stream = self.stores.resume_store.watch(&run_id, None).await?;

        let (cancel_tx, mut cancel_rx) = mpsc::unbounded_channel::<()>();
        self.spawn_cancel_watcher(run_id.clone(), cancel_tx);

        tokio::select! {
            biased;
            _ = cancel_rx.recv() => {
                cancel_requested.store(true, Ordering::SeqCst);
                adapter.cancellation.cancel();
                return Ok(());
            }
            resume = resume_stream.next() => {
                if let Some(resume_value) = resume {
                    self.stores.resume_store.delete(&run_id).await?;
                    let _ = adapter.resume_tx.send(resume_value);
                    run_data.run.await_request = None;
                    run_data.run.status = RunStatus::InProgress;
                    run_data.push_event(Event::RunInProgress {
                        run: run_data.run.clone(),
                    });
                    self.persist(run_data).await?;
                }
            }
        }
        Ok(())
    }

    async fn finalize_exhausted(
        &self,
        run_data: &mut RunData,
        open: &mut Option<ImplicitMessage>,
        cancel_requested: &Arc<AtomicBool>,
        agent_name: &str,
    ) -> EngineResult<()> {
        self.close_open_message(run_data, open, agent_name).await?;
        if cancel_requested.load(Ordering::SeqCst) {
            run_data.run.status = RunStatus::Cancelled;
            run_data.run.finished_at = Some(now());
            run_data.push_event(Event::RunCancelled {
                run: run_data.run.clone(),
            });
        } else {
            run_data.run.status = RunStatus::Completed;
            run_data.run.finished_at = Some(now());
            run_data.push_event(Event::RunCompleted {
                run: run_data.run.clone(),
            });
        }
        self.persist(run_data).await
    }

    fn spawn_cancel_watcher(&self, run_id: String, notify: mpsc::UnboundedSender<()>) {
        let cancel_store = self.stores.cancel_store.clone();
        tokio::spawn(async move {
            if let Ok(mut stream) = cancel_store.watch(&run_id, None).await {
                if stream.next().await.is_some() {
                    let _ = notify.send(());
                }
            }
        });
    }
}

/// The role stamped onto an agent-emitted message that didn't supply its
/// own: `agent/<name>`, unless the agent supplied a role explicitly.
fn default_role(agent_name: &str) -> String {
    format!("agent/{agent_name}")
}

/// Millisecond epoch timestamp helper; executor-internal only, so tests
/// that need deterministic timestamps construct `RunData` directly
/// instead of going through `Executor::execute`.
fn now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::SyncFnAgent;
    use crate::store::MemoryStore;
    use acp_core::run::Run;
    use std::time::Duration;

    fn stores() -> ExecutorStores {
        let backing: Arc<dyn crate::store::Store> = Arc::new(MemoryStore::new(None, None));
        ExecutorStores {
            run_store: StoreView::new(Arc::clone(&backing), "run"),
            cancel_store: StoreView::new(Arc::clone(&backing), "cancel"),
            resume_store: StoreView::new(backing, "resume"),
        }
    }

    #[tokio::test]
    async fn echo_run_completes_with_output() {
        let stores = stores();
        let executor = Executor::new(stores.clone());
        let run = Run::new("echo", vec![Message::new(vec![MessagePart::text("Hello!")])], 0);
        let run_id = run.id.clone();
        let run_data = RunData::new(run);
        stores.run_store.set(run_id.as_str(), &run_data).await.unwrap();

        let agent = Arc::new(SyncFnAgent::new("echo", |input: Vec<Message>| {
            Ok(input.into_iter().next().unwrap_or_default())
        }));

        let (ready_tx, ready_rx) = oneshot::channel();
        ready_tx.send(()).unwrap();

        let effective_input = run_data.run.input.clone();
        executor
            .execute(agent, run_data, effective_input, ready_rx)
            .await
            .unwrap();

        let final_data: RunData = stores.run_store.get(run_id.as_str()).await.unwrap().unwrap();
        assert_eq!(final_data.run.status, RunStatus::Completed);
        assert_eq!(final_data.run.output.len(), 1);
        assert!(final_data.events.last().unwrap().is_terminal());
    }

    #[tokio::test]
    async fn await_then_resume_completes() {
        let stores = stores();
        let executor = Executor::new(stores.clone());
        let run = Run::new("awaiter", vec![], 0);
        let run_id = run.id.clone();
        let run_data = RunData::new(run);
        stores.run_store.set(run_id.as_str(), &run_data).await.unwrap();

        struct AwaiterAgent;

        #[async_trait::async_trait]
        impl Agent for AwaiterAgent {
            fn name(&self) -> &str {
                "awaiter"
            }

            async fn run(
                &self,
                _input: Vec<Message>,
                ctx: crate::agent::AgentContext,
            ) -> EngineResult<()> {
                ctx.emit(RunYield::Await(acp_core::run::AwaitRequest::Message {
                    message: Message::default(),
                }));
                ctx.await_resume().await;
                ctx.emit(RunYield::Message(Message::default()));
                Ok(())
            }
        }

        let agent = Arc::new(AwaiterAgent);

        let (ready_tx, ready_rx) = oneshot::channel();
        ready_tx.send(()).unwrap();
        let run_id_clone = run_id.clone();
        let resume_store = stores.resume_store.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let resume = acp_core::run::AwaitResume::Message {
                message: Message::default(),
            };
            resume_store.set(run_id_clone.as_str(), &resume).await.unwrap();
        });

        executor
            .execute(agent, run_data, vec![], ready_rx)
            .await
            .unwrap();

        let final_data: RunData = stores.run_store.get(run_id.as_str()).await.unwrap().unwrap();
        assert_eq!(final_data.run.status, RunStatus::Completed);
    }
}
