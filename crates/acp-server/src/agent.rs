//! The agent adapter: normalizes four agent shapes — async generator,
//! async function, sync generator, sync function — into a single
//! asynchronous pipe of [`RunYield`] values, with an in-band resume
//! channel carrying [`AwaitResume`] values back in.
//!
//! Mirrors the shape of `ag-ui-server::agent::Agent` (a trait plus a
//! cheap-clone, cancellation-bearing context object) but scoped to ACP's
//! yield classification instead of a fixed event type.

use std::sync::Arc;

use acp_core::message::{Message, MessagePart};
use acp_core::run::AwaitResume;
use async_trait::async_trait;
use futures::stream::BoxStream;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;

use crate::error::{EngineError, EngineResult};

/// One value an agent can produce.
#[derive(Debug, Clone)]
pub enum RunYield {
    /// A complete message, closing any currently open implicit message.
    Message(Message),
    /// A part (or raw text, wrapped as a `text/plain` part) contributing
    /// to a currently open implicit message.
    Part(MessagePart),
    /// Suspends the stream until a matching [`AwaitResume`] arrives.
    Await(acp_core::run::AwaitRequest),
    /// Terminates the stream with an error.
    Error(String),
    /// An arbitrary structured value, surfaced for observability only.
    Generic(serde_json::Value),
    /// Explicitly closes an open implicit message without opening another.
    Close,
}

impl RunYield {
    /// Wraps a raw string as a `text/plain` part.
    #[must_use]
    pub fn text(s: impl Into<String>) -> Self {
        RunYield::Part(MessagePart::text(s))
    }
}

/// Per-run context handed to an agent: cancellation and the yield/resume
/// channels that make up its in-band resume channel.
#[derive(Clone)]
pub struct AgentContext {
    cancellation: CancellationToken,
    yield_tx: mpsc::UnboundedSender<RunYield>,
    resume_rx: Arc<Mutex<mpsc::UnboundedReceiver<AwaitResume>>>,
}

impl AgentContext {
    /// Emits one yielded value to the executor.
    pub fn emit(&self, value: RunYield) {
        let _ = self.yield_tx.send(value);
    }

    /// Suspends until the executor injects a resume value (or the channel
    /// closes because the run was dropped).
    pub async fn await_resume(&self) -> Option<AwaitResume> {
        self.resume_rx.lock().await.recv().await
    }

    /// Whether a cancellation has been requested; agents should check
    /// this at their cooperative checkpoints.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Resolves once cancellation has been requested.
    pub async fn cancelled(&self) {
        self.cancellation.cancelled().await;
    }
}

/// Normalizes any of the four agent shapes into a pull-based stream of
/// [`RunYield`] values plus a sender for injecting resumes.
pub struct AgentAdapter {
    pub yields: BoxStream<'static, RunYield>,
    pub resume_tx: mpsc::UnboundedSender<AwaitResume>,
    pub cancellation: CancellationToken,
}

fn build_context(
    cancellation: CancellationToken,
) -> (AgentContext, mpsc::UnboundedReceiver<RunYield>, mpsc::UnboundedSender<AwaitResume>) {
    let (yield_tx, yield_rx) = mpsc::unbounded_channel();
    let (resume_tx, resume_rx) = mpsc::unbounded_channel();
    let ctx = AgentContext {
        cancellation,
        yield_tx,
        resume_rx: Arc::new(Mutex::new(resume_rx)),
    };
    (ctx, yield_rx, resume_tx)
}

/// A registered agent. `run` drives one invocation to completion, emitting
/// yields through `ctx` and reading resumes back through it; the adapter
/// turns that into the stream the executor consumes.
#[async_trait]
pub trait Agent: Send + Sync + 'static {
    fn name(&self) -> &str;

    /// A short human-readable description, used by `GET /agents/{name}`.
    fn description(&self) -> &str {
        ""
    }

    async fn run(&self, input: Vec<Message>, ctx: AgentContext) -> EngineResult<()>;
}

/// Drives `agent.run` as a background task and exposes its yields as a
/// stream, implementing the "async generator" native shape directly.
pub fn adapt(agent: Arc<dyn Agent>, input: Vec<Message>) -> AgentAdapter {
    let cancellation = CancellationToken::new();
    let (ctx, yield_rx, resume_tx) = build_context(cancellation.clone());

    tokio::spawn(async move {
        if let Err(e) = agent.run(input, ctx.clone()).await {
            ctx.emit(RunYield::Error(e.to_string()));
        }
    });

    AgentAdapter {
        yields: Box::pin(UnboundedReceiverStream::new(yield_rx)),
        resume_tx,
        cancellation,
    }
}

/// Wraps a single-shot async function as an [`Agent`] (the "async
/// function" shape): invoked once per run, its returned message closes
/// the run without further yields.
pub struct AsyncFnAgent<F> {
    name: String,
    description: String,
    func: Arc<F>,
}

impl<F, Fut> AsyncFnAgent<F>
where
    F: Fn(Vec<Message>) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<Message, String>> + Send + 'static,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            func: Arc::new(func),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

#[async_trait]
impl<F, Fut> Agent for AsyncFnAgent<F>
where
    F: Fn(Vec<Message>) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<Message, String>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn run(&self, input: Vec<Message>, ctx: AgentContext) -> EngineResult<()> {
        match (self.func)(input).await {
            Ok(message) => ctx.emit(RunYield::Message(message)),
            Err(e) => ctx.emit(RunYield::Error(e)),
        }
        Ok(())
    }
}

/// Wraps a synchronous, single-shot function `Fn(Vec<Message>) ->
/// Result<Message, String>` as an [`Agent`], driven on the blocking
/// thread pool so it never stalls the async event loop (the "sync
/// function" shape).
pub struct SyncFnAgent<F> {
    name: String,
    description: String,
    func: Arc<F>,
}

impl<F> SyncFnAgent<F>
where
    F: Fn(Vec<Message>) -> Result<Message, String> + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            func: Arc::new(func),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

#[async_trait]
impl<F> Agent for SyncFnAgent<F>
where
    F: Fn(Vec<Message>) -> Result<Message, String> + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn run(&self, input: Vec<Message>, ctx: AgentContext) -> EngineResult<()> {
        let func = Arc::clone(&self.func);
        let result = tokio::task::spawn_blocking(move || func(input))
            .await
            .map_err(|e| EngineError::Internal(e.to_string()))?;
        match result {
            Ok(message) => ctx.emit(RunYield::Message(message)),
            Err(e) => ctx.emit(RunYield::Error(e)),
        }
        Ok(())
    }
}

/// Wraps a synchronous function returning a finite sequence of yields,
/// driven eagerly on the blocking thread pool then replayed one at a time
/// (the "sync generator" shape).
pub struct SyncGeneratorAgent<F> {
    name: String,
    description: String,
    func: Arc<F>,
}

impl<F> SyncGeneratorAgent<F>
where
    F: Fn(Vec<Message>) -> Vec<RunYield> + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            func: Arc::new(func),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

#[async_trait]
impl<F> Agent for SyncGeneratorAgent<F>
where
    F: Fn(Vec<Message>) -> Vec<RunYield> + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn run(&self, input: Vec<Message>, ctx: AgentContext) -> EngineResult<()> {
        let func = Arc::clone(&self.func);
        let values = tokio::task::spawn_blocking(move || func(input))
            .await
            .map_err(|e| EngineError::Internal(e.to_string()))?;
        for value in values {
            if ctx.is_cancelled() {
                break;
            }
            ctx.emit(value);
        }
        Ok(())
    }
}

/// Describes a registered agent for `GET /agents` / `GET /agents/{name}`;
/// the wire shape lives in `acp-core` so the client crate can decode it
/// without depending on the server.
pub use acp_core::wire::AgentInfo;

/// The agent registry: a name-keyed lookup the HTTP surface and executor
/// share.
#[derive(Clone, Default)]
pub struct AgentRegistry {
    agents: std::collections::HashMap<String, Arc<dyn Agent>>,
}

impl AgentRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_agent(mut self, agent: Arc<dyn Agent>) -> Self {
        self.agents.insert(agent.name().to_string(), agent);
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Agent>> {
        self.agents.get(name).cloned()
    }

    pub fn list(&self) -> Vec<AgentInfo> {
        let mut infos: Vec<AgentInfo> = self
            .agents
            .values()
            .map(|a| AgentInfo {
                name: a.name().to_string(),
                description: a.description().to_string(),
            })
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn async_fn_agent_emits_one_message() {
        let agent = AsyncFnAgent::new("echo-async", |input: Vec<Message>| async move {
            Ok(input.into_iter().next().unwrap_or_default())
        });
        let mut adapter = adapt(
            Arc::new(agent),
            vec![Message::new(vec![MessagePart::text("hi")])],
        );
        let first = adapter.yields.next().await;
        assert!(matches!(first, Some(RunYield::Message(_))));
    }

    #[tokio::test]
    async fn sync_fn_agent_emits_one_message() {
        let agent = SyncFnAgent::new("echo", |input: Vec<Message>| {
            Ok(input.into_iter().next().unwrap_or_default())
        });
        let mut adapter = adapt(Arc::new(agent), vec![Message::new(vec![MessagePart::text("hi")])]);
        let first = adapter.yields.next().await;
        assert!(matches!(first, Some(RunYield::Message(_))));
    }

    #[tokio::test]
    async fn sync_generator_agent_stops_on_cancellation() {
        let agent = SyncGeneratorAgent::new("counter", |_input: Vec<Message>| {
            (0..5).map(|i| RunYield::text(i.to_string())).collect()
        });
        let adapter = adapt(Arc::new(agent), vec![]);
        adapter.cancellation.cancel();
        let collected: Vec<_> = adapter.yields.collect().await;
        // Cancellation is cooperative and checked between yields, so the
        // exact count depends on scheduling, but it must terminate.
        assert!(collected.len() <= 5);
    }

    #[tokio::test]
    async fn registry_lists_agents_sorted_by_name() {
        let registry = AgentRegistry::new()
            .with_agent(Arc::new(SyncFnAgent::new("zebra", |_| {
                Ok(Message::default())
            })))
            .with_agent(Arc::new(SyncFnAgent::new("alpha", |_| {
                Ok(Message::default())
            })));
        let names: Vec<_> = registry.list().into_iter().map(|a| a.name).collect();
        assert_eq!(names, vec!["alpha", "zebra"]);
    }
}
