//! An agent exercising the await/resume flow: it asks a clarifying
//! question, suspends, and echoes back whatever resume value the client
//! supplies. Resuming with a mismatched await-request type gets a `403`
//! from the server without this agent ever being involved.
//!
//! Run with: `cargo run -p awaiter-agent`

use std::sync::Arc;

use acp_core::message::{Message, MessagePart};
use acp_core::run::{AwaitRequest, AwaitResume};
use acp_server::agent::{Agent, AgentContext, RunYield};
use acp_server::config::{Config, StoreBackend};
use acp_server::error::EngineResult;
use acp_server::executor::ExecutorStores;
use acp_server::integrations::axum::{router, AppState};
use acp_server::prelude::*;
use acp_server::registration;
use acp_server::store::MemoryStore;
use async_trait::async_trait;

struct AwaiterAgent;

#[async_trait]
impl Agent for AwaiterAgent {
    fn name(&self) -> &str {
        "awaiter"
    }

    fn description(&self) -> &str {
        "asks one clarifying question, then echoes the resumed answer"
    }

    async fn run(&self, _input: Vec<Message>, ctx: AgentContext) -> EngineResult<()> {
        ctx.emit(RunYield::Await(AwaitRequest::Message {
            message: Message::new(vec![MessagePart::text("What should I call you?")]),
        }));

        match ctx.await_resume().await {
            Some(AwaitResume::Message { message }) => {
                let reply = MessagePart::text(format!("Nice to meet you, {}", message.plain_text()));
                ctx.emit(RunYield::Message(Message::new(vec![reply])));
            }
            Some(_) => {
                // The server rejects a type-mismatched resume before it
                // ever reaches the agent, so this arm is unreachable in
                // practice; it exists only because Confirmation resumes
                // are a distinct value of the same enum.
                ctx.emit(RunYield::Error("unexpected resume type".into()));
            }
            None => {
                ctx.emit(RunYield::Error("run was cancelled while awaiting".into()));
            }
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    acp_server::init_tracing();
    let config = Config::from_env();

    let StoreBackend::Memory { ttl, max_size } = config.store_backend.clone() else {
        panic!("awaiter-agent is a minimal demo; run acp-server directly for redis/sql backends");
    };
    let memory_store = Arc::new(MemoryStore::new(ttl, max_size));
    memory_store.spawn_ttl_sweeper(std::time::Duration::from_secs(30));
    let backing: Arc<dyn Store> = memory_store;

    let registry = AgentRegistry::new().with_agent(Arc::new(AwaiterAgent));

    let stores = ExecutorStores {
        run_store: StoreView::new(Arc::clone(&backing), "run"),
        cancel_store: StoreView::new(Arc::clone(&backing), "cancel"),
        resume_store: StoreView::new(Arc::clone(&backing), "resume"),
    };
    let sessions = SessionManager::new(
        StoreView::new(Arc::clone(&backing), "session"),
        stores.run_store.clone(),
    );
    let resources = StoreView::new(backing, "resource");

    let state = AppState {
        registry,
        stores,
        sessions,
        resources,
    };

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .expect("failed to bind to address");

    registration::spawn_if_enabled(&config, config.bind_address.clone());

    tracing::info!(address = %config.bind_address, "awaiter-agent listening");
    axum::serve(listener, app).await.expect("server error");
}
