//! An agent that yields its input back one word at a time with a delay
//! between parts, for exercising cancellation of a streaming run
//! mid-flight. Defaults to a short in-memory store TTL so TTL expiry can
//! be exercised too.
//!
//! Run with: `cargo run -p slow-echo-agent`

use std::sync::Arc;
use std::time::Duration;

use acp_core::message::Message;
use acp_server::agent::{Agent, AgentContext, RunYield};
use acp_server::config::{Config, StoreBackend};
use acp_server::error::EngineResult;
use acp_server::executor::ExecutorStores;
use acp_server::integrations::axum::{router, AppState};
use acp_server::prelude::*;
use acp_server::registration;
use acp_server::store::MemoryStore;
use async_trait::async_trait;

struct SlowEchoAgent {
    delay: Duration,
}

#[async_trait]
impl Agent for SlowEchoAgent {
    fn name(&self) -> &str {
        "slow-echo"
    }

    fn description(&self) -> &str {
        "streams its input back one word at a time, pausing between words"
    }

    async fn run(&self, input: Vec<Message>, ctx: AgentContext) -> EngineResult<()> {
        let words: Vec<String> = input
            .iter()
            .flat_map(|m| m.plain_text().split_whitespace().map(str::to_string).collect::<Vec<_>>())
            .collect();

        for word in words {
            if ctx.is_cancelled() {
                break;
            }
            ctx.emit(RunYield::text(format!("{word} ")));
            tokio::select! {
                _ = tokio::time::sleep(self.delay) => {}
                _ = ctx.cancelled() => break,
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
        panic!("slow-echo-agent is a minimal demo; run acp-server directly for redis/sql backends");
    };
    // Defaults to a short TTL, unlike the other demos, so store-entry
    // expiry can be exercised without overriding ACP_STORE_TTL_SECONDS.
    let ttl = ttl.or(Some(Duration::from_secs(30)));
    let memory_store = Arc::new(MemoryStore::new(ttl, max_size));
    memory_store.spawn_ttl_sweeper(Duration::from_secs(5));
    let backing: Arc<dyn Store> = memory_store;

    let registry = AgentRegistry::new().with_agent(Arc::new(SlowEchoAgent {
        delay: Duration::from_millis(500),
    }));

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

    tracing::info!(address = %config.bind_address, "slow-echo-agent listening");
    axum::serve(listener, app).await.expect("server error");
}
