//! The canonical echo agent: echoes back every accumulated input
//! message in order, whether invoked sync or streamed. With session
//! history prepended, a run's output always has the same length as its
//! effective input.
//!
//! Run with: `cargo run -p echo-agent`

use std::sync::Arc;

use acp_core::message::Message;
use acp_server::agent::{RunYield, SyncGeneratorAgent};
use acp_server::config::{Config, StoreBackend};
use acp_server::executor::ExecutorStores;
use acp_server::integrations::axum::{router, AppState};
use acp_server::prelude::*;
use acp_server::registration;
use acp_server::store::MemoryStore;

#[tokio::main]
async fn main() {
    acp_server::init_tracing();
    let config = Config::from_env();

    let StoreBackend::Memory { ttl, max_size } = config.store_backend.clone() else {
        panic!("echo-agent is a minimal demo; run acp-server directly for redis/sql backends");
    };
    let memory_store = Arc::new(MemoryStore::new(ttl, max_size));
    memory_store.spawn_ttl_sweeper(std::time::Duration::from_secs(30));
    let backing: Arc<dyn Store> = memory_store;

    let registry = AgentRegistry::new().with_agent(Arc::new(SyncGeneratorAgent::new(
        "echo",
        |input: Vec<Message>| input.into_iter().map(RunYield::Message).collect(),
    )));

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

    tracing::info!(address = %config.bind_address, "echo-agent listening");
    axum::serve(listener, app).await.expect("server error");
}
