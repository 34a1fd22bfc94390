//! The general-purpose server binary: wires up whichever [`StoreBackend`]
//! `Config::from_env` resolves to, including Redis and Postgres, unlike
//! the single-backend demo binaries in `demos/`.
//!
//! Run with: `cargo run -p acp-server --bin acp-server --features full`

use std::sync::Arc;

use acp_core::message::Message;
use acp_server::agent::{RunYield, SyncGeneratorAgent};
use acp_server::config::{Config, StoreBackend};
use acp_server::executor::ExecutorStores;
use acp_server::integrations::axum::{router, AppState};
use acp_server::prelude::*;
use acp_server::registration;

#[tokio::main]
async fn main() {
    acp_server::init_tracing();
    let config = Config::from_env();

    let backing: Arc<dyn Store> = match config.store_backend.clone() {
        StoreBackend::Memory { ttl, max_size } => {
            let memory_store = Arc::new(acp_server::store::MemoryStore::new(ttl, max_size));
            memory_store.spawn_ttl_sweeper(std::time::Duration::from_secs(30));
            memory_store
        }
        StoreBackend::Redis { url, db_index } => {
            #[cfg(feature = "redis-backend")]
            {
                Arc::new(
                    acp_server::store::RedisStore::new(&url, db_index)
                        .expect("failed to construct redis store"),
                )
            }
            #[cfg(not(feature = "redis-backend"))]
            {
                let _ = (url, db_index);
                panic!("built without the redis-backend feature; rebuild with --features redis-backend");
            }
        }
        StoreBackend::Sql { database_url } => {
            #[cfg(feature = "sql-backend")]
            {
                Arc::new(
                    acp_server::store::SqlStore::connect(&database_url)
                        .await
                        .expect("failed to connect to database"),
                )
            }
            #[cfg(not(feature = "sql-backend"))]
            {
                let _ = database_url;
                panic!("built without the sql-backend feature; rebuild with --features sql-backend");
            }
        }
    };

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

    tracing::info!(address = %config.bind_address, "acp-server listening");
    axum::serve(listener, app).await.expect("server error");
}
