//! The ACP run engine: the server-side subsystem that drives runs from
//! creation to a terminal state, persists them to a pluggable store, and
//! exposes them over HTTP in three response modes.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod agent;
pub mod config;
pub mod error;
pub mod executor;
pub mod registration;
pub mod session;
pub mod store;

#[cfg(feature = "axum-integration")]
pub mod integrations;

pub mod prelude {
    //! Re-exports of the types most call sites need.
    pub use crate::agent::{Agent, AgentContext, AgentRegistry, RunYield};
    pub use crate::config::Config;
    pub use crate::error::{EngineError, EngineResult};
    pub use crate::executor::{Executor, ExecutorStores};
    pub use crate::session::SessionManager;
    pub use crate::store::{MemoryStore, Store, StoreView};
}

/// Initializes `tracing` from `RUST_LOG`, following the pattern of
/// `ag-ui-server`'s example binaries.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .try_init();
}
