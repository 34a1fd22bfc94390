//! Framework integrations. `axum` is the only one today, gated behind the
//! `axum-integration` feature (on by default), mirroring
//! `ag-ui-server::integrations`.

#[cfg(feature = "axum-integration")]
pub mod axum;
