//! The HTTP surface: stateless endpoints translating requests into
//! executor operations and the run's watched event sequence into SSE,
//! blocking-sync, or async-acknowledgement responses.
//!
//! Shaped after `ag-ui-server::integrations::axum`'s handler/router split
//! (`State<T>` extractor, `Router::new().route(...)`, SSE via
//! `Body::from_stream`), generalized from one agent per server to a named
//! registry and from one response mode to three.

use std::convert::Infallible;
use std::sync::Arc;

use acp_core::error::AcpError;
use acp_core::ids::{RunId, SessionId};
use acp_core::message::Message;
use acp_core::run::{Run, RunData, RunStatus};
use acp_core::session::Session;
use acp_core::wire::{CreateRunRequest, Mode, ResumeRunRequest};
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::StreamExt;
use tokio::sync::oneshot;

use crate::agent::AgentRegistry;
use crate::error::{EngineError, EngineResult};
use crate::executor::{Executor, ExecutorStores};
use crate::session::SessionManager;
use crate::store::StoreView;

/// Shared application state threaded through every handler.
#[derive(Clone)]
pub struct AppState {
    pub registry: AgentRegistry,
    pub stores: ExecutorStores,
    pub sessions: SessionManager,
    pub resources: StoreView<Message>,
}

impl AppState {
    fn executor(&self) -> Executor {
        Executor::new(self.stores.clone())
    }
}

/// Builds the full ACP router over `state`.
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/agents", get(list_agents))
        .route("/agents/:name", get(describe_agent))
        .route("/ping", get(ping))
        .route("/runs", post(create_run))
        .route("/runs/:id", get(get_run).post(resume_run))
        .route("/runs/:id/events", get(get_run_events))
        .route("/runs/:id/cancel", post(cancel_run))
        .route("/sessions/:id", get(get_session))
        .route("/resources/:id", get(get_resource))
        .with_state(state)
}

async fn ping() -> &'static str {
    "pong"
}

async fn list_agents(State(state): State<AppState>) -> Json<Vec<crate::agent::AgentInfo>> {
    Json(state.registry.list())
}

async fn describe_agent(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<crate::agent::AgentInfo>, ApiError> {
    let agent = state
        .registry
        .get(&name)
        .ok_or_else(|| EngineError::UnknownAgent(name.clone()))?;
    Ok(Json(crate::agent::AgentInfo {
        name: agent.name().to_string(),
        description: agent.description().to_string(),
    }))
}

/// Wraps [`EngineError`] so it can be returned directly from a handler and
/// rendered as a `{code, message}` body, with the status mapping from
/// [`acp_core::error::AcpErrorCode::status_code`] (422 for invalid_input
/// rather than the generic 400 reserved for body-parse failures).
struct ApiError(AcpError);

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        ApiError(e.into_acp_error())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.code.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.0)).into_response()
    }
}

fn run_id_header(run_id: &RunId) -> (&'static str, HeaderValue) {
    (
        "Run-ID",
        HeaderValue::from_str(run_id.as_str()).unwrap_or_else(|_| HeaderValue::from_static("")),
    )
}

async fn create_run(
    State(state): State<AppState>,
    Json(req): Json<CreateRunRequest>,
) -> Result<Response, ApiError> {
    let agent = state
        .registry
        .get(&req.agent_name)
        .ok_or_else(|| EngineError::UnknownAgent(req.agent_name.clone()))?;

    let effective_session_id = if let Some(session) = req.session {
        state
            .sessions
            .adopt(session.clone())
            .await
            .map_err(ApiError::from)?;
        Some(session.id)
    } else if let Some(id) = req.session_id {
        state.sessions.get_or_create(&id).await?;
        Some(id)
    } else {
        None
    };

    let mut history = Vec::new();
    if let Some(id) = &effective_session_id {
        history = state.sessions.history(id).await?;
    }
    let mut effective_input = history;
    effective_input.extend(req.input.clone());

    let mut run = Run::new(req.agent_name.clone(), req.input, now_millis());
    if let Some(id) = &effective_session_id {
        run = run.with_session(id.clone());
    }
    let run_id = run.id.clone();
    let run_data = RunData::new(run.clone());
    state
        .stores
        .run_store
        .set(run_id.as_str(), &run_data)
        .await?;

    if let Some(id) = &effective_session_id {
        state.sessions.append_run(id, run_id.clone()).await?;
    }

    match req.mode {
        Mode::Async => {
            let (ready_tx, ready_rx) = oneshot::channel();
            let _ = ready_tx.send(());
            spawn_execution(state.clone(), agent, run_data, effective_input, ready_rx);
            Ok(accepted_response(&run_id, &run))
        }
        Mode::Sync => {
            let (ready_tx, ready_rx) = oneshot::channel();
            let watch = state.stores.run_store.watch(run_id.as_str(), Some(ready_tx)).await?;
            spawn_execution(state.clone(), agent, run_data, effective_input, ready_rx);
            let final_run = wait_for_terminal(watch).await?;
            Ok(Json(final_run).into_response())
        }
        Mode::Stream => {
            let (ready_tx, ready_rx) = oneshot::channel();
            let watch = state.stores.run_store.watch(run_id.as_str(), Some(ready_tx)).await?;
            spawn_execution(state.clone(), agent, run_data, effective_input, ready_rx);
            Ok(sse_response(run_id, watch, 0))
        }
    }
}

fn spawn_execution(
    state: AppState,
    agent: Arc<dyn crate::agent::Agent>,
    run_data: RunData,
    effective_input: Vec<Message>,
    ready: oneshot::Receiver<()>,
) {
    tokio::spawn(async move {
        let executor = state.executor();
        if let Err(e) = executor.execute(agent, run_data, effective_input, ready).await {
            tracing::error!(error = %e, "run execution failed");
        }
    });
}

fn accepted_response(run_id: &RunId, run: &Run) -> Response {
    let mut response = (StatusCode::ACCEPTED, Json(run)).into_response();
    response
        .headers_mut()
        .insert(run_id_header(run_id).0, run_id_header(run_id).1);
    response
}

/// Drains a run-data watch stream, discarding events, until a terminal
/// snapshot is observed. This is the blocking-sync projection of run
/// execution.
async fn wait_for_terminal(
    mut watch: crate::store::TypedWatchStream<RunData>,
) -> EngineResult<Run> {
    while let Some(run_data) = watch.next().await {
        if run_data.run.status.is_terminal() {
            return Ok(run_data.run);
        }
    }
    Err(EngineError::Internal(
        "run watch ended before a terminal status was observed".to_string(),
    ))
}

/// Builds the SSE projection of run execution: emits every event beyond
/// `start_index` as a `data: <json>\n\n` frame, closing after a terminal
/// run event.
fn sse_response(
    run_id: RunId,
    mut watch: crate::store::TypedWatchStream<RunData>,
    start_index: usize,
) -> Response {
    let mut emitted = start_index;
    let body_stream = async_stream::stream! {
        while let Some(run_data) = watch.next().await {
            let events = &run_data.events;
            if events.len() > emitted {
                for event in &events[emitted..] {
                    let json = serde_json::to_string(event)
                        .unwrap_or_else(|_| "{}".to_string());
                    yield Ok::<_, Infallible>(bytes::Bytes::from(format!("data: {json}\n\n")));
                }
                emitted = events.len();
            }
            if run_data.run.status.is_terminal() {
                break;
            }
        }
    };

    let mut response = Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "text/event-stream")
        .header("Cache-Control", "no-cache")
        .body(Body::from_stream(body_stream))
        .unwrap_or_else(|_| Response::new(Body::empty()));
    response
        .headers_mut()
        .insert(run_id_header(&run_id).0, run_id_header(&run_id).1);
    response
}

/// Reads a run's current record, promoting its status to `CANCELLING`
/// when a cancellation has been requested but the executor hasn't yet
/// persisted a terminal snapshot. The cancel token lives in its own
/// store so the executor's last-written `RunData` is never raced by the
/// HTTP layer; every read path goes through here so polling clients can
/// observe CANCELLING instead of seeing the run sit at `IN_PROGRESS`
/// until it resolves.
async fn find_run_data(state: &AppState, run_id: &RunId) -> EngineResult<RunData> {
    let mut run_data: RunData = state
        .stores
        .run_store
        .get(run_id.as_str())
        .await?
        .ok_or_else(|| EngineError::RunNotFound(run_id.as_str().to_string()))?;
    if !run_data.run.status.is_terminal() {
        let cancelled = state.stores.cancel_store.get(run_id.as_str()).await?;
        if cancelled.is_some() {
            run_data.run.status = RunStatus::Cancelling;
        }
    }
    Ok(run_data)
}

async fn get_run(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let run_id = RunId::new(id);
    let run_data = find_run_data(&state, &run_id).await?;
    Ok(accepted_like(&run_id, StatusCode::OK, &run_data.run))
}

fn accepted_like(run_id: &RunId, status: StatusCode, run: &Run) -> Response {
    let mut response = (status, Json(run)).into_response();
    response
        .headers_mut()
        .insert(run_id_header(run_id).0, run_id_header(run_id).1);
    response
}

async fn get_run_events(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<acp_core::event::Event>>, ApiError> {
    let run_id = RunId::new(id);
    let run_data = find_run_data(&state, &run_id).await?;
    Ok(Json(run_data.events))
}

async fn resume_run(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ResumeRunRequest>,
) -> Result<Response, Response> {
    let run_id = RunId::new(id);
    let run_data = find_run_data(&state, &run_id)
        .await
        .map_err(|e| ApiError::from(e).into_response())?;

    let Some(pending) = &run_data.run.await_request else {
        return Err(ApiError::from(EngineError::InvalidRequest(
            "run is not awaiting a resume".to_string(),
        ))
        .into_response());
    };
    if !pending.matches(&req.await_resume) {
        let body = AcpError::invalid_input("resume type does not match the pending await request");
        return Err((StatusCode::FORBIDDEN, Json(body)).into_response());
    }

    state
        .stores
        .resume_store
        .set(run_id.as_str(), &req.await_resume)
        .await
        .map_err(|e| ApiError::from(e).into_response())?;

    match req.mode {
        Mode::Async => Ok(accepted_like(&run_id, StatusCode::ACCEPTED, &run_data.run)),
        Mode::Sync => {
            let watch = state
                .stores
                .run_store
                .watch(run_id.as_str(), None)
                .await
                .map_err(|e| ApiError::from(e).into_response())?;
            let final_run = wait_for_terminal(watch)
                .await
                .map_err(|e| ApiError::from(e).into_response())?;
            Ok(Json(final_run).into_response())
        }
        Mode::Stream => {
            let start_index = run_data.events.len();
            let watch = state
                .stores
                .run_store
                .watch(run_id.as_str(), None)
                .await
                .map_err(|e| ApiError::from(e).into_response())?;
            Ok(sse_response(run_id, watch, start_index))
        }
    }
}

async fn cancel_run(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let run_id = RunId::new(id);
    let run_data = find_run_data(&state, &run_id).await?;

    if run_data.run.status.is_terminal() {
        return Err(EngineError::CancelTerminalRun.into());
    }

    state
        .stores
        .cancel_store
        .set(run_id.as_str(), &serde_json::json!(true))
        .await?;

    let response_run = find_run_data(&state, &run_id).await?.run;
    Ok(accepted_like(&run_id, StatusCode::ACCEPTED, &response_run))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Session>, ApiError> {
    let session = state.sessions.get(&SessionId::new(id)).await?;
    Ok(Json(session))
}

async fn get_resource(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Message>, ApiError> {
    let value = state
        .resources
        .get(&id)
        .await?
        .ok_or_else(|| EngineError::ResourceNotFound(id.clone()))?;
    Ok(Json(value))
}

fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentRegistry, RunYield, SyncGeneratorAgent};
    use crate::store::MemoryStore;
    use acp_core::message::MessagePart;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        let backing: Arc<dyn crate::store::Store> = Arc::new(MemoryStore::new(None, None));
        let stores = ExecutorStores {
            run_store: StoreView::new(Arc::clone(&backing), "run"),
            cancel_store: StoreView::new(Arc::clone(&backing), "cancel"),
            resume_store: StoreView::new(Arc::clone(&backing), "resume"),
        };
        let sessions = SessionManager::new(
            StoreView::new(Arc::clone(&backing), "session"),
            stores.run_store.clone(),
        );
        let registry = AgentRegistry::new().with_agent(Arc::new(SyncGeneratorAgent::new(
            "echo",
            |input: Vec<Message>| input.into_iter().map(RunYield::Message).collect(),
        )));
        AppState {
            registry,
            stores,
            sessions,
            resources: StoreView::new(backing, "resource"),
        }
    }

    #[tokio::test]
    async fn echo_sync_run_completes() {
        let app = router(test_state());
        let body = serde_json::json!({
            "agent_name": "echo",
            "input": [{"parts": [{"content_type": "text/plain", "content": "Hello!"}]}],
            "mode": "sync",
        });
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/runs")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let run: Run = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(run.output.len(), 1);
    }

    #[tokio::test]
    async fn ping_is_ok() {
        let app = router(test_state());
        let request = axum::http::Request::builder()
            .uri("/ping")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn cancel_terminal_run_is_rejected() {
        let state = test_state();
        let app = router(state.clone());
        let body = serde_json::json!({
            "agent_name": "echo",
            "input": [{"parts": [{"content_type": "text/plain", "content": "hi"}]}],
            "mode": "sync",
        });
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/runs")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let run_id = response
            .headers()
            .get("Run-ID")
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();

        let cancel_request = axum::http::Request::builder()
            .method("POST")
            .uri(format!("/runs/{run_id}/cancel"))
            .body(Body::empty())
            .unwrap();
        let cancel_response = app.oneshot(cancel_request).await.unwrap();
        assert_eq!(cancel_response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
