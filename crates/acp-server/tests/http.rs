//! Integration tests exercising the full HTTP surface through
//! `tower::ServiceExt::oneshot`, one test per named scenario: echo sync,
//! stream creation, await/resume, mismatched-resume rejection,
//! cancel-while-streaming, session history, and store TTL expiry.

use std::sync::Arc;
use std::time::Duration;

use acp_core::event::Event;
use acp_core::message::{Message, MessagePart};
use acp_core::run::{AwaitRequest, AwaitResume, Run, RunStatus};
use acp_core::wire::Mode;
use acp_server::agent::SyncGeneratorAgent;
use acp_server::integrations::axum::{router, AppState};
use acp_server::prelude::*;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

fn build_state(agent: Arc<dyn Agent>) -> AppState {
    build_state_on(agent, Arc::new(MemoryStore::new(None, None)))
}

fn build_state_on(agent: Arc<dyn Agent>, backing: Arc<dyn Store>) -> AppState {
    let stores = ExecutorStores {
        run_store: StoreView::new(Arc::clone(&backing), "run"),
        cancel_store: StoreView::new(Arc::clone(&backing), "cancel"),
        resume_store: StoreView::new(Arc::clone(&backing), "resume"),
    };
    let sessions = SessionManager::new(
        StoreView::new(Arc::clone(&backing), "session"),
        stores.run_store.clone(),
    );
    AppState {
        registry: AgentRegistry::new().with_agent(agent),
        stores,
        sessions,
        resources: StoreView::new(backing, "resource"),
    }
}

fn echo_agent() -> Arc<dyn Agent> {
    Arc::new(SyncGeneratorAgent::new("echo", |input: Vec<Message>| {
        input.into_iter().map(RunYield::Message).collect()
    }))
}

fn run_id_of(response: &axum::response::Response) -> String {
    response
        .headers()
        .get("Run-ID")
        .expect("Run-ID header")
        .to_str()
        .unwrap()
        .to_string()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn post(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn poll_until_status(
    app: &axum::Router,
    run_id: &str,
    status: RunStatus,
) -> Run {
    for _ in 0..50 {
        let response = app.clone().oneshot(get(&format!("/runs/{run_id}"))).await.unwrap();
        let run: Run = serde_json::from_value(json_body(response).await).unwrap();
        if run.status == status {
            return run;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("run {run_id} never reached {status:?}");
}

/// Splits an SSE body into its decoded events, in order.
fn parse_sse_events(bytes: &[u8]) -> Vec<Event> {
    let text = String::from_utf8_lossy(bytes);
    text.split("\n\n")
        .filter(|frame| !frame.trim().is_empty())
        .map(|frame| {
            let json = frame.trim_start_matches("data:").trim();
            serde_json::from_str(json).unwrap_or_else(|e| panic!("bad SSE frame {frame:?}: {e}"))
        })
        .collect()
}

#[tokio::test]
async fn echo_sync_run_completes_with_matching_output() {
    let app = router(build_state(echo_agent()));
    let body = serde_json::json!({
        "agent_name": "echo",
        "input": [{"parts": [{"content_type": "text/plain", "content": "hi"}]}],
        "mode": "sync",
    });
    let response = app.oneshot(post("/runs", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let run: Run = serde_json::from_value(json_body(response).await).unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.output.len(), 1);
}

#[tokio::test]
async fn stream_mode_emits_created_then_completed() {
    let app = router(build_state(echo_agent()));
    let body = serde_json::json!({
        "agent_name": "echo",
        "input": [{"parts": [{"content_type": "text/plain", "content": "hi"}]}],
        "mode": "stream",
    });
    let response = app.oneshot(post("/runs", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "text/event-stream"
    );
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let events = parse_sse_events(&bytes);
    assert_eq!(events.first().unwrap().type_tag(), "run.created");
    assert_eq!(events.last().unwrap().type_tag(), "run.completed");
    assert!(events.iter().any(|e| e.type_tag() == "message.completed"));
}

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
            message: Message::new(vec![MessagePart::text("who goes there?")]),
        }));
        match ctx.await_resume().await {
            Some(AwaitResume::Message { message }) => {
                ctx.emit(RunYield::Message(Message::new(vec![MessagePart::text(
                    format!("hello, {}", message.plain_text()),
                )])));
            }
            _ => ctx.emit(RunYield::Error("unexpected resume".into())),
        }
        Ok(())
    }
}

#[tokio::test]
async fn await_then_matching_resume_completes_the_run() {
    let app = router(build_state(Arc::new(AwaiterAgent)));
    let create = serde_json::json!({
        "agent_name": "awaiter",
        "input": [],
        "mode": "async",
    });
    let response = app.clone().oneshot(post("/runs", create)).await.unwrap();
    let run_id = run_id_of(&response);

    let awaiting = poll_until_status(&app, &run_id, RunStatus::Awaiting).await;
    assert!(awaiting.await_request.is_some());

    let resume = serde_json::json!({
        "await_resume": {"type": "message", "message": {"parts": [{"content_type": "text/plain", "content": "a traveler"}]}},
        "mode": "sync",
    });
    let response = app.oneshot(post(&format!("/runs/{run_id}"), resume)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let run: Run = serde_json::from_value(json_body(response).await).unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.output.len(), 1);
    assert_eq!(run.output[0].plain_text(), "hello, a traveler");
}

#[tokio::test]
async fn mismatched_resume_type_is_rejected_with_403() {
    let app = router(build_state(Arc::new(AwaiterAgent)));
    let create = serde_json::json!({
        "agent_name": "awaiter",
        "input": [],
        "mode": "async",
    });
    let response = app.clone().oneshot(post("/runs", create)).await.unwrap();
    let run_id = run_id_of(&response);

    poll_until_status(&app, &run_id, RunStatus::Awaiting).await;

    let resume = serde_json::json!({
        "await_resume": {"type": "confirmation", "approved": true},
        "mode": "sync",
    });
    let response = app.oneshot(post(&format!("/runs/{run_id}"), resume)).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

struct SlowStreamingAgent;

#[async_trait]
impl Agent for SlowStreamingAgent {
    fn name(&self) -> &str {
        "slow-stream"
    }

    fn description(&self) -> &str {
        "yields one word every 100ms, checking for cancellation between words"
    }

    async fn run(&self, _input: Vec<Message>, ctx: AgentContext) -> EngineResult<()> {
        for word in ["one", "two", "three", "four", "five"] {
            if ctx.is_cancelled() {
                break;
            }
            ctx.emit(RunYield::text(format!("{word} ")));
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_millis(100)) => {}
                _ = ctx.cancelled() => break,
            }
        }
        Ok(())
    }
}

#[tokio::test]
async fn cancelling_a_streaming_run_ends_the_stream_with_cancelled() {
    let app = router(build_state(Arc::new(SlowStreamingAgent)));
    let create = serde_json::json!({
        "agent_name": "slow-stream",
        "input": [],
        "mode": "stream",
    });
    let response = app.clone().oneshot(post("/runs", create)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let run_id = run_id_of(&response);

    let reader_app = app.clone();
    let body_task = tokio::spawn(async move {
        response.into_body().collect().await.unwrap().to_bytes()
    });
    // Give the agent time to emit a first part before cancelling mid-stream.
    tokio::time::sleep(Duration::from_millis(150)).await;
    let cancel_response = reader_app
        .oneshot(post(&format!("/runs/{run_id}/cancel"), serde_json::json!({})))
        .await
        .unwrap();
    assert_eq!(cancel_response.status(), StatusCode::ACCEPTED);

    let bytes = body_task.await.unwrap();
    let events = parse_sse_events(&bytes);
    assert_eq!(events.last().unwrap().type_tag(), "run.cancelled");
}

#[tokio::test]
async fn session_history_makes_second_run_output_triple_the_first_runs_input() {
    let app = router(build_state(echo_agent()));
    let first = serde_json::json!({
        "agent_name": "echo",
        "session_id": "conversation-1",
        "input": [{"parts": [{"content_type": "text/plain", "content": "first"}]}],
        "mode": "sync",
    });
    let response = app.clone().oneshot(post("/runs", first)).await.unwrap();
    let first_run: Run = serde_json::from_value(json_body(response).await).unwrap();
    assert_eq!(first_run.status, RunStatus::Completed);
    assert_eq!(first_run.input.len(), 1);

    let second = serde_json::json!({
        "agent_name": "echo",
        "session_id": "conversation-1",
        "input": [{"parts": [{"content_type": "text/plain", "content": "second"}]}],
        "mode": "sync",
    });
    let response = app.oneshot(post("/runs", second)).await.unwrap();
    let second_run: Run = serde_json::from_value(json_body(response).await).unwrap();
    assert_eq!(second_run.status, RunStatus::Completed);
    assert_eq!(second_run.output.len(), first_run.input.len() * 3);
}

#[tokio::test]
async fn expired_run_is_not_found_after_ttl_sweep() {
    let backing = Arc::new(MemoryStore::new(Some(Duration::from_millis(30)), None));
    backing.spawn_ttl_sweeper(Duration::from_millis(10));
    let app = router(build_state_on(echo_agent(), backing));

    let create = serde_json::json!({
        "agent_name": "echo",
        "input": [{"parts": [{"content_type": "text/plain", "content": "hi"}]}],
        "mode": "sync",
    });
    let response = app.clone().oneshot(post("/runs", create)).await.unwrap();
    let run_id = run_id_of(&response);

    tokio::time::sleep(Duration::from_millis(100)).await;

    let response = app.oneshot(get(&format!("/runs/{run_id}"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
