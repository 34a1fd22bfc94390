//! [`AcpClient`]: the HTTP client proper, modeled on
//! `ag-ui-client::http::HttpAgent` (a `reqwest::Client` wrapping a base
//! URL, with JSON bodies for request/response and SSE for streaming).

use acp_core::event::Event;
use acp_core::ids::SessionId;
use acp_core::message::Message;
use acp_core::run::{AwaitResume, Run};
use acp_core::session::Session;
use acp_core::wire::{AgentInfo, CreateRunRequest, Mode, ResumeRunRequest};
use reqwest_eventsource::EventSource;

use crate::error::{ClientError, ClientResult};
use crate::stream::{decode, EventStream};

/// An ACP HTTP client bound to one server.
#[derive(Clone)]
pub struct AcpClient {
    base_url: String,
    client: reqwest::Client,
}

impl AcpClient {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn decode_or_error<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> ClientResult<T> {
        if response.status().is_success() {
            Ok(response.json::<T>().await?)
        } else {
            let error = response.json::<acp_core::error::AcpError>().await?;
            Err(ClientError::Server(error))
        }
    }

    pub async fn list_agents(&self) -> ClientResult<Vec<AgentInfo>> {
        let response = self.client.get(self.url("/agents")).send().await?;
        Self::decode_or_error(response).await
    }

    pub async fn describe_agent(&self, name: &str) -> ClientResult<AgentInfo> {
        let response = self
            .client
            .get(self.url(&format!("/agents/{name}")))
            .send()
            .await?;
        Self::decode_or_error(response).await
    }

    pub async fn ping(&self) -> ClientResult<()> {
        let response = self.client.get(self.url("/ping")).send().await?;
        response.error_for_status().map_err(ClientError::from)?;
        Ok(())
    }

    /// `mode: sync` — blocks until the run reaches a terminal status.
    pub async fn run_sync(
        &self,
        agent_name: &str,
        input: Vec<Message>,
        session_id: Option<SessionId>,
    ) -> ClientResult<Run> {
        let request = CreateRunRequest {
            agent_name: agent_name.to_string(),
            session_id,
            session: None,
            input,
            mode: Mode::Sync,
        };
        let response = self
            .client
            .post(self.url("/runs"))
            .json(&request)
            .send()
            .await?;
        Self::decode_or_error(response).await
    }

    /// `mode: async` — returns immediately with the run's `CREATED`
    /// snapshot; poll `get_run` for progress.
    pub async fn run_async(
        &self,
        agent_name: &str,
        input: Vec<Message>,
        session_id: Option<SessionId>,
    ) -> ClientResult<Run> {
        let request = CreateRunRequest {
            agent_name: agent_name.to_string(),
            session_id,
            session: None,
            input,
            mode: Mode::Async,
        };
        let response = self
            .client
            .post(self.url("/runs"))
            .json(&request)
            .send()
            .await?;
        Self::decode_or_error(response).await
    }

    /// `mode: stream` — returns a live decoded event stream.
    pub async fn run_stream(
        &self,
        agent_name: &str,
        input: Vec<Message>,
        session_id: Option<SessionId>,
    ) -> ClientResult<EventStream> {
        let request = CreateRunRequest {
            agent_name: agent_name.to_string(),
            session_id,
            session: None,
            input,
            mode: Mode::Stream,
        };
        let builder = self.client.post(self.url("/runs")).json(&request);
        let source = EventSource::new(builder).map_err(|e| ClientError::Stream(e.to_string()))?;
        Ok(decode(source))
    }

    pub async fn get_run(&self, run_id: &str) -> ClientResult<Run> {
        let response = self
            .client
            .get(self.url(&format!("/runs/{run_id}")))
            .send()
            .await?;
        Self::decode_or_error(response).await
    }

    pub async fn get_run_events(&self, run_id: &str) -> ClientResult<Vec<Event>> {
        let response = self
            .client
            .get(self.url(&format!("/runs/{run_id}/events")))
            .send()
            .await?;
        Self::decode_or_error(response).await
    }

    pub async fn resume_sync(&self, run_id: &str, resume: AwaitResume) -> ClientResult<Run> {
        let request = ResumeRunRequest {
            await_resume: resume,
            mode: Mode::Sync,
        };
        let response = self
            .client
            .post(self.url(&format!("/runs/{run_id}")))
            .json(&request)
            .send()
            .await?;
        Self::decode_or_error(response).await
    }

    pub async fn cancel_run(&self, run_id: &str) -> ClientResult<Run> {
        let response = self
            .client
            .post(self.url(&format!("/runs/{run_id}/cancel")))
            .send()
            .await?;
        Self::decode_or_error(response).await
    }

    pub async fn get_session(&self, session_id: &SessionId) -> ClientResult<Session> {
        let response = self
            .client
            .get(self.url(&format!("/sessions/{}", session_id.as_str())))
            .send()
            .await?;
        Self::decode_or_error(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_base_and_path_without_double_slash() {
        let client = AcpClient::new("http://localhost:8000/");
        assert_eq!(client.url("/agents"), "http://localhost:8000/agents");
    }
}
