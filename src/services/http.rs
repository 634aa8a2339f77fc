//! HTTP Backend
//!
//! reqwest implementation of the collaborator interfaces against the
//! documented backend REST surface: the database service under
//! `/api/database` and the graph service under `/api/graph`.

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::models::conversation::{ChatTurn, Conversation, Profile, TurnPatch, TurnPayload, TurnRole};
use crate::models::graph::GraphInput;
use crate::models::invocation::Invocation;
use crate::services::backend::{ChunkStream, GraphTransport, InvocationClient, TurnStore};
use crate::utils::error::{AppError, AppResult};

/// HTTP client for the Deep Research backend
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    /// Create a backend client for a base URL (e.g. `http://localhost:8000`)
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Create a backend client reusing an existing reqwest client
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// List all profiles
    pub async fn fetch_profiles(&self) -> AppResult<Vec<Profile>> {
        let response = self
            .client
            .get(self.url("/api/database/profiles"))
            .send()
            .await?;
        decode_json(response, "fetch profiles").await
    }

    /// List the process types the graph service can run
    pub async fn fetch_process_types(&self) -> AppResult<Vec<String>> {
        let response = self
            .client
            .get(self.url("/api/graph/process-types"))
            .send()
            .await?;
        decode_json(response, "fetch process types").await
    }

    /// List the models the graph service can use
    pub async fn fetch_models(&self) -> AppResult<Vec<String>> {
        let response = self
            .client
            .get(self.url("/api/graph/models"))
            .send()
            .await?;
        decode_json(response, "fetch models").await
    }
}

/// Check the response status and decode its JSON body
async fn decode_json<T: DeserializeOwned>(response: reqwest::Response, what: &str) -> AppResult<T> {
    let status = response.status();
    if !status.is_success() {
        return Err(AppError::api(format!("Failed to {}: {}", what, status)));
    }
    response
        .json::<T>()
        .await
        .map_err(|e| AppError::api(format!("Failed to decode {} response: {}", what, e)))
}

#[async_trait]
impl TurnStore for HttpBackend {
    async fn create_conversation(&self, profile_id: &str, title: &str) -> AppResult<Conversation> {
        let response = self
            .client
            .post(self.url(&format!("/api/database/{}/conversations", profile_id)))
            .json(&json!({
                "profile_id": profile_id,
                "title": title,
                "chat_turns": [],
            }))
            .send()
            .await?;
        decode_json(response, "create conversation").await
    }

    async fn list_conversations(&self, profile_id: &str) -> AppResult<Vec<Conversation>> {
        let response = self
            .client
            .get(self.url(&format!("/api/database/{}/conversations", profile_id)))
            .send()
            .await?;
        decode_json(response, "fetch conversations").await
    }

    async fn fetch_conversation_with_turns(
        &self,
        profile_id: &str,
        conversation_id: &str,
    ) -> AppResult<Option<Conversation>> {
        let response = self
            .client
            .get(self.url(&format!(
                "/api/database/{}/conversations/{}/with-turns",
                profile_id, conversation_id
            )))
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        decode_json(response, "fetch conversation").await.map(Some)
    }

    async fn create_turn(
        &self,
        profile_id: &str,
        conversation_id: &str,
        role: TurnRole,
        payload: TurnPayload,
        timestamp: &str,
    ) -> AppResult<ChatTurn> {
        let response = self
            .client
            .post(self.url(&format!(
                "/api/database/{}/conversations/{}/chat-turns",
                profile_id, conversation_id
            )))
            .json(&json!({
                "role": role,
                "data": payload,
                "timestamp": timestamp,
            }))
            .send()
            .await?;
        decode_json(response, "create chat turn").await
    }

    async fn update_turn(
        &self,
        profile_id: &str,
        turn_id: &str,
        patch: TurnPatch,
    ) -> AppResult<ChatTurn> {
        let response = self
            .client
            .patch(self.url(&format!(
                "/api/database/{}/chat-turns/{}",
                profile_id, turn_id
            )))
            .json(&patch)
            .send()
            .await?;
        decode_json(response, "update chat turn").await
    }
}

#[async_trait]
impl InvocationClient for HttpBackend {
    async fn fetch_invocation(
        &self,
        profile_id: &str,
        invocation_id: &str,
    ) -> AppResult<Invocation> {
        let response = self
            .client
            .get(self.url(&format!(
                "/api/database/{}/invocations/{}",
                profile_id, invocation_id
            )))
            .send()
            .await?;
        decode_json(response, "fetch invocation").await
    }

    async fn stop_invocation(&self, _profile_id: &str, invocation_id: &str) -> AppResult<()> {
        let response = self
            .client
            .post(self.url(&format!("/api/graph/{}/stop", invocation_id)))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::api(format!(
                "Failed to stop invocation: {}",
                status
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl GraphTransport for HttpBackend {
    async fn open_stream(
        &self,
        input: &GraphInput,
        cancel: CancellationToken,
    ) -> AppResult<ChunkStream> {
        let response = self
            .client
            .post(self.url("/api/graph/execute"))
            .json(input)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::api(format!("Graph execution failed: {}", status)));
        }

        // Cancelling the token ends the stream; dropping it tears down the
        // underlying connection.
        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| AppError::transport(e.to_string())))
            .take_until(Box::pin(cancel.cancelled_owned()));

        Ok(stream.boxed())
    }
}
