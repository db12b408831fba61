use crate::config::ClientConfig;
use ragchat_core::{RagchatError, RagchatResult, StreamEvent};
use ragchat_stream::StreamClient;

/// Conversation endpoints that accompany a streamed turn.
///
/// All requests share the [`StreamClient`]'s base URL, auth header, and
/// transfer slot.
#[derive(Clone)]
pub struct ChatApi {
    client: StreamClient,
}

impl ChatApi {
    /// Endpoints reached through `client`.
    pub fn new(client: StreamClient) -> Self {
        Self { client }
    }

    /// Build a client from `config`: base URL, token and stall timeout.
    pub fn from_config(config: &ClientConfig) -> Self {
        let client =
            StreamClient::new(config.base_url.as_str()).with_options(config.stream_options());
        let client = match &config.access_token {
            Some(token) => client.with_access_token(token.as_str()),
            None => client,
        };
        Self { client }
    }

    /// The underlying streaming client.
    pub fn client(&self) -> &StreamClient {
        &self.client
    }

    /// Path of the hallucination-check stream for one message.
    pub fn hallucination_path(conversation: &str, message: &str) -> String {
        format!("/conversations/{conversation}/messages/{message}/stream-hallucination")
    }

    /// Stream a hallucination check of one answer.
    pub async fn stream_hallucination<F>(
        &self,
        conversation: &str,
        message: &str,
        on_event: F,
    ) -> RagchatResult<()>
    where
        F: FnMut(StreamEvent),
    {
        let path = Self::hallucination_path(conversation, message);
        self.client
            .start_stream(&path, &serde_json::json!({}), on_event)
            .await
    }

    /// Ask the server to stop generating one message.
    pub async fn stop_message(&self, conversation: &str, message: &str) -> RagchatResult<()> {
        self.send(&format!(
            "/conversations/{conversation}/messages/{message}/stop"
        ))
        .await?;
        Ok(())
    }

    /// Ask the server to stop all generation in a conversation.
    pub async fn stop_conversation(&self, conversation: &str) -> RagchatResult<()> {
        self.send(&format!("/conversations/{conversation}/stop"))
            .await?;
        Ok(())
    }

    /// Regenerate a message; returns the server's message record.
    pub async fn retry_message(
        &self,
        conversation: &str,
        message: &str,
    ) -> RagchatResult<serde_json::Value> {
        let resp = self
            .send(&format!(
                "/conversations/{conversation}/messages/{message}/retry"
            ))
            .await?;
        resp.json()
            .await
            .map_err(|e| RagchatError::Http(e.to_string()))
    }

    async fn send(&self, path: &str) -> RagchatResult<reqwest::Response> {
        let resp = self
            .client
            .post(path)
            .send()
            .await
            .map_err(|e| RagchatError::Http(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let error_body = resp
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(RagchatError::Http(format!(
                "API error {status}: {error_body}"
            )));
        }
        tracing::debug!(path, %status, "Request succeeded");
        Ok(resp)
    }
}
