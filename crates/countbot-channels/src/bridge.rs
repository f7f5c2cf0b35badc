//! HTTP bridge transport.
//!
//! The bridge is a small sidecar that keeps the chat-network session
//! (login, encryption, reconnects) and exposes it over plain HTTP:
//!
//! | Method | Path | Body / Response |
//! |--------|------|-----------------|
//! | POST | `/messages` | `{"chat_id", "text"}` |
//! | GET | `/groups/{id}` | `{"id", "subject", "participants": [..]}` |
//! | GET | `/groups` | array of the above |

use async_trait::async_trait;
use countbot_core::config::BridgeConfig;
use countbot_core::error::{CountBotError, Result, RATE_LIMIT_MARKER};
use countbot_core::traits::GroupTransport;
use countbot_core::types::{GroupSnapshot, OutgoingMessage};
use std::time::Duration;

pub struct BridgeTransport {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl BridgeTransport {
    pub fn new(config: &BridgeConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("CountBot/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CountBotError::Http(format!("Client build failed: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, format!("{}{path}", self.base_url));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Map a bridge response to the error taxonomy.
    async fn check(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS || text.contains(RATE_LIMIT_MARKER) {
            return Err(CountBotError::RateLimited(format!("{what}: {status} {text}")));
        }
        Err(CountBotError::Transport(format!("{what}: {status} {text}")))
    }
}

#[async_trait]
impl GroupTransport for BridgeTransport {
    fn name(&self) -> &str { "bridge" }

    async fn send_text(&self, chat_id: &str, text: &str) -> Result<()> {
        let response = self
            .request(reqwest::Method::POST, "/messages")
            .json(&OutgoingMessage::text(chat_id, text))
            .send()
            .await
            .map_err(|e| CountBotError::Transport(format!("Send message failed: {e}")))?;
        Self::check(response, "Send message").await?;
        tracing::debug!("Sent {} bytes to {chat_id}", text.len());
        Ok(())
    }

    async fn group_metadata(&self, group_id: &str) -> Result<GroupSnapshot> {
        let response = self
            .request(reqwest::Method::GET, &format!("/groups/{group_id}"))
            .send()
            .await
            .map_err(|e| CountBotError::Transport(format!("Get group metadata failed: {e}")))?;
        let response = Self::check(response, "Get group metadata").await?;
        response
            .json::<GroupSnapshot>()
            .await
            .map_err(|e| CountBotError::Transport(format!("Invalid group response: {e}")))
    }

    async fn participating_groups(&self) -> Result<Vec<GroupSnapshot>> {
        let response = self
            .request(reqwest::Method::GET, "/groups")
            .send()
            .await
            .map_err(|e| CountBotError::Transport(format!("Get groups failed: {e}")))?;
        let response = Self::check(response, "Get groups").await?;
        response
            .json::<Vec<GroupSnapshot>>()
            .await
            .map_err(|e| CountBotError::Transport(format!("Invalid groups response: {e}")))
    }
}
