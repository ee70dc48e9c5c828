//! Wire types and client for the chat relay
//!
//! The relay is a small HTTP endpoint that forwards a message (and optional
//! image) to the upstream model. It always answers with a JSON envelope;
//! `success` tells the caller which of `response` / `error` to look at.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shown for every failure that isn't a relay-reported error
pub const CONNECTION_ERROR: &str = "Error de conexión. Intenta de nuevo.";
/// Used when the relay rejects a request without saying why
pub const UNKNOWN_RELAY_ERROR: &str = "No se pudo conectar con la API";

pub const DEFAULT_RELAY_URL: &str = "http://127.0.0.1:8080/chat-api";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayRequest {
    #[serde(default)]
    pub message: String,
    /// Data URL of the attached image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl RelayRequest {
    pub fn is_empty(&self) -> bool {
        self.message.trim().is_empty() && self.image.as_deref().map_or(true, str::is_empty)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RelayResponse {
    pub fn ok(response: impl Into<String>) -> Self {
        Self {
            success: true,
            response: Some(response.into()),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            response: None,
            error: Some(error.into()),
        }
    }

    pub fn into_result(self) -> Result<String, RelayError> {
        if self.success {
            self.response.ok_or(RelayError::Malformed)
        } else {
            Err(RelayError::Rejected(self.error))
        }
    }
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("relay request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("relay answered with HTTP {0}")]
    Status(u16),

    #[error("relay answered with an unexpected body")]
    Malformed,

    #[error("relay rejected the request: {}", .0.as_deref().unwrap_or("no reason given"))]
    Rejected(Option<String>),
}

impl RelayError {
    /// Text for the error message shown in the transcript
    pub fn user_message(&self) -> String {
        match self {
            RelayError::Rejected(reason) => {
                let reason = reason.as_deref().filter(|r| !r.is_empty()).unwrap_or(UNKNOWN_RELAY_ERROR);
                format!("Error: {}", reason)
            }
            _ => CONNECTION_ERROR.to_string(),
        }
    }
}

#[async_trait]
pub trait RelayClient: Send + Sync {
    /// Send one message and return the reply text
    async fn send(&self, request: &RelayRequest) -> Result<String, RelayError>;
}

#[derive(Clone)]
pub struct HttpRelayClient {
    client: Client,
    url: String,
}

impl HttpRelayClient {
    pub fn new(url: &str) -> Result<Self, RelayError> {
        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl RelayClient for HttpRelayClient {
    async fn send(&self, request: &RelayRequest) -> Result<String, RelayError> {
        tracing::debug!(url = %self.url, has_image = request.image.is_some(), "sending to relay");

        let response = self.client.post(&self.url).json(request).send().await?;

        if !response.status().is_success() {
            return Err(RelayError::Status(response.status().as_u16()));
        }

        let body = response.text().await?;
        let envelope: RelayResponse = serde_json::from_str(&body).map_err(|e| {
            tracing::warn!(error = %e, "relay body is not a response envelope");
            RelayError::Malformed
        })?;
        envelope.into_result()
    }
}
