//! WhatsApp Cloud API client for outbound text messages

use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Placeholder value meaning a credential was not provided
pub const NOT_CONFIGURED: &str = "not_configured";

const SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Outbound delivery failure with classification
#[derive(Debug, Error)]
pub enum SendError {
    #[error("WhatsApp credentials are not configured")]
    NotConfigured,
    #[error("Network error: {0}")]
    Network(String),
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("WhatsApp API returned {status}: {body}")]
    Api { status: u16, body: String },
}

impl SendError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    fn from_status(status: reqwest::StatusCode, body: String) -> Self {
        match status.as_u16() {
            401 | 403 => Self::Auth(body),
            code => Self::Api { status: code, body },
        }
    }
}

#[derive(Debug, Serialize)]
struct TextMessage<'a> {
    messaging_product: &'static str,
    recipient_type: &'static str,
    to: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    text: TextContent<'a>,
}

#[derive(Debug, Serialize)]
struct TextContent<'a> {
    preview_url: bool,
    body: &'a str,
}

/// Graph API client bound to one sending phone number
pub struct WhatsAppClient {
    client: Client,
    token: String,
    phone_id: String,
    api_base: String,
}

impl WhatsAppClient {
    pub fn new(
        token: impl Into<String>,
        phone_id: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Result<Self, SendError> {
        let client = Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .map_err(|e| SendError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            token: token.into(),
            phone_id: phone_id.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    /// Token and phone id are both real values
    pub fn is_configured(&self) -> bool {
        is_set(&self.token) && is_set(&self.phone_id)
    }

    fn messages_url(&self) -> String {
        format!("{}/{}/messages", self.api_base, self.phone_id)
    }

    pub async fn send_text(&self, to: &str, body: &str) -> Result<(), SendError> {
        if !self.is_configured() {
            return Err(SendError::NotConfigured);
        }

        let message = TextMessage {
            messaging_product: "whatsapp",
            recipient_type: "individual",
            to,
            kind: "text",
            text: TextContent {
                preview_url: false,
                body,
            },
        };

        let response = self
            .client
            .post(self.messages_url())
            .bearer_auth(&self.token)
            .json(&message)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SendError::network(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    SendError::network(format!("Connection failed: {e}"))
                } else {
                    SendError::network(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| SendError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(SendError::from_status(status, text));
        }

        tracing::debug!(to = %to, response = %text, "WhatsApp message accepted");
        Ok(())
    }
}

/// A credential counts as set when it is non-empty and not the placeholder
pub fn is_set(value: &str) -> bool {
    !value.is_empty() && value != NOT_CONFIGURED
}
