//! API request and response types

use crate::runtime::{SessionInfo, SessionStats};
use crate::state_machine::ResponseKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Query sent by Meta when registering the webhook
#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// Acknowledgement for every webhook delivery
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub status: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<MessageResponse>,
}

impl WebhookAck {
    pub fn processed(response: MessageResponse) -> Self {
        Self {
            status: "processed",
            kind: "message",
            response: Some(response),
        }
    }

    pub fn status_update() -> Self {
        Self {
            status: "received",
            kind: "status_update",
            response: None,
        }
    }
}

/// The bot's answer to one inbound message
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    #[serde(rename = "type")]
    pub kind: ResponseKind,
    pub recipient: String,
    pub message: String,
    pub original_message_id: String,
    /// Whether the outbound send succeeded
    pub delivered: bool,
    pub session_info: SessionInfo,
}

#[derive(Debug, Serialize)]
pub struct WebhookStatusResponse {
    pub webhook_configured: bool,
    pub phone_id_configured: bool,
    pub token_configured: bool,
    pub verify_token: Option<String>,
    pub phone_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionStatsResponse {
    pub session_stats: SessionStats,
}

#[derive(Debug, Serialize)]
pub struct EndSessionResponse {
    pub ended: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub version: &'static str,
    pub environment: String,
}

/// Liveness and readiness probe body
#[derive(Debug, Serialize)]
pub struct ProbeResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DatabaseStatusResponse {
    pub status: &'static str,
    pub sqlite_version: String,
    pub listing_count: i64,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
