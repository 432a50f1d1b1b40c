//! Inbound webhook payload
//!
//! Only the first entry, first change and first message are read. Every
//! level defaults to empty so unknown shapes parse instead of failing.

use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WebhookPayload {
    pub entry: Vec<Entry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Entry {
    pub changes: Vec<Change>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Change {
    pub value: ChangeValue,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChangeValue {
    pub contacts: Vec<Contact>,
    pub messages: Vec<WaMessage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Contact {
    pub profile: Profile,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WaMessage {
    pub from: String,
    pub id: String,
    /// Unix seconds, sent as a string
    pub timestamp: Option<String>,
    pub text: Option<TextBody>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TextBody {
    pub body: String,
}

/// A user message pulled out of a webhook delivery
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub sender_id: String,
    /// Profile name, empty when WhatsApp omits it
    pub sender_name: String,
    /// Text body, empty for non-text messages
    pub text: String,
    pub message_id: String,
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WebhookEvent {
    Message(InboundMessage),
    /// Status updates, malformed bodies and anything else without a message
    NotAMessage,
}

impl WebhookPayload {
    /// Classify a raw webhook body
    pub fn parse(body: &[u8]) -> WebhookEvent {
        match serde_json::from_slice::<WebhookPayload>(body) {
            Ok(payload) => payload.into_event(),
            Err(e) => {
                tracing::debug!(error = %e, "Webhook body is not a recognised payload");
                WebhookEvent::NotAMessage
            }
        }
    }

    pub fn into_event(self) -> WebhookEvent {
        let Some(value) = self
            .entry
            .into_iter()
            .next()
            .and_then(|entry| entry.changes.into_iter().next())
            .map(|change| change.value)
        else {
            return WebhookEvent::NotAMessage;
        };

        let sender_name = value
            .contacts
            .into_iter()
            .next()
            .map(|c| c.profile.name)
            .unwrap_or_default();

        let Some(message) = value.messages.into_iter().next() else {
            return WebhookEvent::NotAMessage;
        };
        if message.from.is_empty() {
            return WebhookEvent::NotAMessage;
        }

        let timestamp = message
            .timestamp
            .as_deref()
            .and_then(|t| t.parse::<i64>().ok())
            .and_then(|secs| DateTime::from_timestamp(secs, 0));

        WebhookEvent::Message(InboundMessage {
            sender_id: message.from,
            sender_name,
            text: message.text.map(|t| t.body).unwrap_or_default(),
            message_id: message.id,
            timestamp,
        })
    }
}
