//! WhatsApp Cloud API integration
//!
//! Inbound webhook parsing and the outbound text client.

mod client;
mod payload;

pub use client::{is_set, SendError, WhatsAppClient, NOT_CONFIGURED};
pub use payload::{WebhookEvent, WebhookPayload};
