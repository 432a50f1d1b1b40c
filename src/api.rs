//! HTTP API for the WhatsApp webhook and service probes

mod handlers;
mod types;

pub use handlers::create_router;

use crate::config::WhatsAppConfig;
use crate::db::Database;
use crate::runtime::{ReplySender, SharedEngine};
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SharedEngine>,
    pub sender: Arc<dyn ReplySender>,
    pub db: Database,
    pub whatsapp: Arc<WhatsAppConfig>,
    pub environment: String,
}

impl AppState {
    pub fn new(
        engine: SharedEngine,
        sender: Arc<dyn ReplySender>,
        db: Database,
        whatsapp: WhatsAppConfig,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            engine: Arc::new(engine),
            sender,
            db,
            whatsapp: Arc::new(whatsapp),
            environment: environment.into(),
        }
    }
}
