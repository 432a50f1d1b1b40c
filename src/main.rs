//! Inspekta property bot
//!
//! A WhatsApp webhook service that walks users through a menu-driven
//! property search backed by a SQLite listing store.

mod api;
mod config;
mod db;
mod formatter;
mod keywords;
mod runtime;
mod state_machine;
mod whatsapp;

use api::{create_router, AppState};
use config::BotConfig;
use db::Database;
use runtime::{ConversationEngine, DatabaseGateway, ListingGateway, ReplySender, SessionManager};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use whatsapp::WhatsAppClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inspekta_bot=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = BotConfig::from_env()?;

    // Ensure database directory exists
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Initialize database
    tracing::info!(path = %config.db_path.display(), "Opening database");
    let db = Database::open(&config.db_path)?;

    if let Some(seed) = &config.seed_path {
        let imported = db.import_seed_file(seed)?;
        tracing::info!(path = %seed.display(), imported, "Seed import finished");
    }
    tracing::info!(listings = db.count_listings()?, "Listing store ready");

    // Outbound client
    let wa = &config.whatsapp;
    let client = WhatsAppClient::new(wa.token.clone(), wa.phone_id.clone(), wa.api_base.clone())?;
    if !client.is_configured() {
        tracing::warn!(
            "WhatsApp credentials not configured. Set WHATSAPP_TOKEN and WHATSAPP_PHONE_ID."
        );
    }
    let sender: Arc<dyn ReplySender> = Arc::new(client);

    // Conversation engine
    let sessions = Arc::new(SessionManager::new(config.session_timeout));
    let gateway: Arc<dyn ListingGateway> = Arc::new(DatabaseGateway::new(db.clone()));
    let engine = ConversationEngine::new(sessions, gateway, config.search_limit);

    // Create application state
    let state = AppState::new(
        engine,
        sender,
        db,
        config.whatsapp.clone(),
        config.environment.clone(),
    );

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Inspekta bot listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
