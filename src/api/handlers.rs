//! HTTP request handlers

use super::types::{
    DatabaseStatusResponse, EndSessionResponse, ErrorResponse, HealthResponse, MessageResponse,
    ProbeResponse, SessionStatsResponse, VerifyQuery, WebhookAck, WebhookStatusResponse,
};
use super::AppState;
use crate::db::{DbError, TableSummary};
use crate::whatsapp::{is_set, WebhookEvent, WebhookPayload};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // WhatsApp webhook
        .route(
            "/api/v1/whatsapp/webhook",
            get(verify_webhook).post(receive_webhook),
        )
        .route("/api/v1/whatsapp/webhook/status", get(webhook_status))
        .route("/api/v1/whatsapp/webhook/sessions", get(session_stats))
        .route(
            "/api/v1/whatsapp/webhook/sessions/:user_id/end",
            post(end_session),
        )
        // Probes
        .route("/api/v1/health", get(health))
        .route("/api/v1/health/", get(health))
        .route("/api/v1/health/live", get(liveness))
        .route("/api/v1/health/ready", get(readiness))
        // Listing store
        .route("/api/v1/database/status", get(database_status))
        .route("/api/v1/database/tables/:name", get(table_summary))
        .with_state(state)
}

// ============================================================
// Webhook
// ============================================================

async fn verify_webhook(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
) -> Result<String, AppError> {
    let (Some(mode), Some(challenge)) = (query.mode.as_deref(), query.challenge.as_deref()) else {
        return Err(AppError::BadRequest(
            "hub.mode and hub.challenge are required".to_string(),
        ));
    };

    let expected = &state.whatsapp.verify_token;
    let token_matches =
        is_set(expected) && query.verify_token.as_deref() == Some(expected.as_str());

    if mode == "subscribe" && token_matches {
        tracing::info!("Webhook verification successful");
        return Ok(challenge.to_string());
    }

    tracing::warn!(mode = %mode, "Webhook verification failed");
    Err(AppError::Forbidden("Invalid verify token".to_string()))
}

async fn receive_webhook(State(state): State<AppState>, body: Bytes) -> Json<WebhookAck> {
    let WebhookEvent::Message(inbound) = WebhookPayload::parse(&body) else {
        tracing::debug!("Non-message webhook received");
        return Json(WebhookAck::status_update());
    };

    tracing::info!(
        from = %inbound.sender_id,
        message_id = %inbound.message_id,
        timestamp = ?inbound.timestamp,
        "Incoming message"
    );

    let outcome = state
        .engine
        .handle_message(&inbound.sender_id, &inbound.sender_name, &inbound.text)
        .await;

    let delivered = match state
        .sender
        .send_text(&inbound.sender_id, &outcome.reply.message)
        .await
    {
        Ok(()) => {
            tracing::info!(to = %inbound.sender_id, "Reply sent");
            true
        }
        Err(e) => {
            tracing::error!(to = %inbound.sender_id, error = %e, "Failed to send reply");
            false
        }
    };

    Json(WebhookAck::processed(MessageResponse {
        kind: outcome.reply.kind,
        recipient: inbound.sender_id,
        message: outcome.reply.message,
        original_message_id: inbound.message_id,
        delivered,
        session_info: outcome.session_info,
    }))
}

async fn webhook_status(State(state): State<AppState>) -> Json<WebhookStatusResponse> {
    let wa = &state.whatsapp;
    Json(WebhookStatusResponse {
        webhook_configured: is_set(&wa.verify_token),
        phone_id_configured: is_set(&wa.phone_id),
        token_configured: is_set(&wa.token),
        verify_token: masked(&wa.verify_token),
        phone_id: masked(&wa.phone_id),
    })
}

/// First eight characters followed by "...", or nothing when unset
fn masked(value: &str) -> Option<String> {
    if !is_set(value) {
        return None;
    }
    let head: String = value.chars().take(8).collect();
    Some(format!("{head}..."))
}

// ============================================================
// Sessions
// ============================================================

async fn session_stats(State(state): State<AppState>) -> Json<SessionStatsResponse> {
    let session_stats = state.engine.sessions().stats(Utc::now()).await;
    Json(SessionStatsResponse { session_stats })
}

async fn end_session(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Json<EndSessionResponse> {
    let ended = state.engine.sessions().end_session(&user_id).await;
    Json(EndSessionResponse { ended })
}

// ============================================================
// Health
// ============================================================

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION"),
        environment: state.environment.clone(),
    })
}

async fn liveness() -> Json<ProbeResponse> {
    Json(ProbeResponse {
        status: "alive",
        timestamp: Utc::now(),
        issues: vec![],
    })
}

async fn readiness(State(state): State<AppState>) -> Response {
    match state.db.count_listings() {
        Ok(_) => Json(ProbeResponse {
            status: "ready",
            timestamp: Utc::now(),
            issues: vec![],
        })
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ProbeResponse {
                    status: "not_ready",
                    timestamp: Utc::now(),
                    issues: vec![format!("Listing store unavailable: {e}")],
                }),
            )
                .into_response()
        }
    }
}

// ============================================================
// Database
// ============================================================

async fn database_status(
    State(state): State<AppState>,
) -> Result<Json<DatabaseStatusResponse>, AppError> {
    let sqlite_version = state.db.sqlite_version()?;
    let listing_count = state.db.count_listings()?;
    Ok(Json(DatabaseStatusResponse {
        status: "connected",
        sqlite_version,
        listing_count,
    }))
}

async fn table_summary(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<TableSummary>, AppError> {
    Ok(Json(state.db.table_summary(&name)?))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    Forbidden(String),
    NotFound(String),
    Internal(String),
}

impl From<DbError> for AppError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::UnknownTable(name) => AppError::NotFound(format!("Table '{name}' not found")),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
