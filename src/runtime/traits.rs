//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the engine and the webhook with mock
//! implementations.

use crate::db::{DbError, Listing, SearchFilters};
use crate::whatsapp::SendError;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error(transparent)]
    Database(#[from] DbError),
    #[error("Search task failed: {0}")]
    Task(String),
}

/// Read side of the listing store
#[async_trait]
pub trait ListingGateway: Send + Sync {
    /// Active listings matching every present filter, featured first then
    /// newest, at most `limit` rows.
    async fn search(
        &self,
        filters: &SearchFilters,
        limit: usize,
    ) -> Result<Vec<Listing>, SearchError>;
}

/// Outbound chat transport
#[async_trait]
pub trait ReplySender: Send + Sync {
    /// Deliver a plain-text message to `to`
    async fn send_text(&self, to: &str, body: &str) -> Result<(), SendError>;

    /// Whether credentials are present
    fn is_configured(&self) -> bool;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: ListingGateway + ?Sized> ListingGateway for Arc<T> {
    async fn search(
        &self,
        filters: &SearchFilters,
        limit: usize,
    ) -> Result<Vec<Listing>, SearchError> {
        (**self).search(filters, limit).await
    }
}

#[async_trait]
impl<T: ReplySender + ?Sized> ReplySender for Arc<T> {
    async fn send_text(&self, to: &str, body: &str) -> Result<(), SendError> {
        (**self).send_text(to, body).await
    }

    fn is_configured(&self) -> bool {
        (**self).is_configured()
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

use crate::db::Database;
use crate::whatsapp::WhatsAppClient;

/// Adapter to use Database as a [`ListingGateway`]
#[derive(Clone)]
pub struct DatabaseGateway {
    db: Database,
}

impl DatabaseGateway {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ListingGateway for DatabaseGateway {
    async fn search(
        &self,
        filters: &SearchFilters,
        limit: usize,
    ) -> Result<Vec<Listing>, SearchError> {
        let db = self.db.clone();
        let filters = filters.clone();
        tokio::task::spawn_blocking(move || db.search_listings(&filters, limit))
            .await
            .map_err(|e| SearchError::Task(e.to_string()))?
            .map_err(SearchError::from)
    }
}

#[async_trait]
impl ReplySender for WhatsAppClient {
    async fn send_text(&self, to: &str, body: &str) -> Result<(), SendError> {
        WhatsAppClient::send_text(self, to, body).await
    }

    fn is_configured(&self) -> bool {
        WhatsAppClient::is_configured(self)
    }
}
