//! Runtime for executing conversations
//!
//! Owns the live sessions and drives the pure state machine against the
//! listing gateway.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::{ConversationEngine, SessionInfo};
pub use traits::*;

/// Engine over a type-erased gateway, as held by the HTTP layer
pub type SharedEngine = ConversationEngine<Arc<dyn ListingGateway>>;

use crate::db::SearchFilters;
use crate::state_machine::Session;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Shared handle to one user's session
pub type SessionHandle = Arc<Mutex<Session>>;

/// Live sessions keyed by user id.
///
/// Lock order is session first, then the map. The sweep only ever
/// `try_lock`s a session while holding the map, so a session that is busy
/// with a message is never swept from under it.
pub struct SessionManager {
    sessions: RwLock<HashMap<String, SessionHandle>>,
    timeout: Duration,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    pub active_sessions: usize,
    pub session_timeout_hours: f64,
    pub sessions: Vec<SessionSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    /// Last four characters of the user id followed by "..."
    pub user_id: String,
    pub name: String,
    pub menu: String,
    pub step: u32,
    /// Wall-clock `HH:MM:SS` of the last message
    pub last_active: String,
    pub filters: SearchFilters,
}

impl SessionManager {
    pub fn new(timeout: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            timeout,
        }
    }

    /// Fetch the user's session, creating a fresh one in `main` if none is
    /// live. Expired sessions are swept first.
    pub async fn get_or_create(
        &self,
        user_id: &str,
        display_name: &str,
        now: DateTime<Utc>,
    ) -> SessionHandle {
        self.sweep_expired(now).await;

        if let Some(handle) = self.sessions.read().await.get(user_id) {
            return Arc::clone(handle);
        }

        let mut sessions = self.sessions.write().await;
        let handle = sessions.entry(user_id.to_string()).or_insert_with(|| {
            tracing::info!(user_id = %user_id, "Session created");
            Arc::new(Mutex::new(Session::new(user_id, display_name, now)))
        });
        Arc::clone(handle)
    }

    /// Remove a session the caller has already locked. Returns false if it
    /// was no longer live.
    pub(crate) async fn detach(&self, session: &mut Session) -> bool {
        if session.ended {
            return false;
        }
        self.sessions.write().await.remove(&session.user_id);
        session.ended = true;
        tracing::info!(user_id = %session.user_id, "Session ended");
        true
    }

    /// End a user's session, waiting for any message in flight to finish
    pub async fn end_session(&self, user_id: &str) -> bool {
        let handle = self.sessions.read().await.get(user_id).cloned();
        let Some(handle) = handle else {
            return false;
        };
        let mut session = handle.lock().await;
        self.detach(&mut session).await
    }

    /// Drop sessions idle for longer than the timeout. Sessions currently
    /// locked by a message are skipped.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        let timeout = self.timeout;

        sessions.retain(|user_id, handle| {
            let Ok(mut session) = handle.try_lock() else {
                return true;
            };
            if now - session.last_activity > timeout {
                session.ended = true;
                tracing::info!(user_id = %user_id, "Session expired");
                false
            } else {
                true
            }
        });

        let removed = before - sessions.len();
        if removed > 0 {
            tracing::debug!(removed, remaining = sessions.len(), "Swept expired sessions");
        }
        removed
    }

    #[allow(dead_code)] // Used in tests
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Snapshot of every live session, taken after a sweep
    pub async fn stats(&self, now: DateTime<Utc>) -> SessionStats {
        self.sweep_expired(now).await;

        let handles: Vec<SessionHandle> = self.sessions.read().await.values().cloned().collect();

        let mut sessions = Vec::with_capacity(handles.len());
        for handle in handles {
            let session = handle.lock().await;
            if session.ended {
                continue;
            }
            sessions.push(SessionSummary {
                user_id: mask_user_id(&session.user_id),
                name: session.display_name.clone(),
                menu: session.current_menu.clone(),
                step: session.conversation_step,
                last_active: session.last_activity.format("%H:%M:%S").to_string(),
                filters: session.search_filters.clone(),
            });
        }
        sessions.sort_by(|a, b| a.user_id.cmp(&b.user_id));

        #[allow(clippy::cast_precision_loss)]
        let session_timeout_hours = self.timeout.num_seconds() as f64 / 3600.0;

        SessionStats {
            active_sessions: sessions.len(),
            session_timeout_hours,
            sessions,
        }
    }
}

fn mask_user_id(user_id: &str) -> String {
    let tail: String = {
        let chars: Vec<char> = user_id.chars().collect();
        chars[chars.len().saturating_sub(4)..].iter().collect()
    };
    format!("{tail}...")
}
