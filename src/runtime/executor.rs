//! Conversation engine
//!
//! Runs one inbound message through the state machine under the user's
//! session lock, executing effects until the queue drains.

use super::traits::{ListingGateway, SearchError};
use super::SessionManager;
use crate::db::SearchFilters;
use crate::formatter;
use crate::state_machine::{
    transition, Effect, Event, HistoryKind, Reply, ResponseKind, Session, TransitionError,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;

/// Navigation summary returned with every reply
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionInfo {
    pub user_id: String,
    pub current_menu: String,
    pub step: u32,
    pub filters: SearchFilters,
}

impl SessionInfo {
    fn of(session: &Session) -> Self {
        Self {
            user_id: session.user_id.clone(),
            current_menu: session.current_menu.clone(),
            step: session.conversation_step,
            filters: session.search_filters.clone(),
        }
    }
}

/// What handling one message produced
#[derive(Debug, Clone, Serialize)]
pub struct MessageOutcome {
    #[serde(flatten)]
    pub reply: Reply,
    pub session_info: SessionInfo,
}

#[derive(Debug, Error)]
enum StepError {
    #[error(transparent)]
    Search(#[from] SearchError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// Generic engine that can work with any listing gateway
pub struct ConversationEngine<G>
where
    G: ListingGateway + 'static,
{
    sessions: Arc<SessionManager>,
    gateway: Arc<G>,
    search_limit: usize,
}

impl<G> ConversationEngine<G>
where
    G: ListingGateway + 'static,
{
    pub fn new(sessions: Arc<SessionManager>, gateway: G, search_limit: usize) -> Self {
        Self {
            sessions,
            gateway: Arc::new(gateway),
            search_limit,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    pub async fn handle_message(
        &self,
        user_id: &str,
        sender_name: &str,
        text: &str,
    ) -> MessageOutcome {
        self.handle_message_at(user_id, sender_name, text, Utc::now())
            .await
    }

    /// Handle one message as of `now`. Messages for the same user are
    /// serialized by the session lock; different users run in parallel.
    pub async fn handle_message_at(
        &self,
        user_id: &str,
        sender_name: &str,
        text: &str,
        now: DateTime<Utc>,
    ) -> MessageOutcome {
        let mut session = loop {
            let handle = self.sessions.get_or_create(user_id, sender_name, now).await;
            let session = handle.lock_owned().await;
            if !session.ended {
                break session;
            }
            // Ended while we waited for the lock; the next pass creates a fresh one
        };

        let name = sender_name.trim();
        if !name.is_empty() && name != session.display_name {
            tracing::debug!(user_id = %user_id, "Display name updated");
            session.display_name = name.to_string();
        }

        let snapshot = session.clone();
        session.touch(now);
        session.record(HistoryKind::UserMessage, text, now);

        tracing::info!(
            user_id = %user_id,
            context = session.state.name(),
            "Handling message"
        );

        let (reply, end) = match self.run(&mut session, text).await {
            Ok(done) => done,
            Err(e) => {
                tracing::error!(
                    user_id = %user_id,
                    context = snapshot.state.name(),
                    error = %e,
                    "Message handling failed, rolling back"
                );
                session.restore_navigation(&snapshot);
                (Reply::new(ResponseKind::Error, formatter::apology()), false)
            }
        };

        session.record(HistoryKind::BotResponse, reply.message.as_str(), now);
        let session_info = SessionInfo::of(&session);

        if end {
            self.sessions.detach(&mut session).await;
        }

        tracing::info!(
            user_id = %user_id,
            context = session.state.name(),
            response_type = ?reply.kind,
            "Message handled"
        );

        MessageOutcome {
            reply,
            session_info,
        }
    }

    /// Process the event queue, committing each transition's session
    async fn run(&self, session: &mut Session, text: &str) -> Result<(Reply, bool), StepError> {
        let mut events = VecDeque::from([Event::user_message(text)]);
        let mut reply = None;
        let mut end = false;

        while let Some(event) = events.pop_front() {
            let result = transition(session, event)?;
            *session = result.session;

            for effect in result.effects {
                match effect {
                    Effect::Reply(r) => reply = Some(r),
                    Effect::Search(request) => {
                        tracing::debug!(
                            user_id = %session.user_id,
                            filters = ?request.filters,
                            natural = request.natural_query,
                            "Searching listings"
                        );
                        let results = self
                            .gateway
                            .search(&request.filters, self.search_limit)
                            .await?;
                        tracing::info!(
                            user_id = %session.user_id,
                            count = results.len(),
                            "Search complete"
                        );
                        events.push_back(Event::SearchComplete { request, results });
                    }
                    Effect::EndSession => end = true,
                }
            }
        }

        let reply = reply.unwrap_or_else(|| Reply::new(ResponseKind::Error, formatter::apology()));
        Ok((reply, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::PropertyType;
    use crate::runtime::testing::{sample_listings, FailingGateway, MockGateway};
    use chrono::Duration;

    const USER: &str = "2348012345678";

    fn engine() -> ConversationEngine<Arc<MockGateway>> {
        engine_with(Arc::new(MockGateway::new(sample_listings())))
    }

    fn engine_with(gateway: Arc<MockGateway>) -> ConversationEngine<Arc<MockGateway>> {
        ConversationEngine::new(Arc::new(SessionManager::new(Duration::hours(2))), gateway, 5)
    }

    async fn session_of<G: ListingGateway>(engine: &ConversationEngine<G>, user: &str) -> Session {
        let handle = engine.sessions().get_or_create(user, "", Utc::now()).await;
        let session = handle.lock().await.clone();
        session
    }

    #[tokio::test]
    async fn quick_search_by_city() {
        let engine = engine();
        let out = engine.handle_message(USER, "Ada", "3").await;
        assert_eq!(out.reply.kind, ResponseKind::SearchResults);
        assert!(out.reply.message.contains("Properties in Lagos"));
        // Featured first, sold listing excluded, city matched case-insensitively
        assert!(out.reply.message.contains("Found 4 properties"));
        assert!(out.reply.message.contains("*1. 4 Bedroom HOUSE in Lagos*"));
        assert_eq!(out.session_info.current_menu, "search_results");
        assert_eq!(out.session_info.step, 1);
        assert_eq!(out.session_info.filters, SearchFilters::city("Lagos"));
    }

    #[tokio::test]
    async fn select_then_back_restores_results() {
        let engine = engine();
        engine.handle_message(USER, "Ada", "1").await;
        let before = session_of(&engine, USER).await;

        let detail = engine.handle_message(USER, "Ada", "2").await;
        assert_eq!(detail.reply.kind, ResponseKind::PropertyDetail);
        assert_eq!(detail.session_info.current_menu, "property_detail");

        let back = engine.handle_message(USER, "Ada", "back").await;
        assert_eq!(back.reply.kind, ResponseKind::SearchResults);
        let after = session_of(&engine, USER).await;
        assert_eq!(after.frame(), before.frame());
        assert_eq!(after.navigation_stack, before.navigation_stack);
    }

    #[tokio::test]
    async fn back_does_not_query_again() {
        let gateway = Arc::new(MockGateway::new(sample_listings()));
        let engine = engine_with(Arc::clone(&gateway));
        engine.handle_message(USER, "", "1").await;
        engine.handle_message(USER, "", "1").await;
        engine.handle_message(USER, "", "back").await;
        assert_eq!(gateway.recorded_searches().len(), 1);
    }

    #[tokio::test]
    async fn natural_language_query() {
        let gateway = Arc::new(MockGateway::new(sample_listings()));
        let engine = engine_with(Arc::clone(&gateway));
        let out = engine
            .handle_message(USER, "", "3 bedroom apartments in Lagos")
            .await;
        assert_eq!(out.reply.kind, ResponseKind::SearchResults);
        assert!(out.reply.message.contains("Natural search"));
        assert_eq!(
            gateway.recorded_searches(),
            vec![SearchFilters {
                city: Some("Lagos".into()),
                property_type: Some(PropertyType::Apartment),
                bedrooms: Some(3),
                min_price: None,
                max_price: None,
            }]
        );
    }

    #[tokio::test]
    async fn empty_results_keep_main() {
        let engine = engine();
        let out = engine.handle_message(USER, "", "8").await;
        assert_eq!(out.session_info.current_menu, "location");

        let out = engine.handle_message(USER, "", "4").await;
        assert_eq!(out.reply.kind, ResponseKind::NoResults);
        assert!(out.reply.message.contains("Location: Kano"));
        assert_eq!(out.session_info.current_menu, "location");
    }

    #[tokio::test]
    async fn out_of_range_selection_keeps_state() {
        let engine = engine();
        engine.handle_message(USER, "", "4").await;
        let before = session_of(&engine, USER).await;

        let out = engine.handle_message(USER, "", "99").await;
        assert_eq!(out.reply.kind, ResponseKind::Error);
        assert!(out.reply.message.contains("1-2"));
        let after = session_of(&engine, USER).await;
        assert_eq!(after.frame(), before.frame());
    }

    #[tokio::test]
    async fn failed_search_rolls_back_navigation() {
        let gateway = Arc::new(MockGateway::new(sample_listings()));
        let engine = engine_with(Arc::clone(&gateway));
        engine.handle_message(USER, "", "5").await;
        let before = session_of(&engine, USER).await;

        gateway.set_failing(true);
        let out = engine.handle_message(USER, "", "2").await;
        assert_eq!(out.reply.kind, ResponseKind::Error);
        assert_eq!(out.reply.message, formatter::apology());

        let after = session_of(&engine, USER).await;
        assert_eq!(after.frame(), before.frame());
        assert_eq!(after.search_filters, before.search_filters);
        // user message and apology are still recorded
        assert_eq!(after.history.len(), before.history.len() + 2);
        assert!(after.last_activity >= before.last_activity);
    }

    #[tokio::test]
    async fn failing_gateway_answers_with_apology() {
        let engine = ConversationEngine::new(
            Arc::new(SessionManager::new(Duration::hours(2))),
            FailingGateway,
            5,
        );
        let out = engine.handle_message(USER, "", "1").await;
        assert_eq!(out.reply.kind, ResponseKind::Error);
        assert_eq!(out.session_info.current_menu, "main");
    }

    #[tokio::test]
    async fn quit_removes_session() {
        let engine = engine();
        engine.handle_message(USER, "", "1").await;
        assert_eq!(engine.sessions().session_count().await, 1);

        let out = engine.handle_message(USER, "", "quit").await;
        assert_eq!(out.reply.kind, ResponseKind::End);
        assert_eq!(engine.sessions().session_count().await, 0);

        let out = engine.handle_message(USER, "", "hi").await;
        assert_eq!(out.reply.kind, ResponseKind::Greeting);
        assert_eq!(out.session_info.step, 0);
    }

    #[tokio::test]
    async fn stale_session_is_swept_on_next_message() {
        let engine = engine();
        let start = Utc::now();
        engine.handle_message_at("a", "", "1", start).await;
        engine.handle_message_at("b", "", "1", start).await;
        assert_eq!(engine.sessions().session_count().await, 2);

        let later = start + Duration::hours(2) + Duration::minutes(1);
        let out = engine.handle_message_at("b", "", "menu", later).await;
        assert_eq!(out.reply.kind, ResponseKind::Menu);
        // "a" was idle too long; "b" started over
        assert_eq!(engine.sessions().session_count().await, 1);
    }

    #[tokio::test]
    async fn display_name_is_refreshed() {
        let engine = engine();
        engine.handle_message(USER, "Ada", "hi").await;
        engine.handle_message(USER, "  ", "hi").await;
        assert_eq!(session_of(&engine, USER).await.display_name, "Ada");
        engine.handle_message(USER, "Ada L.", "hi").await;
        assert_eq!(session_of(&engine, USER).await.display_name, "Ada L.");
    }

    #[tokio::test]
    async fn concurrent_users_do_not_interfere() {
        let engine = Arc::new(engine());
        let mut tasks = Vec::new();
        for i in 0..8 {
            let engine = Arc::clone(&engine);
            tasks.push(tokio::spawn(async move {
                let user = format!("user-{i}");
                engine.handle_message(&user, "", "3").await;
                engine.handle_message(&user, "", "1").await
            }));
        }
        for task in tasks {
            let out = task.await.unwrap();
            assert_eq!(out.session_info.current_menu, "property_detail");
            assert_eq!(out.session_info.step, 2);
        }
        assert_eq!(engine.sessions().session_count().await, 8);
    }

    #[tokio::test]
    async fn same_user_messages_are_serialized() {
        let engine = Arc::new(engine());
        engine.handle_message(USER, "", "1").await;

        let mut tasks = Vec::new();
        for _ in 0..10 {
            let engine = Arc::clone(&engine);
            tasks.push(tokio::spawn(async move {
                engine.handle_message(USER, "", "1").await;
                engine.handle_message(USER, "", "back").await
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        let session = session_of(&engine, USER).await;
        assert_eq!(session.current_menu, session.state.menu_tag());
        assert_eq!(session.history.len(), crate::state_machine::state::HISTORY_LIMIT);
        assert_eq!(engine.sessions().session_count().await, 1);
    }
}
