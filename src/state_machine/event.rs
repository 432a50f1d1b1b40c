//! Events that drive the conversation

use super::effect::SearchRequest;
use crate::db::Listing;

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    /// Text received from the user
    UserMessage { text: String },

    /// A search requested by a previous transition has returned
    SearchComplete {
        request: SearchRequest,
        results: Vec<Listing>,
    },
}

impl Event {
    pub fn user_message(text: impl Into<String>) -> Self {
        Event::UserMessage { text: text.into() }
    }
}
