//! Effects produced by state transitions

use crate::db::SearchFilters;
use serde::Serialize;

/// Tag attached to every outbound reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    Menu,
    SearchResults,
    PropertyDetail,
    Error,
    Greeting,
    End,
    NoResults,
    Interest,
    Inspection,
}

/// Text to send back to the user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reply {
    #[serde(rename = "type")]
    pub kind: ResponseKind,
    pub message: String,
}

impl Reply {
    pub fn new(kind: ResponseKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// A listing query the runtime should run on the state machine's behalf
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub filters: SearchFilters,
    /// Human-readable summary used in result headers
    pub description: String,
    pub natural_query: bool,
}

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Send a reply to the user
    Reply(Reply),

    /// Run a listing search and feed the results back as `SearchComplete`
    Search(SearchRequest),

    /// Drop the session from the store
    EndSession,
}

impl Effect {
    pub fn reply(kind: ResponseKind, message: impl Into<String>) -> Self {
        Effect::Reply(Reply::new(kind, message))
    }

    pub fn search(filters: SearchFilters, description: impl Into<String>) -> Self {
        Effect::Search(SearchRequest {
            filters,
            description: description.into(),
            natural_query: false,
        })
    }
}
