//! Session and conversation state types

use crate::db::{Listing, SearchFilters};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Most recent history entries kept per session
pub const HISTORY_LIMIT: usize = 20;

/// Detailed-search sub-menus reachable from the main menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MenuType {
    PropertyType,
    Bedrooms,
    Price,
    Location,
}

impl MenuType {
    pub fn tag(self) -> &'static str {
        match self {
            MenuType::PropertyType => "property_type",
            MenuType::Bedrooms => "bedrooms",
            MenuType::Price => "price",
            MenuType::Location => "location",
        }
    }

    /// Number of numbered presets in this menu ("0" not included)
    pub fn option_count(self) -> usize {
        match self {
            MenuType::PropertyType => 4,
            MenuType::Bedrooms | MenuType::Price | MenuType::Location => 6,
        }
    }
}

/// Conversation context together with the data that context owns.
///
/// The variant decides what context data exists, so a session can never
/// hold search results outside `SearchResults` or a listing outside
/// `PropertyDetail`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "context", rename_all = "snake_case")]
pub enum ConvState {
    #[default]
    Main,
    SearchResults {
        results: Vec<Listing>,
        description: String,
        natural_query: bool,
    },
    PropertyDetail {
        listing: Listing,
    },
    SubMenu {
        menu_type: MenuType,
    },
}

impl ConvState {
    pub fn name(&self) -> &'static str {
        match self {
            ConvState::Main => "main",
            ConvState::SearchResults { .. } => "search_results",
            ConvState::PropertyDetail { .. } => "property_detail",
            ConvState::SubMenu { .. } => "sub_menu",
        }
    }

    /// Menu tag shown in session stats
    pub fn menu_tag(&self) -> &'static str {
        match self {
            ConvState::SubMenu { menu_type } => menu_type.tag(),
            other => other.name(),
        }
    }

    pub fn is_main(&self) -> bool {
        matches!(self, ConvState::Main)
    }
}

/// Saved context for back-navigation
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub state: ConvState,
    pub menu: String,
    pub step: u32,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryKind {
    UserMessage,
    BotResponse,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub kind: HistoryKind,
    pub content: String,
}

/// Per-user conversation state
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user_id: String,
    pub display_name: String,
    pub state: ConvState,
    pub current_menu: String,
    pub conversation_step: u32,
    pub search_filters: SearchFilters,
    pub available_options: Vec<String>,
    pub navigation_stack: Vec<Frame>,
    pub last_activity: DateTime<Utc>,
    pub history: VecDeque<HistoryEntry>,
    /// Set once the session has been removed from the store
    pub(crate) ended: bool,
}

impl Session {
    pub fn new(
        user_id: impl Into<String>,
        display_name: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
            state: ConvState::Main,
            current_menu: ConvState::Main.menu_tag().to_string(),
            conversation_step: 0,
            search_filters: SearchFilters::default(),
            available_options: main_options(),
            navigation_stack: Vec::new(),
            last_activity: now,
            history: VecDeque::with_capacity(HISTORY_LIMIT),
            ended: false,
        }
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity = now;
    }

    /// Append to history, evicting the oldest entries past [`HISTORY_LIMIT`]
    pub fn record(&mut self, kind: HistoryKind, content: impl Into<String>, now: DateTime<Utc>) {
        self.history.push_back(HistoryEntry {
            timestamp: now,
            kind,
            content: content.into(),
        });
        while self.history.len() > HISTORY_LIMIT {
            self.history.pop_front();
        }
    }

    /// Snapshot of the navigable part of the session
    pub fn frame(&self) -> Frame {
        Frame {
            state: self.state.clone(),
            menu: self.current_menu.clone(),
            step: self.conversation_step,
            options: self.available_options.clone(),
        }
    }

    /// Move forward into `state`, saving the current context unless it is main.
    pub fn enter(&mut self, state: ConvState, options: Vec<String>) {
        if !self.state.is_main() {
            self.navigation_stack.push(self.frame());
        }
        self.current_menu = state.menu_tag().to_string();
        self.state = state;
        self.conversation_step += 1;
        self.available_options = options;
    }

    /// Restore the most recently saved frame. Returns false when the stack is empty.
    pub fn go_back(&mut self) -> bool {
        let Some(frame) = self.navigation_stack.pop() else {
            return false;
        };
        self.state = frame.state;
        self.current_menu = frame.menu;
        self.conversation_step = frame.step;
        self.available_options = frame.options;
        true
    }

    pub fn reset_to_main(&mut self) {
        self.state = ConvState::Main;
        self.current_menu = ConvState::Main.menu_tag().to_string();
        self.conversation_step = 0;
        self.available_options = main_options();
        self.navigation_stack.clear();
    }

    /// Copy `other`'s navigation state onto this session, leaving identity,
    /// activity and history alone.
    pub fn restore_navigation(&mut self, other: &Session) {
        self.state = other.state.clone();
        self.current_menu = other.current_menu.clone();
        self.conversation_step = other.conversation_step;
        self.search_filters = other.search_filters.clone();
        self.available_options = other.available_options.clone();
        self.navigation_stack = other.navigation_stack.clone();
    }
}

pub fn main_options() -> Vec<String> {
    numbered(8)
}

pub fn results_options(count: usize) -> Vec<String> {
    let mut options = numbered(count);
    options.extend(["back".to_string(), "*".to_string()]);
    options
}

pub fn detail_options() -> Vec<String> {
    ["1", "2", "back", "*"].map(String::from).to_vec()
}

pub fn sub_menu_options(menu_type: MenuType) -> Vec<String> {
    let mut options = numbered(menu_type.option_count());
    options.extend(["0", "back", "*"].map(String::from));
    options
}

fn numbered(count: usize) -> Vec<String> {
    (1..=count).map(|i| i.to_string()).collect()
}
