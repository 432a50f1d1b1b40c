//! Pure state transition function
//!
//! Global commands are matched before the per-context handlers. A
//! transition that needs listings emits [`Effect::Search`] and leaves the
//! session untouched; the context only changes when the matching
//! [`Event::SearchComplete`] comes back.

use super::effect::SearchRequest;
use super::state::{detail_options, results_options, sub_menu_options};
use super::{ConvState, Effect, Event, MenuType, ResponseKind, Session};
use crate::db::{Listing, PropertyType, SearchFilters};
use crate::formatter;
use crate::keywords::extract_filters;
use sha2::{Digest, Sha256};
use thiserror::Error;

const MENU_COMMANDS: &[&str] = &["menu", "start", "help", "main", "*"];
const BACK_COMMAND: &str = "back";
const END_COMMANDS: &[&str] = &["quit", "exit", "stop", "end"];
const GREETINGS: &[&str] = &[
    "hi",
    "hello",
    "hey",
    "good morning",
    "good afternoon",
    "good evening",
    "greetings",
    "hola",
    "howdy",
];

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub session: Session,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
pub fn transition(session: &Session, event: Event) -> Result<TransitionResult, TransitionError> {
    match event {
        Event::UserMessage { text } => Ok(handle_user_message(session, &text)),
        Event::SearchComplete { request, results } => search_complete(session, request, results),
    }
}

fn handle_user_message(session: &Session, text: &str) -> TransitionResult {
    let input = text.trim();
    let command = input.to_lowercase();

    // ============================================================
    // Global commands
    // ============================================================

    if MENU_COMMANDS.contains(&command.as_str()) {
        let mut next = session.clone();
        next.reset_to_main();
        let message = formatter::welcome_back(&next.display_name);
        return TransitionResult::new(next).with_effect(Effect::reply(ResponseKind::Menu, message));
    }

    if command == BACK_COMMAND {
        let mut next = session.clone();
        if next.go_back() {
            let reply = render_current(&next);
            return TransitionResult::new(next).with_effect(Effect::Reply(reply));
        }
        next.reset_to_main();
        return TransitionResult::new(next)
            .with_effect(Effect::reply(ResponseKind::Menu, formatter::no_previous_step()));
    }

    if END_COMMANDS.contains(&command.as_str()) {
        return TransitionResult::new(session.clone())
            .with_effect(Effect::EndSession)
            .with_effect(Effect::reply(ResponseKind::End, formatter::session_ended()));
    }

    if GREETINGS.contains(&command.as_str()) {
        let mut next = session.clone();
        next.reset_to_main();
        let message = formatter::greeting(&next.display_name, greeting_index(&next.user_id));
        return TransitionResult::new(next)
            .with_effect(Effect::reply(ResponseKind::Greeting, message));
    }

    // ============================================================
    // Context-specific handling
    // ============================================================

    match &session.state {
        ConvState::Main => main_menu(session, input, text),
        ConvState::SearchResults { results, .. } => select_result(session, results, input, text),
        ConvState::PropertyDetail { .. } => detail_action(session, input, text),
        ConvState::SubMenu { menu_type } => sub_menu(session, *menu_type, input, text),
    }
}

fn main_menu(session: &Session, input: &str, raw: &str) -> TransitionResult {
    let unchanged = TransitionResult::new(session.clone());

    let sub_menu_type = match input {
        "1" => {
            return unchanged.with_effect(Effect::search(
                SearchFilters::default(),
                "Show all available properties",
            ))
        }
        "2" => {
            return unchanged.with_effect(Effect::search(
                SearchFilters::price_range(None, Some(50_000_000.0)),
                "Properties under ₦50M",
            ))
        }
        "3" => {
            return unchanged
                .with_effect(Effect::search(SearchFilters::city("Lagos"), "Properties in Lagos"))
        }
        "4" => {
            return unchanged
                .with_effect(Effect::search(SearchFilters::city("Abuja"), "Properties in Abuja"))
        }
        "5" => Some(MenuType::PropertyType),
        "6" => Some(MenuType::Bedrooms),
        "7" => Some(MenuType::Price),
        "8" => Some(MenuType::Location),
        _ => None,
    };

    if let Some(menu_type) = sub_menu_type {
        let mut next = session.clone();
        next.enter(ConvState::SubMenu { menu_type }, sub_menu_options(menu_type));
        return TransitionResult::new(next).with_effect(Effect::reply(
            ResponseKind::Menu,
            formatter::sub_menu_intro(menu_type),
        ));
    }

    let filters = extract_filters(input);
    if filters.is_empty() {
        return unchanged.with_effect(Effect::reply(
            ResponseKind::Error,
            formatter::main_menu_rejection(raw),
        ));
    }

    unchanged.with_effect(Effect::Search(SearchRequest {
        filters,
        description: format!("Natural search: \"{input}\""),
        natural_query: true,
    }))
}

fn select_result(
    session: &Session,
    results: &[Listing],
    input: &str,
    raw: &str,
) -> TransitionResult {
    let selected = input
        .parse::<usize>()
        .ok()
        .filter(|n| (1..=results.len()).contains(n))
        .and_then(|n| results.get(n - 1));

    let Some(listing) = selected else {
        return TransitionResult::new(session.clone()).with_effect(Effect::reply(
            ResponseKind::Error,
            formatter::results_rejection(raw, results.len()),
        ));
    };

    let message = formatter::property_detail(listing);
    let mut next = session.clone();
    next.enter(
        ConvState::PropertyDetail {
            listing: listing.clone(),
        },
        detail_options(),
    );
    TransitionResult::new(next).with_effect(Effect::reply(ResponseKind::PropertyDetail, message))
}

fn detail_action(session: &Session, input: &str, raw: &str) -> TransitionResult {
    let effect = match input {
        "1" => Effect::reply(ResponseKind::Interest, formatter::interest_recorded()),
        "2" => Effect::reply(ResponseKind::Inspection, formatter::inspection_requested()),
        _ => Effect::reply(ResponseKind::Error, formatter::detail_rejection(raw)),
    };
    TransitionResult::new(session.clone()).with_effect(effect)
}

fn sub_menu(session: &Session, menu_type: MenuType, input: &str, raw: &str) -> TransitionResult {
    if input == "0" {
        let mut next = session.clone();
        next.reset_to_main();
        return TransitionResult::new(next)
            .with_effect(Effect::reply(ResponseKind::Menu, formatter::back_to_main()));
    }

    match sub_menu_preset(menu_type, input) {
        Some((filters, description)) => {
            TransitionResult::new(session.clone()).with_effect(Effect::search(filters, description))
        }
        None => TransitionResult::new(session.clone()).with_effect(Effect::reply(
            ResponseKind::Error,
            formatter::sub_menu_rejection(raw, menu_type),
        )),
    }
}

/// Filters and result header for a numbered sub-menu choice
fn sub_menu_preset(menu_type: MenuType, key: &str) -> Option<(SearchFilters, String)> {
    const M: f64 = 1_000_000.0;
    let kind = SearchFilters::property_type;
    let band = |min: Option<f64>, max: Option<f64>| {
        SearchFilters::price_range(min.map(|v| v * M), max.map(|v| v * M))
    };

    let (filters, label) = match (menu_type, key) {
        (MenuType::PropertyType, "1") => (kind(PropertyType::Apartment), "Apartments/Flats"),
        (MenuType::PropertyType, "2") => (kind(PropertyType::House), "Houses/Duplexes"),
        (MenuType::PropertyType, "3") => (kind(PropertyType::Office), "Office Spaces"),
        (MenuType::PropertyType, "4") => (SearchFilters::default(), "All property types"),

        (MenuType::Bedrooms, "1") => (SearchFilters::bedrooms(1), "1 Bedroom"),
        (MenuType::Bedrooms, "2") => (SearchFilters::bedrooms(2), "2 Bedrooms"),
        (MenuType::Bedrooms, "3") => (SearchFilters::bedrooms(3), "3 Bedrooms"),
        (MenuType::Bedrooms, "4") => (SearchFilters::bedrooms(4), "4 Bedrooms"),
        (MenuType::Bedrooms, "5") => (SearchFilters::bedrooms(5), "5 Bedrooms"),
        (MenuType::Bedrooms, "6") => (SearchFilters::default(), "Any number of bedrooms"),

        (MenuType::Price, "1") => (band(None, Some(25.0)), "Under ₦25M"),
        (MenuType::Price, "2") => (band(Some(25.0), Some(50.0)), "₦25M - ₦50M"),
        (MenuType::Price, "3") => (band(Some(50.0), Some(100.0)), "₦50M - ₦100M"),
        (MenuType::Price, "4") => (band(Some(100.0), Some(200.0)), "₦100M - ₦200M"),
        (MenuType::Price, "5") => (band(Some(200.0), None), "Above ₦200M"),
        (MenuType::Price, "6") => (SearchFilters::default(), "Any price"),

        (MenuType::Location, "1") => (SearchFilters::city("Lagos"), "Lagos"),
        (MenuType::Location, "2") => (SearchFilters::city("Abuja"), "Abuja"),
        (MenuType::Location, "3") => (SearchFilters::city("Port Harcourt"), "Port Harcourt"),
        (MenuType::Location, "4") => (SearchFilters::city("Kano"), "Kano"),
        (MenuType::Location, "5") => (SearchFilters::city("Ibadan"), "Ibadan"),
        (MenuType::Location, "6") => (SearchFilters::default(), "All locations"),

        _ => return None,
    };

    let prefix = match menu_type {
        MenuType::PropertyType => "Property type",
        MenuType::Bedrooms => "Bedrooms",
        MenuType::Price => "Price range",
        MenuType::Location => "Location",
    };
    Some((filters, format!("{prefix}: {label}")))
}

fn search_complete(
    session: &Session,
    request: SearchRequest,
    results: Vec<Listing>,
) -> Result<TransitionResult, TransitionError> {
    if !matches!(session.state, ConvState::Main | ConvState::SubMenu { .. }) {
        return Err(TransitionError::InvalidTransition(format!(
            "search completed while in {}",
            session.state.name()
        )));
    }

    if results.is_empty() {
        return Ok(TransitionResult::new(session.clone()).with_effect(Effect::reply(
            ResponseKind::NoResults,
            formatter::no_results(&request.description),
        )));
    }

    let message = formatter::search_results(&request.description, &results);
    let options = results_options(results.len());
    let mut next = session.clone();
    next.enter(
        ConvState::SearchResults {
            results,
            description: request.description,
            natural_query: request.natural_query,
        },
        options,
    );
    next.search_filters = request.filters;

    Ok(TransitionResult::new(next).with_effect(Effect::reply(ResponseKind::SearchResults, message)))
}

/// Re-render the current context without querying again
fn render_current(session: &Session) -> super::Reply {
    use super::Reply;

    match &session.state {
        ConvState::Main => Reply::new(ResponseKind::Menu, formatter::back_to_main()),
        ConvState::SearchResults {
            results,
            description,
            ..
        } => Reply::new(
            ResponseKind::SearchResults,
            formatter::search_results(description, results),
        ),
        ConvState::PropertyDetail { listing } => {
            Reply::new(ResponseKind::PropertyDetail, formatter::property_detail(listing))
        }
        ConvState::SubMenu { menu_type } => {
            Reply::new(ResponseKind::Menu, formatter::sub_menu_intro(*menu_type))
        }
    }
}

/// Stable greeting choice for a user id
pub(crate) fn greeting_index(user_id: &str) -> usize {
    let digest = Sha256::digest(user_id.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    let bucket = u64::from_be_bytes(prefix) % formatter::GREETING_COUNT as u64;
    usize::try_from(bucket).unwrap_or_default()
}
