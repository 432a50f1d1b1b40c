//! Property-based tests for the state machine
//!
//! Conversations are driven the way the runtime drives them: any
//! `Search` effect is answered with a synthetic `SearchComplete`.

use super::state::HISTORY_LIMIT;
use super::*;
use crate::db::{Listing, SearchFilters, ACTIVE_STATUS};
use crate::keywords::extract_filters;
use chrono::Utc;
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

fn test_session() -> Session {
    Session::new("2348000000001", "Tester", Utc::now())
}

fn make_listing(i: usize) -> Listing {
    Listing {
        id: format!("listing-{i:04}"),
        title: format!("Listing {i}"),
        description: None,
        address: "1 Test Road".to_string(),
        city: "Lagos".to_string(),
        state: "Lagos".to_string(),
        price: 1_000_000.0 * (i as f64 + 1.0),
        property_type: "HOUSE".to_string(),
        bedrooms: 2,
        bathrooms: 1,
        area: None,
        status: ACTIVE_STATUS.to_string(),
        featured: false,
        created_at: Utc::now(),
    }
}

/// Apply one user input, completing any search with `result_count` listings
fn drive(session: &Session, text: &str, result_count: usize) -> (Session, Vec<Effect>) {
    let mut result = transition(session, Event::user_message(text)).expect("user message");
    let search = result.effects.iter().find_map(|e| match e {
        Effect::Search(request) => Some(request.clone()),
        _ => None,
    });
    if let Some(request) = search {
        let results = (0..result_count).map(make_listing).collect();
        result = transition(&result.session, Event::SearchComplete { request, results })
            .expect("search complete");
    }
    (result.session, result.effects)
}

/// Structural checks that must hold between any two messages
fn is_consistent(session: &Session) -> bool {
    let menu_matches = session.current_menu == session.state.menu_tag();
    let main_is_clean = !session.state.is_main()
        || (session.conversation_step == 0 && session.navigation_stack.is_empty());
    let stack_has_no_main = session.navigation_stack.iter().all(|f| !f.state.is_main());
    menu_matches && main_is_clean && stack_has_no_main && !session.available_options.is_empty()
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_input() -> impl Strategy<Value = String> {
    prop_oneof![
        (0u32..10).prop_map(|n| n.to_string()),
        Just("back".to_string()),
        Just("BACK".to_string()),
        Just("menu".to_string()),
        Just("*".to_string()),
        Just("hello".to_string()),
        Just("2 bedroom flat in Abuja".to_string()),
        Just("houses under 40 million".to_string()),
        "[a-z ]{0,12}",
    ]
}

fn arb_conversation() -> impl Strategy<Value = Vec<(String, usize)>> {
    proptest::collection::vec((arb_input(), 0usize..6), 0..30)
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Every reachable session is internally consistent
    #[test]
    fn prop_sessions_stay_consistent(conversation in arb_conversation()) {
        let mut session = test_session();
        for (text, count) in conversation {
            let (next, effects) = drive(&session, &text, count);
            prop_assert!(is_consistent(&next), "inconsistent after {:?}: {:?}", text, next);
            let replies = effects.iter().filter(|e| matches!(e, Effect::Reply(_))).count();
            prop_assert_eq!(replies, 1, "exactly one reply per message");
            session = next;
        }
    }

    // "menu" from anywhere lands on main with nothing to go back to
    #[test]
    fn prop_menu_always_resets(conversation in arb_conversation()) {
        let mut session = test_session();
        for (text, count) in conversation {
            session = drive(&session, &text, count).0;
        }
        let (after, _) = drive(&session, "menu", 0);
        prop_assert!(after.state.is_main());
        prop_assert!(after.navigation_stack.is_empty());
        prop_assert_eq!(after.conversation_step, 0);
    }

    // "back" either pops exactly one frame or lands on main with an empty stack
    #[test]
    fn prop_back_pops_one_frame(conversation in arb_conversation()) {
        let mut session = test_session();
        for (text, count) in conversation {
            session = drive(&session, &text, count).0;
        }
        let depth = session.navigation_stack.len();
        let expected = session.navigation_stack.last().cloned();
        let (after, _) = drive(&session, "back", 0);
        match expected {
            Some(frame) => {
                prop_assert_eq!(after.frame(), frame);
                prop_assert_eq!(after.navigation_stack.len(), depth - 1);
            }
            None => {
                prop_assert!(after.state.is_main());
                prop_assert!(after.navigation_stack.is_empty());
            }
        }
    }

    // Forward into a detail view and back restores the prior context exactly
    #[test]
    fn prop_select_then_back_round_trips(count in 1usize..6, pick in 1usize..6) {
        let (results, _) = drive(&test_session(), "1", count);
        let pick = pick.min(count);
        let (detail, _) = drive(&results, &pick.to_string(), 0);
        let (back, _) = drive(&detail, "back", 0);
        prop_assert_eq!(back.frame(), results.frame());
        prop_assert_eq!(back.navigation_stack, results.navigation_stack);
    }

    // Unrecognised input in results or detail never moves the session
    #[test]
    fn prop_rejections_keep_state(count in 1usize..6, junk in "[a-z]{3,10}") {
        let reserved = [
            "back", "menu", "main", "help", "start", "quit", "exit", "stop", "end", "hey",
            "hello", "hola", "howdy", "greetings",
        ];
        prop_assume!(!reserved.contains(&junk.as_str()));
        let (results, _) = drive(&test_session(), "1", count);
        let (after, effects) = drive(&results, &junk, 0);
        prop_assert_eq!(&after, &results);
        prop_assert!(matches!(&effects[0], Effect::Reply(r) if r.kind == ResponseKind::Error));
    }

    // Filters on the session only change when a search commits results
    #[test]
    fn prop_filters_follow_committed_search(count in 0usize..4) {
        let (after, _) = drive(&test_session(), "3", count);
        if count == 0 {
            prop_assert_eq!(after.search_filters, SearchFilters::default());
        } else {
            prop_assert_eq!(after.search_filters, SearchFilters::city("Lagos"));
        }
    }

    // History bound holds however many entries are recorded
    #[test]
    fn prop_history_is_bounded(entries in 0usize..80) {
        let mut session = test_session();
        for i in 0..entries {
            let kind = if i % 2 == 0 { HistoryKind::UserMessage } else { HistoryKind::BotResponse };
            session.record(kind, format!("entry {i}"), Utc::now());
        }
        prop_assert_eq!(session.history.len(), entries.min(HISTORY_LIMIT));
        if entries > 0 {
            let last = format!("entry {}", entries - 1);
            prop_assert_eq!(session.history.back().map(|h| h.content.clone()), Some(last));
        }
    }

    // The extractor never panics and a ceiling is never below a floor
    #[test]
    fn prop_extractor_bounds_are_ordered(text in ".{0,60}") {
        let filters = extract_filters(&text);
        if let (Some(min), Some(max)) = (filters.min_price, filters.max_price) {
            prop_assert!(min <= max);
        }
    }

    // Extraction ignores case
    #[test]
    fn prop_extractor_case_insensitive(text in "[a-zA-Z0-9 ]{0,40}") {
        prop_assert_eq!(extract_filters(&text), extract_filters(&text.to_uppercase()));
    }
}
