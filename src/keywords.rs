//! Free-text keyword extraction
//!
//! Maps a chat message to [`SearchFilters`] using a fixed vocabulary. Each
//! rule runs independently; an empty result means nothing was recognised.

use crate::db::{PropertyType, SearchFilters};
use regex::Regex;
use std::sync::LazyLock;

const MILLION: f64 = 1_000_000.0;

/// Fraction either side of a target price used for the price band
const PRICE_BAND: f64 = 0.2;

/// Keyword sets checked in order; the first set with a hit wins.
const TYPE_KEYWORDS: &[(&[&str], PropertyType)] = &[
    (&["apartment", "flat"], PropertyType::Apartment),
    (&["house", "duplex", "bungalow"], PropertyType::House),
    (&["office", "commercial"], PropertyType::Office),
];

/// Gazetteer in priority order: (needle, canonical city name)
const CITIES: &[(&str, &str)] = &[
    ("lagos", "Lagos"),
    ("abuja", "Abuja"),
    ("port harcourt", "Port Harcourt"),
    ("kano", "Kano"),
    ("ibadan", "Ibadan"),
];

static BEDROOM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*bedroom").expect("valid bedroom pattern"));

static CEILING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"under\s*(?:₦|naira|ngn)?\s*(\d+(?:,\d{3})*(?:\.\d+)?)\s*(?:million|m)")
        .expect("valid ceiling pattern")
});

static TARGET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:₦|naira|ngn)\s*(\d+(?:,\d{3})*(?:\.\d+)?)\s*(?:million|m)")
        .expect("valid target price pattern")
});

/// Extract search filters from a free-text message.
pub fn extract_filters(message: &str) -> SearchFilters {
    let text = message.to_lowercase();
    let mut filters = SearchFilters::default();

    if let Some(caps) = BEDROOM_RE.captures(&text) {
        filters.bedrooms = caps[1].parse().ok();
    }

    filters.property_type = TYPE_KEYWORDS
        .iter()
        .find(|(words, _)| words.iter().any(|w| text.contains(w)))
        .map(|(_, property_type)| *property_type);

    filters.city = CITIES
        .iter()
        .find(|(needle, _)| text.contains(needle))
        .map(|(_, city)| (*city).to_string());

    if let Some(amount) = CEILING_RE.captures(&text).and_then(|c| parse_millions(&c[1])) {
        filters.max_price = Some(amount);
    }

    // A bare "₦40m" is a target price unless "under" appears anywhere in
    // the message, in which case the ceiling rule above stands.
    if !text.contains("under") {
        if let Some(target) = TARGET_RE.captures(&text).and_then(|c| parse_millions(&c[1])) {
            filters.min_price = Some(target * (1.0 - PRICE_BAND));
            filters.max_price = Some(target * (1.0 + PRICE_BAND));
        }
    }

    filters
}

fn parse_millions(raw: &str) -> Option<f64> {
    raw.replace(',', "")
        .parse::<f64>()
        .ok()
        .map(|value| value * MILLION)
}
