//! Mock implementations for testing
//!
//! These mocks enable engine and webhook tests without real I/O.

use super::traits::*;
use crate::db::{Listing, SearchFilters, ACTIVE_STATUS};
use crate::whatsapp::SendError;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

// ============================================================================
// Mock Listing Gateway
// ============================================================================

/// In-memory listing store that applies the same filter rules as SQL
pub struct MockGateway {
    listings: Vec<Listing>,
    failing: AtomicBool,
    /// Record of every search made
    pub searches: Mutex<Vec<SearchFilters>>,
}

impl MockGateway {
    pub fn new(listings: Vec<Listing>) -> Self {
        Self {
            listings,
            failing: AtomicBool::new(false),
            searches: Mutex::new(Vec::new()),
        }
    }

    /// Make subsequent searches fail until switched back
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn recorded_searches(&self) -> Vec<SearchFilters> {
        self.searches.lock().unwrap().clone()
    }

    fn matches(listing: &Listing, filters: &SearchFilters) -> bool {
        listing.status == ACTIVE_STATUS
            && filters
                .city
                .as_ref()
                .map_or(true, |c| listing.city.eq_ignore_ascii_case(c))
            && filters
                .property_type
                .map_or(true, |t| listing.property_type == t.as_db_str())
            && filters.bedrooms.map_or(true, |b| listing.bedrooms == b)
            && filters.max_price.map_or(true, |max| listing.price <= max)
            && filters.min_price.map_or(true, |min| listing.price >= min)
    }
}

#[async_trait]
impl ListingGateway for MockGateway {
    async fn search(
        &self,
        filters: &SearchFilters,
        limit: usize,
    ) -> Result<Vec<Listing>, SearchError> {
        self.searches.lock().unwrap().push(filters.clone());
        if self.failing.load(Ordering::SeqCst) {
            return Err(SearchError::Task("mock store offline".to_string()));
        }

        let mut found: Vec<Listing> = self
            .listings
            .iter()
            .filter(|l| Self::matches(l, filters))
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            b.featured
                .cmp(&a.featured)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        found.truncate(limit);
        Ok(found)
    }
}

/// Gateway whose every search fails
#[derive(Default)]
pub struct FailingGateway;

#[async_trait]
impl ListingGateway for FailingGateway {
    async fn search(
        &self,
        _filters: &SearchFilters,
        _limit: usize,
    ) -> Result<Vec<Listing>, SearchError> {
        Err(SearchError::Task("listing store offline".to_string()))
    }
}

// ============================================================================
// Mock Reply Sender
// ============================================================================

/// Sender that records outbound messages instead of delivering them
pub struct RecordingSender {
    configured: bool,
    fail: bool,
    attempts: AtomicUsize,
    pub sent: Mutex<Vec<(String, String)>>,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self {
            configured: true,
            fail: false,
            attempts: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// A sender that reports missing credentials and refuses to send
    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::new()
        }
    }

    /// A configured sender whose deliveries fail
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    /// Every call to `send_text`, delivered or not
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn sent_messages(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

impl Default for RecordingSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReplySender for RecordingSender {
    async fn send_text(&self, to: &str, body: &str) -> Result<(), SendError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if !self.configured {
            return Err(SendError::NotConfigured);
        }
        if self.fail {
            return Err(SendError::network("mock delivery failure"));
        }
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), body.to_string()));
        Ok(())
    }

    fn is_configured(&self) -> bool {
        self.configured
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// Build an active listing; `age_days` pushes `created_at` into the past
pub fn listing(
    id: &str,
    city: &str,
    property_type: &str,
    bedrooms: u32,
    price: f64,
    age_days: i64,
) -> Listing {
    Listing {
        id: id.to_string(),
        title: format!("{bedrooms} Bedroom {property_type} in {city}"),
        description: Some(format!("Listing {id}")),
        address: format!("{id} Test Street"),
        city: city.to_string(),
        state: city.to_string(),
        price,
        property_type: property_type.to_string(),
        bedrooms,
        bathrooms: bedrooms,
        area: Some(120.0),
        status: ACTIVE_STATUS.to_string(),
        featured: false,
        created_at: Utc::now() - Duration::days(age_days),
    }
}

/// A small catalogue spread over the cities and types the menus offer
pub fn sample_listings() -> Vec<Listing> {
    let mut featured = listing("lag-feat", "Lagos", "HOUSE", 4, 120_000_000.0, 30);
    featured.featured = true;

    let mut sold = listing("lag-sold", "Lagos", "HOUSE", 4, 90_000_000.0, 0);
    sold.status = "SOLD".to_string();

    vec![
        featured,
        sold,
        listing("lag-apt-3", "Lagos", "APARTMENT", 3, 45_000_000.0, 1),
        listing("lag-apt-2", "lagos", "APARTMENT", 2, 28_000_000.0, 2),
        listing("lag-off", "Lagos", "OFFICE", 0, 250_000_000.0, 3),
        listing("abj-house", "Abuja", "HOUSE", 5, 180_000_000.0, 4),
        listing("abj-apt", "Abuja", "APARTMENT", 2, 35_000_000.0, 5),
        listing("ph-house", "Port Harcourt", "HOUSE", 3, 60_000_000.0, 6),
    ]
}
