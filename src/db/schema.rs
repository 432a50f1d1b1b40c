//! Database schema and listing types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS listings (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT,
    address TEXT NOT NULL DEFAULT '',
    city TEXT NOT NULL,
    state TEXT NOT NULL DEFAULT '',
    price REAL NOT NULL,
    type TEXT NOT NULL,
    bedrooms INTEGER NOT NULL DEFAULT 0,
    bathrooms INTEGER NOT NULL DEFAULT 0,
    area REAL,
    status TEXT NOT NULL DEFAULT 'ACTIVE',
    featured BOOLEAN NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_listings_status ON listings(status, featured DESC, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_listings_city ON listings(city COLLATE NOCASE);
";

/// Tables that may be introspected through the admin surface.
pub const KNOWN_TABLES: &[&str] = &["listings"];

/// Status value for listings that are visible to searches
pub const ACTIVE_STATUS: &str = "ACTIVE";

/// Property category as stored in the `type` column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PropertyType {
    Apartment,
    House,
    Office,
}

impl PropertyType {
    pub fn as_db_str(self) -> &'static str {
        match self {
            PropertyType::Apartment => "APARTMENT",
            PropertyType::House => "HOUSE",
            PropertyType::Office => "OFFICE",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_db_str())
    }
}

/// Structured search criteria. Unset fields are left out of the query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub property_type: Option<PropertyType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bedrooms: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<f64>,
}

impl SearchFilters {
    pub fn city(city: impl Into<String>) -> Self {
        Self {
            city: Some(city.into()),
            ..Self::default()
        }
    }

    pub fn property_type(property_type: PropertyType) -> Self {
        Self {
            property_type: Some(property_type),
            ..Self::default()
        }
    }

    pub fn bedrooms(bedrooms: u32) -> Self {
        Self {
            bedrooms: Some(bedrooms),
            ..Self::default()
        }
    }

    pub fn price_range(min_price: Option<f64>, max_price: Option<f64>) -> Self {
        Self {
            min_price,
            max_price,
            ..Self::default()
        }
    }

    /// Number of criteria that are set
    pub fn len(&self) -> usize {
        [
            self.city.is_some(),
            self.property_type.is_some(),
            self.bedrooms.is_some(),
            self.min_price.is_some(),
            self.max_price.is_some(),
        ]
        .into_iter()
        .filter(|set| *set)
        .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Listing record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    #[serde(default = "new_listing_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub address: String,
    pub city: String,
    #[serde(default)]
    pub state: String,
    pub price: f64,
    #[serde(rename = "type")]
    pub property_type: String,
    #[serde(default)]
    pub bedrooms: u32,
    #[serde(default)]
    pub bathrooms: u32,
    #[serde(default)]
    pub area: Option<f64>,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub featured: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

fn new_listing_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn default_status() -> String {
    ACTIVE_STATUS.to_string()
}

/// Column description returned by table introspection
#[derive(Debug, Clone, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub default_value: Option<String>,
}

/// Summary of a known table
#[derive(Debug, Clone, Serialize)]
pub struct TableSummary {
    pub table_name: String,
    pub total_rows: i64,
    pub columns: Vec<ColumnInfo>,
}
