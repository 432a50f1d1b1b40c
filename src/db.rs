//! Database module for the listing store
//!
//! Read-mostly access to the `listings` table. Every value that reaches SQL
//! is bound as a parameter; identifiers come only from static text.

mod schema;

pub use schema::*;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::{Type, Value as SqlValue};
use rusqlite::{params, params_from_iter, Connection, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Database connection lock poisoned")]
    LockPoisoned,
    #[error("Unknown table: {0}")]
    UnknownTable(String),
    #[error("Invalid seed data: {0}")]
    Seed(#[from] serde_json::Error),
    #[error("Could not read seed file: {0}")]
    SeedIo(#[from] std::io::Error),
}

pub type DbResult<T> = Result<T, DbError>;

const LISTING_COLUMNS: &str = "id, title, description, address, city, state, price, type, \
     bedrooms, bathrooms, area, status, featured, created_at";

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn conn(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DbError::LockPoisoned)
    }

    fn run_migrations(&self) -> DbResult<()> {
        let conn = self.conn()?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    // ==================== Listing Operations ====================

    /// Search active listings.
    ///
    /// Filters combine with AND; unset filters add no predicate. Results are
    /// ordered featured-first, then newest first, and capped at `limit`.
    pub fn search_listings(&self, filters: &SearchFilters, limit: usize) -> DbResult<Vec<Listing>> {
        let mut predicate = Predicate::new("status = ?", SqlValue::Text(ACTIVE_STATUS.into()));

        if let Some(city) = &filters.city {
            predicate.and("LOWER(city) = LOWER(?)", SqlValue::Text(city.clone()));
        }
        if let Some(property_type) = filters.property_type {
            predicate.and("type = ?", SqlValue::Text(property_type.as_db_str().into()));
        }
        if let Some(bedrooms) = filters.bedrooms {
            predicate.and("bedrooms = ?", SqlValue::Integer(i64::from(bedrooms)));
        }
        if let Some(max_price) = filters.max_price {
            predicate.and("price <= ?", SqlValue::Real(max_price));
        }
        if let Some(min_price) = filters.min_price {
            predicate.and("price >= ?", SqlValue::Real(min_price));
        }

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let limit_slot = predicate.bind(SqlValue::Integer(limit));
        let sql = format!(
            "SELECT {LISTING_COLUMNS} FROM listings WHERE {} \
             ORDER BY featured DESC, created_at DESC LIMIT ?{limit_slot}",
            predicate.sql
        );

        tracing::debug!(sql = %sql, params = predicate.params.len(), "Listing search");

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(predicate.params.iter()), listing_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    /// Insert or replace a listing
    pub fn insert_listing(&self, listing: &Listing) -> DbResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO listings (id, title, description, address, city, state, price, type,
                                              bedrooms, bathrooms, area, status, featured, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                listing.id,
                listing.title,
                listing.description,
                listing.address,
                listing.city,
                listing.state,
                listing.price,
                listing.property_type,
                listing.bedrooms,
                listing.bathrooms,
                listing.area,
                listing.status,
                listing.featured,
                listing.created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
            ],
        )?;
        Ok(())
    }

    /// Count all listings regardless of status
    pub fn count_listings(&self) -> DbResult<i64> {
        let conn = self.conn()?;
        let count = conn.query_row("SELECT COUNT(*) FROM listings", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Import listings from a JSON array file when the table is empty.
    ///
    /// Returns the number of imported rows.
    pub fn import_seed_file<P: AsRef<Path>>(&self, path: P) -> DbResult<usize> {
        if self.count_listings()? > 0 {
            return Ok(0);
        }
        let raw = std::fs::read_to_string(path)?;
        let listings: Vec<Listing> = serde_json::from_str(&raw)?;
        for listing in &listings {
            self.insert_listing(listing)?;
        }
        Ok(listings.len())
    }

    // ==================== Introspection ====================

    pub fn sqlite_version(&self) -> DbResult<String> {
        let conn = self.conn()?;
        let version = conn.query_row("SELECT sqlite_version()", [], |row| row.get(0))?;
        Ok(version)
    }

    /// Describe a table from the allow-list
    pub fn table_summary(&self, table: &str) -> DbResult<TableSummary> {
        let table_name = KNOWN_TABLES
            .iter()
            .copied()
            .find(|known| *known == table)
            .ok_or_else(|| DbError::UnknownTable(table.to_string()))?;

        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT name, type, \"notnull\", dflt_value FROM pragma_table_info(?1) ORDER BY cid",
        )?;
        let columns = stmt
            .query_map(params![table_name], |row| {
                let not_null: bool = row.get(2)?;
                Ok(ColumnInfo {
                    name: row.get(0)?,
                    data_type: row.get(1)?,
                    nullable: !not_null,
                    default_value: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        // table_name is one of KNOWN_TABLES
        let total_rows = conn.query_row(&format!("SELECT COUNT(*) FROM {table_name}"), [], |row| {
            row.get(0)
        })?;

        Ok(TableSummary {
            table_name: table_name.to_string(),
            total_rows,
            columns,
        })
    }
}

/// WHERE clause under construction with positional parameters
struct Predicate {
    sql: String,
    params: Vec<SqlValue>,
}

impl Predicate {
    fn new(clause: &'static str, value: SqlValue) -> Self {
        let mut predicate = Self {
            sql: String::new(),
            params: Vec::new(),
        };
        let slot = predicate.bind(value);
        predicate.sql = clause.replace('?', &format!("?{slot}"));
        predicate
    }

    /// Append `AND clause`, binding `value` to the clause's single `?`
    fn and(&mut self, clause: &'static str, value: SqlValue) {
        let slot = self.bind(value);
        self.sql.push_str(" AND ");
        self.sql.push_str(&clause.replace('?', &format!("?{slot}")));
    }

    fn bind(&mut self, value: SqlValue) -> usize {
        self.params.push(value);
        self.params.len()
    }
}

fn listing_from_row(row: &Row<'_>) -> rusqlite::Result<Listing> {
    Ok(Listing {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        address: row.get(3)?,
        city: row.get(4)?,
        state: row.get(5)?,
        price: row.get(6)?,
        property_type: row.get(7)?,
        bedrooms: row.get(8)?,
        bathrooms: row.get(9)?,
        area: row.get(10)?,
        status: row.get(11)?,
        featured: row.get(12)?,
        created_at: parse_datetime(13, &row.get::<_, String>(13)?)?,
    })
}

fn parse_datetime(column: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}
