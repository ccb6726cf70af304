//! Storage layer for court reservations.
//!
//! Provides persistence for accounts, bookings, the coin ledger, and payment
//! records using `rusqlite`, and runs every mutating operation of the booking
//! lifecycle inside a single transaction.
//!
//! # Concurrency
//!
//! Every write runs in a `BEGIN IMMEDIATE` transaction, which takes SQLite's
//! write lock before the first read. The conflict check and the insert it
//! guards are therefore serialized across connections and processes. As a
//! second line, each active booking owns one `booking_slots` row per covered
//! hour under a `(date, slot)` primary key, so overlapping commits fail at
//! the storage layer even if a writer skips the check.
//!
//! Balance updates run in the same transaction as the ledger entry they
//! accompany.
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but
//! not `Sync`. Use one `Database` per thread or request.
//!
//! # Retries
//!
//! A busy or locked database is retried with bounded exponential backoff
//! before surfacing as [`DbError::StorageUnavailable`]. Business-rule
//! failures are never retried.
//!
//! # Schema
//!
//! Dates are stored as TEXT `YYYY-MM-DD`, timestamps as local
//! `YYYY-MM-DDTHH:MM:SS`, slots as the integer hour of the mark, and cash
//! amounts as decimal TEXT.

mod accounts;
mod bookings;
mod grants;
mod ledger;
mod payments;

use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use backon::{BackoffBuilder, ExponentialBuilder};
use chrono::{NaiveDate, NaiveDateTime};
use court_core::{EngineError, EventSink, LifecycleEvent, Policy, TracingSink};
use rusqlite::{Connection, ErrorCode, Transaction, TransactionBehavior};
use thiserror::Error;

pub use accounts::{AccountUpdate, NewAccount};
pub use payments::Due;

/// How long a connection waits on SQLite's lock before reporting busy.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Retries after the first attempt when the database stays busy.
const MAX_RETRIES: usize = 3;

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// A business rule rejected the operation.
    #[error(transparent)]
    Engine(#[from] EngineError),
    /// The underlying database failed or stayed busy past all retries.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[from] rusqlite::Error),
    /// A stored row could not be decoded.
    #[error("invalid {table} row {id}: {message}")]
    InvalidRow {
        table: &'static str,
        id: i64,
        message: String,
    },
}

impl DbError {
    /// Stable machine-readable code for this error.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Engine(err) => err.code(),
            Self::StorageUnavailable(_) => "storage_unavailable",
            Self::InvalidRow { .. } => "invalid_row",
        }
    }

    /// The business-rule failure, if that is what this is.
    pub const fn engine(&self) -> Option<&EngineError> {
        match self {
            Self::Engine(err) => Some(err),
            Self::StorageUnavailable(_) | Self::InvalidRow { .. } => None,
        }
    }

    fn is_transient(&self) -> bool {
        match self {
            Self::StorageUnavailable(err) => matches!(
                err.sqlite_error_code(),
                Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
            ),
            Self::Engine(_) | Self::InvalidRow { .. } => false,
        }
    }
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for concurrency considerations.
pub struct Database {
    conn: Connection,
    policy: Policy,
    sink: Arc<dyn EventSink>,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, DbError> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let db = Self {
            conn,
            policy: Policy::default(),
            sink: Arc::new(TracingSink),
        };
        db.init()?;
        Ok(db)
    }

    /// Replaces the pricing and booking policy.
    #[must_use]
    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    /// Replaces the notification sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub const fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS accounts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                membership_class TEXT NOT NULL,
                balance INTEGER NOT NULL DEFAULT 0 CHECK (balance >= 0),
                approved INTEGER NOT NULL DEFAULT 0,
                active INTEGER NOT NULL DEFAULT 1,
                fees_paid INTEGER NOT NULL DEFAULT 0,
                role TEXT NOT NULL DEFAULT 'member',
                exempt INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );

            -- end_slot is NULL for legacy single-slot bookings
            CREATE TABLE IF NOT EXISTS bookings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id INTEGER NOT NULL,
                date TEXT NOT NULL,
                start_slot INTEGER NOT NULL,
                end_slot INTEGER,
                status TEXT NOT NULL,
                payment_status TEXT NOT NULL DEFAULT 'pending',
                coin_cost INTEGER NOT NULL DEFAULT 0,
                notes TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                CHECK (end_slot IS NULL OR end_slot > start_slot),
                FOREIGN KEY (owner_id) REFERENCES accounts(id)
            );

            CREATE INDEX IF NOT EXISTS idx_bookings_date ON bookings(date);
            CREATE INDEX IF NOT EXISTS idx_bookings_owner ON bookings(owner_id);

            CREATE TABLE IF NOT EXISTS booking_roster (
                booking_id INTEGER NOT NULL,
                position INTEGER NOT NULL,
                account_id INTEGER NOT NULL,
                PRIMARY KEY (booking_id, account_id),
                FOREIGN KEY (booking_id) REFERENCES bookings(id) ON DELETE CASCADE,
                FOREIGN KEY (account_id) REFERENCES accounts(id)
            );

            CREATE INDEX IF NOT EXISTS idx_booking_roster_account ON booking_roster(account_id);

            -- one row per hour held by an active booking
            CREATE TABLE IF NOT EXISTS booking_slots (
                date TEXT NOT NULL,
                slot INTEGER NOT NULL,
                booking_id INTEGER NOT NULL,
                PRIMARY KEY (date, slot),
                FOREIGN KEY (booking_id) REFERENCES bookings(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS ledger_entries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                account_id INTEGER NOT NULL,
                kind TEXT NOT NULL,
                amount INTEGER NOT NULL CHECK (amount >= 0),
                status TEXT NOT NULL,
                reason TEXT NOT NULL,
                booking_id INTEGER,
                created_at TEXT NOT NULL,
                resolved_at TEXT,
                FOREIGN KEY (account_id) REFERENCES accounts(id),
                FOREIGN KEY (booking_id) REFERENCES bookings(id)
            );

            CREATE INDEX IF NOT EXISTS idx_ledger_account ON ledger_entries(account_id);

            -- booking_id is NULL for open-play sessions
            CREATE TABLE IF NOT EXISTS payments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                account_id INTEGER NOT NULL,
                booking_id INTEGER,
                session_date TEXT,
                session_label TEXT,
                attendees TEXT NOT NULL DEFAULT '[]',
                hours INTEGER NOT NULL,
                amount TEXT NOT NULL,
                status TEXT NOT NULL,
                membership_class TEXT NOT NULL,
                rate_applied TEXT NOT NULL,
                notes TEXT,
                created_at TEXT NOT NULL,
                resolved_at TEXT,
                FOREIGN KEY (account_id) REFERENCES accounts(id),
                FOREIGN KEY (booking_id) REFERENCES bookings(id)
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_payments_booking
                ON payments(account_id, booking_id) WHERE booking_id IS NOT NULL;
            CREATE UNIQUE INDEX IF NOT EXISTS idx_payments_session
                ON payments(account_id, session_date, session_label) WHERE booking_id IS NULL;
            CREATE INDEX IF NOT EXISTS idx_payments_status ON payments(account_id, status);

            CREATE TABLE IF NOT EXISTS feature_grants (
                account_id INTEGER NOT NULL,
                feature TEXT NOT NULL,
                expires_at TEXT NOT NULL,
                PRIMARY KEY (account_id, feature),
                FOREIGN KEY (account_id) REFERENCES accounts(id)
            );
            ",
        )?;
        Ok(())
    }

    /// Runs `op` in an immediate transaction, retrying while the database is busy.
    fn write<T, F>(&mut self, mut op: F) -> Result<T, DbError>
    where
        F: FnMut(&Transaction<'_>, &Policy) -> Result<T, DbError>,
    {
        let mut delays = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(20))
            .with_max_delay(Duration::from_millis(500))
            .with_max_times(MAX_RETRIES)
            .with_jitter()
            .build();

        let mut attempt = 1;
        loop {
            match self.write_once(&mut op) {
                Err(err) if err.is_transient() => {
                    let Some(delay) = delays.next() else {
                        tracing::warn!(attempt, error = %err, "database busy, giving up");
                        return Err(err);
                    };
                    tracing::warn!(
                        attempt,
                        backoff_ms = %delay.as_millis(),
                        error = %err,
                        "database busy, retrying after backoff"
                    );
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    fn write_once<T, F>(&mut self, op: &mut F) -> Result<T, DbError>
    where
        F: FnMut(&Transaction<'_>, &Policy) -> Result<T, DbError>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = op(&tx, &self.policy)?;
        tx.commit()?;
        Ok(value)
    }

    fn publish(&self, event: &LifecycleEvent) {
        self.sink.publish(event);
    }
}

pub(crate) fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub(crate) fn format_timestamp(timestamp: NaiveDateTime) -> String {
    timestamp.format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// Parses a stored column value, attributing failures to the row.
pub(crate) fn parse_column<T>(value: &str, table: &'static str, id: i64) -> Result<T, DbError>
where
    T: FromStr,
    T::Err: Display,
{
    value.parse().map_err(|err: T::Err| DbError::InvalidRow {
        table,
        id,
        message: format!("{value:?}: {err}"),
    })
}

/// Maps a unique or primary-key violation to `rule`, passing other errors through.
pub(crate) fn on_constraint(err: rusqlite::Error, rule: EngineError) -> DbError {
    if err.sqlite_error_code() == Some(ErrorCode::ConstraintViolation) {
        DbError::Engine(rule)
    } else {
        DbError::StorageUnavailable(err)
    }
}
