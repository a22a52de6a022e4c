//! Error types for the store subsystem.
//!
//! [`StoreError`] is returned by every store operation. Variants are specific
//! enough for the transport layer to map onto status codes (`TableNotFound` /
//! `PlayerNotFound` → 404) while keeping the surface small.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `SQLite` database error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection pool error.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// JSON serialization/deserialization error — also the rejection path for
    /// payloads outside the closed value shapes.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Schema migration failed.
    #[error("migration error: {message}")]
    Migration {
        /// Describes which migration failed and why.
        message: String,
    },

    /// Requested table was not found.
    #[error("table not found: {0}")]
    TableNotFound(String),

    /// Requested player was not found.
    #[error("player not found: {0}")]
    PlayerNotFound(String),

    /// Internal error (e.g. poisoned lock).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Convenience type alias for store results.
pub type Result<T> = std::result::Result<T, StoreError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
