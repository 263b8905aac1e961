//! Storage for identities and carts.
//!
//! # Database: `prostore`
//!
//! ## Tables
//!
//! - `storefront.user` - Identities (email, optional display name, role)
//! - `storefront.user_password` - Argon2 password hashes
//! - `storefront.cart` - Carts, owned by a user and/or an anonymous session
//! - `tower_sessions.session` - Session storage (identity tokens)
//!
//! # Store seams
//!
//! The services never talk to `sqlx` directly. They are generic over
//! [`UserStore`] and [`CartStore`], implemented here for `PostgreSQL`
//! ([`UserRepository`], [`CartRepository`], combined in [`PgStore`]) and in
//! memory ([`memory::MemoryStore`]). Handlers see both through [`Store`].
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p prostore-cli -- migrate
//! ```

pub mod carts;
pub mod memory;
pub mod pg;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use carts::{CartRepository, CartStore};
pub use memory::MemoryStore;
pub use pg::PgStore;
pub use users::{UserRepository, UserStore};

/// User and cart storage as held in the application state.
pub trait Store: UserStore + CartStore + Clone + 'static {}

impl<T> Store for T where T: UserStore + CartStore + Clone + 'static {}

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email, one cart per user).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// Store unavailable (used by the in-memory store to simulate outages).
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Map a sqlx error to `Conflict` when it is a unique violation.
pub fn conflict_or_database(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(what.to_owned());
    }
    RepositoryError::Database(e)
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
