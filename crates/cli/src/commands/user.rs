//! User management commands.
//!
//! # Usage
//!
//! ```bash
//! # Create an admin; the password is read from PROSTORE_USER_PASSWORD
//! PROSTORE_USER_PASSWORD=... prostore-cli user create -e admin@example.com -n "Admin" -r admin
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `PROSTORE_USER_PASSWORD` - Password for the new user

use secrecy::ExposeSecret;
use sqlx::PgPool;
use thiserror::Error;

use prostore_core::{Email, Role, UserId};
use prostore_storefront::db::{RepositoryError, conflict_or_database};
use prostore_storefront::services::auth::{AuthError, hash_password, validate_password};

/// Environment variable holding the new user's password.
const PASSWORD_ENV: &str = "PROSTORE_USER_PASSWORD";

/// Errors that can occur during user operations.
#[derive(Debug, Error)]
pub enum UserError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Storage error other than a driver failure.
    #[error("Storage error: {0}")]
    Repository(RepositoryError),

    /// Invalid role.
    #[error("Invalid role: {0}. Valid roles: user, admin")]
    InvalidRole(String),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] prostore_core::EmailError),

    /// Password rejected or hashing failed.
    #[error("Password error: {0}")]
    Password(#[from] AuthError),

    /// User already exists.
    #[error("User already exists with email: {0}")]
    UserExists(String),
}

/// Create a user with a password and role.
///
/// # Errors
///
/// Returns `UserError` if input is invalid, the email is taken, or the
/// database is unreachable.
pub async fn create(email: &str, name: Option<&str>, role: &str) -> Result<UserId, UserError> {
    let role: Role = role
        .parse()
        .map_err(|_| UserError::InvalidRole(role.to_owned()))?;
    let email = Email::parse(email)?;

    let password =
        std::env::var(PASSWORD_ENV).map_err(|_| UserError::MissingEnvVar(PASSWORD_ENV))?;
    validate_password(&password)?;
    let password_hash = hash_password(&password)?;

    let database_url =
        super::database_url().ok_or(UserError::MissingEnvVar("STOREFRONT_DATABASE_URL"))?;

    tracing::info!("Connecting to storefront database...");
    let pool = PgPool::connect(database_url.expose_secret()).await?;

    tracing::info!("Creating user: {} ({})", email, role);

    let mut tx = pool.begin().await?;

    let user_id: UserId = sqlx::query_scalar(
        r"
        INSERT INTO storefront.user (email, name, role)
        VALUES ($1, $2, $3)
        RETURNING id
        ",
    )
    .bind(&email)
    .bind(name)
    .bind(role.as_str())
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| insert_error(conflict_or_database(e, "email already exists"), &email))?;

    sqlx::query(
        r"
        INSERT INTO storefront.user_password (user_id, password_hash)
        VALUES ($1, $2)
        ",
    )
    .bind(user_id)
    .bind(&password_hash)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        "User created successfully! ID: {}, Email: {}, Role: {}",
        user_id,
        email,
        role
    );

    Ok(user_id)
}

/// Classify a failed user insert; a unique violation means the email is taken.
fn insert_error(e: RepositoryError, email: &Email) -> UserError {
    match e {
        RepositoryError::Conflict(_) => UserError::UserExists(email.to_string()),
        RepositoryError::Database(e) => UserError::Database(e),
        other => UserError::Repository(other),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_email_is_user_exists() {
        let email = Email::parse("jane@example.com").unwrap();
        let err = insert_error(RepositoryError::Conflict("email already exists".into()), &email);
        assert!(matches!(err, UserError::UserExists(e) if e == "jane@example.com"));
    }

    #[test]
    fn test_driver_error_stays_database() {
        let email = Email::parse("jane@example.com").unwrap();
        let err = insert_error(RepositoryError::Database(sqlx::Error::PoolTimedOut), &email);
        assert!(matches!(err, UserError::Database(sqlx::Error::PoolTimedOut)));
    }
}
