//! Authentication service.
//!
//! Email and password credentials, checked against argon2 hashes held by a
//! [`UserStore`].

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, instrument};

use prostore_core::Email;

use crate::db::{RepositoryError, UserStore};
use crate::models::user::User;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Email and password submitted on sign-in.
#[derive(Debug)]
pub struct Credentials {
    pub email: String,
    pub password: SecretString,
}

/// Account details submitted on sign-up.
#[derive(Debug)]
pub struct Registration {
    pub name: Option<String>,
    pub email: String,
    pub password: SecretString,
    pub confirm_password: SecretString,
}

/// Authentication service.
///
/// Handles user registration and credential checks.
pub struct AuthService<'a, U> {
    users: &'a U,
}

impl<'a, U: UserStore> AuthService<'a, U> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(users: &'a U) -> Self {
        Self { users }
    }

    /// Resolve credentials to a user.
    ///
    /// Returns `Ok(None)` when the credentials are missing or malformed, the
    /// email is unknown, the user has no password, or the password is wrong.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the user lookup fails.
    #[instrument(skip_all)]
    pub async fn authorize(
        &self,
        credentials: Option<&Credentials>,
    ) -> Result<Option<User>, AuthError> {
        let Some(credentials) = credentials else {
            return Ok(None);
        };

        let Ok(email) = Email::parse(&credentials.email) else {
            debug!("Rejected malformed email");
            return Ok(None);
        };

        let Some((user, password_hash)) = self.users.find_credentials_by_email(&email).await?
        else {
            return Ok(None);
        };

        if verify_password(credentials.password.expose_secret(), &password_hash).is_err() {
            debug!(user_id = %user.id, "Password mismatch");
            return Ok(None);
        }

        Ok(Some(user))
    }

    /// Register a new user with email and password.
    ///
    /// A blank name is stored as absent; the token builder derives one later.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::PasswordMismatch` if the confirmation differs.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[instrument(skip_all)]
    pub async fn register_with_password(
        &self,
        registration: &Registration,
    ) -> Result<User, AuthError> {
        let email = Email::parse(&registration.email)?;

        let password = registration.password.expose_secret();
        if password != registration.confirm_password.expose_secret() {
            return Err(AuthError::PasswordMismatch);
        }
        validate_password(password)?;

        let password_hash = hash_password(password)?;

        let name = registration
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty());

        self.users
            .create_with_password(&email, name, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })
    }
}

/// Validate password meets requirements.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` if the password is too short.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` if the password doesn't match or
/// the hash can't be parsed.
pub fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
