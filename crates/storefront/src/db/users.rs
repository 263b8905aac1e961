//! User storage.
//!
//! [`UserStore`] is the credential-store seam used by the auth service and
//! the identity token builder. [`UserRepository`] implements it on
//! `PostgreSQL`.

use std::future::Future;

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use prostore_core::{Email, Role, UserId};

use super::{RepositoryError, conflict_or_database};
use crate::models::user::User;

/// Name value written by earlier deployments for users without a name.
///
/// Decoded as an absent name.
const LEGACY_UNSET_NAME: &str = "NO_NAME";

/// Credential store operations.
pub trait UserStore: Send + Sync {
    /// Find a user and their password hash by email.
    ///
    /// Returns `None` if the user doesn't exist or has no password set.
    fn find_credentials_by_email(
        &self,
        email: &Email,
    ) -> impl Future<Output = Result<Option<(User, String)>, RepositoryError>> + Send;

    /// Find a user by ID.
    fn find_by_id(
        &self,
        id: UserId,
    ) -> impl Future<Output = Result<Option<User>, RepositoryError>> + Send;

    /// Persist a new display name.
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    fn update_name(
        &self,
        id: UserId,
        name: &str,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Create a user with a password hash.
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    fn create_with_password(
        &self,
        email: &Email,
        name: Option<&str>,
        password_hash: &str,
    ) -> impl Future<Output = Result<User, RepositoryError>> + Send;
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: UserId,
    name: Option<String>,
    email: String,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct UserPasswordRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: Option<String>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&r.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let role: Role = r.role.parse().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid role in database: {e}"))
        })?;
        let name = r
            .name
            .filter(|name| name != LEGACY_UNSET_NAME && !name.trim().is_empty());

        Ok(Self {
            id: r.id,
            name,
            email,
            role,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

/// `PostgreSQL` repository for users.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

impl UserStore for UserRepository<'_> {
    async fn find_credentials_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, UserPasswordRow>(
            r"
            SELECT u.id, u.name, u.email, u.role, u.created_at, u.updated_at,
                   p.password_hash
            FROM storefront.user u
            LEFT JOIN storefront.user_password p ON u.id = p.user_id
            WHERE u.email = $1
            ",
        )
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        let Some(r) = row else {
            return Ok(None);
        };

        let Some(password_hash) = r.password_hash else {
            return Ok(None);
        };

        Ok(Some((User::try_from(r.user)?, password_hash)))
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, name, email, role, created_at, updated_at
            FROM storefront.user
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn update_name(&self, id: UserId, name: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE storefront.user
            SET name = $1, updated_at = now()
            WHERE id = $2
            ",
        )
        .bind(name)
        .bind(id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn create_with_password(
        &self,
        email: &Email,
        name: Option<&str>,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, UserRow>(
            r"
            INSERT INTO storefront.user (email, name, role)
            VALUES ($1, $2, $3)
            RETURNING id, name, email, role, created_at, updated_at
            ",
        )
        .bind(email)
        .bind(name)
        .bind(Role::User.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_or_database(e, "email already exists"))?;

        let user = User::try_from(row)?;

        sqlx::query(
            r"
            INSERT INTO storefront.user_password (user_id, password_hash)
            VALUES ($1, $2)
            ",
        )
        .bind(user.id)
        .bind(password_hash)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(user)
    }
}
