//! `PostgreSQL` store used by the running server.

use prostore_core::{CartId, Email, SessionCartId, UserId};
use sqlx::PgPool;

use super::{CartRepository, CartStore, RepositoryError, UserRepository, UserStore};
use crate::models::cart::{Cart, NewCart};
use crate::models::user::User;

/// User and cart storage over a shared connection pool.
///
/// Cloning is cheap; clones share the pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a store over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn users(&self) -> UserRepository<'_> {
        UserRepository::new(&self.pool)
    }

    fn carts(&self) -> CartRepository<'_> {
        CartRepository::new(&self.pool)
    }
}

impl UserStore for PgStore {
    async fn find_credentials_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        self.users().find_credentials_by_email(email).await
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        self.users().find_by_id(id).await
    }

    async fn update_name(&self, id: UserId, name: &str) -> Result<(), RepositoryError> {
        self.users().update_name(id, name).await
    }

    async fn create_with_password(
        &self,
        email: &Email,
        name: Option<&str>,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        self.users()
            .create_with_password(email, name, password_hash)
            .await
    }
}

impl CartStore for PgStore {
    async fn find_by_session(
        &self,
        session_cart_id: &SessionCartId,
    ) -> Result<Option<Cart>, RepositoryError> {
        self.carts().find_by_session(session_cart_id).await
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        self.carts().find_by_user(user_id).await
    }

    async fn delete(&self, id: CartId) -> Result<bool, RepositoryError> {
        self.carts().delete(id).await
    }

    async fn upsert_owner(&self, cart: &Cart, user_id: UserId) -> Result<Cart, RepositoryError> {
        self.carts().upsert_owner(cart, user_id).await
    }

    async fn create(&self, cart: NewCart) -> Result<Cart, RepositoryError> {
        self.carts().create(cart).await
    }
}
