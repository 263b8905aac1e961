//! In-memory store.
//!
//! Implements [`UserStore`] and [`CartStore`] over hash maps, enforcing the
//! same uniqueness rules as the `PostgreSQL` schema (one cart per user, one
//! cart per anonymous session, unique emails). Every call is recorded, and
//! individual operations can be made to fail, which lets tests drive the
//! reconciler through store outages.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;

use prostore_core::{CartId, Email, Role, SessionCartId, UserId};

use super::{CartStore, RepositoryError, UserStore};
use crate::models::cart::{Cart, NewCart};
use crate::models::user::User;

/// A store operation, as recorded in the call log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    FindUserByEmail,
    FindUserById,
    UpdateUserName,
    CreateUser,
    FindCartBySession,
    FindCartByUser,
    DeleteCart,
    UpsertCart,
    CreateCart,
}

impl StoreOp {
    /// Returns `true` for operations that modify a cart.
    #[must_use]
    pub const fn is_cart_write(self) -> bool {
        matches!(self, Self::DeleteCart | Self::UpsertCart | Self::CreateCart)
    }
}

#[derive(Default)]
struct Inner {
    users: HashMap<UserId, (User, Option<String>)>,
    carts: HashMap<CartId, Cart>,
    ops: Vec<StoreOp>,
    failing: HashSet<StoreOp>,
}

impl Inner {
    fn record(&mut self, op: StoreOp) -> Result<(), RepositoryError> {
        self.ops.push(op);
        if self.failing.contains(&op) {
            return Err(RepositoryError::Unavailable(format!("{op:?} failed")));
        }
        Ok(())
    }

    fn other_cart_owned_by(&self, user_id: UserId, except: Option<CartId>) -> bool {
        self.carts
            .values()
            .any(|c| c.user_id == Some(user_id) && Some(c.id) != except)
    }

    fn cart_for_session_exists(&self, session: &SessionCartId) -> bool {
        self.carts
            .values()
            .any(|c| c.session_cart_id.as_ref() == Some(session))
    }
}

/// Shared in-memory user and cart store.
///
/// Cloning is cheap and clones share state.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a user, with an optional password hash.
    pub async fn insert_user(&self, user: User, password_hash: Option<String>) {
        let mut inner = self.inner.lock().await;
        inner.users.insert(user.id, (user, password_hash));
    }

    /// Insert or replace a cart, bypassing uniqueness checks.
    pub async fn insert_cart(&self, cart: Cart) {
        let mut inner = self.inner.lock().await;
        inner.carts.insert(cart.id, cart);
    }

    /// Get a user by ID without recording a call.
    pub async fn user(&self, id: UserId) -> Option<User> {
        let inner = self.inner.lock().await;
        inner.users.get(&id).map(|(user, _)| user.clone())
    }

    /// Get a cart by ID without recording a call.
    pub async fn cart(&self, id: CartId) -> Option<Cart> {
        let inner = self.inner.lock().await;
        inner.carts.get(&id).cloned()
    }

    /// All carts, in no particular order.
    pub async fn carts(&self) -> Vec<Cart> {
        let inner = self.inner.lock().await;
        inner.carts.values().cloned().collect()
    }

    /// All carts owned by `user_id`.
    pub async fn carts_owned_by(&self, user_id: UserId) -> Vec<Cart> {
        let inner = self.inner.lock().await;
        inner
            .carts
            .values()
            .filter(|c| c.is_owned_by(user_id))
            .cloned()
            .collect()
    }

    /// The operations recorded so far.
    pub async fn ops(&self) -> Vec<StoreOp> {
        self.inner.lock().await.ops.clone()
    }

    /// Make every subsequent call of `op` fail with `RepositoryError::Unavailable`.
    pub async fn fail_on(&self, op: StoreOp) {
        self.inner.lock().await.failing.insert(op);
    }

    /// Stop failing `op`.
    pub async fn recover(&self, op: StoreOp) {
        self.inner.lock().await.failing.remove(&op);
    }
}

impl UserStore for MemoryStore {
    async fn find_credentials_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let mut inner = self.inner.lock().await;
        inner.record(StoreOp::FindUserByEmail)?;

        Ok(inner.users.values().find_map(|(user, hash)| {
            (user.email == *email)
                .then(|| hash.clone().map(|hash| (user.clone(), hash)))
                .flatten()
        }))
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let mut inner = self.inner.lock().await;
        inner.record(StoreOp::FindUserById)?;
        Ok(inner.users.get(&id).map(|(user, _)| user.clone()))
    }

    async fn update_name(&self, id: UserId, name: &str) -> Result<(), RepositoryError> {
        let mut inner = self.inner.lock().await;
        inner.record(StoreOp::UpdateUserName)?;

        let (user, _) = inner.users.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        user.name = Some(name.to_owned());
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn create_with_password(
        &self,
        email: &Email,
        name: Option<&str>,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let mut inner = self.inner.lock().await;
        inner.record(StoreOp::CreateUser)?;

        if inner.users.values().any(|(user, _)| user.email == *email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let now = Utc::now();
        let user = User {
            id: UserId::generate(),
            name: name.map(str::to_owned),
            email: email.clone(),
            role: Role::User,
            created_at: now,
            updated_at: now,
        };
        inner
            .users
            .insert(user.id, (user.clone(), Some(password_hash.to_owned())));
        Ok(user)
    }
}

impl CartStore for MemoryStore {
    async fn find_by_session(
        &self,
        session_cart_id: &SessionCartId,
    ) -> Result<Option<Cart>, RepositoryError> {
        let mut inner = self.inner.lock().await;
        inner.record(StoreOp::FindCartBySession)?;
        Ok(inner
            .carts
            .values()
            .find(|c| c.session_cart_id.as_ref() == Some(session_cart_id))
            .cloned())
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        let mut inner = self.inner.lock().await;
        inner.record(StoreOp::FindCartByUser)?;
        Ok(inner
            .carts
            .values()
            .find(|c| c.is_owned_by(user_id))
            .cloned())
    }

    async fn delete(&self, id: CartId) -> Result<bool, RepositoryError> {
        let mut inner = self.inner.lock().await;
        inner.record(StoreOp::DeleteCart)?;
        Ok(inner.carts.remove(&id).is_some())
    }

    async fn upsert_owner(&self, cart: &Cart, user_id: UserId) -> Result<Cart, RepositoryError> {
        let mut inner = self.inner.lock().await;
        inner.record(StoreOp::UpsertCart)?;

        if inner.other_cart_owned_by(user_id, Some(cart.id)) {
            return Err(RepositoryError::Conflict(
                "user already owns a cart".to_owned(),
            ));
        }

        let now = Utc::now();
        let stored = inner.carts.entry(cart.id).or_insert_with(|| Cart {
            created_at: now,
            ..cart.clone()
        });
        stored.user_id = Some(user_id);
        stored.updated_at = now;
        Ok(stored.clone())
    }

    async fn create(&self, cart: NewCart) -> Result<Cart, RepositoryError> {
        let mut inner = self.inner.lock().await;
        inner.record(StoreOp::CreateCart)?;

        if let Some(user_id) = cart.user_id()
            && inner.other_cart_owned_by(user_id, None)
        {
            return Err(RepositoryError::Conflict(
                "cart already exists for this owner".to_owned(),
            ));
        }
        if let Some(session) = cart.session_cart_id()
            && inner.cart_for_session_exists(session)
        {
            return Err(RepositoryError::Conflict(
                "cart already exists for this owner".to_owned(),
            ));
        }

        let cart = cart.into_cart(Utc::now());
        inner.carts.insert(cart.id, cart.clone());
        Ok(cart)
    }
}
