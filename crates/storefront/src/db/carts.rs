//! Cart storage.
//!
//! [`CartStore`] is the seam the cart reconciler works against.
//! [`CartRepository`] implements it on `PostgreSQL`; line items are stored as
//! JSONB next to the four totals.

use std::future::Future;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use prostore_core::{CartId, Price, SessionCartId, UserId};

use super::{RepositoryError, conflict_or_database};
use crate::models::cart::{Cart, CartItem, CartTotals, NewCart};

/// Cart store operations.
pub trait CartStore: Send + Sync {
    /// Find the cart created under an anonymous session.
    fn find_by_session(
        &self,
        session_cart_id: &SessionCartId,
    ) -> impl Future<Output = Result<Option<Cart>, RepositoryError>> + Send;

    /// Find the cart owned by a user.
    fn find_by_user(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Option<Cart>, RepositoryError>> + Send;

    /// Delete a cart.
    ///
    /// Returns `true` if the cart was deleted, `false` if it didn't exist.
    fn delete(&self, id: CartId) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    /// Assign `cart` to `user_id`, keeping its items and totals.
    ///
    /// Upsert keyed by cart id: if the cart vanished since it was read, it is
    /// recreated from `cart` with the new owner.
    fn upsert_owner(
        &self,
        cart: &Cart,
        user_id: UserId,
    ) -> impl Future<Output = Result<Cart, RepositoryError>> + Send;

    /// Persist a new cart.
    fn create(&self, cart: NewCart) -> impl Future<Output = Result<Cart, RepositoryError>> + Send;
}

#[derive(sqlx::FromRow)]
struct CartRow {
    id: CartId,
    user_id: Option<UserId>,
    session_cart_id: Option<SessionCartId>,
    items: Json<Vec<CartItem>>,
    items_price: Price,
    tax_price: Price,
    shipping_price: Price,
    total_price: Price,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CartRow> for Cart {
    fn from(r: CartRow) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            session_cart_id: r.session_cart_id,
            items: r.items.0,
            totals: CartTotals {
                items_price: r.items_price,
                tax_price: r.tax_price,
                shipping_price: r.shipping_price,
                total_price: r.total_price,
            },
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

const CART_COLUMNS: &str = "id, user_id, session_cart_id, items, items_price, tax_price, \
                            shipping_price, total_price, created_at, updated_at";

/// `PostgreSQL` repository for carts.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

impl CartStore for CartRepository<'_> {
    async fn find_by_session(
        &self,
        session_cart_id: &SessionCartId,
    ) -> Result<Option<Cart>, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(&format!(
            "SELECT {CART_COLUMNS} FROM storefront.cart WHERE session_cart_id = $1"
        ))
        .bind(session_cart_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Cart::from))
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(&format!(
            "SELECT {CART_COLUMNS} FROM storefront.cart WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Cart::from))
    }

    async fn delete(&self, id: CartId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM storefront.cart WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn upsert_owner(&self, cart: &Cart, user_id: UserId) -> Result<Cart, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(&format!(
            r"
            INSERT INTO storefront.cart
                (id, user_id, session_cart_id, items,
                 items_price, tax_price, shipping_price, total_price)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE
                SET user_id = EXCLUDED.user_id, updated_at = now()
            RETURNING {CART_COLUMNS}
            "
        ))
        .bind(cart.id)
        .bind(user_id)
        .bind(cart.session_cart_id.as_ref())
        .bind(Json(&cart.items))
        .bind(cart.totals.items_price)
        .bind(cart.totals.tax_price)
        .bind(cart.totals.shipping_price)
        .bind(cart.totals.total_price)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_or_database(e, "user already owns a cart"))?;

        Ok(row.into())
    }

    async fn create(&self, cart: NewCart) -> Result<Cart, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(&format!(
            r"
            INSERT INTO storefront.cart
                (user_id, session_cart_id, items,
                 items_price, tax_price, shipping_price, total_price)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {CART_COLUMNS}
            "
        ))
        .bind(cart.user_id())
        .bind(cart.session_cart_id())
        .bind(Json(&cart.items))
        .bind(cart.totals.items_price)
        .bind(cart.totals.tax_price)
        .bind(cart.totals.shipping_price)
        .bind(cart.totals.total_price)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_or_database(e, "cart already exists for this owner"))?;

        Ok(row.into())
    }
}
