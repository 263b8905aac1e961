//! Cart domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use prostore_core::{CartId, Price, SessionCartId, UserId};

/// A line item in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// Product the line refers to.
    pub product_id: Uuid,
    /// Product name at the time it was added.
    pub name: String,
    /// Product slug (URL handle).
    pub slug: String,
    /// Quantity.
    pub qty: u32,
    /// Product image URL.
    pub image: String,
    /// Unit price.
    pub price: Price,
}

/// The four derived monetary totals of a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    /// Sum of line item prices.
    pub items_price: Price,
    /// Tax.
    pub tax_price: Price,
    /// Shipping.
    pub shipping_price: Price,
    /// Grand total.
    pub total_price: Price,
}

impl CartTotals {
    /// All totals zero.
    pub const ZERO: Self = Self {
        items_price: Price::ZERO,
        tax_price: Price::ZERO,
        shipping_price: Price::ZERO,
        total_price: Price::ZERO,
    };
}

/// A persisted cart.
///
/// Owned by an anonymous session until the cart reconciler hands it to a
/// user at sign-in. At least one of `user_id` and `session_cart_id` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    /// Durable cart ID.
    pub id: CartId,
    /// Owning user, once reconciled.
    pub user_id: Option<UserId>,
    /// Anonymous session the cart was created under.
    pub session_cart_id: Option<SessionCartId>,
    /// Ordered line items.
    pub items: Vec<CartItem>,
    /// Derived totals.
    #[serde(flatten)]
    pub totals: CartTotals,
    /// When the cart was created.
    pub created_at: DateTime<Utc>,
    /// When the cart was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// Returns `true` if the cart belongs to `user_id`.
    #[must_use]
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == Some(user_id)
    }

    /// Returns `true` if the cart has no line items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A cart that has not been persisted yet.
///
/// Only constructible through [`NewCart::anonymous`] and
/// [`NewCart::for_user`], so an ownerless cart cannot be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCart {
    user_id: Option<UserId>,
    session_cart_id: Option<SessionCartId>,
    /// Initial line items.
    pub items: Vec<CartItem>,
    /// Initial totals.
    pub totals: CartTotals,
}

impl NewCart {
    /// An empty cart owned by an anonymous session.
    #[must_use]
    pub const fn anonymous(session_cart_id: SessionCartId) -> Self {
        Self {
            user_id: None,
            session_cart_id: Some(session_cart_id),
            items: Vec::new(),
            totals: CartTotals::ZERO,
        }
    }

    /// An empty cart owned by a user, optionally linked to the anonymous
    /// session it was created from.
    #[must_use]
    pub const fn for_user(user_id: UserId, session_cart_id: Option<SessionCartId>) -> Self {
        Self {
            user_id: Some(user_id),
            session_cart_id,
            items: Vec::new(),
            totals: CartTotals::ZERO,
        }
    }

    /// Owning user.
    #[must_use]
    pub const fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    /// Linked anonymous session.
    #[must_use]
    pub const fn session_cart_id(&self) -> Option<&SessionCartId> {
        self.session_cart_id.as_ref()
    }

    /// Materialize the cart with a freshly generated id.
    #[must_use]
    pub fn into_cart(self, now: DateTime<Utc>) -> Cart {
        Cart {
            id: CartId::generate(),
            user_id: self.user_id,
            session_cart_id: self.session_cart_id,
            items: self.items,
            totals: self.totals,
            created_at: now,
            updated_at: now,
        }
    }
}
