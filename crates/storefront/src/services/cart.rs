//! Cart reconciliation.
//!
//! At sign-in the visitor may hold two carts: the one built anonymously under
//! the `sessionCartId` cookie, and one left over from an earlier signed-in
//! visit. [`CartReconciler`] collapses them into exactly one cart owned by the
//! user:
//!
//! | anonymous cart | user cart | result                                        |
//! |----------------|-----------|-----------------------------------------------|
//! | yes            | yes       | user cart deleted, anonymous cart reassigned  |
//! | yes            | no        | anonymous cart reassigned                     |
//! | no             | yes       | user cart kept as-is                          |
//! | no             | no        | empty cart created for the user               |
//!
//! The anonymous cart always wins: it reflects what the visitor was doing a
//! moment ago.

use thiserror::Error;
use tracing::{info, instrument, warn};

use prostore_core::{CartId, SessionCartId, UserId};

use crate::db::{CartStore, RepositoryError};
use crate::models::cart::NewCart;

/// Errors that abort a reconciliation.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// A cart lookup or write failed.
    #[error("cart store error: {0}")]
    Store(#[from] RepositoryError),
}

/// Outcome of a reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// The anonymous cart now belongs to the user. `replaced` is the user's
    /// previous cart, which was deleted.
    Adopted {
        cart_id: CartId,
        replaced: Option<CartId>,
    },
    /// There was no anonymous cart; the user's cart was left untouched.
    Kept { cart_id: CartId },
    /// Neither cart existed; a fresh empty cart was created.
    Created { cart_id: CartId },
}

impl Reconciliation {
    /// The cart owned by the user after reconciliation.
    #[must_use]
    pub const fn cart_id(&self) -> CartId {
        match *self {
            Self::Adopted { cart_id, .. } | Self::Kept { cart_id } | Self::Created { cart_id } => {
                cart_id
            }
        }
    }
}

/// Merges an anonymous session cart into a user's cart.
pub struct CartReconciler<'a, C> {
    carts: &'a C,
}

impl<'a, C: CartStore> CartReconciler<'a, C> {
    /// Create a reconciler over a cart store.
    #[must_use]
    pub const fn new(carts: &'a C) -> Self {
        Self { carts }
    }

    /// Reconcile the cart of `session_cart_id` with the cart of `user_id`.
    ///
    /// Both lookups are issued concurrently. The (anonymous only) and
    /// (neither) branches are idempotent; rerunning the (both) branch after a
    /// partial failure finds the anonymous cart alone and reassigns it.
    ///
    /// # Errors
    ///
    /// Returns `ReconcileError::Store` if any lookup or write fails. Nothing
    /// is retried.
    #[instrument(
        skip_all,
        fields(user_id = %user_id, session_cart_id = %session_cart_id)
    )]
    pub async fn reconcile(
        &self,
        session_cart_id: &SessionCartId,
        user_id: UserId,
    ) -> Result<Reconciliation, ReconcileError> {
        let (session_cart, user_cart) = tokio::try_join!(
            self.carts.find_by_session(session_cart_id),
            self.carts.find_by_user(user_id),
        )?;

        let outcome = match (session_cart, user_cart) {
            (Some(session_cart), user_cart) => {
                if let Some(previous_owner) = session_cart.user_id
                    && previous_owner != user_id
                {
                    warn!(
                        cart_id = %session_cart.id,
                        %previous_owner,
                        "Anonymous cart was owned by another user, reassigning"
                    );
                }

                // Same record when this session was already reconciled.
                let replaced = match user_cart {
                    Some(user_cart) if user_cart.id != session_cart.id => {
                        self.carts.delete(user_cart.id).await?;
                        Some(user_cart.id)
                    }
                    _ => None,
                };

                let cart = self.carts.upsert_owner(&session_cart, user_id).await?;
                info!(
                    cart_id = %cart.id,
                    replaced = ?replaced,
                    items = cart.items.len(),
                    "Adopted anonymous cart"
                );
                Reconciliation::Adopted {
                    cart_id: cart.id,
                    replaced,
                }
            }
            (None, Some(user_cart)) => {
                info!(cart_id = %user_cart.id, "No anonymous cart, keeping user cart");
                Reconciliation::Kept {
                    cart_id: user_cart.id,
                }
            }
            (None, None) => {
                let cart = self
                    .carts
                    .create(NewCart::for_user(user_id, Some(session_cart_id.clone())))
                    .await?;
                info!(cart_id = %cart.id, "Created cart for user");
                Reconciliation::Created { cart_id: cart.id }
            }
        };

        Ok(outcome)
    }
}
