//! Cart route handlers.

use axum::{Json, extract::State};

use crate::db::{CartStore, Store};
use crate::error::Result;
use crate::middleware::{CartCookie, OptionalAuth};
use crate::models::Cart;
use crate::state::AppState;

/// The caller's cart, or `null`.
///
/// Signed-in users get their own cart; everyone else gets the cart of their
/// `sessionCartId` cookie.
pub async fn show<S: Store>(
    State(state): State<AppState<S>>,
    OptionalAuth(token): OptionalAuth,
    CartCookie(session_cart_id): CartCookie,
) -> Result<Json<Option<Cart>>> {
    let carts = state.store();

    let cart = match (token.and_then(|t| t.sub), session_cart_id) {
        (Some(user_id), _) => carts.find_by_user(user_id).await?,
        (None, Some(session_cart_id)) => carts.find_by_session(&session_cart_id).await?,
        (None, None) => None,
    };

    Ok(Json(cart))
}
