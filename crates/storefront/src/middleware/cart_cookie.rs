//! The `sessionCartId` cookie.
//!
//! Identifies the anonymous cart of a visitor who hasn't signed in. The
//! route guard mints one for every request that arrives without it.

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::COOKIE, request::Parts},
};
use tower_sessions::cookie::{Cookie, SameSite, time::Duration};

use prostore_core::SessionCartId;

/// Cart cookie name.
pub const CART_COOKIE_NAME: &str = "sessionCartId";

/// Cart cookie lifetime.
const CART_COOKIE_MAX_AGE_DAYS: i64 = 30;

/// Read the anonymous cart id from the request cookies.
///
/// A malformed value is treated as absent.
#[must_use]
pub fn read_cart_cookie(headers: &HeaderMap) -> Option<SessionCartId> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == CART_COOKIE_NAME)
        .and_then(|cookie| SessionCartId::parse(cookie.value()).ok())
}

/// Build the `Set-Cookie` value for an anonymous cart id.
#[must_use]
pub fn build_cart_cookie(session_cart_id: &SessionCartId, secure: bool) -> Cookie<'static> {
    Cookie::build((CART_COOKIE_NAME, session_cart_id.as_str().to_owned()))
        .path("/")
        .max_age(Duration::days(CART_COOKIE_MAX_AGE_DAYS))
        .same_site(SameSite::Lax)
        .http_only(true)
        .secure(secure)
        .build()
}

/// Extractor for the visitor's anonymous cart id.
///
/// Prefers the id placed in the request extensions by the route guard, which
/// covers ids minted on this very request, and falls back to the cookie.
#[derive(Debug, Clone)]
pub struct CartCookie(pub Option<SessionCartId>);

impl<S> FromRequestParts<S> for CartCookie
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .extensions
            .get::<SessionCartId>()
            .cloned()
            .or_else(|| read_cart_cookie(&parts.headers));

        Ok(Self(id))
    }
}
