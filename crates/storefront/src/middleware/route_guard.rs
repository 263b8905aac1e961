//! Coarse route-level authorization.
//!
//! Every request passes through [`route_guard_middleware`]. Signed-out
//! visitors are kept out of protected paths, and every visitor leaves with a
//! `sessionCartId` cookie so an anonymous cart can be tied to them.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderValue, StatusCode, Uri, header::SET_COOKIE},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use regex::RegexSet;
use tower_sessions::Session;
use tracing::{debug, warn};

use prostore_core::SessionCartId;

use super::auth::current_token;
use super::cart_cookie::{build_cart_cookie, read_cart_cookie};
use crate::config::StorefrontConfig;

/// Paths that require a signed-in user.
pub const PROTECTED_PATHS: &[&str] = &[
    r"^/shipping-address(/|$)",
    r"^/payment-method(/|$)",
    r"^/place-order(/|$)",
    r"^/profile(/|$)",
    r"^/user/",
    r"^/order/",
    r"^/admin(/|$)",
];

/// Outcome of evaluating a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardDecision {
    /// Whether the request may proceed.
    pub allowed: bool,
    /// A fresh cart id to set on the response, when the request had none.
    pub minted: Option<SessionCartId>,
}

/// Protected-path matcher and cookie policy.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    protected: RegexSet,
    sign_in_path: String,
    secure_cookies: bool,
}

impl RouteGuard {
    /// Build a guard over a set of path patterns.
    ///
    /// # Errors
    ///
    /// Returns an error if a pattern is not a valid regex.
    pub fn new<I, P>(
        patterns: I,
        sign_in_path: impl Into<String>,
        secure_cookies: bool,
    ) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        Ok(Self {
            protected: RegexSet::new(patterns)?,
            sign_in_path: sign_in_path.into(),
            secure_cookies,
        })
    }

    /// Build the storefront guard over [`PROTECTED_PATHS`].
    ///
    /// # Errors
    ///
    /// Returns an error if a pattern is not a valid regex.
    pub fn from_config(config: &StorefrontConfig) -> Result<Self, regex::Error> {
        Self::new(
            PROTECTED_PATHS,
            config.sign_in_path.clone(),
            config.secure_cookies(),
        )
    }

    /// Returns `true` if `path` requires a signed-in user.
    #[must_use]
    pub fn is_protected(&self, path: &str) -> bool {
        self.protected.is_match(path)
    }

    /// Decide whether a request may proceed.
    ///
    /// A cart id is minted whenever `cart_cookie` is absent, whatever the
    /// authorization outcome.
    #[must_use]
    pub fn evaluate(
        &self,
        path: &str,
        authenticated: bool,
        cart_cookie: Option<&SessionCartId>,
    ) -> GuardDecision {
        GuardDecision {
            allowed: authenticated || !self.is_protected(path),
            minted: cart_cookie.is_none().then(SessionCartId::generate),
        }
    }

    /// Response for a denied request.
    ///
    /// API requests get a bare 401; pages redirect to sign-in and come back
    /// afterwards through `callbackUrl`.
    fn deny(&self, uri: &Uri) -> Response {
        if uri.path().starts_with("/api/") {
            return StatusCode::UNAUTHORIZED.into_response();
        }

        let callback = uri.path_and_query().map_or("/", |pq| pq.as_str());
        Redirect::to(&format!(
            "{}?callbackUrl={}",
            self.sign_in_path,
            urlencoding::encode(callback)
        ))
        .into_response()
    }

    /// Attach the cart cookie to a response. Failures are logged and ignored.
    fn set_cart_cookie(&self, response: &mut Response, session_cart_id: &SessionCartId) {
        let cookie = build_cart_cookie(session_cart_id, self.secure_cookies);
        match HeaderValue::from_str(&cookie.to_string()) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
            }
            Err(e) => warn!(error = %e, "Failed to set cart cookie"),
        }
    }
}

/// Middleware applying a [`RouteGuard`] to every request.
///
/// Must run inside the session layer. The effective cart id (from the
/// cookie, or minted) is inserted into the request extensions for
/// [`CartCookie`](super::CartCookie).
pub async fn route_guard_middleware(
    State(guard): State<Arc<RouteGuard>>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Response {
    let authenticated = current_token(&session).await.is_some();
    let existing = read_cart_cookie(request.headers());
    let decision = guard.evaluate(request.uri().path(), authenticated, existing.as_ref());

    if let Some(id) = decision.minted.clone().or(existing) {
        request.extensions_mut().insert(id);
    }

    let mut response = if decision.allowed {
        next.run(request).await
    } else {
        debug!(path = %request.uri().path(), "Denied signed-out request");
        guard.deny(request.uri())
    };

    if let Some(minted) = &decision.minted {
        guard.set_cart_cookie(&mut response, minted);
    }

    response
}
