//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request tracing)
//! 3. Session layer (tower-sessions with `PostgreSQL` store)
//! 4. Route guard (protected paths, `sessionCartId` cookie)

pub mod auth;
pub mod cart_cookie;
pub mod route_guard;
pub mod session;

pub use auth::{
    OptionalAuth, RequireAuth, clear_identity_token, current_token, set_identity_token,
};
pub use cart_cookie::{CART_COOKIE_NAME, CartCookie, build_cart_cookie, read_cart_cookie};
pub use route_guard::{GuardDecision, RouteGuard, route_guard_middleware};
pub use session::{SESSION_COOKIE_NAME, configure_session_layer, create_session_layer};
