//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (database)
//!
//! # Auth
//! POST /sign-in                - Sign in (form: email, password, callbackUrl)
//! POST /sign-up                - Create account and sign in
//! POST /sign-out               - Sign out
//! GET  /api/auth/session       - Current session (JSON, null when signed out)
//! POST /api/auth/session       - Update session (JSON: { "name": ... })
//!
//! # Profile (requires auth)
//! POST /user/profile           - Persist a new display name
//!
//! # Cart
//! GET  /api/cart               - The caller's cart (JSON)
//! ```

pub mod auth;
pub mod cart;
pub mod health;
pub mod profile;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use tower_sessions::{SessionManagerLayer, SessionStore};

use crate::db::Store;
use crate::middleware::route_guard_middleware;
use crate::state::AppState;

/// Create all guarded routes for the storefront.
pub fn routes<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route("/sign-in", post(auth::sign_in::<S>))
        .route("/sign-up", post(auth::sign_up::<S>))
        .route("/sign-out", post(auth::sign_out))
        .route(
            "/api/auth/session",
            get(auth::session).post(auth::update_session::<S>),
        )
        .route("/user/profile", post(profile::update::<S>))
        .route("/api/cart", get(cart::show::<S>))
}

/// Assemble the application: routes behind the route guard and sessions,
/// health checks outside them.
pub fn app<S, SS>(state: AppState<S>, session_layer: SessionManagerLayer<SS>) -> Router
where
    S: Store,
    SS: SessionStore + Clone,
{
    Router::new()
        .merge(routes())
        .layer(axum_middleware::from_fn_with_state(
            state.guard(),
            route_guard_middleware,
        ))
        .layer(session_layer)
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness::<S>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
