//! Integration tests for Prostore.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p prostore-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `storefront_http` - Route guard and session endpoints, driven with `oneshot`
//! - `sign_in_flow` - Sign-in, sign-up, profile and cart endpoints end to end
//! - `cart_reconciliation` - Sign-in scenarios against the token builder
//!
//! None needs a running database: the router runs over the in-memory user
//! and cart store, the in-memory session store, and a lazy pool that only
//! the readiness check would touch.

use std::collections::HashMap;

use axum::{
    Router,
    body::Body,
    http::{Response, header::SET_COOKIE},
};
use chrono::Utc;
use http_body_util::BodyExt;
use secrecy::SecretString;
use sqlx::postgres::PgPoolOptions;
use tower_sessions::cookie::time::{Duration, OffsetDateTime};
use tower_sessions::session::{Id, Record};
use tower_sessions::{MemoryStore, SessionStore};
use url::Url;

use prostore_core::{Email, Role, UserId};
use prostore_storefront::config::StorefrontConfig;
use prostore_storefront::db::MemoryStore as StorefrontStore;
use prostore_storefront::middleware::{SESSION_COOKIE_NAME, configure_session_layer};
use prostore_storefront::models::{IdentityToken, User, session_keys};
use prostore_storefront::routes;
use prostore_storefront::services::auth::hash_password;
use prostore_storefront::state::AppState;

/// Configuration for tests; the database URL is never connected to.
///
/// # Panics
///
/// Never in practice; the base URL is a constant.
#[must_use]
pub fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from("postgres://localhost/prostore_test"),
        host: [127, 0, 0, 1].into(),
        port: 0,
        base_url: Url::parse("http://localhost:3000")
            .unwrap_or_else(|e| panic!("invalid test URL: {e}")),
        session_max_age_days: 30,
        sign_in_path: "/sign-in".to_owned(),
        sentry_dsn: None,
        sentry_environment: None,
    }
}

/// The storefront router over fresh in-memory session and data stores.
///
/// # Panics
///
/// Panics if the state can't be built.
#[must_use]
pub fn test_app() -> Router {
    test_app_with(MemoryStore::default(), StorefrontStore::new())
}

/// The storefront router over the given session store and user/cart store.
///
/// Both stores are shared with the caller, so tests can seed them before a
/// request and inspect them afterwards.
///
/// # Panics
///
/// Panics if the state can't be built.
#[must_use]
pub fn test_app_with(sessions: MemoryStore, store: StorefrontStore) -> Router {
    let config = test_config();
    let pool = PgPoolOptions::new()
        .connect_lazy("postgres://localhost/prostore_test")
        .unwrap_or_else(|e| panic!("lazy pool: {e}"));
    let session_layer = configure_session_layer(sessions, &config);
    let state = AppState::with_store(config, pool, store)
        .unwrap_or_else(|e| panic!("app state: {e}"));

    routes::app(state, session_layer)
}

/// Seed a user who can sign in with `password`.
///
/// # Panics
///
/// Panics if the email is invalid or the password can't be hashed.
pub async fn seed_user(
    store: &StorefrontStore,
    email: &str,
    name: Option<&str>,
    password: &str,
) -> User {
    let now = Utc::now();
    let user = User {
        id: UserId::generate(),
        name: name.map(str::to_owned),
        email: Email::parse(email).unwrap_or_else(|e| panic!("email: {e}")),
        role: Role::User,
        created_at: now,
        updated_at: now,
    };
    let hash = hash_password(password).unwrap_or_else(|e| panic!("hash: {e}"));
    store.insert_user(user.clone(), Some(hash)).await;
    user
}

/// The value of the `name` cookie set by `response`, if any.
#[must_use]
pub fn set_cookie_value(response: &Response<Body>, name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|v| {
            v.strip_prefix(&prefix)
                .map(|rest| rest.split(';').next().unwrap_or_default().to_owned())
        })
}

/// Collect a response body into a string.
///
/// # Panics
///
/// Panics if the body can't be read or is not UTF-8.
pub async fn body_string(response: Response<Body>) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .unwrap_or_else(|e| panic!("body: {e}"))
        .to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap_or_else(|e| panic!("utf-8: {e}"))
}

/// Store a session holding `token` and return the `Cookie` header value for it.
///
/// # Panics
///
/// Panics if the session can't be stored.
pub async fn signed_in_cookie(sessions: &MemoryStore, token: &IdentityToken) -> String {
    let mut record = Record {
        id: Id::default(),
        data: HashMap::from([(
            session_keys::IDENTITY_TOKEN.to_owned(),
            serde_json::to_value(token).unwrap_or_else(|e| panic!("token: {e}")),
        )]),
        expiry_date: OffsetDateTime::now_utc() + Duration::days(1),
    };
    sessions
        .create(&mut record)
        .await
        .unwrap_or_else(|e| panic!("session store: {e}"));

    format!("{SESSION_COOKIE_NAME}={}", record.id)
}
