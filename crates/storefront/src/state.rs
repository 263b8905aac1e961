//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::db::{PgStore, Store};
use crate::middleware::RouteGuard;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the user and cart store and configuration.
pub struct AppState<S = PgStore> {
    inner: Arc<AppStateInner<S>>,
}

struct AppStateInner<S> {
    config: StorefrontConfig,
    pool: PgPool,
    store: S,
    guard: Arc<RouteGuard>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl AppState {
    /// Create the server state, with users and carts stored in `pool`.
    ///
    /// # Errors
    ///
    /// Returns an error if a protected-path pattern is not a valid regex.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, regex::Error> {
        let store = PgStore::new(pool.clone());
        Self::with_store(config, pool, store)
    }
}

impl<S: Store> AppState<S> {
    /// Create a state over an arbitrary user and cart store.
    ///
    /// `pool` still backs the readiness check.
    ///
    /// # Errors
    ///
    /// Returns an error if a protected-path pattern is not a valid regex.
    pub fn with_store(
        config: StorefrontConfig,
        pool: PgPool,
        store: S,
    ) -> Result<Self, regex::Error> {
        let guard = Arc::new(RouteGuard::from_config(&config)?);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                store,
                guard,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the user and cart store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.inner.store
    }

    /// Get a handle to the route guard.
    #[must_use]
    pub fn guard(&self) -> Arc<RouteGuard> {
        Arc::clone(&self.inner.guard)
    }
}
