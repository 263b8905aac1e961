//! Identity token and session construction.
//!
//! [`IdentityTokenBuilder::build`] runs on every authentication event and
//! whenever an existing token is refreshed or updated. On sign-in and sign-up
//! it fills the token from the identity record, derives a display name when
//! the user never set one, and merges the visitor's anonymous cart.

use thiserror::Error;
use tracing::{Span, field, info, instrument};

use prostore_core::SessionCartId;

use super::cart::{CartReconciler, ReconcileError};
use crate::db::{CartStore, RepositoryError, UserStore};
use crate::models::session::{IdentityToken, SessionUser, SessionView};
use crate::models::user::User;

/// What caused the token to be (re)built.
#[derive(Debug, Clone)]
pub enum TokenTrigger {
    /// Initial sign-in with a verified identity.
    SignIn(User),
    /// Account creation.
    SignUp(User),
    /// Client-initiated session update, optionally carrying a new name.
    Update { name: Option<String> },
    /// Token refresh with no new information.
    Refresh,
}

impl TokenTrigger {
    /// The identity record carried by sign-in and sign-up triggers.
    #[must_use]
    pub const fn identity(&self) -> Option<&User> {
        match self {
            Self::SignIn(user) | Self::SignUp(user) => Some(user),
            Self::Update { .. } | Self::Refresh => None,
        }
    }

    /// The non-empty name supplied by an update trigger, taken as given.
    fn name_override(&self) -> Option<&str> {
        match self {
            Self::Update { name: Some(name) } if !name.is_empty() => Some(name),
            _ => None,
        }
    }
}

/// Request context available while building a token.
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
    /// The anonymous cart id from the request cookie, if any.
    pub session_cart_id: Option<SessionCartId>,
}

/// Errors that abort token construction.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Persisting the derived display name failed.
    #[error("failed to persist display name: {0}")]
    Store(#[from] RepositoryError),

    /// Cart reconciliation failed.
    #[error("cart reconciliation failed: {0}")]
    Reconcile(#[from] ReconcileError),
}

/// Builds identity tokens.
pub struct IdentityTokenBuilder<'a, U, C> {
    users: &'a U,
    carts: CartReconciler<'a, C>,
}

impl<'a, U: UserStore, C: CartStore> IdentityTokenBuilder<'a, U, C> {
    /// Create a builder over the user and cart stores.
    #[must_use]
    pub const fn new(users: &'a U, carts: &'a C) -> Self {
        Self {
            users,
            carts: CartReconciler::new(carts),
        }
    }

    /// Build the next token from the current one.
    ///
    /// Name persistence and cart reconciliation complete before this returns.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Store` if the derived name can't be saved, or
    /// `TokenError::Reconcile` if merging carts fails.
    #[instrument(skip_all, fields(user_id = field::Empty, cart_id = field::Empty))]
    pub async fn build(
        &self,
        mut token: IdentityToken,
        trigger: &TokenTrigger,
        ctx: &AuthContext,
    ) -> Result<IdentityToken, TokenError> {
        if let Some(user) = trigger.identity() {
            Span::current().record("user_id", field::display(user.id));
            token.sub = Some(user.id);
            token.role = Some(user.role);
            token.email = Some(user.email.clone());
            token.name = Some(self.resolve_name(user).await?);

            if let Some(session_cart_id) = &ctx.session_cart_id {
                let outcome = self.carts.reconcile(session_cart_id, user.id).await?;
                Span::current().record("cart_id", field::display(outcome.cart_id()));
            }
        }

        if let Some(name) = trigger.name_override() {
            token.name = Some(name.to_owned());
        }

        Ok(token)
    }

    /// The user's display name, persisting it first if it was derived.
    async fn resolve_name(&self, user: &User) -> Result<String, RepositoryError> {
        let name = user.display_name();
        if user.needs_name() {
            self.users.update_name(user.id, name).await?;
            info!(user_id = %user.id, "Derived display name from email");
        }
        Ok(name.to_owned())
    }
}

/// Shape a token into the session view handed to handlers and clients.
#[must_use]
pub fn build_session(token: &IdentityToken, trigger: &TokenTrigger) -> SessionView {
    let name = trigger
        .name_override()
        .map(str::to_owned)
        .or_else(|| token.name.clone());

    SessionView {
        user: SessionUser {
            id: token.sub,
            role: token.role,
            name,
            email: token.email.clone(),
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fmt;
    use std::sync::{Arc, Mutex};

    use chrono::Utc;
    use tracing::field::{Field, Visit};
    use tracing::{Subscriber, span};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
    use tracing_subscriber::registry::Registry;

    use prostore_core::{Email, Role, UserId};

    use super::*;
    use crate::db::MemoryStore;
    use crate::db::memory::StoreOp;
    use crate::models::cart::NewCart;

    async fn store_with_user(name: Option<&str>) -> (MemoryStore, User) {
        let store = MemoryStore::new();
        let user = User {
            id: UserId::generate(),
            name: name.map(str::to_owned),
            email: Email::parse("jane@example.com").unwrap(),
            role: Role::Admin,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        store.insert_user(user.clone(), None).await;
        (store, user)
    }

    #[tokio::test]
    async fn test_sign_in_derives_and_persists_name() {
        let (store, user) = store_with_user(None).await;
        let builder = IdentityTokenBuilder::new(&store, &store);

        let token = builder
            .build(
                IdentityToken::default(),
                &TokenTrigger::SignIn(user.clone()),
                &AuthContext::default(),
            )
            .await
            .unwrap();

        assert_eq!(token.sub, Some(user.id));
        assert_eq!(token.role, Some(Role::Admin));
        assert_eq!(token.email, Some(user.email.clone()));
        assert_eq!(token.name.as_deref(), Some("jane"));
        assert_eq!(
            store.user(user.id).await.unwrap().name.as_deref(),
            Some("jane")
        );
    }

    #[tokio::test]
    async fn test_sign_in_keeps_stored_name() {
        let (store, user) = store_with_user(Some("Jane Doe")).await;
        let token = IdentityTokenBuilder::new(&store, &store)
            .build(
                IdentityToken::default(),
                &TokenTrigger::SignIn(user),
                &AuthContext::default(),
            )
            .await
            .unwrap();

        assert_eq!(token.name.as_deref(), Some("Jane Doe"));
        assert!(!store.ops().await.contains(&StoreOp::UpdateUserName));
    }

    #[tokio::test]
    async fn test_sign_in_without_cookie_skips_reconciliation() {
        let (store, user) = store_with_user(Some("Jane")).await;
        IdentityTokenBuilder::new(&store, &store)
            .build(
                IdentityToken::default(),
                &TokenTrigger::SignIn(user),
                &AuthContext::default(),
            )
            .await
            .unwrap();

        assert!(store.carts().await.is_empty());
        assert!(
            !store
                .ops()
                .await
                .iter()
                .any(|op| matches!(op, StoreOp::FindCartBySession | StoreOp::FindCartByUser))
        );
    }

    #[tokio::test]
    async fn test_sign_up_reconciles_session_cart() {
        let (store, user) = store_with_user(Some("Jane")).await;
        let session = SessionCartId::generate();
        let anonymous = store
            .create(NewCart::anonymous(session.clone()))
            .await
            .unwrap()
            .id;

        IdentityTokenBuilder::new(&store, &store)
            .build(
                IdentityToken::default(),
                &TokenTrigger::SignUp(user.clone()),
                &AuthContext {
                    session_cart_id: Some(session),
                },
            )
            .await
            .unwrap();

        let owned = store.carts_owned_by(user.id).await;
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].id, anonymous);
    }

    /// Collects the values recorded into `cart_id` span fields.
    #[derive(Clone, Default)]
    struct CartIdRecorder(Arc<Mutex<Vec<String>>>);

    impl<S: Subscriber> Layer<S> for CartIdRecorder {
        fn on_record(&self, _span: &span::Id, values: &span::Record<'_>, _ctx: Context<'_, S>) {
            values.record(&mut self.clone());
        }
    }

    impl Visit for CartIdRecorder {
        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            if field.name() == "cart_id" {
                self.0.lock().unwrap().push(format!("{value:?}"));
            }
        }
    }

    #[tokio::test]
    async fn test_build_records_reconciled_cart_on_span() {
        let recorder = CartIdRecorder::default();
        let _guard = tracing::subscriber::set_default(Registry::default().with(recorder.clone()));

        let (store, user) = store_with_user(Some("Jane")).await;
        let session = SessionCartId::generate();
        let anonymous = store
            .create(NewCart::anonymous(session.clone()))
            .await
            .unwrap()
            .id;

        IdentityTokenBuilder::new(&store, &store)
            .build(
                IdentityToken::default(),
                &TokenTrigger::SignIn(user),
                &AuthContext {
                    session_cart_id: Some(session),
                },
            )
            .await
            .unwrap();

        assert_eq!(*recorder.0.lock().unwrap(), vec![anonymous.to_string()]);
    }

    #[tokio::test]
    async fn test_reconciliation_failure_aborts_build() {
        let (store, user) = store_with_user(Some("Jane")).await;
        store.fail_on(StoreOp::FindCartBySession).await;

        let result = IdentityTokenBuilder::new(&store, &store)
            .build(
                IdentityToken::default(),
                &TokenTrigger::SignIn(user),
                &AuthContext {
                    session_cart_id: Some(SessionCartId::generate()),
                },
            )
            .await;

        assert!(matches!(result, Err(TokenError::Reconcile(_))));
    }

    #[tokio::test]
    async fn test_name_persist_failure_aborts_build() {
        let (store, user) = store_with_user(None).await;
        store.fail_on(StoreOp::UpdateUserName).await;

        let result = IdentityTokenBuilder::new(&store, &store)
            .build(
                IdentityToken::default(),
                &TokenTrigger::SignIn(user),
                &AuthContext::default(),
            )
            .await;

        assert!(matches!(result, Err(TokenError::Store(_))));
    }

    #[tokio::test]
    async fn test_update_overrides_name() {
        let (store, user) = store_with_user(Some("Jane")).await;
        let token = IdentityToken {
            sub: Some(user.id),
            role: Some(user.role),
            name: Some("Jane".to_owned()),
            email: Some(user.email),
        };

        let updated = IdentityTokenBuilder::new(&store, &store)
            .build(
                token.clone(),
                &TokenTrigger::Update {
                    name: Some("Janet".to_owned()),
                },
                &AuthContext::default(),
            )
            .await
            .unwrap();

        assert_eq!(updated.name.as_deref(), Some("Janet"));
        assert_eq!(updated.sub, token.sub);
        assert!(store.ops().await.is_empty());
    }

    #[tokio::test]
    async fn test_update_with_empty_or_missing_name_is_ignored() {
        let (store, _) = store_with_user(None).await;
        let token = IdentityToken {
            name: Some("Jane".to_owned()),
            ..IdentityToken::default()
        };
        let builder = IdentityTokenBuilder::new(&store, &store);

        for name in [None, Some(String::new())] {
            let updated = builder
                .build(
                    token.clone(),
                    &TokenTrigger::Update { name },
                    &AuthContext::default(),
                )
                .await
                .unwrap();
            assert_eq!(updated, token);
        }
    }

    #[tokio::test]
    async fn test_update_with_whitespace_name_overrides() {
        let (store, _) = store_with_user(None).await;
        let token = IdentityToken {
            name: Some("jane".to_owned()),
            ..IdentityToken::default()
        };

        let updated = IdentityTokenBuilder::new(&store, &store)
            .build(
                token,
                &TokenTrigger::Update {
                    name: Some("  ".to_owned()),
                },
                &AuthContext::default(),
            )
            .await
            .unwrap();

        assert_eq!(updated.name.as_deref(), Some("  "));
    }

    #[tokio::test]
    async fn test_refresh_returns_token_unchanged() {
        let (store, user) = store_with_user(None).await;
        let token = IdentityToken {
            sub: Some(user.id),
            role: Some(user.role),
            name: Some("jane".to_owned()),
            email: Some(user.email),
        };

        let refreshed = IdentityTokenBuilder::new(&store, &store)
            .build(
                token.clone(),
                &TokenTrigger::Refresh,
                &AuthContext {
                    session_cart_id: Some(SessionCartId::generate()),
                },
            )
            .await
            .unwrap();

        assert_eq!(refreshed, token);
        assert!(store.ops().await.is_empty());
    }

    #[test]
    fn test_build_session_copies_token() {
        let token = IdentityToken {
            sub: Some(UserId::generate()),
            role: Some(Role::User),
            name: Some("jane".to_owned()),
            email: Some(Email::parse("jane@example.com").unwrap()),
        };
        let session = build_session(&token, &TokenTrigger::Refresh);

        assert_eq!(session.user.id, token.sub);
        assert_eq!(session.user.role, token.role);
        assert_eq!(session.user.name, token.name);
        assert_eq!(session.user.email, token.email);
    }

    #[test]
    fn test_build_session_applies_update_name() {
        let token = IdentityToken {
            name: Some("jane".to_owned()),
            ..IdentityToken::default()
        };
        let session = build_session(
            &token,
            &TokenTrigger::Update {
                name: Some("Janet".to_owned()),
            },
        );
        assert_eq!(session.user.name.as_deref(), Some("Janet"));
    }

    #[test]
    fn test_build_session_blank_token() {
        let session = build_session(&IdentityToken::default(), &TokenTrigger::Refresh);
        assert!(session.user.id.is_none());
        assert!(session.user.name.is_none());
    }
}
