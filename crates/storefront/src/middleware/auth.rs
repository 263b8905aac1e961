//! Authentication extractors and session helpers.
//!
//! The identity token is kept in the server-side session. These helpers are
//! the only code that reads or writes it.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use tower_sessions::Session;

use crate::models::{IdentityToken, session_keys};

/// Extractor that requires a signed-in user.
///
/// Page protection is the route guard's job; this rejects with 401 for
/// handlers that need the token itself.
pub struct RequireAuth(pub IdentityToken);

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or_else(|| StatusCode::UNAUTHORIZED.into_response())?;

        current_token(session)
            .await
            .map(Self)
            .ok_or_else(|| StatusCode::UNAUTHORIZED.into_response())
    }
}

/// Extractor that optionally gets the signed-in user's token.
pub struct OptionalAuth(pub Option<IdentityToken>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = match parts.extensions.get::<Session>() {
            Some(session) => current_token(session).await,
            None => None,
        };

        Ok(Self(token))
    }
}

/// The identity token of the signed-in user, if any.
///
/// Blank tokens and unreadable sessions count as signed out.
pub async fn current_token(session: &Session) -> Option<IdentityToken> {
    match session
        .get::<IdentityToken>(session_keys::IDENTITY_TOKEN)
        .await
    {
        Ok(token) => token.filter(IdentityToken::is_authenticated),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read identity token from session");
            None
        }
    }
}

/// Helper to store the identity token in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_identity_token(
    session: &Session,
    token: &IdentityToken,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::IDENTITY_TOKEN, token).await
}

/// Helper to clear the identity token from the session (sign-out).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_identity_token(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<IdentityToken>(session_keys::IDENTITY_TOKEN)
        .await?;
    Ok(())
}
