//! Authentication route handlers.
//!
//! Sign-in, sign-up and sign-out with email and password, plus the session
//! endpoint used by client code.

use axum::{
    Form, Json,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use secrecy::SecretString;
use serde::Deserialize;
use tower_sessions::Session;

use prostore_core::SessionCartId;

use crate::db::Store;
use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{
    CartCookie, OptionalAuth, RequireAuth, clear_identity_token, set_identity_token,
};
use crate::models::{IdentityToken, SessionView};
use crate::services::{
    AuthContext, AuthError, AuthService, Credentials, IdentityTokenBuilder, Registration,
    TokenTrigger, build_session,
};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Sign-in form data.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInForm {
    pub email: String,
    pub password: String,
    pub callback_url: Option<String>,
}

/// Sign-up form data.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpForm {
    pub name: Option<String>,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub callback_url: Option<String>,
}

/// Session update payload.
#[derive(Debug, Deserialize)]
pub struct SessionUpdate {
    pub name: Option<String>,
}

// =============================================================================
// Sign In / Sign Up / Sign Out
// =============================================================================

/// Handle sign-in form submission.
///
/// Merges the visitor's anonymous cart into their account before the session
/// is written.
pub async fn sign_in<S: Store>(
    State(state): State<AppState<S>>,
    session: Session,
    CartCookie(session_cart_id): CartCookie,
    Form(form): Form<SignInForm>,
) -> Result<Response> {
    let credentials = Credentials {
        email: form.email,
        password: SecretString::from(form.password),
    };

    let Some(user) = AuthService::new(state.store()).authorize(Some(&credentials)).await? else {
        tracing::info!("Sign-in rejected");
        return Ok(Redirect::to(&form_error(
            &state.config().sign_in_path,
            "credentials",
            form.callback_url.as_deref(),
        ))
        .into_response());
    };

    start_session(&state, &session, TokenTrigger::SignIn(user), session_cart_id).await?;

    Ok(Redirect::to(safe_callback(form.callback_url.as_deref())).into_response())
}

/// Handle sign-up form submission.
///
/// Creates the account and signs the new user in.
pub async fn sign_up<S: Store>(
    State(state): State<AppState<S>>,
    session: Session,
    CartCookie(session_cart_id): CartCookie,
    Form(form): Form<SignUpForm>,
) -> Result<Response> {
    let registration = Registration {
        name: form.name,
        email: form.email,
        password: SecretString::from(form.password),
        confirm_password: SecretString::from(form.confirm_password),
    };

    let user = match AuthService::new(state.store())
        .register_with_password(&registration)
        .await
    {
        Ok(user) => user,
        Err(e) => {
            let Some(code) = sign_up_error_code(&e) else {
                return Err(e.into());
            };
            tracing::info!(error = %e, "Sign-up rejected");
            return Ok(
                Redirect::to(&form_error("/sign-up", code, form.callback_url.as_deref()))
                    .into_response(),
            );
        }
    };

    start_session(&state, &session, TokenTrigger::SignUp(user), session_cart_id).await?;

    Ok(Redirect::to(safe_callback(form.callback_url.as_deref())).into_response())
}

/// Handle sign-out.
pub async fn sign_out(session: Session) -> Result<Response> {
    clear_identity_token(&session).await?;
    session.cycle_id().await?;
    clear_sentry_user();

    Ok(Redirect::to("/").into_response())
}

// =============================================================================
// Session API
// =============================================================================

/// Current session, or `null` when signed out.
pub async fn session(OptionalAuth(token): OptionalAuth) -> Json<Option<SessionView>> {
    Json(token.map(|token| build_session(&token, &TokenTrigger::Refresh)))
}

/// Apply a client-initiated session update.
pub async fn update_session<S: Store>(
    State(state): State<AppState<S>>,
    session: Session,
    RequireAuth(token): RequireAuth,
    Json(update): Json<SessionUpdate>,
) -> Result<Json<SessionView>> {
    let view = apply_update(&state, &session, token, update.name).await?;
    Ok(Json(view))
}

// =============================================================================
// Helpers
// =============================================================================

/// Build a fresh token for `trigger` and store it in a new session.
async fn start_session<S: Store>(
    state: &AppState<S>,
    session: &Session,
    trigger: TokenTrigger,
    session_cart_id: Option<SessionCartId>,
) -> Result<()> {
    let ctx = AuthContext { session_cart_id };

    let token = IdentityTokenBuilder::new(state.store(), state.store())
        .build(IdentityToken::default(), &trigger, &ctx)
        .await?;

    // New identity, new session id.
    session.cycle_id().await?;
    set_identity_token(session, &token).await?;

    if let Some(user) = trigger.identity() {
        set_sentry_user(&user.id, Some(user.email.as_str()));
        tracing::info!(user_id = %user.id, "Signed in");
    }

    Ok(())
}

/// Run an update trigger against the stored token and save the result.
pub(crate) async fn apply_update<S: Store>(
    state: &AppState<S>,
    session: &Session,
    token: IdentityToken,
    name: Option<String>,
) -> Result<SessionView> {
    let trigger = TokenTrigger::Update { name };

    let token = IdentityTokenBuilder::new(state.store(), state.store())
        .build(token, &trigger, &AuthContext::default())
        .await?;
    set_identity_token(session, &token).await?;

    Ok(build_session(&token, &trigger))
}

/// Error code shown on the sign-up form, for errors the visitor can fix.
const fn sign_up_error_code(err: &AuthError) -> Option<&'static str> {
    match err {
        AuthError::InvalidEmail(_) => Some("invalid_email"),
        AuthError::PasswordMismatch => Some("password_mismatch"),
        AuthError::WeakPassword(_) => Some("password_too_short"),
        AuthError::UserAlreadyExists => Some("email_taken"),
        AuthError::InvalidCredentials | AuthError::Repository(_) | AuthError::PasswordHash => None,
    }
}

/// Redirect target for a failed form, keeping the callback URL.
fn form_error(path: &str, code: &str, callback_url: Option<&str>) -> String {
    match callback_url {
        Some(callback) => format!(
            "{path}?error={code}&callbackUrl={}",
            urlencoding::encode(callback)
        ),
        None => format!("{path}?error={code}"),
    }
}

/// Only same-site paths are followed after sign-in.
fn safe_callback(callback_url: Option<&str>) -> &str {
    callback_url
        .filter(|url| url.starts_with('/') && !url.starts_with("//") && !url.contains('\\'))
        .unwrap_or("/")
}
