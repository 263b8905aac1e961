//! Profile route handlers.

use axum::{Json, extract::State};
use serde::Deserialize;
use tower_sessions::Session;

use crate::db::{Store, UserStore};
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::SessionView;
use crate::state::AppState;

use super::auth::apply_update;

/// Shortest accepted display name.
const MIN_NAME_LENGTH: usize = 3;

/// Profile update payload.
#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    pub name: String,
}

/// Persist a new display name and refresh the session with it.
pub async fn update<S: Store>(
    State(state): State<AppState<S>>,
    session: Session,
    RequireAuth(token): RequireAuth,
    Json(form): Json<ProfileForm>,
) -> Result<Json<SessionView>> {
    let user_id = token
        .sub
        .ok_or_else(|| AppError::Unauthorized("not signed in".to_string()))?;

    let name = validate_name(&form.name)?;

    // The session can outlive the account.
    let user = state
        .store()
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("user".to_string()))?;

    if user.name.as_deref() != Some(name) {
        state.store().update_name(user.id, name).await?;
        tracing::info!(%user_id, "Updated display name");
    }

    let view = apply_update(&state, &session, token, Some(name.to_owned())).await?;
    Ok(Json(view))
}

fn validate_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.chars().count() < MIN_NAME_LENGTH {
        return Err(AppError::BadRequest(format!(
            "name must be at least {MIN_NAME_LENGTH} characters"
        )));
    }
    Ok(name)
}
