//! User domain types.

use chrono::{DateTime, Utc};

use prostore_core::{Email, Role, UserId};

/// A storefront identity (domain type).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Display name. `None` until the user sets one or the first sign-in
    /// derives one from the email address.
    pub name: Option<String>,
    /// User's email address.
    pub email: Email,
    /// Authorization role.
    pub role: Role,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// The display name to present for this user.
    ///
    /// Falls back to the local part of the email address when no name is set.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| self.email.local_part())
    }

    /// Returns `true` if the user never set a display name.
    #[must_use]
    pub fn needs_name(&self) -> bool {
        self.name.as_deref().is_none_or(|name| name.trim().is_empty())
    }
}
