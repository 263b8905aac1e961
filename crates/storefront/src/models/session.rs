//! Session-related types.
//!
//! The identity token is the short-lived, session-stored view of a
//! long-lived identity record. It is built by
//! [`IdentityTokenBuilder`](crate::services::token::IdentityTokenBuilder) and
//! shaped into a [`SessionView`] for handlers and clients.

use serde::{Deserialize, Serialize};

use prostore_core::{Email, Role, UserId};

/// Identity claims stored in the server-side session.
///
/// A blank token (all fields `None`) represents an anonymous visitor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityToken {
    /// Subject: the user's database ID.
    pub sub: Option<UserId>,
    /// The user's role.
    pub role: Option<Role>,
    /// Display name.
    pub name: Option<String>,
    /// Email address.
    pub email: Option<Email>,
}

impl IdentityToken {
    /// Returns `true` if the token identifies a user.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.sub.is_some()
    }
}

/// Session data exposed to handlers and to `GET /api/auth/session`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionView {
    /// The signed-in user.
    pub user: SessionUser,
}

/// User portion of a [`SessionView`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    /// User ID.
    pub id: Option<UserId>,
    /// Role.
    pub role: Option<Role>,
    /// Display name.
    pub name: Option<String>,
    /// Email address.
    pub email: Option<Email>,
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for the identity token of the signed-in user.
    pub const IDENTITY_TOKEN: &str = "identity_token";
}
