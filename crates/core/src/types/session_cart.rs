//! Anonymous cart session identifier.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`SessionCartId`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionCartIdError {
    /// The input string is empty or only whitespace.
    #[error("session cart id cannot be empty")]
    Empty,
    /// The input string is too long.
    #[error("session cart id must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains characters that are not allowed in a cookie value.
    #[error("session cart id contains invalid characters")]
    InvalidCharacters,
}

/// Opaque identifier of an anonymous visitor's cart.
///
/// Minted by the route guard on a visitor's first request and carried in the
/// `sessionCartId` cookie. It is never tied to a user; the cart reconciler
/// uses it at sign-in to find the cart the visitor built while anonymous.
///
/// Freshly minted values are UUID v4 strings, but any non-empty cookie-safe
/// token is accepted so that ids issued by earlier deployments keep working.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct SessionCartId(String);

impl SessionCartId {
    /// Maximum accepted length.
    pub const MAX_LENGTH: usize = 128;

    /// Mint a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Parse a `SessionCartId` from a cookie value.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, longer than
    /// [`Self::MAX_LENGTH`], or contains characters outside the cookie-value
    /// set (whitespace, `;`, `,`, `"`, `\`, control characters).
    pub fn parse(s: &str) -> Result<Self, SessionCartIdError> {
        if s.trim().is_empty() {
            return Err(SessionCartIdError::Empty);
        }

        if s.len() > Self::MAX_LENGTH {
            return Err(SessionCartIdError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        let valid = s.chars().all(|c| {
            c.is_ascii_graphic() && !matches!(c, ';' | ',' | '"' | '\\')
        });
        if !valid {
            return Err(SessionCartIdError::InvalidCharacters);
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionCartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for SessionCartId {
    type Err = SessionCartIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SessionCartId {
    type Error = SessionCartIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SessionCartId> for String {
    fn from(id: SessionCartId) -> Self {
        id.0
    }
}

impl AsRef<str> for SessionCartId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for SessionCartId {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for SessionCartId {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::parse(&s)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for SessionCartId {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}
