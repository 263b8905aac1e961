//! Business logic services for storefront.
//!
//! # Services
//!
//! - `auth` - Credential checks and registration
//! - `cart` - Anonymous-to-user cart reconciliation
//! - `token` - Identity token and session construction

pub mod auth;
pub mod cart;
pub mod token;

pub use auth::{AuthError, AuthService, Credentials, Registration};
pub use cart::{CartReconciler, ReconcileError, Reconciliation};
pub use token::{AuthContext, IdentityTokenBuilder, TokenError, TokenTrigger, build_session};
