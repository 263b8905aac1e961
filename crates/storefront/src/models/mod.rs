//! Domain models for storefront.
//!
//! These types represent validated domain objects, separate from database
//! row types.

pub mod cart;
pub mod session;
pub mod user;

pub use cart::{Cart, CartItem, CartTotals, NewCart};
pub use session::{IdentityToken, SessionView, keys as session_keys};
pub use user::User;
