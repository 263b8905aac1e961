//! Prostore Core - Shared identity and cart types.
//!
//! This crate provides the types shared by every Prostore component:
//! - `storefront` - Public storefront: sign-in, sessions, cart reconciliation
//! - `cli` - Command-line tools for migrations
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, emails, prices, roles and
//!   anonymous cart session identifiers

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
