//! Prostore storefront library.
//!
//! Email and password sign-in on top of server-side sessions, with the
//! visitor's anonymous cart merged into their account at sign-in, and a
//! route guard that keeps signed-out visitors away from account pages.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
