//! CLI command implementations.

pub mod migrate;
pub mod user;

/// Storefront database URL, with the same `DATABASE_URL` fallback as the server.
fn database_url() -> Option<secrecy::SecretString> {
    std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .map(secrecy::SecretString::from)
}
