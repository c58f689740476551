//! CLI command implementations.

pub mod migrate;
pub mod seed;

use secrecy::SecretString;

/// Read the storefront database URL, preferring `KILN_DATABASE_URL`.
///
/// Loads `.env` first when present.
pub fn database_url() -> Option<SecretString> {
    dotenvy::dotenv().ok();

    std::env::var("KILN_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .map(SecretString::from)
}
