//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `KILN_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `KILN_BASE_URL` - Public URL for the storefront (used for checkout redirects)
//! - `KILN_SESSION_SECRET` - Session signing secret (min 32 chars, high entropy)
//! - `STRIPE_SECRET_KEY` - Payment gateway secret key
//!
//! ## Optional
//! - `KILN_HOST` - Bind address (default: 127.0.0.1)
//! - `KILN_PORT` - Listen port (default: 3000)
//! - `KILN_ADMIN_USER_ID` - Id of the account allowed to add products (default: 1)
//! - `KILN_CURRENCY` - Checkout currency, ISO 4217 (default: inr)
//! - `STRIPE_API_BASE` - Gateway API base URL (default: <https://api.stripe.com>)
//! - `STRIPE_TIMEOUT_SECS` - Gateway request timeout (default: 10)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

use kiln_core::{CurrencyCode, UserId};

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Default Stripe API endpoint.
pub const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront, without trailing slash
    pub base_url: String,
    /// Session signing secret
    pub session_secret: SecretString,
    /// The single account allowed to extend the catalog
    pub admin_user_id: UserId,
    /// Payment gateway configuration
    pub payments: PaymentsConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g. "production")
    pub sentry_environment: Option<String>,
}

/// Payment gateway configuration.
///
/// Implements `Debug` manually to redact the secret key.
#[derive(Clone)]
pub struct PaymentsConfig {
    /// Gateway secret API key (server-side only)
    pub secret_key: SecretString,
    /// Gateway API base URL
    pub api_base: String,
    /// Currency every line item is charged in
    pub currency: CurrencyCode,
    /// Upper bound for a single gateway request
    pub timeout: Duration,
}

impl std::fmt::Debug for PaymentsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentsConfig")
            .field("secret_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("currency", &self.currency)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("KILN_DATABASE_URL")?;
        let host = parse_env("KILN_HOST", "127.0.0.1")?;
        let port = parse_env("KILN_PORT", "3000")?;
        let base_url = normalize_base_url(&get_required_env("KILN_BASE_URL")?)?;
        let session_secret = get_validated_secret("KILN_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "KILN_SESSION_SECRET")?;
        let admin_user_id = UserId::new(parse_env("KILN_ADMIN_USER_ID", "1")?);

        let payments = PaymentsConfig::from_env()?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            session_secret,
            admin_user_id,
            payments,
            sentry_dsn,
            sentry_environment,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the storefront is served over HTTPS (secure cookies).
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }

    /// Absolute URL the gateway sends the buyer to after paying.
    #[must_use]
    pub fn checkout_success_url(&self) -> String {
        format!("{}/success", self.base_url)
    }

    /// Absolute URL the gateway sends the buyer to when they back out.
    #[must_use]
    pub fn checkout_cancel_url(&self) -> String {
        format!("{}/cart", self.base_url)
    }
}

impl PaymentsConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let currency = get_env_or_default("KILN_CURRENCY", "inr")
            .parse::<CurrencyCode>()
            .map_err(|e| ConfigError::InvalidEnvVar("KILN_CURRENCY".to_string(), e.to_string()))?;
        let api_base = normalize_base_url(&get_env_or_default(
            "STRIPE_API_BASE",
            DEFAULT_STRIPE_API_BASE,
        ))?;
        let timeout = Duration::from_secs(parse_env("STRIPE_TIMEOUT_SECS", "10")?);

        Ok(Self {
            secret_key: get_validated_secret("STRIPE_SECRET_KEY")?,
            api_base,
            currency,
            timeout,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable (or its default) into `T`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Check that a base URL is absolute http(s) and strip any trailing slash.
fn normalize_base_url(value: &str) -> Result<String, ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidEnvVar("base url".to_string(), format!("{value}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            "base url".to_string(),
            format!("{value}: scheme must be http or https"),
        ));
    }
    Ok(value.trim_end_matches('/').to_string())
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn test_config() -> StorefrontConfig {
        StorefrontConfig {
            database_url: SecretString::from("postgres://localhost/kiln_test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            session_secret: SecretString::from("x".repeat(32)),
            admin_user_id: UserId::new(1),
            payments: PaymentsConfig {
                secret_key: SecretString::from("sk_test_super_secret_value"),
                api_base: DEFAULT_STRIPE_API_BASE.to_string(),
                currency: CurrencyCode::INR,
                timeout: Duration::from_secs(10),
            },
            sentry_dsn: None,
            sentry_environment: None,
        }
    }

    #[test]
    fn test_shannon_entropy() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
        assert!(shannon_entropy("aB3$xY9!mK2@nL5#") > 3.3);
    }

    #[test]
    fn test_validate_secret_strength() {
        assert!(matches!(
            validate_secret_strength("your-api-key-here", "TEST_VAR"),
            Err(ConfigError::InsecureSecret(_, _))
        ));
        assert!(validate_secret_strength("changeme123", "TEST_VAR").is_err());
        assert!(validate_secret_strength(&"a".repeat(40), "TEST_VAR").is_err());
        assert!(validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR").is_ok());
    }

    #[test]
    fn test_validate_session_secret_length() {
        assert!(validate_session_secret(&SecretString::from("short"), "S").is_err());
        assert!(validate_session_secret(&SecretString::from("a".repeat(32)), "S").is_ok());
    }

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(
            normalize_base_url("https://shop.test/").unwrap(),
            "https://shop.test"
        );
        assert!(normalize_base_url("shop.test").is_err());
        assert!(normalize_base_url("ftp://shop.test").is_err());
    }

    #[test]
    fn test_socket_addr() {
        let addr = test_config().socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_checkout_urls() {
        let config = test_config();
        assert_eq!(config.checkout_success_url(), "http://localhost:3000/success");
        assert_eq!(config.checkout_cancel_url(), "http://localhost:3000/cart");
        assert!(!config.is_secure());
    }

    #[test]
    fn test_payments_config_debug_redacts_secret() {
        let debug_output = format!("{:?}", test_config().payments);
        assert!(debug_output.contains("[REDACTED]"));
        assert!(debug_output.contains("api.stripe.com"));
        assert!(!debug_output.contains("sk_test_super_secret_value"));
    }
}
