//! Backend configuration loaded from environment variables.
//!
//! Configuration is read once at process start into a [`BackendConfig`] and
//! passed by reference into each component; no component reads the
//! environment after startup.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BACKEND_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`)
//!
//! ## Optional
//! - `BACKEND_HOST` - Bind address (default: 127.0.0.1)
//! - `BACKEND_PORT` - Listen port (default: 3000)
//! - `BACKEND_BASE_URL` - Public URL of the service, used to resolve blob
//!   addresses (default: http://127.0.0.1:3000)
//! - `BACKEND_STORAGE_ROOT` - Root directory for blob containers and file
//!   shares (default: ./data)
//! - `CUSTOMERS_TABLE` / `PRODUCTS_TABLE` / `ORDERS_TABLE` - Entity store
//!   collection tables (defaults: customers / products / orders)
//! - `ORDER_QUEUE` - Order queue name (default: orderprocessing)
//! - `BLOB_PRODUCT_IMAGES` - Product image container (default: productimages)
//! - `BLOB_PAYMENT_PROOFS` - Payment proof container (default: payment-proofs)
//! - `FILESHARE_NAME` - File share name (default: contracts)
//! - `FILESHARE_DIR_PAYMENTS` - Payment metadata directory (default: payments)
//! - `QUEUE_MAX_ATTEMPTS` - Deliveries before dead-lettering (default: 5)
//! - `QUEUE_POLL_INTERVAL_MS` - Worker idle poll interval (default: 1000)
//! - `QUEUE_VISIBILITY_LEASE_SECS` - Dequeue lease length (default: 30)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Backend application configuration.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of the service (no trailing slash)
    pub base_url: String,
    /// Root directory for the filesystem blob and file stores
    pub storage_root: PathBuf,
    /// Names of the backing collections, queues, containers, and shares
    pub storage: StorageNames,
    /// Queue worker policy
    pub queue: QueuePolicy,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Names of the external storage resources.
#[derive(Debug, Clone)]
pub struct StorageNames {
    pub customers_table: String,
    pub products_table: String,
    pub orders_table: String,
    pub order_queue: String,
    pub product_images_container: String,
    pub payment_proofs_container: String,
    pub file_share: String,
    pub payments_dir: String,
}

/// Retry/dead-letter policy applied by the queue worker.
#[derive(Debug, Clone, Copy)]
pub struct QueuePolicy {
    /// Deliveries a message gets before it is moved to the poison queue.
    pub max_attempts: u32,
    /// Sleep between polls when the queue is empty.
    pub poll_interval: Duration,
    /// How long a dequeued message stays invisible before redelivery.
    pub visibility_lease: Duration,
}

impl BackendConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("BACKEND_DATABASE_URL")?;
        let host = get_env_or_default("BACKEND_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("BACKEND_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("BACKEND_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("BACKEND_PORT".to_string(), e.to_string()))?;
        let base_url = get_base_url("BACKEND_BASE_URL", "http://127.0.0.1:3000")?;
        let storage_root = PathBuf::from(get_env_or_default("BACKEND_STORAGE_ROOT", "./data"));
        let storage = StorageNames::from_env()?;
        let queue = QueuePolicy::from_env()?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            storage_root,
            storage,
            queue,
            sentry_dsn,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Base URL under which blob containers are served.
    #[must_use]
    pub fn blob_base_url(&self) -> String {
        format!("{}/blobs", self.base_url)
    }

    /// Filesystem root of the blob containers.
    #[must_use]
    pub fn blob_root(&self) -> PathBuf {
        self.storage_root.join("blobs")
    }

    /// Filesystem root of the configured file share.
    #[must_use]
    pub fn share_root(&self) -> PathBuf {
        self.storage_root
            .join("shares")
            .join(&self.storage.file_share)
    }
}

impl StorageNames {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            customers_table: get_store_name("CUSTOMERS_TABLE", "customers")?,
            products_table: get_store_name("PRODUCTS_TABLE", "products")?,
            orders_table: get_store_name("ORDERS_TABLE", "orders")?,
            order_queue: get_store_name("ORDER_QUEUE", "orderprocessing")?,
            product_images_container: get_store_name("BLOB_PRODUCT_IMAGES", "productimages")?,
            payment_proofs_container: get_store_name("BLOB_PAYMENT_PROOFS", "payment-proofs")?,
            file_share: get_store_name("FILESHARE_NAME", "contracts")?,
            payments_dir: get_store_name("FILESHARE_DIR_PAYMENTS", "payments")?,
        })
    }
}

impl QueuePolicy {
    fn from_env() -> Result<Self, ConfigError> {
        let max_attempts = get_env_or_default("QUEUE_MAX_ATTEMPTS", "5")
            .parse::<u32>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("QUEUE_MAX_ATTEMPTS".to_string(), e.to_string())
            })?;
        let poll_interval_ms = get_env_or_default("QUEUE_POLL_INTERVAL_MS", "1000")
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("QUEUE_POLL_INTERVAL_MS".to_string(), e.to_string())
            })?;
        let lease_secs = get_env_or_default("QUEUE_VISIBILITY_LEASE_SECS", "30")
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("QUEUE_VISIBILITY_LEASE_SECS".to_string(), e.to_string())
            })?;

        if max_attempts == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "QUEUE_MAX_ATTEMPTS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            max_attempts,
            poll_interval: Duration::from_millis(poll_interval_ms),
            visibility_lease: Duration::from_secs(lease_secs),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

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
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get and validate a base URL, normalized without a trailing slash.
fn get_base_url(key: &str, default: &str) -> Result<String, ConfigError> {
    let value = get_env_or_default(key, default);
    Url::parse(&value).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    Ok(value.trim_end_matches('/').to_string())
}

/// Get a storage resource name and validate it as a safe identifier.
///
/// Table names are interpolated into DDL/DML (values are always bound), and
/// container/share names become path segments, so the character set is
/// restricted to lowercase alphanumerics, `-`, and `_`.
fn get_store_name(key: &str, default: &str) -> Result<String, ConfigError> {
    let value = get_env_or_default(key, default);
    validate_store_name(&value)
        .map_err(|reason| ConfigError::InvalidEnvVar(key.to_string(), reason))?;
    Ok(value)
}

fn validate_store_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("must not be empty".to_string());
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
    {
        return Err(format!(
            "'{name}' may only contain lowercase alphanumerics, '-', and '_'"
        ));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn test_storage_names() -> StorageNames {
        StorageNames {
            customers_table: "customers".to_string(),
            products_table: "products".to_string(),
            orders_table: "orders".to_string(),
            order_queue: "orderprocessing".to_string(),
            product_images_container: "productimages".to_string(),
            payment_proofs_container: "payment-proofs".to_string(),
            file_share: "contracts".to_string(),
            payments_dir: "payments".to_string(),
        }
    }

    #[test]
    fn test_validate_store_name() {
        assert!(validate_store_name("orders").is_ok());
        assert!(validate_store_name("payment-proofs").is_ok());
        assert!(validate_store_name("queue_2").is_ok());

        assert!(validate_store_name("").is_err());
        assert!(validate_store_name("Orders").is_err());
        assert!(validate_store_name("orders; DROP TABLE x").is_err());
        assert!(validate_store_name("a/b").is_err());
    }

    #[test]
    fn test_derived_paths_and_urls() {
        let config = BackendConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            storage_root: PathBuf::from("/var/lib/marigold"),
            storage: test_storage_names(),
            queue: QueuePolicy {
                max_attempts: 5,
                poll_interval: Duration::from_millis(1000),
                visibility_lease: Duration::from_secs(30),
            },
            sentry_dsn: None,
        };

        assert_eq!(config.socket_addr().port(), 3000);
        assert_eq!(config.blob_base_url(), "http://localhost:3000/blobs");
        assert_eq!(config.blob_root(), PathBuf::from("/var/lib/marigold/blobs"));
        assert_eq!(
            config.share_root(),
            PathBuf::from("/var/lib/marigold/shares/contracts")
        );
    }
}
