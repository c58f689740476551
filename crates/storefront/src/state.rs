//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::StorefrontConfig;
use crate::db::{CartRepository, PgStore, ProductRepository, UserRepository};
use crate::payments::PaymentGateway;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and hands out the repositories
/// and the payment gateway behind trait objects, so the same router runs on
/// `PostgreSQL` in production and on in-memory fakes in tests.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    users: Arc<dyn UserRepository>,
    products: Arc<dyn ProductRepository>,
    carts: Arc<dyn CartRepository>,
    gateway: Arc<dyn PaymentGateway>,
    pg: Option<PgStore>,
}

impl AppState {
    /// Create state backed by `PostgreSQL`.
    #[must_use]
    pub fn new(config: StorefrontConfig, store: PgStore, gateway: Arc<dyn PaymentGateway>) -> Self {
        let shared = Arc::new(store.clone());
        Self {
            inner: Arc::new(AppStateInner {
                config,
                users: shared.clone(),
                products: shared.clone(),
                carts: shared,
                gateway,
                pg: Some(store),
            }),
        }
    }

    /// Create state over any store implementing every repository trait.
    #[must_use]
    pub fn with_store<S>(config: StorefrontConfig, store: Arc<S>, gateway: Arc<dyn PaymentGateway>) -> Self
    where
        S: UserRepository + ProductRepository + CartRepository + 'static,
    {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                users: store.clone(),
                products: store.clone(),
                carts: store,
                gateway,
                pg: None,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn users(&self) -> &dyn UserRepository {
        self.inner.users.as_ref()
    }

    #[must_use]
    pub fn products(&self) -> &dyn ProductRepository {
        self.inner.products.as_ref()
    }

    #[must_use]
    pub fn carts(&self) -> &dyn CartRepository {
        self.inner.carts.as_ref()
    }

    /// Get a reference to the payment gateway.
    #[must_use]
    pub fn gateway(&self) -> &dyn PaymentGateway {
        self.inner.gateway.as_ref()
    }

    /// The `PostgreSQL` store, when running against a database.
    #[must_use]
    pub fn pg(&self) -> Option<&PgStore> {
        self.inner.pg.as_ref()
    }
}
