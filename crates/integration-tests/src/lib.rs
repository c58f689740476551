//! End-to-end test harness for the Kiln storefront.
//!
//! Drives the real router in-process with `tower::ServiceExt::oneshot`,
//! backed by the in-memory store, an in-memory session store and a
//! [`RecordingGateway`] in place of Stripe. No database or network needed.
//!
//! ```rust,ignore
//! let ctx = TestContext::new();
//! let mut client = ctx.client();
//! client.register("a@b.com", "pw123", "A").await;
//! let resp = client.get("/cart").await;
//! assert_eq!(resp.status, StatusCode::OK);
//! ```

#![allow(clippy::missing_panics_doc, clippy::must_use_candidate)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use secrecy::SecretString;
use tower::ServiceExt;

use kiln_core::{CurrencyCode, Price, UserId};
use kiln_storefront::config::{DEFAULT_STRIPE_API_BASE, PaymentsConfig, StorefrontConfig};
use kiln_storefront::db::{MemoryStore, ProductRepository};
use kiln_storefront::middleware::create_session_layer;
use kiln_storefront::models::{NewProduct, Product};
use kiln_storefront::payments::{CheckoutRequest, GatewayError, GatewaySession, PaymentGateway};
use kiln_storefront::routes;
use kiln_storefront::state::AppState;

/// Base URL the test storefront pretends to live at.
pub const BASE_URL: &str = "http://localhost:3000";

/// Hosted page prefix returned by [`RecordingGateway`].
pub const GATEWAY_URL_PREFIX: &str = "https://checkout.stripe.test/pay/";

/// Storefront configuration for tests. The first registered account is admin.
pub fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from("postgres://localhost/kiln_test"),
        host: [127, 0, 0, 1].into(),
        port: 3000,
        base_url: BASE_URL.to_owned(),
        session_secret: SecretString::from("q8Zr2LmW4xNc7VbT1yHs9KdP3gFj6AeU0oIi5RtYwQ"),
        admin_user_id: UserId::new(1),
        payments: PaymentsConfig {
            secret_key: SecretString::from("sk_test_4eC39HqLyjWDarjtT1zdp7dc"),
            api_base: DEFAULT_STRIPE_API_BASE.to_owned(),
            currency: CurrencyCode::INR,
            timeout: Duration::from_secs(10),
        },
        sentry_dsn: None,
        sentry_environment: None,
    }
}

// =============================================================================
// Gateway
// =============================================================================

/// Fake payment gateway that records every request it receives.
#[derive(Debug, Default)]
pub struct RecordingGateway {
    requests: Mutex<Vec<CheckoutRequest>>,
    sessions: AtomicUsize,
    failing: AtomicBool,
}

impl RecordingGateway {
    /// Make subsequent calls fail as if the provider were unreachable.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<CheckoutRequest> {
        self.requests.lock().expect("gateway lock poisoned").clone()
    }
}

#[async_trait]
impl PaymentGateway for RecordingGateway {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<GatewaySession, GatewayError> {
        self.requests
            .lock()
            .expect("gateway lock poisoned")
            .push(request.clone());

        if self.failing.load(Ordering::SeqCst) {
            return Err(GatewayError::Unavailable("connection refused".to_owned()));
        }

        let n = self.sessions.fetch_add(1, Ordering::SeqCst) + 1;
        let id = format!("cs_test_{n}");
        Ok(GatewaySession {
            url: format!("{GATEWAY_URL_PREFIX}{id}"),
            id,
        })
    }
}

// =============================================================================
// Context
// =============================================================================

/// One storefront instance with its fakes.
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub gateway: Arc<RecordingGateway>,
    router: Router,
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TestContext {
    pub fn new() -> Self {
        let config = test_config();
        let store = Arc::new(MemoryStore::new());
        let gateway = Arc::new(RecordingGateway::default());

        let state = AppState::with_store(config.clone(), store.clone(), gateway.clone());
        let session_layer = create_session_layer(tower_sessions::MemoryStore::default(), &config);

        Self {
            store,
            gateway,
            router: routes::app(state, session_layer),
        }
    }

    /// A client with an empty cookie jar.
    pub fn client(&self) -> TestClient {
        TestClient {
            router: self.router.clone(),
            cookie: None,
        }
    }

    /// Insert a product directly, bypassing the admin form.
    pub async fn seed_product(&self, name: &str, price: &str) -> Product {
        self.store
            .create_product(&NewProduct {
                name: name.to_owned(),
                image_url: format!("https://img.example.com/{}.png", name.to_lowercase()),
                description: format!("A handmade {name}"),
                material: "Stoneware".to_owned(),
                price: Price::parse(price).expect("valid test price"),
            })
            .await
            .expect("seed product")
    }
}

// =============================================================================
// Client
// =============================================================================

/// A response with its body read out.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    /// The `Location` header, if any.
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }
}

/// Browser stand-in that keeps the session cookie between requests.
pub struct TestClient {
    router: Router,
    cookie: Option<String>,
}

impl TestClient {
    pub async fn get(&mut self, uri: &str) -> TestResponse {
        self.send(Method::GET, uri, None).await
    }

    pub async fn post(&mut self, uri: &str) -> TestResponse {
        self.send(Method::POST, uri, Some(String::new())).await
    }

    pub async fn post_form(&mut self, uri: &str, fields: &[(&str, &str)]) -> TestResponse {
        let body = fields
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        self.send(Method::POST, uri, Some(body)).await
    }

    /// Register through `/signin`; the new account is logged in.
    pub async fn register(&mut self, email: &str, password: &str, name: &str) -> TestResponse {
        self.post_form(
            "/signin",
            &[("email", email), ("password", password), ("name", name)],
        )
        .await
    }

    pub async fn login(&mut self, email: &str, password: &str) -> TestResponse {
        self.post_form("/login", &[("email", email), ("password", password)])
            .await
    }

    async fn send(&mut self, method: Method, uri: &str, form: Option<String>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = &self.cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let body = match form {
            Some(form) => {
                builder = builder.header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
                Body::from(form)
            }
            None => Body::empty(),
        };
        let request = builder.body(body).expect("valid request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        self.store_cookie(&headers);

        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("readable body")
            .to_bytes();

        TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    fn store_cookie(&mut self, headers: &HeaderMap) {
        for value in headers.get_all(header::SET_COOKIE) {
            let Ok(value) = value.to_str() else { continue };
            let pair = value.split(';').next().unwrap_or_default().trim();
            if pair.ends_with('=') {
                self.cookie = None;
            } else if !pair.is_empty() {
                self.cookie = Some(pair.to_owned());
            }
        }
    }
}
