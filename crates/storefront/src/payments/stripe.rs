//! Stripe Checkout client.
//!
//! Creates Checkout Sessions through the form-encoded
//! `POST /v1/checkout/sessions` endpoint.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, error, instrument};

use super::{CheckoutRequest, GatewayError, GatewaySession, PaymentGateway};
use crate::config::PaymentsConfig;

/// Stripe API client for creating checkout sessions.
#[derive(Clone)]
pub struct StripeClient {
    /// HTTP client with the request timeout applied.
    client: Client,
    /// Secret API key.
    secret_key: SecretString,
    /// API base URL, without trailing slash.
    api_base: String,
}

impl std::fmt::Debug for StripeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeClient")
            .field("secret_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct SessionResponse {
    id: String,
    url: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl StripeClient {
    /// Create a Stripe client from the payments configuration.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Unavailable` if the HTTP client cannot be built.
    pub fn new(config: &PaymentsConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            secret_key: config.secret_key.clone(),
            api_base: config.api_base.trim_end_matches('/').to_owned(),
        })
    }
}

#[async_trait]
impl PaymentGateway for StripeClient {
    #[instrument(skip(self, request), fields(lines = request.line_items.len()))]
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<GatewaySession, GatewayError> {
        let response = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .bearer_auth(self.secret_key.expose_secret())
            .form(&encode_checkout_form(request))
            .send()
            .await
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorResponse>()
                .await
                .ok()
                .and_then(|body| body.error.message)
                .unwrap_or_else(|| "Unknown error".to_owned());
            error!(status = status.as_u16(), %message, "Stripe rejected checkout session");
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let session: SessionResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        let url = session.url.ok_or_else(|| {
            GatewayError::InvalidResponse("checkout session has no url".to_owned())
        })?;

        debug!(session_id = %session.id, "Stripe checkout session created");
        Ok(GatewaySession {
            id: session.id,
            url,
        })
    }
}

/// Flatten a checkout request into Stripe's bracketed form keys.
fn encode_checkout_form(request: &CheckoutRequest) -> Vec<(String, String)> {
    let mut form = vec![
        ("mode".to_owned(), "payment".to_owned()),
        ("payment_method_types[0]".to_owned(), "card".to_owned()),
        ("success_url".to_owned(), request.success_url.clone()),
        ("cancel_url".to_owned(), request.cancel_url.clone()),
    ];

    for (i, item) in request.line_items.iter().enumerate() {
        let prefix = format!("line_items[{i}]");
        form.extend([
            (
                format!("{prefix}[price_data][currency]"),
                request.currency.as_str().to_owned(),
            ),
            (
                format!("{prefix}[price_data][unit_amount]"),
                item.unit_amount.to_string(),
            ),
            (
                format!("{prefix}[price_data][product_data][name]"),
                item.name.clone(),
            ),
            (
                format!("{prefix}[price_data][product_data][images][0]"),
                item.image_url.clone(),
            ),
            (format!("{prefix}[quantity]"), item.quantity.to_string()),
        ]);
    }

    form
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::GatewayLineItem;
    use axum::{Json, Router, http::StatusCode, response::IntoResponse, routing::post};
    use kiln_core::CurrencyCode;
    use serde_json::json;
    use std::time::Duration;

    /// Serve `app` on an ephemeral port and return a client pointed at it.
    async fn client_against(app: Router, timeout: Duration) -> StripeClient {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap_or_else(|e| panic!("bind: {e}"));
        let addr = listener
            .local_addr()
            .unwrap_or_else(|e| panic!("local addr: {e}"));
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let config = PaymentsConfig {
            secret_key: SecretString::from("sk_test_stub"),
            api_base: format!("http://{addr}/"),
            currency: CurrencyCode::INR,
            timeout,
        };
        StripeClient::new(&config).unwrap_or_else(|e| panic!("client: {e}"))
    }

    fn one_item_request() -> CheckoutRequest {
        CheckoutRequest {
            currency: CurrencyCode::INR,
            line_items: vec![GatewayLineItem {
                name: "Mug".to_owned(),
                image_url: "https://example.com/mug.jpg".to_owned(),
                unit_amount: 1000,
                quantity: 1,
            }],
            success_url: "https://shop.example.com/success".to_owned(),
            cancel_url: "https://shop.example.com/cart".to_owned(),
        }
    }

    fn value<'a>(form: &'a [(String, String)], key: &str) -> Option<&'a str> {
        form.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_encode_checkout_form() {
        let request = CheckoutRequest {
            currency: CurrencyCode::INR,
            line_items: vec![
                GatewayLineItem {
                    name: "Mug".to_owned(),
                    image_url: "https://example.com/mug.jpg".to_owned(),
                    unit_amount: 1000,
                    quantity: 1,
                },
                GatewayLineItem {
                    name: "Bowl".to_owned(),
                    image_url: "https://example.com/bowl.jpg".to_owned(),
                    unit_amount: 2550,
                    quantity: 1,
                },
            ],
            success_url: "https://shop.example.com/success".to_owned(),
            cancel_url: "https://shop.example.com/cart".to_owned(),
        };

        let form = encode_checkout_form(&request);

        assert_eq!(value(&form, "mode"), Some("payment"));
        assert_eq!(value(&form, "payment_method_types[0]"), Some("card"));
        assert_eq!(
            value(&form, "success_url"),
            Some("https://shop.example.com/success")
        );
        assert_eq!(
            value(&form, "cancel_url"),
            Some("https://shop.example.com/cart")
        );
        assert_eq!(
            value(&form, "line_items[0][price_data][currency]"),
            Some("inr")
        );
        assert_eq!(
            value(&form, "line_items[0][price_data][unit_amount]"),
            Some("1000")
        );
        assert_eq!(
            value(&form, "line_items[0][price_data][product_data][name]"),
            Some("Mug")
        );
        assert_eq!(
            value(&form, "line_items[0][price_data][product_data][images][0]"),
            Some("https://example.com/mug.jpg")
        );
        assert_eq!(value(&form, "line_items[0][quantity]"), Some("1"));
        assert_eq!(
            value(&form, "line_items[1][price_data][unit_amount]"),
            Some("2550")
        );
        assert_eq!(value(&form, "line_items[2][quantity]"), None);
    }

    #[test]
    fn test_debug_redacts_secret_key() {
        let config = PaymentsConfig {
            secret_key: SecretString::from("sk_test_supersecretvalue"),
            api_base: "https://api.stripe.com/".to_owned(),
            currency: CurrencyCode::INR,
            timeout: std::time::Duration::from_secs(5),
        };
        let client = StripeClient::new(&config);
        let Ok(client) = client else {
            panic!("client should build");
        };
        let debug = format!("{client:?}");
        assert!(!debug.contains("supersecret"));
        assert!(debug.contains("https://api.stripe.com\""));
    }

    #[tokio::test]
    async fn test_create_session_returns_hosted_url() {
        let app = Router::new().route(
            "/v1/checkout/sessions",
            post(|| async {
                Json(json!({ "id": "cs_test_1", "url": "https://checkout.stripe.com/c/pay/cs_test_1" }))
            }),
        );
        let client = client_against(app, Duration::from_secs(5)).await;

        let session = client.create_checkout_session(&one_item_request()).await;

        let Ok(session) = session else {
            panic!("expected a session, got {session:?}");
        };
        assert_eq!(session.id, "cs_test_1");
        assert_eq!(session.url, "https://checkout.stripe.com/c/pay/cs_test_1");
    }

    #[tokio::test]
    async fn test_provider_error_message_is_carried() {
        let app = Router::new().route(
            "/v1/checkout/sessions",
            post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": { "message": "bad image" } })),
                )
                    .into_response()
            }),
        );
        let client = client_against(app, Duration::from_secs(5)).await;

        let result = client.create_checkout_session(&one_item_request()).await;

        assert!(
            matches!(
                &result,
                Err(GatewayError::Rejected { status: 400, message }) if message == "bad image"
            ),
            "got {result:?}"
        );
    }

    #[tokio::test]
    async fn test_rejection_without_body_uses_fallback_message() {
        let app = Router::new().route(
            "/v1/checkout/sessions",
            post(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        );
        let client = client_against(app, Duration::from_secs(5)).await;

        let result = client.create_checkout_session(&one_item_request()).await;

        assert!(
            matches!(
                &result,
                Err(GatewayError::Rejected { status: 500, message }) if message == "Unknown error"
            ),
            "got {result:?}"
        );
    }

    #[tokio::test]
    async fn test_session_without_url_is_invalid() {
        let app = Router::new().route(
            "/v1/checkout/sessions",
            post(|| async { Json(json!({ "id": "cs_test_2", "url": null })) }),
        );
        let client = client_against(app, Duration::from_secs(5)).await;

        let result = client.create_checkout_session(&one_item_request()).await;

        assert!(
            matches!(result, Err(GatewayError::InvalidResponse(_))),
            "got {result:?}"
        );
    }

    #[tokio::test]
    async fn test_slow_provider_is_unavailable() {
        let app = Router::new().route(
            "/v1/checkout/sessions",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                Json(json!({ "id": "cs_test_3", "url": "https://checkout.stripe.com/late" }))
            }),
        );
        let client = client_against(app, Duration::from_millis(300)).await;

        let result = client.create_checkout_session(&one_item_request()).await;

        assert!(
            matches!(result, Err(GatewayError::Unavailable(_))),
            "got {result:?}"
        );
    }
}
