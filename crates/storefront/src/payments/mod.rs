//! Payment gateway boundary.
//!
//! The checkout service builds a [`CheckoutRequest`] and hands it to a
//! [`PaymentGateway`], which creates a provider-hosted payment page and
//! returns its URL. [`StripeClient`] is the production implementation.

pub mod stripe;

use async_trait::async_trait;
use thiserror::Error;

use kiln_core::CurrencyCode;

pub use stripe::StripeClient;

/// One priced line sent to the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayLineItem {
    /// Product display name.
    pub name: String,
    /// Primary product image.
    pub image_url: String,
    /// Unit price in minor currency units (paise, cents).
    pub unit_amount: i64,
    /// Always 1: every cart line is one unit.
    pub quantity: u32,
}

/// A request to open a hosted checkout in payment mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub currency: CurrencyCode,
    pub line_items: Vec<GatewayLineItem>,
    /// Where the gateway sends the buyer after paying.
    pub success_url: String,
    /// Where the gateway sends the buyer after backing out.
    pub cancel_url: String,
}

/// A checkout session created by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewaySession {
    /// Provider session id.
    pub id: String,
    /// Hosted payment page to redirect the buyer to.
    pub url: String,
}

/// Errors from the payment gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Transport failure or timeout; nothing was created.
    #[error("payment gateway unavailable: {0}")]
    Unavailable(String),

    /// The provider refused the request.
    #[error("payment gateway rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The provider answered with something we could not use.
    #[error("invalid payment gateway response: {0}")]
    InvalidResponse(String),
}

/// A provider able to create hosted checkout sessions.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a hosted checkout session for `request`.
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<GatewaySession, GatewayError>;
}
