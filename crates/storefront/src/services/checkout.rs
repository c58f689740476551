//! Checkout orchestration.
//!
//! Turns the signed-in user's cart into a gateway checkout request, creates
//! the hosted session and hands back the URL to redirect to. The cart is
//! never touched; the only other trace is the gateway session id, held in
//! the buyer's session until they come back.
//!
//! ```text
//! Pending --session created--> GatewaySessionCreated --success--> Completed
//!                                                    \--cancel---> Abandoned
//! ```

use thiserror::Error;
use tracing::{info, instrument, warn};

use kiln_core::{CurrencyCode, PriceError};

use crate::config::StorefrontConfig;
use crate::db::{CartRepository, RepositoryError};
use crate::models::{CartItem, CurrentUser};
use crate::payments::{CheckoutRequest, GatewayError, GatewayLineItem, GatewaySession, PaymentGateway};

/// Errors from checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// No signed-in user.
    #[error("login required")]
    Unauthenticated,

    /// Nothing to pay for.
    #[error("cart is empty")]
    EmptyCart,

    /// A price cannot be expressed in minor units.
    #[error("invalid amount for {product}: {source}")]
    InvalidAmount {
        product: String,
        #[source]
        source: PriceError,
    },

    /// The gateway failed; no local state was changed.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Where a buyer is in the checkout flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutState {
    /// The cart has at least one line and no gateway session exists yet.
    Pending,
    /// The buyer has been sent to the hosted payment page.
    GatewaySessionCreated { session_id: String },
    /// The buyer came back through the success URL.
    Completed,
    /// The buyer came back through the cancel URL; the cart is unchanged.
    Abandoned,
}

/// Events that move a checkout between states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutEvent {
    SessionCreated { session_id: String },
    ReturnedToSuccess,
    ReturnedToCart,
}

impl CheckoutState {
    /// Start a checkout for `items`.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::EmptyCart` when there is nothing to pay for.
    pub fn start(items: &[CartItem]) -> Result<Self, CheckoutError> {
        if items.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        Ok(Self::Pending)
    }

    /// Apply `event`, or `None` if it is not valid in the current state.
    #[must_use]
    pub fn advance(self, event: CheckoutEvent) -> Option<Self> {
        match (self, event) {
            (Self::Pending, CheckoutEvent::SessionCreated { session_id }) => {
                Some(Self::GatewaySessionCreated { session_id })
            }
            (Self::GatewaySessionCreated { .. }, CheckoutEvent::ReturnedToSuccess) => {
                Some(Self::Completed)
            }
            (Self::GatewaySessionCreated { .. }, CheckoutEvent::ReturnedToCart) => {
                Some(Self::Abandoned)
            }
            _ => None,
        }
    }

    /// Where a buyer coming back from the gateway ends up.
    ///
    /// `pending` is the session id remembered when the buyer was sent away.
    /// Without one there is no checkout to conclude.
    #[must_use]
    pub fn returned(pending: Option<String>, event: CheckoutEvent) -> Option<Self> {
        pending.and_then(|session_id| Self::GatewaySessionCreated { session_id }.advance(event))
    }

    /// Whether the buyer has left the gateway.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Abandoned)
    }
}

/// Build the gateway request for `items`: one line per cart line, quantity 1,
/// unit amount in minor units.
///
/// # Errors
///
/// Returns `CheckoutError::EmptyCart` for an empty cart, or
/// `CheckoutError::InvalidAmount` if a price does not convert.
pub fn build_checkout_request(
    items: &[CartItem],
    currency: CurrencyCode,
    success_url: String,
    cancel_url: String,
) -> Result<CheckoutRequest, CheckoutError> {
    if items.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let line_items = items
        .iter()
        .map(|item| {
            let product = &item.product;
            let unit_amount =
                product
                    .price
                    .to_minor_units()
                    .map_err(|source| CheckoutError::InvalidAmount {
                        product: product.name.clone(),
                        source,
                    })?;
            Ok(GatewayLineItem {
                name: product.name.clone(),
                image_url: product.image_url.clone(),
                unit_amount,
                quantity: 1,
            })
        })
        .collect::<Result<Vec<_>, CheckoutError>>()?;

    Ok(CheckoutRequest {
        currency,
        line_items,
        success_url,
        cancel_url,
    })
}

/// Creates hosted checkout sessions from carts.
pub struct CheckoutService<'a> {
    carts: &'a dyn CartRepository,
    gateway: &'a dyn PaymentGateway,
    config: &'a StorefrontConfig,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(
        carts: &'a dyn CartRepository,
        gateway: &'a dyn PaymentGateway,
        config: &'a StorefrontConfig,
    ) -> Self {
        Self {
            carts,
            gateway,
            config,
        }
    }

    /// Create a gateway checkout session for the user's cart.
    ///
    /// Empty carts and unconvertible prices are rejected before the gateway
    /// is contacted.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Unauthenticated`, `EmptyCart`, `InvalidAmount`,
    /// `Gateway` or `Repository`.
    #[instrument(skip(self, user), fields(user_id = ?user.map(|u| u.id)))]
    pub async fn create_checkout_session(
        &self,
        user: Option<&CurrentUser>,
    ) -> Result<GatewaySession, CheckoutError> {
        let user = user.ok_or(CheckoutError::Unauthenticated)?;
        let items = self.carts.list_items(user.id).await?;

        let state = CheckoutState::start(&items)?;
        let request = build_checkout_request(
            &items,
            self.config.payments.currency,
            self.config.checkout_success_url(),
            self.config.checkout_cancel_url(),
        )?;

        let session = self
            .gateway
            .create_checkout_session(&request)
            .await
            .inspect_err(|e| warn!(error = %e, "Checkout session creation failed"))?;

        let state = state.advance(CheckoutEvent::SessionCreated {
            session_id: session.id.clone(),
        });
        info!(
            session_id = %session.id,
            lines = request.line_items.len(),
            ?state,
            "Checkout session created"
        );
        Ok(session)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::{CartLine, Product};
    use chrono::Utc;
    use kiln_core::{CartLineId, Price, ProductId, UserId};

    fn item(id: i32, name: &str, price: &str) -> CartItem {
        CartItem {
            line: CartLine {
                id: CartLineId::new(id),
                user_id: UserId::new(1),
                product_id: ProductId::new(id),
                created_at: Utc::now(),
            },
            product: Product {
                id: ProductId::new(id),
                name: name.to_owned(),
                image_url: format!("https://example.com/{name}.jpg"),
                description: "d".to_owned(),
                material: "m".to_owned(),
                price: Price::parse(price).unwrap(),
                created_at: Utc::now(),
            },
        }
    }

    #[test]
    fn test_build_request_scales_to_minor_units() {
        let request = build_checkout_request(
            &[item(1, "Mug", "10.00"), item(2, "Bowl", "0.99")],
            CurrencyCode::INR,
            "https://shop/success".to_owned(),
            "https://shop/cart".to_owned(),
        )
        .unwrap();

        assert_eq!(request.line_items.len(), 2);
        assert_eq!(request.line_items[0].unit_amount, 1000);
        assert_eq!(request.line_items[0].quantity, 1);
        assert_eq!(request.line_items[0].name, "Mug");
        assert_eq!(request.line_items[0].image_url, "https://example.com/Mug.jpg");
        assert_eq!(request.line_items[1].unit_amount, 99);
        assert_eq!(request.cancel_url, "https://shop/cart");
    }

    #[test]
    fn test_empty_cart_is_rejected() {
        let err = build_checkout_request(
            &[],
            CurrencyCode::INR,
            String::new(),
            String::new(),
        )
        .unwrap_err();
        assert!(matches!(err, CheckoutError::EmptyCart));
        assert!(matches!(
            CheckoutState::start(&[]),
            Err(CheckoutError::EmptyCart)
        ));
    }

    #[test]
    fn test_duplicate_lines_stay_separate() {
        let request = build_checkout_request(
            &[item(1, "Mug", "10"), item(2, "Mug", "10")],
            CurrencyCode::USD,
            String::new(),
            String::new(),
        )
        .unwrap();
        assert_eq!(request.line_items.len(), 2);
        assert!(request.line_items.iter().all(|l| l.quantity == 1));
    }

    #[test]
    fn test_state_transitions() {
        let pending = CheckoutState::start(&[item(1, "Mug", "10")]).unwrap();
        assert_eq!(pending, CheckoutState::Pending);

        let created = pending
            .advance(CheckoutEvent::SessionCreated {
                session_id: "cs_1".to_owned(),
            })
            .unwrap();
        assert!(!created.is_terminal());

        let completed = created.clone().advance(CheckoutEvent::ReturnedToSuccess).unwrap();
        assert_eq!(completed, CheckoutState::Completed);
        assert!(completed.is_terminal());

        let abandoned = created.advance(CheckoutEvent::ReturnedToCart).unwrap();
        assert_eq!(abandoned, CheckoutState::Abandoned);
    }

    #[test]
    fn test_invalid_transitions_are_rejected() {
        assert_eq!(
            CheckoutState::Pending.advance(CheckoutEvent::ReturnedToSuccess),
            None
        );
        assert_eq!(
            CheckoutState::Completed.advance(CheckoutEvent::ReturnedToCart),
            None
        );
    }

    #[test]
    fn test_return_concludes_pending_checkout() {
        assert_eq!(
            CheckoutState::returned(Some("cs_1".to_owned()), CheckoutEvent::ReturnedToSuccess),
            Some(CheckoutState::Completed)
        );
        assert_eq!(
            CheckoutState::returned(Some("cs_1".to_owned()), CheckoutEvent::ReturnedToCart),
            Some(CheckoutState::Abandoned)
        );
    }

    #[test]
    fn test_return_without_pending_checkout_is_ignored() {
        assert_eq!(
            CheckoutState::returned(None, CheckoutEvent::ReturnedToSuccess),
            None
        );
        assert_eq!(
            CheckoutState::returned(None, CheckoutEvent::ReturnedToCart),
            None
        );
        // A second session for the same checkout is not a return.
        assert_eq!(
            CheckoutState::returned(
                Some("cs_1".to_owned()),
                CheckoutEvent::SessionCreated {
                    session_id: "cs_2".to_owned()
                }
            ),
            None
        );
    }
}
