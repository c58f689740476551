//! Business logic services for the storefront.
//!
//! Services borrow the repositories they need from
//! [`AppState`](crate::state::AppState) for the length of one request.
//!
//! # Services
//!
//! - `auth` - Registration and password login
//! - `catalog` - Product listing and creation
//! - `cart` - Cart lines and totals
//! - `checkout` - Gateway checkout sessions built from the cart

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod validation;

pub use auth::{AuthError, AuthService};
pub use cart::{CartError, CartService};
pub use catalog::{CatalogError, CatalogService, ProductInput};
pub use checkout::{CheckoutError, CheckoutEvent, CheckoutService, CheckoutState};
pub use validation::FieldErrors;
