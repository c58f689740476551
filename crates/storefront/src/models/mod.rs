//! Domain models for the storefront.
//!
//! Entities live in independent tables keyed by id. Relations are plain
//! foreign-key ids resolved on demand (a [`CartItem`] is a [`CartLine`]
//! joined with its [`Product`] at read time), so no model owns another.

pub mod cart;
pub mod product;
pub mod session;
pub mod user;

pub use cart::{CartItem, CartLine};
pub use product::{NewProduct, Product};
pub use session::{CurrentUser, keys as session_keys};
pub use user::{NewUser, User};
