//! Kiln storefront library.
//!
//! Catalog, accounts, a per-user cart with exact totals and hosted checkout
//! through a payment gateway. Exposed as a library so the binary and the
//! integration tests assemble the same router.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod payments;
pub mod routes;
pub mod services;
pub mod state;
