//! Catalog product types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use kiln_core::{Price, ProductId};

/// A catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Image URL or path shown in listings and sent to the payment gateway.
    pub image_url: String,
    pub description: String,
    pub material: String,
    /// Unit price in major currency units.
    pub price: Price,
    pub created_at: DateTime<Utc>,
}

/// A validated product waiting to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub name: String,
    pub image_url: String,
    pub description: String,
    pub material: String,
    pub price: Price,
}
