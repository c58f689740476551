//! Cart line types.

use chrono::{DateTime, Utc};

use kiln_core::{CartLineId, Price, ProductId, UserId};

use super::Product;

/// One unit of one product in one user's cart.
///
/// There is no quantity column: adding the same product twice stores two
/// lines, and each line counts once toward the total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartLine {
    pub id: CartLineId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub created_at: DateTime<Utc>,
}

/// A cart line joined with the product it refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartItem {
    pub line: CartLine,
    pub product: Product,
}

impl CartItem {
    /// Price contributed by this line (always one unit).
    #[must_use]
    pub const fn price(&self) -> Price {
        self.product.price
    }
}
