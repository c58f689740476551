//! Cart manager.
//!
//! A cart is the list of lines owned by one user. Lines carry no quantity;
//! adding a product twice stores two lines and both count toward the total.

use thiserror::Error;
use tracing::{debug, info, instrument};

use kiln_core::{Price, ProductId, UserId};

use crate::db::{CartRepository, ProductRepository, RepositoryError};
use crate::models::{CartItem, CartLine, CurrentUser};

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// No signed-in user.
    #[error("login required")]
    Unauthenticated,

    /// The referenced product does not exist.
    #[error("unknown product {0}")]
    UnknownProduct(ProductId),

    /// The cart belongs to a different user than the session.
    #[error("cart does not belong to the current user")]
    NotOwner,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Cart operations for the signed-in user.
pub struct CartService<'a> {
    carts: &'a dyn CartRepository,
    products: &'a dyn ProductRepository,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(carts: &'a dyn CartRepository, products: &'a dyn ProductRepository) -> Self {
        Self { carts, products }
    }

    /// Append one unit of `product_id` to the user's cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Unauthenticated` without a user,
    /// `CartError::UnknownProduct` if the product does not exist.
    #[instrument(skip(self, user), fields(user_id = ?user.map(|u| u.id)))]
    pub async fn add_item(
        &self,
        user: Option<&CurrentUser>,
        product_id: ProductId,
    ) -> Result<CartLine, CartError> {
        let user = user.ok_or(CartError::Unauthenticated)?;

        if self.products.get_product(product_id).await?.is_none() {
            return Err(CartError::UnknownProduct(product_id));
        }

        // The product can still vanish between the check and the insert.
        let line = self
            .carts
            .add_line(user.id, product_id)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => CartError::UnknownProduct(product_id),
                other => CartError::Repository(other),
            })?;

        info!(line_id = %line.id, %product_id, "Added to cart");
        Ok(line)
    }

    /// Every line in the user's cart with its product, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the store fails.
    pub async fn list_items(&self, user: &CurrentUser) -> Result<Vec<CartItem>, CartError> {
        Ok(self.carts.list_items(user.id).await?)
    }

    /// Remove one line for `(owner, product_id)`.
    ///
    /// `owner` comes from the URL and must be the signed-in user. Removing
    /// a product that is not in the cart is not an error.
    ///
    /// # Errors
    ///
    /// Returns `CartError::NotOwner` if `owner` is someone else.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn remove_item(
        &self,
        user: &CurrentUser,
        owner: UserId,
        product_id: ProductId,
    ) -> Result<(), CartError> {
        if user.id != owner {
            return Err(CartError::NotOwner);
        }

        let removed = self.carts.remove_one(owner, product_id).await?;
        if removed {
            info!(%product_id, "Removed from cart");
        } else {
            debug!(%product_id, "Nothing to remove");
        }
        Ok(())
    }
}

/// Exact sum of the line prices; zero for an empty cart.
#[must_use]
pub fn total(items: &[CartItem]) -> Price {
    items.iter().map(CartItem::price).sum()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::{MemoryStore, ProductRepository, UserRepository};
    use crate::models::{NewProduct, NewUser, Product};
    use kiln_core::Email;

    async fn user(store: &MemoryStore, email: &str) -> CurrentUser {
        let user = store
            .create_user(&NewUser {
                email: Email::parse(email).unwrap(),
                password_hash: "hash".to_owned(),
                name: "Shopper".to_owned(),
            })
            .await
            .unwrap();
        CurrentUser::from(&user)
    }

    async fn product(store: &MemoryStore, name: &str, price: &str) -> Product {
        store
            .create_product(&NewProduct {
                name: name.to_owned(),
                image_url: "https://example.com/p.jpg".to_owned(),
                description: "d".to_owned(),
                material: "m".to_owned(),
                price: Price::parse(price).unwrap(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_add_requires_user() {
        let store = MemoryStore::new();
        let mug = product(&store, "Mug", "10").await;
        let carts = CartService::new(&store, &store);

        let err = carts.add_item(None, mug.id).await.unwrap_err();
        assert!(matches!(err, CartError::Unauthenticated));
    }

    #[tokio::test]
    async fn test_unknown_product_is_rejected() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice@example.com").await;
        let carts = CartService::new(&store, &store);

        let err = carts
            .add_item(Some(&alice), ProductId::new(99))
            .await
            .unwrap_err();
        assert!(matches!(err, CartError::UnknownProduct(id) if id.as_i32() == 99));
        assert!(carts.list_items(&alice).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicates_count_twice() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice@example.com").await;
        let mug = product(&store, "Mug", "10.00").await;
        let carts = CartService::new(&store, &store);

        carts.add_item(Some(&alice), mug.id).await.unwrap();
        carts.add_item(Some(&alice), mug.id).await.unwrap();

        let items = carts.list_items(&alice).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(total(&items), Price::parse("20").unwrap());
    }

    #[tokio::test]
    async fn test_total_tracks_adds_and_removes() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice@example.com").await;
        let mug = product(&store, "Mug", "10.10").await;
        let bowl = product(&store, "Bowl", "0.20").await;
        let carts = CartService::new(&store, &store);

        assert_eq!(total(&carts.list_items(&alice).await.unwrap()), Price::ZERO);

        carts.add_item(Some(&alice), mug.id).await.unwrap();
        carts.add_item(Some(&alice), bowl.id).await.unwrap();
        carts.add_item(Some(&alice), bowl.id).await.unwrap();
        assert_eq!(
            total(&carts.list_items(&alice).await.unwrap()),
            Price::parse("10.50").unwrap()
        );

        carts.remove_item(&alice, alice.id, bowl.id).await.unwrap();
        assert_eq!(
            total(&carts.list_items(&alice).await.unwrap()),
            Price::parse("10.30").unwrap()
        );

        carts.remove_item(&alice, alice.id, mug.id).await.unwrap();
        carts.remove_item(&alice, alice.id, bowl.id).await.unwrap();
        assert_eq!(total(&carts.list_items(&alice).await.unwrap()), Price::ZERO);
    }

    #[tokio::test]
    async fn test_remove_missing_line_is_noop() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice@example.com").await;
        let mug = product(&store, "Mug", "10").await;
        let bowl = product(&store, "Bowl", "5").await;
        let carts = CartService::new(&store, &store);
        carts.add_item(Some(&alice), mug.id).await.unwrap();

        carts.remove_item(&alice, alice.id, bowl.id).await.unwrap();
        assert_eq!(carts.list_items(&alice).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cannot_remove_from_another_users_cart() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice@example.com").await;
        let mallory = user(&store, "mallory@example.com").await;
        let mug = product(&store, "Mug", "10").await;
        let carts = CartService::new(&store, &store);
        carts.add_item(Some(&alice), mug.id).await.unwrap();

        let err = carts
            .remove_item(&mallory, alice.id, mug.id)
            .await
            .unwrap_err();
        assert!(matches!(err, CartError::NotOwner));
        assert_eq!(carts.list_items(&alice).await.unwrap().len(), 1);
    }
}
