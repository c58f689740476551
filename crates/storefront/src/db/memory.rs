//! In-process store with the same semantics as [`PgStore`](super::PgStore).
//!
//! Tables are `BTreeMap`s keyed by id so iteration order matches the
//! `ORDER BY id` of the SQL queries. Ids are assigned from a counter per
//! table, starting at 1, like `SERIAL` columns.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;

use kiln_core::{CartLineId, Email, ProductId, UserId};

use super::{CartRepository, ProductRepository, RepositoryError, UserRepository};
use crate::models::{CartItem, CartLine, NewProduct, NewUser, Product, User};

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<i32, (User, String)>,
    products: BTreeMap<i32, Product>,
    cart_items: BTreeMap<i32, CartLine>,
    next_user_id: i32,
    next_product_id: i32,
    next_line_id: i32,
}

impl Tables {
    fn next_id(counter: &mut i32) -> i32 {
        *counter += 1;
        *counter
    }
}

/// Memory-backed implementation of every repository trait.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: while set, every operation fails with
    /// [`RepositoryError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable(
                "memory store marked unavailable".to_owned(),
            ));
        }
        Ok(self.tables.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let tables = self.tables()?;
        Ok(tables.users.get(&id.as_i32()).map(|(user, _)| user.clone()))
    }

    async fn get_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        Ok(self.get_password_hash(email).await?.map(|(user, _)| user))
    }

    async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let tables = self.tables()?;
        Ok(tables
            .users
            .values()
            .find(|(user, _)| &user.email == email)
            .cloned())
    }

    async fn create_user(&self, new_user: &NewUser) -> Result<User, RepositoryError> {
        let mut tables = self.tables()?;
        if tables.users.values().any(|(u, _)| u.email == new_user.email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let id = Tables::next_id(&mut tables.next_user_id);
        let user = User {
            id: UserId::new(id),
            email: new_user.email.clone(),
            name: new_user.name.clone(),
            created_at: Utc::now(),
        };
        tables
            .users
            .insert(id, (user.clone(), new_user.password_hash.clone()));
        Ok(user)
    }
}

#[async_trait]
impl ProductRepository for MemoryStore {
    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError> {
        let tables = self.tables()?;
        Ok(tables.products.values().cloned().collect())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let tables = self.tables()?;
        Ok(tables.products.get(&id.as_i32()).cloned())
    }

    async fn create_product(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        let mut tables = self.tables()?;
        let id = Tables::next_id(&mut tables.next_product_id);
        let product = Product {
            id: ProductId::new(id),
            name: product.name.clone(),
            image_url: product.image_url.clone(),
            description: product.description.clone(),
            material: product.material.clone(),
            price: product.price,
            created_at: Utc::now(),
        };
        tables.products.insert(id, product.clone());
        Ok(product)
    }
}

#[async_trait]
impl CartRepository for MemoryStore {
    async fn add_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<CartLine, RepositoryError> {
        let mut tables = self.tables()?;
        if !tables.users.contains_key(&user_id.as_i32())
            || !tables.products.contains_key(&product_id.as_i32())
        {
            return Err(RepositoryError::NotFound);
        }

        let id = Tables::next_id(&mut tables.next_line_id);
        let line = CartLine {
            id: CartLineId::new(id),
            user_id,
            product_id,
            created_at: Utc::now(),
        };
        tables.cart_items.insert(id, line);
        Ok(line)
    }

    async fn list_items(&self, user_id: UserId) -> Result<Vec<CartItem>, RepositoryError> {
        let tables = self.tables()?;
        let items = tables
            .cart_items
            .values()
            .filter(|line| line.user_id == user_id)
            .filter_map(|line| {
                tables
                    .products
                    .get(&line.product_id.as_i32())
                    .map(|product| CartItem {
                        line: *line,
                        product: product.clone(),
                    })
            })
            .collect();
        Ok(items)
    }

    async fn remove_one(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let mut tables = self.tables()?;
        let oldest = tables
            .cart_items
            .iter()
            .find(|(_, line)| line.user_id == user_id && line.product_id == product_id)
            .map(|(id, _)| *id);

        Ok(oldest.is_some_and(|id| tables.cart_items.remove(&id).is_some()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use kiln_core::Price;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: Email::parse(email).unwrap(),
            password_hash: "hash".to_owned(),
            name: "Test".to_owned(),
        }
    }

    fn new_product(name: &str, price: &str) -> NewProduct {
        NewProduct {
            name: name.to_owned(),
            image_url: format!("/static/{name}.jpg"),
            description: "A thing".to_owned(),
            material: "Clay".to_owned(),
            price: Price::parse(price).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_ids_start_at_one_and_increase() {
        let store = MemoryStore::new();
        let a = store.create_product(&new_product("a", "1")).await.unwrap();
        let b = store.create_product(&new_product("b", "2")).await.unwrap();
        assert_eq!(a.id.as_i32(), 1);
        assert_eq!(b.id.as_i32(), 2);

        let listed = store.list_products().await.unwrap();
        assert_eq!(listed, vec![a, b]);
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = MemoryStore::new();
        store.create_user(&new_user("a@example.com")).await.unwrap();
        let err = store
            .create_user(&new_user("a@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_email_lookup_is_exact() {
        let store = MemoryStore::new();
        store.create_user(&new_user("a@example.com")).await.unwrap();

        let upper = Email::parse("A@example.com").unwrap();
        assert!(store.get_user_by_email(&upper).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_add_line_for_unknown_product_is_not_found() {
        let store = MemoryStore::new();
        let user = store.create_user(&new_user("a@example.com")).await.unwrap();
        let err = store
            .add_line(user.id, ProductId::new(42))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_remove_one_deletes_oldest_matching_line() {
        let store = MemoryStore::new();
        let user = store.create_user(&new_user("a@example.com")).await.unwrap();
        let product = store.create_product(&new_product("mug", "10")).await.unwrap();

        let first = store.add_line(user.id, product.id).await.unwrap();
        let second = store.add_line(user.id, product.id).await.unwrap();

        assert!(store.remove_one(user.id, product.id).await.unwrap());
        let items = store.list_items(user.id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].line.id, second.id);
        assert_ne!(items[0].line.id, first.id);

        assert!(store.remove_one(user.id, product.id).await.unwrap());
        assert!(!store.remove_one(user.id, product.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_carts_are_isolated_per_user() {
        let store = MemoryStore::new();
        let alice = store.create_user(&new_user("a@example.com")).await.unwrap();
        let bob = store.create_user(&new_user("b@example.com")).await.unwrap();
        let product = store.create_product(&new_product("mug", "10")).await.unwrap();

        store.add_line(alice.id, product.id).await.unwrap();
        assert!(store.list_items(bob.id).await.unwrap().is_empty());
        assert!(!store.remove_one(bob.id, product.id).await.unwrap());
        assert_eq!(store.list_items(alice.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_store_fails() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        let err = store.list_products().await.unwrap_err();
        assert!(matches!(err, RepositoryError::Unavailable(_)));

        store.set_unavailable(false);
        assert!(store.list_products().await.unwrap().is_empty());
    }
}
