//! Cart line repository backed by `PostgreSQL`.
//!
//! A cart is not a row of its own: it is the set of `shop.cart_items` rows
//! owned by a user. Each row is one unit of one product.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use kiln_core::{CartLineId, Price, ProductId, UserId};

use super::{CartRepository, PgStore, RepositoryError, map_insert_error};
use crate::models::{CartItem, CartLine, Product};

#[derive(sqlx::FromRow)]
struct CartLineRow {
    id: CartLineId,
    user_id: UserId,
    product_id: ProductId,
    created_at: DateTime<Utc>,
}

impl From<CartLineRow> for CartLine {
    fn from(row: CartLineRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            product_id: row.product_id,
            created_at: row.created_at,
        }
    }
}

/// A cart line joined with its product.
#[derive(sqlx::FromRow)]
struct CartItemRow {
    line_id: CartLineId,
    user_id: UserId,
    line_created_at: DateTime<Utc>,
    product_id: ProductId,
    name: String,
    image_url: String,
    description: String,
    material: String,
    price: Price,
    product_created_at: DateTime<Utc>,
}

impl From<CartItemRow> for CartItem {
    fn from(row: CartItemRow) -> Self {
        Self {
            line: CartLine {
                id: row.line_id,
                user_id: row.user_id,
                product_id: row.product_id,
                created_at: row.line_created_at,
            },
            product: Product {
                id: row.product_id,
                name: row.name,
                image_url: row.image_url,
                description: row.description,
                material: row.material,
                price: row.price,
                created_at: row.product_created_at,
            },
        }
    }
}

#[async_trait]
impl CartRepository for PgStore {
    async fn add_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<CartLine, RepositoryError> {
        let row = sqlx::query_as::<_, CartLineRow>(
            r"
            INSERT INTO shop.cart_items (user_id, product_id)
            VALUES ($1, $2)
            RETURNING id, user_id, product_id, created_at
            ",
        )
        .bind(user_id.as_i32())
        .bind(product_id.as_i32())
        .fetch_one(self.pool())
        .await
        .map_err(|e| map_insert_error(e, "cart line already exists"))?;

        Ok(row.into())
    }

    async fn list_items(&self, user_id: UserId) -> Result<Vec<CartItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartItemRow>(
            r"
            SELECT
                c.id AS line_id,
                c.user_id,
                c.created_at AS line_created_at,
                p.id AS product_id,
                p.name,
                p.image_url,
                p.description,
                p.material,
                p.price,
                p.created_at AS product_created_at
            FROM shop.cart_items c
            JOIN shop.products p ON p.id = c.product_id
            WHERE c.user_id = $1
            ORDER BY c.id
            ",
        )
        .bind(user_id.as_i32())
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(CartItem::from).collect())
    }

    async fn remove_one(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            DELETE FROM shop.cart_items
            WHERE id = (
                SELECT id FROM shop.cart_items
                WHERE user_id = $1 AND product_id = $2
                ORDER BY id
                LIMIT 1
            )
            ",
        )
        .bind(user_id.as_i32())
        .bind(product_id.as_i32())
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
