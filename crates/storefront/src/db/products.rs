//! Product repository backed by `PostgreSQL`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use kiln_core::{Price, ProductId};

use super::{PgStore, ProductRepository, RepositoryError, map_insert_error};
use crate::models::{NewProduct, Product};

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    image_url: String,
    description: String,
    material: String,
    price: Price,
    created_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            image_url: row.image_url,
            description: row.description,
            material: row.material,
            price: row.price,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl ProductRepository for PgStore {
    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, name, image_url, description, material, price, created_at
            FROM shop.products
            ORDER BY id
            ",
        )
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, name, image_url, description, material, price, created_at
            FROM shop.products
            WHERE id = $1
            ",
        )
        .bind(id.as_i32())
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(Product::from))
    }

    async fn create_product(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            INSERT INTO shop.products (name, image_url, description, material, price)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, image_url, description, material, price, created_at
            ",
        )
        .bind(&product.name)
        .bind(&product.image_url)
        .bind(&product.description)
        .bind(&product.material)
        .bind(product.price)
        .fetch_one(self.pool())
        .await
        .map_err(|e| map_insert_error(e, "product already exists"))?;

        Ok(row.into())
    }
}
