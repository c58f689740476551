//! User repository backed by `PostgreSQL`.
//!
//! Queries are checked at runtime (`query_as`) so the crate builds without a
//! live database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use kiln_core::{Email, UserId};

use super::{PgStore, RepositoryError, UserRepository, map_insert_error};
use crate::models::{NewUser, User};

/// Raw `shop.users` row.
#[derive(sqlx::FromRow)]
struct UserRow {
    id: UserId,
    email: String,
    name: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> Result<(User, String), RepositoryError> {
        let email = Email::parse(&self.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        let user = User {
            id: self.id,
            email,
            name: self.name,
            created_at: self.created_at,
        };
        Ok((user, self.password_hash))
    }
}

const SELECT_USER: &str = r"
    SELECT id, email, name, password_hash, created_at
    FROM shop.users
";

#[async_trait]
impl UserRepository for PgStore {
    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!("{SELECT_USER} WHERE id = $1"))
            .bind(id.as_i32())
            .fetch_optional(self.pool())
            .await?;

        row.map(|r| r.into_user().map(|(user, _)| user)).transpose()
    }

    async fn get_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        Ok(self.get_password_hash(email).await?.map(|(user, _)| user))
    }

    async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!("{SELECT_USER} WHERE email = $1"))
            .bind(email.as_str())
            .fetch_optional(self.pool())
            .await?;

        row.map(UserRow::into_user).transpose()
    }

    async fn create_user(&self, new_user: &NewUser) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            INSERT INTO shop.users (email, name, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, email, name, password_hash, created_at
            ",
        )
        .bind(new_user.email.as_str())
        .bind(&new_user.name)
        .bind(&new_user.password_hash)
        .fetch_one(self.pool())
        .await
        .map_err(|e| map_insert_error(e, "email already exists"))?;

        row.into_user().map(|(user, _)| user)
    }
}
