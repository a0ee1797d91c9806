use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use flyeasy_core::models::user::normalize_email;
use flyeasy_core::models::User;
use flyeasy_core::repository::UserRepository;
use flyeasy_core::{StoreError, StoreResult};

use crate::database::store_error;

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn insert(&self, user: &User) -> StoreResult<()> {
        sqlx::query("INSERT INTO users (id, email, created_at, doc) VALUES ($1, $2, $3, $4)")
            .bind(user.id)
            .bind(&user.email)
            .bind(user.created_at)
            .bind(Json(user))
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let row: Option<(Json<User>,)> = sqlx::query_as("SELECT doc FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(row.map(|(doc,)| doc.0))
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let row: Option<(Json<User>,)> = sqlx::query_as("SELECT doc FROM users WHERE email = $1")
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(row.map(|(doc,)| doc.0))
    }

    async fn list(&self) -> StoreResult<Vec<User>> {
        let rows: Vec<(Json<User>,)> =
            sqlx::query_as("SELECT doc FROM users ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await
                .map_err(store_error)?;
        Ok(rows.into_iter().map(|(doc,)| doc.0).collect())
    }

    async fn update(&self, user: &User) -> StoreResult<()> {
        let result = sqlx::query("UPDATE users SET email = $2, doc = $3 WHERE id = $1")
            .bind(user.id)
            .bind(&user.email)
            .bind(Json(user))
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
