/// Refresh Token Records
///
/// Every issued refresh token is backed by one row. The signed token embeds
/// the row id, so deleting the row revokes the token even before its `exp`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;

/// Server-side record keeping a refresh token alive
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct RefreshTokenRecord {
    pub id: Uuid,
    pub user_id: i64,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Data needed to insert a new record
#[derive(Debug, Clone, PartialEq)]
pub struct NewRefreshToken {
    pub user_id: i64,
    pub ip_address: Option<String>,
}

/// Persistence capability for refresh token records
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    /// All records of `user_id` created strictly before `threshold`
    async fn find_created_before(
        &self,
        user_id: i64,
        threshold: DateTime<Utc>,
    ) -> Result<Vec<RefreshTokenRecord>, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<RefreshTokenRecord>, AppError>;

    async fn create(&self, token: NewRefreshToken) -> Result<RefreshTokenRecord, AppError>;

    async fn delete(&self, id: Uuid) -> Result<(), AppError>;
}

/// Postgres-backed store over the `refresh_tokens` table
#[derive(Clone)]
pub struct PgRefreshTokenStore {
    pool: PgPool,
}

impl PgRefreshTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenStore for PgRefreshTokenStore {
    async fn find_created_before(
        &self,
        user_id: i64,
        threshold: DateTime<Utc>,
    ) -> Result<Vec<RefreshTokenRecord>, AppError> {
        let records = sqlx::query_as::<_, RefreshTokenRecord>(
            r#"
            SELECT id, user_id, ip_address, created_at
            FROM refresh_tokens
            WHERE user_id = $1 AND created_at < $2
            "#,
        )
        .bind(user_id)
        .bind(threshold)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<RefreshTokenRecord>, AppError> {
        let record = sqlx::query_as::<_, RefreshTokenRecord>(
            r#"
            SELECT id, user_id, ip_address, created_at
            FROM refresh_tokens
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn create(&self, token: NewRefreshToken) -> Result<RefreshTokenRecord, AppError> {
        let record = sqlx::query_as::<_, RefreshTokenRecord>(
            r#"
            INSERT INTO refresh_tokens (id, user_id, ip_address, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, ip_address, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(token.user_id)
        .bind(token.ip_address)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM refresh_tokens WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
