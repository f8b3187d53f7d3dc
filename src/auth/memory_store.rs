use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::refresh_token::{NewRefreshToken, RefreshTokenRecord, RefreshTokenStore};
use crate::error::AppError;

/// Process-local store, for tests and running without Postgres
#[derive(Clone, Default)]
pub struct InMemoryRefreshTokenStore {
    records: Arc<RwLock<HashMap<Uuid, RefreshTokenRecord>>>,
}

impl InMemoryRefreshTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record as-is, keeping its `created_at`
    pub async fn insert(&self, record: RefreshTokenRecord) {
        self.records.write().await.insert(record.id, record);
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    pub async fn contains(&self, id: Uuid) -> bool {
        self.records.read().await.contains_key(&id)
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryRefreshTokenStore {
    async fn find_created_before(
        &self,
        user_id: i64,
        threshold: DateTime<Utc>,
    ) -> Result<Vec<RefreshTokenRecord>, AppError> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|r| r.user_id == user_id && r.created_at < threshold)
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<RefreshTokenRecord>, AppError> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn create(&self, token: NewRefreshToken) -> Result<RefreshTokenRecord, AppError> {
        let record = RefreshTokenRecord {
            id: Uuid::new_v4(),
            user_id: token.user_id,
            ip_address: token.ip_address,
            created_at: Utc::now(),
        };
        self.records.write().await.insert(record.id, record.clone());
        Ok(record)
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        self.records.write().await.remove(&id);
        Ok(())
    }
}
