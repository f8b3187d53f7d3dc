/// Refresh Token Service
///
/// Bookkeeping for refresh token records: creating a record per issued token
/// and pruning a user's records once they are older than the configured
/// refresh token lifetime.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::auth::{
    calculate_expiration_threshold, parse_token_expiry, NewRefreshToken, RefreshTokenRecord,
    RefreshTokenStore,
};
use crate::error::AppError;

/// The authenticated user a token is issued for
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct AuthUser {
    pub id: i64,
}

/// Request facts recorded alongside a new token
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestMeta {
    pub ip: Option<String>,
}

#[derive(Clone)]
pub struct RefreshTokenService {
    store: Arc<dyn RefreshTokenStore>,
    token_expires_in: String,
}

impl RefreshTokenService {
    pub fn new(store: Arc<dyn RefreshTokenStore>, token_expires_in: impl Into<String>) -> Self {
        Self {
            store,
            token_expires_in: token_expires_in.into(),
        }
    }

    pub fn store(&self) -> &Arc<dyn RefreshTokenStore> {
        &self.store
    }

    /// Delete every record of `user` created before now minus the token lifetime
    ///
    /// # Errors
    /// Fails on a malformed lifetime or when the store fails; records deleted
    /// before the failure stay deleted.
    pub async fn clean_expired_tokens(&self, user: &AuthUser) -> Result<(), AppError> {
        let threshold = calculate_expiration_threshold(&self.token_expires_in)?;
        self.delete_created_before(user.id, threshold).await
    }

    async fn delete_created_before(
        &self,
        user_id: i64,
        threshold: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let expired = self.store.find_created_before(user_id, threshold).await?;

        for record in &expired {
            self.store.delete(record.id).await?;
            tracing::debug!(user_id = user_id, record_id = %record.id, "Deleted expired refresh token");
        }

        if !expired.is_empty() {
            tracing::info!(
                user_id = user_id,
                deleted = expired.len(),
                "Expired refresh tokens pruned"
            );
        }

        Ok(())
    }

    /// Persist a new record for `user`
    ///
    /// Pruning of the user's expired records is started on a background task
    /// and not awaited, so the returned record may be created while older
    /// rows are still being deleted.
    pub async fn create(
        &self,
        user: &AuthUser,
        request: &RequestMeta,
    ) -> Result<RefreshTokenRecord, AppError> {
        // A malformed lifetime fails this call instead of the detached task
        parse_token_expiry(&self.token_expires_in)?;

        let cleanup = self.clone();
        let owner = user.clone();
        tokio::spawn(async move {
            if let Err(e) = cleanup.clean_expired_tokens(&owner).await {
                tracing::error!(user_id = owner.id, error = %e, "Failed to prune expired refresh tokens");
            }
        });

        let record = self
            .store
            .create(NewRefreshToken {
                user_id: user.id,
                ip_address: request.ip.clone(),
            })
            .await?;

        tracing::info!(user_id = user.id, record_id = %record.id, "Refresh token record created");
        Ok(record)
    }
}
