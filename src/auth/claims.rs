/// JWT Claims structures
///
/// Refresh tokens carry the owning user and the id of the server-side record
/// that keeps them alive. Access tokens carry only the user id.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims embedded in a refresh token
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RefreshClaims {
    /// Owner of the token
    pub user_id: i64,
    /// Id of the `RefreshTokenRecord` backing this token
    pub secret: Uuid,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl RefreshClaims {
    pub fn new(user_id: i64, record_id: Uuid, lifetime: Duration) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            user_id,
            secret: record_id,
            iat: now,
            exp: now + lifetime.num_seconds(),
        }
    }
}

/// Claims for access tokens issued by the refresh endpoint
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AccessClaims {
    pub id: i64,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

impl AccessClaims {
    pub fn new(user_id: i64, expiry_seconds: i64, issuer: String) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            id: user_id,
            iat: now,
            exp: now + expiry_seconds,
            iss: issuer,
        }
    }
}
