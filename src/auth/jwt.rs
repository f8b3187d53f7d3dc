/// JWT Token Signing and Validation
///
/// Two capabilities are injected into the interceptor:
/// - `TokenSigner` signs and verifies refresh tokens
/// - `AccessTokenIssuer` mints the short-lived access token handed out on refresh
///
/// Both ship with an HS256 implementation backed by `jsonwebtoken`.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::auth::claims::{AccessClaims, RefreshClaims};
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};

/// Signs and verifies refresh tokens
pub trait TokenSigner: Send + Sync {
    fn sign(&self, claims: &RefreshClaims) -> Result<String, AppError>;

    /// Verify signature and expiry, returning the embedded claims
    ///
    /// # Errors
    /// Returns `AuthError::TokenExpired` or `AuthError::TokenInvalid`
    fn verify(&self, token: &str) -> Result<RefreshClaims, AppError>;
}

/// Issues access tokens for a user id
pub trait AccessTokenIssuer: Send + Sync {
    fn issue(&self, user_id: i64) -> Result<String, AppError>;
}

/// HS256 refresh token signer keyed by `refresh_token_secret`
pub struct JwtTokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtTokenSigner {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

impl TokenSigner for JwtTokenSigner {
    fn sign(&self, claims: &RefreshClaims) -> Result<String, AppError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AppError::Auth(AuthError::SigningFailed(e.to_string())))
    }

    fn verify(&self, token: &str) -> Result<RefreshClaims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        decode::<RefreshClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("Refresh token verification error: {}", e);
                AppError::from(e)
            })
    }
}

/// HS256 access token issuer using the application's `JwtSettings`
pub struct JwtAccessTokenIssuer {
    config: JwtSettings,
}

impl JwtAccessTokenIssuer {
    pub fn new(config: JwtSettings) -> Self {
        Self { config }
    }
}

impl AccessTokenIssuer for JwtAccessTokenIssuer {
    fn issue(&self, user_id: i64) -> Result<String, AppError> {
        let claims = AccessClaims::new(
            user_id,
            self.config.access_token_expiry,
            self.config.issuer.clone(),
        );

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.secret.as_bytes()),
        )
        .map_err(|e| AppError::Auth(AuthError::SigningFailed(e.to_string())))
    }
}

/// Validate and extract claims from an access token
///
/// # Errors
/// Returns error if token is invalid, expired, or tampered with
pub fn validate_access_token(token: &str, config: &JwtSettings) -> Result<AccessClaims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[&config.issuer]);

    decode::<AccessClaims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::warn!("JWT validation error: {}", e);
        AppError::from(e)
    })
}
