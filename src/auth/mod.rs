/// Authentication module
///
/// Refresh token claims, signing, lifetime parsing and record storage.

mod claims;
mod jwt;
mod memory_store;
mod refresh_token;
mod token_expiry;

pub use claims::{AccessClaims, RefreshClaims};
pub use jwt::{
    validate_access_token, AccessTokenIssuer, JwtAccessTokenIssuer, JwtTokenSigner, TokenSigner,
};
pub use memory_store::InMemoryRefreshTokenStore;
pub use refresh_token::{
    NewRefreshToken, PgRefreshTokenStore, RefreshTokenRecord, RefreshTokenStore,
};
pub use token_expiry::{calculate_expiration_threshold, cookie_max_age, parse_token_expiry};
