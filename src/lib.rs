//! Refresh token issuance and verification for actix-web applications.
//!
//! [`middleware::RefreshTokenMiddleware`] attaches refresh tokens to login
//! and OAuth callback responses and serves `POST /api/auth/local/refresh`;
//! [`service::RefreshTokenService`] keeps the backing records.

pub mod auth;
pub mod configuration;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod service;
pub mod startup;
pub mod telemetry;
