use actix_web::cookie::{time::Duration as CookieDuration, Cookie};

use crate::configuration::EnvironmentSettings;

/// Name of the cookie carrying the refresh token
pub const REFRESH_COOKIE: &str = "refreshToken";

/// HTTP-only refresh cookie; `Secure` and `Domain` follow the environment
pub fn build_refresh_cookie(
    token: String,
    max_age_ms: i64,
    environment: &EnvironmentSettings,
) -> Cookie<'static> {
    Cookie::build(REFRESH_COOKIE, token)
        .http_only(true)
        .secure(environment.is_production())
        .max_age(CookieDuration::milliseconds(max_age_ms))
        .domain(environment.cookie_domain())
        .path("/")
        .finish()
}
