/// Middleware module
///
/// The refresh token interceptor and the cookie it may set.

mod cookie;
mod refresh_middleware;

pub use cookie::{build_refresh_cookie, REFRESH_COOKIE};
pub use refresh_middleware::{
    InterceptedRoute, RefreshTokenMiddleware, RefreshTokenMiddlewareService, INVALID_TOKEN,
    LOGIN_PATH, OAUTH_PROVIDERS, REFRESH_PATH,
};
