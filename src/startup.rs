use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::{JwtAccessTokenIssuer, RefreshTokenStore};
use crate::configuration::Settings;
use crate::middleware::RefreshTokenMiddleware;
use crate::routes::health_check;

/// Build the interceptor from loaded settings and a record store
pub fn build_middleware(
    settings: &Settings,
    store: Arc<dyn RefreshTokenStore>,
) -> RefreshTokenMiddleware {
    let issuer = Arc::new(JwtAccessTokenIssuer::new(settings.jwt.clone()));

    RefreshTokenMiddleware::new(
        settings.refresh_token.clone(),
        settings.environment.clone(),
        store,
        issuer,
    )
}

/// Serve the refresh endpoint on `listener`
///
/// Login and OAuth routes belong to the host application; mount them inside
/// the same `App` to have refresh tokens attached to their responses.
pub fn run(
    listener: TcpListener,
    refresh_middleware: RefreshTokenMiddleware,
) -> Result<Server, std::io::Error> {
    let server = HttpServer::new(move || {
        App::new()
            .wrap(refresh_middleware.clone())
            .wrap(Logger::default())
            .route("/health_check", web::get().to(health_check))
    })
    .listen(listener)?
    .run();

    Ok(server)
}
