/// Refresh Token Middleware
///
/// Runs the wrapped service first and then looks at what came back:
/// - successful logins and OAuth callbacks get a refresh token attached
///   (JSON body field or cookie)
/// - `POST /api/auth/local/refresh` exchanges a refresh token for a new
///   access token, or answers `401 {"error": "Invalid Token"}`
///
/// Everything else passes through untouched.

use actix_web::{
    body::{self, BoxBody, MessageBody},
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    error::ErrorInternalServerError,
    http::{header, Method, StatusCode},
    web, Error, HttpRequest, HttpResponse,
};
use futures::future::LocalBoxFuture;
use serde::Deserialize;
use serde_json::{json, Value};
use std::rc::Rc;
use std::sync::Arc;

use crate::auth::{
    cookie_max_age, parse_token_expiry, AccessTokenIssuer, JwtTokenSigner, RefreshClaims,
    RefreshTokenStore, TokenSigner,
};
use crate::configuration::{EnvironmentSettings, RefreshTokenSettings};
use crate::error::{AppError, AuthError, ErrorContext};
use crate::middleware::cookie::build_refresh_cookie;
use crate::service::{AuthUser, RefreshTokenService, RequestMeta};

pub const LOGIN_PATH: &str = "/api/auth/local";
pub const REFRESH_PATH: &str = "/api/auth/local/refresh";
pub const OAUTH_PROVIDERS: [&str; 3] = ["google", "facebook", "apple"];

/// Body of every rejected refresh attempt
pub const INVALID_TOKEN: &str = "Invalid Token";

/// Which intercepted endpoint a request targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterceptedRoute {
    Login,
    OAuthCallback,
    Refresh,
    PassThrough,
}

impl InterceptedRoute {
    pub fn classify(method: &Method, path: &str) -> Self {
        if *method == Method::POST && path == LOGIN_PATH {
            InterceptedRoute::Login
        } else if *method == Method::POST && path == REFRESH_PATH {
            InterceptedRoute::Refresh
        } else if *method == Method::GET && is_oauth_callback(path) {
            InterceptedRoute::OAuthCallback
        } else {
            InterceptedRoute::PassThrough
        }
    }
}

fn is_oauth_callback(path: &str) -> bool {
    OAUTH_PROVIDERS
        .iter()
        .any(|provider| path.ends_with(&format!("/api/auth/{}/callback", provider)))
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest {
    #[serde(default)]
    refresh_token: Value,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RefreshOptIn {
    #[serde(default)]
    request_refresh: Value,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct QueryOptIn {
    request_refresh: Option<String>,
}

/// What the refresh endpoint received in `refreshToken`
#[derive(Debug, PartialEq)]
enum PresentedToken {
    Absent,
    Token(String),
    Malformed,
}

impl PresentedToken {
    fn from_body(body: &[u8]) -> Self {
        let value = match serde_json::from_slice::<RefreshRequest>(body) {
            Ok(request) => request.refresh_token,
            Err(_) => return PresentedToken::Absent,
        };
        match value {
            Value::Null => PresentedToken::Absent,
            Value::String(token) if token.is_empty() => PresentedToken::Absent,
            Value::String(token) => PresentedToken::Token(token),
            _ => PresentedToken::Malformed,
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(n) => n.as_f64().map_or(false, |n| n != 0.0),
        Value::String(s) => is_truthy_str(s),
        Value::Array(_) | Value::Object(_) => true,
    }
}

// Query strings only carry text, so the literal "false" and "0" opt out
fn is_truthy_str(s: &str) -> bool {
    !matches!(s, "" | "false" | "0")
}

/// Everything the interceptor needs, shared by all workers
struct RefreshTokenState {
    settings: RefreshTokenSettings,
    environment: EnvironmentSettings,
    service: RefreshTokenService,
    signer: Arc<dyn TokenSigner>,
    issuer: Arc<dyn AccessTokenIssuer>,
}

/// Refresh token interceptor
///
/// Wrap it around the app (or the scope) serving the auth routes.
#[derive(Clone)]
pub struct RefreshTokenMiddleware {
    state: Arc<RefreshTokenState>,
}

impl RefreshTokenMiddleware {
    /// Build the interceptor with an HS256 signer keyed by `refresh_token_secret`
    pub fn new(
        settings: RefreshTokenSettings,
        environment: EnvironmentSettings,
        store: Arc<dyn RefreshTokenStore>,
        issuer: Arc<dyn AccessTokenIssuer>,
    ) -> Self {
        let signer = Arc::new(JwtTokenSigner::new(&settings.refresh_token_secret));
        let service = RefreshTokenService::new(store, settings.refresh_token_expires_in.clone());

        Self {
            state: Arc::new(RefreshTokenState {
                settings,
                environment,
                service,
                signer,
                issuer,
            }),
        }
    }

    /// Replace the refresh token signer
    pub fn with_signer(self, signer: Arc<dyn TokenSigner>) -> Self {
        let state = RefreshTokenState {
            settings: self.state.settings.clone(),
            environment: self.state.environment.clone(),
            service: self.state.service.clone(),
            signer,
            issuer: self.state.issuer.clone(),
        };
        Self {
            state: Arc::new(state),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RefreshTokenMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type InitError = ();
    type Transform = RefreshTokenMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(RefreshTokenMiddlewareService {
            service: Rc::new(service),
            state: self.state.clone(),
        }))
    }
}

pub struct RefreshTokenMiddlewareService<S> {
    service: Rc<S>,
    state: Arc<RefreshTokenState>,
}

impl<S, B> Service<ServiceRequest> for RefreshTokenMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let state = self.state.clone();

        Box::pin(async move {
            let route = InterceptedRoute::classify(req.method(), req.path());

            let request_body = match route {
                InterceptedRoute::Login | InterceptedRoute::Refresh => {
                    Some(buffer_request_body(&mut req).await?)
                }
                _ => None,
            };
            let query_opt_in = match route {
                InterceptedRoute::OAuthCallback => {
                    web::Query::<QueryOptIn>::from_query(req.query_string())
                        .ok()
                        .and_then(|q| q.into_inner().request_refresh)
                        .map_or(false, |flag| is_truthy_str(&flag))
                }
                _ => false,
            };

            let res = service.call(req).await?;

            match route {
                InterceptedRoute::Login => {
                    let opt_in = request_body
                        .as_deref()
                        .map(body_requests_refresh)
                        .unwrap_or(false);
                    state.attach_refresh_token(res, opt_in).await
                }
                InterceptedRoute::OAuthCallback => state.attach_refresh_token(res, query_opt_in).await,
                InterceptedRoute::Refresh => {
                    state
                        .exchange_refresh_token(res, request_body.as_deref().unwrap_or_default())
                        .await
                }
                InterceptedRoute::PassThrough => Ok(res.map_into_boxed_body()),
            }
        })
    }
}

/// Read the request body and put it back for the wrapped handler
async fn buffer_request_body(req: &mut ServiceRequest) -> Result<web::Bytes, Error> {
    let body = req.extract::<web::Bytes>().await?;
    req.set_payload(Payload::from(body.clone()));
    Ok(body)
}

fn body_requests_refresh(body: &[u8]) -> bool {
    serde_json::from_slice::<RefreshOptIn>(body)
        .map(|b| is_truthy(&b.request_refresh))
        .unwrap_or(false)
}

fn client_ip(req: &HttpRequest) -> Option<String> {
    req.connection_info().realip_remote_addr().map(str::to_string)
}

impl RefreshTokenState {
    /// Login / OAuth callback: mint a refresh token for the returned user
    async fn attach_refresh_token<B>(
        &self,
        res: ServiceResponse<B>,
        opt_in: bool,
    ) -> Result<ServiceResponse<BoxBody>, Error>
    where
        B: MessageBody + 'static,
    {
        let requested = opt_in || self.settings.request_refresh_on_all;
        if res.status() != StatusCode::OK || !requested {
            return Ok(res.map_into_boxed_body());
        }

        let (http_req, http_res) = res.into_parts();
        let (head, response_body) = http_res.into_parts();
        let bytes = body::to_bytes(response_body).await.map_err(|e| {
            let e: Box<dyn std::error::Error> = e.into();
            ErrorInternalServerError(e.to_string())
        })?;

        let mut payload = match serde_json::from_slice::<Value>(&bytes) {
            Ok(value @ Value::Object(_)) => value,
            _ => {
                return Ok(ServiceResponse::new(
                    http_req,
                    head.set_body(bytes).map_into_boxed_body(),
                ))
            }
        };

        let user = match payload.get("user").cloned().map(serde_json::from_value::<AuthUser>) {
            Some(Ok(user)) => user,
            _ => {
                tracing::debug!(path = %http_req.path(), "Login response carries no user id");
                return Ok(ServiceResponse::new(
                    http_req,
                    head.set_body(bytes).map_into_boxed_body(),
                ));
            }
        };

        let context = ErrorContext::new("refresh_token_issue").with_user_id(user.id.to_string());
        let token = match self.issue_refresh_token(&user, &http_req).await {
            Ok(token) => token,
            Err(e) => {
                context.log_error(&e);
                return Err(e.into());
            }
        };

        let mut response = if self.settings.cookie_response {
            let max_age = cookie_max_age(&self.settings.refresh_token_expires_in)?;
            let cookie = build_refresh_cookie(token, max_age, &self.environment);
            let mut response = head.set_body(bytes);
            response
                .add_cookie(&cookie)
                .map_err(ErrorInternalServerError)?;
            response
        } else {
            if let Value::Object(map) = &mut payload {
                map.insert("refreshToken".to_string(), Value::String(token));
            }
            let body = serde_json::to_vec(&payload).map_err(ErrorInternalServerError)?;
            head.set_body(web::Bytes::from(body))
        };
        response.headers_mut().remove(header::CONTENT_LENGTH);

        tracing::info!(
            request_id = %context.request_id,
            user_id = user.id,
            cookie = self.settings.cookie_response,
            "Refresh token issued"
        );

        Ok(ServiceResponse::new(http_req, response.map_into_boxed_body()))
    }

    async fn issue_refresh_token(
        &self,
        user: &AuthUser,
        req: &HttpRequest,
    ) -> Result<String, AppError> {
        let meta = RequestMeta { ip: client_ip(req) };
        let record = self.service.create(user, &meta).await?;
        let lifetime = parse_token_expiry(&self.settings.refresh_token_expires_in)?;
        let claims = RefreshClaims::new(user.id, record.id, lifetime);
        self.signer.sign(&claims)
    }

    /// Refresh endpoint: `{jwt}` for a live token, 401 otherwise
    async fn exchange_refresh_token<B>(
        &self,
        res: ServiceResponse<B>,
        request_body: &[u8],
    ) -> Result<ServiceResponse<BoxBody>, Error>
    where
        B: MessageBody + 'static,
    {
        let presented = PresentedToken::from_body(request_body);
        if presented == PresentedToken::Absent {
            return Ok(res.map_into_boxed_body());
        }

        let context = ErrorContext::new("token_refresh");
        let outcome = match presented {
            PresentedToken::Token(token) => self.access_token_for(&token).await,
            _ => Err(AuthError::TokenInvalid.into()),
        };
        let response = match outcome {
            Ok((user_id, jwt)) => {
                tracing::info!(
                    request_id = %context.request_id,
                    user_id = user_id,
                    "Access token refreshed"
                );
                HttpResponse::Ok().json(json!({ "jwt": jwt }))
            }
            Err(e) => {
                context.log_error(&e);
                HttpResponse::Unauthorized().json(json!({ "error": INVALID_TOKEN }))
            }
        };

        let (http_req, _) = res.into_parts();
        Ok(ServiceResponse::new(http_req, response))
    }

    async fn access_token_for(&self, token: &str) -> Result<(i64, String), AppError> {
        let claims = self.signer.verify(token)?;

        match self.service.store().find_by_id(claims.secret).await? {
            Some(_) => Ok((claims.user_id, self.issuer.issue(claims.user_id)?)),
            None => Err(AuthError::TokenRevoked.into()),
        }
    }
}
