//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo. Each request body is collected up front and
//! handed to [`dispatch`], which runs the auth gate, the resource handler and
//! the CORS decoration synchronously.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE, ORIGIN, VARY,
};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::audit::AuditLog;
use crate::auth::{AccessPolicy, JwtValidator};
use crate::config::Args;
use crate::db::GardenDb;
use crate::routes::{
    self, error_response, route_not_found, FullBody, HandlerResult, RequestContext,
};
use crate::types::HortaError;

/// Shared application state
pub struct AppState {
    pub args: Args,
    /// Domain data
    pub db: GardenDb,
    pub jwt: JwtValidator,
    /// Fire-and-forget audit trail
    pub audit: AuditLog,
    /// Route table mode plus the admin and member allow-lists
    pub policy: AccessPolicy,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(args: Args, db: GardenDb, audit: AuditLog) -> Result<Self, HortaError> {
        let secret = args
            .jwt_secret()
            .ok_or_else(|| HortaError::Config("JWT secret not configured".to_string()))?;
        let jwt = JwtValidator::new(secret, args.jwt_expiry_seconds)?;
        let policy = AccessPolicy::from_args(&args);

        Ok(Self {
            args,
            db,
            jwt,
            audit,
            policy,
            started_at: Instant::now(),
        })
    }
}

pub async fn run(state: Arc<AppState>) -> Result<(), HortaError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!("Horta listening on {}", state.args.listen);

    if state.args.dev_mode {
        warn!("Development mode enabled - using the built-in JWT secret");
    }
    if !state.audit.is_enabled() {
        warn!("Audit sink not configured - audit records will be dropped");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<FullBody>, hyper::Error> {
    let (parts, body) = req.into_parts();
    let body = body.collect().await?.to_bytes();
    let method = parts.method.clone();
    let path = parts.uri.path().to_string();

    let response = dispatch(&state, Request::from_parts(parts, body));
    info!(
        "[{}] {} {} -> {}",
        addr,
        method,
        path,
        response.status().as_u16()
    );
    Ok(response)
}

/// Route one fully-read request
pub fn dispatch(state: &AppState, request: Request<Bytes>) -> Response<FullBody> {
    let origin = request
        .headers()
        .get(ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let mut response = if request.method() == Method::OPTIONS {
        preflight_response()
    } else {
        route(state, &request).unwrap_or_else(|err| {
            if err.status_code().is_server_error() {
                error!(path = %request.uri().path(), error = %err, "Request failed");
            } else {
                debug!(path = %request.uri().path(), error = %err, "Request rejected");
            }
            error_response(&err)
        })
    };

    apply_cors(&state.args, origin.as_deref(), &mut response);
    response
}

type Handler = fn(&RequestContext<'_>, &[&str]) -> HandlerResult;

fn route(state: &AppState, request: &Request<Bytes>) -> HandlerResult {
    let segments: Vec<&str> = request
        .uri()
        .path()
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();

    let Some((resource, params)) = segments.split_first() else {
        return Err(route_not_found());
    };

    let handler: Handler = match *resource {
        "health" => health,
        "login" => login,
        "usuarios" => routes::users::handle,
        "grupos" => routes::groups::handle,
        "hortas" => routes::gardens::handle,
        "produtos" => routes::products::handle,
        "parcelas" => routes::plots::handle,
        "eventos" => routes::events::handle,
        "participacoes" => routes::participations::handle,
        "cultivos" => routes::cultivations::handle,
        "colheitas" => routes::harvests::handle,
        _ => return Err(route_not_found()),
    };

    let access = state.policy.required_access(request.method(), &segments);
    let caller = routes::authorize(state, access, request.headers())?;

    let ctx = RequestContext {
        state,
        request,
        caller,
    };
    handler(&ctx, params)
}

fn health(ctx: &RequestContext<'_>, params: &[&str]) -> HandlerResult {
    match (ctx.method(), params) {
        (&Method::GET, []) => routes::health_check(ctx.state),
        _ => Err(route_not_found()),
    }
}

fn login(ctx: &RequestContext<'_>, params: &[&str]) -> HandlerResult {
    match (ctx.method(), params) {
        (&Method::POST, []) => routes::handle_login(ctx),
        _ => Err(route_not_found()),
    }
}

/// CORS preflight response
fn preflight_response() -> Response<FullBody> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::NO_CONTENT;

    let headers = response.headers_mut();
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Authorization"),
    );
    headers.insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static("600"));
    response
}

/// `*` when any origin is allowed, otherwise echo an allowed request origin
fn apply_cors(args: &Args, origin: Option<&str>, response: &mut Response<FullBody>) {
    let headers = response.headers_mut();

    if args.allows_any_origin() {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
        return;
    }

    if let Some(origin) = origin.filter(|o| args.allows_origin(o)) {
        if let Ok(value) = HeaderValue::from_str(origin) {
            headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, value);
            headers.insert(VARY, HeaderValue::from_static("Origin"));
        }
    }
}
