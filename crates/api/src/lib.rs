//! Eventline API server library.

pub mod auth;
pub mod config;
pub mod error;
mod middleware;
mod routes;

use axum::extract::{DefaultBodyLimit, FromRef};
use axum::{Router, middleware as axum_middleware};
use eventline_core::config::CoreConfig;
use sqlx::PgPool;
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::middleware::rate_limit::{API_BURST_SIZE, API_PERIOD_MS, UserOrIpKeyExtractor};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub core: CoreConfig,
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for CoreConfig {
    fn from_ref(state: &AppState) -> Self {
        state.core.clone()
    }
}

/// Create the application router.
pub fn create_router(state: AppState, cors_origin: &str) -> Router {
    let cors = if cors_origin == "*" {
        CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
    } else if cors_origin == "mirror" {
        CorsLayer::new()
            .allow_origin(AllowOrigin::predicate(|_: &_, _: &_| true))
            .allow_methods(Any)
            .allow_headers(Any)
            .allow_credentials(true)
    } else {
        match cors_origin.parse::<axum::http::HeaderValue>() {
            Ok(origin) => CorsLayer::new().allow_origin(origin).allow_methods(Any).allow_headers(Any),
            Err(e) => {
                panic!("Invalid CORS origin configuration: {}", e);
            }
        }
    };

    // axum's `Multipart` extractor enforces its own 2 MiB default body
    // limit ahead of `ingestion::upload`'s explicit `MAX_UPLOAD_SIZE`
    // check, so raise it to match -- otherwise anything between 2 MiB and
    // `MAX_UPLOAD_SIZE` 413s before the handler's own check ever runs.
    let upload_body_limit = DefaultBodyLimit::max(state.core.max_upload_size as usize);

    let api_routes = routes::events::routes()
        .merge(routes::calendars::routes())
        .merge(routes::me::routes())
        .merge(routes::ingestion::routes().layer(upload_body_limit))
        .merge(routes::auth::routes())
        .merge(routes::ingestion::webhook_routes());

    Router::new()
        .merge(routes::health::routes())
        .nest(
            "/api",
            api_routes.layer(GovernorLayer::new(
                GovernorConfigBuilder::default()
                    .period(std::time::Duration::from_millis(API_PERIOD_MS))
                    .burst_size(API_BURST_SIZE)
                    .key_extractor(UserOrIpKeyExtractor)
                    .finish()
                    .expect("Failed to create API governor config"),
            )),
        )
        .layer(cors)
        .layer(axum_middleware::from_fn(
            crate::middleware::security_headers::security_headers,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    let remote_addr = request
                        .extensions()
                        .get::<axum::extract::ConnectInfo<std::net::SocketAddr>>()
                        .map(|ci| ci.0.to_string())
                        .unwrap_or_else(|| "unknown".into());

                    let user_agent = request
                        .headers()
                        .get(axum::http::header::USER_AGENT)
                        .and_then(|h| h.to_str().ok())
                        .unwrap_or("unknown");

                    let forwarded_for = request
                        .headers()
                        .get("x-forwarded-for")
                        .and_then(|h| h.to_str().ok());

                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        uri = %request.uri(),
                        version = ?request.version(),
                        remote_addr = %remote_addr,
                        forwarded_for = ?forwarded_for,
                        user_agent = %user_agent,
                    )
                })
                .on_request(|_request: &axum::http::Request<_>, _span: &tracing::Span| {
                    tracing::info!("started processing request");
                })
                .on_response(
                    |response: &axum::http::Response<_>, latency: std::time::Duration, _span: &tracing::Span| {
                        tracing::info!(
                            latency_ms = %latency.as_millis(),
                            status = %response.status(),
                            "finished processing request"
                        );
                    },
                ),
        )
        .with_state(state)
}

/// Run the API server. Blocks until it exits.
pub async fn run_api(state: AppState, host: &str, port: u16, cors_origin: &str) -> std::io::Result<()> {
    let app = create_router(state, cors_origin);
    let addr = format!("{host}:{port}");

    tracing::info!("API server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<std::net::SocketAddr>()).await
}
