//! # notekeep-api
//!
//! HTTP surface for notekeep: the `/api/notes` resource, `/health` and the
//! OpenAPI document.
//!
//! [`app`] assembles the router. Every failure leaves a handler as an
//! [`error::ApiError`], so status codes and error bodies are decided in one
//! place.

pub mod config;
pub mod envelope;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod openapi;
pub mod shutdown;
pub mod state;

use std::time::Duration;

use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method, Request, Uri},
    middleware,
    routing::{get, patch},
    Json, Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;

use crate::error::ApiError;
use crate::handlers::{health, notes};

pub use config::{Config, ConfigError, Environment, StoreBackend};
pub use state::AppState;

/// Largest accepted request body.
pub const BODY_LIMIT_BYTES: usize = 10 * 1024 * 1024;

/// Request ID generator using UUIDv7 (time-ordered).
#[derive(Clone, Copy)]
pub struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = uuid::Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

/// Build the application router.
pub fn app(state: AppState, allowed_origins: Vec<HeaderValue>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600));

    Router::new()
        .route(
            "/health",
            get(health::health_check).fallback(route_not_found),
        )
        .route(
            "/openapi.json",
            get(openapi_json).fallback(route_not_found),
        )
        .route(
            "/api/notes",
            get(notes::list_notes)
                .post(notes::create_note)
                .fallback(route_not_found),
        )
        .route(
            "/api/notes/search",
            get(notes::search_notes).fallback(route_not_found),
        )
        .route(
            "/api/notes/:id",
            get(notes::get_note)
                .put(notes::update_note)
                .delete(notes::delete_note)
                .fallback(route_not_found),
        )
        .route(
            "/api/notes/:id/archive",
            patch(notes::toggle_archive).fallback(route_not_found),
        )
        .fallback(route_not_found)
        .layer(CatchPanicLayer::custom(error::panic_response))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            error::report_errors,
        ))
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            let request_id = request
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-");
            tracing::info_span!(
                "request",
                method = %request.method(),
                path = %request.uri().path(),
                request_id = %request_id,
            )
        }))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(cors)
        .with_state(state)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(openapi::ApiDoc::openapi())
}

/// Unknown paths and unsupported methods on known paths.
async fn route_not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("Route {} not found", uri.path()))
}
