// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the contact intake service.

use crate::config::Config;
use crate::limiter::RateLimitStore;
use crate::metrics::Metrics;
use crate::notifier::Notifier;
use crate::pipeline::{internal_error_response, ContactPipeline, UnreadableBody};
use crate::site::{robots_txt, sitemap_xml};
use crate::validator::ContactValidator;
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::any::Any;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::error;
use url::Url;

/// Shared application state.
pub struct AppState {
    pub pipeline: ContactPipeline,
    pub metrics: Metrics,
    pub site_url: Url,
    pub config: Config,
}

impl AppState {
    /// Wire the pipeline from configuration and injected collaborators.
    pub fn new(
        config: Config,
        limiter: Arc<dyn RateLimitStore>,
        notifier: Arc<dyn Notifier>,
    ) -> anyhow::Result<Self> {
        let metrics = Metrics::new()?;
        let site_url = Url::parse(&config.site.url)?;
        let pipeline = ContactPipeline::new(
            limiter,
            config.rate_limit.clone(),
            ContactValidator::new(config.validation.clone()),
            notifier,
            config.notifier.clone(),
            metrics.clone(),
        );

        Ok(Self {
            pipeline,
            metrics,
            site_url,
            config,
        })
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Build the service router.
pub fn router(state: Arc<AppState>) -> Router {
    let mut router = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/api/contact", post(contact))
        .route("/api/subscribe", post(subscribe))
        .route("/robots.txt", get(robots))
        .route("/sitemap.xml", get(sitemap));

    if state.config.metrics.enabled {
        router = router.route(&state.config.metrics.path, get(metrics));
    }

    router
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "contact-intake",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Contact form submission endpoint.
///
/// Body rejections (such as an oversized payload) are handed to the pipeline
/// so the request is still charged before it fails.
pub async fn contact(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    state
        .pipeline
        .handle_body(read_body(&body), &headers)
        .await
        .into_response()
}

/// Newsletter signup endpoint.
pub async fn subscribe(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    state
        .pipeline
        .handle_subscribe_body(read_body(&body), &headers)
        .await
        .into_response()
}

pub async fn robots(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        robots_txt(&state.site_url),
    )
}

pub async fn sitemap(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let today = chrono::Utc::now().date_naive();
    (
        [(header::CONTENT_TYPE, "application/xml; charset=utf-8")],
        sitemap_xml(&state.site_url, today),
    )
}

/// Prometheus scrape endpoint.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.metrics.render() {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(err) => {
            error!(error = %err, "Failed to render metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn read_body(body: &Result<Bytes, BytesRejection>) -> Result<&[u8], UnreadableBody> {
    body.as_deref()
        .map_err(|rejection| UnreadableBody(rejection.body_text()))
}

/// Panics surface as the same generic 500 body as any other fault.
fn handle_panic(_panic: Box<dyn Any + Send + 'static>) -> Response {
    error!("Handler panicked");
    internal_error_response().into_response()
}
