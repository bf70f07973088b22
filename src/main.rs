// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact Intake Service
//!
//! Accepts contact form submissions and newsletter signups for the landing
//! page, behind per-client rate limiting and a honeypot bot filter.
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables (a `.env` file in the
//! working directory is read first when present):
//!
//! - `BIND_ADDR`: Server bind address (default: 0.0.0.0:8080)
//! - `RATE_LIMIT_MAX_REQUESTS`: Requests per window per client (default: 5)
//! - `RATE_LIMIT_WINDOW_MS`: Window length in milliseconds (default: 60000)
//! - `RATE_LIMIT_SWEEP_THRESHOLD`: Store size that triggers cleanup (default: 10000)
//! - `NOTIFY_ON_SUBMIT`: Forward accepted submissions (default: true)
//! - `CONTACT_EMAIL`: Inbox for contact notifications
//! - `MAILCHIMP_API_KEY`, `MAILCHIMP_LIST_ID`, `MAILCHIMP_SERVER_PREFIX`
//! - `SITE_URL`: Canonical site URL for robots.txt and sitemap.xml
//! - `CORS_ALLOWED_ORIGIN`: Origin allowed to call the API cross-site
//! - `METRICS_ENABLED`: Expose Prometheus metrics (default: true)

use anyhow::Context;
use axum::http::{header, HeaderValue, Method};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use contact_intake::{
    config::{Config, CorsConfig},
    handlers::{router, AppState},
    limiter::InMemoryRateLimiter,
    notifier::notifier_from_config,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is normal in production.
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Load configuration
    let config = Config::from_env();
    config.validate().context("invalid configuration")?;
    info!(
        bind_addr = %config.bind_addr,
        max_requests = config.rate_limit.max_requests,
        window = ?config.rate_limit.window_duration(),
        sweep_threshold = config.rate_limit.sweep_threshold,
        site_url = %config.site.url,
        "Starting contact intake service"
    );

    // Rate limit state is process-local: it resets on restart and is not
    // shared between replicas.
    let limiter = Arc::new(InMemoryRateLimiter::new());
    let notifier = notifier_from_config(&config.notifier);
    let cors = cors_layer(&config.cors)?;

    let state = Arc::new(AppState::new(config.clone(), limiter, notifier)?);

    let mut app = router(state);
    if let Some(cors) = cors {
        app = app.layer(cors);
    }

    // Start server
    let addr: SocketAddr = config.bind_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Cross-origin access for the configured site origin, if any.
fn cors_layer(config: &CorsConfig) -> anyhow::Result<Option<CorsLayer>> {
    let Some(origin) = &config.allowed_origin else {
        return Ok(None);
    };
    let origin: HeaderValue = origin
        .parse()
        .with_context(|| format!("invalid CORS origin {origin}"))?;
    Ok(Some(
        CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::POST])
            .allow_headers([header::CONTENT_TYPE]),
    ))
}
