// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact Intake
//!
//! Server side of the landing page contact form:
//!
//! - Client identification from proxy headers
//! - Fixed-window rate limiting (5 requests per minute default)
//! - Honeypot bot detection with silent success
//! - Field validation with first-error reporting
//! - Notification and newsletter signup via Mailchimp
//! - robots.txt and sitemap.xml for crawlers

pub mod config;
pub mod handlers;
pub mod identifier;
pub mod limiter;
pub mod metrics;
pub mod notifier;
pub mod pipeline;
pub mod site;
pub mod validator;

pub use config::Config;
pub use handlers::{router, AppState};
pub use limiter::{InMemoryRateLimiter, RateLimitResult, RateLimitStore};
pub use pipeline::{ContactPipeline, PipelineResponse};
pub use validator::{ContactSubmission, ContactValidator, ValidationResult};
