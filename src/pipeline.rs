// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Submission pipeline for the contact and newsletter endpoints.
//!
//! A contact submission passes, in order:
//! 1. client identification from proxy headers
//! 2. fixed-window rate limiting
//! 3. body buffering and JSON decoding
//! 4. honeypot check (bots get a normal-looking success)
//! 5. field validation
//! 6. audit logging and notification
//!
//! Every failure is folded into one of four public outcomes here; internal
//! detail only reaches the logs.

use crate::config::{NotifierConfig, RateLimitConfig};
use crate::identifier::{client_identifier, HeaderSource};
use crate::limiter::{RateLimitResult, RateLimitStore};
use crate::metrics::{Metrics, Outcome};
use crate::notifier::{retry_with_backoff, Notifier, NotifyError};
use crate::validator::{ContactSubmission, ContactValidator, ValidationError, ValidationResult};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Tracing target for operator-facing audit events.
pub const AUDIT_TARGET: &str = "contact_intake::audit";

pub const CONTACT_SUCCESS_MESSAGE: &str = "Thank you for your message! We will get back to you soon.";
pub const BOT_SUCCESS_MESSAGE: &str = "Thank you for your message!";
pub const RATE_LIMITED_MESSAGE: &str = "Too many requests";
pub const RATE_LIMITED_ERROR: &str = "Please wait before submitting again";
pub const VALIDATION_FAILED_MESSAGE: &str = "Validation failed";
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";
pub const INTERNAL_ERROR_DETAIL: &str = "Something went wrong. Please try again later.";
pub const SUBSCRIBE_FAILED_MESSAGE: &str = "Failed to subscribe";

/// Key namespace keeping newsletter signups out of the contact windows.
const SUBSCRIBE_KEY_PREFIX: &str = "subscribe:";

/// JSON body returned by both endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ContactResponse {
    fn ok(message: &str) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            error: None,
        }
    }

    fn failed(message: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.to_string(),
            error: Some(error.into()),
        }
    }
}

/// Values for the `X-RateLimit-*` response headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitHeaders {
    pub limit: u32,
    pub remaining: u32,
    pub reset: u64,
}

impl RateLimitHeaders {
    pub const LIMIT: &'static str = "x-ratelimit-limit";
    pub const REMAINING: &'static str = "x-ratelimit-remaining";
    pub const RESET: &'static str = "x-ratelimit-reset";

    fn pairs(&self) -> [(HeaderName, HeaderValue); 3] {
        [
            (HeaderName::from_static(Self::LIMIT), HeaderValue::from(self.limit)),
            (
                HeaderName::from_static(Self::REMAINING),
                HeaderValue::from(self.remaining),
            ),
            (HeaderName::from_static(Self::RESET), HeaderValue::from(self.reset)),
        ]
    }
}

/// Status, body and rate-limit metadata for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineResponse {
    pub status: StatusCode,
    pub body: ContactResponse,
    pub rate_limit: Option<RateLimitHeaders>,
}

impl IntoResponse for PipelineResponse {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.body)).into_response();
        if let Some(rate_limit) = self.rate_limit {
            let headers = response.headers_mut();
            for (name, value) in rate_limit.pairs() {
                headers.insert(name, value);
            }
        }
        response
    }
}

/// Why a request did not reach acceptance.
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("rate limit exceeded, resets at {reset_time}")]
    RateLimitExceeded { reset_time: u64 },

    #[error("validation failed: {0}")]
    ValidationFailed(ValidationError),

    #[error(transparent)]
    UnreadableBody(#[from] UnreadableBody),

    #[error("malformed request body: {0}")]
    MalformedRequest(#[from] serde_json::Error),

    #[error("mailing list provider failed: {0}")]
    Upstream(#[from] NotifyError),

    #[error("internal fault: {0}")]
    Internal(String),
}

/// The transport failed to hand over the request body, e.g. it exceeded the
/// size limit. Surfaced only after the request has been charged.
#[derive(Debug, Error)]
#[error("request body unreadable: {0}")]
pub struct UnreadableBody(pub String);

/// A request that made it through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Accepted {
    /// Validated, logged and handed to the notifier
    Delivered {
        remaining: u32,
        reset_time: u64,
        submission: ContactSubmission,
    },
    /// Honeypot tripped; answered as if delivered, nothing forwarded
    Absorbed,
}

/// Orders the checks for both intake endpoints.
pub struct ContactPipeline {
    limiter: Arc<dyn RateLimitStore>,
    rate_limit: RateLimitConfig,
    validator: ContactValidator,
    notifier: Arc<dyn Notifier>,
    notifier_config: NotifierConfig,
    metrics: Metrics,
}

impl ContactPipeline {
    pub fn new(
        limiter: Arc<dyn RateLimitStore>,
        rate_limit: RateLimitConfig,
        validator: ContactValidator,
        notifier: Arc<dyn Notifier>,
        notifier_config: NotifierConfig,
        metrics: Metrics,
    ) -> Self {
        Self {
            limiter,
            rate_limit,
            validator,
            notifier,
            notifier_config,
            metrics,
        }
    }

    /// Run a contact submission through the pipeline and build the response.
    pub async fn handle<H>(&self, raw_body: &[u8], headers: &H) -> PipelineResponse
    where
        H: HeaderSource + Sync + ?Sized,
    {
        self.handle_body(Ok(raw_body), headers).await
    }

    /// Like [`handle`](Self::handle), for a body the transport may have
    /// failed to read.
    pub async fn handle_body<H>(
        &self,
        body: Result<&[u8], UnreadableBody>,
        headers: &H,
    ) -> PipelineResponse
    where
        H: HeaderSource + Sync + ?Sized,
    {
        let client_id = client_identifier(headers);

        match self.process(&client_id, body).await {
            Ok(Accepted::Delivered {
                remaining,
                reset_time,
                ..
            }) => {
                self.metrics.record_submission(Outcome::Accepted);
                PipelineResponse {
                    status: StatusCode::OK,
                    body: ContactResponse::ok(CONTACT_SUCCESS_MESSAGE),
                    rate_limit: Some(self.headers(remaining, reset_time)),
                }
            }
            Ok(Accepted::Absorbed) => {
                self.metrics.record_submission(Outcome::BotAbsorbed);
                PipelineResponse {
                    status: StatusCode::OK,
                    body: ContactResponse::ok(BOT_SUCCESS_MESSAGE),
                    rate_limit: None,
                }
            }
            Err(err) => {
                let (outcome, response) = self.error_response(&client_id, err);
                self.metrics.record_submission(outcome);
                response
            }
        }
    }

    /// Apply the ordered contact checks for an already identified client.
    pub async fn process(
        &self,
        client_id: &str,
        body: Result<&[u8], UnreadableBody>,
    ) -> Result<Accepted, SubmissionError> {
        let (remaining, reset_time) = self.charge(client_id).await?;

        let body = decode(body)?;

        if let Some(honeypot) = honeypot_value(&body) {
            warn!(
                target: AUDIT_TARGET,
                client_id,
                honeypot = %honeypot,
                "Bot detected - honeypot field filled"
            );
            return Ok(Accepted::Absorbed);
        }

        let submission = match self.validator.validate(&body) {
            ValidationResult::Valid(submission) => submission,
            ValidationResult::Invalid(errors) => {
                let first = errors
                    .into_iter()
                    .next()
                    .ok_or_else(|| SubmissionError::Internal("validator returned no errors".to_string()))?;
                return Err(SubmissionError::ValidationFailed(first));
            }
        };

        info!(
            target: AUDIT_TARGET,
            client_id,
            name = %submission.name,
            email = %submission.email,
            company = ?submission.company,
            message = %submission.message,
            "Contact form submission"
        );

        if self.notifier_config.notify_on_submit {
            self.notify(&submission).await;
        }

        Ok(Accepted::Delivered {
            remaining,
            reset_time,
            submission,
        })
    }

    /// Newsletter signup: rate limit, email check, mailing-list call.
    pub async fn handle_subscribe<H>(&self, raw_body: &[u8], headers: &H) -> PipelineResponse
    where
        H: HeaderSource + Sync + ?Sized,
    {
        self.handle_subscribe_body(Ok(raw_body), headers).await
    }

    pub async fn handle_subscribe_body<H>(
        &self,
        body: Result<&[u8], UnreadableBody>,
        headers: &H,
    ) -> PipelineResponse
    where
        H: HeaderSource + Sync + ?Sized,
    {
        let client_id = client_identifier(headers);

        let result = async {
            let key = format!("{SUBSCRIBE_KEY_PREFIX}{client_id}");
            let (remaining, reset_time) = self.charge(&key).await?;
            let body = decode(body)?;
            let email = self
                .validator
                .validate_email(body.get("email"))
                .map_err(SubmissionError::ValidationFailed)?;
            let subscription = self.notifier.add_to_mailing_list(email).await?;
            info!(target: AUDIT_TARGET, client_id = %client_id, ?subscription, "Newsletter signup");
            Ok::<_, SubmissionError>((subscription, remaining, reset_time))
        }
        .await;

        match result {
            Ok((subscription, remaining, reset_time)) => {
                self.metrics.record_subscription(Outcome::Accepted);
                PipelineResponse {
                    status: StatusCode::OK,
                    body: ContactResponse::ok(subscription.message()),
                    rate_limit: Some(self.headers(remaining, reset_time)),
                }
            }
            Err(err) => {
                let (outcome, response) = self.error_response(&client_id, err);
                self.metrics.record_subscription(outcome);
                response
            }
        }
    }

    /// Charge one request to `key`, returning remaining quota and reset time.
    async fn charge(&self, key: &str) -> Result<(u32, u64), SubmissionError> {
        match self.limiter.check(key, &self.rate_limit).await {
            RateLimitResult::Allowed {
                remaining,
                reset_time,
            } => Ok((remaining, reset_time)),
            RateLimitResult::Limited { reset_time } => {
                Err(SubmissionError::RateLimitExceeded { reset_time })
            }
        }
    }

    async fn notify(&self, submission: &ContactSubmission) {
        let notifier = &self.notifier;
        let result = retry_with_backoff(
            self.notifier_config.retry_attempts,
            self.notifier_config.retry_base_delay(),
            move || notifier.send_contact_email(submission),
        )
        .await;

        match result {
            Ok(()) => debug!("Contact notification sent"),
            // The submission is already logged; a failed notification does
            // not change what the client is told.
            Err(err) => warn!(error = %err, "Contact notification failed"),
        }
    }

    fn headers(&self, remaining: u32, reset: u64) -> RateLimitHeaders {
        RateLimitHeaders {
            limit: self.rate_limit.max_requests,
            remaining,
            reset,
        }
    }

    fn error_response(&self, client_id: &str, err: SubmissionError) -> (Outcome, PipelineResponse) {
        match err {
            SubmissionError::RateLimitExceeded { reset_time } => {
                info!(client_id, reset_time, "Request rate limited");
                (
                    Outcome::RateLimited,
                    PipelineResponse {
                        status: StatusCode::TOO_MANY_REQUESTS,
                        body: ContactResponse::failed(RATE_LIMITED_MESSAGE, RATE_LIMITED_ERROR),
                        rate_limit: Some(self.headers(0, reset_time)),
                    },
                )
            }
            SubmissionError::ValidationFailed(validation) => {
                info!(client_id, error = %validation, "Validation failed");
                (
                    Outcome::Invalid,
                    PipelineResponse {
                        status: StatusCode::BAD_REQUEST,
                        body: ContactResponse::failed(
                            VALIDATION_FAILED_MESSAGE,
                            validation.to_string(),
                        ),
                        rate_limit: None,
                    },
                )
            }
            SubmissionError::Upstream(upstream) => {
                error!(client_id, error = %upstream, "Mailing list provider failed");
                (
                    Outcome::UpstreamFailed,
                    PipelineResponse {
                        status: StatusCode::BAD_GATEWAY,
                        body: ContactResponse::failed(SUBSCRIBE_FAILED_MESSAGE, INTERNAL_ERROR_DETAIL),
                        rate_limit: None,
                    },
                )
            }
            err @ (SubmissionError::UnreadableBody(_)
            | SubmissionError::MalformedRequest(_)
            | SubmissionError::Internal(_)) => {
                error!(client_id, error = %err, "Contact form submission error");
                (Outcome::InternalError, internal_error_response())
            }
        }
    }
}

/// Generic 500 outcome; carries no detail about the fault.
pub fn internal_error_response() -> PipelineResponse {
    PipelineResponse {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: ContactResponse::failed(INTERNAL_ERROR_MESSAGE, INTERNAL_ERROR_DETAIL),
        rate_limit: None,
    }
}

/// Decode a JSON request body. A bare `null` is a fault, not a form.
fn decode(body: Result<&[u8], UnreadableBody>) -> Result<Value, SubmissionError> {
    let value: Value = serde_json::from_slice(body?)?;
    if value.is_null() {
        return Err(SubmissionError::Internal("request body is null".to_string()));
    }
    Ok(value)
}

/// The honeypot value when a bot has filled it in.
///
/// Absent, null, `false`, zero and blank strings are clean; any other value
/// counts as filled.
fn honeypot_value(body: &Value) -> Option<&Value> {
    match body.get("honeypot")? {
        Value::Null | Value::Bool(false) => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::String(s) if s.trim().is_empty() => None,
        other => Some(other),
    }
}
