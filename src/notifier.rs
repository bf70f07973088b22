// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Notification adapters for accepted submissions and newsletter signups.

use crate::config::NotifierConfig;
use crate::validator::ContactSubmission;
use async_trait::async_trait;
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Notification failures.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("email service not configured: missing API credentials")]
    NotConfigured,

    #[error("provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider rejected request: {0}")]
    Rejected(String),
}

/// Outcome of a mailing-list signup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subscription {
    Subscribed,
    AlreadySubscribed,
}

impl Subscription {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Subscribed => "Successfully subscribed to mailing list",
            Self::AlreadySubscribed => "Email already subscribed",
        }
    }
}

/// Delivery channel for contact submissions and newsletter signups.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_contact_email(&self, submission: &ContactSubmission) -> Result<(), NotifyError>;

    async fn add_to_mailing_list(&self, email: &str) -> Result<Subscription, NotifyError>;
}

/// Pick the Mailchimp adapter when credentials are present, the mock otherwise.
pub fn notifier_from_config(config: &NotifierConfig) -> Arc<dyn Notifier> {
    match (&config.mailchimp_api_key, &config.mailchimp_list_id) {
        (Some(api_key), Some(list_id)) => Arc::new(MailchimpNotifier::new(
            api_key.clone(),
            list_id.clone(),
            config.mailchimp_server_prefix.clone(),
            config.contact_email.clone(),
        )),
        _ => {
            info!("Mailchimp credentials not configured, using mock notifier");
            Arc::new(MockNotifier)
        }
    }
}

/// Mailchimp marketing API client.
pub struct MailchimpNotifier {
    client: reqwest::Client,
    api_key: String,
    list_id: String,
    server_prefix: String,
    contact_email: Option<String>,
}

/// Error document returned by the Mailchimp API.
#[derive(Debug, Default, Deserialize)]
struct MailchimpError {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

impl MailchimpNotifier {
    pub fn new(
        api_key: String,
        list_id: String,
        server_prefix: String,
        contact_email: Option<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            list_id,
            server_prefix,
            contact_email,
        }
    }

    fn members_url(&self) -> String {
        format!(
            "https://{}.api.mailchimp.com/3.0/lists/{}/members",
            self.server_prefix, self.list_id
        )
    }
}

#[async_trait]
impl Notifier for MailchimpNotifier {
    async fn send_contact_email(&self, submission: &ContactSubmission) -> Result<(), NotifyError> {
        // Transactional delivery is handled outside this service; the
        // rendered message is logged for the operator inbox relay.
        info!(
            to = self.contact_email.as_deref().unwrap_or("unset"),
            subject = %format!("New contact form submission from {}", submission.name),
            body = %render_contact_email(submission),
            "Sending contact email"
        );
        Ok(())
    }

    async fn add_to_mailing_list(&self, email: &str) -> Result<Subscription, NotifyError> {
        if self.api_key.is_empty() || self.list_id.is_empty() {
            warn!("Mailchimp credentials not configured");
            return Err(NotifyError::NotConfigured);
        }

        let response = self
            .client
            .post(self.members_url())
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "email_address": email,
                "status": "subscribed",
            }))
            .send()
            .await?;

        if response.status().is_success() {
            debug!("Mailing list member added");
            return Ok(Subscription::Subscribed);
        }

        let status = response.status();
        let error: MailchimpError = response.json().await.unwrap_or_default();
        interpret_mailchimp_error(status.as_u16(), error)
    }
}

fn interpret_mailchimp_error(status: u16, error: MailchimpError) -> Result<Subscription, NotifyError> {
    if error.title.as_deref() == Some("Member Exists") {
        return Ok(Subscription::AlreadySubscribed);
    }
    let detail = error
        .detail
        .unwrap_or_else(|| format!("unexpected status {status}"));
    warn!(status, detail = %detail, "Mailchimp rejected subscription");
    Err(NotifyError::Rejected(detail))
}

/// Plain-text body for a contact notification.
pub fn render_contact_email(submission: &ContactSubmission) -> String {
    format!(
        "Name: {}\nEmail: {}\nCompany: {}\nMessage: {}",
        submission.name,
        submission.email,
        submission.company.as_deref().unwrap_or("N/A"),
        submission.message
    )
}

/// Development notifier that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct MockNotifier;

#[async_trait]
impl Notifier for MockNotifier {
    async fn send_contact_email(&self, submission: &ContactSubmission) -> Result<(), NotifyError> {
        info!(
            name = %submission.name,
            email = %submission.email,
            "Mock notifier: contact email"
        );
        Ok(())
    }

    async fn add_to_mailing_list(&self, email: &str) -> Result<Subscription, NotifyError> {
        info!(email, "Mock notifier: mailing list signup");
        Ok(Subscription::Subscribed)
    }
}

/// Retry `op` up to `max_attempts` times, doubling the delay after each
/// failure starting from `base_delay`. Returns the last error.
pub async fn retry_with_backoff<T, E, F, Fut>(
    max_attempts: u32,
    base_delay: Duration,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                attempt += 1;
                if attempt >= max_attempts {
                    return Err(err);
                }
                let delay = base_delay.saturating_mul(1 << (attempt - 1).min(16));
                debug!(attempt, ?delay, error = %err, "Retrying after failure");
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn submission(company: Option<&str>) -> ContactSubmission {
        ContactSubmission {
            name: "Grace Hopper".to_string(),
            email: "grace@example.com".to_string(),
            company: company.map(str::to_string),
            message: "Let's talk about compilers.".to_string(),
        }
    }

    #[test]
    fn test_render_contact_email() {
        let body = render_contact_email(&submission(None));
        assert!(body.contains("Name: Grace Hopper"));
        assert!(body.contains("Company: N/A"));

        let body = render_contact_email(&submission(Some("Navy")));
        assert!(body.contains("Company: Navy"));
    }

    #[test]
    fn test_member_exists_is_success() {
        let error = MailchimpError {
            title: Some("Member Exists".to_string()),
            detail: Some("already a list member".to_string()),
        };
        assert_eq!(
            interpret_mailchimp_error(400, error).unwrap(),
            Subscription::AlreadySubscribed
        );
    }

    #[test]
    fn test_other_errors_carry_detail() {
        let error = MailchimpError {
            title: Some("Invalid Resource".to_string()),
            detail: Some("looks fake or invalid".to_string()),
        };
        match interpret_mailchimp_error(400, error) {
            Err(NotifyError::Rejected(detail)) => assert_eq!(detail, "looks fake or invalid"),
            other => panic!("unexpected: {other:?}"),
        }

        match interpret_mailchimp_error(503, MailchimpError::default()) {
            Err(NotifyError::Rejected(detail)) => assert_eq!(detail, "unexpected status 503"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_members_url() {
        let notifier = MailchimpNotifier::new(
            "key".to_string(),
            "abc123".to_string(),
            "us21".to_string(),
            None,
        );
        assert_eq!(
            notifier.members_url(),
            "https://us21.api.mailchimp.com/3.0/lists/abc123/members"
        );
    }

    #[tokio::test]
    async fn test_mailchimp_requires_credentials() {
        let notifier = MailchimpNotifier::new(String::new(), String::new(), "us1".to_string(), None);
        assert!(matches!(
            notifier.add_to_mailing_list("a@example.com").await,
            Err(NotifyError::NotConfigured)
        ));
    }

    #[tokio::test]
    async fn test_factory_falls_back_to_mock() {
        let notifier = notifier_from_config(&NotifierConfig::default());
        assert_eq!(
            notifier.add_to_mailing_list("a@example.com").await.unwrap(),
            Subscription::Subscribed
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_with_backoff_eventually_succeeds() {
        let calls = &AtomicU32::new(0);
        let started = tokio::time::Instant::now();

        let result: Result<u32, String> = retry_with_backoff(3, Duration::from_secs(1), || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 {
                Err(format!("attempt {n} failed"))
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(result, Ok(3));
        // 1s after the first failure, 2s after the second.
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(3) && waited < Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_with_backoff_returns_last_error() {
        let calls = &AtomicU32::new(0);
        let result: Result<(), String> = retry_with_backoff(3, Duration::from_millis(10), || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            Err(format!("attempt {n} failed"))
        })
        .await;

        assert_eq!(result, Err("attempt 3 failed".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
