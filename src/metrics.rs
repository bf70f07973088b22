// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prometheus counters for the intake endpoints.

use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

/// Outcome label shared by both endpoint counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Accepted,
    BotAbsorbed,
    RateLimited,
    Invalid,
    UpstreamFailed,
    InternalError,
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::BotAbsorbed => "bot_absorbed",
            Self::RateLimited => "rate_limited",
            Self::Invalid => "invalid",
            Self::UpstreamFailed => "upstream_failed",
            Self::InternalError => "internal_error",
        }
    }
}

/// Service metrics backed by a private registry.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    contact_submissions: IntCounterVec,
    subscribe_requests: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let contact_submissions = IntCounterVec::new(
            Opts::new(
                "contact_submissions_total",
                "Contact form submissions by outcome",
            ),
            &["outcome"],
        )?;
        let subscribe_requests = IntCounterVec::new(
            Opts::new(
                "subscribe_requests_total",
                "Newsletter signup requests by outcome",
            ),
            &["outcome"],
        )?;

        registry.register(Box::new(contact_submissions.clone()))?;
        registry.register(Box::new(subscribe_requests.clone()))?;

        Ok(Self {
            registry,
            contact_submissions,
            subscribe_requests,
        })
    }

    pub fn record_submission(&self, outcome: Outcome) {
        self.contact_submissions
            .with_label_values(&[outcome.label()])
            .inc();
    }

    pub fn record_subscription(&self, outcome: Outcome) {
        self.subscribe_requests
            .with_label_values(&[outcome.label()])
            .inc();
    }

    #[cfg(test)]
    fn submission_count(&self, outcome: Outcome) -> u64 {
        self.contact_submissions
            .with_label_values(&[outcome.label()])
            .get()
    }

    /// Render all metrics in the Prometheus text exposition format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_and_render() {
        let metrics = Metrics::new().unwrap();
        metrics.record_submission(Outcome::Accepted);
        metrics.record_submission(Outcome::Accepted);
        metrics.record_submission(Outcome::BotAbsorbed);
        metrics.record_subscription(Outcome::RateLimited);

        assert_eq!(metrics.submission_count(Outcome::Accepted), 2);
        assert_eq!(metrics.submission_count(Outcome::BotAbsorbed), 1);
        assert_eq!(metrics.submission_count(Outcome::Invalid), 0);

        let text = metrics.render().unwrap();
        assert!(text.contains(r#"contact_submissions_total{outcome="accepted"} 2"#));
        assert!(text.contains(r#"subscribe_requests_total{outcome="rate_limited"} 1"#));
    }
}
