// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Outcome tallies for abuse simulation results.

use axum::http::StatusCode;
use contact_intake::pipeline::{PipelineResponse, BOT_SUCCESS_MESSAGE};
use std::collections::HashMap;
use std::fmt;

/// Possible outcomes for a simulated request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Accepted,
    Absorbed,
    RateLimited,
    Invalid,
    Error,
}

impl Outcome {
    /// Classify a pipeline response.
    pub fn of(response: &PipelineResponse) -> Self {
        match response.status {
            StatusCode::OK if response.body.message == BOT_SUCCESS_MESSAGE => Outcome::Absorbed,
            StatusCode::OK => Outcome::Accepted,
            StatusCode::TOO_MANY_REQUESTS => Outcome::RateLimited,
            StatusCode::BAD_REQUEST => Outcome::Invalid,
            _ => Outcome::Error,
        }
    }
}

/// Collects outcomes during a simulation.
#[derive(Debug, Default)]
pub struct AttackMetrics {
    outcomes: HashMap<Outcome, usize>,
    requests_per_client: HashMap<String, usize>,
}

impl AttackMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a request outcome.
    pub fn record(&mut self, outcome: Outcome, client: &str) {
        *self.outcomes.entry(outcome).or_insert(0) += 1;
        *self.requests_per_client.entry(client.to_string()).or_insert(0) += 1;
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.outcomes.get(&outcome).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.outcomes.values().sum()
    }

    pub fn unique_clients(&self) -> usize {
        self.requests_per_client.len()
    }

    /// Fraction of requests that did not reach acceptance.
    pub fn block_rate(&self) -> f64 {
        if self.total() == 0 {
            return 0.0;
        }
        1.0 - self.count(Outcome::Accepted) as f64 / self.total() as f64
    }
}

impl fmt::Display for AttackMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Abuse Simulation Report ===")?;
        writeln!(f, "Total requests: {}", self.total())?;
        writeln!(f, "Unique clients: {}", self.unique_clients())?;
        for outcome in [
            Outcome::Accepted,
            Outcome::Absorbed,
            Outcome::RateLimited,
            Outcome::Invalid,
            Outcome::Error,
        ] {
            writeln!(f, "  {:?}: {}", outcome, self.count(outcome))?;
        }
        write!(f, "Block rate: {:.1}%", self.block_rate() * 100.0)
    }
}
