// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Test harness for contact endpoint abuse simulation.
//!
//! Generates client populations and submissions, and tallies the outcomes a
//! simulated attack produced.

pub mod generators;
pub mod metrics;
