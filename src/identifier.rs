// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Client identifier resolution from proxy headers.
//!
//! The identifier is advisory: clients behind a shared proxy collapse to one
//! key and forged headers are accepted as-is. It only scopes rate limiting
//! for a low-stakes form and is not an authentication boundary.

use axum::http::HeaderMap;
use std::collections::HashMap;

/// Identifier used when no proxy header carries a client address.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Read-only access to request headers by lowercase name.
pub trait HeaderSource {
    fn header(&self, name: &str) -> Option<&str>;
}

impl HeaderSource for HeaderMap {
    fn header(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Keys are matched case-insensitively.
impl HeaderSource for HashMap<String, String> {
    fn header(&self, name: &str) -> Option<&str> {
        self.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// How a single header contributes a client address.
#[derive(Debug, Clone, Copy)]
enum Lookup {
    /// Comma-separated hop list; the leftmost entry is the client.
    FirstListed(&'static str),
    /// Header holds exactly one address.
    Whole(&'static str),
}

impl Lookup {
    fn resolve<'a, H: HeaderSource + ?Sized>(self, headers: &'a H) -> Option<&'a str> {
        let value = match self {
            Lookup::FirstListed(name) => headers.header(name)?.split(',').next()?,
            Lookup::Whole(name) => headers.header(name)?,
        };
        let value = value.trim();
        (!value.is_empty()).then_some(value)
    }
}

/// Header precedence, highest first.
const LOOKUPS: [Lookup; 3] = [
    Lookup::FirstListed("x-forwarded-for"),
    Lookup::Whole("x-real-ip"),
    Lookup::Whole("cf-connecting-ip"),
];

/// Derive the rate-limit key for a caller.
pub fn client_identifier<H: HeaderSource + ?Sized>(headers: &H) -> String {
    LOOKUPS
        .iter()
        .find_map(|lookup| lookup.resolve(headers))
        .unwrap_or(UNKNOWN_CLIENT)
        .to_string()
}
