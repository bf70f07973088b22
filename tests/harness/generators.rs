// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Test data generators for abuse simulation.

use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};

/// Generate a pool of client addresses in the 10.x.x.x range.
pub fn generate_ips(count: usize) -> Vec<IpAddr> {
    (0..count)
        .map(|i| {
            let a = ((i >> 16) & 0xFF) as u8;
            let b = ((i >> 8) & 0xFF) as u8;
            let c = (i & 0xFF) as u8;
            IpAddr::V4(Ipv4Addr::new(10, a, b, c))
        })
        .collect()
}

/// Proxy headers as a reverse proxy would forward them for `ip`.
pub fn forwarded_headers(ip: &IpAddr) -> HashMap<String, String> {
    HashMap::from([(
        "x-forwarded-for".to_string(),
        format!("{ip}, 172.16.0.1"),
    )])
}

/// A well-formed submission, distinct per index.
pub fn valid_submission(i: usize) -> Value {
    json!({
        "name": format!("Visitor {i}"),
        "email": format!("visitor{i}@example.com"),
        "message": format!("Hello, this is enquiry number {i}."),
    })
}

/// A submission with the honeypot filled, as form-filling bots produce.
pub fn bot_submission(i: usize) -> Value {
    let mut body = valid_submission(i);
    body["honeypot"] = json!(format!("https://spam-{i}.example.net"));
    body
}

/// Payloads a scripted sender might try; every one must be rejected.
pub fn invalid_submissions() -> Vec<Value> {
    vec![
        json!({}),
        json!({ "name": "A", "email": "a@example.com", "message": "Too short" }),
        json!({ "name": "Mallory", "email": "mallory", "message": "Hello there, world!" }),
        json!({ "name": "Mallory", "email": "m@example.com" }),
        json!({ "name": ["array"], "email": "m@example.com", "message": "Hello there, world!" }),
        json!({ "name": "Mallory", "email": "m@example.com", "message": "x".repeat(5000) }),
    ]
}

/// Deterministic "random" choice from an index and a ratio.
pub fn rand_bool(ratio: f64, index: usize) -> bool {
    if ratio >= 1.0 {
        true
    } else if ratio <= 0.0 {
        false
    } else {
        (index as f64 * 0.618033988749895) % 1.0 < ratio
    }
}
