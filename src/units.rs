//! Hashrate unit shorthand
//!
//! Miner firmware reports hashrate as strings like "113.1K", "0.8M" or
//! "1.2GH/s", and occasionally as a bare number already in KH/s.

use serde_json::Value;

/// Normalize a hashrate value to KH/s.
///
/// Accepts the firmware shorthand, with or without an "H/s" tail, and bare
/// numbers. Returns None for anything else.
pub fn hashrate_khs(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_shorthand(s),
        _ => None,
    }
}

fn parse_shorthand(raw: &str) -> Option<f64> {
    let trimmed = raw.trim().to_uppercase();

    let (digits, scale) = if let Some(rest) = strip_unit(&trimmed, "GH/S", "G") {
        (rest, 1_000_000.0)
    } else if let Some(rest) = strip_unit(&trimmed, "MH/S", "M") {
        (rest, 1_000.0)
    } else if let Some(rest) = strip_unit(&trimmed, "KH/S", "K") {
        (rest, 1.0)
    } else {
        (trimmed.as_str(), 1.0)
    };

    digits.trim().parse::<f64>().ok().map(|v| v * scale)
}

fn strip_unit<'a>(s: &'a str, long: &str, short: &str) -> Option<&'a str> {
    s.strip_suffix(long).or_else(|| s.strip_suffix(short))
}
