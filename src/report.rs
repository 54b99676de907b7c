//! Console reporting for the capture
//!
//! Two modes:
//! - streaming: one block per datagram, printed as it arrives
//! - final: per-miner field analysis, printed once on interrupt
//!
//! All rendering goes through a caller-supplied `io::Write` sink; the
//! binary passes a locked stdout, tests pass a `Vec<u8>`.

use std::io::{self, Write};
use std::net::SocketAddr;

use chrono::{DateTime, Local};
use serde_json::Value;

use crate::decode::{self, Observation};
use crate::registry::{self, MinerRegistry};
use crate::stats::CaptureStats;
use crate::units;

/// Timestamp format for report lines
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Field categories resolved in the final analysis.
///
/// Candidate keys are tried in order and the first key present in the
/// document wins; the order must not change.
pub const FIELD_CATEGORIES: [(&str, &[&str]); 5] = [
    ("Power", &["Power", "power", "PowerConsumption", "Watts", "watts"]),
    ("Temperature", &["Temp", "temp", "Temperature", "temperature"]),
    ("Shares", &["Share", "share", "Shares", "shares", "AcceptedShares"]),
    ("Valid", &["Valid", "valid", "ValidShares", "Accepted", "accepted"]),
    ("HashRate", &["HashRate", "hashrate", "Hashrate", "Speed", "speed"]),
];

/// Resolve a category against a document.
///
/// Returns the first candidate key present at the top level together with
/// its value, or None when no candidate is present. Absence is not an
/// error; the caller reports it explicitly.
pub fn find_field<'a>(
    doc: &'a Value,
    candidates: &[&'static str],
) -> Option<(&'static str, &'a Value)> {
    candidates
        .iter()
        .find_map(|key| doc.get(*key).map(|value| (*key, value)))
}

/// Streaming-mode block for one observation
pub fn write_observation<W: Write>(
    out: &mut W,
    seen_at: DateTime<Local>,
    from: SocketAddr,
    obs: &Observation,
    registry: &MinerRegistry,
) -> io::Result<()> {
    writeln!(out)?;
    writeln!(
        out,
        "[{}] Packet from {}:{}",
        seen_at.format(TIME_FORMAT),
        from.ip(),
        from.port()
    )?;
    writeln!(out, "Raw data: {:?}", obs.text)?;
    writeln!(out, "{}", "-".repeat(40))?;

    match &obs.doc {
        Ok(doc) => {
            writeln!(out, "Parsed JSON:")?;
            writeln!(out, "{}", serde_json::to_string_pretty(doc)?)?;
            if let Some(fields) = doc.as_object() {
                writeln!(out)?;
                writeln!(out, "Fields found:")?;
                for (key, value) in fields {
                    writeln!(
                        out,
                        "  {}: {} (type: {})",
                        key,
                        render_value(value),
                        decode::type_name(value)
                    )?;
                }
            }
        }
        Err(err) => {
            writeln!(out, "{}", err)?;
            writeln!(out, "Keeping payload as plain text")?;
        }
    }

    writeln!(out, "{}", "=".repeat(80))?;

    if !registry.is_empty() {
        writeln!(out)?;
        writeln!(out, "MINERS SUMMARY ({} found):", registry.count())?;
        for (ip, entry) in registry.iter() {
            writeln!(out, "  {}: {}", ip, registry::display_name(&entry.doc))?;
        }
    }

    Ok(())
}

/// Final-mode report, printed once on interrupt
pub fn write_final<W: Write>(
    out: &mut W,
    registry: &MinerRegistry,
    stats: &CaptureStats,
) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "=".repeat(80))?;
    writeln!(out, "FINAL ANALYSIS")?;
    writeln!(out, "{}", "=".repeat(80))?;

    for (ip, entry) in registry.iter() {
        writeln!(out)?;
        writeln!(out, "Miner IP: {}", ip)?;
        writeln!(
            out,
            "Last seen: {} ({} update{})",
            entry.last_seen.format(TIME_FORMAT),
            entry.updates,
            if entry.updates == 1 { "" } else { "s" }
        )?;
        writeln!(
            out,
            "Complete JSON: {}",
            serde_json::to_string_pretty(&entry.doc)?
        )?;
        writeln!(out)?;
        writeln!(out, "Field Analysis:")?;
        for (category, candidates) in &FIELD_CATEGORIES {
            match find_field(&entry.doc, candidates) {
                Some((key, value)) => {
                    write!(out, "  {}: Found as '{}' = {}", category, key, render_value(value))?;
                    if *category == "HashRate" {
                        if let Some(khs) = units::hashrate_khs(value) {
                            write!(out, " (~{khs:.1} KH/s)")?;
                        }
                    }
                    writeln!(out)?;
                }
                None => writeln!(out, "  {}: NOT FOUND", category)?,
            }
        }
    }

    writeln!(out)?;
    writeln!(out, "{}", stats.render())?;

    Ok(())
}

/// Strings print bare, everything else as JSON
fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::net::IpAddr;

    fn render_observation(payload: &[u8], registry: &MinerRegistry) -> String {
        let obs = decode::decode(payload);
        let from: SocketAddr = "10.0.0.5:4444".parse().unwrap();
        let mut out = Vec::new();
        write_observation(&mut out, Local::now(), from, &obs, registry).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn render_final(registry: &MinerRegistry) -> String {
        let mut out = Vec::new();
        write_final(&mut out, registry, &CaptureStats::new()).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn registry_with(ip: &str, doc: Value) -> MinerRegistry {
        let mut registry = MinerRegistry::new();
        registry.record(ip.parse::<IpAddr>().unwrap(), doc, Local::now());
        registry
    }

    #[test]
    fn test_streaming_block_lists_every_field() {
        let doc = json!({"Name": "Miner1", "Hashrate": 95.2, "Temp": 62, "Tags": [1, 2]});
        let registry = registry_with("10.0.0.5", doc.clone());
        let output = render_observation(doc.to_string().as_bytes(), &registry);

        assert!(output.contains("Packet from 10.0.0.5:4444"));
        assert!(output.contains("Parsed JSON:"));
        assert!(output.contains("  Name: Miner1 (type: string)"));
        assert!(output.contains("  Hashrate: 95.2 (type: float)"));
        assert!(output.contains("  Temp: 62 (type: int)"));
        assert!(output.contains("  Tags: [1,2] (type: array)"));
    }

    #[test]
    fn test_streaming_block_parse_failure_keeps_raw_text() {
        let registry = MinerRegistry::new();
        let output = render_observation(b"not json", &registry);

        assert!(output.contains("Raw data: \"not json\""));
        assert!(output.contains("JSON decode error:"));
        assert!(!output.contains("Parsed JSON:"));
        // Nothing parsed yet, so no summary either
        assert!(!output.contains("MINERS SUMMARY"));
    }

    #[test]
    fn test_streaming_summary_lists_each_sender_once() {
        let mut registry = MinerRegistry::new();
        registry.record("10.0.0.5".parse().unwrap(), json!({"Name": "m1"}), Local::now());
        registry.record("10.0.0.7".parse().unwrap(), json!({"name": "m2"}), Local::now());
        let output = render_observation(br#"{"name": "m2"}"#, &registry);

        assert!(output.contains("MINERS SUMMARY (2 found):"));
        assert!(output.contains("  10.0.0.5: m1"));
        assert!(output.contains("  10.0.0.7: m2"));
    }

    #[test]
    fn test_find_field_first_match_wins() {
        let doc = json!({"temperature": 70, "Temp": 62});
        let (_, candidates) = FIELD_CATEGORIES[1];
        let (key, value) = find_field(&doc, candidates).unwrap();
        assert_eq!(key, "Temp");
        assert_eq!(value, &json!(62));
    }

    #[test]
    fn test_find_field_single_candidate() {
        let doc = json!({"watts": 3.3});
        let (_, candidates) = FIELD_CATEGORIES[0];
        assert_eq!(find_field(&doc, candidates), Some(("watts", &json!(3.3))));
    }

    #[test]
    fn test_find_field_absent_everywhere() {
        let doc = json!({"Uptime": "4d"});
        for (_, candidates) in &FIELD_CATEGORIES {
            assert_eq!(find_field(&doc, candidates), None);
        }
    }

    #[test]
    fn test_find_field_ignores_nested_keys() {
        let doc = json!({"status": {"Temp": 62}});
        let (_, candidates) = FIELD_CATEGORIES[1];
        assert_eq!(find_field(&doc, candidates), None);
    }

    #[test]
    fn test_final_report_field_analysis() {
        let registry = registry_with(
            "10.0.0.5",
            json!({"Name": "Miner1", "Hashrate": 95.2, "Temp": 62}),
        );
        let output = render_final(&registry);

        assert!(output.contains("FINAL ANALYSIS"));
        assert!(output.contains("Miner IP: 10.0.0.5"));
        assert!(output.contains("  Temperature: Found as 'Temp' = 62"));
        assert!(output.contains("  HashRate: Found as 'Hashrate' = 95.2"));
        assert!(output.contains("  Power: NOT FOUND"));
        assert!(output.contains("  Shares: NOT FOUND"));
        assert!(output.contains("  Valid: NOT FOUND"));
    }

    #[test]
    fn test_final_report_normalizes_hashrate_shorthand() {
        let registry = registry_with("10.0.0.6", json!({"HashRate": "0.8M"}));
        let output = render_final(&registry);
        assert!(output.contains("  HashRate: Found as 'HashRate' = 0.8M (~800.0 KH/s)"));
    }

    #[test]
    fn test_final_report_without_miners_still_prints_stats() {
        let output = render_final(&MinerRegistry::new());
        assert!(output.contains("FINAL ANALYSIS"));
        assert!(!output.contains("Miner IP:"));
        assert!(output.contains("SESSION STATS:"));
        assert!(output.contains("Datagrams received: 0"));
    }
}
