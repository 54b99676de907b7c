//! Session counters for the capture loop
//!
//! Plain integers are enough here, the loop is single-threaded. Rendered
//! once as a human-readable block at the end of the final report.

use std::time::Instant;

/// Counters accumulated over one capture session
pub struct CaptureStats {
    /// Datagrams received (parsed or not)
    pub datagrams: u64,
    /// Payload bytes received
    pub bytes: u64,
    /// Datagrams that did not decode as JSON
    pub parse_failures: u64,
    /// Socket receive errors
    pub recv_errors: u64,
    /// Capture start time (for session duration)
    start: Instant,
}

impl CaptureStats {
    pub fn new() -> Self {
        Self {
            datagrams: 0,
            bytes: 0,
            parse_failures: 0,
            recv_errors: 0,
            start: Instant::now(),
        }
    }

    /// Render the counters for the final report
    pub fn render(&self) -> String {
        format!(
            "SESSION STATS:\n  Datagrams received: {}\n  Bytes received: {}\n  \
             Parse failures: {}\n  Receive errors: {}\n  Capture time: {}s",
            self.datagrams,
            self.bytes,
            self.parse_failures,
            self.recv_errors,
            self.start.elapsed().as_secs(),
        )
    }
}

impl Default for CaptureStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_start_at_zero() {
        let stats = CaptureStats::new();
        assert_eq!(stats.datagrams, 0);
        assert_eq!(stats.bytes, 0);
        assert_eq!(stats.parse_failures, 0);
        assert_eq!(stats.recv_errors, 0);
    }

    #[test]
    fn test_stats_render_counts() {
        let mut stats = CaptureStats::new();
        stats.datagrams = 3;
        stats.bytes = 120;
        stats.parse_failures = 1;

        let output = stats.render();
        assert!(output.contains("Datagrams received: 3"));
        assert!(output.contains("Bytes received: 120"));
        assert!(output.contains("Parse failures: 1"));
        assert!(output.contains("Receive errors: 0"));
        assert!(output.contains("Capture time: 0s"));
    }
}
