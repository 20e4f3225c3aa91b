//! Time parsing and formatting utilities

use crate::domain::errors::DomainError;
use crate::error::SphereResult;

/// Parser for timestamps given on the command line or in hint files
pub struct TimeParser;

impl TimeParser {
    /// Create a new time parser
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self
    }
}

impl Default for TimeParser {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeParser {
    /// Parse `SS.ms`, `MM:SS.ms` or `HH:MM:SS.ms` into seconds
    pub fn parse_time(&self, time_str: &str) -> SphereResult<f64> {
        let time_str = time_str.trim();
        let invalid = || DomainError::BadArgs(format!("Invalid time format: {}", time_str));

        let parts: Vec<&str> = time_str.split(':').collect();
        if parts.len() > 3 || parts.iter().any(|p| p.trim().is_empty()) {
            return Err(invalid().into());
        }

        let mut seconds = 0.0;
        for (i, part) in parts.iter().enumerate() {
            let value: f64 = part.trim().parse().map_err(|_| invalid())?;
            let is_last = i == parts.len() - 1;
            if value < 0.0 || (!is_last && value.fract() != 0.0) {
                return Err(invalid().into());
            }
            if i > 0 && value >= 60.0 {
                return Err(invalid().into());
            }
            seconds = seconds * 60.0 + value;
        }

        if !seconds.is_finite() {
            return Err(invalid().into());
        }
        Ok(seconds)
    }

    /// Parse a comma-separated list of timestamps
    pub fn parse_list(&self, list: &str) -> SphereResult<Vec<f64>> {
        list.split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|s| self.parse_time(s))
            .collect()
    }
}

/// WebVTT cue timestamp, always `HH:MM:SS.mmm`
pub fn format_vtt_timestamp(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;
    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, millis)
}

/// ISO 8601 duration for DASH attributes, e.g. `PT1M2.500S`
pub fn format_iso8601_duration(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) as f64 / 1000.0;

    let mut out = String::from("PT");
    if hours > 0 {
        out.push_str(&format!("{}H", hours));
    }
    if minutes > 0 {
        out.push_str(&format!("{}M", minutes));
    }
    out.push_str(&format!("{:.3}S", secs));
    out
}
