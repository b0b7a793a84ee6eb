//! Interval parsing.

use std::time::Duration;

use crate::validate::ConfigError;

/// Parse an interval string (e.g., "500ms", "30s", "5m", "1h", "60").
///
/// Supported formats:
/// - `Nms` - N milliseconds
/// - `Ns` - N seconds
/// - `Nm` - N minutes
/// - `Nh` - N hours
/// - `N` - N seconds (default unit)
///
/// Zero intervals are rejected.
pub fn parse_interval(s: &str) -> Result<Duration, ConfigError> {
    let s = s.trim().to_lowercase();

    if s.is_empty() {
        return Err(ConfigError::InvalidInterval("empty interval".to_string()));
    }

    let (num_str, millis_per_unit) = if let Some(n) = s.strip_suffix("ms") {
        (n, 1)
    } else if let Some(n) = s.strip_suffix('s') {
        (n, 1_000)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 60_000)
    } else if let Some(n) = s.strip_suffix('h') {
        (n, 3_600_000)
    } else {
        (s.as_str(), 1_000)
    };

    let num: u64 = num_str
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidInterval(format!("invalid number: {num_str}")))?;

    let millis = num
        .checked_mul(millis_per_unit)
        .ok_or_else(|| ConfigError::InvalidInterval(format!("interval too large: {s}")))?;

    if millis == 0 {
        return Err(ConfigError::InvalidInterval(
            "interval must be positive".to_string(),
        ));
    }

    Ok(Duration::from_millis(millis))
}

/// Render an interval in the shortest unit that represents it exactly.
pub fn format_interval(interval: Duration) -> String {
    let millis = interval.as_millis();
    if millis % 3_600_000 == 0 {
        format!("{}h", millis / 3_600_000)
    } else if millis % 60_000 == 0 {
        format!("{}m", millis / 60_000)
    } else if millis % 1_000 == 0 {
        format!("{}s", millis / 1_000)
    } else {
        format!("{}ms", millis)
    }
}
