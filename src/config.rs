//! Command-line value parsers and defaults.

use std::time::Duration;

/// Default length of one scan window.
pub const DEFAULT_SCAN_INTERVAL: &str = "10s";

/// Default time between snapshot reports.
pub const DEFAULT_REPORT_INTERVAL: &str = "30s";

/// Parse a duration from a human-readable string.
///
/// Supported suffixes are `ms`, `s`, `m` and `h`. A bare number is taken as
/// seconds.
///
/// # Examples
/// ```
/// use mopeka_listener::config::parse_duration;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration("10s").unwrap(), Duration::from_secs(10));
/// assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
/// assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
/// ```
pub fn parse_duration(src: &str) -> Result<Duration, String> {
    let src = src.trim();
    if src.is_empty() {
        return Err("empty duration string".to_string());
    }

    // `ms` must be tried before `m` and `s`
    let (number, unit, to_duration): (&str, &str, fn(u64) -> Option<Duration>) =
        if let Some(n) = src.strip_suffix("ms") {
            (n, "milliseconds", |v| Some(Duration::from_millis(v)))
        } else if let Some(n) = src.strip_suffix('h') {
            (n, "hours", |v| v.checked_mul(3600).map(Duration::from_secs))
        } else if let Some(n) = src.strip_suffix('m') {
            (n, "minutes", |v| v.checked_mul(60).map(Duration::from_secs))
        } else if let Some(n) = src.strip_suffix('s') {
            (n, "seconds", |v| Some(Duration::from_secs(v)))
        } else {
            (src, "duration", |v| Some(Duration::from_secs(v)))
        };

    let value: u64 = number
        .trim()
        .parse()
        .map_err(|_| format!("invalid {unit}: {number}"))?;
    to_duration(value).ok_or_else(|| format!("{unit} out of range: {number}"))
}

/// Like [`parse_duration`], but rejects zero.
pub fn parse_nonzero_duration(src: &str) -> Result<Duration, String> {
    match parse_duration(src)? {
        Duration::ZERO => Err("duration must be greater than zero".to_string()),
        d => Ok(d),
    }
}
