//! # Provider Configuration
//!
//! Controller-level configuration loaded from environment variables (populated from ConfigMap).
//!
//! All configuration has sensible defaults and can be overridden via environment variables.
//! Command-line flags parsed in `main` take precedence over both.

mod controller;
mod server;

pub use controller::{parse_kind_list, ControllerConfig};
pub use server::ServerConfig;

use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

static DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<number>\d+)(?P<unit>[smhd])$").expect("duration pattern is valid")
});

/// Load configuration from environment variables with defaults
pub fn load_config() -> (ControllerConfig, ServerConfig) {
    (ControllerConfig::from_env(), ServerConfig::from_env())
}

/// Read environment variable or return default value
pub(crate) fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T
where
    <T as std::str::FromStr>::Err: std::fmt::Debug,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parse a Kubernetes-style duration such as `30s`, `1m`, `2h` or `1d`
pub fn parse_duration(value: &str) -> Result<Duration, String> {
    let trimmed = value.trim().to_lowercase();
    let captures = DURATION.captures(&trimmed).ok_or_else(|| {
        format!("invalid duration '{value}', expected <number><unit> such as '1m' or '1h'")
    })?;
    let number: u64 = captures["number"]
        .parse()
        .map_err(|e| format!("invalid duration number in '{value}': {e}"))?;
    if number == 0 {
        return Err(format!("duration must be greater than 0, got '{value}'"));
    }
    let seconds = match &captures["unit"] {
        "s" => number,
        "m" => number.saturating_mul(60),
        "h" => number.saturating_mul(3600),
        _ => number.saturating_mul(86400),
    };
    Ok(Duration::from_secs(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("30s"), Ok(Duration::from_secs(30)));
        assert_eq!(parse_duration("1m"), Ok(Duration::from_secs(60)));
        assert_eq!(parse_duration(" 2H "), Ok(Duration::from_secs(7200)));
        assert_eq!(parse_duration("1d"), Ok(Duration::from_secs(86400)));
    }

    #[test]
    fn test_parse_duration_rejects_bad_input() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("5 minutes").is_err());
        assert!(parse_duration("-1m").is_err());
    }
}
