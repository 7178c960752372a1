//! # Controller Configuration
//!
//! Reconciliation timing, concurrency and AWS call budgets.

use super::env_var_or_default;
use std::time::Duration;

/// Managed-resource controller configuration
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// How often an up-to-date resource is observed again
    pub poll_interval: Duration,
    /// Requeue after reference, fatal or deletion-in-progress outcomes
    pub short_wait: Duration,
    /// Requeue right after a successful create
    pub create_requeue: Duration,
    /// Maximum number of concurrent reconciles per kind
    pub max_reconcile_rate: u16,
    /// Lower bound of the per-resource error backoff
    pub error_backoff_min: Duration,
    /// Upper bound of the per-resource error backoff
    pub error_backoff_max: Duration,
    /// Per-operation budget handed to the AWS SDK
    pub aws_call_timeout: Duration,
    /// Region used to load the base SDK configuration
    pub default_region: String,
    /// Kinds to run controllers for (lowercase kind names); empty means all
    pub enabled_kinds: Vec<String>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            short_wait: Duration::from_secs(DEFAULT_SHORT_WAIT_SECS),
            create_requeue: Duration::from_secs(DEFAULT_CREATE_REQUEUE_SECS),
            max_reconcile_rate: DEFAULT_MAX_RECONCILE_RATE,
            error_backoff_min: Duration::from_secs(DEFAULT_ERROR_BACKOFF_MIN_SECS),
            error_backoff_max: Duration::from_secs(DEFAULT_ERROR_BACKOFF_MAX_SECS),
            aws_call_timeout: Duration::from_secs(DEFAULT_AWS_CALL_TIMEOUT_SECS),
            default_region: DEFAULT_AWS_REGION.to_string(),
            enabled_kinds: Vec::new(),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        use crate::constants::*;
        let enabled_kinds = std::env::var("ENABLED_KINDS")
            .map(|v| parse_kind_list(&v))
            .unwrap_or_default();

        Self {
            poll_interval: Duration::from_secs(env_var_or_default(
                "POLL_INTERVAL_SECS",
                DEFAULT_POLL_INTERVAL_SECS,
            )),
            short_wait: Duration::from_secs(env_var_or_default(
                "SHORT_WAIT_SECS",
                DEFAULT_SHORT_WAIT_SECS,
            )),
            create_requeue: Duration::from_secs(env_var_or_default(
                "CREATE_REQUEUE_SECS",
                DEFAULT_CREATE_REQUEUE_SECS,
            )),
            max_reconcile_rate: env_var_or_default(
                "MAX_RECONCILE_RATE",
                DEFAULT_MAX_RECONCILE_RATE,
            ),
            error_backoff_min: Duration::from_secs(env_var_or_default(
                "ERROR_BACKOFF_MIN_SECS",
                DEFAULT_ERROR_BACKOFF_MIN_SECS,
            )),
            error_backoff_max: Duration::from_secs(env_var_or_default(
                "ERROR_BACKOFF_MAX_SECS",
                DEFAULT_ERROR_BACKOFF_MAX_SECS,
            )),
            aws_call_timeout: Duration::from_secs(env_var_or_default(
                "AWS_CALL_TIMEOUT_SECS",
                DEFAULT_AWS_CALL_TIMEOUT_SECS,
            )),
            default_region: env_var_or_default("AWS_REGION", DEFAULT_AWS_REGION.to_string()),
            enabled_kinds,
        }
    }

    /// Whether the controller for `kind` should run
    pub fn is_kind_enabled(&self, kind: &str) -> bool {
        self.enabled_kinds.is_empty()
            || self
                .enabled_kinds
                .iter()
                .any(|k| k.eq_ignore_ascii_case(kind))
    }
}

/// Parse a comma separated kind list, ignoring blanks
pub fn parse_kind_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kind_list() {
        assert_eq!(
            parse_kind_list("VPC, subnet,,securitygroup "),
            vec!["vpc", "subnet", "securitygroup"]
        );
        assert!(parse_kind_list("").is_empty());
    }

    #[test]
    fn test_all_kinds_enabled_by_default() {
        let config = ControllerConfig::default();
        assert!(config.is_kind_enabled("VPC"));
        assert!(config.is_kind_enabled("Certificate"));
    }

    #[test]
    fn test_kind_filter_is_case_insensitive() {
        let config = ControllerConfig {
            enabled_kinds: vec!["vpc".to_string()],
            ..ControllerConfig::default()
        };
        assert!(config.is_kind_enabled("VPC"));
        assert!(!config.is_kind_enabled("Subnet"));
    }
}
