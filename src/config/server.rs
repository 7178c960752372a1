//! # Probe Server Configuration
//!
//! Where the provider serves `/metrics`, `/healthz` and `/readyz`, and how
//! long startup waits for that listener before giving up.

use super::env_var_or_default;
use std::net::SocketAddr;
use std::time::Duration;

/// Metrics and probe server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port the kubelet probes and Prometheus scrape
    pub metrics_port: u16,
    /// Startup fails if the listener is not bound within this budget
    pub startup_timeout: Duration,
    /// How often startup checks whether the listener is bound
    pub readiness_poll: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            metrics_port: DEFAULT_METRICS_PORT,
            startup_timeout: Duration::from_secs(DEFAULT_SERVER_STARTUP_TIMEOUT_SECS),
            readiness_poll: Duration::from_millis(DEFAULT_SERVER_POLL_INTERVAL_MS),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        use crate::constants::*;
        Self {
            metrics_port: env_var_or_default("METRICS_PORT", DEFAULT_METRICS_PORT),
            startup_timeout: Duration::from_secs(env_var_or_default(
                "SERVER_STARTUP_TIMEOUT_SECS",
                DEFAULT_SERVER_STARTUP_TIMEOUT_SECS,
            )),
            readiness_poll: Duration::from_millis(env_var_or_default(
                "SERVER_POLL_INTERVAL_MS",
                DEFAULT_SERVER_POLL_INTERVAL_MS,
            )),
        }
    }

    /// All interfaces, so the kubelet and Prometheus can reach the pod IP
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.metrics_port))
    }

    /// Rejects settings under which startup could never observe readiness
    pub fn validate(&self) -> Result<(), String> {
        if self.metrics_port == 0 {
            return Err("METRICS_PORT must not be 0".to_string());
        }
        if self.readiness_poll.is_zero() {
            return Err("SERVER_POLL_INTERVAL_MS must be greater than 0".to_string());
        }
        if self.startup_timeout < self.readiness_poll {
            return Err(format!(
                "SERVER_STARTUP_TIMEOUT_SECS ({}s) is shorter than one readiness poll ({}ms)",
                self.startup_timeout.as_secs(),
                self.readiness_poll.as_millis()
            ));
        }
        Ok(())
    }
}
