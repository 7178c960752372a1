//! # Error Policy
//!
//! Per-resource exponential backoff for errors the engine hands back to the
//! runtime. Backoff state is keyed by kind and resource name so one failing
//! resource never slows down another, and is reset after a successful pass.

use crate::constants;
use crate::controller::backoff::BackoffState;
use crate::controller::reconciler::ReconcilerError;
use crate::observability;
use kube_runtime::controller::Action;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Debug)]
pub struct ErrorPolicy {
    min: Duration,
    max: Duration,
    states: Mutex<HashMap<String, BackoffState>>,
}

impl ErrorPolicy {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            max,
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Delay before retrying `name` after `error`
    pub fn on_error(&self, kind: &str, name: &str, error: &ReconcilerError) -> Action {
        let error_span = tracing::span!(
            tracing::Level::ERROR,
            "controller.watch.reconciliation_error",
            resource.kind = kind,
            resource.name = name,
            error = %error
        );
        let _error_guard = error_span.enter();

        error!("Reconciliation error for {} {}: {}", kind, name, error);

        let key = format!("{kind}/{name}");
        let (delay, error_count) = match self.states.lock() {
            Ok(mut states) => {
                let state = states
                    .entry(key)
                    .or_insert_with(|| BackoffState::new(self.min, self.max));
                state.increment_error();
                (state.backoff.next_backoff(), state.error_count)
            }
            Err(e) => {
                warn!("Failed to lock backoff states: {}, using default backoff", e);
                (
                    Duration::from_secs(constants::DEFAULT_WATCH_RESTART_DELAY_SECS),
                    0,
                )
            }
        };

        info!(
            "🔄 Retrying {} {} in {}s (error count: {}, trigger source: error-backoff)",
            kind,
            name,
            delay.as_secs(),
            error_count
        );
        observability::metrics::increment_requeues_total("error-backoff");
        Action::requeue(delay)
    }

    /// Forget the backoff of `name` after a successful pass
    pub fn on_success(&self, kind: &str, name: &str) {
        if let Ok(mut states) = self.states.lock() {
            states.remove(&format!("{kind}/{name}"));
        }
    }

    /// Consecutive errors recorded for `name`
    pub fn error_count(&self, kind: &str, name: &str) -> u32 {
        self.states
            .lock()
            .ok()
            .and_then(|states| states.get(&format!("{kind}/{name}")).map(|s| s.error_count))
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transient() -> ReconcilerError {
        ReconcilerError::Connect("connection reset".to_string())
    }

    #[test]
    fn test_backoff_grows_per_resource() {
        let policy = ErrorPolicy::new(Duration::from_secs(1), Duration::from_secs(4));
        let delays: Vec<Action> = (0..4)
            .map(|_| policy.on_error("VPC", "main", &transient()))
            .collect();
        assert_eq!(
            delays,
            vec![
                Action::requeue(Duration::from_secs(1)),
                Action::requeue(Duration::from_secs(2)),
                Action::requeue(Duration::from_secs(4)),
                Action::requeue(Duration::from_secs(4)),
            ]
        );
        assert_eq!(policy.error_count("VPC", "main"), 4);

        assert_eq!(
            policy.on_error("VPC", "other", &transient()),
            Action::requeue(Duration::from_secs(1))
        );
        assert_eq!(
            policy.on_error("Subnet", "main", &transient()),
            Action::requeue(Duration::from_secs(1))
        );
    }

    #[test]
    fn test_success_resets_backoff() {
        let policy = ErrorPolicy::new(Duration::from_secs(2), Duration::from_secs(60));
        policy.on_error("VPC", "main", &transient());
        policy.on_error("VPC", "main", &transient());
        policy.on_success("VPC", "main");
        assert_eq!(policy.error_count("VPC", "main"), 0);
        assert_eq!(
            policy.on_error("VPC", "main", &transient()),
            Action::requeue(Duration::from_secs(2))
        );
    }
}
