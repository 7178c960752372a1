//! # Reconciler Errors
//!
//! Every failure inside a reconciliation pass is a [`ReconcilerError`] with an
//! [`ErrorCategory`] that decides how the engine reacts.

use crate::controller::reference::ReferenceError;
use crate::provider::aws::errors::{classify, AwsError, ResourceKind};
use crate::provider::aws::policy::PolicyError;
use thiserror::Error;

/// Engine-relevant error categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// External object is absent
    NotFound,
    /// A create raced another actor
    AlreadyExists,
    /// Security group rule is already authorized
    RuleAlreadyExists,
    /// Referent missing, not ready, or no selector match
    ReferenceNotReady,
    /// Selector matched more than one object
    AmbiguousSelector,
    /// AWS rejected the input as malformed
    Validation,
    /// Timeouts, throttling and 5xx
    Transient,
    /// External object is in the wrong state for the requested call
    ConflictingState,
    Fatal,
}

impl ErrorCategory {
    /// Transient errors go back to the runtime for exponential backoff
    pub fn is_transient(&self) -> bool {
        matches!(self, ErrorCategory::Transient)
    }

    /// Label used in metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::NotFound => "not_found",
            ErrorCategory::AlreadyExists => "already_exists",
            ErrorCategory::RuleAlreadyExists => "rule_already_exists",
            ErrorCategory::ReferenceNotReady => "reference_not_ready",
            ErrorCategory::AmbiguousSelector => "ambiguous_selector",
            ErrorCategory::Validation => "validation",
            ErrorCategory::Transient => "transient",
            ErrorCategory::ConflictingState => "conflicting_state",
            ErrorCategory::Fatal => "fatal",
        }
    }
}

#[derive(Debug, Error)]
pub enum ReconcilerError {
    /// AWS call failed; `context` is a stable phrase such as "failed to describe VPC"
    #[error("{context}: {source}")]
    External {
        category: ErrorCategory,
        context: &'static str,
        #[source]
        source: AwsError,
    },

    #[error("cannot resolve references: {0}")]
    Reference(#[from] ReferenceError),

    #[error("invalid policy: {0}")]
    Policy(#[from] PolicyError),

    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("cannot serialize resource: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cannot connect to AWS: {0}")]
    Connect(String),

    #[error("{0}")]
    Invalid(String),
}

impl ReconcilerError {
    /// Wrap an AWS error, classifying it for `kind`
    pub fn external(kind: ResourceKind, context: &'static str, source: AwsError) -> Self {
        ReconcilerError::External {
            category: classify(kind, &source),
            context,
            source,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ReconcilerError::External { category, .. } => *category,
            ReconcilerError::Reference(ReferenceError::AmbiguousSelector { .. }) => {
                ErrorCategory::AmbiguousSelector
            }
            ReconcilerError::Reference(ReferenceError::Reader { .. }) => ErrorCategory::Transient,
            ReconcilerError::Reference(_) => ErrorCategory::ReferenceNotReady,
            ReconcilerError::Policy(_) | ReconcilerError::Invalid(_) => ErrorCategory::Validation,
            ReconcilerError::Kube(_) | ReconcilerError::Connect(_) => ErrorCategory::Transient,
            ReconcilerError::Json(_) => ErrorCategory::Fatal,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.category() == ErrorCategory::NotFound
    }

    pub fn is_transient(&self) -> bool {
        self.category().is_transient()
    }

    /// Whether the Kubernetes API rejected a write because the object changed
    pub fn is_conflict(&self) -> bool {
        matches!(self, ReconcilerError::Kube(kube::Error::Api(response)) if response.code == 409)
    }
}

/// `map_err` adapter: `.map_err(aws_error(ResourceKind::Vpc, "failed to describe VPC"))`
pub fn aws_error(
    kind: ResourceKind,
    context: &'static str,
) -> impl FnOnce(AwsError) -> ReconcilerError {
    move |source| ReconcilerError::external(kind, context, source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_external_error_message_and_category() {
        let err = ReconcilerError::external(
            ResourceKind::Vpc,
            "failed to describe VPC",
            AwsError::service("InvalidVpcID.NotFound", "vpc-1 does not exist"),
        );
        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            "failed to describe VPC: InvalidVpcID.NotFound: vpc-1 does not exist"
        );
    }

    #[test]
    fn test_reference_categories() {
        let ambiguous = ReconcilerError::from(ReferenceError::AmbiguousSelector {
            kind: "VPC".to_string(),
            count: 2,
        });
        assert_eq!(ambiguous.category(), ErrorCategory::AmbiguousSelector);

        let not_ready = ReconcilerError::from(ReferenceError::NotReady {
            kind: "VPC".to_string(),
            name: "main".to_string(),
        });
        assert_eq!(not_ready.category(), ErrorCategory::ReferenceNotReady);
        assert!(!not_ready.is_transient());
    }

    #[test]
    fn test_category_labels() {
        assert_eq!(ErrorCategory::RuleAlreadyExists.as_str(), "rule_already_exists");
        assert!(ErrorCategory::Transient.is_transient());
        assert!(!ErrorCategory::Fatal.is_transient());
    }
}
