//! # AWS Provider
//!
//! Session handling, error classification and the shared diff helpers, plus
//! one module of handlers per AWS service.

pub mod acm;
pub mod acmpca;
pub mod auth;
pub mod connector;
pub mod ec2;
pub mod errors;
pub mod policy;
pub mod s3;
pub mod s3control;
pub mod tags;

pub use connector::{AwsConnector, AwsSession};

use crate::controller::reconciler::ReconcilerError;
use crate::crd::Managed;
use aws_sdk_ec2::primitives::{DateTime, DateTimeFormat};
use errors::{is_not_found, AwsError, ResourceKind};

/// Describe result with "not found" errors folded into `None`
pub(crate) fn found<T>(
    kind: ResourceKind,
    context: &'static str,
    result: Result<Option<T>, AwsError>,
) -> Result<Option<T>, ReconcilerError> {
    match result {
        Ok(found) => Ok(found),
        Err(e) if is_not_found(kind, &e) => Ok(None),
        Err(e) => Err(ReconcilerError::external(kind, context, e)),
    }
}

/// RFC 3339 rendering of an SDK timestamp
pub(crate) fn timestamp(time: Option<&DateTime>) -> Option<String> {
    time.and_then(|t| t.fmt(DateTimeFormat::DateTime).ok())
}

/// The external name, or a validation error for a resource that was never created
pub(crate) fn required_external_name<K: Managed>(mg: &K) -> Result<String, ReconcilerError> {
    mg.external_name()
        .map(str::to_string)
        .ok_or_else(|| ReconcilerError::Invalid("external name is not set".to_string()))
}

/// A spec field that must have been set, directly or through a reference
pub(crate) fn required<'a>(
    value: &'a Option<String>,
    field: &str,
) -> Result<&'a str, ReconcilerError> {
    value
        .as_deref()
        .ok_or_else(|| ReconcilerError::Invalid(format!("{field} is required")))
}
