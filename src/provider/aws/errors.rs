//! # AWS Error Classification
//!
//! Reduces AWS SDK errors to [`AwsError`] and maps `(kind, error code)` pairs
//! to the [`ErrorCategory`] the reconciliation engine acts on.
//!
//! Lookup order:
//! 1. the per-kind code table
//! 2. codes shared by every AWS service (throttling, validation, 5xx)
//! 3. the transport outcome (timeouts and dispatch failures are transient)
//! 4. the HTTP status (429 and 5xx are transient)
//!
//! Anything left is fatal.

use crate::controller::reconciler::ErrorCategory;
use aws_sdk_ec2::config::http::HttpResponse;
use aws_sdk_ec2::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use std::fmt;
use thiserror::Error;

/// How an SDK call failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AwsErrorKind {
    /// AWS answered with a modeled or unmodeled error code
    Service,
    /// The call did not complete within its budget
    Timeout,
    /// The request could not be sent (DNS, connection, TLS)
    Dispatch,
    /// The request could not be built from the spec
    Construction,
    /// The response could not be parsed
    Response,
}

/// AWS SDK error reduced to what classification and condition messages need
#[derive(Debug, Clone, Error)]
pub struct AwsError {
    pub kind: AwsErrorKind,
    pub code: Option<String>,
    pub message: Option<String>,
    pub status: Option<u16>,
}

impl fmt::Display for AwsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.code, &self.message) {
            (Some(code), Some(message)) => write!(f, "{code}: {message}"),
            (Some(code), None) => write!(f, "{code}"),
            (None, Some(message)) => write!(f, "{message}"),
            (None, None) => write!(f, "{:?} error", self.kind),
        }
    }
}

impl AwsError {
    /// A service error with an error code; used by fakes and for synthesized failures
    pub fn service(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: AwsErrorKind::Service,
            code: Some(code.into()),
            message: Some(message.into()),
            status: Some(400),
        }
    }

    /// A request that could not be built
    pub fn construction(message: impl fmt::Display) -> Self {
        Self {
            kind: AwsErrorKind::Construction,
            code: None,
            message: Some(message.to_string()),
            status: None,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: AwsErrorKind::Timeout,
            code: None,
            message: Some(message.into()),
            status: None,
        }
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }
}

impl<E> From<SdkError<E, HttpResponse>> for AwsError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    fn from(err: SdkError<E, HttpResponse>) -> Self {
        let kind = match &err {
            SdkError::ServiceError(_) => AwsErrorKind::Service,
            SdkError::TimeoutError(_) => AwsErrorKind::Timeout,
            SdkError::DispatchFailure(_) => AwsErrorKind::Dispatch,
            SdkError::ConstructionFailure(_) => AwsErrorKind::Construction,
            _ => AwsErrorKind::Response,
        };
        let status = err.raw_response().map(|r| r.status().as_u16());
        let code = err.code().map(str::to_string);
        let message = err
            .message()
            .map(str::to_string)
            .or_else(|| Some(DisplayErrorContext(&err).to_string()));
        Self {
            kind,
            code,
            message,
            status,
        }
    }
}

/// Kinds with their own error-code tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Certificate,
    CertificateAuthority,
    CertificateAuthorityPermission,
    Address,
    InternetGateway,
    NatGateway,
    RouteTable,
    SecurityGroup,
    Subnet,
    Vpc,
    VpcCidrBlock,
    BucketPolicy,
    AccessPoint,
    AccessPointPolicy,
}

use self::ResourceKind as K;
use crate::controller::reconciler::ErrorCategory::{
    AlreadyExists, ConflictingState, NotFound, RuleAlreadyExists, Transient, Validation,
};

/// Per-kind error codes
static KIND_CODES: &[(ResourceKind, &str, ErrorCategory)] = &[
    (K::Certificate, "ResourceNotFoundException", NotFound),
    (K::Certificate, "RequestInProgressException", Transient),
    (K::Certificate, "InvalidArnException", Validation),
    (K::Certificate, "InvalidDomainValidationOptionsException", Validation),
    (K::CertificateAuthority, "ResourceNotFoundException", NotFound),
    (K::CertificateAuthority, "InvalidStateException", ConflictingState),
    (K::CertificateAuthority, "InvalidArnException", Validation),
    (K::CertificateAuthority, "InvalidArgsException", Validation),
    (K::CertificateAuthority, "InvalidPolicyException", Validation),
    (K::CertificateAuthorityPermission, "ResourceNotFoundException", NotFound),
    (K::CertificateAuthorityPermission, "PermissionAlreadyExistsException", AlreadyExists),
    (K::CertificateAuthorityPermission, "InvalidStateException", ConflictingState),
    (K::Address, "InvalidAddress.NotFound", NotFound),
    (K::Address, "InvalidAllocationID.NotFound", NotFound),
    (K::Address, "InvalidAddress.Malformed", Validation),
    (K::InternetGateway, "InvalidInternetGatewayID.NotFound", NotFound),
    (K::InternetGateway, "Gateway.NotAttached", NotFound),
    (K::InternetGateway, "Resource.AlreadyAssociated", AlreadyExists),
    (K::NatGateway, "NatGatewayNotFound", NotFound),
    (K::NatGateway, "InvalidNatGatewayID.NotFound", NotFound),
    (K::RouteTable, "InvalidRouteTableID.NotFound", NotFound),
    (K::RouteTable, "InvalidAssociationID.NotFound", NotFound),
    (K::RouteTable, "InvalidRoute.NotFound", NotFound),
    (K::RouteTable, "RouteAlreadyExists", AlreadyExists),
    (K::SecurityGroup, "InvalidGroup.NotFound", NotFound),
    (K::SecurityGroup, "InvalidGroup.Duplicate", AlreadyExists),
    (K::SecurityGroup, "InvalidPermission.Duplicate", RuleAlreadyExists),
    (K::SecurityGroup, "InvalidPermission.NotFound", NotFound),
    (K::SecurityGroup, "InvalidPermission.Malformed", Validation),
    (K::Subnet, "InvalidSubnetID.NotFound", NotFound),
    (K::Subnet, "InvalidSubnet.Range", Validation),
    (K::Subnet, "InvalidSubnet.Conflict", Validation),
    (K::Vpc, "InvalidVpcID.NotFound", NotFound),
    (K::Vpc, "InvalidVpc.Range", Validation),
    (K::VpcCidrBlock, "InvalidVpcCidrBlockAssociationID.NotFound", NotFound),
    (K::VpcCidrBlock, "InvalidVpcID.NotFound", NotFound),
    (K::BucketPolicy, "NoSuchBucketPolicy", NotFound),
    (K::BucketPolicy, "NoSuchBucket", NotFound),
    (K::BucketPolicy, "MalformedPolicy", Validation),
    (K::AccessPoint, "NoSuchAccessPoint", NotFound),
    (K::AccessPoint, "AccessPointAlreadyOwnedByYou", AlreadyExists),
    (K::AccessPointPolicy, "NoSuchAccessPointPolicy", NotFound),
    (K::AccessPointPolicy, "MalformedPolicy", Validation),
];

/// Codes every AWS service may return
static SHARED_CODES: &[(&str, ErrorCategory)] = &[
    ("Throttling", Transient),
    ("ThrottlingException", Transient),
    ("ThrottledException", Transient),
    ("RequestLimitExceeded", Transient),
    ("RequestThrottled", Transient),
    ("RequestThrottledException", Transient),
    ("TooManyRequestsException", Transient),
    ("SlowDown", Transient),
    ("RequestTimeout", Transient),
    ("RequestTimeoutException", Transient),
    ("InternalError", Transient),
    ("InternalFailure", Transient),
    ("ServiceUnavailable", Transient),
    ("ServiceUnavailableException", Transient),
    ("Unavailable", Transient),
    ("IDPCommunicationError", Transient),
    ("InvalidParameter", Validation),
    ("InvalidParameterValue", Validation),
    ("InvalidParameterCombination", Validation),
    ("MissingParameter", Validation),
    ("ValidationException", Validation),
    ("ValidationError", Validation),
];

/// Category of an AWS error raised while handling `kind`
pub fn classify(kind: ResourceKind, err: &AwsError) -> ErrorCategory {
    if let Some(code) = err.code() {
        if let Some((_, _, category)) = KIND_CODES
            .iter()
            .find(|(k, c, _)| *k == kind && *c == code)
        {
            return *category;
        }
        if let Some((_, category)) = SHARED_CODES.iter().find(|(c, _)| *c == code) {
            return *category;
        }
    }

    match err.kind {
        AwsErrorKind::Timeout | AwsErrorKind::Dispatch => return Transient,
        AwsErrorKind::Construction => return Validation,
        AwsErrorKind::Service | AwsErrorKind::Response => {}
    }

    match err.status {
        Some(429) => Transient,
        Some(status) if status >= 500 => Transient,
        _ => ErrorCategory::Fatal,
    }
}

/// Whether `err` means the external object is absent for `kind`
pub fn is_not_found(kind: ResourceKind, err: &AwsError) -> bool {
    classify(kind, err) == NotFound
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_specific_not_found() {
        let err = AwsError::service("InvalidVpcID.NotFound", "The vpc ID 'vpc-1' does not exist");
        assert_eq!(classify(ResourceKind::Vpc, &err), NotFound);
        assert!(is_not_found(ResourceKind::Vpc, &err));
        // Code belongs to another kind's table
        assert_eq!(classify(ResourceKind::Subnet, &err), ErrorCategory::Fatal);
    }

    #[test]
    fn test_same_code_differs_per_kind() {
        let err = AwsError::service("InvalidStateException", "CA is not disabled");
        assert_eq!(
            classify(ResourceKind::CertificateAuthority, &err),
            ConflictingState
        );
        assert_eq!(classify(ResourceKind::Certificate, &err), ErrorCategory::Fatal);
    }

    #[test]
    fn test_duplicate_rule() {
        let err = AwsError::service("InvalidPermission.Duplicate", "rule already exists");
        assert_eq!(classify(ResourceKind::SecurityGroup, &err), RuleAlreadyExists);
    }

    #[test]
    fn test_shared_codes() {
        let throttled = AwsError::service("RequestLimitExceeded", "slow down");
        assert_eq!(classify(ResourceKind::Subnet, &throttled), Transient);
        let invalid = AwsError::service("InvalidParameterValue", "bad cidr");
        assert_eq!(classify(ResourceKind::Subnet, &invalid), Validation);
    }

    #[test]
    fn test_transport_and_status_fallbacks() {
        assert_eq!(
            classify(ResourceKind::Vpc, &AwsError::timeout("operation timed out")),
            Transient
        );
        let server = AwsError {
            kind: AwsErrorKind::Service,
            code: Some("SomethingBroke".to_string()),
            message: None,
            status: Some(503),
        };
        assert_eq!(classify(ResourceKind::Vpc, &server), Transient);
        let unknown = AwsError::service("UnauthorizedOperation", "denied");
        assert_eq!(classify(ResourceKind::Vpc, &unknown), ErrorCategory::Fatal);
    }

    #[test]
    fn test_display() {
        let err = AwsError::service("NoSuchBucketPolicy", "The bucket policy does not exist");
        assert_eq!(
            err.to_string(),
            "NoSuchBucketPolicy: The bucket policy does not exist"
        );
    }
}
