//! # Constants
//!
//! Shared defaults for the provider. Environment variables and CLI flags
//! override the values that are configurable (see `config`).

/// Annotation holding the AWS identifier of the external resource
pub const ANNOTATION_EXTERNAL_NAME: &str = "managed.microscaler.io/external-name";

/// Finalizer placed on every managed resource before the first external call
pub const FINALIZER: &str = "finalizer.managedresource.aws.microscaler.io";

/// Field manager used for server-side patches
pub const FIELD_MANAGER: &str = "provider-aws";

/// Name of the ProviderConfig used when a resource does not reference one
pub const DEFAULT_PROVIDER_CONFIG_NAME: &str = "default";

/// Default poll interval for up-to-date resources (seconds)
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

/// Default requeue after reference, fatal and deletion-in-progress outcomes (seconds)
pub const DEFAULT_SHORT_WAIT_SECS: u64 = 30;

/// Default requeue right after a successful create (seconds)
pub const DEFAULT_CREATE_REQUEUE_SECS: u64 = 5;

/// Default maximum number of concurrent reconciles per kind
pub const DEFAULT_MAX_RECONCILE_RATE: u16 = 5;

/// Default minimum error backoff (seconds)
pub const DEFAULT_ERROR_BACKOFF_MIN_SECS: u64 = 1;

/// Default maximum error backoff (seconds)
pub const DEFAULT_ERROR_BACKOFF_MAX_SECS: u64 = 300;

/// Default per-operation budget for AWS calls (seconds)
pub const DEFAULT_AWS_CALL_TIMEOUT_SECS: u64 = 60;

/// Default AWS region used when loading the base SDK configuration
pub const DEFAULT_AWS_REGION: &str = "us-east-1";

/// Default HTTP server port for metrics and probes
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// Default server startup timeout (seconds)
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Default server readiness poll interval (milliseconds)
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

/// Default delay before restarting a failed controller stream (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_SECS: u64 = 5;

/// Principal that ACM uses to renew private certificates
pub const ACM_SERVICE_PRINCIPAL: &str = "acm.amazonaws.com";

/// IAM policy language version emitted when a document omits one
pub const DEFAULT_POLICY_VERSION: &str = "2012-10-17";
