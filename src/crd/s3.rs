//! # S3 Kinds
//!
//! `s3.aws.microscaler.io/v1beta1`: BucketPolicy.

use crate::controller::reference::{ReferenceError, ResolveReferences, Resolver};
use crate::crd::common::ResourceSpec;
use crate::crd::managed::impl_managed;
use crate::crd::status::Condition;
use async_trait::async_trait;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The bucket policy of an existing S3 bucket
///
/// The external name is the bucket name.
///
/// # Example
///
/// ```yaml
/// apiVersion: s3.aws.microscaler.io/v1beta1
/// kind: BucketPolicy
/// metadata:
///   name: public-list
/// spec:
///   forProvider:
///     region: us-east-1
///     bucketName: my-bucket
///     policy: |
///       {
///         "Version": "2012-10-17",
///         "Statement": [{
///           "Effect": "Allow",
///           "Principal": "*",
///           "Action": "s3:ListBucket",
///           "Resource": "arn:aws:s3:::my-bucket"
///         }]
///       }
/// ```
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "BucketPolicy",
    group = "s3.aws.microscaler.io",
    version = "v1beta1",
    status = "BucketPolicyStatus",
    category = "aws",
    printcolumn = r#"{"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}, {"name":"Synced", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Synced\")].status"}, {"name":"Bucket", "type":"string", "jsonPath":".spec.forProvider.bucketName"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct BucketPolicySpec {
    pub for_provider: BucketPolicyParameters,
    #[serde(flatten)]
    pub resource_spec: ResourceSpec,
}

/// Desired bucket policy
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BucketPolicyParameters {
    pub region: String,
    pub bucket_name: String,
    /// IAM policy document as JSON
    pub policy: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BucketPolicyStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl_managed!(BucketPolicy);

#[async_trait]
impl ResolveReferences for BucketPolicy {
    async fn resolve_references(&mut self, _resolver: &Resolver<'_>) -> Result<(), ReferenceError> {
        Ok(())
    }
}
