//! # Custom Resource Definitions
//!
//! CRD types for the AWS provider.
//!
//! Every managed kind is cluster-scoped and has the same envelope:
//! `spec.forProvider` (desired AWS state), the shared [`ResourceSpec`] fields,
//! and `status.{conditions, atProvider}`.
//!
//! | Group | Kinds |
//! |-------|-------|
//! | `acm.aws.microscaler.io` | Certificate |
//! | `acmpca.aws.microscaler.io` | CertificateAuthority, CertificateAuthorityPermission |
//! | `ec2.aws.microscaler.io` | Address, InternetGateway, NATGateway, RouteTable, SecurityGroup, Subnet, VPC, VPCCIDRBlock |
//! | `s3.aws.microscaler.io` | BucketPolicy |
//! | `s3control.aws.microscaler.io` | AccessPoint |
//! | `aws.microscaler.io` | ProviderConfig |

pub mod acm;
pub mod acmpca;
pub mod common;
pub mod ec2;
pub mod managed;
pub mod provider;
pub mod s3;
pub mod s3control;
pub mod status;

pub use common::*;
pub use managed::Managed;
pub use provider::*;
pub use status::*;

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::CustomResourceExt;

/// Every CRD served by the provider
pub fn all_crds() -> Vec<CustomResourceDefinition> {
    vec![
        ProviderConfig::crd(),
        acm::Certificate::crd(),
        acmpca::CertificateAuthority::crd(),
        acmpca::CertificateAuthorityPermission::crd(),
        ec2::Address::crd(),
        ec2::InternetGateway::crd(),
        ec2::NatGateway::crd(),
        ec2::RouteTable::crd(),
        ec2::SecurityGroup::crd(),
        ec2::Subnet::crd(),
        ec2::Vpc::crd(),
        ec2::VpcCidrBlock::crd(),
        s3::BucketPolicy::crd(),
        s3control::AccessPoint::crd(),
    ]
}
