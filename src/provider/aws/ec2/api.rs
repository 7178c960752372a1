//! # EC2 API
//!
//! The EC2 operations the networking handlers need. Requests are built from the
//! managed-resource parameters, responses are the SDK's own types.

use crate::crd::ec2::{
    AddressParameters, IpPermission, NatGatewayParameters, Route, SecurityGroupParameters,
    SubnetParameters, VpcCidrBlockParameters, VpcParameters,
};
use crate::crd::Tag;
use crate::provider::aws::errors::AwsError;
use async_trait::async_trait;
use aws_sdk_ec2::types as sdk;

/// VPC attributes that are read and modified one at a time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VpcAttribute {
    EnableDnsSupport,
    EnableDnsHostnames,
}

/// Subnet attributes that are modified one at a time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubnetAttribute {
    MapPublicIpOnLaunch(bool),
    AssignIpv6AddressOnCreation(bool),
}

/// Elastic IP lookup key: allocation id in the `vpc` domain, public IP in `standard`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressKey {
    AllocationId(String),
    PublicIp(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllocatedAddress {
    pub allocation_id: Option<String>,
    pub public_ip: Option<String>,
}

/// Association created by `associate_vpc_cidr_block`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CidrAssociation {
    pub association_id: Option<String>,
}

/// Security group rule direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ingress,
    Egress,
}

/// Route destination; exactly one of the two is set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDestination {
    Ipv4(String),
    Ipv6(String),
}

#[async_trait]
pub trait Ec2Api: Send + Sync {
    async fn create_tags(&self, resource_id: &str, tags: &[Tag]) -> Result<(), AwsError>;
    async fn delete_tags(&self, resource_id: &str, keys: &[String]) -> Result<(), AwsError>;

    async fn describe_vpc(&self, vpc_id: &str) -> Result<Option<sdk::Vpc>, AwsError>;
    async fn describe_vpc_attribute(
        &self,
        vpc_id: &str,
        attribute: VpcAttribute,
    ) -> Result<Option<bool>, AwsError>;
    async fn create_vpc(&self, params: &VpcParameters) -> Result<sdk::Vpc, AwsError>;
    async fn modify_vpc_attribute(
        &self,
        vpc_id: &str,
        attribute: VpcAttribute,
        value: bool,
    ) -> Result<(), AwsError>;
    async fn modify_vpc_tenancy(&self, vpc_id: &str, tenancy: &str) -> Result<(), AwsError>;
    async fn delete_vpc(&self, vpc_id: &str) -> Result<(), AwsError>;

    async fn associate_vpc_cidr_block(
        &self,
        vpc_id: &str,
        params: &VpcCidrBlockParameters,
    ) -> Result<CidrAssociation, AwsError>;
    async fn disassociate_vpc_cidr_block(&self, association_id: &str) -> Result<(), AwsError>;

    async fn describe_subnet(&self, subnet_id: &str) -> Result<Option<sdk::Subnet>, AwsError>;
    async fn create_subnet(
        &self,
        vpc_id: &str,
        params: &SubnetParameters,
    ) -> Result<sdk::Subnet, AwsError>;
    async fn modify_subnet_attribute(
        &self,
        subnet_id: &str,
        attribute: SubnetAttribute,
    ) -> Result<(), AwsError>;
    async fn delete_subnet(&self, subnet_id: &str) -> Result<(), AwsError>;

    async fn describe_internet_gateway(
        &self,
        internet_gateway_id: &str,
    ) -> Result<Option<sdk::InternetGateway>, AwsError>;
    async fn create_internet_gateway(&self, tags: &[Tag])
        -> Result<sdk::InternetGateway, AwsError>;
    async fn attach_internet_gateway(
        &self,
        internet_gateway_id: &str,
        vpc_id: &str,
    ) -> Result<(), AwsError>;
    async fn detach_internet_gateway(
        &self,
        internet_gateway_id: &str,
        vpc_id: &str,
    ) -> Result<(), AwsError>;
    async fn delete_internet_gateway(&self, internet_gateway_id: &str) -> Result<(), AwsError>;

    async fn describe_nat_gateway(
        &self,
        nat_gateway_id: &str,
    ) -> Result<Option<sdk::NatGateway>, AwsError>;
    async fn create_nat_gateway(
        &self,
        params: &NatGatewayParameters,
        client_token: &str,
    ) -> Result<sdk::NatGateway, AwsError>;
    async fn delete_nat_gateway(&self, nat_gateway_id: &str) -> Result<(), AwsError>;

    async fn describe_address(&self, key: &AddressKey) -> Result<Option<sdk::Address>, AwsError>;
    async fn allocate_address(&self, params: &AddressParameters)
        -> Result<AllocatedAddress, AwsError>;
    async fn release_address(&self, key: &AddressKey) -> Result<(), AwsError>;

    async fn describe_route_table(
        &self,
        route_table_id: &str,
    ) -> Result<Option<sdk::RouteTable>, AwsError>;
    async fn create_route_table(
        &self,
        vpc_id: &str,
        tags: &[Tag],
    ) -> Result<sdk::RouteTable, AwsError>;
    async fn create_route(&self, route_table_id: &str, route: &Route) -> Result<(), AwsError>;
    async fn delete_route(
        &self,
        route_table_id: &str,
        destination: &RouteDestination,
    ) -> Result<(), AwsError>;
    async fn associate_route_table(
        &self,
        route_table_id: &str,
        subnet_id: &str,
    ) -> Result<Option<String>, AwsError>;
    async fn disassociate_route_table(&self, association_id: &str) -> Result<(), AwsError>;
    async fn delete_route_table(&self, route_table_id: &str) -> Result<(), AwsError>;

    async fn describe_security_group(
        &self,
        group_id: &str,
    ) -> Result<Option<sdk::SecurityGroup>, AwsError>;
    /// Id of the group named `group_name` in `vpc_id` (the default VPC when `None`)
    async fn find_security_group(
        &self,
        vpc_id: Option<&str>,
        group_name: &str,
    ) -> Result<Option<String>, AwsError>;
    async fn create_security_group(
        &self,
        vpc_id: Option<&str>,
        params: &SecurityGroupParameters,
    ) -> Result<String, AwsError>;
    async fn authorize(
        &self,
        group_id: &str,
        direction: Direction,
        permissions: &[IpPermission],
    ) -> Result<(), AwsError>;
    async fn revoke(
        &self,
        group_id: &str,
        direction: Direction,
        permissions: &[IpPermission],
    ) -> Result<(), AwsError>;
    async fn delete_security_group(&self, group_id: &str) -> Result<(), AwsError>;
}
