//! # EC2 Networking Kinds
//!
//! `ec2.aws.microscaler.io/v1beta1`: Address, InternetGateway, NATGateway,
//! RouteTable, SecurityGroup, Subnet, VPC and VPCCIDRBlock.

mod address;
mod internet_gateway;
mod nat_gateway;
mod route_table;
mod security_group;
mod subnet;
mod vpc;
mod vpc_cidr_block;

pub use address::*;
pub use internet_gateway::*;
pub use nat_gateway::*;
pub use route_table::*;
pub use security_group::*;
pub use subnet::*;
pub use vpc::*;
pub use vpc_cidr_block::*;
