//! # EC2 SDK Adapter
//!
//! [`Ec2Api`] on top of `aws_sdk_ec2::Client`.

use crate::crd::ec2::{
    AddressParameters, IpPermission, NatGatewayParameters, Route, SecurityGroupParameters,
    SubnetParameters, VpcCidrBlockParameters, VpcParameters,
};
use crate::crd::Tag;
use crate::provider::aws::ec2::api::{
    AddressKey, AllocatedAddress, CidrAssociation, Direction, Ec2Api, RouteDestination,
    SubnetAttribute, VpcAttribute,
};
use crate::provider::aws::errors::AwsError;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_ec2::types as sdk;
use aws_sdk_ec2::Client;

/// EC2 client for one region and set of credentials
#[derive(Debug, Clone)]
pub struct SdkEc2 {
    client: Client,
}

impl SdkEc2 {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }
}

fn sdk_tags(tags: &[Tag]) -> Vec<sdk::Tag> {
    tags.iter()
        .map(|t| {
            sdk::Tag::builder()
                .key(&t.key)
                .set_value(t.value.clone())
                .build()
        })
        .collect()
}

/// Tags applied at creation; `None` when there are none, since AWS rejects
/// an empty specification
fn tag_specifications(
    resource_type: sdk::ResourceType,
    tags: &[Tag],
) -> Option<Vec<sdk::TagSpecification>> {
    (!tags.is_empty()).then(|| {
        vec![sdk::TagSpecification::builder()
            .resource_type(resource_type)
            .set_tags(Some(sdk_tags(tags)))
            .build()]
    })
}

fn boolean(value: bool) -> sdk::AttributeBooleanValue {
    sdk::AttributeBooleanValue::builder().value(value).build()
}

fn missing(what: &str) -> AwsError {
    AwsError::construction(format!("AWS returned no {what}"))
}

/// Convert spec rules into SDK rules
pub(crate) fn sdk_permissions(permissions: &[IpPermission]) -> Vec<sdk::IpPermission> {
    permissions
        .iter()
        .map(|p| {
            sdk::IpPermission::builder()
                .ip_protocol(&p.ip_protocol)
                .set_from_port(p.from_port)
                .set_to_port(p.to_port)
                .set_ip_ranges(Some(
                    p.ip_ranges
                        .iter()
                        .map(|r| {
                            sdk::IpRange::builder()
                                .cidr_ip(&r.cidr_ip)
                                .set_description(r.description.clone())
                                .build()
                        })
                        .collect(),
                ))
                .set_ipv6_ranges(Some(
                    p.ipv6_ranges
                        .iter()
                        .map(|r| {
                            sdk::Ipv6Range::builder()
                                .cidr_ipv6(&r.cidr_ipv6)
                                .set_description(r.description.clone())
                                .build()
                        })
                        .collect(),
                ))
                .set_prefix_list_ids(Some(
                    p.prefix_list_ids
                        .iter()
                        .map(|r| {
                            sdk::PrefixListId::builder()
                                .prefix_list_id(&r.prefix_list_id)
                                .set_description(r.description.clone())
                                .build()
                        })
                        .collect(),
                ))
                .set_user_id_group_pairs(Some(
                    p.user_id_group_pairs
                        .iter()
                        .map(|pair| {
                            sdk::UserIdGroupPair::builder()
                                .set_description(pair.description.clone())
                                .set_group_id(pair.group_id.clone())
                                .set_group_name(pair.group_name.clone())
                                .set_user_id(pair.user_id.clone())
                                .set_vpc_id(pair.vpc_id.clone())
                                .set_vpc_peering_connection_id(
                                    pair.vpc_peering_connection_id.clone(),
                                )
                                .build()
                        })
                        .collect(),
                ))
                .build()
        })
        .collect()
}

#[async_trait]
impl Ec2Api for SdkEc2 {
    async fn create_tags(&self, resource_id: &str, tags: &[Tag]) -> Result<(), AwsError> {
        self.client
            .create_tags()
            .resources(resource_id)
            .set_tags(Some(sdk_tags(tags)))
            .send()
            .await?;
        Ok(())
    }

    async fn delete_tags(&self, resource_id: &str, keys: &[String]) -> Result<(), AwsError> {
        let tags = keys
            .iter()
            .map(|key| sdk::Tag::builder().key(key).build())
            .collect();
        self.client
            .delete_tags()
            .resources(resource_id)
            .set_tags(Some(tags))
            .send()
            .await?;
        Ok(())
    }

    async fn describe_vpc(&self, vpc_id: &str) -> Result<Option<sdk::Vpc>, AwsError> {
        let output = self.client.describe_vpcs().vpc_ids(vpc_id).send().await?;
        Ok(output.vpcs().first().cloned())
    }

    async fn describe_vpc_attribute(
        &self,
        vpc_id: &str,
        attribute: VpcAttribute,
    ) -> Result<Option<bool>, AwsError> {
        let name = match attribute {
            VpcAttribute::EnableDnsSupport => sdk::VpcAttributeName::EnableDnsSupport,
            VpcAttribute::EnableDnsHostnames => sdk::VpcAttributeName::EnableDnsHostnames,
        };
        let output = self
            .client
            .describe_vpc_attribute()
            .vpc_id(vpc_id)
            .attribute(name)
            .send()
            .await?;
        let value = match attribute {
            VpcAttribute::EnableDnsSupport => output.enable_dns_support(),
            VpcAttribute::EnableDnsHostnames => output.enable_dns_hostnames(),
        };
        Ok(value.and_then(|v| v.value()))
    }

    async fn create_vpc(&self, params: &VpcParameters) -> Result<sdk::Vpc, AwsError> {
        let output = self
            .client
            .create_vpc()
            .cidr_block(&params.cidr_block)
            .set_amazon_provided_ipv6_cidr_block(params.amazon_provided_ipv6_cidr_block)
            .set_instance_tenancy(params.instance_tenancy.as_deref().map(sdk::Tenancy::from))
            .set_tag_specifications(tag_specifications(sdk::ResourceType::Vpc, &params.tags))
            .send()
            .await?;
        output.vpc().cloned().ok_or_else(|| missing("VPC"))
    }

    async fn modify_vpc_attribute(
        &self,
        vpc_id: &str,
        attribute: VpcAttribute,
        value: bool,
    ) -> Result<(), AwsError> {
        // one attribute per call
        let request = self.client.modify_vpc_attribute().vpc_id(vpc_id);
        let request = match attribute {
            VpcAttribute::EnableDnsSupport => request.enable_dns_support(boolean(value)),
            VpcAttribute::EnableDnsHostnames => request.enable_dns_hostnames(boolean(value)),
        };
        request.send().await?;
        Ok(())
    }

    async fn modify_vpc_tenancy(&self, vpc_id: &str, tenancy: &str) -> Result<(), AwsError> {
        self.client
            .modify_vpc_tenancy()
            .vpc_id(vpc_id)
            .instance_tenancy(sdk::VpcTenancy::from(tenancy))
            .send()
            .await?;
        Ok(())
    }

    async fn delete_vpc(&self, vpc_id: &str) -> Result<(), AwsError> {
        self.client.delete_vpc().vpc_id(vpc_id).send().await?;
        Ok(())
    }

    async fn associate_vpc_cidr_block(
        &self,
        vpc_id: &str,
        params: &VpcCidrBlockParameters,
    ) -> Result<CidrAssociation, AwsError> {
        let output = self
            .client
            .associate_vpc_cidr_block()
            .vpc_id(vpc_id)
            .set_cidr_block(params.cidr_block.clone())
            .set_amazon_provided_ipv6_cidr_block(params.amazon_provided_ipv6_cidr_block)
            .set_ipv6_cidr_block(params.ipv6_cidr_block.clone())
            .set_ipv6_pool(params.ipv6_pool.clone())
            .set_ipv6_cidr_block_network_border_group(
                params.ipv6_cidr_block_network_border_group.clone(),
            )
            .send()
            .await?;
        let association_id = output
            .cidr_block_association()
            .and_then(|a| a.association_id())
            .or_else(|| {
                output
                    .ipv6_cidr_block_association()
                    .and_then(|a| a.association_id())
            })
            .map(str::to_string);
        Ok(CidrAssociation { association_id })
    }

    async fn disassociate_vpc_cidr_block(&self, association_id: &str) -> Result<(), AwsError> {
        self.client
            .disassociate_vpc_cidr_block()
            .association_id(association_id)
            .send()
            .await?;
        Ok(())
    }

    async fn describe_subnet(&self, subnet_id: &str) -> Result<Option<sdk::Subnet>, AwsError> {
        let output = self
            .client
            .describe_subnets()
            .subnet_ids(subnet_id)
            .send()
            .await?;
        Ok(output.subnets().first().cloned())
    }

    async fn create_subnet(
        &self,
        vpc_id: &str,
        params: &SubnetParameters,
    ) -> Result<sdk::Subnet, AwsError> {
        let output = self
            .client
            .create_subnet()
            .vpc_id(vpc_id)
            .cidr_block(&params.cidr_block)
            .set_availability_zone(params.availability_zone.clone())
            .set_availability_zone_id(params.availability_zone_id.clone())
            .set_ipv6_cidr_block(params.ipv6_cidr_block.clone())
            .set_tag_specifications(tag_specifications(sdk::ResourceType::Subnet, &params.tags))
            .send()
            .await?;
        output.subnet().cloned().ok_or_else(|| missing("subnet"))
    }

    async fn modify_subnet_attribute(
        &self,
        subnet_id: &str,
        attribute: SubnetAttribute,
    ) -> Result<(), AwsError> {
        let request = self.client.modify_subnet_attribute().subnet_id(subnet_id);
        let request = match attribute {
            SubnetAttribute::MapPublicIpOnLaunch(value) => {
                request.map_public_ip_on_launch(boolean(value))
            }
            SubnetAttribute::AssignIpv6AddressOnCreation(value) => {
                request.assign_ipv6_address_on_creation(boolean(value))
            }
        };
        request.send().await?;
        Ok(())
    }

    async fn delete_subnet(&self, subnet_id: &str) -> Result<(), AwsError> {
        self.client.delete_subnet().subnet_id(subnet_id).send().await?;
        Ok(())
    }

    async fn describe_internet_gateway(
        &self,
        internet_gateway_id: &str,
    ) -> Result<Option<sdk::InternetGateway>, AwsError> {
        let output = self
            .client
            .describe_internet_gateways()
            .internet_gateway_ids(internet_gateway_id)
            .send()
            .await?;
        Ok(output.internet_gateways().first().cloned())
    }

    async fn create_internet_gateway(
        &self,
        tags: &[Tag],
    ) -> Result<sdk::InternetGateway, AwsError> {
        let output = self
            .client
            .create_internet_gateway()
            .set_tag_specifications(tag_specifications(sdk::ResourceType::InternetGateway, tags))
            .send()
            .await?;
        output
            .internet_gateway()
            .cloned()
            .ok_or_else(|| missing("internet gateway"))
    }

    async fn attach_internet_gateway(
        &self,
        internet_gateway_id: &str,
        vpc_id: &str,
    ) -> Result<(), AwsError> {
        self.client
            .attach_internet_gateway()
            .internet_gateway_id(internet_gateway_id)
            .vpc_id(vpc_id)
            .send()
            .await?;
        Ok(())
    }

    async fn detach_internet_gateway(
        &self,
        internet_gateway_id: &str,
        vpc_id: &str,
    ) -> Result<(), AwsError> {
        self.client
            .detach_internet_gateway()
            .internet_gateway_id(internet_gateway_id)
            .vpc_id(vpc_id)
            .send()
            .await?;
        Ok(())
    }

    async fn delete_internet_gateway(&self, internet_gateway_id: &str) -> Result<(), AwsError> {
        self.client
            .delete_internet_gateway()
            .internet_gateway_id(internet_gateway_id)
            .send()
            .await?;
        Ok(())
    }

    async fn describe_nat_gateway(
        &self,
        nat_gateway_id: &str,
    ) -> Result<Option<sdk::NatGateway>, AwsError> {
        let output = self
            .client
            .describe_nat_gateways()
            .nat_gateway_ids(nat_gateway_id)
            .send()
            .await?;
        Ok(output.nat_gateways().first().cloned())
    }

    async fn create_nat_gateway(
        &self,
        params: &NatGatewayParameters,
        client_token: &str,
    ) -> Result<sdk::NatGateway, AwsError> {
        let output = self
            .client
            .create_nat_gateway()
            .set_allocation_id(params.allocation_id.clone())
            .set_subnet_id(params.subnet_id.clone())
            .set_connectivity_type(
                params
                    .connectivity_type
                    .as_deref()
                    .map(sdk::ConnectivityType::from),
            )
            .client_token(client_token)
            .set_tag_specifications(tag_specifications(sdk::ResourceType::Natgateway, &params.tags))
            .send()
            .await?;
        output
            .nat_gateway()
            .cloned()
            .ok_or_else(|| missing("NAT gateway"))
    }

    async fn delete_nat_gateway(&self, nat_gateway_id: &str) -> Result<(), AwsError> {
        self.client
            .delete_nat_gateway()
            .nat_gateway_id(nat_gateway_id)
            .send()
            .await?;
        Ok(())
    }

    async fn describe_address(&self, key: &AddressKey) -> Result<Option<sdk::Address>, AwsError> {
        let request = self.client.describe_addresses();
        let request = match key {
            AddressKey::AllocationId(id) => request.allocation_ids(id),
            AddressKey::PublicIp(ip) => request.public_ips(ip),
        };
        let output = request.send().await?;
        Ok(output.addresses().first().cloned())
    }

    async fn allocate_address(
        &self,
        params: &AddressParameters,
    ) -> Result<AllocatedAddress, AwsError> {
        let output = self
            .client
            .allocate_address()
            .set_domain(params.domain.as_deref().map(sdk::DomainType::from))
            .set_address(params.address.clone())
            .set_public_ipv4_pool(params.public_ipv4_pool.clone())
            .set_customer_owned_ipv4_pool(params.customer_owned_ipv4_pool.clone())
            .set_network_border_group(params.network_border_group.clone())
            .set_tag_specifications(tag_specifications(
                sdk::ResourceType::ElasticIp,
                &params.tags,
            ))
            .send()
            .await?;
        Ok(AllocatedAddress {
            allocation_id: output.allocation_id().map(str::to_string),
            public_ip: output.public_ip().map(str::to_string),
        })
    }

    async fn release_address(&self, key: &AddressKey) -> Result<(), AwsError> {
        let request = self.client.release_address();
        let request = match key {
            AddressKey::AllocationId(id) => request.allocation_id(id),
            AddressKey::PublicIp(ip) => request.public_ip(ip),
        };
        request.send().await?;
        Ok(())
    }

    async fn describe_route_table(
        &self,
        route_table_id: &str,
    ) -> Result<Option<sdk::RouteTable>, AwsError> {
        let output = self
            .client
            .describe_route_tables()
            .route_table_ids(route_table_id)
            .send()
            .await?;
        Ok(output.route_tables().first().cloned())
    }

    async fn create_route_table(
        &self,
        vpc_id: &str,
        tags: &[Tag],
    ) -> Result<sdk::RouteTable, AwsError> {
        let output = self
            .client
            .create_route_table()
            .vpc_id(vpc_id)
            .set_tag_specifications(tag_specifications(sdk::ResourceType::RouteTable, tags))
            .send()
            .await?;
        output
            .route_table()
            .cloned()
            .ok_or_else(|| missing("route table"))
    }

    async fn create_route(&self, route_table_id: &str, route: &Route) -> Result<(), AwsError> {
        self.client
            .create_route()
            .route_table_id(route_table_id)
            .set_destination_cidr_block(route.destination_cidr_block.clone())
            .set_destination_ipv6_cidr_block(route.destination_ipv6_cidr_block.clone())
            .set_gateway_id(route.gateway_id.clone())
            .set_instance_id(route.instance_id.clone())
            .set_nat_gateway_id(route.nat_gateway_id.clone())
            .set_network_interface_id(route.network_interface_id.clone())
            .set_transit_gateway_id(route.transit_gateway_id.clone())
            .set_vpc_peering_connection_id(route.vpc_peering_connection_id.clone())
            .send()
            .await?;
        Ok(())
    }

    async fn delete_route(
        &self,
        route_table_id: &str,
        destination: &RouteDestination,
    ) -> Result<(), AwsError> {
        let request = self.client.delete_route().route_table_id(route_table_id);
        let request = match destination {
            RouteDestination::Ipv4(cidr) => request.destination_cidr_block(cidr),
            RouteDestination::Ipv6(cidr) => request.destination_ipv6_cidr_block(cidr),
        };
        request.send().await?;
        Ok(())
    }

    async fn associate_route_table(
        &self,
        route_table_id: &str,
        subnet_id: &str,
    ) -> Result<Option<String>, AwsError> {
        let output = self
            .client
            .associate_route_table()
            .route_table_id(route_table_id)
            .subnet_id(subnet_id)
            .send()
            .await?;
        Ok(output.association_id().map(str::to_string))
    }

    async fn disassociate_route_table(&self, association_id: &str) -> Result<(), AwsError> {
        self.client
            .disassociate_route_table()
            .association_id(association_id)
            .send()
            .await?;
        Ok(())
    }

    async fn delete_route_table(&self, route_table_id: &str) -> Result<(), AwsError> {
        self.client
            .delete_route_table()
            .route_table_id(route_table_id)
            .send()
            .await?;
        Ok(())
    }

    async fn describe_security_group(
        &self,
        group_id: &str,
    ) -> Result<Option<sdk::SecurityGroup>, AwsError> {
        let output = self
            .client
            .describe_security_groups()
            .group_ids(group_id)
            .send()
            .await?;
        Ok(output.security_groups().first().cloned())
    }

    async fn find_security_group(
        &self,
        vpc_id: Option<&str>,
        group_name: &str,
    ) -> Result<Option<String>, AwsError> {
        let mut request = self.client.describe_security_groups().filters(
            sdk::Filter::builder()
                .name("group-name")
                .values(group_name)
                .build(),
        );
        if let Some(vpc_id) = vpc_id {
            request = request.filters(sdk::Filter::builder().name("vpc-id").values(vpc_id).build());
        }
        let output = request.send().await?;
        Ok(output
            .security_groups()
            .first()
            .and_then(|g| g.group_id())
            .map(str::to_string))
    }

    async fn create_security_group(
        &self,
        vpc_id: Option<&str>,
        params: &SecurityGroupParameters,
    ) -> Result<String, AwsError> {
        let output = self
            .client
            .create_security_group()
            .group_name(&params.group_name)
            .description(&params.description)
            .set_vpc_id(vpc_id.map(str::to_string))
            .set_tag_specifications(tag_specifications(
                sdk::ResourceType::SecurityGroup,
                &params.tags,
            ))
            .send()
            .await?;
        output
            .group_id()
            .map(str::to_string)
            .ok_or_else(|| missing("security group id"))
    }

    async fn authorize(
        &self,
        group_id: &str,
        direction: Direction,
        permissions: &[IpPermission],
    ) -> Result<(), AwsError> {
        let rules = Some(sdk_permissions(permissions));
        match direction {
            Direction::Ingress => {
                self.client
                    .authorize_security_group_ingress()
                    .group_id(group_id)
                    .set_ip_permissions(rules)
                    .send()
                    .await?;
            }
            Direction::Egress => {
                self.client
                    .authorize_security_group_egress()
                    .group_id(group_id)
                    .set_ip_permissions(rules)
                    .send()
                    .await?;
            }
        }
        Ok(())
    }

    async fn revoke(
        &self,
        group_id: &str,
        direction: Direction,
        permissions: &[IpPermission],
    ) -> Result<(), AwsError> {
        let rules = Some(sdk_permissions(permissions));
        match direction {
            Direction::Ingress => {
                self.client
                    .revoke_security_group_ingress()
                    .group_id(group_id)
                    .set_ip_permissions(rules)
                    .send()
                    .await?;
            }
            Direction::Egress => {
                self.client
                    .revoke_security_group_egress()
                    .group_id(group_id)
                    .set_ip_permissions(rules)
                    .send()
                    .await?;
            }
        }
        Ok(())
    }

    async fn delete_security_group(&self, group_id: &str) -> Result<(), AwsError> {
        self.client
            .delete_security_group()
            .group_id(group_id)
            .send()
            .await?;
        Ok(())
    }
}
