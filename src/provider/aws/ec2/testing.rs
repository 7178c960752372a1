//! In-memory [`Ec2Api`] for handler tests.

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
use aws_sdk_ec2::types as sdk;
use std::collections::BTreeMap;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct State {
    pub vpcs: BTreeMap<String, sdk::Vpc>,
    pub vpc_attributes: BTreeMap<(String, &'static str), bool>,
    pub subnets: BTreeMap<String, sdk::Subnet>,
    pub internet_gateways: BTreeMap<String, sdk::InternetGateway>,
    pub nat_gateways: BTreeMap<String, sdk::NatGateway>,
    pub addresses: BTreeMap<String, sdk::Address>,
    pub route_tables: BTreeMap<String, sdk::RouteTable>,
    pub security_groups: BTreeMap<String, sdk::SecurityGroup>,
    /// Operation name to the error it fails with
    pub failures: BTreeMap<&'static str, AwsError>,
    pub calls: Vec<String>,
}

/// Serves describes from [`State`]; mutating calls are recorded, and creates
/// insert a minimal object
#[derive(Debug, Default)]
pub struct FakeEc2 {
    pub state: Mutex<State>,
}

fn attribute_name(attribute: VpcAttribute) -> &'static str {
    match attribute {
        VpcAttribute::EnableDnsSupport => "enableDnsSupport",
        VpcAttribute::EnableDnsHostnames => "enableDnsHostnames",
    }
}

impl FakeEc2 {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, f: impl FnOnce(&mut State)) -> Self {
        if let Ok(mut state) = self.state.lock() {
            f(&mut state);
        }
        self
    }

    pub fn fail(&self, operation: &'static str, err: AwsError) {
        self.state.lock().unwrap().failures.insert(operation, err);
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn called(&self, prefix: &str) -> bool {
        self.calls().iter().any(|c| c.starts_with(prefix))
    }

    fn call(&self, operation: &'static str, detail: String) -> Result<(), AwsError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("{operation} {detail}").trim_end().to_string());
        match state.failures.get(operation) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn lookup<T: Clone>(
        &self,
        operation: &'static str,
        id: &str,
        table: impl FnOnce(&State) -> &BTreeMap<String, T>,
    ) -> Result<Option<T>, AwsError> {
        self.call(operation, id.to_string())?;
        let state = self.state.lock().unwrap();
        Ok(table(&state).get(id).cloned())
    }
}

fn rules(permissions: &[IpPermission]) -> String {
    let mut parts: Vec<String> = Vec::new();
    for p in permissions {
        let ports = format!(
            "{}:{}",
            p.from_port.unwrap_or(-1),
            p.to_port.unwrap_or(-1)
        );
        for r in &p.ip_ranges {
            parts.push(format!("{} {} {}", p.ip_protocol, ports, r.cidr_ip));
        }
        for r in &p.ipv6_ranges {
            parts.push(format!("{} {} {}", p.ip_protocol, ports, r.cidr_ipv6));
        }
        for r in &p.prefix_list_ids {
            parts.push(format!("{} {} {}", p.ip_protocol, ports, r.prefix_list_id));
        }
        for pair in &p.user_id_group_pairs {
            parts.push(format!(
                "{} {} {}",
                p.ip_protocol,
                ports,
                pair.group_id.as_deref().unwrap_or_default()
            ));
        }
    }
    parts.join(",")
}

#[async_trait]
impl Ec2Api for FakeEc2 {
    async fn create_tags(&self, resource_id: &str, tags: &[Tag]) -> Result<(), AwsError> {
        let keys: Vec<&str> = tags.iter().map(|t| t.key.as_str()).collect();
        self.call("create_tags", format!("{resource_id} {}", keys.join(",")))
    }

    async fn delete_tags(&self, resource_id: &str, keys: &[String]) -> Result<(), AwsError> {
        self.call("delete_tags", format!("{resource_id} {}", keys.join(",")))
    }

    async fn describe_vpc(&self, vpc_id: &str) -> Result<Option<sdk::Vpc>, AwsError> {
        self.lookup("describe_vpc", vpc_id, |s| &s.vpcs)
    }

    async fn describe_vpc_attribute(
        &self,
        vpc_id: &str,
        attribute: VpcAttribute,
    ) -> Result<Option<bool>, AwsError> {
        let name = attribute_name(attribute);
        self.call("describe_vpc_attribute", format!("{vpc_id} {name}"))?;
        let state = self.state.lock().unwrap();
        Ok(state
            .vpc_attributes
            .get(&(vpc_id.to_string(), name))
            .copied())
    }

    async fn create_vpc(&self, params: &VpcParameters) -> Result<sdk::Vpc, AwsError> {
        self.call("create_vpc", params.cidr_block.clone())?;
        let vpc = sdk::Vpc::builder()
            .vpc_id("vpc-new")
            .cidr_block(&params.cidr_block)
            .state(sdk::VpcState::Pending)
            .build();
        self.state
            .lock()
            .unwrap()
            .vpcs
            .insert("vpc-new".to_string(), vpc.clone());
        Ok(vpc)
    }

    async fn modify_vpc_attribute(
        &self,
        vpc_id: &str,
        attribute: VpcAttribute,
        value: bool,
    ) -> Result<(), AwsError> {
        let name = attribute_name(attribute);
        self.call("modify_vpc_attribute", format!("{vpc_id} {name}={value}"))?;
        self.state
            .lock()
            .unwrap()
            .vpc_attributes
            .insert((vpc_id.to_string(), name), value);
        Ok(())
    }

    async fn modify_vpc_tenancy(&self, vpc_id: &str, tenancy: &str) -> Result<(), AwsError> {
        self.call("modify_vpc_tenancy", format!("{vpc_id} {tenancy}"))
    }

    async fn delete_vpc(&self, vpc_id: &str) -> Result<(), AwsError> {
        self.call("delete_vpc", vpc_id.to_string())
    }

    async fn associate_vpc_cidr_block(
        &self,
        vpc_id: &str,
        params: &VpcCidrBlockParameters,
    ) -> Result<CidrAssociation, AwsError> {
        let cidr = params
            .cidr_block
            .clone()
            .or_else(|| params.ipv6_cidr_block.clone())
            .unwrap_or_default();
        self.call("associate_vpc_cidr_block", format!("{vpc_id} {cidr}"))?;
        Ok(CidrAssociation {
            association_id: Some("vpc-cidr-assoc-new".to_string()),
        })
    }

    async fn disassociate_vpc_cidr_block(&self, association_id: &str) -> Result<(), AwsError> {
        self.call("disassociate_vpc_cidr_block", association_id.to_string())
    }

    async fn describe_subnet(&self, subnet_id: &str) -> Result<Option<sdk::Subnet>, AwsError> {
        self.lookup("describe_subnet", subnet_id, |s| &s.subnets)
    }

    async fn create_subnet(
        &self,
        vpc_id: &str,
        params: &SubnetParameters,
    ) -> Result<sdk::Subnet, AwsError> {
        self.call("create_subnet", format!("{vpc_id} {}", params.cidr_block))?;
        Ok(sdk::Subnet::builder()
            .subnet_id("subnet-new")
            .vpc_id(vpc_id)
            .cidr_block(&params.cidr_block)
            .state(sdk::SubnetState::Pending)
            .build())
    }

    async fn modify_subnet_attribute(
        &self,
        subnet_id: &str,
        attribute: SubnetAttribute,
    ) -> Result<(), AwsError> {
        self.call("modify_subnet_attribute", format!("{subnet_id} {attribute:?}"))
    }

    async fn delete_subnet(&self, subnet_id: &str) -> Result<(), AwsError> {
        self.call("delete_subnet", subnet_id.to_string())
    }

    async fn describe_internet_gateway(
        &self,
        internet_gateway_id: &str,
    ) -> Result<Option<sdk::InternetGateway>, AwsError> {
        self.lookup("describe_internet_gateway", internet_gateway_id, |s| {
            &s.internet_gateways
        })
    }

    async fn create_internet_gateway(
        &self,
        _tags: &[Tag],
    ) -> Result<sdk::InternetGateway, AwsError> {
        self.call("create_internet_gateway", String::new())?;
        Ok(sdk::InternetGateway::builder()
            .internet_gateway_id("igw-new")
            .build())
    }

    async fn attach_internet_gateway(
        &self,
        internet_gateway_id: &str,
        vpc_id: &str,
    ) -> Result<(), AwsError> {
        self.call(
            "attach_internet_gateway",
            format!("{internet_gateway_id} {vpc_id}"),
        )
    }

    async fn detach_internet_gateway(
        &self,
        internet_gateway_id: &str,
        vpc_id: &str,
    ) -> Result<(), AwsError> {
        self.call(
            "detach_internet_gateway",
            format!("{internet_gateway_id} {vpc_id}"),
        )
    }

    async fn delete_internet_gateway(&self, internet_gateway_id: &str) -> Result<(), AwsError> {
        self.call("delete_internet_gateway", internet_gateway_id.to_string())
    }

    async fn describe_nat_gateway(
        &self,
        nat_gateway_id: &str,
    ) -> Result<Option<sdk::NatGateway>, AwsError> {
        self.lookup("describe_nat_gateway", nat_gateway_id, |s| &s.nat_gateways)
    }

    async fn create_nat_gateway(
        &self,
        params: &NatGatewayParameters,
        client_token: &str,
    ) -> Result<sdk::NatGateway, AwsError> {
        self.call(
            "create_nat_gateway",
            format!(
                "{} {client_token}",
                params.subnet_id.as_deref().unwrap_or_default()
            ),
        )?;
        Ok(sdk::NatGateway::builder()
            .nat_gateway_id("nat-new")
            .state(sdk::NatGatewayState::Pending)
            .build())
    }

    async fn delete_nat_gateway(&self, nat_gateway_id: &str) -> Result<(), AwsError> {
        self.call("delete_nat_gateway", nat_gateway_id.to_string())
    }

    async fn describe_address(&self, key: &AddressKey) -> Result<Option<sdk::Address>, AwsError> {
        let id = match key {
            AddressKey::AllocationId(id) | AddressKey::PublicIp(id) => id.as_str(),
        };
        self.lookup("describe_address", id, |s| &s.addresses)
    }

    async fn allocate_address(
        &self,
        params: &AddressParameters,
    ) -> Result<AllocatedAddress, AwsError> {
        self.call(
            "allocate_address",
            params.domain.clone().unwrap_or_default(),
        )?;
        Ok(AllocatedAddress {
            allocation_id: params
                .is_vpc_domain()
                .then(|| "eipalloc-new".to_string()),
            public_ip: Some("203.0.113.10".to_string()),
        })
    }

    async fn release_address(&self, key: &AddressKey) -> Result<(), AwsError> {
        self.call("release_address", format!("{key:?}"))
    }

    async fn describe_route_table(
        &self,
        route_table_id: &str,
    ) -> Result<Option<sdk::RouteTable>, AwsError> {
        self.lookup("describe_route_table", route_table_id, |s| &s.route_tables)
    }

    async fn create_route_table(
        &self,
        vpc_id: &str,
        _tags: &[Tag],
    ) -> Result<sdk::RouteTable, AwsError> {
        self.call("create_route_table", vpc_id.to_string())?;
        Ok(sdk::RouteTable::builder()
            .route_table_id("rtb-new")
            .vpc_id(vpc_id)
            .build())
    }

    async fn create_route(&self, route_table_id: &str, route: &Route) -> Result<(), AwsError> {
        let destination = route
            .destination_cidr_block
            .clone()
            .or_else(|| route.destination_ipv6_cidr_block.clone())
            .unwrap_or_default();
        self.call("create_route", format!("{route_table_id} {destination}"))
    }

    async fn delete_route(
        &self,
        route_table_id: &str,
        destination: &RouteDestination,
    ) -> Result<(), AwsError> {
        let cidr = match destination {
            RouteDestination::Ipv4(cidr) | RouteDestination::Ipv6(cidr) => cidr,
        };
        self.call("delete_route", format!("{route_table_id} {cidr}"))
    }

    async fn associate_route_table(
        &self,
        route_table_id: &str,
        subnet_id: &str,
    ) -> Result<Option<String>, AwsError> {
        self.call(
            "associate_route_table",
            format!("{route_table_id} {subnet_id}"),
        )?;
        Ok(Some(format!("rtbassoc-{subnet_id}")))
    }

    async fn disassociate_route_table(&self, association_id: &str) -> Result<(), AwsError> {
        self.call("disassociate_route_table", association_id.to_string())
    }

    async fn delete_route_table(&self, route_table_id: &str) -> Result<(), AwsError> {
        self.call("delete_route_table", route_table_id.to_string())
    }

    async fn describe_security_group(
        &self,
        group_id: &str,
    ) -> Result<Option<sdk::SecurityGroup>, AwsError> {
        self.lookup("describe_security_group", group_id, |s| &s.security_groups)
    }

    async fn find_security_group(
        &self,
        vpc_id: Option<&str>,
        group_name: &str,
    ) -> Result<Option<String>, AwsError> {
        self.call(
            "find_security_group",
            format!("{group_name} {}", vpc_id.unwrap_or_default()),
        )?;
        let state = self.state.lock().unwrap();
        Ok(state
            .security_groups
            .values()
            .find(|g| {
                g.group_name() == Some(group_name)
                    && (vpc_id.is_none() || g.vpc_id() == vpc_id)
            })
            .and_then(|g| g.group_id())
            .map(str::to_string))
    }

    async fn create_security_group(
        &self,
        vpc_id: Option<&str>,
        params: &SecurityGroupParameters,
    ) -> Result<String, AwsError> {
        self.call(
            "create_security_group",
            format!("{} {}", params.group_name, vpc_id.unwrap_or_default()),
        )?;
        Ok("sg-new".to_string())
    }

    async fn authorize(
        &self,
        group_id: &str,
        direction: Direction,
        permissions: &[IpPermission],
    ) -> Result<(), AwsError> {
        let operation = match direction {
            Direction::Ingress => "authorize_ingress",
            Direction::Egress => "authorize_egress",
        };
        self.call(operation, format!("{group_id} {}", rules(permissions)))
    }

    async fn revoke(
        &self,
        group_id: &str,
        direction: Direction,
        permissions: &[IpPermission],
    ) -> Result<(), AwsError> {
        let operation = match direction {
            Direction::Ingress => "revoke_ingress",
            Direction::Egress => "revoke_egress",
        };
        self.call(operation, format!("{group_id} {}", rules(permissions)))
    }

    async fn delete_security_group(&self, group_id: &str) -> Result<(), AwsError> {
        self.call("delete_security_group", group_id.to_string())
    }
}

/// SDK tag list from `(key, value)` pairs
pub fn sdk_tags(pairs: &[(&str, &str)]) -> Vec<sdk::Tag> {
    pairs
        .iter()
        .map(|(k, v)| sdk::Tag::builder().key(*k).value(*v).build())
        .collect()
}
