//! # Route Table
//!
//! External name: the route table id. Routes are keyed by destination CIDR
//! and subnet associations by subnet id. The local routes AWS adds when the
//! table is created are treated as desired even when the spec omits them,
//! and propagated routes are left alone.

use crate::controller::jsonpatch::create_patch;
use crate::controller::lateinit::LateInitializer;
use crate::controller::reconciler::{
    aws_error, ExternalClient, ExternalCreation, ExternalObservation, ExternalUpdate,
    ReconcilerError,
};
use crate::crd::ec2::{AssociationState, Route, RouteState, RouteTable, RouteTableObservation};
use crate::crd::{Condition, Managed};
use crate::provider::aws::ec2::{
    found, observed_tags, required, required_external_name, sync_tags, Ec2Api, RouteDestination,
    TAG_VALUES,
};
use crate::provider::aws::errors::{is_not_found, ResourceKind};
use crate::provider::aws::tags::tags_up_to_date;
use async_trait::async_trait;
use aws_sdk_ec2::types as sdk;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::info;

const KIND: ResourceKind = ResourceKind::RouteTable;

pub struct RouteTableClient {
    api: Arc<dyn Ec2Api>,
}

impl std::fmt::Debug for RouteTableClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteTableClient").finish_non_exhaustive()
    }
}

fn destination(route: &Route) -> Option<RouteDestination> {
    route
        .destination_cidr_block
        .clone()
        .map(RouteDestination::Ipv4)
        .or_else(|| {
            route
                .destination_ipv6_cidr_block
                .clone()
                .map(RouteDestination::Ipv6)
        })
}

fn destination_key(destination: &RouteDestination) -> &str {
    match destination {
        RouteDestination::Ipv4(cidr) | RouteDestination::Ipv6(cidr) => cidr,
    }
}

/// Route target without references, in spec form
fn target(route: &Route) -> Route {
    Route {
        gateway_id_ref: None,
        gateway_id_selector: None,
        nat_gateway_id_ref: None,
        nat_gateway_id_selector: None,
        ..route.clone()
    }
}

fn spec_route(route: &sdk::Route) -> Route {
    Route {
        destination_cidr_block: route.destination_cidr_block().map(str::to_string),
        destination_ipv6_cidr_block: route.destination_ipv6_cidr_block().map(str::to_string),
        gateway_id: route.gateway_id().map(str::to_string),
        instance_id: route.instance_id().map(str::to_string),
        nat_gateway_id: route.nat_gateway_id().map(str::to_string),
        network_interface_id: route.network_interface_id().map(str::to_string),
        transit_gateway_id: route.transit_gateway_id().map(str::to_string),
        vpc_peering_connection_id: route.vpc_peering_connection_id().map(str::to_string),
        ..Default::default()
    }
}

/// Observed routes this handler governs or must keep, keyed by destination
struct ObservedRoutes {
    /// Added by AWS at creation; kept even when the spec omits them
    implicit: BTreeMap<String, Route>,
    /// Added through CreateRoute
    managed: BTreeMap<String, Route>,
}

impl ObservedRoutes {
    fn of(table: &sdk::RouteTable) -> Self {
        let mut implicit = BTreeMap::new();
        let mut managed = BTreeMap::new();
        for route in table.routes() {
            let spec = spec_route(route);
            let Some(key) = destination(&spec).map(|d| destination_key(&d).to_string()) else {
                continue;
            };
            match route.origin() {
                Some(sdk::RouteOrigin::CreateRouteTable) => {
                    implicit.insert(key, spec);
                }
                Some(sdk::RouteOrigin::EnableVgwRoutePropagation) => {}
                _ => {
                    managed.insert(key, spec);
                }
            }
        }
        Self { implicit, managed }
    }

    fn get(&self, key: &str) -> Option<&Route> {
        self.managed.get(key).or_else(|| self.implicit.get(key))
    }
}

/// Desired routes keyed by destination, with the implicit routes injected
fn desired_routes(routes: &[Route], observed: &ObservedRoutes) -> BTreeMap<String, Route> {
    let mut desired: BTreeMap<String, Route> = routes
        .iter()
        .filter_map(|r| destination(r).map(|d| (destination_key(&d).to_string(), target(r))))
        .collect();
    for (key, route) in &observed.implicit {
        desired.entry(key.clone()).or_insert_with(|| route.clone());
    }
    desired
}

/// Route changes: routes to (re)create and destinations to delete
#[derive(Debug, Default, PartialEq)]
struct RouteDiff {
    create: Vec<Route>,
    delete: Vec<RouteDestination>,
}

fn diff_routes(routes: &[Route], observed: &ObservedRoutes) -> Result<RouteDiff, ReconcilerError> {
    let desired = desired_routes(routes, observed);
    let mut diff = RouteDiff::default();
    for (key, want) in &desired {
        match observed.get(key) {
            None => diff.create.push(want.clone()),
            // only the targets the spec sets are compared
            Some(have) if !create_patch(want, have)?.is_empty() => {
                if let Some(d) = destination(have) {
                    diff.delete.push(d);
                }
                diff.create.push(want.clone());
            }
            Some(_) => {}
        }
    }
    for (key, have) in &observed.managed {
        if !desired.contains_key(key) {
            if let Some(d) = destination(have) {
                diff.delete.push(d);
            }
        }
    }
    Ok(diff)
}

/// Explicit subnet associations: subnet id to association id
fn observed_associations(table: &sdk::RouteTable) -> BTreeMap<String, String> {
    table
        .associations()
        .iter()
        .filter(|a| a.main() != Some(true))
        .filter_map(|a| {
            Some((
                a.subnet_id()?.to_string(),
                a.route_table_association_id()?.to_string(),
            ))
        })
        .collect()
}

fn desired_associations(mg: &RouteTable) -> BTreeSet<String> {
    mg.spec
        .for_provider
        .associations
        .iter()
        .filter_map(|a| a.subnet_id.clone())
        .collect()
}

fn observation(table: &sdk::RouteTable) -> RouteTableObservation {
    RouteTableObservation {
        route_table_id: table.route_table_id().map(str::to_string),
        owner_id: table.owner_id().map(str::to_string),
        routes: table
            .routes()
            .iter()
            .map(|r| RouteState {
                destination_cidr_block: r.destination_cidr_block().map(str::to_string),
                destination_ipv6_cidr_block: r.destination_ipv6_cidr_block().map(str::to_string),
                gateway_id: r.gateway_id().map(str::to_string),
                instance_id: r.instance_id().map(str::to_string),
                nat_gateway_id: r.nat_gateway_id().map(str::to_string),
                network_interface_id: r.network_interface_id().map(str::to_string),
                transit_gateway_id: r.transit_gateway_id().map(str::to_string),
                vpc_peering_connection_id: r.vpc_peering_connection_id().map(str::to_string),
                state: r.state().map(|s| s.as_str().to_string()),
                origin: r.origin().map(|o| o.as_str().to_string()),
            })
            .collect(),
        associations: table
            .associations()
            .iter()
            .map(|a| AssociationState {
                main: a.main(),
                association_id: a.route_table_association_id().map(str::to_string),
                subnet_id: a.subnet_id().map(str::to_string),
            })
            .collect(),
    }
}

impl RouteTableClient {
    pub fn new(api: Arc<dyn Ec2Api>) -> Self {
        Self { api }
    }

    async fn describe(&self, id: &str) -> Result<Option<sdk::RouteTable>, ReconcilerError> {
        found(
            KIND,
            "failed to describe route table",
            self.api.describe_route_table(id).await,
        )
    }

    async fn disassociate(&self, association_id: &str) -> Result<(), ReconcilerError> {
        match self.api.disassociate_route_table(association_id).await {
            Err(e) if !is_not_found(KIND, &e) => Err(ReconcilerError::external(
                KIND,
                "failed to disassociate route table",
                e,
            )),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl ExternalClient<RouteTable> for RouteTableClient {
    async fn observe(&self, mg: &mut RouteTable) -> Result<ExternalObservation, ReconcilerError> {
        let id = required_external_name(mg)?;
        let Some(table) = self.describe(&id).await? else {
            return Ok(ExternalObservation::not_found());
        };

        let mut li = LateInitializer::new();
        li.value(
            &mut mg.spec.for_provider.vpc_id,
            table.vpc_id().map(str::to_string),
        );

        let routes_up_to_date = {
            let diff = diff_routes(&mg.spec.for_provider.routes, &ObservedRoutes::of(&table))?;
            diff.create.is_empty() && diff.delete.is_empty()
        };
        let observed: BTreeSet<String> = observed_associations(&table).into_keys().collect();
        let associations_up_to_date = desired_associations(mg) == observed;
        let up_to_date = routes_up_to_date
            && associations_up_to_date
            && tags_up_to_date(
                &mg.spec.for_provider.tags,
                &observed_tags(table.tags()),
                TAG_VALUES,
            );

        mg.status.get_or_insert_with(Default::default).at_provider = Some(observation(&table));
        mg.set_conditions([Condition::available()]);

        Ok(ExternalObservation::exists(up_to_date).late_initialized(li.changed()))
    }

    async fn create(&self, mg: &mut RouteTable) -> Result<ExternalCreation, ReconcilerError> {
        let p = &mg.spec.for_provider;
        let vpc_id = required(&p.vpc_id, "vpcId")?;
        let table = self
            .api
            .create_route_table(vpc_id, &p.tags)
            .await
            .map_err(aws_error(KIND, "failed to create route table"))?;
        let id = table.route_table_id().ok_or_else(|| {
            ReconcilerError::Invalid("AWS returned a route table without an id".into())
        })?;
        info!("✅ Created route table {} in {}", id, vpc_id);
        Ok(ExternalCreation::named(id))
    }

    async fn update(&self, mg: &mut RouteTable) -> Result<ExternalUpdate, ReconcilerError> {
        let id = required_external_name(mg)?;
        let Some(table) = self.describe(&id).await? else {
            return Err(ReconcilerError::Invalid(format!(
                "route table {id} disappeared"
            )));
        };

        let diff = diff_routes(&mg.spec.for_provider.routes, &ObservedRoutes::of(&table))?;
        for d in &diff.delete {
            match self.api.delete_route(&id, d).await {
                Err(e) if !is_not_found(KIND, &e) => {
                    return Err(ReconcilerError::external(KIND, "failed to delete route", e));
                }
                _ => {}
            }
        }
        for route in &diff.create {
            self.api
                .create_route(&id, route)
                .await
                .map_err(aws_error(KIND, "failed to create route"))?;
        }

        let desired = desired_associations(mg);
        let observed = observed_associations(&table);
        for (subnet_id, association_id) in &observed {
            if !desired.contains(subnet_id) {
                self.disassociate(association_id).await?;
            }
        }
        for subnet_id in desired.iter().filter(|s| !observed.contains_key(*s)) {
            self.api
                .associate_route_table(&id, subnet_id)
                .await
                .map_err(aws_error(KIND, "failed to associate route table"))?;
        }

        let tags = observed_tags(table.tags());
        sync_tags(
            self.api.as_ref(),
            KIND,
            &id,
            &mg.spec.for_provider.tags,
            &tags,
        )
        .await?;
        Ok(ExternalUpdate::default())
    }

    async fn delete(&self, mg: &mut RouteTable) -> Result<(), ReconcilerError> {
        let id = required_external_name(mg)?;
        if let Some(table) = self.describe(&id).await? {
            for association_id in observed_associations(&table).values() {
                self.disassociate(association_id).await?;
            }
        }
        self.api
            .delete_route_table(&id)
            .await
            .map_err(aws_error(KIND, "failed to delete route table"))?;
        info!("🗑️  Deleted route table {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::ec2::{Association, RouteTableParameters, RouteTableSpec};
    use crate::crd::{Reference, ResourceSpec};
    use crate::provider::aws::ec2::testing::FakeEc2;

    fn local_route() -> sdk::Route {
        sdk::Route::builder()
            .destination_cidr_block("10.0.0.0/16")
            .gateway_id("local")
            .origin(sdk::RouteOrigin::CreateRouteTable)
            .state(sdk::RouteState::Active)
            .build()
    }

    fn internet_route(gateway: &str) -> sdk::Route {
        sdk::Route::builder()
            .destination_cidr_block("0.0.0.0/0")
            .gateway_id(gateway)
            .origin(sdk::RouteOrigin::CreateRoute)
            .state(sdk::RouteState::Active)
            .build()
    }

    fn table(routes: Vec<sdk::Route>, subnets: &[&str]) -> sdk::RouteTable {
        let mut associations = vec![sdk::RouteTableAssociation::builder()
            .main(true)
            .route_table_association_id("rtbassoc-main")
            .build()];
        associations.extend(subnets.iter().map(|s| {
            sdk::RouteTableAssociation::builder()
                .main(false)
                .subnet_id(*s)
                .route_table_association_id(format!("rtbassoc-{s}"))
                .build()
        }));
        sdk::RouteTable::builder()
            .route_table_id("rtb-1")
            .vpc_id("vpc-1")
            .set_routes(Some(routes))
            .set_associations(Some(associations))
            .build()
    }

    fn route(cidr: &str, gateway: &str) -> Route {
        Route {
            destination_cidr_block: Some(cidr.to_string()),
            gateway_id: Some(gateway.to_string()),
            ..Default::default()
        }
    }

    fn route_table(routes: Vec<Route>, subnets: &[&str]) -> RouteTable {
        let mut mg = RouteTable::new(
            "public",
            RouteTableSpec {
                for_provider: RouteTableParameters {
                    region: "us-east-1".to_string(),
                    vpc_id: Some("vpc-1".to_string()),
                    routes,
                    associations: subnets
                        .iter()
                        .map(|s| Association {
                            subnet_id: Some(s.to_string()),
                            ..Default::default()
                        })
                        .collect(),
                    ..Default::default()
                },
                resource_spec: ResourceSpec::default(),
            },
        );
        mg.set_external_name("rtb-1");
        mg
    }

    fn client_for(observed: sdk::RouteTable) -> (Arc<FakeEc2>, RouteTableClient) {
        let fake = Arc::new(FakeEc2::new().with(|s| {
            s.route_tables.insert("rtb-1".to_string(), observed);
        }));
        let client = RouteTableClient::new(Arc::clone(&fake) as Arc<dyn Ec2Api>);
        (fake, client)
    }

    #[tokio::test]
    async fn test_implicit_local_route_is_up_to_date() {
        let (_, client) = client_for(table(vec![local_route()], &[]));
        let mut mg = route_table(vec![], &[]);
        assert!(client.observe(&mut mg).await.unwrap().resource_up_to_date);
    }

    #[tokio::test]
    async fn test_route_order_does_not_matter() {
        let (_, client) = client_for(table(
            vec![internet_route("igw-1"), local_route()],
            &["subnet-b", "subnet-a"],
        ));
        let mut mg = route_table(
            vec![route("0.0.0.0/0", "igw-1")],
            &["subnet-a", "subnet-b"],
        );
        assert!(client.observe(&mut mg).await.unwrap().resource_up_to_date);
    }

    #[tokio::test]
    async fn test_reference_fields_are_not_compared() {
        let (_, client) = client_for(table(vec![local_route(), internet_route("igw-1")], &[]));
        let mut desired = route("0.0.0.0/0", "igw-1");
        desired.gateway_id_ref = Some(Reference::new("main-igw"));
        let mut mg = route_table(vec![desired], &[]);
        assert!(client.observe(&mut mg).await.unwrap().resource_up_to_date);
    }

    #[tokio::test]
    async fn test_changed_target_replaces_route() {
        let (fake, client) = client_for(table(vec![local_route(), internet_route("igw-old")], &[]));
        let mut mg = route_table(vec![route("0.0.0.0/0", "igw-new")], &[]);
        assert!(!client.observe(&mut mg).await.unwrap().resource_up_to_date);
        client.update(&mut mg).await.unwrap();
        let calls = fake.calls();
        assert!(calls.contains(&"delete_route rtb-1 0.0.0.0/0".to_string()));
        assert!(calls.contains(&"create_route rtb-1 0.0.0.0/0".to_string()));
        assert!(!fake.called("delete_route rtb-1 10.0.0.0/16"));
    }

    #[tokio::test]
    async fn test_associations_converge() {
        let (fake, client) = client_for(table(vec![local_route()], &["subnet-old"]));
        let mut mg = route_table(vec![], &["subnet-new"]);
        assert!(!client.observe(&mut mg).await.unwrap().resource_up_to_date);
        client.update(&mut mg).await.unwrap();
        let calls = fake.calls();
        assert!(calls.contains(&"disassociate_route_table rtbassoc-subnet-old".to_string()));
        assert!(calls.contains(&"associate_route_table rtb-1 subnet-new".to_string()));
        assert!(!fake.called("disassociate_route_table rtbassoc-main"));
    }

    #[tokio::test]
    async fn test_delete_releases_subnets() {
        let (fake, client) = client_for(table(vec![local_route()], &["subnet-a"]));
        client.delete(&mut route_table(vec![], &[])).await.unwrap();
        assert_eq!(
            fake.calls(),
            vec![
                "describe_route_table rtb-1",
                "disassociate_route_table rtbassoc-subnet-a",
                "delete_route_table rtb-1",
            ]
        );
    }
}
