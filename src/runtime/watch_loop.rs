//! # Watch Loop
//!
//! One kube-runtime `Controller` per enabled managed kind, all driven
//! concurrently until a shutdown signal arrives.

use crate::config::ControllerConfig;
use crate::controller::reconciler::{
    Engine, ExternalClient, KubeStore, ReconcilerError, SecretPublisher, Timing,
};
use crate::controller::reference::{KubeObjectReader, ResolveReferences};
use crate::crd::{acm, acmpca, ec2, s3, s3control, Managed};
use crate::provider::aws::connector::ClientFactory;
use crate::provider::aws::{self as aws, AwsConnector, AwsSession};
use crate::runtime::error_policy::ErrorPolicy;
use aws_config::SdkConfig;
use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use kube::{Api, Client};
use kube_runtime::controller::{Action, Config as ControllerSettings};
use kube_runtime::{watcher, Controller};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Watch timeout (seconds); must stay below the client read timeout
const WATCH_TIMEOUT_SECS: u32 = 25;

/// Everything one kind's controller needs per reconcile
pub struct KindContext<K: Managed> {
    pub engine: Engine<K>,
    pub errors: ErrorPolicy,
}

impl<K: Managed> std::fmt::Debug for KindContext<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KindContext")
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

async fn reconcile<K>(obj: Arc<K>, ctx: Arc<KindContext<K>>) -> Result<Action, ReconcilerError>
where
    K: Managed + ResolveReferences,
{
    let name = obj.name_or_unknown().to_string();
    let outcome = ctx.engine.reconcile((*obj).clone()).await?;
    ctx.errors.on_success(ctx.engine.kind(), &name);
    Ok(outcome.into())
}

fn error_policy<K>(obj: Arc<K>, error: &ReconcilerError, ctx: Arc<KindContext<K>>) -> Action
where
    K: Managed + ResolveReferences,
{
    ctx.errors
        .on_error(ctx.engine.kind(), obj.name_or_unknown(), error)
}

/// Shared handles every controller is built from
#[derive(Clone)]
pub struct Runtime {
    pub client: Client,
    pub session: Arc<AwsSession>,
    pub config: ControllerConfig,
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Runtime {
    fn context<K>(&self, kind: &'static str, build: ClientFactory<K>) -> KindContext<K>
    where
        K: Managed + ResolveReferences,
    {
        let engine = Engine::new(
            kind,
            Arc::new(AwsConnector::new(Arc::clone(&self.session), build)),
            Arc::new(KubeStore::<K>::new(self.client.clone())),
            Arc::new(KubeObjectReader::new(self.client.clone())),
            Arc::new(SecretPublisher::new(self.client.clone())),
            Timing::from(&self.config),
        );
        KindContext {
            engine,
            errors: ErrorPolicy::new(self.config.error_backoff_min, self.config.error_backoff_max),
        }
    }

    /// The controller future for `K`, or `None` when the kind is disabled
    pub fn controller<K>(
        &self,
        kind: &'static str,
        build: ClientFactory<K>,
    ) -> Option<BoxFuture<'static, ()>>
    where
        K: Managed + ResolveReferences,
    {
        if !self.config.is_kind_enabled(kind) {
            debug!("Controller for {} is disabled", kind);
            return None;
        }
        info!("- {} controller", kind);

        let api: Api<K> = Api::all(self.client.clone());
        let ctx = Arc::new(self.context(kind, build));
        let settings = ControllerSettings::default().concurrency(self.config.max_reconcile_rate);
        Some(
            Controller::new(api, watcher::Config::default().timeout(WATCH_TIMEOUT_SECS))
                .with_config(settings)
                .shutdown_on_signal()
                .run(reconcile, error_policy, ctx)
                .for_each(move |result| {
                    match result {
                        Ok((object, action)) => {
                            debug!(?action, "{} {} reconciled", kind, object.name)
                        }
                        Err(e) => warn!("{} controller error: {}", kind, e),
                    }
                    std::future::ready(())
                })
                .boxed(),
        )
    }

    /// Controllers for every enabled kind
    pub fn controllers(&self) -> Vec<BoxFuture<'static, ()>> {
        [
            self.controller::<acm::Certificate>("Certificate", certificate),
            self.controller::<acmpca::CertificateAuthority>(
                "CertificateAuthority",
                certificate_authority,
            ),
            self.controller::<acmpca::CertificateAuthorityPermission>(
                "CertificateAuthorityPermission",
                certificate_authority_permission,
            ),
            self.controller::<ec2::Address>("Address", address),
            self.controller::<ec2::InternetGateway>("InternetGateway", internet_gateway),
            self.controller::<ec2::NatGateway>("NATGateway", nat_gateway),
            self.controller::<ec2::RouteTable>("RouteTable", route_table),
            self.controller::<ec2::SecurityGroup>("SecurityGroup", security_group),
            self.controller::<ec2::Subnet>("Subnet", subnet),
            self.controller::<ec2::Vpc>("VPC", vpc),
            self.controller::<ec2::VpcCidrBlock>("VPCCIDRBlock", vpc_cidr_block),
            self.controller::<s3::BucketPolicy>("BucketPolicy", bucket_policy),
            self.controller::<s3control::AccessPoint>("AccessPoint", access_point),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

fn ec2_api(config: &SdkConfig) -> Arc<dyn aws::ec2::Ec2Api> {
    Arc::new(aws::ec2::SdkEc2::new(config))
}

fn certificate(config: &SdkConfig) -> Box<dyn ExternalClient<acm::Certificate>> {
    Box::new(aws::acm::CertificateClient::new(Arc::new(
        aws::acm::SdkAcm::new(config),
    )))
}

fn certificate_authority(
    config: &SdkConfig,
) -> Box<dyn ExternalClient<acmpca::CertificateAuthority>> {
    Box::new(aws::acmpca::CertificateAuthorityClient::new(Arc::new(
        aws::acmpca::SdkAcmPca::new(config),
    )))
}

fn certificate_authority_permission(
    config: &SdkConfig,
) -> Box<dyn ExternalClient<acmpca::CertificateAuthorityPermission>> {
    Box::new(aws::acmpca::PermissionClient::new(Arc::new(
        aws::acmpca::SdkAcmPca::new(config),
    )))
}

fn address(config: &SdkConfig) -> Box<dyn ExternalClient<ec2::Address>> {
    Box::new(aws::ec2::address::AddressClient::new(ec2_api(config)))
}

fn internet_gateway(config: &SdkConfig) -> Box<dyn ExternalClient<ec2::InternetGateway>> {
    Box::new(aws::ec2::internet_gateway::InternetGatewayClient::new(
        ec2_api(config),
    ))
}

fn nat_gateway(config: &SdkConfig) -> Box<dyn ExternalClient<ec2::NatGateway>> {
    Box::new(aws::ec2::nat_gateway::NatGatewayClient::new(ec2_api(config)))
}

fn route_table(config: &SdkConfig) -> Box<dyn ExternalClient<ec2::RouteTable>> {
    Box::new(aws::ec2::route_table::RouteTableClient::new(ec2_api(config)))
}

fn security_group(config: &SdkConfig) -> Box<dyn ExternalClient<ec2::SecurityGroup>> {
    Box::new(aws::ec2::security_group::SecurityGroupClient::new(ec2_api(
        config,
    )))
}

fn subnet(config: &SdkConfig) -> Box<dyn ExternalClient<ec2::Subnet>> {
    Box::new(aws::ec2::subnet::SubnetClient::new(ec2_api(config)))
}

fn vpc(config: &SdkConfig) -> Box<dyn ExternalClient<ec2::Vpc>> {
    Box::new(aws::ec2::vpc::VpcClient::new(ec2_api(config)))
}

fn vpc_cidr_block(config: &SdkConfig) -> Box<dyn ExternalClient<ec2::VpcCidrBlock>> {
    Box::new(aws::ec2::vpc_cidr_block::VpcCidrBlockClient::new(ec2_api(
        config,
    )))
}

fn bucket_policy(config: &SdkConfig) -> Box<dyn ExternalClient<s3::BucketPolicy>> {
    Box::new(aws::s3::BucketPolicyClient::new(Arc::new(
        aws::s3::SdkS3::new(config),
    )))
}

fn access_point(config: &SdkConfig) -> Box<dyn ExternalClient<s3control::AccessPoint>> {
    Box::new(aws::s3control::AccessPointClient::new(Arc::new(
        aws::s3control::SdkS3Control::new(config),
    )))
}

/// Run every enabled controller until shutdown
pub async fn run_watch_loop(runtime: Runtime) -> anyhow::Result<()> {
    let controllers = runtime.controllers();
    if controllers.is_empty() {
        anyhow::bail!(
            "no managed kinds enabled (check ENABLED_KINDS / --kinds: {:?})",
            runtime.config.enabled_kinds
        );
    }
    info!("Running {} managed-resource controllers", controllers.len());
    futures::future::join_all(controllers).await;
    info!("All controllers stopped");
    Ok(())
}
