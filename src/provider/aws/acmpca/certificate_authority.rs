//! # ACM Private Certificate Authority
//!
//! External name: the CA ARN. Status, revocation configuration and tags are
//! mutable; the subject and algorithms are fixed at creation.
//!
//! AWS refuses to delete an `ACTIVE` CA, so `delete` disables it first and
//! then schedules deletion after `permanentDeletionTimeInDays`.

use crate::controller::lateinit::LateInitializer;
use crate::controller::reconciler::{
    aws_error, ExternalClient, ExternalCreation, ExternalObservation, ExternalUpdate,
    ReconcilerError,
};
use crate::crd::acmpca::{
    CertificateAuthority, CertificateAuthorityObservation, CertificateAuthorityParameters,
    CrlConfiguration, RevocationConfiguration,
};
use crate::crd::{Condition, Managed};
use crate::provider::aws::acmpca::AcmPcaApi;
use crate::provider::aws::errors::ResourceKind;
use crate::provider::aws::tags::{diff_tags, tags_up_to_date, ValueComparison};
use crate::provider::aws::{found, required_external_name, timestamp};
use async_trait::async_trait;
use aws_sdk_acmpca::types::{self as sdk, CertificateAuthorityStatus};
use kube::ResourceExt;
use std::sync::Arc;
use tracing::{debug, info};

const KIND: ResourceKind = ResourceKind::CertificateAuthority;

const TAG_VALUES: ValueComparison = ValueComparison::CaseSensitive;

/// Restore window AWS applies when none is given
pub const DEFAULT_PERMANENT_DELETION_DAYS: i32 = 30;

const TOKEN_LEN: usize = 36;

pub struct CertificateAuthorityClient {
    api: Arc<dyn AcmPcaApi>,
}

impl std::fmt::Debug for CertificateAuthorityClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateAuthorityClient")
            .finish_non_exhaustive()
    }
}

fn idempotency_token(mg: &CertificateAuthority) -> String {
    mg.uid()
        .unwrap_or_else(|| mg.name_any())
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(TOKEN_LEN)
        .collect()
}

fn observed_revocation(ca: &sdk::CertificateAuthority) -> Option<RevocationConfiguration> {
    ca.revocation_configuration().map(|r| RevocationConfiguration {
        crl_configuration: r.crl_configuration().map(|c| CrlConfiguration {
            enabled: c.enabled(),
            custom_cname: c.custom_cname().map(str::to_string),
            expiration_in_days: c.expiration_in_days(),
            s3_bucket_name: c.s3_bucket_name().map(str::to_string),
        }),
    })
}

/// Only `ACTIVE` and `DISABLED` can be requested; other states are transitional
fn settable_status(ca: &sdk::CertificateAuthority) -> Option<String> {
    match ca.status() {
        Some(s @ (CertificateAuthorityStatus::Active | CertificateAuthorityStatus::Disabled)) => {
            Some(s.as_str().to_string())
        }
        _ => None,
    }
}

fn status_up_to_date(desired: &CertificateAuthorityParameters, ca: &sdk::CertificateAuthority) -> bool {
    match (&desired.status, settable_status(ca)) {
        (Some(want), Some(have)) => *want == have,
        _ => true,
    }
}

fn revocation_up_to_date(
    desired: &CertificateAuthorityParameters,
    ca: &sdk::CertificateAuthority,
) -> bool {
    match &desired.revocation_configuration {
        Some(want) => observed_revocation(ca).as_ref() == Some(want),
        None => true,
    }
}

fn observation(ca: &sdk::CertificateAuthority) -> CertificateAuthorityObservation {
    CertificateAuthorityObservation {
        certificate_authority_arn: ca.arn().map(str::to_string),
        serial: ca.serial().map(str::to_string),
        status: ca.status().map(|s| s.as_str().to_string()),
        failure_reason: ca.failure_reason().map(|r| r.as_str().to_string()),
        not_before: timestamp(ca.not_before()),
        not_after: timestamp(ca.not_after()),
    }
}

fn ready_condition(ca: &sdk::CertificateAuthority) -> Condition {
    match ca.status() {
        Some(CertificateAuthorityStatus::Creating) => Condition::creating(),
        Some(
            CertificateAuthorityStatus::Active | CertificateAuthorityStatus::PendingCertificate,
        ) => Condition::available(),
        Some(CertificateAuthorityStatus::Failed) => {
            Condition::unavailable(ca.failure_reason().map(|r| r.as_str().to_string()))
        }
        Some(status) => Condition::unavailable(Some(status.as_str().to_string())),
        None => Condition::unavailable(None),
    }
}

impl CertificateAuthorityClient {
    pub fn new(api: Arc<dyn AcmPcaApi>) -> Self {
        Self { api }
    }

    /// A `DELETED` CA only lingers for its restore window and counts as gone
    async fn describe(&self, arn: &str) -> Result<Option<sdk::CertificateAuthority>, ReconcilerError> {
        let ca = found(
            KIND,
            "failed to describe certificate authority",
            self.api.describe_certificate_authority(arn).await,
        )?;
        Ok(ca.filter(|ca| ca.status() != Some(&CertificateAuthorityStatus::Deleted)))
    }
}

#[async_trait]
impl ExternalClient<CertificateAuthority> for CertificateAuthorityClient {
    async fn observe(
        &self,
        mg: &mut CertificateAuthority,
    ) -> Result<ExternalObservation, ReconcilerError> {
        let arn = required_external_name(mg)?;
        let Some(ca) = self.describe(&arn).await? else {
            return Ok(ExternalObservation::not_found());
        };
        let tags = self
            .api
            .list_tags(&arn)
            .await
            .map_err(aws_error(KIND, "failed to list certificate authority tags"))?;

        let p = &mut mg.spec.for_provider;
        let mut li = LateInitializer::new();
        li.value(
            &mut p.permanent_deletion_time_in_days,
            Some(DEFAULT_PERMANENT_DELETION_DAYS),
        );
        li.value(&mut p.status, settable_status(&ca));
        li.value(&mut p.revocation_configuration, observed_revocation(&ca));

        let up_to_date = status_up_to_date(p, &ca)
            && revocation_up_to_date(p, &ca)
            && tags_up_to_date(&p.tags, &tags, TAG_VALUES);

        mg.status.get_or_insert_with(Default::default).at_provider = Some(observation(&ca));
        mg.set_conditions([ready_condition(&ca)]);

        Ok(ExternalObservation::exists(up_to_date).late_initialized(li.changed()))
    }

    async fn create(
        &self,
        mg: &mut CertificateAuthority,
    ) -> Result<ExternalCreation, ReconcilerError> {
        let token = idempotency_token(mg);
        let p = &mg.spec.for_provider;
        let arn = self
            .api
            .create_certificate_authority(p, &token)
            .await
            .map_err(aws_error(KIND, "failed to create certificate authority"))?;
        info!(
            "✅ Created {} certificate authority {} ({})",
            p.r#type, p.certificate_authority_configuration.subject.common_name, arn
        );
        Ok(ExternalCreation::named(arn))
    }

    async fn update(
        &self,
        mg: &mut CertificateAuthority,
    ) -> Result<ExternalUpdate, ReconcilerError> {
        let arn = required_external_name(mg)?;
        let Some(ca) = self.describe(&arn).await? else {
            return Err(ReconcilerError::Invalid(format!(
                "certificate authority {arn} disappeared"
            )));
        };
        let p = &mg.spec.for_provider;

        let status = (!status_up_to_date(p, &ca))
            .then(|| p.status.as_deref())
            .flatten();
        let revocation = (!revocation_up_to_date(p, &ca))
            .then(|| p.revocation_configuration.as_ref())
            .flatten();
        if status.is_some() || revocation.is_some() {
            self.api
                .update_certificate_authority(&arn, status, revocation)
                .await
                .map_err(aws_error(KIND, "failed to update certificate authority"))?;
            debug!("Updated certificate authority {}", arn);
        }

        let observed = self
            .api
            .list_tags(&arn)
            .await
            .map_err(aws_error(KIND, "failed to list certificate authority tags"))?;
        let diff = diff_tags(&p.tags, &observed, TAG_VALUES);
        if !diff.remove.is_empty() {
            self.api
                .untag_certificate_authority(&arn, &diff.remove)
                .await
                .map_err(aws_error(KIND, "failed to untag certificate authority"))?;
        }
        if !diff.add.is_empty() {
            self.api
                .tag_certificate_authority(&arn, &diff.add)
                .await
                .map_err(aws_error(KIND, "failed to tag certificate authority"))?;
        }
        Ok(ExternalUpdate::default())
    }

    async fn delete(&self, mg: &mut CertificateAuthority) -> Result<(), ReconcilerError> {
        let arn = required_external_name(mg)?;
        let Some(ca) = self.describe(&arn).await? else {
            return Ok(());
        };
        if ca.status() == Some(&CertificateAuthorityStatus::Active) {
            self.api
                .update_certificate_authority(
                    &arn,
                    Some(CertificateAuthorityStatus::Disabled.as_str()),
                    None,
                )
                .await
                .map_err(aws_error(KIND, "failed to disable certificate authority"))?;
            debug!("Disabled certificate authority {} before deletion", arn);
        }
        self.api
            .delete_certificate_authority(&arn, mg.spec.for_provider.permanent_deletion_time_in_days)
            .await
            .map_err(aws_error(KIND, "failed to delete certificate authority"))?;
        info!("🗑️  Deleted certificate authority {}", arn);
        Ok(())
    }
}
