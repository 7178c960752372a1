//! # ACM Certificate
//!
//! External name: the certificate ARN. Only tags, the transparency logging
//! preference and renewal can change after the request; everything else is
//! fixed at issue time.
//!
//! `renewCertificate: true` reports drift so that `update` runs, renews the
//! certificate and clears the flag.

use crate::controller::lateinit::LateInitializer;
use crate::controller::reconciler::{
    aws_error, ExternalClient, ExternalCreation, ExternalObservation, ExternalUpdate,
    ReconcilerError,
};
use crate::crd::acm::{Certificate, CertificateObservation, CertificateParameters};
use crate::crd::{Condition, Managed};
use crate::provider::aws::acm::AcmApi;
use crate::provider::aws::errors::ResourceKind;
use crate::provider::aws::tags::{diff_tags, tags_up_to_date, ValueComparison};
use crate::provider::aws::{found, required_external_name};
use async_trait::async_trait;
use aws_sdk_acm::types::{CertificateDetail, CertificateStatus, CertificateType};
use kube::ResourceExt;
use std::sync::Arc;
use tracing::{debug, info};

const KIND: ResourceKind = ResourceKind::Certificate;

const TAG_VALUES: ValueComparison = ValueComparison::CaseSensitive;

/// ACM accepts at most 32 word characters as an idempotency token
const TOKEN_LEN: usize = 32;

pub struct CertificateClient {
    api: Arc<dyn AcmApi>,
}

impl std::fmt::Debug for CertificateClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateClient").finish_non_exhaustive()
    }
}

/// Request token derived from the resource's UID so a retried create returns
/// the same certificate
fn idempotency_token(mg: &Certificate) -> String {
    let source = mg.uid().unwrap_or_else(|| mg.name_any());
    source
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(TOKEN_LEN)
        .collect()
}

fn observed_transparency(detail: &CertificateDetail) -> Option<String> {
    detail
        .options()
        .and_then(|o| o.certificate_transparency_logging_preference())
        .map(|p| p.as_str().to_string())
}

/// An unset preference is not drift. Private certificates do not support
/// option updates, so their preference never drifts either.
fn transparency_up_to_date(desired: &CertificateParameters, detail: &CertificateDetail) -> bool {
    if detail.r#type() == Some(&CertificateType::Private) {
        return true;
    }
    match &desired.certificate_transparency_logging_preference {
        Some(want) => observed_transparency(detail).as_ref() == Some(want),
        None => true,
    }
}

fn observation(detail: &CertificateDetail) -> CertificateObservation {
    CertificateObservation {
        certificate_arn: detail.certificate_arn().map(str::to_string),
        status: detail.status().map(|s| s.as_str().to_string()),
        r#type: detail.r#type().map(|t| t.as_str().to_string()),
        renewal_eligibility: detail.renewal_eligibility().map(|r| r.as_str().to_string()),
        in_use_by: detail.in_use_by().to_vec(),
    }
}

fn ready_condition(detail: &CertificateDetail) -> Condition {
    match detail.status() {
        Some(CertificateStatus::Issued) => Condition::available(),
        Some(CertificateStatus::PendingValidation) => {
            Condition::pending("certificate is pending validation")
        }
        Some(status) => Condition::unavailable(Some(
            detail
                .failure_reason()
                .map(|r| format!("{}: {}", status.as_str(), r.as_str()))
                .unwrap_or_else(|| status.as_str().to_string()),
        )),
        None => Condition::unavailable(None),
    }
}

impl CertificateClient {
    pub fn new(api: Arc<dyn AcmApi>) -> Self {
        Self { api }
    }

    async fn describe(&self, arn: &str) -> Result<Option<CertificateDetail>, ReconcilerError> {
        found(
            KIND,
            "failed to describe certificate",
            self.api.describe_certificate(arn).await,
        )
    }
}

#[async_trait]
impl ExternalClient<Certificate> for CertificateClient {
    async fn observe(&self, mg: &mut Certificate) -> Result<ExternalObservation, ReconcilerError> {
        let arn = required_external_name(mg)?;
        let Some(detail) = self.describe(&arn).await? else {
            return Ok(ExternalObservation::not_found());
        };
        let tags = self
            .api
            .list_tags(&arn)
            .await
            .map_err(aws_error(KIND, "failed to list certificate tags"))?;

        let p = &mut mg.spec.for_provider;
        let mut li = LateInitializer::new();
        li.value(
            &mut p.certificate_transparency_logging_preference,
            observed_transparency(&detail),
        );
        li.value(
            &mut p.key_algorithm,
            detail.key_algorithm().map(|k| k.as_str().to_string()),
        );
        li.value(
            &mut p.certificate_authority_arn,
            detail.certificate_authority_arn().map(str::to_string),
        );

        let up_to_date = p.renew_certificate != Some(true)
            && transparency_up_to_date(p, &detail)
            && tags_up_to_date(&p.tags, &tags, TAG_VALUES);

        mg.status.get_or_insert_with(Default::default).at_provider = Some(observation(&detail));
        mg.set_conditions([ready_condition(&detail)]);

        Ok(ExternalObservation::exists(up_to_date).late_initialized(li.changed()))
    }

    async fn create(&self, mg: &mut Certificate) -> Result<ExternalCreation, ReconcilerError> {
        let token = idempotency_token(mg);
        let p = &mg.spec.for_provider;
        let arn = self
            .api
            .request_certificate(p, &token)
            .await
            .map_err(aws_error(KIND, "failed to request certificate"))?;
        info!("✅ Requested certificate for {} ({})", p.domain_name, arn);
        Ok(ExternalCreation::named(arn))
    }

    async fn update(&self, mg: &mut Certificate) -> Result<ExternalUpdate, ReconcilerError> {
        let arn = required_external_name(mg)?;
        let Some(detail) = self.describe(&arn).await? else {
            return Err(ReconcilerError::Invalid(format!(
                "certificate {arn} disappeared"
            )));
        };
        let p = &mg.spec.for_provider;

        let observed = self
            .api
            .list_tags(&arn)
            .await
            .map_err(aws_error(KIND, "failed to list certificate tags"))?;
        let diff = diff_tags(&p.tags, &observed, TAG_VALUES);
        if !diff.remove.is_empty() {
            self.api
                .remove_tags(&arn, &diff.remove)
                .await
                .map_err(aws_error(KIND, "failed to remove certificate tags"))?;
        }
        if !diff.add.is_empty() {
            self.api
                .add_tags(&arn, &diff.add)
                .await
                .map_err(aws_error(KIND, "failed to add certificate tags"))?;
        }

        if !transparency_up_to_date(p, &detail) {
            if let Some(preference) = &p.certificate_transparency_logging_preference {
                self.api
                    .update_transparency_logging(&arn, preference)
                    .await
                    .map_err(aws_error(KIND, "failed to update certificate options"))?;
                debug!("Set transparency logging of {} to {}", arn, preference);
            }
        }

        if p.renew_certificate == Some(true) {
            self.api
                .renew_certificate(&arn)
                .await
                .map_err(aws_error(KIND, "failed to renew certificate"))?;
            info!("🔄 Renewal requested for certificate {}", arn);
            mg.spec.for_provider.renew_certificate = Some(false);
        }
        Ok(ExternalUpdate::default())
    }

    async fn delete(&self, mg: &mut Certificate) -> Result<(), ReconcilerError> {
        let arn = required_external_name(mg)?;
        self.api
            .delete_certificate(&arn)
            .await
            .map_err(aws_error(KIND, "failed to delete certificate"))?;
        info!("🗑️  Deleted certificate {}", arn);
        Ok(())
    }
}
