//! # ACM Private CA Permission
//!
//! External name: `<principal>/<CA ARN>`. A permission has no mutable fields;
//! any permission held by the principal on the CA counts as the resource.

use crate::controller::reconciler::{
    aws_error, ExternalClient, ExternalCreation, ExternalObservation, ExternalUpdate,
    ReconcilerError,
};
use crate::crd::acmpca::CertificateAuthorityPermission;
use crate::crd::{Condition, Managed};
use crate::provider::aws::acmpca::AcmPcaApi;
use crate::provider::aws::errors::ResourceKind;
use crate::provider::aws::{found, required, required_external_name};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

const KIND: ResourceKind = ResourceKind::CertificateAuthorityPermission;

pub struct PermissionClient {
    api: Arc<dyn AcmPcaApi>,
}

impl std::fmt::Debug for PermissionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionClient").finish_non_exhaustive()
    }
}

pub fn external_name(principal: &str, ca_arn: &str) -> String {
    format!("{principal}/{ca_arn}")
}

/// Split an external name into `(principal, CA ARN)`
pub fn parse_external_name(name: &str) -> Result<(&str, &str), ReconcilerError> {
    match name.split_once('/') {
        Some((principal, arn)) if !principal.is_empty() && !arn.is_empty() => Ok((principal, arn)),
        _ => Err(ReconcilerError::Invalid(format!(
            "external name {name:?} is not of the form <principal>/<certificate authority ARN>"
        ))),
    }
}

impl PermissionClient {
    pub fn new(api: Arc<dyn AcmPcaApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ExternalClient<CertificateAuthorityPermission> for PermissionClient {
    async fn observe(
        &self,
        mg: &mut CertificateAuthorityPermission,
    ) -> Result<ExternalObservation, ReconcilerError> {
        let name = required_external_name(mg)?;
        let (principal, arn) = parse_external_name(&name)?;
        let permissions = found(
            KIND,
            "failed to list certificate authority permissions",
            self.api.list_permissions(arn).await.map(Some),
        )?
        .unwrap_or_default();

        if !permissions
            .iter()
            .any(|p| p.principal() == Some(principal))
        {
            return Ok(ExternalObservation::not_found());
        }
        mg.set_conditions([Condition::available()]);
        Ok(ExternalObservation::exists(true))
    }

    async fn create(
        &self,
        mg: &mut CertificateAuthorityPermission,
    ) -> Result<ExternalCreation, ReconcilerError> {
        let p = &mg.spec.for_provider;
        let arn = required(&p.certificate_authority_arn, "certificateAuthorityARN")?;
        self.api
            .create_permission(arn, &p.principal, p.source_account.as_deref())
            .await
            .map_err(aws_error(KIND, "failed to create certificate authority permission"))?;
        info!("✅ Granted {} permissions on {}", p.principal, arn);
        Ok(ExternalCreation::named(external_name(&p.principal, arn)))
    }

    async fn update(
        &self,
        _mg: &mut CertificateAuthorityPermission,
    ) -> Result<ExternalUpdate, ReconcilerError> {
        Ok(ExternalUpdate::default())
    }

    async fn delete(
        &self,
        mg: &mut CertificateAuthorityPermission,
    ) -> Result<(), ReconcilerError> {
        let name = required_external_name(mg)?;
        let (principal, arn) = parse_external_name(&name)?;
        self.api
            .delete_permission(arn, principal, mg.spec.for_provider.source_account.as_deref())
            .await
            .map_err(aws_error(KIND, "failed to delete certificate authority permission"))?;
        info!("🗑️  Revoked {} permissions on {}", principal, arn);
        Ok(())
    }

    async fn find_existing(
        &self,
        mg: &CertificateAuthorityPermission,
    ) -> Result<Option<String>, ReconcilerError> {
        let p = &mg.spec.for_provider;
        Ok(p.certificate_authority_arn
            .as_deref()
            .map(|arn| external_name(&p.principal, arn)))
    }
}
