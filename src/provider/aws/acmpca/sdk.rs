//! # ACM PCA SDK Adapter

use crate::crd::acmpca::{CertificateAuthorityParameters, RevocationConfiguration, Subject};
use crate::crd::Tag;
use crate::provider::aws::acmpca::{AcmPcaApi, PERMISSION_ACTIONS};
use crate::provider::aws::errors::AwsError;
use crate::provider::aws::tags::tags_from_pairs;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_acmpca::types as sdk;
use aws_sdk_acmpca::Client;

#[derive(Debug, Clone)]
pub struct SdkAcmPca {
    client: Client,
}

impl SdkAcmPca {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }
}

fn sdk_tags(tags: &[Tag]) -> Result<Vec<sdk::Tag>, AwsError> {
    tags.iter()
        .map(|t| {
            sdk::Tag::builder()
                .key(&t.key)
                .set_value(t.value.clone())
                .build()
                .map_err(AwsError::construction)
        })
        .collect()
}

fn subject(subject: &Subject) -> sdk::Asn1Subject {
    let non_empty = |s: &String| (!s.is_empty()).then(|| s.clone());
    sdk::Asn1Subject::builder()
        .set_common_name(non_empty(&subject.common_name))
        .set_country(non_empty(&subject.country))
        .set_organization(non_empty(&subject.organization))
        .set_organizational_unit(non_empty(&subject.organizational_unit))
        .set_state(non_empty(&subject.state))
        .set_locality(non_empty(&subject.locality))
        .set_distinguished_name_qualifier(subject.distinguished_name_qualifier.clone())
        .set_generation_qualifier(subject.generation_qualifier.clone())
        .set_given_name(subject.given_name.clone())
        .set_initials(subject.initials.clone())
        .set_pseudonym(subject.pseudonym.clone())
        .set_serial_number(subject.serial_number.clone())
        .set_surname(subject.surname.clone())
        .set_title(subject.title.clone())
        .build()
}

fn revocation(config: &RevocationConfiguration) -> Result<sdk::RevocationConfiguration, AwsError> {
    let crl = config
        .crl_configuration
        .as_ref()
        .map(|c| {
            sdk::CrlConfiguration::builder()
                .enabled(c.enabled)
                .set_custom_cname(c.custom_cname.clone())
                .set_expiration_in_days(c.expiration_in_days)
                .set_s3_bucket_name(c.s3_bucket_name.clone())
                .build()
                .map_err(AwsError::construction)
        })
        .transpose()?;
    Ok(sdk::RevocationConfiguration::builder()
        .set_crl_configuration(crl)
        .build())
}

#[async_trait]
impl AcmPcaApi for SdkAcmPca {
    async fn describe_certificate_authority(
        &self,
        arn: &str,
    ) -> Result<Option<sdk::CertificateAuthority>, AwsError> {
        let output = self
            .client
            .describe_certificate_authority()
            .certificate_authority_arn(arn)
            .send()
            .await?;
        Ok(output.certificate_authority().cloned())
    }

    async fn list_tags(&self, arn: &str) -> Result<Vec<Tag>, AwsError> {
        let output = self
            .client
            .list_tags()
            .certificate_authority_arn(arn)
            .send()
            .await?;
        Ok(tags_from_pairs(output.tags().iter().map(|t| {
            (Some(t.key().to_string()), t.value().map(str::to_string))
        })))
    }

    async fn create_certificate_authority(
        &self,
        params: &CertificateAuthorityParameters,
        idempotency_token: &str,
    ) -> Result<String, AwsError> {
        let c = &params.certificate_authority_configuration;
        let configuration = sdk::CertificateAuthorityConfiguration::builder()
            .key_algorithm(sdk::KeyAlgorithm::from(c.key_algorithm.as_str()))
            .signing_algorithm(sdk::SigningAlgorithm::from(c.signing_algorithm.as_str()))
            .subject(subject(&c.subject))
            .build()
            .map_err(AwsError::construction)?;
        let tags = sdk_tags(&params.tags)?;

        let output = self
            .client
            .create_certificate_authority()
            .certificate_authority_configuration(configuration)
            .certificate_authority_type(sdk::CertificateAuthorityType::from(
                params.r#type.as_str(),
            ))
            .set_revocation_configuration(
                params
                    .revocation_configuration
                    .as_ref()
                    .map(revocation)
                    .transpose()?,
            )
            .idempotency_token(idempotency_token)
            .set_tags((!tags.is_empty()).then_some(tags))
            .send()
            .await?;
        output
            .certificate_authority_arn()
            .map(str::to_string)
            .ok_or_else(|| AwsError::construction("CreateCertificateAuthority returned no ARN"))
    }

    async fn update_certificate_authority(
        &self,
        arn: &str,
        status: Option<&str>,
        revocation_configuration: Option<&RevocationConfiguration>,
    ) -> Result<(), AwsError> {
        self.client
            .update_certificate_authority()
            .certificate_authority_arn(arn)
            .set_status(status.map(sdk::CertificateAuthorityStatus::from))
            .set_revocation_configuration(revocation_configuration.map(revocation).transpose()?)
            .send()
            .await?;
        Ok(())
    }

    async fn tag_certificate_authority(&self, arn: &str, tags: &[Tag]) -> Result<(), AwsError> {
        self.client
            .tag_certificate_authority()
            .certificate_authority_arn(arn)
            .set_tags(Some(sdk_tags(tags)?))
            .send()
            .await?;
        Ok(())
    }

    async fn untag_certificate_authority(
        &self,
        arn: &str,
        keys: &[String],
    ) -> Result<(), AwsError> {
        let tags = keys
            .iter()
            .map(|key| {
                sdk::Tag::builder()
                    .key(key)
                    .build()
                    .map_err(AwsError::construction)
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.client
            .untag_certificate_authority()
            .certificate_authority_arn(arn)
            .set_tags(Some(tags))
            .send()
            .await?;
        Ok(())
    }

    async fn delete_certificate_authority(
        &self,
        arn: &str,
        permanent_deletion_time_in_days: Option<i32>,
    ) -> Result<(), AwsError> {
        self.client
            .delete_certificate_authority()
            .certificate_authority_arn(arn)
            .set_permanent_deletion_time_in_days(permanent_deletion_time_in_days)
            .send()
            .await?;
        Ok(())
    }

    async fn list_permissions(&self, ca_arn: &str) -> Result<Vec<sdk::Permission>, AwsError> {
        let mut permissions = Vec::new();
        let mut next_token = None;
        loop {
            let output = self
                .client
                .list_permissions()
                .certificate_authority_arn(ca_arn)
                .set_next_token(next_token)
                .send()
                .await?;
            permissions.extend_from_slice(output.permissions());
            match output.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => return Ok(permissions),
            }
        }
    }

    async fn create_permission(
        &self,
        ca_arn: &str,
        principal: &str,
        source_account: Option<&str>,
    ) -> Result<(), AwsError> {
        self.client
            .create_permission()
            .certificate_authority_arn(ca_arn)
            .principal(principal)
            .set_source_account(source_account.map(str::to_string))
            .set_actions(Some(
                PERMISSION_ACTIONS
                    .iter()
                    .map(|a| sdk::ActionType::from(*a))
                    .collect(),
            ))
            .send()
            .await?;
        Ok(())
    }

    async fn delete_permission(
        &self,
        ca_arn: &str,
        principal: &str,
        source_account: Option<&str>,
    ) -> Result<(), AwsError> {
        self.client
            .delete_permission()
            .certificate_authority_arn(ca_arn)
            .principal(principal)
            .set_source_account(source_account.map(str::to_string))
            .send()
            .await?;
        Ok(())
    }
}
