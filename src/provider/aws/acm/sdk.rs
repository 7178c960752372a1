//! # ACM SDK Adapter

use crate::crd::acm::CertificateParameters;
use crate::crd::Tag;
use crate::provider::aws::acm::AcmApi;
use crate::provider::aws::errors::AwsError;
use crate::provider::aws::tags::tags_from_pairs;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_acm::types::{
    CertificateDetail, CertificateOptions, CertificateTransparencyLoggingPreference,
    DomainValidationOption, KeyAlgorithm, ValidationMethod,
};
use aws_sdk_acm::Client;

#[derive(Debug, Clone)]
pub struct SdkAcm {
    client: Client,
}

impl SdkAcm {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }
}

fn sdk_tags(tags: &[Tag]) -> Result<Vec<aws_sdk_acm::types::Tag>, AwsError> {
    tags.iter()
        .map(|t| {
            aws_sdk_acm::types::Tag::builder()
                .key(&t.key)
                .set_value(t.value.clone())
                .build()
                .map_err(AwsError::construction)
        })
        .collect()
}

fn transparency(preference: &str) -> CertificateOptions {
    CertificateOptions::builder()
        .certificate_transparency_logging_preference(
            CertificateTransparencyLoggingPreference::from(preference),
        )
        .build()
}

#[async_trait]
impl AcmApi for SdkAcm {
    async fn describe_certificate(
        &self,
        arn: &str,
    ) -> Result<Option<CertificateDetail>, AwsError> {
        let output = self
            .client
            .describe_certificate()
            .certificate_arn(arn)
            .send()
            .await?;
        Ok(output.certificate().cloned())
    }

    async fn list_tags(&self, arn: &str) -> Result<Vec<Tag>, AwsError> {
        let output = self
            .client
            .list_tags_for_certificate()
            .certificate_arn(arn)
            .send()
            .await?;
        Ok(tags_from_pairs(output.tags().iter().map(|t| {
            (Some(t.key().to_string()), t.value().map(str::to_string))
        })))
    }

    async fn request_certificate(
        &self,
        params: &CertificateParameters,
        idempotency_token: &str,
    ) -> Result<String, AwsError> {
        let validation_options = params
            .domain_validation_options
            .iter()
            .map(|o| {
                DomainValidationOption::builder()
                    .domain_name(&o.domain_name)
                    .validation_domain(&o.validation_domain)
                    .build()
                    .map_err(AwsError::construction)
            })
            .collect::<Result<Vec<_>, _>>()?;
        let tags = sdk_tags(&params.tags)?;

        let output = self
            .client
            .request_certificate()
            .domain_name(&params.domain_name)
            .idempotency_token(idempotency_token)
            .set_subject_alternative_names(
                (!params.subject_alternative_names.is_empty())
                    .then(|| params.subject_alternative_names.clone()),
            )
            .set_validation_method(params.validation_method.as_deref().map(ValidationMethod::from))
            .set_domain_validation_options((!validation_options.is_empty()).then_some(validation_options))
            .set_certificate_authority_arn(params.certificate_authority_arn.clone())
            .set_options(
                params
                    .certificate_transparency_logging_preference
                    .as_deref()
                    .map(transparency),
            )
            .set_key_algorithm(params.key_algorithm.as_deref().map(KeyAlgorithm::from))
            .set_tags((!tags.is_empty()).then_some(tags))
            .send()
            .await?;
        output
            .certificate_arn()
            .map(str::to_string)
            .ok_or_else(|| AwsError::construction("RequestCertificate returned no ARN"))
    }

    async fn add_tags(&self, arn: &str, tags: &[Tag]) -> Result<(), AwsError> {
        self.client
            .add_tags_to_certificate()
            .certificate_arn(arn)
            .set_tags(Some(sdk_tags(tags)?))
            .send()
            .await?;
        Ok(())
    }

    async fn remove_tags(&self, arn: &str, keys: &[String]) -> Result<(), AwsError> {
        let tags = keys
            .iter()
            .map(|key| {
                aws_sdk_acm::types::Tag::builder()
                    .key(key)
                    .build()
                    .map_err(AwsError::construction)
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.client
            .remove_tags_from_certificate()
            .certificate_arn(arn)
            .set_tags(Some(tags))
            .send()
            .await?;
        Ok(())
    }

    async fn update_transparency_logging(
        &self,
        arn: &str,
        preference: &str,
    ) -> Result<(), AwsError> {
        self.client
            .update_certificate_options()
            .certificate_arn(arn)
            .options(transparency(preference))
            .send()
            .await?;
        Ok(())
    }

    async fn renew_certificate(&self, arn: &str) -> Result<(), AwsError> {
        self.client
            .renew_certificate()
            .certificate_arn(arn)
            .send()
            .await?;
        Ok(())
    }

    async fn delete_certificate(&self, arn: &str) -> Result<(), AwsError> {
        self.client
            .delete_certificate()
            .certificate_arn(arn)
            .send()
            .await?;
        Ok(())
    }
}
