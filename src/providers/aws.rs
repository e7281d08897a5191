//! Amazon Web Services VPC subnets. Access key id + secret access key.

use super::{check_credentials, unimplemented_fetch, CredentialKind, Provider};
use crate::context::Context;
use crate::error::Result;
use crate::models::{CloudSubnet, Credentials, ProviderType};
use async_trait::async_trait;

const REGIONS: &[&str] = &[
    "us-east-1",
    "us-east-2",
    "us-west-1",
    "us-west-2",
    "eu-west-1",
    "eu-west-2",
    "eu-west-3",
    "eu-central-1",
    "eu-north-1",
    "ap-southeast-1",
    "ap-southeast-2",
    "ap-northeast-1",
    "ap-south-1",
    "sa-east-1",
    "ca-central-1",
];

#[derive(Debug, Default, Clone)]
pub struct AwsProvider;

impl AwsProvider {
    pub fn new() -> Self {
        AwsProvider
    }
}

#[async_trait]
impl Provider for AwsProvider {
    fn name(&self) -> &str {
        "Amazon Web Services"
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::AWS
    }

    async fn fetch_subnets(&self, ctx: &Context, creds: &Credentials) -> Result<Vec<CloudSubnet>> {
        unimplemented_fetch(self, ctx, creds).await
    }

    fn regions(&self) -> Vec<String> {
        REGIONS.iter().map(|r| r.to_string()).collect()
    }

    fn validate_credentials(&self, creds: &Credentials) -> Result<()> {
        check_credentials(&ProviderType::AWS, CredentialKind::KeyPair, creds)
    }
}
