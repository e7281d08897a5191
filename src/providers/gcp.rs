//! Google Cloud VPC subnetworks. OAuth access token of a service account.

use super::{check_credentials, unimplemented_fetch, CredentialKind, Provider};
use crate::context::Context;
use crate::error::Result;
use crate::models::{CloudSubnet, Credentials, ProviderType};
use async_trait::async_trait;

const REGIONS: &[&str] = &[
    "us-central1",
    "us-east1",
    "us-west1",
    "europe-west1",
    "europe-west2",
    "europe-west3",
    "europe-west4",
    "europe-north1",
    "asia-east1",
    "asia-northeast1",
    "asia-southeast1",
    "australia-southeast1",
];

#[derive(Debug, Default, Clone)]
pub struct GcpProvider;

impl GcpProvider {
    pub fn new() -> Self {
        GcpProvider
    }
}

#[async_trait]
impl Provider for GcpProvider {
    fn name(&self) -> &str {
        "Google Cloud Platform"
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::GCP
    }

    async fn fetch_subnets(&self, ctx: &Context, creds: &Credentials) -> Result<Vec<CloudSubnet>> {
        unimplemented_fetch(self, ctx, creds).await
    }

    fn regions(&self) -> Vec<String> {
        REGIONS.iter().map(|r| r.to_string()).collect()
    }

    fn validate_credentials(&self, creds: &Credentials) -> Result<()> {
        check_credentials(&ProviderType::GCP, CredentialKind::Token, creds)
    }
}
