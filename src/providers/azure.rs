//! Azure virtual network subnets. Service principal client id + client secret.

use super::{check_credentials, unimplemented_fetch, CredentialKind, Provider};
use crate::context::Context;
use crate::error::Result;
use crate::models::{CloudSubnet, Credentials, ProviderType};
use async_trait::async_trait;

const REGIONS: &[&str] = &[
    "eastus",
    "eastus2",
    "westus",
    "westus2",
    "centralus",
    "northeurope",
    "westeurope",
    "uksouth",
    "francecentral",
    "germanywestcentral",
    "swedencentral",
    "southeastasia",
    "australiaeast",
    "japaneast",
];

#[derive(Debug, Default, Clone)]
pub struct AzureProvider;

impl AzureProvider {
    pub fn new() -> Self {
        AzureProvider
    }
}

#[async_trait]
impl Provider for AzureProvider {
    fn name(&self) -> &str {
        "Microsoft Azure"
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::AZURE
    }

    async fn fetch_subnets(&self, ctx: &Context, creds: &Credentials) -> Result<Vec<CloudSubnet>> {
        unimplemented_fetch(self, ctx, creds).await
    }

    fn regions(&self) -> Vec<String> {
        REGIONS.iter().map(|r| r.to_string()).collect()
    }

    fn validate_credentials(&self, creds: &Credentials) -> Result<()> {
        check_credentials(&ProviderType::AZURE, CredentialKind::KeyPair, creds)
    }
}
