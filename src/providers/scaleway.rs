//! Scaleway private networks. API access key + secret key.

use super::{check_credentials, unimplemented_fetch, CredentialKind, Provider};
use crate::context::Context;
use crate::error::Result;
use crate::models::{CloudSubnet, Credentials, ProviderType};
use async_trait::async_trait;

const REGIONS: &[&str] = &[
    "fr-par",
    "nl-ams",
    "pl-waw",
];

#[derive(Debug, Default, Clone)]
pub struct ScalewayProvider;

impl ScalewayProvider {
    pub fn new() -> Self {
        ScalewayProvider
    }
}

#[async_trait]
impl Provider for ScalewayProvider {
    fn name(&self) -> &str {
        "Scaleway"
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::SCALEWAY
    }

    async fn fetch_subnets(&self, ctx: &Context, creds: &Credentials) -> Result<Vec<CloudSubnet>> {
        unimplemented_fetch(self, ctx, creds).await
    }

    fn regions(&self) -> Vec<String> {
        REGIONS.iter().map(|r| r.to_string()).collect()
    }

    fn validate_credentials(&self, creds: &Credentials) -> Result<()> {
        check_credentials(&ProviderType::SCALEWAY, CredentialKind::KeyPair, creds)
    }
}
