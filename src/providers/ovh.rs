//! OVHcloud private networks. Application key + application secret + consumer key (token).

use super::{check_credentials, unimplemented_fetch, CredentialKind, Provider};
use crate::context::Context;
use crate::error::Result;
use crate::models::{CloudSubnet, Credentials, ProviderType};
use async_trait::async_trait;

const REGIONS: &[&str] = &[
    "GRA",
    "SBG",
    "RBX",
    "BHS",
    "WAW",
    "DE",
    "UK",
    "SGP",
    "SYD",
];

#[derive(Debug, Default, Clone)]
pub struct OvhProvider;

impl OvhProvider {
    pub fn new() -> Self {
        OvhProvider
    }
}

#[async_trait]
impl Provider for OvhProvider {
    fn name(&self) -> &str {
        "OVHcloud"
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::OVH
    }

    async fn fetch_subnets(&self, ctx: &Context, creds: &Credentials) -> Result<Vec<CloudSubnet>> {
        unimplemented_fetch(self, ctx, creds).await
    }

    fn regions(&self) -> Vec<String> {
        REGIONS.iter().map(|r| r.to_string()).collect()
    }

    fn validate_credentials(&self, creds: &Credentials) -> Result<()> {
        check_credentials(&ProviderType::OVH, CredentialKind::KeyPairAndToken, creds)
    }
}
