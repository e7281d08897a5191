//! Crate constants and environment driven settings.

use crate::models::{Credentials, ProviderType};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Pause between paginated az graph calls, to stay under the Resource Graph
/// throttling quota.
pub const SLEEP_MSEC: u64 = 200;

/// Records requested per az graph page.
pub const GRAPH_PAGE_SIZE: u32 = 100;

/// Largest stdout accepted from a single az invocation.
pub const MAX_CLI_OUTPUT_BYTES: usize = 2_000_000;

/// Default upper bound for one provider fetch or sync run.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

pub const DEFAULT_INVENTORY_FILE: &str = "subnet_inventory.json";

pub const ENV_TIMEOUT: &str = "CLOUD_SUBNET_SYNC_TIMEOUT_SECS";
pub const ENV_INVENTORY: &str = "CLOUD_SUBNET_SYNC_INVENTORY";
pub const ENV_LOG: &str = "CLOUD_SUBNET_SYNC_LOG";

/// Providers whose credentials are looked up in the environment.
pub const CREDENTIAL_PROVIDERS: [ProviderType; 5] = [
    ProviderType::AWS,
    ProviderType::AZURE,
    ProviderType::GCP,
    ProviderType::SCALEWAY,
    ProviderType::OVH,
];

#[derive(Debug, Clone)]
pub struct Settings {
    pub timeout: Duration,
    pub inventory_file: PathBuf,
    pub credentials: HashMap<ProviderType, Credentials>,
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let timeout_secs = match lookup(ENV_TIMEOUT) {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                log::warn!("Ignoring {ENV_TIMEOUT}={raw}, using {DEFAULT_TIMEOUT_SECS}s");
                DEFAULT_TIMEOUT_SECS
            }),
            None => DEFAULT_TIMEOUT_SECS,
        };

        let inventory_file = lookup(ENV_INVENTORY)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_INVENTORY_FILE.to_string());

        let credentials = CREDENTIAL_PROVIDERS
            .iter()
            .filter_map(|p| credentials_for(p, &lookup).map(|c| (p.clone(), c)))
            .collect();

        Settings {
            timeout: Duration::from_secs(timeout_secs),
            inventory_file: PathBuf::from(inventory_file),
            credentials,
        }
    }
}

/// `<PROVIDER>_ACCESS_KEY`, `_SECRET_KEY`, `_TOKEN`, `_REGION`. None when
/// none of them is set.
fn credentials_for<F>(provider: &ProviderType, lookup: &F) -> Option<Credentials>
where
    F: Fn(&str) -> Option<String>,
{
    let prefix = provider.as_str().to_uppercase();
    let var = |suffix: &str| lookup(&format!("{prefix}_{suffix}"));

    let access_key = var("ACCESS_KEY");
    let secret_key = var("SECRET_KEY");
    let token = var("TOKEN");
    let region = var("REGION");

    if access_key.is_none() && secret_key.is_none() && token.is_none() && region.is_none() {
        return None;
    }

    let mut creds = Credentials::new(provider.clone())
        .with_keys(access_key.unwrap_or_default(), secret_key.unwrap_or_default())
        .with_token(token.unwrap_or_default())
        .with_region(region.unwrap_or_default());
    if let Some(tenant) = var("TENANT_ID") {
        creds = creds.with_extra("tenant_id", tenant);
    }
    Some(creds)
}
