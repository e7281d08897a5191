//! [`NetworkSource`] backed by the Azure CLI.

use super::{cli, graph};
use super::graph::{SubnetRow, VnetRow};
use crate::context::Context;
use crate::error::{ProviderError, Result};
use crate::models::{usable_hosts, Ipv4};
use crate::sync::{utilization_percent, LeafSubnetRecord, NetworkRecord, NetworkSource, DEFAULT_RESERVED_ADDRESSES};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Reads virtual networks and subnets through `az graph query`.
///
/// Requires a prior `az login`. Subnet rows seen by the last
/// [`NetworkSource::list_leaf_subnets`] call are cached so utilization lookups
/// during a sync do not hit Resource Graph again.
pub struct AzureCliSource {
    reserved: u32,
    seen: Mutex<HashMap<String, SubnetRow>>,
}

impl AzureCliSource {
    pub fn new() -> Self {
        Self::with_reserved(DEFAULT_RESERVED_ADDRESSES)
    }

    /// Source that assumes `reserved` unusable addresses per subnet.
    pub fn with_reserved(reserved: u32) -> Self {
        AzureCliSource {
            reserved,
            seen: Mutex::new(HashMap::new()),
        }
    }

    fn utilization_of(&self, row: &SubnetRow) -> Result<f64> {
        let block = Ipv4::new(&row.subnet_cidr)
            .map_err(|e| ProviderError::Parse(format!("{}: {e}", row.subnet_id)))?;
        let used = row.ip_configurations_count.unwrap_or(0);
        let available = (usable_hosts(block.mask, self.reserved) - used).max(0);
        Ok(utilization_percent(block.mask, available, self.reserved))
    }
}

impl Default for AzureCliSource {
    fn default() -> Self {
        Self::new()
    }
}

/// A VNet with several address prefixes becomes one network per prefix, keyed
/// `<vnet id>#<prefix>`. Single prefix VNets keep their plain id.
fn network_key(vnet_id: &str, prefix_count: usize, prefix: &str) -> String {
    if prefix_count > 1 {
        format!("{vnet_id}#{prefix}")
    } else {
        vnet_id.to_string()
    }
}

fn networks_from_rows(rows: Vec<VnetRow>) -> Vec<NetworkRecord> {
    rows.into_iter()
        .flat_map(|row| {
            let count = row.address_prefixes.len();
            row.address_prefixes
                .iter()
                .map(|prefix| NetworkRecord {
                    id: network_key(&row.vnet_id, count, prefix),
                    cidr: prefix.clone(),
                    name: row.vnet_name.clone(),
                    region: row.location.clone(),
                    tags: row.tags.clone(),
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Network key of the prefix containing `cidr`, or the plain VNet id when the
/// VNet is unknown or no prefix matches.
fn parent_key(vnets: &HashMap<String, Vec<String>>, vnet_id: &str, cidr: &str) -> String {
    let Some(prefixes) = vnets.get(vnet_id) else {
        return vnet_id.to_string();
    };
    let Ok(leaf) = Ipv4::new(cidr) else {
        return vnet_id.to_string();
    };
    prefixes
        .iter()
        .find(|p| Ipv4::new(p).is_ok_and(|net| net.lo() <= leaf.lo() && leaf.hi() <= net.hi()))
        .map(|p| network_key(vnet_id, prefixes.len(), p))
        .unwrap_or_else(|| vnet_id.to_string())
}

fn leaf_from_row(row: &SubnetRow, vnets: &HashMap<String, Vec<String>>) -> LeafSubnetRecord {
    LeafSubnetRecord {
        id: row.subnet_id.clone(),
        cidr: row.subnet_cidr.clone(),
        name: row.subnet_name.clone(),
        parent_id: parent_key(vnets, &row.vnet_id, &row.subnet_cidr),
        region: row.location.clone(),
        is_public: false,
        tags: row.tags.clone(),
    }
}

#[async_trait]
impl NetworkSource for AzureCliSource {
    async fn list_networks(&self, ctx: &Context) -> Result<Vec<NetworkRecord>> {
        let rows = graph::query_vnets(ctx).await?;
        log::info!("az graph returned {} virtual networks", rows.len());
        Ok(networks_from_rows(rows))
    }

    async fn list_leaf_subnets(&self, ctx: &Context) -> Result<Vec<LeafSubnetRecord>> {
        let vnets: HashMap<String, Vec<String>> = graph::query_vnets(ctx)
            .await?
            .into_iter()
            .map(|v| (v.vnet_id, v.address_prefixes))
            .collect();
        let rows = graph::query_subnets(ctx).await?;

        let (rows, skipped): (Vec<_>, Vec<_>) =
            rows.into_iter().partition(|r| !r.subnet_cidr.is_empty());
        for r in &skipped {
            log::warn!("Skipping subnet without addressPrefix: {}", r.subnet_id);
        }

        let leaves = rows.iter().map(|r| leaf_from_row(r, &vnets)).collect();
        let mut seen = self.seen.lock().await;
        *seen = rows.into_iter().map(|r| (r.subnet_id.clone(), r)).collect();
        Ok(leaves)
    }

    async fn get_utilization(&self, ctx: &Context, leaf_id: &str) -> Result<f64> {
        let cached = self.seen.lock().await.get(leaf_id).cloned();
        let row = match cached {
            Some(row) => row,
            None => graph::query_subnet(ctx, leaf_id)
                .await?
                .ok_or_else(|| ProviderError::Parse(format!("Subnet not found in Resource Graph: {leaf_id}")))?,
        };
        self.utilization_of(&row)
    }

    async fn validate_credentials(&self, ctx: &Context) -> Result<()> {
        let output = cli::run(ctx, "az account show --output json").await?;
        let account: serde_json::Value = serde_json::from_str(&output)
            .map_err(|e| ProviderError::Parse(format!("az account show: {e}")))?;
        log::info!(
            "Using Azure subscription {}",
            account.get("name").and_then(|n| n.as_str()).unwrap_or("?")
        );
        Ok(())
    }
}
