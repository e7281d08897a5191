//! Azure Resource Graph query execution.
//!
//! Handles paginated `az graph query` calls for virtual networks and their
//! subnets.

use super::cli;
use crate::config;
use crate::context::Context;
use crate::error::{ProviderError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Every virtual network with its address space.
pub const VNET_QUERY: &str = r#"resources
        | where type == "microsoft.network/virtualnetworks"
        | project vnet_id=id
                ,vnet_name=name
                ,subscription_id=subscriptionId
                ,location=location
                ,address_prefixes=properties.addressSpace.addressPrefixes
                ,tags=tags
        | sort by vnet_id asc"#;

/// Every subnet, one row each, with the count of attached ip configurations.
pub const SUBNET_QUERY: &str = r#"resources
        | where type == "microsoft.network/virtualnetworks"
        | mv-expand subnet=properties.subnets
        | project vnet_id=id
                ,subscription_id=subscriptionId
                ,location=location
                ,tags=tags
                ,subnet_id=tostring(subnet.id)
                ,subnet_name=tostring(subnet.name)
                ,subnet_cidr=tostring(subnet.properties.addressPrefix)
                ,ip_configurations_count=array_length(subnet.properties.ipConfigurations)
        | sort by subnet_id asc"#;

/// One page of `az graph query` output.
#[derive(Serialize, Deserialize, Debug)]
pub struct Page<T> {
    pub data: Vec<T>,
    /// Token for the next page, absent on the last one.
    pub skip_token: Option<String>,
    pub total_records: Option<u32>,
    pub count: i32,
}

/// Row of [`VNET_QUERY`].
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct VnetRow {
    pub vnet_id: String,
    pub vnet_name: String,
    #[serde(default)]
    pub subscription_id: String,
    #[serde(default)]
    pub location: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub address_prefixes: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: HashMap<String, String>,
}

/// Row of [`SUBNET_QUERY`].
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct SubnetRow {
    pub vnet_id: String,
    #[serde(default)]
    pub subscription_id: String,
    #[serde(default)]
    pub location: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: HashMap<String, String>,
    pub subnet_id: String,
    pub subnet_name: String,
    /// Empty for subnets declared with `addressPrefixes` only.
    #[serde(default, deserialize_with = "null_as_default")]
    pub subnet_cidr: String,
    /// Null in Resource Graph when the subnet has no ip configurations.
    #[serde(default)]
    pub ip_configurations_count: Option<i64>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Every virtual network visible to the logged in account.
pub async fn query_vnets(ctx: &Context) -> Result<Vec<VnetRow>> {
    query_all(ctx, VNET_QUERY).await
}

/// Every subnet visible to the logged in account.
pub async fn query_subnets(ctx: &Context) -> Result<Vec<SubnetRow>> {
    query_all(ctx, SUBNET_QUERY).await
}

/// The row of one subnet, looked up by its resource id.
pub async fn query_subnet(ctx: &Context, subnet_id: &str) -> Result<Option<SubnetRow>> {
    if subnet_id.contains(['\'', '"']) {
        return Err(ProviderError::Command(format!("Invalid subnet id: {subnet_id}")));
    }
    let query = format!("{SUBNET_QUERY}\n        | where subnet_id =~ \"{subnet_id}\" | limit 1");
    Ok(query_all::<SubnetRow>(ctx, &query).await?.into_iter().next())
}

/// Run `query` and follow skip tokens until the last page.
pub async fn query_all<T>(ctx: &Context, query: &str) -> Result<Vec<T>>
where
    T: DeserializeOwned,
{
    let mut rows: Vec<T> = Vec::new();
    let mut skip_token: Option<String> = None;
    let mut block = 0usize;

    loop {
        if let Some(e) = ctx.err() {
            return Err(e);
        }

        let skip_token_param = skip_token
            .as_deref()
            .map(|t| format!("--skip-token {t} "))
            .unwrap_or_default();
        let cmd = format!(
            "az graph query --first {page} {skip_token_param}-q '{query}' --output json",
            page = config::GRAPH_PAGE_SIZE
        );
        let output = cli::run(ctx, &cmd).await?;
        let page: Page<T> = parse_page(&output, block)?;

        let count = page.count;
        rows.extend(page.data);
        log::info!(
            "got block#{block:2} record_count=+{count:3} => {total:3} of {expected:?}",
            total = rows.len(),
            expected = page.total_records,
        );

        match page.skip_token {
            Some(next) if skip_token.as_deref() == Some(next.as_str()) => {
                return Err(ProviderError::Parse(
                    "Skip token not unique - possible infinite loop".to_string(),
                ));
            }
            Some(next) => skip_token = Some(next),
            None => break,
        }

        // Resource Graph throttles per tenant
        ctx.run(async {
            tokio::time::sleep(Duration::from_millis(config::SLEEP_MSEC)).await;
            Ok(())
        })
        .await?;
        block += 1;
    }

    log::debug!("az graph query returned {} rows in {} blocks", rows.len(), block + 1);
    Ok(rows)
}

/// Parse one page of output, naming the failing JSON path on error.
fn parse_page<T>(output: &str, block: usize) -> Result<Page<T>>
where
    T: DeserializeOwned,
{
    let mut deserializer = serde_json::Deserializer::from_str(output);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
        log::error!("OUTPUT START:\n\n{}\n\nOUTPUT END\n", output);
        ProviderError::Parse(format!(
            "Error parsing JSON block {block}: path={} error={}",
            e.path(),
            e
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const VNET_PAGE: &str = r#"{
        "count": 2,
        "data": [
            {
                "vnet_id": "/subscriptions/s1/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/hub",
                "vnet_name": "hub",
                "subscription_id": "s1",
                "location": "westeurope",
                "address_prefixes": ["10.0.0.0/16", "10.10.0.0/24"],
                "tags": {"env": "prod"}
            },
            {
                "vnet_id": "/subscriptions/s1/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/spoke",
                "vnet_name": "spoke",
                "subscription_id": "s1",
                "location": "westeurope",
                "address_prefixes": ["10.1.0.0/16"],
                "tags": null
            }
        ],
        "skip_token": "ew0KICAiJGlkIjogIjEiLA0K",
        "total_records": 3
    }"#;

    const SUBNET_PAGE: &str = r#"{
        "count": 2,
        "data": [
            {
                "vnet_id": "/subscriptions/s1/.../virtualNetworks/hub",
                "subscription_id": "s1",
                "location": "westeurope",
                "tags": null,
                "subnet_id": "/subscriptions/s1/.../virtualNetworks/hub/subnets/app",
                "subnet_name": "app",
                "subnet_cidr": "10.0.1.0/24",
                "ip_configurations_count": 12
            },
            {
                "vnet_id": "/subscriptions/s1/.../virtualNetworks/hub",
                "subscription_id": "s1",
                "location": "westeurope",
                "tags": {},
                "subnet_id": "/subscriptions/s1/.../virtualNetworks/hub/subnets/empty",
                "subnet_name": "empty",
                "subnet_cidr": "10.0.2.0/24",
                "ip_configurations_count": null
            }
        ],
        "skip_token": null,
        "total_records": 2
    }"#;

    #[test]
    fn test_parse_vnet_page() {
        let page: Page<VnetRow> = parse_page(VNET_PAGE, 0).unwrap();
        assert_eq!(page.count, 2);
        assert_eq!(page.total_records, Some(3));
        assert_eq!(page.skip_token.as_deref(), Some("ew0KICAiJGlkIjogIjEiLA0K"));
        assert_eq!(page.data[0].address_prefixes.len(), 2);
        assert_eq!(page.data[0].tags.get("env").map(String::as_str), Some("prod"));
        assert!(page.data[1].tags.is_empty());
    }

    #[test]
    fn test_parse_subnet_page() {
        let page: Page<SubnetRow> = parse_page(SUBNET_PAGE, 1).unwrap();
        assert!(page.skip_token.is_none());
        assert_eq!(page.data[0].ip_configurations_count, Some(12));
        assert_eq!(page.data[1].ip_configurations_count, None);
        assert_eq!(page.data[1].subnet_cidr, "10.0.2.0/24");
    }

    #[test]
    fn test_parse_error_names_path() {
        let bad = r#"{"count": 1, "data": [{"vnet_id": 7, "vnet_name": "x"}]}"#;
        let err = parse_page::<VnetRow>(bad, 3).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("block 3"), "{msg}");
        assert!(msg.contains("data[0].vnet_id"), "{msg}");
    }

    #[test]
    fn test_queries_survive_command_split() {
        // a trailing quote would be eaten when the command is split
        for q in [VNET_QUERY, SUBNET_QUERY] {
            assert!(!q.ends_with('"'));
            assert!(!q.contains('\''));
        }
    }

    #[tokio::test]
    async fn test_query_subnet_rejects_quotes() {
        let err = query_subnet(&Context::background(), "abc' | drop")
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Command(_)));
    }

    #[tokio::test]
    async fn test_query_all_respects_cancel() {
        let (ctx, handle) = Context::with_cancel();
        handle.cancel();
        let err = query_all::<VnetRow>(&ctx, VNET_QUERY).await.unwrap_err();
        assert!(matches!(err, ProviderError::Cancelled));
    }
}
