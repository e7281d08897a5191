//! Native listing contract a cloud must offer to be reconciled.

use crate::context::Context;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Parent-level network (VPC, VNet, private network).
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct NetworkRecord {
    pub id: String,
    pub cidr: String,
    pub name: String,
    pub region: String,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

/// Leaf subnet inside a [`NetworkRecord`].
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct LeafSubnetRecord {
    pub id: String,
    pub cidr: String,
    pub name: String,
    /// Id of the containing network, matched against `cloudInfo.vpcID`.
    pub parent_id: String,
    pub region: String,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

/// Listing calls the reconciler drives for one provider.
#[async_trait]
pub trait NetworkSource: Send + Sync {
    async fn list_networks(&self, ctx: &Context) -> Result<Vec<NetworkRecord>>;

    async fn list_leaf_subnets(&self, ctx: &Context) -> Result<Vec<LeafSubnetRecord>>;

    /// Percentage of the leaf's addresses in use.
    async fn get_utilization(&self, ctx: &Context, leaf_id: &str) -> Result<f64>;

    async fn validate_credentials(&self, ctx: &Context) -> Result<()>;
}
