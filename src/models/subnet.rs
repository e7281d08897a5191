//! Inventory subnet record.

use super::{CidrDetails, CidrError, Ipv4, ProviderType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Where a subnet lives.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LocationType {
    #[default]
    Datacenter,
    Site,
    Cloud,
}

/// Level of a cloud resource in the VPC/subnet hierarchy.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Vpc,
    Subnet,
}

/// Cloud origin of an inventory record.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CloudInfo {
    pub provider: ProviderType,
    pub region: String,
    #[serde(rename = "accountID", default)]
    pub account_id: String,
    pub resource_type: ResourceType,
    #[serde(rename = "vpcID", default)]
    pub vpc_id: String,
    #[serde(rename = "subnetID", default)]
    pub subnet_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Utilization {
    pub utilization_percent: f64,
    pub last_updated: DateTime<Utc>,
}

impl Utilization {
    pub fn now(utilization_percent: f64) -> Self {
        Utilization {
            utilization_percent,
            last_updated: Utc::now(),
        }
    }
}

/// One record of the local subnet inventory.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Subnet {
    /// Nil until the repository assigns one on create.
    pub id: Uuid,
    pub name: String,
    pub cidr: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub location_type: LocationType,
    #[serde(default)]
    pub cloud_info: Option<CloudInfo>,
    #[serde(default)]
    pub utilization: Option<Utilization>,
    #[serde(rename = "parentID", default)]
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for Subnet {
    fn default() -> Self {
        let now = Utc::now();
        Subnet {
            id: Uuid::nil(),
            name: String::new(),
            cidr: String::new(),
            location: String::new(),
            location_type: LocationType::default(),
            cloud_info: None,
            utilization: None,
            parent_id: None,
            tags: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl Subnet {
    /// Parsed CIDR of this record.
    pub fn ipv4(&self) -> Result<Ipv4, CidrError> {
        Ipv4::new(&self.cidr)
    }

    /// IP-math view of the record's block.
    pub fn details(&self) -> Result<CidrDetails, CidrError> {
        Ok(self.ipv4()?.details())
    }

    pub fn is_cloud_resource(&self, provider: &ProviderType, kind: ResourceType) -> bool {
        self.cloud_info
            .as_ref()
            .is_some_and(|ci| &ci.provider == provider && ci.resource_type == kind)
    }
}

/// Filter accepted by [`crate::repository::SubnetRepository::list_subnets`].
#[derive(Debug, Clone, Default)]
pub struct SubnetFilter {
    pub cloud_provider: Option<ProviderType>,
}

impl SubnetFilter {
    pub fn provider(provider: ProviderType) -> Self {
        SubnetFilter {
            cloud_provider: Some(provider),
        }
    }

    pub fn matches(&self, subnet: &Subnet) -> bool {
        match &self.cloud_provider {
            None => true,
            Some(p) => subnet
                .cloud_info
                .as_ref()
                .is_some_and(|ci| &ci.provider == p),
        }
    }
}

/// Page returned by `list_subnets`.
#[derive(Serialize, Debug, Clone, Default)]
pub struct SubnetList {
    pub subnets: Vec<Subnet>,
    pub total: usize,
}
