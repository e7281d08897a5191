//! Reconciliation of cloud network topology into the local inventory.
//!
//! - [`source`] - listing contract each cloud offers ([`NetworkSource`])
//! - [`utilization`] - address utilization formula
//!
//! A run first walks the parent networks, then the leaf subnets, so every
//! leaf can be linked to its parent record. CIDR equality decides whether a
//! record is already known.
//!
//! Two concurrent runs for the same provider can both miss a CIDR and both
//! create it: each record is a read followed by a separate write, and the
//! repository offers no upsert-by-key. Records whose cloud resource vanished
//! are left alone.

mod source;
mod utilization;

pub use source::{LeafSubnetRecord, NetworkRecord, NetworkSource};
pub use utilization::{utilization_for_cidr, utilization_percent, DEFAULT_RESERVED_ADDRESSES};

use crate::context::Context;
use crate::error::{ProviderError, RepositoryError, SyncError};
use crate::models::{
    CloudInfo, LocationType, ProviderType, ResourceType, Subnet, SubnetFilter, Utilization,
};
use crate::repository::SubnetRepository;
use chrono::Utc;
use colored::Colorize;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// One record that could not be reconciled.
#[derive(Serialize, Debug, Clone)]
pub struct RecordFailure {
    pub cidr: String,
    pub resource_type: ResourceType,
    pub error: String,
}

/// Outcome of a sync run. Per-record failures are collected here instead of
/// ending the run.
#[derive(Serialize, Debug, Clone)]
pub struct SyncReport {
    pub provider: ProviderType,
    pub vpcs_created: usize,
    pub vpcs_skipped: usize,
    pub subnets_created: usize,
    pub subnets_updated: usize,
    pub failures: Vec<RecordFailure>,
}

impl SyncReport {
    fn new(provider: ProviderType) -> Self {
        SyncReport {
            provider,
            vpcs_created: 0,
            vpcs_skipped: 0,
            subnets_created: 0,
            subnets_updated: 0,
            failures: Vec::new(),
        }
    }

    fn merge(&mut self, other: SyncReport) {
        self.vpcs_created += other.vpcs_created;
        self.vpcs_skipped += other.vpcs_skipped;
        self.subnets_created += other.subnets_created;
        self.subnets_updated += other.subnets_updated;
        self.failures.extend(other.failures);
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Outcome of a utilization refresh.
#[derive(Serialize, Debug, Clone, Default)]
pub struct UtilizationReport {
    pub refreshed: usize,
    pub skipped: usize,
    pub failures: Vec<RecordFailure>,
}

/// Syncs one provider's networks into a [`SubnetRepository`].
pub struct Reconciler {
    provider: ProviderType,
    source: Arc<dyn NetworkSource>,
    repository: Arc<dyn SubnetRepository>,
}

impl Reconciler {
    pub fn new(
        provider: ProviderType,
        source: Arc<dyn NetworkSource>,
        repository: Arc<dyn SubnetRepository>,
    ) -> Self {
        Reconciler {
            provider,
            source,
            repository,
        }
    }

    pub fn provider(&self) -> &ProviderType {
        &self.provider
    }

    /// Parents, then leaves. A failed listing call ends the run; failed
    /// records only show up in the report.
    pub async fn sync(&self, ctx: &Context) -> Result<SyncReport, SyncError> {
        log::info!("#Start sync of {}", self.provider.as_str().cyan());
        let mut report = self.sync_vpcs(ctx).await?;
        report.merge(self.sync_subnets(ctx).await?);
        log::info!(
            "Sync of {} done: vpcs +{} ={}, subnets +{} ~{}, {} failure(s)",
            self.provider.as_str().cyan(),
            report.vpcs_created,
            report.vpcs_skipped,
            report.subnets_created,
            report.subnets_updated,
            report.failures.len()
        );
        Ok(report)
    }

    /// Create a record for every parent network not yet in the inventory.
    /// Known parents are left unchanged.
    pub async fn sync_vpcs(&self, ctx: &Context) -> Result<SyncReport, SyncError> {
        let networks = self
            .source
            .list_networks(ctx)
            .await
            .map_err(|source| self.listing_failed("networks", source))?;
        log::info!(
            "{} listed {} network(s)",
            self.provider.as_str().cyan(),
            networks.len()
        );

        let mut report = SyncReport::new(self.provider.clone());
        for network in networks {
            self.check_interrupted(ctx)?;

            match self.repository.get_subnet_by_cidr(ctx, &network.cidr).await {
                Ok(existing) => {
                    log::debug!("VPC {} already known as {}", network.cidr, existing.id);
                    report.vpcs_skipped += 1;
                }
                Err(e) if e.is_not_found() => {
                    let mut record = self.new_vpc_record(&network);
                    match self.repository.create_subnet(ctx, &mut record).await {
                        Ok(()) => {
                            log::info!("Created VPC {} '{}'", record.cidr, record.name);
                            report.vpcs_created += 1;
                        }
                        Err(e) => self.record_failure(&mut report.failures, &network.cidr, ResourceType::Vpc, e),
                    }
                }
                Err(e) => self.record_failure(&mut report.failures, &network.cidr, ResourceType::Vpc, e),
            }
        }
        Ok(report)
    }

    /// Create or update a record for every leaf subnet and link it to its
    /// parent network record.
    pub async fn sync_subnets(&self, ctx: &Context) -> Result<SyncReport, SyncError> {
        let leaves = self
            .source
            .list_leaf_subnets(ctx)
            .await
            .map_err(|source| self.listing_failed("subnets", source))?;
        log::info!(
            "{} listed {} subnet(s)",
            self.provider.as_str().cyan(),
            leaves.len()
        );

        let parents = self.parent_index(ctx).await?;
        let mut report = SyncReport::new(self.provider.clone());

        for leaf in leaves {
            self.check_interrupted(ctx)?;
            let parent_id = parents.get(&leaf.parent_id).copied();

            let outcome = match self.repository.get_subnet_by_cidr(ctx, &leaf.cidr).await {
                Ok(existing) => self
                    .update_leaf(ctx, existing, &leaf, parent_id)
                    .await
                    .map(|_| report.subnets_updated += 1),
                Err(e) if e.is_not_found() => self
                    .create_leaf(ctx, &leaf, parent_id)
                    .await
                    .map(|_| report.subnets_created += 1),
                Err(e) => Err(e),
            };
            if let Err(e) = outcome {
                self.record_failure(&mut report.failures, &leaf.cidr, ResourceType::Subnet, e);
            }
        }
        Ok(report)
    }

    /// Re-read utilization for every leaf record of this provider. Records
    /// without an external subnet id (parent networks) are skipped.
    pub async fn refresh_utilization(&self, ctx: &Context) -> Result<UtilizationReport, SyncError> {
        let records = self
            .repository
            .list_subnets(ctx, &SubnetFilter::provider(self.provider.clone()))
            .await?;

        let mut report = UtilizationReport::default();
        for mut record in records.subnets {
            self.check_interrupted(ctx)?;

            let subnet_id = match &record.cloud_info {
                Some(ci) if !ci.subnet_id.is_empty() => ci.subnet_id.clone(),
                _ => {
                    report.skipped += 1;
                    continue;
                }
            };

            let percent = match self.source.get_utilization(ctx, &subnet_id).await {
                Ok(p) => p,
                Err(e) => {
                    self.record_failure(&mut report.failures, &record.cidr, ResourceType::Subnet, e);
                    continue;
                }
            };

            record.utilization = Some(Utilization::now(percent));
            record.updated_at = Utc::now();
            match self.repository.update_subnet(ctx, record.id, &record).await {
                Ok(()) => {
                    log::debug!("Utilization of {} is {percent:.1}%", record.cidr);
                    report.refreshed += 1;
                }
                Err(e) => self.record_failure(&mut report.failures, &record.cidr, ResourceType::Subnet, e),
            }
        }

        log::info!(
            "Utilization refresh of {}: {} refreshed, {} skipped, {} failure(s)",
            self.provider.as_str().cyan(),
            report.refreshed,
            report.skipped,
            report.failures.len()
        );
        Ok(report)
    }

    async fn update_leaf(
        &self,
        ctx: &Context,
        mut existing: Subnet,
        leaf: &LeafSubnetRecord,
        parent_id: Option<Uuid>,
    ) -> Result<(), RepositoryError> {
        let account_id = existing
            .cloud_info
            .as_ref()
            .map(|ci| ci.account_id.clone())
            .unwrap_or_default();
        existing.cloud_info = Some(self.leaf_cloud_info(leaf, account_id));
        existing.location = leaf.region.clone();
        existing.location_type = LocationType::Cloud;
        if !leaf.tags.is_empty() {
            existing.tags = leaf.tags.clone();
        }
        // a leaf sharing its parent's CIDR is the parent record itself
        if parent_id.is_some() && parent_id != Some(existing.id) {
            existing.parent_id = parent_id;
        }
        existing.updated_at = Utc::now();

        self.repository.update_subnet(ctx, existing.id, &existing).await?;
        log::debug!("Updated subnet {} ({})", existing.cidr, existing.id);
        Ok(())
    }

    async fn create_leaf(
        &self,
        ctx: &Context,
        leaf: &LeafSubnetRecord,
        parent_id: Option<Uuid>,
    ) -> Result<(), RepositoryError> {
        let percent = match self.source.get_utilization(ctx, &leaf.id).await {
            Ok(p) => p,
            Err(e) => {
                log::warn!("Utilization of {} unavailable, using 0: {e}", leaf.cidr);
                0.0
            }
        };

        let mut record = Subnet {
            name: display_name(&leaf.name, &leaf.id),
            cidr: leaf.cidr.clone(),
            location: leaf.region.clone(),
            location_type: LocationType::Cloud,
            cloud_info: Some(self.leaf_cloud_info(leaf, String::new())),
            utilization: Some(Utilization::now(percent)),
            parent_id,
            tags: leaf.tags.clone(),
            ..Default::default()
        };
        self.repository.create_subnet(ctx, &mut record).await?;
        log::info!("Created subnet {} '{}'", record.cidr, record.name);
        Ok(())
    }

    fn new_vpc_record(&self, network: &NetworkRecord) -> Subnet {
        Subnet {
            name: display_name(&network.name, &network.id),
            cidr: network.cidr.clone(),
            location: network.region.clone(),
            location_type: LocationType::Cloud,
            cloud_info: Some(CloudInfo {
                provider: self.provider.clone(),
                region: network.region.clone(),
                account_id: String::new(),
                resource_type: ResourceType::Vpc,
                vpc_id: network.id.clone(),
                subnet_id: String::new(),
            }),
            tags: network.tags.clone(),
            ..Default::default()
        }
    }

    fn leaf_cloud_info(&self, leaf: &LeafSubnetRecord, account_id: String) -> CloudInfo {
        CloudInfo {
            provider: self.provider.clone(),
            region: leaf.region.clone(),
            account_id,
            resource_type: ResourceType::Subnet,
            vpc_id: leaf.parent_id.clone(),
            subnet_id: leaf.id.clone(),
        }
    }

    /// vpcID -> local record id of this provider's parent networks.
    async fn parent_index(&self, ctx: &Context) -> Result<HashMap<String, Uuid>, SyncError> {
        let records = self
            .repository
            .list_subnets(ctx, &SubnetFilter::provider(self.provider.clone()))
            .await?;
        Ok(records
            .subnets
            .into_iter()
            .filter_map(|s| match s.cloud_info {
                Some(ci) if ci.resource_type == ResourceType::Vpc && !ci.vpc_id.is_empty() => {
                    Some((ci.vpc_id, s.id))
                }
                _ => None,
            })
            .collect())
    }

    fn check_interrupted(&self, ctx: &Context) -> Result<(), SyncError> {
        match ctx.err() {
            Some(source) => Err(SyncError::Interrupted {
                provider: self.provider.clone(),
                source,
            }),
            None => Ok(()),
        }
    }

    fn listing_failed(&self, what: &'static str, source: ProviderError) -> SyncError {
        log::error!(
            "Listing {what} from {} {}: {source}",
            self.provider.as_str().cyan(),
            "failed".on_red()
        );
        SyncError::Listing {
            provider: self.provider.clone(),
            what,
            source,
        }
    }

    fn record_failure(
        &self,
        failures: &mut Vec<RecordFailure>,
        cidr: &str,
        resource_type: ResourceType,
        error: impl std::fmt::Display,
    ) {
        log::warn!(
            "{} {:?} {cidr} {}: {error}",
            self.provider.as_str().cyan(),
            resource_type,
            "failed".on_red()
        );
        failures.push(RecordFailure {
            cidr: cidr.to_string(),
            resource_type,
            error: error.to_string(),
        });
    }
}

fn display_name(name: &str, id: &str) -> String {
    if name.trim().is_empty() {
        id.to_string()
    } else {
        name.to_string()
    }
}
