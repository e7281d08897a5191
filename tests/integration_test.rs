//! Integration tests for cloud-subnet-sync
//!
//! These tests drive the public API end to end: registry fan-out across
//! providers, and reconciliation into an inventory file on disk.

use async_trait::async_trait;
use cloud_subnet_sync::error::Result;
use cloud_subnet_sync::models::{CloudSubnet, Credentials, ProviderType, ResourceType, SubnetFilter};
use cloud_subnet_sync::repository::{JsonFileRepository, SubnetRepository};
use cloud_subnet_sync::sync::{LeafSubnetRecord, NetworkRecord, NetworkSource};
use cloud_subnet_sync::{Context, Provider, ProviderError, ProviderRegistry, Reconciler};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Provider whose fetch behaviour is picked per test.
enum Behaviour {
    Returns(Vec<&'static str>),
    Fails,
    Hangs,
}

struct MockProvider {
    provider_type: ProviderType,
    behaviour: Behaviour,
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "Mock"
    }

    fn provider_type(&self) -> ProviderType {
        self.provider_type.clone()
    }

    async fn fetch_subnets(&self, ctx: &Context, creds: &Credentials) -> Result<Vec<CloudSubnet>> {
        self.validate_credentials(creds)?;
        match &self.behaviour {
            Behaviour::Returns(cidrs) => Ok(cidrs
                .iter()
                .map(|c| CloudSubnet {
                    cidr: c.to_string(),
                    ..Default::default()
                })
                .collect()),
            Behaviour::Fails => Err(ProviderError::RateLimited("slow down".to_string())),
            Behaviour::Hangs => ctx.run(futures::future::pending()).await,
        }
    }

    fn regions(&self) -> Vec<String> {
        vec!["mock-1".to_string()]
    }

    fn validate_credentials(&self, creds: &Credentials) -> Result<()> {
        if creds.provider_type != self.provider_type {
            return Err(ProviderError::TypeMismatch {
                expected: self.provider_type.clone(),
                got: creds.provider_type.clone(),
            });
        }
        Ok(())
    }
}

fn mock(name: &'static str, behaviour: Behaviour) -> MockProvider {
    MockProvider {
        provider_type: ProviderType::new(name),
        behaviour,
    }
}

fn creds_for(names: &[&'static str]) -> HashMap<ProviderType, Credentials> {
    names
        .iter()
        .map(|n| (ProviderType::new(*n), Credentials::new(ProviderType::new(*n))))
        .collect()
}

#[tokio::test]
async fn test_fan_out_partitions_results_and_errors() {
    let registry = ProviderRegistry::new();
    registry.register(mock("alpha", Behaviour::Returns(vec!["10.0.0.0/24", "10.0.1.0/24"]))).unwrap();
    registry.register(mock("beta", Behaviour::Fails)).unwrap();
    registry.register(mock("gamma", Behaviour::Hangs)).unwrap();
    registry.register(mock("delta", Behaviour::Returns(vec!["10.9.0.0/16"]))).unwrap();

    let ctx = Context::with_timeout(Duration::from_millis(200));
    let (results, errors) = registry
        .fetch_subnets_from_all_providers(&ctx, &creds_for(&["alpha", "beta", "gamma"]))
        .await;

    assert_eq!(results.len(), 1);
    assert_eq!(results[&ProviderType::new("alpha")].len(), 2);
    assert_eq!(errors.len(), 2);
    for key in results.keys() {
        assert!(!errors.contains_key(key));
    }
    // delta had no credentials, so it was never called
    assert!(!results.contains_key(&ProviderType::new("delta")));
    assert!(!errors.contains_key(&ProviderType::new("delta")));

    let beta = &errors[&ProviderType::new("beta")];
    assert!(beta.is_unavailable());
    assert!(matches!(beta.cause(), Some(ProviderError::RateLimited(_))));

    let gamma = &errors[&ProviderType::new("gamma")];
    assert!(matches!(gamma.cause(), Some(ProviderError::Timeout(_))));
}

#[tokio::test]
async fn test_default_providers_validate_before_fetching() {
    let registry = ProviderRegistry::with_default_providers();
    assert_eq!(registry.len(), 5);
    for p in [
        ProviderType::AWS,
        ProviderType::AZURE,
        ProviderType::GCP,
        ProviderType::SCALEWAY,
        ProviderType::OVH,
    ] {
        assert!(registry.is_provider_registered(&p), "{p} missing");
        assert!(!registry.get_provider(&p).unwrap().regions().is_empty());
    }

    let ctx = Context::background();

    // empty keys fail the shape check
    let err = registry
        .fetch_subnets_from_provider(&ctx, &ProviderType::AWS, &Credentials::new(ProviderType::AWS))
        .await
        .unwrap_err();
    assert!(matches!(err.cause(), Some(ProviderError::InvalidCredentials(_))));

    // wrong provider in the credentials
    let err = registry
        .fetch_subnets_from_provider(
            &ctx,
            &ProviderType::AWS,
            &Credentials::new(ProviderType::GCP).with_token("t"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err.cause(), Some(ProviderError::TypeMismatch { .. })));

    // valid shape reaches the cloud call, which is not wired up
    let err = registry
        .fetch_subnets_from_provider(
            &ctx,
            &ProviderType::AWS,
            &Credentials::new(ProviderType::AWS).with_keys("AKIA", "secret"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err.cause(), Some(ProviderError::NotImplemented(_))));

    let err = registry
        .fetch_subnets_from_provider(&ctx, &ProviderType::new("nimbus"), &Credentials::default())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

/// Fixed topology: one VNet with two subnets.
struct StaticSource {
    networks: Vec<NetworkRecord>,
    leaves: Vec<LeafSubnetRecord>,
}

impl StaticSource {
    fn new(leaf_name: &str) -> Self {
        let leaf = |id: &str, cidr: &str| LeafSubnetRecord {
            id: id.to_string(),
            cidr: cidr.to_string(),
            name: format!("{leaf_name}-{id}"),
            parent_id: "vnet-hub".to_string(),
            region: "westeurope".to_string(),
            ..Default::default()
        };
        StaticSource {
            networks: vec![NetworkRecord {
                id: "vnet-hub".to_string(),
                cidr: "10.0.0.0/16".to_string(),
                name: "hub".to_string(),
                region: "westeurope".to_string(),
                tags: HashMap::new(),
            }],
            leaves: vec![leaf("a", "10.0.1.0/24"), leaf("b", "10.0.2.0/24")],
        }
    }
}

#[async_trait]
impl NetworkSource for StaticSource {
    async fn list_networks(&self, _ctx: &Context) -> Result<Vec<NetworkRecord>> {
        Ok(self.networks.clone())
    }

    async fn list_leaf_subnets(&self, _ctx: &Context) -> Result<Vec<LeafSubnetRecord>> {
        Ok(self.leaves.clone())
    }

    async fn get_utilization(&self, _ctx: &Context, _leaf_id: &str) -> Result<f64> {
        Ok(42.0)
    }

    async fn validate_credentials(&self, _ctx: &Context) -> Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_sync_into_inventory_file_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("inventory.json");
    let ctx = Context::background();

    {
        let repository = Arc::new(JsonFileRepository::open(&path).await.unwrap());
        let reconciler = Reconciler::new(
            ProviderType::AZURE,
            Arc::new(StaticSource::new("first")),
            repository,
        );
        let report = reconciler.sync(&ctx).await.unwrap();
        assert!(report.is_clean());
        assert_eq!(report.vpcs_created, 1);
        assert_eq!(report.subnets_created, 2);
    }

    // a fresh process sees the same inventory
    let repository = Arc::new(JsonFileRepository::open(&path).await.unwrap());
    let all = repository.list_subnets(&ctx, &SubnetFilter::default()).await.unwrap();
    assert_eq!(all.total, 3);

    let vnet = repository.get_subnet_by_cidr(&ctx, "10.0.0.0/16").await.unwrap();
    assert!(vnet.is_cloud_resource(&ProviderType::AZURE, ResourceType::Vpc));
    for cidr in ["10.0.1.0/24", "10.0.2.0/24"] {
        let leaf = repository.get_subnet_by_cidr(&ctx, cidr).await.unwrap();
        assert_eq!(leaf.parent_id, Some(vnet.id));
        assert_eq!(leaf.utilization.as_ref().map(|u| u.utilization_percent), Some(42.0));
    }

    let reconciler = Reconciler::new(
        ProviderType::AZURE,
        Arc::new(StaticSource::new("second")),
        repository.clone(),
    );
    let report = reconciler.sync(&ctx).await.unwrap();
    assert_eq!(report.vpcs_created, 0);
    assert_eq!(report.vpcs_skipped, 1);
    assert_eq!(report.subnets_created, 0);
    assert_eq!(report.subnets_updated, 2);

    let all = repository.list_subnets(&ctx, &SubnetFilter::default()).await.unwrap();
    assert_eq!(all.total, 3);
    // updates keep the name the record was created with
    let leaf = repository.get_subnet_by_cidr(&ctx, "10.0.1.0/24").await.unwrap();
    assert_eq!(leaf.name, "first-a");

    let other = repository
        .list_subnets(&ctx, &SubnetFilter::provider(ProviderType::AWS))
        .await
        .unwrap();
    assert_eq!(other.total, 0);
}
