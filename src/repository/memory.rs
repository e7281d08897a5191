use super::{check_context, prepare_new, same_cidr, RepoResult, SubnetRepository};
use crate::context::Context;
use crate::error::RepositoryError;
use crate::models::{Subnet, SubnetFilter, SubnetList};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Inventory held in memory. Used by tests and by callers embedding the
/// reconciler without a store of their own.
#[derive(Default)]
pub struct MemorySubnetRepository {
    subnets: RwLock<HashMap<Uuid, Subnet>>,
}

impl MemorySubnetRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_subnets(subnets: Vec<Subnet>) -> Self {
        MemorySubnetRepository {
            subnets: RwLock::new(subnets.into_iter().map(|s| (s.id, s)).collect()),
        }
    }

    pub async fn len(&self) -> usize {
        self.subnets.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.subnets.read().await.is_empty()
    }

    pub async fn get(&self, id: Uuid) -> Option<Subnet> {
        self.subnets.read().await.get(&id).cloned()
    }

    /// Put back `previous` under `id`, or drop `id` when there was none.
    pub(crate) async fn restore(&self, id: Uuid, previous: Option<Subnet>) {
        let mut subnets = self.subnets.write().await;
        match previous {
            Some(s) => {
                subnets.insert(id, s);
            }
            None => {
                subnets.remove(&id);
            }
        }
    }

    /// All records, sorted by CIDR.
    pub async fn snapshot(&self) -> Vec<Subnet> {
        let mut all: Vec<Subnet> = self.subnets.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.cidr.cmp(&b.cidr));
        all
    }
}

#[async_trait]
impl SubnetRepository for MemorySubnetRepository {
    async fn get_subnet_by_cidr(&self, ctx: &Context, cidr: &str) -> RepoResult<Subnet> {
        check_context(ctx)?;
        self.subnets
            .read()
            .await
            .values()
            .find(|s| same_cidr(&s.cidr, cidr))
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(cidr.to_string()))
    }

    async fn create_subnet(&self, ctx: &Context, subnet: &mut Subnet) -> RepoResult<()> {
        check_context(ctx)?;
        prepare_new(subnet);
        let mut subnets = self.subnets.write().await;
        if subnets.contains_key(&subnet.id) {
            return Err(RepositoryError::Conflict(subnet.id));
        }
        subnets.insert(subnet.id, subnet.clone());
        Ok(())
    }

    async fn update_subnet(&self, ctx: &Context, id: Uuid, subnet: &Subnet) -> RepoResult<()> {
        check_context(ctx)?;
        let mut subnets = self.subnets.write().await;
        match subnets.get_mut(&id) {
            Some(existing) => {
                *existing = Subnet {
                    id,
                    ..subnet.clone()
                };
                Ok(())
            }
            None => Err(RepositoryError::NotFound(id.to_string())),
        }
    }

    async fn list_subnets(&self, ctx: &Context, filter: &SubnetFilter) -> RepoResult<SubnetList> {
        check_context(ctx)?;
        let subnets: Vec<Subnet> = self
            .subnets
            .read()
            .await
            .values()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect();
        Ok(SubnetList {
            total: subnets.len(),
            subnets,
        })
    }
}
