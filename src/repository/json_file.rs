//! Inventory kept in a JSON file.
//!
//! The whole inventory is loaded when the file is opened and written back
//! after every create or update. A change the file write rejects is undone
//! in memory as well.

use super::{MemorySubnetRepository, RepoResult, SubnetRepository};
use crate::context::Context;
use crate::models::{Subnet, SubnetFilter, SubnetList};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use uuid::Uuid;

/// On-disk layout.
#[derive(Serialize, Deserialize, Debug, Default)]
struct InventoryFile {
    subnets: Vec<Subnet>,
}

pub struct JsonFileRepository {
    path: PathBuf,
    inner: MemorySubnetRepository,
    // held across a change and its write, so a rollback never undoes a later change
    write_lock: Mutex<()>,
}

impl JsonFileRepository {
    /// Open `path`, starting with an empty inventory when the file does not
    /// exist yet.
    pub async fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        let path = path.as_ref().to_path_buf();

        let inventory = match tokio::fs::read_to_string(&path).await {
            Ok(json) => {
                log::info!("Reading inventory file: {}", path.display());
                let mut de = serde_json::Deserializer::from_str(&json);
                serde_path_to_error::deserialize::<_, InventoryFile>(&mut de).map_err(|e| {
                    log::error!(
                        "Error parsing inventory {} at path={}",
                        path.display(),
                        e.path()
                    );
                    e.into_inner()
                })?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!(
                    "Inventory file not found, starting empty: {}",
                    path.display()
                );
                InventoryFile::default()
            }
            Err(e) => return Err(e.into()),
        };

        log::info!("Loaded {} subnet(s) from inventory", inventory.subnets.len());
        Ok(JsonFileRepository {
            path,
            inner: MemorySubnetRepository::from_subnets(inventory.subnets),
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All records sorted by CIDR.
    pub async fn snapshot(&self) -> Vec<Subnet> {
        self.inner.snapshot().await
    }

    /// Caller holds `write_lock`.
    async fn persist(&self) -> RepoResult<()> {
        let inventory = InventoryFile {
            subnets: self.inner.snapshot().await,
        };
        let json = serde_json::to_string_pretty(&inventory)?;

        // readers never see a partial file
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        log::debug!(
            "Wrote {} subnet(s) to {}",
            inventory.subnets.len(),
            self.path.display()
        );
        Ok(())
    }
}

#[async_trait]
impl SubnetRepository for JsonFileRepository {
    async fn get_subnet_by_cidr(&self, ctx: &Context, cidr: &str) -> RepoResult<Subnet> {
        self.inner.get_subnet_by_cidr(ctx, cidr).await
    }

    async fn create_subnet(&self, ctx: &Context, subnet: &mut Subnet) -> RepoResult<()> {
        let _guard = self.write_lock.lock().await;
        self.inner.create_subnet(ctx, subnet).await?;
        if let Err(e) = self.persist().await {
            log::warn!("Dropping subnet {} ({}): write failed: {e}", subnet.id, subnet.cidr);
            self.inner.restore(subnet.id, None).await;
            return Err(e);
        }
        Ok(())
    }

    async fn update_subnet(&self, ctx: &Context, id: Uuid, subnet: &Subnet) -> RepoResult<()> {
        let _guard = self.write_lock.lock().await;
        let previous = self.inner.get(id).await;
        self.inner.update_subnet(ctx, id, subnet).await?;
        if let Err(e) = self.persist().await {
            log::warn!("Reverting subnet {id} ({}): write failed: {e}", subnet.cidr);
            self.inner.restore(id, previous).await;
            return Err(e);
        }
        Ok(())
    }

    async fn list_subnets(&self, ctx: &Context, filter: &SubnetFilter) -> RepoResult<SubnetList> {
        self.inner.list_subnets(ctx, filter).await
    }
}
