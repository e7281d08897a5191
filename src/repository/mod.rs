//! Persistence boundary for the local subnet inventory.
//!
//! - [`memory`] - in-process store
//! - [`json_file`] - JSON file on disk, rewritten after each change

mod json_file;
mod memory;

pub use json_file::JsonFileRepository;
pub use memory::MemorySubnetRepository;

use crate::context::Context;
use crate::error::RepositoryError;
use crate::models::{Subnet, SubnetFilter, SubnetList};
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

pub type RepoResult<T> = std::result::Result<T, RepositoryError>;

/// Inventory store consumed by the reconciler. Each call stands alone; no
/// multi-record transaction is assumed. A call made under a cancelled or
/// expired context fails with `Interrupted` before touching the store.
#[async_trait]
pub trait SubnetRepository: Send + Sync {
    /// The record whose CIDR equals `cidr`, or `NotFound`.
    async fn get_subnet_by_cidr(&self, ctx: &Context, cidr: &str) -> RepoResult<Subnet>;

    /// Store a new record. A nil id is replaced by a fresh one, written back
    /// into `subnet`.
    async fn create_subnet(&self, ctx: &Context, subnet: &mut Subnet) -> RepoResult<()>;

    /// Replace the record stored under `id`.
    async fn update_subnet(&self, ctx: &Context, id: Uuid, subnet: &Subnet) -> RepoResult<()>;

    async fn list_subnets(&self, ctx: &Context, filter: &SubnetFilter) -> RepoResult<SubnetList>;
}

/// Assign id and timestamps for a record about to be created.
pub(crate) fn prepare_new(subnet: &mut Subnet) {
    if subnet.id.is_nil() {
        subnet.id = Uuid::new_v4();
    }
    let now = Utc::now();
    if subnet.created_at > now {
        subnet.created_at = now;
    }
    if subnet.updated_at < subnet.created_at {
        subnet.updated_at = subnet.created_at;
    }
}

/// Fails with `Interrupted` once `ctx` is cancelled or past its deadline.
pub(crate) fn check_context(ctx: &Context) -> RepoResult<()> {
    match ctx.err() {
        Some(e) => Err(RepositoryError::Interrupted(e)),
        None => Ok(()),
    }
}

/// CIDR comparison used for lookups; whitespace around the block is ignored.
pub(crate) fn same_cidr(a: &str, b: &str) -> bool {
    a.trim() == b.trim()
}
