//! Cloud subnet discovery and reconciliation into a local IPAM inventory.
//!
//! - [`providers`] / [`registry`] - pluggable clouds and concurrent fan-out
//! - [`sync`] - reconciler from a cloud's native listing into the inventory
//! - [`repository`] - inventory storage boundary
//! - [`azure`] - Azure CLI backed network source

pub mod azure;
pub mod config;
pub mod context;
pub mod error;
pub mod models;
pub mod output;
pub mod providers;
pub mod registry;
pub mod repository;
pub mod sync;

pub use context::{CancelHandle, Context};
pub use error::{ProviderError, RepositoryError, SyncError};
pub use models::{CloudSubnet, Credentials, ProviderType, Subnet};
pub use providers::Provider;
pub use registry::{FetchErrors, FetchResults, ProviderRegistry};
pub use repository::SubnetRepository;
pub use sync::{Reconciler, SyncReport, UtilizationReport};
