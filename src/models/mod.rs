//! Domain models for cloud subnet reconciliation.
//!
//! - [`Ipv4`] - IPv4 address with CIDR notation support
//! - [`ProviderType`], [`Credentials`], [`CloudSubnet`] - provider exchange records
//! - [`Subnet`] - local inventory record and its cloud metadata

mod cloud;
mod ipv4;
mod subnet;

// Re-export public types
pub use cloud::{CloudSubnet, Credentials, ProviderType};
pub use ipv4::{
    broadcast_addr, cut_addr, get_cidr_mask, usable_hosts, CidrDetails, CidrError, Ipv4,
    MAX_LENGTH,
};
pub use subnet::{
    CloudInfo, LocationType, ResourceType, Subnet, SubnetFilter, SubnetList, Utilization,
};
