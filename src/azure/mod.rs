//! Azure CLI and Resource Graph interaction.
//!
//! - [`cli`] - `az` command execution
//! - [`graph`] - paginated Resource Graph queries
//! - [`source`] - [`AzureCliSource`], the reconciler's view of Azure

pub mod cli;
pub mod graph;
mod source;

pub use source::AzureCliSource;
