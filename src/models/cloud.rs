//! Records exchanged between the provider registry and the providers.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

/// Identifier of a cloud backend, used as the registry key.
///
/// The built-in clouds have constants; a new provider simply picks a new
/// string with [`ProviderType::new`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ProviderType(Cow<'static, str>);

impl ProviderType {
    pub const AWS: ProviderType = ProviderType(Cow::Borrowed("aws"));
    pub const AZURE: ProviderType = ProviderType(Cow::Borrowed("azure"));
    pub const GCP: ProviderType = ProviderType(Cow::Borrowed("gcp"));
    pub const SCALEWAY: ProviderType = ProviderType(Cow::Borrowed("scaleway"));
    pub const OVH: ProviderType = ProviderType(Cow::Borrowed("ovh"));

    pub fn new(name: impl Into<String>) -> Self {
        ProviderType(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProviderType {
    fn from(s: &str) -> Self {
        ProviderType::new(s)
    }
}

/// Credentials for one provider call.
///
/// Union of what any provider needs; each provider only checks the fields it
/// uses. Never persisted.
#[derive(Deserialize, Clone, Default)]
pub struct Credentials {
    pub provider_type: ProviderType,
    pub access_key: String,
    pub secret_key: String,
    pub token: String,
    pub region: String,
    #[serde(default)]
    pub extra: HashMap<String, String>,
}

impl Default for ProviderType {
    fn default() -> Self {
        ProviderType(Cow::Borrowed(""))
    }
}

impl Credentials {
    pub fn new(provider_type: ProviderType) -> Self {
        Credentials {
            provider_type,
            ..Default::default()
        }
    }

    /// Builder for key/secret based providers.
    pub fn with_keys(mut self, access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        self.access_key = access_key.into();
        self.secret_key = secret_key.into();
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = token.into();
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

// Secrets stay out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn mask(s: &str) -> &'static str {
            if s.is_empty() {
                ""
            } else {
                "***"
            }
        }
        f.debug_struct("Credentials")
            .field("provider_type", &self.provider_type)
            .field("access_key", &mask(&self.access_key))
            .field("secret_key", &mask(&self.secret_key))
            .field("token", &mask(&self.token))
            .field("region", &self.region)
            .field("extra", &self.extra.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A subnet as a provider reports it. Not the inventory representation.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct CloudSubnet {
    pub cidr: String,
    pub name: String,
    pub region: String,
    #[serde(rename = "accountID")]
    pub account_id: String,
    #[serde(rename = "vpcID")]
    pub vpc_id: String,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}
