//! Provider registry and concurrent multi-provider fetch.

use crate::context::Context;
use crate::error::{ProviderError, Result};
use crate::models::{CloudSubnet, Credentials, ProviderType};
use crate::providers::{default_providers, Provider};
use colored::Colorize;
use futures::FutureExt;
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::task::JoinSet;

/// Successful fan-out results keyed by provider.
pub type FetchResults = HashMap<ProviderType, Vec<CloudSubnet>>;
/// Fan-out failures keyed by provider.
pub type FetchErrors = HashMap<ProviderType, ProviderError>;

/// Catalog of active providers keyed by [`ProviderType`].
///
/// One instance is built explicitly and shared by reference (or `Arc`) with
/// whatever needs it. The map sits behind a single reader/writer lock that is
/// never held across an await.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: RwLock<HashMap<ProviderType, Arc<dyn Provider>>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-loaded with the five built-in providers.
    pub fn with_default_providers() -> Self {
        let registry = Self::new();
        for provider in default_providers() {
            // built-in types are distinct, so this cannot collide
            if let Err(e) = registry.register_arc(provider) {
                log::error!("Failed to register default provider: {e}");
            }
        }
        registry
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<ProviderType, Arc<dyn Provider>>> {
        // Provider instances are immutable, a poisoned map is still consistent
        self.providers.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<ProviderType, Arc<dyn Provider>>> {
        self.providers.write().unwrap_or_else(|p| p.into_inner())
    }

    pub fn register<P: Provider + 'static>(&self, provider: P) -> Result<()> {
        self.register_arc(Arc::new(provider))
    }

    /// Add a shared provider. Fails with `NilProvider` when the provider has
    /// no type key and `DuplicateProvider` when the key is taken; the existing
    /// registration is left untouched in both cases.
    pub fn register_arc(&self, provider: Arc<dyn Provider>) -> Result<()> {
        let provider_type = provider.provider_type();
        if provider_type.is_empty() {
            return Err(ProviderError::NilProvider);
        }

        let mut providers = self.write();
        if providers.contains_key(&provider_type) {
            return Err(ProviderError::DuplicateProvider(provider_type));
        }
        log::info!(
            "Registered provider {} ({})",
            provider_type.as_str().cyan(),
            provider.name()
        );
        providers.insert(provider_type, provider);
        Ok(())
    }

    pub fn unregister(&self, provider_type: &ProviderType) -> Result<()> {
        match self.write().remove(provider_type) {
            Some(_) => {
                log::info!("Unregistered provider {}", provider_type.as_str().cyan());
                Ok(())
            }
            None => Err(ProviderError::ProviderNotFound(provider_type.clone())),
        }
    }

    pub fn get_provider(&self, provider_type: &ProviderType) -> Result<Arc<dyn Provider>> {
        self.read()
            .get(provider_type)
            .cloned()
            .ok_or_else(|| ProviderError::ProviderNotFound(provider_type.clone()))
    }

    pub fn is_provider_registered(&self, provider_type: &ProviderType) -> bool {
        self.read().contains_key(provider_type)
    }

    /// Registered provider types, in no particular order.
    pub fn list_providers(&self) -> Vec<ProviderType> {
        self.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Fetch from one provider. A missing provider is reported as
    /// `ProviderNotFound`; every provider failure comes back as
    /// `ProviderUnavailable` carrying the provider type and original cause.
    pub async fn fetch_subnets_from_provider(
        &self,
        ctx: &Context,
        provider_type: &ProviderType,
        creds: &Credentials,
    ) -> Result<Vec<CloudSubnet>> {
        let provider = self.get_provider(provider_type)?;
        fetch_with(provider, ctx, creds).await
    }

    /// Fetch from every registered provider that has credentials in
    /// `credentials`, all at once.
    ///
    /// Providers without credentials are skipped. Each fetched provider ends
    /// up in exactly one of the two returned maps. One provider failing,
    /// hanging until the context ends, or panicking leaves the others'
    /// results intact.
    pub async fn fetch_subnets_from_all_providers(
        &self,
        ctx: &Context,
        credentials: &HashMap<ProviderType, Credentials>,
    ) -> (FetchResults, FetchErrors) {
        // snapshot under the read lock, then release it before any fetch
        let targets: Vec<(ProviderType, Arc<dyn Provider>, Credentials)> = {
            let providers = self.read();
            providers
                .iter()
                .filter_map(|(t, p)| {
                    credentials
                        .get(t)
                        .map(|c| (t.clone(), Arc::clone(p), c.clone()))
                })
                .collect()
        };

        log::info!(
            "Fetching subnets from {} of {} provider(s)",
            targets.len(),
            self.len()
        );

        // tasks live in the set; dropping the fan-out aborts whatever is left
        let mut pending: HashSet<ProviderType> = HashSet::new();
        let mut tasks = JoinSet::new();
        for (provider_type, provider, creds) in targets {
            pending.insert(provider_type.clone());
            let ctx = ctx.clone();
            tasks.spawn(async move {
                let outcome = AssertUnwindSafe(fetch_with(provider, &ctx, &creds))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|panic| {
                        Err(ProviderError::unavailable(
                            provider_type.clone(),
                            ProviderError::Task(panic_message(&*panic)),
                        ))
                    });
                (provider_type, outcome)
            });
        }

        let mut results = FetchResults::new();
        let mut errors = FetchErrors::new();
        while let Some(joined) = tasks.join_next().await {
            let (provider_type, outcome) = match joined {
                Ok(pair) => pair,
                Err(join_err) => {
                    log::error!("Fetch task ended abnormally: {join_err}");
                    continue;
                }
            };
            pending.remove(&provider_type);
            match outcome {
                Ok(subnets) => {
                    log::info!(
                        "{} returned {} subnet(s)",
                        provider_type.as_str().cyan(),
                        subnets.len()
                    );
                    results.insert(provider_type, subnets);
                }
                Err(e) => {
                    log::warn!(
                        "{} {}: {e}",
                        provider_type.as_str().cyan(),
                        "failed".on_red()
                    );
                    errors.insert(provider_type, e);
                }
            }
        }
        // a task that never reported back still gets an entry
        for provider_type in pending {
            let e = ProviderError::Task("fetch task did not complete".to_string());
            errors.insert(provider_type.clone(), ProviderError::unavailable(provider_type, e));
        }
        (results, errors)
    }
}

async fn fetch_with(
    provider: Arc<dyn Provider>,
    ctx: &Context,
    creds: &Credentials,
) -> Result<Vec<CloudSubnet>> {
    let provider_type = provider.provider_type();
    provider
        .fetch_subnets(ctx, creds)
        .await
        .map_err(|e| ProviderError::unavailable(provider_type, e))
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|m| m.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "provider panicked".to_string())
}
