//! Cloud provider abstraction.
//!
//! Every cloud backend implements [`Provider`]. The registry only ever sees
//! `Arc<dyn Provider>`, so adding a cloud never touches the registry or the
//! reconciler.
//!
//! - [`aws`] - Amazon Web Services (access key / secret key)
//! - [`azure`] - Microsoft Azure (client id / client secret)
//! - [`gcp`] - Google Cloud (service account token)
//! - [`scaleway`] - Scaleway (access key / secret key)
//! - [`ovh`] - OVHcloud (application key / secret + consumer token)

pub mod aws;
pub mod azure;
pub mod gcp;
pub mod ovh;
pub mod scaleway;

use crate::context::Context;
use crate::error::{ProviderError, Result};
use crate::models::{CloudSubnet, Credentials, ProviderType};
use async_trait::async_trait;
use std::sync::Arc;

pub use aws::AwsProvider;
pub use azure::AzureProvider;
pub use gcp::GcpProvider;
pub use ovh::OvhProvider;
pub use scaleway::ScalewayProvider;

/// Subnet discovery for one external cloud.
///
/// Implementations are immutable once registered and may be shared across
/// concurrent fetches.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Human readable name (e.g., "Amazon Web Services")
    fn name(&self) -> &str;

    /// Registry key; unique across all registered providers.
    fn provider_type(&self) -> ProviderType;

    /// Every subnet visible to `creds`, in one shot.
    ///
    /// Must call [`Provider::validate_credentials`] before any remote call and
    /// run remote work under `ctx`.
    async fn fetch_subnets(&self, ctx: &Context, creds: &Credentials) -> Result<Vec<CloudSubnet>>;

    /// Static list of regions this provider knows about. No I/O.
    fn regions(&self) -> Vec<String>;

    /// Local shape check of `creds`. No I/O.
    fn validate_credentials(&self, creds: &Credentials) -> Result<()>;
}

/// Which credential fields a provider insists on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CredentialKind {
    KeyPair,
    Token,
    KeyPairAndToken,
}

/// Shared credential check used by the built-in providers.
pub(crate) fn check_credentials(
    expected: &ProviderType,
    kind: CredentialKind,
    creds: &Credentials,
) -> Result<()> {
    if &creds.provider_type != expected {
        return Err(ProviderError::TypeMismatch {
            expected: expected.clone(),
            got: creds.provider_type.clone(),
        });
    }

    let mut missing = Vec::new();
    if matches!(kind, CredentialKind::KeyPair | CredentialKind::KeyPairAndToken) {
        if creds.access_key.trim().is_empty() {
            missing.push("access_key");
        }
        if creds.secret_key.trim().is_empty() {
            missing.push("secret_key");
        }
    }
    if matches!(kind, CredentialKind::Token | CredentialKind::KeyPairAndToken)
        && creds.token.trim().is_empty()
    {
        missing.push("token");
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ProviderError::InvalidCredentials(format!(
            "{expected}: missing {}",
            missing.join(", ")
        )))
    }
}

/// Body shared by the providers whose native listing is not wired yet:
/// validate, honour the context, then report the provider as unavailable.
pub(crate) async fn unimplemented_fetch(
    provider: &dyn Provider,
    ctx: &Context,
    creds: &Credentials,
) -> Result<Vec<CloudSubnet>> {
    provider.validate_credentials(creds)?;
    let provider_type = provider.provider_type();
    log::debug!("fetch_subnets({provider_type}) has no native listing");
    ctx.run(async {
        Err(ProviderError::NotImplemented(format!(
            "{} subnet listing",
            provider.name()
        )))
    })
    .await
    .map_err(|e| ProviderError::unavailable(provider_type, e))
}

/// The five built-in providers, ready to register.
pub fn default_providers() -> Vec<Arc<dyn Provider>> {
    vec![
        Arc::new(AwsProvider::new()),
        Arc::new(AzureProvider::new()),
        Arc::new(GcpProvider::new()),
        Arc::new(ScalewayProvider::new()),
        Arc::new(OvhProvider::new()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete(provider_type: ProviderType) -> Credentials {
        Credentials::new(provider_type)
            .with_keys("access", "secret")
            .with_token("token")
    }

    #[test]
    fn test_default_provider_types_are_unique() {
        let providers = default_providers();
        let mut types: Vec<_> = providers.iter().map(|p| p.provider_type()).collect();
        types.sort();
        types.dedup();
        assert_eq!(types.len(), 5);
    }

    #[test]
    fn test_every_provider_accepts_complete_credentials() {
        for p in default_providers() {
            let creds = complete(p.provider_type());
            assert!(
                p.validate_credentials(&creds).is_ok(),
                "{} rejected complete credentials",
                p.name()
            );
        }
    }

    #[test]
    fn test_every_provider_rejects_empty_credentials() {
        for p in default_providers() {
            let creds = Credentials::new(p.provider_type());
            let err = p.validate_credentials(&creds).unwrap_err();
            assert!(
                matches!(err, ProviderError::InvalidCredentials(_)),
                "{}: {err}",
                p.name()
            );
        }
    }

    #[test]
    fn test_every_provider_rejects_foreign_credentials() {
        for p in default_providers() {
            let creds = complete(ProviderType::new("someone-else"));
            assert!(matches!(
                p.validate_credentials(&creds),
                Err(ProviderError::TypeMismatch { .. })
            ));
        }
    }

    #[test]
    fn test_every_provider_lists_regions() {
        for p in default_providers() {
            assert!(!p.regions().is_empty(), "{} has no regions", p.name());
        }
    }

    #[tokio::test]
    async fn test_stub_fetch_reports_unavailable() {
        let ctx = Context::background();
        for p in default_providers() {
            let err = p
                .fetch_subnets(&ctx, &complete(p.provider_type()))
                .await
                .unwrap_err();
            assert!(err.is_unavailable(), "{}: {err}", p.name());
            assert!(matches!(err.cause(), Some(ProviderError::NotImplemented(_))));
        }
    }

    #[tokio::test]
    async fn test_stub_fetch_validates_before_anything_else() {
        let ctx = Context::background();
        for p in default_providers() {
            let err = p
                .fetch_subnets(&ctx, &Credentials::new(p.provider_type()))
                .await
                .unwrap_err();
            assert!(matches!(err, ProviderError::InvalidCredentials(_)));
        }
    }

    #[tokio::test]
    async fn test_stub_fetch_respects_cancelled_context() {
        let (ctx, handle) = Context::with_cancel();
        handle.cancel();
        let p = AwsProvider::new();
        let err = p
            .fetch_subnets(&ctx, &complete(ProviderType::AWS))
            .await
            .unwrap_err();
        assert!(matches!(err.cause(), Some(ProviderError::Cancelled)));
    }

    #[test]
    fn test_check_credentials_lists_missing_fields() {
        let creds = Credentials::new(ProviderType::OVH).with_keys("app", "");
        let err = check_credentials(
            &ProviderType::OVH,
            CredentialKind::KeyPairAndToken,
            &creds,
        )
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("secret_key"));
        assert!(msg.contains("token"));
        assert!(!msg.contains("access_key"));
    }

    #[test]
    fn test_key_pair_providers_reject_half_a_key_pair() {
        let providers: Vec<Box<dyn Provider>> = vec![
            Box::new(AwsProvider::new()),
            Box::new(AzureProvider::new()),
            Box::new(ScalewayProvider::new()),
        ];
        for p in providers {
            let pt = p.provider_type();
            let cases = [
                (Credentials::new(pt.clone()).with_keys("AKIA", ""), "secret_key"),
                (Credentials::new(pt.clone()).with_keys("", "secret"), "access_key"),
                (Credentials::new(pt.clone()).with_keys("  ", "secret"), "access_key"),
                (Credentials::new(pt.clone()).with_keys("AKIA", "\t"), "secret_key"),
                (Credentials::new(pt.clone()).with_token("token"), "access_key"),
            ];
            for (creds, field) in cases {
                match p.validate_credentials(&creds) {
                    Err(ProviderError::InvalidCredentials(msg)) => {
                        assert!(msg.contains(field), "{}: {msg}", p.name())
                    }
                    other => panic!("{}: expected missing {field}, got {other:?}", p.name()),
                }
            }
        }
    }
}
