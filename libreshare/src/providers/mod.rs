//! Provider abstraction and registry
//!
//! This module provides a unified trait for talking to third-party social
//! networks. Each provider implementation handles its own sign-in URL
//! generation, credential exchange, and sub-account discovery; the rest of
//! the crate depends only on the [`ProviderClient`] trait, never on concrete
//! variants.
//!
//! Clients are produced by a [`ProviderRegistry`], a static map from provider
//! name to constructor. Unknown names are an explicit error branch
//! ([`ProviderError::Unknown`](crate::error::ProviderError::Unknown)), not a
//! lookup convention.
//!
//! # Examples
//!
//! ```
//! use libreshare::providers::{mock::MockProvider, ProviderClient, ProviderRegistry, SignInContext};
//!
//! let mut registry = ProviderRegistry::new();
//! let mock = MockProvider::success("mastodon", "12345");
//! registry.register("mastodon", move || Box::new(mock.clone()));
//!
//! let client = registry.build("mastodon").unwrap();
//! let url = client.sign_in_url(&SignInContext::new("https://example.org/callback"));
//! assert!(!url.is_empty());
//!
//! assert!(registry.build("myspace").is_err());
//! ```

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::{ProviderError, Result};
use crate::types::{CredentialBlob, ServiceIdentity, SubAccount};

// Mock provider is available for all builds (not just tests) to support
// integration tests and offline operation of the admin tooling
pub mod mock;

/// Context passed to sign-in URL generation.
///
/// Carries the redirect target for the OAuth-style dance plus any
/// provider-specific extras the caller wants interpolated.
#[derive(Debug, Clone, Default)]
pub struct SignInContext {
    pub redirect_uri: String,
    pub params: HashMap<String, String>,
}

impl SignInContext {
    pub fn new(redirect_uri: impl Into<String>) -> Self {
        Self {
            redirect_uri: redirect_uri.into(),
            params: HashMap::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

/// Provider trait for social network integrations
///
/// Implementations encapsulate everything network-specific. Credential
/// exchange and sub-account listing may perform blocking network I/O; the
/// caller's transport layer owns timeouts and cancellation, no retries
/// happen here.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Lowercase identifier for the provider (e.g., "mastodon", "bluesky")
    fn name(&self) -> &str;

    /// Produce the URL an operator visits to start the sign-in flow.
    ///
    /// Pure query; never touches the network or persisted state.
    fn sign_in_url(&self, ctx: &SignInContext) -> String;

    /// Exchange raw credentials (e.g., an OAuth code or token) for the
    /// identity of the connected account.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Exchange` when the remote side rejects the
    /// credentials, or `ProviderError::Network` when it is unreachable.
    /// Both are expected outcomes for callers, not fatal failures.
    async fn exchange_credentials(&self, raw: &CredentialBlob) -> Result<ServiceIdentity>;

    /// List the postable sub-accounts (pages, channels, handles) the
    /// authenticated connection exposes.
    async fn list_sub_accounts(&self) -> Result<Vec<SubAccount>>;
}

type ClientBuilder = Box<dyn Fn() -> Box<dyn ProviderClient> + Send + Sync>;

/// Static registry mapping provider name to client constructor.
///
/// One registration per supported network; `build` produces a fresh client
/// instance per call, so clients never share mutable state.
#[derive(Default)]
pub struct ProviderRegistry {
    builders: HashMap<String, ClientBuilder>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor for a provider name.
    ///
    /// Registering the same name twice replaces the earlier constructor.
    pub fn register<F>(&mut self, name: impl Into<String>, builder: F)
    where
        F: Fn() -> Box<dyn ProviderClient> + Send + Sync + 'static,
    {
        self.builders.insert(name.into(), Box::new(builder));
    }

    /// Build a fresh client for the given provider name.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Unknown` when no constructor is registered
    /// under that name. No side effects either way.
    pub fn build(&self, name: &str) -> Result<Box<dyn ProviderClient>> {
        match self.builders.get(name) {
            Some(builder) => Ok(builder()),
            None => Err(ProviderError::Unknown(name.to_string()).into()),
        }
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.builders.contains_key(name)
    }

    /// Names of all registered providers, sorted for stable output
    pub fn available(&self) -> Vec<String> {
        let mut names: Vec<String> = self.builders.keys().cloned().collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.available())
            .finish()
    }
}
