//! Mock provider implementation for testing
//!
//! A configurable provider client that can simulate successful and failed
//! credential exchanges without touching the network. Clones share call
//! counters, so a test can keep one handle while the registry constructs
//! clients from another.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

use crate::error::{ProviderError, Result};
use crate::providers::{ProviderClient, SignInContext};
use crate::types::{CredentialBlob, ServiceIdentity, SubAccount};

/// Which outcome the mock should produce on credential exchange
#[derive(Debug, Clone)]
enum ExchangeBehavior {
    Succeed(ServiceIdentity),
    Reject(String),
    Unreachable(String),
}

/// Mock provider for testing
#[derive(Clone)]
pub struct MockProvider {
    name: String,
    behavior: ExchangeBehavior,
    sub_accounts: Vec<SubAccount>,
    /// Delay before completing the exchange (simulates network latency)
    delay: Duration,
    exchange_calls: Arc<Mutex<usize>>,
    /// Raw blobs passed to exchange, for verification
    exchanged_blobs: Arc<Mutex<Vec<String>>>,
}

impl MockProvider {
    /// Mock whose exchange succeeds with a canned identity
    pub fn success(name: &str, external_id: &str) -> Self {
        Self::with_identity(
            name,
            ServiceIdentity {
                id: external_id.to_string(),
                display_name: format!("{} user", name),
                credential_blob: CredentialBlob::new(format!("{}-token", name)),
            },
        )
    }

    /// Mock whose exchange succeeds with the given identity
    pub fn with_identity(name: &str, identity: ServiceIdentity) -> Self {
        Self {
            name: name.to_string(),
            behavior: ExchangeBehavior::Succeed(identity),
            sub_accounts: Vec::new(),
            delay: Duration::ZERO,
            exchange_calls: Arc::new(Mutex::new(0)),
            exchanged_blobs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Mock whose exchange is rejected by the remote side
    pub fn exchange_failure(name: &str, reason: &str) -> Self {
        Self {
            name: name.to_string(),
            behavior: ExchangeBehavior::Reject(reason.to_string()),
            sub_accounts: Vec::new(),
            delay: Duration::ZERO,
            exchange_calls: Arc::new(Mutex::new(0)),
            exchanged_blobs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Mock whose remote endpoint is unreachable
    pub fn unreachable(name: &str, reason: &str) -> Self {
        Self {
            name: name.to_string(),
            behavior: ExchangeBehavior::Unreachable(reason.to_string()),
            sub_accounts: Vec::new(),
            delay: Duration::ZERO,
            exchange_calls: Arc::new(Mutex::new(0)),
            exchanged_blobs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Set the sub-accounts the mock exposes
    pub fn with_sub_accounts(mut self, sub_accounts: Vec<SubAccount>) -> Self {
        self.sub_accounts = sub_accounts;
        self
    }

    /// Add a delay before the exchange completes
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of times exchange_credentials was called (shared across clones)
    pub fn exchange_call_count(&self) -> usize {
        *self.exchange_calls.lock().unwrap()
    }

    /// Raw blobs that were passed to exchange_credentials
    pub fn exchanged_blobs(&self) -> Vec<String> {
        self.exchanged_blobs.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProviderClient for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn sign_in_url(&self, ctx: &SignInContext) -> String {
        format!(
            "https://auth.example/{}/start?redirect={}",
            self.name, ctx.redirect_uri
        )
    }

    async fn exchange_credentials(&self, raw: &CredentialBlob) -> Result<ServiceIdentity> {
        *self.exchange_calls.lock().unwrap() += 1;
        self.exchanged_blobs
            .lock()
            .unwrap()
            .push(raw.as_str().to_string());

        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }

        match &self.behavior {
            ExchangeBehavior::Succeed(identity) => Ok(identity.clone()),
            ExchangeBehavior::Reject(reason) => {
                Err(ProviderError::Exchange(reason.clone()).into())
            }
            ExchangeBehavior::Unreachable(reason) => {
                Err(ProviderError::Network(reason.clone()).into())
            }
        }
    }

    async fn list_sub_accounts(&self) -> Result<Vec<SubAccount>> {
        Ok(self.sub_accounts.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReshareError;

    #[tokio::test]
    async fn test_mock_success() {
        let mock = MockProvider::success("mastodon", "12345");

        assert_eq!(mock.name(), "mastodon");

        let identity = mock
            .exchange_credentials(&CredentialBlob::new("code-1"))
            .await
            .unwrap();
        assert_eq!(identity.id, "12345");
        assert_eq!(mock.exchange_call_count(), 1);
        assert_eq!(mock.exchanged_blobs(), vec!["code-1".to_string()]);
    }

    #[tokio::test]
    async fn test_mock_exchange_failure() {
        let mock = MockProvider::exchange_failure("mastodon", "token expired");

        let result = mock.exchange_credentials(&CredentialBlob::new("old")).await;
        match result {
            Err(ReshareError::Provider(ProviderError::Exchange(reason))) => {
                assert_eq!(reason, "token expired");
            }
            _ => panic!("Expected exchange failure"),
        }
        assert_eq!(mock.exchange_call_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_unreachable() {
        let mock = MockProvider::unreachable("mastodon", "connection refused");

        let result = mock.exchange_credentials(&CredentialBlob::new("x")).await;
        match result {
            Err(ReshareError::Provider(ProviderError::Network(_))) => {}
            _ => panic!("Expected network error"),
        }
    }

    #[tokio::test]
    async fn test_mock_sub_accounts() {
        let mock = MockProvider::success("mastodon", "12345").with_sub_accounts(vec![SubAccount {
            id: "page-1".to_string(),
            display_name: "Page One".to_string(),
            avatar_ref: None,
        }]);

        let accounts = mock.list_sub_accounts().await.unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].id, "page-1");
    }

    #[test]
    fn test_mock_sign_in_url_includes_redirect() {
        let mock = MockProvider::success("bluesky", "did:1");
        let url = mock.sign_in_url(&SignInContext::new("https://example.org/cb"));
        assert!(url.contains("bluesky"));
        assert!(url.contains("https://example.org/cb"));
    }

    #[tokio::test]
    async fn test_mock_with_delay() {
        let mock = MockProvider::success("mastodon", "1").with_delay(Duration::from_millis(50));

        let start = std::time::Instant::now();
        mock.exchange_credentials(&CredentialBlob::new("c"))
            .await
            .unwrap();

        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_clones_share_call_counts() {
        let mock = MockProvider::success("mastodon", "1");
        let clone = mock.clone();

        clone
            .exchange_credentials(&CredentialBlob::new("c"))
            .await
            .unwrap();

        assert_eq!(mock.exchange_call_count(), 1);
    }
}
