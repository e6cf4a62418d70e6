//! Service facade for Reshare
//!
//! Coordinates the provider registry and the account identity model into the
//! operator-facing flows: authenticating a provider connection, producing
//! sign-in URLs, activating posting accounts, and removing either. All flows
//! are request-scoped; the only state lives in the injected settings store.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use libreshare::providers::{mock::MockProvider, ProviderRegistry};
//! use libreshare::service::ReshareService;
//! use libreshare::settings::MemoryStore;
//! use libreshare::types::CredentialBlob;
//!
//! # async fn example() -> libreshare::Result<()> {
//! let mut registry = ProviderRegistry::new();
//! let mock = MockProvider::success("mastodon", "12345");
//! registry.register("mastodon", move || Box::new(mock.clone()));
//!
//! let service = ReshareService::new(registry, Arc::new(MemoryStore::new()));
//! let connected = service
//!     .authenticate("mastodon", &CredentialBlob::new("oauth-code"))
//!     .await?;
//! assert!(connected.is_some());
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::accounts::{AccountSet, ServiceSet, ServicesModel};
use crate::error::{ProviderError, ReshareError, Result};
use crate::providers::{ProviderRegistry, SignInContext};
use crate::settings::SettingsStore;
use crate::types::{ActiveAccount, AuthenticatedService, CredentialBlob, SubAccount};

/// Injected time source so activation timestamps are deterministic in tests
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct ReshareService {
    registry: ProviderRegistry,
    model: ServicesModel,
    clock: Clock,
}

impl ReshareService {
    /// Create a service using the wall clock
    pub fn new(registry: ProviderRegistry, store: Arc<dyn SettingsStore>) -> Self {
        Self::with_clock(registry, store, Arc::new(Utc::now))
    }

    /// Create a service with an injected time source
    pub fn with_clock(
        registry: ProviderRegistry,
        store: Arc<dyn SettingsStore>,
        clock: Clock,
    ) -> Self {
        Self {
            registry,
            model: ServicesModel::new(store),
            clock,
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn model(&self) -> &ServicesModel {
        &self.model
    }

    /// Try to authenticate a provider connection.
    ///
    /// Resolves a client for `provider_name` (an unknown name propagates as
    /// [`ProviderError::Unknown`]) and exchanges the raw credentials. A
    /// rejected or unreachable exchange returns `Ok(None)` without touching
    /// persisted state, since "not authenticated" is a normal branch for
    /// callers. On success the connection is merged into the
    /// authenticated-service set, replacing any prior entry for the same
    /// provider and external id.
    pub async fn authenticate(
        &self,
        provider_name: &str,
        raw_credentials: &CredentialBlob,
    ) -> Result<Option<AuthenticatedService>> {
        let client = self.registry.build(provider_name)?;

        let identity = match client.exchange_credentials(raw_credentials).await {
            Ok(identity) => identity,
            Err(ReshareError::Provider(ProviderError::Exchange(reason))) => {
                tracing::debug!(provider = provider_name, %reason, "Credential exchange rejected");
                return Ok(None);
            }
            Err(ReshareError::Provider(ProviderError::Network(reason))) => {
                tracing::debug!(provider = provider_name, %reason, "Provider unreachable");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let service = AuthenticatedService::from_identity(client.name(), identity);
        let services = self.model.add_authenticated_service(service.clone())?;

        // The stored entry is what we return, so callers see exactly what
        // downstream consumers will read
        Ok(services.get(&service.key()).cloned())
    }

    /// Sign-in URL for a provider.
    ///
    /// An unknown provider yields an empty string instead of an error;
    /// callers must check for emptiness. Pure query, no persistence.
    pub fn sign_in_url(&self, provider_name: &str, ctx: &SignInContext) -> String {
        match self.registry.build(provider_name) {
            Ok(client) => client.sign_in_url(ctx),
            Err(_) => String::new(),
        }
    }

    /// Sub-accounts a provider connection exposes, for the operator to pick
    /// activation candidates from.
    pub async fn list_sub_accounts(&self, provider_name: &str) -> Result<Vec<SubAccount>> {
        let client = self.registry.build(provider_name)?;
        client.list_sub_accounts().await
    }

    /// Activate a batch of sub-accounts under an authenticated service.
    ///
    /// Each descriptor becomes an [`ActiveAccount`] stamped with the
    /// service's clock, merged insert-or-replace into the active-account
    /// set. Returns the full updated set.
    ///
    /// Whether `provider_account_id` references a real authenticated
    /// service is deliberately not checked here; that invariant belongs to
    /// the caller, which keeps activation testable in isolation.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for an empty batch.
    pub fn activate_accounts(
        &self,
        provider_name: &str,
        provider_account_id: &str,
        selected: &[SubAccount],
    ) -> Result<AccountSet> {
        if selected.is_empty() {
            return Err(ReshareError::InvalidInput(
                "Activation batch cannot be empty".to_string(),
            ));
        }

        let activated_at = (self.clock)();
        let accounts = selected
            .iter()
            .cloned()
            .map(|sub| {
                ActiveAccount::activated(provider_name, provider_account_id, sub, activated_at)
            })
            .collect();

        self.model.add_active_accounts(accounts)
    }

    /// Remove one active account by composite key; idempotent.
    pub fn remove_active_account(&self, account_key: &str) -> Result<AccountSet> {
        self.model.delete_active_account(account_key)
    }

    /// Remove one authenticated service; idempotent, never cascades to the
    /// service's active accounts.
    pub fn remove_authenticated_service(
        &self,
        external_id: &str,
        provider: &str,
    ) -> Result<ServiceSet> {
        self.model.delete_authenticated_service(external_id, provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mock::MockProvider;
    use crate::providers::ProviderClient;
    use crate::settings::MemoryStore;
    use chrono::TimeZone;

    fn fixed_clock() -> Clock {
        Arc::new(|| Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
    }

    fn service_with(mocks: Vec<MockProvider>) -> ReshareService {
        let mut registry = ProviderRegistry::new();
        for mock in mocks {
            let name = mock.name().to_string();
            registry.register(name, move || Box::new(mock.clone()));
        }
        ReshareService::with_clock(registry, Arc::new(MemoryStore::new()), fixed_clock())
    }

    fn sub(id: &str) -> SubAccount {
        SubAccount {
            id: id.to_string(),
            display_name: id.to_uppercase(),
            avatar_ref: Some(format!("https://cdn.example/{}.png", id)),
        }
    }

    #[tokio::test]
    async fn test_authenticate_success_persists() {
        let service = service_with(vec![MockProvider::success("mastodon", "12345")]);

        let connected = service
            .authenticate("mastodon", &CredentialBlob::new("code"))
            .await
            .unwrap()
            .expect("authentication should succeed");

        assert_eq!(connected.key(), "mastodon_12345");
        assert_eq!(service.model().authenticated_services().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_authenticate_rejected_returns_none_without_persisting() {
        let service = service_with(vec![MockProvider::exchange_failure("mastodon", "denied")]);

        let result = service
            .authenticate("mastodon", &CredentialBlob::new("code"))
            .await
            .unwrap();

        assert!(result.is_none());
        assert!(service.model().authenticated_services().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_authenticate_unreachable_returns_none() {
        let service = service_with(vec![MockProvider::unreachable("mastodon", "timeout")]);

        let result = service
            .authenticate("mastodon", &CredentialBlob::new("code"))
            .await
            .unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_authenticate_unknown_provider_propagates() {
        let service = service_with(vec![]);

        let result = service
            .authenticate("myspace", &CredentialBlob::new("code"))
            .await;

        match result {
            Err(ReshareError::Provider(ProviderError::Unknown(name))) => {
                assert_eq!(name, "myspace");
            }
            _ => panic!("Expected ProviderError::Unknown"),
        }
    }

    #[tokio::test]
    async fn test_reauthenticate_overwrites_credentials() {
        let mut registry = ProviderRegistry::new();
        let first = MockProvider::success("mastodon", "1");
        registry.register("mastodon", move || Box::new(first.clone()));
        let store: Arc<dyn SettingsStore> = Arc::new(MemoryStore::new());
        let service = ReshareService::with_clock(registry, Arc::clone(&store), fixed_clock());

        service
            .authenticate("mastodon", &CredentialBlob::new("code"))
            .await
            .unwrap();

        // Second service instance with a provider yielding a fresh token for
        // the same external id
        let mut registry = ProviderRegistry::new();
        let second = MockProvider::with_identity(
            "mastodon",
            crate::types::ServiceIdentity {
                id: "1".to_string(),
                display_name: "renamed".to_string(),
                credential_blob: CredentialBlob::new("fresh-token"),
            },
        );
        registry.register("mastodon", move || Box::new(second.clone()));
        let service = ReshareService::with_clock(registry, store, fixed_clock());

        service
            .authenticate("mastodon", &CredentialBlob::new("code"))
            .await
            .unwrap();

        let services = service.model().authenticated_services().unwrap();
        assert_eq!(services.len(), 1);
        assert_eq!(services["mastodon_1"].credential_blob.as_str(), "fresh-token");
        assert_eq!(services["mastodon_1"].display_name, "renamed");
    }

    #[test]
    fn test_sign_in_url_known_provider() {
        let service = service_with(vec![MockProvider::success("mastodon", "1")]);

        let url = service.sign_in_url("mastodon", &SignInContext::new("https://example.org/cb"));
        assert!(url.contains("mastodon"));
    }

    #[test]
    fn test_sign_in_url_unknown_provider_is_empty() {
        let service = service_with(vec![]);

        let url = service.sign_in_url("myspace", &SignInContext::new("https://example.org/cb"));
        assert!(url.is_empty());
    }

    #[tokio::test]
    async fn test_list_sub_accounts() {
        let mock = MockProvider::success("mastodon", "1")
            .with_sub_accounts(vec![sub("page-a"), sub("page-b")]);
        let service = service_with(vec![mock]);

        let accounts = service.list_sub_accounts("mastodon").await.unwrap();
        assert_eq!(accounts.len(), 2);
    }

    #[test]
    fn test_activate_accounts_uses_injected_clock() {
        let service = service_with(vec![MockProvider::success("mastodon", "1")]);

        let active = service
            .activate_accounts("mastodon", "1", &[sub("page-a")])
            .unwrap();

        let account = &active["mastodon_1_page-a"];
        assert_eq!(
            account.activated_at,
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
        );
        assert_eq!(account.display_name, "PAGE-A");
    }

    #[test]
    fn test_activate_empty_batch_rejected() {
        let service = service_with(vec![MockProvider::success("mastodon", "1")]);

        let result = service.activate_accounts("mastodon", "1", &[]);
        assert!(matches!(result, Err(ReshareError::InvalidInput(_))));
    }

    #[test]
    fn test_reactivation_keeps_set_size_constant() {
        let mut registry = ProviderRegistry::new();
        let mock = MockProvider::success("mastodon", "1");
        registry.register("mastodon", move || Box::new(mock.clone()));
        let store: Arc<dyn SettingsStore> = Arc::new(MemoryStore::new());

        let service = ReshareService::with_clock(registry, Arc::clone(&store), fixed_clock());
        service
            .activate_accounts("mastodon", "1", &[sub("page-a")])
            .unwrap();

        let later: Clock = Arc::new(|| Utc.with_ymd_and_hms(2024, 6, 2, 8, 0, 0).unwrap());
        let mut registry = ProviderRegistry::new();
        let mock = MockProvider::success("mastodon", "1");
        registry.register("mastodon", move || Box::new(mock.clone()));
        let service = ReshareService::with_clock(registry, store, later);

        let active = service
            .activate_accounts("mastodon", "1", &[sub("page-a")])
            .unwrap();

        assert_eq!(active.len(), 1);
        assert_eq!(
            active["mastodon_1_page-a"].activated_at,
            Utc.with_ymd_and_hms(2024, 6, 2, 8, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_remove_operations_are_idempotent() {
        let service = service_with(vec![MockProvider::success("mastodon", "1")]);
        service
            .activate_accounts("mastodon", "1", &[sub("page-a")])
            .unwrap();

        let active = service.remove_active_account("mastodon_1_missing").unwrap();
        assert_eq!(active.len(), 1);

        let services = service.remove_authenticated_service("1", "mastodon").unwrap();
        assert!(services.is_empty());
    }
}
