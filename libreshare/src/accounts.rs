//! Account identity model
//!
//! Maintains the two persisted sets of the subsystem: authenticated provider
//! connections and activated posting accounts. Both are keyed maps stored as
//! whole-set snapshots in the settings gateway; every mutation is
//! read-modify-write of the full set.
//!
//! Merge semantics are insert-or-replace by composite key, so repeating an
//! authentication or activation refreshes the entry instead of duplicating
//! it. Removal is idempotent set difference. Removing a service does NOT
//! cascade to its active accounts; orphan cleanup belongs to a higher-level
//! reconciliation pass.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{Result, SettingsError};
use crate::settings::{SettingsStore, ACTIVE_ACCOUNTS_KEY, AUTHENTICATED_SERVICES_KEY};
use crate::types::{service_key, ActiveAccount, AuthenticatedService};

/// Snapshot of the authenticated-service set, keyed by composite key
pub type ServiceSet = BTreeMap<String, AuthenticatedService>;
/// Snapshot of the active-account set, keyed by composite key
pub type AccountSet = BTreeMap<String, ActiveAccount>;

/// Persisted view over the service and account sets
pub struct ServicesModel {
    store: Arc<dyn SettingsStore>,
}

impl ServicesModel {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self { store }
    }

    /// Current authenticated-service set (empty if nothing stored yet)
    pub fn authenticated_services(&self) -> Result<ServiceSet> {
        self.load(AUTHENTICATED_SERVICES_KEY)
    }

    /// Current active-account set (empty if nothing stored yet)
    pub fn active_accounts(&self) -> Result<AccountSet> {
        self.load(ACTIVE_ACCOUNTS_KEY)
    }

    /// Merge one authenticated service into the set, insert-or-replace by
    /// key, and persist. Returns the full updated set.
    pub fn add_authenticated_service(&self, service: AuthenticatedService) -> Result<ServiceSet> {
        let mut services = self.authenticated_services()?;
        let key = service.key();

        if services.insert(key.clone(), service).is_some() {
            tracing::debug!(%key, "Replaced authenticated service");
        } else {
            tracing::debug!(%key, "Added authenticated service");
        }

        self.save(AUTHENTICATED_SERVICES_KEY, &services)?;
        Ok(services)
    }

    /// Remove one authenticated service by its identifying pair.
    ///
    /// Removing a key that is not present is a no-op, not an error.
    /// Dependent active accounts are intentionally left in place.
    pub fn delete_authenticated_service(
        &self,
        external_id: &str,
        provider: &str,
    ) -> Result<ServiceSet> {
        let mut services = self.authenticated_services()?;
        let key = service_key(provider, external_id);

        if services.remove(&key).is_some() {
            tracing::debug!(%key, "Removed authenticated service");
            self.save(AUTHENTICATED_SERVICES_KEY, &services)?;
        }

        Ok(services)
    }

    /// Merge a batch of active accounts into the set, insert-or-replace by
    /// key, and persist. Returns the full updated set, since downstream
    /// consumers read the complete list.
    pub fn add_active_accounts(&self, accounts: Vec<ActiveAccount>) -> Result<AccountSet> {
        let mut active = self.active_accounts()?;

        for account in accounts {
            let key = account.key();
            if active.insert(key.clone(), account).is_some() {
                tracing::debug!(%key, "Refreshed active account");
            } else {
                tracing::debug!(%key, "Activated account");
            }
        }

        self.save(ACTIVE_ACCOUNTS_KEY, &active)?;
        Ok(active)
    }

    /// Remove one active account by composite key.
    ///
    /// Removing a key that is not present is a no-op, not an error, so
    /// callers can retry safely.
    pub fn delete_active_account(&self, account_key: &str) -> Result<AccountSet> {
        let mut active = self.active_accounts()?;

        if active.remove(account_key).is_some() {
            tracing::debug!(key = %account_key, "Removed active account");
            self.save(ACTIVE_ACCOUNTS_KEY, &active)?;
        }

        Ok(active)
    }

    fn load<T: serde::de::DeserializeOwned + Default>(&self, key: &str) -> Result<T> {
        match self.store.get(key)? {
            Some(value) => serde_json::from_value(value)
                .map_err(|e| SettingsError::Serialize(e).into()),
            None => Ok(T::default()),
        }
    }

    fn save<T: serde::Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let blob = serde_json::to_value(value).map_err(SettingsError::Serialize)?;
        self.store.set(key, blob)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MemoryStore;
    use crate::types::{account_key, CredentialBlob, ServiceIdentity, SubAccount};
    use chrono::{TimeZone, Utc};

    fn model() -> ServicesModel {
        ServicesModel::new(Arc::new(MemoryStore::new()))
    }

    fn service(provider: &str, external_id: &str, token: &str) -> AuthenticatedService {
        AuthenticatedService::from_identity(
            provider,
            ServiceIdentity {
                id: external_id.to_string(),
                display_name: format!("{} account", provider),
                credential_blob: CredentialBlob::new(token),
            },
        )
    }

    fn account(provider: &str, service_id: &str, sub_id: &str) -> ActiveAccount {
        ActiveAccount::activated(
            provider,
            service_id,
            SubAccount {
                id: sub_id.to_string(),
                display_name: sub_id.to_uppercase(),
                avatar_ref: None,
            },
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_add_authenticated_service() {
        let model = model();
        let services = model
            .add_authenticated_service(service("mastodon", "1", "tok"))
            .unwrap();

        assert_eq!(services.len(), 1);
        assert!(services.contains_key("mastodon_1"));
    }

    #[test]
    fn test_reauthentication_replaces_not_duplicates() {
        let model = model();
        model
            .add_authenticated_service(service("mastodon", "1", "old-token"))
            .unwrap();
        let services = model
            .add_authenticated_service(service("mastodon", "1", "new-token"))
            .unwrap();

        assert_eq!(services.len(), 1);
        assert_eq!(
            services["mastodon_1"].credential_blob.as_str(),
            "new-token"
        );
    }

    #[test]
    fn test_same_external_id_different_provider_coexist() {
        let model = model();
        model
            .add_authenticated_service(service("mastodon", "1", "a"))
            .unwrap();
        let services = model
            .add_authenticated_service(service("bluesky", "1", "b"))
            .unwrap();

        assert_eq!(services.len(), 2);
    }

    #[test]
    fn test_delete_authenticated_service() {
        let model = model();
        model
            .add_authenticated_service(service("mastodon", "1", "tok"))
            .unwrap();

        let services = model.delete_authenticated_service("1", "mastodon").unwrap();
        assert!(services.is_empty());
    }

    #[test]
    fn test_delete_missing_service_is_noop() {
        let model = model();
        model
            .add_authenticated_service(service("mastodon", "1", "tok"))
            .unwrap();

        let services = model.delete_authenticated_service("99", "mastodon").unwrap();
        assert_eq!(services.len(), 1);
    }

    #[test]
    fn test_service_removal_does_not_cascade() {
        let model = model();
        model
            .add_authenticated_service(service("mastodon", "1", "tok"))
            .unwrap();
        model
            .add_active_accounts(vec![account("mastodon", "1", "page")])
            .unwrap();

        model.delete_authenticated_service("1", "mastodon").unwrap();

        // Orphaned active account is left in place for a later
        // reconciliation pass
        let active = model.active_accounts().unwrap();
        assert_eq!(active.len(), 1);
    }

    #[test]
    fn test_add_active_accounts_batch() {
        let model = model();
        let active = model
            .add_active_accounts(vec![
                account("mastodon", "1", "page-a"),
                account("mastodon", "1", "page-b"),
            ])
            .unwrap();

        assert_eq!(active.len(), 2);
        assert!(active.contains_key(&account_key("mastodon", "1", "page-a")));
        assert!(active.contains_key(&account_key("mastodon", "1", "page-b")));
    }

    #[test]
    fn test_reactivation_refreshes_timestamp() {
        let model = model();
        model
            .add_active_accounts(vec![account("mastodon", "1", "page")])
            .unwrap();

        let mut refreshed = account("mastodon", "1", "page");
        refreshed.activated_at = Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap();
        let active = model.add_active_accounts(vec![refreshed]).unwrap();

        assert_eq!(active.len(), 1);
        assert_eq!(
            active[&account_key("mastodon", "1", "page")].activated_at,
            Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_delete_active_account() {
        let model = model();
        model
            .add_active_accounts(vec![
                account("mastodon", "1", "page-a"),
                account("mastodon", "1", "page-b"),
            ])
            .unwrap();

        let active = model
            .delete_active_account(&account_key("mastodon", "1", "page-a"))
            .unwrap();

        assert_eq!(active.len(), 1);
        assert!(active.contains_key(&account_key("mastodon", "1", "page-b")));
    }

    #[test]
    fn test_delete_missing_account_is_noop() {
        let model = model();
        model
            .add_active_accounts(vec![account("mastodon", "1", "page")])
            .unwrap();

        let active = model.delete_active_account("mastodon_1_other").unwrap();
        assert_eq!(active.len(), 1);
    }

    #[test]
    fn test_sets_persist_through_store() {
        let store: Arc<dyn SettingsStore> = Arc::new(MemoryStore::new());
        {
            let model = ServicesModel::new(Arc::clone(&store));
            model
                .add_authenticated_service(service("mastodon", "1", "tok"))
                .unwrap();
        }

        let model = ServicesModel::new(store);
        assert_eq!(model.authenticated_services().unwrap().len(), 1);
    }
}
