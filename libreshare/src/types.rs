//! Core types for Reshare

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Separator used in all composite keys.
///
/// Because keys are joined with `_`, provider names and taxonomy names
/// containing `_` are unsupported. This is a documented naming constraint,
/// not a validation concern of this module.
pub const KEY_SEPARATOR: &str = "_";

/// Opaque, provider-specific credential payload.
///
/// The core never inspects the contents; it only stores the blob and hands
/// it back to the provider client on reuse. Debug output is redacted so
/// tokens never land in logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialBlob(String);

impl CredentialBlob {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for CredentialBlob {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl From<String> for CredentialBlob {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl std::fmt::Debug for CredentialBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CredentialBlob(<redacted>)")
    }
}

/// What a provider client yields after a successful credential exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceIdentity {
    /// Provider-assigned external id for the connected account
    pub id: String,
    pub display_name: String,
    /// Credentials to store for later reuse (may differ from the raw input,
    /// e.g. a long-lived token exchanged from a short-lived code)
    pub credential_blob: CredentialBlob,
}

/// One successfully authenticated provider connection.
///
/// Never mutated in place: re-authentication replaces the whole entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticatedService {
    pub provider: String,
    pub external_id: String,
    pub display_name: String,
    pub credential_blob: CredentialBlob,
}

impl AuthenticatedService {
    pub fn from_identity(provider: impl Into<String>, identity: ServiceIdentity) -> Self {
        Self {
            provider: provider.into(),
            external_id: identity.id,
            display_name: identity.display_name,
            credential_blob: identity.credential_blob,
        }
    }

    /// Composite key, unique across the authenticated-service set
    pub fn key(&self) -> String {
        service_key(&self.provider, &self.external_id)
    }
}

/// Key of an [`AuthenticatedService`]: `provider + "_" + external_id`
pub fn service_key(provider: &str, external_id: &str) -> String {
    format!("{}{}{}", provider, KEY_SEPARATOR, external_id)
}

/// A postable sub-account exposed by a provider (a page, channel, or
/// user handle). Used both when listing what a provider offers and as the
/// descriptor an operator selects for activation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubAccount {
    pub id: String,
    pub display_name: String,
    pub avatar_ref: Option<String>,
}

/// One sub-account the operator has opted to actually post to.
///
/// Immutable once created except for removal; re-activation replaces the
/// entry wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveAccount {
    pub provider: String,
    /// External id of the authenticated service this account belongs to
    pub provider_account_id: String,
    pub sub_account_id: String,
    pub display_name: String,
    pub avatar_ref: Option<String>,
    pub activated_at: DateTime<Utc>,
}

impl ActiveAccount {
    pub fn activated(
        provider: impl Into<String>,
        provider_account_id: impl Into<String>,
        sub_account: SubAccount,
        activated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            provider: provider.into(),
            provider_account_id: provider_account_id.into(),
            sub_account_id: sub_account.id,
            display_name: sub_account.display_name,
            avatar_ref: sub_account.avatar_ref,
            activated_at,
        }
    }

    /// Composite key, unique across the active-account set
    pub fn key(&self) -> String {
        account_key(&self.provider, &self.provider_account_id, &self.sub_account_id)
    }
}

/// Key of an [`ActiveAccount`]:
/// `provider + "_" + provider_account_id + "_" + sub_account_id`
pub fn account_key(provider: &str, provider_account_id: &str, sub_account_id: &str) -> String {
    format!(
        "{}{}{}{}{}",
        provider, KEY_SEPARATOR, provider_account_id, KEY_SEPARATOR, sub_account_id
    )
}
