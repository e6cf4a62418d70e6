//! Reshare - connect social accounts and re-share published content
//!
//! This library provides the account authentication/identity subsystem and
//! the content selection query builder for periodically re-sharing
//! previously published content to connected social network accounts.

pub mod accounts;
pub mod config;
pub mod error;
pub mod logging;
pub mod providers;
pub mod selection;
pub mod service;
pub mod settings;
pub mod types;

// Re-export commonly used types
pub use config::{Config, GeneralSettings};
pub use error::{ReshareError, Result};
pub use providers::{ProviderClient, ProviderRegistry, SignInContext};
pub use selection::{build_query, QueryDescription, SelectionCriteria, TaxonomyFilter};
pub use service::ReshareService;
pub use settings::{FileStore, MemoryStore, SettingsStore};
pub use types::{ActiveAccount, AuthenticatedService, CredentialBlob, SubAccount};
