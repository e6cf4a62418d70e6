//! reshare-admin - Account and selection management tool for Reshare
//!
//! Inspects and mutates the persisted service/account sets, builds content
//! selection queries, and manages general settings. Providers are registered
//! from the `RESHARE_MOCK_PROVIDERS` environment variable (comma-separated
//! names) until real network integrations are wired in by the host
//! application.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing::error;

use libreshare::providers::mock::MockProvider;
use libreshare::providers::{ProviderRegistry, SignInContext};
use libreshare::selection::{self, StaticTermSource, TaxonomyFilter, TermSource};
use libreshare::service::ReshareService;
use libreshare::settings::{FileStore, SettingsStore};
use libreshare::types::CredentialBlob;
use libreshare::{Config, GeneralSettings, SelectionCriteria, SubAccount};

#[derive(Parser)]
#[command(name = "reshare-admin")]
#[command(about = "Manage Reshare accounts, services, and content selection", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path of the settings store (JSON document)
    #[arg(long, global = true, env = "RESHARE_STORE")]
    store: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered providers
    Providers,

    /// Print the sign-in URL for a provider (empty line for unknown names)
    SigninUrl {
        /// Provider name
        provider: String,

        /// Redirect target for the sign-in flow
        #[arg(long)]
        redirect: String,
    },

    /// Authenticate a provider connection with raw credentials
    Authenticate {
        /// Provider name
        provider: String,

        /// Raw credential payload (e.g., an OAuth code)
        #[arg(long)]
        credentials: String,
    },

    /// List authenticated services
    Services,

    /// Remove an authenticated service (active accounts are not cascaded)
    RemoveService {
        /// Provider-assigned external id
        external_id: String,

        /// Provider name
        #[arg(long)]
        provider: String,
    },

    /// List active accounts
    Accounts,

    /// Activate sub-accounts under an authenticated service
    Activate {
        /// Provider name
        provider: String,

        /// External id of the authenticated service
        service_id: String,

        /// Sub-account descriptors as `id:display name` pairs
        #[arg(long = "account", required = true)]
        accounts: Vec<String>,
    },

    /// Remove an active account by composite key
    RemoveAccount {
        /// Composite key (`provider_serviceid_subaccountid`)
        key: String,
    },

    /// Build a content selection query and print it as JSON
    Query {
        /// Post types to include
        #[arg(long = "post-type")]
        post_types: Vec<String>,

        /// Taxonomy filters in `taxonomy_term` form (`_all` for every term)
        #[arg(long = "taxonomy")]
        taxonomies: Vec<String>,

        /// Exclude matching terms instead of including them
        #[arg(long)]
        exclude: bool,

        /// JSON file describing the available taxonomies and terms,
        /// required to expand wildcard filters
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// Show the stored general settings
    Settings,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let store = open_store(cli.store)?;

    if let Err(e) = run_command(cli.command, store).await {
        error!("{}", e);
        std::process::exit(1);
    }

    Ok(())
}

fn open_store(override_path: Option<PathBuf>) -> Result<Arc<dyn SettingsStore>> {
    let path = match override_path {
        Some(path) => path,
        None => {
            let config = match libreshare::config::resolve_config_path() {
                Ok(config_path) if config_path.exists() => Config::load_from_path(&config_path)?,
                _ => Config::default_config(),
            };
            config.store_path()
        }
    };

    Ok(Arc::new(FileStore::new(path)))
}

/// Registry built from `RESHARE_MOCK_PROVIDERS` (comma-separated names).
fn build_registry() -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();

    if let Ok(names) = std::env::var("RESHARE_MOCK_PROVIDERS") {
        for name in names.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            let mock = MockProvider::success(name, &format!("{}-account", name));
            registry.register(name, move || Box::new(mock.clone()));
        }
    }

    registry
}

async fn run_command(command: Commands, store: Arc<dyn SettingsStore>) -> Result<()> {
    let service = ReshareService::new(build_registry(), Arc::clone(&store));

    match command {
        Commands::Providers => {
            for name in service.registry().available() {
                println!("{}", name);
            }
        }

        Commands::SigninUrl { provider, redirect } => {
            let url = service.sign_in_url(&provider, &SignInContext::new(redirect));
            println!("{}", url);
        }

        Commands::Authenticate {
            provider,
            credentials,
        } => {
            let connected = service
                .authenticate(&provider, &CredentialBlob::new(credentials))
                .await?;

            match connected {
                Some(connected) => {
                    println!("Authenticated {} as {}", connected.key(), connected.display_name);
                }
                None => bail!("Authentication failed: credentials rejected or provider unreachable"),
            }
        }

        Commands::Services => {
            let services = service.model().authenticated_services()?;
            println!("{}", serde_json::to_string_pretty(&services)?);
        }

        Commands::RemoveService {
            external_id,
            provider,
        } => {
            let services = service.remove_authenticated_service(&external_id, &provider)?;
            println!("{}", serde_json::to_string_pretty(&services)?);
        }

        Commands::Accounts => {
            let accounts = service.model().active_accounts()?;
            println!("{}", serde_json::to_string_pretty(&accounts)?);
        }

        Commands::Activate {
            provider,
            service_id,
            accounts,
        } => {
            let descriptors = accounts
                .iter()
                .map(|raw| parse_sub_account(raw))
                .collect::<Result<Vec<_>>>()?;

            let active = service.activate_accounts(&provider, &service_id, &descriptors)?;
            println!("{}", serde_json::to_string_pretty(&active)?);
        }

        Commands::RemoveAccount { key } => {
            let active = service.remove_active_account(&key)?;
            println!("{}", serde_json::to_string_pretty(&active)?);
        }

        Commands::Query {
            post_types,
            taxonomies,
            exclude,
            catalog,
        } => {
            let filters = taxonomies
                .iter()
                .map(|v| TaxonomyFilter::parse(v))
                .collect::<libreshare::Result<Vec<_>>>()?;

            let criteria = SelectionCriteria {
                post_types,
                taxonomy_filters: filters,
                exclude,
            };

            let source = match catalog {
                Some(path) => load_catalog(&path)?,
                None => StaticTermSource::new(),
            };

            let query = selection::build_query(&criteria, &source)?;
            println!("{}", serde_json::to_string_pretty(&query)?);
        }

        Commands::Settings => {
            let settings = GeneralSettings::load(&store)?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
    }

    Ok(())
}

/// Parse an `id:display name` descriptor
fn parse_sub_account(raw: &str) -> Result<SubAccount> {
    let (id, display_name) = raw
        .split_once(':')
        .with_context(|| format!("Invalid account descriptor '{}', expected 'id:name'", raw))?;

    if id.is_empty() {
        bail!("Invalid account descriptor '{}': empty id", raw);
    }

    Ok(SubAccount {
        id: id.to_string(),
        display_name: display_name.to_string(),
        avatar_ref: None,
    })
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    taxonomies: std::collections::BTreeMap<String, Vec<CatalogTaxonomy>>,
    #[serde(default)]
    terms: std::collections::BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct CatalogTaxonomy {
    name: String,
    #[serde(default)]
    label: Option<String>,
}

/// Build a term source from a catalog JSON file:
/// `{"taxonomies": {"post": [{"name": "category"}]}, "terms": {"category": ["news"]}}`
fn load_catalog(path: &PathBuf) -> Result<StaticTermSource> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog file {}", path.display()))?;
    let catalog: CatalogFile = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse catalog file {}", path.display()))?;

    let mut source = StaticTermSource::new();
    for (post_type, taxonomies) in &catalog.taxonomies {
        for taxonomy in taxonomies {
            let slugs: Vec<&str> = catalog
                .terms
                .get(&taxonomy.name)
                .map(|terms| terms.iter().map(String::as_str).collect())
                .unwrap_or_default();
            source = source.with_taxonomy(
                post_type,
                &taxonomy.name,
                taxonomy.label.as_deref().unwrap_or(&taxonomy.name),
                &slugs,
            );
        }
    }

    // Taxonomies that only appear in the terms map still need to be
    // resolvable for wildcard filters
    for (taxonomy, terms) in &catalog.terms {
        let slugs: Vec<&str> = terms.iter().map(String::as_str).collect();
        if source.terms(taxonomy).map(|t| t.is_empty()).unwrap_or(true) {
            source = source.with_taxonomy("", taxonomy, taxonomy, &slugs);
        }
    }

    Ok(source)
}
