//! Configuration resolution for civdata-ingest
//!
//! Turns the shared [`TomlConfig`] into the typed settings each component
//! takes, and resolves provider credentials with ENV → TOML priority.

use crate::adapters::congress::CongressAdapter;
use crate::adapters::fec::FecAdapter;
use crate::adapters::google_civic::GoogleCivicAdapter;
use crate::adapters::http::HttpSettings;
use crate::adapters::offline::OfflineDatasetAdapter;
use crate::adapters::wikipedia::WikipediaAdapter;
use crate::db::PersistencePolicy;
use crate::eligibility::EligibilityPolicy;
use crate::types::{AdapterError, SourceAdapter};
use crate::workflow::PipelineConfig;
use civdata_common::config::{default_database_path, resolve_secret, TomlConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

pub const CONGRESS_KEY_ENV: &str = "CIVDATA_CONGRESS_API_KEY";
pub const GOOGLE_CIVIC_KEY_ENV: &str = "CIVDATA_GOOGLE_CIVIC_API_KEY";
pub const FEC_KEY_ENV: &str = "CIVDATA_FEC_API_KEY";

/// Provider credentials after ENV → TOML resolution
#[derive(Clone, Default, PartialEq)]
pub struct ApiKeys {
    pub congress: Option<String>,
    pub google_civic: Option<String>,
    pub fec: Option<String>,
}

// Keys never reach logs
impl std::fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeys")
            .field("congress", &self.congress.is_some())
            .field("google_civic", &self.google_civic.is_some())
            .field("fec", &self.fec.is_some())
            .finish()
    }
}

impl ApiKeys {
    pub fn resolve(toml: &TomlConfig) -> Self {
        Self {
            congress: resolve_secret(CONGRESS_KEY_ENV, toml.api_keys.congress.as_deref()),
            google_civic: resolve_secret(
                GOOGLE_CIVIC_KEY_ENV,
                toml.api_keys.google_civic.as_deref(),
            ),
            fec: resolve_secret(FEC_KEY_ENV, toml.api_keys.fec.as_deref()),
        }
    }
}

/// Fully resolved ingest configuration
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub toml: TomlConfig,
    pub api_keys: ApiKeys,
    pub database_path: PathBuf,
    pub dataset_root: Option<PathBuf>,
}

impl IngestConfig {
    pub fn from_toml(toml: TomlConfig) -> Self {
        let api_keys = ApiKeys::resolve(&toml);
        let database_path = toml
            .paths
            .database
            .clone()
            .unwrap_or_else(default_database_path);
        let dataset_root = toml.paths.dataset_root.clone();

        Self {
            toml,
            api_keys,
            database_path,
            dataset_root,
        }
    }

    pub fn eligibility_policy(&self) -> EligibilityPolicy {
        EligibilityPolicy::from(&self.toml.eligibility)
    }

    pub fn persistence_policy(&self) -> PersistencePolicy {
        PersistencePolicy::from(&self.toml.persistence)
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig::from_sections(&self.toml.pipeline, &self.toml.persistence)
    }

    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings::from(&self.toml.http)
    }

    /// Build every source adapter
    ///
    /// Live adapters without credentials are still built; they answer
    /// `NotAvailable`. An adapter whose HTTP client cannot be built is
    /// left out with a warning.
    pub fn build_adapters(&self, policy: Arc<EligibilityPolicy>) -> Vec<Arc<dyn SourceAdapter>> {
        let settings = self.http_settings();
        let mut adapters: Vec<Arc<dyn SourceAdapter>> = vec![Arc::new(
            OfflineDatasetAdapter::new(self.dataset_root.clone(), policy),
        )];

        push_adapter(
            &mut adapters,
            "congress_gov",
            CongressAdapter::new(self.api_keys.congress.clone(), &settings),
        );
        push_adapter(
            &mut adapters,
            "google_civic",
            GoogleCivicAdapter::new(self.api_keys.google_civic.clone(), &settings),
        );
        push_adapter(
            &mut adapters,
            "fec",
            FecAdapter::new(self.api_keys.fec.clone(), &settings),
        );
        push_adapter(&mut adapters, "wikipedia", WikipediaAdapter::new(&settings));

        info!(
            adapters = adapters.len(),
            keys = ?self.api_keys,
            dataset = self.dataset_root.is_some(),
            "Source adapters configured"
        );
        adapters
    }
}

fn push_adapter<A>(
    adapters: &mut Vec<Arc<dyn SourceAdapter>>,
    name: &str,
    built: Result<A, AdapterError>,
) where
    A: SourceAdapter + 'static,
{
    match built {
        Ok(adapter) => adapters.push(Arc::new(adapter)),
        Err(e) => warn!(source = name, error = %e, "Adapter disabled"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_env_key_wins_over_toml() {
        let mut toml = TomlConfig::default();
        toml.api_keys.fec = Some("toml-key".to_string());
        std::env::set_var(FEC_KEY_ENV, "env-key");

        let keys = ApiKeys::resolve(&toml);
        std::env::remove_var(FEC_KEY_ENV);

        assert_eq!(keys.fec.as_deref(), Some("env-key"));
        assert!(!format!("{keys:?}").contains("env-key"));
    }

    #[test]
    #[serial]
    fn test_build_adapters_without_keys() {
        for var in [CONGRESS_KEY_ENV, GOOGLE_CIVIC_KEY_ENV, FEC_KEY_ENV] {
            std::env::remove_var(var);
        }
        let config = IngestConfig::from_toml(TomlConfig::default());
        let adapters = config.build_adapters(Arc::new(config.eligibility_policy()));

        assert_eq!(adapters.len(), 5);
        assert!(config.api_keys.congress.is_none());
        assert_eq!(config.pipeline_config().max_concurrent_representatives, 1);
    }
}
