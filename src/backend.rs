//! Builds the registry backend and fetcher named in the configuration.

use crate::config::{ProfilerConfig, RegistryBackend};
use anyhow::{Context, Result};
use homepage_probe::HttpFetcher;
use latency_profiler::Profiler;
use plugin_registry::{JsonFileRegistry, PluginRegistry, WpCliRegistry};

pub type SharedRegistry = Box<dyn PluginRegistry + Send + Sync>;
pub type SiteProfiler = Profiler<SharedRegistry, HttpFetcher>;

pub fn build_registry(config: &ProfilerConfig) -> Result<SharedRegistry> {
    let registry: SharedRegistry = match config.registry.backend {
        RegistryBackend::File => Box::new(
            JsonFileRegistry::open(&config.registry.state_file).with_context(|| {
                format!(
                    "failed to open plugin state file {}",
                    config.registry.state_file.display()
                )
            })?,
        ),
        RegistryBackend::WpCli => Box::new(WpCliRegistry::new(
            config.registry.wp_binary.clone(),
            config.registry.wp_path.clone(),
        )),
    };
    Ok(registry)
}

pub fn build_profiler(config: &ProfilerConfig) -> Result<SiteProfiler> {
    let registry = build_registry(config)?;
    let fetcher = HttpFetcher::new(config.fetcher_config()).context("failed to build HTTP client")?;
    Ok(Profiler::new(registry, fetcher, config.settings()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use plugin_registry::{PluginDescriptor, RegistryState};

    #[test]
    fn test_file_backend() {
        let dir = tempfile::tempdir().unwrap();
        let state_file = dir.path().join("plugins.json");
        plugin_registry::JsonFileRegistry::create(
            &state_file,
            &RegistryState {
                plugins: vec![PluginDescriptor::new("a/a.php", "A")],
                active: Default::default(),
            },
        )
        .unwrap();

        let mut config = ProfilerConfig::default();
        config.registry.backend = RegistryBackend::File;
        config.registry.state_file = state_file;

        let registry = build_registry(&config).unwrap();
        assert_eq!(registry.list_installed_plugins().unwrap().len(), 1);
        assert!(build_profiler(&config).is_ok());
    }

    #[test]
    fn test_missing_state_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ProfilerConfig::default();
        config.registry.backend = RegistryBackend::File;
        config.registry.state_file = dir.path().join("missing.json");

        let err = build_registry(&config).err().unwrap();
        assert!(err.to_string().contains("failed to open plugin state file"));
    }
}
