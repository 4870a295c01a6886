//! Configuration management

use anyhow::{anyhow, Context, Result};
use config::{Config, Environment, File};
use homepage_probe::FetcherConfig;
use latency_profiler::ProfilerSettings;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Prefix for environment overrides, e.g. `PLUGIN_PROFILER__SITE__TIMEOUT_MS`.
pub const ENV_PREFIX: &str = "PLUGIN_PROFILER";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfilerConfig {
    pub site: SiteConfig,
    pub registry: RegistryConfig,
    pub profiler: RunConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    pub homepage: String,
    pub timeout_ms: u64,
    pub follow_redirects: bool,
    pub cache_bust: bool,
    pub user_agent: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegistryBackend {
    /// JSON state file, see `plugin_registry::RegistryState`.
    File,
    WpCli,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub backend: RegistryBackend,
    pub state_file: PathBuf,
    pub wp_binary: String,
    pub wp_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub baseline: bool,
    pub auto_recover: bool,
    pub journal_path: Option<PathBuf>,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        let fetcher = FetcherConfig::default();
        Self {
            site: SiteConfig {
                homepage: "http://localhost/".to_string(),
                timeout_ms: latency_profiler::DEFAULT_TRIAL_TIMEOUT.as_millis() as u64,
                follow_redirects: fetcher.follow_redirects,
                cache_bust: fetcher.cache_bust,
                user_agent: fetcher.user_agent,
            },
            registry: RegistryConfig {
                backend: RegistryBackend::WpCli,
                state_file: PathBuf::from("plugins.json"),
                wp_binary: "wp".to_string(),
                wp_path: None,
            },
            profiler: RunConfig {
                baseline: true,
                auto_recover: false,
                journal_path: Some(PathBuf::from(".plugin-profiler/run.json")),
            },
        }
    }
}

impl ProfilerConfig {
    /// Defaults, then the optional TOML file, then environment overrides.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&ProfilerConfig::default())?);
        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path).required(true));
        }
        builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

        let config: ProfilerConfig = builder
            .build()
            .context("failed to assemble configuration")?
            .try_deserialize()
            .context("invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let homepage = self.homepage()?;
        if !matches!(homepage.scheme(), "http" | "https") {
            return Err(anyhow!("homepage must be an http(s) URL, got {}", homepage));
        }
        if self.site.timeout_ms == 0 {
            return Err(anyhow!("site.timeout_ms must be greater than zero"));
        }
        if self.registry.backend == RegistryBackend::WpCli && self.registry.wp_binary.trim().is_empty() {
            return Err(anyhow!("registry.wp_binary is required for the wp-cli backend"));
        }
        Ok(())
    }

    pub fn homepage(&self) -> Result<Url> {
        Url::parse(&self.site.homepage)
            .with_context(|| format!("invalid homepage URL {:?}", self.site.homepage))
    }

    pub fn fetcher_config(&self) -> FetcherConfig {
        FetcherConfig {
            user_agent: self.site.user_agent.clone(),
            follow_redirects: self.site.follow_redirects,
            cache_bust: self.site.cache_bust,
        }
    }

    pub fn settings(&self) -> Result<ProfilerSettings> {
        let mut settings = ProfilerSettings::new(self.homepage()?);
        settings.timeout = Duration::from_millis(self.site.timeout_ms);
        settings.baseline = self.profiler.baseline;
        settings.auto_recover = self.profiler.auto_recover;
        settings.journal_path = self.profiler.journal_path.clone();
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ProfilerConfig::default();
        config.validate().unwrap();
        assert_eq!(config.site.timeout_ms, 30_000);

        let settings = config.settings().unwrap();
        assert_eq!(settings.timeout, Duration::from_secs(30));
        assert!(settings.baseline);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = ProfilerConfig::default();
        config.site.homepage = "not a url".to_string();
        assert!(config.validate().is_err());

        let mut config = ProfilerConfig::default();
        config.site.homepage = "ftp://example.test/".to_string();
        assert!(config.validate().is_err());

        let mut config = ProfilerConfig::default();
        config.site.timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = ProfilerConfig::default();
        config.registry.wp_binary = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_layers_file_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profiler.toml");
        std::fs::write(
            &path,
            r#"
[site]
homepage = "https://shop.example.test/"
timeout_ms = 5000

[registry]
backend = "file"
state_file = "/var/lib/site/plugins.json"
"#,
        )
        .unwrap();

        let config = ProfilerConfig::load(path.to_str()).unwrap();
        assert_eq!(config.site.homepage, "https://shop.example.test/");
        assert_eq!(config.site.timeout_ms, 5000);
        assert_eq!(config.registry.backend, RegistryBackend::File);
        // untouched keys keep their defaults
        assert!(config.site.follow_redirects);
        assert_eq!(config.registry.wp_binary, "wp");
    }

    #[test]
    fn test_environment_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profiler.toml");
        std::fs::write(&path, "[site]\nuser_agent = \"from-file\"\n").unwrap();

        std::env::set_var("PLUGIN_PROFILER__SITE__USER_AGENT", "from-env");
        std::env::set_var("PLUGIN_PROFILER__PROFILER__JOURNAL_PATH", "/var/run/profiler.json");
        let loaded = ProfilerConfig::load(path.to_str());
        std::env::remove_var("PLUGIN_PROFILER__SITE__USER_AGENT");
        std::env::remove_var("PLUGIN_PROFILER__PROFILER__JOURNAL_PATH");

        let config = loaded.unwrap();
        assert_eq!(config.site.user_agent, "from-env");
        assert_eq!(
            config.profiler.journal_path,
            Some(PathBuf::from("/var/run/profiler.json"))
        );
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profiler.toml");
        let path = path.to_str().unwrap();

        let mut config = ProfilerConfig::default();
        config.profiler.auto_recover = true;
        config.save_to_file(path).unwrap();

        let loaded = ProfilerConfig::load(Some(path)).unwrap();
        assert!(loaded.profiler.auto_recover);
        assert_eq!(loaded.site.homepage, config.site.homepage);
    }
}
