//! Shared fixtures: an in-memory site whose homepage speed depends on
//! which plugin is active.

#![allow(dead_code)]

use async_trait::async_trait;
use plugin_profiler::homepage_probe::{FetchError, FetchResponse, HomepageFetcher};
use plugin_profiler::latency_profiler::{Profiler, ProfilerSettings};
use plugin_profiler::plugin_registry::{
    ActivationSnapshot, InMemoryRegistry, PluginDescriptor, PluginRegistry,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone)]
pub enum Behavior {
    Delay(Duration),
    Timeout,
    Status(u16),
    Panic,
}

/// Fetcher that looks at the live activation set and behaves according to
/// the single active plugin. Records every activation set it observed.
pub struct SiteFetcher {
    registry: Arc<InMemoryRegistry>,
    behaviors: HashMap<String, Behavior>,
    observed: Mutex<Vec<ActivationSnapshot>>,
}

impl SiteFetcher {
    pub fn new(registry: Arc<InMemoryRegistry>) -> Self {
        Self {
            registry,
            behaviors: HashMap::new(),
            observed: Mutex::new(Vec::new()),
        }
    }

    pub fn with(mut self, slug: &str, behavior: Behavior) -> Self {
        self.behaviors.insert(slug.to_string(), behavior);
        self
    }

    pub fn observed(&self) -> Vec<ActivationSnapshot> {
        self.observed.lock().unwrap().clone()
    }
}

#[async_trait]
impl HomepageFetcher for SiteFetcher {
    async fn fetch(&self, _url: &Url, timeout: Duration) -> Result<FetchResponse, FetchError> {
        let active = self.registry.get_active_plugins().unwrap();
        self.observed.lock().unwrap().push(active.clone());

        let behavior = active
            .iter()
            .find_map(|slug| self.behaviors.get(slug))
            .cloned()
            .unwrap_or(Behavior::Delay(Duration::ZERO));

        match behavior {
            Behavior::Delay(delay) => {
                tokio::time::sleep(delay).await;
                Ok(FetchResponse {
                    status: 200,
                    elapsed_ms: delay.as_secs_f64() * 1000.0,
                })
            }
            Behavior::Timeout => Err(FetchError::Timeout {
                timeout_ms: timeout.as_millis() as u64,
            }),
            Behavior::Status(status) => Err(FetchError::Status { status }),
            Behavior::Panic => panic!("plugin fataled the site"),
        }
    }
}

pub fn plugins(slugs: &[&str]) -> Vec<PluginDescriptor> {
    slugs
        .iter()
        .map(|slug| PluginDescriptor::new(format!("{slug}/{slug}.php"), slug.to_uppercase()))
        .collect()
}

pub fn slug(name: &str) -> String {
    format!("{name}/{name}.php")
}

pub fn snapshot(names: &[&str]) -> ActivationSnapshot {
    names.iter().map(|name| slug(name)).collect()
}

pub fn site(all: &[&str], active: &[&str]) -> Arc<InMemoryRegistry> {
    Arc::new(InMemoryRegistry::new(plugins(all), snapshot(active)))
}

pub fn settings() -> ProfilerSettings {
    ProfilerSettings::new(Url::parse("http://site.test/").unwrap())
}

pub type TestProfiler = Profiler<Arc<InMemoryRegistry>, Arc<SiteFetcher>>;

pub fn profiler(
    registry: &Arc<InMemoryRegistry>,
    fetcher: SiteFetcher,
    settings: ProfilerSettings,
) -> (TestProfiler, Arc<SiteFetcher>) {
    let fetcher = Arc::new(fetcher);
    (
        Profiler::new(registry.clone(), fetcher.clone(), settings),
        fetcher,
    )
}
