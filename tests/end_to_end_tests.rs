//! End-to-end tests: configuration, JSON state-file registry and a real
//! HTTP homepage whose speed depends on the active plugin.

use plugin_profiler::config::{ProfilerConfig, RegistryBackend};
use plugin_profiler::latency_profiler::{Classification, ProfileError};
use plugin_profiler::plugin_registry::{
    ActivationSnapshot, JsonFileRegistry, PluginDescriptor, PluginRegistry, RegistryState,
};
use plugin_profiler::report::{render, OutputFormat};
use plugin_profiler::{build_profiler, build_registry};
use std::path::PathBuf;
use std::time::Duration;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Homepage that reads the state file on every request, like a real site
/// loading its active plugins.
struct PluginAwareHomepage {
    state_file: PathBuf,
}

impl Respond for PluginAwareHomepage {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let Ok(registry) = JsonFileRegistry::open(&self.state_file) else {
            return ResponseTemplate::new(500);
        };
        let active = registry.get_active_plugins().unwrap_or_default();
        if active.contains("broken") {
            ResponseTemplate::new(500)
        } else if active.contains("heavy") {
            ResponseTemplate::new(200).set_delay(Duration::from_millis(150))
        } else if active.contains("hang") {
            ResponseTemplate::new(200).set_delay(Duration::from_secs(5))
        } else {
            ResponseTemplate::new(200).set_body_string("<html>ok</html>")
        }
    }
}

fn write_site(dir: &tempfile::TempDir, slugs: &[&str], active: &[&str]) -> PathBuf {
    let state_file = dir.path().join("plugins.json");
    JsonFileRegistry::create(
        &state_file,
        &RegistryState {
            plugins: slugs
                .iter()
                .map(|s| PluginDescriptor::new(*s, s.to_uppercase()))
                .collect(),
            active: active.iter().copied().collect(),
        },
    )
    .unwrap();
    state_file
}

async fn start_site(state_file: &PathBuf) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(PluginAwareHomepage {
            state_file: state_file.clone(),
        })
        .mount(&server)
        .await;
    server
}

fn config(dir: &tempfile::TempDir, state_file: PathBuf, homepage: String) -> ProfilerConfig {
    let mut config = ProfilerConfig::default();
    config.site.homepage = homepage;
    config.site.timeout_ms = 1_000;
    config.registry.backend = RegistryBackend::File;
    config.registry.state_file = state_file;
    config.profiler.journal_path = Some(dir.path().join("journal/run.json"));
    config
}

#[tokio::test]
async fn test_profiles_real_homepage() {
    let dir = tempfile::tempdir().unwrap();
    let state_file = write_site(&dir, &["light", "heavy", "broken", "hang"], &["light", "heavy"]);
    let server = start_site(&state_file).await;
    let config = config(&dir, state_file.clone(), server.uri());

    let profiler = build_profiler(&config).unwrap();
    let report = profiler.run_report().await.unwrap();

    let slugs: Vec<&str> = report.trials.iter().map(|t| t.plugin.slug.as_str()).collect();
    assert_eq!(slugs, vec!["light", "heavy", "broken", "hang"]);

    assert!(report.trials[0].outcome.is_loaded());
    assert_eq!(report.trials[1].classification(), Some(Classification::Slow));
    assert_eq!(
        report.trials[2].outcome.error().as_deref(),
        Some("homepage answered with HTTP 500")
    );
    assert!(report.trials[3].outcome.error().unwrap().contains("timed out"));
    assert!(report.trials[0].load_time_ms() < report.trials[1].load_time_ms());
    assert!(report.baseline.is_some());

    let registry = build_registry(&config).unwrap();
    let expected: ActivationSnapshot = ["light", "heavy"].into_iter().collect();
    assert_eq!(registry.get_active_plugins().unwrap(), expected);
    assert!(!dir.path().join("journal/run.json").exists());

    let csv = render(&report, OutputFormat::Csv, true).unwrap();
    assert_eq!(csv.lines().count(), 5);
}

#[tokio::test]
async fn test_interrupted_run_is_recovered_by_next_process() {
    let dir = tempfile::tempdir().unwrap();
    let state_file = write_site(&dir, &["a", "b"], &["a", "b"]);
    let server = start_site(&state_file).await;
    let config = config(&dir, state_file.clone(), server.uri());

    // what a killed run leaves behind: one plugin isolated plus the journal
    std::fs::create_dir_all(dir.path().join("journal")).unwrap();
    std::fs::write(
        dir.path().join("journal/run.json"),
        format!(
            r#"{{"run_id":"{}","pid":{},"started_at":"2026-01-01T00:00:00Z","snapshot":["a","b"]}}"#,
            uuid::Uuid::new_v4(),
            u32::MAX
        ),
    )
    .unwrap();
    JsonFileRegistry::open(&state_file)
        .unwrap()
        .set_active_plugins(&ActivationSnapshot::only("b"))
        .unwrap();

    let profiler = build_profiler(&config).unwrap();
    let err = profiler.run_report().await.unwrap_err();
    assert!(matches!(err, ProfileError::UncleanShutdown { .. }));

    let restored = profiler.recover().unwrap().unwrap();
    assert_eq!(restored.len(), 2);

    let registry = build_registry(&config).unwrap();
    let expected: ActivationSnapshot = ["a", "b"].into_iter().collect();
    assert_eq!(registry.get_active_plugins().unwrap(), expected);
}

#[tokio::test]
async fn test_table_report_for_site() {
    let dir = tempfile::tempdir().unwrap();
    let state_file = write_site(&dir, &["light"], &[]);
    let server = start_site(&state_file).await;
    let mut config = config(&dir, state_file, server.uri());
    config.profiler.baseline = false;

    let report = build_profiler(&config).unwrap().run_report().await.unwrap();
    let table = render(&report, OutputFormat::Table, false).unwrap();

    assert!(table.contains("LIGHT"));
    assert!(!table.contains("Baseline"));
    assert!(table.contains("1 plugins: 1 fast"));
}
