use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use plugin_profiler::config::ProfilerConfig;
use plugin_profiler::metrics::{RunMetrics, RunTimer};
use plugin_profiler::plugin_registry::PluginRegistry;
use plugin_profiler::report::{render, OutputFormat};
use plugin_profiler::{build_profiler, build_registry};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "plugin-profiler")]
#[command(about = "Time the site homepage with each plugin active on its own")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Profile every installed plugin and print the report
    Run {
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Slowest plugins first
        #[arg(long)]
        sort: bool,
        /// Skip the no-plugins baseline trial
        #[arg(long)]
        no_baseline: bool,
    },
    /// Restore plugin activation left behind by an interrupted run
    Recover,
    /// List installed plugins and their activation state
    List,
    /// Write a default configuration file
    Init {
        #[arg(default_value = "plugin-profiler.toml")]
        path: String,
    },
}

async fn run(config: ProfilerConfig, format: OutputFormat, output: Option<PathBuf>, sort: bool) -> Result<()> {
    let profiler = build_profiler(&config)?;
    let metrics = RunMetrics::new();
    let timer = RunTimer::start();

    // Dropping the run future on Ctrl+C restores activation before we return.
    let outcome = tokio::select! {
        result = profiler.run_report() => Some(result),
        _ = signal::ctrl_c() => None,
    };
    let Some(outcome) = outcome else {
        warn!("Profiling interrupted by Ctrl+C");
        bail!("profiling run interrupted");
    };

    let report = match outcome {
        Ok(report) => report,
        Err(e) => {
            metrics.record_failure(&e);
            if e.leaves_state_inconsistent() {
                error!("Plugin activation may be inconsistent. Check the plugin list before doing anything else.");
            }
            return Err(e.into());
        }
    };
    metrics.record_report(&report);
    info!(
        "Profiled {} plugins in {:.1}s",
        report.trials.len(),
        timer.finish() / 1000.0
    );

    let rendered = render(&report, format, sort)?;
    match output {
        Some(path) => {
            std::fs::write(&path, rendered)
                .with_context(|| format!("failed to write report to {}", path.display()))?;
            info!("Report written to {}", path.display());
        }
        None => print!("{}", rendered),
    }
    Ok(())
}

fn recover(config: ProfilerConfig) -> Result<()> {
    let profiler = build_profiler(&config)?;
    match profiler.recover()? {
        Some(snapshot) => info!("Restored {} active plugins: {}", snapshot.len(), snapshot),
        None => info!("Nothing to recover"),
    }
    Ok(())
}

fn list(config: ProfilerConfig) -> Result<()> {
    let registry = build_registry(&config)?;
    let active = registry.get_active_plugins()?;
    for plugin in registry.list_installed_plugins()? {
        let state = if active.contains(&plugin.slug) { "active" } else { "inactive" };
        println!("{:<10} {:<40} {}", state, plugin.slug, plugin.name);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Init { path } = &cli.command {
        ProfilerConfig::default().save_to_file(path)?;
        info!("Wrote default configuration to {}", path);
        return Ok(());
    }

    let mut config = ProfilerConfig::load(cli.config.as_deref())?;
    info!("Starting {} v{}", plugin_profiler::NAME, plugin_profiler::VERSION);

    match cli.command {
        Commands::Run {
            format,
            output,
            sort,
            no_baseline,
        } => {
            if no_baseline {
                config.profiler.baseline = false;
            }
            if config.profiler.journal_path.is_none() {
                warn!("No snapshot journal configured; an interrupted run cannot be recovered");
            }
            run(config, format, output, sort).await
        }
        Commands::Recover => recover(config),
        Commands::List => list(config),
        Commands::Init { .. } => Ok(()),
    }
}
