use crate::registry::{ensure_installed, PluginRegistry, RegistryError, Result};
use crate::types::{ActivationSnapshot, PluginDescriptor};
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Command;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct WpPluginRow {
    name: String,
    #[serde(default)]
    title: String,
    status: String,
}

impl WpPluginRow {
    /// Must-use plugins and drop-ins cannot be toggled.
    fn is_toggleable(&self) -> bool {
        matches!(self.status.as_str(), "active" | "inactive")
    }
}

/// Registry backed by a WordPress install driven through WP-CLI.
///
/// Commands run with `--skip-plugins --skip-themes` so a plugin that
/// fatals on load cannot take the registry down with it.
#[derive(Debug, Clone)]
pub struct WpCliRegistry {
    binary: String,
    wp_path: Option<PathBuf>,
}

impl WpCliRegistry {
    pub fn new(binary: impl Into<String>, wp_path: Option<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            wp_path,
        }
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        let mut command = Command::new(&self.binary);
        command.args(args).arg("--skip-plugins").arg("--skip-themes");
        if let Some(path) = &self.wp_path {
            command.arg(format!("--path={}", path.display()));
        }
        debug!("Running {} {}", self.binary, args.join(" "));

        let output = command.output()?;
        if !output.status.success() {
            return Err(RegistryError::Command {
                command: format!("{} {}", self.binary, args.join(" ")),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn rows(&self) -> Result<Vec<WpPluginRow>> {
        let stdout = self.run(&["plugin", "list", "--format=json", "--fields=name,title,status"])?;
        parse_plugin_list(&stdout)
    }
}

fn parse_plugin_list(stdout: &str) -> Result<Vec<WpPluginRow>> {
    let rows: Vec<WpPluginRow> = serde_json::from_str(stdout.trim())?;
    Ok(rows.into_iter().filter(WpPluginRow::is_toggleable).collect())
}

fn descriptors(rows: &[WpPluginRow]) -> Vec<PluginDescriptor> {
    rows.iter()
        .map(|row| {
            let name = if row.title.is_empty() { &row.name } else { &row.title };
            PluginDescriptor::new(row.name.clone(), name.clone())
        })
        .collect()
}

fn active_set(rows: &[WpPluginRow]) -> ActivationSnapshot {
    rows.iter()
        .filter(|row| row.status == "active")
        .map(|row| row.name.as_str())
        .collect()
}

impl PluginRegistry for WpCliRegistry {
    fn list_installed_plugins(&self) -> Result<Vec<PluginDescriptor>> {
        Ok(descriptors(&self.rows()?))
    }

    fn get_active_plugins(&self) -> Result<ActivationSnapshot> {
        Ok(active_set(&self.rows()?))
    }

    fn set_active_plugins(&self, active: &ActivationSnapshot) -> Result<()> {
        let rows = self.rows()?;
        ensure_installed(&descriptors(&rows), active)?;
        let current = active_set(&rows);

        let to_deactivate: Vec<&str> = current.difference(active).collect();
        if !to_deactivate.is_empty() {
            let mut args = vec!["plugin", "deactivate"];
            args.extend(to_deactivate);
            self.run(&args)?;
        }

        let to_activate: Vec<&str> = active.difference(&current).collect();
        if !to_activate.is_empty() {
            let mut args = vec!["plugin", "activate"];
            args.extend(to_activate);
            self.run(&args)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIST: &str = r#"[
        {"name":"akismet","title":"Akismet Anti-spam","status":"active"},
        {"name":"hello","title":"","status":"inactive"},
        {"name":"object-cache","title":"Object Cache","status":"dropin"},
        {"name":"mu-helper","title":"MU Helper","status":"must-use"}
    ]"#;

    #[test]
    fn test_parse_skips_untoggleable_plugins() {
        let rows = parse_plugin_list(LIST).unwrap();
        let plugins = descriptors(&rows);
        assert_eq!(
            plugins,
            vec![
                PluginDescriptor::new("akismet", "Akismet Anti-spam"),
                PluginDescriptor::new("hello", "hello"),
            ]
        );
        assert_eq!(active_set(&rows), ActivationSnapshot::only("akismet"));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = parse_plugin_list("Error: This does not seem to be a WordPress installation.")
            .unwrap_err();
        assert!(matches!(err, RegistryError::Parse(_)));
    }

    #[test]
    fn test_missing_binary_is_io_error() {
        let registry = WpCliRegistry::new("definitely-not-a-wp-cli-binary", None);
        let err = registry.list_installed_plugins().unwrap_err();
        assert!(matches!(err, RegistryError::Io(_)));
    }
}
