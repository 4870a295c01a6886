use crate::registry::{ensure_installed, PluginRegistry, Result};
use crate::types::{ActivationSnapshot, PluginDescriptor};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// On-disk layout of a [`JsonFileRegistry`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryState {
    pub plugins: Vec<PluginDescriptor>,
    #[serde(default)]
    pub active: ActivationSnapshot,
}

/// Registry persisted as a JSON document.
///
/// Every write re-reads the file, replaces the active set and swaps the new
/// document in with a rename so readers never see a half-written state.
#[derive(Debug)]
pub struct JsonFileRegistry {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileRegistry {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let registry = Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        };
        // fail early on a missing or malformed file
        registry.load()?;
        Ok(registry)
    }

    /// Write a fresh state file and open it.
    pub fn create(path: impl Into<PathBuf>, state: &RegistryState) -> Result<Self> {
        let path = path.into();
        write_atomic(&path, state)?;
        Self::open(path)
    }

    fn load(&self) -> Result<RegistryState> {
        let content = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

fn write_atomic(path: &Path, state: &RegistryState) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    let body = serde_json::to_vec_pretty(state)?;
    fs::write(&tmp, body)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

impl PluginRegistry for JsonFileRegistry {
    fn list_installed_plugins(&self) -> Result<Vec<PluginDescriptor>> {
        Ok(self.load()?.plugins)
    }

    fn get_active_plugins(&self) -> Result<ActivationSnapshot> {
        Ok(self.load()?.active)
    }

    fn set_active_plugins(&self, active: &ActivationSnapshot) -> Result<()> {
        let _guard = self.write_lock.lock();
        let mut state = self.load()?;
        ensure_installed(&state.plugins, active)?;
        state.active = active.clone();
        write_atomic(&self.path, &state)?;
        debug!("Wrote activation set {} to {}", active, self.path.display());
        Ok(())
    }
}
