use crate::types::{ActivationSnapshot, PluginDescriptor};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry rejected activation write: {reason}")]
    Rejected { reason: String },

    #[error("plugin {slug} is not installed")]
    UnknownPlugin { slug: String },

    #[error("`{command}` exited with {status}: {stderr}")]
    Command {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("registry I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed registry data: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RegistryError>;

/// Host plugin registry: the source of installed plugins and the owner of
/// the live activation set.
pub trait PluginRegistry {
    /// Installed plugins in the host's deterministic order.
    fn list_installed_plugins(&self) -> Result<Vec<PluginDescriptor>>;

    fn get_active_plugins(&self) -> Result<ActivationSnapshot>;

    /// Replace the live activation set with exactly `active`.
    fn set_active_plugins(&self, active: &ActivationSnapshot) -> Result<()>;
}

impl<R: PluginRegistry + ?Sized> PluginRegistry for &R {
    fn list_installed_plugins(&self) -> Result<Vec<PluginDescriptor>> {
        (**self).list_installed_plugins()
    }

    fn get_active_plugins(&self) -> Result<ActivationSnapshot> {
        (**self).get_active_plugins()
    }

    fn set_active_plugins(&self, active: &ActivationSnapshot) -> Result<()> {
        (**self).set_active_plugins(active)
    }
}

impl<R: PluginRegistry + ?Sized> PluginRegistry for Box<R> {
    fn list_installed_plugins(&self) -> Result<Vec<PluginDescriptor>> {
        (**self).list_installed_plugins()
    }

    fn get_active_plugins(&self) -> Result<ActivationSnapshot> {
        (**self).get_active_plugins()
    }

    fn set_active_plugins(&self, active: &ActivationSnapshot) -> Result<()> {
        (**self).set_active_plugins(active)
    }
}

impl<R: PluginRegistry + ?Sized> PluginRegistry for std::sync::Arc<R> {
    fn list_installed_plugins(&self) -> Result<Vec<PluginDescriptor>> {
        (**self).list_installed_plugins()
    }

    fn get_active_plugins(&self) -> Result<ActivationSnapshot> {
        (**self).get_active_plugins()
    }

    fn set_active_plugins(&self, active: &ActivationSnapshot) -> Result<()> {
        (**self).set_active_plugins(active)
    }
}

/// Reject any slug in `active` that is not among `installed`.
pub(crate) fn ensure_installed(
    installed: &[PluginDescriptor],
    active: &ActivationSnapshot,
) -> Result<()> {
    for slug in active.iter() {
        if !installed.iter().any(|p| p.slug == slug) {
            return Err(RegistryError::UnknownPlugin {
                slug: slug.to_string(),
            });
        }
    }
    Ok(())
}
