use crate::registry::{ensure_installed, PluginRegistry, RegistryError, Result};
use crate::types::{ActivationSnapshot, PluginDescriptor};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Registry held entirely in memory.
///
/// Records every activation write so callers can assert on the sequence of
/// states the host went through, and can be told to reject writes.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    installed: Vec<PluginDescriptor>,
    active: RwLock<ActivationSnapshot>,
    history: RwLock<Vec<ActivationSnapshot>>,
    rejected_targets: RwLock<Vec<ActivationSnapshot>>,
    rejections_remaining: AtomicUsize,
    reject_all_after: RwLock<Option<usize>>,
}

impl InMemoryRegistry {
    pub fn new(installed: Vec<PluginDescriptor>, active: ActivationSnapshot) -> Self {
        Self {
            installed,
            active: RwLock::new(active),
            ..Self::default()
        }
    }

    /// Reject every write whose target equals `target`.
    pub fn reject_writes_of(&self, target: ActivationSnapshot) {
        self.rejected_targets.write().push(target);
    }

    /// Reject the next `count` writes regardless of target.
    pub fn reject_next_writes(&self, count: usize) {
        self.rejections_remaining.store(count, Ordering::SeqCst);
    }

    /// Accept `accepted` more writes, then reject all subsequent ones.
    pub fn reject_all_writes_after(&self, accepted: usize) {
        *self.reject_all_after.write() = Some(accepted);
    }

    /// Every activation set successfully written, in order.
    pub fn history(&self) -> Vec<ActivationSnapshot> {
        self.history.read().clone()
    }

    fn should_reject(&self, target: &ActivationSnapshot) -> bool {
        if self.rejected_targets.read().iter().any(|t| t == target) {
            return true;
        }
        if self
            .rejections_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return true;
        }
        match *self.reject_all_after.read() {
            Some(accepted) => self.history.read().len() >= accepted,
            None => false,
        }
    }
}

impl PluginRegistry for InMemoryRegistry {
    fn list_installed_plugins(&self) -> Result<Vec<PluginDescriptor>> {
        Ok(self.installed.clone())
    }

    fn get_active_plugins(&self) -> Result<ActivationSnapshot> {
        Ok(self.active.read().clone())
    }

    fn set_active_plugins(&self, active: &ActivationSnapshot) -> Result<()> {
        ensure_installed(&self.installed, active)?;
        if self.should_reject(active) {
            return Err(RegistryError::Rejected {
                reason: format!("write of {} refused", active),
            });
        }
        *self.active.write() = active.clone();
        self.history.write().push(active.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> InMemoryRegistry {
        InMemoryRegistry::new(
            vec![
                PluginDescriptor::new("a/a.php", "A"),
                PluginDescriptor::new("b/b.php", "B"),
            ],
            ["a/a.php"].into_iter().collect(),
        )
    }

    #[test]
    fn test_set_and_get() {
        let registry = registry();
        let target: ActivationSnapshot = ["a/a.php", "b/b.php"].into_iter().collect();
        registry.set_active_plugins(&target).unwrap();
        assert_eq!(registry.get_active_plugins().unwrap(), target);
        assert_eq!(registry.history(), vec![target]);
    }

    #[test]
    fn test_unknown_plugin_rejected() {
        let registry = registry();
        let err = registry
            .set_active_plugins(&ActivationSnapshot::only("ghost/ghost.php"))
            .unwrap_err();
        assert!(matches!(err, RegistryError::UnknownPlugin { .. }));
    }

    #[test]
    fn test_reject_next_writes() {
        let registry = registry();
        registry.reject_next_writes(1);
        assert!(registry.set_active_plugins(&ActivationSnapshot::empty()).is_err());
        assert!(registry.set_active_plugins(&ActivationSnapshot::empty()).is_ok());
    }

    #[test]
    fn test_reject_specific_target() {
        let registry = registry();
        registry.reject_writes_of(ActivationSnapshot::only("b/b.php"));
        assert!(registry.set_active_plugins(&ActivationSnapshot::only("b/b.php")).is_err());
        assert!(registry.set_active_plugins(&ActivationSnapshot::only("a/a.php")).is_ok());
        assert_eq!(registry.get_active_plugins().unwrap(), ActivationSnapshot::only("a/a.php"));
    }

    #[test]
    fn test_reject_all_after() {
        let registry = registry();
        registry.reject_all_writes_after(1);
        assert!(registry.set_active_plugins(&ActivationSnapshot::empty()).is_ok());
        assert!(registry.set_active_plugins(&ActivationSnapshot::only("a/a.php")).is_err());
        assert_eq!(registry.get_active_plugins().unwrap(), ActivationSnapshot::empty());
    }
}
