//! Owned cell for the global module settings.
//!
//! The store lives inside the manager's state lock, so settings reads and
//! patches serialize with registry mutations and tests can construct
//! independent instances per case.

use tracing::info;

use lifelink_types::{ModuleSettings, SettingsPatch};

#[derive(Debug, Clone, Default)]
pub struct SettingsStore {
    current: ModuleSettings,
}

impl SettingsStore {
    pub fn new(settings: ModuleSettings) -> Self {
        Self { current: settings }
    }

    pub fn get(&self) -> ModuleSettings {
        self.current
    }

    /// Merge a partial update and return the resulting settings.
    pub fn apply(&mut self, patch: &SettingsPatch) -> ModuleSettings {
        let previous = self.current;
        self.current.apply(patch);

        if self.current != previous {
            info!(
                "module settings changed: auto_updates={} compatibility_check={} development_mode={} security_scanning={}",
                self.current.auto_updates,
                self.current.compatibility_check,
                self.current.development_mode,
                self.current.security_scanning
            );
        }

        self.current
    }
}
