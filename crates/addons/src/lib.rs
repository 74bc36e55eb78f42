//! Lifelink Addons - module lifecycle management for the donation platform
//!
//! This crate tracks the platform's installable feature modules: their
//! activation state, version progression, and installation provenance
//! (bundled core modules, console uploads, or the addon repository). It
//! enforces the rules the administration console relies on: module names
//! are unique, core modules can never be removed, versions only move
//! forward, and every status change goes through the explicit lifecycle.
//!
//! # Example
//!
//! ```rust
//! use lifelink_addons::AddonManager;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Core modules and the bundled repository catalog are seeded.
//! let manager = AddonManager::with_defaults();
//!
//! // Install an addon from the repository.
//! let module = manager.install_from_repository("repo-sms-reminders").await?;
//! println!("installed {}@{}", module.name, module.version);
//!
//! // Enable it.
//! manager.toggle(&module.id).await?;
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod error;
pub mod events;
pub mod manager;
pub mod manifest;
pub mod registry;
pub mod settings;
pub mod validation;
pub mod version;

// Re-export commonly used types
pub use catalog::{CatalogManifest, RepositoryCatalog};
pub use error::{AddonError, Result};
pub use events::{AddonEvent, AddonEventKind, AddonEvents};
pub use lifelink_types::{
    AddonModule, InstallSource, ModuleSettings, ModuleStatus, PendingUpdate, RepositoryAddon,
    RepositoryListing, SettingsPatch,
};
pub use manager::AddonManager;
pub use manifest::AddonManifest;
pub use registry::{default_core_modules, AddonRegistry, ModuleQuery, RegistryStats};
pub use settings::SettingsStore;
pub use validation::{
    PackageValidator, PermissionScanner, ScanReport, SecurityScan, ALLOWED_EXTENSIONS,
    PLATFORM_VERSION,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Initialize the addon subsystem with default configuration.
///
/// Seeds the platform's core modules, loads the bundled repository
/// catalog, and applies the default module settings.
pub fn init_default() -> AddonManager {
    AddonManager::with_defaults()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn init_default_seeds_core_modules() {
        let manager = init_default();

        let installed = manager.list_installed().await;
        assert!(!installed.is_empty());
        assert!(installed.iter().all(|module| module.is_core));
        assert!(installed.iter().all(|module| module.is_active()));

        assert!(!manager.list_repository().await.is_empty());
    }

    #[test]
    fn version_info() {
        assert!(!VERSION.is_empty());
        assert_eq!(NAME, "lifelink_addons");
    }
}
