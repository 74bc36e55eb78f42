//! The addon lifecycle manager.
//!
//! Single entry point for install, toggle, update, and uninstall. The
//! registry and settings live in one state cell behind a lock; every
//! mutation is a single atomic step. Validation and scanning run entirely
//! before the lock is taken, so a caller that abandons an install or update
//! mid-validation never leaves partial state behind.

use std::collections::BTreeSet;

use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use lifelink_types::{
    AddonModule, InstallSource, ModuleSettings, ModuleStatus, PendingUpdate, RepositoryAddon,
    RepositoryListing, SettingsPatch,
};

use crate::catalog::RepositoryCatalog;
use crate::error::{AddonError, Result};
use crate::events::{AddonEvent, AddonEvents};
use crate::manifest::AddonManifest;
use crate::registry::{AddonRegistry, ModuleQuery, RegistryStats};
use crate::settings::SettingsStore;
use crate::validation::PackageValidator;
use crate::version;

struct ManagerState {
    registry: AddonRegistry,
    settings: SettingsStore,
}

/// Orchestrates the addon module lifecycle against a shared registry.
pub struct AddonManager {
    state: RwLock<ManagerState>,
    catalog: RepositoryCatalog,
    validator: PackageValidator,
    events: AddonEvents,
}

impl AddonManager {
    pub fn new(
        registry: AddonRegistry,
        catalog: RepositoryCatalog,
        validator: PackageValidator,
        settings: ModuleSettings,
    ) -> Self {
        Self {
            state: RwLock::new(ManagerState {
                registry,
                settings: SettingsStore::new(settings),
            }),
            catalog,
            validator,
            events: AddonEvents::new(),
        }
    }

    /// A manager seeded with the platform's core modules and bundled
    /// repository catalog.
    pub fn with_defaults() -> Self {
        Self::new(
            AddonRegistry::with_core_modules(),
            RepositoryCatalog::bundled(),
            PackageValidator::new(),
            ModuleSettings::default(),
        )
    }

    // Queries

    pub async fn list_installed(&self) -> Vec<AddonModule> {
        self.state.read().await.registry.list()
    }

    pub async fn get_module(&self, id: &str) -> Result<AddonModule> {
        self.state
            .read()
            .await
            .registry
            .get(id)
            .ok_or_else(|| AddonError::ModuleNotFound(id.to_string()))
    }

    pub async fn find_modules(&self, query: &ModuleQuery) -> Vec<AddonModule> {
        self.state.read().await.registry.find(query)
    }

    pub async fn stats(&self) -> RegistryStats {
        self.state.read().await.registry.stats()
    }

    /// Catalog entries joined against the current registry snapshot.
    pub async fn list_repository(&self) -> Vec<RepositoryListing> {
        let state = self.state.read().await;
        self.catalog.listings(&state.registry)
    }

    pub fn catalog(&self) -> &RepositoryCatalog {
        &self.catalog
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AddonEvent> {
        self.events.subscribe()
    }

    // Settings

    pub async fn settings(&self) -> ModuleSettings {
        self.state.read().await.settings.get()
    }

    /// Merge a partial settings update. Takes effect for all subsequent
    /// operations; installed modules keep their status.
    pub async fn update_settings(&self, patch: &SettingsPatch) -> ModuleSettings {
        self.state.write().await.settings.apply(patch)
    }

    // Lifecycle operations

    /// Install an uploaded package. A candidate whose name is already
    /// installed is redirected into the update path instead of creating a
    /// duplicate record.
    pub async fn install(&self, file_name: &str, bytes: &[u8]) -> Result<AddonModule> {
        let settings = self.settings().await;
        let manifest = self
            .validator
            .validate_upload(file_name, bytes, &settings)
            .await?;

        self.commit_install(
            manifest,
            InstallSource::Upload {
                file_name: file_name.to_string(),
            },
            &settings,
        )
        .await
    }

    /// Install an addon from the repository catalog by its catalog id.
    pub async fn install_from_repository(&self, addon_id: &str) -> Result<AddonModule> {
        let addon = self
            .catalog
            .get(addon_id)
            .cloned()
            .ok_or_else(|| AddonError::NotFoundInCatalog(addon_id.to_string()))?;

        let settings = self.settings().await;
        let manifest = Self::manifest_from_repository(&addon);
        self.validator.validate_candidate(&manifest, &settings).await?;

        self.commit_install(
            manifest,
            InstallSource::Repository { addon_id: addon.id },
            &settings,
        )
        .await
    }

    /// Flip a module's activation.
    pub async fn toggle(&self, id: &str) -> Result<AddonModule> {
        let mut state = self.state.write().await;
        let module = state.registry.toggle(id)?;
        debug!("toggled '{}', status now {}", module.name, module.status);
        Ok(module)
    }

    /// Apply a module's pending update, restoring its remembered
    /// activation. The pending candidate is re-validated first; on failure
    /// the module stays `NeedsUpdate` with its version unchanged.
    pub async fn update(&self, id: &str) -> Result<AddonModule> {
        let (manifest, settings) = {
            let state = self.state.read().await;
            let module = state
                .registry
                .get(id)
                .ok_or_else(|| AddonError::ModuleNotFound(id.to_string()))?;
            let pending = module
                .pending_update
                .as_ref()
                .ok_or_else(|| AddonError::UpToDate(module.name.clone()))?;
            (
                Self::manifest_from_pending(&module.name, pending),
                state.settings.get(),
            )
        };

        self.validator.validate_candidate(&manifest, &settings).await?;

        let mut state = self.state.write().await;
        let updated = state.registry.apply_update(id)?;
        drop(state);

        info!("updated '{}' to {}", updated.name, updated.version);
        self.events.publish(AddonEvent::updated(&updated));
        Ok(updated)
    }

    /// Remove a module. Core modules are protected and removal is final.
    pub async fn uninstall(&self, id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let removed = state.registry.remove(id)?;
        drop(state);

        info!("uninstalled '{}'", removed.name);
        self.events.publish(AddonEvent::uninstalled(&removed));
        Ok(())
    }

    /// Walk the catalog against installed modules. Newer versions apply
    /// immediately when auto-updates are on, otherwise they are parked as
    /// pending. Returns the affected modules.
    pub async fn check_updates(&self) -> Result<Vec<AddonModule>> {
        let settings = self.settings().await;

        let candidates: Vec<(String, RepositoryAddon)> = {
            let state = self.state.read().await;
            self.catalog
                .addons()
                .iter()
                .filter_map(|addon| {
                    state.registry.find_by_name(&addon.name).and_then(|module| {
                        version::is_newer(&addon.version, &module.version)
                            .then(|| (module.id.clone(), addon.clone()))
                    })
                })
                .collect()
        };

        let mut affected = Vec::new();
        for (id, addon) in candidates {
            let manifest = Self::manifest_from_repository(&addon);
            if let Err(err) = self.validator.validate_candidate(&manifest, &settings).await {
                warn!("skipping catalog update for '{}': {}", addon.name, err);
                continue;
            }

            let mut state = self.state.write().await;
            // Re-check under the lock; the module may have changed since
            // the snapshot.
            let module = match state.registry.get(&id) {
                Some(module) => module,
                None => continue,
            };
            if !version::is_newer(&addon.version, &module.version) {
                continue;
            }
            if !settings.auto_updates {
                if let Some(pending) = &module.pending_update {
                    if pending.version == addon.version {
                        continue;
                    }
                }
            }

            let pending = Self::pending_from_manifest(
                manifest,
                InstallSource::Repository {
                    addon_id: addon.id.clone(),
                },
            );
            let parked = state.registry.mark_needs_update(&id, pending)?;

            if settings.auto_updates {
                let updated = state.registry.apply_update(&id)?;
                drop(state);
                info!("auto-updated '{}' to {}", updated.name, updated.version);
                self.events.publish(AddonEvent::updated(&updated));
                affected.push(updated);
            } else {
                drop(state);
                info!(
                    "update to {} available for '{}'",
                    addon.version, parked.name
                );
                affected.push(parked);
            }
        }

        Ok(affected)
    }

    // Internal

    /// Commit a validated candidate: fresh record, or redirect into the
    /// update path when the name is already taken. Runs as one atomic step
    /// under the write lock.
    async fn commit_install(
        &self,
        manifest: AddonManifest,
        source: InstallSource,
        settings: &ModuleSettings,
    ) -> Result<AddonModule> {
        let mut state = self.state.write().await;

        let existing = state
            .registry
            .find_by_name(&manifest.name)
            .map(|module| (module.id.clone(), module.version.clone()));

        if let Some((existing_id, installed_version)) = existing {
            debug!(
                "module '{}' already installed, redirecting install to the update path",
                manifest.name
            );
            if !version::is_newer(&manifest.version, &installed_version) {
                return Err(AddonError::VersionRegression {
                    installed: installed_version,
                    candidate: manifest.version,
                });
            }

            let pending = Self::pending_from_manifest(manifest, source);
            let parked = state.registry.mark_needs_update(&existing_id, pending)?;

            if settings.auto_updates {
                let updated = state.registry.apply_update(&existing_id)?;
                drop(state);
                info!("auto-applied update for '{}' to {}", updated.name, updated.version);
                self.events.publish(AddonEvent::updated(&updated));
                return Ok(updated);
            }

            info!("newer version available for '{}', update pending", parked.name);
            return Ok(parked);
        }

        let mut module = AddonModule::new(
            Uuid::new_v4().to_string(),
            manifest.name,
            manifest.version,
            source,
        );
        module.author = manifest.author;
        module.description = manifest.description;
        module.permissions = manifest.permissions;
        module.has_settings = manifest.has_settings;
        if manifest.default_enabled {
            module.status = ModuleStatus::Active;
        }

        let installed = state.registry.insert(module)?;
        drop(state);

        info!(
            "installed '{}'@{} from {}",
            installed.name, installed.version, installed.source
        );
        self.events.publish(AddonEvent::installed(&installed));
        Ok(installed)
    }

    fn manifest_from_repository(addon: &RepositoryAddon) -> AddonManifest {
        AddonManifest {
            name: addon.name.clone(),
            version: addon.version.clone(),
            author: addon.author.clone(),
            description: addon.description.clone(),
            permissions: BTreeSet::new(),
            min_platform_version: None,
            has_settings: false,
            default_enabled: false,
        }
    }

    fn manifest_from_pending(name: &str, pending: &PendingUpdate) -> AddonManifest {
        AddonManifest {
            name: name.to_string(),
            version: pending.version.clone(),
            author: pending.author.clone(),
            description: pending.description.clone(),
            permissions: pending.permissions.clone(),
            min_platform_version: pending.min_platform_version.clone(),
            has_settings: pending.has_settings,
            default_enabled: false,
        }
    }

    fn pending_from_manifest(manifest: AddonManifest, source: InstallSource) -> PendingUpdate {
        PendingUpdate {
            version: manifest.version,
            author: manifest.author,
            description: manifest.description,
            permissions: manifest.permissions,
            min_platform_version: manifest.min_platform_version,
            has_settings: manifest.has_settings,
            source,
            // The registry fills this from the module's current status.
            resume_active: false,
        }
    }
}
