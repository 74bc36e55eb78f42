//! The authoritative in-memory collection of installed modules.
//!
//! Every status and version change goes through the methods here, which
//! enforce name uniqueness, core-module protection, and version
//! monotonicity. Callers receive clones; the registry owns the records.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use lifelink_types::{AddonModule, ModuleStatus, PendingUpdate};

use crate::error::{AddonError, Result};
use crate::version;

/// Query parameters for finding installed modules.
#[derive(Debug, Clone, Default)]
pub struct ModuleQuery {
    pub name_pattern: Option<String>,
    pub status: Option<ModuleStatus>,
    pub core: Option<bool>,
}

impl ModuleQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.name_pattern = Some(pattern.into());
        self
    }

    pub fn with_status(mut self, status: ModuleStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn core_only(mut self) -> Self {
        self.core = Some(true);
        self
    }
}

/// Aggregate view of the registry contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryStats {
    pub total_modules: usize,
    pub active: usize,
    pub inactive: usize,
    pub needs_update: usize,
    pub core_modules: usize,
    pub last_changed: Option<DateTime<Utc>>,
}

/// In-memory module registry keyed by module id.
#[derive(Debug, Default)]
pub struct AddonRegistry {
    modules: HashMap<String, AddonModule>,
    last_changed: Option<DateTime<Utc>>,
}

/// The platform's bundled core capabilities, seeded at startup.
pub fn default_core_modules() -> Vec<AddonModule> {
    vec![
        AddonModule::core("core-donor-directory", "Donor Directory", "2.4.0")
            .with_author("Lifelink Team")
            .with_description("Donor records, eligibility tracking and contact history")
            .with_permissions(["donors.read", "donors.write"])
            .with_settings_surface(),
        AddonModule::core("core-donation-processing", "Donation Processing", "2.4.0")
            .with_author("Lifelink Team")
            .with_description("Donation intake, receipts and gateway routing")
            .with_permissions(["donations.read", "donations.write"]),
        AddonModule::core("core-notification-center", "Notification Center", "1.8.2")
            .with_author("Lifelink Team")
            .with_description("Email and in-app notifications for staff and donors")
            .with_permissions(["notifications.send"])
            .with_settings_surface(),
    ]
}

impl AddonRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-seeded with the platform's core modules.
    pub fn with_core_modules() -> Self {
        Self::seeded(default_core_modules())
    }

    /// Seed a registry from a fixed module list, skipping name duplicates.
    pub fn seeded(modules: Vec<AddonModule>) -> Self {
        let mut registry = Self::new();
        for module in modules {
            if let Err(err) = registry.insert(module) {
                warn!("skipping seeded module: {}", err);
            }
        }
        registry
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<AddonModule> {
        self.modules.get(id).cloned()
    }

    pub fn find_by_name(&self, name: &str) -> Option<&AddonModule> {
        self.modules.values().find(|module| module.name == name)
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.find_by_name(name).is_some()
    }

    /// All installed modules, ordered by name for stable listings.
    pub fn list(&self) -> Vec<AddonModule> {
        let mut modules: Vec<AddonModule> = self.modules.values().cloned().collect();
        modules.sort_by(|a, b| a.name.cmp(&b.name));
        modules
    }

    pub fn find(&self, query: &ModuleQuery) -> Vec<AddonModule> {
        let mut modules: Vec<AddonModule> = self
            .modules
            .values()
            .filter(|module| Self::matches_query(module, query))
            .cloned()
            .collect();
        modules.sort_by(|a, b| a.name.cmp(&b.name));
        modules
    }

    fn matches_query(module: &AddonModule, query: &ModuleQuery) -> bool {
        if let Some(ref pattern) = query.name_pattern {
            if !module.name.to_lowercase().contains(&pattern.to_lowercase()) {
                return false;
            }
        }

        if let Some(status) = query.status {
            if module.status != status {
                return false;
            }
        }

        if let Some(core) = query.core {
            if module.is_core != core {
                return false;
            }
        }

        true
    }

    /// Add a new module record. Name uniqueness is enforced here; callers
    /// that see `NameCollision` redirect into the update path instead.
    pub fn insert(&mut self, module: AddonModule) -> Result<AddonModule> {
        if self.contains_name(&module.name) {
            return Err(AddonError::NameCollision(module.name));
        }

        debug!("registering module '{}'@{}", module.name, module.version);
        self.modules.insert(module.id.clone(), module.clone());
        self.touch();
        Ok(module)
    }

    /// Flip a module's activation. For a module pending update this flips
    /// the remembered activation that will be restored when the update is
    /// applied; the visible status stays `NeedsUpdate`.
    pub fn toggle(&mut self, id: &str) -> Result<AddonModule> {
        let module = self
            .modules
            .get_mut(id)
            .ok_or_else(|| AddonError::ModuleNotFound(id.to_string()))?;

        match module.status {
            ModuleStatus::Active => module.status = ModuleStatus::Inactive,
            ModuleStatus::Inactive => module.status = ModuleStatus::Active,
            ModuleStatus::NeedsUpdate => {
                if let Some(pending) = module.pending_update.as_mut() {
                    pending.resume_active = !pending.resume_active;
                }
            }
        }

        self.touch();
        Ok(self.modules[id].clone())
    }

    /// Park a newer candidate on a module. The current activation is
    /// remembered in the pending record; a module already pending keeps its
    /// remembered activation and only the candidate is replaced.
    pub fn mark_needs_update(&mut self, id: &str, mut pending: PendingUpdate) -> Result<AddonModule> {
        let module = self
            .modules
            .get_mut(id)
            .ok_or_else(|| AddonError::ModuleNotFound(id.to_string()))?;

        pending.resume_active = match module.status {
            ModuleStatus::Active => true,
            ModuleStatus::Inactive => false,
            ModuleStatus::NeedsUpdate => module
                .pending_update
                .as_ref()
                .map(|previous| previous.resume_active)
                .unwrap_or(false),
        };

        debug!(
            "marking '{}' for update {} -> {}",
            module.name, module.version, pending.version
        );
        module.status = ModuleStatus::NeedsUpdate;
        module.pending_update = Some(pending);
        let updated = module.clone();
        self.touch();
        Ok(updated)
    }

    /// Apply a parked update: bump the version (strictly increasing) and
    /// restore the remembered activation. On failure nothing changes.
    pub fn apply_update(&mut self, id: &str) -> Result<AddonModule> {
        let module = self
            .modules
            .get_mut(id)
            .ok_or_else(|| AddonError::ModuleNotFound(id.to_string()))?;

        let pending = match module.pending_update.clone() {
            Some(pending) => pending,
            None => return Err(AddonError::UpToDate(module.name.clone())),
        };

        match version::compare(&pending.version, &module.version)? {
            Ordering::Greater => {}
            _ => {
                return Err(AddonError::VersionRegression {
                    installed: module.version.clone(),
                    candidate: pending.version,
                });
            }
        }

        module.version = pending.version;
        module.author = pending.author;
        module.description = pending.description;
        module.permissions = pending.permissions;
        module.has_settings = pending.has_settings;
        module.source = pending.source;
        module.status = if pending.resume_active {
            ModuleStatus::Active
        } else {
            ModuleStatus::Inactive
        };
        module.pending_update = None;
        module.updated_at = Some(Utc::now());

        self.touch();
        Ok(self.modules[id].clone())
    }

    /// Remove a module. Core modules never leave the registry.
    pub fn remove(&mut self, id: &str) -> Result<AddonModule> {
        match self.modules.get(id) {
            None => return Err(AddonError::ModuleNotFound(id.to_string())),
            Some(module) if module.is_core => {
                return Err(AddonError::ProtectedModule(module.name.clone()));
            }
            Some(_) => {}
        }

        let removed = self
            .modules
            .remove(id)
            .ok_or_else(|| AddonError::ModuleNotFound(id.to_string()))?;
        debug!("removed module '{}'", removed.name);
        self.touch();
        Ok(removed)
    }

    pub fn stats(&self) -> RegistryStats {
        let mut stats = RegistryStats {
            total_modules: self.modules.len(),
            active: 0,
            inactive: 0,
            needs_update: 0,
            core_modules: 0,
            last_changed: self.last_changed,
        };

        for module in self.modules.values() {
            match module.status {
                ModuleStatus::Active => stats.active += 1,
                ModuleStatus::Inactive => stats.inactive += 1,
                ModuleStatus::NeedsUpdate => stats.needs_update += 1,
            }
            if module.is_core {
                stats.core_modules += 1;
            }
        }

        stats
    }

    fn touch(&mut self) {
        self.last_changed = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lifelink_types::InstallSource;
    use std::collections::BTreeSet;

    fn module(id: &str, name: &str, version: &str) -> AddonModule {
        AddonModule::new(
            id,
            name,
            version,
            InstallSource::Upload {
                file_name: format!("{}.zip", id),
            },
        )
    }

    fn pending(version: &str) -> PendingUpdate {
        PendingUpdate {
            version: version.to_string(),
            author: "Lifelink Labs".to_string(),
            description: "newer build".to_string(),
            permissions: BTreeSet::new(),
            min_platform_version: None,
            has_settings: false,
            source: InstallSource::Repository {
                addon_id: "repo-entry".to_string(),
            },
            resume_active: false,
        }
    }

    #[test]
    fn insert_enforces_name_uniqueness() {
        let mut registry = AddonRegistry::new();
        registry.insert(module("m-1", "Blood Analytics", "1.0.0")).unwrap();

        let err = registry
            .insert(module("m-2", "Blood Analytics", "2.0.0"))
            .unwrap_err();
        assert!(matches!(err, AddonError::NameCollision(_)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn core_modules_cannot_be_removed() {
        let mut registry = AddonRegistry::with_core_modules();
        let core = registry.find_by_name("Donor Directory").unwrap().clone();

        let before = registry.list();
        let err = registry.remove(&core.id).unwrap_err();
        assert!(matches!(err, AddonError::ProtectedModule(_)));
        assert_eq!(registry.list().len(), before.len());
        assert!(registry.contains_name("Donor Directory"));
    }

    #[test]
    fn toggle_flips_between_active_and_inactive() {
        let mut registry = AddonRegistry::new();
        let installed = registry.insert(module("m-1", "SMS Reminders", "1.0")).unwrap();
        assert_eq!(installed.status, ModuleStatus::Inactive);

        assert_eq!(registry.toggle("m-1").unwrap().status, ModuleStatus::Active);
        assert_eq!(registry.toggle("m-1").unwrap().status, ModuleStatus::Inactive);

        assert!(matches!(
            registry.toggle("missing"),
            Err(AddonError::ModuleNotFound(_))
        ));
    }

    #[test]
    fn pending_update_remembers_activation() {
        let mut registry = AddonRegistry::new();
        registry.insert(module("m-1", "Gift Aid Export", "1.2.0")).unwrap();
        registry.toggle("m-1").unwrap(); // Active

        let parked = registry.mark_needs_update("m-1", pending("1.3.0")).unwrap();
        assert_eq!(parked.status, ModuleStatus::NeedsUpdate);
        assert_eq!(parked.version, "1.2.0");
        assert!(parked.pending_update.as_ref().unwrap().resume_active);

        let updated = registry.apply_update("m-1").unwrap();
        assert_eq!(updated.version, "1.3.0");
        assert_eq!(updated.status, ModuleStatus::Active);
        assert!(updated.pending_update.is_none());
        assert!(updated.updated_at.is_some());
    }

    #[test]
    fn toggle_while_pending_flips_remembered_flag_only() {
        let mut registry = AddonRegistry::new();
        registry.insert(module("m-1", "Gift Aid Export", "1.2.0")).unwrap();
        registry.mark_needs_update("m-1", pending("1.3.0")).unwrap();

        let toggled = registry.toggle("m-1").unwrap();
        assert_eq!(toggled.status, ModuleStatus::NeedsUpdate);
        assert!(toggled.pending_update.as_ref().unwrap().resume_active);

        let updated = registry.apply_update("m-1").unwrap();
        assert_eq!(updated.status, ModuleStatus::Active);
    }

    #[test]
    fn re_marking_keeps_remembered_activation() {
        let mut registry = AddonRegistry::new();
        registry.insert(module("m-1", "Gift Aid Export", "1.2.0")).unwrap();
        registry.toggle("m-1").unwrap(); // Active

        registry.mark_needs_update("m-1", pending("1.3.0")).unwrap();
        let re_marked = registry.mark_needs_update("m-1", pending("1.4.0")).unwrap();

        let pending_update = re_marked.pending_update.unwrap();
        assert_eq!(pending_update.version, "1.4.0");
        assert!(pending_update.resume_active);
    }

    #[test]
    fn apply_update_rejects_regression() {
        let mut registry = AddonRegistry::new();
        registry.insert(module("m-1", "Gift Aid Export", "1.2.0")).unwrap();
        registry.mark_needs_update("m-1", pending("1.2.0")).unwrap();

        let err = registry.apply_update("m-1").unwrap_err();
        assert!(matches!(err, AddonError::VersionRegression { .. }));

        let module = registry.get("m-1").unwrap();
        assert_eq!(module.version, "1.2.0");
        assert_eq!(module.status, ModuleStatus::NeedsUpdate);
    }

    #[test]
    fn apply_update_without_pending_is_up_to_date() {
        let mut registry = AddonRegistry::new();
        registry.insert(module("m-1", "Gift Aid Export", "1.2.0")).unwrap();

        assert!(matches!(
            registry.apply_update("m-1"),
            Err(AddonError::UpToDate(_))
        ));
    }

    #[test]
    fn stats_count_by_status() {
        let mut registry = AddonRegistry::with_core_modules();
        registry.insert(module("m-1", "SMS Reminders", "1.0")).unwrap();
        registry.mark_needs_update("m-1", pending("1.1")).unwrap();

        let stats = registry.stats();
        assert_eq!(stats.total_modules, 4);
        assert_eq!(stats.active, 3);
        assert_eq!(stats.needs_update, 1);
        assert_eq!(stats.core_modules, 3);
        assert!(stats.last_changed.is_some());
    }

    #[test]
    fn query_filters_by_name_status_and_core() {
        let mut registry = AddonRegistry::with_core_modules();
        registry.insert(module("m-1", "SMS Reminders", "1.0")).unwrap();

        let core = registry.find(&ModuleQuery::new().core_only());
        assert_eq!(core.len(), 3);

        let by_name = registry.find(&ModuleQuery::new().with_name_pattern("sms"));
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].name, "SMS Reminders");

        let inactive = registry.find(&ModuleQuery::new().with_status(ModuleStatus::Inactive));
        assert_eq!(inactive.len(), 1);
    }
}
