//! Read-only catalog of addons available from the platform repository.
//!
//! The catalog never records installation state. `installed` and
//! `update_available` are computed per read against a registry snapshot, so
//! a listing can never go stale for longer than one round trip.

use serde::{Deserialize, Serialize};

use lifelink_types::{RepositoryAddon, RepositoryListing};

use crate::error::{AddonError, Result};
use crate::registry::AddonRegistry;
use crate::version;

/// Serialized form of a repository catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogManifest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub addons: Vec<RepositoryAddon>,
}

/// The addons available for remote installation.
#[derive(Debug, Clone, Default)]
pub struct RepositoryCatalog {
    addons: Vec<RepositoryAddon>,
}

impl RepositoryCatalog {
    pub fn new(addons: Vec<RepositoryAddon>) -> Self {
        Self { addons }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a catalog from its JSON manifest.
    pub fn from_json(content: &str) -> Result<Self> {
        let manifest: CatalogManifest = serde_json::from_str(content)
            .map_err(|err| AddonError::InvalidManifest(err.to_string()))?;
        Ok(Self::new(manifest.addons))
    }

    /// The catalog shipped with the platform.
    pub fn bundled() -> Self {
        Self::new(vec![
            RepositoryAddon::new("repo-blood-analytics", "Blood Analytics", "1.3.0")
                .with_author("Lifelink Labs")
                .with_description("Donation trend dashboards and stock forecasting")
                .with_category("analytics"),
            RepositoryAddon::new("repo-sms-reminders", "SMS Reminders", "2.1.0")
                .with_author("Lifelink Labs")
                .with_description("Appointment reminders over SMS")
                .with_category("communication"),
            RepositoryAddon::new("repo-gift-aid-export", "Gift Aid Export", "1.0.4")
                .with_author("Civic Tools")
                .with_description("HMRC gift aid claim exports")
                .with_category("finance"),
            RepositoryAddon::new("repo-volunteer-scheduler", "Volunteer Scheduler", "0.9.2")
                .with_author("Civic Tools")
                .with_description("Shift planning for drive-day volunteers")
                .with_category("operations"),
            RepositoryAddon::new("repo-social-connector", "Social Media Connector", "1.1.0")
                .with_author("Lifelink Labs")
                .with_description("Cross-posting campaigns to social platforms")
                .with_category("communication"),
        ])
    }

    pub fn get(&self, id: &str) -> Option<&RepositoryAddon> {
        self.addons.iter().find(|addon| addon.id == id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&RepositoryAddon> {
        self.addons.iter().find(|addon| addon.name == name)
    }

    pub fn addons(&self) -> &[RepositoryAddon] {
        &self.addons
    }

    pub fn len(&self) -> usize {
        self.addons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addons.is_empty()
    }

    /// Catalog entries annotated against the given registry snapshot.
    pub fn listings(&self, registry: &AddonRegistry) -> Vec<RepositoryListing> {
        self.addons
            .iter()
            .map(|addon| {
                let installed = registry.find_by_name(&addon.name);
                RepositoryListing {
                    addon: addon.clone(),
                    installed: installed.is_some(),
                    update_available: installed
                        .map(|module| version::is_newer(&addon.version, &module.version))
                        .unwrap_or(false),
                }
            })
            .collect()
    }
}
