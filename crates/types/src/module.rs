use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Activation state of an installed module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleStatus {
    Active,
    Inactive,
    NeedsUpdate,
}

impl ModuleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleStatus::Active => "active",
            ModuleStatus::Inactive => "inactive",
            ModuleStatus::NeedsUpdate => "needs_update",
        }
    }
}

impl fmt::Display for ModuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where an installed module came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InstallSource {
    /// Shipped with the platform and seeded at startup.
    Bundled,
    /// Uploaded through the administration console.
    Upload { file_name: String },
    /// Fetched from the addon repository.
    Repository { addon_id: String },
}

impl InstallSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstallSource::Bundled => "bundled",
            InstallSource::Upload { .. } => "upload",
            InstallSource::Repository { .. } => "repository",
        }
    }
}

impl fmt::Display for InstallSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Candidate retained while a module waits for an update to be applied.
///
/// `resume_active` remembers whether the module was active when the newer
/// version was discovered; applying the update restores that state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingUpdate {
    pub version: String,
    pub author: String,
    pub description: String,
    pub permissions: BTreeSet<String>,
    pub min_platform_version: Option<String>,
    pub has_settings: bool,
    pub source: InstallSource,
    pub resume_active: bool,
}

/// An installed addon module, owned by the registry.
///
/// Records are handed out as clones; status and version only change through
/// the registry's lifecycle methods.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddonModule {
    pub id: String,
    pub name: String,
    pub version: String,
    pub status: ModuleStatus,
    pub author: String,
    pub description: String,
    /// Whether the module exposes a configuration surface in the console.
    pub has_settings: bool,
    /// Permission scopes the module declares; empty means none requested.
    pub permissions: BTreeSet<String>,
    /// Core modules are seeded at startup and can never be uninstalled.
    pub is_core: bool,
    pub source: InstallSource,
    pub installed_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Present exactly while `status == NeedsUpdate`.
    pub pending_update: Option<PendingUpdate>,
}

impl AddonModule {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
        source: InstallSource,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: version.into(),
            status: ModuleStatus::Inactive,
            author: String::new(),
            description: String::new(),
            has_settings: false,
            permissions: BTreeSet::new(),
            is_core: false,
            source,
            installed_at: Utc::now(),
            updated_at: None,
            pending_update: None,
        }
    }

    /// A bundled core module: protected from removal and active at creation.
    pub fn core(
        id: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        let mut module = Self::new(id, name, version, InstallSource::Bundled);
        module.is_core = true;
        module.status = ModuleStatus::Active;
        module
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions = permissions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_settings_surface(mut self) -> Self {
        self.has_settings = true;
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == ModuleStatus::Active
    }

    pub fn update_available(&self) -> bool {
        self.status == ModuleStatus::NeedsUpdate
    }
}
