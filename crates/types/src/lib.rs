//! Shared domain types for the lifelink addon subsystem.
//!
//! This crate carries the data model consumed by the addon manager and the
//! administration UI layer: installed module records, repository catalog
//! entries, and the global module settings. It contains no registry logic;
//! all lifecycle rules live in `lifelink_addons`.

pub mod module;
pub mod repository;
pub mod settings;

pub use module::{AddonModule, InstallSource, ModuleStatus, PendingUpdate};
pub use repository::{RepositoryAddon, RepositoryListing};
pub use settings::{ModuleSettings, SettingsPatch};
