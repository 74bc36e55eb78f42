use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{AddonError, Result};

/// Metadata declared inside an uploaded addon package.
///
/// Uploads carry a JSON manifest describing the module; the surrounding
/// archive format is opaque to this subsystem.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AddonManifest {
    pub name: String,
    pub version: String,

    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub description: String,

    /// Permission scopes the module requests from the platform.
    #[serde(default)]
    pub permissions: BTreeSet<String>,

    /// Lowest platform version the module supports, if it declares one.
    #[serde(default)]
    pub min_platform_version: Option<String>,

    /// Whether the module ships a settings surface for the console.
    #[serde(default)]
    pub has_settings: bool,

    /// Whether the module should be enabled right after install.
    #[serde(default)]
    pub default_enabled: bool,
}

impl AddonManifest {
    /// Parse a manifest from the raw bytes of an uploaded package.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let manifest: AddonManifest = serde_json::from_slice(bytes)
            .map_err(|err| AddonError::InvalidManifest(err.to_string()))?;
        manifest.check_required_fields()?;
        Ok(manifest)
    }

    fn check_required_fields(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(AddonError::InvalidManifest(
                "manifest field 'name' is empty".to_string(),
            ));
        }
        if self.version.trim().is_empty() {
            return Err(AddonError::InvalidManifest(
                "manifest field 'version' is empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_manifest() {
        let manifest =
            AddonManifest::from_bytes(br#"{"name": "Blood Analytics", "version": "1.2.0"}"#)
                .unwrap();

        assert_eq!(manifest.name, "Blood Analytics");
        assert_eq!(manifest.version, "1.2.0");
        assert!(manifest.permissions.is_empty());
        assert!(manifest.min_platform_version.is_none());
        assert!(!manifest.default_enabled);
    }

    #[test]
    fn parses_full_manifest() {
        let manifest = AddonManifest::from_bytes(
            br#"{
                "name": "SMS Reminders",
                "version": "2.1",
                "author": "Lifelink Labs",
                "description": "Appointment reminders over SMS",
                "permissions": ["donors.read", "notifications.send"],
                "min_platform_version": "0.1.0",
                "has_settings": true
            }"#,
        )
        .unwrap();

        assert!(manifest.has_settings);
        assert_eq!(manifest.permissions.len(), 2);
        assert_eq!(manifest.min_platform_version.as_deref(), Some("0.1.0"));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = AddonManifest::from_bytes(b"not a manifest").unwrap_err();
        assert!(matches!(err, AddonError::InvalidManifest(_)));
    }

    #[test]
    fn rejects_blank_required_fields() {
        let err = AddonManifest::from_bytes(br#"{"name": " ", "version": "1.0"}"#).unwrap_err();
        assert!(matches!(err, AddonError::InvalidManifest(_)));

        let err = AddonManifest::from_bytes(br#"{"name": "X", "version": ""}"#).unwrap_err();
        assert!(matches!(err, AddonError::InvalidManifest(_)));
    }
}
