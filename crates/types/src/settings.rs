use serde::{Deserialize, Serialize};

/// Global policy flags for the addon subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleSettings {
    /// Apply newer versions immediately instead of parking them as pending.
    #[serde(default)]
    pub auto_updates: bool,
    /// Check a candidate's minimum platform version before install.
    #[serde(default)]
    pub compatibility_check: bool,
    /// Relax scan and compatibility failures to warnings.
    #[serde(default)]
    pub development_mode: bool,
    /// Run the security scan pass over install candidates.
    #[serde(default)]
    pub security_scanning: bool,
}

impl Default for ModuleSettings {
    fn default() -> Self {
        Self {
            auto_updates: false,
            compatibility_check: true,
            development_mode: false,
            security_scanning: true,
        }
    }
}

impl ModuleSettings {
    /// Merge a partial update; `None` fields leave the flag unchanged.
    pub fn apply(&mut self, patch: &SettingsPatch) {
        if let Some(value) = patch.auto_updates {
            self.auto_updates = value;
        }
        if let Some(value) = patch.compatibility_check {
            self.compatibility_check = value;
        }
        if let Some(value) = patch.development_mode {
            self.development_mode = value;
        }
        if let Some(value) = patch.security_scanning {
            self.security_scanning = value;
        }
    }
}

/// Partial settings update sent by the console.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsPatch {
    #[serde(default)]
    pub auto_updates: Option<bool>,
    #[serde(default)]
    pub compatibility_check: Option<bool>,
    #[serde(default)]
    pub development_mode: Option<bool>,
    #[serde(default)]
    pub security_scanning: Option<bool>,
}

impl SettingsPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn auto_updates(mut self, value: bool) -> Self {
        self.auto_updates = Some(value);
        self
    }

    pub fn compatibility_check(mut self, value: bool) -> Self {
        self.compatibility_check = Some(value);
        self
    }

    pub fn development_mode(mut self, value: bool) -> Self {
        self.development_mode = Some(value);
        self
    }

    pub fn security_scanning(mut self, value: bool) -> Self {
        self.security_scanning = Some(value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.auto_updates.is_none()
            && self.compatibility_check.is_none()
            && self.development_mode.is_none()
            && self.security_scanning.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_merges_only_set_fields() {
        let mut settings = ModuleSettings::default();
        assert!(settings.security_scanning);
        assert!(!settings.auto_updates);

        settings.apply(&SettingsPatch::new().auto_updates(true));

        assert!(settings.auto_updates);
        assert!(settings.security_scanning);
        assert!(settings.compatibility_check);
    }

    #[test]
    fn partial_patch_deserializes_from_sparse_json() {
        let patch: SettingsPatch = serde_json::from_str(r#"{"security_scanning": false}"#).unwrap();

        assert_eq!(patch.security_scanning, Some(false));
        assert!(patch.auto_updates.is_none());
        assert!(!patch.is_empty());
    }
}
