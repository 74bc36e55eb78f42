use thiserror::Error;

#[derive(Error, Debug)]
pub enum AddonError {
    #[error("Unsupported package format: '{0}'")]
    UnsupportedFormat(String),

    #[error("Invalid package manifest: {0}")]
    InvalidManifest(String),

    #[error("Package '{name}' rejected by security scan: {reason}")]
    SecurityRejected { name: String, reason: String },

    #[error("Package '{name}' requires platform {required}, running platform is {running}")]
    IncompatiblePackage {
        name: String,
        required: String,
        running: String,
    },

    #[error("A module named '{0}' is already installed")]
    NameCollision(String),

    #[error("Module '{0}' not found")]
    ModuleNotFound(String),

    #[error("Module '{0}' is a core module and cannot be removed")]
    ProtectedModule(String),

    #[error("Version '{candidate}' does not advance installed version '{installed}'")]
    VersionRegression { installed: String, candidate: String },

    #[error("Addon '{0}' not found in the repository catalog")]
    NotFoundInCatalog(String),

    #[error("Invalid version string: '{0}'")]
    InvalidVersion(String),

    #[error("Module '{0}' has no pending update")]
    UpToDate(String),

    #[error("Security scan timed out")]
    Timeout,
}

pub type Result<T> = std::result::Result<T, AddonError>;

impl AddonError {
    /// Whether retrying the same operation could succeed without any change
    /// to the candidate or the registry.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, AddonError::Timeout)
    }

    /// Expected rejections of caller input, as opposed to internal failures.
    pub fn is_user_error(&self) -> bool {
        match self {
            AddonError::UnsupportedFormat(_) => true,
            AddonError::InvalidManifest(_) => true,
            AddonError::SecurityRejected { .. } => true,
            AddonError::IncompatiblePackage { .. } => true,
            AddonError::NameCollision(_) => true,
            AddonError::ModuleNotFound(_) => true,
            AddonError::ProtectedModule(_) => true,
            AddonError::VersionRegression { .. } => true,
            AddonError::NotFoundInCatalog(_) => true,
            AddonError::InvalidVersion(_) => true,
            AddonError::UpToDate(_) => true,
            AddonError::Timeout => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_recoverable_but_not_user_error() {
        assert!(AddonError::Timeout.is_recoverable());
        assert!(!AddonError::Timeout.is_user_error());
    }

    #[test]
    fn rejection_messages_name_the_module() {
        let err = AddonError::ProtectedModule("Donor Directory".to_string());
        assert!(err.to_string().contains("Donor Directory"));
        assert!(err.is_user_error());

        let err = AddonError::VersionRegression {
            installed: "1.2.0".to_string(),
            candidate: "1.2.0".to_string(),
        };
        assert!(err.to_string().contains("1.2.0"));
    }
}
