//! Install candidate validation.
//!
//! Candidates are checked before any registry mutation: upload format,
//! manifest contents, an async security scan pass, and a platform
//! compatibility check. Which passes run is controlled by the module
//! settings; in development mode scan and compatibility failures degrade
//! to warnings while the format check stays hard.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use lifelink_types::ModuleSettings;

use crate::error::{AddonError, Result};
use crate::manifest::AddonManifest;
use crate::version;

/// Version the running platform reports to compatibility checks.
pub const PLATFORM_VERSION: &str = "2.4.0";

/// Upload file extensions accepted before any content is read.
pub const ALLOWED_EXTENSIONS: &[&str] = &["zip", "addon"];

const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(30);

/// Check an uploaded file name against the extension allow-list.
pub fn check_format(file_name: &str) -> Result<()> {
    let extension = file_name.rsplit_once('.').map(|(_, ext)| ext);
    match extension {
        Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) => Ok(()),
        _ => Err(AddonError::UnsupportedFormat(file_name.to_string())),
    }
}

/// Outcome of a security scan pass.
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub passed: bool,
    pub findings: Vec<String>,
}

impl ScanReport {
    pub fn clean() -> Self {
        Self {
            passed: true,
            findings: Vec::new(),
        }
    }

    pub fn rejected(findings: Vec<String>) -> Self {
        Self {
            passed: false,
            findings,
        }
    }
}

/// Pass/fail scan over a candidate's declared permissions and metadata.
///
/// The scan stands in for real security analysis; tests substitute an
/// immediate double so no case depends on timing.
#[async_trait]
pub trait SecurityScan: Send + Sync {
    fn scanner_name(&self) -> &str;

    async fn scan(&self, manifest: &AddonManifest) -> Result<ScanReport>;
}

/// Default scanner: rejects permission scopes outside the platform's known
/// scope prefixes and anything that touches platform internals.
pub struct PermissionScanner {
    allowed_scope_prefixes: Vec<String>,
}

impl PermissionScanner {
    pub fn new() -> Self {
        Self {
            allowed_scope_prefixes: [
                "donors.",
                "donations.",
                "volunteers.",
                "campaigns.",
                "organizations.",
                "notifications.",
                "reports.",
                "banners.",
            ]
            .iter()
            .map(|prefix| prefix.to_string())
            .collect(),
        }
    }

    pub fn with_scope_prefixes<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed_scope_prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for PermissionScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecurityScan for PermissionScanner {
    fn scanner_name(&self) -> &str {
        "permission-scope"
    }

    async fn scan(&self, manifest: &AddonManifest) -> Result<ScanReport> {
        let mut findings = Vec::new();

        let name = &manifest.name;
        if name.contains("..") || name.contains('/') || name.contains('\\') {
            findings.push("module name contains path traversal characters".to_string());
        }

        for scope in &manifest.permissions {
            if scope.starts_with("system.") {
                findings.push(format!("permission scope '{}' touches platform internals", scope));
            } else if !self
                .allowed_scope_prefixes
                .iter()
                .any(|prefix| scope.starts_with(prefix))
            {
                findings.push(format!("permission scope '{}' is not a known platform scope", scope));
            }
        }

        if findings.is_empty() {
            Ok(ScanReport::clean())
        } else {
            Ok(ScanReport::rejected(findings))
        }
    }
}

/// Validates install candidates; never mutates the registry.
pub struct PackageValidator {
    platform_version: String,
    scanner: Arc<dyn SecurityScan>,
    scan_timeout: Duration,
}

impl PackageValidator {
    pub fn new() -> Self {
        Self {
            platform_version: PLATFORM_VERSION.to_string(),
            scanner: Arc::new(PermissionScanner::new()),
            scan_timeout: DEFAULT_SCAN_TIMEOUT,
        }
    }

    pub fn with_scanner(mut self, scanner: Arc<dyn SecurityScan>) -> Self {
        self.scanner = scanner;
        self
    }

    pub fn with_platform_version(mut self, version: impl Into<String>) -> Self {
        self.platform_version = version.into();
        self
    }

    pub fn with_scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout = timeout;
        self
    }

    pub fn platform_version(&self) -> &str {
        &self.platform_version
    }

    /// Validate an uploaded package: format first, then manifest, then the
    /// settings-gated passes.
    pub async fn validate_upload(
        &self,
        file_name: &str,
        bytes: &[u8],
        settings: &ModuleSettings,
    ) -> Result<AddonManifest> {
        check_format(file_name)?;
        let manifest = AddonManifest::from_bytes(bytes)?;
        self.validate_candidate(&manifest, settings).await?;
        Ok(manifest)
    }

    /// Run the scan and compatibility passes over a parsed candidate.
    pub async fn validate_candidate(
        &self,
        manifest: &AddonManifest,
        settings: &ModuleSettings,
    ) -> Result<()> {
        if settings.security_scanning {
            self.run_security_scan(manifest, settings).await?;
        } else {
            debug!("security scanning disabled, skipping scan for '{}'", manifest.name);
        }

        if settings.compatibility_check {
            self.check_compatibility(manifest, settings)?;
        }

        Ok(())
    }

    async fn run_security_scan(
        &self,
        manifest: &AddonManifest,
        settings: &ModuleSettings,
    ) -> Result<()> {
        let report = tokio::time::timeout(self.scan_timeout, self.scanner.scan(manifest))
            .await
            .map_err(|_| AddonError::Timeout)??;

        if report.passed {
            debug!(
                "scanner '{}' passed candidate '{}'",
                self.scanner.scanner_name(),
                manifest.name
            );
            return Ok(());
        }

        let reason = report.findings.join("; ");
        if settings.development_mode {
            warn!(
                "development mode: ignoring scan findings for '{}': {}",
                manifest.name, reason
            );
            return Ok(());
        }

        Err(AddonError::SecurityRejected {
            name: manifest.name.clone(),
            reason,
        })
    }

    fn check_compatibility(&self, manifest: &AddonManifest, settings: &ModuleSettings) -> Result<()> {
        let required = match &manifest.min_platform_version {
            Some(version) => version,
            None => return Ok(()),
        };

        match version::compare(&self.platform_version, required) {
            Ok(Ordering::Less) => {
                if settings.development_mode {
                    warn!(
                        "development mode: installing '{}' despite platform requirement {}",
                        manifest.name, required
                    );
                    Ok(())
                } else {
                    Err(AddonError::IncompatiblePackage {
                        name: manifest.name.clone(),
                        required: required.clone(),
                        running: self.platform_version.clone(),
                    })
                }
            }
            Ok(_) => Ok(()),
            Err(err) => {
                warn!(
                    "skipping compatibility check for '{}', unorderable version: {}",
                    manifest.name, err
                );
                Ok(())
            }
        }
    }
}

impl Default for PackageValidator {
    fn default() -> Self {
        Self::new()
    }
}
