//! Dotted version comparison for module update decisions.
//!
//! Versions are sequences of non-negative integers separated by dots.
//! Comparison is component-wise, left to right; missing trailing components
//! count as zero, so `"1.2"` and `"1.2.0"` are equal. This is deliberately
//! laxer than strict semver: catalog metadata and uploaded manifests are not
//! under our control, and a malformed version must never crash an operation
//! or produce a spurious update prompt.

use std::cmp::Ordering;

use tracing::warn;

use crate::error::{AddonError, Result};

/// Compare two version strings component-wise.
pub fn compare(a: &str, b: &str) -> Result<Ordering> {
    let left = parse(a)?;
    let right = parse(b)?;

    let len = left.len().max(right.len());
    for i in 0..len {
        let x = left.get(i).copied().unwrap_or(0);
        let y = right.get(i).copied().unwrap_or(0);
        match x.cmp(&y) {
            Ordering::Equal => continue,
            other => return Ok(other),
        }
    }

    Ok(Ordering::Equal)
}

/// Whether `candidate` is strictly newer than `installed`.
///
/// Malformed input degrades to "not newer": no update is offered for data we
/// cannot order, and the condition is logged instead of propagated.
pub fn is_newer(candidate: &str, installed: &str) -> bool {
    match compare(candidate, installed) {
        Ok(Ordering::Greater) => true,
        Ok(_) => false,
        Err(err) => {
            warn!(
                candidate,
                installed,
                "treating unorderable versions as up to date: {err}"
            );
            false
        }
    }
}

fn parse(version: &str) -> Result<Vec<u64>> {
    if version.is_empty() {
        return Err(AddonError::InvalidVersion(version.to_string()));
    }

    version
        .split('.')
        .map(|component| {
            component
                .parse::<u64>()
                .map_err(|_| AddonError::InvalidVersion(version.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_component_wise() {
        assert_eq!(compare("1.2.0", "1.3.0").unwrap(), Ordering::Less);
        assert_eq!(compare("2.0.0", "1.9.9").unwrap(), Ordering::Greater);
        assert_eq!(compare("1.2.0", "1.2.0").unwrap(), Ordering::Equal);
        assert_eq!(compare("0.10.0", "0.9.0").unwrap(), Ordering::Greater);
    }

    #[test]
    fn missing_trailing_components_are_zero() {
        assert_eq!(compare("1.2", "1.2.0").unwrap(), Ordering::Equal);
        assert_eq!(compare("1", "1.0.0.0").unwrap(), Ordering::Equal);
        assert_eq!(compare("1.2", "1.2.1").unwrap(), Ordering::Less);
    }

    #[test]
    fn rejects_non_numeric_components() {
        assert!(matches!(
            compare("1.2.beta", "1.2.0"),
            Err(AddonError::InvalidVersion(_))
        ));
        assert!(matches!(
            compare("1..2", "1.0"),
            Err(AddonError::InvalidVersion(_))
        ));
        assert!(matches!(compare("", "1.0"), Err(AddonError::InvalidVersion(_))));
    }

    #[test]
    fn is_newer_degrades_malformed_to_not_newer() {
        assert!(is_newer("1.3.0", "1.2.0"));
        assert!(!is_newer("1.2.0", "1.2.0"));
        assert!(!is_newer("1.1.0", "1.2.0"));
        assert!(!is_newer("not-a-version", "1.2.0"));
        assert!(!is_newer("2.0.0", "garbage"));
    }
}
