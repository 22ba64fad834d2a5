use std::{fmt, str::FromStr};

use semver::{BuildMetadata, Prerelease, Version};
use serde::{Deserialize, Serialize};

use crate::error::VersionError;

/// The kinds of version increment a release can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseKind {
    /// Breaking release (1.2.3 → 2.0.0)
    Major,
    /// Feature release (1.2.3 → 1.3.0)
    Minor,
    /// Fix release (1.2.3 → 1.2.4)
    Patch,
    /// Prerelease of the next major (1.2.3 → 2.0.0-beta.0)
    Premajor,
    /// Prerelease of the next minor (1.2.3 → 1.3.0-beta.0)
    Preminor,
    /// Prerelease of the next patch (1.2.3 → 1.2.4-beta.0)
    Prepatch,
    /// Increment of the prerelease counter (2.0.0-beta.0 → 2.0.0-beta.1)
    Prerelease,
}

impl FromStr for ReleaseKind {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "major" => Ok(Self::Major),
            "minor" => Ok(Self::Minor),
            "patch" => Ok(Self::Patch),
            "premajor" => Ok(Self::Premajor),
            "preminor" => Ok(Self::Preminor),
            "prepatch" => Ok(Self::Prepatch),
            "prerelease" => Ok(Self::Prerelease),
            _ => Err(VersionError::InvalidFormat {
                version: s.to_string(),
                reason: "valid kinds are major, minor, patch, premajor, preminor, prepatch, \
                         prerelease"
                    .to_string(),
            }),
        }
    }
}

impl fmt::Display for ReleaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Major => "major",
            Self::Minor => "minor",
            Self::Patch => "patch",
            Self::Premajor => "premajor",
            Self::Preminor => "preminor",
            Self::Prepatch => "prepatch",
            Self::Prerelease => "prerelease",
        };
        write!(f, "{name}")
    }
}

const DEFAULT_PREID: &str = "beta";

/// Computes the next version for a bump kind.
///
/// Follows standard semver increment rules: releasing over an existing
/// prerelease of the same level strips the prerelease instead of
/// incrementing again, and `prerelease` with no existing prerelease starts a
/// new `<preid>.0` on the next patch.
///
/// # Errors
///
/// Returns `VersionError::InvalidFormat` when the prerelease identifier is
/// not a valid semver prerelease.
pub fn bump(current: &Version, kind: ReleaseKind, preid: Option<&str>) -> Result<Version, VersionError> {
    let preid = preid.unwrap_or(DEFAULT_PREID);

    let prerelease = |tail: &str| -> Result<Prerelease, VersionError> {
        Prerelease::new(tail).map_err(|e| VersionError::InvalidFormat {
            version: tail.to_string(),
            reason: e.to_string(),
        })
    };

    let mut next = current.clone();
    next.build = BuildMetadata::EMPTY;

    match kind {
        ReleaseKind::Major => {
            if next.minor == 0 && next.patch == 0 && !next.pre.is_empty() {
                next.pre = Prerelease::EMPTY;
            } else {
                next.major += 1;
                next.minor = 0;
                next.patch = 0;
                next.pre = Prerelease::EMPTY;
            }
        }
        ReleaseKind::Minor => {
            if next.patch == 0 && !next.pre.is_empty() {
                next.pre = Prerelease::EMPTY;
            } else {
                next.minor += 1;
                next.patch = 0;
                next.pre = Prerelease::EMPTY;
            }
        }
        ReleaseKind::Patch => {
            if next.pre.is_empty() {
                next.patch += 1;
            } else {
                next.pre = Prerelease::EMPTY;
            }
        }
        ReleaseKind::Premajor => {
            next.major += 1;
            next.minor = 0;
            next.patch = 0;
            next.pre = prerelease(&format!("{preid}.0"))?;
        }
        ReleaseKind::Preminor => {
            next.minor += 1;
            next.patch = 0;
            next.pre = prerelease(&format!("{preid}.0"))?;
        }
        ReleaseKind::Prepatch => {
            next.patch += 1;
            next.pre = prerelease(&format!("{preid}.0"))?;
        }
        ReleaseKind::Prerelease => {
            if next.pre.is_empty() {
                next.patch += 1;
                next.pre = prerelease(&format!("{preid}.0"))?;
            } else {
                next.pre = prerelease(&increment_prerelease(next.pre.as_str(), preid))?;
            }
        }
    }

    Ok(next)
}

/// Increments the trailing numeric identifier of a prerelease, or restarts
/// at `<preid>.0` when the identifier changes.
fn increment_prerelease(current: &str, preid: &str) -> String {
    let mut identifiers: Vec<String> = current.split('.').map(ToString::to_string).collect();

    let same_preid = identifiers.first().is_some_and(|head| head == preid);
    if !same_preid {
        return format!("{preid}.0");
    }

    if let Some(last) = identifiers.last_mut() {
        if let Ok(n) = last.parse::<u64>() {
            *last = (n + 1).to_string();
            return identifiers.join(".");
        }
    }

    identifiers.push("0".to_string());
    identifiers.join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).expect("version")
    }

    #[test]
    fn test_release_bumps() {
        assert_eq!(bump(&v("1.2.3"), ReleaseKind::Major, None).unwrap(), v("2.0.0"));
        assert_eq!(bump(&v("1.2.3"), ReleaseKind::Minor, None).unwrap(), v("1.3.0"));
        assert_eq!(bump(&v("1.2.3"), ReleaseKind::Patch, None).unwrap(), v("1.2.4"));
    }

    #[test]
    fn test_release_over_prerelease_strips_the_tail() {
        assert_eq!(bump(&v("2.0.0-beta.2"), ReleaseKind::Major, None).unwrap(), v("2.0.0"));
        assert_eq!(bump(&v("1.3.0-beta.0"), ReleaseKind::Minor, None).unwrap(), v("1.3.0"));
        assert_eq!(bump(&v("1.2.4-rc.1"), ReleaseKind::Patch, None).unwrap(), v("1.2.4"));
    }

    #[test]
    fn test_pre_bumps_start_at_zero() {
        assert_eq!(
            bump(&v("1.2.3"), ReleaseKind::Premajor, Some("alpha")).unwrap(),
            v("2.0.0-alpha.0")
        );
        assert_eq!(
            bump(&v("1.2.3"), ReleaseKind::Preminor, None).unwrap(),
            v("1.3.0-beta.0")
        );
        assert_eq!(
            bump(&v("1.2.3"), ReleaseKind::Prepatch, Some("rc")).unwrap(),
            v("1.2.4-rc.0")
        );
    }

    #[test]
    fn test_prerelease_increments_or_restarts() {
        // No existing prerelease: start one on the next patch.
        assert_eq!(
            bump(&v("1.2.3"), ReleaseKind::Prerelease, Some("rc")).unwrap(),
            v("1.2.4-rc.0")
        );
        // Same identifier: bump the counter.
        assert_eq!(
            bump(&v("1.2.4-rc.0"), ReleaseKind::Prerelease, Some("rc")).unwrap(),
            v("1.2.4-rc.1")
        );
        // Different identifier: restart.
        assert_eq!(
            bump(&v("1.2.4-rc.3"), ReleaseKind::Prerelease, Some("beta")).unwrap(),
            v("1.2.4-beta.0")
        );
        // Non-numeric tail gets a counter appended.
        assert_eq!(
            bump(&v("1.2.4-rc"), ReleaseKind::Prerelease, Some("rc")).unwrap(),
            v("1.2.4-rc.0")
        );
    }

    #[test]
    fn test_bump_is_strictly_greater_for_release_kinds() {
        let current = v("1.2.3");
        for kind in [ReleaseKind::Major, ReleaseKind::Minor, ReleaseKind::Patch] {
            assert!(bump(&current, kind, None).unwrap() > current);
        }
    }

    #[test]
    fn test_build_metadata_is_dropped() {
        assert_eq!(bump(&v("1.2.3+build.5"), ReleaseKind::Patch, None).unwrap(), v("1.2.4"));
    }
}
