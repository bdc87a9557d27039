//! Kernel release parsing and version gating
//!
//! The lifecycle manager only needs one decision from the kernel version:
//! whether the host is old enough that the legacy codec module still claims
//! the DMA channel and must be unloaded before the target driver binds.

use crate::error::HostError;
use crate::Result;
use std::cmp::Ordering;

/// Parsed kernel version, ordered numerically component by component.
///
/// Trailing components that one side lacks compare as zero, so
/// `4.19 == 4.19.0` and `5.10 > 5.9`. Distro suffixes after the first `-`
/// (e.g. `-mcom03-latest.elv.alt1`) carry no ordering information and are
/// discarded during parsing.
#[derive(Debug, Clone)]
pub struct KernelVersion(Vec<u32>);

impl KernelVersion {
    /// Parse a kernel release string of the form
    /// `<major>.<minor>[.<patch>...][-<suffix>]`.
    ///
    /// A mainline release candidate (`4.19-rc1`: no final patch component,
    /// `rcN` directly after the base) would compare as if the release were
    /// finished, so it is rejected outright rather than approximated. An
    /// `rc` tag buried in a distro suffix after a complete base version
    /// (`4.19.0-rc1`) is ignored like any other suffix.
    pub fn parse(release: &str) -> Result<Self> {
        let release = release.trim();
        let (base, suffix) = match release.split_once('-') {
            Some((base, suffix)) => (base, Some(suffix)),
            None => (release, None),
        };

        let components = base
            .split('.')
            .map(|part| {
                part.parse::<u32>().map_err(|_| HostError::InvalidRelease {
                    release: release.to_string(),
                    reason: format!("'{part}' is not a non-negative integer"),
                })
            })
            .collect::<Result<Vec<u32>>>()?;

        if let Some(suffix) = suffix {
            let tag = suffix.split(['-', '.']).next().unwrap_or("");
            if components.len() < 3 && is_rc_tag(tag) {
                return Err(HostError::ReleaseCandidate(release.to_string()));
            }
        }

        Ok(KernelVersion(components))
    }

    /// The numeric components, most significant first.
    pub fn components(&self) -> &[u32] {
        &self.0
    }
}

fn is_rc_tag(tag: &str) -> bool {
    tag.strip_prefix("rc")
        .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
}

impl Ord for KernelVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.0.len().max(other.0.len());
        for i in 0..len {
            let a = self.0.get(i).copied().unwrap_or(0);
            let b = other.0.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for KernelVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Manual impls: 4.19 and 4.19.0 must be equal, which a derived PartialEq
// over the component vectors would get wrong.
impl PartialEq for KernelVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for KernelVersion {}

impl std::fmt::Display for KernelVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.0.iter().map(u32::to_string).collect();
        write!(f, "{}", parts.join("."))
    }
}

/// Whether `current` falls below `threshold`.
///
/// Used to decide once, at setup time, whether the legacy codec module must
/// be unloaded before the target driver can claim the device.
pub fn gate(current: &KernelVersion, threshold: &KernelVersion) -> bool {
    current < threshold
}
