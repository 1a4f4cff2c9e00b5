// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::fmt;
use std::path::Path;

use log::debug;

const OSRELEASE_PATH: &str = "/proc/sys/kernel/osrelease";

/// Kernels older than this break unix sockets on overlay filesystems, so
/// `status` cannot talk to the supervisor there.
pub const DEFAULT_STATUS_FALLBACK: KernelVersion = KernelVersion { major: 4, minor: 4 };

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct KernelVersion {
    pub major: u32,
    pub minor: u32,
}

impl KernelVersion {
    /// Parse the leading `major.minor` of a release string such as
    /// `5.15.0-91-generic`.
    pub fn parse(release: &str) -> Option<Self> {
        let mut parts = release.trim().split(|c: char| !c.is_ascii_digit());
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next()?.parse().ok()?;
        Some(Self { major, minor })
    }

    /// The running kernel, or `None` when it cannot be determined.
    pub fn current() -> Option<Self> {
        Self::read_from(Path::new(OSRELEASE_PATH))
    }

    pub fn read_from(path: &Path) -> Option<Self> {
        let release = match std::fs::read_to_string(path) {
            Ok(r) => r,
            Err(e) => {
                debug!("reading {}: {e}", path.display());
                return None;
            }
        };
        let version = Self::parse(&release);
        if version.is_none() {
            debug!("unrecognised kernel release {:?}", release.trim());
        }
        version
    }
}

impl fmt::Display for KernelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_release_strings() {
        assert_eq!(
            KernelVersion::parse("5.15.0-91-generic"),
            Some(KernelVersion { major: 5, minor: 15 })
        );
        assert_eq!(
            KernelVersion::parse("3.10.0-1160.el7.x86_64\n"),
            Some(KernelVersion { major: 3, minor: 10 })
        );
        assert_eq!(KernelVersion::parse("4.4"), Some(KernelVersion { major: 4, minor: 4 }));
        assert_eq!(KernelVersion::parse("6"), None);
        assert_eq!(KernelVersion::parse("linux"), None);
        assert_eq!(KernelVersion::parse(""), None);
    }

    #[test]
    fn test_ordering() {
        let old = KernelVersion { major: 3, minor: 18 };
        let new = KernelVersion { major: 4, minor: 1 };
        assert!(old < new);
        assert!(KernelVersion { major: 4, minor: 10 } > KernelVersion { major: 4, minor: 4 });
    }

    #[test]
    fn test_read_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("osrelease");
        std::fs::write(&path, "4.19.112+\n").unwrap();
        assert_eq!(
            KernelVersion::read_from(&path),
            Some(KernelVersion { major: 4, minor: 19 })
        );
        assert_eq!(KernelVersion::read_from(&dir.path().join("missing")), None);
    }
}
