//! Host platform detection and descriptor platform matching.
use std::fmt;

use serde::Deserialize;

/// Operating systems a step may target.
///
/// Serialized with the same identifiers Node-style tooling uses
/// (`darwin`, `linux`, `win32`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    /// macOS.
    Darwin,
    /// Linux distributions.
    Linux,
    /// Windows.
    Win32,
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Darwin => write!(f, "darwin"),
            Self::Linux => write!(f, "linux"),
            Self::Win32 => write!(f, "win32"),
        }
    }
}

/// Platform information for the current system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    /// Detected operating system.
    pub os: Os,
}

impl Platform {
    /// Detect the current platform.
    #[must_use]
    pub const fn detect() -> Self {
        Self {
            os: Self::detect_os(),
        }
    }

    /// Create a platform with an explicit OS.
    #[must_use]
    pub const fn new(os: Os) -> Self {
        Self { os }
    }

    /// Whether a step declaring `platforms` may run here.
    #[must_use]
    pub fn supports(&self, platforms: &[Os]) -> bool {
        platforms.contains(&self.os)
    }

    const fn detect_os() -> Os {
        if cfg!(target_os = "macos") {
            Os::Darwin
        } else if cfg!(target_os = "windows") {
            Os::Win32
        } else {
            // Other Unix-likes behave closest to Linux.
            Os::Linux
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn detect_matches_compile_target() {
        let p = Platform::detect();
        if cfg!(target_os = "macos") {
            assert_eq!(p.os, Os::Darwin);
        } else if cfg!(target_os = "windows") {
            assert_eq!(p.os, Os::Win32);
        } else {
            assert_eq!(p.os, Os::Linux);
        }
    }

    #[test]
    fn supports_listed_platform() {
        let p = Platform::new(Os::Linux);
        assert!(p.supports(&[Os::Darwin, Os::Linux]));
        assert!(!p.supports(&[Os::Darwin]));
        assert!(!p.supports(&[]));
    }

    #[test]
    fn os_display() {
        assert_eq!(Os::Darwin.to_string(), "darwin");
        assert_eq!(Os::Linux.to_string(), "linux");
        assert_eq!(Os::Win32.to_string(), "win32");
    }

    #[test]
    fn os_deserializes_lowercase() {
        let os: Vec<Os> = serde_json::from_str(r#"["darwin","linux","win32"]"#).unwrap();
        assert_eq!(os, vec![Os::Darwin, Os::Linux, Os::Win32]);
    }

    #[test]
    fn os_rejects_unknown_name() {
        assert!(serde_json::from_str::<Os>(r#""freebsd""#).is_err());
    }
}
