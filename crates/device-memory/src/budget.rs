// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Device memory caps.
//!
//! A [`MemoryBudget`] is the ceiling a [`DeviceAllocator`](crate::DeviceAllocator)
//! enforces on live buffers, and the limit a network places on the scratch
//! region it lends to an execution context (`max_workspace`).

use crate::MemoryError;
use std::fmt;

const KIB: usize = 1024;
const MIB: usize = 1024 * KIB;
const GIB: usize = 1024 * MIB;

/// Suffixes accepted by [`MemoryBudget::parse`], longest first.
const UNITS: &[(&str, usize)] = &[
    ("GB", GIB),
    ("MB", MIB),
    ("KB", KIB),
    ("G", GIB),
    ("M", MIB),
    ("K", KIB),
    ("B", 1),
];

/// A hard ceiling on device memory, in bytes.
///
/// Written in configuration as a number with an optional binary suffix, the
/// same form [`Display`](fmt::Display) prints:
///
/// ```
/// use device_memory::MemoryBudget;
///
/// let workspace = MemoryBudget::parse("256M").unwrap();
/// assert!(workspace.admits(64 << 20));
/// assert!(!workspace.admits(512 << 20));
/// assert_eq!(workspace.to_string(), "256M");
///
/// assert!(MemoryBudget::parse("unlimited").unwrap().is_unlimited());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MemoryBudget {
    bytes: usize,
}

impl MemoryBudget {
    pub fn from_bytes(bytes: usize) -> Self {
        Self { bytes }
    }

    pub fn from_mb(mb: usize) -> Self {
        Self { bytes: mb * MIB }
    }

    /// No ceiling at all.
    pub fn unlimited() -> Self {
        Self { bytes: usize::MAX }
    }

    pub fn is_unlimited(&self) -> bool {
        self.bytes == usize::MAX
    }

    pub fn as_bytes(&self) -> usize {
        self.bytes
    }

    /// The cap in whole mebibytes.
    pub fn as_mb(&self) -> usize {
        self.bytes / MIB
    }

    /// Whether `total_bytes` stays within the cap.
    pub fn admits(&self, total_bytes: usize) -> bool {
        total_bytes <= self.bytes
    }

    /// Bytes left under the cap once `used_bytes` are taken.
    pub fn headroom(&self, used_bytes: usize) -> usize {
        self.bytes.saturating_sub(used_bytes)
    }

    /// Parses a cap such as `"256M"`, `"1GB"`, `"64k"`, `"4096"` (bytes) or
    /// `"unlimited"`. Case-insensitive; a zero cap is rejected.
    pub fn parse(s: &str) -> Result<Self, MemoryError> {
        let invalid = || MemoryError::InvalidBudget(s.to_string());
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("unlimited") {
            return Ok(Self::unlimited());
        }

        let upper = trimmed.to_ascii_uppercase();
        let (digits, unit) = UNITS
            .iter()
            .find_map(|&(suffix, unit)| upper.strip_suffix(suffix).map(|d| (d, unit)))
            .unwrap_or((upper.as_str(), 1));
        let value: usize = digits.trim().parse().map_err(|_| invalid())?;
        let bytes = value.checked_mul(unit).ok_or_else(invalid)?;
        if bytes == 0 {
            return Err(MemoryError::ZeroSizedAllocation);
        }
        Ok(Self { bytes })
    }
}

impl fmt::Display for MemoryBudget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unlimited() {
            return f.write_str("unlimited");
        }
        for (suffix, unit) in [("G", GIB), ("M", MIB), ("K", KIB)] {
            if self.bytes >= unit && self.bytes % unit == 0 {
                return write!(f, "{}{suffix}", self.bytes / unit);
            }
        }
        write!(f, "{}", self.bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_suffixes() {
        assert_eq!(MemoryBudget::parse("256M").unwrap().as_mb(), 256);
        assert_eq!(MemoryBudget::parse("256mb").unwrap().as_mb(), 256);
        assert_eq!(MemoryBudget::parse("1G").unwrap().as_mb(), 1024);
        assert_eq!(MemoryBudget::parse("2gb").unwrap().as_mb(), 2048);
        assert_eq!(MemoryBudget::parse("64K").unwrap().as_bytes(), 64 * 1024);
        assert_eq!(MemoryBudget::parse("512B").unwrap().as_bytes(), 512);
        assert_eq!(MemoryBudget::parse(" 4096 ").unwrap().as_bytes(), 4096);
    }

    #[test]
    fn test_parse_unlimited() {
        let b = MemoryBudget::parse("Unlimited").unwrap();
        assert!(b.is_unlimited());
        assert!(b.admits(usize::MAX));
    }

    #[test]
    fn test_parse_invalid() {
        assert!(matches!(MemoryBudget::parse(""), Err(MemoryError::InvalidBudget(_))));
        assert!(matches!(MemoryBudget::parse("lots"), Err(MemoryError::InvalidBudget(_))));
        assert!(matches!(MemoryBudget::parse("M"), Err(MemoryError::InvalidBudget(_))));
        assert!(matches!(MemoryBudget::parse("0M"), Err(MemoryError::ZeroSizedAllocation)));
        assert!(MemoryBudget::parse("99999999999999999999G").is_err());
    }

    #[test]
    fn test_admits_and_headroom() {
        let b = MemoryBudget::from_bytes(4096);
        assert!(b.admits(4096));
        assert!(!b.admits(4097));
        assert_eq!(b.headroom(1000), 3096);
        assert_eq!(b.headroom(5000), 0);
    }

    #[test]
    fn test_display_parses_back() {
        for b in [
            MemoryBudget::from_mb(1024),
            MemoryBudget::from_mb(256),
            MemoryBudget::from_bytes(3 * 1024),
            MemoryBudget::from_bytes(1000),
            MemoryBudget::unlimited(),
        ] {
            assert_eq!(MemoryBudget::parse(&b.to_string()).unwrap(), b);
        }
        assert_eq!(MemoryBudget::from_mb(1024).to_string(), "1G");
        assert_eq!(MemoryBudget::from_bytes(1000).to_string(), "1000");
    }

    #[test]
    fn test_serde_roundtrip() {
        let b = MemoryBudget::from_mb(256);
        let json = serde_json::to_string(&b).unwrap();
        let back: MemoryBudget = serde_json::from_str(&json).unwrap();
        assert_eq!(b, back);
    }
}
