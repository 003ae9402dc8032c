// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Device memory capacity configuration and parsing.
//!
//! A [`DeviceBudget`] is the hard ceiling a [`crate::HostAllocator`] hands
//! out against. It supports human-readable string parsing for config and
//! CLI ergonomics.

use std::fmt;

use crate::MemError;

/// A hard ceiling on device-visible memory.
///
/// # Parsing
/// Supports human-readable strings with SI-style suffixes:
/// - `"64M"` or `"64MB"` → 64 × 1024² bytes
/// - `"1G"` or `"1GB"` → 1 × 1024³ bytes
/// - `"512K"` or `"512KB"` → 512 × 1024 bytes
/// - `"4194304"` → raw byte count
///
/// # Examples
/// ```
/// use device_mem::DeviceBudget;
///
/// let b = DeviceBudget::parse("64M").unwrap();
/// assert_eq!(b.as_bytes(), 64 * 1024 * 1024);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DeviceBudget {
    /// Capacity in bytes.
    bytes: usize,
}

impl DeviceBudget {
    /// Creates a budget from a byte count.
    pub fn from_bytes(bytes: usize) -> Self {
        Self { bytes }
    }

    /// Creates a budget from megabytes.
    pub fn from_mb(mb: usize) -> Self {
        Self {
            bytes: mb * 1024 * 1024,
        }
    }

    /// Returns the capacity in bytes.
    pub fn as_bytes(&self) -> usize {
        self.bytes
    }

    /// Parses a human-readable capacity string.
    ///
    /// Accepted formats: `"64M"`, `"64MB"`, `"1G"`, `"1GB"`, `"512K"`,
    /// `"512KB"`, or a plain byte count. Case-insensitive.
    pub fn parse(s: &str) -> Result<Self, MemError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(MemError::InvalidCapacity(s.to_string()));
        }

        let upper = s.to_uppercase();
        let (num_str, multiplier) = if upper.ends_with("GB") {
            (&s[..s.len() - 2], 1024 * 1024 * 1024)
        } else if upper.ends_with('G') {
            (&s[..s.len() - 1], 1024 * 1024 * 1024)
        } else if upper.ends_with("MB") {
            (&s[..s.len() - 2], 1024 * 1024)
        } else if upper.ends_with('M') {
            (&s[..s.len() - 1], 1024 * 1024)
        } else if upper.ends_with("KB") {
            (&s[..s.len() - 2], 1024)
        } else if upper.ends_with('K') {
            (&s[..s.len() - 1], 1024)
        } else if upper.ends_with('B') {
            (&s[..s.len() - 1], 1)
        } else {
            (s, 1)
        };

        let value: usize = num_str
            .trim()
            .parse()
            .map_err(|_| MemError::InvalidCapacity(s.to_string()))?;

        let bytes = value
            .checked_mul(multiplier)
            .ok_or_else(|| MemError::InvalidCapacity(s.to_string()))?;

        if bytes == 0 {
            return Err(MemError::InvalidCapacity(s.to_string()));
        }

        Ok(Self { bytes })
    }
}

impl fmt::Display for DeviceBudget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bytes >= 1024 * 1024 * 1024 && self.bytes % (1024 * 1024 * 1024) == 0 {
            write!(f, "{} GB", self.bytes / (1024 * 1024 * 1024))
        } else if self.bytes >= 1024 * 1024 && self.bytes % (1024 * 1024) == 0 {
            write!(f, "{} MB", self.bytes / (1024 * 1024))
        } else if self.bytes >= 1024 && self.bytes % 1024 == 0 {
            write!(f, "{} KB", self.bytes / 1024)
        } else {
            write!(f, "{} B", self.bytes)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_suffixes() {
        assert_eq!(DeviceBudget::parse("64M").unwrap().as_bytes(), 64 << 20);
        assert_eq!(DeviceBudget::parse("64mb").unwrap().as_bytes(), 64 << 20);
        assert_eq!(DeviceBudget::parse("1G").unwrap().as_bytes(), 1 << 30);
        assert_eq!(DeviceBudget::parse("512K").unwrap().as_bytes(), 512 << 10);
        assert_eq!(DeviceBudget::parse("4096").unwrap().as_bytes(), 4096);
    }

    #[test]
    fn test_parse_with_whitespace() {
        assert_eq!(DeviceBudget::parse("  8M  ").unwrap().as_bytes(), 8 << 20);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(DeviceBudget::parse("").is_err());
        assert!(DeviceBudget::parse("lots").is_err());
        assert!(DeviceBudget::parse("0M").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", DeviceBudget::from_mb(64)), "64 MB");
        assert_eq!(format!("{}", DeviceBudget::from_bytes(2048)), "2 KB");
        assert_eq!(format!("{}", DeviceBudget::from_bytes(100)), "100 B");
    }

    #[test]
    fn test_serde_roundtrip() {
        let b = DeviceBudget::from_mb(16);
        let json = serde_json::to_string(&b).unwrap();
        let back: DeviceBudget = serde_json::from_str(&json).unwrap();
        assert_eq!(b, back);
    }
}
