// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Runtime configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! profiling = true
//!
//! [device]
//! path = "sim"
//! queue_depth = 4
//!
//! [allocator]
//! kind = "host"
//! capacity = "64M"
//! ```

use std::path::{Path, PathBuf};

use device_mem::{DeviceAllocator, DeviceBudget, HostAllocator};

use crate::driver::{DriverNode, SimNode, DEFAULT_QUEUE_DEPTH};
use crate::error::RuntimeError;

/// Configuration for the device runtime.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RuntimeConfig {
    /// Whether to collect per-frame timing metrics.
    #[serde(default = "default_true")]
    pub profiling: bool,
    /// Device node selection.
    #[serde(default)]
    pub device: DeviceConfig,
    /// Device memory allocator selection.
    #[serde(default)]
    pub allocator: AllocatorConfig,
}

/// Which device node to drive and how deep its queues run.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DeviceConfig {
    /// Device path, or `"sim"` for the in-process simulator node.
    #[serde(default = "default_device_path")]
    pub path: PathBuf,
    /// Frames each direction may hold in flight.
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,
}

/// Which allocator backs intermediate device buffers.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AllocatorConfig {
    /// Allocator kind: `"host"`.
    #[serde(default = "default_allocator_kind")]
    pub kind: String,
    /// Capacity cap (human-readable, e.g. `"64M"`).
    #[serde(default = "default_capacity")]
    pub capacity: String,
}

fn default_true() -> bool {
    true
}

fn default_device_path() -> PathBuf {
    PathBuf::from("sim")
}

fn default_queue_depth() -> usize {
    DEFAULT_QUEUE_DEPTH
}

fn default_allocator_kind() -> String {
    "host".to_string()
}

fn default_capacity() -> String {
    "64M".to_string()
}

impl RuntimeConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, RuntimeError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RuntimeError::ConfigError(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, RuntimeError> {
        let config: Self = toml::from_str(toml_str)
            .map_err(|e| RuntimeError::ConfigError(format!("TOML parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, RuntimeError> {
        toml::to_string_pretty(self)
            .map_err(|e| RuntimeError::ConfigError(format!("TOML serialise error: {e}")))
    }

    /// Checks the configuration for values no factory could honour.
    pub fn validate(&self) -> Result<(), RuntimeError> {
        if self.device.path.as_os_str().is_empty() {
            return Err(RuntimeError::ConfigError("device path is empty".into()));
        }
        if self.device.queue_depth == 0 {
            return Err(RuntimeError::ConfigError(
                "queue_depth must be at least 1".into(),
            ));
        }
        self.parse_capacity()?;
        match self.allocator.kind.to_lowercase().as_str() {
            "host" => Ok(()),
            other => Err(RuntimeError::ConfigError(format!(
                "unknown allocator '{other}'; expected 'host'"
            ))),
        }
    }

    /// Parses the allocator capacity string into a [`DeviceBudget`].
    pub fn parse_capacity(&self) -> Result<DeviceBudget, RuntimeError> {
        DeviceBudget::parse(&self.allocator.capacity)
            .map_err(|e| RuntimeError::ConfigError(format!("invalid capacity: {e}")))
    }

    /// Creates the allocator specified by this config.
    pub fn create_allocator(&self) -> Result<Box<dyn DeviceAllocator>, RuntimeError> {
        match self.allocator.kind.to_lowercase().as_str() {
            "host" => Ok(Box::new(HostAllocator::new(self.parse_capacity()?))),
            other => Err(RuntimeError::ConfigError(format!(
                "unknown allocator '{other}'; expected 'host'"
            ))),
        }
    }

    /// Creates the driver node specified by this config.
    pub fn create_node(&self) -> Result<Box<dyn DriverNode>, RuntimeError> {
        if self.device.path.as_os_str() == "sim" {
            Ok(Box::new(SimNode::new(self.device.queue_depth)))
        } else {
            Err(RuntimeError::ConfigError(format!(
                "no driver for device '{}'; only the 'sim' node is available in this build",
                self.device.path.display()
            )))
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            profiling: true,
            device: DeviceConfig::default(),
            allocator: AllocatorConfig::default(),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            path: default_device_path(),
            queue_depth: default_queue_depth(),
        }
    }
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            kind: default_allocator_kind(),
            capacity: default_capacity(),
        }
    }
}
