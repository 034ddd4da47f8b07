//! nxcat configuration.
//!
//! Optional TOML file. Every field has a default, so an empty or partial
//! file is valid and no file at all means defaults.
//!
//! ```toml
//! [documents]
//! topology = "ingestor/json/zpool-status-dv.out.json"
//!
//! [health]
//! max_group_devices = 11
//! cardinality = "entry_ratio"
//!
//! [capacity]
//! low_watermark = 50
//! high_watermark = 80
//! ```

use crate::error::{NxcatError, Result};
use crate::health::Cardinality;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Groups wider than this are flagged CRITICAL.
pub const DEFAULT_MAX_GROUP_DEVICES: usize = 11;
pub const DEFAULT_LOW_WATERMARK: u8 = 50;
pub const DEFAULT_HIGH_WATERMARK: u8 = 80;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NxcatConfig {
    #[serde(default)]
    pub documents: DocumentPaths,

    #[serde(default)]
    pub health: HealthSettings,

    #[serde(default)]
    pub capacity: CapacitySettings,
}

impl NxcatConfig {
    /// Load configuration from an explicit file. Unlike document loading,
    /// a bad config file is an error: the user asked for it.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| NxcatError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
            .map_err(|e| NxcatError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| NxcatError::Config(e.to_string()))
    }
}

/// Bundle-relative locations of the collector documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentPaths {
    #[serde(default = "default_topology_path")]
    pub topology: String,

    #[serde(default = "default_lun_map_path")]
    pub lun_map: String,

    #[serde(default = "default_slot_map_path")]
    pub slot_map: String,

    #[serde(default = "default_pool_list_path")]
    pub pool_list: String,

    #[serde(default = "default_disk_stats_path")]
    pub disk_stats: String,
}

fn default_topology_path() -> String {
    "ingestor/json/zpool-status-dv.out.json".to_string()
}

fn default_lun_map_path() -> String {
    "ingestor/json/nmc-c-show-lun-smartstat.out.json".to_string()
}

fn default_slot_map_path() -> String {
    "ingestor/json/nmc-c-show-lun-slotmap.out.json".to_string()
}

fn default_pool_list_path() -> String {
    "ingestor/json/zpool-list-o-all.out.json".to_string()
}

fn default_disk_stats_path() -> String {
    "ingestor/json/iostat-en.out.json".to_string()
}

impl Default for DocumentPaths {
    fn default() -> Self {
        Self {
            topology: default_topology_path(),
            lun_map: default_lun_map_path(),
            slot_map: default_slot_map_path(),
            pool_list: default_pool_list_path(),
            disk_stats: default_disk_stats_path(),
        }
    }
}

/// Vdev health classification settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthSettings {
    #[serde(default = "default_max_group_devices")]
    pub max_group_devices: usize,

    /// How a flat (leaf-only) group's effective device count is derived
    #[serde(default)]
    pub cardinality: Cardinality,
}

fn default_max_group_devices() -> usize {
    DEFAULT_MAX_GROUP_DEVICES
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            max_group_devices: default_max_group_devices(),
            cardinality: Cardinality::default(),
        }
    }
}

/// Pool capacity thresholds (percent used)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacitySettings {
    #[serde(default = "default_low_watermark")]
    pub low_watermark: u8,

    #[serde(default = "default_high_watermark")]
    pub high_watermark: u8,
}

fn default_low_watermark() -> u8 {
    DEFAULT_LOW_WATERMARK
}

fn default_high_watermark() -> u8 {
    DEFAULT_HIGH_WATERMARK
}

impl CapacitySettings {
    /// Low watermark clamped to 0-100
    pub fn effective_low_watermark(&self) -> u8 {
        self.low_watermark.min(100)
    }

    /// High watermark clamped to 0-100 and never below the low watermark
    pub fn effective_high_watermark(&self) -> u8 {
        self.high_watermark
            .min(100)
            .max(self.effective_low_watermark())
    }

    pub fn watermarks_were_clamped(&self) -> bool {
        self.low_watermark != self.effective_low_watermark()
            || self.high_watermark != self.effective_high_watermark()
    }
}

impl Default for CapacitySettings {
    fn default() -> Self {
        Self {
            low_watermark: default_low_watermark(),
            high_watermark: default_high_watermark(),
        }
    }
}
