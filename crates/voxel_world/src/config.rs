//! Engine configuration
//!
//! Loads settings from a JSON file or falls back to (and writes) the
//! defaults when the file is missing. Every field has a default so a
//! partial file parses.

use crate::error::WorldError;
use crate::height_zones::{HeightZones, ZoneConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// All recognised engine options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Horizontal working radius, in chunks
    pub render_distance_h: i32,

    /// Vertical working radius, in chunks
    pub render_distance_v: i32,

    /// Observer displacement (world units) that triggers a working-set
    /// re-evaluation
    pub update_threshold_units: f32,

    /// Upper bound on recycled chunk capacity
    pub chunk_pool_size: usize,

    /// Thread-pool pending queue cap
    pub max_pending_jobs: usize,

    /// Worker thread count; zero is rejected at startup
    pub worker_threads: usize,

    /// Wall-clock budget per update for region rebuilds, in ms
    pub region_rebuild_budget_ms: f32,

    /// Merge coplanar same-type quads instead of per-face emission
    pub greedy_meshing: bool,

    /// Vertical zone table (must be ascending and contiguous)
    pub zone_config: Vec<ZoneConfig>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            render_distance_h: 8,
            render_distance_v: 4,
            update_threshold_units: 8.0,
            chunk_pool_size: 128,
            max_pending_jobs: 1000,
            worker_threads: num_cpus::get(),
            region_rebuild_budget_ms: 8.0,
            greedy_meshing: false,
            zone_config: ZoneConfig::default_table(),
        }
    }
}

impl WorldConfig {
    /// Load from a JSON file, or create the default file if missing
    pub fn load(path: &Path) -> Result<Self, WorldError> {
        if path.exists() {
            let content = fs::read_to_string(path)
                .map_err(|e| WorldError::Config(format!("failed to read {path:?}: {e}")))?;
            let config: WorldConfig = serde_json::from_str(&content)
                .map_err(|e| WorldError::Config(format!("failed to parse {path:?}: {e}")))?;
            log::info!("loaded configuration from {path:?}");
            Ok(config)
        } else {
            log::info!("no configuration at {path:?}, writing defaults");
            let config = Self::default();
            config.save(path)?;
            Ok(config)
        }
    }

    /// Save as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<(), WorldError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    WorldError::Config(format!("failed to create {parent:?}: {e}"))
                })?;
            }
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| WorldError::Config(format!("failed to serialise config: {e}")))?;
        fs::write(path, content)
            .map_err(|e| WorldError::Config(format!("failed to write {path:?}: {e}")))?;
        Ok(())
    }

    /// Build the validated zone stack from the configured table
    pub fn height_zones(&self) -> Result<HeightZones, WorldError> {
        HeightZones::new(&self.zone_config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorldConfig::default();
        assert_eq!(config.render_distance_h, 8);
        assert_eq!(config.render_distance_v, 4);
        assert_eq!(config.update_threshold_units, 8.0);
        assert_eq!(config.chunk_pool_size, 128);
        assert_eq!(config.max_pending_jobs, 1000);
        assert!(config.worker_threads >= 1);
        assert!(!config.greedy_meshing);
        assert_eq!(config.zone_config.len(), 3);
        assert!(config.height_zones().is_ok());
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = WorldConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: WorldConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.render_distance_h, config.render_distance_h);
        assert_eq!(back.zone_config, config.zone_config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let parsed: WorldConfig = serde_json::from_str(r#"{"render_distance_h": 3}"#).unwrap();
        assert_eq!(parsed.render_distance_h, 3);
        assert_eq!(parsed.render_distance_v, 4);
        assert_eq!(parsed.zone_config.len(), 3);
    }

    #[test]
    fn test_invalid_zone_table_is_rejected() {
        let mut config = WorldConfig::default();
        config.zone_config.clear();
        assert!(config.height_zones().is_err());
    }
}
