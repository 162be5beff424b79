//! Vertical height zones: variable chunk heights by world-Y band
//!
//! Chunks are 16x16 in XZ everywhere, but their height depends on which
//! zone of the world they sit in: deep underground uses taller chunks,
//! the dense build band uses short ones, the sky uses very tall ones.
//! The chunk-Y ordinal (`cy`) indexes one continuous stack spanning all
//! zones bottom to top, so conversions accumulate per-zone capacities.

use crate::error::WorldError;
use serde::{Deserialize, Serialize};

/// One row of the zone table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneConfig {
    pub name: String,

    /// Inclusive lower world-Y bound
    pub y_min: i32,

    /// Exclusive upper world-Y bound
    pub y_max: i32,

    /// Chunk height inside this zone, in voxels
    pub chunk_height: u32,
}

impl ZoneConfig {
    /// The default three-zone table: deep void, dense build band, sky
    pub fn default_table() -> Vec<ZoneConfig> {
        vec![
            ZoneConfig {
                name: "deep_void".to_string(),
                y_min: -1088,
                y_max: -64,
                chunk_height: 32,
            },
            ZoneConfig {
                name: "dense".to_string(),
                y_min: -64,
                y_max: 180,
                chunk_height: 16,
            },
            ZoneConfig {
                name: "sky".to_string(),
                y_min: 180,
                y_max: 1460,
                chunk_height: 64,
            },
        ]
    }
}

#[derive(Debug, Clone)]
struct Zone {
    name: String,
    y_min: i32,
    y_max: i32,
    chunk_height: i32,

    /// Ordinal of this zone's bottom chunk in the full stack
    base_chunk_y: i32,

    /// Number of chunks in this zone (the top one may be truncated)
    chunk_count: i32,
}

/// Validated zone stack with O(1)-per-zone coordinate conversions
#[derive(Debug, Clone)]
pub struct HeightZones {
    zones: Vec<Zone>,
    total_chunks: i32,
}

impl HeightZones {
    /// Build from a zone table; rows must be ascending and contiguous
    pub fn new(table: &[ZoneConfig]) -> Result<Self, WorldError> {
        if table.is_empty() {
            return Err(WorldError::InvalidZoneTable("no zones configured".to_string()));
        }

        let mut zones = Vec::with_capacity(table.len());
        let mut base = 0i32;
        for (i, row) in table.iter().enumerate() {
            if row.y_max <= row.y_min {
                return Err(WorldError::InvalidZoneTable(format!(
                    "zone '{}' has empty range {}..{}",
                    row.name, row.y_min, row.y_max
                )));
            }
            if row.chunk_height == 0 {
                return Err(WorldError::InvalidZoneTable(format!(
                    "zone '{}' has zero chunk height",
                    row.name
                )));
            }
            if i > 0 && row.y_min != table[i - 1].y_max {
                return Err(WorldError::InvalidZoneTable(format!(
                    "zone '{}' does not start where '{}' ends",
                    row.name,
                    table[i - 1].name
                )));
            }

            let span = row.y_max - row.y_min;
            let height = row.chunk_height as i32;
            let count = (span + height - 1) / height;
            zones.push(Zone {
                name: row.name.clone(),
                y_min: row.y_min,
                y_max: row.y_max,
                chunk_height: height,
                base_chunk_y: base,
                chunk_count: count,
            });
            base += count;
        }

        Ok(Self {
            zones,
            total_chunks: base,
        })
    }

    /// Total number of chunk-Y ordinals in the stack
    pub fn total_chunk_count(&self) -> i32 {
        self.total_chunks
    }

    /// Lowest world Y covered by any zone
    pub fn world_y_min(&self) -> i32 {
        self.zones[0].y_min
    }

    /// One past the highest world Y covered by any zone
    pub fn world_y_max(&self) -> i32 {
        self.zones[self.zones.len() - 1].y_max
    }

    fn zone_at_world_y(&self, world_y: i32) -> &Zone {
        // World Y outside the configured span clamps to the edge zones.
        for zone in &self.zones {
            if world_y < zone.y_max {
                return zone;
            }
        }
        &self.zones[self.zones.len() - 1]
    }

    fn zone_at_chunk_y(&self, chunk_y: i32) -> &Zone {
        for zone in &self.zones {
            if chunk_y < zone.base_chunk_y + zone.chunk_count {
                return zone;
            }
        }
        &self.zones[self.zones.len() - 1]
    }

    /// Name of the zone containing a world Y
    pub fn zone_name_at(&self, world_y: i32) -> &str {
        &self.zone_at_world_y(world_y).name
    }

    /// Chunk height (in voxels) at a world Y
    pub fn chunk_height_at(&self, world_y: i32) -> i32 {
        self.zone_at_world_y(world_y).chunk_height
    }

    /// Chunk-Y ordinal containing a world Y (clamped to the stack)
    pub fn world_y_to_chunk_y(&self, world_y: i32) -> i32 {
        let zone = self.zone_at_world_y(world_y);
        let clamped = world_y.clamp(zone.y_min, zone.y_max - 1);
        zone.base_chunk_y + (clamped - zone.y_min) / zone.chunk_height
    }

    /// World Y of the bottom voxel layer of a chunk-Y ordinal
    pub fn chunk_y_to_world_y(&self, chunk_y: i32) -> i32 {
        let clamped = chunk_y.clamp(0, self.total_chunks - 1);
        let zone = self.zone_at_chunk_y(clamped);
        zone.y_min + (clamped - zone.base_chunk_y) * zone.chunk_height
    }

    /// Actual voxel height of a chunk, clamped at the zone's upper bound
    ///
    /// The top chunk of a zone whose span is not divisible by its chunk
    /// height is truncated.
    pub fn actual_chunk_y_size(&self, chunk_y: i32) -> i32 {
        let clamped = chunk_y.clamp(0, self.total_chunks - 1);
        let zone = self.zone_at_chunk_y(clamped);
        let start = self.chunk_y_to_world_y(clamped);
        zone.chunk_height.min(zone.y_max - start)
    }
}

impl Default for HeightZones {
    fn default() -> Self {
        // The built-in table is always valid.
        Self::new(&ZoneConfig::default_table()).expect("default zone table is valid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_shape() {
        let zones = HeightZones::default();
        // 32 deep-void chunks, 16 dense (top truncated), 20 sky.
        assert_eq!(zones.total_chunk_count(), 68);
        assert_eq!(zones.chunk_height_at(-100), 32);
        assert_eq!(zones.chunk_height_at(0), 16);
        assert_eq!(zones.chunk_height_at(200), 64);
        assert_eq!(zones.zone_name_at(80), "dense");
    }

    #[test]
    fn test_world_to_chunk_y() {
        let zones = HeightZones::default();
        assert_eq!(zones.world_y_to_chunk_y(-1088), 0);
        assert_eq!(zones.world_y_to_chunk_y(-65), 31);
        assert_eq!(zones.world_y_to_chunk_y(-64), 32);
        assert_eq!(zones.world_y_to_chunk_y(0), 36);
        assert_eq!(zones.world_y_to_chunk_y(80), 41);
        assert_eq!(zones.world_y_to_chunk_y(179), 47);
        assert_eq!(zones.world_y_to_chunk_y(180), 48);
    }

    #[test]
    fn test_chunk_to_world_y_is_inverse_on_boundaries() {
        let zones = HeightZones::default();
        for cy in 0..zones.total_chunk_count() {
            let y = zones.chunk_y_to_world_y(cy);
            assert_eq!(zones.world_y_to_chunk_y(y), cy, "cy={cy} start={y}");
        }
    }

    #[test]
    fn test_bijection_rounds_down_within_chunk_height() {
        let zones = HeightZones::default();
        for y in (-1088..1460).step_by(7) {
            let cy = zones.world_y_to_chunk_y(y);
            let start = zones.chunk_y_to_world_y(cy);
            assert!(start <= y, "y={y} start={start}");
            assert!(y - start < zones.chunk_height_at(y), "y={y} start={start}");
        }
    }

    #[test]
    fn test_truncated_top_chunk() {
        let zones = HeightZones::default();
        // The dense zone spans 244 voxels; its top chunk holds only 4.
        let top_dense = zones.world_y_to_chunk_y(179);
        assert_eq!(zones.chunk_y_to_world_y(top_dense), 176);
        assert_eq!(zones.actual_chunk_y_size(top_dense), 4);
        // Full-height chunks everywhere below it.
        assert_eq!(zones.actual_chunk_y_size(top_dense - 1), 16);
        assert_eq!(zones.actual_chunk_y_size(0), 32);
    }

    #[test]
    fn test_out_of_span_clamps() {
        let zones = HeightZones::default();
        assert_eq!(zones.world_y_to_chunk_y(-5000), 0);
        assert_eq!(
            zones.world_y_to_chunk_y(5000),
            zones.total_chunk_count() - 1
        );
        assert_eq!(zones.chunk_y_to_world_y(-3), zones.chunk_y_to_world_y(0));
    }

    #[test]
    fn test_rejects_bad_tables() {
        assert!(HeightZones::new(&[]).is_err());

        let gap = vec![
            ZoneConfig {
                name: "a".to_string(),
                y_min: 0,
                y_max: 64,
                chunk_height: 16,
            },
            ZoneConfig {
                name: "b".to_string(),
                y_min: 100,
                y_max: 200,
                chunk_height: 16,
            },
        ];
        assert!(HeightZones::new(&gap).is_err());

        let empty_zone = vec![ZoneConfig {
            name: "a".to_string(),
            y_min: 10,
            y_max: 10,
            chunk_height: 16,
        }];
        assert!(HeightZones::new(&empty_zone).is_err());
    }
}
