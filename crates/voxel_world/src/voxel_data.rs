//! Per-chunk voxel storage with uniform-chunk compression
//!
//! A chunk's cells are logically a dense 16 x h x 16 byte grid, but most
//! chunks are a single repeated value (all air, all stone). Storage
//! therefore has two states: *uniform* (one byte) and *dense* (the full
//! grid). The first write of a differing value expands to dense;
//! `try_compact` collapses back when every cell agrees again.

use crate::error::WorldError;
use crate::registry::{VoxelId, AIR};

/// Chunk edge length along X and Z, in voxels
pub const CHUNK_SIZE_XZ: usize = 16;

const FLAG_DENSE: u8 = 0;
const FLAG_UNIFORM: u8 = 1;

#[derive(Debug, Clone, PartialEq)]
enum Storage {
    Uniform(VoxelId),
    Dense(Vec<VoxelId>),
}

/// Voxel grid for one chunk
#[derive(Debug, Clone, PartialEq)]
pub struct VoxelData {
    height: usize,
    storage: Storage,
}

impl VoxelData {
    /// New uniform-AIR grid with the given zone height
    pub fn new(height: usize) -> Self {
        Self::uniform(height, AIR)
    }

    /// New uniform grid of an arbitrary value
    pub fn uniform(height: usize, value: VoxelId) -> Self {
        Self {
            height,
            storage: Storage::Uniform(value),
        }
    }

    /// Zone height of this grid, in voxels
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of cells in the logical grid
    pub fn volume(&self) -> usize {
        CHUNK_SIZE_XZ * self.height * CHUNK_SIZE_XZ
    }

    #[inline]
    fn index(&self, x: usize, y: usize, z: usize) -> usize {
        x + y * CHUNK_SIZE_XZ + z * CHUNK_SIZE_XZ * self.height
    }

    #[inline]
    fn in_bounds(&self, x: usize, y: usize, z: usize) -> bool {
        x < CHUNK_SIZE_XZ && y < self.height && z < CHUNK_SIZE_XZ
    }

    /// Cell value; out-of-range coordinates yield AIR
    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> VoxelId {
        if !self.in_bounds(x, y, z) {
            return AIR;
        }
        match &self.storage {
            Storage::Uniform(v) => *v,
            Storage::Dense(cells) => cells[self.index(x, y, z)],
        }
    }

    /// Write a cell. Out-of-range writes are silently ignored.
    ///
    /// Returns true when a cell actually changed value. Writing the
    /// current uniform value to a uniform grid allocates nothing.
    pub fn set(&mut self, x: usize, y: usize, z: usize, value: VoxelId) -> bool {
        if !self.in_bounds(x, y, z) {
            return false;
        }
        let volume = self.volume();
        match &mut self.storage {
            Storage::Uniform(current) => {
                if *current == value {
                    return false;
                }
                // Expand, seeding every cell with the prior uniform value.
                let mut cells = vec![*current; volume];
                cells[x + y * CHUNK_SIZE_XZ + z * CHUNK_SIZE_XZ * self.height] = value;
                self.storage = Storage::Dense(cells);
                true
            }
            Storage::Dense(cells) => {
                let idx = x + y * CHUNK_SIZE_XZ + z * CHUNK_SIZE_XZ * self.height;
                if cells[idx] == value {
                    return false;
                }
                cells[idx] = value;
                true
            }
        }
    }

    /// Reset every cell to one value, freeing any dense buffer
    pub fn fill(&mut self, value: VoxelId) {
        self.storage = Storage::Uniform(value);
    }

    /// Collapse a dense grid whose cells all agree back to uniform
    ///
    /// Returns true when the grid is uniform afterwards.
    pub fn try_compact(&mut self) -> bool {
        let repeated = match &self.storage {
            Storage::Uniform(_) => return true,
            Storage::Dense(cells) => {
                let first = cells[0];
                cells.iter().all(|&c| c == first).then_some(first)
            }
        };
        match repeated {
            Some(value) => {
                self.storage = Storage::Uniform(value);
                true
            }
            None => false,
        }
    }

    pub fn is_uniform(&self) -> bool {
        matches!(self.storage, Storage::Uniform(_))
    }

    /// The repeated value of a uniform grid
    pub fn uniform_value(&self) -> Option<VoxelId> {
        match self.storage {
            Storage::Uniform(v) => Some(v),
            Storage::Dense(_) => None,
        }
    }

    /// Storage footprint: 2 bytes uniform, one byte per cell dense
    pub fn memory_bytes(&self) -> usize {
        match &self.storage {
            Storage::Uniform(_) => 2,
            Storage::Dense(cells) => cells.len(),
        }
    }

    /// Reinitialise for recycling: uniform AIR at a (possibly new) height
    pub fn reset(&mut self, height: usize) {
        self.height = height;
        self.storage = Storage::Uniform(AIR);
    }

    /// Encode: a flag byte, then one value byte (uniform) or the full
    /// cell grid (dense)
    pub fn serialize(&self) -> Vec<u8> {
        match &self.storage {
            Storage::Uniform(v) => vec![FLAG_UNIFORM, *v],
            Storage::Dense(cells) => {
                let mut bytes = Vec::with_capacity(1 + cells.len());
                bytes.push(FLAG_DENSE);
                bytes.extend_from_slice(cells);
                bytes
            }
        }
    }

    /// Decode a payload produced by `serialize`
    ///
    /// A bare cell grid with no flag byte (the legacy form) is accepted
    /// as dense.
    pub fn deserialize(bytes: &[u8], height: usize) -> Result<Self, WorldError> {
        let volume = CHUNK_SIZE_XZ * height * CHUNK_SIZE_XZ;
        match bytes {
            [FLAG_UNIFORM, value] => Ok(Self::uniform(height, *value)),
            [FLAG_DENSE, cells @ ..] if cells.len() == volume => Ok(Self {
                height,
                storage: Storage::Dense(cells.to_vec()),
            }),
            legacy if legacy.len() == volume => Ok(Self {
                height,
                storage: Storage::Dense(legacy.to_vec()),
            }),
            _ => Err(WorldError::Payload(format!(
                "expected 2 or {} bytes, got {}",
                volume + 1,
                bytes.len()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{DIRT, GRAVEL, STONE};

    #[test]
    fn test_new_is_uniform_air() {
        let data = VoxelData::new(16);
        assert!(data.is_uniform());
        assert_eq!(data.uniform_value(), Some(AIR));
        assert_eq!(data.memory_bytes(), 2);
        assert_eq!(data.get(3, 7, 12), AIR);
    }

    #[test]
    fn test_uniform_same_value_write_is_noop() {
        let mut data = VoxelData::new(16);
        assert!(!data.set(0, 0, 0, AIR));
        assert!(data.is_uniform());
        assert_eq!(data.memory_bytes(), 2);
    }

    #[test]
    fn test_expansion_preserves_prior_uniform_value() {
        let mut data = VoxelData::uniform(16, STONE);
        assert!(data.set(5, 5, 5, DIRT));
        assert!(!data.is_uniform());
        assert_eq!(data.get(5, 5, 5), DIRT);
        // Every unwritten cell still reads the old uniform value.
        assert_eq!(data.get(0, 0, 0), STONE);
        assert_eq!(data.get(15, 15, 15), STONE);
        assert_eq!(data.memory_bytes(), 16 * 16 * 16);
    }

    #[test]
    fn test_out_of_range_reads_air_writes_ignored() {
        let mut data = VoxelData::new(16);
        assert_eq!(data.get(16, 0, 0), AIR);
        assert_eq!(data.get(0, 16, 0), AIR);
        assert!(!data.set(0, 16, 0, STONE));
        assert!(data.is_uniform());
    }

    #[test]
    fn test_fill_returns_to_uniform() {
        let mut data = VoxelData::new(16);
        data.set(1, 2, 3, STONE);
        assert!(!data.is_uniform());
        data.fill(AIR);
        assert!(data.is_uniform());
        assert_eq!(data.get(1, 2, 3), AIR);
        assert_eq!(data.memory_bytes(), 2);
    }

    #[test]
    fn test_compact_cell_by_cell_fill() {
        // Scenario: dense-fill a chunk one cell at a time, then compact.
        let mut data = VoxelData::new(16);
        for z in 0..CHUNK_SIZE_XZ {
            for y in 0..16 {
                for x in 0..CHUNK_SIZE_XZ {
                    data.set(x, y, z, STONE);
                }
            }
        }
        assert!(!data.is_uniform());
        assert!(data.try_compact());
        assert!(data.is_uniform());
        assert_eq!(data.uniform_value(), Some(STONE));
        assert_eq!(data.memory_bytes(), 2);
        assert_eq!(data.serialize().len(), 2);
    }

    #[test]
    fn test_compact_fails_on_mixed_cells() {
        let mut data = VoxelData::new(16);
        data.set(0, 0, 0, STONE);
        assert!(!data.try_compact());
        assert!(!data.is_uniform());
    }

    #[test]
    fn test_serialize_roundtrip_uniform() {
        let data = VoxelData::uniform(32, STONE);
        let bytes = data.serialize();
        assert_eq!(bytes, vec![1, STONE]);
        let back = VoxelData::deserialize(&bytes, 32).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn test_serialize_roundtrip_dense() {
        let mut data = VoxelData::new(16);
        data.set(0, 0, 0, STONE);
        data.set(15, 15, 15, DIRT);
        data.set(7, 3, 9, GRAVEL);
        let bytes = data.serialize();
        assert_eq!(bytes.len(), 1 + 16 * 16 * 16);
        let back = VoxelData::deserialize(&bytes, 16).unwrap();
        for z in 0..CHUNK_SIZE_XZ {
            for y in 0..16 {
                for x in 0..CHUNK_SIZE_XZ {
                    assert_eq!(back.get(x, y, z), data.get(x, y, z));
                }
            }
        }
    }

    #[test]
    fn test_deserialize_legacy_dense() {
        let volume = 16 * 16 * 16;
        let mut bytes = vec![AIR; volume];
        bytes[0] = STONE;
        let data = VoxelData::deserialize(&bytes, 16).unwrap();
        assert!(!data.is_uniform());
        assert_eq!(data.get(0, 0, 0), STONE);
        assert_eq!(data.get(1, 0, 0), AIR);
    }

    #[test]
    fn test_deserialize_rejects_bad_length() {
        assert!(VoxelData::deserialize(&[1], 16).is_err());
        assert!(VoxelData::deserialize(&[0, 1, 2, 3], 16).is_err());
        assert!(VoxelData::deserialize(&[9; 100], 16).is_err());
    }

    #[test]
    fn test_variable_height_indexing() {
        let mut data = VoxelData::new(4);
        assert_eq!(data.volume(), 16 * 4 * 16);
        data.set(2, 3, 4, STONE);
        assert_eq!(data.get(2, 3, 4), STONE);
        // y=4 is out of range for a truncated chunk.
        assert!(!data.set(2, 4, 4, STONE));
        assert_eq!(data.get(2, 4, 4), AIR);
    }
}
