//! Chunk: voxel data plus lifecycle state, cached mesh and neighbour links
//!
//! A chunk is owned either by the manager's active map, by the pool, or
//! (while a job runs) by the job closure itself. Its lifecycle state is
//! an atomic so worker threads can read it without locks; the
//! orchestrator advances states with release stores, readers use
//! acquire loads.

use crate::error::WorldError;
use crate::height_zones::HeightZones;
use crate::meshing::MeshArrays;
use crate::registry::AIR;
use crate::voxel_data::{VoxelData, CHUNK_SIZE_XZ};
use glam::IVec3;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Instant;

/// Lifecycle states, in pipeline order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ChunkState {
    Inactive = 0,
    Generating = 1,
    Meshing = 2,
    Active = 3,
    Unloading = 4,
}

impl ChunkState {
    fn from_u8(value: u8) -> ChunkState {
        match value {
            1 => ChunkState::Generating,
            2 => ChunkState::Meshing,
            3 => ChunkState::Active,
            4 => ChunkState::Unloading,
            _ => ChunkState::Inactive,
        }
    }
}

/// The six face directions of a chunk, in neighbour-slot order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Face {
    NegX = 0,
    PosX = 1,
    NegY = 2,
    PosY = 3,
    NegZ = 4,
    PosZ = 5,
}

impl Face {
    pub const ALL: [Face; 6] = [
        Face::NegX,
        Face::PosX,
        Face::NegY,
        Face::PosY,
        Face::NegZ,
        Face::PosZ,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// The face on the other side of the shared plane
    pub fn opposite(self) -> Face {
        match self {
            Face::NegX => Face::PosX,
            Face::PosX => Face::NegX,
            Face::NegY => Face::PosY,
            Face::PosY => Face::NegY,
            Face::NegZ => Face::PosZ,
            Face::PosZ => Face::NegZ,
        }
    }

    /// Chunk-coordinate offset towards the neighbour behind this face
    pub fn offset(self) -> IVec3 {
        match self {
            Face::NegX => IVec3::new(-1, 0, 0),
            Face::PosX => IVec3::new(1, 0, 0),
            Face::NegY => IVec3::new(0, -1, 0),
            Face::PosY => IVec3::new(0, 1, 0),
            Face::NegZ => IVec3::new(0, 0, -1),
            Face::PosZ => IVec3::new(0, 0, 1),
        }
    }

    /// Outward unit normal of this face
    pub fn normal(self) -> [f32; 3] {
        match self {
            Face::NegX => [-1.0, 0.0, 0.0],
            Face::PosX => [1.0, 0.0, 0.0],
            Face::NegY => [0.0, -1.0, 0.0],
            Face::PosY => [0.0, 1.0, 0.0],
            Face::NegZ => [0.0, 0.0, -1.0],
            Face::PosZ => [0.0, 0.0, 1.0],
        }
    }
}

/// One 16 x h x 16 cuboid of the world
pub struct Chunk {
    coord: IVec3,

    /// World Y of the chunk's bottom voxel layer (zone-dependent)
    origin_y: i32,

    data: VoxelData,
    state: AtomicU8,
    mesh_dirty: bool,
    cached_mesh: Option<MeshArrays>,

    /// Coordinates of face-adjacent active chunks; the manager keeps
    /// these symmetric and clears both sides on unload
    neighbours: [Option<IVec3>; 6],

    last_access: Instant,
}

impl Chunk {
    pub fn new(coord: IVec3, height: usize, origin_y: i32) -> Self {
        Self {
            coord,
            origin_y,
            data: VoxelData::new(height),
            state: AtomicU8::new(ChunkState::Inactive as u8),
            mesh_dirty: false,
            cached_mesh: None,
            neighbours: [None; 6],
            last_access: Instant::now(),
        }
    }

    pub fn coord(&self) -> IVec3 {
        self.coord
    }

    /// World position of the minimum corner
    pub fn world_origin(&self) -> IVec3 {
        IVec3::new(
            self.coord.x * CHUNK_SIZE_XZ as i32,
            self.origin_y,
            self.coord.z * CHUNK_SIZE_XZ as i32,
        )
    }

    pub fn state(&self) -> ChunkState {
        ChunkState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn set_state(&self, state: ChunkState) {
        self.state.store(state as u8, Ordering::Release);
    }

    pub fn data(&self) -> &VoxelData {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut VoxelData {
        &mut self.data
    }

    pub fn mesh_dirty(&self) -> bool {
        self.mesh_dirty
    }

    pub fn cached_mesh(&self) -> Option<&MeshArrays> {
        self.cached_mesh.as_ref()
    }

    /// Store a fresh mesh emission, clearing the dirty flag
    pub fn set_cached_mesh(&mut self, arrays: MeshArrays) {
        self.cached_mesh = Some(arrays);
        self.mesh_dirty = false;
    }

    /// Drop the cached emission; the next region rebuild re-meshes
    pub fn invalidate_mesh(&mut self) {
        self.cached_mesh = None;
        self.mesh_dirty = true;
    }

    pub fn neighbour(&self, face: Face) -> Option<IVec3> {
        self.neighbours[face.index()]
    }

    pub fn set_neighbour(&mut self, face: Face, coord: Option<IVec3>) {
        self.neighbours[face.index()] = coord;
    }

    /// Refresh the LRU stamp
    pub fn touch(&mut self) {
        self.last_access = Instant::now();
    }

    pub fn last_access(&self) -> Instant {
        self.last_access
    }

    /// Voxel storage plus cached mesh footprint
    pub fn memory_bytes(&self) -> usize {
        self.data.memory_bytes()
            + self
                .cached_mesh
                .as_ref()
                .map_or(0, |arrays| arrays.memory_bytes())
    }

    /// Reinitialise a recycled chunk for a new coordinate
    pub fn reset(&mut self, coord: IVec3, height: usize, origin_y: i32) {
        self.coord = coord;
        self.origin_y = origin_y;
        self.data.reset(height);
        self.mesh_dirty = false;
        self.cached_mesh = None;
        self.neighbours = [None; 6];
        self.set_state(ChunkState::Inactive);
        self.touch();
    }

    /// Clear all derived state before the chunk goes back to the pool
    pub fn retire(&mut self) {
        self.data.fill(AIR);
        self.mesh_dirty = false;
        self.cached_mesh = None;
        self.neighbours = [None; 6];
        self.set_state(ChunkState::Inactive);
    }
}

/// Encode a chunk persistence record: coordinate as three little-endian
/// i32 values, then the voxel payload
pub fn encode_chunk_record(chunk: &Chunk) -> Vec<u8> {
    let payload = chunk.data().serialize();
    let mut bytes = Vec::with_capacity(12 + payload.len());
    bytes.extend_from_slice(&chunk.coord.x.to_le_bytes());
    bytes.extend_from_slice(&chunk.coord.y.to_le_bytes());
    bytes.extend_from_slice(&chunk.coord.z.to_le_bytes());
    bytes.extend_from_slice(&payload);
    bytes
}

/// Decode a chunk persistence record; the zone table supplies the
/// chunk height for the recorded coordinate
pub fn decode_chunk_record(
    bytes: &[u8],
    zones: &HeightZones,
) -> Result<(IVec3, VoxelData), WorldError> {
    if bytes.len() < 12 {
        return Err(WorldError::Payload(format!(
            "chunk record too short: {} bytes",
            bytes.len()
        )));
    }
    let read_i32 = |offset: usize| {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&bytes[offset..offset + 4]);
        i32::from_le_bytes(raw)
    };
    let coord = IVec3::new(read_i32(0), read_i32(4), read_i32(8));
    let height = zones.actual_chunk_y_size(coord.y) as usize;
    let data = VoxelData::deserialize(&bytes[12..], height)?;
    Ok((coord, data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::STONE;

    #[test]
    fn test_face_opposites_are_involutions() {
        for face in Face::ALL {
            assert_eq!(face.opposite().opposite(), face);
            assert_eq!(face.offset() + face.opposite().offset(), IVec3::ZERO);
        }
    }

    #[test]
    fn test_state_transitions() {
        let chunk = Chunk::new(IVec3::ZERO, 16, 0);
        assert_eq!(chunk.state(), ChunkState::Inactive);
        chunk.set_state(ChunkState::Generating);
        assert_eq!(chunk.state(), ChunkState::Generating);
        chunk.set_state(ChunkState::Meshing);
        chunk.set_state(ChunkState::Active);
        assert_eq!(chunk.state(), ChunkState::Active);
    }

    #[test]
    fn test_reset_clears_derived_state() {
        let mut chunk = Chunk::new(IVec3::new(1, 2, 3), 16, -32);
        chunk.data_mut().set(0, 0, 0, STONE);
        chunk.set_cached_mesh(MeshArrays::default());
        chunk.set_neighbour(Face::PosX, Some(IVec3::new(2, 2, 3)));
        chunk.set_state(ChunkState::Active);

        chunk.reset(IVec3::new(9, 41, -4), 16, 80);
        assert_eq!(chunk.coord(), IVec3::new(9, 41, -4));
        assert_eq!(chunk.world_origin(), IVec3::new(144, 80, -64));
        assert_eq!(chunk.state(), ChunkState::Inactive);
        assert!(chunk.cached_mesh().is_none());
        assert!(chunk.data().is_uniform());
        assert!(chunk.neighbour(Face::PosX).is_none());
    }

    #[test]
    fn test_memory_accounting() {
        let mut chunk = Chunk::new(IVec3::ZERO, 16, 0);
        assert_eq!(chunk.memory_bytes(), 2);
        chunk.data_mut().set(0, 0, 0, STONE);
        assert_eq!(chunk.memory_bytes(), 16 * 16 * 16);
    }

    #[test]
    fn test_chunk_record_roundtrip() {
        let zones = HeightZones::default();
        let coord = IVec3::new(-3, 36, 7);
        let height = zones.actual_chunk_y_size(coord.y) as usize;
        let origin_y = zones.chunk_y_to_world_y(coord.y);
        let mut chunk = Chunk::new(coord, height, origin_y);
        chunk.data_mut().set(4, 2, 11, STONE);

        let bytes = encode_chunk_record(&chunk);
        let (decoded_coord, decoded) = decode_chunk_record(&bytes, &zones).unwrap();
        assert_eq!(decoded_coord, coord);
        assert_eq!(decoded.get(4, 2, 11), STONE);
        assert_eq!(decoded.get(0, 0, 0), crate::registry::AIR);
    }

    #[test]
    fn test_chunk_record_rejects_truncated_input() {
        let zones = HeightZones::default();
        assert!(decode_chunk_record(&[0, 1, 2], &zones).is_err());
    }
}
