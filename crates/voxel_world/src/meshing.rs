//! Surface extraction: per-face emission with cross-chunk culling
//!
//! The builder walks every opaque cell and emits a quad for each face
//! whose adjacent cell is transparent (AIR included). Adjacency at the
//! chunk boundary goes through a neighbour-lookup closure; a missing
//! neighbour reads as opaque so chunk interiors stay hidden while their
//! surroundings are still loading.

use crate::chunk::{Chunk, Face};
use crate::registry::{VoxelId, VoxelTypeRegistry, AIR};
use crate::voxel_data::{VoxelData, CHUNK_SIZE_XZ};
use glam::IVec3;
use math_util::Aabb;
use std::sync::Arc;

/// Indexed triangle arrays for one chunk (or one combined region)
///
/// Positions are local to the chunk origin. All attribute arrays run
/// parallel to `positions`; `indices` triples form triangles.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MeshArrays {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub colors: Vec<[f32; 4]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

/// Size summary for one mesh emission
#[derive(Debug, Default, Clone, Copy)]
pub struct MeshStats {
    pub vertex_count: usize,
    pub triangle_count: usize,
    pub memory_bytes: usize,
}

impl MeshArrays {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn memory_bytes(&self) -> usize {
        self.positions.len() * std::mem::size_of::<[f32; 3]>()
            + self.normals.len() * std::mem::size_of::<[f32; 3]>()
            + self.colors.len() * std::mem::size_of::<[f32; 4]>()
            + self.uvs.len() * std::mem::size_of::<[f32; 2]>()
            + self.indices.len() * std::mem::size_of::<u32>()
    }

    pub fn stats(&self) -> MeshStats {
        MeshStats {
            vertex_count: self.vertex_count(),
            triangle_count: self.triangle_count(),
            memory_bytes: self.memory_bytes(),
        }
    }

    /// Bounding box of the emitted vertices, in the mesh's local space
    pub fn aabb(&self) -> Aabb {
        let mut aabb = Aabb::EMPTY;
        for position in &self.positions {
            let p = glam::Vec3::from_array(*position);
            aabb.min = aabb.min.min(p);
            aabb.max = aabb.max.max(p);
        }
        aabb
    }

    pub fn clear(&mut self) {
        self.positions.clear();
        self.normals.clear();
        self.colors.clear();
        self.uvs.clear();
        self.indices.clear();
    }
}

/// Pluggable surface extractor
pub trait MeshBuilder: Send + Sync {
    /// Build triangle arrays for one chunk
    ///
    /// `neighbour_voxel` receives local coordinates that step exactly
    /// one cell outside the chunk bounds and returns the cell from the
    /// adjacent chunk, or `None` when that chunk is not resident.
    fn build(
        &self,
        chunk: &Chunk,
        neighbour_voxel: &dyn Fn(IVec3) -> Option<VoxelId>,
    ) -> MeshArrays;
}

// Quad corners per face, wound counter-clockwise seen from outside the
// cell; triangles are (0,1,2) and (0,2,3). Indexed by Face.
const FACE_QUADS: [[[f32; 3]; 4]; 6] = [
    // -X
    [[0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 1.0], [0.0, 1.0, 0.0]],
    // +X
    [[1.0, 0.0, 1.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [1.0, 1.0, 1.0]],
    // -Y
    [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 0.0, 1.0], [0.0, 0.0, 1.0]],
    // +Y
    [[0.0, 1.0, 1.0], [1.0, 1.0, 1.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
    // -Z
    [[1.0, 0.0, 0.0], [0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 0.0]],
    // +Z
    [[0.0, 0.0, 1.0], [1.0, 0.0, 1.0], [1.0, 1.0, 1.0], [0.0, 1.0, 1.0]],
];

const FACE_UVS: [[f32; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];

/// The naive per-face mesher with correct cross-chunk culling
pub struct CullingMesher {
    registry: Arc<VoxelTypeRegistry>,
}

impl CullingMesher {
    pub fn new(registry: Arc<VoxelTypeRegistry>) -> Self {
        Self { registry }
    }
}

/// The visibility rule shared by every mesher in this module
///
/// Returns the cell's type id when the cell is opaque and the face
/// towards `face` shows (adjacent cell transparent, AIR included). A
/// missing neighbour counts as opaque: suppress.
fn visible_face_id(
    registry: &VoxelTypeRegistry,
    data: &VoxelData,
    neighbour_voxel: &dyn Fn(IVec3) -> Option<VoxelId>,
    pos: IVec3,
    face: Face,
) -> Option<VoxelId> {
    let id = data.get(pos.x as usize, pos.y as usize, pos.z as usize);
    // Only opaque cells emit faces.
    if registry.is_transparent(id) {
        return None;
    }

    let size = CHUNK_SIZE_XZ as i32;
    let height = data.height() as i32;
    let at = pos + face.offset();
    let adjacent =
        if at.x >= 0 && at.x < size && at.y >= 0 && at.y < height && at.z >= 0 && at.z < size {
            Some(data.get(at.x as usize, at.y as usize, at.z as usize))
        } else {
            neighbour_voxel(at)
        };

    match adjacent {
        Some(a) if registry.is_transparent(a) => Some(id),
        _ => None,
    }
}

impl MeshBuilder for CullingMesher {
    fn build(
        &self,
        chunk: &Chunk,
        neighbour_voxel: &dyn Fn(IVec3) -> Option<VoxelId>,
    ) -> MeshArrays {
        let mut arrays = MeshArrays::default();
        let data = chunk.data();

        // A uniform-AIR chunk has no surface at all.
        if data.uniform_value() == Some(AIR) {
            return arrays;
        }

        let size = CHUNK_SIZE_XZ as i32;
        let height = data.height() as i32;

        for z in 0..size {
            for y in 0..height {
                for x in 0..size {
                    for face in Face::ALL {
                        let pos = IVec3::new(x, y, z);
                        if let Some(id) =
                            visible_face_id(&self.registry, data, neighbour_voxel, pos, face)
                        {
                            emit_face(
                                &mut arrays,
                                x as f32,
                                y as f32,
                                z as f32,
                                face,
                                self.registry.color(id),
                            );
                        }
                    }
                }
            }
        }

        arrays
    }
}

/// Greedy variant: merges coplanar same-type quads into rectangles
///
/// Uses the exact visibility rule of `CullingMesher`, so the covered
/// surface is identical; only the quad partitioning differs. Merged
/// corners are a subset of the per-cell corners.
pub struct GreedyMesher {
    registry: Arc<VoxelTypeRegistry>,
}

impl GreedyMesher {
    pub fn new(registry: Arc<VoxelTypeRegistry>) -> Self {
        Self { registry }
    }

    fn mesh_face(
        &self,
        data: &VoxelData,
        neighbour_voxel: &dyn Fn(IVec3) -> Option<VoxelId>,
        face: Face,
        arrays: &mut MeshArrays,
    ) {
        let dims = [
            CHUNK_SIZE_XZ as i32,
            data.height() as i32,
            CHUNK_SIZE_XZ as i32,
        ];
        // Sweep axis and the two tangent axes of this face's plane.
        let d = match face {
            Face::NegX | Face::PosX => 0,
            Face::NegY | Face::PosY => 1,
            Face::NegZ | Face::PosZ => 2,
        };
        let (ua, va) = match d {
            0 => (2, 1),
            1 => (0, 2),
            _ => (0, 1),
        };
        let (u_len, v_len) = (dims[ua], dims[va]);

        let mut mask: Vec<Option<VoxelId>> = vec![None; (u_len * v_len) as usize];
        for s in 0..dims[d] {
            for v in 0..v_len {
                for u in 0..u_len {
                    let mut cell = [0i32; 3];
                    cell[d] = s;
                    cell[ua] = u;
                    cell[va] = v;
                    mask[(u + v * u_len) as usize] = visible_face_id(
                        &self.registry,
                        data,
                        neighbour_voxel,
                        IVec3::new(cell[0], cell[1], cell[2]),
                        face,
                    );
                }
            }

            for v in 0..v_len {
                let mut u = 0;
                while u < u_len {
                    let Some(id) = mask[(u + v * u_len) as usize] else {
                        u += 1;
                        continue;
                    };

                    // Stretch along u, then along v while every column
                    // in the row still matches.
                    let mut w = 1;
                    while u + w < u_len && mask[(u + w + v * u_len) as usize] == Some(id) {
                        w += 1;
                    }
                    let mut h = 1;
                    'grow: while v + h < v_len {
                        for k in 0..w {
                            if mask[(u + k + (v + h) * u_len) as usize] != Some(id) {
                                break 'grow;
                            }
                        }
                        h += 1;
                    }

                    for dv in 0..h {
                        for du in 0..w {
                            mask[(u + du + (v + dv) * u_len) as usize] = None;
                        }
                    }

                    self.emit_merged(arrays, face, d, ua, va, s, u, v, w, h, id);
                    u += w;
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn emit_merged(
        &self,
        arrays: &mut MeshArrays,
        face: Face,
        d: usize,
        ua: usize,
        va: usize,
        s: i32,
        u: i32,
        v: i32,
        w: i32,
        h: i32,
        id: VoxelId,
    ) {
        let positive = matches!(face, Face::PosX | Face::PosY | Face::PosZ);
        let mut base = [0.0f32; 3];
        base[d] = (s + i32::from(positive)) as f32;
        base[ua] = u as f32;
        base[va] = v as f32;
        let mut along_u = [0.0f32; 3];
        along_u[ua] = w as f32;
        let mut along_v = [0.0f32; 3];
        along_v[va] = h as f32;

        let add = |a: [f32; 3], b: [f32; 3]| [a[0] + b[0], a[1] + b[1], a[2] + b[2]];
        let far = add(add(base, along_u), along_v);
        // u cross v points along -X, -Y and +Z; reverse the other three
        // faces so every quad winds counter-clockwise from outside.
        let direct = matches!(face, Face::NegX | Face::NegY | Face::PosZ);
        let (corners, uvs) = if direct {
            (
                [base, add(base, along_u), far, add(base, along_v)],
                [[0.0, 0.0], [w as f32, 0.0], [w as f32, h as f32], [0.0, h as f32]],
            )
        } else {
            (
                [base, add(base, along_v), far, add(base, along_u)],
                [[0.0, 0.0], [0.0, h as f32], [w as f32, h as f32], [w as f32, 0.0]],
            )
        };

        let start = arrays.positions.len() as u32;
        arrays
            .indices
            .extend_from_slice(&[start, start + 1, start + 2, start, start + 2, start + 3]);
        let normal = face.normal();
        let color = self.registry.color(id);
        for (corner, uv) in corners.iter().zip(uvs.iter()) {
            arrays.positions.push(*corner);
            arrays.normals.push(normal);
            arrays.colors.push(color);
            arrays.uvs.push(*uv);
        }
    }
}

impl MeshBuilder for GreedyMesher {
    fn build(
        &self,
        chunk: &Chunk,
        neighbour_voxel: &dyn Fn(IVec3) -> Option<VoxelId>,
    ) -> MeshArrays {
        let mut arrays = MeshArrays::default();
        let data = chunk.data();
        if data.uniform_value() == Some(AIR) {
            return arrays;
        }
        for face in Face::ALL {
            self.mesh_face(data, neighbour_voxel, face, &mut arrays);
        }
        arrays
    }
}

#[inline]
fn emit_face(arrays: &mut MeshArrays, x: f32, y: f32, z: f32, face: Face, color: [f32; 4]) {
    let base = arrays.positions.len() as u32;
    arrays
        .indices
        .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);

    let quad = FACE_QUADS[face.index()];
    let normal = face.normal();
    for (corner, uv) in quad.iter().zip(FACE_UVS.iter()) {
        arrays
            .positions
            .push([x + corner[0], y + corner[1], z + corner[2]]);
        arrays.normals.push(normal);
        arrays.colors.push(color);
        arrays.uvs.push(*uv);
    }
}

/// Which face a one-cell excursion outside the chunk bounds crossed
pub fn exit_face(local: IVec3, height: i32) -> Option<Face> {
    let size = CHUNK_SIZE_XZ as i32;
    if local.x < 0 {
        Some(Face::NegX)
    } else if local.x >= size {
        Some(Face::PosX)
    } else if local.y < 0 {
        Some(Face::NegY)
    } else if local.y >= height {
        Some(Face::PosY)
    } else if local.z < 0 {
        Some(Face::NegZ)
    } else if local.z >= size {
        Some(Face::PosZ)
    } else {
        None
    }
}

/// Map an out-of-bounds local coordinate onto the neighbour's grid
///
/// Y-adjacent neighbours can have a different height than the chunk the
/// coordinate came from, so both heights are required.
pub fn neighbour_cell(
    face: Face,
    local: IVec3,
    own_height: i32,
    neighbour_height: i32,
) -> (usize, usize, usize) {
    let size = CHUNK_SIZE_XZ as i32;
    let (x, y, z) = match face {
        Face::NegX => (size + local.x, local.y, local.z),
        Face::PosX => (local.x - size, local.y, local.z),
        Face::NegY => (local.x, neighbour_height + local.y, local.z),
        Face::PosY => (local.x, local.y - own_height, local.z),
        Face::NegZ => (local.x, local.y, size + local.z),
        Face::PosZ => (local.x, local.y, local.z - size),
    };
    (x as usize, y as usize, z as usize)
}

/// Owned copies of the six adjacent chunks' voxel grids
///
/// Meshing jobs run on worker threads that must not reach back into the
/// manager, so the orchestrator snapshots neighbour data at submit time
/// and the job samples the snapshot instead.
pub struct NeighbourSnapshot {
    own_height: i32,
    faces: [Option<VoxelData>; 6],
}

impl NeighbourSnapshot {
    pub fn new(own_height: usize, faces: [Option<VoxelData>; 6]) -> Self {
        Self {
            own_height: own_height as i32,
            faces,
        }
    }

    /// Snapshot with no neighbours at all
    pub fn empty(own_height: usize) -> Self {
        Self::new(own_height, [None, None, None, None, None, None])
    }

    /// Sample an out-of-bounds local coordinate; `None` when the
    /// neighbour on that side was absent at snapshot time
    pub fn sample(&self, local: IVec3) -> Option<VoxelId> {
        let face = exit_face(local, self.own_height)?;
        let data = self.faces[face.index()].as_ref()?;
        let (x, y, z) = neighbour_cell(face, local, self.own_height, data.height() as i32);
        Some(data.get(x, y, z))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{DIRT, GLASS, STONE};

    fn mesher() -> CullingMesher {
        CullingMesher::new(Arc::new(VoxelTypeRegistry::with_defaults()))
    }

    fn none_lookup(_: IVec3) -> Option<VoxelId> {
        None
    }

    #[test]
    fn test_empty_chunk_emits_nothing() {
        let chunk = Chunk::new(IVec3::ZERO, 16, 0);
        let arrays = mesher().build(&chunk, &none_lookup);
        assert!(arrays.is_empty());
        assert_eq!(arrays.triangle_count(), 0);
    }

    #[test]
    fn test_single_interior_voxel_emits_six_faces() {
        let mut chunk = Chunk::new(IVec3::ZERO, 16, 0);
        chunk.data_mut().set(5, 5, 5, STONE);
        let arrays = mesher().build(&chunk, &none_lookup);
        assert_eq!(arrays.vertex_count(), 24);
        assert_eq!(arrays.triangle_count(), 12);
        assert_eq!(arrays.normals.len(), 24);
        assert_eq!(arrays.colors.len(), 24);
        assert_eq!(arrays.uvs.len(), 24);
    }

    #[test]
    fn test_corner_voxel_suppressed_without_neighbours() {
        let mut chunk = Chunk::new(IVec3::ZERO, 16, 0);
        chunk.data_mut().set(0, 0, 0, STONE);
        // Missing neighbours are opaque: only the three in-chunk faces.
        let arrays = mesher().build(&chunk, &none_lookup);
        assert_eq!(arrays.triangle_count(), 6);

        // With air neighbours all six faces appear.
        let arrays = mesher().build(&chunk, &|_| Some(AIR));
        assert_eq!(arrays.triangle_count(), 12);
    }

    #[test]
    fn test_buried_chunk_emits_nothing() {
        let mut chunk = Chunk::new(IVec3::ZERO, 16, 0);
        chunk.data_mut().fill(STONE);
        let arrays = mesher().build(&chunk, &|_| Some(STONE));
        assert!(arrays.is_empty());
    }

    #[test]
    fn test_floor_plane_emits_top_faces_only() {
        let mut chunk = Chunk::new(IVec3::ZERO, 16, 0);
        for z in 0..CHUNK_SIZE_XZ {
            for x in 0..CHUNK_SIZE_XZ {
                chunk.data_mut().set(x, 0, z, STONE);
            }
        }
        let arrays = mesher().build(&chunk, &none_lookup);
        // 16x16 top quads; bottom and sides face missing neighbours.
        assert_eq!(arrays.triangle_count(), 256 * 2);
        assert!(arrays.normals.iter().all(|n| *n == [0.0, 1.0, 0.0]));
    }

    #[test]
    fn test_transparent_neighbour_exposes_face() {
        let mut chunk = Chunk::new(IVec3::ZERO, 16, 0);
        chunk.data_mut().set(5, 5, 5, STONE);
        chunk.data_mut().set(6, 5, 5, GLASS);
        let arrays = mesher().build(&chunk, &none_lookup);
        // Stone still shows all six faces (glass is transparent); the
        // glass cell itself emits nothing.
        assert_eq!(arrays.triangle_count(), 12);
    }

    #[test]
    fn test_winding_matches_normals() {
        for face in Face::ALL {
            let quad = FACE_QUADS[face.index()];
            let a = glam::Vec3::from_array(quad[0]);
            let b = glam::Vec3::from_array(quad[1]);
            let c = glam::Vec3::from_array(quad[2]);
            let computed = (b - a).cross(c - b).normalize();
            let expected = glam::Vec3::from_array(face.normal());
            assert!(
                computed.distance(expected) < 1e-6,
                "face {face:?}: {computed} vs {expected}"
            );
        }
    }

    #[test]
    fn test_snapshot_sampling() {
        let mut west = VoxelData::new(16);
        west.set(15, 4, 4, STONE);
        let mut below = VoxelData::new(32);
        below.set(3, 31, 4, STONE);

        let snapshot = NeighbourSnapshot::new(
            16,
            [Some(west), None, Some(below), None, None, None],
        );
        // One cell west of local x=0 is the neighbour's x=15 column.
        assert_eq!(snapshot.sample(IVec3::new(-1, 4, 4)), Some(STONE));
        assert_eq!(snapshot.sample(IVec3::new(-1, 5, 4)), Some(AIR));
        // One cell below local y=0 is the taller neighbour's top layer.
        assert_eq!(snapshot.sample(IVec3::new(3, -1, 4)), Some(STONE));
        // Sides without a snapshot read as missing.
        assert_eq!(snapshot.sample(IVec3::new(16, 4, 4)), None);
        assert_eq!(snapshot.sample(IVec3::new(3, 16, 4)), None);
    }

    #[test]
    fn test_aabb_of_emission() {
        let mut chunk = Chunk::new(IVec3::ZERO, 16, 0);
        chunk.data_mut().set(2, 3, 4, STONE);
        let arrays = mesher().build(&chunk, &none_lookup);
        let aabb = arrays.aabb();
        assert_eq!(aabb.min, glam::Vec3::new(2.0, 3.0, 4.0));
        assert_eq!(aabb.max, glam::Vec3::new(3.0, 4.0, 5.0));
    }

    fn greedy() -> GreedyMesher {
        GreedyMesher::new(Arc::new(VoxelTypeRegistry::with_defaults()))
    }

    /// Decompose a mesh back into the set of unit cell-faces it covers
    fn covered_faces(arrays: &MeshArrays) -> std::collections::HashSet<(i32, i32, i32, usize)> {
        let mut covered = std::collections::HashSet::new();
        for quad in 0..arrays.vertex_count() / 4 {
            let corners = &arrays.positions[quad * 4..quad * 4 + 4];
            let normal = arrays.normals[quad * 4];
            let face = Face::ALL
                .into_iter()
                .find(|f| f.normal() == normal)
                .expect("axis-aligned normal");
            let offset = face.offset();
            let d = if offset.x != 0 {
                0
            } else if offset.y != 0 {
                1
            } else {
                2
            };
            let positive = offset[d] > 0;

            let mut min = corners[0];
            let mut max = corners[0];
            for corner in corners {
                for axis in 0..3 {
                    min[axis] = min[axis].min(corner[axis]);
                    max[axis] = max[axis].max(corner[axis]);
                }
            }
            let cell_d = if positive {
                min[d] as i32 - 1
            } else {
                min[d] as i32
            };

            let tangents: Vec<usize> = (0..3).filter(|&a| a != d).collect();
            for a in min[tangents[0]] as i32..max[tangents[0]] as i32 {
                for b in min[tangents[1]] as i32..max[tangents[1]] as i32 {
                    let mut cell = [0i32; 3];
                    cell[d] = cell_d;
                    cell[tangents[0]] = a;
                    cell[tangents[1]] = b;
                    covered.insert((cell[0], cell[1], cell[2], face.index()));
                }
            }
        }
        covered
    }

    fn patterned_chunk() -> Chunk {
        let mut chunk = Chunk::new(IVec3::ZERO, 16, 0);
        for z in 0..CHUNK_SIZE_XZ {
            for y in 0..16 {
                for x in 0..CHUNK_SIZE_XZ {
                    if (x + 2 * y + 3 * z) % 5 == 0 {
                        chunk.data_mut().set(x, y, z, STONE);
                    } else if (x * z + y) % 11 == 0 {
                        chunk.data_mut().set(x, y, z, DIRT);
                    }
                }
            }
        }
        chunk
    }

    #[test]
    fn test_greedy_merges_full_plane() {
        let mut chunk = Chunk::new(IVec3::ZERO, 16, 0);
        for z in 0..CHUNK_SIZE_XZ {
            for x in 0..CHUNK_SIZE_XZ {
                chunk.data_mut().set(x, 0, z, STONE);
            }
        }
        // Only the top of the sheet shows, and it merges to one quad.
        let arrays = greedy().build(&chunk, &none_lookup);
        assert_eq!(arrays.vertex_count(), 4);
        assert_eq!(arrays.triangle_count(), 2);
        assert!(arrays.normals.iter().all(|n| *n == [0.0, 1.0, 0.0]));
        let aabb = arrays.aabb();
        assert_eq!(aabb.min, glam::Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(aabb.max, glam::Vec3::new(16.0, 1.0, 16.0));
    }

    #[test]
    fn test_greedy_winding_matches_normals() {
        let mut chunk = Chunk::new(IVec3::ZERO, 16, 0);
        chunk.data_mut().set(5, 5, 5, STONE);
        let arrays = greedy().build(&chunk, &|_| Some(AIR));
        assert_eq!(arrays.triangle_count(), 12);
        for quad in 0..arrays.vertex_count() / 4 {
            let p = &arrays.positions[quad * 4..quad * 4 + 4];
            let a = glam::Vec3::from_array(p[0]);
            let b = glam::Vec3::from_array(p[1]);
            let c = glam::Vec3::from_array(p[2]);
            let winding = (b - a).cross(c - b).normalize();
            let normal = glam::Vec3::from_array(arrays.normals[quad * 4]);
            assert!(winding.distance(normal) < 1e-6, "{winding} vs {normal}");
        }
    }

    #[test]
    fn test_greedy_covers_same_surface_as_naive() {
        let chunk = patterned_chunk();

        // Identical coverage with absent neighbours...
        let naive = mesher().build(&chunk, &none_lookup);
        let merged = greedy().build(&chunk, &none_lookup);
        assert_eq!(covered_faces(&naive), covered_faces(&merged));
        assert!(merged.vertex_count() <= naive.vertex_count());

        // ...and with air on every side.
        let naive = mesher().build(&chunk, &|_| Some(AIR));
        let merged = greedy().build(&chunk, &|_| Some(AIR));
        assert_eq!(covered_faces(&naive), covered_faces(&merged));
    }

    #[test]
    fn test_greedy_does_not_merge_across_types() {
        let mut chunk = Chunk::new(IVec3::ZERO, 16, 0);
        chunk.data_mut().set(3, 0, 3, STONE);
        chunk.data_mut().set(4, 0, 3, DIRT);
        let arrays = greedy().build(&chunk, &none_lookup);
        // The coplanar top faces stay two quads: types differ.
        let top_quads = arrays
            .normals
            .iter()
            .filter(|n| **n == [0.0, 1.0, 0.0])
            .count()
            / 4;
        assert_eq!(top_quads, 2);
        // Same-type pairs do merge: a stone pair collapses its top.
        let mut pair = Chunk::new(IVec3::ZERO, 16, 0);
        pair.data_mut().set(3, 0, 3, STONE);
        pair.data_mut().set(4, 0, 3, STONE);
        let merged = greedy().build(&pair, &none_lookup);
        let top_quads = merged
            .normals
            .iter()
            .filter(|n| **n == [0.0, 1.0, 0.0])
            .count()
            / 4;
        assert_eq!(top_quads, 1);
    }

    #[test]
    fn test_greedy_buried_chunk_emits_nothing() {
        let mut chunk = Chunk::new(IVec3::ZERO, 16, 0);
        chunk.data_mut().fill(STONE);
        let arrays = greedy().build(&chunk, &|_| Some(STONE));
        assert!(arrays.is_empty());
    }
}
