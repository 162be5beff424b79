//! Regions: 8x8x8 chunk groups sharing one combined draw-call mesh
//!
//! A region owns no chunks, only their coordinates; chunk storage
//! belongs to the manager. Rebuilding concatenates the member chunks'
//! cached mesh arrays (meshing the stale ones first), translating each
//! into region-local space and rebasing indices.

use crate::chunk::{Chunk, ChunkState};
use crate::height_zones::HeightZones;
use crate::meshing::{exit_face, neighbour_cell, MeshArrays, MeshBuilder};
use crate::registry::VoxelId;
use crate::voxel_data::CHUNK_SIZE_XZ;
use glam::IVec3;
use math_util::Aabb;
use std::collections::{HashMap, HashSet};

/// Region edge length, in chunks
pub const REGION_SIZE: i32 = 8;

/// Region coordinate containing a chunk coordinate
pub fn region_coord_for(chunk_coord: IVec3) -> IVec3 {
    IVec3::new(
        chunk_coord.x.div_euclid(REGION_SIZE),
        chunk_coord.y.div_euclid(REGION_SIZE),
        chunk_coord.z.div_euclid(REGION_SIZE),
    )
}

/// Cache accounting for one rebuild pass
#[derive(Debug, Default, Clone, Copy)]
pub struct RegionRebuild {
    pub cache_hits: u64,
    pub cache_misses: u64,
}

/// One 8x8x8 group of chunks and its combined mesh
pub struct Region {
    coord: IVec3,
    members: HashSet<IVec3>,
    mesh: Option<MeshArrays>,
    dirty: bool,
}

impl Region {
    pub fn new(coord: IVec3) -> Self {
        Self {
            coord,
            members: HashSet::new(),
            mesh: None,
            dirty: false,
        }
    }

    pub fn coord(&self) -> IVec3 {
        self.coord
    }

    pub fn add_chunk(&mut self, chunk_coord: IVec3) {
        if self.members.insert(chunk_coord) {
            self.dirty = true;
        }
    }

    pub fn remove_chunk(&mut self, chunk_coord: IVec3) -> bool {
        let removed = self.members.remove(&chunk_coord);
        if removed {
            self.dirty = true;
        }
        removed
    }

    pub fn contains(&self, chunk_coord: IVec3) -> bool {
        self.members.contains(&chunk_coord)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn members(&self) -> impl Iterator<Item = IVec3> + '_ {
        self.members.iter().copied()
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The combined mesh from the last rebuild, if it emitted geometry
    pub fn mesh(&self) -> Option<&MeshArrays> {
        self.mesh.as_ref()
    }

    /// World position of the region's minimum corner
    pub fn world_origin(&self, zones: &HeightZones) -> IVec3 {
        IVec3::new(
            self.coord.x * REGION_SIZE * CHUNK_SIZE_XZ as i32,
            zones.chunk_y_to_world_y(self.coord.y * REGION_SIZE),
            self.coord.z * REGION_SIZE * CHUNK_SIZE_XZ as i32,
        )
    }

    /// Union of the member chunks' world-space boxes
    ///
    /// Computed from actual member extents so truncated top chunks and
    /// mixed zone heights are honoured.
    pub fn world_bounds(&self, zones: &HeightZones) -> Aabb {
        let mut bounds = Aabb::EMPTY;
        for &coord in &self.members {
            let origin = glam::Vec3::new(
                (coord.x * CHUNK_SIZE_XZ as i32) as f32,
                zones.chunk_y_to_world_y(coord.y) as f32,
                (coord.z * CHUNK_SIZE_XZ as i32) as f32,
            );
            let size = glam::Vec3::new(
                CHUNK_SIZE_XZ as f32,
                zones.actual_chunk_y_size(coord.y) as f32,
                CHUNK_SIZE_XZ as f32,
            );
            bounds = bounds.union(&Aabb::from_origin_size(origin, size));
        }
        bounds
    }

    /// Rebuild the combined mesh from member chunks
    ///
    /// Members with a cached emission are appended as-is (a cache hit);
    /// stale members are re-meshed against the current active set first
    /// (a cache miss). The new combined mesh replaces the old one only
    /// at the end, so readers never observe a half-built region.
    pub fn rebuild(
        &mut self,
        chunks: &mut HashMap<IVec3, Chunk>,
        builder: &dyn MeshBuilder,
        zones: &HeightZones,
    ) -> RegionRebuild {
        let mut ordered: Vec<IVec3> = self.members.iter().copied().collect();
        ordered.sort_by_key(|c| (c.y, c.z, c.x));

        let mut outcome = RegionRebuild::default();

        // Mesh the stale members first, reading neighbours from the
        // active set. Results are applied after the scan because the
        // builds borrow the map immutably.
        let mut built: Vec<(IVec3, MeshArrays)> = Vec::new();
        for &coord in &ordered {
            let Some(chunk) = chunks.get(&coord) else {
                continue;
            };
            if chunk.state() != ChunkState::Active {
                continue;
            }
            if chunk.cached_mesh().is_some() {
                outcome.cache_hits += 1;
                continue;
            }
            outcome.cache_misses += 1;

            let own_height = chunk.data().height() as i32;
            let lookup = |local: IVec3| -> Option<VoxelId> {
                let face = exit_face(local, own_height)?;
                let neighbour = chunks.get(&(coord + face.offset()))?;
                if neighbour.state() != ChunkState::Active {
                    return None;
                }
                let (x, y, z) =
                    neighbour_cell(face, local, own_height, neighbour.data().height() as i32);
                Some(neighbour.data().get(x, y, z))
            };
            built.push((coord, builder.build(chunk, &lookup)));
        }
        for (coord, arrays) in built {
            if let Some(chunk) = chunks.get_mut(&coord) {
                chunk.set_cached_mesh(arrays);
            }
        }

        // Concatenate into one indexed mesh in region-local space.
        let origin = self.world_origin(zones);
        let mut combined = MeshArrays::default();
        let mut normals_ok = true;
        let mut colors_ok = true;
        let mut uvs_ok = true;

        for &coord in &ordered {
            let Some(chunk) = chunks.get(&coord) else {
                continue;
            };
            if chunk.state() != ChunkState::Active {
                continue;
            }
            let Some(arrays) = chunk.cached_mesh() else {
                continue;
            };
            if arrays.is_empty() {
                continue;
            }

            let offset = (chunk.world_origin() - origin).as_vec3();
            let base = combined.positions.len() as u32;
            combined
                .indices
                .extend(arrays.indices.iter().map(|i| i + base));
            combined.positions.extend(
                arrays
                    .positions
                    .iter()
                    .map(|p| [p[0] + offset.x, p[1] + offset.y, p[2] + offset.z]),
            );

            // Attribute slots that disagree with the vertex count drop
            // the whole slot rather than ship a half-initialised array.
            if arrays.normals.len() == arrays.positions.len() {
                combined.normals.extend_from_slice(&arrays.normals);
            } else {
                normals_ok = false;
            }
            if arrays.colors.len() == arrays.positions.len() {
                combined.colors.extend_from_slice(&arrays.colors);
            } else {
                colors_ok = false;
            }
            if arrays.uvs.len() == arrays.positions.len() {
                combined.uvs.extend_from_slice(&arrays.uvs);
            } else {
                uvs_ok = false;
            }
        }

        if !normals_ok {
            combined.normals.clear();
        }
        if !colors_ok {
            combined.colors.clear();
        }
        if !uvs_ok {
            combined.uvs.clear();
        }

        self.mesh = if combined.is_empty() {
            None
        } else {
            Some(combined)
        };
        self.dirty = false;
        outcome
    }
}
