//! Terrain sources: pluggable voxel content generators
//!
//! The manager hands a chunk to a `TerrainSource` on a worker thread;
//! the source fills the chunk's cells from its world position and the
//! world seed. Sources must be deterministic per (seed, chunk
//! coordinate) and must never reach into neighbouring chunks.

use crate::chunk::Chunk;
use crate::registry::{
    VoxelId, AIR, BEDROCK, COAL_ORE, DIAMOND_ORE, DIRT, GOLD_ORE, GRASS, IRON_ORE, SAND, STONE,
    WATER,
};
use crate::voxel_data::CHUNK_SIZE_XZ;
use rayon::prelude::*;

/// A voxel content generator
pub trait TerrainSource: Send + Sync {
    /// Populate one chunk's voxel data
    fn fill(&self, chunk: &mut Chunk);

    /// Fill many chunks in parallel; used by the initial-load warm-up
    /// path which bypasses the job queue
    fn fill_batch(&self, chunks: &mut [Chunk]) {
        chunks.par_iter_mut().for_each(|chunk| self.fill(chunk));
    }

    fn source_name(&self) -> &str;
}

/// Parameters for the built-in layered heightmap source
#[derive(Debug, Clone)]
pub struct TerrainLayers {
    /// Mean surface level
    pub base_height: f32,

    /// Surface variation amplitude
    pub amplitude: f32,

    /// Noise frequency (smaller values give larger features)
    pub frequency: f32,

    /// Open water fills up to this level
    pub water_level: i32,

    /// Everything at or below this world Y is bedrock
    pub bedrock_floor: i32,

    pub seed: u32,
}

impl Default for TerrainLayers {
    fn default() -> Self {
        Self {
            base_height: 32.0,
            amplitude: 24.0,
            frequency: 0.01,
            water_level: 8,
            bedrock_floor: -1084,
            seed: 1337,
        }
    }
}

/// Value-noise heightmap with stone/dirt/grass layering and sparse ores
pub struct LayeredTerrainSource {
    layers: TerrainLayers,
}

impl LayeredTerrainSource {
    pub fn new(layers: TerrainLayers) -> Self {
        Self { layers }
    }

    /// Terrain surface level at a world XZ column
    pub fn surface_height(&self, wx: i32, wz: i32) -> i32 {
        let fx = wx as f32 * self.layers.frequency;
        let fz = wz as f32 * self.layers.frequency;

        let n1 = value_noise_2d(fx, fz, self.layers.seed);
        let n2 = value_noise_2d(fx * 2.0, fz * 2.0, self.layers.seed ^ 0x9E37_79B9);
        let n3 = value_noise_2d(fx * 4.0, fz * 4.0, self.layers.seed ^ 0x85EB_CA6B);
        let combined = n1 * 0.6 + n2 * 0.25 + n3 * 0.15;

        (self.layers.base_height + combined * self.layers.amplitude).floor() as i32
    }

    fn classify(&self, wx: i32, wy: i32, wz: i32, surface: i32) -> VoxelId {
        if wy <= self.layers.bedrock_floor {
            return BEDROCK;
        }
        if wy < surface {
            let depth = surface - wy;
            if depth == 1 {
                // Beaches near the water line, grass above it.
                if surface <= self.layers.water_level + 1 {
                    SAND
                } else {
                    GRASS
                }
            } else if depth <= 4 {
                DIRT
            } else {
                self.deep_block(wx, wy, wz)
            }
        } else if wy <= self.layers.water_level {
            WATER
        } else {
            AIR
        }
    }

    fn deep_block(&self, wx: i32, wy: i32, wz: i32) -> VoxelId {
        let roll = cell_hash_3d(wx, wy, wz, self.layers.seed ^ 0xC2B2_AE35);
        if roll > 0.995 && wy < -64 {
            DIAMOND_ORE
        } else if roll > 0.990 {
            if wy < 0 {
                GOLD_ORE
            } else {
                IRON_ORE
            }
        } else if roll > 0.975 {
            COAL_ORE
        } else {
            STONE
        }
    }
}

impl Default for LayeredTerrainSource {
    fn default() -> Self {
        Self::new(TerrainLayers::default())
    }
}

impl TerrainSource for LayeredTerrainSource {
    fn fill(&self, chunk: &mut Chunk) {
        let origin = chunk.world_origin();
        let height = chunk.data().height();

        for z in 0..CHUNK_SIZE_XZ {
            for x in 0..CHUNK_SIZE_XZ {
                let wx = origin.x + x as i32;
                let wz = origin.z + z as i32;
                let surface = self.surface_height(wx, wz);

                for y in 0..height {
                    let wy = origin.y + y as i32;
                    let id = self.classify(wx, wy, wz, surface);
                    if id != AIR {
                        chunk.data_mut().set(x, y, z, id);
                    }
                }
            }
        }

        // Solid-stone and all-air chunks fold back to a single byte.
        chunk.data_mut().try_compact();
    }

    fn source_name(&self) -> &str {
        "layered"
    }
}

/// Smoothed value noise in [-1, 1]
fn value_noise_2d(x: f32, z: f32, seed: u32) -> f32 {
    let xi = x.floor() as i32;
    let zi = z.floor() as i32;
    let u = smoothstep(x - xi as f32);
    let v = smoothstep(z - zi as f32);

    let a = cell_hash_2d(xi, zi, seed);
    let b = cell_hash_2d(xi + 1, zi, seed);
    let c = cell_hash_2d(xi, zi + 1, seed);
    let d = cell_hash_2d(xi + 1, zi + 1, seed);

    lerp(lerp(a, b, u), lerp(c, d, u), v)
}

/// Integer lattice hash in [-1, 1]
fn cell_hash_2d(x: i32, z: i32, seed: u32) -> f32 {
    let mut h = (x as u32).wrapping_mul(0x85EB_CA6B) ^ (z as u32).wrapping_mul(0xC2B2_AE35) ^ seed;
    h ^= h >> 13;
    h = h.wrapping_mul(0x27D4_EB2F);
    h ^= h >> 15;
    (h as f32 / u32::MAX as f32) * 2.0 - 1.0
}

/// 3D lattice hash in [0, 1]
fn cell_hash_3d(x: i32, y: i32, z: i32, seed: u32) -> f32 {
    let mut h = (x as u32).wrapping_mul(0x85EB_CA6B)
        ^ (y as u32).wrapping_mul(0x9E37_79B9)
        ^ (z as u32).wrapping_mul(0xC2B2_AE35)
        ^ seed;
    h ^= h >> 16;
    h = h.wrapping_mul(0x7FEB_352D);
    h ^= h >> 15;
    h as f32 / u32::MAX as f32
}

fn smoothstep(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
