//! Working-set orchestrator
//!
//! `ChunkManager` turns an observer pose into a coherent set of
//! (voxel-data, mesh, region) triples. One thread (the caller of
//! `update`) owns all bookkeeping: the active map, the regions, the
//! chunk pool and the pending-job table. Workers only ever own the
//! single chunk handed to their job and report back through a
//! completion channel drained at the top of every update.

use crate::chunk::{Chunk, ChunkState, Face};
use crate::config::WorldConfig;
use crate::error::WorldError;
use crate::height_zones::HeightZones;
use crate::meshing::{CullingMesher, GreedyMesher, MeshArrays, MeshBuilder, NeighbourSnapshot};
use crate::raycast::{raycast_solid, RaycastHit};
use crate::region::{region_coord_for, Region};
use crate::registry::{VoxelId, VoxelTypeRegistry, AIR};
use crate::storage::{ChunkPool, ChunkPoolStats};
use crate::terrain::TerrainSource;
use crate::thread_pool::{Job, JobKind, ThreadPool};
use crate::voxel_data::CHUNK_SIZE_XZ;
use crossbeam_channel::{unbounded, Receiver, Sender};
use glam::{IVec3, Vec3};
use std::collections::{HashMap, HashSet};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Weight of radial distance in the scheduling priority
const PRIORITY_DISTANCE_WEIGHT: f32 = 1.5;

/// Weight of the view-direction term in the scheduling priority
const PRIORITY_DIRECTION_WEIGHT: f32 = 3.0;

/// Scale mapping view alignment (cosine, -1..1) onto the direction
/// term, so chunks dead ahead dominate and chunks behind sink
const DIRECTION_TERM_SCALE: f32 = 10.0;

/// Operator-facing counters
#[derive(Debug, Clone, Default)]
pub struct WorldStats {
    pub active_chunks: usize,
    pub pooled_chunks: usize,
    pub pending_jobs: usize,
    pub completed_jobs: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub active_regions: usize,
    pub dirty_regions: usize,
    pub memory_bytes: usize,
    pub avg_generation_ms: f32,
    pub avg_meshing_ms: f32,
    pub pool: ChunkPoolStats,
}

/// Where a requested chunk sits in the generation/meshing pipeline
enum JobState {
    /// Wanted, but no job accepted yet (queue was saturated)
    Requested,

    /// Generation job in flight
    Generating,

    /// Voxel data filled; the meshing submit was refused or failed
    AwaitingMesh(Box<Chunk>),

    /// Meshing job in flight
    Meshing,
}

/// What a worker sends back when its job finishes
enum JobOutcome {
    Generated {
        chunk: Box<Chunk>,
        elapsed_ms: f32,
    },
    Meshed {
        chunk: Box<Chunk>,
        arrays: MeshArrays,
        elapsed_ms: f32,
    },
    GenerationFailed {
        coord: IVec3,
        chunk: Box<Chunk>,
    },
    MeshingFailed {
        coord: IVec3,
        chunk: Box<Chunk>,
    },
}

/// The chunk lifecycle and regional batching engine
pub struct ChunkManager {
    config: WorldConfig,
    zones: HeightZones,
    registry: Arc<VoxelTypeRegistry>,
    terrain: Arc<dyn TerrainSource>,
    mesher: Arc<dyn MeshBuilder>,

    workers: ThreadPool,
    chunk_pool: ChunkPool,

    active: HashMap<IVec3, Chunk>,
    regions: HashMap<IVec3, Region>,
    pending: HashMap<IVec3, JobState>,

    required: HashSet<IVec3>,
    required_ordered: Vec<IVec3>,

    outcome_tx: Sender<JobOutcome>,
    outcome_rx: Receiver<JobOutcome>,

    last_observer_pos: Vec3,
    last_observer_forward: Vec3,
    has_observer: bool,
    shutting_down: bool,

    completed_jobs: u64,
    cache_hits: u64,
    cache_misses: u64,
    gen_total_ms: f32,
    gen_count: u64,
    mesh_total_ms: f32,
    mesh_count: u64,
}

impl ChunkManager {
    /// Build a manager with the default registry; the mesher follows
    /// the `greedy_meshing` configuration flag
    pub fn new(config: WorldConfig, terrain: Arc<dyn TerrainSource>) -> Result<Self, WorldError> {
        let registry = Arc::new(VoxelTypeRegistry::with_defaults());
        let mesher: Arc<dyn MeshBuilder> = if config.greedy_meshing {
            Arc::new(GreedyMesher::new(Arc::clone(&registry)))
        } else {
            Arc::new(CullingMesher::new(Arc::clone(&registry)))
        };
        Self::with_parts(config, terrain, registry, mesher)
    }

    /// Build a manager with a caller-supplied registry and mesher
    pub fn with_parts(
        config: WorldConfig,
        terrain: Arc<dyn TerrainSource>,
        registry: Arc<VoxelTypeRegistry>,
        mesher: Arc<dyn MeshBuilder>,
    ) -> Result<Self, WorldError> {
        let zones = config.height_zones()?;
        let workers = ThreadPool::new(config.worker_threads, config.max_pending_jobs)?;
        let chunk_pool = ChunkPool::new(config.chunk_pool_size);
        let (outcome_tx, outcome_rx) = unbounded();

        Ok(Self {
            config,
            zones,
            registry,
            terrain,
            mesher,
            workers,
            chunk_pool,
            active: HashMap::new(),
            regions: HashMap::new(),
            pending: HashMap::new(),
            required: HashSet::new(),
            required_ordered: Vec::new(),
            outcome_tx,
            outcome_rx,
            last_observer_pos: Vec3::ZERO,
            last_observer_forward: Vec3::NEG_Z,
            has_observer: false,
            shutting_down: false,
            completed_jobs: 0,
            cache_hits: 0,
            cache_misses: 0,
            gen_total_ms: 0.0,
            gen_count: 0,
            mesh_total_ms: 0.0,
            mesh_count: 0,
        })
    }

    pub fn registry(&self) -> &Arc<VoxelTypeRegistry> {
        &self.registry
    }

    pub fn zones(&self) -> &HeightZones {
        &self.zones
    }

    /// Re-evaluate the working set for an observer pose
    ///
    /// Always drains worker completions, retries refused submissions
    /// and spends the region-rebuild budget. The required set itself is
    /// only re-diffed when the observer moved at least
    /// `update_threshold_units` since the last re-diff.
    pub fn update(&mut self, observer_pos: Vec3, observer_forward: Vec3) {
        if self.shutting_down {
            return;
        }

        self.integrate_completed();

        let moved = !self.has_observer
            || (observer_pos - self.last_observer_pos).length() >= self.config.update_threshold_units;
        if moved {
            self.last_observer_pos = observer_pos;
            self.last_observer_forward = observer_forward;
            self.has_observer = true;
            self.refresh_required_set();
            self.evict_departed();
            self.prune_pending();
        }

        self.schedule_required();
        self.rebuild_dirty_regions();
    }

    /// Generate and activate the whole required set synchronously
    ///
    /// Bypasses the job queue: terrain fills run in a rayon batch and
    /// the chunks activate immediately. Their meshes are produced by
    /// the budgeted region rebuilds of the following updates. Returns
    /// the number of chunks generated.
    pub fn prewarm(&mut self, observer_pos: Vec3, observer_forward: Vec3) -> usize {
        if self.shutting_down {
            return 0;
        }
        self.last_observer_pos = observer_pos;
        self.last_observer_forward = observer_forward;
        self.has_observer = true;
        self.refresh_required_set();
        self.evict_departed();
        self.prune_pending();

        let missing: Vec<IVec3> = self
            .required_ordered
            .iter()
            .copied()
            .filter(|c| !self.active.contains_key(c) && !self.pending.contains_key(c))
            .collect();

        let mut batch: Vec<Chunk> = missing
            .iter()
            .map(|&coord| {
                let chunk = self.acquire_chunk(coord);
                chunk.set_state(ChunkState::Generating);
                chunk
            })
            .collect();
        self.terrain.fill_batch(&mut batch);

        let count = batch.len();
        for chunk in batch {
            chunk.set_state(ChunkState::Meshing);
            self.activate(chunk);
        }
        log::info!("prewarmed {count} chunks");
        count
    }

    /// Pump updates until the required set is fully resident and all
    /// regions are rebuilt, or the timeout fires
    ///
    /// A timeout is not an error: loading simply continues across later
    /// updates. Returns whether the world finished in time.
    pub fn wait_until_loaded(&mut self, timeout: Duration) -> bool {
        let started = Instant::now();
        loop {
            self.update(self.last_observer_pos, self.last_observer_forward);
            if self.is_idle() {
                return true;
            }
            if started.elapsed() >= timeout {
                log::warn!(
                    "initial load timed out with {} pending chunks",
                    self.pending.len()
                );
                return false;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    /// No pending work, the required set resident, no dirty regions
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
            && self.required.iter().all(|c| self.active.contains_key(c))
            && self.regions.values().all(|r| !r.is_dirty())
    }

    /// Read a voxel anywhere in the world; AIR when not resident
    pub fn get_voxel(&self, world: IVec3) -> VoxelId {
        let Some((coord, (x, y, z))) = self.locate(world) else {
            return AIR;
        };
        match self.active.get(&coord) {
            Some(chunk) => chunk.data().get(x, y, z),
            None => AIR,
        }
    }

    /// Write a voxel; no-op when the owning chunk is not resident
    ///
    /// A write that changes a cell invalidates the owning chunk's
    /// cached mesh, marks its region dirty, and does the same for every
    /// chunk across a boundary plane the cell sits on.
    pub fn set_voxel(&mut self, world: IVec3, id: VoxelId) {
        if self.shutting_down {
            return;
        }
        let Some((coord, (x, y, z))) = self.locate(world) else {
            return;
        };
        let Some(chunk) = self.active.get_mut(&coord) else {
            return;
        };
        if !chunk.data_mut().set(x, y, z, id) {
            // Unchanged cell: no allocation, no dirty flags.
            return;
        }
        chunk.touch();
        chunk.invalidate_mesh();
        let height = chunk.data().height();
        if let Some(region) = self.regions.get_mut(&region_coord_for(coord)) {
            region.mark_dirty();
        }

        // A boundary-plane write can change the face-culling decisions
        // of the chunk across that plane.
        let mut crossed = Vec::new();
        if x == 0 {
            crossed.push(Face::NegX);
        }
        if x == CHUNK_SIZE_XZ - 1 {
            crossed.push(Face::PosX);
        }
        if y == 0 {
            crossed.push(Face::NegY);
        }
        if y == height - 1 {
            crossed.push(Face::PosY);
        }
        if z == 0 {
            crossed.push(Face::NegZ);
        }
        if z == CHUNK_SIZE_XZ - 1 {
            crossed.push(Face::PosZ);
        }
        for face in crossed {
            let ncoord = coord + face.offset();
            if let Some(neighbour) = self.active.get_mut(&ncoord) {
                neighbour.invalidate_mesh();
                if let Some(region) = self.regions.get_mut(&region_coord_for(ncoord)) {
                    region.mark_dirty();
                }
            }
        }
    }

    /// Trace a ray against resident voxels (solid per the registry)
    pub fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<RaycastHit> {
        raycast_solid(origin, direction, max_distance, &self.registry, |p| {
            self.get_voxel(p)
        })
    }

    /// Operator statistics snapshot
    pub fn stats(&self) -> WorldStats {
        let chunk_memory: usize = self.active.values().map(|c| c.memory_bytes()).sum();
        let region_memory: usize = self
            .regions
            .values()
            .filter_map(|r| r.mesh().map(|m| m.memory_bytes()))
            .sum();
        WorldStats {
            active_chunks: self.active.len(),
            pooled_chunks: self.chunk_pool.len(),
            pending_jobs: self.pending.len(),
            completed_jobs: self.completed_jobs,
            cache_hits: self.cache_hits,
            cache_misses: self.cache_misses,
            active_regions: self.regions.len(),
            dirty_regions: self.regions.values().filter(|r| r.is_dirty()).count(),
            memory_bytes: chunk_memory + region_memory,
            avg_generation_ms: if self.gen_count > 0 {
                self.gen_total_ms / self.gen_count as f32
            } else {
                0.0
            },
            avg_meshing_ms: if self.mesh_count > 0 {
                self.mesh_total_ms / self.mesh_count as f32
            } else {
                0.0
            },
            pool: self.chunk_pool.stats(),
        }
    }

    /// Region meshes for rendering: (region coord, combined arrays)
    pub fn region_meshes(&self) -> impl Iterator<Item = (IVec3, &MeshArrays)> {
        self.regions
            .iter()
            .filter_map(|(&coord, region)| region.mesh().map(|mesh| (coord, mesh)))
    }

    /// Cancel pending jobs, drain the pool, recycle in-flight chunks
    pub fn shutdown(&mut self) {
        if self.shutting_down {
            return;
        }
        self.shutting_down = true;
        self.workers.shutdown();

        // Workers are gone; whatever reached the channel is recycled.
        let leftovers: Vec<JobOutcome> = self.outcome_rx.try_iter().collect();
        for outcome in leftovers {
            match outcome {
                JobOutcome::Generated { chunk, .. }
                | JobOutcome::Meshed { chunk, .. }
                | JobOutcome::GenerationFailed { chunk, .. }
                | JobOutcome::MeshingFailed { chunk, .. } => self.recycle(*chunk),
            }
        }
        let stalled: Vec<IVec3> = self.pending.keys().copied().collect();
        for coord in stalled {
            if let Some(JobState::AwaitingMesh(chunk)) = self.pending.remove(&coord) {
                self.recycle(*chunk);
            }
        }
        log::info!("chunk manager shut down");
    }

    // ------------------------------------------------------------------
    // Working set
    // ------------------------------------------------------------------

    /// Observer world position as a chunk coordinate
    fn observer_chunk(&self) -> IVec3 {
        let p = self.last_observer_pos;
        IVec3::new(
            (p.x.floor() as i32).div_euclid(CHUNK_SIZE_XZ as i32),
            self.zones.world_y_to_chunk_y(p.y.floor() as i32),
            (p.z.floor() as i32).div_euclid(CHUNK_SIZE_XZ as i32),
        )
    }

    /// Recompute the Manhattan-ball working set around the observer
    fn refresh_required_set(&mut self) {
        let center = self.observer_chunk();
        let r_h = self.config.render_distance_h;
        let r_v = self.config.render_distance_v;
        let total = self.zones.total_chunk_count();

        self.required.clear();
        self.required_ordered.clear();
        for dx in -r_h..=r_h {
            for dz in -r_h..=r_h {
                for dy in -r_v..=r_v {
                    if dx.abs() + dy.abs() + dz.abs() > r_h {
                        continue;
                    }
                    let cy = center.y + dy;
                    if cy < 0 || cy >= total {
                        continue;
                    }
                    let coord = IVec3::new(center.x + dx, cy, center.z + dz);
                    if self.required.insert(coord) {
                        self.required_ordered.push(coord);
                    }
                }
            }
        }
    }

    /// Scheduling priority: radial closeness plus view alignment
    fn priority_for(&self, coord: IVec3) -> f32 {
        let center = self.observer_chunk();
        let distance =
            (coord.x - center.x).abs() + (coord.y - center.y).abs() + (coord.z - center.z).abs();

        let chunk_center = self.chunk_center_world(coord);
        let to_chunk = chunk_center - self.last_observer_pos;
        let forward = self.last_observer_forward.normalize_or_zero();
        let alignment = if to_chunk.length_squared() > f32::EPSILON && forward != Vec3::ZERO {
            forward.dot(to_chunk.normalize())
        } else {
            // The observer's own chunk counts as dead ahead.
            1.0
        };

        PRIORITY_DISTANCE_WEIGHT * (self.config.render_distance_h - distance) as f32
            + PRIORITY_DIRECTION_WEIGHT * DIRECTION_TERM_SCALE * alignment
    }

    fn chunk_center_world(&self, coord: IVec3) -> Vec3 {
        let size = CHUNK_SIZE_XZ as f32;
        let origin_y = self.zones.chunk_y_to_world_y(coord.y) as f32;
        let height = self.zones.actual_chunk_y_size(coord.y) as f32;
        Vec3::new(
            coord.x as f32 * size + size * 0.5,
            origin_y + height * 0.5,
            coord.z as f32 * size + size * 0.5,
        )
    }

    /// World voxel coordinate -> (chunk coord, local cell)
    fn locate(&self, world: IVec3) -> Option<(IVec3, (usize, usize, usize))> {
        if world.y < self.zones.world_y_min() || world.y >= self.zones.world_y_max() {
            return None;
        }
        let size = CHUNK_SIZE_XZ as i32;
        let cy = self.zones.world_y_to_chunk_y(world.y);
        let coord = IVec3::new(world.x.div_euclid(size), cy, world.z.div_euclid(size));
        let local_y = world.y - self.zones.chunk_y_to_world_y(cy);
        Some((
            coord,
            (
                world.x.rem_euclid(size) as usize,
                local_y as usize,
                world.z.rem_euclid(size) as usize,
            ),
        ))
    }

    // ------------------------------------------------------------------
    // Job pipeline
    // ------------------------------------------------------------------

    fn acquire_chunk(&mut self, coord: IVec3) -> Chunk {
        let height = self.zones.actual_chunk_y_size(coord.y) as usize;
        let origin_y = self.zones.chunk_y_to_world_y(coord.y);
        self.chunk_pool.acquire(coord, height, origin_y)
    }

    fn recycle(&mut self, mut chunk: Chunk) {
        chunk.retire();
        self.chunk_pool.release(chunk);
    }

    /// Drain the completion channel and advance the pipeline
    fn integrate_completed(&mut self) {
        let outcomes: Vec<JobOutcome> = self.outcome_rx.try_iter().collect();
        for outcome in outcomes {
            match outcome {
                JobOutcome::Generated { chunk, elapsed_ms } => {
                    self.completed_jobs += 1;
                    self.gen_total_ms += elapsed_ms;
                    self.gen_count += 1;
                    let coord = chunk.coord();
                    // Eviction may have raced ahead of the job.
                    if self.shutting_down || !self.required.contains(&coord) {
                        self.pending.remove(&coord);
                        self.recycle(*chunk);
                        continue;
                    }
                    let priority = self.priority_for(coord);
                    match self.submit_mesh_job(chunk, priority) {
                        Ok(()) => {
                            self.pending.insert(coord, JobState::Meshing);
                        }
                        Err(chunk) => {
                            self.pending.insert(coord, JobState::AwaitingMesh(chunk));
                        }
                    }
                }
                JobOutcome::Meshed {
                    mut chunk,
                    arrays,
                    elapsed_ms,
                } => {
                    self.completed_jobs += 1;
                    self.mesh_total_ms += elapsed_ms;
                    self.mesh_count += 1;
                    let coord = chunk.coord();
                    self.pending.remove(&coord);
                    if self.shutting_down || !self.required.contains(&coord) {
                        self.recycle(*chunk);
                        continue;
                    }
                    chunk.set_cached_mesh(arrays);
                    self.activate(*chunk);
                }
                JobOutcome::GenerationFailed { coord, chunk } => {
                    log::warn!("terrain generation failed for chunk {coord}");
                    self.recycle(*chunk);
                    if !self.shutting_down && self.required.contains(&coord) {
                        self.pending.insert(coord, JobState::Requested);
                    } else {
                        self.pending.remove(&coord);
                    }
                }
                JobOutcome::MeshingFailed { coord, chunk } => {
                    log::warn!("meshing failed for chunk {coord}");
                    if !self.shutting_down && self.required.contains(&coord) {
                        // Voxel data survives; only the mesh is redone.
                        self.pending.insert(coord, JobState::AwaitingMesh(chunk));
                    } else {
                        self.pending.remove(&coord);
                        self.recycle(*chunk);
                    }
                }
            }
        }
    }

    /// Submit jobs for required chunks, highest priority first
    fn schedule_required(&mut self) {
        if !self.has_observer {
            return;
        }

        let mut candidates: Vec<(IVec3, f32)> = Vec::new();
        for &coord in &self.required_ordered {
            if self.active.contains_key(&coord) {
                continue;
            }
            match self.pending.get(&coord) {
                None | Some(JobState::Requested) | Some(JobState::AwaitingMesh(_)) => {
                    candidates.push((coord, self.priority_for(coord)));
                }
                Some(JobState::Generating) | Some(JobState::Meshing) => {}
            }
        }
        // Descending priority; the sort is stable, so equal priorities
        // keep required-set insertion order.
        candidates.sort_by(|a, b| b.1.total_cmp(&a.1));

        let mut saturated = false;
        for (coord, priority) in candidates {
            if saturated {
                // Leave a marker so the request survives to the next
                // update without losing an AwaitingMesh chunk.
                self.pending.entry(coord).or_insert(JobState::Requested);
                continue;
            }
            match self.pending.remove(&coord) {
                None | Some(JobState::Requested) => {
                    if self.submit_generation_job(coord, priority) {
                        self.pending.insert(coord, JobState::Generating);
                    } else {
                        self.pending.insert(coord, JobState::Requested);
                        saturated = true;
                    }
                }
                Some(JobState::AwaitingMesh(chunk)) => match self.submit_mesh_job(chunk, priority)
                {
                    Ok(()) => {
                        self.pending.insert(coord, JobState::Meshing);
                    }
                    Err(chunk) => {
                        self.pending.insert(coord, JobState::AwaitingMesh(chunk));
                        saturated = true;
                    }
                },
                Some(in_flight) => {
                    self.pending.insert(coord, in_flight);
                }
            }
        }
    }

    fn submit_generation_job(&mut self, coord: IVec3, priority: f32) -> bool {
        if !self.workers.has_capacity() {
            return false;
        }

        let chunk = self.acquire_chunk(coord);
        chunk.set_state(ChunkState::Generating);
        let mut boxed = Box::new(chunk);

        let terrain = Arc::clone(&self.terrain);
        let tx = self.outcome_tx.clone();
        let stop = self.workers.stop_flag();
        let job: Job = Box::new(move || {
            if stop.is_set() {
                return;
            }
            let started = Instant::now();
            let result = catch_unwind(AssertUnwindSafe(|| terrain.fill(&mut boxed)));
            let elapsed_ms = started.elapsed().as_secs_f32() * 1000.0;
            let outcome = match result {
                Ok(()) => JobOutcome::Generated {
                    chunk: boxed,
                    elapsed_ms,
                },
                Err(_) => JobOutcome::GenerationFailed {
                    coord,
                    chunk: boxed,
                },
            };
            let _ = tx.send(outcome);
        });
        self.workers.submit(JobKind::Generate, priority, job)
    }

    /// Submit a meshing job; gives the chunk back on refusal
    fn submit_mesh_job(&mut self, chunk: Box<Chunk>, priority: f32) -> Result<(), Box<Chunk>> {
        chunk.set_state(ChunkState::Meshing);
        if !self.workers.has_capacity() {
            return Err(chunk);
        }

        let coord = chunk.coord();
        let snapshot = self.neighbour_snapshot(coord, chunk.data().height());
        let mesher = Arc::clone(&self.mesher);
        let tx = self.outcome_tx.clone();
        let stop = self.workers.stop_flag();
        let job: Job = Box::new(move || {
            if stop.is_set() {
                return;
            }
            let started = Instant::now();
            let result =
                catch_unwind(AssertUnwindSafe(|| mesher.build(&chunk, &|p| snapshot.sample(p))));
            let elapsed_ms = started.elapsed().as_secs_f32() * 1000.0;
            let outcome = match result {
                Ok(arrays) => JobOutcome::Meshed {
                    chunk,
                    arrays,
                    elapsed_ms,
                },
                Err(_) => JobOutcome::MeshingFailed { coord, chunk },
            };
            let _ = tx.send(outcome);
        });
        let accepted = self.workers.submit(JobKind::Mesh, priority, job);
        // Only this thread submits or shuts the pool down, so a submit
        // that passed the capacity check cannot be refused.
        debug_assert!(accepted, "capacity checked by the sole submitter");
        Ok(())
    }

    /// Clone the six adjacent chunks' voxel grids for a meshing job
    fn neighbour_snapshot(&self, coord: IVec3, height: usize) -> NeighbourSnapshot {
        let mut faces: [Option<crate::voxel_data::VoxelData>; 6] =
            [None, None, None, None, None, None];
        for face in Face::ALL {
            if let Some(neighbour) = self.active.get(&(coord + face.offset())) {
                faces[face.index()] = Some(neighbour.data().clone());
            }
        }
        NeighbourSnapshot::new(height, faces)
    }

    /// Wire a finished chunk into the active set and its region
    fn activate(&mut self, mut chunk: Chunk) {
        let coord = chunk.coord();
        let mut had_neighbours = false;
        for face in Face::ALL {
            let ncoord = coord + face.offset();
            if let Some(neighbour) = self.active.get_mut(&ncoord) {
                neighbour.set_neighbour(face.opposite(), Some(coord));
                chunk.set_neighbour(face, Some(ncoord));
                // Both sides meshed assuming the other was absent; the
                // shared boundary is stale on both.
                neighbour.invalidate_mesh();
                had_neighbours = true;
                if let Some(region) = self.regions.get_mut(&region_coord_for(ncoord)) {
                    region.mark_dirty();
                }
            }
        }
        if had_neighbours {
            chunk.invalidate_mesh();
        }
        chunk.set_state(ChunkState::Active);
        chunk.touch();
        self.active.insert(coord, chunk);

        let rc = region_coord_for(coord);
        self.regions
            .entry(rc)
            .or_insert_with(|| Region::new(rc))
            .add_chunk(coord);
    }

    /// Unload every active chunk that left the required set
    fn evict_departed(&mut self) {
        let departed: Vec<IVec3> = self
            .active
            .keys()
            .filter(|c| !self.required.contains(*c))
            .copied()
            .collect();

        for coord in departed {
            let Some(chunk) = self.active.remove(&coord) else {
                continue;
            };
            chunk.set_state(ChunkState::Unloading);

            // Clear both sides of every neighbour link; the survivors'
            // boundary faces become stale.
            for face in Face::ALL {
                if let Some(ncoord) = chunk.neighbour(face) {
                    if let Some(neighbour) = self.active.get_mut(&ncoord) {
                        neighbour.set_neighbour(face.opposite(), None);
                        neighbour.invalidate_mesh();
                        if let Some(region) = self.regions.get_mut(&region_coord_for(ncoord)) {
                            region.mark_dirty();
                        }
                    }
                }
            }

            let rc = region_coord_for(coord);
            if let Some(region) = self.regions.get_mut(&rc) {
                region.remove_chunk(coord);
                if region.is_empty() {
                    self.regions.remove(&rc);
                }
            }

            self.recycle(chunk);
        }
    }

    /// Drop stale requests for chunks that left the required set
    ///
    /// In-flight jobs are left to finish; their results are discarded
    /// on arrival (eviction detection at each stage).
    fn prune_pending(&mut self) {
        let stale: Vec<IVec3> = self
            .pending
            .iter()
            .filter(|(coord, state)| {
                !self.required.contains(*coord)
                    && matches!(state, JobState::Requested | JobState::AwaitingMesh(_))
            })
            .map(|(coord, _)| *coord)
            .collect();
        for coord in stale {
            if let Some(JobState::AwaitingMesh(chunk)) = self.pending.remove(&coord) {
                self.recycle(*chunk);
            }
        }
    }

    /// Rebuild dirty regions, in-view first, within the time budget
    fn rebuild_dirty_regions(&mut self) {
        let budget = Duration::from_secs_f32(self.config.region_rebuild_budget_ms.max(0.0) / 1000.0);
        let started = Instant::now();

        let forward = self.last_observer_forward.normalize_or_zero();
        let mut dirty: Vec<(f32, IVec3)> = Vec::new();
        for (&rc, region) in &self.regions {
            if !region.is_dirty() {
                continue;
            }
            let bounds = region.world_bounds(&self.zones);
            let score = if bounds.is_empty() {
                f32::MIN
            } else {
                let to_region = bounds.center() - self.last_observer_pos;
                let in_view = forward.dot(to_region) > 0.0;
                (if in_view { 1000.0 } else { 0.0 }) - to_region.length()
            };
            dirty.push((score, rc));
        }
        dirty.sort_by(|a, b| b.0.total_cmp(&a.0));

        for (_, rc) in dirty {
            if started.elapsed() >= budget {
                // Partial completion is fine: the rest stay dirty and
                // are picked up next update.
                break;
            }
            if let Some(region) = self.regions.get_mut(&rc) {
                let outcome = region.rebuild(&mut self.active, self.mesher.as_ref(), &self.zones);
                self.cache_hits += outcome.cache_hits;
                self.cache_misses += outcome.cache_misses;
            }
        }
    }
}

impl Drop for ChunkManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}
