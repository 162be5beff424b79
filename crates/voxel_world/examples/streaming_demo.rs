//! Example: a headless streaming session
//!
//! Drives the chunk manager through a full lifecycle without a
//! renderer: initial load, an edit, a raycast pick and a teleport,
//! printing stats after each phase.

use glam::Vec3;
use std::sync::Arc;
use std::time::Duration;
use voxel_world::{ChunkManager, LayeredTerrainSource, WorldConfig, AIR};

fn main() {
    env_logger::init();

    let config = WorldConfig {
        render_distance_h: 4,
        render_distance_v: 2,
        ..WorldConfig::default()
    };
    let terrain = Arc::new(LayeredTerrainSource::default());
    let mut manager = ChunkManager::new(config, terrain).expect("manager startup");

    // Phase 1: initial load around the spawn point.
    let spawn = Vec3::new(0.0, 48.0, 0.0);
    let forward = Vec3::NEG_Z;
    manager.update(spawn, forward);
    let loaded = manager.wait_until_loaded(Duration::from_secs(10));
    println!("initial load complete: {loaded}");
    print_stats("after load", &manager);

    // Phase 2: pick the ground under the observer and dig a hole.
    if let Some(hit) = manager.raycast(spawn, Vec3::new(0.0, -1.0, 0.0), 64.0) {
        println!(
            "ground at {} ({})",
            hit.voxel,
            manager.registry().name(hit.id)
        );
        manager.set_voxel(hit.voxel, AIR);
        manager.wait_until_loaded(Duration::from_secs(5));
        print_stats("after edit", &manager);
    }

    // Phase 3: teleport far away; the old site recycles into the pool.
    manager.update(Vec3::new(2000.0, 48.0, 2000.0), forward);
    manager.wait_until_loaded(Duration::from_secs(10));
    print_stats("after teleport", &manager);

    // Combined region meshes would now feed the renderer.
    let triangles: usize = manager
        .region_meshes()
        .map(|(_, mesh)| mesh.triangle_count())
        .sum();
    println!("{triangles} triangles across regions");

    manager.shutdown();
}

fn print_stats(label: &str, manager: &ChunkManager) {
    let stats = manager.stats();
    println!(
        "[{label}] chunks={} pooled={} regions={} dirty={} jobs={} cache={}H/{}M mem={}KiB",
        stats.active_chunks,
        stats.pooled_chunks,
        stats.active_regions,
        stats.dirty_regions,
        stats.completed_jobs,
        stats.cache_hits,
        stats.cache_misses,
        stats.memory_bytes / 1024,
    );
}
