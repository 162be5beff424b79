//! Chunk pool: recycles chunk storage to avoid per-frame allocations
//!
//! Evicted chunks come back here with their voxel data reset to uniform
//! AIR; newcomers re-initialise a pooled chunk instead of allocating.
//! The pool is bounded: releases beyond the cap drop the chunk.

use crate::chunk::Chunk;
use glam::IVec3;
use std::collections::VecDeque;

/// Pool counters, surfaced through the manager's stats
#[derive(Debug, Clone, Copy, Default)]
pub struct ChunkPoolStats {
    pub available: usize,
    pub allocations: u64,
    pub reuses: u64,
    pub dropped: u64,
}

/// Bounded FIFO of recycled chunks
pub struct ChunkPool {
    available: VecDeque<Chunk>,
    max_size: usize,
    stats: ChunkPoolStats,
}

impl ChunkPool {
    pub fn new(max_size: usize) -> Self {
        Self {
            available: VecDeque::with_capacity(max_size),
            max_size,
            stats: ChunkPoolStats::default(),
        }
    }

    /// Take a chunk from the pool, or allocate a fresh one
    ///
    /// The chunk is re-initialised for the given coordinate and zone
    /// height either way, in the INACTIVE state.
    pub fn acquire(&mut self, coord: IVec3, height: usize, origin_y: i32) -> Chunk {
        if let Some(mut chunk) = self.available.pop_front() {
            chunk.reset(coord, height, origin_y);
            self.stats.reuses += 1;
            self.stats.available = self.available.len();
            chunk
        } else {
            self.stats.allocations += 1;
            Chunk::new(coord, height, origin_y)
        }
    }

    /// Return a chunk for reuse; dropped when the pool is full
    ///
    /// The caller is expected to have retired the chunk (uniform AIR,
    /// no mesh, no neighbour links, INACTIVE).
    pub fn release(&mut self, chunk: Chunk) {
        if self.available.len() < self.max_size {
            self.available.push_back(chunk);
        } else {
            self.stats.dropped += 1;
        }
        self.stats.available = self.available.len();
    }

    /// Warm the pool with pre-allocated chunks before the first update
    pub fn preallocate(&mut self, count: usize, height: usize) {
        for _ in 0..count.min(self.max_size.saturating_sub(self.available.len())) {
            self.available
                .push_back(Chunk::new(IVec3::ZERO, height, 0));
            self.stats.allocations += 1;
        }
        self.stats.available = self.available.len();
    }

    pub fn len(&self) -> usize {
        self.available.len()
    }

    pub fn is_empty(&self) -> bool {
        self.available.is_empty()
    }

    pub fn stats(&self) -> ChunkPoolStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkState;
    use crate::registry::STONE;

    #[test]
    fn test_acquire_from_empty_pool_allocates() {
        let mut pool = ChunkPool::new(4);
        let chunk = pool.acquire(IVec3::new(1, 2, 3), 16, -32);
        assert_eq!(chunk.coord(), IVec3::new(1, 2, 3));
        assert_eq!(pool.stats().allocations, 1);
        assert_eq!(pool.stats().reuses, 0);
    }

    #[test]
    fn test_release_then_acquire_reuses() {
        let mut pool = ChunkPool::new(4);
        let mut chunk = pool.acquire(IVec3::ZERO, 16, 0);
        chunk.data_mut().set(0, 0, 0, STONE);
        chunk.retire();
        pool.release(chunk);
        assert_eq!(pool.len(), 1);

        let recycled = pool.acquire(IVec3::new(5, 40, -2), 32, 160);
        assert_eq!(pool.stats().reuses, 1);
        assert_eq!(recycled.coord(), IVec3::new(5, 40, -2));
        assert_eq!(recycled.state(), ChunkState::Inactive);
        assert!(recycled.data().is_uniform());
        assert_eq!(recycled.data().height(), 32);
    }

    #[test]
    fn test_release_beyond_cap_drops() {
        let mut pool = ChunkPool::new(2);
        for _ in 0..4 {
            pool.release(Chunk::new(IVec3::ZERO, 16, 0));
        }
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.stats().dropped, 2);
    }

    #[test]
    fn test_preallocate_respects_cap() {
        let mut pool = ChunkPool::new(3);
        pool.preallocate(10, 16);
        assert_eq!(pool.len(), 3);
    }
}
