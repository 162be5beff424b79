//! Priority job pool with bounded pending work
//!
//! Workers block on a condvar, pop the highest-priority job under the
//! queue lock, run it outside the lock, and loop. `submit` refuses work
//! once the pending queue reaches its cap or after shutdown; callers
//! retry on a later tick. Jobs of equal priority run in submit order,
//! but completion order across jobs is not guaranteed.

use crate::error::WorldError;
use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

/// What a job does, for logging and statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Generate,
    Mesh,
}

/// Opaque unit of work; must not touch the queue lock
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Cloneable view of the pool's cooperative stop flag
///
/// Long-running tasks poll this at safe points and bail out early when
/// a shutdown is in progress.
#[derive(Clone)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

struct QueuedJob {
    priority: f32,
    seq: u64,
    kind: JobKind,
    job: Job,
}

impl PartialEq for QueuedJob {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == CmpOrdering::Equal
    }
}

impl Eq for QueuedJob {}

impl PartialOrd for QueuedJob {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedJob {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        // Max-heap: higher priority pops first; equal priorities pop in
        // submission order (lower sequence number first).
        self.priority
            .total_cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct PoolShared {
    queue: Mutex<BinaryHeap<QueuedJob>>,
    ready: Condvar,
    stop: Arc<AtomicBool>,
    active: AtomicUsize,
    completed: AtomicU64,
    next_seq: AtomicU64,
    max_pending: usize,
}

/// Fixed-size worker pool draining a bounded priority queue
pub struct ThreadPool {
    shared: Arc<PoolShared>,
    workers: Vec<JoinHandle<()>>,
}

impl ThreadPool {
    /// Spawn `worker_threads` workers; zero workers is rejected
    pub fn new(worker_threads: usize, max_pending: usize) -> Result<Self, WorldError> {
        if worker_threads == 0 {
            return Err(WorldError::InvalidWorkerCount);
        }

        let shared = Arc::new(PoolShared {
            queue: Mutex::new(BinaryHeap::new()),
            ready: Condvar::new(),
            stop: Arc::new(AtomicBool::new(false)),
            active: AtomicUsize::new(0),
            completed: AtomicU64::new(0),
            next_seq: AtomicU64::new(0),
            max_pending,
        });

        let mut workers = Vec::with_capacity(worker_threads);
        for worker_id in 0..worker_threads {
            let shared = Arc::clone(&shared);
            let handle = std::thread::Builder::new()
                .name(format!("voxel-worker-{worker_id}"))
                .spawn(move || worker_loop(&shared))
                .map_err(|e| WorldError::Config(format!("failed to spawn worker: {e}")))?;
            workers.push(handle);
        }

        log::info!("thread pool started with {worker_threads} workers");
        Ok(Self { shared, workers })
    }

    /// Queue a job. Returns false when the queue is at capacity or the
    /// pool has been shut down; the caller retries on a later tick.
    pub fn submit(&self, kind: JobKind, priority: f32, job: Job) -> bool {
        if self.shared.stop.load(Ordering::Acquire) {
            return false;
        }
        {
            let mut queue = self.shared.queue.lock().unwrap();
            if queue.len() >= self.shared.max_pending {
                return false;
            }
            let seq = self.shared.next_seq.fetch_add(1, Ordering::Relaxed);
            queue.push(QueuedJob {
                priority,
                seq,
                kind,
                job,
            });
        }
        self.shared.ready.notify_one();
        true
    }

    /// Jobs waiting in the queue
    pub fn pending(&self) -> usize {
        self.shared.queue.lock().unwrap().len()
    }

    /// Whether a submit issued now would be accepted
    ///
    /// Only the orchestrator submits and workers only drain, so a
    /// positive answer cannot turn false before the submit lands.
    pub fn has_capacity(&self) -> bool {
        !self.shared.stop.load(Ordering::Acquire)
            && self.shared.queue.lock().unwrap().len() < self.shared.max_pending
    }

    /// Jobs currently executing on workers
    pub fn active(&self) -> usize {
        self.shared.active.load(Ordering::Acquire)
    }

    /// Jobs that finished executing (including panicked ones)
    pub fn completed(&self) -> u64 {
        self.shared.completed.load(Ordering::Acquire)
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.stop.load(Ordering::Acquire)
    }

    /// Handle to the cooperative stop flag for task closures
    pub fn stop_flag(&self) -> StopFlag {
        StopFlag(Arc::clone(&self.shared.stop))
    }

    /// Signal workers, drop the pending queue, and join
    ///
    /// In-flight jobs run to completion; queued ones are discarded.
    pub fn shutdown(&mut self) {
        if self.shared.stop.swap(true, Ordering::AcqRel) {
            return;
        }
        {
            let mut queue = self.shared.queue.lock().unwrap();
            queue.clear();
        }
        self.shared.ready.notify_all();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
        log::info!("thread pool shut down");
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(shared: &PoolShared) {
    loop {
        let queued = {
            let mut queue = shared.queue.lock().unwrap();
            loop {
                if shared.stop.load(Ordering::Acquire) {
                    return;
                }
                if let Some(job) = queue.pop() {
                    // Incremented under the lock so pending + active
                    // never transiently under-counts in-flight work.
                    shared.active.fetch_add(1, Ordering::AcqRel);
                    break job;
                }
                queue = shared.ready.wait(queue).unwrap();
            }
        };

        let result = catch_unwind(AssertUnwindSafe(queued.job));
        shared.completed.fetch_add(1, Ordering::AcqRel);
        shared.active.fetch_sub(1, Ordering::AcqRel);

        if result.is_err() {
            log::warn!("{:?} job panicked on worker thread", queued.kind);
        }
    }
}
