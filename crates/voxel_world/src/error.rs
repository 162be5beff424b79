//! Error kinds for the few conditions that surface as errors
//!
//! Most failure modes in this engine are policies rather than errors:
//! out-of-range voxel reads yield AIR, out-of-range writes are no-ops,
//! refused job submissions return `false` and are retried on a later
//! update, unknown type ids resolve to a default record. The variants
//! here cover startup validation and payload decoding, which genuinely
//! have no sensible fallback.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorldError {
    /// The thread pool needs at least one worker slot.
    #[error("worker thread count must be at least 1")]
    InvalidWorkerCount,

    /// The zone table is empty, unordered, overlapping or has a gap.
    #[error("invalid zone table: {0}")]
    InvalidZoneTable(String),

    /// Configuration file could not be read, parsed or written.
    #[error("configuration error: {0}")]
    Config(String),

    /// A voxel payload had an unknown flag byte or a bad length.
    #[error("voxel payload error: {0}")]
    Payload(String),
}
