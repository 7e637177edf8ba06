//! Error types for planclone-sync.
//!
//! Everything here is fatal: the run stops and no summary is produced.
//! Per-item failures are recorded as [`Warning`](crate::Warning)s instead.

use thiserror::Error;

use planclone_core::{BucketId, PlanId, ServiceError};

/// Failures that leave nothing to replicate.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("source plan {id} could not be read: {source}")]
    SourcePlan {
        id: PlanId,
        #[source]
        source: ServiceError,
    },

    #[error("tasks of source plan {id} could not be listed: {source}")]
    TaskList {
        id: PlanId,
        #[source]
        source: ServiceError,
    },
}

/// Fatal outcomes of a clone run.
#[derive(Debug, Error)]
pub enum CloneError {
    #[error("no authenticated session: {0}")]
    NoSession(#[source] ServiceError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error("{count} task(s) reference buckets that could not be read (orphan policy: abort)")]
    OrphanedTasks { count: usize },

    #[error("failed to create destination plan '{title}': {source}")]
    CreatePlan {
        title: String,
        #[source]
        source: ServiceError,
    },

    #[error("failed to create bucket '{name}' (source bucket {source_bucket}): {source}")]
    CreateBucket {
        name: String,
        source_bucket: BucketId,
        #[source]
        source: ServiceError,
    },
}
