//! # planclone-sync
//!
//! Snapshot and staged replication of a plan into a new plan.
//!
//! Call [`clone_plan`] with any [`planclone_core::PlannerService`] to run the
//! whole clone, or [`inspect`] for a read-only view of the order a clone
//! would create things in. [`MemoryPlanner`] is an in-memory service for
//! tests and local experiments.

pub mod diagnostics;
pub mod dry_run;
pub mod error;
pub mod memory;
pub mod pacing;
pub mod pipeline;
pub mod replicate;
pub mod snapshot;

pub use diagnostics::{Diagnostics, Stage, Warning};
pub use dry_run::{DryRun, RecordedWrite};
pub use error::{CloneError, SnapshotError};
pub use memory::MemoryPlanner;
pub use pacing::{NoPause, Pacing, Pause, RecordingPause, ThreadSleep};
pub use pipeline::{clone_plan, inspect, CloneOutcome, InspectReport, RunMode};
pub use replicate::{CloneOptions, CloneRequest, CloneSummary, Replicator, RunStatus};
pub use snapshot::{PlanSnapshot, TaskSnapshot};
