//! planclone core library — domain types, ordering, attachment keys, config.
//!
//! - [`types`] — newtypes and domain structs
//! - [`order_key`] — sibling order recovery from opaque sort keys
//! - [`attachment`] — decode-fully / encode-once reference keys
//! - [`service`] — the [`PlannerService`] trait and [`ServiceError`]
//! - [`config`] — optional `~/.planclone/config.yaml`
//! - [`error`] — [`ConfigError`]

pub mod attachment;
pub mod config;
pub mod error;
pub mod order_key;
pub mod service;
pub mod types;

pub use attachment::{NormalizeError, ReferenceKey};
pub use config::{Config, OrphanPolicy, PacingConfig};
pub use error::ConfigError;
pub use service::{PlannerService, ServiceError};
pub use types::{
    AttachmentReference, Bucket, BucketId, ChecklistEntry, ChecklistItem, ConcurrencyToken,
    DetailPatch, NewTask, OrderKey, OwnerId, Plan, PlanId, PreviewType, Principal,
    ReferencePatch, Task, TaskDetail, TaskId,
};
