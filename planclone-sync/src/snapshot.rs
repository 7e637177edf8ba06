//! Read-only snapshot of a source plan.
//!
//! The snapshot is built once per run: the task list, each task's detail
//! record, then every bucket those tasks reference. Unreadable tasks and
//! buckets are dropped with a warning; only the plan and the task list are
//! required.

use std::collections::HashSet;

use planclone_core::order_key::order_by_key;
use planclone_core::{Bucket, BucketId, Plan, PlanId, PlannerService, Task, TaskDetail};

use crate::diagnostics::{Diagnostics, Stage};
use crate::error::SnapshotError;

/// A source task together with its detail record.
#[derive(Debug, Clone)]
pub struct TaskSnapshot {
    pub task: Task,
    pub detail: TaskDetail,
}

impl TaskSnapshot {
    /// Whether the task carries a description or checklist worth copying.
    pub fn has_details(&self) -> bool {
        self.detail.trimmed_description().is_some() || !self.detail.checklist.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct PlanSnapshot {
    pub plan: Plan,
    /// Buckets in fetch order (first reference wins).
    pub buckets: Vec<Bucket>,
    /// Tasks in listing order.
    pub tasks: Vec<TaskSnapshot>,
}

impl PlanSnapshot {
    /// Buckets in the service's intended order.
    pub fn ordered_buckets(&self) -> Vec<&Bucket> {
        order_by_key(self.buckets.iter().collect::<Vec<_>>(), |b| {
            b.order_key.as_str()
        })
    }

    /// Tasks of one bucket in the service's intended order.
    pub fn tasks_in(&self, bucket: &BucketId) -> Vec<&TaskSnapshot> {
        let group: Vec<&TaskSnapshot> = self
            .tasks
            .iter()
            .filter(|t| &t.task.bucket_id == bucket)
            .collect();
        order_by_key(group, |t| t.task.order_key.as_str())
    }

    /// Tasks whose bucket is not part of the snapshot.
    pub fn orphaned_tasks(&self) -> Vec<&TaskSnapshot> {
        let known: HashSet<&BucketId> = self.buckets.iter().map(|b| &b.id).collect();
        self.tasks
            .iter()
            .filter(|t| !known.contains(&t.task.bucket_id))
            .collect()
    }
}

/// Fetch the plan, then snapshot it.
pub fn build<S: PlannerService + ?Sized>(
    service: &S,
    plan: &PlanId,
    diagnostics: &mut Diagnostics,
) -> Result<PlanSnapshot, SnapshotError> {
    let plan = service
        .get_plan(plan)
        .map_err(|source| SnapshotError::SourcePlan {
            id: plan.clone(),
            source,
        })?;
    build_from(service, plan, diagnostics)
}

/// Snapshot an already-fetched plan.
pub fn build_from<S: PlannerService + ?Sized>(
    service: &S,
    plan: Plan,
    diagnostics: &mut Diagnostics,
) -> Result<PlanSnapshot, SnapshotError> {
    let listed = service
        .list_tasks(&plan.id)
        .map_err(|source| SnapshotError::TaskList {
            id: plan.id.clone(),
            source,
        })?;
    tracing::debug!(plan = %plan.id, tasks = listed.len(), "listed source tasks");

    let mut tasks = Vec::with_capacity(listed.len());
    for task in listed {
        match service.get_task_detail(&task.id) {
            Ok(detail) => tasks.push(TaskSnapshot { task, detail }),
            Err(err) => diagnostics.warn(
                Stage::Snapshot,
                format!("task '{}'", task.title),
                format!("detail unreadable, task skipped: {err}"),
            ),
        }
    }

    let mut seen = HashSet::new();
    let referenced: Vec<&BucketId> = tasks
        .iter()
        .map(|t| &t.task.bucket_id)
        .filter(|id| !id.as_str().is_empty() && seen.insert(*id))
        .collect();

    let mut buckets = Vec::with_capacity(referenced.len());
    for id in referenced {
        match service.get_bucket(id) {
            Ok(bucket) => buckets.push(bucket),
            Err(err) => {
                let stranded = tasks.iter().filter(|t| &t.task.bucket_id == id).count();
                diagnostics.warn(
                    Stage::Snapshot,
                    format!("bucket {id}"),
                    format!("bucket unreadable, {stranded} task(s) stranded: {err}"),
                );
            }
        }
    }

    tracing::info!(
        plan = %plan.title,
        buckets = buckets.len(),
        tasks = tasks.len(),
        "snapshot built"
    );
    Ok(PlanSnapshot {
        plan,
        buckets,
        tasks,
    })
}
