//! Shared entrypoints used by the CLI.

use serde::Serialize;

use planclone_core::{Config, PlanId, PlannerService, TaskId};

use crate::diagnostics::{Diagnostics, Stage, Warning};
use crate::dry_run::{DryRun, RecordedWrite};
use crate::error::{CloneError, SnapshotError};
use crate::pacing::{NoPause, ThreadSleep};
use crate::replicate::{CloneOptions, CloneRequest, CloneSummary, Replicator, RunStatus};
use crate::snapshot;

/// Whether writes reach the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Live,
    /// Reads are real, writes are recorded, pauses are skipped.
    DryRun,
}

#[derive(Debug, Clone)]
pub struct CloneOutcome {
    pub summary: CloneSummary,
    /// Writes that a dry run held back. Empty for live runs.
    pub recorded_writes: Vec<RecordedWrite>,
}

/// Clone a plan with settings from `config`.
pub fn clone_plan<S: PlannerService>(
    service: S,
    config: &Config,
    request: &CloneRequest,
    mode: RunMode,
) -> Result<CloneOutcome, CloneError> {
    let options = CloneOptions::from(config);
    tracing::info!(
        source = %request.source_plan,
        owner = %request.owner,
        title = %request.title,
        dry_run = mode == RunMode::DryRun,
        "starting clone"
    );
    match mode {
        RunMode::Live => {
            let summary = Replicator::new(service, ThreadSleep, options).run(request)?;
            Ok(CloneOutcome {
                summary,
                recorded_writes: Vec::new(),
            })
        }
        RunMode::DryRun => {
            let mut replicator = Replicator::new(DryRun::new(service), NoPause, options);
            let mut summary = replicator.run(request)?;
            summary.status = RunStatus::DryRun;
            Ok(CloneOutcome {
                summary,
                recorded_writes: replicator.into_service().into_writes(),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Inspect
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct InspectedTask {
    pub id: TaskId,
    pub title: String,
    pub order_key: String,
    pub checklist_items: usize,
    pub attachments: usize,
    pub has_description: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct InspectedBucket {
    pub name: String,
    pub order_key: String,
    pub tasks: Vec<InspectedTask>,
}

/// A plan as the clone would see it, in creation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct InspectReport {
    pub plan_id: PlanId,
    pub title: String,
    pub buckets: Vec<InspectedBucket>,
    pub orphaned_tasks: Vec<String>,
    pub warnings: Vec<Warning>,
}

/// Verify the session and snapshot `plan` without writing anything.
pub fn inspect<S: PlannerService + ?Sized>(
    service: &S,
    plan: &PlanId,
) -> Result<InspectReport, CloneError> {
    service.verify_session().map_err(CloneError::NoSession)?;
    let mut diagnostics = Diagnostics::new();
    let snapshot = snapshot::build(service, plan, &mut diagnostics)?;

    let buckets = snapshot
        .ordered_buckets()
        .into_iter()
        .map(|bucket| InspectedBucket {
            name: bucket.name.clone(),
            order_key: bucket.order_key.to_string(),
            tasks: snapshot
                .tasks_in(&bucket.id)
                .into_iter()
                .map(|t| InspectedTask {
                    id: t.task.id.clone(),
                    title: t.task.title.clone(),
                    order_key: t.task.order_key.to_string(),
                    checklist_items: t.detail.checklist.len(),
                    attachments: t.detail.references.len(),
                    has_description: t.detail.trimmed_description().is_some(),
                })
                .collect(),
        })
        .collect();
    let orphaned_tasks = snapshot
        .orphaned_tasks()
        .into_iter()
        .map(|t| t.task.title.clone())
        .collect();

    Ok(InspectReport {
        plan_id: snapshot.plan.id.clone(),
        title: snapshot.plan.title.clone(),
        buckets,
        orphaned_tasks,
        warnings: diagnostics.into_warnings(),
    })
}

/// Fatal errors that happened before anything was written.
pub fn nothing_written(err: &CloneError) -> bool {
    matches!(
        err,
        CloneError::NoSession(_)
            | CloneError::Snapshot(SnapshotError::SourcePlan { .. })
            | CloneError::Snapshot(SnapshotError::TaskList { .. })
            | CloneError::OrphanedTasks { .. }
            | CloneError::CreatePlan { .. }
    )
}

/// Stage a fatal error stopped in.
pub fn failed_stage(err: &CloneError) -> Stage {
    match err {
        CloneError::NoSession(_) | CloneError::Snapshot(SnapshotError::SourcePlan { .. }) => {
            Stage::Verify
        }
        CloneError::Snapshot(SnapshotError::TaskList { .. }) => Stage::Snapshot,
        CloneError::OrphanedTasks { .. } => Stage::OrderBuckets,
        CloneError::CreatePlan { .. } => Stage::CreatePlan,
        CloneError::CreateBucket { .. } => Stage::CreateBuckets,
    }
}

#[cfg(test)]
mod tests {
    use planclone_core::OwnerId;

    use super::*;
    use crate::memory::{MemoryPlanner, Op};

    fn config() -> Config {
        let mut config = Config::default();
        config.pacing.task_interval_ms = 0;
        config.pacing.detail_delay_ms = 0;
        config
    }

    #[test]
    fn dry_run_reports_writes_and_leaves_service_untouched() {
        let mut service = MemoryPlanner::new();
        let plan = service.add_plan("Source");
        let bucket = service.add_bucket(&plan, "Todo", "a");
        service.add_task(&plan, &bucket, "Write", "a");

        let outcome = clone_plan(
            &mut service,
            &config(),
            &CloneRequest {
                source_plan: plan,
                owner: OwnerId::from("group-1"),
                title: "Copy".into(),
            },
            RunMode::DryRun,
        )
        .expect("clone");

        assert_eq!(outcome.summary.status, RunStatus::DryRun);
        assert_eq!(outcome.summary.new_plan_id.as_str(), "dry-run-plan");
        assert_eq!(outcome.summary.tasks_created, 1);
        assert_eq!(outcome.recorded_writes.len(), 3);
        assert_eq!(service.plans().len(), 1);
        assert_eq!(service.count(Op::CreateTask), 0);
    }

    #[test]
    fn inspect_lists_buckets_in_creation_order() {
        let mut service = MemoryPlanner::new();
        let plan = service.add_plan("Source");
        let later = service.add_bucket(&plan, "Later", "aab");
        let first = service.add_bucket(&plan, "First", "aac");
        service.add_task(&plan, &later, "b-task", "a");
        service.add_task(&plan, &first, "a-task", "a");

        let report = inspect(&service, &plan).expect("inspect");
        let names: Vec<_> = report.buckets.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["First", "Later"]);
        assert_eq!(report.buckets[0].tasks[0].title, "a-task");
        assert!(report.orphaned_tasks.is_empty());
    }

    #[test]
    fn early_failures_are_classified() {
        let err = CloneError::OrphanedTasks { count: 2 };
        assert!(nothing_written(&err));
        assert_eq!(failed_stage(&err), Stage::OrderBuckets);
    }
}
