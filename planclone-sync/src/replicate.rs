//! Staged replication of a source plan into a new plan.
//!
//! Stages run strictly in order, each over its whole collection:
//!
//! 1. Verify: session and source plan must exist.
//! 2. Snapshot: see [`crate::snapshot`].
//! 3. OrderBuckets: recover bucket order; apply the orphan policy.
//! 4. CreatePlan: one call.
//! 5. CreateBuckets: one call per bucket, in order. Any failure aborts.
//! 6. CreateTasks: per bucket, per task in order: create, copy details,
//!    copy attachments. Failures here only degrade the result.
//! 7. Summarize.
//!
//! Everything a run accumulates (id mapping, warnings, counters) lives on the
//! stack of [`Replicator::run`], so runs never share state.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use planclone_core::attachment::normalize;
use planclone_core::config::PLAN_ID_PLACEHOLDER;
use planclone_core::order_key::order_by_key;
use planclone_core::{
    AttachmentReference, Bucket, BucketId, ChecklistEntry, ChecklistItem, Config, DetailPatch,
    NewTask, OrphanPolicy, OwnerId, PlanId, PlannerService, PreviewType, ReferenceKey,
    ReferencePatch, ServiceError, TaskDetail, TaskId,
};

use crate::diagnostics::{Diagnostics, Stage, Warning};
use crate::error::{CloneError, SnapshotError};
use crate::pacing::{Pacing, Pause};
use crate::snapshot::{self, TaskSnapshot};

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// The three inputs of a clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneRequest {
    pub source_plan: PlanId,
    pub owner: OwnerId,
    pub title: String,
}

/// Run-independent settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneOptions {
    pub pacing: Pacing,
    pub orphan_policy: OrphanPolicy,
    /// Template with a `{plan_id}` placeholder.
    pub browse_url_template: String,
}

impl CloneOptions {
    pub fn browse_url(&self, plan: &PlanId) -> String {
        self.browse_url_template
            .replace(PLAN_ID_PLACEHOLDER, plan.as_str())
    }
}

impl From<&Config> for CloneOptions {
    fn from(config: &Config) -> Self {
        Self {
            pacing: Pacing::from(&config.pacing),
            orphan_policy: config.orphan_policy,
            browse_url_template: config.browse_url_template.clone(),
        }
    }
}

impl Default for CloneOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

// ---------------------------------------------------------------------------
// Result record
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunStatus {
    Completed,
    DryRun,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Completed => write!(f, "Completed"),
            RunStatus::DryRun => write!(f, "DryRun"),
        }
    }
}

/// Result of a run that reached the Summarize stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CloneSummary {
    pub source_plan_title: String,
    pub new_plan_id: PlanId,
    pub new_plan_url: String,
    pub tasks_created: usize,
    /// Tasks whose creation was attempted. Orphaned tasks are not included.
    pub tasks_attempted: usize,
    pub tasks_orphaned: usize,
    pub buckets_created: usize,
    pub status: RunStatus,
    pub warnings: Vec<Warning>,
}

// ---------------------------------------------------------------------------
// Replicator
// ---------------------------------------------------------------------------

pub struct Replicator<S, P> {
    service: S,
    pause: P,
    options: CloneOptions,
}

impl<S: PlannerService, P: Pause> Replicator<S, P> {
    pub fn new(service: S, pause: P, options: CloneOptions) -> Self {
        Self {
            service,
            pause,
            options,
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn into_service(self) -> S {
        self.service
    }

    /// Run every stage. A fatal error returns before anything is summarized.
    pub fn run(&mut self, request: &CloneRequest) -> Result<CloneSummary, CloneError> {
        let mut diagnostics = Diagnostics::new();

        enter(Stage::Verify);
        let principal = self
            .service
            .verify_session()
            .map_err(CloneError::NoSession)?;
        tracing::info!(user = %principal.id, "session verified");
        let source = self
            .service
            .get_plan(&request.source_plan)
            .map_err(|source| SnapshotError::SourcePlan {
                id: request.source_plan.clone(),
                source,
            })?;

        enter(Stage::Snapshot);
        let snapshot = snapshot::build_from(&self.service, source, &mut diagnostics)?;

        enter(Stage::OrderBuckets);
        let buckets = snapshot.ordered_buckets();
        let orphans = snapshot.orphaned_tasks();
        if !orphans.is_empty() {
            if self.options.orphan_policy == OrphanPolicy::Abort {
                return Err(CloneError::OrphanedTasks {
                    count: orphans.len(),
                });
            }
            for orphan in &orphans {
                diagnostics.warn(
                    Stage::OrderBuckets,
                    task_subject(orphan),
                    format!(
                        "source bucket {} unavailable, task not replicated",
                        orphan.task.bucket_id
                    ),
                );
            }
        }

        enter(Stage::CreatePlan);
        let destination = self
            .service
            .create_plan(&request.owner, &request.title)
            .map_err(|source| CloneError::CreatePlan {
                title: request.title.clone(),
                source,
            })?;
        tracing::info!(plan = %destination.id, title = %destination.title, "created plan");

        enter(Stage::CreateBuckets);
        // Source bucket to destination id, in creation order.
        let mut mapping: Vec<(&Bucket, BucketId)> = Vec::with_capacity(buckets.len());
        for bucket in buckets {
            let created = self
                .service
                .create_bucket(&destination.id, &bucket.name)
                .map_err(|source| CloneError::CreateBucket {
                    name: bucket.name.clone(),
                    source_bucket: bucket.id.clone(),
                    source,
                })?;
            tracing::info!(bucket = %bucket.name, id = %created.id, "created bucket");
            mapping.push((bucket, created.id));
        }

        enter(Stage::CreateTasks);
        let mut attempted = 0;
        let mut created = 0;
        for (bucket, target) in &mapping {
            for task in snapshot.tasks_in(&bucket.id) {
                attempted += 1;
                if self.replicate_task(&destination.id, target, task, &mut diagnostics) {
                    created += 1;
                }
                self.pause.pause(self.options.pacing.task_interval);
            }
        }

        enter(Stage::Summarize);
        let summary = CloneSummary {
            source_plan_title: snapshot.plan.title.clone(),
            new_plan_url: self.options.browse_url(&destination.id),
            new_plan_id: destination.id,
            tasks_created: created,
            tasks_attempted: attempted,
            tasks_orphaned: orphans.len(),
            buckets_created: mapping.len(),
            status: RunStatus::Completed,
            warnings: diagnostics.into_warnings(),
        };
        tracing::info!(
            tasks_created = summary.tasks_created,
            tasks_attempted = summary.tasks_attempted,
            buckets_created = summary.buckets_created,
            warnings = summary.warnings.len(),
            "clone finished"
        );
        Ok(summary)
    }

    /// Create one task and copy what can be copied onto it.
    ///
    /// Returns whether the task itself was created; detail and attachment
    /// failures only add warnings.
    fn replicate_task(
        &mut self,
        plan: &PlanId,
        bucket: &BucketId,
        source: &TaskSnapshot,
        diagnostics: &mut Diagnostics,
    ) -> bool {
        let new_task = NewTask {
            plan_id: plan.clone(),
            bucket_id: bucket.clone(),
            title: source.task.title.clone(),
            priority: source.task.priority,
        };
        let created = match self.service.create_task(&new_task) {
            Ok(task) => task,
            Err(err) => {
                diagnostics.warn(
                    Stage::CreateTasks,
                    task_subject(source),
                    format!("creation failed: {err}"),
                );
                return false;
            }
        };
        tracing::debug!(task = %created.id, title = %created.title, "created task");

        if source.has_details() {
            if let Err(err) = self.copy_details(&created.id, &source.detail) {
                diagnostics.warn(
                    Stage::CreateTasks,
                    task_subject(source),
                    format!("description and checklist not copied: {err}"),
                );
            }
        }

        if !source.detail.references.is_empty() {
            let subject = task_subject(source);
            let references = reference_patch(&source.detail.references, &subject, diagnostics);
            if references.is_empty() {
                tracing::debug!(task = %created.id, "no valid attachments, update skipped");
            } else if let Err(err) = self.copy_attachments(&created.id, references) {
                diagnostics.warn(
                    Stage::CreateTasks,
                    subject,
                    format!("attachments not copied: {err}"),
                );
            }
        }

        true
    }

    fn copy_details(&mut self, task: &TaskId, detail: &TaskDetail) -> Result<(), ServiceError> {
        self.pause.pause(self.options.pacing.detail_delay);
        let token = self.service.get_task_detail(task)?.token;
        self.service
            .update_task_detail(task, &token, &detail_patch(detail))
    }

    /// Fetch a fresh token; one consumed by a detail update is stale.
    fn copy_attachments(
        &mut self,
        task: &TaskId,
        references: BTreeMap<ReferenceKey, ReferencePatch>,
    ) -> Result<(), ServiceError> {
        self.pause.pause(self.options.pacing.detail_delay);
        let token = self.service.get_task_detail(task)?.token;
        let patch = DetailPatch {
            references,
            ..DetailPatch::default()
        };
        self.service.update_task_detail(task, &token, &patch)
    }
}

// ---------------------------------------------------------------------------
// Patch assembly
// ---------------------------------------------------------------------------

/// Description and checklist for a freshly created task.
///
/// Checklist entries get new ids and start unchecked. Their sequence is the
/// source's visual order, which the destination keeps by call order.
pub fn detail_patch(detail: &TaskDetail) -> DetailPatch {
    let description = detail
        .trimmed_description()
        .and(detail.description.clone());
    let checklist: Vec<ChecklistEntry> = ordered_checklist(&detail.checklist)
        .into_iter()
        .map(|item| ChecklistEntry {
            id: uuid::Uuid::new_v4().to_string(),
            title: item.title.clone(),
            is_checked: false,
        })
        .collect();
    let preview_type = if !checklist.is_empty() {
        Some(PreviewType::Checklist)
    } else if description.is_some() {
        Some(PreviewType::Description)
    } else {
        None
    };
    DetailPatch {
        description,
        preview_type,
        checklist,
        references: BTreeMap::new(),
    }
}

/// Checklist items in source order. Keyed items go through the order-key
/// comparator; if any item lacks a key, listing order is kept.
pub fn ordered_checklist(items: &[ChecklistItem]) -> Vec<&ChecklistItem> {
    let listed: Vec<&ChecklistItem> = items.iter().collect();
    if items.iter().all(|item| item.order_key.is_some()) {
        order_by_key(listed, |item| {
            item.order_key.as_ref().map_or("", |key| key.as_str())
        })
    } else {
        listed
    }
}

/// Normalize every reference, dropping rejected ones with a warning.
///
/// References that normalize to the same key collapse into one; the last
/// one listed wins.
pub fn reference_patch(
    references: &[AttachmentReference],
    subject: &str,
    diagnostics: &mut Diagnostics,
) -> BTreeMap<ReferenceKey, ReferencePatch> {
    let mut patch = BTreeMap::new();
    for reference in references {
        let alias = reference.alias.as_deref().unwrap_or(&reference.key);
        let normalized = match normalize(&reference.key, alias) {
            Ok(normalized) => normalized,
            Err(err) => {
                diagnostics.warn(
                    Stage::CreateTasks,
                    subject,
                    format!("attachment skipped: {err}"),
                );
                continue;
            }
        };
        if normalized.passes > 1 {
            tracing::debug!(
                alias,
                passes = normalized.passes,
                "attachment key was encoded more than once"
            );
        }
        let previous = patch.insert(
            normalized.key.clone(),
            ReferencePatch {
                alias: reference.alias.clone(),
                kind: reference.kind.clone(),
            },
        );
        if previous.is_some() {
            diagnostics.warn(
                Stage::CreateTasks,
                subject,
                format!("duplicate attachment {} merged", normalized.key.url()),
            );
        }
    }
    patch
}

fn task_subject(task: &TaskSnapshot) -> String {
    format!("task '{}'", task.task.title)
}

fn enter(stage: Stage) {
    tracing::info!(stage = %stage, "entering stage");
}
