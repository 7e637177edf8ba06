//! Read-through, write-recording [`PlannerService`] wrapper.
//!
//! Reads go to the wrapped service so the snapshot is real. Creates and
//! updates are recorded and answered with synthetic entities, which lets the
//! whole orchestrator run without touching the destination.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use planclone_core::{
    Bucket, BucketId, ConcurrencyToken, DetailPatch, NewTask, OrderKey, OwnerId, Plan, PlanId,
    PlannerService, Principal, ServiceError, Task, TaskDetail, TaskId,
};

const SYNTHETIC_PLAN_ID: &str = "dry-run-plan";
const SYNTHETIC_TOKEN: &str = "dry-run";

/// A write that would have been sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "Kind", rename_all = "PascalCase")]
pub enum RecordedWrite {
    #[serde(rename_all = "PascalCase")]
    CreatePlan { owner: OwnerId, title: String },
    #[serde(rename_all = "PascalCase")]
    CreateBucket { name: String, id: BucketId },
    #[serde(rename_all = "PascalCase")]
    CreateTask {
        title: String,
        bucket: BucketId,
        id: TaskId,
    },
    #[serde(rename_all = "PascalCase")]
    UpdateTaskDetail {
        task: TaskId,
        description: bool,
        checklist_items: usize,
        references: usize,
    },
}

impl fmt::Display for RecordedWrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordedWrite::CreatePlan { owner, title } => {
                write!(f, "create plan '{title}' for {owner}")
            }
            RecordedWrite::CreateBucket { name, id } => write!(f, "create bucket '{name}' ({id})"),
            RecordedWrite::CreateTask { title, bucket, id } => {
                write!(f, "create task '{title}' in {bucket} ({id})")
            }
            RecordedWrite::UpdateTaskDetail {
                task,
                description,
                checklist_items,
                references,
            } => {
                let mut parts = Vec::new();
                if *description {
                    parts.push("description".to_string());
                }
                if *checklist_items > 0 {
                    parts.push(format!("{checklist_items} checklist item(s)"));
                }
                if *references > 0 {
                    parts.push(format!("{references} attachment(s)"));
                }
                write!(f, "update details of {task}: {}", parts.join(", "))
            }
        }
    }
}

pub struct DryRun<S> {
    inner: S,
    writes: Vec<RecordedWrite>,
    synthetic_tasks: HashSet<TaskId>,
    buckets: usize,
}

impl<S: PlannerService> DryRun<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            writes: Vec::new(),
            synthetic_tasks: HashSet::new(),
            buckets: 0,
        }
    }

    pub fn writes(&self) -> &[RecordedWrite] {
        &self.writes
    }

    pub fn into_writes(self) -> Vec<RecordedWrite> {
        self.writes
    }

    fn record(&mut self, write: RecordedWrite) {
        tracing::info!("[dry-run] would {write}");
        self.writes.push(write);
    }
}

impl<S: PlannerService> PlannerService for DryRun<S> {
    fn verify_session(&self) -> Result<Principal, ServiceError> {
        self.inner.verify_session()
    }

    fn get_plan(&self, id: &PlanId) -> Result<Plan, ServiceError> {
        self.inner.get_plan(id)
    }

    fn list_tasks(&self, plan: &PlanId) -> Result<Vec<Task>, ServiceError> {
        self.inner.list_tasks(plan)
    }

    fn get_task_detail(&self, task: &TaskId) -> Result<TaskDetail, ServiceError> {
        if self.synthetic_tasks.contains(task) {
            return Ok(TaskDetail {
                task_id: task.clone(),
                description: None,
                checklist: Vec::new(),
                references: Vec::new(),
                token: ConcurrencyToken::from(SYNTHETIC_TOKEN),
            });
        }
        self.inner.get_task_detail(task)
    }

    fn get_bucket(&self, id: &BucketId) -> Result<Bucket, ServiceError> {
        self.inner.get_bucket(id)
    }

    fn create_plan(&mut self, owner: &OwnerId, title: &str) -> Result<Plan, ServiceError> {
        self.record(RecordedWrite::CreatePlan {
            owner: owner.clone(),
            title: title.to_string(),
        });
        Ok(Plan {
            id: PlanId::from(SYNTHETIC_PLAN_ID),
            title: title.to_string(),
            container_url: None,
        })
    }

    fn create_bucket(&mut self, _plan: &PlanId, name: &str) -> Result<Bucket, ServiceError> {
        self.buckets += 1;
        let id = BucketId::from(format!("dry-run-bucket-{}", self.buckets));
        self.record(RecordedWrite::CreateBucket {
            name: name.to_string(),
            id: id.clone(),
        });
        Ok(Bucket {
            id,
            name: name.to_string(),
            order_key: OrderKey::from(" !"),
        })
    }

    fn create_task(&mut self, task: &NewTask) -> Result<Task, ServiceError> {
        let id = TaskId::from(format!("dry-run-task-{}", self.synthetic_tasks.len() + 1));
        self.synthetic_tasks.insert(id.clone());
        self.record(RecordedWrite::CreateTask {
            title: task.title.clone(),
            bucket: task.bucket_id.clone(),
            id: id.clone(),
        });
        Ok(Task {
            id,
            title: task.title.clone(),
            priority: task.priority,
            order_key: OrderKey::from(" !"),
            bucket_id: task.bucket_id.clone(),
        })
    }

    fn update_task_detail(
        &mut self,
        task: &TaskId,
        _token: &ConcurrencyToken,
        patch: &DetailPatch,
    ) -> Result<(), ServiceError> {
        self.record(RecordedWrite::UpdateTaskDetail {
            task: task.clone(),
            description: patch.description.is_some(),
            checklist_items: patch.checklist.len(),
            references: patch.references.len(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryPlanner, Op};

    #[test]
    fn writes_are_recorded_not_forwarded() {
        let mut memory = MemoryPlanner::new();
        let plan = memory.add_plan("Source");
        let bucket = memory.add_bucket(&plan, "Todo", "a");

        let mut dry = DryRun::new(&mut memory);
        assert_eq!(dry.get_plan(&plan).expect("read").title, "Source");
        let created = dry
            .create_plan(&OwnerId::from("group-1"), "Copy")
            .expect("plan");
        assert_eq!(created.id.as_str(), "dry-run-plan");
        let new_bucket = dry.create_bucket(&created.id, "Todo").expect("bucket");
        assert_eq!(new_bucket.id.as_str(), "dry-run-bucket-1");
        let task = dry
            .create_task(&NewTask {
                plan_id: created.id.clone(),
                bucket_id: new_bucket.id.clone(),
                title: "Write".into(),
                priority: None,
            })
            .expect("task");
        assert_eq!(task.id.as_str(), "dry-run-task-1");
        assert_eq!(dry.writes().len(), 3);

        assert_eq!(memory.plans().len(), 1);
        assert!(memory.tasks_of(&plan).is_empty());
        assert_eq!(memory.count(Op::CreatePlan), 0);
        assert_eq!(memory.buckets_of(&plan)[0].id, bucket);
    }

    #[test]
    fn synthetic_task_detail_is_served_locally() {
        let mut memory = MemoryPlanner::new();
        let mut dry = DryRun::new(&mut memory);
        let task = dry
            .create_task(&NewTask {
                plan_id: PlanId::from("dry-run-plan"),
                bucket_id: BucketId::from("dry-run-bucket-1"),
                title: "Write".into(),
                priority: Some(3),
            })
            .expect("task");
        let detail = dry.get_task_detail(&task.id).expect("detail");
        assert_eq!(detail.token.as_str(), "dry-run");

        let patch = DetailPatch {
            description: Some("notes".into()),
            ..DetailPatch::default()
        };
        dry.update_task_detail(&task.id, &detail.token, &patch)
            .expect("update");
        assert_eq!(
            dry.writes()[1].to_string(),
            "update details of dry-run-task-1: description"
        );
        drop(dry);
        assert_eq!(memory.count(Op::GetTaskDetail), 0);
    }
}
