//! In-memory [`PlannerService`] backend.
//!
//! Holds plans, buckets, tasks and detail records in owned collections,
//! enforces concurrency tokens the way the remote service does, and lets
//! callers inject failures per operation and entity. Every call is logged.

use std::cell::RefCell;
use std::collections::HashSet;

use planclone_core::{
    AttachmentReference, Bucket, BucketId, ChecklistItem, ConcurrencyToken, DetailPatch, NewTask,
    OrderKey, OwnerId, Plan, PlanId, PlannerService, PreviewType, Principal, ServiceError, Task,
    TaskDetail, TaskId,
};

/// Operations of [`PlannerService`], for failure injection and the call log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    VerifySession,
    GetPlan,
    ListTasks,
    GetTaskDetail,
    GetBucket,
    CreatePlan,
    CreateBucket,
    CreateTask,
    UpdateTaskDetail,
}

/// One logged call: the operation and the id, name or title it addressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub op: Op,
    pub subject: String,
}

struct StoredTask {
    plan: PlanId,
    task: Task,
    detail: TaskDetail,
    checklist_ids: Vec<String>,
    preview_type: Option<PreviewType>,
    version: u64,
}

#[derive(Default)]
pub struct MemoryPlanner {
    principal: Option<Principal>,
    plans: Vec<(Plan, Option<OwnerId>)>,
    buckets: Vec<(PlanId, Bucket)>,
    tasks: Vec<StoredTask>,
    failures: HashSet<(Op, String)>,
    calls: RefCell<Vec<Call>>,
    next_id: u64,
}

impl MemoryPlanner {
    /// A service with a signed-in principal and no data.
    pub fn new() -> Self {
        Self {
            principal: Some(Principal {
                id: "user-1".to_string(),
                display_name: Some("Test User".to_string()),
            }),
            ..Self::default()
        }
    }

    /// Drop the session so `verify_session` fails.
    pub fn sign_out(&mut self) {
        self.principal = None;
    }

    /// Make `op` fail whenever it addresses `subject`.
    ///
    /// Plans match by id or title, buckets by id or name, tasks by id or
    /// title, plan creation by owner or title.
    pub fn fail(&mut self, op: Op, subject: impl Into<String>) {
        self.failures.insert((op, subject.into()));
    }

    // -- seeding ------------------------------------------------------------

    pub fn add_plan(&mut self, title: &str) -> PlanId {
        let id = PlanId::from(self.fresh_id("plan"));
        self.plans.push((
            Plan {
                id: id.clone(),
                title: title.to_string(),
                container_url: None,
            },
            None,
        ));
        id
    }

    pub fn add_bucket(&mut self, plan: &PlanId, name: &str, order_key: &str) -> BucketId {
        let id = BucketId::from(self.fresh_id("bucket"));
        self.buckets.push((
            plan.clone(),
            Bucket {
                id: id.clone(),
                name: name.to_string(),
                order_key: OrderKey::from(order_key),
            },
        ));
        id
    }

    pub fn add_task(
        &mut self,
        plan: &PlanId,
        bucket: &BucketId,
        title: &str,
        order_key: &str,
    ) -> TaskId {
        let id = TaskId::from(self.fresh_id("task"));
        self.insert_task(
            plan.clone(),
            Task {
                id: id.clone(),
                title: title.to_string(),
                priority: None,
                order_key: OrderKey::from(order_key),
                bucket_id: bucket.clone(),
            },
        );
        id
    }

    /// Mutable access to a stored task, for seeding priority and such.
    pub fn task_mut(&mut self, id: &TaskId) -> Option<&mut Task> {
        self.stored_mut(id).map(|t| &mut t.task)
    }

    /// Mutable access to a stored detail record, for seeding.
    pub fn detail_mut(&mut self, id: &TaskId) -> Option<&mut TaskDetail> {
        self.stored_mut(id).map(|t| &mut t.detail)
    }

    // -- inspection ---------------------------------------------------------

    pub fn plans(&self) -> Vec<&Plan> {
        self.plans.iter().map(|(plan, _)| plan).collect()
    }

    pub fn owner_of(&self, plan: &PlanId) -> Option<&OwnerId> {
        self.plans
            .iter()
            .find(|(p, _)| &p.id == plan)
            .and_then(|(_, owner)| owner.as_ref())
    }

    /// Buckets of `plan` in creation order.
    pub fn buckets_of(&self, plan: &PlanId) -> Vec<&Bucket> {
        self.buckets
            .iter()
            .filter(|(p, _)| p == plan)
            .map(|(_, b)| b)
            .collect()
    }

    /// Tasks of `plan` in creation order.
    pub fn tasks_of(&self, plan: &PlanId) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| &t.plan == plan)
            .map(|t| &t.task)
            .collect()
    }

    pub fn detail(&self, task: &TaskId) -> Option<&TaskDetail> {
        self.stored(task).map(|t| &t.detail)
    }

    /// Ids assigned to the checklist entries of `task`, in insertion order.
    pub fn checklist_ids(&self, task: &TaskId) -> Vec<&str> {
        self.stored(task)
            .map(|t| t.checklist_ids.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn preview_type(&self, task: &TaskId) -> Option<PreviewType> {
        self.stored(task).and_then(|t| t.preview_type)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    /// Number of logged calls of `op`.
    pub fn count(&self, op: Op) -> usize {
        self.calls.borrow().iter().filter(|c| c.op == op).count()
    }

    // -- internals ----------------------------------------------------------

    fn fresh_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    fn insert_task(&mut self, plan: PlanId, task: Task) {
        let detail = TaskDetail {
            task_id: task.id.clone(),
            description: None,
            checklist: Vec::new(),
            references: Vec::new(),
            token: token_for(1),
        };
        self.tasks.push(StoredTask {
            plan,
            task,
            detail,
            checklist_ids: Vec::new(),
            preview_type: None,
            version: 1,
        });
    }

    fn stored(&self, task: &TaskId) -> Option<&StoredTask> {
        self.tasks.iter().find(|t| &t.task.id == task)
    }

    fn stored_mut(&mut self, task: &TaskId) -> Option<&mut StoredTask> {
        self.tasks.iter_mut().find(|t| &t.task.id == task)
    }

    fn bucket(&self, id: &BucketId) -> Option<&(PlanId, Bucket)> {
        self.buckets.iter().find(|(_, b)| &b.id == id)
    }

    fn log(&self, op: Op, subject: &str) {
        self.calls.borrow_mut().push(Call {
            op,
            subject: subject.to_string(),
        });
    }

    /// Log the call, then fail if any of `subjects` has an injected failure.
    fn enter(&self, op: Op, subjects: &[&str]) -> Result<(), ServiceError> {
        self.log(op, subjects.first().copied().unwrap_or_default());
        match subjects
            .iter()
            .find(|s| self.failures.contains(&(op, (**s).to_string())))
        {
            Some(subject) => Err(ServiceError::Status {
                method: "MEMORY",
                url: format!("{op:?}"),
                status: 500,
                body: format!("injected failure for {subject}"),
            }),
            None => Ok(()),
        }
    }
}

impl PlannerService for MemoryPlanner {
    fn verify_session(&self) -> Result<Principal, ServiceError> {
        self.log(Op::VerifySession, "me");
        self.principal
            .clone()
            .ok_or_else(|| ServiceError::Unauthorized("no signed-in user".to_string()))
    }

    fn get_plan(&self, id: &PlanId) -> Result<Plan, ServiceError> {
        let plan = self.plans.iter().find(|(p, _)| &p.id == id).map(|(p, _)| p);
        let title = plan.map(|p| p.title.as_str()).unwrap_or_default();
        self.enter(Op::GetPlan, &[id.as_str(), title])?;
        plan.cloned()
            .ok_or_else(|| ServiceError::NotFound(format!("plan {id}")))
    }

    fn list_tasks(&self, plan: &PlanId) -> Result<Vec<Task>, ServiceError> {
        self.enter(Op::ListTasks, &[plan.as_str()])?;
        if !self.plans.iter().any(|(p, _)| &p.id == plan) {
            return Err(ServiceError::NotFound(format!("plan {plan}")));
        }
        Ok(self.tasks_of(plan).into_iter().cloned().collect())
    }

    fn get_task_detail(&self, task: &TaskId) -> Result<TaskDetail, ServiceError> {
        let stored = self.stored(task);
        let title = stored.map(|t| t.task.title.as_str()).unwrap_or_default();
        self.enter(Op::GetTaskDetail, &[task.as_str(), title])?;
        stored
            .map(|t| t.detail.clone())
            .ok_or_else(|| ServiceError::NotFound(format!("task {task}")))
    }

    fn get_bucket(&self, id: &BucketId) -> Result<Bucket, ServiceError> {
        let bucket = self.bucket(id).map(|(_, b)| b);
        let name = bucket.map(|b| b.name.as_str()).unwrap_or_default();
        self.enter(Op::GetBucket, &[id.as_str(), name])?;
        bucket
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(format!("bucket {id}")))
    }

    fn create_plan(&mut self, owner: &OwnerId, title: &str) -> Result<Plan, ServiceError> {
        self.enter(Op::CreatePlan, &[title, owner.as_str()])?;
        let id = self.add_plan(title);
        let container = format!("memory://groups/{owner}");
        let entry = self
            .plans
            .last_mut()
            .ok_or_else(|| ServiceError::NotFound(format!("plan {id}")))?;
        entry.0.container_url = Some(container);
        entry.1 = Some(owner.clone());
        Ok(entry.0.clone())
    }

    fn create_bucket(&mut self, plan: &PlanId, name: &str) -> Result<Bucket, ServiceError> {
        self.enter(Op::CreateBucket, &[name])?;
        if !self.plans.iter().any(|(p, _)| &p.id == plan) {
            return Err(ServiceError::NotFound(format!("plan {plan}")));
        }
        // New buckets are pinned first, like the remote service's " !" hint.
        let id = self.add_bucket(plan, name, " !");
        self.bucket(&id)
            .map(|(_, b)| b.clone())
            .ok_or_else(|| ServiceError::NotFound(format!("bucket {id}")))
    }

    fn create_task(&mut self, task: &NewTask) -> Result<Task, ServiceError> {
        self.enter(Op::CreateTask, &[task.title.as_str()])?;
        match self.bucket(&task.bucket_id) {
            Some((plan, _)) if plan == &task.plan_id => {}
            _ => return Err(ServiceError::NotFound(format!("bucket {}", task.bucket_id))),
        }
        let id = self.add_task(&task.plan_id, &task.bucket_id, &task.title, " !");
        let stored = self
            .task_mut(&id)
            .ok_or_else(|| ServiceError::NotFound(format!("task {id}")))?;
        stored.priority = task.priority;
        Ok(stored.clone())
    }

    fn update_task_detail(
        &mut self,
        task: &TaskId,
        token: &ConcurrencyToken,
        patch: &DetailPatch,
    ) -> Result<(), ServiceError> {
        let title = self
            .stored(task)
            .map(|t| t.task.title.clone())
            .unwrap_or_default();
        self.enter(Op::UpdateTaskDetail, &[task.as_str(), title.as_str()])?;
        let stored = self
            .stored_mut(task)
            .ok_or_else(|| ServiceError::NotFound(format!("task {task}")))?;
        if &stored.detail.token != token {
            return Err(ServiceError::PreconditionFailed(format!("task {task}")));
        }

        if let Some(description) = &patch.description {
            stored.detail.description = Some(description.clone());
        }
        if patch.preview_type.is_some() {
            stored.preview_type = patch.preview_type;
        }
        for entry in &patch.checklist {
            stored.checklist_ids.push(entry.id.clone());
            stored.detail.checklist.push(ChecklistItem {
                title: entry.title.clone(),
                is_checked: entry.is_checked,
                order_key: None,
            });
        }
        for (key, reference) in &patch.references {
            stored.detail.references.retain(|r| r.key != key.as_str());
            stored.detail.references.push(AttachmentReference {
                key: key.as_str().to_string(),
                alias: reference.alias.clone(),
                kind: reference.kind.clone(),
                preview_priority: None,
                last_modified: None,
            });
        }

        stored.version += 1;
        stored.detail.token = token_for(stored.version);
        Ok(())
    }
}

fn token_for(version: u64) -> ConcurrencyToken {
    ConcurrencyToken::from(format!("W/\"{version}\""))
}

#[cfg(test)]
mod tests {
    use planclone_core::ChecklistEntry;

    use super::*;

    #[test]
    fn stale_token_is_rejected_after_an_update() {
        let mut service = MemoryPlanner::new();
        let plan = service.add_plan("Source");
        let bucket = service.add_bucket(&plan, "Todo", "8585");
        let task = service.add_task(&plan, &bucket, "Write", "8585");

        let token = service.get_task_detail(&task).expect("detail").token;
        let patch = DetailPatch {
            description: Some("notes".into()),
            ..DetailPatch::default()
        };
        service
            .update_task_detail(&task, &token, &patch)
            .expect("first update");
        let err = service
            .update_task_detail(&task, &token, &patch)
            .unwrap_err();
        assert!(matches!(err, ServiceError::PreconditionFailed(_)), "got: {err}");
        assert_ne!(service.detail(&task).expect("detail").token, token);
    }

    #[test]
    fn checklist_entries_append_in_call_order() {
        let mut service = MemoryPlanner::new();
        let plan = service.add_plan("Source");
        let bucket = service.add_bucket(&plan, "Todo", "8585");
        let task = service.add_task(&plan, &bucket, "Write", "8585");
        let token = service.get_task_detail(&task).expect("detail").token;

        let entry = |id: &str, title: &str| ChecklistEntry {
            id: id.into(),
            title: title.into(),
            is_checked: false,
        };
        let patch = DetailPatch {
            preview_type: Some(PreviewType::Checklist),
            checklist: vec![entry("z", "first"), entry("a", "second")],
            ..DetailPatch::default()
        };
        service
            .update_task_detail(&task, &token, &patch)
            .expect("update");

        let detail = service.detail(&task).expect("detail");
        let titles: Vec<_> = detail.checklist.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, ["first", "second"]);
        assert_eq!(service.checklist_ids(&task), ["z", "a"]);
        assert_eq!(service.preview_type(&task), Some(PreviewType::Checklist));
    }

    #[test]
    fn injected_failures_match_by_name_and_are_logged() {
        let mut service = MemoryPlanner::new();
        let plan = service.add_plan("Source");
        let bucket = service.add_bucket(&plan, "Blocked", "8585");
        service.fail(Op::GetBucket, "Blocked");

        assert!(service.get_bucket(&bucket).is_err());
        assert!(service.get_plan(&plan).is_ok());
        assert_eq!(service.count(Op::GetBucket), 1);
        assert_eq!(service.calls()[1].subject, plan.as_str());
    }

    #[test]
    fn task_creation_requires_a_bucket_of_the_same_plan() {
        let mut service = MemoryPlanner::new();
        let plan = service.add_plan("A");
        let other = service.add_plan("B");
        let bucket = service.add_bucket(&other, "Todo", "8585");

        let err = service
            .create_task(&NewTask {
                plan_id: plan,
                bucket_id: bucket,
                title: "t".into(),
                priority: None,
            })
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[test]
    fn signed_out_session_is_unauthorized() {
        let mut service = MemoryPlanner::new();
        service.sign_out();
        assert!(matches!(
            service.verify_session(),
            Err(ServiceError::Unauthorized(_))
        ));
    }
}
