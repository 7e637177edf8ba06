//! The remote work-management service, as seen by the replicator.
//!
//! Reads take `&self`; anything that creates or mutates remote state takes
//! `&mut self`. Every call is blocking and single-shot.

use thiserror::Error;

use crate::types::{
    Bucket, BucketId, ConcurrencyToken, DetailPatch, NewTask, OwnerId, Plan, PlanId, Principal,
    Task, TaskDetail, TaskId,
};

/// Failure of a single remote call.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Missing, expired or insufficient credentials (HTTP 401/403).
    #[error("not authorized: {0}")]
    Unauthorized(String),

    /// The addressed entity does not exist (HTTP 404).
    #[error("not found: {0}")]
    NotFound(String),

    /// The concurrency token no longer matches the server (HTTP 412).
    #[error("stale concurrency token for {0}")]
    PreconditionFailed(String),

    /// Any other non-success status.
    #[error("{method} {url} returned {status}: {body}")]
    Status {
        method: &'static str,
        url: String,
        status: u16,
        body: String,
    },

    /// Network or TLS failure before a response arrived.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body did not have the expected shape.
    #[error("could not decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

/// Operations the replicator needs from the remote service.
pub trait PlannerService {
    /// Confirm an authenticated session exists and report who it belongs to.
    fn verify_session(&self) -> Result<Principal, ServiceError>;

    fn get_plan(&self, id: &PlanId) -> Result<Plan, ServiceError>;

    fn list_tasks(&self, plan: &PlanId) -> Result<Vec<Task>, ServiceError>;

    /// Detail record for a task, including its current concurrency token.
    fn get_task_detail(&self, task: &TaskId) -> Result<TaskDetail, ServiceError>;

    fn get_bucket(&self, id: &BucketId) -> Result<Bucket, ServiceError>;

    fn create_plan(&mut self, owner: &OwnerId, title: &str) -> Result<Plan, ServiceError>;

    fn create_bucket(&mut self, plan: &PlanId, name: &str) -> Result<Bucket, ServiceError>;

    fn create_task(&mut self, task: &NewTask) -> Result<Task, ServiceError>;

    /// Apply `patch` only if `token` still matches the server's record.
    fn update_task_detail(
        &mut self,
        task: &TaskId,
        token: &ConcurrencyToken,
        patch: &DetailPatch,
    ) -> Result<(), ServiceError>;
}

impl<S: PlannerService + ?Sized> PlannerService for &mut S {
    fn verify_session(&self) -> Result<Principal, ServiceError> {
        (**self).verify_session()
    }

    fn get_plan(&self, id: &PlanId) -> Result<Plan, ServiceError> {
        (**self).get_plan(id)
    }

    fn list_tasks(&self, plan: &PlanId) -> Result<Vec<Task>, ServiceError> {
        (**self).list_tasks(plan)
    }

    fn get_task_detail(&self, task: &TaskId) -> Result<TaskDetail, ServiceError> {
        (**self).get_task_detail(task)
    }

    fn get_bucket(&self, id: &BucketId) -> Result<Bucket, ServiceError> {
        (**self).get_bucket(id)
    }

    fn create_plan(&mut self, owner: &OwnerId, title: &str) -> Result<Plan, ServiceError> {
        (**self).create_plan(owner, title)
    }

    fn create_bucket(&mut self, plan: &PlanId, name: &str) -> Result<Bucket, ServiceError> {
        (**self).create_bucket(plan, name)
    }

    fn create_task(&mut self, task: &NewTask) -> Result<Task, ServiceError> {
        (**self).create_task(task)
    }

    fn update_task_detail(
        &mut self,
        task: &TaskId,
        token: &ConcurrencyToken,
        patch: &DetailPatch,
    ) -> Result<(), ServiceError> {
        (**self).update_task_detail(task, token, patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_message_names_request() {
        let err = ServiceError::Status {
            method: "POST",
            url: "https://graph.example/planner/buckets".into(),
            status: 429,
            body: "throttled".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("POST"));
        assert!(msg.contains("429"));
        assert!(msg.contains("throttled"));
    }

    #[test]
    fn precondition_message_names_entity() {
        let err = ServiceError::PreconditionFailed("task t-9".into());
        assert!(err.to_string().contains("task t-9"));
    }
}
