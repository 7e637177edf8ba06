//! Blocking Graph client implementing [`PlannerService`].

use std::fmt;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use planclone_core::{
    Bucket, BucketId, Config, ConcurrencyToken, DetailPatch, NewTask, OwnerId, Plan, PlanId,
    PlannerService, Principal, ServiceError, Task, TaskDetail, TaskId,
};

use crate::wire::{
    Collection, ContainerRef, CreateBucketBody, CreatePlanBody, CreateTaskBody, DetailPatchBody,
    WireBucket, WirePlan, WireTask, WireTaskDetail, WireUser, ORDER_HINT_FIRST,
};

/// Longest response body kept in error messages.
const BODY_EXCERPT_LEN: usize = 512;

/// Bearer token for an already-established session. `Debug` never prints it.
#[derive(Clone)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wrap a token, rejecting blank input.
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into().trim().to_string();
        if token.is_empty() {
            None
        } else {
            Some(Self(token))
        }
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

pub struct GraphClient {
    agent: ureq::Agent,
    base_url: String,
    token: AccessToken,
}

impl GraphClient {
    pub fn new(base_url: impl Into<String>, token: AccessToken, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    pub fn from_config(config: &Config, token: AccessToken) -> Self {
        Self::new(config.graph_base_url.clone(), token, config.http_timeout())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get<T: DeserializeOwned>(&self, path: &str, subject: &str) -> Result<T, ServiceError> {
        let url = self.url(path);
        tracing::debug!(method = "GET", url = %url, "graph request");
        let response = self
            .agent
            .get(&url)
            .set("Authorization", &self.token.bearer())
            .call()
            .map_err(|e| map_error("GET", &url, subject, e))?;
        decode(response, &url)
    }

    fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        subject: &str,
    ) -> Result<T, ServiceError> {
        let url = self.url(path);
        tracing::debug!(method = "POST", url = %url, "graph request");
        let response = self
            .agent
            .post(&url)
            .set("Authorization", &self.token.bearer())
            .send_json(body)
            .map_err(|e| map_error("POST", &url, subject, e))?;
        decode(response, &url)
    }

    fn patch_if_match<B: Serialize>(
        &self,
        path: &str,
        token: &ConcurrencyToken,
        body: &B,
        subject: &str,
    ) -> Result<(), ServiceError> {
        let url = self.url(path);
        tracing::debug!(method = "PATCH", url = %url, "graph request");
        self.agent
            .request("PATCH", &url)
            .set("Authorization", &self.token.bearer())
            .set("If-Match", token.as_str())
            .send_json(body)
            .map_err(|e| map_error("PATCH", &url, subject, e))?;
        Ok(())
    }

    /// Container URL a new plan is created in: `<base>/groups/<owner>`.
    fn group_url(&self, owner: &OwnerId) -> String {
        self.url(&format!("/groups/{}", segment(owner.as_str())))
    }
}

impl PlannerService for GraphClient {
    fn verify_session(&self) -> Result<Principal, ServiceError> {
        let user: WireUser = self.get("/me", "signed-in user")?;
        Ok(user.into())
    }

    fn get_plan(&self, id: &PlanId) -> Result<Plan, ServiceError> {
        let plan: WirePlan = self.get(
            &format!("/planner/plans/{}", segment(id.as_str())),
            &format!("plan {id}"),
        )?;
        Ok(plan.into())
    }

    fn list_tasks(&self, plan: &PlanId) -> Result<Vec<Task>, ServiceError> {
        let tasks: Collection<WireTask> = self.get(
            &format!("/planner/plans/{}/tasks", segment(plan.as_str())),
            &format!("tasks of plan {plan}"),
        )?;
        Ok(tasks.value.into_iter().map(Task::from).collect())
    }

    fn get_task_detail(&self, task: &TaskId) -> Result<TaskDetail, ServiceError> {
        let detail: WireTaskDetail = self.get(
            &format!("/planner/tasks/{}/details", segment(task.as_str())),
            &format!("details of task {task}"),
        )?;
        Ok(detail.into())
    }

    fn get_bucket(&self, id: &BucketId) -> Result<Bucket, ServiceError> {
        let bucket: WireBucket = self.get(
            &format!("/planner/buckets/{}", segment(id.as_str())),
            &format!("bucket {id}"),
        )?;
        Ok(bucket.into())
    }

    fn create_plan(&mut self, owner: &OwnerId, title: &str) -> Result<Plan, ServiceError> {
        let body = CreatePlanBody {
            container: ContainerRef {
                url: self.group_url(owner),
            },
            title,
        };
        let plan: WirePlan = self.post("/planner/plans", &body, &format!("group {owner}"))?;
        Ok(plan.into())
    }

    fn create_bucket(&mut self, plan: &PlanId, name: &str) -> Result<Bucket, ServiceError> {
        let body = CreateBucketBody {
            name,
            plan_id: plan.as_str(),
            order_hint: ORDER_HINT_FIRST,
        };
        let bucket: WireBucket = self.post("/planner/buckets", &body, &format!("plan {plan}"))?;
        Ok(bucket.into())
    }

    fn create_task(&mut self, task: &NewTask) -> Result<Task, ServiceError> {
        let body = CreateTaskBody {
            plan_id: task.plan_id.as_str(),
            bucket_id: task.bucket_id.as_str(),
            title: &task.title,
            priority: task.priority,
        };
        let created: WireTask = self.post(
            "/planner/tasks",
            &body,
            &format!("bucket {}", task.bucket_id),
        )?;
        Ok(created.into())
    }

    fn update_task_detail(
        &mut self,
        task: &TaskId,
        token: &ConcurrencyToken,
        patch: &DetailPatch,
    ) -> Result<(), ServiceError> {
        self.patch_if_match(
            &format!("/planner/tasks/{}/details", segment(task.as_str())),
            token,
            &DetailPatchBody(patch),
            &format!("details of task {task}"),
        )
    }
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn segment(id: &str) -> String {
    urlencoding::encode(id).into_owned()
}

fn decode<T: DeserializeOwned>(response: ureq::Response, url: &str) -> Result<T, ServiceError> {
    response.into_json::<T>().map_err(|e| ServiceError::Decode {
        url: url.to_string(),
        message: e.to_string(),
    })
}

fn map_error(method: &'static str, url: &str, subject: &str, err: ureq::Error) -> ServiceError {
    match err {
        ureq::Error::Status(status, response) => {
            let body = excerpt(&response.into_string().unwrap_or_default());
            match status {
                401 | 403 => ServiceError::Unauthorized(format!("{method} {url}: {body}")),
                404 => ServiceError::NotFound(subject.to_string()),
                412 => ServiceError::PreconditionFailed(subject.to_string()),
                _ => ServiceError::Status {
                    method,
                    url: url.to_string(),
                    status,
                    body,
                },
            }
        }
        ureq::Error::Transport(transport) => ServiceError::Transport(transport.to_string()),
    }
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(BODY_EXCERPT_LEN) {
        Some((cut, _)) => format!("{}…", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_token_rejects_blank_and_redacts() {
        assert!(AccessToken::new("   ").is_none());
        let token = AccessToken::new(" eyJ0eXAi \n").expect("token");
        assert_eq!(token.bearer(), "Bearer eyJ0eXAi");
        assert_eq!(format!("{token:?}"), "AccessToken(<redacted>)");
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = GraphClient::new(
            "https://graph.microsoft.com/v1.0/",
            AccessToken::new("t").expect("token"),
            Duration::from_secs(5),
        );
        assert_eq!(
            client.url("/me"),
            "https://graph.microsoft.com/v1.0/me"
        );
        assert_eq!(
            client.group_url(&OwnerId::from("1f0e")),
            "https://graph.microsoft.com/v1.0/groups/1f0e"
        );
    }

    #[test]
    fn excerpt_truncates_long_bodies() {
        let long = "x".repeat(BODY_EXCERPT_LEN + 10);
        let cut = excerpt(&long);
        assert!(cut.ends_with('…'));
        assert_eq!(cut.chars().count(), BODY_EXCERPT_LEN + 1);
        assert_eq!(excerpt("  short \n"), "short");
    }
}
