//! JSON shapes of the Planner REST surface.
//!
//! Checklists and references are objects keyed by data-dependent ids (or
//! encoded URLs), so they are read as key → item maps rather than fixed
//! structs.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use planclone_core::{
    AttachmentReference, Bucket, BucketId, ChecklistEntry, ChecklistItem, ConcurrencyToken,
    DetailPatch, OrderKey, Plan, PlanId, Principal, ReferenceKey, ReferencePatch, Task,
    TaskDetail, TaskId,
};

const CHECKLIST_ITEM_TYPE: &str = "microsoft.graph.plannerChecklistItem";
const EXTERNAL_REFERENCE_TYPE: &str = "microsoft.graph.plannerExternalReference";

/// Order hint that asks the service to place a new bucket first.
pub(crate) const ORDER_HINT_FIRST: &str = " !";

// ---------------------------------------------------------------------------
// Incoming
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct Collection<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireUser {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireContainer {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WirePlan {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub container: Option<WireContainer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireBucket {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub order_hint: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireTask {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub priority: Option<i32>,
    #[serde(default)]
    pub order_hint: Option<String>,
    #[serde(default)]
    pub bucket_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireChecklistItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub is_checked: bool,
    #[serde(default)]
    pub order_hint: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireReference {
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub preview_priority: Option<String>,
    #[serde(default)]
    pub last_modified_date_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireTaskDetail {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub checklist: Option<BTreeMap<String, WireChecklistItem>>,
    #[serde(default)]
    pub references: Option<BTreeMap<String, WireReference>>,
    #[serde(rename = "@odata.etag", default)]
    pub etag: Option<String>,
}

impl From<WireUser> for Principal {
    fn from(w: WireUser) -> Self {
        Principal {
            id: w.id,
            display_name: w.display_name,
        }
    }
}

impl From<WirePlan> for Plan {
    fn from(w: WirePlan) -> Self {
        Plan {
            id: PlanId::from(w.id),
            title: w.title,
            container_url: w.container.and_then(|c| c.url),
        }
    }
}

impl From<WireBucket> for Bucket {
    fn from(w: WireBucket) -> Self {
        Bucket {
            id: BucketId::from(w.id),
            name: w.name,
            order_key: OrderKey::from(w.order_hint.unwrap_or_default()),
        }
    }
}

impl From<WireTask> for Task {
    fn from(w: WireTask) -> Self {
        Task {
            id: TaskId::from(w.id),
            title: w.title,
            priority: w.priority,
            order_key: OrderKey::from(w.order_hint.unwrap_or_default()),
            bucket_id: BucketId::from(w.bucket_id.unwrap_or_default()),
        }
    }
}

impl From<WireTaskDetail> for TaskDetail {
    fn from(w: WireTaskDetail) -> Self {
        let checklist = w
            .checklist
            .unwrap_or_default()
            .into_values()
            .map(|item| ChecklistItem {
                title: item.title,
                is_checked: item.is_checked,
                order_key: item.order_hint.map(OrderKey::from),
            })
            .collect();
        let references = w
            .references
            .unwrap_or_default()
            .into_iter()
            .map(|(key, r)| AttachmentReference {
                key,
                alias: r.alias,
                kind: r.kind,
                preview_priority: r.preview_priority,
                last_modified: r.last_modified_date_time,
            })
            .collect();
        TaskDetail {
            task_id: TaskId::from(w.id),
            description: w.description,
            checklist,
            references,
            token: ConcurrencyToken::from(w.etag.unwrap_or_default()),
        }
    }
}

// ---------------------------------------------------------------------------
// Outgoing
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(crate) struct ContainerRef {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreatePlanBody<'a> {
    pub container: ContainerRef,
    pub title: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateBucketBody<'a> {
    pub name: &'a str,
    pub plan_id: &'a str,
    pub order_hint: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateTaskBody<'a> {
    pub plan_id: &'a str,
    pub bucket_id: &'a str,
    pub title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
}

/// PATCH body for `/planner/tasks/{id}/details`. Only set fields are sent.
pub(crate) struct DetailPatchBody<'a>(pub &'a DetailPatch);

impl Serialize for DetailPatchBody<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let patch = self.0;
        let mut map = serializer.serialize_map(None)?;
        if let Some(description) = &patch.description {
            map.serialize_entry("description", description)?;
        }
        if let Some(preview) = &patch.preview_type {
            map.serialize_entry("previewType", preview)?;
        }
        if !patch.checklist.is_empty() {
            map.serialize_entry("checklist", &ChecklistBody(&patch.checklist))?;
        }
        if !patch.references.is_empty() {
            map.serialize_entry("references", &ReferencesBody(&patch.references))?;
        }
        map.end()
    }
}

/// Checklist entries in call order, keyed by their new ids.
struct ChecklistBody<'a>(&'a [ChecklistEntry]);

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChecklistItemBody<'a> {
    #[serde(rename = "@odata.type")]
    odata_type: &'static str,
    title: &'a str,
    is_checked: bool,
}

impl Serialize for ChecklistBody<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|entry| {
            (
                entry.id.as_str(),
                ChecklistItemBody {
                    odata_type: CHECKLIST_ITEM_TYPE,
                    title: &entry.title,
                    is_checked: entry.is_checked,
                },
            )
        }))
    }
}

struct ReferencesBody<'a>(&'a BTreeMap<ReferenceKey, ReferencePatch>);

#[derive(Serialize)]
struct ReferenceBody<'a> {
    #[serde(rename = "@odata.type")]
    odata_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    alias: Option<&'a str>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    kind: Option<&'a str>,
}

impl Serialize for ReferencesBody<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(key, reference)| {
            (
                property_key(key),
                ReferenceBody {
                    odata_type: EXTERNAL_REFERENCE_TYPE,
                    alias: reference.alias.as_deref(),
                    kind: reference.kind.as_deref(),
                },
            )
        }))
    }
}

/// Reference keys become OData property names, where a raw `.` is not
/// allowed. `urlencoding` leaves `.` unreserved, so it is escaped here. The
/// key stays singly encoded: one decode pass restores the URL.
fn property_key(key: &ReferenceKey) -> String {
    key.as_str().replace('.', "%2E")
}
