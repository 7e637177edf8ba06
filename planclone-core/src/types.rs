//! Domain types for plans, buckets, tasks and their detail records.
//!
//! Ids are opaque strings handed out by the remote service and wrapped in
//! newtypes so a bucket id can never be passed where a task id is expected.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::attachment::ReferenceKey;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

macro_rules! string_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_newtype!(
    /// Identifier of a plan.
    PlanId
);
string_newtype!(
    /// Identifier of a bucket.
    BucketId
);
string_newtype!(
    /// Identifier of a task (also keys its detail record).
    TaskId
);
string_newtype!(
    /// The principal (group) that owns a plan.
    OwnerId
);
string_newtype!(
    /// Opaque service-assigned sort key. Only comparison is meaningful; see
    /// [`crate::order_key`].
    OrderKey
);
string_newtype!(
    /// Last-known server state of a detail record, required on conditional
    /// updates.
    ConcurrencyToken
);

// ---------------------------------------------------------------------------
// Read model
// ---------------------------------------------------------------------------

/// The signed-in principal backing the current session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub id: PlanId,
    pub title: String,
    /// URL of the container (group) the plan belongs to, when reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    pub id: BucketId,
    pub name: String,
    pub order_key: OrderKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
    pub order_key: OrderKey,
    pub bucket_id: BucketId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub title: String,
    pub is_checked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_key: Option<OrderKey>,
}

/// External link attached to a task.
///
/// `key` is the URL exactly as the service reported it, which may be
/// percent-encoded any number of times. It is both the reference's identity
/// and its payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentReference {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Order hint among the task's references, as reported by the service.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_priority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
}

/// Per-task detail record, fetched and updated separately from the task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDetail {
    pub task_id: TaskId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub checklist: Vec<ChecklistItem>,
    #[serde(default)]
    pub references: Vec<AttachmentReference>,
    pub token: ConcurrencyToken,
}

impl TaskDetail {
    /// The description with surrounding whitespace removed, if anything is left.
    pub fn trimmed_description(&self) -> Option<&str> {
        self.description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Write model
// ---------------------------------------------------------------------------

/// Arguments for task creation. Task creation is bucket-scoped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub plan_id: PlanId,
    pub bucket_id: BucketId,
    pub title: String,
    pub priority: Option<i32>,
}

/// Which part of a task's detail the service shows on the task card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PreviewType {
    Automatic,
    NoPreview,
    Checklist,
    Description,
    Reference,
}

impl fmt::Display for PreviewType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreviewType::Automatic => write!(f, "automatic"),
            PreviewType::NoPreview => write!(f, "noPreview"),
            PreviewType::Checklist => write!(f, "checklist"),
            PreviewType::Description => write!(f, "description"),
            PreviewType::Reference => write!(f, "reference"),
        }
    }
}

/// A freshly identified checklist entry for the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecklistEntry {
    pub id: String,
    pub title: String,
    pub is_checked: bool,
}

/// Reference payload stored under a canonical [`ReferenceKey`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferencePatch {
    pub alias: Option<String>,
    pub kind: Option<String>,
}

/// Partial field set for a conditional detail update.
///
/// Checklist entries keep call order; references are keyed by their
/// canonical form so duplicates collapse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailPatch {
    pub description: Option<String>,
    pub preview_type: Option<PreviewType>,
    pub checklist: Vec<ChecklistEntry>,
    pub references: std::collections::BTreeMap<ReferenceKey, ReferencePatch>,
}

impl DetailPatch {
    pub fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.preview_type.is_none()
            && self.checklist.is_empty()
            && self.references.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn detail(description: Option<&str>) -> TaskDetail {
        TaskDetail {
            task_id: TaskId::from("t-1"),
            description: description.map(str::to_owned),
            checklist: vec![],
            references: vec![],
            token: ConcurrencyToken::from("W/\"1\""),
        }
    }

    #[test]
    fn newtype_display_and_equality() {
        assert_eq!(PlanId::from("p-1").to_string(), "p-1");
        assert_eq!(BucketId::from("b"), BucketId::from(String::from("b")));
        assert_eq!(OrderKey::from("8585").as_str(), "8585");
    }

    #[test]
    fn trimmed_description_drops_whitespace_only() {
        assert_eq!(detail(Some("  \n\t ")).trimmed_description(), None);
        assert_eq!(detail(None).trimmed_description(), None);
        assert_eq!(detail(Some("  notes ")).trimmed_description(), Some("notes"));
    }

    #[test]
    fn preview_type_serializes_camel_case() {
        let json = serde_yaml::to_string(&PreviewType::NoPreview).expect("serialize");
        assert_eq!(json.trim(), "noPreview");
        assert_eq!(PreviewType::Checklist.to_string(), "checklist");
    }

    #[test]
    fn empty_patch_is_empty() {
        assert!(DetailPatch::default().is_empty());
        let patch = DetailPatch {
            description: Some("x".into()),
            ..DetailPatch::default()
        };
        assert!(!patch.is_empty());
    }
}
