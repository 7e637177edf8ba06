//! Run-scoped warnings for recoverable, per-item failures.

use std::fmt;

use serde::Serialize;

/// Stages of a clone run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Stage {
    Verify,
    Snapshot,
    OrderBuckets,
    CreatePlan,
    CreateBuckets,
    CreateTasks,
    Summarize,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Verify => "verify",
            Stage::Snapshot => "snapshot",
            Stage::OrderBuckets => "order-buckets",
            Stage::CreatePlan => "create-plan",
            Stage::CreateBuckets => "create-buckets",
            Stage::CreateTasks => "create-tasks",
            Stage::Summarize => "summarize",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Warning {
    pub stage: Stage,
    /// The entity the warning is about, e.g. `task 'Book venue'`.
    pub subject: String,
    pub message: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.stage, self.subject, self.message)
    }
}

/// Warnings accumulated over one run. Each one is logged as it is recorded.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, stage: Stage, subject: impl Into<String>, message: impl Into<String>) {
        let warning = Warning {
            stage,
            subject: subject.into(),
            message: message.into(),
        };
        tracing::warn!(stage = %warning.stage, subject = %warning.subject, "{}", warning.message);
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_accumulate_in_order() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.warn(Stage::Snapshot, "task 'a'", "detail unreadable");
        diagnostics.warn(Stage::CreateTasks, "task 'b'", "creation failed");
        assert_eq!(diagnostics.len(), 2);
        let warnings = diagnostics.into_warnings();
        assert_eq!(warnings[0].stage, Stage::Snapshot);
        assert_eq!(
            warnings[1].to_string(),
            "[create-tasks] task 'b': creation failed"
        );
    }

    #[test]
    fn warning_serializes_pascal_case() {
        let warning = Warning {
            stage: Stage::CreateBuckets,
            subject: "bucket 'x'".into(),
            message: "m".into(),
        };
        let value = serde_json::to_value(&warning).expect("serialize");
        assert_eq!(value["Stage"], "CreateBuckets");
        assert_eq!(value["Subject"], "bucket 'x'");
    }
}
