//! `planclone clone --source-plan <ID> --owner <GROUP_ID> --title <TITLE>`

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use planclone_core::{Config, OrphanPolicy, OwnerId, PlanId};
use planclone_sync::pipeline::{failed_stage, nothing_written};
use planclone_sync::{
    clone_plan, CloneOutcome, CloneRequest, CloneSummary, RecordedWrite, RunMode, RunStatus,
};

use super::SessionArgs;

/// Arguments for `planclone clone`.
#[derive(Args, Debug)]
pub struct CloneArgs {
    /// Id of the plan to copy.
    #[arg(long, value_name = "PLAN_ID")]
    pub source_plan: String,

    /// Id of the group that will own the new plan.
    #[arg(long, value_name = "GROUP_ID")]
    pub owner: String,

    /// Title of the new plan.
    #[arg(long)]
    pub title: String,

    /// Read the source and report what would be created, without writing.
    #[arg(long)]
    pub dry_run: bool,

    /// Emit the result record as JSON.
    #[arg(long)]
    pub json: bool,

    /// Pause after each task, in milliseconds.
    #[arg(long, value_name = "MS")]
    pub task_interval_ms: Option<u64>,

    /// Pause before each detail or attachment update, in milliseconds.
    #[arg(long, value_name = "MS")]
    pub detail_delay_ms: Option<u64>,

    /// What to do with tasks whose bucket cannot be read: skip | abort.
    #[arg(long, value_name = "POLICY")]
    pub orphan_policy: Option<OrphanPolicy>,

    #[command(flatten)]
    pub session: SessionArgs,
}

impl CloneArgs {
    pub fn run(self) -> Result<()> {
        if self.title.trim().is_empty() {
            bail!("--title must not be blank");
        }
        let mut config = self.session.load_config()?;
        self.apply_overrides(&mut config);
        let client = self.session.client(&config)?;

        let request = CloneRequest {
            source_plan: PlanId::from(self.source_plan.as_str()),
            owner: OwnerId::from(self.owner.as_str()),
            title: self.title.clone(),
        };
        let mode = if self.dry_run {
            RunMode::DryRun
        } else {
            RunMode::Live
        };

        let outcome = match clone_plan(client, &config, &request, mode) {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(stage = %failed_stage(&err), "clone aborted");
                if !nothing_written(&err) {
                    eprintln!(
                        "{}",
                        "The new plan was created but is incomplete; delete it before retrying."
                            .yellow()
                    );
                }
                return Err(anyhow::Error::new(err)
                    .context(format!("clone of plan '{}' aborted", request.source_plan)));
            }
        };

        if self.json {
            print_json(outcome)?;
        } else {
            print_table(&outcome);
        }
        Ok(())
    }

    fn apply_overrides(&self, config: &mut Config) {
        if let Some(ms) = self.task_interval_ms {
            config.pacing.task_interval_ms = ms;
        }
        if let Some(ms) = self.detail_delay_ms {
            config.pacing.detail_delay_ms = ms;
        }
        if let Some(policy) = self.orphan_policy {
            config.orphan_policy = policy;
        }
    }
}

/// The result record, plus the held-back writes of a dry run.
#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct CloneRecord {
    #[serde(flatten)]
    summary: CloneSummary,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    recorded_writes: Vec<RecordedWrite>,
}

#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "field")]
    field: &'static str,
    #[tabled(rename = "value")]
    value: String,
}

fn print_json(outcome: CloneOutcome) -> Result<()> {
    let record = CloneRecord {
        summary: outcome.summary,
        recorded_writes: outcome.recorded_writes,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&record).context("failed to serialize result JSON")?
    );
    Ok(())
}

fn print_table(outcome: &CloneOutcome) {
    let summary = &outcome.summary;
    let status = match summary.status {
        RunStatus::Completed => summary.status.to_string().green().bold(),
        RunStatus::DryRun => summary.status.to_string().yellow().bold(),
    };
    println!(
        "planclone v{} | '{}' cloned | {}",
        env!("CARGO_PKG_VERSION"),
        summary.source_plan_title,
        status
    );

    let rows = vec![
        FieldRow {
            field: "source plan",
            value: summary.source_plan_title.clone(),
        },
        FieldRow {
            field: "new plan id",
            value: summary.new_plan_id.to_string(),
        },
        FieldRow {
            field: "new plan url",
            value: summary.new_plan_url.clone(),
        },
        FieldRow {
            field: "buckets created",
            value: summary.buckets_created.to_string(),
        },
        FieldRow {
            field: "tasks created",
            value: format!("{} / {}", summary.tasks_created, summary.tasks_attempted),
        },
        FieldRow {
            field: "tasks orphaned",
            value: summary.tasks_orphaned.to_string(),
        },
    ];
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    if !summary.warnings.is_empty() {
        println!(
            "{}",
            format!("{} warning(s)", summary.warnings.len()).yellow().bold()
        );
        for warning in &summary.warnings {
            println!("  {} {warning}", "!".yellow());
        }
    }

    if !outcome.recorded_writes.is_empty() {
        println!("{}", "Writes held back by --dry-run:".bold());
        for write in &outcome.recorded_writes {
            println!("  - {write}");
        }
    }
}
