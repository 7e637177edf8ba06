//! `planclone inspect <PLAN_ID>`: read-only view of a source plan.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use planclone_core::PlanId;
use planclone_sync::{inspect, InspectReport};

use super::SessionArgs;

/// Arguments for `planclone inspect`.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Id of the plan to read.
    pub plan_id: String,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub session: SessionArgs,
}

impl InspectArgs {
    pub fn run(self) -> Result<()> {
        let config = self.session.load_config()?;
        let client = self.session.client(&config)?;
        let report = inspect(&client, &PlanId::from(self.plan_id.as_str()))
            .with_context(|| format!("failed to inspect plan '{}'", self.plan_id))?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report)
                    .context("failed to serialize inspect JSON")?
            );
            return Ok(());
        }
        print_report(&report);
        Ok(())
    }
}

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "#")]
    position: usize,
    #[tabled(rename = "task")]
    title: String,
    #[tabled(rename = "order key")]
    order_key: String,
    #[tabled(rename = "description")]
    description: &'static str,
    #[tabled(rename = "checklist")]
    checklist: usize,
    #[tabled(rename = "attachments")]
    attachments: usize,
}

fn print_report(report: &InspectReport) {
    let task_count: usize = report.buckets.iter().map(|b| b.tasks.len()).sum();
    println!(
        "{} ({}) | {} buckets | {} tasks",
        report.title.bold(),
        report.plan_id,
        report.buckets.len(),
        task_count
    );

    for bucket in &report.buckets {
        println!(
            "{} {}",
            bucket.name.to_uppercase().bold(),
            format!("[{}]", bucket.order_key).bright_black()
        );
        if bucket.tasks.is_empty() {
            println!("  (no tasks)");
            continue;
        }
        let rows: Vec<TaskRow> = bucket
            .tasks
            .iter()
            .enumerate()
            .map(|(i, task)| TaskRow {
                position: i + 1,
                title: task.title.clone(),
                order_key: task.order_key.clone(),
                description: if task.has_description { "yes" } else { "" },
                checklist: task.checklist_items,
                attachments: task.attachments,
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
    }

    if !report.orphaned_tasks.is_empty() {
        println!(
            "{}",
            format!(
                "{} task(s) reference unreadable buckets and would not be cloned:",
                report.orphaned_tasks.len()
            )
            .yellow()
            .bold()
        );
        for title in &report.orphaned_tasks {
            println!("  - {title}");
        }
    }
    for warning in &report.warnings {
        println!("  {} {warning}", "!".yellow());
    }
}
