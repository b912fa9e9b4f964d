//! CLI command definitions for squad-tasks
//!
//! Every command acts as one collaborator (`--user`) and sees only what
//! that collaborator may see.

pub mod import;

use crate::transfer::TransferMode;
use crate::types::{TaskPriority, TaskStatus};
use anyhow::{Result, anyhow};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use import::ImportTemplateArgs;
use std::collections::BTreeSet;

/// Squad task board
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Path to database file (overrides config)
    #[arg(short, long, global = true)]
    pub database: Option<String>,

    /// Path to media directory (overrides config)
    #[arg(short, long, global = true)]
    pub media_dir: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the tasks a user can see
    Tasks(TasksArgs),

    /// Toggle one checklist item
    Toggle(ToggleArgs),

    /// Move a task to another status
    Status(StatusArgs),

    /// Transfer some or all pending checklist items
    Transfer(TransferArgs),

    /// Create tasks, optionally for several companies or the whole team
    Create(CreateArgs),

    /// Dashboard metrics over the visible tasks
    Metrics(UserArgs),

    /// Calendar view of one month
    Agenda(AgendaArgs),

    /// Plan notices for overdue tasks
    Overdue(OverdueArgs),

    /// Watch for reminders until interrupted
    Reminders(UserArgs),

    /// Import a processed document as a task template
    ImportTemplate(ImportTemplateArgs),

    /// Show recent activity
    Activity(ActivityArgs),
}

#[derive(Args, Debug)]
pub struct UserArgs {
    /// Acting collaborator id
    #[arg(short, long)]
    pub user: String,
}

#[derive(Args, Debug)]
pub struct OverdueArgs {
    #[command(flatten)]
    pub user: UserArgs,

    /// Record the planned notices as delivered
    #[arg(long)]
    pub mark: bool,
}

#[derive(Args, Debug)]
pub struct TasksArgs {
    #[command(flatten)]
    pub user: UserArgs,

    /// Only tasks in this status
    #[arg(long, value_parser = parse_status)]
    pub status: Option<TaskStatus>,

    /// Only reminders
    #[arg(long)]
    pub reminders: bool,
}

#[derive(Args, Debug)]
pub struct ToggleArgs {
    #[command(flatten)]
    pub user: UserArgs,

    pub task_id: String,

    /// Zero-based checklist index
    pub index: usize,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    #[command(flatten)]
    pub user: UserArgs,

    pub task_id: String,

    /// Target status (store label or English name)
    #[arg(value_parser = parse_status)]
    pub status: TaskStatus,
}

#[derive(Args, Debug)]
pub struct TransferArgs {
    #[command(flatten)]
    pub user: UserArgs,

    pub task_id: String,

    /// Hand over to a team
    #[arg(long, conflicts_with_all = ["delegate", "give_back"])]
    pub squad: Option<String>,

    /// Delegate to a collaborator (managers only)
    #[arg(long, conflicts_with = "give_back")]
    pub delegate: Option<String>,

    /// Return to the creator or a previous owner
    #[arg(long = "return")]
    pub give_back: Option<String>,

    /// Zero-based checklist indices to move, comma separated
    #[arg(long, value_delimiter = ',', required = true)]
    pub items: Vec<usize>,

    /// New deadline (RFC 3339)
    #[arg(long, value_parser = parse_instant)]
    pub deadline: DateTime<Utc>,

    /// Project name recorded in the history
    #[arg(long)]
    pub project: String,
}

impl TransferArgs {
    pub fn mode(&self) -> Result<TransferMode> {
        match (&self.squad, &self.delegate, &self.give_back) {
            (Some(team), None, None) => Ok(TransferMode::Squad { team: team.clone() }),
            (None, Some(id), None) => Ok(TransferMode::Delegate {
                receptor_id: id.clone(),
            }),
            (None, None, Some(id)) => Ok(TransferMode::Return {
                receptor_id: id.clone(),
            }),
            _ => Err(anyhow!("Choose exactly one of --squad, --delegate or --return")),
        }
    }

    pub fn selected(&self) -> BTreeSet<usize> {
        self.items.iter().copied().collect()
    }
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    #[command(flatten)]
    pub user: UserArgs,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long, default_value = "")]
    pub description: String,

    /// Assignee id (not needed with --replicate)
    #[arg(long)]
    pub assignee: Option<String>,

    /// Target company id; repeat for several companies
    #[arg(long = "company")]
    pub companies: Vec<String>,

    /// Create one copy for every member of your team
    #[arg(long)]
    pub replicate: bool,

    /// Due date (RFC 3339)
    #[arg(long, value_parser = parse_instant)]
    pub due: DateTime<Utc>,

    #[arg(long, value_parser = parse_priority, default_value = "Média")]
    pub priority: TaskPriority,

    #[arg(long, value_parser = parse_status, default_value = "Pendente")]
    pub status: TaskStatus,

    /// Checklist item; repeat for several
    #[arg(long = "item")]
    pub items: Vec<String>,

    /// Create a reminder instead of a regular task
    #[arg(long, conflicts_with = "template")]
    pub reminder: bool,

    /// Template task id to build the checklist from; repeat for several
    #[arg(long)]
    pub template: Vec<String>,

    /// Template activity id to include; repeat for several
    #[arg(long = "activity")]
    pub activities: Vec<String>,
}

#[derive(Args, Debug)]
pub struct AgendaArgs {
    #[command(flatten)]
    pub user: UserArgs,

    /// Month as YYYY-MM
    #[arg(long, value_parser = parse_month)]
    pub month: (i32, u32),
}

#[derive(Args, Debug)]
pub struct ActivityArgs {
    #[command(flatten)]
    pub user: UserArgs,

    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}

fn parse_status(s: &str) -> std::result::Result<TaskStatus, String> {
    TaskStatus::parse(s).ok_or_else(|| format!("unknown status: {}", s))
}

fn parse_priority(s: &str) -> std::result::Result<TaskPriority, String> {
    TaskPriority::parse(s).ok_or_else(|| format!("unknown priority: {}", s))
}

fn parse_instant(s: &str) -> std::result::Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| format!("invalid RFC 3339 instant {}: {}", s, e))
}

fn parse_month(s: &str) -> std::result::Result<(i32, u32), String> {
    NaiveDate::parse_from_str(&format!("{}-01", s.trim()), "%Y-%m-%d")
        .map(|d| {
            use chrono::Datelike;
            (d.year(), d.month())
        })
        .map_err(|_| format!("expected YYYY-MM, got {}", s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_transfer_command() {
        let cli = Cli::try_parse_from([
            "squad-tasks",
            "transfer",
            "--user",
            "u1",
            "t1",
            "--return",
            "u2",
            "--items",
            "0,2",
            "--deadline",
            "2026-06-01T12:00:00Z",
            "--project",
            "Migration",
        ])
        .unwrap();
        let Command::Transfer(args) = cli.command else {
            panic!("expected transfer");
        };
        assert_eq!(
            args.mode().unwrap(),
            TransferMode::Return {
                receptor_id: "u2".into()
            }
        );
        assert_eq!(args.selected().into_iter().collect::<Vec<_>>(), vec![0, 2]);
    }

    #[test]
    fn test_transfer_requires_a_mode() {
        let cli = Cli::try_parse_from([
            "squad-tasks",
            "transfer",
            "-u",
            "u1",
            "t1",
            "--items",
            "0",
            "--deadline",
            "2026-06-01T12:00:00Z",
            "--project",
            "P",
        ])
        .unwrap();
        let Command::Transfer(args) = cli.command else {
            panic!("expected transfer");
        };
        assert!(args.mode().is_err());
    }

    #[test]
    fn test_parse_month() {
        assert_eq!(parse_month("2026-02"), Ok((2026, 2)));
        assert!(parse_month("2026-13").is_err());
    }

    #[test]
    fn test_status_accepts_labels() {
        let cli = Cli::try_parse_from(["squad-tasks", "status", "-u", "u1", "t1", "Em Revisão"])
            .unwrap();
        let Command::Status(args) = cli.command else {
            panic!("expected status");
        };
        assert_eq!(args.status, TaskStatus::Review);
    }
}
