//! squad-tasks command line
//!
//! Opens the configured store, loads a board session for the acting
//! collaborator and runs one command against it.

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use clap::Parser;
use serde::Serialize;
use squad_tasks::agenda;
use squad_tasks::board::Board;
use squad_tasks::cli::import::{ProcessedDocument, build_template};
use squad_tasks::cli::{
    ActivityArgs, AgendaArgs, Cli, Command, CreateArgs, OverdueArgs, StatusArgs, TasksArgs,
    ToggleArgs, TransferArgs,
};
use squad_tasks::config::{Config, ConfigLoader, ConfigPaths};
use squad_tasks::creation::{CreationMode, CreationRequest, TaskDraft, TemplateSelection};
use squad_tasks::db::{Database, FileStore, Store};
use squad_tasks::logging::{self, LogTarget};
use squad_tasks::overdue;
use squad_tasks::reminders::{self, ReminderScanner};
use squad_tasks::transfer::{TransferOutcome, TransferRequest};
use squad_tasks::types::Task;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(&LogTarget::parse(&cli.log), cli.verbose)?;

    let mut paths = ConfigPaths::discover();
    if let Some(config_path) = &cli.config {
        paths = paths.with_file(config_path);
    }
    let mut config = ConfigLoader::load_with_paths(paths)?.into_config();
    if let Some(db_path) = &cli.database {
        config.store.db_path = db_path.into();
    }
    if let Some(media_dir) = &cli.media_dir {
        config.store.media_dir = media_dir.into();
    }

    let db = Database::open(&config.store.db_path)?.with_files(FileStore::new(
        &config.store.media_dir,
        config.store.public_url_base(),
    ));
    let store: Arc<dyn Store> = Arc::new(db);
    let out = Output { json: cli.json };
    let now = Utc::now();

    match cli.command {
        Command::Tasks(args) => run_tasks(&open(&store, &args.user.user, &config)?, &args, &out),
        Command::Toggle(args) => run_toggle(&mut open(&store, &args.user.user, &config)?, &args, now, &out),
        Command::Status(args) => run_status(&mut open(&store, &args.user.user, &config)?, &args, now, &out),
        Command::Transfer(args) => {
            run_transfer(&mut open(&store, &args.user.user, &config)?, &args, now, &out)
        }
        Command::Create(args) => run_create(&mut open(&store, &args.user.user, &config)?, &args, now, &out),
        Command::Metrics(args) => {
            let board = open(&store, &args.user, &config)?;
            let metrics = board.metrics(now);
            out.emit(&metrics, || {
                println!("Total:        {}", metrics.total);
                println!("Completed:    {}", metrics.completed);
                println!("In review:    {}", metrics.in_review);
                println!("Overdue:      {}", metrics.overdue);
                println!("Archived:     {}", metrics.archived);
                println!("Completion:   {:.1}%", metrics.completion_rate);
            })
        }
        Command::Agenda(args) => run_agenda(&open(&store, &args.user.user, &config)?, &args, &out),
        Command::Overdue(args) => {
            run_overdue(&mut open(&store, &args.user.user, &config)?, &args, &config, now, &out)
        }
        Command::Reminders(args) => {
            let mut board = open(&store, &args.user, &config)?;
            run_reminders(&mut board, &config).await
        }
        Command::ImportTemplate(args) => {
            let mut board = open(&store, &args.user, &config)?;
            let doc = ProcessedDocument::read(&args.file)?;
            let source = args
                .file
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let template = build_template(&doc, &args.name, &source);
            if doc.total_tasks != doc.tasks.len() {
                warn!(
                    declared = doc.total_tasks,
                    found = doc.tasks.len(),
                    "Task count does not match the document header"
                );
            }
            if args.dry_run {
                println!(
                    "Would import \"{}\" with {} tasks and {} activities",
                    template.name,
                    template.tasks.len(),
                    template.tasks.iter().map(|t| t.activities.len()).sum::<usize>()
                );
                return Ok(());
            }
            let template = board.save_template(template, now)?;
            out.emit(&template, || {
                println!("Imported template {} ({})", template.name, template.id)
            })
        }
        Command::Activity(args) => run_activity(&open(&store, &args.user.user, &config)?, &args, &out),
    }
}

fn open(store: &Arc<dyn Store>, user_id: &str, config: &Config) -> Result<Board> {
    Ok(Board::load(Arc::clone(store), user_id, config)?)
}

/// Prints either JSON or a human-readable rendering.
struct Output {
    json: bool,
}

impl Output {
    fn emit<T: Serialize>(&self, value: &T, human: impl FnOnce()) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            human();
        }
        Ok(())
    }
}

fn print_task(task: &Task) {
    let company = task.company_id.as_deref().unwrap_or("-");
    println!(
        "{}  [{}] {}  ({}, due {}, {}/{} items, company {})",
        task.id,
        task.status.as_str(),
        task.title,
        task.priority.as_str(),
        task.due_date.format("%Y-%m-%d %H:%M"),
        task.completed_count(),
        task.total_count(),
        company
    );
    for (i, item) in task.checklist.iter().enumerate() {
        let mark = if item.completed { "x" } else { " " };
        println!("    {:>2}. [{}] {}", i, mark, item.title);
    }
}

fn run_tasks(board: &Board, args: &TasksArgs, out: &Output) -> Result<()> {
    let tasks: Vec<Task> = board
        .visible()
        .tasks
        .into_iter()
        .filter(|t| args.status.is_none_or(|s| t.status == s))
        .filter(|t| !args.reminders || t.is_reminder())
        .collect();
    out.emit(&tasks, || tasks.iter().for_each(print_task))
}

fn run_overdue(
    board: &mut Board,
    args: &OverdueArgs,
    config: &Config,
    now: DateTime<Utc>,
    out: &Output,
) -> Result<()> {
    let notices = overdue::plan(&board.visible().tasks, board.collaborators(), now, &config.overdue);
    out.emit(&notices, || {
        for n in &notices {
            println!(
                "[{}] {} -> {} ({:?}): {} day(s) overdue",
                n.urgency, n.task_title, n.recipient_name, n.recipient_kind, n.days_overdue
            );
        }
    })?;
    if args.mark {
        let mut task_ids: Vec<String> = notices.iter().map(|n| n.task_id.clone()).collect();
        task_ids.dedup();
        let stamped = board.mark_notified(&task_ids, now)?;
        info!(count = stamped.len(), "Marked tasks as notified");
    }
    Ok(())
}

fn run_toggle(board: &mut Board, args: &ToggleArgs, now: DateTime<Utc>, out: &Output) -> Result<()> {
    let task = board.toggle_checklist(&args.task_id, args.index, now)?;
    out.emit(&task, || print_task(&task))
}

fn run_status(board: &mut Board, args: &StatusArgs, now: DateTime<Utc>, out: &Output) -> Result<()> {
    let task = board.update_status(&args.task_id, args.status, now)?;
    out.emit(&task, || print_task(&task))
}

fn run_transfer(
    board: &mut Board,
    args: &TransferArgs,
    now: DateTime<Utc>,
    out: &Output,
) -> Result<()> {
    let request = TransferRequest {
        mode: args.mode()?,
        selected: args.selected(),
        deadline: args.deadline,
        project_name: args.project.clone(),
    };
    let outcome = board.transfer(&args.task_id, &request, now)?;
    let touched: Vec<&Task> = match &outcome {
        TransferOutcome::Full { task } => vec![task],
        TransferOutcome::Partial { original, created } => vec![original, created],
    };
    out.emit(&touched, || touched.iter().for_each(|t| print_task(t)))
}

fn run_create(board: &mut Board, args: &CreateArgs, now: DateTime<Utc>, out: &Output) -> Result<()> {
    let mode = if args.reminder {
        CreationMode::Reminder
    } else if !args.template.is_empty() {
        let mut selections = Vec::new();
        for id in &args.template {
            let task = board
                .templates()
                .iter()
                .flat_map(|t| t.tasks.iter())
                .find(|t| &t.id == id)
                .ok_or_else(|| anyhow!("Unknown template task: {}", id))?;
            selections.push(TemplateSelection {
                task: task.clone(),
                activity_ids: args.activities.clone(),
            });
        }
        CreationMode::Template(selections)
    } else {
        CreationMode::Standard
    };

    let request = CreationRequest {
        drafts: vec![TaskDraft {
            title: args.title.clone().unwrap_or_default(),
            description: args.description.clone(),
            status: args.status,
            priority: args.priority,
            assignee_id: args.assignee.clone(),
            due_date: Some(args.due),
            checklist: args.items.clone(),
            ..Default::default()
        }],
        company_ids: args.companies.clone(),
        replicate_to_all_members: args.replicate,
        mode,
    };
    let created = board.create(&request, now)?;
    out.emit(&created, || created.iter().for_each(print_task))
}

fn run_agenda(board: &Board, args: &AgendaArgs, out: &Output) -> Result<()> {
    let (year, month) = args.month;
    let visible = board.visible();
    let days = agenda::month(&visible.tasks, year, month);
    let by_day: Vec<(String, Vec<&str>)> = days
        .iter()
        .map(|(day, tasks)| {
            (
                day.to_string(),
                tasks.iter().map(|t| t.title.as_str()).collect(),
            )
        })
        .collect();
    out.emit(&by_day, || {
        for (day, titles) in &by_day {
            println!("{}", day);
            for title in titles {
                println!("    {}", title);
            }
        }
    })
}

fn run_activity(board: &Board, args: &ActivityArgs, out: &Output) -> Result<()> {
    let entries: Vec<_> = board.activity().recent().take(args.limit).collect();
    out.emit(&entries, || {
        for e in &entries {
            println!(
                "{}  {} {} {} {}",
                e.created_at.format("%Y-%m-%d %H:%M:%S"),
                e.user_name,
                e.action,
                e.entity_type,
                e.entity_name.as_deref().unwrap_or("")
            );
        }
    })
}

async fn run_reminders(board: &mut Board, config: &Config) -> Result<()> {
    let scanner = ReminderScanner::new(chrono::Duration::seconds(config.reminders.window_secs));
    let interval = Duration::from_secs(config.reminders.scan_interval_secs);

    let source = || {
        if let Err(e) = board.refresh_tasks() {
            warn!(error = %e, "Could not refresh tasks; using cached set");
        }
        board.visible().tasks
    };
    let notify = |notice: reminders::ReminderNotice| {
        println!(
            "Reminder: {} ({}) at {}",
            notice.title,
            notice.task_id,
            notice.reminder.format("%Y-%m-%d %H:%M")
        );
    };
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Could not listen for Ctrl-C");
        }
    };

    reminders::run(&scanner, interval, source, notify, shutdown).await;
    info!(fired = scanner.active().len(), "Unacknowledged reminders at exit");
    Ok(())
}
