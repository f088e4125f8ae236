//! taskbox task command implementations

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::output::{emit_success, OutputOptions, Report};
use crate::task::{generate_task_id, normalize_priority, sort_tasks, TaskRecord, TaskStatus};

use super::{read_input, write_output, Session, TaskCommands};

pub async fn run(root: &Path, command: TaskCommands, options: OutputOptions) -> Result<()> {
    let session = Session::open(root)?;
    let outcome = dispatch(&session, command, options);
    let closed = session.close().await;
    outcome?;
    closed
}

fn dispatch(session: &Session, command: TaskCommands, options: OutputOptions) -> Result<()> {
    match command {
        TaskCommands::Add {
            title,
            description,
            priority,
            project,
            due,
            id,
        } => add(
            session,
            AddArgs {
                title,
                description,
                priority,
                project,
                due,
                id,
            },
            options,
        ),
        TaskCommands::List {
            status,
            project,
            active,
        } => list(session, status.as_deref(), project.as_deref(), active, options),
        TaskCommands::Show { id } => {
            let task = session.tasks.require(&id)?;
            let human = task_detail_output(&task);
            emit_success(options, "task show", &task, &human)
        }
        TaskCommands::Status { id, status } => {
            let status: TaskStatus = status.parse()?;
            let mut task = session.tasks.require(&id)?;
            task.set_status(status);
            session.tasks.save(&task)?;
            let mut human = Report::new(format!("Task {} is now {}", task.id, task.status));
            human.field("title", task.title.clone());
            emit_success(options, "task status", &task, &human)
        }
        TaskCommands::Rm { ids } => {
            let mut ids = ids;
            ids.sort();
            ids.dedup();
            let mut missing = Vec::new();
            for id in &ids {
                if !session.tasks.exists_by_id(id)? {
                    missing.push(id.clone());
                }
            }
            session.tasks.delete_many(&ids)?;

            #[derive(Serialize)]
            struct RmReport<'a> {
                removed: usize,
                missing: &'a [String],
            }
            let report = RmReport {
                removed: ids.len() - missing.len(),
                missing: &missing,
            };
            let mut human = Report::new(format!("Removed {} task(s)", report.removed));
            for id in &missing {
                human.warn(format!("no task {id}"));
            }
            emit_success(options, "task rm", &report, &human)
        }
        TaskCommands::Export { output } => {
            let payload = session.tasks.export_to_json()?;
            write_output(output.as_deref(), &payload)
        }
        TaskCommands::Import { input, clear } => {
            let text = read_input(&input)?;
            let imported = session.tasks.import_from_json(&text, clear)?;
            report_import(options, "task import", imported, session.tasks.count()?)
        }
    }
}

struct AddArgs {
    title: String,
    description: Option<String>,
    priority: String,
    project: Option<String>,
    due: Option<String>,
    id: Option<String>,
}

fn add(session: &Session, args: AddArgs, options: OutputOptions) -> Result<()> {
    let title = args.title.trim();
    if title.is_empty() {
        return Err(Error::InvalidArgument("task title cannot be empty".to_string()));
    }
    if let Some(project_id) = args.project.as_deref() {
        session.projects.require(project_id)?;
    }

    let id = match args.id {
        Some(id) if !id.trim().is_empty() => id.trim().to_string(),
        Some(_) => return Err(Error::InvalidArgument("task id cannot be empty".to_string())),
        None => generate_task_id(&session.config.tasks.id_prefix),
    };

    let mut task = TaskRecord::new(id, title);
    task.description = args.description;
    task.priority = normalize_priority(&args.priority)?;
    task.project_id = args.project;
    task.due_at = args.due.as_deref().map(parse_due).transpose()?;
    session.tasks.save(&task)?;

    let mut human = Report::new(format!("Added task {}", task.id));
    human.field("title", task.title.clone());
    human.field("priority", task.priority.clone());
    if let Some(project_id) = &task.project_id {
        human.field("project", project_id.clone());
    }
    emit_success(options, "task add", &task, &human)
}

fn list(
    session: &Session,
    status: Option<&str>,
    project: Option<&str>,
    active: bool,
    options: OutputOptions,
) -> Result<()> {
    let mut tasks = match (status, project) {
        (Some(status), _) => session.tasks.get_by_status(status.parse()?)?,
        (None, Some(project)) => session.tasks.get_by_project(project)?,
        (None, None) if active => session.tasks.get_active()?,
        (None, None) => session.tasks.get_all()?,
    };
    if let Some(project) = project {
        tasks.retain(|task| task.belongs_to(project));
    }
    if active {
        tasks.retain(|task| !task.is_completed());
    }
    sort_tasks(&mut tasks);

    let mut human = Report::new(format!("Tasks ({})", tasks.len()));
    for task in &tasks {
        human.line(format!(
            "{} [{}] {} {}",
            task.id, task.status, task.priority, task.title
        ));
    }
    emit_success(options, "task list", &tasks, &human)
}

pub async fn run_stats(root: &Path, options: OutputOptions) -> Result<()> {
    let session = Session::open(root)?;
    let stats = session.tasks.stats();
    let projects = session.projects.get_active().map(|projects| projects.len());
    session.close().await?;
    let stats = stats?;
    let projects = projects?;

    #[derive(Serialize)]
    struct StatsReport {
        #[serde(flatten)]
        tasks: crate::task::TaskStats,
        active_projects: usize,
    }

    let mut human = Report::new("Task stats");
    human.field("total", stats.total.to_string());
    for status in TaskStatus::ALL {
        let count = match status {
            TaskStatus::Todo => stats.todo,
            TaskStatus::InProgress => stats.in_progress,
            TaskStatus::Done => stats.done,
        };
        human.field(status.as_str(), count.to_string());
    }
    human.field("active projects", projects.to_string());
    if stats.unreadable > 0 {
        human.warn(format!("{} unreadable task record(s)", stats.unreadable));
    }

    let report = StatsReport {
        tasks: stats,
        active_projects: projects,
    };
    emit_success(options, "stats", &report, &human)
}

pub(super) fn report_import(
    options: OutputOptions,
    command: &str,
    imported: usize,
    total: usize,
) -> Result<()> {
    #[derive(Serialize)]
    struct ImportReport {
        imported: usize,
        total: usize,
    }

    let mut human = Report::new(format!("Imported {imported} record(s)"));
    human.field("total", total.to_string());
    emit_success(options, command, &ImportReport { imported, total }, &human)
}

fn parse_due(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|due| due.with_timezone(&Utc))
        .map_err(|err| Error::InvalidArgument(format!("invalid due date '{raw}': {err}")))
}

fn task_detail_output(task: &TaskRecord) -> Report {
    let mut human = Report::new(format!("{} {}", task.id, task.title));
    human.field("status", task.status.as_str());
    human.field("priority", task.priority.clone());
    if let Some(project_id) = &task.project_id {
        human.field("project", project_id.clone());
    }
    if let Some(due) = task.due_at {
        human.field("due", due.to_rfc3339());
    }
    human.field("updated", task.updated_at.to_rfc3339());
    if let Some(description) = &task.description {
        human.line(description.clone());
    }
    human
}
