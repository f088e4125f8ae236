//! taskbox project command implementations

use std::path::Path;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::output::{emit_success, OutputOptions, Report};
use crate::project::{generate_project_id, ProjectRecord};

use super::task::report_import;
use super::{read_input, write_output, ProjectCommands, Session};

pub async fn run(root: &Path, command: ProjectCommands, options: OutputOptions) -> Result<()> {
    let session = Session::open(root)?;
    let outcome = dispatch(&session, command, options);
    let closed = session.close().await;
    outcome?;
    closed
}

fn dispatch(session: &Session, command: ProjectCommands, options: OutputOptions) -> Result<()> {
    match command {
        ProjectCommands::Add {
            name,
            description,
            color,
            id,
        } => {
            let name = name.trim();
            if name.is_empty() {
                return Err(Error::InvalidArgument(
                    "project name cannot be empty".to_string(),
                ));
            }
            let id = match id {
                Some(id) if !id.trim().is_empty() => id.trim().to_string(),
                Some(_) => {
                    return Err(Error::InvalidArgument(
                        "project id cannot be empty".to_string(),
                    ))
                }
                None => generate_project_id(),
            };
            if session.projects.exists_by_id(&id)? {
                return Err(Error::InvalidArgument(format!("project {id} already exists")));
            }

            let mut project = ProjectRecord::new(id, name);
            project.description = description;
            project.color = color;
            session.projects.save(&project)?;

            let mut human = Report::new(format!("Added project {}", project.id));
            human.field("name", project.name.clone());
            emit_success(options, "project add", &project, &human)
        }
        ProjectCommands::List { all } => {
            let mut projects = if all {
                session.projects.get_all()?
            } else {
                session.projects.get_active()?
            };
            projects.sort_by(|left, right| {
                left.name
                    .to_lowercase()
                    .cmp(&right.name.to_lowercase())
                    .then_with(|| left.id.cmp(&right.id))
            });

            let mut human = Report::new(format!("Projects ({})", projects.len()));
            for project in &projects {
                let marker = if project.archived { " (archived)" } else { "" };
                human.line(format!("{} {}{}", project.id, project.name, marker));
            }
            emit_success(options, "project list", &projects, &human)
        }
        ProjectCommands::Archive { id, undo } => {
            let project = session.projects.set_archived(&id, !undo)?;
            let verb = if undo { "Restored" } else { "Archived" };
            let human = Report::new(format!("{verb} project {}", project.id));
            emit_success(options, "project archive", &project, &human)
        }
        ProjectCommands::Rm { id, with_tasks } => {
            let project = session.projects.require(&id)?;
            let orphaned = session.tasks.get_by_project(&id)?.len();
            if orphaned > 0 && !with_tasks {
                return Err(Error::InvalidArgument(format!(
                    "project {id} still has {orphaned} task(s); pass --with-tasks to remove them"
                )));
            }
            let removed_tasks = session.tasks.delete_by_project(&id)?;
            session.projects.delete_by_id(&id)?;

            #[derive(Serialize)]
            struct RmReport {
                project: ProjectRecord,
                removed_tasks: usize,
            }
            let mut human = Report::new(format!("Removed project {}", project.id));
            human.field("tasks removed", removed_tasks.to_string());
            emit_success(
                options,
                "project rm",
                &RmReport {
                    project,
                    removed_tasks,
                },
                &human,
            )
        }
        ProjectCommands::Export { output } => {
            let payload = session.projects.export_to_json()?;
            write_output(output.as_deref(), &payload)
        }
        ProjectCommands::Import { input, clear } => {
            let text = read_input(&input)?;
            let imported = session.projects.import_from_json(&text, clear)?;
            report_import(options, "project import", imported, session.projects.count()?)
        }
    }
}
