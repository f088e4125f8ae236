//! taskbox init command implementation

use std::path::Path;

use serde::Serialize;

use crate::config::{Config, CONFIG_FILE};
use crate::error::Result;
use crate::output::{emit_success, OutputOptions, Report};

use super::Session;

#[derive(Serialize)]
struct InitReport {
    config_created: bool,
    data_dir: String,
    default_project: Option<String>,
    tasks: usize,
    projects: usize,
}

pub async fn run(root: &Path, options: OutputOptions) -> Result<()> {
    let config_path = root.join(CONFIG_FILE);
    let config_created = !config_path.exists();
    if config_created {
        std::fs::create_dir_all(root)?;
        Config::default().save(&config_path)?;
    }

    let session = Session::open(root)?;
    let data_dir = session.config.storage.data_dir(root);
    let default_id = session.config.projects.default_id.clone();
    let default_project = session
        .projects
        .exists_by_id(&default_id)?
        .then_some(default_id);
    let report = InitReport {
        config_created,
        data_dir: data_dir.display().to_string(),
        default_project,
        tasks: session.tasks.count()?,
        projects: session.projects.count()?,
    };
    session.close().await?;

    let mut human = Report::new("taskbox initialized");
    human.field("data dir", report.data_dir.clone());
    human.field("tasks", report.tasks.to_string());
    human.field("projects", report.projects.to_string());
    if report.config_created {
        human.line(format!("wrote {}", config_path.display()));
    }

    emit_success(options, "init", &report, &human)
}
