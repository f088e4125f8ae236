//! Command-line interface for taskbox
//!
//! This module defines the CLI structure using clap derive macros.
//! Each command group is implemented in its own submodule.

use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use crate::backend::FileBackend;
use crate::config::Config;
use crate::error::Result;
use crate::output::OutputOptions;
use crate::project::{ProjectStore, PROJECTS_COLLECTION};
use crate::store::StoreOptions;
use crate::task::{TaskStore, TASKS_COLLECTION};

mod init;
mod project;
mod task;

/// taskbox - local task and project store
///
/// Tasks and projects are kept as JSON records in a local data directory
/// and flushed to disk automatically.
#[derive(Parser, Debug)]
#[command(name = "taskbox")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Root directory holding `.taskbox.toml` and the data directory
    /// (defaults to current directory)
    #[arg(long, global = true, env = "TASKBOX_DIR")]
    pub dir: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the data directory, default config and default project
    Init,

    /// Task management
    #[command(subcommand)]
    Task(TaskCommands),

    /// Project management
    #[command(subcommand)]
    Project(ProjectCommands),

    /// Task counts per status
    Stats,
}

#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Add a task
    Add {
        /// Task title
        title: String,

        /// Longer description
        #[arg(short, long)]
        description: Option<String>,

        /// Priority P0-P4
        #[arg(short, long, default_value = "P2")]
        priority: String,

        /// Project id the task belongs to
        #[arg(long)]
        project: Option<String>,

        /// Due date (RFC 3339, e.g. 2025-01-31T17:00:00Z)
        #[arg(long)]
        due: Option<String>,

        /// Use this id instead of generating one
        #[arg(long)]
        id: Option<String>,
    },

    /// List tasks
    #[command(alias = "ls")]
    List {
        /// Only tasks with this status (todo, in_progress, done)
        #[arg(long)]
        status: Option<String>,

        /// Only tasks in this project
        #[arg(long)]
        project: Option<String>,

        /// Hide done tasks
        #[arg(long)]
        active: bool,
    },

    /// Show a single task
    Show {
        id: String,
    },

    /// Change a task's status
    Status {
        id: String,

        /// New status (todo, in_progress, done)
        status: String,
    },

    /// Remove tasks
    Rm {
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Write all readable tasks as a JSON array
    Export {
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Load tasks from a JSON array produced by `export`
    Import {
        /// Input file, or `-` for stdin
        input: PathBuf,

        /// Remove existing tasks first
        #[arg(long)]
        clear: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum ProjectCommands {
    /// Add a project
    Add {
        /// Project name
        name: String,

        #[arg(short, long)]
        description: Option<String>,

        /// Display color, e.g. #3366ff
        #[arg(long)]
        color: Option<String>,

        /// Use this id instead of generating one
        #[arg(long)]
        id: Option<String>,
    },

    /// List projects
    #[command(alias = "ls")]
    List {
        /// Include archived projects
        #[arg(long)]
        all: bool,
    },

    /// Archive (or with --undo, restore) a project
    Archive {
        id: String,

        #[arg(long)]
        undo: bool,
    },

    /// Remove a project
    Rm {
        id: String,

        /// Also remove the project's tasks
        #[arg(long)]
        with_tasks: bool,
    },

    /// Write all readable projects as a JSON array
    Export {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Load projects from a JSON array produced by `export`
    Import {
        /// Input file, or `-` for stdin
        input: PathBuf,

        #[arg(long)]
        clear: bool,
    },
}

impl Cli {
    /// Name reported in JSON envelopes, e.g. `task add`
    pub fn command_name(&self) -> &'static str {
        match &self.command {
            Commands::Init => "init",
            Commands::Stats => "stats",
            Commands::Task(cmd) => match cmd {
                TaskCommands::Add { .. } => "task add",
                TaskCommands::List { .. } => "task list",
                TaskCommands::Show { .. } => "task show",
                TaskCommands::Status { .. } => "task status",
                TaskCommands::Rm { .. } => "task rm",
                TaskCommands::Export { .. } => "task export",
                TaskCommands::Import { .. } => "task import",
            },
            Commands::Project(cmd) => match cmd {
                ProjectCommands::Add { .. } => "project add",
                ProjectCommands::List { .. } => "project list",
                ProjectCommands::Archive { .. } => "project archive",
                ProjectCommands::Rm { .. } => "project rm",
                ProjectCommands::Export { .. } => "project export",
                ProjectCommands::Import { .. } => "project import",
            },
        }
    }

    pub async fn run(self) -> Result<()> {
        let options = OutputOptions {
            json: self.json,
            quiet: self.quiet,
        };
        let root = resolve_root(self.dir)?;

        match self.command {
            Commands::Init => init::run(&root, options).await,
            Commands::Task(cmd) => task::run(&root, cmd, options).await,
            Commands::Project(cmd) => project::run(&root, cmd, options).await,
            Commands::Stats => task::run_stats(&root, options).await,
        }
    }
}

fn resolve_root(dir: Option<PathBuf>) -> Result<PathBuf> {
    match dir {
        Some(dir) => Ok(dir),
        None => Ok(std::env::current_dir()?),
    }
}

/// Both stores opened on file backends for the duration of one command
pub(crate) struct Session {
    pub config: Config,
    pub tasks: TaskStore,
    pub projects: ProjectStore,
}

impl Session {
    pub fn open(root: &Path) -> Result<Self> {
        let config = Config::load_from_dir(root);
        let data_dir = config.storage.data_dir(root);
        let options = StoreOptions::from(&config.storage);

        let tasks = TaskStore::open(FileBackend::open(&data_dir, TASKS_COLLECTION)?, options)?;
        let projects =
            ProjectStore::open(FileBackend::open(&data_dir, PROJECTS_COLLECTION)?, options)?;
        projects.seed_default(&config.projects)?;

        Ok(Self {
            config,
            tasks,
            projects,
        })
    }

    /// Flush both stores, then release them
    pub async fn close(self) -> Result<()> {
        let tasks_flushed = self.tasks.force_flush().await;
        let projects_flushed = self.projects.force_flush().await;
        self.tasks.dispose()?;
        self.projects.dispose()?;
        tasks_flushed?;
        projects_flushed
    }
}

/// Read an import payload from a file, or stdin for `-`
fn read_input(input: &Path) -> Result<String> {
    if input.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        Ok(text)
    } else {
        Ok(std::fs::read_to_string(input)?)
    }
}

/// Write an export payload to a file, or stdout when no file is given
fn write_output(output: Option<&Path>, payload: &str) -> Result<()> {
    match output {
        Some(path) => crate::lock::write_atomic(path, payload.as_bytes()),
        None => {
            println!("{payload}");
            Ok(())
        }
    }
}
