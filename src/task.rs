//! Task records and the task store.
//!
//! Tasks are persisted one record per task in the `tasks` collection, keyed
//! by task id. Task ids are generated by callers, never by the store.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::codec::Entity;
use crate::error::{Error, Result};
use crate::store::EntityStore;

/// Collection name for tasks
pub const TASKS_COLLECTION: &str = "tasks";

const DEFAULT_TASK_PRIORITY: &str = "P2";
const TASK_PRIORITIES: [&str; 5] = ["P0", "P1", "P2", "P3", "P4"];

fn default_task_priority() -> String {
    DEFAULT_TASK_PRIORITY.to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [TaskStatus::Todo, TaskStatus::InProgress, TaskStatus::Done];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
        }
    }

    fn rank(self) -> usize {
        match self {
            TaskStatus::InProgress => 0,
            TaskStatus::Todo => 1,
            TaskStatus::Done => 2,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "todo" | "open" => Ok(TaskStatus::Todo),
            "in_progress" | "doing" => Ok(TaskStatus::InProgress),
            "done" | "closed" => Ok(TaskStatus::Done),
            other => Err(Error::InvalidArgument(format!(
                "unknown task status '{other}' (expected todo|in_progress|done)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default = "default_task_priority")]
    pub priority: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl TaskRecord {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            status: TaskStatus::Todo,
            priority: default_task_priority(),
            project_id: None,
            due_at: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Change status, stamping or clearing `completed_at` as needed
    pub fn set_status(&mut self, status: TaskStatus) {
        let now = Utc::now();
        if status == TaskStatus::Done && self.completed_at.is_none() {
            self.completed_at = Some(now);
        } else if status != TaskStatus::Done {
            self.completed_at = None;
        }
        self.status = status;
        self.updated_at = now;
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Done
    }

    pub fn belongs_to(&self, project_id: &str) -> bool {
        self.project_id.as_deref() == Some(project_id)
    }
}

impl Entity for TaskRecord {
    const KIND: &'static str = "task";

    fn id(&self) -> &str {
        &self.id
    }
}

/// Normalize a priority such as `p1` to `P1`
pub fn normalize_priority(priority: &str) -> Result<String> {
    let trimmed = priority.trim();
    TASK_PRIORITIES
        .iter()
        .find(|entry| entry.eq_ignore_ascii_case(trimmed))
        .map(|entry| entry.to_string())
        .ok_or_else(|| {
            Error::InvalidArgument(format!(
                "invalid priority '{trimmed}' (expected P0-P4)"
            ))
        })
}

fn priority_rank(priority: &str) -> usize {
    let trimmed = priority.trim();
    TASK_PRIORITIES
        .iter()
        .position(|entry| entry.eq_ignore_ascii_case(trimmed))
        .unwrap_or(TASK_PRIORITIES.len())
}

/// In-progress first, then todo, then done; within a status by priority,
/// most recently updated, then id.
pub fn sort_tasks(tasks: &mut [TaskRecord]) {
    tasks.sort_by(|left, right| {
        left.status
            .rank()
            .cmp(&right.status.rank())
            .then_with(|| priority_rank(&left.priority).cmp(&priority_rank(&right.priority)))
            .then_with(|| right.updated_at.cmp(&left.updated_at))
            .then_with(|| left.id.cmp(&right.id))
    });
}

/// Generate a fresh task id such as `task-01j9...`
pub fn generate_task_id(prefix: &str) -> String {
    format!(
        "{}-{}",
        prefix.trim(),
        Ulid::new().to_string().to_ascii_lowercase()
    )
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskStats {
    pub total: usize,
    pub todo: usize,
    pub in_progress: usize,
    pub done: usize,
    /// Stored records that could not be decoded
    pub unreadable: usize,
}

/// Store of [`TaskRecord`]s
pub type TaskStore = EntityStore<TaskRecord>;

impl EntityStore<TaskRecord> {
    pub fn get_by_project(&self, project_id: &str) -> Result<Vec<TaskRecord>> {
        Ok(self
            .get_all()?
            .into_iter()
            .filter(|task| task.belongs_to(project_id))
            .collect())
    }

    pub fn get_by_status(&self, status: TaskStatus) -> Result<Vec<TaskRecord>> {
        Ok(self
            .get_all()?
            .into_iter()
            .filter(|task| task.status == status)
            .collect())
    }

    /// Tasks that are not done
    pub fn get_active(&self) -> Result<Vec<TaskRecord>> {
        Ok(self
            .get_all()?
            .into_iter()
            .filter(|task| !task.is_completed())
            .collect())
    }

    /// Delete every task that belongs to `project_id` and return how many
    pub fn delete_by_project(&self, project_id: &str) -> Result<usize> {
        let ids: Vec<String> = self
            .get_by_project(project_id)?
            .into_iter()
            .map(|task| task.id)
            .collect();
        self.delete_many(&ids)?;
        Ok(ids.len())
    }

    pub fn stats(&self) -> Result<TaskStats> {
        let tasks = self.get_all()?;
        let mut stats = TaskStats {
            total: self.count()?,
            ..TaskStats::default()
        };
        for task in &tasks {
            match task.status {
                TaskStatus::Todo => stats.todo += 1,
                TaskStatus::InProgress => stats.in_progress += 1,
                TaskStatus::Done => stats.done += 1,
            }
        }
        stats.unreadable = stats.total.saturating_sub(tasks.len());
        Ok(stats)
    }

    /// Load a task or fail with `EntityNotFound`
    pub fn require(&self, id: &str) -> Result<TaskRecord> {
        self.get_by_id(id)?.ok_or_else(|| Error::EntityNotFound {
            kind: TaskRecord::KIND,
            id: id.to_string(),
        })
    }
}
