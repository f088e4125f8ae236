//! Project records and the project store.
//!
//! Projects group tasks: a task points at its project through
//! `TaskRecord::project_id`. Seeding the default project is a separate step
//! ([`ProjectStore::seed_default`]) that callers run after opening the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::codec::Entity;
use crate::config::ProjectsConfig;
use crate::error::{Error, Result};
use crate::store::EntityStore;

/// Collection name for projects
pub const PROJECTS_COLLECTION: &str = "projects";

const PROJECT_ID_PREFIX: &str = "prj";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProjectRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            color: None,
            archived: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn archive(&mut self) {
        self.archived = true;
        self.updated_at = Utc::now();
    }

    pub fn unarchive(&mut self) {
        self.archived = false;
        self.updated_at = Utc::now();
    }
}

impl Entity for ProjectRecord {
    const KIND: &'static str = "project";

    fn id(&self) -> &str {
        &self.id
    }
}

pub fn generate_project_id() -> String {
    format!(
        "{PROJECT_ID_PREFIX}-{}",
        Ulid::new().to_string().to_ascii_lowercase()
    )
}

/// Store of [`ProjectRecord`]s
pub type ProjectStore = EntityStore<ProjectRecord>;

impl EntityStore<ProjectRecord> {
    /// Projects that are not archived
    pub fn get_active(&self) -> Result<Vec<ProjectRecord>> {
        Ok(self
            .get_all()?
            .into_iter()
            .filter(|project| !project.archived)
            .collect())
    }

    pub fn require(&self, id: &str) -> Result<ProjectRecord> {
        self.get_by_id(id)?.ok_or_else(|| Error::EntityNotFound {
            kind: ProjectRecord::KIND,
            id: id.to_string(),
        })
    }

    pub fn set_archived(&self, id: &str, archived: bool) -> Result<ProjectRecord> {
        let mut project = self.require(id)?;
        if archived {
            project.archive();
        } else {
            project.unarchive();
        }
        self.save(&project)?;
        Ok(project)
    }

    /// Write the configured default project if the collection is empty.
    ///
    /// Returns the seeded project, or `None` when seeding is disabled or the
    /// collection already holds records (readable or not).
    pub fn seed_default(&self, config: &ProjectsConfig) -> Result<Option<ProjectRecord>> {
        if !config.seed_default || !self.is_empty()? {
            return Ok(None);
        }
        let project = ProjectRecord::new(config.default_id.trim(), config.default_name.trim());
        self.save(&project)?;
        tracing::debug!(id = %project.id, "seeded default project");
        Ok(Some(project))
    }
}
