use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{double_option, ProjectId, ResearchId};

/// A research log entry. `created_at` is when the finding was logged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchEntry {
    pub id: ResearchId,
    pub project_id: ProjectId,
    pub title: String,
    pub content: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateResearchEntryInput {
    pub project_id: ProjectId,
    pub title: String,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateResearchEntryInput {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub content: Option<Option<String>>,
}
