use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BaselineId, ProjectId, Task};

/// A frozen copy of a project's tasks.
///
/// Baselines are never edited. The copied tasks keep their original ids so
/// the live schedule can be compared task by task; a copied task may refer to
/// tasks, members or dependencies that no longer exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub id: BaselineId,
    pub project_id: ProjectId,
    pub label: Option<String>,
    /// The project's tasks at the time of capture, ordered by id.
    pub tasks: Vec<Task>,
    pub created_at: DateTime<Utc>,
}
