use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{double_option, MemberId, Priority, ProjectId};

/// A project containing tasks and documents.
///
/// Projects are the top-level organizational unit. Tasks and documents cannot
/// exist without one, so deleting a project removes them too. The `members`
/// set is mirrored on every listed [`Member`](super::Member).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub priority: Priority,
    /// Planned spend for the project.
    #[serde(default)]
    pub budget: f64,
    #[serde(default)]
    pub members: BTreeSet<MemberId>,
    #[serde(default)]
    pub charter: ProjectCharter,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The written case for a project. Every section is optional free text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectCharter {
    pub problem_statement: Option<String>,
    pub objectives: Option<String>,
    pub cost_benefit: Option<String>,
    pub stakeholders: Option<String>,
    pub success_criteria: Option<String>,
}

impl ProjectCharter {
    /// Section names paired with their text, in charter order.
    pub fn sections(&self) -> [(&'static str, Option<&str>); 5] {
        [
            ("problem_statement", self.problem_statement.as_deref()),
            ("objectives", self.objectives.as_deref()),
            ("cost_benefit", self.cost_benefit.as_deref()),
            ("stakeholders", self.stakeholders.as_deref()),
            ("success_criteria", self.success_criteria.as_deref()),
        ]
    }
}

/// The lifecycle status of a project.
///
/// - `Planned`: Not started yet
/// - `Active`: Work is underway
/// - `OnHold`: Paused
/// - `Completed`: Finished
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    Planned,
    Active,
    OnHold,
    Completed,
}

impl ProjectStatus {
    pub const ALL: [ProjectStatus; 4] = [
        Self::Planned,
        Self::Active,
        Self::OnHold,
        Self::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::Active => "active",
            Self::OnHold => "on_hold",
            Self::Completed => "completed",
        }
    }
}

impl FromStr for ProjectStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "planned" => Ok(Self::Planned),
            "active" => Ok(Self::Active),
            "on_hold" => Ok(Self::OnHold),
            "completed" => Ok(Self::Completed),
            other => Err(format!("unknown project status `{other}`")),
        }
    }
}

/// Input for creating a new project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateProjectInput {
    pub name: String,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
    pub priority: Option<Priority>,
    pub budget: Option<f64>,
    /// Members participating from the start. Each must already exist.
    #[serde(default)]
    pub members: BTreeSet<MemberId>,
    #[serde(default)]
    pub charter: ProjectCharter,
}

/// Input for updating an existing project. All fields are optional for partial updates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProjectInput {
    pub name: Option<String>,
    /// `Some(None)` clears the description.
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub status: Option<ProjectStatus>,
    pub priority: Option<Priority>,
    pub budget: Option<f64>,
    /// Replaces the whole member set; member records are updated to match.
    pub members: Option<BTreeSet<MemberId>>,
    /// Replaces the whole charter.
    pub charter: Option<ProjectCharter>,
}
