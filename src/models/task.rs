use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{double_option, MemberId, Priority, ProjectId, TaskId};

/// A unit of work inside a project.
///
/// Every task belongs to exactly one project and may be assigned to a member.
/// Tasks may depend on other tasks of the same project; the dependency graph
/// is kept acyclic so schedule analysis can always order it.
///
/// Milestones are zero-length markers: their `duration_days` is always 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub project_id: ProjectId,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    pub assignee: Option<MemberId>,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    /// Planned length in days, counted from `start_date`.
    #[serde(default)]
    pub duration_days: u32,
    #[serde(default)]
    pub cost: f64,
    #[serde(default)]
    pub is_milestone: bool,
    /// Tasks that must finish before this one starts.
    #[serde(default)]
    pub dependencies: BTreeSet<TaskId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Planned end date: `start_date + duration_days`, when a start date is set.
    pub fn end_date(&self) -> Option<NaiveDate> {
        self.start_date
            .and_then(|start| start.checked_add_days(Days::new(u64::from(self.duration_days))))
    }

    /// Whether the task is past its due date without being done.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status != TaskStatus::Done && self.due_date.is_some_and(|due| due < today)
    }
}

/// The progress status of a task.
///
/// - `Todo`: Not yet started
/// - `InProgress`: Someone is working on it
/// - `Done`: Finished
/// - `Blocked`: Cannot proceed
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Done,
    Blocked,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        Self::Todo,
        Self::InProgress,
        Self::Done,
        Self::Blocked,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Done => "done",
            Self::Blocked => "blocked",
        }
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "todo" => Ok(Self::Todo),
            "in_progress" => Ok(Self::InProgress),
            "done" => Ok(Self::Done),
            "blocked" => Ok(Self::Blocked),
            other => Err(format!("unknown task status `{other}`")),
        }
    }
}

/// Input for creating a new task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateTaskInput {
    /// The project this task belongs to. Must exist.
    pub project_id: ProjectId,
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub assignee: Option<MemberId>,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub duration_days: Option<u32>,
    pub cost: Option<f64>,
    #[serde(default)]
    pub is_milestone: bool,
    #[serde(default)]
    pub dependencies: BTreeSet<TaskId>,
}

/// Input for updating a task. All fields are optional for partial updates.
///
/// Clearable fields use `Option<Option<_>>`: `None` leaves the value alone,
/// `Some(None)` clears it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTaskInput {
    /// Moves the task to another project. Its dependencies must still resolve there.
    pub project_id: Option<ProjectId>,
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    #[serde(default, deserialize_with = "double_option")]
    pub assignee: Option<Option<MemberId>>,
    #[serde(default, deserialize_with = "double_option")]
    pub start_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<NaiveDate>>,
    pub duration_days: Option<u32>,
    pub cost: Option<f64>,
    pub is_milestone: Option<bool>,
    pub dependencies: Option<BTreeSet<TaskId>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(status: TaskStatus, start: Option<NaiveDate>, due: Option<NaiveDate>) -> Task {
        let now = Utc::now();
        Task {
            id: TaskId(1),
            project_id: ProjectId(1),
            title: "Write report".to_string(),
            description: None,
            status,
            priority: Priority::Medium,
            assignee: None,
            start_date: start,
            due_date: due,
            duration_days: 5,
            cost: 0.0,
            is_milestone: false,
            dependencies: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn end_date_adds_duration_to_start() {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let t = task(TaskStatus::Todo, Some(start), None);
        assert_eq!(t.end_date(), NaiveDate::from_ymd_opt(2024, 3, 6));
    }

    #[test]
    fn end_date_is_none_without_start() {
        assert!(task(TaskStatus::Todo, None, None).end_date().is_none());
    }

    #[test]
    fn done_tasks_are_never_overdue() {
        let due = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert!(task(TaskStatus::Todo, None, Some(due)).is_overdue(today));
        assert!(!task(TaskStatus::Done, None, Some(due)).is_overdue(today));
    }

    #[test]
    fn status_round_trips_through_its_string_form() {
        for status in TaskStatus::ALL {
            assert_eq!(status.as_str().parse::<TaskStatus>().unwrap(), status);
        }
    }
}
