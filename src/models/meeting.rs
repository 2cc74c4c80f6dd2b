use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{double_option, MeetingId, ProjectId};

/// Minutes of a project meeting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingNote {
    pub id: MeetingId,
    pub project_id: ProjectId,
    pub title: String,
    /// Day the meeting took place.
    pub date: NaiveDate,
    /// Names of the people who attended. Free text, not member references.
    #[serde(default)]
    pub participants: Vec<String>,
    pub agenda: Option<String>,
    pub discussion: Option<String>,
    /// Agreed follow-ups.
    pub action_items: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for recording a meeting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateMeetingNoteInput {
    pub project_id: ProjectId,
    pub title: String,
    /// Defaults to today's local date.
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub participants: Vec<String>,
    pub agenda: Option<String>,
    pub discussion: Option<String>,
    pub action_items: Option<String>,
}

/// Input for updating meeting minutes. All fields are optional for partial updates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateMeetingNoteInput {
    pub title: Option<String>,
    pub date: Option<NaiveDate>,
    /// Replaces the whole participant list.
    pub participants: Option<Vec<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub agenda: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub discussion: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub action_items: Option<Option<String>>,
}
