use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{double_option, MemberId, ProjectId};

/// A team member.
///
/// `projects` is the member-side view of project participation and always
/// matches the `members` sets of the corresponding projects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub name: String,
    /// Role or job title, e.g. "Designer".
    pub role: Option<String>,
    /// Email address, phone number or any free-form contact detail.
    pub contact: Option<String>,
    #[serde(default)]
    pub projects: BTreeSet<ProjectId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new member.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateMemberInput {
    pub name: String,
    pub role: Option<String>,
    pub contact: Option<String>,
    /// Projects to join right away. Each must already exist.
    #[serde(default)]
    pub projects: BTreeSet<ProjectId>,
}

/// Input for updating a member. All fields are optional for partial updates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateMemberInput {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub role: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub contact: Option<Option<String>>,
    /// Replaces the whole project set; project records are updated to match.
    pub projects: Option<BTreeSet<ProjectId>>,
}
