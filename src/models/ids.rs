use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            pub fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> u64 {
                id.0
            }
        }
    };
}

entity_id!(
    /// Identifier of a [`Project`](super::Project).
    ProjectId
);
entity_id!(
    /// Identifier of a [`Task`](super::Task).
    TaskId
);
entity_id!(
    /// Identifier of a [`Member`](super::Member).
    MemberId
);
entity_id!(
    /// Identifier of a [`Document`](super::Document).
    DocumentId
);
entity_id!(
    /// Identifier of a [`Risk`](super::Risk).
    RiskId
);
entity_id!(
    /// Identifier of a [`MeetingNote`](super::MeetingNote).
    MeetingId
);
entity_id!(
    /// Identifier of a [`ResearchEntry`](super::ResearchEntry).
    ResearchId
);
entity_id!(
    /// Identifier of a [`Baseline`](super::Baseline).
    BaselineId
);

/// Per-kind counters for identifier allocation.
///
/// Each counter holds the last identifier issued for its kind. Counters only
/// move forward and are persisted with the dataset, so an identifier is never
/// handed out twice, not even after the entity holding it was deleted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdCounters {
    pub project: u64,
    pub task: u64,
    pub member: u64,
    pub document: u64,
    pub risk: u64,
    pub meeting: u64,
    pub research: u64,
    pub baseline: u64,
}

impl IdCounters {
    pub fn next_project(&mut self) -> ProjectId {
        self.project += 1;
        ProjectId(self.project)
    }

    pub fn next_task(&mut self) -> TaskId {
        self.task += 1;
        TaskId(self.task)
    }

    pub fn next_member(&mut self) -> MemberId {
        self.member += 1;
        MemberId(self.member)
    }

    pub fn next_document(&mut self) -> DocumentId {
        self.document += 1;
        DocumentId(self.document)
    }

    pub fn next_risk(&mut self) -> RiskId {
        self.risk += 1;
        RiskId(self.risk)
    }

    pub fn next_meeting(&mut self) -> MeetingId {
        self.meeting += 1;
        MeetingId(self.meeting)
    }

    pub fn next_research(&mut self) -> ResearchId {
        self.research += 1;
        ResearchId(self.research)
    }

    pub fn next_baseline(&mut self) -> BaselineId {
        self.baseline += 1;
        BaselineId(self.baseline)
    }

    /// Component-wise maximum, used to keep counters advanced when a write is undone.
    pub fn max(self, other: Self) -> Self {
        Self {
            project: self.project.max(other.project),
            task: self.task.max(other.task),
            member: self.member.max(other.member),
            document: self.document.max(other.document),
            risk: self.risk.max(other.risk),
            meeting: self.meeting.max(other.meeting),
            research: self.research.max(other.research),
            baseline: self.baseline.max(other.baseline),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_issue_increasing_ids_per_kind() {
        let mut counters = IdCounters::default();
        assert_eq!(counters.next_project(), ProjectId(1));
        assert_eq!(counters.next_project(), ProjectId(2));
        assert_eq!(counters.next_task(), TaskId(1));
        assert_eq!(counters.project, 2);
    }

    #[test]
    fn max_keeps_the_furthest_counter() {
        let a = IdCounters {
            project: 5,
            task: 1,
            member: 0,
            document: 3,
            ..IdCounters::default()
        };
        let b = IdCounters {
            project: 2,
            task: 4,
            member: 1,
            document: 3,
            risk: 2,
            ..IdCounters::default()
        };
        let merged = a.max(b);
        assert_eq!(merged.project, 5);
        assert_eq!(merged.task, 4);
        assert_eq!(merged.member, 1);
        assert_eq!(merged.document, 3);
        assert_eq!(merged.risk, 2);
    }

    #[test]
    fn counters_missing_from_older_files_start_at_zero() {
        let counters: IdCounters =
            serde_json::from_str(r#"{"project": 3, "task": 7, "member": 1, "document": 2}"#)
                .unwrap();
        assert_eq!(counters.task, 7);
        assert_eq!(counters.risk, 0);
        assert_eq!(counters.baseline, 0);
    }

    #[test]
    fn ids_serialize_as_bare_numbers() {
        let json = serde_json::to_string(&TaskId(42)).unwrap();
        assert_eq!(json, "42");
    }
}
