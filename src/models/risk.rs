use std::ops::RangeInclusive;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{double_option, ProjectId, RiskId};

/// Scale used for both probability and impact.
pub const RISK_SCALE: RangeInclusive<u8> = 1..=10;

/// An entry in a project's risk register.
///
/// Probability and impact are rated on [`RISK_SCALE`]; the score is their
/// product and is derived rather than stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Risk {
    pub id: RiskId,
    pub project_id: ProjectId,
    pub name: String,
    pub probability: u8,
    pub impact: u8,
    /// How the team intends to reduce or absorb the risk.
    pub mitigation: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Risk {
    /// Probability times impact, from 1 to 100.
    pub fn score(&self) -> u16 {
        u16::from(self.probability) * u16::from(self.impact)
    }

    pub fn level(&self) -> RiskLevel {
        RiskLevel::from_score(self.score())
    }
}

/// Coarse banding of risk scores for the register view.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 3] = [Self::Low, Self::Medium, Self::High];

    /// Scores up to 20 are low, up to 50 medium, anything above high.
    pub fn from_score(score: u16) -> Self {
        match score {
            0..=20 => Self::Low,
            21..=50 => Self::Medium,
            _ => Self::High,
        }
    }
}

/// Input for adding a risk to a project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateRiskInput {
    pub project_id: ProjectId,
    pub name: String,
    pub probability: u8,
    pub impact: u8,
    pub mitigation: Option<String>,
}

/// Input for updating a risk. All fields are optional for partial updates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateRiskInput {
    pub name: Option<String>,
    pub probability: Option<u8>,
    pub impact: Option<u8>,
    #[serde(default, deserialize_with = "double_option")]
    pub mitigation: Option<Option<String>>,
}
