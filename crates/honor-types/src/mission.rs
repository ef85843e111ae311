use crate::amount::{HonorAmount, UsdAmount};
use crate::error::SettlementError;
use crate::id::{MissionId, TaskId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Twitter,
    Instagram,
    Tiktok,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Twitter => "twitter",
            Platform::Instagram => "instagram",
            Platform::Tiktok => "tiktok",
        }
    }
}

impl FromStr for Platform {
    type Err = SettlementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "twitter" | "x" => Ok(Platform::Twitter),
            "instagram" => Ok(Platform::Instagram),
            "tiktok" => Ok(Platform::Tiktok),
            other => Err(SettlementError::Validation(format!(
                "unsupported platform: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissionModel {
    /// Fixed per-participant reward up to a hard completion cap per task.
    Fixed,
    /// Time-boxed prize pool split among winners at window close; no cap.
    Degen,
}

impl MissionModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            MissionModel::Fixed => "fixed",
            MissionModel::Degen => "degen",
        }
    }
}

impl FromStr for MissionModel {
    type Err = SettlementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fixed" => Ok(MissionModel::Fixed),
            "degen" => Ok(MissionModel::Degen),
            other => Err(SettlementError::Validation(format!(
                "unrecognized mission model: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for MissionModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissionStatus {
    Active,
    Paused,
    Completed,
    Cancelled,
}

impl MissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MissionStatus::Active => "active",
            MissionStatus::Paused => "paused",
            MissionStatus::Completed => "completed",
            MissionStatus::Cancelled => "cancelled",
        }
    }

    /// Completed and cancelled missions accept no further writes.
    pub fn is_terminal(&self) -> bool {
        matches!(self, MissionStatus::Completed | MissionStatus::Cancelled)
    }

    pub fn can_transition(&self, to: MissionStatus) -> bool {
        match (self, to) {
            (MissionStatus::Active, MissionStatus::Paused)
            | (MissionStatus::Active, MissionStatus::Completed)
            | (MissionStatus::Active, MissionStatus::Cancelled)
            | (MissionStatus::Paused, MissionStatus::Active)
            | (MissionStatus::Paused, MissionStatus::Cancelled) => true,
            _ => false,
        }
    }
}

impl fmt::Display for MissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single task inside a mission. `task_type` indexes the price table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionTask {
    pub id: TaskId,
    pub task_type: String,
}

impl MissionTask {
    pub fn new(id: impl Into<String>, task_type: impl Into<String>) -> Self {
        Self {
            id: TaskId::new(id),
            task_type: task_type.into(),
        }
    }
}

/// Mission document. Immutable once published except for status transitions
/// and the cancellation timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mission {
    pub id: MissionId,
    pub owner: UserId,
    pub model: MissionModel,
    pub platform: Platform,
    pub tasks: Vec<MissionTask>,
    /// Fixed model: max verified completions per task. None for degen.
    pub cap: Option<u32>,
    /// Degen model: winner slots per task at settlement.
    pub winners_per_task: Option<u32>,
    pub premium: bool,
    /// Explicit per-user reward override; wins over summed task prices.
    pub reward_per_user: Option<HonorAmount>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub total_cost_honors: HonorAmount,
    pub total_cost_usd: UsdAmount,
    pub status: MissionStatus,
    pub created_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Mission {
    pub fn task(&self, id: &TaskId) -> Option<&MissionTask> {
        self.tasks.iter().find(|t| &t.id == id)
    }

    pub fn has_task(&self, id: &TaskId) -> bool {
        self.task(id).is_some()
    }

    /// Degen time window, when both bounds are present.
    pub fn window(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        match (self.start_at, self.end_at) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => None,
        }
    }

    /// Whether a degen mission is inside its participation window at `now`.
    /// Fixed missions have no expiry and are always open.
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        match self.model {
            MissionModel::Fixed => true,
            MissionModel::Degen => self
                .window()
                .map(|(start, end)| now >= start && now < end)
                .unwrap_or(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        use MissionStatus::*;

        assert!(Active.can_transition(Paused));
        assert!(Active.can_transition(Completed));
        assert!(Active.can_transition(Cancelled));
        assert!(Paused.can_transition(Active));
        assert!(Paused.can_transition(Cancelled));

        assert!(!Paused.can_transition(Completed));
        assert!(!Completed.can_transition(Active));
        assert!(!Completed.can_transition(Cancelled));
        assert!(!Cancelled.can_transition(Active));
        assert!(!Active.can_transition(Active));
    }

    #[test]
    fn test_terminal_states() {
        assert!(MissionStatus::Completed.is_terminal());
        assert!(MissionStatus::Cancelled.is_terminal());
        assert!(!MissionStatus::Active.is_terminal());
        assert!(!MissionStatus::Paused.is_terminal());
    }

    #[test]
    fn test_platform_parsing() {
        assert_eq!("Twitter".parse::<Platform>().unwrap(), Platform::Twitter);
        assert_eq!("X".parse::<Platform>().unwrap(), Platform::Twitter);
        assert_eq!("TIKTOK".parse::<Platform>().unwrap(), Platform::Tiktok);
        assert!("myspace".parse::<Platform>().is_err());
    }

    #[test]
    fn test_model_parsing() {
        assert_eq!("fixed".parse::<MissionModel>().unwrap(), MissionModel::Fixed);
        assert_eq!("DEGEN".parse::<MissionModel>().unwrap(), MissionModel::Degen);
        assert!("hybrid".parse::<MissionModel>().is_err());
    }
}
