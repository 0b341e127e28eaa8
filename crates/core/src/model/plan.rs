use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PlanError {
    #[error("plan contains no steps")]
    NoSteps,

    #[error("unknown task priority: {0}")]
    UnknownPriority(String),
}

/// Urgency bucket for a plan step or task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskPriority::Low => write!(f, "low"),
            TaskPriority::Medium => write!(f, "medium"),
            TaskPriority::High => write!(f, "high"),
        }
    }
}

impl FromStr for TaskPriority {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(PlanError::UnknownPriority(other.to_string())),
        }
    }
}

/// One generated step of the transformation plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Day offset from the plan start, 1-based.
    #[serde(default)]
    pub day: u16,
    /// Suggested time commitment, e.g. "30 min".
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub priority: TaskPriority,
}

/// A phase of the overall strategy ("Foundation", "Momentum", ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyPhase {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub duration: Option<String>,
}

/// Narrative strategy wrapped around the daily steps.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Strategy {
    #[serde(default)]
    pub overview: String,
    /// Total journey length, e.g. "60 days".
    #[serde(default)]
    pub estimated_time: Option<String>,
    #[serde(default)]
    pub phases: Vec<StrategyPhase>,
}

/// Generated task plan handed off when the transformation completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformationPlan {
    pub steps: Vec<PlanStep>,
    #[serde(default)]
    pub strategy: Strategy,
    #[serde(default)]
    pub current_streak: u32,
    #[serde(default)]
    pub longest_streak: u32,
    pub plan_start_date: DateTime<Utc>,
}

impl TransformationPlan {
    /// Check invariants after deserializing from the wire.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::NoSteps` for a plan without any steps.
    pub fn validated(self) -> Result<Self, PlanError> {
        if self.steps.is_empty() {
            return Err(PlanError::NoSteps);
        }
        Ok(self)
    }
}
