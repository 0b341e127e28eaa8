//! Remote coach backend collaborators.
//!
//! The backend owns all AI computation; this module only defines the data
//! contracts and one HTTP implementation.

use std::collections::BTreeMap;

use async_trait::async_trait;

use reframe_core::model::{Analysis, Streak, TransformationPlan};

use crate::error::CoachApiError;

mod client;
mod wire;

pub use client::{CoachConfig, HttpCoachClient};

/// Inputs for the problem analysis call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub problem: String,
    pub questions: Vec<String>,
    pub answers: BTreeMap<usize, String>,
}

/// Inputs for the transformation plan call.
///
/// `analysis` is the last known analysis if one was generated; the backend
/// accepts a plan request without it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanRequest {
    pub problem: String,
    pub analysis: Option<Analysis>,
    pub answers: BTreeMap<usize, String>,
}

/// Generates follow-up questions for a problem statement.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// Ordered follow-up questions for the given problem text.
    ///
    /// # Errors
    ///
    /// Returns `CoachApiError` on transport or payload failures. Callers
    /// absorb this error by falling back to the default question list.
    async fn followup_questions(&self, problem: &str) -> Result<Vec<String>, CoachApiError>;
}

/// Produces the structured problem analysis.
#[async_trait]
pub trait ProblemAnalyzer: Send + Sync {
    /// Analyze the problem together with the collected answers.
    ///
    /// # Errors
    ///
    /// Returns `CoachApiError` on transport or payload failures.
    async fn analyze(&self, request: AnalysisRequest) -> Result<Analysis, CoachApiError>;
}

/// Generates the transformation plan (tasks, strategy, streak seed).
#[async_trait]
pub trait PlanGenerator: Send + Sync {
    /// Generate a plan from the problem, answers, and last known analysis.
    ///
    /// # Errors
    ///
    /// Returns `CoachApiError` on transport or payload failures.
    async fn generate_plan(&self, request: PlanRequest)
    -> Result<TransformationPlan, CoachApiError>;
}

/// Reads the streak counters the backend tracks per device.
#[async_trait]
pub trait StreakSource: Send + Sync {
    /// Current and best streak for this device.
    ///
    /// # Errors
    ///
    /// Returns `CoachApiError` on transport or payload failures. Callers
    /// fall back to the locally mirrored streak.
    async fn current_streak(&self) -> Result<Streak, CoachApiError>;
}
