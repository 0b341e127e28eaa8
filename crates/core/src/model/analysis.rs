use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AnalysisError {
    #[error("confidence must be within 0..=100, got {provided}")]
    InvalidConfidence { provided: u8 },

    #[error("clarity score must be within 0..=100, got {provided}")]
    InvalidClarity { provided: u8 },

    #[error("analysis has no content")]
    Empty,
}

/// Recurring-pattern observations the backend may attach to an analysis.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PatternInsights {
    #[serde(default)]
    pub common_themes: Vec<String>,
    #[serde(default)]
    pub recurrence_frequency: Option<String>,
    #[serde(default)]
    pub trigger_events: Vec<String>,
}

/// Structured result of the remote problem analysis.
///
/// Free-form prose fields come straight from the backend; only the two
/// score fields carry a range invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    pub perceived_problem: String,
    pub real_problem: String,
    pub why_it_happens: String,
    #[serde(default)]
    pub common_mistakes: Vec<String>,
    #[serde(default)]
    pub key_insights: Vec<String>,
    #[serde(default)]
    pub root_causes: Vec<String>,
    #[serde(default)]
    pub action_steps: Vec<String>,
    #[serde(default)]
    pub patterns: Option<PatternInsights>,
    /// Backend confidence in the reading, 0..=100.
    pub confidence: u8,
    /// How clearly the problem statement maps to a single issue, 0..=100.
    pub clarity_score: u8,
}

impl Analysis {
    /// Check invariants after deserializing from the wire or storage.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError` when a score is out of range or every prose
    /// field is empty.
    pub fn validated(self) -> Result<Self, AnalysisError> {
        if self.confidence > 100 {
            return Err(AnalysisError::InvalidConfidence {
                provided: self.confidence,
            });
        }
        if self.clarity_score > 100 {
            return Err(AnalysisError::InvalidClarity {
                provided: self.clarity_score,
            });
        }
        if self.perceived_problem.trim().is_empty()
            && self.real_problem.trim().is_empty()
            && self.why_it_happens.trim().is_empty()
        {
            return Err(AnalysisError::Empty);
        }
        Ok(self)
    }
}
