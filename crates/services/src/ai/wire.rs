//! Wire DTOs for the coach backend.
//!
//! The backend speaks camelCase JSON; the domain model does not. Everything
//! crossing the HTTP boundary goes through these shapes.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use reframe_core::model::{
    Analysis, PatternInsights, PlanStep, Strategy, StrategyPhase, TaskPriority,
    TransformationPlan,
};

#[derive(Debug, Serialize)]
pub(crate) struct QuestionRequest<'a> {
    pub problem: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QuestionResponse {
    #[serde(default)]
    pub questions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AnalyzeRequest<'a> {
    pub problem: &'a str,
    pub answers: &'a BTreeMap<usize, String>,
    pub questions: &'a [String],
}

#[derive(Debug, Deserialize)]
pub(crate) struct AnalyzeResponse {
    pub analysis: WireAnalysis,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WirePatterns {
    #[serde(default)]
    pub common_themes: Vec<String>,
    #[serde(default)]
    pub recurrence_frequency: Option<String>,
    #[serde(default)]
    pub trigger_events: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireAnalysis {
    #[serde(default)]
    pub perceived_problem: String,
    #[serde(default)]
    pub real_problem: String,
    #[serde(default)]
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
    pub patterns: Option<WirePatterns>,
    #[serde(default)]
    pub confidence: u8,
    #[serde(default)]
    pub clarity_score: u8,
}

impl WireAnalysis {
    pub(crate) fn into_model(self) -> Analysis {
        Analysis {
            perceived_problem: self.perceived_problem,
            real_problem: self.real_problem,
            why_it_happens: self.why_it_happens,
            common_mistakes: self.common_mistakes,
            key_insights: self.key_insights,
            root_causes: self.root_causes,
            action_steps: self.action_steps,
            patterns: self.patterns.map(|p| PatternInsights {
                common_themes: p.common_themes,
                recurrence_frequency: p.recurrence_frequency,
                trigger_events: p.trigger_events,
            }),
            confidence: self.confidence,
            clarity_score: self.clarity_score,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StrategyRequest<'a> {
    pub problem_text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<WireAnalysisOut<'a>>,
    pub user_answers: &'a BTreeMap<usize, String>,
}

/// Outbound analysis echo for the strategy request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireAnalysisOut<'a> {
    pub perceived_problem: &'a str,
    pub real_problem: &'a str,
    pub why_it_happens: &'a str,
    pub root_causes: &'a [String],
    pub action_steps: &'a [String],
    pub confidence: u8,
}

impl<'a> WireAnalysisOut<'a> {
    pub(crate) fn from_model(analysis: &'a Analysis) -> Self {
        Self {
            perceived_problem: &analysis.perceived_problem,
            real_problem: &analysis.real_problem,
            why_it_happens: &analysis.why_it_happens,
            root_causes: &analysis.root_causes,
            action_steps: &analysis.action_steps,
            confidence: analysis.confidence,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WirePlanStep {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub day: u16,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub priority: TaskPriority,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireStrategyPhase {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub duration: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireStrategy {
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub estimated_time: Option<String>,
    #[serde(default)]
    pub phases: Vec<WireStrategyPhase>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StrategyResponse {
    #[serde(default)]
    pub tasks: Vec<WirePlanStep>,
    #[serde(default)]
    pub strategy: WireStrategy,
    #[serde(default)]
    pub current_streak: u32,
    #[serde(default)]
    pub longest_streak: u32,
    #[serde(default)]
    pub plan_start_date: Option<DateTime<Utc>>,
}

impl StrategyResponse {
    /// `now` substitutes for a missing plan start date.
    pub(crate) fn into_model(self, now: DateTime<Utc>) -> TransformationPlan {
        TransformationPlan {
            steps: self
                .tasks
                .into_iter()
                .map(|t| PlanStep {
                    title: t.title,
                    description: t.description,
                    day: t.day,
                    duration: t.duration,
                    priority: t.priority,
                })
                .collect(),
            strategy: Strategy {
                overview: self.strategy.overview,
                estimated_time: self.strategy.estimated_time,
                phases: self
                    .strategy
                    .phases
                    .into_iter()
                    .map(|p| StrategyPhase {
                        name: p.name,
                        description: p.description,
                        duration: p.duration,
                    })
                    .collect(),
            },
            current_streak: self.current_streak,
            longest_streak: self.longest_streak,
            plan_start_date: self.plan_start_date.unwrap_or(now),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct StreakResponse {
    #[serde(default)]
    pub current: u32,
    #[serde(default)]
    pub best: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use reframe_core::time::fixed_now;

    #[test]
    fn analysis_deserializes_from_camel_case() {
        let raw = r#"{
            "analysis": {
                "perceivedProblem": "p",
                "realProblem": "r",
                "whyItHappens": "w",
                "commonMistakes": ["m"],
                "rootCauses": ["c"],
                "actionSteps": ["a"],
                "confidence": 85,
                "clarityScore": 70
            }
        }"#;
        let parsed: AnalyzeResponse = serde_json::from_str(raw).unwrap();
        let analysis = parsed.analysis.into_model();
        assert_eq!(analysis.real_problem, "r");
        assert_eq!(analysis.common_mistakes, vec!["m".to_string()]);
        assert_eq!(analysis.clarity_score, 70);
        assert!(analysis.key_insights.is_empty());
    }

    #[test]
    fn strategy_defaults_missing_start_date_to_now() {
        let raw = r#"{
            "tasks": [{"title": "Write it down", "day": 1, "priority": "high"}],
            "strategy": {"overview": "Small steps"},
            "currentStreak": 2,
            "longestStreak": 6
        }"#;
        let parsed: StrategyResponse = serde_json::from_str(raw).unwrap();
        let plan = parsed.into_model(fixed_now());
        assert_eq!(plan.plan_start_date, fixed_now());
        assert_eq!(plan.steps.len(), 1);
        assert_eq!(plan.current_streak, 2);
        assert_eq!(plan.longest_streak, 6);
    }
}
