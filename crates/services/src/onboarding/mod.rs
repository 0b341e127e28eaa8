//! Problem-to-plan onboarding: the guided flow from a free-text problem
//! statement through follow-up questions, analysis, and a transformation plan.

mod flow;
mod session;

pub use flow::{OnboardingFlowService, OperationKind};
pub use session::{
    AdvanceOutcome, FlowState, OnboardingSession, MAX_ANSWER_LEN, MAX_PROBLEM_LEN, MIN_PROBLEM_LEN,
};

/// Generic follow-up questions used when the coach backend cannot supply
/// tailored ones.
#[must_use]
pub fn default_questions() -> Vec<String> {
    [
        "What specific emotions do you feel about this problem?",
        "How long has this been affecting you?",
        "What have you already tried to solve it?",
        "What would be your ideal outcome?",
        "What's preventing you from solving this right now?",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}
