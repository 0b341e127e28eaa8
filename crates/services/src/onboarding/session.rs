use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use reframe_core::model::{Analysis, TransformationPlan};
use storage::repository::SessionSnapshot;

use crate::error::OnboardingError;

/// Minimum length of the problem statement, in characters.
pub const MIN_PROBLEM_LEN: usize = 20;
/// Maximum length of the problem statement, in characters.
pub const MAX_PROBLEM_LEN: usize = 2000;
/// Maximum length of a single answer, in characters.
pub const MAX_ANSWER_LEN: usize = 1000;

/// Where the session currently sits in the onboarding flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    QuestionsPending,
    Answering,
    Unlocked,
    AnalysisReady,
    TransformationPending,
    TransformationComplete,
}

/// Result of answering or skipping the current question.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// The cursor moved to another question.
    NextQuestion,
    /// The final question was consumed and analysis is now available.
    Unlocked,
}

/// Per-session onboarding state.
///
/// This is a pure state machine; all I/O (backend calls, persistence,
/// notifications) lives in [`super::OnboardingFlowService`]. Invariants:
/// answers are keyed by question index and never overwritten once the
/// session unlocks, `unlocked` never reverts except through [`reset`],
/// and `generation` increases on every reset so stale in-flight results
/// can be told apart from current ones.
///
/// [`reset`]: OnboardingSession::reset
#[derive(Debug, Default)]
pub struct OnboardingSession {
    problem_text: String,
    questions: Vec<String>,
    answers: BTreeMap<usize, String>,
    current_question: usize,
    unlocked: bool,
    analysis: Option<Analysis>,
    transformation_started: bool,
    plan: Option<TransformationPlan>,
    generation: u64,
}

impl OnboardingSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restores a session from a persisted snapshot.
    ///
    /// In-flight markers are deliberately absent from snapshots, so a
    /// restored session is never mid-transformation.
    #[must_use]
    pub fn from_snapshot(snapshot: SessionSnapshot) -> Self {
        let current_question = snapshot.current_question.min(snapshot.questions.len());
        Self {
            problem_text: snapshot.problem_text,
            questions: snapshot.questions,
            answers: snapshot.answers,
            current_question,
            unlocked: snapshot.unlocked,
            analysis: snapshot.analysis,
            transformation_started: false,
            plan: None,
            generation: 0,
        }
    }

    /// Captures the persistable portion of the session.
    #[must_use]
    pub fn snapshot(&self, saved_at: DateTime<Utc>) -> SessionSnapshot {
        SessionSnapshot {
            problem_text: self.problem_text.clone(),
            questions: self.questions.clone(),
            answers: self.answers.clone(),
            current_question: self.current_question,
            unlocked: self.unlocked,
            analysis: self.analysis.clone(),
            saved_at,
        }
    }

    #[must_use]
    pub fn problem_text(&self) -> &str {
        &self.problem_text
    }

    #[must_use]
    pub fn questions(&self) -> &[String] {
        &self.questions
    }

    #[must_use]
    pub fn answers(&self) -> &BTreeMap<usize, String> {
        &self.answers
    }

    #[must_use]
    pub fn current_question(&self) -> usize {
        self.current_question
    }

    #[must_use]
    pub fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    #[must_use]
    pub fn analysis(&self) -> Option<&Analysis> {
        self.analysis.as_ref()
    }

    #[must_use]
    pub fn plan(&self) -> Option<&TransformationPlan> {
        self.plan.as_ref()
    }

    #[must_use]
    pub fn transformation_started(&self) -> bool {
        self.transformation_started
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Sets the problem statement, validating its length in characters.
    ///
    /// # Errors
    ///
    /// Returns `ProblemTooShort` or `ProblemTooLong` when the trimmed text
    /// falls outside the allowed range. The session is left untouched on
    /// failure.
    pub fn set_problem_text(&mut self, text: &str) -> Result<(), OnboardingError> {
        let trimmed = text.trim();
        let len = trimmed.chars().count();
        if len < MIN_PROBLEM_LEN {
            return Err(OnboardingError::ProblemTooShort { len });
        }
        if len > MAX_PROBLEM_LEN {
            return Err(OnboardingError::ProblemTooLong { len });
        }
        self.problem_text = trimmed.to_string();
        Ok(())
    }

    /// True once a valid problem statement exists but questions have not
    /// been generated yet.
    #[must_use]
    pub fn ready_for_questions(&self) -> bool {
        !self.problem_text.is_empty() && self.questions.is_empty()
    }

    /// Installs the follow-up questions and rewinds the cursor.
    ///
    /// # Errors
    ///
    /// Returns `QuestionsAlreadyAvailable` if questions were installed
    /// before; the existing set is kept.
    pub fn install_questions(&mut self, questions: Vec<String>) -> Result<(), OnboardingError> {
        if !self.questions.is_empty() {
            return Err(OnboardingError::QuestionsAlreadyAvailable);
        }
        self.questions = questions;
        self.current_question = 0;
        Ok(())
    }

    /// The question awaiting an answer, if any remain.
    #[must_use]
    pub fn current_prompt(&self) -> Option<&str> {
        self.questions.get(self.current_question).map(String::as_str)
    }

    /// Records an answer for the current question and advances the cursor.
    ///
    /// # Errors
    ///
    /// Returns `NoQuestionPending` when every question has already been
    /// consumed, `AnswerEmpty` for whitespace-only input, and
    /// `AnswerTooLong` when the answer exceeds [`MAX_ANSWER_LEN`]
    /// characters.
    pub fn submit_answer(&mut self, answer: &str) -> Result<AdvanceOutcome, OnboardingError> {
        if self.current_question >= self.questions.len() {
            return Err(OnboardingError::NoQuestionPending);
        }
        let trimmed = answer.trim();
        if trimmed.is_empty() {
            return Err(OnboardingError::AnswerEmpty);
        }
        let len = trimmed.chars().count();
        if len > MAX_ANSWER_LEN {
            return Err(OnboardingError::AnswerTooLong { len });
        }
        self.answers.insert(self.current_question, trimmed.to_string());
        Ok(self.advance())
    }

    /// Skips the current question without recording an answer.
    ///
    /// # Errors
    ///
    /// Returns `NoQuestionPending` when every question has already been
    /// consumed.
    pub fn skip_question(&mut self) -> Result<AdvanceOutcome, OnboardingError> {
        if self.current_question >= self.questions.len() {
            return Err(OnboardingError::NoQuestionPending);
        }
        Ok(self.advance())
    }

    fn advance(&mut self) -> AdvanceOutcome {
        self.current_question += 1;
        if self.current_question >= self.questions.len() {
            self.unlocked = true;
            AdvanceOutcome::Unlocked
        } else {
            AdvanceOutcome::NextQuestion
        }
    }

    /// Stores the analysis produced by the coach backend.
    ///
    /// # Errors
    ///
    /// Returns `Locked` while questions remain unanswered.
    pub fn set_analysis(&mut self, analysis: Analysis) -> Result<(), OnboardingError> {
        if !self.unlocked {
            return Err(OnboardingError::Locked);
        }
        self.analysis = Some(analysis);
        Ok(())
    }

    /// Marks the transformation as dispatched.
    ///
    /// The flag is raised before the backend call goes out so a second
    /// caller is rejected even while the first is still in flight.
    ///
    /// # Errors
    ///
    /// Returns `Locked` before unlock and `TransformationAlreadyStarted`
    /// on a repeat call.
    pub fn begin_transformation(&mut self) -> Result<(), OnboardingError> {
        if !self.unlocked {
            return Err(OnboardingError::Locked);
        }
        if self.transformation_started {
            return Err(OnboardingError::TransformationAlreadyStarted);
        }
        self.transformation_started = true;
        Ok(())
    }

    /// Clears the dispatch flag after a failed transformation so the user
    /// can retry.
    pub fn abort_transformation(&mut self) {
        if self.plan.is_none() {
            self.transformation_started = false;
        }
    }

    /// Records the generated plan, completing the flow.
    pub fn complete_transformation(&mut self, plan: TransformationPlan) {
        self.plan = Some(plan);
    }

    /// Returns the session to `Idle`, discarding all accumulated state and
    /// bumping the generation so in-flight results are discarded on return.
    pub fn reset(&mut self) {
        let generation = self.generation.wrapping_add(1);
        *self = Self {
            generation,
            ..Self::default()
        };
    }

    #[must_use]
    pub fn state(&self) -> FlowState {
        if self.plan.is_some() {
            FlowState::TransformationComplete
        } else if self.transformation_started {
            FlowState::TransformationPending
        } else if self.analysis.is_some() {
            FlowState::AnalysisReady
        } else if self.unlocked {
            FlowState::Unlocked
        } else if !self.questions.is_empty() {
            FlowState::Answering
        } else {
            FlowState::Idle
        }
    }
}
