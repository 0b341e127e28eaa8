use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use reframe_core::Clock;
use reframe_core::model::{Analysis, TransformationPlan};
use storage::repository::{SessionSnapshot, SessionStore};

use super::session::{AdvanceOutcome, FlowState, OnboardingSession};
use super::default_questions;
use crate::ai::{AnalysisRequest, PlanGenerator, PlanRequest, ProblemAnalyzer, QuestionSource};
use crate::error::OnboardingError;
use crate::notify::{NotificationSink, Severity};

const NOTICE_DURATION: Duration = Duration::from_secs(4);

/// Kinds of backend calls the flow dispatches. At most one call of each
/// kind may be in flight at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Questions,
    Analysis,
    Transformation,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationKind::Questions => "question generation",
            OperationKind::Analysis => "analysis",
            OperationKind::Transformation => "transformation",
        };
        f.write_str(name)
    }
}

/// Releases the in-flight slot when dropped, including on early return.
struct InFlightGuard<'a> {
    slots: &'a Mutex<HashSet<OperationKind>>,
    kind: OperationKind,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut slots) = self.slots.lock() {
            slots.remove(&self.kind);
        }
    }
}

/// Drives an [`OnboardingSession`] through its backend collaborators.
///
/// The session sits behind a `std::sync::Mutex` that is never held across
/// an await. Every backend call follows the same shape: lock, validate and
/// capture inputs plus the session generation, unlock, await, relock, and
/// apply the result only if the generation still matches. A reset bumps
/// the generation, so results of calls dispatched before the reset come
/// back as [`OnboardingError::Superseded`] instead of mutating the fresh
/// session.
pub struct OnboardingFlowService {
    clock: Clock,
    questions: Arc<dyn QuestionSource>,
    analyzer: Arc<dyn ProblemAnalyzer>,
    planner: Arc<dyn PlanGenerator>,
    store: Arc<dyn SessionStore>,
    notifier: Arc<dyn NotificationSink>,
    session: Mutex<OnboardingSession>,
    in_flight: Mutex<HashSet<OperationKind>>,
}

impl OnboardingFlowService {
    pub fn new(
        clock: Clock,
        questions: Arc<dyn QuestionSource>,
        analyzer: Arc<dyn ProblemAnalyzer>,
        planner: Arc<dyn PlanGenerator>,
        store: Arc<dyn SessionStore>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            clock,
            questions,
            analyzer,
            planner,
            store,
            notifier,
            session: Mutex::new(OnboardingSession::new()),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Replaces the current session with the persisted snapshot, if one
    /// exists. Returns whether a snapshot was restored.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the snapshot cannot be loaded.
    pub async fn restore(&self) -> Result<bool, OnboardingError> {
        let Some(snapshot) = self.store.load_session().await? else {
            return Ok(false);
        };
        let mut session = self.lock()?;
        *session = OnboardingSession::from_snapshot(snapshot);
        Ok(true)
    }

    /// Current flow state, with in-flight question generation surfaced as
    /// [`FlowState::QuestionsPending`].
    ///
    /// # Errors
    ///
    /// Returns `StatePoisoned` if a previous holder panicked.
    pub fn state(&self) -> Result<FlowState, OnboardingError> {
        let base = self.lock()?.state();
        if base == FlowState::Idle && self.slot_busy(OperationKind::Questions)? {
            return Ok(FlowState::QuestionsPending);
        }
        Ok(base)
    }

    /// The question currently awaiting an answer.
    ///
    /// # Errors
    ///
    /// Returns `StatePoisoned` if a previous holder panicked.
    pub fn current_prompt(&self) -> Result<Option<String>, OnboardingError> {
        Ok(self.lock()?.current_prompt().map(str::to_string))
    }

    /// The cached analysis, if one has been produced.
    ///
    /// # Errors
    ///
    /// Returns `StatePoisoned` if a previous holder panicked.
    pub fn cached_analysis(&self) -> Result<Option<Analysis>, OnboardingError> {
        Ok(self.lock()?.analysis().cloned())
    }

    /// Stores the problem statement and persists the session.
    ///
    /// # Errors
    ///
    /// Returns the validation error from
    /// [`OnboardingSession::set_problem_text`]; the session is unchanged on
    /// failure.
    pub async fn set_problem(&self, text: &str) -> Result<(), OnboardingError> {
        let snapshot = {
            let mut session = self.lock()?;
            session.set_problem_text(text)?;
            session.snapshot(self.clock.now())
        };
        self.persist(&snapshot).await;
        Ok(())
    }

    /// Fetches follow-up questions for the stored problem and installs
    /// them. When the backend fails or returns nothing, the user is not
    /// blocked: a generic question set is installed instead.
    ///
    /// # Errors
    ///
    /// Returns `ProblemTooShort` when no problem statement exists yet,
    /// `QuestionsAlreadyAvailable` when questions were already installed,
    /// `Busy` while another question call is in flight, and `Superseded`
    /// when the session was reset while the call was out.
    pub async fn begin_questions(&self) -> Result<Vec<String>, OnboardingError> {
        let _guard = self.claim_slot(OperationKind::Questions)?;

        let (problem, generation) = {
            let session = self.lock()?;
            if session.problem_text().is_empty() {
                return Err(OnboardingError::ProblemTooShort { len: 0 });
            }
            if !session.ready_for_questions() {
                return Err(OnboardingError::QuestionsAlreadyAvailable);
            }
            (session.problem_text().to_string(), session.generation())
        };

        let questions = match self.questions.followup_questions(&problem).await {
            Ok(questions) if !questions.is_empty() => questions,
            Ok(_) => {
                tracing::warn!("backend returned no questions, using generic set");
                default_questions()
            }
            Err(err) => {
                tracing::warn!(error = %err, "question generation failed, using generic set");
                default_questions()
            }
        };

        let snapshot = {
            let mut session = self.lock()?;
            if session.generation() != generation {
                return Err(OnboardingError::Superseded);
            }
            session.install_questions(questions.clone())?;
            session.snapshot(self.clock.now())
        };
        self.persist(&snapshot).await;
        Ok(questions)
    }

    /// Records an answer for the current question.
    ///
    /// # Errors
    ///
    /// Propagates the validation errors from
    /// [`OnboardingSession::submit_answer`].
    pub async fn submit_answer(&self, answer: &str) -> Result<AdvanceOutcome, OnboardingError> {
        let (outcome, snapshot) = {
            let mut session = self.lock()?;
            let outcome = session.submit_answer(answer)?;
            (outcome, session.snapshot(self.clock.now()))
        };
        self.after_advance(outcome, &snapshot).await;
        Ok(outcome)
    }

    /// Skips the current question.
    ///
    /// # Errors
    ///
    /// Returns `NoQuestionPending` once all questions are consumed.
    pub async fn skip_question(&self) -> Result<AdvanceOutcome, OnboardingError> {
        let (outcome, snapshot) = {
            let mut session = self.lock()?;
            let outcome = session.skip_question()?;
            (outcome, session.snapshot(self.clock.now()))
        };
        self.after_advance(outcome, &snapshot).await;
        Ok(outcome)
    }

    async fn after_advance(&self, outcome: AdvanceOutcome, snapshot: &SessionSnapshot) {
        if outcome == AdvanceOutcome::Unlocked {
            self.notifier.notify(
                Severity::Success,
                "All questions done. Your analysis is ready to generate.",
                NOTICE_DURATION,
            );
        }
        self.persist(snapshot).await;
    }

    /// Returns the analysis for the current session, requesting it from
    /// the backend on first call and serving the cached copy afterwards.
    ///
    /// A failed request leaves the session untouched so the call can be
    /// retried.
    ///
    /// # Errors
    ///
    /// Returns `Locked` before all questions are consumed, `Busy` while an
    /// analysis call is already in flight, `Superseded` when the session
    /// was reset mid-call, and `Api` when the backend fails.
    pub async fn view_analysis(&self) -> Result<Analysis, OnboardingError> {
        let (request, generation) = {
            let session = self.lock()?;
            if let Some(analysis) = session.analysis() {
                return Ok(analysis.clone());
            }
            if !session.is_unlocked() {
                return Err(OnboardingError::Locked);
            }
            let request = AnalysisRequest {
                problem: session.problem_text().to_string(),
                questions: session.questions().to_vec(),
                answers: session.answers().clone(),
            };
            (request, session.generation())
        };

        let _guard = self.claim_slot(OperationKind::Analysis)?;
        let analysis = match self.analyzer.analyze(request).await {
            Ok(analysis) => analysis,
            Err(err) => {
                self.notifier.notify(
                    Severity::Error,
                    "Analysis failed. Please try again.",
                    NOTICE_DURATION,
                );
                return Err(err.into());
            }
        };

        let snapshot = {
            let mut session = self.lock()?;
            if session.generation() != generation {
                return Err(OnboardingError::Superseded);
            }
            session.set_analysis(analysis.clone())?;
            session.snapshot(self.clock.now())
        };
        self.persist(&snapshot).await;
        Ok(analysis)
    }

    /// Requests the transformation plan from the backend.
    ///
    /// The dispatch flag is raised before the request goes out, so a
    /// concurrent second call fails with `TransformationAlreadyStarted`
    /// immediately. A failed request clears the flag again.
    ///
    /// # Errors
    ///
    /// Returns `Locked` before unlock, `TransformationAlreadyStarted` on a
    /// repeat call, `Superseded` when the session was reset mid-call, and
    /// `Api` when the backend fails.
    pub async fn start_transformation(&self) -> Result<TransformationPlan, OnboardingError> {
        let _guard = self.claim_slot(OperationKind::Transformation)?;

        let (request, generation) = {
            let mut session = self.lock()?;
            session.begin_transformation()?;
            let request = PlanRequest {
                problem: session.problem_text().to_string(),
                analysis: session.analysis().cloned(),
                answers: session.answers().clone(),
            };
            (request, session.generation())
        };
        let plan = match self.planner.generate_plan(request).await {
            Ok(plan) => plan,
            Err(err) => {
                {
                    let mut session = self.lock()?;
                    if session.generation() == generation {
                        session.abort_transformation();
                    }
                }
                self.notifier.notify(
                    Severity::Error,
                    "Plan generation failed. Please try again.",
                    NOTICE_DURATION,
                );
                return Err(err.into());
            }
        };

        let snapshot = {
            let mut session = self.lock()?;
            if session.generation() != generation {
                return Err(OnboardingError::Superseded);
            }
            session.complete_transformation(plan.clone());
            session.snapshot(self.clock.now())
        };
        self.notifier.notify(
            Severity::Success,
            "Your transformation plan is ready.",
            NOTICE_DURATION,
        );
        self.persist(&snapshot).await;
        Ok(plan)
    }

    /// Discards the session and its persisted snapshot. In-flight results
    /// dispatched before the reset are dropped when they return.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the persisted snapshot cannot be cleared.
    pub async fn reset(&self) -> Result<(), OnboardingError> {
        self.lock()?.reset();
        self.store.clear_session().await?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, OnboardingSession>, OnboardingError> {
        self.session
            .lock()
            .map_err(|_| OnboardingError::StatePoisoned)
    }

    fn claim_slot(&self, kind: OperationKind) -> Result<InFlightGuard<'_>, OnboardingError> {
        let mut slots = self
            .in_flight
            .lock()
            .map_err(|_| OnboardingError::StatePoisoned)?;
        if !slots.insert(kind) {
            return Err(OnboardingError::Busy(kind));
        }
        Ok(InFlightGuard {
            slots: &self.in_flight,
            kind,
        })
    }

    fn slot_busy(&self, kind: OperationKind) -> Result<bool, OnboardingError> {
        let slots = self
            .in_flight
            .lock()
            .map_err(|_| OnboardingError::StatePoisoned)?;
        Ok(slots.contains(&kind))
    }

    async fn persist(&self, snapshot: &SessionSnapshot) {
        if let Err(err) = self.store.save_session(snapshot).await {
            tracing::warn!(error = %err, "failed to persist onboarding session");
        }
    }
}
