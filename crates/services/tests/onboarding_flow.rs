//! End-to-end tests for the onboarding flow against scripted backends.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;

use reframe_core::model::{Analysis, PlanStep, Strategy, TaskPriority, TransformationPlan};
use reframe_core::time::fixed_clock;
use services::{
    AdvanceOutcome, AnalysisRequest, CoachApiError, FlowState, NotificationSink,
    OnboardingError, OnboardingFlowService, PlanGenerator, PlanRequest, ProblemAnalyzer,
    QuestionSource, RecordingNotifier, Severity, default_questions,
};
use storage::repository::{InMemoryStore, SessionStore};

const PROBLEM: &str = "I feel stuck in my job and cannot say why";

fn sample_analysis() -> Analysis {
    Analysis {
        perceived_problem: "Feeling stuck".into(),
        real_problem: "Unclear personal goals".into(),
        why_it_happens: "Drifting without a direction to compare against".into(),
        common_mistakes: vec!["Changing jobs without changing direction".into()],
        key_insights: vec!["Clarity precedes motivation".into()],
        root_causes: vec!["No defined goals".into()],
        action_steps: vec!["Write down what a good year looks like".into()],
        patterns: None,
        confidence: 85,
        clarity_score: 75,
    }
}

fn sample_plan() -> TransformationPlan {
    TransformationPlan {
        steps: vec![
            PlanStep {
                title: "Define one concrete goal".into(),
                description: "Write a single sentence describing success".into(),
                day: 1,
                duration: Some("20 min".into()),
                priority: TaskPriority::High,
            },
            PlanStep {
                title: "List energy drains".into(),
                description: "Note which tasks drain or energize you".into(),
                day: 2,
                duration: None,
                priority: TaskPriority::Medium,
            },
        ],
        strategy: Strategy {
            overview: "Clarify, then act".into(),
            estimated_time: Some("2 weeks".into()),
            phases: Vec::new(),
        },
        current_streak: 0,
        longest_streak: 4,
        plan_start_date: reframe_core::time::fixed_now(),
    }
}

struct ScriptedQuestions {
    fail: bool,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl ScriptedQuestions {
    fn working() -> Self {
        Self { fail: false, calls: AtomicUsize::new(0), delay: None }
    }

    fn failing() -> Self {
        Self { fail: true, calls: AtomicUsize::new(0), delay: None }
    }

    fn slow(delay: Duration) -> Self {
        Self { fail: false, calls: AtomicUsize::new(0), delay: Some(delay) }
    }
}

#[async_trait]
impl QuestionSource for ScriptedQuestions {
    async fn followup_questions(&self, _problem: &str) -> Result<Vec<String>, CoachApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            sleep(delay).await;
        }
        if self.fail {
            return Err(CoachApiError::EmptyResponse);
        }
        Ok(vec![
            "What makes a workday feel wasted?".into(),
            "When did you last feel engaged?".into(),
            "What would you change tomorrow if you could?".into(),
        ])
    }
}

struct ScriptedAnalyzer {
    fail_first: AtomicUsize,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl ScriptedAnalyzer {
    fn working() -> Self {
        Self { fail_first: AtomicUsize::new(0), calls: AtomicUsize::new(0), delay: None }
    }

    fn failing_once() -> Self {
        Self { fail_first: AtomicUsize::new(1), calls: AtomicUsize::new(0), delay: None }
    }

    fn slow(delay: Duration) -> Self {
        Self { fail_first: AtomicUsize::new(0), calls: AtomicUsize::new(0), delay: Some(delay) }
    }
}

#[async_trait]
impl ProblemAnalyzer for ScriptedAnalyzer {
    async fn analyze(&self, _request: AnalysisRequest) -> Result<Analysis, CoachApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            sleep(delay).await;
        }
        if self.fail_first.load(Ordering::SeqCst) > 0 {
            self.fail_first.fetch_sub(1, Ordering::SeqCst);
            return Err(CoachApiError::EmptyResponse);
        }
        Ok(sample_analysis())
    }
}

struct ScriptedPlanner {
    fail_first: AtomicUsize,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl ScriptedPlanner {
    fn working() -> Self {
        Self { fail_first: AtomicUsize::new(0), calls: AtomicUsize::new(0), delay: None }
    }

    fn failing_once() -> Self {
        Self { fail_first: AtomicUsize::new(1), calls: AtomicUsize::new(0), delay: None }
    }

    fn slow(delay: Duration) -> Self {
        Self { fail_first: AtomicUsize::new(0), calls: AtomicUsize::new(0), delay: Some(delay) }
    }
}

#[async_trait]
impl PlanGenerator for ScriptedPlanner {
    async fn generate_plan(&self, _request: PlanRequest) -> Result<TransformationPlan, CoachApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            sleep(delay).await;
        }
        if self.fail_first.load(Ordering::SeqCst) > 0 {
            self.fail_first.fetch_sub(1, Ordering::SeqCst);
            return Err(CoachApiError::EmptyResponse);
        }
        Ok(sample_plan())
    }
}

struct Harness {
    service: OnboardingFlowService,
    questions: Arc<ScriptedQuestions>,
    analyzer: Arc<ScriptedAnalyzer>,
    planner: Arc<ScriptedPlanner>,
    store: Arc<InMemoryStore>,
    notifier: Arc<RecordingNotifier>,
}

fn harness(
    questions: ScriptedQuestions,
    analyzer: ScriptedAnalyzer,
    planner: ScriptedPlanner,
) -> Harness {
    let questions = Arc::new(questions);
    let analyzer = Arc::new(analyzer);
    let planner = Arc::new(planner);
    let store = Arc::new(InMemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let service = OnboardingFlowService::new(
        fixed_clock(),
        questions.clone(),
        analyzer.clone(),
        planner.clone(),
        store.clone(),
        notifier.clone(),
    );
    Harness { service, questions, analyzer, planner, store, notifier }
}

async fn answer_everything(service: &OnboardingFlowService) {
    loop {
        match service.skip_question().await {
            Ok(AdvanceOutcome::NextQuestion) => {}
            Ok(AdvanceOutcome::Unlocked) | Err(_) => break,
        }
    }
}

#[tokio::test]
async fn happy_path_runs_from_problem_to_plan() {
    let h = harness(
        ScriptedQuestions::working(),
        ScriptedAnalyzer::working(),
        ScriptedPlanner::working(),
    );

    h.service.set_problem(PROBLEM).await.unwrap();
    let questions = h.service.begin_questions().await.unwrap();
    assert_eq!(questions.len(), 3);
    assert_eq!(h.service.state().unwrap(), FlowState::Answering);

    assert_eq!(
        h.service.submit_answer("every day feels the same").await.unwrap(),
        AdvanceOutcome::NextQuestion
    );
    assert_eq!(h.service.skip_question().await.unwrap(), AdvanceOutcome::NextQuestion);
    assert_eq!(
        h.service.submit_answer("ask for a new project").await.unwrap(),
        AdvanceOutcome::Unlocked
    );
    assert_eq!(h.service.state().unwrap(), FlowState::Unlocked);

    let analysis = h.service.view_analysis().await.unwrap();
    assert_eq!(analysis.real_problem, "Unclear personal goals");
    assert_eq!(h.service.state().unwrap(), FlowState::AnalysisReady);

    // Second view serves the cached copy.
    h.service.view_analysis().await.unwrap();
    assert_eq!(h.analyzer.calls.load(Ordering::SeqCst), 1);

    let plan = h.service.start_transformation().await.unwrap();
    assert_eq!(plan.steps.len(), 2);
    assert_eq!(h.service.state().unwrap(), FlowState::TransformationComplete);

    let notices = h.notifier.messages();
    assert!(notices.iter().any(|(s, _)| *s == Severity::Success));
    assert!(!notices.iter().any(|(s, _)| *s == Severity::Error));
}

#[tokio::test]
async fn short_problem_text_is_rejected_without_backend_calls() {
    let h = harness(
        ScriptedQuestions::working(),
        ScriptedAnalyzer::working(),
        ScriptedPlanner::working(),
    );

    let err = h.service.set_problem("stuck").await.unwrap_err();
    assert!(matches!(err, OnboardingError::ProblemTooShort { len: 5 }));
    assert_eq!(h.service.state().unwrap(), FlowState::Idle);

    let err = h.service.begin_questions().await.unwrap_err();
    assert!(matches!(err, OnboardingError::ProblemTooShort { len: 0 }));
    assert_eq!(h.questions.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failing_question_backend_falls_back_to_generic_questions() {
    let h = harness(
        ScriptedQuestions::failing(),
        ScriptedAnalyzer::working(),
        ScriptedPlanner::working(),
    );

    h.service.set_problem(PROBLEM).await.unwrap();
    let questions = h.service.begin_questions().await.unwrap();

    assert_eq!(questions, default_questions());
    assert_eq!(h.service.state().unwrap(), FlowState::Answering);
    // The fallback is silent.
    assert!(h.notifier.messages().is_empty());
}

#[tokio::test]
async fn failed_analysis_is_retryable_with_answers_intact() {
    let h = harness(
        ScriptedQuestions::working(),
        ScriptedAnalyzer::failing_once(),
        ScriptedPlanner::working(),
    );

    h.service.set_problem(PROBLEM).await.unwrap();
    h.service.begin_questions().await.unwrap();
    h.service.submit_answer("no growth in years").await.unwrap();
    answer_everything(&h.service).await;

    let err = h.service.view_analysis().await.unwrap_err();
    assert!(matches!(err, OnboardingError::Api(_)));
    assert_eq!(h.service.state().unwrap(), FlowState::Unlocked);
    assert!(h
        .notifier
        .messages()
        .iter()
        .any(|(s, _)| *s == Severity::Error));

    let analysis = h.service.view_analysis().await.unwrap();
    assert_eq!(analysis.confidence, 85);
    assert_eq!(h.analyzer.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn failed_transformation_clears_the_dispatch_flag() {
    let h = harness(
        ScriptedQuestions::working(),
        ScriptedAnalyzer::working(),
        ScriptedPlanner::failing_once(),
    );

    h.service.set_problem(PROBLEM).await.unwrap();
    h.service.begin_questions().await.unwrap();
    answer_everything(&h.service).await;

    let err = h.service.start_transformation().await.unwrap_err();
    assert!(matches!(err, OnboardingError::Api(_)));
    assert_eq!(h.service.state().unwrap(), FlowState::Unlocked);

    let plan = h.service.start_transformation().await.unwrap();
    assert_eq!(plan.steps.len(), 2);
    assert_eq!(h.planner.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_transformation_starts_dispatch_exactly_once() {
    let h = harness(
        ScriptedQuestions::working(),
        ScriptedAnalyzer::working(),
        ScriptedPlanner::slow(Duration::from_millis(50)),
    );

    h.service.set_problem(PROBLEM).await.unwrap();
    h.service.begin_questions().await.unwrap();
    answer_everything(&h.service).await;

    let (first, second) = tokio::join!(
        h.service.start_transformation(),
        h.service.start_transformation(),
    );

    let oks = [&first, &second].iter().filter(|r| r.is_ok()).count();
    assert_eq!(oks, 1);
    let err = [first, second].into_iter().find_map(Result::err).unwrap();
    assert!(matches!(
        err,
        OnboardingError::TransformationAlreadyStarted | OnboardingError::Busy(_)
    ));
    assert_eq!(h.planner.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn reset_discards_the_result_of_an_in_flight_transformation() {
    let h = harness(
        ScriptedQuestions::working(),
        ScriptedAnalyzer::working(),
        ScriptedPlanner::slow(Duration::from_millis(50)),
    );

    h.service.set_problem(PROBLEM).await.unwrap();
    h.service.begin_questions().await.unwrap();
    answer_everything(&h.service).await;

    let (result, ()) = tokio::join!(h.service.start_transformation(), async {
        sleep(Duration::from_millis(10)).await;
        h.service.reset().await.unwrap();
    });

    assert!(matches!(result, Err(OnboardingError::Superseded)));
    assert_eq!(h.service.state().unwrap(), FlowState::Idle);
    assert!(h.store.load_session().await.unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn reset_discards_questions_that_arrive_late() {
    let h = harness(
        ScriptedQuestions::slow(Duration::from_millis(50)),
        ScriptedAnalyzer::working(),
        ScriptedPlanner::working(),
    );

    h.service.set_problem(PROBLEM).await.unwrap();

    let (result, ()) = tokio::join!(h.service.begin_questions(), async {
        sleep(Duration::from_millis(10)).await;
        h.service.reset().await.unwrap();
    });

    assert!(matches!(result, Err(OnboardingError::Superseded)));
    assert_eq!(h.service.state().unwrap(), FlowState::Idle);
    assert_eq!(h.service.current_prompt().unwrap(), None);
    assert!(h.store.load_session().await.unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn reset_discards_an_analysis_that_arrives_late() {
    let h = harness(
        ScriptedQuestions::working(),
        ScriptedAnalyzer::slow(Duration::from_millis(50)),
        ScriptedPlanner::working(),
    );

    h.service.set_problem(PROBLEM).await.unwrap();
    h.service.begin_questions().await.unwrap();
    answer_everything(&h.service).await;

    let (result, ()) = tokio::join!(h.service.view_analysis(), async {
        sleep(Duration::from_millis(10)).await;
        h.service.reset().await.unwrap();
    });

    assert!(matches!(result, Err(OnboardingError::Superseded)));
    assert_eq!(h.service.state().unwrap(), FlowState::Idle);
    assert!(h.service.cached_analysis().unwrap().is_none());
    assert!(h.store.load_session().await.unwrap().is_none());
}

#[tokio::test]
async fn reset_mid_answering_returns_to_idle_and_clears_the_store() {
    let h = harness(
        ScriptedQuestions::working(),
        ScriptedAnalyzer::working(),
        ScriptedPlanner::working(),
    );

    h.service.set_problem(PROBLEM).await.unwrap();
    h.service.begin_questions().await.unwrap();
    h.service.submit_answer("not sure anymore").await.unwrap();
    assert!(h.store.load_session().await.unwrap().is_some());

    h.service.reset().await.unwrap();

    assert_eq!(h.service.state().unwrap(), FlowState::Idle);
    assert!(h.store.load_session().await.unwrap().is_none());
    assert_eq!(h.service.current_prompt().unwrap(), None);
}

#[tokio::test]
async fn saved_sessions_are_restored_with_progress() {
    let h = harness(
        ScriptedQuestions::working(),
        ScriptedAnalyzer::working(),
        ScriptedPlanner::working(),
    );

    h.service.set_problem(PROBLEM).await.unwrap();
    h.service.begin_questions().await.unwrap();
    h.service.submit_answer("over a year now").await.unwrap();

    let notifier: Arc<dyn NotificationSink> = Arc::new(RecordingNotifier::default());
    let revived = OnboardingFlowService::new(
        fixed_clock(),
        h.questions.clone(),
        h.analyzer.clone(),
        h.planner.clone(),
        h.store.clone(),
        notifier,
    );
    assert!(revived.restore().await.unwrap());
    assert_eq!(revived.state().unwrap(), FlowState::Answering);
    assert_eq!(
        revived.current_prompt().unwrap().as_deref(),
        Some("When did you last feel engaged?")
    );
}
