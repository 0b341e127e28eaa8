#![forbid(unsafe_code)]

pub mod ai;
pub mod app_services;
pub mod error;
pub mod notify;
pub mod onboarding;
pub mod streak_service;
pub mod task_service;

pub use reframe_core::Clock;

pub use error::{
    AppServicesError, CoachApiError, OnboardingError, StreakServiceError, TaskServiceError,
};

pub use ai::{
    AnalysisRequest, CoachConfig, HttpCoachClient, PlanGenerator, PlanRequest, ProblemAnalyzer,
    QuestionSource, StreakSource,
};
pub use app_services::AppServices;
pub use notify::{NotificationSink, NullNotifier, RecordingNotifier, Severity};
pub use onboarding::{
    AdvanceOutcome, FlowState, OnboardingFlowService, OnboardingSession, OperationKind,
    default_questions, MAX_ANSWER_LEN, MAX_PROBLEM_LEN, MIN_PROBLEM_LEN,
};
pub use streak_service::StreakService;
pub use task_service::TaskService;
