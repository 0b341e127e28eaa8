//! Shared error types for the services crate.

use thiserror::Error;

use reframe_core::model::{AnalysisError, PlanError, TaskError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

use crate::onboarding::OperationKind;

/// Errors emitted by the remote coach backend client.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CoachApiError {
    #[error("coach backend returned an empty response")]
    EmptyResponse,
    #[error("coach backend request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error("coach backend payload invalid: {0}")]
    InvalidPayload(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted by the onboarding flow.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum OnboardingError {
    #[error("problem text too short: {len} characters (minimum 20)")]
    ProblemTooShort { len: usize },
    #[error("problem text too long: {len} characters (maximum 2000)")]
    ProblemTooLong { len: usize },
    #[error("answer must not be empty")]
    AnswerEmpty,
    #[error("answer too long: {len} characters (maximum 1000)")]
    AnswerTooLong { len: usize },
    #[error("questions already generated for this session")]
    QuestionsAlreadyAvailable,
    #[error("no question pending")]
    NoQuestionPending,
    #[error("analysis is locked until all questions are answered or skipped")]
    Locked,
    #[error("transformation already started")]
    TransformationAlreadyStarted,
    #[error("{0} call already in flight")]
    Busy(OperationKind),
    #[error("session was reset while the call was in flight")]
    Superseded,
    #[error("session state poisoned")]
    StatePoisoned,
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error(transparent)]
    Api(#[from] CoachApiError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `TaskService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TaskServiceError {
    #[error(transparent)]
    Task(#[from] TaskError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `StreakService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StreakServiceError {
    #[error(transparent)]
    Api(#[from] CoachApiError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Api(#[from] CoachApiError),
    #[error(transparent)]
    Onboarding(#[from] OnboardingError),
    #[error(transparent)]
    Tasks(#[from] TaskServiceError),
    #[error(transparent)]
    Streaks(#[from] StreakServiceError),
}
