use std::env;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;

use reframe_core::Clock;
use reframe_core::model::{Analysis, DeviceId, Streak, TransformationPlan};

use super::wire::{
    AnalyzeRequest, AnalyzeResponse, QuestionRequest, QuestionResponse, StrategyRequest,
    StrategyResponse, StreakResponse, WireAnalysisOut,
};
use super::{AnalysisRequest, PlanGenerator, PlanRequest, ProblemAnalyzer, QuestionSource,
    StreakSource};
use crate::error::CoachApiError;

const DEVICE_ID_HEADER: &str = "x-device-id";
const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8787/api";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for the coach backend.
#[derive(Clone, Debug)]
pub struct CoachConfig {
    pub base_url: String,
    /// Client-side cap per call; the backend can stall indefinitely without it.
    pub timeout: Duration,
}

impl Default for CoachConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl CoachConfig {
    /// Read settings from `REFRAME_API_BASE_URL` and
    /// `REFRAME_API_TIMEOUT_SECS`, falling back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let base_url = env::var("REFRAME_API_BASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.into());
        let timeout = env::var("REFRAME_API_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS), Duration::from_secs);
        Self { base_url, timeout }
    }
}

/// HTTP implementation of every coach backend collaborator.
#[derive(Clone)]
pub struct HttpCoachClient {
    client: Client,
    base_url: String,
    device_id: DeviceId,
    clock: Clock,
}

impl HttpCoachClient {
    /// Build a client for the given backend and device identity.
    ///
    /// # Errors
    ///
    /// Returns `CoachApiError::Http` if the underlying client cannot be built.
    pub fn new(config: &CoachConfig, device_id: DeviceId, clock: Clock) -> Result<Self, CoachApiError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            device_id,
            clock,
        })
    }

    #[must_use]
    pub fn device_id(&self) -> DeviceId {
        self.device_id
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, CoachApiError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.url(path))
            .header(DEVICE_ID_HEADER, self.device_id.to_string())
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CoachApiError::HttpStatus(response.status()));
        }

        Ok(response.json().await?)
    }

    async fn get_json<R>(&self, path: &str) -> Result<R, CoachApiError>
    where
        R: DeserializeOwned,
    {
        let response = self
            .client
            .get(self.url(path))
            .header(DEVICE_ID_HEADER, self.device_id.to_string())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CoachApiError::HttpStatus(response.status()));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl QuestionSource for HttpCoachClient {
    async fn followup_questions(&self, problem: &str) -> Result<Vec<String>, CoachApiError> {
        let body = QuestionRequest { problem };
        let parsed: QuestionResponse = self.post_json("ask-questions", &body).await?;
        if parsed.questions.is_empty() {
            return Err(CoachApiError::EmptyResponse);
        }
        Ok(parsed.questions)
    }
}

#[async_trait]
impl ProblemAnalyzer for HttpCoachClient {
    async fn analyze(&self, request: AnalysisRequest) -> Result<Analysis, CoachApiError> {
        let body = AnalyzeRequest {
            problem: &request.problem,
            answers: &request.answers,
            questions: &request.questions,
        };
        let parsed: AnalyzeResponse = self.post_json("analyze", &body).await?;
        parsed
            .analysis
            .into_model()
            .validated()
            .map_err(|err| CoachApiError::InvalidPayload(err.to_string()))
    }
}

#[async_trait]
impl PlanGenerator for HttpCoachClient {
    async fn generate_plan(
        &self,
        request: PlanRequest,
    ) -> Result<TransformationPlan, CoachApiError> {
        let body = StrategyRequest {
            problem_text: &request.problem,
            results: request.analysis.as_ref().map(WireAnalysisOut::from_model),
            user_answers: &request.answers,
        };
        let parsed: StrategyResponse = self.post_json("generate-strategy", &body).await?;
        parsed
            .into_model(self.clock.now())
            .validated()
            .map_err(|err| CoachApiError::InvalidPayload(err.to_string()))
    }
}

#[async_trait]
impl StreakSource for HttpCoachClient {
    async fn current_streak(&self) -> Result<Streak, CoachApiError> {
        let parsed: StreakResponse = self.get_json("streak").await?;
        Ok(Streak::from_counts(parsed.current, parsed.best))
    }
}
