//! Composition root: wires storage, the coach backend client, and the
//! individual services together.

use std::sync::Arc;

use reframe_core::Clock;
use reframe_core::model::{DeviceId, TransformationPlan};
use storage::Storage;
use storage::repository::SettingsRepository;

use crate::ai::{CoachConfig, HttpCoachClient, PlanGenerator, ProblemAnalyzer, QuestionSource,
    StreakSource};
use crate::error::AppServicesError;
use crate::notify::NotificationSink;
use crate::onboarding::OnboardingFlowService;
use crate::streak_service::StreakService;
use crate::task_service::TaskService;

/// Bundle of all application services sharing one storage backend.
pub struct AppServices {
    onboarding: Arc<OnboardingFlowService>,
    tasks: Arc<TaskService>,
    streaks: Arc<StreakService>,
    device_id: DeviceId,
}

impl AppServices {
    /// Builds the full production stack: `SQLite` storage, the HTTP coach
    /// client bound to this device's persisted identity, and the services
    /// on top. A previously saved onboarding session is restored when one
    /// exists.
    ///
    /// # Errors
    ///
    /// Returns `Sqlite` if the database cannot be opened or migrated,
    /// `Storage` if the device identity cannot be read or written, and
    /// `Api` if the HTTP client cannot be constructed.
    pub async fn new_sqlite(
        database_url: &str,
        clock: Clock,
        config: &CoachConfig,
        notifier: Arc<dyn NotificationSink>,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(database_url).await?;
        let device_id = Self::ensure_device_id(&storage).await?;
        let client = Arc::new(HttpCoachClient::new(config, device_id, clock)?);

        let services = Self::assemble(
            clock,
            client.clone(),
            client.clone(),
            client.clone(),
            client,
            storage,
            notifier,
            device_id,
        );
        if let Err(err) = services.onboarding.restore().await {
            tracing::warn!(error = %err, "failed to restore saved onboarding session");
        }
        Ok(services)
    }

    /// Builds the services against explicit collaborators. Used by tests
    /// and by alternative frontends that bring their own backend client.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn with_collaborators(
        clock: Clock,
        questions: Arc<dyn QuestionSource>,
        analyzer: Arc<dyn ProblemAnalyzer>,
        planner: Arc<dyn PlanGenerator>,
        streak_source: Arc<dyn StreakSource>,
        storage: Storage,
        notifier: Arc<dyn NotificationSink>,
        device_id: DeviceId,
    ) -> Self {
        Self::assemble(
            clock,
            questions,
            analyzer,
            planner,
            streak_source,
            storage,
            notifier,
            device_id,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn assemble(
        clock: Clock,
        questions: Arc<dyn QuestionSource>,
        analyzer: Arc<dyn ProblemAnalyzer>,
        planner: Arc<dyn PlanGenerator>,
        streak_source: Arc<dyn StreakSource>,
        storage: Storage,
        notifier: Arc<dyn NotificationSink>,
        device_id: DeviceId,
    ) -> Self {
        let onboarding = Arc::new(OnboardingFlowService::new(
            clock,
            questions,
            analyzer,
            planner,
            storage.sessions,
            notifier,
        ));
        let tasks = Arc::new(TaskService::new(clock, storage.tasks));
        let streaks = Arc::new(StreakService::new(streak_source, storage.streaks));
        Self {
            onboarding,
            tasks,
            streaks,
            device_id,
        }
    }

    async fn ensure_device_id(storage: &Storage) -> Result<DeviceId, AppServicesError> {
        if let Some(id) = storage.settings.get_device_id().await? {
            return Ok(id);
        }
        let id = DeviceId::generate();
        storage.settings.set_device_id(id).await?;
        Ok(id)
    }

    #[must_use]
    pub fn onboarding(&self) -> &Arc<OnboardingFlowService> {
        &self.onboarding
    }

    #[must_use]
    pub fn tasks(&self) -> &Arc<TaskService> {
        &self.tasks
    }

    #[must_use]
    pub fn streaks(&self) -> &Arc<StreakService> {
        &self.streaks
    }

    #[must_use]
    pub fn device_id(&self) -> DeviceId {
        self.device_id
    }

    /// Runs the transformation end to end: generates the plan, installs
    /// its steps as tasks, and adopts its streak counters.
    ///
    /// # Errors
    ///
    /// Returns `Onboarding` when the plan cannot be generated and `Tasks`
    /// or `Streaks` when the handoff fails.
    pub async fn launch_transformation(&self) -> Result<TransformationPlan, AppServicesError> {
        let plan = self.onboarding.start_transformation().await?;
        self.tasks.install_plan(&plan).await?;
        self.streaks.adopt_plan(&plan).await?;
        Ok(plan)
    }
}
