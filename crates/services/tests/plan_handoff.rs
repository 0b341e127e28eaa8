//! The generated plan must land in the task list and the streak mirror.

use std::sync::Arc;

use async_trait::async_trait;

use reframe_core::model::{
    Analysis, DeviceId, PlanStep, Streak, Strategy, TaskPriority, TransformationPlan,
};
use reframe_core::time::fixed_clock;
use services::{
    AnalysisRequest, AppServices, CoachApiError, NullNotifier, PlanGenerator, PlanRequest,
    ProblemAnalyzer, QuestionSource, StreakSource,
};
use storage::Storage;

struct CannedCoach;

#[async_trait]
impl QuestionSource for CannedCoach {
    async fn followup_questions(&self, _problem: &str) -> Result<Vec<String>, CoachApiError> {
        Ok(vec!["How often does this come up?".into()])
    }
}

#[async_trait]
impl ProblemAnalyzer for CannedCoach {
    async fn analyze(&self, _request: AnalysisRequest) -> Result<Analysis, CoachApiError> {
        Ok(Analysis {
            perceived_problem: "Messy mornings".into(),
            real_problem: "No evening routine".into(),
            why_it_happens: "Decisions pile up overnight".into(),
            common_mistakes: vec![],
            key_insights: vec![],
            root_causes: vec!["No preparation".into()],
            action_steps: vec!["Prepare the night before".into()],
            patterns: None,
            confidence: 70,
            clarity_score: 80,
        })
    }
}

#[async_trait]
impl PlanGenerator for CannedCoach {
    async fn generate_plan(
        &self,
        _request: PlanRequest,
    ) -> Result<TransformationPlan, CoachApiError> {
        Ok(TransformationPlan {
            steps: vec![
                PlanStep {
                    title: "Lay out tomorrow's clothes".into(),
                    description: "Five minutes before bed".into(),
                    day: 1,
                    duration: Some("5 min".into()),
                    priority: TaskPriority::High,
                },
                PlanStep {
                    title: "Pack the bag".into(),
                    description: "Keys, laptop, charger".into(),
                    day: 1,
                    duration: None,
                    priority: TaskPriority::Medium,
                },
                PlanStep {
                    title: "Review the week".into(),
                    description: "Ten minutes on Sunday".into(),
                    day: 7,
                    duration: Some("10 min".into()),
                    priority: TaskPriority::Low,
                },
            ],
            strategy: Strategy {
                overview: "Front-load decisions".into(),
                estimated_time: Some("1 week".into()),
                phases: Vec::new(),
            },
            current_streak: 2,
            longest_streak: 6,
            plan_start_date: reframe_core::time::fixed_now(),
        })
    }
}

#[async_trait]
impl StreakSource for CannedCoach {
    async fn current_streak(&self) -> Result<Streak, CoachApiError> {
        Err(CoachApiError::EmptyResponse)
    }
}

fn app() -> AppServices {
    let coach = Arc::new(CannedCoach);
    AppServices::with_collaborators(
        fixed_clock(),
        coach.clone(),
        coach.clone(),
        coach.clone(),
        coach,
        Storage::in_memory(),
        Arc::new(NullNotifier),
        DeviceId::generate(),
    )
}

#[tokio::test]
async fn launch_installs_tasks_and_adopts_streak_counters() {
    let app = app();
    let onboarding = app.onboarding();

    onboarding
        .set_problem("My mornings are chaotic and I am always late")
        .await
        .unwrap();
    onboarding.begin_questions().await.unwrap();
    onboarding.submit_answer("every single weekday").await.unwrap();
    onboarding.view_analysis().await.unwrap();

    let plan = app.launch_transformation().await.unwrap();
    assert_eq!(plan.steps.len(), 3);

    let tasks = app.tasks().list().await.unwrap();
    assert_eq!(tasks.len(), 3);
    assert_eq!(tasks[0].day(), 1);
    assert_eq!(tasks[2].title(), "Review the week");

    // The remote streak endpoint is down; the mirror adopted the plan's
    // counters and serves them.
    let streak = app.streaks().current().await.unwrap();
    assert_eq!(streak.current(), 2);
    assert_eq!(streak.best(), 6);
}

#[tokio::test]
async fn completing_tasks_moves_the_local_streak() {
    let app = app();
    let onboarding = app.onboarding();

    onboarding
        .set_problem("My mornings are chaotic and I am always late")
        .await
        .unwrap();
    onboarding.begin_questions().await.unwrap();
    onboarding.submit_answer("for months now").await.unwrap();
    app.launch_transformation().await.unwrap();

    let tasks = app.tasks().list().await.unwrap();
    app.tasks().complete_task(tasks[0].id()).await.unwrap();
    let streak = app.streaks().record_completion().await.unwrap();
    assert_eq!(streak.current(), 3);
    assert_eq!(streak.best(), 6);

    let stats = app.tasks().stats().await.unwrap();
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.total, 3);
}
