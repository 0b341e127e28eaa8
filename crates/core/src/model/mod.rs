mod analysis;
mod ids;
mod plan;
mod streak;
mod task;

pub use ids::{DeviceId, TaskId};

pub use analysis::{Analysis, AnalysisError, PatternInsights};
pub use plan::{PlanError, PlanStep, Strategy, StrategyPhase, TaskPriority, TransformationPlan};
pub use streak::Streak;
pub use task::{Task, TaskError, TaskStats};
