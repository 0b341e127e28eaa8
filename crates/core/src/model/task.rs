use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{PlanStep, TaskId, TaskPriority};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TaskError {
    #[error("task title must not be empty")]
    EmptyTitle,

    #[error("task is already completed")]
    AlreadyCompleted,
}

/// A single actionable item from a transformation plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    title: String,
    description: String,
    day: u16,
    duration: Option<String>,
    priority: TaskPriority,
    notes: Option<String>,
    completed: bool,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Create a pending task from a generated plan step.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::EmptyTitle` if the step title is blank.
    pub fn from_step(id: TaskId, step: &PlanStep, created_at: DateTime<Utc>) -> Result<Self, TaskError> {
        if step.title.trim().is_empty() {
            return Err(TaskError::EmptyTitle);
        }
        Ok(Self {
            id,
            title: step.title.clone(),
            description: step.description.clone(),
            day: step.day,
            duration: step.duration.clone(),
            priority: step.priority,
            notes: None,
            completed: false,
            created_at,
            completed_at: None,
        })
    }

    /// Rehydrate a task from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::EmptyTitle` if the stored title is blank.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: TaskId,
        title: String,
        description: String,
        day: u16,
        duration: Option<String>,
        priority: TaskPriority,
        notes: Option<String>,
        completed: bool,
        created_at: DateTime<Utc>,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<Self, TaskError> {
        if title.trim().is_empty() {
            return Err(TaskError::EmptyTitle);
        }
        Ok(Self {
            id,
            title,
            description,
            day,
            duration,
            priority,
            notes,
            completed,
            created_at,
            completed_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> TaskId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn day(&self) -> u16 {
        self.day
    }

    #[must_use]
    pub fn duration(&self) -> Option<&str> {
        self.duration.as_deref()
    }

    #[must_use]
    pub fn priority(&self) -> TaskPriority {
        self.priority
    }

    #[must_use]
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn set_notes(&mut self, notes: Option<String>) {
        self.notes = notes;
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Mark the task as done at the given time.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::AlreadyCompleted` if the task was completed before.
    pub fn complete(&mut self, at: DateTime<Utc>) -> Result<(), TaskError> {
        if self.completed {
            return Err(TaskError::AlreadyCompleted);
        }
        self.completed = true;
        self.completed_at = Some(at);
        Ok(())
    }
}

/// Aggregate counters over a task list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    /// Share of completed tasks in whole percent, 0 for an empty list.
    pub completion_rate: u8,
}

impl TaskStats {
    #[must_use]
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let total = tasks.len();
        let completed = tasks.iter().filter(|t| t.is_completed()).count();
        let pending = total - completed;
        let completion_rate = if total > 0 {
            u8::try_from(completed * 100 / total).unwrap_or(100)
        } else {
            0
        };
        Self {
            total,
            completed,
            pending,
            completion_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn step(title: &str) -> PlanStep {
        PlanStep {
            title: title.into(),
            description: "desc".into(),
            day: 1,
            duration: Some("15 min".into()),
            priority: TaskPriority::Medium,
        }
    }

    #[test]
    fn blank_title_is_rejected() {
        let err = Task::from_step(TaskId::new(1), &step("  "), fixed_now()).unwrap_err();
        assert!(matches!(err, TaskError::EmptyTitle));
    }

    #[test]
    fn completing_twice_fails() {
        let mut task = Task::from_step(TaskId::new(1), &step("Write it down"), fixed_now()).unwrap();
        task.complete(fixed_now()).unwrap();
        assert_eq!(task.completed_at(), Some(fixed_now()));
        assert!(matches!(
            task.complete(fixed_now()),
            Err(TaskError::AlreadyCompleted)
        ));
    }

    #[test]
    fn stats_count_completion_rate() {
        let mut tasks = vec![
            Task::from_step(TaskId::new(1), &step("a"), fixed_now()).unwrap(),
            Task::from_step(TaskId::new(2), &step("b"), fixed_now()).unwrap(),
            Task::from_step(TaskId::new(3), &step("c"), fixed_now()).unwrap(),
            Task::from_step(TaskId::new(4), &step("d"), fixed_now()).unwrap(),
        ];
        tasks[0].complete(fixed_now()).unwrap();
        tasks[1].complete(fixed_now()).unwrap();
        tasks[2].complete(fixed_now()).unwrap();

        let stats = TaskStats::from_tasks(&tasks);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.completed, 3);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.completion_rate, 75);
    }

    #[test]
    fn stats_for_empty_list() {
        assert_eq!(TaskStats::from_tasks(&[]), TaskStats::default());
    }
}
