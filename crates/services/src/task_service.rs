//! Daily task management on top of the task repository.

use std::sync::Arc;

use reframe_core::Clock;
use reframe_core::model::{PlanStep, Task, TaskError, TaskId, TaskStats, TransformationPlan};
use storage::repository::{NewTaskRecord, StorageError, TaskRepository};

use crate::error::TaskServiceError;

/// CRUD and progress reporting for the tasks of the active plan.
pub struct TaskService {
    clock: Clock,
    tasks: Arc<dyn TaskRepository>,
}

impl TaskService {
    pub fn new(clock: Clock, tasks: Arc<dyn TaskRepository>) -> Self {
        Self { clock, tasks }
    }

    /// Replaces the stored task list with the steps of a freshly generated
    /// plan. Steps with empty titles are dropped rather than failing the
    /// whole install.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the repository rejects a write.
    pub async fn install_plan(
        &self,
        plan: &TransformationPlan,
    ) -> Result<Vec<Task>, TaskServiceError> {
        let now = self.clock.now();
        self.tasks.clear_tasks().await?;
        for step in plan.steps.iter().filter(|s| !s.title.trim().is_empty()) {
            self.tasks
                .insert_new_task(NewTaskRecord::from_step(step, now))
                .await?;
        }
        Ok(self.tasks.list_tasks().await?)
    }

    /// Adds a single step as a new task.
    ///
    /// # Errors
    ///
    /// Returns `Task(EmptyTitle)` for a blank title and `Storage` on
    /// repository failure.
    pub async fn add_step(&self, step: &PlanStep) -> Result<Task, TaskServiceError> {
        if step.title.trim().is_empty() {
            return Err(TaskError::EmptyTitle.into());
        }
        let now = self.clock.now();
        let id = self
            .tasks
            .insert_new_task(NewTaskRecord::from_step(step, now))
            .await?;
        self.fetch(id).await
    }

    /// Marks a task as completed at the current time.
    ///
    /// # Errors
    ///
    /// Returns `Storage(NotFound)` for an unknown id and
    /// `Task(AlreadyCompleted)` for a task completed earlier.
    pub async fn complete_task(&self, id: TaskId) -> Result<Task, TaskServiceError> {
        let mut task = self.fetch(id).await?;
        task.complete(self.clock.now())?;
        self.tasks.update_task(&task).await?;
        Ok(task)
    }

    /// Attaches or clears free-form notes on a task.
    ///
    /// # Errors
    ///
    /// Returns `Storage(NotFound)` for an unknown id.
    pub async fn update_notes(
        &self,
        id: TaskId,
        notes: Option<String>,
    ) -> Result<Task, TaskServiceError> {
        let mut task = self.fetch(id).await?;
        task.set_notes(notes.filter(|n| !n.trim().is_empty()));
        self.tasks.update_task(&task).await?;
        Ok(task)
    }

    /// # Errors
    ///
    /// Returns `Storage(NotFound)` for an unknown id.
    pub async fn delete_task(&self, id: TaskId) -> Result<(), TaskServiceError> {
        Ok(self.tasks.delete_task(id).await?)
    }

    /// # Errors
    ///
    /// Returns `Storage` if the repository rejects the write.
    pub async fn clear_all(&self) -> Result<(), TaskServiceError> {
        Ok(self.tasks.clear_tasks().await?)
    }

    /// All tasks, ordered by day then insertion order.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the repository cannot be read.
    pub async fn list(&self) -> Result<Vec<Task>, TaskServiceError> {
        Ok(self.tasks.list_tasks().await?)
    }

    /// Completion counters over the current task list.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the repository cannot be read.
    pub async fn stats(&self) -> Result<TaskStats, TaskServiceError> {
        let tasks = self.tasks.list_tasks().await?;
        Ok(TaskStats::from_tasks(&tasks))
    }

    async fn fetch(&self, id: TaskId) -> Result<Task, TaskServiceError> {
        self.tasks
            .get_task(id)
            .await?
            .ok_or(TaskServiceError::Storage(StorageError::NotFound))
    }
}
