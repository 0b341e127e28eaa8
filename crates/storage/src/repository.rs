use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use reframe_core::model::{
    Analysis, DeviceId, PlanStep, Streak, Task, TaskId, TaskPriority,
};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Persisted mirror of an onboarding session.
///
/// This is the durable shape, not the live state machine: in-flight flags
/// (pending calls, `transformation_started`) are intentionally absent so a
/// reload always resumes from a quiescent point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub problem_text: String,
    pub questions: Vec<String>,
    pub answers: BTreeMap<usize, String>,
    pub current_question: usize,
    pub unlocked: bool,
    pub analysis: Option<Analysis>,
    pub saved_at: DateTime<Utc>,
}

/// Insert shape for a task; the repository allocates the id.
#[derive(Debug, Clone)]
pub struct NewTaskRecord {
    pub title: String,
    pub description: String,
    pub day: u16,
    pub duration: Option<String>,
    pub priority: TaskPriority,
    pub created_at: DateTime<Utc>,
}

impl NewTaskRecord {
    #[must_use]
    pub fn from_step(step: &PlanStep, created_at: DateTime<Utc>) -> Self {
        Self {
            title: step.title.clone(),
            description: step.description.clone(),
            day: step.day,
            duration: step.duration.clone(),
            priority: step.priority,
            created_at,
        }
    }
}

/// Durable mirror of the onboarding session, written at lifecycle points only.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetch the last saved snapshot, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the snapshot cannot be read.
    async fn load_session(&self) -> Result<Option<SessionSnapshot>, StorageError>;

    /// Persist or replace the snapshot.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the snapshot cannot be written.
    async fn save_session(&self, snapshot: &SessionSnapshot) -> Result<(), StorageError>;

    /// Drop the snapshot (explicit session reset).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the delete fails.
    async fn clear_session(&self) -> Result<(), StorageError>;
}

/// Repository contract for plan tasks.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Insert a new task and return its allocated id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the task cannot be stored.
    async fn insert_new_task(&self, record: NewTaskRecord) -> Result<TaskId, StorageError>;

    /// Persist an updated task.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the task does not exist.
    async fn update_task(&self, task: &Task) -> Result<(), StorageError>;

    /// Fetch a task by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn get_task(&self, id: TaskId) -> Result<Option<Task>, StorageError>;

    /// All tasks ordered by plan day, then id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn list_tasks(&self) -> Result<Vec<Task>, StorageError>;

    /// Delete a task by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the task does not exist.
    async fn delete_task(&self, id: TaskId) -> Result<(), StorageError>;

    /// Delete every task.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the delete fails.
    async fn clear_tasks(&self) -> Result<(), StorageError>;
}

/// Local mirror for the backend streak counters.
#[async_trait]
pub trait StreakStore: Send + Sync {
    /// Fetch the mirrored streak, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn load_streak(&self) -> Result<Option<Streak>, StorageError>;

    /// Persist or replace the mirrored streak.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    async fn save_streak(&self, streak: &Streak) -> Result<(), StorageError>;
}

/// Installation-level settings (currently just the backend device id).
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Fetch the stored device id, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn get_device_id(&self) -> Result<Option<DeviceId>, StorageError>;

    /// Persist the device id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    async fn set_device_id(&self, id: DeviceId) -> Result<(), StorageError>;
}

#[derive(Default)]
struct InMemoryState {
    session: Option<SessionSnapshot>,
    tasks: BTreeMap<TaskId, Task>,
    next_task_id: u64,
    streak: Option<Streak>,
    device_id: Option<DeviceId>,
}

/// Simple in-memory store for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<InMemoryState>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, InMemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn load_session(&self) -> Result<Option<SessionSnapshot>, StorageError> {
        Ok(self.lock()?.session.clone())
    }

    async fn save_session(&self, snapshot: &SessionSnapshot) -> Result<(), StorageError> {
        self.lock()?.session = Some(snapshot.clone());
        Ok(())
    }

    async fn clear_session(&self) -> Result<(), StorageError> {
        self.lock()?.session = None;
        Ok(())
    }
}

#[async_trait]
impl TaskRepository for InMemoryStore {
    async fn insert_new_task(&self, record: NewTaskRecord) -> Result<TaskId, StorageError> {
        let mut guard = self.lock()?;
        guard.next_task_id += 1;
        let id = TaskId::new(guard.next_task_id);
        let task = Task::from_persisted(
            id,
            record.title,
            record.description,
            record.day,
            record.duration,
            record.priority,
            None,
            false,
            record.created_at,
            None,
        )
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
        guard.tasks.insert(id, task);
        Ok(id)
    }

    async fn update_task(&self, task: &Task) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if !guard.tasks.contains_key(&task.id()) {
            return Err(StorageError::NotFound);
        }
        guard.tasks.insert(task.id(), task.clone());
        Ok(())
    }

    async fn get_task(&self, id: TaskId) -> Result<Option<Task>, StorageError> {
        Ok(self.lock()?.tasks.get(&id).cloned())
    }

    async fn list_tasks(&self) -> Result<Vec<Task>, StorageError> {
        let mut tasks: Vec<Task> = self.lock()?.tasks.values().cloned().collect();
        tasks.sort_by_key(|t| (t.day(), t.id()));
        Ok(tasks)
    }

    async fn delete_task(&self, id: TaskId) -> Result<(), StorageError> {
        match self.lock()?.tasks.remove(&id) {
            Some(_) => Ok(()),
            None => Err(StorageError::NotFound),
        }
    }

    async fn clear_tasks(&self) -> Result<(), StorageError> {
        self.lock()?.tasks.clear();
        Ok(())
    }
}

#[async_trait]
impl StreakStore for InMemoryStore {
    async fn load_streak(&self) -> Result<Option<Streak>, StorageError> {
        Ok(self.lock()?.streak)
    }

    async fn save_streak(&self, streak: &Streak) -> Result<(), StorageError> {
        self.lock()?.streak = Some(*streak);
        Ok(())
    }
}

#[async_trait]
impl SettingsRepository for InMemoryStore {
    async fn get_device_id(&self) -> Result<Option<DeviceId>, StorageError> {
        Ok(self.lock()?.device_id)
    }

    async fn set_device_id(&self, id: DeviceId) -> Result<(), StorageError> {
        self.lock()?.device_id = Some(id);
        Ok(())
    }
}

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub sessions: Arc<dyn SessionStore>,
    pub tasks: Arc<dyn TaskRepository>,
    pub streaks: Arc<dyn StreakStore>,
    pub settings: Arc<dyn SettingsRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let store = InMemoryStore::new();
        Self {
            sessions: Arc::new(store.clone()),
            tasks: Arc::new(store.clone()),
            streaks: Arc::new(store.clone()),
            settings: Arc::new(store),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reframe_core::time::fixed_now;

    fn record(title: &str, day: u16) -> NewTaskRecord {
        NewTaskRecord {
            title: title.into(),
            description: String::new(),
            day,
            duration: None,
            priority: TaskPriority::Medium,
            created_at: fixed_now(),
        }
    }

    #[tokio::test]
    async fn tasks_round_trip_and_sort_by_day() {
        let store = InMemoryStore::new();
        let late = store.insert_new_task(record("later", 5)).await.unwrap();
        let early = store.insert_new_task(record("first", 1)).await.unwrap();

        let tasks = store.list_tasks().await.unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].id(), early);
        assert_eq!(tasks[1].id(), late);

        let mut task = store.get_task(late).await.unwrap().unwrap();
        task.complete(fixed_now()).unwrap();
        store.update_task(&task).await.unwrap();
        let fetched = store.get_task(late).await.unwrap().unwrap();
        assert!(fetched.is_completed());
    }

    #[tokio::test]
    async fn deleting_missing_task_reports_not_found() {
        let store = InMemoryStore::new();
        let err = store.delete_task(TaskId::new(9)).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn session_snapshot_round_trips() {
        let store = InMemoryStore::new();
        assert!(store.load_session().await.unwrap().is_none());

        let snapshot = SessionSnapshot {
            problem_text: "I feel stuck in my job".into(),
            questions: vec!["How long?".into()],
            answers: BTreeMap::from([(0, "Two years".into())]),
            current_question: 1,
            unlocked: true,
            analysis: None,
            saved_at: fixed_now(),
        };
        store.save_session(&snapshot).await.unwrap();
        assert_eq!(store.load_session().await.unwrap(), Some(snapshot));

        store.clear_session().await.unwrap();
        assert!(store.load_session().await.unwrap().is_none());
    }
}
