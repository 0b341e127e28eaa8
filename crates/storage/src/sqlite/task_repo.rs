use async_trait::async_trait;

use reframe_core::model::{Task, TaskId};

use super::SqliteRepository;
use super::mapping::{map_task_row, task_id_from_i64, task_id_to_i64};
use crate::repository::{NewTaskRecord, StorageError, TaskRepository};

#[async_trait]
impl TaskRepository for SqliteRepository {
    async fn insert_new_task(&self, record: NewTaskRecord) -> Result<TaskId, StorageError> {
        let result = sqlx::query(
            r"
            INSERT INTO tasks (
                title, description, day, duration, priority, notes,
                completed, created_at, completed_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, NULL, 0, ?6, NULL)
            ",
        )
        .bind(&record.title)
        .bind(&record.description)
        .bind(i64::from(record.day))
        .bind(&record.duration)
        .bind(record.priority.to_string())
        .bind(record.created_at)
        .execute(self.pool())
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        task_id_from_i64(result.last_insert_rowid())
    }

    async fn update_task(&self, task: &Task) -> Result<(), StorageError> {
        let result = sqlx::query(
            r"
            UPDATE tasks SET
                title = ?2,
                description = ?3,
                day = ?4,
                duration = ?5,
                priority = ?6,
                notes = ?7,
                completed = ?8,
                created_at = ?9,
                completed_at = ?10
            WHERE id = ?1
            ",
        )
        .bind(task_id_to_i64(task.id())?)
        .bind(task.title())
        .bind(task.description())
        .bind(i64::from(task.day()))
        .bind(task.duration())
        .bind(task.priority().to_string())
        .bind(task.notes())
        .bind(i64::from(task.is_completed()))
        .bind(task.created_at())
        .bind(task.completed_at())
        .execute(self.pool())
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn get_task(&self, id: TaskId) -> Result<Option<Task>, StorageError> {
        let row = sqlx::query("SELECT * FROM tasks WHERE id = ?1")
            .bind(task_id_to_i64(id)?)
            .fetch_optional(self.pool())
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;

        row.as_ref().map(map_task_row).transpose()
    }

    async fn list_tasks(&self) -> Result<Vec<Task>, StorageError> {
        let rows = sqlx::query("SELECT * FROM tasks ORDER BY day, id")
            .fetch_all(self.pool())
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;

        rows.iter().map(map_task_row).collect()
    }

    async fn delete_task(&self, id: TaskId) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?1")
            .bind(task_id_to_i64(id)?)
            .execute(self.pool())
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn clear_tasks(&self) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM tasks")
            .execute(self.pool())
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;
        Ok(())
    }
}
