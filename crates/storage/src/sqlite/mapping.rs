use std::str::FromStr;

use reframe_core::model::{Task, TaskId, TaskPriority};
use sqlx::Row;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn task_id_from_i64(v: i64) -> Result<TaskId, StorageError> {
    u64::try_from(v)
        .map(TaskId::new)
        .map_err(|_| StorageError::Serialization(format!("invalid task id: {v}")))
}

pub(crate) fn task_id_to_i64(id: TaskId) -> Result<i64, StorageError> {
    i64::try_from(id.value())
        .map_err(|_| StorageError::Serialization("task id overflow".into()))
}

pub(crate) fn day_from_i64(v: i64) -> Result<u16, StorageError> {
    u16::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid day: {v}")))
}

pub(crate) fn map_task_row(row: &sqlx::sqlite::SqliteRow) -> Result<Task, StorageError> {
    let id = task_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?;
    let priority = TaskPriority::from_str(&row.try_get::<String, _>("priority").map_err(ser)?)
        .map_err(ser)?;
    let day = day_from_i64(row.try_get::<i64, _>("day").map_err(ser)?)?;

    Task::from_persisted(
        id,
        row.try_get("title").map_err(ser)?,
        row.try_get("description").map_err(ser)?,
        day,
        row.try_get("duration").map_err(ser)?,
        priority,
        row.try_get("notes").map_err(ser)?,
        row.try_get::<i64, _>("completed").map_err(ser)? != 0,
        row.try_get("created_at").map_err(ser)?,
        row.try_get("completed_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> Result<String, StorageError> {
    serde_json::to_string(value).map_err(ser)
}

pub(crate) fn from_json<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, StorageError> {
    serde_json::from_str(raw).map_err(ser)
}
